//! SMT formulation of sequential arrangement: decision variables, constraint
//! families, lazy refinement, the bounding-box optimiser and the sub-global
//! scheduler driving them.

use z3::ast::Real;
use z3::Context;

use crate::rational::Rational;

pub mod constraints;
pub mod optimize;
pub mod refine;
pub mod scheduler;
pub mod vars;

/// Ordering value assigned to the first object printed on a plate.
pub const GROUND_PRESENCE_TIME: i64 = 32;
/// Objects pinned as present satisfy `T > 16`.
pub const TEMPORAL_PRESENCE_THRESHOLD: i64 = 16;
/// Objects pinned as missing satisfy `T < -16`.
pub const TEMPORAL_ABSENCE_THRESHOLD: i64 = -16;

/// Repulsion band around the unit line-parameter interval: an intersection
/// witness only counts when both parameters stay within [-0.01, 1.01].
pub const INTERSECTION_REPULSION_MIN: (i32, i32) = (-1, 100);
pub const INTERSECTION_REPULSION_MAX: (i32, i32) = (101, 100);

/// Exact integer constant as a real term.
pub(crate) fn int_to_real<'ctx>(ctx: &'ctx Context, value: i64) -> Real<'ctx> {
    use z3::ast::Int;
    Int::from_i64(ctx, value).to_real()
}

/// Exact rational constant as a real term.
pub(crate) fn rational_to_real<'ctx>(ctx: &'ctx Context, value: &Rational) -> Real<'ctx> {
    use z3::ast::Int;
    let numerator = Int::from_i64(ctx, value.numerator).to_real();
    let denominator = Int::from_i64(ctx, value.denominator).to_real();
    &numerator / &denominator
}
