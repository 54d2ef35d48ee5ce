use tracing::{debug, trace};
use z3::ast::Bool;
use z3::{SatResult, Solver};

use crate::config::SolverConfiguration;
use crate::geometry::{Polygon, EPSILON};
use crate::preprocess::{SLICER_SCALE_FACTOR, SOLVER_SCALE_FACTOR};
use crate::rational::Rational;

use super::constraints::{ConstraintBuilder, ConstraintMode};
use super::refine::refine_sequential_polygon_weak_nonoverlapping;
use super::vars::{extract_decision_values, DecisionVariables};

/// Occupancy bound: a candidate box is hopeless when the footprint areas of
/// the participating objects sum to more than its area.
pub fn check_area_weak_nonoverlapping(
    box_min_x: i64,
    box_min_y: i64,
    box_max_x: i64,
    box_max_y: i64,
    fixed: &[usize],
    undecided: &[usize],
    polygons: &[Polygon],
) -> bool {
    let box_area = ((box_max_x - box_min_x) as f64) * ((box_max_y - box_min_y) as f64);
    let occupied: f64 = fixed
        .iter()
        .chain(undecided.iter())
        .map(|&i| polygons[i].area())
        .sum();
    occupied <= box_area
}

/// Fixed objects keep their extracted positions; a candidate box that no
/// longer contains one of them cannot be satisfiable.
pub fn check_extents_weak_nonoverlapping(
    box_min_x: i64,
    box_min_y: i64,
    box_max_x: i64,
    box_max_y: i64,
    values_x: &[Rational],
    values_y: &[Rational],
    fixed: &[usize],
    polygons: &[Polygon],
) -> bool {
    for &f in fixed {
        let bb = polygons[f].bounding_box();
        let x = values_x[f].as_f64();
        let y = values_y[f].as_f64();
        if x + (bb.min.x as f64) < box_min_x as f64 - EPSILON
            || x + (bb.max.x as f64) > box_max_x as f64 + EPSILON
            || y + (bb.min.y as f64) < box_min_y as f64 - EPSILON
            || y + (bb.max.y as f64) > box_max_y as f64 + EPSILON
        {
            return false;
        }
    }
    true
}

/// One SAT-and-refine attempt at a concrete plate box. On success the
/// undecided objects' values hold a refined satisfying assignment.
#[allow(clippy::too_many_arguments)]
fn try_plate_box<'ctx>(
    solver_configuration: &SolverConfiguration,
    builder: &mut ConstraintBuilder<'_, 'ctx>,
    solver: &Solver<'ctx>,
    variables: &DecisionVariables<'ctx>,
    mode: ConstraintMode,
    extra_assumptions: &[Bool<'ctx>],
    box_min_x: i64,
    box_min_y: i64,
    box_max_x: i64,
    box_max_y: i64,
    values_x: &mut [Rational],
    values_y: &mut [Rational],
    values_t: &mut [Rational],
    fixed: &[usize],
    undecided: &[usize],
    polygons: &[Polygon],
    unreachable_polygons: &[Vec<Polygon>],
) -> bool {
    let unit = SLICER_SCALE_FACTOR / SOLVER_SCALE_FACTOR;
    if box_max_x - box_min_x < solver_configuration.minimum_x_bounding_box_size * unit
        || box_max_y - box_min_y < solver_configuration.minimum_y_bounding_box_size * unit
    {
        return false;
    }
    if !check_area_weak_nonoverlapping(
        box_min_x, box_min_y, box_max_x, box_max_y, fixed, undecided, polygons,
    ) {
        trace!("area rejection for box {}x{}", box_max_x - box_min_x, box_max_y - box_min_y);
        return false;
    }
    if !check_extents_weak_nonoverlapping(
        box_min_x, box_min_y, box_max_x, box_max_y, values_x, values_y, fixed, polygons,
    ) {
        trace!("extents rejection for box {}x{}", box_max_x - box_min_x, box_max_y - box_min_y);
        return false;
    }

    let mut assumptions: Vec<Bool<'ctx>> = extra_assumptions.to_vec();
    for &u in undecided {
        builder.assume_bed_bounding_box(
            &variables.x[u],
            &variables.y[u],
            &polygons[u],
            box_min_x,
            box_min_y,
            box_max_x,
            box_max_y,
            &mut assumptions,
        );
    }

    loop {
        match solver.check_assumptions(&assumptions) {
            SatResult::Sat => {
                let model = match solver.get_model() {
                    Some(model) => model,
                    None => return false,
                };
                extract_decision_values(&model, variables, undecided, values_x, values_y, values_t);
                let refined = refine_sequential_polygon_weak_nonoverlapping(
                    builder,
                    mode,
                    variables,
                    values_x,
                    values_y,
                    values_t,
                    fixed,
                    undecided,
                    polygons,
                    unreachable_polygons,
                );
                if !refined {
                    return true;
                }
            }
            // A timed out check reports unknown; both count as infeasible and
            // the size is never retried.
            SatResult::Unsat | SatResult::Unknown => return false,
        }
    }
}

/// Linear variant of the bounding box optimisation: grows the centred inset
/// in steps of `bounding_box_size_optimization_step` until the first
/// infeasible size, keeping the last refined assignment. Slower than the
/// binary search but probes every size on the way.
#[allow(clippy::too_many_arguments)]
pub fn optimize_sequential_weak_nonoverlapping_centered<'ctx>(
    solver_configuration: &SolverConfiguration,
    builder: &mut ConstraintBuilder<'_, 'ctx>,
    solver: &Solver<'ctx>,
    variables: &DecisionVariables<'ctx>,
    mode: ConstraintMode,
    extra_assumptions: &[Bool<'ctx>],
    values_x: &mut Vec<Rational>,
    values_y: &mut Vec<Rational>,
    values_t: &mut Vec<Rational>,
    fixed: &[usize],
    undecided: &[usize],
    polygons: &[Polygon],
    unreachable_polygons: &[Vec<Polygon>],
) -> bool {
    let plate_x = solver_configuration.plate_bounding_box_size_x;
    let plate_y = solver_configuration.plate_bounding_box_size_y;
    let step = solver_configuration.bounding_box_size_optimization_step.max(1);

    let mut best: Option<(Vec<Rational>, Vec<Rational>, Vec<Rational>)> = None;
    let mut half = 0i64;
    while 2 * half < plate_x && 2 * half < plate_y {
        let feasible = try_plate_box(
            solver_configuration,
            builder,
            solver,
            variables,
            mode,
            extra_assumptions,
            half,
            half,
            plate_x - half,
            plate_y - half,
            values_x,
            values_y,
            values_t,
            fixed,
            undecided,
            polygons,
            unreachable_polygons,
        );
        if !feasible {
            break;
        }
        best = Some((values_x.clone(), values_y.clone(), values_t.clone()));
        half += step;
    }

    match best {
        Some((x, y, t)) => {
            *values_x = x;
            *values_y = y;
            *values_t = t;
            true
        }
        None => false,
    }
}

/// Binary-centred bounding box optimisation: shrinks a centred box over the
/// plate by bisecting the per-side insets, and returns the tightest refined
/// assignment observed.
#[allow(clippy::too_many_arguments)]
pub fn optimize_sequential_weak_nonoverlapping_binary_centered<'ctx>(
    solver_configuration: &SolverConfiguration,
    builder: &mut ConstraintBuilder<'_, 'ctx>,
    solver: &Solver<'ctx>,
    variables: &DecisionVariables<'ctx>,
    mode: ConstraintMode,
    extra_assumptions: &[Bool<'ctx>],
    values_x: &mut Vec<Rational>,
    values_y: &mut Vec<Rational>,
    values_t: &mut Vec<Rational>,
    fixed: &[usize],
    undecided: &[usize],
    polygons: &[Polygon],
    unreachable_polygons: &[Vec<Polygon>],
) -> bool {
    let plate_x = solver_configuration.plate_bounding_box_size_x;
    let plate_y = solver_configuration.plate_bounding_box_size_y;

    let mut half_x_min: i64 = 0;
    let mut half_x_max: i64 = plate_x / 2;
    let mut half_y_min: i64 = 0;
    let mut half_y_max: i64 = plate_y / 2;

    let mut best: Option<(Vec<Rational>, Vec<Rational>, Vec<Rational>)> = None;

    while half_x_max - half_x_min > 1 || half_y_max - half_y_min > 1 {
        let half_x = (half_x_min + half_x_max) / 2;
        let half_y = (half_y_min + half_y_max) / 2;
        let feasible = try_plate_box(
            solver_configuration,
            builder,
            solver,
            variables,
            mode,
            extra_assumptions,
            half_x,
            half_y,
            plate_x - half_x,
            plate_y - half_y,
            values_x,
            values_y,
            values_t,
            fixed,
            undecided,
            polygons,
            unreachable_polygons,
        );
        debug!(
            half_x,
            half_y,
            feasible,
            "binary centered step for box {}x{}",
            plate_x - 2 * half_x,
            plate_y - 2 * half_y
        );
        if feasible {
            best = Some((values_x.clone(), values_y.clone(), values_t.clone()));
            half_x_min = half_x;
            half_y_min = half_y;
        } else {
            half_x_max = half_x;
            half_y_max = half_y;
        }
    }

    // The bisection never probes the zero inset itself; when nothing tighter
    // worked, the full plate still has to be tried.
    if best.is_none()
        && try_plate_box(
            solver_configuration,
            builder,
            solver,
            variables,
            mode,
            extra_assumptions,
            0,
            0,
            plate_x,
            plate_y,
            values_x,
            values_y,
            values_t,
            fixed,
            undecided,
            polygons,
            unreachable_polygons,
        )
    {
        best = Some((values_x.clone(), values_y.clone(), values_t.clone()));
    }

    match best {
        Some((x, y, t)) => {
            *values_x = x;
            *values_y = y;
            *values_t = t;
            true
        }
        None => false,
    }
}
