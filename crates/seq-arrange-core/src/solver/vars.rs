use z3::ast::Real;
use z3::{Context, Model};

use crate::rational::Rational;

/// Decision variables of every object on the current plate, indexed by the
/// plate-local object id. The scheduler owns one arena per solver context and
/// hands slices plus index lists to the constraint builder.
pub struct DecisionVariables<'ctx> {
    pub x: Vec<Real<'ctx>>,
    pub y: Vec<Real<'ctx>>,
    pub t: Vec<Real<'ctx>>,
}

impl<'ctx> DecisionVariables<'ctx> {
    pub fn new(ctx: &'ctx Context, count: usize) -> Self {
        let mut x = Vec::with_capacity(count);
        let mut y = Vec::with_capacity(count);
        let mut t = Vec::with_capacity(count);
        for i in 0..count {
            x.push(Real::new_const(ctx, format!("x_pos-{i}")));
            y.push(Real::new_const(ctx, format!("y_pos-{i}")));
            t.push(Real::new_const(ctx, format!("t_time-{i}")));
        }
        Self { x, y, t }
    }

    pub fn len(&self) -> usize {
        self.x.len()
    }

    pub fn is_empty(&self) -> bool {
        self.x.is_empty()
    }
}

/// Reads one model value through its variable handle.
fn eval_rational<'ctx>(model: &Model<'ctx>, var: &Real<'ctx>) -> Rational {
    match model.eval(var, true) {
        Some(value) => {
            let fraction = value.as_real();
            let approximation = fraction
                .map(|(n, d)| n as f64 / d as f64)
                .unwrap_or_else(|| parse_real_literal(&value.to_string()));
            Rational::from_solver_fraction(fraction, approximation)
        }
        None => Rational::default(),
    }
}

/// Parses the textual rendering of a real numeral; used only when the model
/// value is not a plain fraction.
fn parse_real_literal(text: &str) -> f64 {
    let t = text.trim();
    if let Some(inner) = t.strip_prefix("(-").and_then(|r| r.strip_suffix(')')) {
        return -parse_real_literal(inner.trim());
    }
    if let Some(inner) = t.strip_prefix("(/").and_then(|r| r.strip_suffix(')')) {
        let mut parts = inner.split_whitespace();
        let num: f64 = parts.next().and_then(|v| v.parse().ok()).unwrap_or(0.0);
        let den: f64 = parts.next().and_then(|v| v.parse().ok()).unwrap_or(1.0);
        if den == 0.0 {
            return 0.0;
        }
        return num / den;
    }
    t.parse().unwrap_or(0.0)
}

/// Copies the model assignment of the given objects into the value arenas.
pub fn extract_decision_values<'ctx>(
    model: &Model<'ctx>,
    variables: &DecisionVariables<'ctx>,
    indices: &[usize],
    values_x: &mut [Rational],
    values_y: &mut [Rational],
    values_t: &mut [Rational],
) {
    for &i in indices {
        values_x[i] = eval_rational(model, &variables.x[i]);
        values_y[i] = eval_rational(model, &variables.y[i]);
        values_t[i] = eval_rational(model, &variables.t[i]);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_plain_and_composite_literals() {
        assert_eq!(parse_real_literal("5.0"), 5.0);
        assert_eq!(parse_real_literal("(- 5.0)"), -5.0);
        assert_eq!(parse_real_literal("(/ 1.0 2.0)"), 0.5);
        assert_eq!(parse_real_literal("(- (/ 1.0 4.0))"), -0.25);
    }
}
