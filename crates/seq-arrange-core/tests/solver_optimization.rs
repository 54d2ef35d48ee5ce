use seq_arrange_core::config::SolverConfiguration;
use seq_arrange_core::geometry::{Point, Polygon};
use seq_arrange_core::rational::Rational;
use seq_arrange_core::solver::constraints::{ConstraintBuilder, ConstraintMode};
use seq_arrange_core::solver::optimize::optimize_sequential_weak_nonoverlapping_centered;
use seq_arrange_core::solver::vars::{extract_decision_values, DecisionVariables};
use z3::{Config, Context, SatResult, Solver};

fn square(side: i64) -> Polygon {
    Polygon::new(vec![
        Point::new(0, 0),
        Point::new(side, 0),
        Point::new(side, side),
        Point::new(0, side),
    ])
}

fn disjoint(values_x: &[Rational], values_y: &[Rational], side: f64) -> bool {
    let dx = (values_x[0].as_f64() - values_x[1].as_f64()).abs();
    let dy = (values_y[0].as_f64() - values_y[1].as_f64()).abs();
    dx >= side - 0.05 || dy >= side - 0.05
}

/// The eager formulation needs no refinement: the very first model already
/// separates the squares.
#[test]
fn strong_nonoverlap_separates_without_refinement() {
    let polygons = vec![square(100), square(100)];
    let undecided = vec![0usize, 1];

    let z3_config = Config::new();
    let context = Context::new(&z3_config);
    let solver = Solver::new(&context);
    let variables = DecisionVariables::new(&context, polygons.len());
    let mut builder = ConstraintBuilder::new(&context, &solver);

    builder.introduce_polygon_strong_nonoverlapping(&variables, &undecided, &polygons);
    let mut assumptions = Vec::new();
    for &i in &undecided {
        builder.assume_bed_bounding_box(
            &variables.x[i],
            &variables.y[i],
            &polygons[i],
            0,
            0,
            400,
            200,
            &mut assumptions,
        );
    }

    let mut values_x = vec![Rational::default(); polygons.len()];
    let mut values_y = vec![Rational::default(); polygons.len()];
    let mut values_t = vec![Rational::default(); polygons.len()];

    match solver.check_assumptions(&assumptions) {
        SatResult::Sat => {
            let model = solver.get_model().expect("sat result carries a model");
            extract_decision_values(
                &model,
                &variables,
                &undecided,
                &mut values_x,
                &mut values_y,
                &mut values_t,
            );
        }
        other => panic!("expected sat, got {other:?}"),
    }
    assert!(disjoint(&values_x, &values_y, 100.0));
}

/// The step-based shrink loop finds a feasible centred box and leaves the
/// tightest refined assignment in the value arenas.
#[test]
fn centered_step_optimizer_places_two_objects() {
    let cfg = SolverConfiguration::default();
    let polygons = vec![square(100), square(100)];
    // Footprints double as their own single unreachable zone.
    let unreachable: Vec<Vec<Polygon>> = polygons.iter().map(|p| vec![p.clone()]).collect();
    let undecided = vec![0usize, 1];

    let z3_config = Config::new();
    let context = Context::new(&z3_config);
    let solver = Solver::new(&context);
    let variables = DecisionVariables::new(&context, polygons.len());
    let mut builder = ConstraintBuilder::new(&context, &solver);

    let mut values_x = vec![Rational::default(); polygons.len()];
    let mut values_y = vec![Rational::default(); polygons.len()];
    let mut values_t = vec![Rational::default(); polygons.len()];

    builder.introduce_temporal_ordering(
        ConstraintMode::Sequential,
        &variables,
        &undecided,
        cfg.temporal_spread,
    );
    builder.introduce_sequential_polygon_weak_nonoverlapping(
        ConstraintMode::Sequential,
        &variables,
        &values_x,
        &values_y,
        &values_t,
        &[],
        &undecided,
        &polygons,
        &unreachable,
    );

    let feasible = optimize_sequential_weak_nonoverlapping_centered(
        &cfg,
        &mut builder,
        &solver,
        &variables,
        ConstraintMode::Sequential,
        &[],
        &mut values_x,
        &mut values_y,
        &mut values_t,
        &[],
        &undecided,
        &polygons,
        &unreachable,
    );
    assert!(feasible);
    assert!(disjoint(&values_x, &values_y, 100.0));
    // Temporal ordering kept the spread.
    let dt = (values_t[0].as_f64() - values_t[1].as_f64()).abs();
    assert!(dt > cfg.temporal_spread as f64);
}
