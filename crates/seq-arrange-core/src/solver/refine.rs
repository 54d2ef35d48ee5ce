use tracing::debug;

use crate::geometry::{lines_intersect_closed, Polygon};
use crate::rational::Rational;

use super::constraints::{ConstraintBuilder, ConstraintMode, Pose};
use super::vars::DecisionVariables;

fn edges_cross_under_assignment(
    footprint: &Polygon,
    footprint_x: f64,
    footprint_y: f64,
    zone: &Polygon,
    zone_x: f64,
    zone_y: f64,
) -> Vec<(usize, usize)> {
    let footprint_edges = footprint.lines();
    let zone_edges = zone.lines();
    let mut crossing = Vec::new();
    for (ei, e1) in footprint_edges.iter().enumerate() {
        let (ux, uy) = e1.direction();
        for (ej, e2) in zone_edges.iter().enumerate() {
            let (vx, vy) = e2.direction();
            if lines_intersect_closed(
                footprint_x + e1.a.x as f64,
                footprint_y + e1.a.y as f64,
                ux as f64,
                uy as f64,
                zone_x + e2.a.x as f64,
                zone_y + e2.a.y as f64,
                vx as f64,
                vy as f64,
            ) {
                crossing.push((ei, ej));
            }
        }
    }
    crossing
}

/// One refinement round: walks every temporally ordered pair under the
/// extracted assignment and adds a line non-intersection clause for each
/// footprint/zone edge pair that actually crosses. Clauses are only ever
/// added, never removed. Returns true when the formula grew.
#[allow(clippy::too_many_arguments)]
pub fn refine_sequential_polygon_weak_nonoverlapping<'ctx>(
    builder: &mut ConstraintBuilder<'_, 'ctx>,
    mode: ConstraintMode,
    variables: &DecisionVariables<'ctx>,
    values_x: &[Rational],
    values_y: &[Rational],
    values_t: &[Rational],
    fixed: &[usize],
    undecided: &[usize],
    polygons: &[Polygon],
    unreachable_polygons: &[Vec<Polygon>],
) -> bool {
    let mut participants: Vec<(usize, bool)> = Vec::new();
    participants.extend(fixed.iter().map(|&i| (i, true)));
    participants.extend(undecided.iter().map(|&i| (i, false)));

    let mut added = 0usize;
    for &(a, a_fixed) in &participants {
        for &(b, b_fixed) in &participants {
            if a == b || (a_fixed && b_fixed) {
                continue;
            }
            // Only the determined order matters: a prints before b.
            if values_t[a].as_f64() >= values_t[b].as_f64() {
                continue;
            }
            if mode == ConstraintMode::Consequential
                && (values_t[a].is_negative() || values_t[b].is_negative())
            {
                continue;
            }
            let ax = values_x[a].as_f64();
            let ay = values_y[a].as_f64();
            let bx = values_x[b].as_f64();
            let by = values_y[b].as_f64();
            for zone in &unreachable_polygons[b] {
                let footprint_edges = polygons[a].lines();
                let zone_edges = zone.lines();
                for (ei, ej) in
                    edges_cross_under_assignment(&polygons[a], ax, ay, zone, bx, by)
                {
                    let earlier = if a_fixed {
                        Pose::fixed(values_x[a], values_y[a], values_t[a])
                    } else {
                        Pose::free(variables, a)
                    };
                    let later = if b_fixed {
                        Pose::fixed(values_x[b], values_y[b], values_t[b])
                    } else {
                        Pose::free(variables, b)
                    };
                    builder.introduce_line_non_intersection(
                        mode,
                        &earlier,
                        &footprint_edges[ei],
                        &later,
                        &zone_edges[ej],
                    );
                    added += 1;
                }
            }
        }
    }
    if added > 0 {
        debug!(clauses = added, "refinement added line non-intersection clauses");
    }
    added > 0
}

/// Plain refinement over bed-level footprints, used by the untimed
/// non-overlap formulation.
pub fn refine_polygon_weak_nonoverlapping<'ctx>(
    builder: &mut ConstraintBuilder<'_, 'ctx>,
    variables: &DecisionVariables<'ctx>,
    values_x: &[Rational],
    values_y: &[Rational],
    undecided: &[usize],
    polygons: &[Polygon],
) -> bool {
    let mut added = 0usize;
    for (k, &a) in undecided.iter().enumerate() {
        for &b in &undecided[k + 1..] {
            let ax = values_x[a].as_f64();
            let ay = values_y[a].as_f64();
            let bx = values_x[b].as_f64();
            let by = values_y[b].as_f64();
            let a_edges = polygons[a].lines();
            let b_edges = polygons[b].lines();
            for (ei, ej) in
                edges_cross_under_assignment(&polygons[a], ax, ay, &polygons[b], bx, by)
            {
                builder.introduce_line_non_intersection(
                    ConstraintMode::Plain,
                    &Pose::free(variables, a),
                    &a_edges[ei],
                    &Pose::free(variables, b),
                    &b_edges[ej],
                );
                added += 1;
            }
        }
    }
    added > 0
}
