use std::cmp::Ordering;
use std::collections::HashSet;

use tracing::{debug, info};
use z3::{Context, Params, Solver};

use crate::config::{ArrangementMode, SolverConfiguration};
use crate::geometry::Polygon;
use crate::rational::Rational;

use super::constraints::{ConstraintBuilder, ConstraintMode, Pose};
use super::optimize::optimize_sequential_weak_nonoverlapping_binary_centered;
use super::vars::DecisionVariables;
use super::GROUND_PRESENCE_TIME;

fn constraint_mode(mode: ArrangementMode) -> ConstraintMode {
    match mode {
        ArrangementMode::Sequential => ConstraintMode::Sequential,
        ArrangementMode::Consequential => ConstraintMode::Consequential,
    }
}

/// Renumbers the ordering values of all decided objects to the canonical
/// grid `GROUND_PRESENCE_TIME + k * 2 * spread * group_size`, in print order.
/// Glued successors are forced into the slot right after their predecessor.
pub fn augment_temporal_spread(
    solver_configuration: &SolverConfiguration,
    values_t: &mut [Rational],
    decided_polygons: &[usize],
    lepox_to_next: &[bool],
) {
    let mut order: Vec<usize> = decided_polygons.to_vec();
    order.sort_by(|&a, &b| {
        values_t[a]
            .as_f64()
            .partial_cmp(&values_t[b].as_f64())
            .unwrap_or(Ordering::Equal)
    });

    let decided_set: HashSet<usize> = decided_polygons.iter().copied().collect();
    let mut emitted: HashSet<usize> = HashSet::new();
    let mut final_order: Vec<usize> = Vec::with_capacity(order.len());
    for &index in &order {
        if emitted.contains(&index) {
            continue;
        }
        // Rewind to the head of the glued chain, then emit the whole chain.
        let mut head = index;
        while head > 0 && lepox_to_next[head - 1] && decided_set.contains(&(head - 1)) {
            head -= 1;
        }
        let mut current = head;
        loop {
            if !emitted.contains(&current) {
                final_order.push(current);
                emitted.insert(current);
            }
            if lepox_to_next.get(current) == Some(&true) && decided_set.contains(&(current + 1)) {
                current += 1;
            } else {
                break;
            }
        }
    }

    let step =
        2 * solver_configuration.temporal_spread * solver_configuration.object_group_size as i64;
    for (k, &index) in final_order.iter().enumerate() {
        values_t[index] = Rational::from(GROUND_PRESENCE_TIME + k as i64 * step);
    }
}

/// One group attempt: fresh context and formula over the group, presence
/// assumptions selecting the attempted members, then the binary-centred
/// optimiser. Contexts are never shared between attempts, so accumulated
/// refinement clauses stay local to the group that produced them.
#[allow(clippy::too_many_arguments)]
fn try_schedule_group(
    solver_configuration: &SolverConfiguration,
    values_x: &mut Vec<Rational>,
    values_y: &mut Vec<Rational>,
    values_t: &mut Vec<Rational>,
    polygons: &[Polygon],
    unreachable_polygons: &[Vec<Polygon>],
    lepox_to_next: &[bool],
    fixed: &[usize],
    attempt: &[usize],
    missing: &[usize],
) -> bool {
    let mode = constraint_mode(solver_configuration.mode);

    let z3_config = z3::Config::new();
    let context = Context::new(&z3_config);
    let solver = Solver::new(&context);
    let mut params = Params::new(&context);
    params.set_u32(
        "timeout",
        solver_configuration
            .optimization_timeout
            .as_millis()
            .min(u32::MAX as u128) as u32,
    );
    solver.set_params(&params);

    let variables = DecisionVariables::new(&context, polygons.len());
    let mut builder = ConstraintBuilder::new(&context, &solver);

    let participants: Vec<usize> = match mode {
        ConstraintMode::Consequential => attempt.iter().chain(missing.iter()).copied().collect(),
        _ => attempt.to_vec(),
    };

    builder.introduce_temporal_ordering(
        mode,
        &variables,
        &participants,
        solver_configuration.temporal_spread,
    );
    builder.introduce_temporal_ordering_against_fixed(
        mode,
        &variables,
        values_t,
        fixed,
        &participants,
        solver_configuration.temporal_spread,
    );
    builder.introduce_sequential_polygon_weak_nonoverlapping(
        mode,
        &variables,
        values_x,
        values_y,
        values_t,
        fixed,
        &participants,
        polygons,
        unreachable_polygons,
    );

    if solver_configuration.temporal_lepox_enabled && mode == ConstraintMode::Consequential {
        let fixed_set: HashSet<usize> = fixed.iter().copied().collect();
        let participant_set: HashSet<usize> = participants.iter().copied().collect();
        for &current in &participants {
            if current == 0 || !lepox_to_next[current - 1] {
                continue;
            }
            let predecessor = current - 1;
            let current_pose = Pose::free(&variables, current);
            if participant_set.contains(&predecessor) {
                builder.introduce_consequential_temporal_lepox(
                    &Pose::free(&variables, predecessor),
                    &current_pose,
                    solver_configuration.temporal_spread,
                    solver_configuration.temporal_lepox_slack,
                );
            } else if fixed_set.contains(&predecessor) {
                builder.introduce_consequential_temporal_lepox(
                    &Pose::fixed(
                        values_x[predecessor],
                        values_y[predecessor],
                        values_t[predecessor],
                    ),
                    &current_pose,
                    solver_configuration.temporal_spread,
                    solver_configuration.temporal_lepox_slack,
                );
            }
        }
    }

    let mut assumptions = Vec::new();
    if mode == ConstraintMode::Consequential {
        builder.assume_object_presence(&variables, attempt, missing, &mut assumptions);
    }

    optimize_sequential_weak_nonoverlapping_binary_centered(
        solver_configuration,
        &mut builder,
        &solver,
        &variables,
        mode,
        &assumptions,
        values_x,
        values_y,
        values_t,
        fixed,
        attempt,
        polygons,
        unreachable_polygons,
    )
}

/// Sub-global scheduling for one plate: walk the undecided list in groups of
/// at most `object_group_size`, drop tail objects of a failing group, commit
/// successful groups, and spill everything unplaced into `remaining`.
///
/// Glued chains are treated as atoms: group boundaries extend over them,
/// tail-dropping removes them whole, spilled chains spill whole.
#[allow(clippy::too_many_arguments)]
pub fn optimize_subglobal_sequential_polygon_nonoverlapping(
    solver_configuration: &SolverConfiguration,
    values_x: &mut Vec<Rational>,
    values_y: &mut Vec<Rational>,
    values_t: &mut Vec<Rational>,
    polygons: &[Polygon],
    unreachable_polygons: &[Vec<Polygon>],
    lepox_to_next: &[bool],
    undecided_polygons: &[usize],
    decided_polygons: &mut Vec<usize>,
    remaining_polygons: &mut Vec<usize>,
    mut on_objects_decided: impl FnMut(usize),
) -> bool {
    let object_count = polygons.len();
    values_x.resize(object_count, Rational::default());
    values_y.resize(object_count, Rational::default());
    values_t.resize(object_count, Rational::default());

    let queue: Vec<usize> = undecided_polygons.to_vec();
    let mut pos = 0usize;

    while pos < queue.len() {
        let mut end = (pos + solver_configuration.object_group_size).min(queue.len());
        while end < queue.len() && lepox_to_next[queue[end - 1]] {
            end += 1;
        }
        let group: Vec<usize> = queue[pos..end].to_vec();

        let mut attempt_len = group.len();
        let mut placed_len = 0usize;
        while attempt_len > 0 {
            let attempt = &group[..attempt_len];
            let missing: Vec<usize> = group[attempt_len..].to_vec();
            debug!(?attempt, "trying object group");
            if try_schedule_group(
                solver_configuration,
                values_x,
                values_y,
                values_t,
                polygons,
                unreachable_polygons,
                lepox_to_next,
                decided_polygons,
                attempt,
                &missing,
            ) {
                placed_len = attempt_len;
                break;
            }
            attempt_len -= 1;
            while attempt_len > 0 && lepox_to_next[group[attempt_len - 1]] {
                attempt_len -= 1;
            }
        }

        if placed_len > 0 {
            decided_polygons.extend_from_slice(&group[..placed_len]);
            augment_temporal_spread(
                solver_configuration,
                values_t,
                decided_polygons,
                lepox_to_next,
            );
            on_objects_decided(placed_len);
            info!(
                placed = placed_len,
                decided = decided_polygons.len(),
                "object group scheduled"
            );
            pos += placed_len;
        } else {
            // Not even the head chain fits this plate.
            let mut chain_end = pos + 1;
            while chain_end < queue.len() && lepox_to_next[queue[chain_end - 1]] {
                chain_end += 1;
            }
            remaining_polygons.extend_from_slice(&queue[pos..chain_end]);
            debug!(spilled = chain_end - pos, "objects spilled to the next plate");
            pos = chain_end;
        }
    }

    !decided_polygons.is_empty() || undecided_polygons.is_empty()
}
