//! Successor generation (§4.4, C4): legal single pushes from a node, plus
//! an optional macro-push extension that runs a box multiple cells in one
//! direction as a single search edge when `Options::macro_pushes` (§9's
//! resolved Open Question 1) is enabled.

use crate::deadlock::{PushCandidate, StaticDeadlockZone};
use crate::dijkstra::PushDistances;
use crate::level::ALL_DIRECTIONS;
use crate::node::Node;
use crate::position::PositionMap;

/// One successor state plus the push(es) that produced it, for move
/// reconstruction (§4.13).
#[derive(Debug, Clone)]
pub struct Successor {
    pub node: Node,
    pub push: PushCandidate,
    /// Number of individual pushes a macro-push successor represents;
    /// always 1 for a plain single push.
    pub push_count: u32,
}

/// Builds the `Successor` that results from applying a single known-legal
/// `push` to `node`, without re-deriving or re-checking its legality — used
/// when the caller (the corral searcher, C8 stratum 3) has already picked
/// exactly which pushes are worth expanding.
pub fn apply_push(positions: &PositionMap, node: &Node, push: PushCandidate) -> Successor {
    let mut new_boxes = node.boxes.clone();
    new_boxes.clear(push.box_cell);
    new_boxes.set(push.target_cell);
    let new_node = Node::canonicalize(positions, new_boxes, push.box_cell);
    Successor {
        node: new_node,
        push,
        push_count: 1,
    }
}

/// Every legal single push currently available from `node`, filtered by
/// the static deadlock zone (§4.8 stratum 1) only — the more expensive
/// frozen-box and corral checks are the caller's job, since they need the
/// full search context (cost-so-far, remaining budget) to decide whether
/// running them is worthwhile.
pub fn single_pushes(positions: &PositionMap, statics: &StaticDeadlockZone, node: &Node) -> Vec<Successor> {
    let mut out = Vec::new();
    for box_cell in node.boxes.iter() {
        for &dir in &ALL_DIRECTIONS {
            let Some(target) = positions.neighbor_zone(box_cell, dir) else {
                continue;
            };
            let Some(behind) = positions.neighbor_zone(box_cell, dir.reverse()) else {
                continue;
            };
            if node.boxes.get(target) || statics.is_dead(target) {
                continue;
            }
            if !node.pusher.get(behind) {
                continue;
            }

            let mut new_boxes = node.boxes.clone();
            new_boxes.clear(box_cell);
            new_boxes.set(target);
            let new_node = Node::canonicalize(positions, new_boxes, box_cell);

            out.push(Successor {
                node: new_node,
                push: PushCandidate {
                    box_cell,
                    direction: dir,
                    target_cell: target,
                },
                push_count: 1,
            });
        }
    }
    out
}

/// All legal single pushes plus, when `macro_pushes` is set, one additional
/// direct-to-goal run per pusher-reachable box (§4.4). A macro-push runs the
/// single-box Dijkstra (C5) from the box's current cell, collects every
/// goal it can reach that way, and keeps only the goals of maximal
/// "priority" — the count of walls-or-boxes already adjacent to the goal in
/// the current state — since forcing high-priority deliveries first
/// narrows the branching factor without sacrificing optimality.
pub fn generate(
    positions: &PositionMap,
    statics: &StaticDeadlockZone,
    node: &Node,
    goals: &[usize],
    macro_pushes: bool,
) -> Vec<Successor> {
    let mut out = single_pushes(positions, statics, node);
    if !macro_pushes {
        return out;
    }

    for box_cell in node.boxes.iter() {
        if let Some(run) = macro_run(positions, node, box_cell, goals) {
            if run.push_count > 1 {
                out.push(run);
            }
        }
    }
    out
}

fn macro_run(positions: &PositionMap, node: &Node, box_cell: usize, goals: &[usize]) -> Option<Successor> {
    let dists = PushDistances::compute(positions, box_cell);

    // Every goal this box can reach by a direct run of at least two pushes,
    // whose first push the pusher can actually make from its current spot
    // (the Dijkstra table itself is optimistic about that one step, since
    // it has no notion of the real current state).
    let mut reachable: Vec<(usize, u32, crate::level::Direction)> = goals
        .iter()
        .copied()
        .filter(|&g| g != box_cell && !node.boxes.get(g))
        .filter_map(|g| {
            let k = dists.distance_to(g)?;
            if k < 2 {
                return None;
            }
            let path = dists.path_to(g, positions)?;
            let first_dir = *path.first()?;
            let behind0 = positions.neighbor_zone(box_cell, first_dir.reverse())?;
            if !node.pusher.get(behind0) {
                return None;
            }
            Some((g, k, first_dir))
        })
        .collect();
    if reachable.is_empty() {
        return None;
    }

    let max_priority = reachable.iter().map(|&(g, _, _)| goal_priority(positions, node, g)).max().unwrap();
    reachable.retain(|&(g, _, _)| goal_priority(positions, node, g) == max_priority);
    reachable.sort_by_key(|&(g, k, _)| (k, g));
    let (goal, push_count, first_dir) = *reachable.first()?;

    let path = dists.path_to(goal, positions)?;
    let last_dir = *path.last()?;
    let pre_push_cell = positions.neighbor_zone(goal, last_dir.reverse())?;

    let mut new_boxes = node.boxes.clone();
    new_boxes.clear(box_cell);
    new_boxes.set(goal);
    let new_node = Node::canonicalize(positions, new_boxes, pre_push_cell);

    Some(Successor {
        node: new_node,
        push: PushCandidate {
            box_cell,
            direction: first_dir,
            target_cell: goal,
        },
        push_count,
    })
}

/// Walls-or-boxes adjacent to `goal` in the current state — §4.4's
/// macro-push delivery priority.
fn goal_priority(positions: &PositionMap, node: &Node, goal: usize) -> usize {
    ALL_DIRECTIONS
        .iter()
        .filter(|&&d| match positions.neighbor_zone(goal, d) {
            None => true,
            Some(n) => node.boxes.get(n),
        })
        .count()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::costtable::CostTable;
    use crate::level::Level;

    fn setup(text: &str) -> (Level, PositionMap, StaticDeadlockZone, Vec<usize>) {
        let level = Level::from_text(text).unwrap();
        let positions = PositionMap::build(&level);
        let costs = CostTable::build(&positions);
        let goals: Vec<usize> = level.goals().iter().map(|&g| positions.grid_to_zone(g).unwrap()).collect();
        let statics = StaticDeadlockZone::build(&positions, &costs, &goals);
        (level, positions, statics, goals)
    }

    #[test]
    fn test_single_push_basic() {
        let (level, positions, statics, _goals) = setup("#####\n#@$.#\n#####");
        let box_grid = level.boxes()[0];
        let boxes = positions.zone_from_grid_indices([box_grid]);
        let seed = positions.grid_to_zone(level.pusher_start()).unwrap();
        let node = Node::canonicalize(&positions, boxes, seed);

        let succs = single_pushes(&positions, &statics, &node);
        assert_eq!(succs.len(), 1);
        assert_eq!(succs[0].push.direction, crate::level::Direction::Right);
    }

    #[test]
    fn test_no_push_without_room_behind() {
        // Box has a wall to its left, so it can only be pushed right, but
        // the pusher is on the right of the box — no legal push at all.
        let (level, positions, statics, _goals) = setup("#####\n#$@.#\n#####");
        let boxes = positions.zone_from_grid_indices([level.boxes()[0]]);
        let seed = positions.grid_to_zone(level.pusher_start()).unwrap();
        let node = Node::canonicalize(&positions, boxes, seed);
        assert!(single_pushes(&positions, &statics, &node).is_empty());
    }

    #[test]
    fn test_macro_run_skips_ahead() {
        let (level, positions, statics, goals) = setup("########\n#@$   .#\n########");
        let boxes = positions.zone_from_grid_indices([level.boxes()[0]]);
        let seed = positions.grid_to_zone(level.pusher_start()).unwrap();
        let node = Node::canonicalize(&positions, boxes, seed);

        let succs = generate(&positions, &statics, &node, &goals, true);
        assert!(succs.iter().any(|s| s.push_count > 1));
    }

    #[test]
    fn test_macro_disabled_matches_single() {
        let (level, positions, statics, goals) = setup("########\n#@$   .#\n########");
        let boxes = positions.zone_from_grid_indices([level.boxes()[0]]);
        let seed = positions.grid_to_zone(level.pusher_start()).unwrap();
        let node = Node::canonicalize(&positions, boxes, seed);

        let without_macro = generate(&positions, &statics, &node, &goals, false);
        let plain = single_pushes(&positions, &statics, &node);
        assert_eq!(without_macro.len(), plain.len());
    }
}
