//! Deadlock detection (§4.8, C8), in three strata of increasing cost:
//!
//! 1. [`StaticDeadlockZone`] — cells from which a lone box can never reach
//!    any goal (corner and line deadlocks), precomputed once from the
//!    goal-cost table.
//! 2. [`frozen_boxes`] — boxes that cannot move in either remaining axis
//!    given the *current* board, adapted from the teacher repo's
//!    `compute_frozen_boxes` (originally cell/box-index based; here both
//!    the box set and the frozen set live in the same cell-indexed `Zone`
//!    space, since a box's identity for this check is its position).
//! 3. [`CorralSearcher`] — recursive blocked-zone ("corral") detection,
//!    adapted from the teacher's `find_pi_corral`, bounded by an explicit
//!    node/depth budget so a pathological board can't make deadlock
//!    checking itself the bottleneck.

use crate::costtable::CostTable;
use crate::level::{Direction, ALL_DIRECTIONS};
use crate::node::Node;
use crate::position::PositionMap;
use crate::bits::Zone;

/// Cells from which no goal is reachable by a single, unobstructed box —
/// placing a box there is an immediate, board-independent deadlock.
#[derive(Debug, Clone)]
pub struct StaticDeadlockZone {
    dead: Zone,
}

impl StaticDeadlockZone {
    pub fn build(positions: &PositionMap, costs: &CostTable, goals: &[usize]) -> StaticDeadlockZone {
        let mut dead = positions.new_zone();
        for cell in 0..positions.len() {
            let reachable = goals.iter().any(|&g| costs.cost(cell, g).is_some());
            if !reachable {
                dead.set(cell);
            }
        }
        StaticDeadlockZone { dead }
    }

    pub fn is_dead(&self, cell: usize) -> bool {
        self.dead.get(cell)
    }

    pub fn zone(&self) -> &Zone {
        &self.dead
    }
}

/// All boxes that are frozen (immovable along both axes) given the
/// current board, found by mutual-support analysis: a box is only
/// provisionally frozen if it is supported by a wall, a dead square, or
/// another box that is itself frozen — so unfreezing propagates outward
/// from any box that turns out to have room to move.
pub fn frozen_boxes(positions: &PositionMap, statics: &StaticDeadlockZone, node: &Node) -> Zone {
    let mut result = positions.new_zone();
    for box_cell in node.boxes.iter() {
        if !result.get(box_cell) {
            let frozen = compute_new_frozen(positions, statics, node, &result, box_cell);
            result.or_with(&frozen);
        }
    }
    result
}

/// Incrementally computes the boxes that become newly frozen once
/// `box_cell` is added to the frozen set, per the teacher's
/// `compute_new_frozen_boxes`.
fn compute_new_frozen(
    positions: &PositionMap,
    statics: &StaticDeadlockZone,
    node: &Node,
    frozen: &Zone,
    box_cell: usize,
) -> Zone {
    debug_assert!(!frozen.get(box_cell));

    let candidates = find_candidates(positions, node, frozen, box_cell);
    let mut candidates_frozen = candidates.clone();
    let mut to_check = candidates.clone();

    while let Some(cell) = to_check.pop() {
        if check_unfrozen(positions, statics, node, cell, &candidates, &candidates_frozen) {
            candidates_frozen.clear(cell);
            for &d in &ALL_DIRECTIONS {
                if let Some(n) = positions.neighbor_zone(cell, d) {
                    if node.boxes.get(n) && candidates_frozen.get(n) {
                        to_check.set(n);
                    }
                }
            }
        }
    }

    candidates_frozen
}

fn find_candidates(positions: &PositionMap, node: &Node, frozen: &Zone, box_cell: usize) -> Zone {
    let mut candidates = positions.new_zone();
    let mut stack = vec![box_cell];
    candidates.set(box_cell);

    while let Some(cell) = stack.pop() {
        for &d in &ALL_DIRECTIONS {
            if let Some(n) = positions.neighbor_zone(cell, d) {
                if node.boxes.get(n) && !candidates.get(n) && !frozen.get(n) {
                    candidates.set(n);
                    stack.push(n);
                }
            }
        }
    }

    candidates
}

fn check_unfrozen_dir(
    positions: &PositionMap,
    node: &Node,
    cell: usize,
    dir: Direction,
    candidates: &Zone,
    candidates_frozen: &Zone,
) -> bool {
    match positions.neighbor_zone(cell, dir) {
        Some(n) if node.boxes.get(n) => {
            if candidates.get(n) {
                !candidates_frozen.get(n)
            } else {
                false
            }
        }
        Some(_) => true,
        None => true,
    }
}

fn check_dead_square_dir(positions: &PositionMap, statics: &StaticDeadlockZone, cell: usize, dir: Direction) -> bool {
    match positions.neighbor_zone(cell, dir) {
        Some(n) => statics.is_dead(n),
        None => true,
    }
}

fn check_unfrozen_axis(
    positions: &PositionMap,
    statics: &StaticDeadlockZone,
    node: &Node,
    cell: usize,
    a: Direction,
    b: Direction,
    candidates: &Zone,
    candidates_frozen: &Zone,
) -> bool {
    check_unfrozen_dir(positions, node, cell, a, candidates, candidates_frozen)
        && check_unfrozen_dir(positions, node, cell, b, candidates, candidates_frozen)
        && !(check_dead_square_dir(positions, statics, cell, a) && check_dead_square_dir(positions, statics, cell, b))
}

fn check_unfrozen(
    positions: &PositionMap,
    statics: &StaticDeadlockZone,
    node: &Node,
    cell: usize,
    candidates: &Zone,
    candidates_frozen: &Zone,
) -> bool {
    check_unfrozen_axis(
        positions, statics, node, cell, Direction::Left, Direction::Right, candidates, candidates_frozen,
    ) || check_unfrozen_axis(
        positions, statics, node, cell, Direction::Up, Direction::Down, candidates, candidates_frozen,
    )
}

/// A single push the pusher can currently make, as handed in by the
/// successor generator.
#[derive(Debug, Clone, Copy)]
pub struct PushCandidate {
    pub box_cell: usize,
    pub direction: Direction,
    pub target_cell: usize,
}

/// Recursive blocked-zone ("PI-corral") detection, per §4.8's third
/// stratum. A corral is a connected region the pusher cannot currently
/// enter that must nonetheless be disturbed (it contains an unfilled goal
/// or an off-goal box) — if every push into the corral's edge boxes is
/// "safe" (each leads back into the corral and the pusher could make it),
/// the corral's pushes are the only productive moves and everything else
/// can be pruned.
pub struct CorralSearcher<'a> {
    positions: &'a PositionMap,
    statics: &'a StaticDeadlockZone,
    goal_zone: &'a Zone,
    node_budget: usize,
    depth_budget: usize,
}

impl<'a> CorralSearcher<'a> {
    pub fn new(
        positions: &'a PositionMap,
        statics: &'a StaticDeadlockZone,
        goal_zone: &'a Zone,
        node_budget: usize,
        depth_budget: usize,
    ) -> Self {
        CorralSearcher {
            positions,
            statics,
            goal_zone,
            node_budget,
            depth_budget,
        }
    }

    /// Finds the cheapest PI-corral among the given candidate pushes, or
    /// `None` if no push opens such a corral (or the budget is exhausted
    /// before a verdict is reached, which is treated the same as "none
    /// found" — a missed pruning opportunity costs time, not soundness).
    pub fn find(&self, node: &Node, candidates: &[PushCandidate]) -> Option<Vec<PushCandidate>> {
        let mut visited = self.positions.new_zone();
        let mut best: Option<Vec<PushCandidate>> = None;
        let mut best_cost = usize::MAX;
        let mut budget = self.node_budget;

        for &push in candidates {
            if node.pusher.get(push.target_cell) || visited.get(push.target_cell) {
                continue;
            }
            if let Some((pushes, cost)) = self.explore(node, push.target_cell, &mut visited, &mut budget) {
                if cost < best_cost {
                    best_cost = cost;
                    best = Some(pushes);
                }
            }
            if budget == 0 {
                break;
            }
        }

        best
    }

    fn explore(
        &self,
        node: &Node,
        start: usize,
        visited: &mut Zone,
        budget: &mut usize,
    ) -> Option<(Vec<PushCandidate>, usize)> {
        let mut stack = vec![(start, 0usize)];
        let mut local = self.positions.new_zone();
        let mut edge_boxes = self.positions.new_zone();
        let mut must_be_pushed = false;

        local.set(start);
        visited.set(start);

        while let Some((cell, depth)) = stack.pop() {
            if *budget == 0 || depth > self.depth_budget {
                return None;
            }
            *budget -= 1;

            let has_box = node.boxes.get(cell);
            if has_box {
                if !edge_boxes.get(cell) {
                    // A box already inside `local` edges the corral only
                    // once its own reachable pushes are examined below;
                    // here we just note we stepped onto it.
                    must_be_pushed = true;
                    edge_boxes.set(cell);
                }
                continue;
            } else if self.goal_zone.get(cell) {
                // An unfilled goal inside the region also forces the
                // corral to be disturbed, same as an off-goal box.
                must_be_pushed = true;
            }

            for &d in &ALL_DIRECTIONS {
                let Some(n) = self.positions.neighbor_zone(cell, d) else {
                    continue;
                };
                if local.get(n) {
                    continue;
                }
                local.set(n);
                visited.set(n);
                stack.push((n, depth + 1));
            }
        }

        if !must_be_pushed {
            return None;
        }

        let mut pushes = Vec::new();
        let mut edge = edge_boxes.clone();
        while let Some(box_cell) = edge.pop() {
            for &d in &ALL_DIRECTIONS {
                let (Some(target), Some(behind)) = (
                    self.positions.neighbor_zone(box_cell, d),
                    self.positions.neighbor_zone(box_cell, d.reverse()),
                ) else {
                    continue;
                };
                if local.get(behind) {
                    continue; // push originates from inside the corral
                }
                if node.boxes.get(target) || self.statics.is_dead(target) {
                    continue;
                }
                if !local.get(target) {
                    return None; // I condition: push must stay inside the corral
                }
                if !node.pusher.get(behind) {
                    return None; // P condition: pusher must be able to make the push
                }
                pushes.push(PushCandidate {
                    box_cell,
                    direction: d,
                    target_cell: target,
                });
            }
        }

        let cost = pushes.len();
        Some((pushes, cost))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::level::Level;

    fn setup(text: &str) -> (Level, PositionMap, CostTable, Vec<usize>) {
        let level = Level::from_text(text).unwrap();
        let positions = PositionMap::build(&level);
        let costs = CostTable::build(&positions);
        let goals: Vec<usize> = level.goals().iter().map(|&g| positions.grid_to_zone(g).unwrap()).collect();
        (level, positions, costs, goals)
    }

    #[test]
    fn test_static_deadlock_corner() {
        let (level, positions, costs, goals) = setup("######\n#@   #\n# .  #\n#    #\n######");
        let statics = StaticDeadlockZone::build(&positions, &costs, &goals);
        let corner = positions.grid_to_zone(level.index_of(1, 1)).unwrap();
        assert!(statics.is_dead(corner));
    }

    #[test]
    fn test_static_deadlock_goal_is_safe() {
        let (level, positions, costs, goals) = setup("#####\n#@$.#\n#####");
        let statics = StaticDeadlockZone::build(&positions, &costs, &goals);
        let goal_zone = positions.grid_to_zone(level.goals()[0]).unwrap();
        assert!(!statics.is_dead(goal_zone));
    }

    #[test]
    fn test_frozen_box_in_corner() {
        let (level, positions, costs, goals) = setup("#####\n#@$ #\n#####");
        let statics = StaticDeadlockZone::build(&positions, &costs, &goals);
        let box_grid = level.boxes()[0];
        let boxes = positions.zone_from_grid_indices([box_grid]);
        let seed = positions.grid_to_zone(level.pusher_start()).unwrap();
        let node = Node::canonicalize(&positions, boxes, seed);

        let box_zone = positions.grid_to_zone(box_grid).unwrap();
        let frozen = frozen_boxes(&positions, &statics, &node);
        // Box pushed up against the top wall in a 1-tall corridor: it can
        // still slide left/right, so it should not be frozen.
        assert!(!frozen.get(box_zone));
    }

    #[test]
    fn test_frozen_box_at_goal_corner_stays_unfrozen_if_movable() {
        let (level, positions, costs, goals) = setup("######\n#@ . #\n#  $ #\n######");
        let statics = StaticDeadlockZone::build(&positions, &costs, &goals);
        let box_grid = level.boxes()[0];
        let boxes = positions.zone_from_grid_indices([box_grid]);
        let seed = positions.grid_to_zone(level.pusher_start()).unwrap();
        let node = Node::canonicalize(&positions, boxes, seed);
        let box_zone = positions.grid_to_zone(box_grid).unwrap();
        let frozen = frozen_boxes(&positions, &statics, &node);
        assert!(!frozen.get(box_zone));
    }

    #[test]
    fn test_corral_found_in_one_wide_corridor() {
        // A single box blocks the only path to the goal beyond it: the
        // region past the box is unreachable by the pusher and holds an
        // unfilled goal, so it is a corral whose only safe edge push is
        // the same push single_pushes would already offer.
        let (level, positions, costs, goals) = setup("#####\n#@$.#\n#####");
        let statics = StaticDeadlockZone::build(&positions, &costs, &goals);
        let goal_zone = positions.zone_from_grid_indices(level.goals().iter().copied());
        let box_grid = level.boxes()[0];
        let boxes = positions.zone_from_grid_indices([box_grid]);
        let seed = positions.grid_to_zone(level.pusher_start()).unwrap();
        let node = Node::canonicalize(&positions, boxes, seed);

        let box_zone = positions.grid_to_zone(box_grid).unwrap();
        let target_zone = positions.grid_to_zone(level.goals()[0]).unwrap();
        let candidates = [PushCandidate {
            box_cell: box_zone,
            direction: Direction::Right,
            target_cell: target_zone,
        }];

        let searcher = CorralSearcher::new(&positions, &statics, &goal_zone, 256, 64);
        let found = searcher.find(&node, &candidates).expect("corral expected");
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].box_cell, box_zone);
        assert_eq!(found[0].direction, Direction::Right);
        assert_eq!(found[0].target_cell, target_zone);
    }

    #[test]
    fn test_no_corral_in_open_room() {
        // The box sits in the middle of a wide-open room: walking around it
        // reaches every cell a push could open up, so no region is ever cut
        // off and no corral should be reported.
        let (level, positions, costs, goals) = setup("#######\n#  @  #\n#  $  #\n#  .  #\n#######");
        let statics = StaticDeadlockZone::build(&positions, &costs, &goals);
        let goal_zone = positions.zone_from_grid_indices(level.goals().iter().copied());
        let box_grid = level.boxes()[0];
        let boxes = positions.zone_from_grid_indices([box_grid]);
        let seed = positions.grid_to_zone(level.pusher_start()).unwrap();
        let node = Node::canonicalize(&positions, boxes, seed);

        let candidates: Vec<PushCandidate> = crate::successors::single_pushes(&positions, &statics, &node)
            .iter()
            .map(|s| s.push)
            .collect();

        let searcher = CorralSearcher::new(&positions, &statics, &goal_zone, 256, 64);
        assert!(searcher.find(&node, &candidates).is_none());
    }
}
