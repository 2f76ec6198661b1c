//! Heuristic h(n) (§4.7, C7): an admissible lower bound on remaining
//! pushes, built from the Hungarian assignment over the goal-cost table
//! plus a penalty-database correction. Mirrors the teacher repo's
//! trait-based heuristic design (a `Heuristic` trait with swappable
//! implementations) so tests can plug in a zero-penalty stand-in without
//! needing a populated penalty database.

use crate::bits::Bitvector;
use crate::costtable::CostTable;
use crate::node::Node;

/// Saturating +infinity for unreachable assignments, per §9's guidance
/// that h(n) "saturates at +infinity" rather than overflowing.
pub const INFINITE: u64 = u64::MAX;

pub trait Heuristic {
    fn estimate(&self, node: &Node) -> u64;
}

/// Supplies the penalty-database contribution to h(n); implemented by
/// [`crate::penalty::PenaltyDatabase`]. Kept as a trait so the Hungarian
/// heuristic can be exercised in isolation with [`NoPenalties`].
pub trait PenaltyLookup {
    fn total_penalty(&self, node: &Node) -> u64;
}

/// A penalty source that never contributes anything, for tests of the
/// Hungarian assignment in isolation.
pub struct NoPenalties;

impl PenaltyLookup for NoPenalties {
    fn total_penalty(&self, _node: &Node) -> u64 {
        0
    }
}

/// The real heuristic used by the search: optimal box-to-goal assignment
/// cost plus whatever extra pushes the penalty database has discovered
/// for sub-states actually present in `node`.
pub struct HungarianHeuristic<'a, P: PenaltyLookup> {
    costs: &'a CostTable,
    goals: Vec<usize>,
    penalties: &'a P,
}

impl<'a, P: PenaltyLookup> HungarianHeuristic<'a, P> {
    pub fn new(costs: &'a CostTable, goals: Vec<usize>, penalties: &'a P) -> Self {
        HungarianHeuristic {
            costs,
            goals,
            penalties,
        }
    }
}

impl<P: PenaltyLookup> Heuristic for HungarianHeuristic<'_, P> {
    fn estimate(&self, node: &Node) -> u64 {
        let boxes: Vec<usize> = node.boxes.iter().collect();
        let matrix = self.costs.sub_matrix(&boxes, &self.goals);
        if assignment_forced_unreachable(&matrix) {
            return INFINITE;
        }
        let assignment = crate::hungarian::min_assignment_cost(&matrix);
        assignment.saturating_add(self.penalties.total_penalty(node))
    }
}

/// True when some box has no reachable goal at all (every entry in its
/// row is `u32::MAX`), or symmetrically some goal has no box that can
/// reach it — either makes the whole assignment infeasible regardless of
/// how the Hungarian algorithm resolves ties. The column check is tracked
/// as a [`Bitvector`] of goal indices seen reachable from at least one
/// box, since the matrix is square and goal count is bounded by
/// [`crate::node::MAX_BOXES`] the same as box count.
fn assignment_forced_unreachable(matrix: &[Vec<u32>]) -> bool {
    assert!(matrix.len() <= crate::node::MAX_BOXES, "box count exceeds supported maximum");
    if matrix.iter().any(|row| row.iter().all(|&c| c == u32::MAX)) {
        return true;
    }
    let mut reachable_goals = Bitvector::new();
    for row in matrix {
        for (j, &c) in row.iter().enumerate() {
            if c != u32::MAX {
                reachable_goals.add(j as u8);
            }
        }
    }
    reachable_goals.len() < matrix.len()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::level::Level;
    use crate::position::PositionMap;

    #[test]
    fn test_single_box_assignment() {
        let level = Level::from_text("#####\n#@$.#\n#####").unwrap();
        let positions = PositionMap::build(&level);
        let costs = CostTable::build(&positions);
        let goals: Vec<usize> = level
            .goals()
            .iter()
            .map(|&g| positions.grid_to_zone(g).unwrap())
            .collect();
        let pusher_seed = positions.grid_to_zone(level.pusher_start()).unwrap();
        let boxes = positions.zone_from_grid_indices([level.boxes()[0]]);
        let node = Node::canonicalize(&positions, boxes, pusher_seed);

        let no_penalties = NoPenalties;
        let h = HungarianHeuristic::new(&costs, goals, &no_penalties);
        assert_eq!(h.estimate(&node), 1);
    }

    #[test]
    fn test_two_box_assignment_picks_cheaper_pairing() {
        let level = Level::from_text("########\n#@$  $ #\n#.    .#\n########").unwrap();
        let positions = PositionMap::build(&level);
        let costs = CostTable::build(&positions);
        let goals: Vec<usize> = level
            .goals()
            .iter()
            .map(|&g| positions.grid_to_zone(g).unwrap())
            .collect();
        let pusher_seed = positions.grid_to_zone(level.pusher_start()).unwrap();
        let boxes = positions.zone_from_grid_indices(level.boxes().iter().copied());
        let node = Node::canonicalize(&positions, boxes, pusher_seed);

        let no_penalties = NoPenalties;
        let h = HungarianHeuristic::new(&costs, goals, &no_penalties);
        assert!(h.estimate(&node) < INFINITE);
    }

    #[test]
    fn test_column_with_no_reachable_box_is_infeasible() {
        // Every row has a finite entry, so the per-row check alone would
        // call this feasible, but nothing can ever reach goal index 1.
        let matrix = vec![vec![3, u32::MAX], vec![5, u32::MAX]];
        assert!(assignment_forced_unreachable(&matrix));
    }

    #[test]
    fn test_penalty_contribution_adds_to_estimate() {
        struct FixedPenalty(u64);
        impl PenaltyLookup for FixedPenalty {
            fn total_penalty(&self, _node: &Node) -> u64 {
                self.0
            }
        }

        let level = Level::from_text("#####\n#@$.#\n#####").unwrap();
        let positions = PositionMap::build(&level);
        let costs = CostTable::build(&positions);
        let goals: Vec<usize> = level
            .goals()
            .iter()
            .map(|&g| positions.grid_to_zone(g).unwrap())
            .collect();
        let pusher_seed = positions.grid_to_zone(level.pusher_start()).unwrap();
        let boxes = positions.zone_from_grid_indices([level.boxes()[0]]);
        let node = Node::canonicalize(&positions, boxes, pusher_seed);

        let penalty = FixedPenalty(4);
        let h = HungarianHeuristic::new(&costs, goals, &penalty);
        assert_eq!(h.estimate(&node), 5);
    }
}
