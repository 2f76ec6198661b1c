//! Penalty engine (§4.9, C9): discovers extra-push corrections for
//! `(sub-state, pusher-zone)` pairs where the Hungarian assignment alone
//! underestimates the true cost (box-box interactions the per-box cost
//! table can't see), by recursively solving miniature sub-levels and
//! comparing against the plain assignment bound. Grounded on
//! `original_source/BotBestPushesS_Penalties.cpp`'s cost-bounded
//! recursive sub-solve, which spec.md's distillation names but the
//! distilled text alone doesn't fully specify — §4.9 already calls out
//! "quick-valid mode" and a useless-penalty filter, both implemented here.

use crate::astar::BoundedSearch;
use crate::bits::Zone;
use crate::costtable::CostTable;
use crate::deadlock::StaticDeadlockZone;
use crate::heuristic::{Heuristic, HungarianHeuristic, NoPenalties, PenaltyLookup};
use crate::hungarian::min_assignment_cost;
use crate::ida;
use crate::level::ALL_DIRECTIONS;
use crate::node::Node;
use crate::position::PositionMap;
use std::collections::HashMap;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct PenaltyKey {
    boxes: Zone,
    pusher_cell: usize,
}

/// Extra pushes beyond the Hungarian assignment's estimate, keyed by the
/// exact sub-pattern of boxes and the cell the pusher occupies when that
/// pattern is observed.
#[derive(Debug, Clone, Default)]
pub struct PenaltyDatabase {
    table: HashMap<PenaltyKey, u64>,
}

impl PenaltyDatabase {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.table.len()
    }

    pub fn is_empty(&self) -> bool {
        self.table.is_empty()
    }

    fn insert(&mut self, boxes: Zone, pusher_cell: usize, extra: u64) {
        if extra == 0 {
            return;
        }
        self.table.insert(PenaltyKey { boxes, pusher_cell }, extra);
    }

    /// Persisted form: a flat list of `(boxes bytes, pusher_cell, extra)`,
    /// sorted by `extra` descending (§6's `penalty_list.dat`) so a reader
    /// that only wants the biggest corrections can stop early.
    pub fn to_sorted_entries(&self) -> Vec<(Zone, usize, u64)> {
        let mut entries: Vec<_> = self
            .table
            .iter()
            .map(|(k, &v)| (k.boxes.clone(), k.pusher_cell, v))
            .collect();
        entries.sort_by(|a, b| b.2.cmp(&a.2));
        entries
    }

    pub fn from_entries(entries: Vec<(Zone, usize, u64)>) -> Self {
        let mut table = HashMap::new();
        for (boxes, pusher_cell, extra) in entries {
            table.insert(PenaltyKey { boxes, pusher_cell }, extra);
        }
        PenaltyDatabase { table }
    }
}

impl PenaltyLookup for PenaltyDatabase {
    /// Per §4.7: scan entries in decreasing value order, greedily matching
    /// against a shrinking copy of `boxes` so two disjoint sub-patterns both
    /// contribute instead of only the larger one winning.
    fn total_penalty(&self, node: &Node) -> u64 {
        let mut entries: Vec<(&PenaltyKey, u64)> = self.table.iter().map(|(k, &v)| (k, v)).collect();
        entries.sort_by(|a, b| b.1.cmp(&a.1));

        let mut remaining = node.boxes.clone();
        let mut total = 0u64;
        for (key, extra) in entries {
            if key.boxes.is_subset_of(&remaining) && node.pusher.get(key.pusher_cell) {
                total = total.saturating_add(extra);
                remaining.minus(&key.boxes);
            }
        }
        total
    }
}

/// A pusher cell with no reachable non-wall neighbor can never initiate a
/// push from there in any direction, so sub-states seeded at it cannot
/// teach the engine anything — skipped before spending a sub-solve on it.
pub fn has_agency(positions: &PositionMap, pusher_cell: usize) -> bool {
    ALL_DIRECTIONS.iter().any(|&d| positions.neighbor_zone(pusher_cell, d).is_some())
}

#[derive(Debug, Clone, Copy)]
pub struct PenaltyOptions {
    /// Trade optimality for speed by striding candidate box placements
    /// instead of enumerating every combination (§4.9).
    pub quick_valid: bool,
    /// Largest sub-pattern (in boxes) to test.
    pub max_boxes: usize,
    /// Node budget handed to each recursive sub-solve.
    pub sub_solve_node_budget: u64,
    /// Maximum walk distance (in pushes' worth of cells) between two
    /// candidate box cells worth testing together — interactions beyond
    /// this range are assumed independent.
    pub max_pair_distance: usize,
}

impl Default for PenaltyOptions {
    fn default() -> Self {
        PenaltyOptions {
            quick_valid: true,
            max_boxes: 2,
            sub_solve_node_budget: 2_000,
            max_pair_distance: 4,
        }
    }
}

/// Runs the discovery loop: `seeds` (the deductive opening book, §6's
/// `deductive_positions.dat`) are tried first, then a bounded
/// combinatorial sweep over nearby cell pairs.
pub fn discover(
    positions: &PositionMap,
    statics: &StaticDeadlockZone,
    costs: &CostTable,
    goals: &[usize],
    seeds: &[(usize, Vec<usize>)],
    options: &PenaltyOptions,
) -> PenaltyDatabase {
    let mut db = PenaltyDatabase::new();

    for (_k, cells) in seeds {
        try_pattern(positions, statics, costs, goals, cells, &mut db, options);
    }

    if options.max_boxes < 2 {
        return db;
    }

    let level_cells: Vec<usize> = (0..positions.len()).collect();
    let stride = if options.quick_valid { 2 } else { 1 };

    for (idx, &a) in level_cells.iter().enumerate().step_by(stride) {
        if statics.is_dead(a) {
            continue;
        }
        for &b in level_cells.iter().skip(idx + 1) {
            if statics.is_dead(b) {
                continue;
            }
            if cell_distance(positions, a, b, options.max_pair_distance) > options.max_pair_distance {
                continue;
            }
            try_pattern(positions, statics, costs, goals, &[a, b], &mut db, options);
        }
    }

    db
}

/// Shortest walk distance between two zone-indexed cells, ignoring boxes
/// (plain BFS over `PositionMap`'s adjacency), capped at `cap` hops.
fn cell_distance(positions: &PositionMap, a: usize, b: usize, cap: usize) -> usize {
    if a == b {
        return 0;
    }
    let mut visited = positions.new_zone();
    visited.set(a);
    let mut frontier = vec![a];
    let mut dist = 0;
    while !frontier.is_empty() && dist < cap {
        dist += 1;
        let mut next = Vec::new();
        for c in frontier {
            for &d in &ALL_DIRECTIONS {
                let Some(n) = positions.neighbor_zone(c, d) else {
                    continue;
                };
                if n == b {
                    return dist;
                }
                if !visited.get(n) {
                    visited.set(n);
                    next.push(n);
                }
            }
        }
        frontier = next;
    }
    cap + 1
}

fn try_pattern(
    positions: &PositionMap,
    statics: &StaticDeadlockZone,
    costs: &CostTable,
    goals: &[usize],
    cells: &[usize],
    db: &mut PenaltyDatabase,
    options: &PenaltyOptions,
) {
    if cells.len() > options.max_boxes || cells.is_empty() {
        return;
    }
    let boxes = {
        let mut z = positions.new_zone();
        for &c in cells {
            z.set(c);
        }
        z
    };

    for &d in &ALL_DIRECTIONS {
        let Some(pusher_cell) = cells.first().and_then(|&c| positions.neighbor_zone(c, d)) else {
            continue;
        };
        if boxes.get(pusher_cell) || !has_agency(positions, pusher_cell) {
            continue;
        }

        let search_radius = options.max_pair_distance * 2;
        let nearby_goals: Vec<usize> = goals
            .iter()
            .copied()
            .filter(|&g| cells.iter().any(|&c| cell_distance(positions, c, g, search_radius) <= search_radius))
            .collect();
        if nearby_goals.len() < cells.len() {
            continue;
        }

        let matrix = costs.sub_matrix(cells, &nearby_goals[..cells.len()]);
        let assignment_cost = min_assignment_cost(&matrix);

        let no_penalties = NoPenalties;
        let heuristic = HungarianHeuristic::new(costs, nearby_goals[..cells.len()].to_vec(), &no_penalties);
        let root = Node::canonicalize(positions, boxes.clone(), pusher_cell);
        let goal_zone = {
            let mut z = positions.new_zone();
            for &g in &nearby_goals[..cells.len()] {
                z.set(g);
            }
            z
        };

        let search = BoundedSearch {
            positions,
            statics,
            goals: &nearby_goals[..cells.len()],
            goal_zone: &goal_zone,
            macro_pushes: false,
            node_budget: options.sub_solve_node_budget,
            max_ram_mib: 256,
            open_table_cap: 200_000,
            close_table_cap: 200_000,
        };

        let h0 = heuristic.estimate(&root);
        let outcome = ida::solve(&search, &heuristic, root, h0, 8);
        if let Some(id) = outcome.solved_id {
            let actual_cost = outcome.tree.get(id).g;
            if actual_cost > assignment_cost {
                db.insert(boxes.clone(), pusher_cell, actual_cost - assignment_cost);
            }
        }
    }
}
