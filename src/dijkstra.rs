//! Box-push Dijkstra (§4.5, C5): minimum number of pushes to move a single
//! box from one cell to another, considered in isolation (no other boxes
//! on the board). Because every push costs exactly one and the pusher is
//! always free to walk around to the needed side between pushes, this
//! degenerates from Dijkstra to a plain breadth-first search — the "4
//! virtual directions" of the component's name are the four sides a
//! pusher could stand on to initiate the next push, checked at each step
//! rather than tracked as extra state.
//!
//! This result is optimistic: it assumes the pusher can always reach the
//! cell behind the box, which need not hold once other boxes are on the
//! board. That is exactly what makes it a valid input to an admissible
//! heuristic (§4.7) — it never overestimates the true push distance.

use crate::level::{Direction, ALL_DIRECTIONS};
use crate::position::PositionMap;
use std::collections::VecDeque;

/// Single-box push distances from `source` to every zone cell, plus enough
/// parent bookkeeping to reconstruct the exact push sequence.
#[derive(Debug, Clone)]
pub struct PushDistances {
    source: usize,
    distance: Vec<Option<u32>>,
    /// direction of the push that reached this cell, for path reconstruction.
    via: Vec<Option<Direction>>,
}

impl PushDistances {
    pub fn compute(positions: &PositionMap, source: usize) -> PushDistances {
        let z = positions.len();
        let mut distance = vec![None; z];
        let mut via = vec![None; z];
        // The box's cell immediately before the push that reached this
        // cell — after that push, the pusher is standing there. `None` for
        // `source` itself, since no prior push exists to place the pusher
        // anywhere in particular.
        let mut from: Vec<Option<usize>> = vec![None; z];
        distance[source] = Some(0);

        let mut queue = VecDeque::new();
        queue.push_back(source);

        while let Some(c) = queue.pop_front() {
            let d0 = distance[c].unwrap();
            for &dir in &ALL_DIRECTIONS {
                let Some(n) = positions.neighbor_zone(c, dir) else {
                    continue;
                };
                if distance[n].is_some() {
                    continue;
                }
                // The pusher must be able to stand on the cell behind the
                // box (opposite the push direction) to perform this push.
                let Some(behind) = positions.neighbor_zone(c, dir.reverse()) else {
                    continue;
                };
                // For the box's starting cell there is no tracked pusher
                // position, so the check stays optimistic (matches the
                // admissibility note above). For every later push, the
                // pusher must actually be able to walk from where the
                // previous push left it to `behind`, treating the box's
                // current cell `c` as the sole obstacle (§4.3's reachability
                // reused per §4.5) — a maze can otherwise let the box seal
                // off the one path to its own back side.
                let legal = match from[c] {
                    None => true,
                    Some(prior_cell) => reachable_avoiding(positions, prior_cell, behind, c),
                };
                if !legal {
                    continue;
                }
                distance[n] = Some(d0 + 1);
                via[n] = Some(dir);
                from[n] = Some(c);
                queue.push_back(n);
            }
        }

        PushDistances {
            source,
            distance,
            via,
        }
    }

    pub fn distance_to(&self, target: usize) -> Option<u32> {
        self.distance[target]
    }

    /// Reconstructs the push directions from `source` to `target`, in
    /// forward order. `None` if `target` is unreachable.
    pub fn path_to(&self, target: usize, positions: &PositionMap) -> Option<Vec<Direction>> {
        self.distance[target]?;
        let mut dirs = Vec::new();
        let mut cur = target;
        while cur != self.source {
            let d = self.via[cur]?;
            dirs.push(d);
            cur = positions.neighbor_zone(cur, d.reverse())?;
        }
        dirs.reverse();
        Some(dirs)
    }
}

/// Floor-walk reachability from `start` to `goal`, treating `obstacle` (the
/// box's current cell) as the only impassable non-wall cell — the same
/// flood fill `node::canonicalize` runs for the real pusher-reachable zone,
/// specialized to a single box instead of a full `Zone` of them.
fn reachable_avoiding(positions: &PositionMap, start: usize, goal: usize, obstacle: usize) -> bool {
    if start == goal {
        return true;
    }
    let mut seen = vec![false; positions.len()];
    seen[start] = true;
    let mut queue = VecDeque::new();
    queue.push_back(start);
    while let Some(c) = queue.pop_front() {
        for &dir in &ALL_DIRECTIONS {
            let Some(n) = positions.neighbor_zone(c, dir) else {
                continue;
            };
            if n == obstacle || seen[n] {
                continue;
            }
            if n == goal {
                return true;
            }
            seen[n] = true;
            queue.push_back(n);
        }
    }
    false
}
