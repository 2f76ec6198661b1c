//! Search state (§4.3, C3): a `Node` is a pair of zones — the boxes'
//! positions and the pusher's full reachability set, treating boxes as
//! temporary walls. Two nodes with the same box positions and an
//! overlapping (hence identical, once canonicalized) pusher-reachable area
//! are the same state, which is why the pusher side is stored as a set
//! rather than a single cell.

use crate::bits::Zone;
use crate::level::ALL_DIRECTIONS;
use crate::position::PositionMap;
use std::collections::VecDeque;

/// Upper bound on box count, matching [`crate::bits::Bitvector`]'s 64-bit
/// capacity for the per-box index sets used by the Hungarian assignment
/// (§4.7) and penalty engine (§4.9).
pub const MAX_BOXES: usize = 64;

/// A canonical search state: box positions plus the pusher's full
/// reachable area, both expressed as zone-index bitsets over the same
/// `PositionMap`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Node {
    pub boxes: Zone,
    pub pusher: Zone,
}

impl Node {
    /// Builds a canonical node from a box set and any one pusher cell the
    /// pusher can currently stand on, by flood-filling the pusher's full
    /// reachable area with boxes acting as walls.
    pub fn canonicalize(positions: &PositionMap, boxes: Zone, pusher_seed: usize) -> Node {
        let pusher = flood_fill(positions, &boxes, pusher_seed);
        Node { boxes, pusher }
    }

    /// Combined transposition-table hash, per §4.3: XOR of the two zones'
    /// word-folds. Two nodes that collide here are not necessarily equal —
    /// callers still compare the full `Node` — but equal nodes always
    /// collide.
    pub fn hash_key(&self) -> u64 {
        self.boxes.fold() ^ self.pusher.fold()
    }

    /// True if any cell the pusher can reach is adjacent to `zone_index`,
    /// i.e. the pusher could step onto `zone_index` next (used by the
    /// successor generator to find pushable box faces).
    pub fn pusher_can_reach(&self, zone_index: usize) -> bool {
        self.pusher.get(zone_index)
    }
}

/// BFS over non-box, non-wall cells starting at `seed`, per §4.1's flood
/// fill. `positions`'s adjacency table already excludes walls, so the only
/// extra obstacle to check here is `boxes`.
fn flood_fill(positions: &PositionMap, boxes: &Zone, seed: usize) -> Zone {
    let mut visited = positions.new_zone();
    if boxes.get(seed) {
        // A box sits on the seed cell: the caller passed a stale seed (the
        // pusher cannot be standing where a box is). Return an empty zone
        // rather than panicking; callers that can hit this treat it as
        // "no reachable cells" during successor generation.
        return visited;
    }
    visited.set(seed);
    let mut queue = VecDeque::new();
    queue.push_back(seed);

    while let Some(z) = queue.pop_front() {
        for &d in &ALL_DIRECTIONS {
            let Some(n) = positions.neighbor_zone(z, d) else {
                continue;
            };
            if visited.get(n) || boxes.get(n) {
                continue;
            }
            visited.set(n);
            queue.push_back(n);
        }
    }

    visited
}
