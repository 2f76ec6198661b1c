//! Position maps (§4.2, C2): the grid-index <-> zone-index bijection built
//! once per level by flood-filling from the pusher's starting cell over
//! non-wall cells. Only cells reachable from the start are assigned a zone
//! index; floor cells sealed off behind walls never appear in any `Zone`
//! and are simply absent from the map.

use crate::bits::Zone;
use crate::level::{Direction, Level, ALL_DIRECTIONS};

/// Bidirectional mapping between a level's grid indices and the compact
/// `0..Z` zone-index space that every [`Zone`] in this crate is expressed
/// in.
#[derive(Debug, Clone)]
pub struct PositionMap {
    /// zone index -> grid index
    zone_to_grid: Vec<usize>,
    /// grid index -> zone index, `None` if unreachable from the pusher start.
    grid_to_zone: Vec<Option<usize>>,
    /// zone index -> per-direction zone-index neighbor (wall/off-grid = `None`).
    /// Since the map is built by flood-filling over every non-wall cell, any
    /// non-wall neighbor of a reachable cell is itself reachable, so this
    /// table is complete once `build` has run.
    adjacency: Vec<[Option<usize>; 4]>,
}

impl PositionMap {
    /// Flood-fills `level` from its pusher start over non-wall cells,
    /// assigning zone indices in BFS-visited order. The order is
    /// deterministic for a given level (BFS visits `ALL_DIRECTIONS` in a
    /// fixed order), which keeps persisted cache files (§6) stable across
    /// runs on the same level.
    pub fn build(level: &Level) -> PositionMap {
        let mut grid_to_zone = vec![None; level.cell_count()];
        let mut zone_to_grid = Vec::new();
        let mut queue = std::collections::VecDeque::new();

        let start = level.pusher_start();
        grid_to_zone[start] = Some(0);
        zone_to_grid.push(start);
        queue.push_back(start);

        while let Some(grid_idx) = queue.pop_front() {
            for &d in &ALL_DIRECTIONS {
                let Some(n) = level.neighbor(grid_idx, d) else {
                    continue;
                };
                if level.cell(n) == crate::level::Cell::Wall {
                    continue;
                }
                if grid_to_zone[n].is_some() {
                    continue;
                }
                grid_to_zone[n] = Some(zone_to_grid.len());
                zone_to_grid.push(n);
                queue.push_back(n);
            }
        }

        let mut adjacency = vec![[None; 4]; zone_to_grid.len()];
        for (z, &grid_idx) in zone_to_grid.iter().enumerate() {
            for (d_idx, &d) in ALL_DIRECTIONS.iter().enumerate() {
                if let Some(n) = level.neighbor(grid_idx, d) {
                    adjacency[z][d_idx] = grid_to_zone[n];
                }
            }
        }

        PositionMap {
            zone_to_grid,
            grid_to_zone,
            adjacency,
        }
    }

    /// Zone-index neighbor in direction `d`, or `None` off the grid or into
    /// a wall.
    pub fn neighbor_zone(&self, zone_index: usize, d: Direction) -> Option<usize> {
        let d_idx = ALL_DIRECTIONS.iter().position(|&x| x == d).unwrap();
        self.adjacency[zone_index][d_idx]
    }

    /// Number of reachable cells, i.e. the `len` every `Zone` over this
    /// level must be constructed with.
    pub fn len(&self) -> usize {
        self.zone_to_grid.len()
    }

    pub fn is_empty(&self) -> bool {
        self.zone_to_grid.is_empty()
    }

    pub fn grid_to_zone(&self, grid_index: usize) -> Option<usize> {
        self.grid_to_zone[grid_index]
    }

    pub fn zone_to_grid(&self, zone_index: usize) -> usize {
        self.zone_to_grid[zone_index]
    }

    pub fn new_zone(&self) -> Zone {
        Zone::new(self.len())
    }

    /// Builds a `Zone` from a set of grid indices, silently dropping any
    /// that are unreachable (not in the map) — callers that need strict
    /// validation should check `grid_to_zone` themselves first.
    pub fn zone_from_grid_indices(&self, grid_indices: impl IntoIterator<Item = usize>) -> Zone {
        let mut zone = self.new_zone();
        for g in grid_indices {
            if let Some(z) = self.grid_to_zone(g) {
                zone.set(z);
            }
        }
        zone
    }
}
