//! Goal-cost table (§4.6, C6): the `Z x Z` matrix of minimum single-box
//! push distances between every pair of reachable cells, built once per
//! level from [`crate::dijkstra`] and persisted to disk (§6) so repeat
//! solves of the same level skip the `O(Z^2)` precomputation.

use crate::dijkstra::PushDistances;
use crate::position::PositionMap;

/// `Z x Z` table of `from -> to` single-box push distances. `None` means
/// no push sequence connects the two cells in isolation (and therefore,
/// a fortiori, with other boxes on the board).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CostTable {
    z: usize,
    costs: Vec<Option<u32>>,
}

const UNREACHABLE: u32 = u32::MAX;

impl CostTable {
    pub fn build(positions: &PositionMap) -> CostTable {
        let z = positions.len();
        let mut costs = vec![None; z * z];
        for from in 0..z {
            let dists = PushDistances::compute(positions, from);
            for to in 0..z {
                costs[from * z + to] = dists.distance_to(to);
            }
        }
        CostTable { z, costs }
    }

    pub fn cost(&self, from: usize, to: usize) -> Option<u32> {
        self.costs[from * self.z + to]
    }

    /// Cost matrix restricted to a specific set of box cells (rows) and
    /// goal cells (columns), in the order given — the shape the Hungarian
    /// assignment (§4.7) consumes.
    pub fn sub_matrix(&self, boxes: &[usize], goals: &[usize]) -> Vec<Vec<u32>> {
        boxes
            .iter()
            .map(|&b| {
                goals
                    .iter()
                    .map(|&g| self.cost(b, g).unwrap_or(UNREACHABLE))
                    .collect()
            })
            .collect()
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(8 + self.costs.len() * 4);
        out.extend_from_slice(&(self.z as u64).to_le_bytes());
        for c in &self.costs {
            out.extend_from_slice(&c.unwrap_or(UNREACHABLE).to_le_bytes());
        }
        out
    }

    pub fn from_bytes(bytes: &[u8]) -> Option<CostTable> {
        if bytes.len() < 8 {
            return None;
        }
        let z = u64::from_le_bytes(bytes[0..8].try_into().ok()?) as usize;
        if bytes.len() != 8 + z * z * 4 {
            return None;
        }
        let mut costs = Vec::with_capacity(z * z);
        for i in 0..z * z {
            let start = 8 + i * 4;
            let raw = u32::from_le_bytes(bytes[start..start + 4].try_into().ok()?);
            costs.push(if raw == UNREACHABLE { None } else { Some(raw) });
        }
        Some(CostTable { z, costs })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::level::Level;

    #[test]
    fn test_corridor_costs() {
        let level = Level::from_text("########\n#@$   .#\n########").unwrap();
        let positions = PositionMap::build(&level);
        let table = CostTable::build(&positions);

        let start = positions.grid_to_zone(level.boxes()[0]).unwrap();
        let far = positions.grid_to_zone(level.index_of(5, 1)).unwrap();
        assert_eq!(table.cost(start, far), Some(3));
        assert_eq!(table.cost(start, start), Some(0));
    }

    #[test]
    fn test_roundtrip_bytes() {
        let level = Level::from_text("#####\n#@$.#\n#####").unwrap();
        let positions = PositionMap::build(&level);
        let table = CostTable::build(&positions);
        let bytes = table.to_bytes();
        let back = CostTable::from_bytes(&bytes).unwrap();
        assert_eq!(table, back);
    }

    #[test]
    fn test_sub_matrix_shape() {
        let level = Level::from_text("#####\n#@$.#\n#####").unwrap();
        let positions = PositionMap::build(&level);
        let table = CostTable::build(&positions);
        let boxes: Vec<usize> = level.boxes().iter().map(|&g| positions.grid_to_zone(g).unwrap()).collect();
        let goals: Vec<usize> = level.goals().iter().map(|&g| positions.grid_to_zone(g).unwrap()).collect();
        let matrix = table.sub_matrix(&boxes, &goals);
        assert_eq!(matrix.len(), boxes.len());
        assert_eq!(matrix[0].len(), goals.len());
    }
}
