//! Solution reconstruction (§4.13, C13): walks parent links from a
//! solved [`crate::tree::TreeNode`] back to the root to recover the push
//! sequence, then fills in the pusher's walking steps between pushes with
//! a box-aware BFS (reusing the same connectivity [`crate::node`] flood
//! fill is built on). Encodes the result in the `U/D/L/R` (push) /
//! `u/d/l/r` (move) grammar from §6, plus a run-length "compressed" form
//! for persistence (`Path.cpp` in the original solver this crate is
//! descended from).

use crate::bits::Zone;
use crate::deadlock::PushCandidate;
use crate::level::{Direction, ALL_DIRECTIONS};
use crate::position::PositionMap;
use std::collections::VecDeque;

/// Expands a push-level path (as returned by
/// [`crate::tree::Tree::path_to_root`]) into the full move string.
pub fn reconstruct(
    positions: &PositionMap,
    initial_boxes: &Zone,
    initial_pusher_cell: usize,
    pushes: &[(PushCandidate, u32)],
) -> Option<String> {
    let mut boxes = initial_boxes.clone();
    let mut pusher = initial_pusher_cell;
    let mut out = String::new();

    for &(push, count) in pushes {
        let mut box_cell = push.box_cell;
        for _ in 0..count {
            let behind = positions.neighbor_zone(box_cell, push.direction.reverse())?;
            let walk = walk_path(positions, &boxes, pusher, behind)?;
            for d in walk {
                out.push(d.move_char());
            }
            out.push(push.direction.push_char());

            let target = positions.neighbor_zone(box_cell, push.direction)?;
            boxes.clear(box_cell);
            boxes.set(target);
            pusher = box_cell;
            box_cell = target;
        }
    }

    Some(out)
}

/// BFS from `from` to `to` over non-wall, non-box cells, returning the
/// walked directions in order, or `None` if no such path exists (which
/// would indicate a bug upstream — a push that was accepted as legal
/// implies the pusher could already reach its "behind" cell).
fn walk_path(positions: &PositionMap, boxes: &Zone, from: usize, to: usize) -> Option<Vec<Direction>> {
    if from == to {
        return Some(Vec::new());
    }
    let mut prev: Vec<Option<(usize, Direction)>> = vec![None; positions.len()];
    let mut visited = positions.new_zone();
    visited.set(from);
    let mut queue = VecDeque::new();
    queue.push_back(from);

    while let Some(c) = queue.pop_front() {
        for &d in &ALL_DIRECTIONS {
            let Some(n) = positions.neighbor_zone(c, d) else {
                continue;
            };
            if visited.get(n) || boxes.get(n) {
                continue;
            }
            visited.set(n);
            prev[n] = Some((c, d));
            if n == to {
                let mut path = vec![d];
                let mut cur = c;
                while let Some((pc, pd)) = prev[cur] {
                    path.push(pd);
                    cur = pc;
                }
                path.reverse();
                return Some(path);
            }
            queue.push_back(n);
        }
    }
    None
}

/// Run-length-encodes a move string: runs of 2+ identical characters
/// become `<count><char>`; single characters are left bare.
pub fn compress(moves: &str) -> String {
    let chars: Vec<char> = moves.chars().collect();
    let mut out = String::new();
    let mut i = 0;
    while i < chars.len() {
        let c = chars[i];
        let mut j = i + 1;
        while j < chars.len() && chars[j] == c {
            j += 1;
        }
        let run = j - i;
        if run > 1 {
            out.push_str(&run.to_string());
        }
        out.push(c);
        i = j;
    }
    out
}

pub fn decompress(compressed: &str) -> String {
    let mut out = String::new();
    let mut digits = String::new();
    for c in compressed.chars() {
        if c.is_ascii_digit() {
            digits.push(c);
        } else {
            let count: usize = if digits.is_empty() { 1 } else { digits.parse().unwrap_or(1) };
            for _ in 0..count {
                out.push(c);
            }
            digits.clear();
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::level::Level;

    #[test]
    fn test_compress_decompress_roundtrip() {
        let moves = "uuuRRRdD";
        let compressed = compress(moves);
        assert_eq!(compressed, "3u3RdD");
        assert_eq!(decompress(&compressed), moves);
    }

    #[test]
    fn test_compress_no_runs() {
        assert_eq!(compress("UDLR"), "UDLR");
        assert_eq!(decompress("UDLR"), "UDLR");
    }

    #[test]
    fn test_compress_single_run() {
        assert_eq!(compress("uuuu"), "4u");
        assert_eq!(decompress("4u"), "uuuu");
    }

    #[test]
    fn test_reconstruct_single_push() {
        let level = Level::from_text("#####\n#@$.#\n#####").unwrap();
        let positions = PositionMap::build(&level);
        let boxes = positions.zone_from_grid_indices([level.boxes()[0]]);
        let pusher = positions.grid_to_zone(level.pusher_start()).unwrap();
        let box_cell = positions.grid_to_zone(level.boxes()[0]).unwrap();

        let push = PushCandidate {
            box_cell,
            direction: Direction::Right,
            target_cell: positions.grid_to_zone(level.goals()[0]).unwrap(),
        };
        let moves = reconstruct(&positions, &boxes, pusher, &[(push, 1)]).unwrap();
        assert_eq!(moves, "R");
    }

    #[test]
    fn test_reconstruct_walk_then_push() {
        let level = Level::from_text("######\n#@   #\n#  $.#\n######").unwrap();
        let positions = PositionMap::build(&level);
        let boxes = positions.zone_from_grid_indices([level.boxes()[0]]);
        let pusher = positions.grid_to_zone(level.pusher_start()).unwrap();
        let box_cell = positions.grid_to_zone(level.boxes()[0]).unwrap();

        let push = PushCandidate {
            box_cell,
            direction: Direction::Right,
            target_cell: positions.grid_to_zone(level.goals()[0]).unwrap(),
        };
        let moves = reconstruct(&positions, &boxes, pusher, &[(push, 1)]).unwrap();
        assert!(moves.ends_with('R'));
        assert!(moves.len() > 1);
    }
}
