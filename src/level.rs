//! The abstract level input (§3, §6). Parsing a level from text is kept
//! here as a convenience for tests and the CLI; the persisted multi-level
//! "pack" format is explicitly out of scope (§1) and lives outside this
//! crate.

use crate::error::SolverError;
use std::fmt;

/// One grid cell, per the §3 cell-code enumeration. `Outside` cells are
/// floor-shaped cells that the flood fill in [`crate::position`] never
/// reaches (e.g. floor behind a sealed-off wall) and are dropped from the
/// zone entirely.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Cell {
    Wall,
    Floor,
    Goal,
}

/// A parsed, validated Sokoban level: a rectangular grid plus box and goal
/// positions and the pusher's starting cell.
#[derive(Debug, Clone)]
pub struct Level {
    width: usize,
    height: usize,
    cells: Vec<Cell>,
    boxes: Vec<usize>,
    goals: Vec<usize>,
    pusher_start: usize,
}

impl Level {
    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn cell(&self, grid_index: usize) -> Cell {
        self.cells[grid_index]
    }

    pub fn cell_count(&self) -> usize {
        self.cells.len()
    }

    pub fn index_of(&self, x: usize, y: usize) -> usize {
        y * self.width + x
    }

    pub fn xy_of(&self, grid_index: usize) -> (usize, usize) {
        (grid_index % self.width, grid_index / self.width)
    }

    pub fn boxes(&self) -> &[usize] {
        &self.boxes
    }

    pub fn goals(&self) -> &[usize] {
        &self.goals
    }

    pub fn pusher_start(&self) -> usize {
        self.pusher_start
    }

    /// Neighboring grid index in direction `d`, or `None` off the grid.
    pub fn neighbor(&self, grid_index: usize, d: Direction) -> Option<usize> {
        let (x, y) = self.xy_of(grid_index);
        let (dx, dy) = d.delta();
        let nx = x as isize + dx;
        let ny = y as isize + dy;
        if nx < 0 || ny < 0 || nx as usize >= self.width || ny as usize >= self.height {
            return None;
        }
        Some(self.index_of(nx as usize, ny as usize))
    }

    /// Parse the `#`/` `/`.`/`$`/`@`/`*`/`+` text format (§3, shared with
    /// the teacher repo's `Game::from_text`).
    pub fn from_text(text: &str) -> Result<Level, SolverError> {
        let lines: Vec<&str> = text.lines().collect();
        if lines.is_empty() {
            return Err(SolverError::InvalidLevel("empty level".into()));
        }

        let width = lines.iter().map(|l| l.len()).max().unwrap_or(0);
        let height = lines.len();
        let mut cells = vec![Cell::Floor; width * height];
        let mut boxes = Vec::new();
        let mut goals = Vec::new();
        let mut pusher_start = None;

        for (y, line) in lines.iter().enumerate() {
            for (x, ch) in line.chars().enumerate() {
                let idx = y * width + x;
                match ch {
                    '#' => cells[idx] = Cell::Wall,
                    ' ' => cells[idx] = Cell::Floor,
                    '.' => {
                        cells[idx] = Cell::Goal;
                        goals.push(idx);
                    }
                    '$' => {
                        cells[idx] = Cell::Floor;
                        boxes.push(idx);
                    }
                    '*' => {
                        cells[idx] = Cell::Goal;
                        goals.push(idx);
                        boxes.push(idx);
                    }
                    '@' => {
                        cells[idx] = Cell::Floor;
                        if pusher_start.replace(idx).is_some() {
                            return Err(SolverError::InvalidLevel("multiple pushers".into()));
                        }
                    }
                    '+' => {
                        cells[idx] = Cell::Goal;
                        goals.push(idx);
                        if pusher_start.replace(idx).is_some() {
                            return Err(SolverError::InvalidLevel("multiple pushers".into()));
                        }
                    }
                    _ => {
                        return Err(SolverError::InvalidLevel(format!(
                            "invalid character '{ch}' at ({x}, {y})"
                        )));
                    }
                }
            }
        }

        let pusher_start = pusher_start.ok_or_else(|| SolverError::InvalidLevel("no pusher".into()))?;

        if boxes.len() != goals.len() {
            return Err(SolverError::InvalidLevel(format!(
                "box count ({}) does not match goal count ({})",
                boxes.len(),
                goals.len()
            )));
        }

        Ok(Level {
            width,
            height,
            cells,
            boxes,
            goals,
            pusher_start,
        })
    }
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for y in 0..self.height {
            let mut line = String::with_capacity(self.width);
            for x in 0..self.width {
                let idx = self.index_of(x, y);
                let has_box = self.boxes.contains(&idx);
                let is_pusher = idx == self.pusher_start;
                let ch = match (self.cells[idx], has_box, is_pusher) {
                    (Cell::Wall, _, _) => '#',
                    (Cell::Goal, true, _) => '*',
                    (_, true, _) => '$',
                    (Cell::Goal, false, true) => '+',
                    (_, false, true) => '@',
                    (Cell::Goal, false, false) => '.',
                    (Cell::Floor, false, false) => ' ',
                };
                line.push(ch);
            }
            writeln!(f, "{}", line.trim_end())?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    Up,
    Down,
    Left,
    Right,
}

pub const ALL_DIRECTIONS: [Direction; 4] = [
    Direction::Up,
    Direction::Down,
    Direction::Left,
    Direction::Right,
];

impl Direction {
    pub fn delta(self) -> (isize, isize) {
        match self {
            Direction::Up => (0, -1),
            Direction::Down => (0, 1),
            Direction::Left => (-1, 0),
            Direction::Right => (1, 0),
        }
    }

    pub fn reverse(self) -> Direction {
        match self {
            Direction::Up => Direction::Down,
            Direction::Down => Direction::Up,
            Direction::Left => Direction::Right,
            Direction::Right => Direction::Left,
        }
    }

    /// Uppercase push letter, per §6's move grammar.
    pub fn push_char(self) -> char {
        match self {
            Direction::Up => 'U',
            Direction::Down => 'D',
            Direction::Left => 'L',
            Direction::Right => 'R',
        }
    }

    /// Lowercase move (no push) letter.
    pub fn move_char(self) -> char {
        self.push_char().to_ascii_lowercase()
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.push_char())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_basic() {
        let level = Level::from_text("#####\n#@$.#\n#####").unwrap();
        assert_eq!(level.width(), 5);
        assert_eq!(level.height(), 3);
        assert_eq!(level.boxes().len(), 1);
        assert_eq!(level.goals().len(), 1);
    }

    #[test]
    fn test_box_goal_mismatch() {
        assert!(Level::from_text("####\n#$$#\n#.@#\n####").is_err());
    }

    #[test]
    fn test_no_pusher() {
        assert!(Level::from_text("####\n#  #\n####").is_err());
    }

    #[test]
    fn test_display_roundtrip() {
        let input = "#####\n#@$.#\n#####";
        let level = Level::from_text(input).unwrap();
        assert_eq!(level.to_string().trim_end(), input);
    }
}
