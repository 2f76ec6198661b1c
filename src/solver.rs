//! Public entry point (§6): wires the thirteen components together into a
//! single `solve()` call, following the teacher's `Solver`/`SolverOpts`
//! shape (a struct of feature-toggle flags plus a node budget, a
//! `SolveResult`-style status enum, tests built around a
//! `parse_level`/`solve_level` pair of helpers).

use crate::astar::BoundedSearch;
use crate::cache::CacheDir;
use crate::costtable::CostTable;
use crate::deadlock::StaticDeadlockZone;
use crate::error::SolverError;
use crate::heuristic::{HungarianHeuristic, PenaltyLookup};
use crate::ida::{self, IdaStatus};
use crate::level::Level;
use crate::node::Node;
use crate::penalty::{self, PenaltyDatabase, PenaltyOptions};
use crate::position::PositionMap;
use crate::solution;
use std::path::PathBuf;
use std::time::{Duration, Instant};

/// Resource limits for a single solve (§6): `node_budget` and
/// `max_ida_iterations` bound the search's time; `max_ram_mib`,
/// `open_table_cap`, and `close_table_cap` bound its space. Exceeding any
/// of the five before a solution or a proof of unsolvability surfaces as
/// `SolveStatus::StuckIteration` (§6's "resource exhausted").
#[derive(Debug, Clone, Copy)]
pub struct Limits {
    pub node_budget: u64,
    pub max_ida_iterations: u32,
    pub max_ram_mib: u64,
    pub open_table_cap: usize,
    pub close_table_cap: usize,
}

impl Default for Limits {
    fn default() -> Self {
        Limits {
            node_budget: 500_000,
            max_ida_iterations: 10_000,
            max_ram_mib: 1024,
            open_table_cap: 2_000_000,
            close_table_cap: 2_000_000,
        }
    }
}

/// Feature toggles (§9 Open Question 1 gates `macro_pushes` here).
#[derive(Debug, Clone)]
pub struct Options {
    pub macro_pushes: bool,
    pub use_penalties: bool,
    pub penalty_options: PenaltyOptions,
    /// Root directory for persisted cache files; `None` disables caching.
    pub cache_dir: Option<PathBuf>,
}

impl Default for Options {
    fn default() -> Self {
        Options {
            macro_pushes: true,
            use_penalties: true,
            penalty_options: PenaltyOptions::default(),
            cache_dir: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SolveStatus {
    Solved { moves: String, compressed: String },
    Unsolvable,
    /// Search gave up inconclusively — neither a solution nor a proof of
    /// unsolvability (§7's `stuck_iteration` / node budget exhaustion).
    StuckIteration,
}

#[derive(Debug, Clone)]
pub struct SolveOutcome {
    pub status: SolveStatus,
    pub iterations: u32,
    pub nodes_expanded: u64,
    pub elapsed: Duration,
}

/// Solves `level` for an optimal push sequence, honoring `limits` and
/// `options`. Returns `Err` only for `InvalidLevel`-class failures
/// surfaced before search begins (§7); `unsolvable` and inconclusive
/// search outcomes are `Ok(SolveOutcome)` with the matching `status`.
pub fn solve(level: &Level, limits: Limits, options: &Options) -> Result<SolveOutcome, SolverError> {
    let start = Instant::now();
    let positions = PositionMap::build(level);
    let cache = options.cache_dir.as_ref().map(|root| CacheDir::new(root, level));

    let costs = match cache.as_ref().and_then(|c| c.load_cost_table()) {
        Some(table) => {
            log::debug!("solver: loaded cost table from cache");
            table
        }
        None => {
            let table = CostTable::build(&positions);
            if let Some(c) = &cache {
                if let Err(err) = c.save_cost_table(&table) {
                    log::warn!("solver: failed to persist cost table: {err}");
                }
            }
            table
        }
    };

    let goals: Vec<usize> = level
        .goals()
        .iter()
        .map(|&g| {
            positions
                .grid_to_zone(g)
                .ok_or_else(|| SolverError::InvalidLevel(format!("goal at grid index {g} is unreachable")))
        })
        .collect::<Result<_, _>>()?;
    let box_cells: Vec<usize> = level
        .boxes()
        .iter()
        .map(|&b| {
            positions
                .grid_to_zone(b)
                .ok_or_else(|| SolverError::InvalidLevel(format!("box at grid index {b} is unreachable")))
        })
        .collect::<Result<_, _>>()?;

    if box_cells.len() != goals.len() {
        return Err(SolverError::InvalidLevel(format!(
            "box count {} does not match goal count {}",
            box_cells.len(),
            goals.len()
        )));
    }

    let statics = StaticDeadlockZone::build(&positions, &costs, &goals);

    let penalties = if options.use_penalties {
        match cache.as_ref().and_then(|c| c.load_penalty_database()) {
            Some(db) => {
                log::debug!("solver: loaded {} penalties from cache", db.len());
                db
            }
            None => {
                let seeds = cache.as_ref().map(|c| c.load_deductive_seeds()).unwrap_or_default();
                let db = penalty::discover(&positions, &statics, &costs, &goals, &seeds, &options.penalty_options);
                log::info!("solver: discovered {} penalties", db.len());
                if let Some(c) = &cache {
                    if let Err(err) = c.save_penalty_database(&db) {
                        log::warn!("solver: failed to persist penalty database: {err}");
                    }
                }
                db
            }
        }
    } else {
        PenaltyDatabase::new()
    };

    let (status, iterations, nodes_expanded) = run_search(
        &positions,
        &statics,
        &costs,
        &goals,
        &box_cells,
        level.pusher_start(),
        limits,
        options,
        &penalties,
        &cache,
    )?;

    Ok(SolveOutcome {
        status,
        iterations,
        nodes_expanded,
        elapsed: start.elapsed(),
    })
}

#[allow(clippy::too_many_arguments)]
fn run_search(
    positions: &PositionMap,
    statics: &StaticDeadlockZone,
    costs: &CostTable,
    goals: &[usize],
    box_cells: &[usize],
    pusher_start_grid: usize,
    limits: Limits,
    options: &Options,
    penalties: &impl PenaltyLookup,
    cache: &Option<CacheDir>,
) -> Result<(SolveStatus, u32, u64), SolverError> {
    let heuristic = HungarianHeuristic::new(costs, goals.to_vec(), penalties);
    let boxes = positions.zone_from_grid_indices(box_cells.iter().copied());
    let pusher_seed = positions
        .grid_to_zone(pusher_start_grid)
        .ok_or_else(|| SolverError::InvalidLevel("pusher start is unreachable".into()))?;
    let root = Node::canonicalize(positions, boxes.clone(), pusher_seed);
    let goal_zone = positions.zone_from_grid_indices(goals.iter().copied());

    let search = BoundedSearch {
        positions,
        statics,
        goals,
        goal_zone: &goal_zone,
        macro_pushes: options.macro_pushes,
        node_budget: limits.node_budget,
        max_ram_mib: limits.max_ram_mib,
        open_table_cap: limits.open_table_cap,
        close_table_cap: limits.close_table_cap,
    };

    let initial_limit = cache.as_ref().and_then(|c| c.load_ida_cost()).unwrap_or(0);
    let outcome = ida::solve(&search, &heuristic, root, initial_limit, limits.max_ida_iterations);

    if let Some(c) = cache {
        if let Err(err) = c.save_ida_cost(outcome.final_cost_limit) {
            log::warn!("solver: failed to persist ida cost bound: {err}");
        }
    }

    let iterations = outcome.iterations;
    let nodes_expanded = outcome.nodes_expanded;
    let status = match outcome.status {
        IdaStatus::Solved => {
            let id = outcome.solved_id.expect("Solved status implies solved_id");
            let pushes = outcome.tree.path_to_root(id);
            let moves = solution::reconstruct(positions, &boxes, pusher_seed, &pushes)
                .ok_or_else(|| SolverError::InvalidLevel("solved path could not be walked".into()))?;
            let compressed = solution::compress(&moves);
            if let Some(c) = cache {
                if let Err(err) = c.save_solution(&compressed) {
                    log::warn!("solver: failed to persist solution: {err}");
                }
            }
            SolveStatus::Solved { moves, compressed }
        }
        IdaStatus::Unsolvable => SolveStatus::Unsolvable,
        IdaStatus::StuckIteration => SolveStatus::StuckIteration,
    };
    Ok((status, iterations, nodes_expanded))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn solve_level(text: &str) -> SolveOutcome {
        let level = Level::from_text(text).unwrap();
        solve(&level, Limits::default(), &Options::default()).unwrap()
    }

    #[test]
    fn test_solve_simple() {
        let outcome = solve_level("#####\n#@$.#\n#####");
        match outcome.status {
            SolveStatus::Solved { moves, .. } => assert_eq!(moves, "R"),
            other => panic!("expected Solved, got {other:?}"),
        }
    }

    #[test]
    fn test_solve_two_moves() {
        let outcome = solve_level("######\n#@$ .#\n######");
        match outcome.status {
            SolveStatus::Solved { moves, .. } => assert_eq!(moves.chars().filter(|c| c.is_uppercase()).count(), 2),
            other => panic!("expected Solved, got {other:?}"),
        }
    }

    #[test]
    fn test_solve_unsolvable() {
        let outcome = solve_level("#####\n#@  #\n#$ .#\n#####");
        assert_eq!(outcome.status, SolveStatus::Unsolvable);
    }

    #[test]
    fn test_mismatched_box_goal_count_is_rejected_at_parse() {
        let result = Level::from_text("######\n#@$$.#\n######");
        assert!(result.is_err());
    }

    #[test]
    fn test_zero_ram_budget_yields_stuck_iteration() {
        let level = Level::from_text("#####\n#@$.#\n#####").unwrap();
        let limits = Limits { max_ram_mib: 0, ..Limits::default() };
        let outcome = solve(&level, limits, &Options::default()).unwrap();
        assert_eq!(outcome.status, SolveStatus::StuckIteration);
    }

    #[test]
    fn test_zero_open_table_cap_yields_stuck_iteration() {
        let level = Level::from_text("#####\n#@$.#\n#####").unwrap();
        let limits = Limits { open_table_cap: 0, ..Limits::default() };
        let outcome = solve(&level, limits, &Options::default()).unwrap();
        assert_eq!(outcome.status, SolveStatus::StuckIteration);
    }

    #[test]
    fn test_disabling_macro_pushes_still_solves() {
        let level = Level::from_text("#######\n#@$  .#\n#######").unwrap();
        let options = Options {
            macro_pushes: false,
            use_penalties: false,
            ..Options::default()
        };
        let outcome = solve(&level, Limits::default(), &options).unwrap();
        assert!(matches!(outcome.status, SolveStatus::Solved { .. }));
    }
}
