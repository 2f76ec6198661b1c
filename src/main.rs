use clap::Parser;
use pushida::level::Level;
use pushida::solver::{self, Limits, Options, SolveStatus};
use std::path::PathBuf;
use std::time::Instant;

#[derive(Parser)]
#[command(name = "pushida")]
#[command(about = "An optimal-push Sokoban solver", long_about = None)]
struct Args {
    /// Path to a single XSB-format level file
    #[arg(value_name = "FILE")]
    level_file: PathBuf,

    /// Print the solution step-by-step
    #[arg(short, long)]
    print_solution: bool,

    /// Maximum number of nodes to explore per IDA* iteration before giving up
    #[arg(short = 'n', long, default_value = "500000")]
    max_nodes: u64,

    /// Maximum number of IDA* cost-bound raises before giving up
    #[arg(long, default_value = "10000")]
    max_iterations: u32,

    /// Disable macro-push successor generation
    #[arg(long, default_value = "false")]
    no_macro_pushes: bool,

    /// Disable the penalty-engine heuristic correction
    #[arg(long, default_value = "false")]
    no_penalties: bool,

    /// Directory for persisted cache files (cost table, penalties, etc.);
    /// omit to disable caching entirely
    #[arg(long, value_name = "DIR")]
    cache_dir: Option<PathBuf>,
}

fn print_solution(level: &Level, moves: &str) {
    println!("\nStarting position:\n{level}");
    let mut step = 0;
    let total = moves.chars().filter(|c| c.is_ascii_uppercase()).count();
    for c in moves.chars() {
        if c.is_ascii_uppercase() {
            step += 1;
            println!("push {step}/{total}: {c}");
        }
    }
}

fn main() {
    env_logger::init();
    let args = Args::parse();

    let text = match std::fs::read_to_string(&args.level_file) {
        Ok(text) => text,
        Err(err) => {
            eprintln!("error reading {}: {err}", args.level_file.display());
            std::process::exit(1);
        }
    };

    let level = match Level::from_text(&text) {
        Ok(level) => level,
        Err(err) => {
            eprintln!("invalid level: {err}");
            std::process::exit(1);
        }
    };

    let limits = Limits {
        node_budget: args.max_nodes,
        max_ida_iterations: args.max_iterations,
        ..Limits::default()
    };
    let options = Options {
        macro_pushes: !args.no_macro_pushes,
        use_penalties: !args.no_penalties,
        cache_dir: args.cache_dir,
        ..Options::default()
    };

    let start = Instant::now();
    let outcome = match solver::solve(&level, limits, &options) {
        Ok(outcome) => outcome,
        Err(err) => {
            eprintln!("solve failed: {err}");
            std::process::exit(1);
        }
    };
    let elapsed_ms = start.elapsed().as_millis();

    let (solved_char, steps) = match &outcome.status {
        SolveStatus::Solved { moves, .. } => ('Y', moves.chars().filter(|c| c.is_ascii_uppercase()).count()),
        SolveStatus::Unsolvable => ('X', 0),
        SolveStatus::StuckIteration => ('N', 0),
    };

    println!(
        "level: {:<30}  solved: {}  steps: {:<5}  states: {:<12}  elapsed: {} ms",
        args.level_file.display(),
        solved_char,
        steps,
        outcome.nodes_expanded,
        elapsed_ms
    );

    if args.print_solution {
        if let SolveStatus::Solved { moves, .. } = &outcome.status {
            print_solution(&level, moves);
        }
    }
}
