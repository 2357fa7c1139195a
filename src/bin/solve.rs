//! Solve CLI: find optimal move sequences for the built-in puzzles.
//!
//! Usage:
//!   cargo run --release --bin solve
//!   cargo run --release --bin solve -- --puzzle 3 --show-moves
//!   cargo run --release --bin solve -- --json

use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Instant;

use clap::Parser;
use rayon::prelude::*;
use serde::Serialize;

use hive_mind_engine::games::hive_mind::puzzles::{puzzle_by_id, PuzzleDefinition, PUZZLES};
use hive_mind_engine::games::hive_mind::solver::{solve_puzzle, Solution, SolverParams};
use hive_mind_engine::games::hive_mind::types::Move;

#[derive(Parser)]
#[command(name = "solve", about = "Find optimal solutions for Hive Mind puzzles")]
struct Cli {
    /// Solve only this puzzle id (default: all)
    #[arg(long)]
    puzzle: Option<u32>,

    /// Give up on a puzzle after exploring this many states
    #[arg(long, default_value = "250000")]
    max_states: usize,

    /// Print every move of each solution
    #[arg(long)]
    show_moves: bool,

    /// Emit results as JSON instead of a table
    #[arg(long)]
    json: bool,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct Report {
    puzzle_id: u32,
    name: String,
    par_moves: u32,
    optimal_moves: Option<usize>,
    states_explored: Option<usize>,
    elapsed_ms: f64,
    moves: Vec<Move>,
}

fn report(puzzle: &PuzzleDefinition, solution: Option<Solution>, elapsed_ms: f64) -> Report {
    Report {
        puzzle_id: puzzle.id,
        name: puzzle.name.clone(),
        par_moves: puzzle.par_moves,
        optimal_moves: solution.as_ref().map(|s| s.move_count()),
        states_explored: solution.as_ref().map(|s| s.states_explored),
        elapsed_ms,
        moves: solution.map(|s| s.moves).unwrap_or_default(),
    }
}

fn describe(mv: &Move) -> String {
    match mv {
        Move::Slide { piece_id, direction } => format!("slide {} {:?}", piece_id, direction),
        Move::Rotate { piece_id } => format!("rotate {}", piece_id),
    }
}

fn main() {
    let cli = Cli::parse();

    let targets: Vec<&PuzzleDefinition> = match cli.puzzle {
        Some(id) => match puzzle_by_id(id) {
            Some(p) => vec![p],
            None => {
                eprintln!("Error: no puzzle with id {}", id);
                eprintln!("Available puzzles: {:?}", PUZZLES.iter().map(|p| p.id).collect::<Vec<_>>());
                std::process::exit(1);
            }
        },
        None => PUZZLES.iter().collect(),
    };

    let params = SolverParams {
        max_states: cli.max_states,
    };
    let done = AtomicUsize::new(0);
    let total = targets.len();

    let mut reports: Vec<Report> = targets
        .par_iter()
        .map(|puzzle| {
            let start = Instant::now();
            let solution = solve_puzzle(puzzle, &params);
            let elapsed_ms = start.elapsed().as_secs_f64() * 1000.0;
            let n = done.fetch_add(1, Ordering::Relaxed) + 1;
            eprint!("\r  solved {}/{}", n, total);
            report(puzzle, solution, elapsed_ms)
        })
        .collect();
    eprintln!("\r                    ");
    reports.sort_by_key(|r| r.puzzle_id);

    if cli.json {
        match serde_json::to_string_pretty(&reports) {
            Ok(text) => println!("{}", text),
            Err(e) => {
                eprintln!("Error encoding results: {}", e);
                std::process::exit(1);
            }
        }
        return;
    }

    println!("{:>3}  {:<18} {:>4} {:>8} {:>9} {:>9}", "id", "name", "par", "optimal", "states", "ms");
    for r in &reports {
        let optimal = r
            .optimal_moves
            .map(|m| m.to_string())
            .unwrap_or_else(|| "-".into());
        let states = r
            .states_explored
            .map(|s| s.to_string())
            .unwrap_or_else(|| "-".into());
        println!(
            "{:>3}  {:<18} {:>4} {:>8} {:>9} {:>9.1}",
            r.puzzle_id, r.name, r.par_moves, optimal, states, r.elapsed_ms
        );
        if cli.show_moves {
            for (i, mv) in r.moves.iter().enumerate() {
                println!("       {:>2}. {}", i + 1, describe(mv));
            }
        }
    }

    if reports.iter().any(|r| r.optimal_moves.is_none()) {
        eprintln!("Some puzzles were not solved within {} states", cli.max_states);
        std::process::exit(2);
    }
}
