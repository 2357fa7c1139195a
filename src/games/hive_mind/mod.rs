//! Hive Mind: a 5x5 sliding-block puzzle where the queen must leave through
//! the exit row.

pub mod board;
pub mod pieces;
pub mod puzzles;
pub mod solver;
pub mod types;
