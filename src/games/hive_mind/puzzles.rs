//! Built-in puzzle catalog.
//!
//! Every puzzle uses the 5x5 board and lets the queen out through row 2.

use std::collections::HashSet;

use once_cell::sync::Lazy;
use serde::Serialize;

use super::board::Board;
use super::pieces::Shape;
use super::types::{Piece, PieceKind, EXIT_ROW, GRID_SIZE};

/// Immutable puzzle template.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PuzzleDefinition {
    pub id: u32,
    pub name: String,
    pub difficulty: u8,
    pub exit_row: i32,
    pub pieces: Vec<Piece>,
    pub par_moves: u32,
}

impl PuzzleDefinition {
    /// Fresh copy of the starting layout.
    pub fn load_pieces(&self) -> Vec<Piece> {
        self.pieces.clone()
    }

    /// Check the starting layout. Returns an error message or None if valid.
    pub fn validate(&self) -> Option<String> {
        let mut ids = HashSet::new();
        for piece in &self.pieces {
            if !ids.insert(piece.id.as_str()) {
                return Some(format!("duplicate piece id {}", piece.id));
            }
        }

        let queens = self.pieces.iter().filter(|p| p.is_queen()).count();
        if queens != 1 {
            return Some(format!("expected exactly one queen, found {queens}"));
        }

        let mut covered = HashSet::new();
        for piece in &self.pieces {
            for (x, y) in piece.cells() {
                if x < 0 || x >= GRID_SIZE || y < 0 || y >= GRID_SIZE {
                    return Some(format!("piece {} leaves the board at ({x},{y})", piece.id));
                }
                if !covered.insert((x, y)) {
                    return Some(format!("piece {} overlaps at ({x},{y})", piece.id));
                }
            }
        }

        let board = Board::standard(&self.pieces);
        if board.occupied_count() != covered.len() {
            return Some("occupancy does not match piece cells".into());
        }
        if self.exit_row < 0 || self.exit_row >= GRID_SIZE {
            return Some(format!("exit row {} is off the board", self.exit_row));
        }
        None
    }
}

fn piece(id: &str, kind: PieceKind, shape: Shape, x: i32, y: i32) -> Piece {
    Piece::new(id, kind, shape, x, y)
}

fn puzzle(id: u32, name: &str, difficulty: u8, pieces: Vec<Piece>, par_moves: u32) -> PuzzleDefinition {
    PuzzleDefinition {
        id,
        name: name.into(),
        difficulty,
        exit_row: EXIT_ROW,
        pieces,
        par_moves,
    }
}

pub static PUZZLES: Lazy<Vec<PuzzleDefinition>> = Lazy::new(|| {
    use PieceKind::*;
    use Shape::*;

    vec![
        puzzle(
            1,
            "First Steps",
            1,
            vec![
                piece("queen", Queen, Horizontal2, 0, 2),
                piece("w1", Worker, Vertical2, 2, 1),
            ],
            3,
        ),
        puzzle(
            2,
            "Turn Around",
            1,
            vec![
                piece("queen", Queen, Horizontal2, 0, 2),
                piece("w1", Worker, Horizontal2, 2, 2),
                piece("w2", Worker, Vertical2, 4, 1),
            ],
            5,
        ),
        puzzle(
            3,
            "Corner Block",
            2,
            vec![
                piece("queen", Queen, Horizontal2, 0, 2),
                piece("h1", Honey, L0, 2, 2),
                piece("w1", Worker, Vertical2, 4, 2),
            ],
            6,
        ),
        puzzle(
            4,
            "Traffic Jam",
            2,
            vec![
                piece("queen", Queen, Horizontal2, 1, 2),
                piece("w1", Worker, Vertical2, 0, 1),
                piece("w2", Worker, Vertical2, 3, 1),
                piece("w3", Worker, Vertical2, 3, 3),
                piece("l1", Larva, Horizontal3, 0, 0),
            ],
            8,
        ),
        // h2 sits one row lower than the layout it was drawn from, which had
        // it sharing (3,2) with h1.
        puzzle(
            5,
            "Twist and Shout",
            3,
            vec![
                piece("queen", Queen, Horizontal2, 0, 2),
                piece("h1", Honey, L180, 2, 1),
                piece("h2", Honey, L0, 3, 3),
                piece("w1", Worker, Vertical2, 1, 0),
                piece("w2", Worker, Horizontal2, 0, 4),
            ],
            12,
        ),
    ]
});

pub fn puzzle_by_id(id: u32) -> Option<&'static PuzzleDefinition> {
    PUZZLES.iter().find(|p| p.id == id)
}

pub fn first_puzzle() -> &'static PuzzleDefinition {
    &PUZZLES[0]
}

/// The puzzle after `current_id`, wrapping back to the first. Unknown ids
/// start over at the first puzzle.
pub fn next_puzzle(current_id: u32) -> &'static PuzzleDefinition {
    match PUZZLES.iter().position(|p| p.id == current_id) {
        Some(index) if index + 1 < PUZZLES.len() => &PUZZLES[index + 1],
        _ => first_puzzle(),
    }
}
