//! Domain types for Hive Mind.

use serde::{Deserialize, Serialize};

use super::pieces::Shape;

/// Board edge length. The board is always square.
pub const GRID_SIZE: i32 = 5;

/// Row through which the queen leaves the board in every built-in puzzle.
pub const EXIT_ROW: i32 = 2;

/// Piece category. Categories share the same physics; only the queen may
/// leave through the right edge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PieceKind {
    Queen,
    Worker,
    Larva,
    Honey,
}

/// A piece on the board. Serialized as `{id, type, shapeName, x, y}`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Piece {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: PieceKind,
    #[serde(rename = "shapeName")]
    pub shape: Shape,
    pub x: i32,
    pub y: i32,
}

impl Piece {
    pub fn new(id: impl Into<String>, kind: PieceKind, shape: Shape, x: i32, y: i32) -> Self {
        Self {
            id: id.into(),
            kind,
            shape,
            x,
            y,
        }
    }

    /// Absolute cells covered by this piece.
    pub fn cells(&self) -> impl Iterator<Item = (i32, i32)> + '_ {
        self.shape
            .cells()
            .iter()
            .map(move |&(dx, dy)| (self.x + dx, self.y + dy))
    }

    pub fn is_queen(&self) -> bool {
        self.kind == PieceKind::Queen
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
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
    /// Unit step as (dx, dy); y grows downwards.
    pub fn delta(self) -> (i32, i32) {
        match self {
            Direction::Up => (0, -1),
            Direction::Down => (0, 1),
            Direction::Left => (-1, 0),
            Direction::Right => (1, 0),
        }
    }
}

/// A single player move, as recorded by the solver.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase", rename_all_fields = "camelCase")]
pub enum Move {
    Slide { piece_id: String, direction: Direction },
    Rotate { piece_id: String },
}

impl Move {
    pub fn piece_id(&self) -> &str {
        match self {
            Move::Slide { piece_id, .. } | Move::Rotate { piece_id } => piece_id,
        }
    }
}
