//! Shape catalog: footprints and rotation successors for all 8 shapes.
//!
//! Line shapes alternate between horizontal and vertical of the same length.
//! L-shapes cycle 0 → 90 → 180 → 270 → 0.

use serde::{Deserialize, Serialize};

/// A relative cell offset (dx, dy) from a piece origin.
pub type Offset = (i32, i32);

/// Shape identifier. Serialized with the names clients already use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Shape {
    #[serde(rename = "HORIZONTAL_2")]
    Horizontal2,
    #[serde(rename = "VERTICAL_2")]
    Vertical2,
    #[serde(rename = "HORIZONTAL_3")]
    Horizontal3,
    #[serde(rename = "VERTICAL_3")]
    Vertical3,
    /// ┘
    #[serde(rename = "L_SHAPE_0")]
    L0,
    /// └
    #[serde(rename = "L_SHAPE_90")]
    L90,
    /// ┌
    #[serde(rename = "L_SHAPE_180")]
    L180,
    /// ┐
    #[serde(rename = "L_SHAPE_270")]
    L270,
}

pub const ALL_SHAPES: [Shape; 8] = [
    Shape::Horizontal2,
    Shape::Vertical2,
    Shape::Horizontal3,
    Shape::Vertical3,
    Shape::L0,
    Shape::L90,
    Shape::L180,
    Shape::L270,
];

const HORIZONTAL_2: [Offset; 2] = [(0, 0), (1, 0)];
const VERTICAL_2: [Offset; 2] = [(0, 0), (0, 1)];
const HORIZONTAL_3: [Offset; 3] = [(0, 0), (1, 0), (2, 0)];
const VERTICAL_3: [Offset; 3] = [(0, 0), (0, 1), (0, 2)];
const L_SHAPE_0: [Offset; 3] = [(0, 0), (0, 1), (1, 1)];
const L_SHAPE_90: [Offset; 3] = [(0, 0), (1, 0), (0, 1)];
const L_SHAPE_180: [Offset; 3] = [(0, 0), (1, 0), (1, 1)];
const L_SHAPE_270: [Offset; 3] = [(1, 0), (0, 1), (1, 1)];

impl Shape {
    /// Occupied offsets relative to the piece origin.
    pub fn cells(self) -> &'static [Offset] {
        match self {
            Shape::Horizontal2 => &HORIZONTAL_2,
            Shape::Vertical2 => &VERTICAL_2,
            Shape::Horizontal3 => &HORIZONTAL_3,
            Shape::Vertical3 => &VERTICAL_3,
            Shape::L0 => &L_SHAPE_0,
            Shape::L90 => &L_SHAPE_90,
            Shape::L180 => &L_SHAPE_180,
            Shape::L270 => &L_SHAPE_270,
        }
    }

    /// Bounding box as (width, height).
    pub fn size(self) -> (i32, i32) {
        match self {
            Shape::Horizontal2 => (2, 1),
            Shape::Vertical2 => (1, 2),
            Shape::Horizontal3 => (3, 1),
            Shape::Vertical3 => (1, 3),
            Shape::L0 | Shape::L90 | Shape::L180 | Shape::L270 => (2, 2),
        }
    }

    /// Shape after one clockwise rotation. `None` means the shape cannot
    /// rotate; every shape in the current catalog has a successor.
    pub fn rotated(self) -> Option<Shape> {
        Some(match self {
            Shape::Horizontal2 => Shape::Vertical2,
            Shape::Vertical2 => Shape::Horizontal2,
            Shape::Horizontal3 => Shape::Vertical3,
            Shape::Vertical3 => Shape::Horizontal3,
            Shape::L0 => Shape::L90,
            Shape::L90 => Shape::L180,
            Shape::L180 => Shape::L270,
            Shape::L270 => Shape::L0,
        })
    }

    pub fn is_line(self) -> bool {
        matches!(
            self,
            Shape::Horizontal2 | Shape::Vertical2 | Shape::Horizontal3 | Shape::Vertical3
        )
    }
}
