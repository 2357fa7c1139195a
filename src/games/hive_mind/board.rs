//! Board snapshot, move validation and win detection for Hive Mind.
//!
//! The snapshot is rebuilt from the full piece list whenever a piece changes.
//! Validators never mutate; `slide` and `rotate` assume the matching check
//! already passed.

use super::types::{Direction, Move, Piece, GRID_SIZE};

/// Occupancy map: every cell holds the id of the piece covering it, if any.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Board {
    size: i32,
    cells: Vec<Option<String>>,
}

impl Board {
    /// Build the occupancy map from scratch. Cells outside the grid (a queen
    /// on its way out) are ignored.
    pub fn new(pieces: &[Piece], size: i32) -> Self {
        let mut cells = vec![None; (size * size).max(0) as usize];
        for piece in pieces {
            for (x, y) in piece.cells() {
                if x >= 0 && x < size && y >= 0 && y < size {
                    cells[(y * size + x) as usize] = Some(piece.id.clone());
                }
            }
        }
        Self { size, cells }
    }

    pub fn standard(pieces: &[Piece]) -> Self {
        Self::new(pieces, GRID_SIZE)
    }

    pub fn size(&self) -> i32 {
        self.size
    }

    pub fn in_bounds(&self, x: i32, y: i32) -> bool {
        x >= 0 && x < self.size && y >= 0 && y < self.size
    }

    /// Id of the piece covering (x, y). Out-of-bounds cells are empty.
    pub fn occupant(&self, x: i32, y: i32) -> Option<&str> {
        if !self.in_bounds(x, y) {
            return None;
        }
        self.cells[(y * self.size + x) as usize].as_deref()
    }

    pub fn occupied_count(&self) -> usize {
        self.cells.iter().filter(|c| c.is_some()).count()
    }
}

/// Linear scan for the piece covering (x, y).
pub fn piece_at(pieces: &[Piece], x: i32, y: i32) -> Option<&Piece> {
    pieces
        .iter()
        .find(|piece| piece.cells().any(|cell| cell == (x, y)))
}

/// Whether every cell of `piece` can move one step in `direction`.
///
/// The queen alone may cross the right edge; all other bounds are hard.
pub fn can_slide(piece: &Piece, direction: Direction, board: &Board) -> bool {
    let (dx, dy) = direction.delta();
    let size = board.size();
    piece.cells().all(|(x, y)| {
        let (nx, ny) = (x + dx, y + dy);
        if nx < 0 || ny < 0 || ny >= size {
            return false;
        }
        if nx >= size {
            return piece.is_queen();
        }
        match board.occupant(nx, ny) {
            Some(id) => id == piece.id,
            None => true,
        }
    })
}

/// Translate the origin by one step. Call only after `can_slide`.
pub fn slide(piece: &Piece, direction: Direction) -> Piece {
    let (dx, dy) = direction.delta();
    Piece {
        x: piece.x + dx,
        y: piece.y + dy,
        ..piece.clone()
    }
}

/// Whether the rotated footprint fits at the unchanged origin. Cells the
/// piece already covers count as free.
pub fn can_rotate(piece: &Piece, board: &Board) -> bool {
    let Some(next) = piece.shape.rotated() else {
        return false;
    };
    next.cells().iter().all(|&(dx, dy)| {
        let (x, y) = (piece.x + dx, piece.y + dy);
        if !board.in_bounds(x, y) {
            return false;
        }
        match board.occupant(x, y) {
            Some(id) => id == piece.id,
            None => true,
        }
    })
}

/// Swap the shape for its rotation successor. Call only after `can_rotate`.
pub fn rotate(piece: &Piece) -> Piece {
    match piece.shape.rotated() {
        Some(shape) => Piece {
            shape,
            ..piece.clone()
        },
        None => piece.clone(),
    }
}

/// True when the queen touches the right boundary while sitting in the exit
/// row. A missing queen never wins.
///
/// The row compared is the queen's origin row. The check is `>= size - 1`,
/// so a queen resting in the last column already counts, as does one that
/// slid past the edge.
pub fn has_won(pieces: &[Piece], exit_row: i32, grid_size: i32) -> bool {
    let Some(queen) = pieces.iter().find(|p| p.is_queen()) else {
        return false;
    };
    let Some(rightmost) = queen.cells().map(|(x, _)| x).max() else {
        return false;
    };
    rightmost >= grid_size - 1 && queen.y == exit_row
}

/// Validate and apply `mv` to `pieces` in place. Returns false, leaving the
/// pieces untouched, when the piece is unknown or the move is illegal.
pub fn apply_move(pieces: &mut [Piece], mv: &Move, grid_size: i32) -> bool {
    let board = Board::new(pieces, grid_size);
    let Some(index) = pieces.iter().position(|p| p.id == mv.piece_id()) else {
        return false;
    };
    let piece = &pieces[index];
    let next = match mv {
        Move::Slide { direction, .. } => {
            if !can_slide(piece, *direction, &board) {
                return false;
            }
            slide(piece, *direction)
        }
        Move::Rotate { .. } => {
            if !can_rotate(piece, &board) {
                return false;
            }
            rotate(piece)
        }
    };
    pieces[index] = next;
    true
}
