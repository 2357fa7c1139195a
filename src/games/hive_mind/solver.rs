//! Breadth-first solver over piece configurations.
//!
//! Slides and rotations both cost one move, so the first winning state found
//! gives the optimal move count. Used by the `solve` binary and to check the
//! puzzle catalog.

use std::collections::{HashMap, VecDeque};

use super::board::{apply_move, has_won};
use super::pieces::Shape;
use super::puzzles::PuzzleDefinition;
use super::types::{Move, Piece, ALL_DIRECTIONS, GRID_SIZE};

type StateKey = Vec<(i32, i32, Shape)>;

#[derive(Debug, Clone)]
pub struct SolverParams {
    /// Give up after this many distinct configurations.
    pub max_states: usize,
}

impl Default for SolverParams {
    fn default() -> Self {
        Self { max_states: 250_000 }
    }
}

#[derive(Debug, Clone)]
pub struct Solution {
    pub moves: Vec<Move>,
    pub states_explored: usize,
}

impl Solution {
    pub fn move_count(&self) -> usize {
        self.moves.len()
    }
}

fn state_key(pieces: &[Piece]) -> StateKey {
    pieces.iter().map(|p| (p.x, p.y, p.shape)).collect()
}

/// A queen with no cell left on the board can only keep drifting right.
fn queen_gone(pieces: &[Piece], grid_size: i32) -> bool {
    pieces
        .iter()
        .filter(|p| p.is_queen())
        .any(|q| q.cells().all(|(x, _)| x >= grid_size))
}

fn candidate_moves(pieces: &[Piece]) -> Vec<Move> {
    let mut moves = Vec::with_capacity(pieces.len() * 5);
    for piece in pieces {
        for direction in ALL_DIRECTIONS {
            moves.push(Move::Slide {
                piece_id: piece.id.clone(),
                direction,
            });
        }
        moves.push(Move::Rotate {
            piece_id: piece.id.clone(),
        });
    }
    moves
}

/// Find a shortest move sequence that wins from `start`.
pub fn solve(
    start: &[Piece],
    exit_row: i32,
    grid_size: i32,
    params: &SolverParams,
) -> Option<Solution> {
    if has_won(start, exit_row, grid_size) {
        return Some(Solution {
            moves: Vec::new(),
            states_explored: 1,
        });
    }

    let start_key = state_key(start);
    let mut parents: HashMap<StateKey, Option<(StateKey, Move)>> = HashMap::new();
    parents.insert(start_key, None);
    let mut queue = VecDeque::from([start.to_vec()]);

    while let Some(pieces) = queue.pop_front() {
        let key = state_key(&pieces);
        for mv in candidate_moves(&pieces) {
            let mut next = pieces.clone();
            if !apply_move(&mut next, &mv, grid_size) {
                continue;
            }
            if queen_gone(&next, grid_size) {
                continue;
            }
            let next_key = state_key(&next);
            if parents.contains_key(&next_key) {
                continue;
            }
            parents.insert(next_key.clone(), Some((key.clone(), mv)));

            if has_won(&next, exit_row, grid_size) {
                let states_explored = parents.len();
                return Some(Solution {
                    moves: unwind(&parents, next_key),
                    states_explored,
                });
            }
            if parents.len() >= params.max_states {
                tracing::debug!(states = parents.len(), "solver state budget exhausted");
                return None;
            }
            queue.push_back(next);
        }
    }
    None
}

fn unwind(parents: &HashMap<StateKey, Option<(StateKey, Move)>>, mut key: StateKey) -> Vec<Move> {
    let mut moves = Vec::new();
    while let Some(Some((parent, mv))) = parents.get(&key) {
        moves.push(mv.clone());
        key = parent.clone();
    }
    moves.reverse();
    moves
}

pub fn solve_puzzle(puzzle: &PuzzleDefinition, params: &SolverParams) -> Option<Solution> {
    solve(&puzzle.pieces, puzzle.exit_row, GRID_SIZE, params)
}

/// Apply `moves` in order. Returns the final layout, or None at the first
/// illegal move.
pub fn replay(start: &[Piece], moves: &[Move], grid_size: i32) -> Option<Vec<Piece>> {
    let mut pieces = start.to_vec();
    for mv in moves {
        if !apply_move(&mut pieces, mv, grid_size) {
            return None;
        }
    }
    Some(pieces)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::games::hive_mind::puzzles::puzzle_by_id;
    use crate::games::hive_mind::types::{Direction, PieceKind, EXIT_ROW};

    #[test]
    fn test_already_won_needs_no_moves() {
        let pieces = vec![Piece::new("queen", PieceKind::Queen, Shape::Horizontal2, 3, 2)];
        let solution = solve(&pieces, EXIT_ROW, GRID_SIZE, &SolverParams::default()).unwrap();
        assert_eq!(solution.move_count(), 0);
    }

    #[test]
    fn test_open_row_is_straight_slide() {
        let pieces = vec![Piece::new("queen", PieceKind::Queen, Shape::Horizontal2, 0, 2)];
        let solution = solve(&pieces, EXIT_ROW, GRID_SIZE, &SolverParams::default()).unwrap();
        assert_eq!(solution.move_count(), 3);
        assert!(solution.moves.iter().all(|m| matches!(
            m,
            Move::Slide { direction: Direction::Right, .. }
        )));
    }

    #[test]
    fn test_first_steps_needs_blocker_cleared() {
        let puzzle = puzzle_by_id(1).unwrap();
        let solution = solve_puzzle(puzzle, &SolverParams::default()).unwrap();
        assert_eq!(solution.move_count(), 4);
        let end = replay(&puzzle.pieces, &solution.moves, GRID_SIZE).unwrap();
        assert!(has_won(&end, puzzle.exit_row, GRID_SIZE));
    }

    #[test]
    fn test_queen_walled_off_from_exit_row() {
        // Queen in row 0 behind a full-width bar on row 1.
        let pieces = vec![
            Piece::new("queen", PieceKind::Queen, Shape::Horizontal2, 0, 0),
            Piece::new("a", PieceKind::Larva, Shape::Horizontal3, 0, 1),
            Piece::new("b", PieceKind::Worker, Shape::Horizontal2, 3, 1),
        ];
        let solution = solve(&pieces, EXIT_ROW, GRID_SIZE, &SolverParams::default());
        assert!(solution.is_some());
    }

    #[test]
    fn test_budget_exhaustion_returns_none() {
        let puzzle = puzzle_by_id(5).unwrap();
        let params = SolverParams { max_states: 2 };
        assert!(solve_puzzle(puzzle, &params).is_none());
    }

    #[test]
    fn test_replay_stops_on_illegal_move() {
        let puzzle = puzzle_by_id(1).unwrap();
        let moves = vec![Move::Slide {
            piece_id: "queen".into(),
            direction: Direction::Right,
        }];
        assert!(replay(&puzzle.pieces, &moves, GRID_SIZE).is_none());
    }
}
