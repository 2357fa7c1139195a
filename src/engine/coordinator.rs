//! Client-side coordination for solo and networked play.
//!
//! The coordinator keeps a local copy of the puzzle and routes player intents
//! through a `MoveExecutor`:
//! - `LocalExecutor` validates and applies moves itself and detects the win,
//!   since there is no server in solo play.
//! - `RemoteExecutor` only emits protocol messages. Networked clients never
//!   validate against their own copy; every state, piece-moved and game-won
//!   message from the server replaces the local pieces and move count.
//!
//! Everything the embedding UI has to do comes back as a list of `Effect`s.

use std::collections::BTreeMap;

use crate::engine::models::*;
use crate::games::hive_mind::board::{apply_move, can_slide, has_won, Board};
use crate::games::hive_mind::puzzles::{next_puzzle, puzzle_by_id, PuzzleDefinition};
use crate::games::hive_mind::types::{Direction, Move, Piece, ALL_DIRECTIONS, EXIT_ROW, GRID_SIZE};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Solo,
    Networked,
}

/// Side effects requested by the coordinator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    /// Deliver to the server.
    Send(ClientMessage),
    /// Local state changed; redraw.
    Render,
    Won { move_count: u32 },
    /// Short message for the player.
    Notice(String),
}

/// Everything the client knows about the game.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientState {
    pub puzzle_id: u32,
    pub pieces: Vec<Piece>,
    pub board: Board,
    /// Piece picked for sliding by a forager.
    pub selected: Option<String>,
    pub move_count: u32,
    pub role: Option<Role>,
    pub status: SessionStatus,
    pub players: BTreeMap<ConnectionId, Player>,
    /// Our own connection id in networked play.
    pub self_id: Option<ConnectionId>,
}

impl ClientState {
    pub fn for_puzzle(puzzle: &PuzzleDefinition) -> Self {
        let pieces = puzzle.load_pieces();
        Self {
            puzzle_id: puzzle.id,
            board: Board::standard(&pieces),
            pieces,
            selected: None,
            move_count: 0,
            role: None,
            status: SessionStatus::Waiting,
            players: BTreeMap::new(),
            self_id: None,
        }
    }

    pub fn load_puzzle(&mut self, puzzle: &PuzzleDefinition) {
        self.puzzle_id = puzzle.id;
        self.set_pieces(puzzle.load_pieces());
        self.selected = None;
        self.move_count = 0;
    }

    /// Replace the pieces and rebuild the occupancy map. A selection whose
    /// piece no longer exists is dropped.
    pub fn set_pieces(&mut self, pieces: Vec<Piece>) {
        self.board = Board::standard(&pieces);
        self.pieces = pieces;
        if let Some(id) = &self.selected {
            if !self.pieces.iter().any(|p| &p.id == id) {
                self.selected = None;
            }
        }
    }

    pub fn piece(&self, id: &str) -> Option<&Piece> {
        self.pieces.iter().find(|p| p.id == id)
    }

    pub fn exit_row(&self) -> i32 {
        puzzle_by_id(self.puzzle_id)
            .map(|p| p.exit_row)
            .unwrap_or(EXIT_ROW)
    }

    /// Directions `piece_id` could slide right now. Preview only; nothing is
    /// committed.
    pub fn slide_options(&self, piece_id: &str) -> Vec<Direction> {
        match self.piece(piece_id) {
            Some(piece) => ALL_DIRECTIONS
                .into_iter()
                .filter(|&dir| can_slide(piece, dir, &self.board))
                .collect(),
            None => Vec::new(),
        }
    }
}

/// Applies one server message to the local state. Pure, so a recorded
/// message stream can be replayed deterministically.
pub fn apply_server_message(mut state: ClientState, msg: &ServerMessage) -> (ClientState, Vec<Effect>) {
    let effects = match msg {
        ServerMessage::State { state: server } => {
            state.puzzle_id = server.puzzle_id;
            state.set_pieces(server.pieces.clone());
            state.move_count = server.move_count;
            state.status = server.status;
            state.players = server.players.clone();
            state.role = state
                .self_id
                .as_ref()
                .and_then(|id| state.players.get(id))
                .and_then(|me| me.role);
            vec![Effect::Render]
        }
        ServerMessage::PlayerJoined { player } => {
            // A re-join clears the seat's role on the server.
            if state.self_id.as_deref() == Some(player.id.as_str()) {
                state.role = player.role;
            }
            state.players.insert(player.id.clone(), player.clone());
            vec![Effect::Render]
        }
        ServerMessage::PlayerLeft { player_id } => {
            if let Some(player) = state.players.get_mut(player_id) {
                player.connected = false;
            }
            vec![Effect::Render]
        }
        ServerMessage::RoleSelected { player_id, role } => {
            if let Some(player) = state.players.get_mut(player_id) {
                player.role = Some(*role);
            }
            if state.self_id.as_deref() == Some(player_id.as_str()) {
                state.role = Some(*role);
            }
            vec![Effect::Render]
        }
        ServerMessage::PieceMoved { pieces, move_count } => {
            state.set_pieces(pieces.clone());
            state.move_count = *move_count;
            vec![Effect::Render]
        }
        ServerMessage::GameWon { move_count } => {
            state.status = SessionStatus::Won;
            state.move_count = *move_count;
            vec![Effect::Won {
                move_count: *move_count,
            }]
        }
        ServerMessage::Error { message } => vec![Effect::Notice(message.clone())],
    };
    (state, effects)
}

/// How player intents are carried out.
pub trait MoveExecutor {
    fn mode(&self) -> Mode;
    fn select_role(&mut self, state: &mut ClientState, role: Role) -> Vec<Effect>;
    fn slide(&mut self, state: &mut ClientState, piece_id: &str, direction: Direction) -> Vec<Effect>;
    fn rotate(&mut self, state: &mut ClientState, piece_id: &str) -> Vec<Effect>;
    fn reset(&mut self, state: &mut ClientState) -> Vec<Effect>;
    fn next_puzzle(&mut self, state: &mut ClientState) -> Vec<Effect>;
}

/// Solo play: the client is the authority.
#[derive(Debug, Default, Clone, Copy)]
pub struct LocalExecutor;

impl LocalExecutor {
    fn commit(state: &mut ClientState, mv: &Move) -> Option<Vec<Effect>> {
        if state.status == SessionStatus::Won {
            return None;
        }
        let mut pieces = state.pieces.clone();
        if !apply_move(&mut pieces, mv, GRID_SIZE) {
            return None;
        }
        state.set_pieces(pieces);
        state.move_count += 1;

        let mut effects = vec![Effect::Render];
        if has_won(&state.pieces, state.exit_row(), GRID_SIZE) {
            state.status = SessionStatus::Won;
            effects.push(Effect::Won {
                move_count: state.move_count,
            });
        }
        Some(effects)
    }

    fn wrong_role(action: &str, role: Role) -> Vec<Effect> {
        vec![Effect::Notice(format!(
            "Only the {} can {action} pieces!",
            role.display_name()
        ))]
    }
}

impl MoveExecutor for LocalExecutor {
    fn mode(&self) -> Mode {
        Mode::Solo
    }

    fn select_role(&mut self, state: &mut ClientState, role: Role) -> Vec<Effect> {
        state.role = Some(role);
        state.status = SessionStatus::Playing;
        vec![Effect::Render]
    }

    fn slide(&mut self, state: &mut ClientState, piece_id: &str, direction: Direction) -> Vec<Effect> {
        if state.role != Some(Role::Forager) {
            return Self::wrong_role("slide", Role::Forager);
        }
        let mv = Move::Slide {
            piece_id: piece_id.to_string(),
            direction,
        };
        Self::commit(state, &mv).unwrap_or_default()
    }

    fn rotate(&mut self, state: &mut ClientState, piece_id: &str) -> Vec<Effect> {
        if state.role != Some(Role::Architect) {
            return Self::wrong_role("rotate", Role::Architect);
        }
        let mv = Move::Rotate {
            piece_id: piece_id.to_string(),
        };
        Self::commit(state, &mv)
            .unwrap_or_else(|| vec![Effect::Notice("Can't rotate - not enough space!".into())])
    }

    fn reset(&mut self, state: &mut ClientState) -> Vec<Effect> {
        if let Some(puzzle) = puzzle_by_id(state.puzzle_id) {
            state.load_puzzle(puzzle);
        }
        state.status = SessionStatus::Playing;
        vec![Effect::Render]
    }

    fn next_puzzle(&mut self, state: &mut ClientState) -> Vec<Effect> {
        state.load_puzzle(next_puzzle(state.puzzle_id));
        state.status = SessionStatus::Playing;
        vec![Effect::Render]
    }
}

/// Networked play: intents go to the server untouched.
#[derive(Debug, Default, Clone, Copy)]
pub struct RemoteExecutor;

impl MoveExecutor for RemoteExecutor {
    fn mode(&self) -> Mode {
        Mode::Networked
    }

    fn select_role(&mut self, _state: &mut ClientState, role: Role) -> Vec<Effect> {
        vec![Effect::Send(ClientMessage::SelectRole { role })]
    }

    fn slide(&mut self, _state: &mut ClientState, piece_id: &str, direction: Direction) -> Vec<Effect> {
        vec![Effect::Send(ClientMessage::Slide {
            piece_id: piece_id.to_string(),
            direction,
        })]
    }

    fn rotate(&mut self, _state: &mut ClientState, piece_id: &str) -> Vec<Effect> {
        vec![Effect::Send(ClientMessage::Rotate {
            piece_id: piece_id.to_string(),
        })]
    }

    fn reset(&mut self, _state: &mut ClientState) -> Vec<Effect> {
        vec![Effect::Send(ClientMessage::Reset)]
    }

    fn next_puzzle(&mut self, _state: &mut ClientState) -> Vec<Effect> {
        vec![Effect::Send(ClientMessage::NextPuzzle)]
    }
}

pub struct Coordinator<E: MoveExecutor> {
    state: ClientState,
    executor: E,
}

impl Coordinator<LocalExecutor> {
    pub fn solo(puzzle: &PuzzleDefinition) -> Self {
        Self::new(ClientState::for_puzzle(puzzle), LocalExecutor)
    }
}

impl Coordinator<RemoteExecutor> {
    /// Networked client for connection `self_id`. The local copy is only a
    /// placeholder until the server's first `state` message arrives.
    pub fn networked(self_id: impl Into<ConnectionId>, placeholder: &PuzzleDefinition) -> Self {
        let mut state = ClientState::for_puzzle(placeholder);
        state.self_id = Some(self_id.into());
        Self::new(state, RemoteExecutor)
    }

    /// First message after the socket opens.
    pub fn join(&mut self, name: &str) -> Vec<Effect> {
        vec![Effect::Send(ClientMessage::Join {
            name: name.to_string(),
        })]
    }
}

impl<E: MoveExecutor> Coordinator<E> {
    pub fn new(state: ClientState, executor: E) -> Self {
        Self { state, executor }
    }

    pub fn state(&self) -> &ClientState {
        &self.state
    }

    pub fn mode(&self) -> Mode {
        self.executor.mode()
    }

    pub fn select_role(&mut self, role: Role) -> Vec<Effect> {
        self.executor.select_role(&mut self.state, role)
    }

    /// A click on a piece: architects rotate it, everyone else selects it.
    pub fn click_piece(&mut self, piece_id: &str) -> Vec<Effect> {
        if self.state.piece(piece_id).is_none() {
            return Vec::new();
        }
        if self.state.role == Some(Role::Architect) {
            return self.rotate(piece_id);
        }
        self.state.selected = Some(piece_id.to_string());
        vec![Effect::Render]
    }

    /// Slide the selected piece; ignored when nothing is selected.
    pub fn slide_selected(&mut self, direction: Direction) -> Vec<Effect> {
        match self.state.selected.clone() {
            Some(id) => self.slide(&id, direction),
            None => Vec::new(),
        }
    }

    pub fn slide(&mut self, piece_id: &str, direction: Direction) -> Vec<Effect> {
        self.executor.slide(&mut self.state, piece_id, direction)
    }

    pub fn rotate(&mut self, piece_id: &str) -> Vec<Effect> {
        self.executor.rotate(&mut self.state, piece_id)
    }

    pub fn reset(&mut self) -> Vec<Effect> {
        self.executor.reset(&mut self.state)
    }

    pub fn next_puzzle(&mut self) -> Vec<Effect> {
        self.executor.next_puzzle(&mut self.state)
    }

    /// Handle a message pushed by the server. Solo clients have no server and
    /// ignore it.
    pub fn receive(&mut self, msg: &ServerMessage) -> Vec<Effect> {
        if self.executor.mode() == Mode::Solo {
            return Vec::new();
        }
        let (state, effects) = apply_server_message(self.state.clone(), msg);
        self.state = state;
        effects
    }
}
