//! Authoritative per-room state machine.
//!
//! A `Session` owns the room's `GameState` and turns one client message at a
//! time into a `Transition`: the messages to deliver and whether the state
//! must be persisted. It knows nothing about sockets, so it can be driven
//! directly from tests.
//!
//! Status flow: `waiting` → `playing` once both roles are held by connected
//! players → `won` when a move satisfies the win check. `reset` and
//! `next-puzzle` re-enter `playing` from any status.

use crate::engine::error::SessionError;
use crate::engine::models::*;
use crate::games::hive_mind::board::{apply_move, has_won};
use crate::games::hive_mind::puzzles::{first_puzzle, next_puzzle, puzzle_by_id, PuzzleDefinition};
use crate::games::hive_mind::types::{Move, GRID_SIZE};

const MAX_NAME_LEN: usize = 32;

/// Where a server message goes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outbound {
    /// Every connection in the room.
    Broadcast(ServerMessage),
    /// Only the connection that sent the message.
    Reply(ServerMessage),
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Transition {
    pub messages: Vec<Outbound>,
    /// The room state changed and should be saved.
    pub persist: bool,
}

impl Transition {
    fn broadcast(messages: Vec<ServerMessage>) -> Self {
        Self {
            messages: messages.into_iter().map(Outbound::Broadcast).collect(),
            persist: true,
        }
    }

    fn from_result(result: Result<Vec<ServerMessage>, SessionError>) -> Self {
        match result {
            Ok(messages) => Self::broadcast(messages),
            Err(err) if err.is_reported() => Self {
                messages: vec![Outbound::Reply(ServerMessage::Error {
                    message: err.to_string(),
                })],
                persist: false,
            },
            Err(_) => Self::default(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Session {
    state: GameState,
}

impl Session {
    /// Fresh room waiting for players on `puzzle`.
    pub fn new(puzzle: &PuzzleDefinition) -> Self {
        Self {
            state: GameState {
                puzzle_id: puzzle.id,
                pieces: puzzle.load_pieces(),
                move_count: 0,
                players: Default::default(),
                status: SessionStatus::Waiting,
            },
        }
    }

    /// Resume from a persisted record. No socket survives a restart, so every
    /// player starts out disconnected; roles are kept.
    pub fn restore(mut state: GameState) -> Self {
        for player in state.players.values_mut() {
            player.connected = false;
        }
        Self { state }
    }

    pub fn state(&self) -> &GameState {
        &self.state
    }

    pub fn into_state(self) -> GameState {
        self.state
    }

    /// Template of the puzzle being played. Unknown ids fall back to the
    /// first puzzle.
    pub fn puzzle(&self) -> &'static PuzzleDefinition {
        puzzle_by_id(self.state.puzzle_id).unwrap_or_else(first_puzzle)
    }

    /// Full state, pushed to every new connection.
    pub fn snapshot(&self) -> ServerMessage {
        ServerMessage::State {
            state: self.state.clone(),
        }
    }

    pub fn handle(&mut self, conn: &str, msg: ClientMessage) -> Transition {
        let result = match msg {
            ClientMessage::Join { name } => Ok(self.join(conn, &name)),
            ClientMessage::SelectRole { role } => self.select_role(conn, role),
            ClientMessage::Slide {
                piece_id,
                direction,
            } => self.player_move(
                conn,
                Role::Forager,
                "slide",
                Move::Slide {
                    piece_id,
                    direction,
                },
            ),
            ClientMessage::Rotate { piece_id } => {
                self.player_move(conn, Role::Architect, "rotate", Move::Rotate { piece_id })
            }
            ClientMessage::Reset => Ok(self.reset()),
            ClientMessage::NextPuzzle => Ok(self.advance_puzzle()),
        };
        Transition::from_result(result)
    }

    /// Connection closed. The seat and its role stay so the player can
    /// come back.
    pub fn disconnect(&mut self, conn: &str) -> Transition {
        match self.state.players.get_mut(conn) {
            Some(player) => {
                player.connected = false;
                Transition::broadcast(vec![ServerMessage::PlayerLeft {
                    player_id: conn.to_string(),
                }])
            }
            None => Transition::default(),
        }
    }

    fn join(&mut self, conn: &str, name: &str) -> Vec<ServerMessage> {
        let trimmed = name.trim();
        let name = if trimmed.is_empty() {
            format!("Player {}", self.state.players.len() + 1)
        } else {
            trimmed.chars().take(MAX_NAME_LEN).collect()
        };
        let player = Player {
            id: conn.to_string(),
            name,
            role: None,
            connected: true,
        };
        self.state.players.insert(conn.to_string(), player.clone());
        vec![ServerMessage::PlayerJoined { player }]
    }

    fn select_role(&mut self, conn: &str, role: Role) -> Result<Vec<ServerMessage>, SessionError> {
        if !self.state.players.contains_key(conn) {
            return Err(SessionError::NotJoined);
        }
        if let Some(holder) = self.state.holder_of(role) {
            if holder.id != conn {
                return Err(SessionError::RoleTaken { role });
            }
        }
        if let Some(player) = self.state.players.get_mut(conn) {
            player.role = Some(role);
        }

        let mut messages = vec![ServerMessage::RoleSelected {
            player_id: conn.to_string(),
            role,
        }];
        if self.state.status == SessionStatus::Waiting && self.roles_filled() {
            self.state.status = SessionStatus::Playing;
            messages.push(self.snapshot());
        }
        Ok(messages)
    }

    fn roles_filled(&self) -> bool {
        match (
            self.state.holder_of(Role::Forager),
            self.state.holder_of(Role::Architect),
        ) {
            (Some(forager), Some(architect)) => forager.id != architect.id,
            _ => false,
        }
    }

    fn player_move(
        &mut self,
        conn: &str,
        required: Role,
        action: &'static str,
        mv: Move,
    ) -> Result<Vec<ServerMessage>, SessionError> {
        let player = self.state.players.get(conn).ok_or(SessionError::NotJoined)?;
        if player.role != Some(required) {
            return Err(SessionError::WrongRole {
                action,
                role: required,
            });
        }
        if self.state.status != SessionStatus::Playing {
            return Err(SessionError::IllegalMove);
        }
        if !apply_move(&mut self.state.pieces, &mv, GRID_SIZE) {
            return Err(SessionError::IllegalMove);
        }
        self.state.move_count += 1;

        let mut messages = Vec::with_capacity(2);
        if has_won(&self.state.pieces, self.puzzle().exit_row, GRID_SIZE) {
            self.state.status = SessionStatus::Won;
            messages.push(ServerMessage::GameWon {
                move_count: self.state.move_count,
            });
        }
        messages.push(ServerMessage::PieceMoved {
            pieces: self.state.pieces.clone(),
            move_count: self.state.move_count,
        });
        Ok(messages)
    }

    fn reset(&mut self) -> Vec<ServerMessage> {
        self.state.pieces = self.puzzle().load_pieces();
        self.state.move_count = 0;
        self.state.status = SessionStatus::Playing;
        vec![self.snapshot()]
    }

    fn advance_puzzle(&mut self) -> Vec<ServerMessage> {
        self.state.puzzle_id = next_puzzle(self.state.puzzle_id).id;
        self.reset()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::games::hive_mind::types::Direction;

    fn new_session() -> Session {
        Session::new(first_puzzle())
    }

    fn join(session: &mut Session, conn: &str, name: &str) -> Transition {
        session.handle(conn, ClientMessage::Join { name: name.into() })
    }

    fn pick(session: &mut Session, conn: &str, role: Role) -> Transition {
        session.handle(conn, ClientMessage::SelectRole { role })
    }

    fn slide(session: &mut Session, conn: &str, piece: &str, direction: Direction) -> Transition {
        session.handle(
            conn,
            ClientMessage::Slide {
                piece_id: piece.into(),
                direction,
            },
        )
    }

    fn rotate(session: &mut Session, conn: &str, piece: &str) -> Transition {
        session.handle(
            conn,
            ClientMessage::Rotate {
                piece_id: piece.into(),
            },
        )
    }

    fn playing_session() -> Session {
        let mut session = new_session();
        join(&mut session, "a", "Ada");
        join(&mut session, "b", "Bee");
        pick(&mut session, "a", Role::Forager);
        pick(&mut session, "b", Role::Architect);
        assert_eq!(session.state().status, SessionStatus::Playing);
        session
    }

    fn error_reply(transition: &Transition) -> Option<&str> {
        match transition.messages.as_slice() {
            [Outbound::Reply(ServerMessage::Error { message })] => Some(message.as_str()),
            _ => None,
        }
    }

    #[test]
    fn test_join_registers_unassigned_player() {
        let mut session = new_session();
        let t = join(&mut session, "a", "  Ada ");
        assert!(t.persist);
        let player = &session.state().players["a"];
        assert_eq!(player.name, "Ada");
        assert_eq!(player.role, None);
        assert!(player.connected);
        assert!(matches!(
            t.messages.as_slice(),
            [Outbound::Broadcast(ServerMessage::PlayerJoined { .. })]
        ));
    }

    #[test]
    fn test_join_without_name_gets_default() {
        let mut session = new_session();
        join(&mut session, "a", "");
        join(&mut session, "b", "   ");
        assert_eq!(session.state().players["a"].name, "Player 1");
        assert_eq!(session.state().players["b"].name, "Player 2");
    }

    #[test]
    fn test_rejoin_overwrites_entry() {
        let mut session = new_session();
        join(&mut session, "a", "Ada");
        pick(&mut session, "a", Role::Forager);
        join(&mut session, "a", "Ada Again");
        assert_eq!(session.state().players.len(), 1);
        assert_eq!(session.state().players["a"].name, "Ada Again");
        assert_eq!(session.state().players["a"].role, None);
    }

    #[test]
    fn test_select_role_before_join_fails() {
        let mut session = new_session();
        let t = pick(&mut session, "ghost", Role::Forager);
        assert_eq!(error_reply(&t), Some("Not joined"));
        assert!(!t.persist);
    }

    #[test]
    fn test_role_exclusivity() {
        let mut session = new_session();
        join(&mut session, "a", "Ada");
        join(&mut session, "b", "Bee");
        pick(&mut session, "a", Role::Forager);
        let t = pick(&mut session, "b", Role::Forager);
        assert_eq!(error_reply(&t), Some("forager role is already taken"));
        assert_eq!(session.state().players["a"].role, Some(Role::Forager));
        assert_eq!(session.state().players["b"].role, None);
    }

    #[test]
    fn test_role_of_disconnected_player_can_be_claimed() {
        let mut session = new_session();
        join(&mut session, "a", "Ada");
        join(&mut session, "b", "Bee");
        pick(&mut session, "a", Role::Forager);
        session.disconnect("a");
        let t = pick(&mut session, "b", Role::Forager);
        assert!(error_reply(&t).is_none());
        assert_eq!(session.state().players["b"].role, Some(Role::Forager));
    }

    #[test]
    fn test_status_waits_for_both_roles() {
        let mut session = new_session();
        assert_eq!(session.state().status, SessionStatus::Waiting);
        join(&mut session, "a", "Ada");
        join(&mut session, "b", "Bee");
        let t = pick(&mut session, "a", Role::Forager);
        assert_eq!(session.state().status, SessionStatus::Waiting);
        assert_eq!(t.messages.len(), 1);

        let t = pick(&mut session, "b", Role::Architect);
        assert_eq!(session.state().status, SessionStatus::Playing);
        assert!(matches!(
            t.messages.as_slice(),
            [
                Outbound::Broadcast(ServerMessage::RoleSelected { .. }),
                Outbound::Broadcast(ServerMessage::State { .. })
            ]
        ));
    }

    #[test]
    fn test_one_player_switching_roles_does_not_start() {
        let mut session = new_session();
        join(&mut session, "a", "Ada");
        pick(&mut session, "a", Role::Forager);
        pick(&mut session, "a", Role::Architect);
        assert_eq!(session.state().status, SessionStatus::Waiting);
        assert_eq!(session.state().holder_of(Role::Forager), None);
    }

    #[test]
    fn test_moves_are_role_gated() {
        let mut session = playing_session();
        let t = slide(&mut session, "b", "w1", Direction::Up);
        assert_eq!(error_reply(&t), Some("Only forager can slide"));
        let t = rotate(&mut session, "a", "w1");
        assert_eq!(error_reply(&t), Some("Only architect can rotate"));
        let t = slide(&mut session, "stranger", "w1", Direction::Up);
        assert_eq!(error_reply(&t), Some("Not joined"));
        assert_eq!(session.state().move_count, 0);
    }

    #[test]
    fn test_disconnected_holder_does_not_start_game() {
        let mut session = new_session();
        join(&mut session, "a", "Ada");
        pick(&mut session, "a", Role::Forager);
        session.disconnect("a");
        join(&mut session, "b", "Bee");
        let t = pick(&mut session, "b", Role::Architect);
        assert!(error_reply(&t).is_none());
        assert_eq!(session.state().players["a"].role, Some(Role::Forager));
        assert_eq!(session.state().status, SessionStatus::Waiting);
        assert!(!t
            .messages
            .iter()
            .any(|m| matches!(m, Outbound::Broadcast(ServerMessage::State { .. }))));
    }

    #[test]
    fn test_lone_forager_cannot_move_while_waiting() {
        let mut session = new_session();
        join(&mut session, "a", "Ada");
        pick(&mut session, "a", Role::Forager);
        let t = slide(&mut session, "a", "w1", Direction::Up);
        assert_eq!(t, Transition::default());
        assert_eq!(session.state().move_count, 0);
    }

    #[test]
    fn test_illegal_moves_are_silent_and_idempotent() {
        let mut session = playing_session();
        let before = session.state().clone();
        for _ in 0..5 {
            let t = slide(&mut session, "a", "queen", Direction::Right);
            assert_eq!(t, Transition::default());
            let t = slide(&mut session, "a", "missing", Direction::Left);
            assert_eq!(t, Transition::default());
        }
        assert_eq!(session.state(), &before);
    }

    #[test]
    fn test_first_steps_win_flow() {
        let mut session = playing_session();

        let t = slide(&mut session, "a", "w1", Direction::Up);
        assert!(t.persist);
        assert_eq!(session.state().move_count, 1);

        for step in 1..=3 {
            let t = slide(&mut session, "a", "queen", Direction::Right);
            assert!(t.persist, "queen slide {step} rejected");
            if step < 3 {
                assert_eq!(session.state().status, SessionStatus::Playing);
                assert_eq!(t.messages.len(), 1);
            } else {
                assert_eq!(
                    t.messages,
                    vec![
                        Outbound::Broadcast(ServerMessage::GameWon { move_count: 4 }),
                        Outbound::Broadcast(ServerMessage::PieceMoved {
                            pieces: session.state().pieces.clone(),
                            move_count: 4,
                        }),
                    ]
                );
            }
        }
        assert_eq!(session.state().status, SessionStatus::Won);

        // Won is terminal for moves.
        let t = slide(&mut session, "a", "queen", Direction::Right);
        assert_eq!(t, Transition::default());
    }

    #[test]
    fn test_rotate_counts_as_move() {
        let mut session = playing_session();
        let t = rotate(&mut session, "b", "w1");
        assert!(t.persist);
        assert_eq!(session.state().move_count, 1);
        let w1 = session.state().pieces.iter().find(|p| p.id == "w1").unwrap();
        assert_eq!(w1.shape, crate::games::hive_mind::pieces::Shape::Horizontal2);
    }

    #[test]
    fn test_reset_from_won_restores_template() {
        let mut session = playing_session();
        slide(&mut session, "a", "w1", Direction::Up);
        for _ in 0..3 {
            slide(&mut session, "a", "queen", Direction::Right);
        }
        assert_eq!(session.state().status, SessionStatus::Won);

        let t = session.handle("b", ClientMessage::Reset);
        assert!(matches!(
            t.messages.as_slice(),
            [Outbound::Broadcast(ServerMessage::State { .. })]
        ));
        assert_eq!(session.state().status, SessionStatus::Playing);
        assert_eq!(session.state().move_count, 0);
        assert_eq!(session.state().pieces, first_puzzle().pieces);
    }

    #[test]
    fn test_next_puzzle_advances_and_resets() {
        let mut session = playing_session();
        slide(&mut session, "a", "w1", Direction::Up);
        session.handle("a", ClientMessage::NextPuzzle);
        assert_eq!(session.state().puzzle_id, 2);
        assert_eq!(session.state().move_count, 0);
        assert_eq!(session.state().status, SessionStatus::Playing);
        assert_eq!(session.state().pieces, puzzle_by_id(2).unwrap().pieces);
        assert_eq!(session.puzzle().id, 2);
    }

    #[test]
    fn test_disconnect_keeps_role() {
        let mut session = playing_session();
        let t = session.disconnect("b");
        assert!(t.persist);
        assert_eq!(
            t.messages,
            vec![Outbound::Broadcast(ServerMessage::PlayerLeft {
                player_id: "b".into()
            })]
        );
        let player = &session.state().players["b"];
        assert!(!player.connected);
        assert_eq!(player.role, Some(Role::Architect));

        assert_eq!(session.disconnect("nobody"), Transition::default());
    }

    #[test]
    fn test_restore_marks_everyone_disconnected() {
        let session = playing_session();
        let restored = Session::restore(session.into_state());
        assert!(restored.state().players.values().all(|p| !p.connected));
        assert_eq!(restored.state().players["a"].role, Some(Role::Forager));
        assert_eq!(restored.state().status, SessionStatus::Playing);
    }

    #[test]
    fn test_snapshot_carries_full_state() {
        let session = playing_session();
        match session.snapshot() {
            ServerMessage::State { state } => assert_eq!(&state, session.state()),
            other => panic!("unexpected {other:?}"),
        }
    }
}
