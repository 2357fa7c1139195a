//! Wire and storage types shared by the server, the session state machine and
//! the client coordinator.
//!
//! Every message is a JSON object tagged on `"type"`.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::games::hive_mind::types::{Direction, Piece};

pub type ConnectionId = String;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Slides pieces.
    Forager,
    /// Rotates pieces.
    Architect,
}

impl Role {
    pub fn as_str(self) -> &'static str {
        match self {
            Role::Forager => "forager",
            Role::Architect => "architect",
        }
    }

    pub fn display_name(self) -> &'static str {
        match self {
            Role::Forager => "Forager",
            Role::Architect => "Architect",
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionStatus {
    #[default]
    Waiting,
    Playing,
    Won,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Player {
    pub id: ConnectionId,
    pub name: String,
    /// `None` until the player picks a role.
    pub role: Option<Role>,
    pub connected: bool,
}

/// Authoritative room state. This is both the `state` snapshot pushed to
/// clients and the record persisted per room.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GameState {
    pub puzzle_id: u32,
    pub pieces: Vec<Piece>,
    pub move_count: u32,
    #[serde(default)]
    pub players: BTreeMap<ConnectionId, Player>,
    #[serde(default)]
    pub status: SessionStatus,
}

impl GameState {
    /// Connected player currently holding `role`, if any.
    pub fn holder_of(&self, role: Role) -> Option<&Player> {
        self.players
            .values()
            .find(|p| p.connected && p.role == Some(role))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case", rename_all_fields = "camelCase")]
pub enum ClientMessage {
    Join {
        #[serde(default)]
        name: String,
    },
    SelectRole {
        role: Role,
    },
    Slide {
        piece_id: String,
        direction: Direction,
    },
    Rotate {
        piece_id: String,
    },
    Reset,
    NextPuzzle,
}

impl ClientMessage {
    /// Tag used on the wire, for logging.
    pub fn kind(&self) -> &'static str {
        match self {
            ClientMessage::Join { .. } => "join",
            ClientMessage::SelectRole { .. } => "select-role",
            ClientMessage::Slide { .. } => "slide",
            ClientMessage::Rotate { .. } => "rotate",
            ClientMessage::Reset => "reset",
            ClientMessage::NextPuzzle => "next-puzzle",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case", rename_all_fields = "camelCase")]
pub enum ServerMessage {
    State {
        state: GameState,
    },
    PlayerJoined {
        player: Player,
    },
    PlayerLeft {
        player_id: ConnectionId,
    },
    RoleSelected {
        player_id: ConnectionId,
        role: Role,
    },
    PieceMoved {
        pieces: Vec<Piece>,
        move_count: u32,
    },
    GameWon {
        move_count: u32,
    },
    Error {
        message: String,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::games::hive_mind::pieces::Shape;
    use crate::games::hive_mind::types::PieceKind;
    use serde_json::json;

    #[test]
    fn test_client_messages_parse_wire_format() {
        let msg: ClientMessage =
            serde_json::from_value(json!({"type": "slide", "pieceId": "queen", "direction": "right"}))
                .unwrap();
        assert_eq!(
            msg,
            ClientMessage::Slide {
                piece_id: "queen".into(),
                direction: Direction::Right
            }
        );

        let msg: ClientMessage =
            serde_json::from_value(json!({"type": "select-role", "role": "architect"})).unwrap();
        assert_eq!(msg, ClientMessage::SelectRole { role: Role::Architect });

        let msg: ClientMessage = serde_json::from_value(json!({"type": "next-puzzle"})).unwrap();
        assert_eq!(msg, ClientMessage::NextPuzzle);

        let msg: ClientMessage = serde_json::from_value(json!({"type": "join"})).unwrap();
        assert_eq!(msg, ClientMessage::Join { name: String::new() });
    }

    #[test]
    fn test_unknown_client_message_is_rejected() {
        let err = serde_json::from_value::<ClientMessage>(json!({"type": "teleport"}));
        assert!(err.is_err());
        let err = serde_json::from_value::<ClientMessage>(json!({"type": "select-role", "role": "queen"}));
        assert!(err.is_err());
    }

    #[test]
    fn test_server_messages_use_camel_case_fields() {
        let msg = ServerMessage::PieceMoved {
            pieces: vec![Piece::new("queen", PieceKind::Queen, Shape::Horizontal2, 1, 2)],
            move_count: 1,
        };
        let value = serde_json::to_value(&msg).unwrap();
        assert_eq!(value["type"], "piece-moved");
        assert_eq!(value["moveCount"], 1);
        assert_eq!(value["pieces"][0]["shapeName"], "HORIZONTAL_2");
        assert_eq!(value["pieces"][0]["type"], "queen");

        let value = serde_json::to_value(ServerMessage::PlayerLeft {
            player_id: "abc".into(),
        })
        .unwrap();
        assert_eq!(value, json!({"type": "player-left", "playerId": "abc"}));
    }

    #[test]
    fn test_state_record_layout() {
        let mut players = BTreeMap::new();
        players.insert(
            "c1".to_string(),
            Player {
                id: "c1".into(),
                name: "Ada".into(),
                role: None,
                connected: true,
            },
        );
        let state = GameState {
            puzzle_id: 1,
            pieces: vec![],
            move_count: 0,
            players,
            status: SessionStatus::Waiting,
        };
        let value = serde_json::to_value(&state).unwrap();
        assert_eq!(value["puzzleId"], 1);
        assert_eq!(value["status"], "waiting");
        assert_eq!(value["players"]["c1"]["role"], serde_json::Value::Null);
        let back: GameState = serde_json::from_value(value).unwrap();
        assert_eq!(back, state);
    }
}
