//! Per-message failures of the session state machine.

use thiserror::Error;

use crate::engine::models::Role;

/// Nothing here is fatal: a failed message leaves the room unchanged.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SessionError {
    #[error("Not joined")]
    NotJoined,
    #[error("{role} role is already taken")]
    RoleTaken { role: Role },
    #[error("Only {role} can {action}")]
    WrongRole { action: &'static str, role: Role },
    /// Rejected by the move validator. Never reported to the client.
    #[error("illegal move")]
    IllegalMove,
}

impl SessionError {
    /// Whether the sender should hear about this failure.
    pub fn is_reported(&self) -> bool {
        !matches!(self, SessionError::IllegalMove)
    }
}
