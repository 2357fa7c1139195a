//! Room codes and connection ids.

use std::fmt;

use rand::Rng;
use thiserror::Error;

/// Alphabet for generated codes. Ambiguous glyphs (I, O, 0, 1) are left out.
pub const ROOM_CODE_ALPHABET: &str = "ABCDEFGHJKLMNPQRSTUVWXYZ23456789";
pub const ROOM_CODE_LEN: usize = 4;
pub const ROOM_CODE_MAX_LEN: usize = 32;

const CONNECTION_ID_ALPHABET: &[u8] = b"abcdefghijklmnopqrstuvwxyz0123456789";
const CONNECTION_ID_LEN: usize = 16;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RoomCodeError {
    #[error("room code is empty")]
    Empty,
    #[error("room code must be at most {max} chars, got {found}")]
    TooLong { max: usize, found: usize },
    #[error("invalid character '{ch}' at position {index}")]
    InvalidCharacter { ch: char, index: usize },
}

fn check_token(value: &str) -> Result<(), RoomCodeError> {
    if value.is_empty() {
        return Err(RoomCodeError::Empty);
    }
    if value.len() > ROOM_CODE_MAX_LEN {
        return Err(RoomCodeError::TooLong {
            max: ROOM_CODE_MAX_LEN,
            found: value.len(),
        });
    }
    for (index, ch) in value.chars().enumerate() {
        if !(ch.is_ascii_alphanumeric() || ch == '-' || ch == '_') {
            return Err(RoomCodeError::InvalidCharacter { ch, index });
        }
    }
    Ok(())
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RoomCode(String);

impl RoomCode {
    pub fn parse(value: &str) -> Result<Self, RoomCodeError> {
        check_token(value)?;
        Ok(Self(value.to_string()))
    }

    /// Fresh code for a new room. The server never mints codes: any valid
    /// code names a room, so clients call this to pick one before
    /// connecting.
    pub fn generate<R: Rng + ?Sized>(rng: &mut R) -> Self {
        let alphabet = ROOM_CODE_ALPHABET.as_bytes();
        let code = (0..ROOM_CODE_LEN)
            .map(|_| alphabet[rng.gen_range(0..alphabet.len())] as char)
            .collect();
        Self(code)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RoomCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl std::str::FromStr for RoomCode {
    type Err = RoomCodeError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        Self::parse(value)
    }
}

/// Random connection id. Clients that want to resume a seat send the same id
/// again when reconnecting.
pub fn generate_connection_id<R: Rng + ?Sized>(rng: &mut R) -> String {
    (0..CONNECTION_ID_LEN)
        .map(|_| CONNECTION_ID_ALPHABET[rng.gen_range(0..CONNECTION_ID_ALPHABET.len())] as char)
        .collect()
}

/// Accept a client-supplied connection id if it is a well-formed token.
pub fn parse_connection_id(value: &str) -> Option<String> {
    check_token(value).ok().map(|_| value.to_string())
}
