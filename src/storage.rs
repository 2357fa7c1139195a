//! Durable room records, one per room code.

use std::collections::HashMap;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use thiserror::Error;

use crate::engine::models::GameState;
use crate::engine::room_code::RoomCode;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("storage i/o failed: {0}")]
    Io(#[from] std::io::Error),
    #[error("stored record is not valid JSON: {0}")]
    Serde(#[from] serde_json::Error),
}

/// Blocking key/value store for room records. The server calls it from
/// `spawn_blocking`.
pub trait RoomStore: Send + Sync {
    fn load(&self, room: &RoomCode) -> Result<Option<GameState>, StorageError>;
    fn save(&self, room: &RoomCode, state: &GameState) -> Result<(), StorageError>;
}

/// Process-local store. Records vanish with the process.
#[derive(Default)]
pub struct MemoryStore {
    records: Mutex<HashMap<RoomCode, GameState>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl RoomStore for MemoryStore {
    fn load(&self, room: &RoomCode) -> Result<Option<GameState>, StorageError> {
        let records = self.records.lock().unwrap_or_else(|e| e.into_inner());
        Ok(records.get(room).cloned())
    }

    fn save(&self, room: &RoomCode, state: &GameState) -> Result<(), StorageError> {
        let mut records = self.records.lock().unwrap_or_else(|e| e.into_inner());
        records.insert(room.clone(), state.clone());
        Ok(())
    }
}

/// One `<room>.json` file per room inside `dir`.
pub struct FileStore {
    dir: PathBuf,
}

impl FileStore {
    /// Create the directory if needed.
    pub fn open(dir: impl Into<PathBuf>) -> Result<Self, StorageError> {
        let dir = dir.into();
        fs::create_dir_all(&dir)?;
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn record_path(&self, room: &RoomCode) -> PathBuf {
        self.dir.join(format!("{room}.json"))
    }
}

impl RoomStore for FileStore {
    fn load(&self, room: &RoomCode) -> Result<Option<GameState>, StorageError> {
        let content = match fs::read_to_string(self.record_path(room)) {
            Ok(content) => content,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        Ok(Some(serde_json::from_str(&content)?))
    }

    fn save(&self, room: &RoomCode, state: &GameState) -> Result<(), StorageError> {
        let path = self.record_path(room);
        let tmp = self.dir.join(format!(".{room}.json.tmp"));
        fs::write(&tmp, serde_json::to_vec_pretty(state)?)?;
        fs::rename(&tmp, &path)?;
        Ok(())
    }
}
