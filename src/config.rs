//! Server configuration loaded from `hive_mind.toml`.
//! Command-line flags override whatever the file sets.

use std::net::SocketAddr;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to parse {path}: {source}")]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },
}

#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct ServerConfig {
    #[serde(default = "default_bind")]
    pub bind: SocketAddr,
    /// Directory for room records. Without it rooms live in memory only.
    #[serde(default)]
    pub data_dir: Option<PathBuf>,
    /// Rooms are served at `{room_path_prefix}{room}`.
    #[serde(default = "default_room_path_prefix")]
    pub room_path_prefix: String,
    /// Puzzle id a brand-new room starts on.
    #[serde(default = "default_starting_puzzle")]
    pub starting_puzzle: u32,
}

fn default_bind() -> SocketAddr {
    ([0, 0, 0, 0], 1999).into()
}

fn default_room_path_prefix() -> String {
    "/parties/main/".into()
}

fn default_starting_puzzle() -> u32 {
    1
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
            data_dir: None,
            room_path_prefix: default_room_path_prefix(),
            starting_puzzle: default_starting_puzzle(),
        }
    }
}

impl ServerConfig {
    /// Prefix with exactly one leading and one trailing slash.
    pub fn normalized_prefix(&self) -> String {
        let trimmed = self.room_path_prefix.trim().trim_matches('/');
        if trimmed.is_empty() {
            "/".into()
        } else {
            format!("/{trimmed}/")
        }
    }
}

/// Load configuration from a TOML file at the given path.
pub fn load_config(path: &Path) -> Result<ServerConfig, ConfigError> {
    let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    toml::from_str(&content).map_err(|source| ConfigError::Parse {
        path: path.to_path_buf(),
        source,
    })
}

/// Try well-known paths, returning the defaults if none is usable.
pub fn load_default_config() -> ServerConfig {
    let candidates = [
        "hive_mind.toml",
        "../hive_mind.toml",
        "/etc/hive-mind/hive_mind.toml",
    ];
    for path in &candidates {
        let p = Path::new(path);
        if p.exists() {
            match load_config(p) {
                Ok(config) => {
                    tracing::info!(path = %p.display(), "loaded server config");
                    return config;
                }
                Err(e) => {
                    tracing::warn!(path = %p.display(), error = %e, "failed to load server config");
                }
            }
        }
    }
    tracing::info!("no hive_mind.toml found, using built-in defaults");
    ServerConfig::default()
}
