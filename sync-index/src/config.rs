//! Configuration loading for sync-index.
//!
//! Configuration is loaded from a TOML file (e.g. `index.toml`).

use serde::Deserialize;
use std::path::PathBuf;

/// Root configuration for the folder index.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct IndexConfig {
    /// Storage configuration.
    #[serde(default)]
    pub storage: StorageConfig,
}

/// Storage configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct StorageConfig {
    /// Snapshot file for the in-memory backend (default: none, nothing is
    /// written to disk).
    #[serde(default)]
    pub snapshot: Option<PathBuf>,
    /// Rewrite the snapshot after every mutating call (default: true).
    #[serde(default = "default_persist_on_write")]
    pub persist_on_write: bool,
}

fn default_persist_on_write() -> bool {
    true
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            snapshot: None,
            persist_on_write: default_persist_on_write(),
        }
    }
}

impl IndexConfig {
    /// Load configuration from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn from_file(path: &std::path::Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
            path: path.to_path_buf(),
            source: e,
        })?;

        toml::from_str(&content).map_err(|e| ConfigError::ParseError {
            path: path.to_path_buf(),
            source: e,
        })
    }
}

/// Configuration error types.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Failed to read configuration file.
    #[error("failed to read config file {path}: {source}")]
    ReadError {
        /// Path to the configuration file.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },
    /// Failed to parse configuration file.
    #[error("failed to parse config file {path}: {source}")]
    ParseError {
        /// Path to the configuration file.
        path: PathBuf,
        /// Underlying TOML parse error.
        source: toml::de::Error,
    },
}
