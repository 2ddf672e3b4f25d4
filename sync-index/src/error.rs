//! Error types for sync-index.

use zerok_sync_types::SyncError;

/// Errors surfaced by a backing store or block index.
///
/// The folder index passes these through untouched; it never retries.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Record or snapshot encoding failed.
    #[error("encoding error: {0}")]
    Encoding(#[from] SyncError),

    /// Atomic snapshot replacement failed.
    #[error("failed to persist snapshot: {0}")]
    Persist(#[from] tempfile::PersistError),

    /// Stored data is inconsistent.
    #[error("corrupt store: {reason}")]
    Corrupt {
        /// What was found to be inconsistent.
        reason: String,
    },
}

/// Result type alias for storage operations.
pub type StorageResult<T> = std::result::Result<T, StorageError>;
