//! Error types for the storage layer.

use thiserror::Error;

/// Result type for storage operations.
pub type StorageResult<T> = Result<T, StorageError>;

/// Errors that can occur in storage operations.
#[derive(Debug, Error)]
pub enum StorageError {
    /// The database could not be opened, is closed, or a statement or
    /// transaction could not complete.
    #[error("storage unavailable: {0}")]
    Unavailable(String),

    /// Serialization/deserialization error.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// A stored row could not be decoded.
    #[error("invalid data: {0}")]
    InvalidData(String),

    /// IO error (file system).
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl StorageError {
    /// Returns true if the error means storage could not be reached at all,
    /// as opposed to a single bad row.
    pub fn is_unavailable(&self) -> bool {
        matches!(self, StorageError::Unavailable(_) | StorageError::Io(_))
    }
}

/// Maps a SQLite error to [`StorageError::Unavailable`] with context.
pub(crate) fn db_err(context: &'static str) -> impl FnOnce(rusqlite::Error) -> StorageError {
    move |e| StorageError::Unavailable(format!("{context}: {e}"))
}
