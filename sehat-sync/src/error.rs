//! Error types for the sync layer.

use sehat_store::StorageError;
use sehat_types::QueueEntryId;
use thiserror::Error;

/// Result type for sync operations.
pub type SyncResult<T> = Result<T, SyncError>;

/// Errors that can occur in sync operations.
#[derive(Debug, Error)]
pub enum SyncError {
    /// Local storage could not be reached or a transaction failed.
    #[error("storage error: {0}")]
    Storage(#[from] StorageError),

    /// A delivery attempt failed; the entry stays queued.
    #[error("transient sync failure for entry {entry_id} (attempt {attempt}): {source}")]
    Transient {
        entry_id: QueueEntryId,
        attempt: u32,
        #[source]
        source: RemoteError,
    },

    /// The retry bound was reached; the entry was dropped from the queue.
    #[error("permanent sync failure for entry {entry_id} after {attempts} attempts: {reason}")]
    Permanent {
        entry_id: QueueEntryId,
        attempts: u32,
        reason: String,
    },

    /// Serialization error.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Invalid configuration.
    #[error("invalid configuration: {0}")]
    Config(String),

    /// A blocking or background task panicked or was cancelled.
    #[error("task failed: {0}")]
    Task(String),
}

impl SyncError {
    /// Returns true if the error means local storage is unreachable.
    pub fn is_storage_unavailable(&self) -> bool {
        matches!(self, SyncError::Storage(e) if e.is_unavailable())
    }
}

/// Failure reported by a remote endpoint for one delivery attempt.
///
/// The synchronizer treats every variant the same way (one attempt used up);
/// the distinction is kept for logs and dead-letter reasons.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RemoteError {
    /// The request never got a response.
    #[error("network error: {0}")]
    Network(String),

    /// The endpoint answered with a non-success status.
    #[error("rejected with status {status}: {message}")]
    Rejected { status: u16, message: String },

    /// No response within the request timeout.
    #[error("request timed out")]
    Timeout,
}

impl RemoteError {
    /// Whether retrying could plausibly succeed. Informational only.
    pub fn is_retriable(&self) -> bool {
        match self {
            RemoteError::Network(_) | RemoteError::Timeout => true,
            RemoteError::Rejected { status, .. } => *status == 429 || *status >= 500,
        }
    }
}
