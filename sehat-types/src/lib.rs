//! Core type definitions for the Sehat offline-first data layer.
//!
//! This crate defines the fundamental types shared by the local store and
//! the synchronizer:
//! - Queue entry identifiers (UUID v7, time-ordered)
//! - Millisecond wall-clock timestamps
//! - Domain records and their closed payload union
//! - Pending mutations (sync queue entries) and dead letters
//!
//! Screen-level models (forms, translated labels, role dashboards) live in
//! the application, not here.

mod ids;
mod mutation;
mod record;
mod timestamp;

pub use ids::QueueEntryId;
pub use mutation::{DeadLetter, SyncAction, SyncQueueEntry};
pub use record::{CriticalCacheEntry, DomainRecord, RecordPayload, RecordType};
pub use timestamp::Timestamp;

/// Result type alias using the crate's error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in type operations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("invalid UUID: {0}")]
    InvalidUuid(#[from] uuid::Error),

    #[error("unknown record type: {0}")]
    UnknownRecordType(String),

    #[error("unknown sync action: {0}")]
    UnknownAction(String),
}
