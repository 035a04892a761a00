//! Pending mutations awaiting delivery to the remote system.

use crate::{Error, QueueEntryId, RecordPayload, RecordType, Timestamp};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// The kind of change a queue entry replays remotely.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SyncAction {
    Create,
    Update,
    Delete,
}

impl SyncAction {
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            SyncAction::Create => "create",
            SyncAction::Update => "update",
            SyncAction::Delete => "delete",
        }
    }
}

impl fmt::Display for SyncAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SyncAction {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "create" => Ok(SyncAction::Create),
            "update" => Ok(SyncAction::Update),
            "delete" => Ok(SyncAction::Delete),
            other => Err(Error::UnknownAction(other.to_string())),
        }
    }
}

/// One mutation accepted locally and not yet confirmed by the remote side.
///
/// Entries are never coalesced: two writes to the same record produce two
/// entries, replayed independently and in order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SyncQueueEntry {
    pub entry_id: QueueEntryId,
    pub action: SyncAction,
    /// Id of the record the mutation applies to.
    pub record_id: String,
    pub payload: RecordPayload,
    pub enqueued_at: Timestamp,
    /// Failed delivery attempts so far.
    pub retry_count: u32,
}

impl SyncQueueEntry {
    /// Creates a fresh entry with a new id and no failed attempts.
    pub fn new(action: SyncAction, record_id: impl Into<String>, payload: RecordPayload) -> Self {
        Self {
            entry_id: QueueEntryId::new(),
            action,
            record_id: record_id.into(),
            payload,
            enqueued_at: Timestamp::now(),
            retry_count: 0,
        }
    }

    /// The record category the mutation applies to.
    #[must_use]
    pub fn record_type(&self) -> RecordType {
        self.payload.record_type()
    }
}

/// A queue entry that exhausted its retry budget and was removed from the
/// queue. Kept so a discarded mutation stays observable.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeadLetter {
    pub entry: SyncQueueEntry,
    /// The last delivery failure.
    pub reason: String,
    pub dropped_at: Timestamp,
}
