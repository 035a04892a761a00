//! Sync status and pass reports.

use sehat_types::Timestamp;
use serde::{Deserialize, Serialize};

/// Observable health of the offline layer.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncStatus {
    /// Last observed connectivity.
    pub online: bool,
    /// Whether a sync pass is running.
    pub syncing: bool,
    /// Entries in the sync queue, read from storage.
    pub pending_count: usize,
    /// When the last completed pass finished.
    pub last_sync_time: Option<Timestamp>,
    /// Entries dropped after exhausting their retries.
    pub dead_letter_count: usize,
}

/// What one sync pass did.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SyncReport {
    /// Batches dispatched.
    pub batches: usize,
    /// Entries whose delivery was attempted.
    pub attempted: usize,
    /// Entries confirmed by the remote side and removed.
    pub delivered: usize,
    /// Entries that failed and remain queued.
    pub requeued: usize,
    /// Entries that reached the retry bound and were dead-lettered.
    pub dropped: usize,
    /// Entries whose outcome could not be written back to storage.
    pub storage_errors: usize,
    /// Set when the queue could not be read and the pass did nothing.
    pub aborted: Option<String>,
}

impl SyncReport {
    /// True if every attempted entry was delivered.
    pub fn is_clean(&self) -> bool {
        self.aborted.is_none() && self.delivered == self.attempted
    }
}

/// Why a sync trigger did not start a pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    Offline,
    AlreadyRunning,
}

/// Result of a sync trigger.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncOutcome {
    Completed(SyncReport),
    Skipped(SkipReason),
}

impl SyncOutcome {
    pub fn report(&self) -> Option<&SyncReport> {
        match self {
            SyncOutcome::Completed(report) => Some(report),
            SyncOutcome::Skipped(_) => None,
        }
    }

    pub fn is_skipped(&self) -> bool {
        matches!(self, SyncOutcome::Skipped(_))
    }
}
