//! Drains the sync queue against the remote endpoint.
//!
//! A pass reads the whole queue, splits it into fixed-size batches and
//! dispatches each batch concurrently, waiting for every call in a batch
//! before starting the next one. Outcomes are written back per entry:
//! delivered entries are removed, failed ones have their retry count
//! bumped, and entries that reach the retry bound move to the dead-letter
//! list.
//!
//! At most one pass runs at a time. A trigger that arrives while a pass is
//! running, or while offline, returns immediately without queueing.

use crate::blocking::with_store;
use crate::config::SyncConfig;
use crate::connectivity::ConnectivityMonitor;
use crate::error::{RemoteError, SyncError, SyncResult};
use crate::remote::{RemoteEndpoint, RemoteMutation};
use crate::status::{SkipReason, SyncOutcome, SyncReport, SyncStatus};
use futures::future::join_all;
use sehat_store::LocalStore;
use sehat_types::{SyncAction, SyncQueueEntry, Timestamp};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::watch;
use tracing::{debug, error, info, warn};

/// Per-entry result of a delivery attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum EntryOutcome {
    Delivered,
    Requeued,
    Dropped,
    StorageFailed,
}

/// Clears the in-progress flag when a pass ends, including when the pass
/// future is dropped.
struct InProgressGuard<'a>(&'a AtomicBool);

impl<'a> InProgressGuard<'a> {
    fn acquire(flag: &'a AtomicBool) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| Self(flag))
    }
}

impl Drop for InProgressGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

/// Reconciles the sync queue with a remote endpoint.
pub struct Synchronizer {
    store: LocalStore,
    remote: Arc<dyn RemoteEndpoint>,
    connectivity: ConnectivityMonitor,
    config: SyncConfig,
    in_progress: AtomicBool,
    last_sync: Mutex<Option<Timestamp>>,
    status_tx: watch::Sender<SyncStatus>,
}

impl Synchronizer {
    /// Fails with [`SyncError::Config`] if `config` does not validate.
    pub fn new(
        store: LocalStore,
        remote: Arc<dyn RemoteEndpoint>,
        connectivity: ConnectivityMonitor,
        config: SyncConfig,
    ) -> SyncResult<Self> {
        config.validate()?;
        let initial = SyncStatus {
            online: connectivity.is_online(),
            ..Default::default()
        };
        let (status_tx, _) = watch::channel(initial);
        Ok(Self {
            store,
            remote,
            connectivity,
            config,
            in_progress: AtomicBool::new(false),
            last_sync: Mutex::new(None),
            status_tx,
        })
    }

    pub fn config(&self) -> &SyncConfig {
        &self.config
    }

    pub fn connectivity(&self) -> &ConnectivityMonitor {
        &self.connectivity
    }

    pub fn store(&self) -> &LocalStore {
        &self.store
    }

    /// Whether a pass is running right now.
    pub fn is_syncing(&self) -> bool {
        self.in_progress.load(Ordering::Acquire)
    }

    /// When the last completed pass finished.
    pub fn last_sync_time(&self) -> Option<Timestamp> {
        self.last_sync.lock().map(|t| *t).unwrap_or(None)
    }

    /// Current status. The pending count is read from storage.
    pub async fn status(&self) -> SyncResult<SyncStatus> {
        let (pending_count, dead_letter_count) =
            with_store(&self.store, |s| Ok((s.queue_len()?, s.dead_letter_count()?))).await?;
        Ok(SyncStatus {
            online: self.connectivity.is_online(),
            syncing: self.is_syncing(),
            pending_count,
            last_sync_time: self.last_sync_time(),
            dead_letter_count,
        })
    }

    /// Receives the latest status after every change.
    pub fn subscribe(&self) -> watch::Receiver<SyncStatus> {
        self.status_tx.subscribe()
    }

    /// Recomputes the status and notifies subscribers if it changed.
    pub async fn publish_status(&self) {
        match self.status().await {
            Ok(status) => {
                self.status_tx.send_if_modified(|current| {
                    if *current == status {
                        false
                    } else {
                        *current = status;
                        true
                    }
                });
            }
            Err(e) => warn!("Failed to refresh sync status: {}", e),
        }
    }

    /// Runs one pass over the queue unless offline or already running.
    ///
    /// Never fails: delivery and storage errors are contained in the pass
    /// and summarised in the returned report.
    pub async fn sync_pending(&self) -> SyncOutcome {
        if !self.connectivity.is_online() {
            debug!("Skipping sync: offline");
            return SyncOutcome::Skipped(SkipReason::Offline);
        }
        let Some(guard) = InProgressGuard::acquire(&self.in_progress) else {
            debug!("Skipping sync: a pass is already running");
            return SyncOutcome::Skipped(SkipReason::AlreadyRunning);
        };

        info!("Starting background sync via {}", self.remote.name());
        self.publish_status().await;

        let report = self.run_pass().await;
        if report.aborted.is_none() {
            if let Ok(mut last) = self.last_sync.lock() {
                *last = Some(Timestamp::now());
            }
        }
        drop(guard);

        if report.is_clean() {
            info!(
                "Background sync completed: {} delivered in {} batches",
                report.delivered, report.batches
            );
        } else {
            warn!(
                "Background sync finished with failures: {} delivered, {} requeued, {} dropped, {} storage errors",
                report.delivered, report.requeued, report.dropped, report.storage_errors
            );
        }
        self.publish_status().await;
        SyncOutcome::Completed(report)
    }

    async fn run_pass(&self) -> SyncReport {
        let mut report = SyncReport::default();

        let entries = match with_store(&self.store, |s| s.list_queue_entries()).await {
            Ok(entries) => entries,
            Err(e) => {
                error!("Background sync failed: {}", e);
                report.aborted = Some(e.to_string());
                return report;
            }
        };

        for batch in entries.chunks(self.config.batch_size) {
            report.batches += 1;
            report.attempted += batch.len();
            debug!("Dispatching batch {} ({} entries)", report.batches, batch.len());

            let outcomes = join_all(batch.iter().map(|entry| self.process_entry(entry))).await;
            for outcome in outcomes {
                match outcome {
                    EntryOutcome::Delivered => report.delivered += 1,
                    EntryOutcome::Requeued => report.requeued += 1,
                    EntryOutcome::Dropped => report.dropped += 1,
                    EntryOutcome::StorageFailed => report.storage_errors += 1,
                }
            }
        }

        report
    }

    async fn process_entry(&self, entry: &SyncQueueEntry) -> EntryOutcome {
        let result = match RemoteMutation::from_entry(entry) {
            Ok(mutation) => self.deliver(&mutation).await,
            Err(e) => Err(RemoteError::Rejected {
                status: 0,
                message: format!("could not encode payload: {e}"),
            }),
        };

        match result {
            Ok(()) => self.on_delivered(entry).await,
            Err(err) => self.on_failed(entry, err).await,
        }
    }

    async fn deliver(&self, mutation: &RemoteMutation) -> Result<(), RemoteError> {
        match tokio::time::timeout(self.config.request_timeout(), self.remote.deliver(mutation))
            .await
        {
            Ok(result) => result,
            Err(_) => Err(RemoteError::Timeout),
        }
    }

    async fn on_delivered(&self, entry: &SyncQueueEntry) -> EntryOutcome {
        let entry_id = entry.entry_id;
        if let Err(e) = with_store(&self.store, move |s| s.remove_queue_entry(&entry_id)).await {
            // The entry stays queued and will be delivered again next pass.
            warn!("Synced entry {} but failed to dequeue it: {}", entry_id, e);
            return EntryOutcome::StorageFailed;
        }
        debug!(
            "Synced {} {} {} successfully",
            entry.action,
            entry.record_type(),
            entry.record_id
        );

        if entry.action != SyncAction::Delete {
            let record_type = entry.record_type();
            let record_id = entry.record_id.clone();
            let marked =
                with_store(&self.store, move |s| s.mark_synced(record_type, &record_id)).await;
            if let Err(e) = marked {
                warn!("Failed to mark {} {} synced: {}", entry.record_type(), entry.record_id, e);
            }
        }
        EntryOutcome::Delivered
    }

    async fn on_failed(&self, entry: &SyncQueueEntry, err: RemoteError) -> EntryOutcome {
        let attempts = entry.retry_count.saturating_add(1);

        if attempts >= self.config.max_retries {
            let failure = SyncError::Permanent {
                entry_id: entry.entry_id,
                attempts,
                reason: err.to_string(),
            };
            error!(
                "Max retries reached for {} {}, removing from queue: {}",
                entry.record_type(),
                entry.record_id,
                failure
            );
            let mut dropped = entry.clone();
            dropped.retry_count = attempts;
            let reason = err.to_string();
            return match with_store(&self.store, move |s| s.dead_letter_entry(&dropped, &reason))
                .await
            {
                Ok(()) => EntryOutcome::Dropped,
                Err(e) => {
                    warn!("Failed to dead-letter entry {}: {}", entry.entry_id, e);
                    EntryOutcome::StorageFailed
                }
            };
        }

        warn!(
            "Failed to sync {} {}: {}",
            entry.record_type(),
            entry.record_id,
            SyncError::Transient {
                entry_id: entry.entry_id,
                attempt: attempts,
                source: err,
            }
        );
        let entry_id = entry.entry_id;
        match with_store(&self.store, move |s| s.set_retry_count(&entry_id, attempts)).await {
            Ok(_) => EntryOutcome::Requeued,
            Err(e) => {
                warn!("Failed to record retry for entry {}: {}", entry_id, e);
                EntryOutcome::StorageFailed
            }
        }
    }
}
