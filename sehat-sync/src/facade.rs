//! The single entry point used by application code.
//!
//! Writes are persisted and enqueued in one store transaction, so a write
//! that returns `Ok` survives a restart together with its pending sync
//! entry. Storage errors are returned to the caller; sync failures are not
//! (see [`OfflineFacade::status`] and [`OfflineFacade::dead_letters`]).

use crate::blocking::with_store;
use crate::config::OfflineConfig;
use crate::connectivity::ConnectivityMonitor;
use crate::error::{SyncError, SyncResult};
use crate::remote::RemoteEndpoint;
use crate::scheduler::{SchedulerHandle, SyncScheduler};
use crate::status::{SyncOutcome, SyncStatus};
use crate::synchronizer::Synchronizer;
use sehat_store::LocalStore;
use sehat_types::{
    CriticalCacheEntry, DeadLetter, DomainRecord, RecordPayload, RecordType, SyncAction,
    SyncQueueEntry,
};
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{watch, Notify};
use tracing::{debug, info};

/// Offline-first access to domain records.
///
/// Cheap to clone; clones share the store, synchronizer and status channel.
#[derive(Clone)]
pub struct OfflineFacade {
    store: LocalStore,
    synchronizer: Arc<Synchronizer>,
    nudge: Arc<Notify>,
    cache_max_age: Duration,
}

impl OfflineFacade {
    /// Wires a facade over an already opened store.
    pub fn new(
        store: LocalStore,
        remote: Arc<dyn RemoteEndpoint>,
        connectivity: ConnectivityMonitor,
        config: &OfflineConfig,
    ) -> SyncResult<Self> {
        let synchronizer = Arc::new(Synchronizer::new(
            store.clone(),
            remote,
            connectivity,
            config.sync.clone(),
        )?);
        Ok(Self {
            store,
            synchronizer,
            nudge: Arc::new(Notify::new()),
            cache_max_age: config.cache_max_age(),
        })
    }

    /// Opens the database named in `config` and wires a facade over it.
    pub async fn open(
        config: &OfflineConfig,
        remote: Arc<dyn RemoteEndpoint>,
        connectivity: ConnectivityMonitor,
    ) -> SyncResult<Self> {
        let path = config.database_path.clone();
        let store = tokio::task::spawn_blocking(move || LocalStore::open(path))
            .await
            .map_err(|e| SyncError::Task(format!("open panicked: {e}")))??;
        Self::new(store, remote, connectivity, config)
    }

    /// Persists a new record and enqueues a `create`.
    pub async fn save(&self, record_type: RecordType, id: &str, data: Value) -> SyncResult<()> {
        let payload = RecordPayload::new(record_type, data);
        self.mutate(SyncQueueEntry::new(SyncAction::Create, id, payload))
            .await
    }

    /// Replaces a record and enqueues an `update`.
    pub async fn update(&self, record_type: RecordType, id: &str, data: Value) -> SyncResult<()> {
        let payload = RecordPayload::new(record_type, data);
        self.mutate(SyncQueueEntry::new(SyncAction::Update, id, payload))
            .await
    }

    /// Removes a record and enqueues a `delete` carrying its id.
    pub async fn delete(&self, record_type: RecordType, id: &str) -> SyncResult<()> {
        let payload = RecordPayload::new(record_type, json!({ "id": id }));
        self.mutate(SyncQueueEntry::new(SyncAction::Delete, id, payload))
            .await
    }

    async fn mutate(&self, entry: SyncQueueEntry) -> SyncResult<()> {
        let action = entry.action;
        let record_type = entry.record_type();
        let record_id = entry.record_id.clone();

        with_store(&self.store, move |s| s.record_mutation(&entry)).await?;
        info!("{} {} {} saved locally", action, record_type, record_id);

        self.synchronizer.publish_status().await;
        if self.synchronizer.connectivity().is_online() {
            self.nudge.notify_one();
        }
        Ok(())
    }

    /// All locally known records of a type.
    pub async fn read_by_type(&self, record_type: RecordType) -> SyncResult<Vec<DomainRecord>> {
        with_store(&self.store, move |s| s.get_all_by_type(record_type)).await
    }

    pub async fn get(&self, record_type: RecordType, id: &str) -> SyncResult<Option<DomainRecord>> {
        let id = id.to_string();
        with_store(&self.store, move |s| s.get(record_type, &id)).await
    }

    /// Number of stored records per type. Types without records are left out.
    pub async fn record_counts(&self) -> SyncResult<Vec<(RecordType, usize)>> {
        with_store(&self.store, |s| s.count_by_type()).await
    }

    /// Mutations not yet confirmed by the remote side, in enqueue order.
    pub async fn pending_entries(&self) -> SyncResult<Vec<SyncQueueEntry>> {
        with_store(&self.store, |s| s.list_queue_entries()).await
    }

    /// Runs a sync pass now if online and none is running.
    ///
    /// Returning means a pass was attempted (or skipped), not that every
    /// entry was delivered.
    pub async fn force_sync(&self) -> SyncOutcome {
        self.synchronizer.sync_pending().await
    }

    /// Current status with the pending count read from storage.
    pub async fn status(&self) -> SyncResult<SyncStatus> {
        self.synchronizer.status().await
    }

    /// Receives the latest status on every change.
    pub fn subscribe(&self) -> watch::Receiver<SyncStatus> {
        self.synchronizer.subscribe()
    }

    pub fn connectivity(&self) -> &ConnectivityMonitor {
        self.synchronizer.connectivity()
    }

    pub fn synchronizer(&self) -> &Arc<Synchronizer> {
        &self.synchronizer
    }

    /// Starts the background trigger loop. Must be called inside a tokio
    /// runtime; the loop stops when the handle is shut down.
    pub fn start_background(&self) -> SchedulerHandle {
        SyncScheduler::spawn(self.synchronizer.clone(), self.nudge.clone())
    }

    pub async fn cache_critical(&self, key: &str, data: Value) -> SyncResult<()> {
        let key = key.to_string();
        with_store(&self.store, move |s| s.cache_put(&key, &data)).await
    }

    pub async fn get_critical(&self, key: &str) -> SyncResult<Option<CriticalCacheEntry>> {
        let key = key.to_string();
        with_store(&self.store, move |s| s.cache_get(&key)).await
    }

    /// Drops cache entries older than the configured maximum age.
    pub async fn sweep_expired_cache(&self) -> SyncResult<usize> {
        let max_age = self.cache_max_age;
        let removed = with_store(&self.store, move |s| s.sweep_expired(max_age)).await?;
        if removed > 0 {
            debug!("Swept {} expired cache entries", removed);
        }
        Ok(removed)
    }

    /// Mutations dropped after exhausting their retries, oldest first.
    pub async fn dead_letters(&self) -> SyncResult<Vec<DeadLetter>> {
        with_store(&self.store, |s| s.list_dead_letters()).await
    }

    pub async fn clear_dead_letters(&self) -> SyncResult<usize> {
        let cleared = with_store(&self.store, |s| s.clear_dead_letters()).await?;
        self.synchronizer.publish_status().await;
        Ok(cleared)
    }

    /// Closes the store. Every later operation fails with
    /// [`sehat_store::StorageError::Unavailable`].
    pub fn close(&self) {
        self.store.close();
    }
}
