//! Connection management for the local store.

use crate::error::{db_err, StorageError, StorageResult};
use crate::schema::SCHEMA;
use rusqlite::Connection;
use sehat_types::{RecordPayload, RecordType, SyncAction};
use std::path::Path;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tracing::{debug, info};

/// How long a statement waits on a locked database file before failing.
const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// Durable, type-partitioned storage for records, the sync queue and the
/// critical cache.
///
/// Cloning is cheap and yields another handle to the same connection.
#[derive(Clone)]
pub struct LocalStore {
    conn: Arc<Mutex<Option<Connection>>>,
    location: Arc<str>,
}

impl LocalStore {
    /// Opens (or creates) a store at the given path.
    ///
    /// Missing parent directories are created. File databases use WAL
    /// journaling so readers do not block the writer.
    pub fn open(path: impl AsRef<Path>) -> StorageResult<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let conn = Connection::open(path).map_err(|e| {
            StorageError::Unavailable(format!("failed to open {}: {e}", path.display()))
        })?;
        conn.busy_timeout(BUSY_TIMEOUT)
            .map_err(db_err("failed to set busy timeout"))?;
        let mode: String = conn
            .pragma_update_and_check(None, "journal_mode", "WAL", |row| row.get(0))
            .map_err(db_err("failed to enable WAL"))?;
        debug!("Local store journal mode: {}", mode);

        let store = Self::from_connection(conn, path.display().to_string())?;
        info!("Opened local store at {}", store.location);
        Ok(store)
    }

    /// Opens an in-memory store (for testing). Contents are lost on drop.
    pub fn open_in_memory() -> StorageResult<Self> {
        let conn = Connection::open_in_memory()
            .map_err(db_err("failed to open in-memory store"))?;
        Self::from_connection(conn, ":memory:".to_string())
    }

    fn from_connection(conn: Connection, location: String) -> StorageResult<Self> {
        conn.execute_batch(SCHEMA)
            .map_err(db_err("failed to init schema"))?;
        Ok(Self {
            conn: Arc::new(Mutex::new(Some(conn))),
            location: location.into(),
        })
    }

    /// Closes the underlying connection. Every later operation on this or
    /// any cloned handle fails with [`StorageError::Unavailable`].
    pub fn close(&self) {
        if let Ok(mut guard) = self.conn.lock() {
            if guard.take().is_some() {
                info!("Closed local store at {}", self.location);
            }
        }
    }

    /// Returns whether the store is still open.
    pub fn is_open(&self) -> bool {
        self.conn.lock().map(|g| g.is_some()).unwrap_or(false)
    }

    /// The database path, or `:memory:`.
    pub fn location(&self) -> &str {
        &self.location
    }

    /// Runs `f` against the open connection.
    pub(crate) fn with_conn<T>(
        &self,
        f: impl FnOnce(&mut Connection) -> StorageResult<T>,
    ) -> StorageResult<T> {
        let mut guard = self
            .conn
            .lock()
            .map_err(|_| StorageError::Unavailable("store lock poisoned".into()))?;
        let conn = guard
            .as_mut()
            .ok_or_else(|| StorageError::Unavailable(format!("store {} is closed", self.location)))?;
        f(conn)
    }
}

impl std::fmt::Debug for LocalStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LocalStore")
            .field("location", &self.location)
            .field("open", &self.is_open())
            .finish()
    }
}

// ── Row decoding helpers ─────────────────────────────────────────

pub(crate) fn parse_record_type(s: &str) -> StorageResult<RecordType> {
    s.parse()
        .map_err(|e| StorageError::InvalidData(format!("{e}")))
}

pub(crate) fn parse_action(s: &str) -> StorageResult<SyncAction> {
    s.parse()
        .map_err(|e| StorageError::InvalidData(format!("{e}")))
}

pub(crate) fn parse_payload(record_type: RecordType, json: &str) -> StorageResult<RecordPayload> {
    RecordPayload::from_json(record_type, json)
        .map_err(|e| StorageError::InvalidData(format!("bad {record_type} payload: {e}")))
}

pub(crate) fn encode_payload(payload: &RecordPayload) -> StorageResult<String> {
    Ok(serde_json::to_string(payload.data())?)
}
