//! Runs blocking store calls off the async executor.

use crate::error::{SyncError, SyncResult};
use sehat_store::{LocalStore, StorageResult};

/// Runs `f` against `store` on the blocking pool and waits for it.
pub(crate) async fn with_store<T, F>(store: &LocalStore, f: F) -> SyncResult<T>
where
    F: FnOnce(&LocalStore) -> StorageResult<T> + Send + 'static,
    T: Send + 'static,
{
    let store = store.clone();
    tokio::task::spawn_blocking(move || f(&store))
        .await
        .map_err(|e| SyncError::Task(format!("store call panicked: {e}")))?
        .map_err(SyncError::from)
}
