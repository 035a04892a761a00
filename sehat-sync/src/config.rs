//! Configuration for the offline data layer.

use crate::error::{SyncError, SyncResult};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Configuration for the synchronizer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncConfig {
    /// Maximum entries dispatched concurrently in one batch.
    pub batch_size: usize,
    /// Failed attempts after which an entry is dropped.
    pub max_retries: u32,
    /// Periodic sync interval while online (seconds).
    pub sync_interval_secs: u64,
    /// Timeout for a single remote call (ms).
    pub request_timeout_ms: u64,
    /// Delay between a local write and the sync attempt it schedules (ms).
    pub save_sync_delay_ms: u64,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            batch_size: 10,
            max_retries: 3,
            sync_interval_secs: 30,
            request_timeout_ms: 30_000,
            save_sync_delay_ms: 1_000,
        }
    }
}

impl SyncConfig {
    pub fn sync_interval(&self) -> Duration {
        Duration::from_secs(self.sync_interval_secs)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }

    pub fn save_sync_delay(&self) -> Duration {
        Duration::from_millis(self.save_sync_delay_ms)
    }

    /// Rejects values the synchronizer cannot run with.
    pub fn validate(&self) -> SyncResult<()> {
        if self.batch_size == 0 {
            return Err(SyncError::Config("batch_size must be at least 1".into()));
        }
        if self.max_retries == 0 {
            return Err(SyncError::Config("max_retries must be at least 1".into()));
        }
        if self.sync_interval_secs == 0 {
            return Err(SyncError::Config("sync_interval_secs must be at least 1".into()));
        }
        if self.request_timeout_ms == 0 {
            return Err(SyncError::Config("request_timeout_ms must be at least 1".into()));
        }
        Ok(())
    }
}

/// Top-level configuration for [`crate::OfflineFacade`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct OfflineConfig {
    /// SQLite database file.
    pub database_path: PathBuf,
    /// Synchronizer settings.
    pub sync: SyncConfig,
    /// Maximum age of critical cache entries (seconds).
    pub cache_max_age_secs: u64,
}

impl Default for OfflineConfig {
    fn default() -> Self {
        Self {
            database_path: PathBuf::from("sehat-offline.db"),
            sync: SyncConfig::default(),
            cache_max_age_secs: 7 * 24 * 60 * 60, // 7 days
        }
    }
}

impl OfflineConfig {
    /// Parses and validates a JSON configuration. Missing fields take
    /// their defaults.
    pub fn from_json(json: &str) -> SyncResult<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.sync.validate()?;
        Ok(config)
    }

    /// Reads a JSON configuration file.
    pub fn from_file(path: impl AsRef<Path>) -> SyncResult<Self> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path)
            .map_err(|e| SyncError::Config(format!("failed to read {}: {e}", path.display())))?;
        Self::from_json(&json)
    }

    pub fn cache_max_age(&self) -> Duration {
        Duration::from_secs(self.cache_max_age_secs)
    }
}
