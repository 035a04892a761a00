//! Critical cache partition.

use crate::error::{db_err, StorageResult};
use crate::store::LocalStore;
use rusqlite::{params, OptionalExtension};
use sehat_types::{CriticalCacheEntry, Timestamp};
use serde_json::Value;
use std::time::Duration;
use tracing::debug;

/// Default maximum age of a cache entry before a sweep removes it (7 days).
pub const DEFAULT_CACHE_MAX_AGE: Duration = Duration::from_secs(7 * 24 * 60 * 60);

impl LocalStore {
    /// Stores a cache value stamped with the current time, replacing any
    /// previous value for `key`.
    pub fn cache_put(&self, key: &str, data: &Value) -> StorageResult<()> {
        self.cache_put_at(key, data, Timestamp::now())
    }

    /// Stores a cache value with an explicit timestamp.
    pub fn cache_put_at(&self, key: &str, data: &Value, cached_at: Timestamp) -> StorageResult<()> {
        let json = serde_json::to_string(data)?;
        self.with_conn(|conn| {
            conn.execute(
                "INSERT OR REPLACE INTO critical_cache (key, data, cached_at) VALUES (?1, ?2, ?3)",
                params![key, json, cached_at.as_millis() as i64],
            )
            .map_err(db_err("failed to put cache entry"))?;
            Ok(())
        })
    }

    /// Loads a cache entry.
    pub fn cache_get(&self, key: &str) -> StorageResult<Option<CriticalCacheEntry>> {
        let row = self.with_conn(|conn| {
            conn.query_row(
                "SELECT data, cached_at FROM critical_cache WHERE key = ?1",
                params![key],
                |row| Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)?)),
            )
            .optional()
            .map_err(db_err("failed to get cache entry"))
        })?;

        match row {
            Some((json, cached_at)) => Ok(Some(CriticalCacheEntry {
                key: key.to_string(),
                data: serde_json::from_str(&json)?,
                cached_at: Timestamp::from_millis(cached_at as u64),
            })),
            None => Ok(None),
        }
    }

    /// Removes cache entries older than `max_age`. Returns how many were
    /// removed.
    pub fn sweep_expired(&self, max_age: Duration) -> StorageResult<usize> {
        self.sweep_expired_at(Timestamp::now(), max_age)
    }

    /// Removes cache entries whose timestamp is at or before `now - max_age`.
    pub fn sweep_expired_at(&self, now: Timestamp, max_age: Duration) -> StorageResult<usize> {
        let cutoff = now.saturating_sub(max_age);
        let removed = self.with_conn(|conn| {
            conn.execute(
                "DELETE FROM critical_cache WHERE cached_at <= ?1",
                params![cutoff.as_millis() as i64],
            )
            .map_err(db_err("failed to sweep cache"))
        })?;
        debug!("Swept {} expired cache entries (cutoff {})", removed, cutoff);
        Ok(removed)
    }
}
