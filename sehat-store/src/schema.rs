//! Table layout.

pub(crate) const SCHEMA: &str = "
    CREATE TABLE IF NOT EXISTS records (
        record_type TEXT NOT NULL,
        id TEXT NOT NULL,
        payload TEXT NOT NULL,
        stored_at INTEGER NOT NULL,
        synced INTEGER NOT NULL DEFAULT 0,
        PRIMARY KEY (record_type, id)
    );
    CREATE INDEX IF NOT EXISTS idx_records_type ON records (record_type);
    CREATE INDEX IF NOT EXISTS idx_records_stored_at ON records (stored_at);

    CREATE TABLE IF NOT EXISTS sync_queue (
        seq INTEGER PRIMARY KEY AUTOINCREMENT,
        entry_id TEXT NOT NULL UNIQUE,
        action TEXT NOT NULL,
        record_type TEXT NOT NULL,
        record_id TEXT NOT NULL,
        payload TEXT NOT NULL,
        enqueued_at INTEGER NOT NULL,
        retry_count INTEGER NOT NULL DEFAULT 0
    );
    CREATE INDEX IF NOT EXISTS idx_sync_queue_enqueued_at ON sync_queue (enqueued_at);
    CREATE INDEX IF NOT EXISTS idx_sync_queue_record ON sync_queue (record_type, record_id);

    CREATE TABLE IF NOT EXISTS critical_cache (
        key TEXT PRIMARY KEY,
        data TEXT NOT NULL,
        cached_at INTEGER NOT NULL
    );
    CREATE INDEX IF NOT EXISTS idx_critical_cache_cached_at ON critical_cache (cached_at);

    CREATE TABLE IF NOT EXISTS dead_letters (
        entry_id TEXT PRIMARY KEY,
        action TEXT NOT NULL,
        record_type TEXT NOT NULL,
        record_id TEXT NOT NULL,
        payload TEXT NOT NULL,
        enqueued_at INTEGER NOT NULL,
        retry_count INTEGER NOT NULL,
        reason TEXT NOT NULL,
        dropped_at INTEGER NOT NULL
    );
";
