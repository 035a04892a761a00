//! Sync queue and dead-letter partitions.
//!
//! The queue is ordered by an autoincrement sequence assigned at insert
//! time, so listing order is enqueue order even if the wall clock moves
//! backwards between two writes.

use crate::error::{db_err, StorageError, StorageResult};
use crate::store::{encode_payload, parse_action, parse_payload, parse_record_type, LocalStore};
use rusqlite::{params, Connection, Row};
use sehat_types::{DeadLetter, QueueEntryId, SyncQueueEntry, Timestamp};
use tracing::warn;

impl LocalStore {
    /// Appends an entry to the end of the queue.
    pub fn append_queue_entry(&self, entry: &SyncQueueEntry) -> StorageResult<()> {
        let json = encode_payload(&entry.payload)?;
        self.with_conn(|conn| insert_entry(conn, entry, &json))
    }

    /// Returns every queued entry in enqueue order.
    pub fn list_queue_entries(&self) -> StorageResult<Vec<SyncQueueEntry>> {
        self.with_conn(|conn| {
            let mut stmt = conn
                .prepare(
                    "SELECT entry_id, action, record_type, record_id, payload, enqueued_at, retry_count
                     FROM sync_queue ORDER BY seq ASC",
                )
                .map_err(db_err("failed to prepare queue query"))?;
            let rows = stmt
                .query_map([], read_entry_row)
                .map_err(db_err("failed to query queue"))?;

            let mut result = Vec::new();
            for row in rows {
                let row = row.map_err(db_err("failed to read queue row"))?;
                result.push(row.into_entry()?);
            }
            Ok(result)
        })
    }

    /// Removes an entry. Returns whether it was present.
    pub fn remove_queue_entry(&self, entry_id: &QueueEntryId) -> StorageResult<bool> {
        self.with_conn(|conn| {
            let n = conn
                .execute(
                    "DELETE FROM sync_queue WHERE entry_id = ?1",
                    params![entry_id.to_string()],
                )
                .map_err(db_err("failed to remove queue entry"))?;
            Ok(n > 0)
        })
    }

    /// Persists a new retry count for an entry. Returns whether it was
    /// present.
    pub fn set_retry_count(&self, entry_id: &QueueEntryId, retry_count: u32) -> StorageResult<bool> {
        self.with_conn(|conn| {
            let n = conn
                .execute(
                    "UPDATE sync_queue SET retry_count = ?2 WHERE entry_id = ?1",
                    params![entry_id.to_string(), retry_count],
                )
                .map_err(db_err("failed to update retry count"))?;
            Ok(n > 0)
        })
    }

    /// Number of queued entries, read from storage.
    pub fn queue_len(&self) -> StorageResult<usize> {
        self.with_conn(|conn| {
            let count: i64 = conn
                .query_row("SELECT COUNT(*) FROM sync_queue", [], |row| row.get(0))
                .map_err(db_err("failed to count queue"))?;
            Ok(count as usize)
        })
    }

    /// Moves an entry from the queue to the dead-letter list in one
    /// transaction, recording the entry as given (including its final
    /// retry count) and the reason it was dropped.
    pub fn dead_letter_entry(&self, entry: &SyncQueueEntry, reason: &str) -> StorageResult<()> {
        let json = encode_payload(&entry.payload)?;
        self.with_conn(|conn| {
            let tx = conn
                .transaction()
                .map_err(db_err("failed to begin transaction"))?;
            let removed = tx
                .execute(
                    "DELETE FROM sync_queue WHERE entry_id = ?1",
                    params![entry.entry_id.to_string()],
                )
                .map_err(db_err("failed to remove queue entry"))?;
            if removed == 0 {
                warn!("Dead-lettering entry {} that was not queued", entry.entry_id);
            }
            tx.execute(
                "INSERT OR REPLACE INTO dead_letters
                 (entry_id, action, record_type, record_id, payload, enqueued_at, retry_count, reason, dropped_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
                params![
                    entry.entry_id.to_string(),
                    entry.action.as_str(),
                    entry.record_type().as_str(),
                    entry.record_id,
                    json,
                    entry.enqueued_at.as_millis() as i64,
                    entry.retry_count,
                    reason,
                    Timestamp::now().as_millis() as i64,
                ],
            )
            .map_err(db_err("failed to save dead letter"))?;
            tx.commit().map_err(db_err("failed to commit dead letter"))?;
            Ok(())
        })
    }

    /// Returns every dead letter, oldest drop first.
    pub fn list_dead_letters(&self) -> StorageResult<Vec<DeadLetter>> {
        self.with_conn(|conn| {
            let mut stmt = conn
                .prepare(
                    "SELECT entry_id, action, record_type, record_id, payload, enqueued_at, retry_count,
                            reason, dropped_at
                     FROM dead_letters ORDER BY dropped_at ASC, rowid ASC",
                )
                .map_err(db_err("failed to prepare dead-letter query"))?;
            let rows = stmt
                .query_map([], |row| {
                    let entry = read_entry_row(row)?;
                    let reason: String = row.get(7)?;
                    let dropped_at: i64 = row.get(8)?;
                    Ok((entry, reason, dropped_at))
                })
                .map_err(db_err("failed to query dead letters"))?;

            let mut result = Vec::new();
            for row in rows {
                let (entry, reason, dropped_at) =
                    row.map_err(db_err("failed to read dead-letter row"))?;
                result.push(DeadLetter {
                    entry: entry.into_entry()?,
                    reason,
                    dropped_at: Timestamp::from_millis(dropped_at as u64),
                });
            }
            Ok(result)
        })
    }

    /// Number of dead letters.
    pub fn dead_letter_count(&self) -> StorageResult<usize> {
        self.with_conn(|conn| {
            let count: i64 = conn
                .query_row("SELECT COUNT(*) FROM dead_letters", [], |row| row.get(0))
                .map_err(db_err("failed to count dead letters"))?;
            Ok(count as usize)
        })
    }

    /// Deletes all dead letters. Returns how many were removed.
    pub fn clear_dead_letters(&self) -> StorageResult<usize> {
        self.with_conn(|conn| {
            conn.execute("DELETE FROM dead_letters", [])
                .map_err(db_err("failed to clear dead letters"))
        })
    }
}

pub(crate) fn insert_entry(
    conn: &Connection,
    entry: &SyncQueueEntry,
    payload_json: &str,
) -> StorageResult<()> {
    conn.execute(
        "INSERT INTO sync_queue (entry_id, action, record_type, record_id, payload, enqueued_at, retry_count)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        params![
            entry.entry_id.to_string(),
            entry.action.as_str(),
            entry.record_type().as_str(),
            entry.record_id,
            payload_json,
            entry.enqueued_at.as_millis() as i64,
            entry.retry_count,
        ],
    )
    .map_err(db_err("failed to append queue entry"))?;
    Ok(())
}

struct EntryRow {
    entry_id: String,
    action: String,
    record_type: String,
    record_id: String,
    payload: String,
    enqueued_at: i64,
    retry_count: u32,
}

impl EntryRow {
    fn into_entry(self) -> StorageResult<SyncQueueEntry> {
        let record_type = parse_record_type(&self.record_type)?;
        let entry_id = QueueEntryId::parse(&self.entry_id)
            .map_err(|e| StorageError::InvalidData(format!("invalid entry_id: {e}")))?;
        Ok(SyncQueueEntry {
            entry_id,
            action: parse_action(&self.action)?,
            record_id: self.record_id,
            payload: parse_payload(record_type, &self.payload)?,
            enqueued_at: Timestamp::from_millis(self.enqueued_at as u64),
            retry_count: self.retry_count,
        })
    }
}

fn read_entry_row(row: &Row<'_>) -> rusqlite::Result<EntryRow> {
    Ok(EntryRow {
        entry_id: row.get(0)?,
        action: row.get(1)?,
        record_type: row.get(2)?,
        record_id: row.get(3)?,
        payload: row.get(4)?,
        enqueued_at: row.get(5)?,
        retry_count: row.get(6)?,
    })
}
