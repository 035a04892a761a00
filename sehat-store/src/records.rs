//! Domain record partition.

use crate::error::{db_err, StorageResult};
use crate::store::{encode_payload, parse_payload, parse_record_type, LocalStore};
use rusqlite::{params, OptionalExtension, Row};
use sehat_types::{DomainRecord, RecordPayload, RecordType, SyncAction, SyncQueueEntry, Timestamp};

impl LocalStore {
    /// Persists a record, replacing any existing record with the same
    /// `(type, id)`. The replaced record is marked unsynced.
    pub fn put(&self, id: &str, payload: &RecordPayload) -> StorageResult<()> {
        let json = encode_payload(payload)?;
        self.with_conn(|conn| {
            conn.execute(
                "INSERT OR REPLACE INTO records (record_type, id, payload, stored_at, synced)
                 VALUES (?1, ?2, ?3, ?4, 0)",
                params![
                    payload.record_type().as_str(),
                    id,
                    json,
                    Timestamp::now().as_millis() as i64
                ],
            )
            .map_err(db_err("failed to put record"))?;
            Ok(())
        })
    }

    /// Loads a single record.
    pub fn get(&self, record_type: RecordType, id: &str) -> StorageResult<Option<DomainRecord>> {
        self.with_conn(|conn| {
            let row = conn
                .query_row(
                    "SELECT id, payload, stored_at, synced FROM records
                     WHERE record_type = ?1 AND id = ?2",
                    params![record_type.as_str(), id],
                    read_record_row,
                )
                .optional()
                .map_err(db_err("failed to get record"))?;
            row.map(|r| r.into_record(record_type)).transpose()
        })
    }

    /// Returns every record of a type. Order is unspecified.
    pub fn get_all_by_type(&self, record_type: RecordType) -> StorageResult<Vec<DomainRecord>> {
        self.with_conn(|conn| {
            let mut stmt = conn
                .prepare(
                    "SELECT id, payload, stored_at, synced FROM records WHERE record_type = ?1",
                )
                .map_err(db_err("failed to prepare record query"))?;
            let rows = stmt
                .query_map(params![record_type.as_str()], read_record_row)
                .map_err(db_err("failed to query records"))?;

            let mut result = Vec::new();
            for row in rows {
                let row = row.map_err(db_err("failed to read record row"))?;
                result.push(row.into_record(record_type)?);
            }
            Ok(result)
        })
    }

    /// Deletes a record. Returns whether it existed.
    pub fn delete(&self, record_type: RecordType, id: &str) -> StorageResult<bool> {
        self.with_conn(|conn| {
            let n = conn
                .execute(
                    "DELETE FROM records WHERE record_type = ?1 AND id = ?2",
                    params![record_type.as_str(), id],
                )
                .map_err(db_err("failed to delete record"))?;
            Ok(n > 0)
        })
    }

    /// Flags a record as confirmed by the remote side, unless a queued
    /// mutation still targets it. Returns whether the flag was set.
    ///
    /// The pending check and the update are one statement, so a write
    /// committed concurrently is never marked synced.
    pub fn mark_synced(&self, record_type: RecordType, id: &str) -> StorageResult<bool> {
        self.with_conn(|conn| {
            let n = conn
                .execute(
                    "UPDATE records SET synced = 1
                     WHERE record_type = ?1 AND id = ?2
                       AND NOT EXISTS (
                           SELECT 1 FROM sync_queue WHERE record_type = ?1 AND record_id = ?2
                       )",
                    params![record_type.as_str(), id],
                )
                .map_err(db_err("failed to mark record synced"))?;
            Ok(n > 0)
        })
    }

    /// Number of records per type, for every type that has at least one.
    pub fn count_by_type(&self) -> StorageResult<Vec<(RecordType, usize)>> {
        self.with_conn(|conn| {
            let mut stmt = conn
                .prepare(
                    "SELECT record_type, COUNT(*) FROM records
                     GROUP BY record_type ORDER BY record_type",
                )
                .map_err(db_err("failed to prepare count query"))?;
            let rows = stmt
                .query_map([], |row| Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)?)))
                .map_err(db_err("failed to count records"))?;

            let mut result = Vec::new();
            for row in rows {
                let (t, n) = row.map_err(db_err("failed to read count row"))?;
                result.push((parse_record_type(&t)?, n as usize));
            }
            Ok(result)
        })
    }

    /// Applies a mutation to the records partition and appends it to the
    /// sync queue in one transaction.
    ///
    /// `create`/`update` store the entry's payload under its record id;
    /// `delete` removes the record. Either both effects are durable or
    /// neither is.
    pub fn record_mutation(&self, entry: &SyncQueueEntry) -> StorageResult<()> {
        let json = encode_payload(&entry.payload)?;
        let record_type = entry.record_type();
        self.with_conn(|conn| {
            let tx = conn
                .transaction()
                .map_err(db_err("failed to begin transaction"))?;
            match entry.action {
                SyncAction::Create | SyncAction::Update => {
                    tx.execute(
                        "INSERT OR REPLACE INTO records (record_type, id, payload, stored_at, synced)
                         VALUES (?1, ?2, ?3, ?4, 0)",
                        params![
                            record_type.as_str(),
                            entry.record_id,
                            json,
                            entry.enqueued_at.as_millis() as i64
                        ],
                    )
                    .map_err(db_err("failed to put record"))?;
                }
                SyncAction::Delete => {
                    tx.execute(
                        "DELETE FROM records WHERE record_type = ?1 AND id = ?2",
                        params![record_type.as_str(), entry.record_id],
                    )
                    .map_err(db_err("failed to delete record"))?;
                }
            }
            crate::queue::insert_entry(&tx, entry, &json)?;
            tx.commit().map_err(db_err("failed to commit mutation"))?;
            Ok(())
        })
    }
}

struct RecordRow {
    id: String,
    payload: String,
    stored_at: i64,
    synced: bool,
}

impl RecordRow {
    fn into_record(self, record_type: RecordType) -> StorageResult<DomainRecord> {
        Ok(DomainRecord {
            payload: parse_payload(record_type, &self.payload)?,
            id: self.id,
            stored_at: Timestamp::from_millis(self.stored_at as u64),
            synced: self.synced,
        })
    }
}

fn read_record_row(row: &Row<'_>) -> rusqlite::Result<RecordRow> {
    Ok(RecordRow {
        id: row.get(0)?,
        payload: row.get(1)?,
        stored_at: row.get(2)?,
        synced: row.get(3)?,
    })
}
