use pretty_assertions::assert_eq;
use sehat_store::{LocalStore, StorageError};
use sehat_types::{RecordPayload, RecordType, SyncAction, SyncQueueEntry};
use serde_json::json;
use tempfile::TempDir;

fn medicine(data: serde_json::Value) -> RecordPayload {
    RecordPayload::new(RecordType::Medicine, data)
}

// ── put / get ────────────────────────────────────────────────────

#[test]
fn put_then_get() {
    let store = LocalStore::open_in_memory().unwrap();
    store.put("1", &medicine(json!({"name": "ORS", "stock": 40}))).unwrap();

    let record = store.get(RecordType::Medicine, "1").unwrap().unwrap();
    assert_eq!(record.id, "1");
    assert_eq!(record.payload, medicine(json!({"name": "ORS", "stock": 40})));
    assert!(!record.synced);
}

#[test]
fn get_missing_returns_none() {
    let store = LocalStore::open_in_memory().unwrap();
    assert!(store.get(RecordType::Patient, "nope").unwrap().is_none());
}

#[test]
fn same_key_is_replaced_not_duplicated() {
    let store = LocalStore::open_in_memory().unwrap();
    store.put("1", &medicine(json!("A"))).unwrap();
    store.put("1", &medicine(json!("B"))).unwrap();

    let all = store.get_all_by_type(RecordType::Medicine).unwrap();
    assert_eq!(all.len(), 1);
    assert_eq!(all[0].payload.data(), &json!("B"));
}

#[test]
fn same_id_in_different_types_are_distinct() {
    let store = LocalStore::open_in_memory().unwrap();
    store.put("7", &medicine(json!({"m": 1}))).unwrap();
    store
        .put("7", &RecordPayload::new(RecordType::Patient, json!({"p": 1})))
        .unwrap();

    assert_eq!(store.get_all_by_type(RecordType::Medicine).unwrap().len(), 1);
    assert_eq!(store.get_all_by_type(RecordType::Patient).unwrap().len(), 1);
    assert_eq!(
        store.get(RecordType::Patient, "7").unwrap().unwrap().payload.data(),
        &json!({"p": 1})
    );
}

#[test]
fn get_all_by_type_empty() {
    let store = LocalStore::open_in_memory().unwrap();
    assert!(store.get_all_by_type(RecordType::Consultation).unwrap().is_empty());
}

#[test]
fn get_all_by_type_only_returns_that_partition() {
    let store = LocalStore::open_in_memory().unwrap();
    for i in 0..5 {
        store.put(&i.to_string(), &medicine(json!(i))).unwrap();
    }
    store
        .put("x", &RecordPayload::new(RecordType::User, json!({"role": "doctor"})))
        .unwrap();

    let meds = store.get_all_by_type(RecordType::Medicine).unwrap();
    assert_eq!(meds.len(), 5);
    assert!(meds.iter().all(|r| r.record_type() == RecordType::Medicine));
}

#[test]
fn delete_record() {
    let store = LocalStore::open_in_memory().unwrap();
    store.put("1", &medicine(json!({}))).unwrap();
    assert!(store.delete(RecordType::Medicine, "1").unwrap());
    assert!(!store.delete(RecordType::Medicine, "1").unwrap());
    assert!(store.get(RecordType::Medicine, "1").unwrap().is_none());
}

#[test]
fn mark_synced_and_reset_on_write() {
    let store = LocalStore::open_in_memory().unwrap();
    store.put("1", &medicine(json!(1))).unwrap();
    assert!(store.mark_synced(RecordType::Medicine, "1").unwrap());
    assert!(store.get(RecordType::Medicine, "1").unwrap().unwrap().synced);

    store.put("1", &medicine(json!(2))).unwrap();
    assert!(!store.get(RecordType::Medicine, "1").unwrap().unwrap().synced);

    assert!(!store.mark_synced(RecordType::Medicine, "missing").unwrap());
}

#[test]
fn mark_synced_skips_record_with_pending_write() {
    let store = LocalStore::open_in_memory().unwrap();
    let create = SyncQueueEntry::new(
        SyncAction::Create,
        "p1",
        RecordPayload::new(RecordType::Patient, json!(1)),
    );
    store.record_mutation(&create).unwrap();

    // The create is delivered and dequeued, then an update lands before
    // the record is flagged.
    assert!(store.remove_queue_entry(&create.entry_id).unwrap());
    let update = SyncQueueEntry::new(
        SyncAction::Update,
        "p1",
        RecordPayload::new(RecordType::Patient, json!(2)),
    );
    store.record_mutation(&update).unwrap();

    assert!(!store.mark_synced(RecordType::Patient, "p1").unwrap());
    let record = store.get(RecordType::Patient, "p1").unwrap().unwrap();
    assert_eq!(record.payload.data(), &json!(2));
    assert!(!record.synced);

    assert!(store.remove_queue_entry(&update.entry_id).unwrap());
    assert!(store.mark_synced(RecordType::Patient, "p1").unwrap());
    assert!(store.get(RecordType::Patient, "p1").unwrap().unwrap().synced);
}

#[test]
fn count_by_type() {
    let store = LocalStore::open_in_memory().unwrap();
    store.put("a", &medicine(json!(1))).unwrap();
    store.put("b", &medicine(json!(2))).unwrap();
    store
        .put("c", &RecordPayload::new(RecordType::Patient, json!(3)))
        .unwrap();

    let counts = store.count_by_type().unwrap();
    assert_eq!(counts, vec![(RecordType::Medicine, 2), (RecordType::Patient, 1)]);
}

// ── record_mutation ──────────────────────────────────────────────

#[test]
fn record_mutation_writes_record_and_queue_entry() {
    let store = LocalStore::open_in_memory().unwrap();
    let entry = SyncQueueEntry::new(SyncAction::Create, "p-1", RecordPayload::new(
        RecordType::Patient,
        json!({"name": "Gurpreet"}),
    ));
    store.record_mutation(&entry).unwrap();

    let record = store.get(RecordType::Patient, "p-1").unwrap().unwrap();
    assert_eq!(record.payload.data(), &json!({"name": "Gurpreet"}));
    assert_eq!(store.list_queue_entries().unwrap(), vec![entry]);
}

#[test]
fn record_mutation_delete_removes_record() {
    let store = LocalStore::open_in_memory().unwrap();
    store.put("1", &medicine(json!({"stock": 3}))).unwrap();

    let entry = SyncQueueEntry::new(SyncAction::Delete, "1", medicine(json!({"id": "1"})));
    store.record_mutation(&entry).unwrap();

    assert!(store.get(RecordType::Medicine, "1").unwrap().is_none());
    assert_eq!(store.queue_len().unwrap(), 1);
}

#[test]
fn record_mutation_is_all_or_nothing() {
    let store = LocalStore::open_in_memory().unwrap();
    let entry = SyncQueueEntry::new(SyncAction::Create, "1", medicine(json!("first")));
    store.record_mutation(&entry).unwrap();

    // Re-using the entry id violates the queue's unique constraint, so the
    // record write in the same transaction must roll back too.
    let mut clash = SyncQueueEntry::new(SyncAction::Update, "1", medicine(json!("second")));
    clash.entry_id = entry.entry_id;
    assert!(store.record_mutation(&clash).is_err());

    let record = store.get(RecordType::Medicine, "1").unwrap().unwrap();
    assert_eq!(record.payload.data(), &json!("first"));
    assert_eq!(store.queue_len().unwrap(), 1);
}

// ── lifecycle ────────────────────────────────────────────────────

#[test]
fn closed_store_fails_fast() {
    let store = LocalStore::open_in_memory().unwrap();
    let other_handle = store.clone();
    store.close();

    assert!(!store.is_open());
    let err = other_handle.put("1", &medicine(json!(1))).unwrap_err();
    assert!(err.is_unavailable());
    assert!(matches!(
        other_handle.get_all_by_type(RecordType::Medicine),
        Err(StorageError::Unavailable(_))
    ));
}

#[test]
fn close_is_idempotent() {
    let store = LocalStore::open_in_memory().unwrap();
    store.close();
    store.close();
    assert!(!store.is_open());
}

#[test]
fn open_creates_parent_directories() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("nested").join("deeper").join("offline.db");
    let store = LocalStore::open(&path).unwrap();
    assert!(path.exists());
    assert_eq!(store.location(), path.display().to_string());
}

#[test]
fn records_survive_reopen() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("offline.db");

    {
        let store = LocalStore::open(&path).unwrap();
        store.put("1", &medicine(json!("A"))).unwrap();
        store.put("1", &medicine(json!("B"))).unwrap();
        store
            .put("p", &RecordPayload::new(RecordType::Patient, json!({"age": 61})))
            .unwrap();
        store.close();
    }

    let store = LocalStore::open(&path).unwrap();
    let meds = store.get_all_by_type(RecordType::Medicine).unwrap();
    assert_eq!(meds.len(), 1);
    assert_eq!(meds[0].payload.data(), &json!("B"));
    assert_eq!(
        store.get(RecordType::Patient, "p").unwrap().unwrap().payload.data(),
        &json!({"age": 61})
    );
}
