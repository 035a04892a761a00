//! Tests for facade.rs: local writes, reads, status and durability.

use pretty_assertions::assert_eq;
use sehat_store::LocalStore;
use sehat_sync::remote::mock::MockRemote;
use sehat_sync::{ConnectivityMonitor, OfflineConfig, OfflineFacade, SkipReason, SyncOutcome};
use sehat_types::{RecordType, SyncAction};
use serde_json::json;
use std::sync::Arc;

fn facade(online: bool) -> (OfflineFacade, Arc<MockRemote>) {
    let store = LocalStore::open_in_memory().unwrap();
    let remote = Arc::new(MockRemote::new());
    let facade = OfflineFacade::new(
        store,
        remote.clone(),
        ConnectivityMonitor::new(online),
        &OfflineConfig::default(),
    )
    .unwrap();
    (facade, remote)
}

fn file_config(dir: &tempfile::TempDir) -> OfflineConfig {
    OfflineConfig {
        database_path: dir.path().join("offline.db"),
        ..Default::default()
    }
}

// ── Writes and reads ────────────────────────────────────────────

#[tokio::test]
async fn save_persists_and_enqueues() {
    let (facade, _) = facade(false);

    facade
        .save(RecordType::Patient, "p1", json!({ "name": "Asha" }))
        .await
        .unwrap();

    let records = facade.read_by_type(RecordType::Patient).await.unwrap();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].id, "p1");
    assert_eq!(records[0].payload.data(), &json!({ "name": "Asha" }));
    assert!(!records[0].synced);
    assert_eq!(facade.status().await.unwrap().pending_count, 1);
}

#[tokio::test]
async fn repeated_saves_replace_but_each_enqueues() {
    let (facade, _) = facade(false);

    for n in 1..=3 {
        facade
            .save(RecordType::Medicine, "m1", json!({ "stock": n }))
            .await
            .unwrap();
    }

    let records = facade.read_by_type(RecordType::Medicine).await.unwrap();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].payload.data(), &json!({ "stock": 3 }));
    assert_eq!(facade.status().await.unwrap().pending_count, 3);
}

#[tokio::test]
async fn read_of_an_empty_type_is_empty() {
    let (facade, _) = facade(false);
    facade
        .save(RecordType::Patient, "p1", json!({}))
        .await
        .unwrap();

    assert!(facade.read_by_type(RecordType::User).await.unwrap().is_empty());
}

#[tokio::test]
async fn record_counts_cover_stored_types_only() {
    let (facade, _) = facade(false);
    facade.save(RecordType::Patient, "p1", json!({})).await.unwrap();
    facade.save(RecordType::Patient, "p2", json!({})).await.unwrap();
    facade.save(RecordType::Medicine, "m1", json!({})).await.unwrap();
    facade.save(RecordType::Patient, "p1", json!({ "v": 2 })).await.unwrap();

    let counts = facade.record_counts().await.unwrap();

    assert_eq!(counts, vec![(RecordType::Medicine, 1), (RecordType::Patient, 2)]);
}

#[tokio::test]
async fn update_and_delete_enqueue_their_actions() {
    let (facade, remote) = facade(true);

    facade
        .save(RecordType::Prescription, "rx1", json!({ "dose": "5mg" }))
        .await
        .unwrap();
    facade
        .update(RecordType::Prescription, "rx1", json!({ "dose": "10mg" }))
        .await
        .unwrap();
    let updated = facade.get(RecordType::Prescription, "rx1").await.unwrap().unwrap();
    assert_eq!(updated.payload.data(), &json!({ "dose": "10mg" }));

    facade.delete(RecordType::Prescription, "rx1").await.unwrap();
    assert!(facade.get(RecordType::Prescription, "rx1").await.unwrap().is_none());

    facade.force_sync().await;

    let actions: Vec<SyncAction> = remote.calls().into_iter().map(|m| m.action).collect();
    assert_eq!(
        actions,
        vec![SyncAction::Create, SyncAction::Update, SyncAction::Delete]
    );
    assert_eq!(remote.calls()[2].body, r#"{"id":"rx1"}"#);
}

// ── Sync ────────────────────────────────────────────────────────

#[tokio::test]
async fn force_sync_offline_changes_nothing() {
    let (facade, remote) = facade(false);
    facade
        .save(RecordType::Consultation, "c1", json!({}))
        .await
        .unwrap();

    let outcome = facade.force_sync().await;

    assert_eq!(outcome, SyncOutcome::Skipped(SkipReason::Offline));
    let status = facade.status().await.unwrap();
    assert_eq!(status.pending_count, 1);
    assert!(status.last_sync_time.is_none());
    assert_eq!(remote.call_count(), 0);
}

#[tokio::test]
async fn force_sync_online_drains_and_marks_synced() {
    let (facade, remote) = facade(true);
    facade
        .save(RecordType::Patient, "p1", json!({ "name": "Asha" }))
        .await
        .unwrap();

    let report = facade.force_sync().await;

    assert_eq!(report.report().unwrap().delivered, 1);
    assert_eq!(remote.call_count(), 1);
    let status = facade.status().await.unwrap();
    assert_eq!(status.pending_count, 0);
    assert!(status.last_sync_time.is_some());
    assert!(facade.get(RecordType::Patient, "p1").await.unwrap().unwrap().synced);
}

#[tokio::test]
async fn exhausted_entries_show_up_as_dead_letters() {
    let (facade, remote) = facade(true);
    remote.fail_record("p1");
    facade
        .save(RecordType::Patient, "p1", json!({}))
        .await
        .unwrap();

    for _ in 0..3 {
        facade.force_sync().await;
    }

    let status = facade.status().await.unwrap();
    assert_eq!(status.pending_count, 0);
    assert_eq!(status.dead_letter_count, 1);
    // The local record is never removed by sync.
    assert!(facade.get(RecordType::Patient, "p1").await.unwrap().is_some());

    let dead = facade.dead_letters().await.unwrap();
    assert_eq!(dead[0].entry.record_id, "p1");
    assert_eq!(facade.clear_dead_letters().await.unwrap(), 1);
    assert_eq!(facade.status().await.unwrap().dead_letter_count, 0);
}

#[tokio::test]
async fn subscribers_see_pending_count_after_save() {
    let (facade, _) = facade(false);
    let mut rx = facade.subscribe();

    facade
        .save(RecordType::Patient, "p1", json!({}))
        .await
        .unwrap();

    assert!(rx.has_changed().unwrap());
    assert_eq!(rx.borrow_and_update().pending_count, 1);
}

// ── Cache ───────────────────────────────────────────────────────

#[tokio::test]
async fn critical_cache_round_trip() {
    let (facade, _) = facade(false);

    facade
        .cache_critical("dashboard", json!({ "patients": 12 }))
        .await
        .unwrap();

    let entry = facade.get_critical("dashboard").await.unwrap().unwrap();
    assert_eq!(entry.data, json!({ "patients": 12 }));
    assert!(facade.get_critical("missing").await.unwrap().is_none());
    // Fresh entries survive a sweep.
    assert_eq!(facade.sweep_expired_cache().await.unwrap(), 0);
}

// ── Lifecycle ───────────────────────────────────────────────────

#[tokio::test]
async fn writes_survive_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let config = file_config(&dir);

    {
        let facade = OfflineFacade::open(
            &config,
            Arc::new(MockRemote::new()),
            ConnectivityMonitor::new(false),
        )
        .await
        .unwrap();
        facade
            .save(RecordType::Patient, "p1", json!({ "name": "Asha" }))
            .await
            .unwrap();
        facade.close();
    }

    let remote = Arc::new(MockRemote::new());
    let facade = OfflineFacade::open(&config, remote.clone(), ConnectivityMonitor::new(true))
        .await
        .unwrap();

    assert_eq!(facade.read_by_type(RecordType::Patient).await.unwrap().len(), 1);
    assert_eq!(facade.status().await.unwrap().pending_count, 1);

    facade.force_sync().await;
    assert_eq!(remote.call_count(), 1);
    assert_eq!(facade.status().await.unwrap().pending_count, 0);
}

#[tokio::test]
async fn closed_facade_fails_fast() {
    let (facade, _) = facade(false);
    facade.close();

    let err = facade
        .save(RecordType::Patient, "p1", json!({}))
        .await
        .unwrap_err();

    assert!(err.is_storage_unavailable());
    assert!(facade.status().await.unwrap_err().is_storage_unavailable());
}

#[tokio::test]
async fn invalid_config_is_rejected() {
    let config = OfflineConfig {
        sync: sehat_sync::SyncConfig {
            batch_size: 0,
            ..Default::default()
        },
        ..Default::default()
    };

    let result = OfflineFacade::new(
        LocalStore::open_in_memory().unwrap(),
        Arc::new(MockRemote::new()),
        ConnectivityMonitor::default(),
        &config,
    );

    assert!(result.is_err());
}
