use pretty_assertions::assert_eq;
use sehat_types::{
    DomainRecord, Error, RecordPayload, RecordType, SyncAction, SyncQueueEntry,
};
use serde_json::json;

// ── RecordType ───────────────────────────────────────────────────

#[test]
fn record_type_names_roundtrip() {
    for t in RecordType::ALL {
        let parsed: RecordType = t.as_str().parse().unwrap();
        assert_eq!(parsed, t);
        assert_eq!(t.to_string(), t.as_str());
    }
}

#[test]
fn record_type_parse_is_case_insensitive() {
    assert_eq!("Medicine".parse::<RecordType>().unwrap(), RecordType::Medicine);
    assert_eq!(" PATIENT ".parse::<RecordType>().unwrap(), RecordType::Patient);
}

#[test]
fn record_type_parse_unknown() {
    match "appointment".parse::<RecordType>() {
        Err(Error::UnknownRecordType(name)) => assert_eq!(name, "appointment"),
        other => panic!("expected UnknownRecordType, got {other:?}"),
    }
}

// ── RecordPayload ────────────────────────────────────────────────

#[test]
fn payload_carries_its_record_type() {
    for t in RecordType::ALL {
        let payload = RecordPayload::new(t, json!({"n": 1}));
        assert_eq!(payload.record_type(), t);
        assert_eq!(payload.data(), &json!({"n": 1}));
    }
}

#[test]
fn payload_serializes_tagged() {
    let payload = RecordPayload::new(RecordType::Medicine, json!({"name": "Paracetamol"}));
    let value = serde_json::to_value(&payload).unwrap();
    assert_eq!(
        value,
        json!({"type": "medicine", "data": {"name": "Paracetamol"}})
    );
}

#[test]
fn payload_json_is_untagged_data() {
    let payload = RecordPayload::new(RecordType::Patient, json!({"name": "Asha"}));
    let body = payload.to_json().unwrap();
    assert_eq!(body, r#"{"name":"Asha"}"#);

    let back = RecordPayload::from_json(RecordType::Patient, &body).unwrap();
    assert_eq!(back, payload);
}

#[test]
fn payload_from_invalid_json_fails() {
    assert!(matches!(
        RecordPayload::from_json(RecordType::User, "{not json"),
        Err(Error::Serialization(_))
    ));
}

#[test]
fn into_data_unwraps() {
    let payload = RecordPayload::new(RecordType::Consultation, json!([1, 2, 3]));
    assert_eq!(payload.into_data(), json!([1, 2, 3]));
}

// ── DomainRecord / SyncQueueEntry ────────────────────────────────

#[test]
fn new_record_is_unsynced() {
    let record = DomainRecord::new("p-1", RecordPayload::new(RecordType::Patient, json!({})));
    assert_eq!(record.id, "p-1");
    assert_eq!(record.record_type(), RecordType::Patient);
    assert!(!record.synced);
}

#[test]
fn new_entry_starts_with_no_retries() {
    let entry = SyncQueueEntry::new(
        SyncAction::Update,
        "rx-9",
        RecordPayload::new(RecordType::Prescription, json!({"dose": "5ml"})),
    );
    assert_eq!(entry.retry_count, 0);
    assert_eq!(entry.action, SyncAction::Update);
    assert_eq!(entry.record_type(), RecordType::Prescription);
    assert_eq!(entry.record_id, "rx-9");
}

#[test]
fn sync_action_parse() {
    assert_eq!("create".parse::<SyncAction>().unwrap(), SyncAction::Create);
    assert_eq!("DELETE".parse::<SyncAction>().unwrap(), SyncAction::Delete);
    assert!(matches!(
        "upsert".parse::<SyncAction>(),
        Err(Error::UnknownAction(_))
    ));
}

#[test]
fn sync_action_serde_lowercase() {
    assert_eq!(serde_json::to_string(&SyncAction::Update).unwrap(), "\"update\"");
}
