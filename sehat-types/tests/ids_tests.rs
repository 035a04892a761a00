use sehat_types::QueueEntryId;
use std::collections::HashSet;
use std::str::FromStr;

#[test]
fn entry_id_new_is_unique() {
    let a = QueueEntryId::new();
    let b = QueueEntryId::new();
    assert_ne!(a, b);
}

#[test]
fn entry_id_display_and_parse() {
    let id = QueueEntryId::new();
    let parsed = QueueEntryId::parse(&id.to_string()).unwrap();
    assert_eq!(id, parsed);
}

#[test]
fn entry_id_from_str_invalid() {
    assert!(QueueEntryId::from_str("garbage").is_err());
}

#[test]
fn entry_ids_sort_in_creation_order() {
    let ids: Vec<QueueEntryId> = (0..500).map(|_| QueueEntryId::new()).collect();
    let mut sorted = ids.clone();
    sorted.sort();
    assert_eq!(ids, sorted);
}

#[test]
fn entry_ids_do_not_collide_within_a_tick() {
    let ids: HashSet<QueueEntryId> = (0..10_000).map(|_| QueueEntryId::new()).collect();
    assert_eq!(ids.len(), 10_000);
}

#[test]
fn entry_id_serializes_as_plain_string() {
    let id = QueueEntryId::new();
    let json = serde_json::to_string(&id).unwrap();
    assert_eq!(json, format!("\"{id}\""));
}
