// tests/history_store.rs
use news_relay::history::{HistoryStore, DEFAULT_HISTORY_CAP};
use std::fs;

fn store_in(dir: &tempfile::TempDir) -> HistoryStore {
    HistoryStore::new(dir.path().join("sent_news.json"))
}

#[test]
fn missing_file_loads_empty() {
    let dir = tempfile::tempdir().unwrap();
    assert!(store_in(&dir).load().is_empty());
}

#[test]
fn corrupted_file_loads_empty_and_is_repaired_by_next_record() {
    let dir = tempfile::tempdir().unwrap();
    let store = store_in(&dir);
    fs::write(store.path(), "{ not an array").unwrap();
    assert!(store.load().is_empty());

    store.record_published("https://a/1").unwrap();
    assert_eq!(store.load(), vec!["https://a/1".to_string()]);
}

#[test]
fn wrong_json_shape_loads_empty() {
    let dir = tempfile::tempdir().unwrap();
    let store = store_in(&dir);
    fs::write(store.path(), r#"{"sent": ["https://a/1"]}"#).unwrap();
    assert!(store.load().is_empty());
}

#[test]
fn record_is_idempotent() {
    let dir = tempfile::tempdir().unwrap();
    let store = store_in(&dir);
    store.record_published("u").unwrap();
    let once = fs::read_to_string(store.path()).unwrap();
    store.record_published("u").unwrap();
    let twice = fs::read_to_string(store.path()).unwrap();
    assert_eq!(once, twice);
    assert_eq!(store.load(), vec!["u".to_string()]);
}

#[test]
fn default_cap_keeps_the_latest_fifty() {
    let dir = tempfile::tempdir().unwrap();
    let store = store_in(&dir);
    assert_eq!(store.cap(), DEFAULT_HISTORY_CAP);

    for i in 0..60 {
        store.record_published(&format!("https://a/{i}")).unwrap();
    }
    let ids = store.load();
    assert_eq!(ids.len(), 50);
    assert_eq!(ids.first().map(String::as_str), Some("https://a/10"));
    assert_eq!(ids.last().map(String::as_str), Some("https://a/59"));
}

#[test]
fn oversized_or_duplicated_file_is_normalized_on_load() {
    let dir = tempfile::tempdir().unwrap();
    let store = store_in(&dir).with_cap(3);
    fs::write(store.path(), r#"["a","b","a","c","d","e"]"#).unwrap();
    assert_eq!(store.load(), vec!["c", "d", "e"]);
}

#[test]
fn file_is_a_plain_json_array() {
    let dir = tempfile::tempdir().unwrap();
    let store = store_in(&dir);
    store.save(&["x".to_string(), "y".to_string()]).unwrap();
    let raw = fs::read_to_string(store.path()).unwrap();
    let parsed: Vec<String> = serde_json::from_str(&raw).unwrap();
    assert_eq!(parsed, vec!["x", "y"]);
}

#[test]
fn save_creates_missing_parent_dirs() {
    let dir = tempfile::tempdir().unwrap();
    let store = HistoryStore::new(dir.path().join("state/nested/sent.json"));
    store.record_published("u").unwrap();
    assert!(store.path().exists());
}

#[test]
fn unwritable_location_is_an_io_error() {
    let dir = tempfile::tempdir().unwrap();
    // parent "dir" is a regular file
    let blocker = dir.path().join("blocker");
    fs::write(&blocker, "").unwrap();
    let store = HistoryStore::new(blocker.join("sent.json"));
    assert!(store.record_published("u").is_err());
}

#[test]
fn oversized_cap_still_keeps_at_most_fifty() {
    let dir = tempfile::tempdir().unwrap();
    let store = store_in(&dir).with_cap(500);
    for i in 0..60 {
        store.record_published(&format!("https://a/{i}")).unwrap();
    }
    assert_eq!(store.load().len(), DEFAULT_HISTORY_CAP);
}
