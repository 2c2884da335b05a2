// tests/learning_dedup.rs
//
// Learning queue against the JSONL file store: dedup across restarts, the
// best-effort snapshot semantics, and tolerance of a hand-edited file.

use std::sync::Arc;
use std::time::Duration;

use chat_guard::learning::{learning_context, record_if_new, LearningQueue};
use chat_guard::store::{FileLearningStore, LearningStore};

fn queue(path: &std::path::Path) -> (Arc<FileLearningStore>, LearningQueue) {
    let store = Arc::new(FileLearningStore::new(path));
    let q = LearningQueue::new(store.clone(), Duration::from_secs(2));
    (store, q)
}

#[tokio::test]
async fn persisted_phrase_is_not_queued_again() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("learning.jsonl");
    let ctx = learning_context("7", "-100");

    let (store, q) = queue(&path);
    let saved = q.enqueue("Hello", &ctx).await.unwrap().expect("first save");
    assert_eq!(saved.context, "User: 7, Chat: -100");

    let rows = store.fetch_rows().await.unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].phrase, "Hello");
    assert!(record_if_new("HELLO", &ctx, &rows).is_none());

    // A fresh store over the same file sees the row too.
    let (_, q2) = queue(&path);
    assert!(q2.enqueue("HELLO", &ctx).await.unwrap().is_none());
    assert!(q2.enqueue("hello again", &ctx).await.unwrap().is_some());
    assert_eq!(store.fetch_rows().await.unwrap().len(), 2);
}

#[test]
fn same_snapshot_checked_twice_yields_two_rows() {
    let snapshot = Vec::new();
    let a = record_if_new("Hello", "ctx", &snapshot);
    let b = record_if_new("Hello", "ctx", &snapshot);
    assert!(a.is_some());
    assert!(b.is_some());
}

#[tokio::test]
async fn stored_rows_are_three_field_json_arrays() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("learning.jsonl");
    let (_, q) = queue(&path);
    q.enqueue("Where is the \"lab\"?", "User: 1, Chat: 2")
        .await
        .unwrap();

    let content = std::fs::read_to_string(&path).unwrap();
    let line = content.lines().next().unwrap();
    let fields: Vec<String> = serde_json::from_str(line).unwrap();
    assert_eq!(fields.len(), 3);
    assert_eq!(fields[0], "Where is the \"lab\"?");
    assert_eq!(fields[1], "User: 1, Chat: 2");
    assert!(chrono::DateTime::parse_from_rfc3339(&fields[2]).is_ok());
}

#[tokio::test]
async fn broken_lines_do_not_hide_good_rows() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("learning.jsonl");
    std::fs::write(
        &path,
        "[\"Parking\",\"User: 1, Chat: 2\",\"2025-01-01T00:00:00+00:00\"]\n{oops\n",
    )
    .unwrap();

    let (store, q) = queue(&path);
    assert_eq!(store.fetch_rows().await.unwrap().len(), 1);
    assert!(q.enqueue("parking", "ctx").await.unwrap().is_none());
}
