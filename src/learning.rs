// src/learning.rs
//! Unanswered-query queue.
//!
//! `record_if_new` is the pure decision over a snapshot of stored rows;
//! `LearningQueue` wraps it with a fresh fetch and an append against the
//! learning store. The check-then-append is best effort: two concurrent
//! callers with the same new phrase can both append.

use chrono::{DateTime, Utc};
use metrics::counter;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;

use crate::error::{EngineError, EngineResult};
use crate::store::LearningStore;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LearningRow {
    pub phrase: String,
    pub context: String,
    pub timestamp: String,
}

impl LearningRow {
    /// Ordered fields as persisted: `[phrase, context, timestamp]`.
    pub fn to_fields(&self) -> [String; 3] {
        [
            self.phrase.clone(),
            self.context.clone(),
            self.timestamp.clone(),
        ]
    }

    /// Rebuild from stored fields; missing trailing fields become empty.
    /// An empty row yields `None`.
    pub fn from_fields(fields: Vec<String>) -> Option<Self> {
        let mut it = fields.into_iter();
        let phrase = it.next()?;
        Some(Self {
            phrase,
            context: it.next().unwrap_or_default(),
            timestamp: it.next().unwrap_or_default(),
        })
    }
}

/// Context string stored next to a phrase.
pub fn learning_context(sender_id: &str, chat_id: &str) -> String {
    format!("User: {sender_id}, Chat: {chat_id}")
}

/// New row for `phrase` unless an existing row has the same phrase (case-insensitive).
pub fn record_if_new(phrase: &str, context: &str, existing: &[LearningRow]) -> Option<LearningRow> {
    record_if_new_at(phrase, context, existing, Utc::now())
}

pub fn record_if_new_at(
    phrase: &str,
    context: &str,
    existing: &[LearningRow],
    now: DateTime<Utc>,
) -> Option<LearningRow> {
    let needle = phrase.to_lowercase();
    if existing.iter().any(|r| r.phrase.to_lowercase() == needle) {
        return None;
    }
    Some(LearningRow {
        phrase: phrase.to_string(),
        context: context.to_string(),
        timestamp: now.to_rfc3339(),
    })
}

/// Store-backed queue. Each call fetches a fresh snapshot.
#[derive(Clone)]
pub struct LearningQueue {
    store: Arc<dyn LearningStore>,
    timeout: Duration,
}

impl LearningQueue {
    pub fn new(store: Arc<dyn LearningStore>, timeout: Duration) -> Self {
        Self { store, timeout }
    }

    /// Returns the appended row, or `None` when the phrase was already queued.
    pub async fn enqueue(&self, phrase: &str, context: &str) -> EngineResult<Option<LearningRow>> {
        let rows = tokio::time::timeout(self.timeout, self.store.fetch_rows())
            .await
            .map_err(|_| EngineError::store_timeout(self.timeout))?
            .map_err(EngineError::store)?;

        let Some(row) = record_if_new(phrase, context, &rows) else {
            tracing::info!(target: "learning", store = self.store.name(), "phrase already queued");
            return Ok(None);
        };

        tokio::time::timeout(self.timeout, self.store.append_row(&row))
            .await
            .map_err(|_| EngineError::store_timeout(self.timeout))?
            .map_err(EngineError::store)?;

        counter!("learning_rows_saved_total").increment(1);
        tracing::info!(target: "learning", store = self.store.name(), "saved new phrase");
        Ok(Some(row))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryLearningStore;

    fn row(p: &str) -> LearningRow {
        LearningRow {
            phrase: p.into(),
            context: String::new(),
            timestamp: String::new(),
        }
    }

    #[test]
    fn duplicate_is_case_insensitive() {
        let existing = vec![row("Hello")];
        assert!(record_if_new("HELLO", "ctx", &existing).is_none());
        assert!(record_if_new("hello there", "ctx", &existing).is_some());
    }

    #[test]
    fn same_snapshot_twice_yields_two_rows() {
        let existing: Vec<LearningRow> = Vec::new();
        let a = record_if_new("Hello", "ctx", &existing);
        let b = record_if_new("Hello", "ctx", &existing);
        assert!(a.is_some() && b.is_some());
    }

    #[test]
    fn new_row_carries_context_and_rfc3339_timestamp() {
        let now = DateTime::parse_from_rfc3339("2025-03-01T10:00:00Z")
            .unwrap()
            .with_timezone(&Utc);
        let r = record_if_new_at("Opening hours?", "User: 1, Chat: 2", &[], now).unwrap();
        assert_eq!(r.phrase, "Opening hours?");
        assert_eq!(r.context, "User: 1, Chat: 2");
        assert_eq!(r.timestamp, "2025-03-01T10:00:00+00:00");
        assert_eq!(LearningRow::from_fields(r.to_fields().to_vec()), Some(r));
    }

    #[tokio::test]
    async fn enqueue_persists_then_dedups() {
        let store = Arc::new(MemoryLearningStore::new());
        let q = LearningQueue::new(store.clone(), Duration::from_secs(1));
        assert!(q.enqueue("Hello", "ctx").await.unwrap().is_some());
        assert!(q.enqueue("HELLO", "ctx").await.unwrap().is_none());
        assert_eq!(store.rows().len(), 1);
    }

    #[tokio::test]
    async fn store_outage_maps_to_store_unavailable() {
        let store = Arc::new(MemoryLearningStore::new());
        store.set_failing(true);
        let q = LearningQueue::new(store, Duration::from_secs(1));
        let err = q.enqueue("Hello", "ctx").await.unwrap_err();
        assert!(matches!(err, EngineError::StoreUnavailable(_)));
    }
}
