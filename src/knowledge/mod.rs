// src/knowledge/mod.rs
//! Knowledge lookup: fetch the corpus, parse it, pick the best answer.

pub mod corpus;
pub mod matcher;

use metrics::histogram;
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::error::{EngineError, EngineResult};
use crate::store::CorpusStore;

pub use corpus::{format_entry, parse_entries, QaEntry};
pub use matcher::{answer, MatchParams, MatchResult};

/// Reply sent when no corpus entry qualifies.
pub const UNKNOWN_REPLY: &str =
    "I don't have information about that yet. I'll save it to learn more.";
/// Reply sent when the corpus cannot be fetched.
pub const UNAVAILABLE_REPLY: &str =
    "Sorry, I'm having trouble accessing my knowledge base right now.";

impl MatchResult {
    /// Text to send back to the user.
    pub fn reply_text(&self) -> &str {
        match self {
            MatchResult::Answer(text) => text,
            MatchResult::Unknown => UNKNOWN_REPLY,
        }
    }
}

/// Corpus-backed matcher. Holds no corpus state; every lookup re-fetches.
#[derive(Clone)]
pub struct KnowledgeBase {
    store: Arc<dyn CorpusStore>,
    params: MatchParams,
    timeout: Duration,
}

impl KnowledgeBase {
    pub fn new(store: Arc<dyn CorpusStore>, params: MatchParams, timeout: Duration) -> Self {
        Self {
            store,
            params: params.sanitized(),
            timeout,
        }
    }

    pub async fn lookup(&self, query: &str) -> EngineResult<MatchResult> {
        let text = self.fetch().await?;
        Ok(answer(query, &text, &self.params))
    }

    /// Append a pair to the corpus document.
    pub async fn add_entry(&self, question: &str, answer: &str) -> EngineResult<()> {
        tokio::time::timeout(self.timeout, self.store.append_entry(question, answer))
            .await
            .map_err(|_| EngineError::corpus_timeout(self.timeout))?
            .map_err(EngineError::corpus)?;
        tracing::info!(target: "knowledge", store = self.store.name(), "added knowledge entry");
        Ok(())
    }

    async fn fetch(&self) -> EngineResult<String> {
        let t0 = Instant::now();
        let res = tokio::time::timeout(self.timeout, self.store.fetch_corpus_text()).await;
        histogram!("corpus_fetch_ms").record(t0.elapsed().as_secs_f64() * 1_000.0);

        match res {
            Ok(Ok(text)) => Ok(text),
            Ok(Err(e)) => {
                tracing::error!(target: "knowledge", store = self.store.name(), error = ?e, "corpus fetch failed");
                Err(EngineError::corpus(e))
            }
            Err(_) => {
                tracing::error!(target: "knowledge", store = self.store.name(), "corpus fetch timed out");
                Err(EngineError::corpus_timeout(self.timeout))
            }
        }
    }
}
