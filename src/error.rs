//! Error taxonomy for the message pipeline.
//!
//! Collaborator failures (`anyhow::Error` from the stores, or a timeout) are
//! converted into one of these at the component boundary so the pipeline can
//! decide what the user sees without inspecting error text.

use std::time::Duration;

#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// Corpus fetch failed or timed out. Never treated as "unknown".
    #[error("knowledge corpus unavailable: {0}")]
    CorpusUnavailable(String),

    /// Learning store fetch/append failed or timed out. Non-fatal.
    #[error("learning store unavailable: {0}")]
    StoreUnavailable(String),

    /// Query is empty after stripping the address token.
    #[error("query is empty")]
    MalformedQuery,
}

impl EngineError {
    pub fn corpus(err: impl std::fmt::Display) -> Self {
        Self::CorpusUnavailable(err.to_string())
    }

    pub fn store(err: impl std::fmt::Display) -> Self {
        Self::StoreUnavailable(err.to_string())
    }

    pub(crate) fn corpus_timeout(after: Duration) -> Self {
        Self::CorpusUnavailable(format!("timed out after {}ms", after.as_millis()))
    }

    pub(crate) fn store_timeout(after: Duration) -> Self {
        Self::StoreUnavailable(format!("timed out after {}ms", after.as_millis()))
    }
}

pub type EngineResult<T> = Result<T, EngineError>;
