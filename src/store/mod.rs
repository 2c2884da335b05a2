// src/store/mod.rs
//! Collaborator seams: the knowledge document and the learning table.
//!
//! Implementations return `anyhow::Result`; callers convert failures into
//! `EngineError` at the component boundary.

pub mod file;
pub mod http;
pub mod memory;

use anyhow::Result;

use crate::learning::LearningRow;

pub use file::{FileCorpus, FileLearningStore};
pub use http::HttpCorpus;
pub use memory::{MemoryCorpus, MemoryLearningStore};

#[async_trait::async_trait]
pub trait CorpusStore: Send + Sync {
    /// Raw corpus text, fetched fresh on every call.
    async fn fetch_corpus_text(&self) -> Result<String>;
    /// Append one question/answer pair in the corpus convention.
    async fn append_entry(&self, question: &str, answer: &str) -> Result<()>;
    fn name(&self) -> &'static str;
}

#[async_trait::async_trait]
pub trait LearningStore: Send + Sync {
    async fn fetch_rows(&self) -> Result<Vec<LearningRow>>;
    async fn append_row(&self, row: &LearningRow) -> Result<()>;
    fn name(&self) -> &'static str;
}
