// src/store/file.rs
//! File-backed stores for local and single-node deployments.
//!
//! - corpus: plain text, appended in the `Q:`/`A:` convention
//! - learning rows: JSON lines, one `[phrase, context, timestamp]` array per line

use anyhow::{Context, Result};
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tokio::fs::{self, OpenOptions};
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;

use super::{CorpusStore, LearningStore};
use crate::knowledge::corpus::format_entry;
use crate::learning::LearningRow;

pub struct FileCorpus {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl FileCorpus {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: Mutex::new(()),
        }
    }
}

#[async_trait]
impl CorpusStore for FileCorpus {
    async fn fetch_corpus_text(&self) -> Result<String> {
        fs::read_to_string(&self.path)
            .await
            .with_context(|| format!("reading corpus from {}", self.path.display()))
    }

    async fn append_entry(&self, question: &str, answer: &str) -> Result<()> {
        let _guard = self.write_lock.lock().await;
        append_text(&self.path, &format_entry(question, answer)).await
    }

    fn name(&self) -> &'static str {
        "file"
    }
}

pub struct FileLearningStore {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl FileLearningStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: Mutex::new(()),
        }
    }
}

#[async_trait]
impl LearningStore for FileLearningStore {
    async fn fetch_rows(&self) -> Result<Vec<LearningRow>> {
        let content = match fs::read_to_string(&self.path).await {
            Ok(s) => s,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => {
                return Err(e)
                    .with_context(|| format!("reading learning rows from {}", self.path.display()))
            }
        };
        Ok(parse_rows(&content))
    }

    async fn append_row(&self, row: &LearningRow) -> Result<()> {
        let mut line = serde_json::to_string(&row.to_fields()).context("encoding learning row")?;
        line.push('\n');
        let _guard = self.write_lock.lock().await;
        append_text(&self.path, &line).await
    }

    fn name(&self) -> &'static str {
        "file"
    }
}

/// Undecodable lines are skipped with a warning so one bad row does not
/// hide the rest of the table.
fn parse_rows(content: &str) -> Vec<LearningRow> {
    let mut rows = Vec::new();
    for (n, line) in content.lines().enumerate() {
        if line.trim().is_empty() {
            continue;
        }
        match serde_json::from_str::<Vec<String>>(line) {
            Ok(fields) => rows.extend(LearningRow::from_fields(fields)),
            Err(e) => {
                tracing::warn!(target: "learning", line = n + 1, error = %e, "skipping bad row");
            }
        }
    }
    rows
}

async fn append_text(path: &Path, text: &str) -> Result<()> {
    if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
        fs::create_dir_all(dir)
            .await
            .with_context(|| format!("creating {}", dir.display()))?;
    }
    let mut f = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .await
        .with_context(|| format!("opening {}", path.display()))?;
    f.write_all(text.as_bytes())
        .await
        .with_context(|| format!("appending to {}", path.display()))?;
    f.flush().await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_rows_skips_blank_and_broken_lines() {
        let content = "[\"hello\",\"ctx\",\"t\"]\n\nnot json\n[\"bye\"]\n[]\n";
        let rows = parse_rows(content);
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].phrase, "hello");
        assert_eq!(rows[1].phrase, "bye");
        assert_eq!(rows[1].context, "");
    }

    #[tokio::test]
    async fn corpus_append_then_fetch() {
        let dir = tempfile::tempdir().unwrap();
        let corpus = FileCorpus::new(dir.path().join("kb").join("faq.txt"));
        corpus.append_entry("Where?", "Here").await.unwrap();
        let text = corpus.fetch_corpus_text().await.unwrap();
        assert_eq!(text, "\nQ: Where?\nA: Here\n");
    }

    #[tokio::test]
    async fn missing_learning_file_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileLearningStore::new(dir.path().join("rows.jsonl"));
        assert!(store.fetch_rows().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn missing_corpus_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let corpus = FileCorpus::new(dir.path().join("nope.txt"));
        assert!(corpus.fetch_corpus_text().await.is_err());
    }
}
