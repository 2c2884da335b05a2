// src/store/memory.rs
//! In-memory stores for tests and demos. `fail` toggles simulate an outage.

use anyhow::{bail, Result};
use async_trait::async_trait;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

use super::{CorpusStore, LearningStore};
use crate::knowledge::corpus::format_entry;
use crate::learning::LearningRow;

#[derive(Default)]
pub struct MemoryCorpus {
    text: Mutex<String>,
    fail: AtomicBool,
}

impl MemoryCorpus {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: Mutex::new(text.into()),
            fail: AtomicBool::new(false),
        }
    }

    pub fn set_failing(&self, fail: bool) {
        self.fail.store(fail, Ordering::SeqCst);
    }

    pub fn set_text(&self, text: impl Into<String>) {
        *self.text.lock().unwrap_or_else(|p| p.into_inner()) = text.into();
    }

    pub fn text(&self) -> String {
        self.text.lock().unwrap_or_else(|p| p.into_inner()).clone()
    }
}

#[async_trait]
impl CorpusStore for MemoryCorpus {
    async fn fetch_corpus_text(&self) -> Result<String> {
        if self.fail.load(Ordering::SeqCst) {
            bail!("memory corpus offline");
        }
        Ok(self.text())
    }

    async fn append_entry(&self, question: &str, answer: &str) -> Result<()> {
        if self.fail.load(Ordering::SeqCst) {
            bail!("memory corpus offline");
        }
        self.text
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .push_str(&format_entry(question, answer));
        Ok(())
    }

    fn name(&self) -> &'static str {
        "memory"
    }
}

#[derive(Default)]
pub struct MemoryLearningStore {
    rows: Mutex<Vec<LearningRow>>,
    fail: AtomicBool,
}

impl MemoryLearningStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_failing(&self, fail: bool) {
        self.fail.store(fail, Ordering::SeqCst);
    }

    pub fn rows(&self) -> Vec<LearningRow> {
        self.rows.lock().unwrap_or_else(|p| p.into_inner()).clone()
    }
}

#[async_trait]
impl LearningStore for MemoryLearningStore {
    async fn fetch_rows(&self) -> Result<Vec<LearningRow>> {
        if self.fail.load(Ordering::SeqCst) {
            bail!("memory learning store offline");
        }
        Ok(self.rows())
    }

    async fn append_row(&self, row: &LearningRow) -> Result<()> {
        if self.fail.load(Ordering::SeqCst) {
            bail!("memory learning store offline");
        }
        self.rows
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .push(row.clone());
        Ok(())
    }

    fn name(&self) -> &'static str {
        "memory"
    }
}
