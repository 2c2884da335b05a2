// src/store/http.rs
use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use std::time::Duration;

use super::CorpusStore;
use crate::knowledge::corpus::format_entry;

/// Corpus served over HTTP: GET returns the plain text, POST appends an entry.
pub struct HttpCorpus {
    url: String,
    client: Client,
}

impl HttpCorpus {
    /// Per-request timeout on top of the pipeline's own deadline.
    pub fn with_timeout(url: impl Into<String>, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .context("building corpus http client")?;
        Ok(Self {
            url: url.into(),
            client,
        })
    }
}

#[async_trait]
impl CorpusStore for HttpCorpus {
    async fn fetch_corpus_text(&self) -> Result<String> {
        let resp = self
            .client
            .get(&self.url)
            .send()
            .await
            .context("corpus http get()")?
            .error_for_status()
            .context("corpus non-2xx")?;
        resp.text().await.context("corpus http .text()")
    }

    async fn append_entry(&self, question: &str, answer: &str) -> Result<()> {
        self.client
            .post(&self.url)
            .header(reqwest::header::CONTENT_TYPE, "text/plain; charset=utf-8")
            .body(format_entry(question, answer))
            .send()
            .await
            .context("corpus http post()")?
            .error_for_status()
            .context("corpus append non-2xx")?;
        Ok(())
    }

    fn name(&self) -> &'static str {
        "http"
    }
}
