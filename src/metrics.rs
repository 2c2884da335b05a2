use anyhow::Context;
use axum::{routing::get, Router};
use metrics::{describe_counter, describe_histogram};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use once_cell::sync::OnceCell;

pub struct Metrics {
    pub handle: PrometheusHandle,
}

impl Metrics {
    /// Install the global Prometheus recorder. Call once per process.
    pub fn install() -> anyhow::Result<Self> {
        let handle = PrometheusBuilder::new()
            .install_recorder()
            .context("prometheus: install recorder")?;
        ensure_metrics_described();
        Ok(Self { handle })
    }

    /// Returns a router exposing `/metrics` with the Prometheus exposition format.
    pub fn router(&self) -> Router {
        let handle = self.handle.clone();
        Router::new().route(
            "/metrics",
            get(move || {
                let h = handle.clone();
                async move { h.render() }
            }),
        )
    }
}

/// One-time metrics registration (so series show up on /metrics).
pub fn ensure_metrics_described() {
    static ONCE: OnceCell<()> = OnceCell::new();
    ONCE.get_or_init(|| {
        describe_counter!("messages_total", "Inbound messages seen by the pipeline.");
        describe_counter!(
            "messages_flagged_total",
            "Messages suppressed by the content filter."
        );
        describe_counter!("answers_total", "Knowledge lookups by result.");
        describe_counter!(
            "learning_rows_saved_total",
            "Unanswered queries appended to the learning store."
        );
        describe_counter!(
            "learning_store_errors_total",
            "Learning store fetch/append failures (swallowed)."
        );
        describe_histogram!("corpus_fetch_ms", "Corpus fetch time in milliseconds.");
    });
}
