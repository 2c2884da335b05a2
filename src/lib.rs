// src/lib.rs
// Public library surface for the binary and integration tests.

pub mod api;
pub mod commands;
pub mod config;
pub mod error;
pub mod filter;
pub mod knowledge;
pub mod learning;
pub mod metrics;
pub mod pipeline;
pub mod store;

// ---- Re-exports for stable public API ----
pub use crate::api::{router, AppState};
pub use crate::config::EngineConfig;
pub use crate::error::EngineError;
pub use crate::filter::{classify, Blocklist, Decision};
pub use crate::knowledge::{answer, MatchParams, MatchResult, QaEntry};
pub use crate::learning::{record_if_new, LearningRow};
pub use crate::pipeline::{ChatKind, InboundMessage, Outcome, Pipeline};

/// Build the full router from configuration, with `/metrics` merged in when
/// a Prometheus handle is supplied.
pub fn app(
    cfg: &EngineConfig,
    metrics: Option<&crate::metrics::Metrics>,
) -> anyhow::Result<axum::Router> {
    let pipeline = Pipeline::from_config(cfg)?;
    let router = router(AppState::new(pipeline));
    Ok(match metrics {
        Some(m) => router.merge(m.router()),
        None => router,
    })
}
