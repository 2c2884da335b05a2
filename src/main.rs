//! Chat Guard — Binary Entrypoint
//! Boots the Axum HTTP server with the moderation/knowledge pipeline.

use shuttle_axum::ShuttleAxum;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use chat_guard::metrics::Metrics;
use chat_guard::EngineConfig;

/// Compact logs by default; `CHAT_GUARD_LOG_JSON=1` switches to JSON lines.
fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("chat_guard=info,warn"));

    let json = std::env::var("CHAT_GUARD_LOG_JSON")
        .ok()
        .is_some_and(|v| v == "1");

    let registry = tracing_subscriber::registry().with(filter);
    let _ = if json {
        registry.with(fmt::layer().json()).try_init()
    } else {
        registry.with(fmt::layer().compact()).try_init()
    };
}

#[shuttle_runtime::main]
async fn axum() -> ShuttleAxum {
    // Load .env in local/dev; no-op in prod environments.
    let _ = dotenvy::dotenv();

    init_tracing();

    let cfg = EngineConfig::load()?;
    tracing::info!(
        min_overlap = cfg.matcher.min_overlap,
        similarity = cfg.matcher.similarity_threshold,
        remote_corpus = cfg.storage.corpus_url.is_some(),
        "engine config loaded"
    );

    let metrics = match Metrics::install() {
        Ok(m) => Some(m),
        Err(e) => {
            tracing::warn!(error = ?e, "metrics disabled");
            None
        }
    };

    let router = chat_guard::app(&cfg, metrics.as_ref())?;
    Ok(router.into())
}
