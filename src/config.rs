// src/config.rs
//! Engine configuration (TOML) with env overrides.
//!
//! Resolution: `$CHAT_GUARD_CONFIG_PATH` or `config/engine.toml`; a missing
//! file means all defaults. Env overrides are applied last.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::knowledge::MatchParams;

pub const DEFAULT_CONFIG_PATH: &str = "config/engine.toml";
pub const DEFAULT_FETCH_TIMEOUT_MS: u64 = 5_000;

pub const ENV_CONFIG_PATH: &str = "CHAT_GUARD_CONFIG_PATH";
pub const ENV_SIMILARITY_THRESHOLD: &str = "MATCH_SIMILARITY_THRESHOLD";
pub const ENV_MIN_OVERLAP: &str = "MATCH_MIN_OVERLAP";
pub const ENV_ADDRESS_TOKEN: &str = "BOT_ADDRESS_TOKEN";

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub matcher: MatchParams,
    pub pipeline: PipelineSection,
    pub storage: StorageSection,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PipelineSection {
    /// e.g. "@faq_bot"; messages containing it count as addressed to the bot.
    pub address_token: Option<String>,
    /// Messages from this sender id are ignored.
    pub bot_user_id: Option<String>,
    pub fetch_timeout_ms: u64,
}

impl Default for PipelineSection {
    fn default() -> Self {
        Self {
            address_token: None,
            bot_user_id: None,
            fetch_timeout_ms: DEFAULT_FETCH_TIMEOUT_MS,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct StorageSection {
    pub corpus_path: PathBuf,
    /// Takes precedence over `corpus_path` when set.
    pub corpus_url: Option<String>,
    pub learning_path: PathBuf,
    pub blocklist_path: Option<PathBuf>,
}

impl Default for StorageSection {
    fn default() -> Self {
        Self {
            corpus_path: PathBuf::from("data/knowledge.txt"),
            corpus_url: None,
            learning_path: PathBuf::from("data/learning.jsonl"),
            blocklist_path: Some(PathBuf::from("config/blocklist.toml")),
        }
    }
}

impl EngineConfig {
    /// Load from the resolved path, then apply env overrides.
    pub fn load() -> Result<Self> {
        let path = std::env::var(ENV_CONFIG_PATH)
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from(DEFAULT_CONFIG_PATH));

        let mut cfg = if path.exists() {
            Self::from_path(&path)?
        } else {
            tracing::warn!(path = %path.display(), "engine config missing, using defaults");
            Self::default()
        };
        cfg.apply_env();
        Ok(cfg)
    }

    pub fn from_path(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("reading engine config at {}", path.display()))?;
        Self::from_toml_str(&content)
            .with_context(|| format!("parsing engine config at {}", path.display()))
    }

    pub fn from_toml_str(s: &str) -> Result<Self> {
        let mut cfg: EngineConfig = toml::from_str(s)?;
        cfg.matcher = cfg.matcher.sanitized();
        Ok(cfg)
    }

    fn apply_env(&mut self) {
        if let Some(t) = parse_threshold_env(std::env::var(ENV_SIMILARITY_THRESHOLD).ok()) {
            self.matcher.similarity_threshold = t;
        }
        if let Some(n) = parse_count_env(std::env::var(ENV_MIN_OVERLAP).ok()) {
            self.matcher.min_overlap = n;
        }
        if let Ok(token) = std::env::var(ENV_ADDRESS_TOKEN) {
            let token = token.trim();
            if !token.is_empty() {
                self.pipeline.address_token = Some(token.to_string());
            }
        }
    }

    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_millis(self.pipeline.fetch_timeout_ms.max(1))
    }
}

// parse optional float env and clamp to <0.0..=1.0>
fn parse_threshold_env(raw: Option<String>) -> Option<f32> {
    raw.and_then(|s| s.trim().parse::<f32>().ok())
        .filter(|v| v.is_finite())
        .map(|v| v.clamp(0.0, 1.0))
}

fn parse_count_env(raw: Option<String>) -> Option<usize> {
    raw.and_then(|s| s.trim().parse::<usize>().ok())
        .filter(|n| *n > 0)
}
