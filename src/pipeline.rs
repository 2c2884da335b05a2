// src/pipeline.rs
//! Per-message flow: filter → command or (addressed?) knowledge lookup → learning.
//!
//! `handle` returns the reply immediately; recording an unanswered query is
//! handed back as a `LearningTask` so the transport can send the reply first
//! and run `record_unanswered` afterwards. A learning-store outage is logged
//! and never changes the reply.

use anyhow::{Context, Result};
use metrics::counter;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::commands::{run_command, ChatContext, Command};
use crate::config::EngineConfig;
use crate::error::EngineError;
use crate::filter::{classify, load_blocklist_default, Blocklist, Decision};
use crate::knowledge::{KnowledgeBase, MatchResult, UNAVAILABLE_REPLY};
use crate::learning::{learning_context, LearningQueue, LearningRow};
use crate::store::{CorpusStore, FileCorpus, FileLearningStore, HttpCorpus};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatKind {
    Private,
    Group,
}

/// Inbound text message as delivered by the transport.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InboundMessage {
    pub text: String,
    pub sender_id: String,
    #[serde(default)]
    pub sender_name: Option<String>,
    pub chat_id: String,
    pub chat_kind: ChatKind,
    /// Set by the transport after its own administrator check.
    #[serde(default)]
    pub is_admin: bool,
}

impl InboundMessage {
    pub fn is_private(&self) -> bool {
        self.chat_kind == ChatKind::Private
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReplyKind {
    Answer,
    Unknown,
    Unavailable,
    Command,
}

/// What the transport should do with the message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum Outcome {
    /// Reply `warning_html`, then delete the original message.
    Suppressed {
        sender: String,
        text: String,
        warning_html: String,
    },
    Reply {
        kind: ReplyKind,
        text: String,
    },
    Ignored,
}

/// Deferred second step for a query that had no answer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LearningTask {
    pub phrase: String,
    pub context: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Handled {
    pub outcome: Outcome,
    pub learning: Option<LearningTask>,
}

impl From<Outcome> for Handled {
    fn from(outcome: Outcome) -> Self {
        Self {
            outcome,
            learning: None,
        }
    }
}

/// Bot mention such as `@faq_bot`, matched case-insensitively as a whole token.
#[derive(Debug, Clone)]
pub struct AddressToken {
    re: Regex,
}

impl AddressToken {
    pub fn new(token: &str) -> Result<Self> {
        let token = token.trim();
        anyhow::ensure!(!token.is_empty(), "address token is empty");
        // `@faq_bot` must not match inside `@faq_botty`.
        let boundary = if token.ends_with(|c: char| c.is_alphanumeric() || c == '_') {
            r"\b"
        } else {
            ""
        };
        let re = Regex::new(&format!(r"(?i){}{boundary}\s*", regex::escape(token)))
            .context("compiling address token regex")?;
        Ok(Self { re })
    }

    pub fn is_in(&self, text: &str) -> bool {
        self.re.is_match(text)
    }

    pub fn strip(&self, text: &str) -> String {
        self.re.replace_all(text, "").trim().to_string()
    }
}

/// Query text left after stripping the address token; never empty.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Query(String);

impl Query {
    pub fn parse(raw: &str) -> Result<Self, EngineError> {
        let t = raw.trim();
        if t.is_empty() {
            return Err(EngineError::MalformedQuery);
        }
        Ok(Self(t.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

pub struct Pipeline {
    blocklist: Arc<Blocklist>,
    knowledge: KnowledgeBase,
    learning: LearningQueue,
    address: Option<AddressToken>,
    bot_user_id: Option<String>,
}

impl Pipeline {
    pub fn new(blocklist: Arc<Blocklist>, knowledge: KnowledgeBase, learning: LearningQueue) -> Self {
        Self {
            blocklist,
            knowledge,
            learning,
            address: None,
            bot_user_id: None,
        }
    }

    /// Wire stores, blocklist and thresholds from configuration.
    pub fn from_config(cfg: &EngineConfig) -> Result<Self> {
        let timeout = cfg.fetch_timeout();
        let blocklist = load_blocklist_default(cfg.storage.blocklist_path.as_deref())?;
        tracing::info!(target: "filter", words = blocklist.len(), "blocklist loaded");

        let corpus: Arc<dyn CorpusStore> = match &cfg.storage.corpus_url {
            Some(url) => Arc::new(HttpCorpus::with_timeout(url.clone(), timeout)?),
            None => Arc::new(FileCorpus::new(cfg.storage.corpus_path.clone())),
        };
        let learning = Arc::new(FileLearningStore::new(cfg.storage.learning_path.clone()));

        let mut pipeline = Self::new(
            Arc::new(blocklist),
            KnowledgeBase::new(corpus, cfg.matcher, timeout),
            LearningQueue::new(learning, timeout),
        );
        if let Some(token) = &cfg.pipeline.address_token {
            pipeline = pipeline.with_address_token(token)?;
        }
        if let Some(id) = &cfg.pipeline.bot_user_id {
            pipeline = pipeline.with_bot_user_id(id.clone());
        }
        Ok(pipeline)
    }

    pub fn with_address_token(mut self, token: &str) -> Result<Self> {
        self.address = Some(AddressToken::new(token)?);
        Ok(self)
    }

    pub fn with_bot_user_id(mut self, id: impl Into<String>) -> Self {
        self.bot_user_id = Some(id.into());
        self
    }

    pub fn blocklist(&self) -> &Blocklist {
        &self.blocklist
    }

    pub fn knowledge(&self) -> &KnowledgeBase {
        &self.knowledge
    }

    /// Step one: decide what to reply.
    pub async fn handle(&self, msg: &InboundMessage, ctx: &ChatContext) -> Handled {
        counter!("messages_total").increment(1);
        let id = message_id(&msg.text);

        if self.bot_user_id.as_deref() == Some(msg.sender_id.as_str()) {
            return Outcome::Ignored.into();
        }

        if let Decision::Flagged { sender, text } =
            classify(&msg.text, &msg.sender_id, &self.blocklist)
        {
            counter!("messages_flagged_total").increment(1);
            tracing::info!(target: "pipeline", %id, sender = %sender, "flagged message");
            let warning_html = warning_html(&sender, msg.sender_name.as_deref());
            return Outcome::Suppressed {
                sender,
                text,
                warning_html,
            }
            .into();
        }

        if let Some(cmd) = Command::parse(&msg.text) {
            tracing::info!(target: "pipeline", %id, command = ?cmd, "command");
            return match run_command(cmd, msg, ctx, &self.knowledge).await {
                Some(text) => Outcome::Reply {
                    kind: ReplyKind::Command,
                    text,
                }
                .into(),
                None => Outcome::Ignored.into(),
            };
        }

        let Some(raw_query) = self.addressed_query(msg) else {
            return Outcome::Ignored.into();
        };
        let query = match Query::parse(&raw_query) {
            Ok(q) => q,
            Err(e) => {
                tracing::debug!(target: "pipeline", %id, error = %e, "skipping");
                return Outcome::Ignored.into();
            }
        };

        match self.knowledge.lookup(query.as_str()).await {
            Ok(MatchResult::Answer(text)) => {
                counter!("answers_total", "result" => "answer").increment(1);
                Outcome::Reply {
                    kind: ReplyKind::Answer,
                    text,
                }
                .into()
            }
            Ok(MatchResult::Unknown) => {
                counter!("answers_total", "result" => "unknown").increment(1);
                tracing::info!(target: "pipeline", %id, "no answer found");
                Handled {
                    outcome: Outcome::Reply {
                        kind: ReplyKind::Unknown,
                        text: MatchResult::Unknown.reply_text().to_string(),
                    },
                    learning: Some(LearningTask {
                        phrase: query.as_str().to_string(),
                        context: learning_context(&msg.sender_id, &msg.chat_id),
                    }),
                }
            }
            Err(e) => {
                counter!("answers_total", "result" => "unavailable").increment(1);
                tracing::warn!(target: "pipeline", %id, error = %e, "knowledge lookup failed");
                Outcome::Reply {
                    kind: ReplyKind::Unavailable,
                    text: UNAVAILABLE_REPLY.to_string(),
                }
                .into()
            }
        }
    }

    /// Step two: queue an unanswered query. Store failures are swallowed.
    pub async fn record_unanswered(&self, task: &LearningTask) -> Option<LearningRow> {
        match self.learning.enqueue(&task.phrase, &task.context).await {
            Ok(row) => row,
            Err(e) => {
                counter!("learning_store_errors_total").increment(1);
                tracing::warn!(target: "learning", error = %e, "could not record phrase");
                None
            }
        }
    }

    /// Both steps in sequence, for callers that do not stream replies.
    pub async fn handle_and_record(&self, msg: &InboundMessage, ctx: &ChatContext) -> Outcome {
        let handled = self.handle(msg, ctx).await;
        if let Some(task) = &handled.learning {
            self.record_unanswered(task).await;
        }
        handled.outcome
    }

    /// Query text if the message is private or mentions the bot.
    pub fn addressed_query(&self, msg: &InboundMessage) -> Option<String> {
        let mentioned = self.address.as_ref().filter(|a| a.is_in(&msg.text));
        match mentioned {
            Some(addr) => Some(addr.strip(&msg.text)),
            None if msg.is_private() => Some(msg.text.trim().to_string()),
            None => None,
        }
    }
}

/// HTML warning that mentions the sender; the name is escaped.
pub fn warning_html(sender_id: &str, sender_name: Option<&str>) -> String {
    let name = sender_name.filter(|n| !n.trim().is_empty()).unwrap_or(sender_id);
    format!(
        "⚠️ Warning: <a href=\"tg://user?id={}\">{}</a> used inappropriate language.",
        html_escape::encode_double_quoted_attribute(sender_id),
        html_escape::encode_text(name)
    )
}

/// Short anonymized id for logs; raw text is never logged.
pub(crate) fn message_id(text: &str) -> String {
    use sha2::{Digest, Sha256};
    let digest = Sha256::digest(text.as_bytes());
    let mut out = String::with_capacity(12);
    for b in digest.iter().take(6) {
        use std::fmt::Write as _;
        let _ = write!(&mut out, "{:02x}", b);
    }
    out
}
