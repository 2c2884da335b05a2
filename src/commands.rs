// src/commands.rs
//! Slash commands and per-chat settings.
//!
//! `ChatContext` is owned by whoever integrates the transport and is passed
//! into every handler; nothing here keeps process-wide state.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::RwLock;

use crate::knowledge::KnowledgeBase;
use crate::pipeline::{InboundMessage, Outcome, ReplyKind};

pub const START_TEXT: &str = "Hi! I'm a moderation and assistance bot. \
I can detect inappropriate language and answer questions based on my knowledge base. \
Use /help to see all available commands.";

pub const HELP_TEXT: &str = "🤖 Available commands:\n\n\
/start - Start interacting with the bot\n\
/help - Show this help message\n\
/add_knowledge <question> | <answer> - Add new knowledge to my database (admin only)\n\
/set_welcome <message> - Set a custom welcome message for this group (admin only)\n\n\
I automatically monitor messages for inappropriate content and can answer questions \
when you mention me in a group chat or message me directly.";

pub const DEFAULT_WELCOME: &str = "Hello! I'm here to help maintain a positive environment. \
I can detect inappropriate language and answer questions based on my knowledge base. \
Use /help to see what I can do.";

pub const NOT_ADMIN_TEXT: &str = "❌ You need to be an administrator to use this command.";
pub const ADD_KNOWLEDGE_USAGE: &str =
    "Please provide knowledge in the format: /add_knowledge Question | Answer";
pub const ADD_KNOWLEDGE_SEPARATOR: &str =
    "Please separate question and answer with a | character: /add_knowledge Question | Answer";
pub const ADD_KNOWLEDGE_OK: &str = "✅ Knowledge added successfully!";
pub const ADD_KNOWLEDGE_FAILED: &str = "❌ Failed to add knowledge. Please check logs for details.";
pub const SET_WELCOME_USAGE: &str =
    "Please provide a welcome message: /set_welcome Your welcome message here";
pub const SET_WELCOME_OK: &str = "✅ Welcome message set successfully!";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Command {
    Start,
    Help,
    AddKnowledge(String),
    SetWelcome(String),
    /// Any other `/name`; never answered or learned from.
    Unknown(String),
}

impl Command {
    /// Parse `/name[@bot] args...`. Text that does not start with `/` yields `None`.
    pub fn parse(text: &str) -> Option<Self> {
        let text = text.trim_start();
        let rest = text.strip_prefix('/')?;
        let (head, args) = match rest.find(char::is_whitespace) {
            Some(i) => (&rest[..i], rest[i..].trim()),
            None => (rest, ""),
        };
        let name = head.split('@').next().unwrap_or_default();
        let cmd = match name.to_ascii_lowercase().as_str() {
            "start" => Command::Start,
            "help" => Command::Help,
            "add_knowledge" => Command::AddKnowledge(args.to_string()),
            "set_welcome" => Command::SetWelcome(args.to_string()),
            other => Command::Unknown(other.to_string()),
        };
        Some(cmd)
    }

    fn admin_only(&self) -> bool {
        matches!(self, Command::AddKnowledge(_) | Command::SetWelcome(_))
    }
}

/// Per-chat settings shared by handlers.
#[derive(Debug, Default)]
pub struct ChatContext {
    welcome: RwLock<HashMap<String, String>>,
}

impl ChatContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn welcome_for(&self, chat_id: &str) -> String {
        let map = self.welcome.read().unwrap_or_else(|p| p.into_inner());
        map.get(chat_id)
            .cloned()
            .unwrap_or_else(|| DEFAULT_WELCOME.to_string())
    }

    pub fn set_welcome(&self, chat_id: &str, message: &str) {
        let mut map = self.welcome.write().unwrap_or_else(|p| p.into_inner());
        map.insert(chat_id.to_string(), message.to_string());
    }
}

/// Split `question | answer`; both sides must be non-empty.
pub fn split_knowledge(args: &str) -> Result<(String, String), &'static str> {
    if args.trim().is_empty() {
        return Err(ADD_KNOWLEDGE_USAGE);
    }
    let Some((q, a)) = args.split_once('|') else {
        return Err(ADD_KNOWLEDGE_SEPARATOR);
    };
    let (q, a) = (q.trim(), a.trim());
    if q.is_empty() || a.is_empty() {
        return Err(ADD_KNOWLEDGE_USAGE);
    }
    Ok((q.to_string(), a.to_string()))
}

/// Run a parsed command and produce the reply; unknown commands get none.
pub async fn run_command(
    cmd: Command,
    msg: &InboundMessage,
    ctx: &ChatContext,
    knowledge: &KnowledgeBase,
) -> Option<String> {
    if cmd.admin_only() && !(msg.is_private() || msg.is_admin) {
        return Some(NOT_ADMIN_TEXT.to_string());
    }

    let reply = match cmd {
        Command::Start => START_TEXT.to_string(),
        Command::Help => HELP_TEXT.to_string(),
        Command::AddKnowledge(args) => {
            let (question, answer) = match split_knowledge(&args) {
                Ok(pair) => pair,
                Err(usage) => return Some(usage.to_string()),
            };
            match knowledge.add_entry(&question, &answer).await {
                Ok(()) => ADD_KNOWLEDGE_OK.to_string(),
                Err(e) => {
                    tracing::error!(target: "knowledge", error = %e, "add_knowledge failed");
                    ADD_KNOWLEDGE_FAILED.to_string()
                }
            }
        }
        Command::SetWelcome(message) => {
            if message.is_empty() {
                return Some(SET_WELCOME_USAGE.to_string());
            }
            ctx.set_welcome(&msg.chat_id, &message);
            SET_WELCOME_OK.to_string()
        }
        Command::Unknown(_) => return None,
    };
    Some(reply)
}

/// Greeting when the bot itself joins a chat.
pub fn on_bot_added(ctx: &ChatContext, chat_id: &str) -> Outcome {
    Outcome::Reply {
        kind: ReplyKind::Command,
        text: ctx.welcome_for(chat_id),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_commands_with_bot_suffix_and_args() {
        assert_eq!(Command::parse("/start"), Some(Command::Start));
        assert_eq!(Command::parse("/HELP@faq_bot"), Some(Command::Help));
        assert_eq!(
            Command::parse("/add_knowledge  Hours? | 9 to 5 "),
            Some(Command::AddKnowledge("Hours? | 9 to 5".into()))
        );
        assert_eq!(
            Command::parse("/set_welcome"),
            Some(Command::SetWelcome(String::new()))
        );
        assert_eq!(
            Command::parse("/settings@faq_bot now"),
            Some(Command::Unknown("settings".into()))
        );
        assert_eq!(Command::parse("hello /start"), None);
    }

    #[test]
    fn split_knowledge_validates_both_sides() {
        assert_eq!(
            split_knowledge("Hours? | 9 to 5 | weekdays"),
            Ok(("Hours?".into(), "9 to 5 | weekdays".into()))
        );
        assert_eq!(split_knowledge(""), Err(ADD_KNOWLEDGE_USAGE));
        assert_eq!(split_knowledge("no separator"), Err(ADD_KNOWLEDGE_SEPARATOR));
        assert_eq!(split_knowledge(" | answer"), Err(ADD_KNOWLEDGE_USAGE));
    }

    #[test]
    fn welcome_defaults_per_chat() {
        let ctx = ChatContext::new();
        assert_eq!(ctx.welcome_for("c1"), DEFAULT_WELCOME);
        ctx.set_welcome("c1", "Hi team");
        assert_eq!(ctx.welcome_for("c1"), "Hi team");
        assert_eq!(ctx.welcome_for("c2"), DEFAULT_WELCOME);
    }
}
