// src/filter.rs
//! Inappropriate-content detector.
//!
//! The blocklist is compiled once into a single word-boundary regex and is
//! read-only afterwards, so `classify` is a pure function that can be called
//! from any number of tasks at once.
//!
//! Blocklist files are either TOML (`words = ["..."]`) or a JSON array.

use anyhow::{anyhow, bail, Context, Result};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};

const ENV_PATH: &str = "BLOCKLIST_PATH";

/// Used when no blocklist file is configured or present.
pub const DEFAULT_BLOCKLIST: &[&str] = &[
    "hate", "stupid", "idiot", "moron", "shit", "fuck", "fucking", "asshole", "bastard", "bitch",
    "damn", "hell", "dumb", "loser", "ass", "dick", "piss", "whore", "slut", "terrorist",
];

/// Outcome of running the filter over one message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "decision", rename_all = "snake_case")]
pub enum Decision {
    /// Carries what the transport needs to warn the sender and delete the message.
    Flagged { sender: String, text: String },
    Clean,
}

impl Decision {
    pub fn is_flagged(&self) -> bool {
        matches!(self, Decision::Flagged { .. })
    }
}

/// Fixed set of lowercase single-token words.
#[derive(Debug, Clone)]
pub struct Blocklist {
    words: BTreeSet<String>,
    re: Option<Regex>,
}

impl Blocklist {
    /// Build from raw entries: trimmed, lowercased, deduplicated, empties dropped.
    /// An entry with internal whitespace is rejected.
    pub fn new<I, S>(entries: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut words = BTreeSet::new();
        for raw in entries {
            let w = raw.as_ref().trim().to_lowercase();
            if w.is_empty() {
                continue;
            }
            if w.chars().any(char::is_whitespace) {
                bail!("blocklist entry `{}` is not a single token", w);
            }
            words.insert(w);
        }

        let re = if words.is_empty() {
            None
        } else {
            let alternation = words
                .iter()
                .map(|w| regex::escape(w))
                .collect::<Vec<_>>()
                .join("|");
            let pattern = format!(r"(?u)\b(?:{alternation})\b");
            Some(Regex::new(&pattern).context("compiling blocklist regex")?)
        };

        Ok(Self { words, re })
    }

    pub fn default_words() -> Self {
        // Built-in entries are single lowercase tokens, so this cannot fail.
        Self::new(DEFAULT_BLOCKLIST.iter().copied()).unwrap_or_else(|_| Self::empty())
    }

    pub fn empty() -> Self {
        Self {
            words: BTreeSet::new(),
            re: None,
        }
    }

    pub fn len(&self) -> usize {
        self.words.len()
    }

    pub fn is_empty(&self) -> bool {
        self.words.is_empty()
    }

    pub fn contains(&self, word: &str) -> bool {
        self.words.contains(&word.to_lowercase())
    }

    /// First blocklisted word found as a whole word in `text`, if any.
    pub fn first_hit(&self, text: &str) -> Option<String> {
        let re = self.re.as_ref()?;
        let lower = text.to_lowercase();
        re.find(&lower).map(|m| m.as_str().to_string())
    }
}

/// Classify a message. Any whole-word hit flags it; empty text is clean.
pub fn classify(text: &str, sender: &str, blocklist: &Blocklist) -> Decision {
    match blocklist.first_hit(text) {
        Some(word) => {
            tracing::debug!(target: "filter", %word, "blocklist hit");
            Decision::Flagged {
                sender: sender.to_string(),
                text: text.to_string(),
            }
        }
        None => Decision::Clean,
    }
}

/// Load a blocklist from an explicit path. Supports TOML or JSON formats.
pub fn load_blocklist_from(path: &Path) -> Result<Blocklist> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("reading blocklist from {}", path.display()))?;
    let ext = path
        .extension()
        .and_then(|s| s.to_str())
        .unwrap_or_default()
        .to_ascii_lowercase();
    let words = parse_blocklist(&content, ext.as_str())?;
    Blocklist::new(words)
}

/// Resolve the blocklist:
/// 1) $BLOCKLIST_PATH
/// 2) `configured` path, if it exists
/// 3) built-in default words
pub fn load_blocklist_default(configured: Option<&Path>) -> Result<Blocklist> {
    if let Ok(p) = std::env::var(ENV_PATH) {
        let pb = PathBuf::from(p);
        if pb.exists() {
            return load_blocklist_from(&pb);
        }
        return Err(anyhow!("BLOCKLIST_PATH points to non-existent path"));
    }
    if let Some(p) = configured {
        if p.exists() {
            return load_blocklist_from(p);
        }
        tracing::warn!(target: "filter", path = %p.display(), "blocklist file missing, using defaults");
    }
    Ok(Blocklist::default_words())
}

fn parse_blocklist(s: &str, hint_ext: &str) -> Result<Vec<String>> {
    let try_toml = hint_ext == "toml" || s.contains("words");
    if try_toml {
        if let Ok(v) = parse_toml(s) {
            return Ok(v);
        }
    }
    if let Ok(v) = serde_json::from_str::<Vec<String>>(s) {
        return Ok(v);
    }
    if !try_toml {
        if let Ok(v) = parse_toml(s) {
            return Ok(v);
        }
    }
    Err(anyhow!("unsupported blocklist format"))
}

fn parse_toml(s: &str) -> Result<Vec<String>> {
    #[derive(Deserialize)]
    struct TomlBlocklist {
        words: Vec<String>,
    }
    let v: TomlBlocklist = toml::from_str(s)?;
    Ok(v.words)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bl(words: &[&str]) -> Blocklist {
        Blocklist::new(words.iter().copied()).unwrap()
    }

    #[test]
    fn whole_word_hits_any_case() {
        let b = bl(&["idiot", "ass"]);
        assert!(classify("You IDIOT!", "u1", &b).is_flagged());
        assert!(classify("what an ass.", "u1", &b).is_flagged());
        assert!(classify("ass", "u1", &b).is_flagged());
    }

    #[test]
    fn substring_of_longer_word_is_clean() {
        let b = bl(&["ass", "hell"]);
        assert_eq!(classify("first class passage", "u1", &b), Decision::Clean);
        assert_eq!(classify("hello there, shellfish", "u1", &b), Decision::Clean);
    }

    #[test]
    fn empty_text_and_empty_list_are_clean() {
        assert_eq!(classify("", "u1", &bl(&["idiot"])), Decision::Clean);
        assert_eq!(classify("idiot", "u1", &Blocklist::empty()), Decision::Clean);
    }

    #[test]
    fn flagged_carries_sender_and_original_text() {
        let d = classify("Stupid bot", "42", &bl(&["stupid"]));
        assert_eq!(
            d,
            Decision::Flagged {
                sender: "42".into(),
                text: "Stupid bot".into()
            }
        );
    }

    #[test]
    fn entries_are_normalized_and_multi_word_rejected() {
        let b = bl(&[" Idiot ", "idiot", ""]);
        assert_eq!(b.len(), 1);
        assert!(b.contains("IDIOT"));
        assert!(Blocklist::new(["two words"]).is_err());
    }

    #[test]
    fn regex_metacharacters_are_escaped() {
        let b = bl(&["c.t"]);
        assert!(!classify("cat", "u1", &b).is_flagged());
        assert!(classify("a c.t here", "u1", &b).is_flagged());
    }

    #[test]
    fn parses_toml_and_json() {
        assert_eq!(
            parse_blocklist(r#"words = ["a", "b"]"#, "toml").unwrap(),
            vec!["a", "b"]
        );
        assert_eq!(parse_blocklist(r#"["x"]"#, "json").unwrap(), vec!["x"]);
        assert!(parse_blocklist("nonsense", "").is_err());
    }
}
