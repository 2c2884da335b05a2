// src/knowledge/corpus.rs
//! Corpus parsing.
//!
//! Convention: a line starting with `Q:` opens a question, a later `A:` line
//! opens its answer, and unmarked lines after that are space-joined onto the
//! answer until the next `Q:`. Everything outside the convention becomes a
//! standalone line whose answer is the line itself.

use serde::{Deserialize, Serialize};

pub const QUESTION_MARKER: &str = "Q:";
pub const ANSWER_MARKER: &str = "A:";

/// A parsed question/answer pair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QaEntry {
    pub question: String,
    pub answer: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CandidateKind {
    Question,
    Line,
}

/// One matchable unit: the text queries are scored against, and what to reply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Candidate {
    pub kind: CandidateKind,
    pub key: String,
    pub answer: String,
}

impl Candidate {
    fn question(e: QaEntry) -> Self {
        Self {
            kind: CandidateKind::Question,
            key: e.question,
            answer: e.answer,
        }
    }

    fn line(text: &str) -> Self {
        Self {
            kind: CandidateKind::Line,
            key: text.to_string(),
            answer: text.to_string(),
        }
    }
}

/// Parser state for the entry currently being assembled.
struct Pending {
    question: String,
    answer: Option<String>,
}

impl Pending {
    fn finish(self) -> Option<QaEntry> {
        let answer = self.answer?;
        if self.question.is_empty() || answer.is_empty() {
            return None;
        }
        Some(QaEntry {
            question: self.question,
            answer,
        })
    }
}

/// Parse corpus text into candidates in corpus order.
///
/// A question that never receives a non-empty answer is dropped.
pub fn parse_candidates(corpus: &str) -> Vec<Candidate> {
    let mut out = Vec::new();
    let mut pending: Option<Pending> = None;

    for raw in corpus.lines() {
        let line = raw.trim();
        if line.is_empty() {
            continue;
        }

        if let Some(rest) = line.strip_prefix(QUESTION_MARKER) {
            if let Some(entry) = pending.take().and_then(Pending::finish) {
                out.push(Candidate::question(entry));
            }
            pending = Some(Pending {
                question: rest.trim().to_string(),
                answer: None,
            });
            continue;
        }

        match pending.as_mut() {
            Some(p) => {
                if let Some(rest) = line.strip_prefix(ANSWER_MARKER) {
                    p.answer = Some(rest.trim().to_string());
                } else if let Some(answer) = p.answer.as_mut() {
                    if !answer.is_empty() {
                        answer.push(' ');
                    }
                    answer.push_str(line);
                } else {
                    // Continuation of a question that has no answer yet.
                    if !p.question.is_empty() {
                        p.question.push(' ');
                    }
                    p.question.push_str(line);
                }
            }
            None => out.push(Candidate::line(line)),
        }
    }

    if let Some(entry) = pending.and_then(Pending::finish) {
        out.push(Candidate::question(entry));
    }
    out
}

/// Only the question/answer pairs of a corpus.
pub fn parse_entries(corpus: &str) -> Vec<QaEntry> {
    parse_candidates(corpus)
        .into_iter()
        .filter(|c| c.kind == CandidateKind::Question)
        .map(|c| QaEntry {
            question: c.key,
            answer: c.answer,
        })
        .collect()
}

/// Render an entry the way it is appended to the corpus document.
pub fn format_entry(question: &str, answer: &str) -> String {
    format!(
        "\n{QUESTION_MARKER} {}\n{ANSWER_MARKER} {}\n",
        question.trim(),
        answer.trim()
    )
}
