// src/knowledge/matcher.rs
//! Query → answer selection over a parsed corpus.
//!
//! Two passes, both over the same candidates in corpus order:
//! 1) word overlap: how many query words occur (as substrings) in the candidate key
//! 2) fuzzy: `strsim::normalized_levenshtein` between the whole query and the key
//!
//! Ties keep the first candidate encountered.

use serde::{Deserialize, Serialize};
use strsim::normalized_levenshtein;

use super::corpus::{parse_candidates, Candidate, CandidateKind};

pub const DEFAULT_MIN_OVERLAP: usize = 2;
pub const DEFAULT_LINE_MIN_OVERLAP: usize = 1;
pub const DEFAULT_SIMILARITY_THRESHOLD: f32 = 0.6;

/// Tunable matching thresholds.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MatchParams {
    /// Minimum overlapping words in a corpus with Q/A entries.
    pub min_overlap: usize,
    /// Minimum overlapping words when the corpus has no Q/A entries.
    pub line_min_overlap: usize,
    /// Minimum similarity in [0,1] for the fuzzy pass.
    pub similarity_threshold: f32,
}

impl Default for MatchParams {
    fn default() -> Self {
        Self {
            min_overlap: DEFAULT_MIN_OVERLAP,
            line_min_overlap: DEFAULT_LINE_MIN_OVERLAP,
            similarity_threshold: DEFAULT_SIMILARITY_THRESHOLD,
        }
    }
}

impl MatchParams {
    /// Clamp to sane ranges; a zero overlap minimum would accept everything.
    pub fn sanitized(mut self) -> Self {
        if !self.similarity_threshold.is_finite() {
            self.similarity_threshold = DEFAULT_SIMILARITY_THRESHOLD;
        }
        self.similarity_threshold = self.similarity_threshold.clamp(0.0, 1.0);
        self.min_overlap = self.min_overlap.max(1);
        self.line_min_overlap = self.line_min_overlap.max(1);
        self
    }

    /// One minimum per corpus: Q/A corpora use `min_overlap` for every
    /// candidate, purely line-oriented corpora use `line_min_overlap`.
    fn min_overlap_for(&self, candidates: &[Candidate]) -> usize {
        if candidates.iter().any(|c| c.kind == CandidateKind::Question) {
            self.min_overlap
        } else {
            self.line_min_overlap
        }
    }
}

/// Tagged lookup result; `Unknown` never carries corpus text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "result", content = "text", rename_all = "snake_case")]
pub enum MatchResult {
    Answer(String),
    Unknown,
}

impl MatchResult {
    pub fn is_unknown(&self) -> bool {
        matches!(self, MatchResult::Unknown)
    }
}

/// Which pass produced an answer (diagnostics only).
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum MatchPass {
    Overlap(usize),
    Fuzzy(f32),
}

/// Select the best answer for `query` from raw corpus text.
pub fn answer(query: &str, corpus: &str, params: &MatchParams) -> MatchResult {
    match best_match(query, corpus, params) {
        Some((c, pass)) => {
            tracing::debug!(target: "knowledge", ?pass, kind = ?c.kind, "matched");
            MatchResult::Answer(c.answer)
        }
        None => MatchResult::Unknown,
    }
}

/// Like [`answer`], but also reports the winning candidate and pass.
pub fn best_match(query: &str, corpus: &str, params: &MatchParams) -> Option<(Candidate, MatchPass)> {
    let q = query.trim().to_lowercase();
    if q.is_empty() {
        return None;
    }
    let candidates = parse_candidates(corpus);
    if candidates.is_empty() {
        return None;
    }
    let keys: Vec<String> = candidates.iter().map(|c| c.key.to_lowercase()).collect();

    if let Some((idx, score)) = best_overlap(&q, &candidates, &keys, params) {
        return Some((candidates[idx].clone(), MatchPass::Overlap(score)));
    }
    if let Some((idx, sim)) = best_fuzzy(&q, &keys, params.similarity_threshold) {
        return Some((candidates[idx].clone(), MatchPass::Fuzzy(sim)));
    }
    None
}

/// Number of query words that occur as substrings of `key` (both lowercase).
pub fn overlap_score(query_lower: &str, key_lower: &str) -> usize {
    query_lower
        .split_whitespace()
        .filter(|w| key_lower.contains(*w))
        .count()
}

fn best_overlap(
    q: &str,
    candidates: &[Candidate],
    keys: &[String],
    params: &MatchParams,
) -> Option<(usize, usize)> {
    let min = params.min_overlap_for(candidates);
    let mut best: Option<(usize, usize)> = None;
    for (idx, key) in keys.iter().enumerate() {
        let score = overlap_score(q, key);
        if score < min {
            continue;
        }
        if best.map_or(true, |(_, s)| score > s) {
            best = Some((idx, score));
        }
    }
    best
}

fn best_fuzzy(q: &str, keys: &[String], threshold: f32) -> Option<(usize, f32)> {
    let mut best: Option<(usize, f32)> = None;
    for (idx, key) in keys.iter().enumerate() {
        let sim = normalized_levenshtein(q, key) as f32;
        if sim < threshold {
            continue;
        }
        if best.map_or(true, |(_, s)| sim > s) {
            best = Some((idx, sim));
        }
    }
    best
}

#[cfg(test)]
mod tests {
    use super::*;

    fn p() -> MatchParams {
        MatchParams::default()
    }

    #[test]
    fn overlap_pass_returns_answer() {
        let corpus = "Q: What is X?\nA: X is Y.\n";
        assert_eq!(
            answer("what is x", corpus, &p()),
            MatchResult::Answer("X is Y.".into())
        );
    }

    #[test]
    fn single_word_overlap_is_not_enough_for_questions() {
        let corpus = "Q: Opening hours\nA: 9 to 5\n";
        assert_eq!(best_overlap_only("hours please", corpus), None);
    }

    fn best_overlap_only(q: &str, corpus: &str) -> Option<usize> {
        let c = parse_candidates(corpus);
        let keys: Vec<String> = c.iter().map(|c| c.key.to_lowercase()).collect();
        best_overlap(&q.to_lowercase(), &c, &keys, &p()).map(|(_, s)| s)
    }

    #[test]
    fn line_corpus_accepts_one_word() {
        let corpus = "The office opens at nine.\nParking is on level two.\n";
        assert_eq!(
            answer("parking?", corpus, &p()),
            MatchResult::Unknown,
            "punctuation is part of the word"
        );
        assert_eq!(
            answer("parking", corpus, &p()),
            MatchResult::Answer("Parking is on level two.".into())
        );
    }

    #[test]
    fn title_line_in_qa_corpus_needs_full_overlap() {
        let corpus = "Welcome to our FAQ\nQ: Opening hours?\nA: Nine to five.\n";
        assert_eq!(answer("can I bring a dog", corpus, &p()), MatchResult::Unknown);
        assert_eq!(
            answer("welcome faq", corpus, &p()),
            MatchResult::Answer("Welcome to our FAQ".into())
        );
    }

    #[test]
    fn ties_keep_corpus_order() {
        let corpus = "Q: reset password email\nA: first\nQ: reset password phone\nA: second\n";
        assert_eq!(
            answer("reset password", corpus, &p()),
            MatchResult::Answer("first".into())
        );
    }

    #[test]
    fn higher_overlap_wins_over_earlier() {
        let corpus = "Q: reset password\nA: first\nQ: how to reset my password\nA: second\n";
        assert_eq!(
            answer("how to reset password", corpus, &p()),
            MatchResult::Answer("second".into())
        );
    }

    #[test]
    fn fuzzy_fallback_when_no_overlap() {
        let corpus = "Q: shipping policy\nA: Free over 50.\n";
        assert_eq!(overlap_score("shiping polcy", "shipping policy"), 0);
        let (c, pass) = best_match("Shiping polcy", corpus, &p()).unwrap();
        assert_eq!(c.answer, "Free over 50.");
        assert!(matches!(pass, MatchPass::Fuzzy(s) if s >= 0.6));
    }

    #[test]
    fn unknown_when_nothing_qualifies() {
        let corpus = "Q: shipping policy\nA: Free over 50.\n";
        assert_eq!(answer("quantum chromodynamics", corpus, &p()), MatchResult::Unknown);
        assert_eq!(answer("anything", "", &p()), MatchResult::Unknown);
        assert_eq!(answer("   ", corpus, &p()), MatchResult::Unknown);
    }

    #[test]
    fn thresholds_are_tunable() {
        let corpus = "Q: shipping policy\nA: Free over 50.\n";
        let strict = MatchParams {
            similarity_threshold: 0.95,
            ..p()
        };
        assert_eq!(answer("shiping polcy", corpus, &strict), MatchResult::Unknown);

        let loose = MatchParams { min_overlap: 1, ..p() };
        assert_eq!(
            answer("policy", corpus, &loose),
            MatchResult::Answer("Free over 50.".into())
        );
    }

    #[test]
    fn sanitized_clamps_values() {
        let s = MatchParams {
            min_overlap: 0,
            line_min_overlap: 0,
            similarity_threshold: f32::NAN,
        }
        .sanitized();
        assert_eq!(s.min_overlap, 1);
        assert_eq!(s.line_min_overlap, 1);
        assert!((s.similarity_threshold - DEFAULT_SIMILARITY_THRESHOLD).abs() < 1e-6);
    }
}
