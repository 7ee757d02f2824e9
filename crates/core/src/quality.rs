//! Narration quality metadata.
//!
//! Computed once when a narration is generated and stored with it in the
//! cache, so cached and fresh narrations report the same numbers.

use std::collections::{HashMap, HashSet};

use once_cell::sync::Lazy;
use regex_lite::Regex;
use serde::{Deserialize, Serialize};

/// Key terms taken from the source text.
pub const MAX_KEY_TERMS: usize = 5;

/// Key terms that must reappear in the narration for it to pass.
pub const MIN_TERMS_REQUIRED: usize = 3;

static TERM_PATTERN: Lazy<Regex> = Lazy::new(|| Regex::new(r"[A-Za-z][A-Za-z0-9-]{2,}").unwrap());

static STOPWORDS: Lazy<HashSet<&'static str>> = Lazy::new(|| {
    [
        "the", "and", "for", "with", "that", "this", "from", "into", "over", "under", "between",
        "within", "without", "your", "their", "there", "these", "those", "which", "where",
        "when", "while", "about", "because", "using", "used", "use", "than", "then", "also",
        "such", "some", "more", "most", "many", "much", "very", "onto", "each", "other", "only",
        "same", "like", "just", "make", "made", "will", "would", "could", "should", "can", "may",
        "might", "must", "therefore", "however", "overall",
    ]
    .into_iter()
    .collect()
});

/// Quality figures for one narration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NarrationMeta {
    pub word_count: usize,
    /// Most frequent significant terms of the source text.
    pub key_terms: Vec<String>,
    /// The subset of `key_terms` the narration mentions.
    pub terms_found: Vec<String>,
    pub terms_required: usize,
    /// The narration stays on the source's subject. Always false when the
    /// source has no usable terms.
    pub hallucination_ok: bool,
}

impl NarrationMeta {
    pub fn analyze(source: &str, narration: &str) -> Self {
        let key_terms = extract_key_terms(source, MAX_KEY_TERMS);
        let mentioned: HashSet<String> = TERM_PATTERN
            .find_iter(narration)
            .map(|m| m.as_str().to_lowercase())
            .collect();
        let terms_found: Vec<String> = key_terms
            .iter()
            .filter(|term| mentioned.contains(*term))
            .cloned()
            .collect();
        let terms_required = MIN_TERMS_REQUIRED.min(key_terms.len());

        Self {
            word_count: count_words(narration),
            hallucination_ok: terms_required > 0 && terms_found.len() >= terms_required,
            key_terms,
            terms_found,
            terms_required,
        }
    }
}

pub fn count_words(text: &str) -> usize {
    text.split_whitespace().count()
}

/// Lowercased terms ranked by frequency, then length, then alphabetically.
pub fn extract_key_terms(text: &str, max_terms: usize) -> Vec<String> {
    let mut counts: HashMap<String, usize> = HashMap::new();
    for m in TERM_PATTERN.find_iter(text) {
        let term = m.as_str().to_lowercase();
        if !STOPWORDS.contains(term.as_str()) {
            *counts.entry(term).or_default() += 1;
        }
    }

    let mut ranked: Vec<(String, usize)> = counts.into_iter().collect();
    ranked.sort_by(|(a, a_count), (b, b_count)| {
        b_count
            .cmp(a_count)
            .then_with(|| b.len().cmp(&a.len()))
            .then_with(|| a.cmp(b))
    });
    ranked
        .into_iter()
        .take(max_terms)
        .map(|(term, _)| term)
        .collect()
}
