//! Pre-extracted document content.
//!
//! Parsing slide decks and paginated files happens outside this crate; a
//! [`Document`] arrives with its units already extracted. Long-form text is
//! the exception: it is split here with [`chunk_long_form`].

use serde::{Deserialize, Serialize};

use crate::job::JobMode;

/// Default word budget per long-form chunk.
pub const DEFAULT_CHUNK_WORDS: usize = 180;

/// One slide, page or chunk of source content.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct UnitContent {
    pub unit_number: u32,
    #[serde(default)]
    pub title: String,
    pub text: String,
}

impl UnitContent {
    pub fn new(unit_number: u32, title: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            unit_number,
            title: title.into(),
            text: text.into(),
        }
    }

    /// Title and body joined, as handed to collaborators.
    pub fn full_text(&self) -> String {
        if self.title.trim().is_empty() {
            self.text.clone()
        } else {
            format!("{}\n\n{}", self.title.trim(), self.text)
        }
    }
}

/// A submitted document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Document {
    pub filename: String,
    pub mode: JobMode,
    #[serde(default)]
    pub units: Vec<UnitContent>,
    /// Raw body for `long_form_chunked` documents submitted without units.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
}

impl Document {
    pub fn new(filename: impl Into<String>, mode: JobMode, units: Vec<UnitContent>) -> Self {
        Self {
            filename: filename.into(),
            mode,
            units,
            text: None,
        }
    }

    pub fn long_form(filename: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            filename: filename.into(),
            mode: JobMode::LongFormChunked,
            units: Vec::new(),
            text: Some(text.into()),
        }
    }

    /// Units to process: empty ones dropped, ascending by number, at most
    /// `max_units`.
    pub fn prepared_units(&self, max_units: usize) -> Vec<UnitContent> {
        let mut units = if self.units.is_empty() && self.mode == JobMode::LongFormChunked {
            self.text
                .as_deref()
                .map(|text| chunk_long_form(text, DEFAULT_CHUNK_WORDS))
                .unwrap_or_default()
        } else {
            self.units.clone()
        };
        units.retain(|u| !u.text.trim().is_empty());
        units.sort_by_key(|u| u.unit_number);
        units.dedup_by_key(|u| u.unit_number);
        units.truncate(max_units);
        units
    }
}

/// Splits free text into units of at most `max_words` words.
///
/// Paragraphs (blank-line separated) are packed greedily; a paragraph longer
/// than the budget is split on word boundaries. Units are numbered from 1.
pub fn chunk_long_form(text: &str, max_words: usize) -> Vec<UnitContent> {
    let max_words = max_words.max(1);
    let mut chunks: Vec<Vec<&str>> = Vec::new();
    let mut current: Vec<&str> = Vec::new();

    for paragraph in text.split("\n\n") {
        let words: Vec<&str> = paragraph.split_whitespace().collect();
        if words.is_empty() {
            continue;
        }
        if !current.is_empty() && current.len() + words.len() > max_words {
            chunks.push(std::mem::take(&mut current));
        }
        for word in words {
            if current.len() == max_words {
                chunks.push(std::mem::take(&mut current));
            }
            current.push(word);
        }
    }
    if !current.is_empty() {
        chunks.push(current);
    }

    chunks
        .into_iter()
        .enumerate()
        .map(|(i, words)| UnitContent::new(i as u32 + 1, "", words.join(" ")))
        .collect()
}
