//! Cache key and entry types.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::job::JobMode;
use crate::quality::NarrationMeta;

/// Content address of a narration: hex SHA-256 over
/// `language | model_version | mode | normalized content`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CacheKey(String);

impl CacheKey {
    pub fn compute(language: &str, model_version: &str, mode: JobMode, content: &str) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(language.trim().to_lowercase().as_bytes());
        hasher.update(b"|");
        hasher.update(model_version.as_bytes());
        hasher.update(b"|");
        hasher.update(mode.as_str().as_bytes());
        hasher.update(b"|");
        hasher.update(normalize(content).as_bytes());
        let digest = hasher.finalize();
        Self(digest.iter().map(|b| format!("{b:02x}")).collect())
    }

    /// Wraps an already computed key (e.g. read back from storage).
    pub fn from_hex(hex: impl Into<String>) -> Self {
        Self(hex.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Collapses whitespace runs to one space and trims.
fn normalize(content: &str) -> String {
    content.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// A stored narration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheEntry {
    pub key: CacheKey,
    pub narration: String,
    pub language: String,
    pub model_version: String,
    /// Unit that produced the entry. Informational only; not part of the key.
    pub unit_number: u32,
    #[serde(default)]
    pub meta: NarrationMeta,
    pub created_at: DateTime<Utc>,
}

/// Cache statistics.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CacheStats {
    pub entries: u64,
    pub oldest_entry: Option<DateTime<Utc>>,
    pub newest_entry: Option<DateTime<Utc>>,
}
