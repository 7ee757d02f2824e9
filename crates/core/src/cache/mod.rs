//! Narration cache - content-addressed store of generated narration.
//!
//! Entries are keyed by a hash of the unit content, language, model version
//! and document mode, so re-running the same document skips the narration
//! collaborator entirely. Entries are immutable; only [`NarrationCache::clear`]
//! removes them.

mod flight;
mod memory;
mod sqlite;
mod types;

pub use flight::{KeyedGuard, KeyedLocks};
pub use memory::InMemoryNarrationCache;
pub use sqlite::SqliteNarrationCache;
pub use types::{CacheEntry, CacheKey, CacheStats};

use std::sync::Arc;

use thiserror::Error;

use crate::config::{CacheBackend, CacheConfig};

/// Errors from a cache backend. Callers log these and treat them as a miss.
#[derive(Debug, Error)]
pub enum CacheError {
    #[error("cache database error: {0}")]
    Database(String),

    #[error("corrupt cache entry {key}: {reason}")]
    Corrupt { key: String, reason: String },
}

/// Trait for narration cache storage.
///
/// Implementations must tolerate concurrent calls from many jobs. A `put`
/// replaces any existing entry for the key atomically.
pub trait NarrationCache: Send + Sync {
    /// Look up an entry. `Ok(None)` is a miss.
    fn get(&self, key: &CacheKey) -> Result<Option<CacheEntry>, CacheError>;

    /// Store an entry, replacing any previous value for its key.
    fn put(&self, entry: &CacheEntry) -> Result<(), CacheError>;

    /// Remove every entry. Returns how many were removed.
    fn clear(&self) -> Result<u64, CacheError>;

    fn stats(&self) -> Result<CacheStats, CacheError>;
}

/// Open the backend selected by configuration.
pub fn open_cache(config: &CacheConfig) -> Result<Arc<dyn NarrationCache>, CacheError> {
    match config.backend {
        CacheBackend::Sqlite => Ok(Arc::new(SqliteNarrationCache::new(&config.path)?)),
        CacheBackend::Memory => Ok(Arc::new(InMemoryNarrationCache::new())),
    }
}
