//! In-memory narration cache.

use std::collections::HashMap;
use std::sync::{PoisonError, RwLock};

use super::{CacheEntry, CacheError, CacheKey, CacheStats, NarrationCache};

/// Process-local cache, lost on restart.
#[derive(Debug, Default)]
pub struct InMemoryNarrationCache {
    entries: RwLock<HashMap<CacheKey, CacheEntry>>,
}

impl InMemoryNarrationCache {
    pub fn new() -> Self {
        Self::default()
    }
}

impl NarrationCache for InMemoryNarrationCache {
    fn get(&self, key: &CacheKey) -> Result<Option<CacheEntry>, CacheError> {
        let entries = self.entries.read().unwrap_or_else(PoisonError::into_inner);
        Ok(entries.get(key).cloned())
    }

    fn put(&self, entry: &CacheEntry) -> Result<(), CacheError> {
        let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);
        entries.insert(entry.key.clone(), entry.clone());
        Ok(())
    }

    fn clear(&self) -> Result<u64, CacheError> {
        let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);
        let removed = entries.len() as u64;
        entries.clear();
        Ok(removed)
    }

    fn stats(&self) -> Result<CacheStats, CacheError> {
        let entries = self.entries.read().unwrap_or_else(PoisonError::into_inner);
        Ok(CacheStats {
            entries: entries.len() as u64,
            oldest_entry: entries.values().map(|e| e.created_at).min(),
            newest_entry: entries.values().map(|e| e.created_at).max(),
        })
    }
}
