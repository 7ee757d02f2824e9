//! Narration cache whose storage is always unavailable.

use std::sync::atomic::{AtomicUsize, Ordering};

use crate::cache::{CacheEntry, CacheError, CacheKey, CacheStats, NarrationCache};

/// [`NarrationCache`] that fails every operation, for exercising the
/// degrade-to-miss paths.
#[derive(Debug, Default)]
pub struct FailingNarrationCache {
    gets: AtomicUsize,
    puts: AtomicUsize,
}

impl FailingNarrationCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get_calls(&self) -> usize {
        self.gets.load(Ordering::SeqCst)
    }

    pub fn put_calls(&self) -> usize {
        self.puts.load(Ordering::SeqCst)
    }

    fn unavailable() -> CacheError {
        CacheError::Database("database is locked".to_string())
    }
}

impl NarrationCache for FailingNarrationCache {
    fn get(&self, _key: &CacheKey) -> Result<Option<CacheEntry>, CacheError> {
        self.gets.fetch_add(1, Ordering::SeqCst);
        Err(Self::unavailable())
    }

    fn put(&self, _entry: &CacheEntry) -> Result<(), CacheError> {
        self.puts.fetch_add(1, Ordering::SeqCst);
        Err(Self::unavailable())
    }

    fn clear(&self) -> Result<u64, CacheError> {
        Err(Self::unavailable())
    }

    fn stats(&self) -> Result<CacheStats, CacheError> {
        Err(Self::unavailable())
    }
}
