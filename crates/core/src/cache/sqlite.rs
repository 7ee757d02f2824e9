//! SQLite-backed narration cache.

use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};

use super::{CacheEntry, CacheError, CacheKey, CacheStats, NarrationCache};
use crate::quality::NarrationMeta;

/// SQLite-backed narration cache. One row per key.
pub struct SqliteNarrationCache {
    conn: Mutex<Connection>,
}

impl SqliteNarrationCache {
    /// Open (or create) the cache database at `path`.
    pub fn new(path: &Path) -> Result<Self, CacheError> {
        let conn = Connection::open(path).map_err(|e| CacheError::Database(e.to_string()))?;
        Self::initialize_schema(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Create an in-memory SQLite cache (useful for testing).
    pub fn in_memory() -> Result<Self, CacheError> {
        let conn =
            Connection::open_in_memory().map_err(|e| CacheError::Database(e.to_string()))?;
        Self::initialize_schema(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn initialize_schema(conn: &Connection) -> Result<(), CacheError> {
        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS narration_cache (
                cache_key TEXT PRIMARY KEY,
                narration TEXT NOT NULL,
                language TEXT NOT NULL,
                model_version TEXT NOT NULL,
                unit_number INTEGER NOT NULL,
                meta_json TEXT,
                created_at TEXT NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_narration_cache_created ON narration_cache(created_at);
            "#,
        )
        .map_err(|e| CacheError::Database(e.to_string()))?;

        Ok(())
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>, CacheError> {
        self.conn
            .lock()
            .map_err(|_| CacheError::Database("connection mutex poisoned".to_string()))
    }
}

fn parse_timestamp(key: &str, raw: &str) -> Result<DateTime<Utc>, CacheError> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| CacheError::Corrupt {
            key: key.to_string(),
            reason: e.to_string(),
        })
}

/// A missing column value reads as empty metadata.
fn parse_meta(key: &str, raw: Option<String>) -> Result<NarrationMeta, CacheError> {
    match raw {
        Some(json) => serde_json::from_str(&json).map_err(|e| CacheError::Corrupt {
            key: key.to_string(),
            reason: format!("meta: {e}"),
        }),
        None => Ok(NarrationMeta::default()),
    }
}

impl NarrationCache for SqliteNarrationCache {
    fn get(&self, key: &CacheKey) -> Result<Option<CacheEntry>, CacheError> {
        let conn = self.lock()?;
        let row = conn
            .query_row(
                "SELECT narration, language, model_version, unit_number, meta_json, created_at
                 FROM narration_cache WHERE cache_key = ?",
                params![key.as_str()],
                |row| {
                    Ok((
                        row.get::<_, String>(0)?,
                        row.get::<_, String>(1)?,
                        row.get::<_, String>(2)?,
                        row.get::<_, u32>(3)?,
                        row.get::<_, Option<String>>(4)?,
                        row.get::<_, String>(5)?,
                    ))
                },
            )
            .optional()
            .map_err(|e| CacheError::Database(e.to_string()))?;

        let Some((narration, language, model_version, unit_number, meta_json, created_at)) = row
        else {
            return Ok(None);
        };

        Ok(Some(CacheEntry {
            key: key.clone(),
            narration,
            language,
            model_version,
            unit_number,
            meta: parse_meta(key.as_str(), meta_json)?,
            created_at: parse_timestamp(key.as_str(), &created_at)?,
        }))
    }

    fn put(&self, entry: &CacheEntry) -> Result<(), CacheError> {
        let meta_json =
            serde_json::to_string(&entry.meta).map_err(|e| CacheError::Database(e.to_string()))?;
        let conn = self.lock()?;
        conn.execute(
            "INSERT OR REPLACE INTO narration_cache
             (cache_key, narration, language, model_version, unit_number, meta_json, created_at)
             VALUES (?, ?, ?, ?, ?, ?, ?)",
            params![
                entry.key.as_str(),
                entry.narration,
                entry.language,
                entry.model_version,
                entry.unit_number,
                meta_json,
                entry.created_at.to_rfc3339(),
            ],
        )
        .map_err(|e| CacheError::Database(e.to_string()))?;
        Ok(())
    }

    fn clear(&self) -> Result<u64, CacheError> {
        let conn = self.lock()?;
        let removed = conn
            .execute("DELETE FROM narration_cache", [])
            .map_err(|e| CacheError::Database(e.to_string()))?;
        Ok(removed as u64)
    }

    fn stats(&self) -> Result<CacheStats, CacheError> {
        let conn = self.lock()?;
        let (entries, oldest, newest): (u64, Option<String>, Option<String>) = conn
            .query_row(
                "SELECT COUNT(*), MIN(created_at), MAX(created_at) FROM narration_cache",
                [],
                |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)),
            )
            .map_err(|e| CacheError::Database(e.to_string()))?;

        Ok(CacheStats {
            entries,
            oldest_entry: oldest
                .map(|raw| parse_timestamp("stats", &raw))
                .transpose()?,
            newest_entry: newest
                .map(|raw| parse_timestamp("stats", &raw))
                .transpose()?,
        })
    }
}
