//! Durable render-result cache over SQLite.
//!
//! Entries are keyed by `(url, query)` so the same page chunked against
//! different queries caches independently. Expiry is lazy (checked on read)
//! with LRU eviction once the table grows past its bound. Safe for a single
//! process; cross-process concurrency is not guaranteed.

use crate::error::{RenderError, Result};
use crate::types::RenderResult;
use rusqlite::{params, Connection, OptionalExtension};
use serde_json::Value;
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::time::{SystemTime, UNIX_EPOCH};
use tracing::{debug, warn};

/// Default entry lifetime.
pub const DEFAULT_TTL_MS: u64 = 600_000;
/// Default row bound before eviction.
pub const DEFAULT_MAX_ENTRIES: usize = 500;

const SANITIZE_DEPTH: usize = 10;

/// Cache configuration.
#[derive(Debug, Clone)]
pub struct CacheConfig {
    pub ttl_ms: u64,
    pub max_entries: usize,
    pub db_path: PathBuf,
    pub verbose: bool,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            ttl_ms: DEFAULT_TTL_MS,
            max_entries: DEFAULT_MAX_ENTRIES,
            db_path: dirs::home_dir()
                .unwrap_or_else(|| PathBuf::from("/tmp"))
                .join(".agentweb")
                .join("cache.db"),
            verbose: false,
        }
    }
}

/// One row in the hit leaderboard.
#[derive(Debug, Clone, serde::Serialize)]
pub struct TopEntry {
    pub url: String,
    pub query: String,
    pub hit_count: u64,
}

/// Aggregate cache statistics.
#[derive(Debug, Clone, serde::Serialize)]
pub struct CacheStats {
    pub entries: usize,
    pub expired: usize,
    pub active: usize,
    /// Entry count per producing backend.
    pub backends: BTreeMap<String, usize>,
    /// Age of the oldest entry in milliseconds, if any.
    pub oldest_ms: Option<u64>,
    /// Five most-read entries.
    pub top_hits: Vec<TopEntry>,
}

/// SQLite-backed store of serialized `RenderResult`s.
pub struct RenderCache {
    db: Option<Connection>,
    config: CacheConfig,
}

impl RenderCache {
    /// Open or create the cache at the configured path, creating parent
    /// directories as needed.
    pub fn open(config: CacheConfig) -> Result<Self> {
        if let Some(parent) = config.db_path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| RenderError::CacheIo(format!("creating {}: {e}", parent.display())))?;
        }

        let db = Connection::open(&config.db_path)?;
        db.execute_batch(
            "CREATE TABLE IF NOT EXISTS page_cache (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                url TEXT NOT NULL,
                query TEXT NOT NULL DEFAULT '',
                backend TEXT NOT NULL,
                result_json TEXT NOT NULL,
                created_at INTEGER NOT NULL,
                expires_at INTEGER NOT NULL,
                hit_count INTEGER NOT NULL DEFAULT 0,
                last_hit INTEGER NOT NULL DEFAULT 0,
                UNIQUE(url, query)
            );
            CREATE INDEX IF NOT EXISTS idx_page_cache_expires ON page_cache(expires_at);
            CREATE INDEX IF NOT EXISTS idx_page_cache_last_hit ON page_cache(last_hit);",
        )?;

        Ok(Self {
            db: Some(db),
            config,
        })
    }

    fn conn(&self) -> Result<&Connection> {
        self.db
            .as_ref()
            .ok_or_else(|| RenderError::CacheIo("cache closed".to_string()))
    }

    /// Look up an entry. Expired rows are deleted and reported as a miss;
    /// hits bump `hit_count` and `last_hit`.
    pub fn get(&self, url: &str, query: &str) -> Result<Option<RenderResult>> {
        let conn = self.conn()?;
        let row = conn
            .query_row(
                "SELECT result_json, expires_at FROM page_cache WHERE url = ?1 AND query = ?2",
                params![url, query],
                |r| Ok((r.get::<_, String>(0)?, r.get::<_, i64>(1)?)),
            )
            .optional()?;

        let Some((json, expires_at)) = row else {
            return Ok(None);
        };

        let now = now_ms();
        if (expires_at as u64) < now {
            conn.execute(
                "DELETE FROM page_cache WHERE url = ?1 AND query = ?2",
                params![url, query],
            )?;
            if self.config.verbose {
                debug!("cache entry for {url} expired");
            }
            return Ok(None);
        }

        conn.execute(
            "UPDATE page_cache SET hit_count = hit_count + 1, last_hit = ?3
             WHERE url = ?1 AND query = ?2",
            params![url, query, now as i64],
        )?;

        match serde_json::from_str(&json) {
            Ok(result) => Ok(Some(result)),
            Err(e) => {
                // Treated as a miss; the row stays until the next set
                // overwrites it.
                warn!("cache entry for {url} unreadable: {e}");
                Ok(None)
            }
        }
    }

    /// Upsert an entry, resetting its hit statistics, then evict if the
    /// table has grown past `max_entries`.
    pub fn set(
        &self,
        url: &str,
        query: &str,
        result: &RenderResult,
        ttl_ms: Option<u64>,
    ) -> Result<()> {
        let ttl = ttl_ms.unwrap_or(self.config.ttl_ms);
        let value = serde_json::to_value(result)
            .map_err(|e| RenderError::CacheIo(format!("serializing result: {e}")))?;
        let json = sanitize(value, 0).unwrap_or(Value::Null).to_string();
        let now = now_ms();

        let conn = self.conn()?;
        conn.execute(
            "INSERT INTO page_cache
                (url, query, backend, result_json, created_at, expires_at, hit_count, last_hit)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, 0, ?5)
             ON CONFLICT(url, query) DO UPDATE SET
                backend = excluded.backend,
                result_json = excluded.result_json,
                created_at = excluded.created_at,
                expires_at = excluded.expires_at,
                hit_count = 0,
                last_hit = excluded.last_hit",
            params![
                url,
                query,
                result.backend.as_str(),
                json,
                now as i64,
                (now + ttl) as i64
            ],
        )?;

        if self.config.verbose {
            debug!("cached {url} (query {query:?}, ttl {ttl}ms)");
        }
        self.evict()
    }

    /// Delete every entry for a URL across all queries. Returns the count.
    pub fn invalidate(&self, url: &str) -> Result<usize> {
        let removed = self
            .conn()?
            .execute("DELETE FROM page_cache WHERE url = ?1", params![url])?;
        Ok(removed)
    }

    /// Delete every expired entry. Returns the count.
    pub fn purge_expired(&self) -> Result<usize> {
        let removed = self.conn()?.execute(
            "DELETE FROM page_cache WHERE expires_at < ?1",
            params![now_ms() as i64],
        )?;
        Ok(removed)
    }

    /// Aggregate statistics over the whole table.
    pub fn stats(&self) -> Result<CacheStats> {
        let conn = self.conn()?;
        let now = now_ms();

        let entries: usize =
            conn.query_row("SELECT COUNT(*) FROM page_cache", [], |r| r.get(0))?;
        let expired: usize = conn.query_row(
            "SELECT COUNT(*) FROM page_cache WHERE expires_at < ?1",
            params![now as i64],
            |r| r.get(0),
        )?;

        let mut backends = BTreeMap::new();
        let mut stmt =
            conn.prepare("SELECT backend, COUNT(*) FROM page_cache GROUP BY backend")?;
        let rows = stmt.query_map([], |r| Ok((r.get::<_, String>(0)?, r.get::<_, usize>(1)?)))?;
        for row in rows {
            let (backend, count) = row?;
            backends.insert(backend, count);
        }

        let oldest_ms = conn
            .query_row("SELECT MIN(created_at) FROM page_cache", [], |r| {
                r.get::<_, Option<i64>>(0)
            })?
            .map(|created| now.saturating_sub(created as u64));

        let mut stmt = conn.prepare(
            "SELECT url, query, hit_count FROM page_cache ORDER BY hit_count DESC LIMIT 5",
        )?;
        let top_hits = stmt
            .query_map([], |r| {
                Ok(TopEntry {
                    url: r.get(0)?,
                    query: r.get(1)?,
                    hit_count: r.get::<_, i64>(2)? as u64,
                })
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(CacheStats {
            entries,
            expired,
            active: entries.saturating_sub(expired),
            backends,
            oldest_ms,
            top_hits,
        })
    }

    /// Release the connection. Subsequent operations fail with `CacheIo`;
    /// calling close again is a no-op.
    pub fn close(&mut self) {
        if let Some(db) = self.db.take() {
            let _ = db.close();
        }
    }

    /// Delete rows past `max_entries`: expired rows first, then coldest by
    /// `last_hit`.
    fn evict(&self) -> Result<()> {
        let conn = self.conn()?;
        let count: usize = conn.query_row("SELECT COUNT(*) FROM page_cache", [], |r| r.get(0))?;
        if count <= self.config.max_entries {
            return Ok(());
        }

        let excess = count - self.config.max_entries;
        conn.execute(
            "DELETE FROM page_cache WHERE id IN (
                SELECT id FROM page_cache
                ORDER BY (expires_at < ?1) DESC, last_hit ASC
                LIMIT ?2
            )",
            params![now_ms() as i64, excess as i64],
        )?;
        debug!("evicted {excess} cache entries");
        Ok(())
    }
}

impl Drop for RenderCache {
    fn drop(&mut self) {
        self.close();
    }
}

/// Milliseconds since the Unix epoch.
pub fn now_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as u64
}

/// Depth-capped copy of a JSON value; anything nested deeper than the cap
/// is dropped.
fn sanitize(value: Value, depth: usize) -> Option<Value> {
    if depth > SANITIZE_DEPTH {
        return None;
    }
    Some(match value {
        Value::Object(map) => Value::Object(
            map.into_iter()
                .filter_map(|(k, v)| sanitize(v, depth + 1).map(|v| (k, v)))
                .collect(),
        ),
        Value::Array(items) => Value::Array(
            items
                .into_iter()
                .filter_map(|v| sanitize(v, depth + 1))
                .collect(),
        ),
        other => other,
    })
}
