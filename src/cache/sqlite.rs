use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use crate::cache::{CacheEntry, CacheStats, QueryCache};
use crate::core::QueryResult;
use crate::error::{Result, SnowChartError};

/// SQLite-backed query cache.
///
/// Same contract as [`MemoryCache`](crate::cache::MemoryCache); pointing it at a
/// file lets results survive a restart within their TTL.
///
/// ```sql
/// CREATE TABLE query_cache (
///     query TEXT PRIMARY KEY,
///     result_data TEXT NOT NULL,
///     hit_count INTEGER NOT NULL DEFAULT 0,
///     produced_at TEXT NOT NULL
/// );
/// ```
pub struct SqliteCache {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteCache {
    /// Open (or create) the cache database; `":memory:"` keeps it in-process
    pub async fn new(db_path: &str) -> Result<Self> {
        let conn = Connection::open(db_path)?;

        conn.execute(
            "CREATE TABLE IF NOT EXISTS query_cache (
                query TEXT PRIMARY KEY,
                result_data TEXT NOT NULL,
                hit_count INTEGER NOT NULL DEFAULT 0,
                produced_at TEXT NOT NULL
            )",
            [],
        )?;

        conn.execute(
            "CREATE INDEX IF NOT EXISTS idx_produced_at ON query_cache(produced_at)",
            [],
        )?;

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| SnowChartError::Cache(format!("cache lock poisoned: {}", e)))
    }
}

// Fixed-width UTC so TEXT comparison matches time order
fn format_timestamp(ts: DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn parse_timestamp(raw: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| SnowChartError::Cache(format!("bad timestamp '{}': {}", raw, e)))
}

#[async_trait]
impl QueryCache for SqliteCache {
    async fn get(&self, query: &str) -> Result<Option<CacheEntry>> {
        let conn = self.lock()?;

        let row = conn
            .query_row(
                "SELECT result_data, hit_count, produced_at FROM query_cache WHERE query = ?",
                params![query],
                |row| {
                    Ok((
                        row.get::<_, String>(0)?,
                        row.get::<_, i64>(1)?,
                        row.get::<_, String>(2)?,
                    ))
                },
            )
            .optional()?;

        let Some((result_json, hit_count, produced_at)) = row else {
            return Ok(None);
        };

        Ok(Some(CacheEntry {
            query: query.to_string(),
            result: Arc::new(QueryResult::from_json(&result_json)?),
            produced_at: parse_timestamp(&produced_at)?,
            hit_count: hit_count.max(0) as u64,
        }))
    }

    async fn put(&self, query: &str, result: Arc<QueryResult>, produced_at: DateTime<Utc>) -> Result<()> {
        let result_json = result.to_json()?;
        let conn = self.lock()?;

        conn.execute(
            "INSERT OR REPLACE INTO query_cache (query, result_data, hit_count, produced_at)
             VALUES (?1, ?2, 0, ?3)",
            params![query, result_json, format_timestamp(produced_at)],
        )?;

        Ok(())
    }

    async fn record_hit(&self, query: &str) -> Result<()> {
        let conn = self.lock()?;

        conn.execute(
            "UPDATE query_cache SET hit_count = hit_count + 1 WHERE query = ?",
            params![query],
        )?;

        Ok(())
    }

    async fn stats(&self) -> Result<CacheStats> {
        let conn = self.lock()?;

        let (total_entries, total_hits, oldest, newest) = conn.query_row(
            "SELECT COUNT(*), COALESCE(SUM(hit_count), 0), MIN(produced_at), MAX(produced_at)
             FROM query_cache",
            [],
            |row| {
                Ok((
                    row.get::<_, i64>(0)?,
                    row.get::<_, i64>(1)?,
                    row.get::<_, Option<String>>(2)?,
                    row.get::<_, Option<String>>(3)?,
                ))
            },
        )?;

        let total_entries = total_entries.max(0) as u64;
        let total_hits = total_hits.max(0) as u64;
        let avg_hit_count = if total_entries > 0 {
            total_hits as f64 / total_entries as f64
        } else {
            0.0
        };

        Ok(CacheStats {
            total_entries,
            total_hits,
            avg_hit_count,
            oldest_entry: oldest.as_deref().map(parse_timestamp).transpose()?,
            newest_entry: newest.as_deref().map(parse_timestamp).transpose()?,
        })
    }

    async fn purge_expired(&self, ttl: Duration, now: DateTime<Utc>) -> Result<u64> {
        let ttl = chrono::Duration::from_std(ttl)
            .map_err(|e| SnowChartError::Cache(format!("ttl out of range: {}", e)))?;
        let cutoff = now - ttl;
        let conn = self.lock()?;

        let deleted = conn.execute(
            "DELETE FROM query_cache WHERE produced_at <= ?",
            params![format_timestamp(cutoff)],
        )?;

        Ok(deleted as u64)
    }

    async fn clear(&self) -> Result<u64> {
        let conn = self.lock()?;
        let deleted = conn.execute("DELETE FROM query_cache", [])?;
        Ok(deleted as u64)
    }
}
