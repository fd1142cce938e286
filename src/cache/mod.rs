pub mod memory;
pub mod sqlite;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use std::time::Duration;

use crate::core::QueryResult;
use crate::error::Result;

pub use memory::MemoryCache;
pub use sqlite::SqliteCache;

/// Default time-to-live of a cached result (10 minutes)
pub const DEFAULT_TTL: Duration = Duration::from_secs(600);

/// Trait for query result cache implementations.
///
/// Keys are the exact query text: no trimming, no case folding.
#[async_trait]
pub trait QueryCache: Send + Sync {
    /// Get the entry stored for this query text, fresh or not
    async fn get(&self, query: &str) -> Result<Option<CacheEntry>>;

    /// Store a result, replacing any previous entry for the same query text
    async fn put(&self, query: &str, result: Arc<QueryResult>, produced_at: DateTime<Utc>) -> Result<()>;

    /// Increment the hit counter of an entry
    async fn record_hit(&self, query: &str) -> Result<()>;

    /// Get cache statistics
    async fn stats(&self) -> Result<CacheStats>;

    /// Drop entries that are no longer fresh at `now`
    async fn purge_expired(&self, ttl: Duration, now: DateTime<Utc>) -> Result<u64>;

    /// Drop every entry
    async fn clear(&self) -> Result<u64>;
}

/// Cached result with metadata
#[derive(Debug, Clone)]
pub struct CacheEntry {
    pub query: String,
    pub result: Arc<QueryResult>,
    pub produced_at: DateTime<Utc>,
    pub hit_count: u64,
}

impl CacheEntry {
    /// An entry is served only while `now - produced_at < ttl`
    pub fn is_fresh(&self, ttl: Duration, now: DateTime<Utc>) -> bool {
        is_fresh(self.produced_at, ttl, now)
    }
}

pub(crate) fn is_fresh(produced_at: DateTime<Utc>, ttl: Duration, now: DateTime<Utc>) -> bool {
    match chrono::Duration::from_std(ttl) {
        Ok(ttl) => now.signed_duration_since(produced_at) < ttl,
        // Out of chrono's range: effectively never expires
        Err(_) => true,
    }
}

/// Cache statistics
#[derive(Debug, Clone, Default)]
pub struct CacheStats {
    pub total_entries: u64,
    pub total_hits: u64,
    pub avg_hit_count: f64,
    pub oldest_entry: Option<DateTime<Utc>>,
    pub newest_entry: Option<DateTime<Utc>>,
}

/// Source of "now" for TTL checks
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// Wall clock
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry_at(produced_at: DateTime<Utc>) -> CacheEntry {
        CacheEntry {
            query: "select 1".to_string(),
            result: Arc::new(QueryResult::default()),
            produced_at,
            hit_count: 0,
        }
    }

    #[test]
    fn test_freshness_window_is_half_open() {
        let produced = Utc::now();
        let entry = entry_at(produced);

        assert!(entry.is_fresh(DEFAULT_TTL, produced));
        assert!(entry.is_fresh(DEFAULT_TTL, produced + chrono::Duration::seconds(599)));
        assert!(!entry.is_fresh(DEFAULT_TTL, produced + chrono::Duration::seconds(600)));
        assert!(!entry.is_fresh(DEFAULT_TTL, produced + chrono::Duration::hours(1)));
    }

    #[test]
    fn test_zero_ttl_is_never_fresh() {
        let produced = Utc::now();
        assert!(!entry_at(produced).is_fresh(Duration::ZERO, produced));
    }
}
