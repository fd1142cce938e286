use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;

use crate::cache::{is_fresh, CacheEntry, CacheStats, QueryCache};
use crate::core::QueryResult;
use crate::error::Result;

/// Process-wide in-memory cache; entries live as long as the process
#[derive(Default)]
pub struct MemoryCache {
    entries: RwLock<HashMap<String, CacheEntry>>,
}

impl MemoryCache {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl QueryCache for MemoryCache {
    async fn get(&self, query: &str) -> Result<Option<CacheEntry>> {
        Ok(self.entries.read().await.get(query).cloned())
    }

    async fn put(&self, query: &str, result: Arc<QueryResult>, produced_at: DateTime<Utc>) -> Result<()> {
        let entry = CacheEntry {
            query: query.to_string(),
            result,
            produced_at,
            hit_count: 0,
        };
        self.entries.write().await.insert(query.to_string(), entry);
        Ok(())
    }

    async fn record_hit(&self, query: &str) -> Result<()> {
        if let Some(entry) = self.entries.write().await.get_mut(query) {
            entry.hit_count += 1;
        }
        Ok(())
    }

    async fn stats(&self) -> Result<CacheStats> {
        let entries = self.entries.read().await;

        let total_entries = entries.len() as u64;
        let total_hits: u64 = entries.values().map(|e| e.hit_count).sum();
        let avg_hit_count = if total_entries > 0 {
            total_hits as f64 / total_entries as f64
        } else {
            0.0
        };

        Ok(CacheStats {
            total_entries,
            total_hits,
            avg_hit_count,
            oldest_entry: entries.values().map(|e| e.produced_at).min(),
            newest_entry: entries.values().map(|e| e.produced_at).max(),
        })
    }

    async fn purge_expired(&self, ttl: Duration, now: DateTime<Utc>) -> Result<u64> {
        let mut entries = self.entries.write().await;
        let before = entries.len();
        entries.retain(|_, e| is_fresh(e.produced_at, ttl, now));
        Ok((before - entries.len()) as u64)
    }

    async fn clear(&self) -> Result<u64> {
        let mut entries = self.entries.write().await;
        let removed = entries.len() as u64;
        entries.clear();
        Ok(removed)
    }
}
