use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::cache::{Clock, QueryCache, SystemClock, DEFAULT_TTL};
use crate::core::QueryOutcome;
use crate::error::Result;
use crate::warehouse::ConnectionProvider;

/// Runs statements through a time-bounded result cache.
///
/// Connection failures propagate as `Err`. Failures while executing are
/// reported as [`QueryOutcome::Failure`] and never cached.
pub struct CachedQueryExecutor {
    connections: Arc<ConnectionProvider>,
    cache: Arc<dyn QueryCache>,
    clock: Arc<dyn Clock>,
    ttl: Duration,
}

impl CachedQueryExecutor {
    pub fn new(connections: Arc<ConnectionProvider>, cache: Arc<dyn QueryCache>) -> Self {
        Self {
            connections,
            cache,
            clock: Arc::new(SystemClock),
            ttl: DEFAULT_TTL,
        }
    }

    /// Replace the clock used for TTL checks
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Replace the default TTL
    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    pub fn connections(&self) -> &Arc<ConnectionProvider> {
        &self.connections
    }

    pub fn cache(&self) -> &Arc<dyn QueryCache> {
        &self.cache
    }

    pub fn now(&self) -> chrono::DateTime<chrono::Utc> {
        self.clock.now()
    }

    /// Execute with the configured TTL
    pub async fn execute(&self, query: &str) -> Result<QueryOutcome> {
        self.execute_cached(query, self.ttl).await
    }

    /// Serve `query` from the cache while its entry is younger than `ttl`,
    /// otherwise run it and store the fresh result.
    pub async fn execute_cached(&self, query: &str, ttl: Duration) -> Result<QueryOutcome> {
        let now = self.clock.now();

        match self.cache.get(query).await {
            Ok(Some(entry)) if entry.is_fresh(ttl, now) => {
                tracing::debug!("Cache hit ({} rows, produced {})", entry.result.len(), entry.produced_at);
                if let Err(e) = self.cache.record_hit(query).await {
                    tracing::warn!("Failed to record cache hit: {}", e);
                }
                return Ok(QueryOutcome::success(entry.result, true));
            }
            Ok(Some(_)) => tracing::debug!("Cache entry expired"),
            Ok(None) => tracing::debug!("Cache miss"),
            Err(e) => tracing::warn!("Cache lookup failed, executing: {}", e),
        }

        let connection = self.connections.get_connection().await?;

        let start = Instant::now();
        let result = match connection.execute(query).await {
            Ok(result) => Arc::new(result),
            Err(e) => {
                tracing::warn!("Query failed on {}: {}", connection.name(), e);
                return Ok(QueryOutcome::failure(e.to_string()));
            }
        };

        tracing::info!(
            "Query returned {} rows in {:.2}ms",
            result.len(),
            start.elapsed().as_secs_f64() * 1000.0
        );

        if let Err(e) = self.cache.put(query, Arc::clone(&result), self.clock.now()).await {
            tracing::warn!("Failed to save to cache: {}", e);
        }

        Ok(QueryOutcome::success(result, false))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::MemoryCache;
    use crate::core::QueryResult;
    use crate::error::SnowChartError;
    use crate::warehouse::{ConnectionHandle, Connector, WarehouseConnection};
    use async_trait::async_trait;
    use chrono::{DateTime, Utc};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    struct ManualClock(Mutex<DateTime<Utc>>);

    impl ManualClock {
        fn advance(&self, secs: i64) {
            let mut now = self.0.lock().unwrap();
            *now = *now + chrono::Duration::seconds(secs);
        }
    }

    impl Clock for ManualClock {
        fn now(&self) -> DateTime<Utc> {
            *self.0.lock().unwrap()
        }
    }

    #[derive(Default)]
    struct CountingWarehouse {
        executions: AtomicUsize,
        fail_with: Option<String>,
    }

    #[async_trait]
    impl WarehouseConnection for CountingWarehouse {
        async fn execute(&self, _sql: &str) -> crate::error::Result<QueryResult> {
            self.executions.fetch_add(1, Ordering::SeqCst);
            match &self.fail_with {
                Some(reason) => Err(SnowChartError::QueryExecution(reason.clone())),
                None => Ok(QueryResult::default()),
            }
        }

        fn name(&self) -> &str {
            "counting"
        }
    }

    struct Fixed(Arc<CountingWarehouse>);

    #[async_trait]
    impl Connector for Fixed {
        async fn connect(&self) -> crate::error::Result<ConnectionHandle> {
            Ok(self.0.clone())
        }

        fn name(&self) -> &str {
            "fixed"
        }
    }

    struct Unreachable;

    #[async_trait]
    impl Connector for Unreachable {
        async fn connect(&self) -> crate::error::Result<ConnectionHandle> {
            Err(SnowChartError::Connection("unreachable".to_string()))
        }

        fn name(&self) -> &str {
            "unreachable"
        }
    }

    fn setup(warehouse: Arc<CountingWarehouse>) -> (CachedQueryExecutor, Arc<ManualClock>) {
        let clock = Arc::new(ManualClock(Mutex::new(Utc::now())));
        let provider = Arc::new(ConnectionProvider::new(Arc::new(Fixed(warehouse))));
        let executor = CachedQueryExecutor::new(provider, Arc::new(MemoryCache::new()))
            .with_clock(clock.clone());
        (executor, clock)
    }

    #[tokio::test]
    async fn test_identical_queries_hit_cache_within_ttl() {
        let warehouse = Arc::new(CountingWarehouse::default());
        let (executor, clock) = setup(warehouse.clone());

        let first = executor.execute("select 1").await.unwrap();
        clock.advance(599);
        let second = executor.execute("select 1").await.unwrap();

        assert!(!first.from_cache());
        assert!(second.from_cache());
        assert_eq!(warehouse.executions.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_expired_entry_is_refetched() {
        let warehouse = Arc::new(CountingWarehouse::default());
        let (executor, clock) = setup(warehouse.clone());

        executor.execute("select 1").await.unwrap();
        clock.advance(600);
        let again = executor.execute("select 1").await.unwrap();

        assert!(!again.from_cache());
        assert_eq!(warehouse.executions.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_explicit_ttl_overrides_default() {
        let warehouse = Arc::new(CountingWarehouse::default());
        let (executor, clock) = setup(warehouse.clone());

        executor.execute_cached("select 1", Duration::from_secs(10)).await.unwrap();
        clock.advance(11);
        executor.execute_cached("select 1", Duration::from_secs(10)).await.unwrap();

        assert_eq!(warehouse.executions.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_whitespace_variants_are_distinct_keys() {
        let warehouse = Arc::new(CountingWarehouse::default());
        let (executor, _clock) = setup(warehouse.clone());

        executor.execute("select 1").await.unwrap();
        let spaced = executor.execute("select  1").await.unwrap();

        assert!(!spaced.from_cache());
        assert_eq!(warehouse.executions.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_execution_failure_becomes_outcome_and_is_not_cached() {
        let warehouse = Arc::new(CountingWarehouse {
            executions: AtomicUsize::new(0),
            fail_with: Some("SQL compilation error".to_string()),
        });
        let (executor, _clock) = setup(warehouse.clone());

        let outcome = executor.execute("selec 1").await.unwrap();
        match &outcome {
            QueryOutcome::Failure { reason } => assert!(reason.contains("SQL compilation error")),
            other => panic!("expected failure, got {:?}", other),
        }

        executor.execute("selec 1").await.unwrap();
        assert_eq!(warehouse.executions.load(Ordering::SeqCst), 2);
        assert!(executor.cache().get("selec 1").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_connection_error_propagates() {
        let provider = Arc::new(ConnectionProvider::new(Arc::new(Unreachable)));
        let executor = CachedQueryExecutor::new(provider, Arc::new(MemoryCache::new()));

        let err = executor.execute("select 1").await.unwrap_err();
        assert!(matches!(err, SnowChartError::Connection(_)));
    }

    #[tokio::test]
    async fn test_cache_hit_does_not_connect() {
        let provider = Arc::new(ConnectionProvider::new(Arc::new(Unreachable)));
        let cache = Arc::new(MemoryCache::new());
        cache
            .put("select 1", Arc::new(QueryResult::default()), Utc::now())
            .await
            .unwrap();
        let executor = CachedQueryExecutor::new(provider.clone(), cache);

        let outcome = executor.execute("select 1").await.unwrap();
        assert!(outcome.from_cache());
        assert!(!provider.is_connected());
    }
}
