use serde::Serialize;
use std::sync::Arc;
use std::time::Instant;

use crate::cache::{CacheStats, MemoryCache, QueryCache, SqliteCache};
use crate::config::Settings;
use crate::core::{DayRange, QueryOutcome};
use crate::error::Result;
use crate::executor::CachedQueryExecutor;
use crate::presenter::{usage_sql, ChartSeries, ChartSpec, TableView};
use crate::warehouse::{ConnectionProvider, Connector, SnowflakeConnector};

/// Info message shown until a day range is picked
pub const SELECT_PROMPT: &str = "Please select a timeframe.";

/// Everything one render of the page shows
#[derive(Debug, Clone, Serialize)]
pub struct DashboardView {
    /// Raw selector value
    pub selection: String,

    /// Parsed day range, if one was picked
    pub days: Option<u32>,

    /// Info prompt (only when nothing is selected)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prompt: Option<String>,

    /// Pipeline stage messages, in order
    pub trace: Vec<String>,

    /// User-facing query error
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,

    pub from_cache: bool,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub table: Option<TableView>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub series: Option<ChartSeries>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub chart: Option<ChartSpec>,

    /// Handler latency in milliseconds
    pub latency_ms: f64,
}

impl DashboardView {
    /// Prompt-only view for an empty selection
    pub fn prompt_only() -> Self {
        Self {
            selection: String::new(),
            days: None,
            prompt: Some(SELECT_PROMPT.to_string()),
            trace: Vec::new(),
            error: None,
            from_cache: false,
            table: None,
            series: None,
            chart: None,
            latency_ms: 0.0,
        }
    }

    /// View for a request that failed before any query ran
    pub fn failed(selection: &str, message: impl Into<String>) -> Self {
        Self {
            selection: selection.to_string(),
            prompt: None,
            error: Some(message.into()),
            ..Self::prompt_only()
        }
    }

    fn started(range: DayRange) -> Self {
        Self {
            selection: range.to_string(),
            days: Some(range.days()),
            prompt: None,
            trace: vec![format!("Showing data for {} days", range.days())],
            ..Self::prompt_only()
        }
    }

    /// Table and chart are only built from a successful outcome
    pub fn render(&mut self, outcome: &QueryOutcome) {
        match outcome {
            QueryOutcome::Success { result, from_cache } => {
                let series = ChartSeries::from_result(result);
                self.from_cache = *from_cache;
                self.table = Some(TableView::from_result(result));
                self.chart = Some(ChartSpec::stacked_bar(&series));
                self.series = Some(series);
            }
            QueryOutcome::Failure { reason } => {
                self.error = Some(reason.clone());
                self.table = None;
                self.series = None;
                self.chart = None;
            }
        }
    }
}

/// Per-action request handler; cache and connection outlive every call
pub struct Dashboard {
    executor: CachedQueryExecutor,
}

impl Dashboard {
    pub fn new(executor: CachedQueryExecutor) -> Self {
        Self { executor }
    }

    /// Wire Snowflake and the configured cache backend
    pub async fn from_settings(settings: &Settings) -> Result<Self> {
        let connector: Arc<dyn Connector> =
            Arc::new(SnowflakeConnector::new(settings.snowflake.clone()));

        let cache: Arc<dyn QueryCache> = match settings.cache.path.as_deref() {
            Some(path) => {
                tracing::info!("Using SQLite query cache at {}", path);
                Arc::new(SqliteCache::new(path).await?)
            }
            None => Arc::new(MemoryCache::new()),
        };

        let executor = CachedQueryExecutor::new(Arc::new(ConnectionProvider::new(connector)), cache)
            .with_ttl(settings.cache.ttl());

        Ok(Self::new(executor))
    }

    pub fn executor(&self) -> &CachedQueryExecutor {
        &self.executor
    }

    /// SQL that a selection would run; `None` for the empty selection
    pub fn sql_for(selection: &str) -> Result<Option<String>> {
        Ok(DayRange::from_selection(selection)?.map(usage_sql))
    }

    /// Handle one selector change.
    ///
    /// An empty selection returns the prompt without any network access.
    /// Invalid selections and connection failures are errors; query failures
    /// end up in `DashboardView::error`.
    pub async fn handle(&self, selection: &str) -> Result<DashboardView> {
        let start = Instant::now();

        let Some(range) = DayRange::from_selection(selection)? else {
            return Ok(DashboardView::prompt_only());
        };

        let mut view = DashboardView::started(range);
        let connections = self.executor.connections();
        let warehouse = connections.warehouse_name().to_string();

        view.trace.push(format!("Connecting to {}...", warehouse));
        connections.get_connection().await?;
        view.trace.push(format!("Connected to {}.", warehouse));

        let sql = usage_sql(range);
        view.trace.push("Executing query...".to_string());
        let outcome = self.executor.execute(&sql).await?;
        view.trace.push("Query Complete...".to_string());

        view.render(&outcome);
        if outcome.is_success() {
            view.trace.push("Complete...".to_string());
        }

        view.latency_ms = start.elapsed().as_secs_f64() * 1000.0;
        tracing::info!(
            "{} days → {} ({:.2}ms)",
            range.days(),
            outcome.display(),
            view.latency_ms
        );

        Ok(view)
    }

    /// Get cache statistics
    pub async fn cache_stats(&self) -> Result<CacheStats> {
        self.executor.cache().stats().await
    }

    /// Drop entries older than the configured TTL
    pub async fn purge_expired(&self) -> Result<u64> {
        self.executor
            .cache()
            .purge_expired(self.executor.ttl(), self.executor.now())
            .await
    }

    /// Drop every cached result
    pub async fn clear_cache(&self) -> Result<u64> {
        self.executor.cache().clear().await
    }
}
