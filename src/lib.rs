//! # Snow Chart
//!
//! Storage-usage dashboard for Snowflake:
//! - Lazily opened, process-wide warehouse connection (SQL API v2)
//! - Query results cached by exact query text for a fixed TTL
//!   (in-memory or SQLite)
//! - Raw table view plus a stacked bar chart (Vega-Lite) per day and database
//! - Multiple interfaces: Rust library, HTTP server, CLI
//!
//! ## Example Usage
//!
//! ```rust,no_run
//! use snow_chart::{Dashboard, Settings};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let settings = Settings::load("secrets.toml")?;
//!     let dashboard = Dashboard::from_settings(&settings).await?;
//!
//!     let view = dashboard.handle("14").await?;
//!     for line in &view.trace {
//!         println!("{}", line);
//!     }
//!     if let Some(table) = &view.table {
//!         println!("{}", table.to_text());
//!     }
//!     Ok(())
//! }
//! ```

pub mod cache;
pub mod config;
pub mod core;
pub mod dashboard;
pub mod error;
pub mod executor;
pub mod presenter;
pub mod warehouse;

// Re-export primary types
pub use cache::{CacheStats, Clock, MemoryCache, QueryCache, SqliteCache, SystemClock};
pub use config::Settings;
pub use crate::core::{Column, ColumnKind, DayRange, QueryOutcome, QueryResult, Value};
pub use dashboard::{Dashboard, DashboardView};
pub use error::{Result, SnowChartError};
pub use executor::CachedQueryExecutor;
pub use presenter::{render_page, usage_sql, ChartPoint, ChartSeries, ChartSpec, TableView};
pub use warehouse::{ConnectionHandle, ConnectionProvider, Connector, WarehouseConnection};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version() {
        assert!(!VERSION.is_empty());
    }
}
