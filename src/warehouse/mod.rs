pub mod snowflake;

use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::OnceCell;

use crate::core::QueryResult;
use crate::error::{Result, SnowChartError};

pub use snowflake::{SnowflakeConnector, SnowflakeSession};

/// An authenticated warehouse session
#[async_trait]
pub trait WarehouseConnection: Send + Sync {
    /// Run a statement and fetch its complete result set
    async fn execute(&self, sql: &str) -> Result<QueryResult>;

    /// Get warehouse name for logging
    fn name(&self) -> &str;
}

/// Shared handle to the process' warehouse session
pub type ConnectionHandle = Arc<dyn WarehouseConnection>;

/// Opens warehouse sessions from externally supplied credentials
#[async_trait]
pub trait Connector: Send + Sync {
    /// Authenticate and open a session
    async fn connect(&self) -> Result<ConnectionHandle>;

    fn name(&self) -> &str;
}

/// Lazily connects once and hands out the same handle afterwards.
///
/// A failed connect leaves the slot empty. A handle that later goes dead
/// stays cached; there is no reconnect.
pub struct ConnectionProvider {
    connector: Arc<dyn Connector>,
    handle: OnceCell<ConnectionHandle>,
}

impl ConnectionProvider {
    pub fn new(connector: Arc<dyn Connector>) -> Self {
        Self {
            connector,
            handle: OnceCell::new(),
        }
    }

    /// Get the session, connecting on first use
    pub async fn get_connection(&self) -> Result<ConnectionHandle> {
        let handle = self
            .handle
            .get_or_try_init(|| async {
                tracing::info!("Connecting to {}...", self.connector.name());
                let handle = self.connector.connect().await.map_err(|e| match e {
                    SnowChartError::Connection(_) | SnowChartError::Configuration(_) => e,
                    other => SnowChartError::Connection(other.to_string()),
                })?;
                tracing::info!("Connected to {}.", self.connector.name());
                Ok::<_, SnowChartError>(handle)
            })
            .await?;

        Ok(Arc::clone(handle))
    }

    pub fn is_connected(&self) -> bool {
        self.handle.initialized()
    }

    /// Name of the underlying warehouse, for user-facing messages
    pub fn warehouse_name(&self) -> &str {
        self.connector.name()
    }
}
