use thiserror::Error;

/// Main error type for the dashboard pipeline
#[derive(Error, Debug)]
pub enum SnowChartError {
    /// Missing or invalid connection secrets
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Network or authentication failure while connecting
    #[error("Connection error: {0}")]
    Connection(String),

    /// Failure while executing a statement or fetching its result
    #[error("Query execution error: {0}")]
    QueryExecution(String),

    /// Day-range selector value outside the allowed set
    #[error("Invalid day range: '{0}' (expected one of 7, 14, 28, 90)")]
    InvalidDayRange(String),

    /// Cache errors
    #[error("Cache error: {0}")]
    Cache(String),

    /// Database errors
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// HTTP request errors
    #[error("HTTP request failed: {0}")]
    HttpRequest(#[from] reqwest::Error),

    /// JSON serialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Generic errors
    #[error("{0}")]
    Other(String),
}

impl From<String> for SnowChartError {
    fn from(s: String) -> Self {
        SnowChartError::Other(s)
    }
}

impl From<&str> for SnowChartError {
    fn from(s: &str) -> Self {
        SnowChartError::Other(s.to_string())
    }
}

/// Result type alias
pub type Result<T> = std::result::Result<T, SnowChartError>;
