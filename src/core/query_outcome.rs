use std::sync::Arc;

use crate::core::QueryResult;

/// Outcome of one cached execution.
///
/// A failed statement is a `Failure`, never an empty `Success`.
#[derive(Debug, Clone)]
pub enum QueryOutcome {
    /// Statement ran (now or within the TTL window)
    Success {
        result: Arc<QueryResult>,
        /// Whether the result came from the cache
        from_cache: bool,
    },
    /// Statement failed; the reason is user-facing
    Failure { reason: String },
}

impl QueryOutcome {
    pub fn success(result: Arc<QueryResult>, from_cache: bool) -> Self {
        QueryOutcome::Success { result, from_cache }
    }

    pub fn failure(reason: impl Into<String>) -> Self {
        QueryOutcome::Failure {
            reason: reason.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, QueryOutcome::Success { .. })
    }

    /// The result, if the statement succeeded
    pub fn result(&self) -> Option<&Arc<QueryResult>> {
        match self {
            QueryOutcome::Success { result, .. } => Some(result),
            QueryOutcome::Failure { .. } => None,
        }
    }

    pub fn from_cache(&self) -> bool {
        matches!(self, QueryOutcome::Success { from_cache: true, .. })
    }

    /// Get display string for logging
    pub fn display(&self) -> String {
        match self {
            QueryOutcome::Success { result, from_cache } => format!(
                "{} rows{}",
                result.len(),
                if *from_cache { " (cached)" } else { "" }
            ),
            QueryOutcome::Failure { reason } => format!("failed: {}", reason),
        }
    }
}
