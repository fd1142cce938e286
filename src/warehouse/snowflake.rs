use async_trait::async_trait;
use chrono::NaiveDate;
use reqwest::{Client, Response, StatusCode};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::config::SnowflakeSettings;
use crate::core::{Column, ColumnKind, QueryResult, Value};
use crate::error::{Result, SnowChartError};
use crate::warehouse::{ConnectionHandle, Connector, WarehouseConnection};

/// Cheap statement used to verify credentials when connecting
const PROBE_SQL: &str = "select current_version()";

/// Delay between status polls of an asynchronously running statement
const POLL_INTERVAL: Duration = Duration::from_millis(500);

/// Response code for "statement still running"
const CODE_IN_PROGRESS: &str = "333334";

/// Opens sessions against the Snowflake SQL API (v2)
pub struct SnowflakeConnector {
    settings: SnowflakeSettings,
}

impl SnowflakeConnector {
    pub fn new(settings: SnowflakeSettings) -> Self {
        Self { settings }
    }
}

#[async_trait]
impl Connector for SnowflakeConnector {
    async fn connect(&self) -> Result<ConnectionHandle> {
        let session = SnowflakeSession::new(self.settings.clone())
            .map_err(|e| SnowChartError::Connection(e.to_string()))?;

        session
            .run(PROBE_SQL)
            .await
            .map_err(|e| SnowChartError::Connection(e.to_string()))?;

        Ok(Arc::new(session))
    }

    fn name(&self) -> &str {
        "Snowflake"
    }
}

/// Authenticated HTTP session against one account
pub struct SnowflakeSession {
    client: Client,
    base_url: String,
    settings: SnowflakeSettings,
}

#[derive(Debug, Serialize)]
struct StatementRequest<'a> {
    statement: &'a str,
    timeout: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    warehouse: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    database: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    schema: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    role: Option<&'a str>,
}

/// Body of a completed statement (`200 OK`)
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct ResultSet {
    #[serde(default)]
    statement_handle: String,
    result_set_meta_data: ResultSetMetaData,
    #[serde(default)]
    data: Vec<Vec<Option<String>>>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct ResultSetMetaData {
    #[serde(default)]
    row_type: Vec<RowType>,
    #[serde(default)]
    partition_info: Vec<PartitionInfo>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct RowType {
    name: String,
    #[serde(rename = "type")]
    kind: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct PartitionInfo {
    #[serde(default)]
    row_count: u64,
}

/// Body of an additional result partition
#[derive(Debug, Deserialize)]
struct Partition {
    #[serde(default)]
    data: Vec<Vec<Option<String>>>,
}

/// Body of `202 Accepted` and of error responses
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct StatementStatus {
    #[serde(default)]
    code: String,
    #[serde(default)]
    message: String,
    #[serde(default)]
    statement_handle: String,
    #[serde(default)]
    sql_state: Option<String>,
}

impl SnowflakeSession {
    pub fn new(settings: SnowflakeSettings) -> Result<Self> {
        let client = Client::builder()
            .timeout(settings.timeout())
            .user_agent(concat!("snow-chart/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            client,
            base_url: settings.base_url(),
            settings,
        })
    }

    /// Submit a statement, wait for it, and fetch every partition
    async fn run(&self, sql: &str) -> Result<QueryResult> {
        let url = format!("{}/api/v2/statements", self.base_url);
        let body = StatementRequest {
            statement: sql,
            timeout: self.settings.statement_timeout_secs,
            warehouse: self.settings.warehouse.as_deref(),
            database: self.settings.database.as_deref(),
            schema: self.settings.schema.as_deref(),
            role: self.settings.role.as_deref(),
        };

        let response = self
            .authorized(self.client.post(&url))
            .json(&body)
            .send()
            .await?;

        let result_set = self.await_completion(response).await?;
        self.collect(result_set).await
    }

    fn authorized(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        request
            .bearer_auth(&self.settings.token)
            .header(
                "X-Snowflake-Authorization-Token-Type",
                self.settings.token_type.as_header(),
            )
            .header(reqwest::header::ACCEPT, "application/json")
    }

    /// Follow a `202 Accepted` statement until it completes or fails
    async fn await_completion(&self, mut response: Response) -> Result<ResultSet> {
        let deadline = Instant::now() + Duration::from_secs(self.settings.statement_timeout_secs);

        loop {
            match response.status() {
                StatusCode::OK => return Ok(response.json::<ResultSet>().await?),
                StatusCode::ACCEPTED => {
                    let status: StatementStatus = response.json().await?;
                    tracing::debug!(
                        "Statement {} still running (code {})",
                        status.statement_handle,
                        if status.code.is_empty() { CODE_IN_PROGRESS } else { status.code.as_str() }
                    );
                    if Instant::now() >= deadline {
                        return Err(SnowChartError::QueryExecution(format!(
                            "statement {} did not finish within {}s",
                            status.statement_handle, self.settings.statement_timeout_secs
                        )));
                    }
                    tokio::time::sleep(POLL_INTERVAL).await;

                    let url = format!(
                        "{}/api/v2/statements/{}",
                        self.base_url, status.statement_handle
                    );
                    response = self.authorized(self.client.get(&url)).send().await?;
                }
                status => return Err(Self::failure(status, response).await),
            }
        }
    }

    async fn failure(status: StatusCode, response: Response) -> SnowChartError {
        let body = response.text().await.unwrap_or_default();
        let detail: StatementStatus = serde_json::from_str(&body).unwrap_or_default();

        let message = if detail.message.is_empty() {
            format!("HTTP {}: {}", status, body.trim())
        } else {
            match detail.sql_state {
                Some(state) => format!("{} ({}): {}", detail.code, state, detail.message),
                None => format!("{}: {}", detail.code, detail.message),
            }
        };

        match status {
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
                SnowChartError::Connection(message)
            }
            _ => SnowChartError::QueryExecution(message),
        }
    }

    /// Decode the first partition and fetch the remaining ones eagerly
    async fn collect(&self, result_set: ResultSet) -> Result<QueryResult> {
        let mut result = QueryResult::new(columns(&result_set.result_set_meta_data));
        decode_rows(&result_set.result_set_meta_data, result_set.data, &mut result)?;

        // Partitions after the first are served gzip-encoded
        for partition in 1..result_set.result_set_meta_data.partition_info.len() {
            let url = format!(
                "{}/api/v2/statements/{}",
                self.base_url, result_set.statement_handle
            );
            let response = self
                .authorized(self.client.get(&url))
                .query(&[("partition", partition)])
                .send()
                .await?;

            if !response.status().is_success() {
                return Err(Self::failure(response.status(), response).await);
            }

            let page: Partition = response.json().await?;
            decode_rows(&result_set.result_set_meta_data, page.data, &mut result)?;
        }

        let expected: u64 = result_set
            .result_set_meta_data
            .partition_info
            .iter()
            .map(|p| p.row_count)
            .sum();
        if expected > 0 && expected != result.len() as u64 {
            tracing::warn!("Expected {} rows, fetched {}", expected, result.len());
        }

        Ok(result)
    }
}

#[async_trait]
impl WarehouseConnection for SnowflakeSession {
    async fn execute(&self, sql: &str) -> Result<QueryResult> {
        self.run(sql).await.map_err(|e| match e {
            SnowChartError::QueryExecution(_) => e,
            other => SnowChartError::QueryExecution(other.to_string()),
        })
    }

    fn name(&self) -> &str {
        "Snowflake"
    }
}

fn column_kind(snowflake_type: &str) -> ColumnKind {
    match snowflake_type.to_ascii_lowercase().as_str() {
        "date" => ColumnKind::Date,
        "fixed" | "real" => ColumnKind::Float,
        _ => ColumnKind::Text,
    }
}

pub(crate) fn columns(meta: &ResultSetMetaData) -> Vec<Column> {
    meta.row_type
        .iter()
        .map(|c| Column::new(c.name.clone(), column_kind(&c.kind)))
        .collect()
}

/// Decode JSON cells: dates are day offsets from 1970-01-01, numbers are strings
pub(crate) fn decode_rows(
    meta: &ResultSetMetaData,
    data: Vec<Vec<Option<String>>>,
    into: &mut QueryResult,
) -> Result<()> {
    let kinds: Vec<ColumnKind> = meta.row_type.iter().map(|c| column_kind(&c.kind)).collect();

    for raw in data {
        if raw.len() != kinds.len() {
            return Err(SnowChartError::QueryExecution(format!(
                "row has {} cells, rowType declares {}",
                raw.len(),
                kinds.len()
            )));
        }
        let row = raw
            .into_iter()
            .zip(&kinds)
            .map(|(cell, kind)| decode_cell(cell, *kind))
            .collect::<Result<Vec<_>>>()?;
        into.push_row(row)?;
    }

    Ok(())
}

fn decode_cell(cell: Option<String>, kind: ColumnKind) -> Result<Value> {
    let Some(raw) = cell else {
        return Ok(Value::Null);
    };

    match kind {
        ColumnKind::Text => Ok(Value::Text(raw)),
        ColumnKind::Float => raw
            .trim()
            .parse::<f64>()
            .map(Value::Float)
            .map_err(|e| SnowChartError::QueryExecution(format!("bad number '{}': {}", raw, e))),
        ColumnKind::Date => {
            let days: i64 = raw
                .trim()
                .parse()
                .map_err(|e| SnowChartError::QueryExecution(format!("bad date '{}': {}", raw, e)))?;
            NaiveDate::from_ymd_opt(1970, 1, 1)
                .zip(chrono::Duration::try_days(days))
                .and_then(|(epoch, offset)| epoch.checked_add_signed(offset))
                .map(Value::Date)
                .ok_or_else(|| SnowChartError::QueryExecution(format!("date out of range: {}", raw)))
        }
    }
}
