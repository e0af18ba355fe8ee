//! Databricks SQL Statement Execution API client.
//!
//! Implements the [`WarehouseClient`] trait on top of the
//! `/api/2.0/sql/statements` REST endpoints. Statements are submitted
//! asynchronously (`wait_timeout = 0s`) and results are requested inline
//! as JSON arrays.

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::time::Duration;
use tracing::{debug, warn};
use url::Url;

use super::{
    ColumnInfo, Row, StatementError, StatementHandle, StatementStatus, SubmittedStatement,
    WarehouseClient,
};
use crate::config::WarehouseConfig;
use crate::error::{Result, WarehouseMcpError};

/// Path of the statement execution endpoint, relative to the workspace host.
const STATEMENTS_PATH: &str = "api/2.0/sql/statements";

/// Maximum number of attempts for status requests that fail transiently.
const MAX_RETRY_ATTEMPTS: u32 = 3;

/// Base delay for exponential backoff (milliseconds).
const RETRY_BASE_DELAY_MS: u64 = 500;

/// Runs a request until it succeeds, fails permanently or runs out of attempts.
///
/// Each attempt reports its outcome and whether a retry may help. Attempts
/// are spaced by an exponential backoff starting at `RETRY_BASE_DELAY_MS`.
async fn with_retries<T, F, Fut>(label: &str, mut attempt: F) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = (Result<T>, bool)>,
{
    let mut delay = Duration::from_millis(RETRY_BASE_DELAY_MS);
    let mut attempts = 1;

    loop {
        match attempt().await {
            (Ok(value), _) => return Ok(value),
            (Err(e), retryable) if !retryable || attempts >= MAX_RETRY_ATTEMPTS => return Err(e),
            (Err(e), _) => {
                warn!(
                    "{} failed (attempt {}), retrying in {:?}: {}",
                    label, attempts, delay, e
                );
                tokio::time::sleep(delay).await;
                delay *= 2;
                attempts += 1;
            }
        }
    }
}

/// Databricks REST warehouse client.
#[derive(Debug, Clone)]
pub struct DatabricksRestClient {
    host: Url,
    token: String,
    warehouse_id: String,
    client: Client,
}

impl DatabricksRestClient {
    /// Creates a new client for the configured workspace and warehouse.
    pub fn new(config: &WarehouseConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(config.http_timeout)
            .build()
            .map_err(|e| {
                WarehouseMcpError::connection(format!("Failed to create HTTP client: {}", e))
            })?;

        Ok(Self {
            host: config.host.clone(),
            token: config.token.clone(),
            warehouse_id: config.warehouse_id.clone(),
            client,
        })
    }

    /// URL of the statements collection.
    fn statements_url(&self) -> Result<Url> {
        self.host.join(STATEMENTS_PATH).map_err(|e| {
            WarehouseMcpError::config(format!("Invalid Databricks host '{}': {}", self.host, e))
        })
    }

    /// URL of a single statement, optionally with a trailing action segment.
    fn statement_url(&self, handle: &StatementHandle, action: Option<&str>) -> Result<Url> {
        let path = match action {
            Some(action) => format!("{}/{}/{}", STATEMENTS_PATH, handle.as_str(), action),
            None => format!("{}/{}", STATEMENTS_PATH, handle.as_str()),
        };
        self.host.join(&path).map_err(|e| {
            WarehouseMcpError::internal(format!("Invalid statement id '{}': {}", handle, e))
        })
    }

    /// Parses an API error response and returns (error, is_retryable).
    fn parse_error(status: StatusCode, body: &str) -> (WarehouseMcpError, bool) {
        if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            return (
                WarehouseMcpError::api(format!(
                    "Authentication failed ({}). Check your DATABRICKS_TOKEN.",
                    status
                )),
                false,
            );
        }

        if status == StatusCode::TOO_MANY_REQUESTS {
            return (
                WarehouseMcpError::api("Rate limited by the Databricks API."),
                true,
            );
        }

        // 5xx errors are generally retryable
        let is_retryable = status.is_server_error();

        if let Ok(error_response) = serde_json::from_str::<ApiErrorResponse>(body) {
            let message = match error_response.error_code {
                Some(code) => format!("[{}] {}", code, error_response.message),
                None => error_response.message,
            };
            return (WarehouseMcpError::api(message), is_retryable);
        }

        (
            WarehouseMcpError::api(format!("Databricks API error ({}): {}", status, body)),
            is_retryable,
        )
    }

    /// Determines if a request error is retryable.
    fn is_retryable_request_error(error: &reqwest::Error) -> bool {
        error.is_timeout() || error.is_connect()
    }

    /// Sends a request and decodes the JSON body, without retrying.
    async fn send<T: DeserializeOwned>(&self, request: reqwest::RequestBuilder) -> Result<T> {
        let (result, _) = self.send_once(request).await;
        result
    }

    /// Sends a request once; returns the outcome and whether a retry may help.
    async fn send_once<T: DeserializeOwned>(
        &self,
        request: reqwest::RequestBuilder,
    ) -> (Result<T>, bool) {
        let response = match request.bearer_auth(&self.token).send().await {
            Ok(response) => response,
            Err(e) => {
                let retryable = Self::is_retryable_request_error(&e);
                return (
                    Err(WarehouseMcpError::connection(format!(
                        "Request to Databricks failed: {}",
                        e
                    ))),
                    retryable,
                );
            }
        };

        let status = response.status();
        let body = match response.text().await {
            Ok(body) => body,
            Err(e) => {
                return (
                    Err(WarehouseMcpError::connection(format!(
                        "Failed to read response: {}",
                        e
                    ))),
                    true,
                )
            }
        };

        if !status.is_success() {
            let (error, retryable) = Self::parse_error(status, &body);
            return (Err(error), retryable);
        }

        // Some endpoints (cancel) answer with an empty body
        let body = if body.trim().is_empty() { "null" } else { body.as_str() };
        let parsed = serde_json::from_str::<T>(body).map_err(|e| {
            WarehouseMcpError::api(format!("Failed to parse Databricks response: {}", e))
        });
        (parsed, false)
    }

    /// Converts a statement response into the engine's status model.
    fn into_status(response: StatementResponse) -> StatementStatus {
        let Some(status) = response.status else {
            // A response without status has not been scheduled yet
            return StatementStatus::Pending;
        };

        match status.state {
            WireState::Pending => StatementStatus::Pending,
            WireState::Running => StatementStatus::Running,
            WireState::Canceled => StatementStatus::Canceled,
            WireState::Closed => StatementStatus::Failed(StatementError::remote(
                None,
                "statement was closed before its result could be read",
            )),
            WireState::Failed => {
                let (code, message) = match status.error {
                    Some(err) => (err.error_code, err.message),
                    None => (None, None),
                };
                StatementStatus::Failed(StatementError::remote(
                    code,
                    message.unwrap_or_else(|| "SQL execution failed".to_string()),
                ))
            }
            WireState::Succeeded => {
                let manifest = response.manifest.unwrap_or_default();
                if manifest.total_chunk_count.unwrap_or(1) > 1 || manifest.truncated {
                    warn!(
                        statement_id = %response.statement_id,
                        "Result spans multiple chunks; only the first chunk is returned"
                    );
                }

                let columns = manifest
                    .schema
                    .map(|schema| schema.columns)
                    .unwrap_or_default()
                    .into_iter()
                    .map(|c| {
                        let data_type = c.type_text.or(c.type_name).unwrap_or_default();
                        ColumnInfo::new(c.name, data_type)
                    })
                    .collect();

                let rows: Vec<Row> = response
                    .result
                    .and_then(|r| r.data_array)
                    .unwrap_or_default();

                StatementStatus::succeeded(columns, rows)
            }
        }
    }
}

#[async_trait]
impl WarehouseClient for DatabricksRestClient {
    async fn submit(&self, sql: &str) -> Result<SubmittedStatement> {
        let body = ExecuteStatementRequest {
            warehouse_id: &self.warehouse_id,
            statement: sql,
            wait_timeout: "0s",
            on_wait_timeout: "CONTINUE",
            disposition: "INLINE",
            format: "JSON_ARRAY",
        };

        // Submissions are not retried
        let request = self.client.post(self.statements_url()?).json(&body);
        let response: StatementResponse = self.send(request).await?;

        let handle = StatementHandle::new(response.statement_id.clone());
        let status = Self::into_status(response);
        debug!(statement_id = %handle, "Statement submitted ({})", status.state());
        Ok(SubmittedStatement { handle, status })
    }

    async fn poll(&self, handle: &StatementHandle) -> Result<StatementStatus> {
        let url = self.statement_url(handle, None)?;
        let label = format!("Status request for statement {}", handle);

        let response = with_retries(&label, || {
            self.send_once::<StatementResponse>(self.client.get(url.clone()))
        })
        .await?;
        Ok(Self::into_status(response))
    }

    async fn cancel(&self, handle: &StatementHandle) -> Result<()> {
        let url = self.statement_url(handle, Some("cancel"))?;
        let request = self.client.post(url);
        let _: serde_json::Value = self.send(request).await?;
        debug!(statement_id = %handle, "Cancel requested");
        Ok(())
    }
}

// Databricks API request/response types

#[derive(Debug, Serialize)]
struct ExecuteStatementRequest<'a> {
    warehouse_id: &'a str,
    statement: &'a str,
    wait_timeout: &'static str,
    on_wait_timeout: &'static str,
    disposition: &'static str,
    format: &'static str,
}

#[derive(Debug, Deserialize)]
struct StatementResponse {
    statement_id: String,
    status: Option<WireStatus>,
    manifest: Option<ResultManifest>,
    result: Option<ResultData>,
}

#[derive(Debug, Deserialize)]
struct WireStatus {
    state: WireState,
    error: Option<ServiceError>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
enum WireState {
    Pending,
    Running,
    Succeeded,
    Failed,
    Canceled,
    Closed,
}

#[derive(Debug, Deserialize)]
struct ServiceError {
    error_code: Option<String>,
    message: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct ResultManifest {
    schema: Option<ResultSchema>,
    total_chunk_count: Option<u64>,
    #[serde(default)]
    truncated: bool,
}

#[derive(Debug, Default, Deserialize)]
struct ResultSchema {
    #[serde(default)]
    columns: Vec<WireColumn>,
}

#[derive(Debug, Deserialize)]
struct WireColumn {
    name: String,
    type_name: Option<String>,
    type_text: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ResultData {
    data_array: Option<Vec<Vec<serde_json::Value>>>,
}

#[derive(Debug, Deserialize)]
struct ApiErrorResponse {
    error_code: Option<String>,
    message: String,
}
