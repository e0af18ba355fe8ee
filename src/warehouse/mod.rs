//! Warehouse abstraction layer.
//!
//! Provides a trait-based interface for submitting SQL statements to a
//! warehouse and polling them, so the execution engine can run against the
//! Databricks REST API or an in-memory fake interchangeably.

mod mock;
mod rest;
mod types;

pub use mock::{MockWarehouseClient, ScriptedWarehouseClient};
pub use rest::DatabricksRestClient;
pub use types::{
    Cell, ColumnInfo, Row, StatementError, StatementHandle, StatementState, StatementStatus,
    SubmittedStatement,
};

use std::sync::Arc;

use crate::config::WarehouseConfig;
use crate::error::Result;
use async_trait::async_trait;

/// Supported warehouse backends.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum WarehouseBackend {
    /// Databricks SQL Statement Execution REST API.
    #[default]
    Databricks,
    /// In-memory mock, for local experiments without credentials.
    Mock,
}

impl WarehouseBackend {
    /// Returns the backend as a string for display.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Databricks => "databricks",
            Self::Mock => "mock",
        }
    }
}

/// Creates a warehouse client for the given backend.
///
/// The Databricks backend requires a resolved configuration; the mock
/// backend ignores it.
pub fn connect(
    backend: WarehouseBackend,
    config: Option<&WarehouseConfig>,
) -> Result<Arc<dyn WarehouseClient>> {
    match backend {
        WarehouseBackend::Databricks => {
            let config = config.ok_or_else(|| {
                crate::error::WarehouseMcpError::config(
                    "Databricks backend requires host, token and warehouse id",
                )
            })?;
            Ok(Arc::new(DatabricksRestClient::new(config)?))
        }
        WarehouseBackend::Mock => Ok(Arc::new(MockWarehouseClient::new())),
    }
}

/// Capability through which the engine talks to the warehouse.
///
/// Implementations must be safe for concurrent independent calls: every
/// request is keyed by its handle and carries no client-side session state.
#[async_trait]
pub trait WarehouseClient: Send + Sync {
    /// Submits a statement for asynchronous execution.
    ///
    /// Returns the handle along with the status reported at submission.
    async fn submit(&self, sql: &str) -> Result<SubmittedStatement>;

    /// Fetches the current status of a submitted statement.
    async fn poll(&self, handle: &StatementHandle) -> Result<StatementStatus>;

    /// Requests cancellation of a submitted statement. Best effort.
    async fn cancel(&self, _handle: &StatementHandle) -> Result<()> {
        Ok(())
    }
}
