//! Statement types shared by warehouse adapters and the execution engine.
//!
//! A submitted statement is identified by a [`StatementHandle`]; polling it
//! yields a [`StatementStatus`] until one of the terminal states is reached.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::engine::ErrorKind;

/// A single result cell, passed through exactly as the warehouse returned it.
pub type Cell = serde_json::Value;

/// A row of cells from a statement result.
pub type Row = Vec<Cell>;

/// Metadata about a column in a result set.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnInfo {
    /// Column name.
    pub name: String,

    /// Declared column type, as reported by the warehouse.
    pub data_type: String,
}

impl ColumnInfo {
    /// Creates a new column info with the given name and type.
    pub fn new(name: impl Into<String>, data_type: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            data_type: data_type.into(),
        }
    }
}

/// Opaque identifier of a submitted statement.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct StatementHandle(String);

impl StatementHandle {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for StatementHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Execution state of a statement, without any payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StatementState {
    Pending,
    Running,
    Succeeded,
    Failed,
    Canceled,
}

impl StatementState {
    /// Returns the state name as used by the warehouse API.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "PENDING",
            Self::Running => "RUNNING",
            Self::Succeeded => "SUCCEEDED",
            Self::Failed => "FAILED",
            Self::Canceled => "CANCELED",
        }
    }

    /// Returns true if no further transition can occur from this state.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Succeeded | Self::Failed | Self::Canceled)
    }
}

impl fmt::Display for StatementState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Failure details carried by a failed statement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatementError {
    /// How the failure is reported to the tool caller.
    pub kind: ErrorKind,

    /// Warehouse error code, if the warehouse supplied one.
    pub code: Option<String>,

    /// Human-readable message.
    pub message: String,
}

impl StatementError {
    /// A failure reported by the warehouse for the statement itself.
    pub fn remote(code: Option<String>, message: impl Into<String>) -> Self {
        Self {
            kind: ErrorKind::RemoteExecutionError,
            code,
            message: message.into(),
        }
    }

    /// A failure synthesized because the polling budget ran out.
    pub fn timeout(message: impl Into<String>) -> Self {
        Self {
            kind: ErrorKind::Timeout,
            code: None,
            message: message.into(),
        }
    }

    /// Returns the message prefixed with the warehouse error code, if any.
    pub fn describe(&self) -> String {
        match &self.code {
            Some(code) => format!("[{}] {}", code, self.message),
            None => self.message.clone(),
        }
    }
}

/// Status of a statement as observed by one poll.
#[derive(Debug, Clone, PartialEq)]
pub enum StatementStatus {
    /// Queued, waiting for warehouse capacity (or for the warehouse to resume).
    Pending,

    /// Executing.
    Running,

    /// Finished; carries the full inline result.
    Succeeded { columns: Vec<ColumnInfo>, rows: Vec<Row> },

    /// Finished with an error.
    Failed(StatementError),

    /// Canceled before completion.
    Canceled,
}

impl StatementStatus {
    /// Creates a succeeded status with the given columns and rows.
    pub fn succeeded(columns: Vec<ColumnInfo>, rows: Vec<Row>) -> Self {
        Self::Succeeded { columns, rows }
    }

    /// Returns the payload-free state of this status.
    pub fn state(&self) -> StatementState {
        match self {
            Self::Pending => StatementState::Pending,
            Self::Running => StatementState::Running,
            Self::Succeeded { .. } => StatementState::Succeeded,
            Self::Failed(_) => StatementState::Failed,
            Self::Canceled => StatementState::Canceled,
        }
    }

    /// Returns true if this is a terminal status.
    pub fn is_terminal(&self) -> bool {
        self.state().is_terminal()
    }
}

/// Result of a successful submission.
#[derive(Debug, Clone, PartialEq)]
pub struct SubmittedStatement {
    pub handle: StatementHandle,

    /// Status reported with the submission; may already be terminal when
    /// the warehouse rejects the statement up front.
    pub status: StatementStatus,
}

impl SubmittedStatement {
    /// A submission the warehouse has queued but not yet started.
    pub fn pending(handle: StatementHandle) -> Self {
        Self {
            handle,
            status: StatementStatus::Pending,
        }
    }
}
