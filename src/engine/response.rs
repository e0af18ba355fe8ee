//! Tool response contract returned to the protocol layer.
//!
//! Serializes as either
//! `{"status":"ok","columns":[...],"rows":[[...]]}` or
//! `{"status":"error","kind":"<ErrorKind>","message":"..."}`.

use serde::{Deserialize, Serialize, Serializer};
use std::fmt;

use crate::warehouse::{ColumnInfo, Row};

/// Classification of a failed tool invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ErrorKind {
    /// Caller-supplied input is malformed; the warehouse was never contacted.
    InvalidArgument,
    /// The warehouse rejected the submission or was unreachable.
    SubmissionError,
    /// The polling budget ran out before a terminal state.
    Timeout,
    /// The warehouse reported that the statement failed.
    RemoteExecutionError,
    /// The statement was canceled.
    Canceled,
    /// No tool with the requested name exists.
    UnknownTool,
    /// An internal invariant was violated.
    InternalError,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::InvalidArgument => "InvalidArgument",
            Self::SubmissionError => "SubmissionError",
            Self::Timeout => "Timeout",
            Self::RemoteExecutionError => "RemoteExecutionError",
            Self::Canceled => "Canceled",
            Self::UnknownTool => "UnknownTool",
            Self::InternalError => "InternalError",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of one tool invocation: data or a structured error, never both.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status")]
pub enum ToolResponse {
    #[serde(rename = "ok")]
    Ok {
        #[serde(serialize_with = "serialize_column_names")]
        columns: Vec<ColumnInfo>,
        rows: Vec<Row>,
    },
    #[serde(rename = "error")]
    Err { kind: ErrorKind, message: String },
}

fn serialize_column_names<S>(columns: &[ColumnInfo], serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    serializer.collect_seq(columns.iter().map(|c| c.name.as_str()))
}

impl ToolResponse {
    /// Creates a successful response.
    pub fn ok(columns: Vec<ColumnInfo>, rows: Vec<Row>) -> Self {
        Self::Ok { columns, rows }
    }

    /// Creates an error response.
    pub fn error(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self::Err {
            kind,
            message: message.into(),
        }
    }

    pub fn is_ok(&self) -> bool {
        matches!(self, Self::Ok { .. })
    }

    pub fn is_err(&self) -> bool {
        !self.is_ok()
    }

    /// Returns the error kind, if this is an error response.
    pub fn error_kind(&self) -> Option<ErrorKind> {
        match self {
            Self::Ok { .. } => None,
            Self::Err { kind, .. } => Some(*kind),
        }
    }

    /// Serializes the response into its wire JSON shape.
    pub fn to_json(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or_default()
    }

    /// Serializes the response into wire JSON text, `status` first.
    pub fn to_json_string(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|_| {
            r#"{"status":"error","kind":"InternalError","message":"unserializable response"}"#
                .to_string()
        })
    }
}
