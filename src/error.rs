//! Error types for databricks-mcp.
//!
//! Defines the main error enum used by the warehouse adapter, configuration
//! loading and the MCP transport. Tool-level failures reported back to the
//! LLM are modelled separately by [`crate::engine::ErrorKind`].

use thiserror::Error;

/// Main error type for databricks-mcp operations.
#[derive(Error, Debug)]
pub enum WarehouseMcpError {
    /// Warehouse unreachable (DNS, TLS, connect/read timeouts, etc.)
    #[error("Connection error: {0}")]
    Connection(String),

    /// Warehouse API rejected a request (bad SQL, unknown statement, auth, etc.)
    #[error("API error: {0}")]
    Api(String),

    /// Configuration errors (invalid config file, missing credentials, etc.)
    #[error("Configuration error: {0}")]
    Config(String),

    /// MCP transport errors (stdio closed, unserializable message, etc.)
    #[error("Protocol error: {0}")]
    Protocol(String),

    /// Internal application errors (unexpected states, bugs, etc.)
    #[error("Internal error: {0}")]
    Internal(String),
}

impl WarehouseMcpError {
    /// Creates a connection error with the given message.
    pub fn connection(msg: impl Into<String>) -> Self {
        Self::Connection(msg.into())
    }

    /// Creates an API error with the given message.
    pub fn api(msg: impl Into<String>) -> Self {
        Self::Api(msg.into())
    }

    /// Creates a configuration error with the given message.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Creates a protocol error with the given message.
    pub fn protocol(msg: impl Into<String>) -> Self {
        Self::Protocol(msg.into())
    }

    /// Creates an internal error with the given message.
    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    /// Returns the error category as a string for display purposes.
    pub fn category(&self) -> &'static str {
        match self {
            Self::Connection(_) => "Connection Error",
            Self::Api(_) => "API Error",
            Self::Config(_) => "Configuration Error",
            Self::Protocol(_) => "Protocol Error",
            Self::Internal(_) => "Internal Error",
        }
    }
}

/// Result type alias using WarehouseMcpError.
pub type Result<T> = std::result::Result<T, WarehouseMcpError>;
