//! databricks-mcp - Databricks SQL warehouse tools for LLM clients over MCP.
//!
//! This library exposes the core modules for use by the binary and in
//! integration tests.

pub mod cli;
pub mod config;
pub mod engine;
pub mod error;
pub mod logging;
pub mod mcp;
pub mod sql;
pub mod tools;
pub mod warehouse;
