//! Integration tests for databricks-mcp.

pub mod dispatcher_test;
pub mod live_warehouse_test;
pub mod server_test;
