//! MCP tools backed by the Databricks SQL warehouse.

mod definitions;
mod dispatcher;

pub use definitions::{get_tool_definitions, ToolDefinition, ToolName};
pub use dispatcher::{Arguments, ToolDispatcher};
