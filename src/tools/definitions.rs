//! Tool definitions advertised to MCP clients.

use serde::{Deserialize, Serialize};
use serde_json::json;

/// Tool definition for LLM function calling.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolDefinition {
    pub name: String,
    pub description: String,
    pub input_schema: serde_json::Value,
}

/// The tools this server exposes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ToolName {
    ExecuteSqlQuery,
    ListCatalogs,
    ListSchemas,
    ListTables,
    DescribeTable,
    CreateSchema,
    CreateTable,
    InsertData,
}

impl ToolName {
    /// All tools, in the order they are listed to clients.
    pub const ALL: [ToolName; 8] = [
        Self::ExecuteSqlQuery,
        Self::ListCatalogs,
        Self::ListSchemas,
        Self::ListTables,
        Self::DescribeTable,
        Self::CreateSchema,
        Self::CreateTable,
        Self::InsertData,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ExecuteSqlQuery => "execute_sql_query",
            Self::ListCatalogs => "list_catalogs",
            Self::ListSchemas => "list_schemas",
            Self::ListTables => "list_tables",
            Self::DescribeTable => "describe_table",
            Self::CreateSchema => "create_schema",
            Self::CreateTable => "create_table",
            Self::InsertData => "insert_data",
        }
    }

    /// Looks up a tool by its wire name.
    pub fn parse(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|tool| tool.as_str() == name)
    }

    fn description(&self) -> &'static str {
        match self {
            Self::ExecuteSqlQuery => {
                "Execute a SQL statement on the Databricks SQL warehouse and return the result \
                 as columns and rows. Waits for the statement to finish, up to the server's \
                 polling budget."
            }
            Self::ListCatalogs => "List all catalogs in the Databricks workspace.",
            Self::ListSchemas => "List all schemas in a given Databricks catalog.",
            Self::ListTables => "List all tables in a given Databricks schema.",
            Self::DescribeTable => {
                "Describe the columns and data types of a Databricks table."
            }
            Self::CreateSchema => "Create a new schema in a given Databricks catalog.",
            Self::CreateTable => "Create a new table in Databricks with the specified columns.",
            Self::InsertData => {
                "Insert rows of literal values into a Databricks table. Strings, numbers, \
                 booleans and null are supported."
            }
        }
    }

    fn input_schema(&self) -> serde_json::Value {
        let catalog = json!({ "type": "string", "description": "Catalog name" });
        let schema = json!({ "type": "string", "description": "Schema name" });
        let table = json!({ "type": "string", "description": "Table name" });

        match self {
            Self::ExecuteSqlQuery => json!({
                "type": "object",
                "properties": {
                    "query": { "type": "string", "description": "The SQL statement to execute" }
                },
                "required": ["query"]
            }),
            Self::ListCatalogs => json!({
                "type": "object",
                "properties": {},
                "required": []
            }),
            Self::ListSchemas => json!({
                "type": "object",
                "properties": { "catalog": catalog },
                "required": ["catalog"]
            }),
            Self::ListTables | Self::CreateSchema => json!({
                "type": "object",
                "properties": { "catalog": catalog, "schema": schema },
                "required": ["catalog", "schema"]
            }),
            Self::DescribeTable => json!({
                "type": "object",
                "properties": { "catalog": catalog, "schema": schema, "table": table },
                "required": ["catalog", "schema", "table"]
            }),
            Self::CreateTable => json!({
                "type": "object",
                "properties": {
                    "catalog": catalog,
                    "schema": schema,
                    "table": table,
                    "columns": {
                        "type": "array",
                        "description": "Column definitions, e.g. [{\"name\": \"id\", \"type\": \"INT\"}]",
                        "items": {
                            "type": "object",
                            "properties": {
                                "name": { "type": "string" },
                                "type": { "type": "string" }
                            },
                            "required": ["name", "type"]
                        }
                    }
                },
                "required": ["catalog", "schema", "table", "columns"]
            }),
            Self::InsertData => json!({
                "type": "object",
                "properties": {
                    "table_full_name": {
                        "type": "string",
                        "description": "Fully qualified table name, e.g. main.sales.orders"
                    },
                    "values": {
                        "type": "array",
                        "description": "Rows to insert; each row is an array of values",
                        "items": { "type": "array" }
                    }
                },
                "required": ["table_full_name", "values"]
            }),
        }
    }

    /// Returns the definition advertised for this tool.
    pub fn definition(&self) -> ToolDefinition {
        ToolDefinition {
            name: self.as_str().to_string(),
            description: self.description().to_string(),
            input_schema: self.input_schema(),
        }
    }
}

/// Returns the tool definitions available to MCP clients.
pub fn get_tool_definitions() -> Vec<ToolDefinition> {
    ToolName::ALL.iter().map(ToolName::definition).collect()
}
