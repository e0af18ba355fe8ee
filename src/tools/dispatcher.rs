//! Routes tool invocations to SQL templates and the statement engine.

use std::sync::Arc;

use serde_json::{Map, Value};
use tracing::{debug, info, warn};

use super::ToolName;
use crate::engine::{self, ErrorKind, PollPolicy, SqlStatement, ToolResponse};
use crate::sql::{self, ArgumentError, ColumnDefinition};
use crate::warehouse::WarehouseClient;

/// Tool arguments as received from the protocol layer.
pub type Arguments = Map<String, Value>;

/// Dispatches tool calls against a shared warehouse client.
///
/// Every invocation is independent; the dispatcher holds no per-call state
/// and can be shared across concurrent calls.
#[derive(Clone)]
pub struct ToolDispatcher {
    client: Arc<dyn WarehouseClient>,
    policy: PollPolicy,
}

impl ToolDispatcher {
    pub fn new(client: Arc<dyn WarehouseClient>) -> Self {
        Self {
            client,
            policy: PollPolicy::default(),
        }
    }

    pub fn with_policy(mut self, policy: PollPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn policy(&self) -> PollPolicy {
        self.policy
    }

    /// Runs one tool invocation to completion.
    ///
    /// Always yields a [`ToolResponse`]; failures are reported in-band.
    pub async fn dispatch(&self, tool_name: &str, args: &Arguments) -> ToolResponse {
        let Some(tool) = ToolName::parse(tool_name) else {
            warn!("Unknown tool requested: {}", tool_name);
            return ToolResponse::error(
                ErrorKind::UnknownTool,
                format!("unknown tool '{tool_name}'"),
            );
        };

        let sql = match render(tool, args) {
            Ok(sql) => sql,
            Err(e) => {
                debug!(tool = tool.as_str(), "Rejected arguments: {}", e);
                return ToolResponse::error(ErrorKind::InvalidArgument, e.to_string());
            }
        };

        info!(tool = tool.as_str(), "Executing statement");
        let statement = SqlStatement::new(sql).with_parameters(args.clone());
        let response = engine::run_statement(self.client.as_ref(), &statement, self.policy).await;

        if let Some(kind) = response.error_kind() {
            info!(tool = tool.as_str(), "Tool finished with {}", kind);
        } else {
            info!(tool = tool.as_str(), "Tool finished");
        }
        response
    }
}

/// Turns validated arguments into the statement text for `tool`.
fn render(tool: ToolName, args: &Arguments) -> Result<String, ArgumentError> {
    match tool {
        ToolName::ExecuteSqlQuery => {
            let query = required_str(args, "query")?;
            Ok(query.trim().to_string())
        }
        ToolName::ListCatalogs => Ok(sql::list_catalogs()),
        ToolName::ListSchemas => sql::list_schemas(required_str(args, "catalog")?),
        ToolName::ListTables => sql::list_tables(
            required_str(args, "catalog")?,
            required_str(args, "schema")?,
        ),
        ToolName::DescribeTable => sql::describe_table(
            required_str(args, "catalog")?,
            required_str(args, "schema")?,
            required_str(args, "table")?,
        ),
        ToolName::CreateSchema => sql::create_schema(
            required_str(args, "catalog")?,
            required_str(args, "schema")?,
        ),
        ToolName::CreateTable => {
            let catalog = required_str(args, "catalog")?;
            let schema = required_str(args, "schema")?;
            let table = required_str(args, "table")?;
            let columns = required_columns(args)?;
            sql::create_table(catalog, schema, table, &columns)
        }
        ToolName::InsertData => {
            let table = required_str(args, "table_full_name")?;
            let rows = required_rows(args)?;
            sql::insert_data(table, &rows)
        }
    }
}

fn required<'a>(args: &'a Arguments, field: &str) -> Result<&'a Value, ArgumentError> {
    match args.get(field) {
        None | Some(Value::Null) => Err(ArgumentError::Missing {
            field: field.to_string(),
        }),
        Some(value) => Ok(value),
    }
}

/// A required, non-blank string argument.
fn required_str<'a>(args: &'a Arguments, field: &str) -> Result<&'a str, ArgumentError> {
    let value = required(args, field)?
        .as_str()
        .ok_or_else(|| ArgumentError::WrongType {
            field: field.to_string(),
            expected: "a string",
        })?;

    if value.trim().is_empty() {
        return Err(ArgumentError::Empty {
            field: field.to_string(),
        });
    }
    Ok(value)
}

fn required_columns(args: &Arguments) -> Result<Vec<ColumnDefinition>, ArgumentError> {
    serde_json::from_value(required(args, "columns")?.clone()).map_err(|_| {
        ArgumentError::WrongType {
            field: "columns".to_string(),
            expected: "an array of {\"name\", \"type\"} objects",
        }
    })
}

fn required_rows(args: &Arguments) -> Result<Vec<Vec<Value>>, ArgumentError> {
    serde_json::from_value(required(args, "values")?.clone()).map_err(|_| {
        ArgumentError::WrongType {
            field: "values".to_string(),
            expected: "an array of rows, each an array of values",
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::warehouse::{ColumnInfo, ScriptedWarehouseClient, StatementStatus};
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn args(value: Value) -> Arguments {
        match value {
            Value::Object(map) => map,
            other => panic!("Expected object, got {:?}", other),
        }
    }

    fn select_one_client() -> Arc<ScriptedWarehouseClient> {
        Arc::new(ScriptedWarehouseClient::new(vec![
            StatementStatus::Pending,
            StatementStatus::Running,
            StatementStatus::succeeded(vec![ColumnInfo::new("1", "INT")], vec![vec![json!(1)]]),
        ]))
    }

    #[tokio::test(start_paused = true)]
    async fn test_execute_sql_query_select_one() {
        let client = select_one_client();
        let dispatcher = ToolDispatcher::new(client.clone()).with_policy(PollPolicy::from_secs(1, 10));

        let response = dispatcher
            .dispatch("execute_sql_query", &args(json!({ "query": "SELECT 1" })))
            .await;

        assert_eq!(
            serde_json::to_string(&response).unwrap(),
            r#"{"status":"ok","columns":["1"],"rows":[[1]]}"#
        );
        assert_eq!(client.submitted_sql(), vec!["SELECT 1".to_string()]);
        assert_eq!(client.poll_count(), 3);
    }

    #[tokio::test]
    async fn test_empty_query_never_reaches_warehouse() {
        let client = select_one_client();
        let dispatcher = ToolDispatcher::new(client.clone());

        for query in [json!(""), json!("   \n"), json!(42), json!(null)] {
            let response = dispatcher
                .dispatch("execute_sql_query", &args(json!({ "query": query })))
                .await;
            assert_eq!(response.error_kind(), Some(ErrorKind::InvalidArgument));
        }
        let response = dispatcher.dispatch("execute_sql_query", &Map::new()).await;
        assert_eq!(response.error_kind(), Some(ErrorKind::InvalidArgument));

        assert_eq!(client.submit_count(), 0);
        assert_eq!(client.poll_count(), 0);
    }

    #[tokio::test]
    async fn test_unknown_tool() {
        let client = select_one_client();
        let dispatcher = ToolDispatcher::new(client.clone());

        let response = dispatcher.dispatch("drop_database", &Map::new()).await;

        assert_eq!(response.error_kind(), Some(ErrorKind::UnknownTool));
        assert_eq!(client.submit_count(), 0);
    }

    #[tokio::test]
    async fn test_injection_is_rejected_before_submission() {
        let client = select_one_client();
        let dispatcher = ToolDispatcher::new(client.clone());

        let attempts = [
            ("list_schemas", json!({ "catalog": "main`; DROP TABLE x; --" })),
            ("list_tables", json!({ "catalog": "main", "schema": "s' OR '1'='1" })),
            (
                "describe_table",
                json!({ "catalog": "main", "schema": "s", "table": "t; DELETE FROM t" }),
            ),
            (
                "create_table",
                json!({
                    "catalog": "main", "schema": "s", "table": "t",
                    "columns": [{ "name": "id", "type": "INT) AS SELECT * FROM secrets --" }]
                }),
            ),
            (
                "insert_data",
                json!({ "table_full_name": "main.s.t", "values": [["x'); DROP TABLE t; --"]] }),
            ),
        ];

        for (tool, arguments) in attempts {
            let response = dispatcher.dispatch(tool, &args(arguments)).await;
            assert_eq!(
                response.error_kind(),
                Some(ErrorKind::InvalidArgument),
                "{tool} should reject its arguments"
            );
        }
        assert_eq!(client.submit_count(), 0);
    }

    #[tokio::test]
    async fn test_wrong_argument_types() {
        let client = select_one_client();
        let dispatcher = ToolDispatcher::new(client.clone());

        let response = dispatcher
            .dispatch(
                "create_table",
                &args(json!({ "catalog": "main", "schema": "s", "table": "t", "columns": "id INT" })),
            )
            .await;
        assert_eq!(response.error_kind(), Some(ErrorKind::InvalidArgument));

        let response = dispatcher
            .dispatch(
                "insert_data",
                &args(json!({ "table_full_name": "main.s.t", "values": [1, 2] })),
            )
            .await;
        assert_eq!(response.error_kind(), Some(ErrorKind::InvalidArgument));
        assert_eq!(client.submit_count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_list_schemas_is_idempotent() {
        let client = Arc::new(ScriptedWarehouseClient::completing_with(
            StatementStatus::succeeded(
                vec![ColumnInfo::new("schema_name", "STRING")],
                vec![vec![json!("default")], vec![json!("sales")]],
            ),
        ));
        let dispatcher = ToolDispatcher::new(client.clone()).with_policy(PollPolicy::from_secs(1, 5));
        let arguments = args(json!({ "catalog": "main" }));

        let first = dispatcher.dispatch("list_schemas", &arguments).await;
        let second = dispatcher.dispatch("list_schemas", &arguments).await;

        assert_eq!(first, second);
        let submitted = client.submitted_sql();
        assert_eq!(submitted.len(), 2);
        assert_eq!(submitted[0], submitted[1]);
        assert_eq!(
            submitted[0],
            "SELECT schema_name FROM `main`.`information_schema`.`schemata` ORDER BY schema_name"
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_timeout_is_reported() {
        let client = Arc::new(ScriptedWarehouseClient::new(vec![StatementStatus::Running]));
        let dispatcher = ToolDispatcher::new(client.clone()).with_policy(PollPolicy::from_secs(1, 2));

        let started = tokio::time::Instant::now();
        let response = dispatcher
            .dispatch("execute_sql_query", &args(json!({ "query": "SELECT sleep(999)" })))
            .await;

        assert_eq!(response.error_kind(), Some(ErrorKind::Timeout));
        assert!(started.elapsed() <= std::time::Duration::from_secs(3));
        assert_eq!(client.cancel_count(), 1);
    }

    #[tokio::test]
    async fn test_submission_error() {
        let client = Arc::new(
            ScriptedWarehouseClient::new(vec![StatementStatus::Running])
                .with_submit_error("connection refused"),
        );
        let dispatcher = ToolDispatcher::new(client.clone());

        let response = dispatcher.dispatch("list_catalogs", &Map::new()).await;

        assert_eq!(response.error_kind(), Some(ErrorKind::SubmissionError));
        assert_eq!(client.submitted_sql(), vec!["SHOW CATALOGS".to_string()]);
        assert_eq!(client.poll_count(), 0);
    }
}
