//! Tool dispatch integration tests.
//!
//! Drives the public dispatcher API against scripted warehouses in virtual time.

use std::sync::Arc;
use std::time::Duration;

use databricks_mcp::engine::{ErrorKind, PollPolicy, ToolResponse};
use databricks_mcp::tools::{Arguments, ToolDispatcher};
use databricks_mcp::warehouse::{
    ColumnInfo, MockWarehouseClient, ScriptedWarehouseClient, StatementError, StatementStatus,
};
use futures::future::join_all;
use serde_json::{json, Value};
use tokio::time::Instant;

fn args(value: Value) -> Arguments {
    match value {
        Value::Object(map) => map,
        other => panic!("Expected object, got {:?}", other),
    }
}

/// Asserts the ok/error shape of a response holds.
fn assert_well_formed(response: &ToolResponse) {
    let json = serde_json::to_value(response).unwrap();
    match json["status"].as_str() {
        Some("ok") => {
            let width = json["columns"].as_array().unwrap().len();
            for row in json["rows"].as_array().unwrap() {
                assert_eq!(row.as_array().unwrap().len(), width);
            }
            assert!(json.get("kind").is_none());
        }
        Some("error") => {
            assert!(json["kind"].is_string());
            assert!(json["message"].is_string());
            assert!(json.get("rows").is_none());
        }
        other => panic!("Unexpected status {:?}", other),
    }
}

#[tokio::test(start_paused = true)]
async fn test_every_terminal_outcome_is_well_formed() {
    let outcomes = vec![
        StatementStatus::succeeded(
            vec![ColumnInfo::new("id", "INT"), ColumnInfo::new("name", "STRING")],
            vec![vec![json!("1"), json!("Alice")], vec![json!("2"), json!(null)]],
        ),
        StatementStatus::succeeded(vec![], vec![]),
        StatementStatus::Failed(StatementError::remote(
            Some("TABLE_OR_VIEW_NOT_FOUND".to_string()),
            "Table or view not found: main.s.missing",
        )),
        StatementStatus::Canceled,
        StatementStatus::Running,
    ];

    for outcome in outcomes {
        let client = Arc::new(ScriptedWarehouseClient::completing_with(outcome));
        let dispatcher = ToolDispatcher::new(client).with_policy(PollPolicy::from_secs(1, 3));

        let response = dispatcher
            .dispatch("execute_sql_query", &args(json!({ "query": "SELECT * FROM t" })))
            .await;
        assert_well_formed(&response);
    }
}

#[tokio::test(start_paused = true)]
async fn test_wait_is_bounded_by_max_wait_plus_interval() {
    for (interval, max_wait) in [(1, 2), (2, 5), (5, 60), (3, 3)] {
        let client = Arc::new(ScriptedWarehouseClient::new(vec![StatementStatus::Pending]));
        let dispatcher =
            ToolDispatcher::new(client).with_policy(PollPolicy::from_secs(interval, max_wait));

        let started = Instant::now();
        let response = dispatcher
            .dispatch("execute_sql_query", &args(json!({ "query": "SELECT 1" })))
            .await;

        assert_eq!(response.error_kind(), Some(ErrorKind::Timeout));
        assert!(started.elapsed() <= Duration::from_secs(interval + max_wait));
    }
}

#[tokio::test(start_paused = true)]
async fn test_concurrent_invocations_are_independent() {
    let slow = Arc::new(ScriptedWarehouseClient::new(vec![StatementStatus::Running]));
    let fast = Arc::new(ScriptedWarehouseClient::completing_with(
        StatementStatus::succeeded(vec![ColumnInfo::new("1", "INT")], vec![vec![json!(1)]]),
    ));

    let slow_dispatcher = ToolDispatcher::new(slow).with_policy(PollPolicy::from_secs(1, 5));
    let fast_dispatcher = ToolDispatcher::new(fast.clone()).with_policy(PollPolicy::from_secs(1, 5));
    let query = args(json!({ "query": "SELECT 1" }));

    let started = Instant::now();
    let fast_calls = join_all((0..4).map(|_| fast_dispatcher.dispatch("execute_sql_query", &query)));
    let (slow_response, fast_responses) = tokio::join!(
        slow_dispatcher.dispatch("execute_sql_query", &query),
        fast_calls
    );

    assert_eq!(slow_response.error_kind(), Some(ErrorKind::Timeout));
    assert!(fast_responses.iter().all(ToolResponse::is_ok));
    assert_eq!(fast.submit_count(), 4);
    // The calls overlapped: total time is the slow call's budget, not a sum
    assert!(started.elapsed() <= Duration::from_secs(6));
}

#[tokio::test]
async fn test_mock_warehouse_round_trip() {
    let dispatcher = ToolDispatcher::new(Arc::new(MockWarehouseClient::new()))
        .with_policy(PollPolicy::new(Duration::from_millis(1), Duration::from_secs(1)));

    let response = dispatcher
        .dispatch("describe_table", &args(json!({ "catalog": "main", "schema": "s", "table": "t" })))
        .await;

    assert_eq!(
        response.to_json(),
        json!({
            "status": "ok",
            "columns": ["result"],
            "rows": [["Mock result for: DESCRIBE TABLE `main`.`s`.`t`"]]
        })
    );

    let response = dispatcher
        .dispatch("create_schema", &args(json!({ "catalog": "main", "schema": "scratch" })))
        .await;
    assert_eq!(
        response.to_json(),
        json!({ "status": "ok", "columns": [], "rows": [] })
    );
}
