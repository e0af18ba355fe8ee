//! MCP server integration tests.
//!
//! Feeds a scripted JSON-RPC session through the server and checks what a
//! client would read back.

use std::sync::Arc;
use std::time::Duration;

use databricks_mcp::engine::PollPolicy;
use databricks_mcp::mcp::protocol::{JsonRpcResponse, RequestId};
use databricks_mcp::mcp::McpServer;
use databricks_mcp::tools::ToolDispatcher;
use databricks_mcp::warehouse::MockWarehouseClient;
use serde_json::{json, Value};
use tokio::io::AsyncReadExt;
use tokio_util::sync::CancellationToken;

async fn run_session(requests: &[Value]) -> Vec<JsonRpcResponse> {
    let dispatcher = ToolDispatcher::new(Arc::new(MockWarehouseClient::new()))
        .with_policy(PollPolicy::new(Duration::from_millis(1), Duration::from_secs(1)));
    let server = McpServer::new(dispatcher);

    let input: String = requests.iter().map(|r| format!("{r}\n")).collect();
    let (mut client_end, server_end) = tokio::io::duplex(256 * 1024);

    server
        .run(input.as_bytes(), server_end, CancellationToken::new())
        .await
        .unwrap();

    let mut output = String::new();
    client_end.read_to_string(&mut output).await.unwrap();
    output
        .lines()
        .map(|line| serde_json::from_str(line).unwrap())
        .collect()
}

fn response_for(responses: &[JsonRpcResponse], id: i64) -> &JsonRpcResponse {
    responses
        .iter()
        .find(|r| r.id == Some(RequestId::Number(id)))
        .unwrap_or_else(|| panic!("no response for id {id}"))
}

fn tool_payload(response: &JsonRpcResponse) -> Value {
    let result = response.result.as_ref().unwrap();
    serde_json::from_str(result["content"][0]["text"].as_str().unwrap()).unwrap()
}

#[tokio::test]
async fn test_full_session() {
    let responses = run_session(&[
        json!({
            "jsonrpc": "2.0", "id": 1, "method": "initialize",
            "params": {
                "protocolVersion": "2024-11-05",
                "capabilities": {},
                "clientInfo": { "name": "integration-test", "version": "1.0" }
            }
        }),
        json!({ "jsonrpc": "2.0", "method": "notifications/initialized" }),
        json!({ "jsonrpc": "2.0", "id": 2, "method": "tools/list" }),
        json!({
            "jsonrpc": "2.0", "id": 3, "method": "tools/call",
            "params": { "name": "list_catalogs", "arguments": {} }
        }),
        json!({
            "jsonrpc": "2.0", "id": 4, "method": "tools/call",
            "params": { "name": "list_tables", "arguments": { "catalog": "main" } }
        }),
        json!({ "jsonrpc": "2.0", "id": 5, "method": "ping" }),
    ])
    .await;

    // The notification gets no response
    assert_eq!(responses.len(), 5);

    let init = response_for(&responses, 1).result.as_ref().unwrap();
    assert_eq!(init["protocolVersion"], json!("2024-11-05"));

    let tools = &response_for(&responses, 2).result.as_ref().unwrap()["tools"];
    assert_eq!(tools.as_array().unwrap().len(), 8);

    let catalogs = response_for(&responses, 3);
    assert_eq!(catalogs.result.as_ref().unwrap()["isError"], json!(false));
    assert_eq!(
        tool_payload(catalogs),
        json!({
            "status": "ok",
            "columns": ["result"],
            "rows": [["Mock result for: SHOW CATALOGS"]]
        })
    );

    let tables = response_for(&responses, 4);
    assert_eq!(tables.result.as_ref().unwrap()["isError"], json!(true));
    let payload = tool_payload(tables);
    assert_eq!(payload["kind"], json!("InvalidArgument"));
    assert!(payload["message"].as_str().unwrap().contains("schema"));

    assert_eq!(response_for(&responses, 5).result, Some(json!({})));
}

#[tokio::test]
async fn test_many_concurrent_calls_all_answered() {
    let requests: Vec<Value> = (1..=20)
        .map(|id| {
            json!({
                "jsonrpc": "2.0", "id": id, "method": "tools/call",
                "params": {
                    "name": "execute_sql_query",
                    "arguments": { "query": format!("SELECT {id}") }
                }
            })
        })
        .collect();

    let responses = run_session(&requests).await;

    assert_eq!(responses.len(), 20);
    for id in 1..=20 {
        let payload = tool_payload(response_for(&responses, id));
        assert_eq!(payload["rows"][0][0], json!(format!("Mock result for: SELECT {id}")));
    }
}

#[tokio::test]
async fn test_shutdown_stops_reading() {
    let dispatcher = ToolDispatcher::new(Arc::new(MockWarehouseClient::new()));
    let server = McpServer::new(dispatcher);

    // The client never closes its end, so only the token can end the session
    let (_client_writer, server_reader) = tokio::io::duplex(1024);
    let (_client_reader, server_writer) = tokio::io::duplex(1024);
    let shutdown = CancellationToken::new();
    shutdown.cancel();

    let result = tokio::time::timeout(
        Duration::from_secs(5),
        server.run(tokio::io::BufReader::new(server_reader), server_writer, shutdown),
    )
    .await;

    assert!(matches!(result, Ok(Ok(()))));
}
