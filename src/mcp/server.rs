//! MCP server over stdio.
//!
//! Reads newline-delimited JSON-RPC requests, runs each `tools/call` in its
//! own task, and writes responses through a single writer task so lines never
//! interleave. Responses may arrive out of order; clients match them by id.

use serde_json::Value;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};
use tokio::sync::mpsc;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, trace, warn};

use super::protocol::{
    methods, InitializeParams, InitializeResult, JsonRpcError, JsonRpcRequest, JsonRpcResponse,
    RequestId, ServerCapabilities, ServerInfo, ToolsCallParams, ToolsCallResult, ToolsCapability,
    ToolsListResult, JSONRPC_VERSION, MCP_PROTOCOL_VERSION,
};
use crate::error::{Result, WarehouseMcpError};
use crate::tools::{get_tool_definitions, Arguments, ToolDispatcher};

/// Capacity of the channel between request tasks and the writer.
const RESPONSE_CHANNEL_CAPACITY: usize = 64;

/// MCP server exposing the warehouse tools.
#[derive(Clone)]
pub struct McpServer {
    dispatcher: ToolDispatcher,
    server_info: ServerInfo,
}

impl McpServer {
    pub fn new(dispatcher: ToolDispatcher) -> Self {
        Self {
            dispatcher,
            server_info: ServerInfo::default(),
        }
    }

    /// Serves on stdin/stdout until stdin closes or Ctrl-C is pressed.
    pub async fn run_stdio(self) -> Result<()> {
        let shutdown = CancellationToken::new();
        let signal = shutdown.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                info!("Interrupt received, shutting down");
                signal.cancel();
            }
        });

        let stdin = tokio::io::BufReader::new(tokio::io::stdin());
        self.run(stdin, tokio::io::stdout(), shutdown).await
    }

    /// Serves requests read from `reader`, writing responses to `writer`.
    ///
    /// At end of input, in-flight tool calls are allowed to finish. When
    /// `shutdown` fires, reading stops and in-flight calls are abandoned.
    pub async fn run<R, W>(self, reader: R, writer: W, shutdown: CancellationToken) -> Result<()>
    where
        R: AsyncBufRead + Unpin,
        W: AsyncWrite + Unpin + Send + 'static,
    {
        info!("MCP server starting");

        let (tx, rx) = mpsc::channel(RESPONSE_CHANNEL_CAPACITY);
        let writer_task = tokio::spawn(write_responses(writer, rx));
        let mut tasks = JoinSet::new();
        let mut lines = reader.lines();

        let read_result = loop {
            tokio::select! {
                biased;

                _ = shutdown.cancelled() => break Ok(()),

                Some(joined) = tasks.join_next(), if !tasks.is_empty() => {
                    if let Err(e) = joined {
                        error!("Tool task failed: {}", e);
                    }
                }

                line = lines.next_line() => match line {
                    Ok(Some(line)) => self.accept_line(line, &tx, &mut tasks).await,
                    Ok(None) => {
                        debug!("stdin closed (EOF)");
                        break Ok(());
                    }
                    Err(e) => {
                        break Err(WarehouseMcpError::protocol(format!(
                            "Failed to read request: {e}"
                        )));
                    }
                },
            }
        };

        if shutdown.is_cancelled() {
            tasks.abort_all();
        } else if !tasks.is_empty() {
            debug!("Waiting for {} in-flight tool calls", tasks.len());
            tokio::select! {
                _ = shutdown.cancelled() => tasks.abort_all(),
                _ = async { while tasks.join_next().await.is_some() {} } => {}
            }
        }

        drop(tx);
        let write_result = writer_task
            .await
            .map_err(|e| WarehouseMcpError::internal(format!("Writer task failed: {e}")))?;

        info!("MCP server shutting down");
        read_result.and(write_result)
    }

    /// Handles one input line, spawning a task for tool calls.
    async fn accept_line(
        &self,
        line: String,
        tx: &mpsc::Sender<JsonRpcResponse>,
        tasks: &mut JoinSet<()>,
    ) {
        if line.trim().is_empty() {
            return;
        }
        trace!("Received: {}", line);

        let request = match parse_request(&line) {
            Ok(request) => request,
            Err(response) => {
                let _ = tx.send(response).await;
                return;
            }
        };

        if request.method == methods::TOOLS_CALL && !request.is_notification() {
            let server = self.clone();
            let tx = tx.clone();
            tasks.spawn(async move {
                if let Some(response) = server.handle_request(request).await {
                    let _ = tx.send(response).await;
                }
            });
        } else if let Some(response) = self.handle_request(request).await {
            let _ = tx.send(response).await;
        }
    }

    /// Handles a single parsed request.
    ///
    /// Returns `None` for notifications, which never get a response.
    pub async fn handle_request(&self, request: JsonRpcRequest) -> Option<JsonRpcResponse> {
        if request.is_notification() {
            if request.method == methods::INITIALIZED {
                info!("Client initialized");
            } else {
                debug!("Ignoring notification: {}", request.method);
            }
            return None;
        }

        let id = request.id.clone();
        let response = match request.method.as_str() {
            methods::INITIALIZE => self.handle_initialize(request),
            methods::PING => JsonRpcResponse::success(id, Value::Object(Default::default())),
            methods::TOOLS_LIST => self.handle_tools_list(request),
            methods::TOOLS_CALL => self.handle_tools_call(request).await,
            other => {
                warn!("Unknown method: {}", other);
                JsonRpcResponse::error(id, JsonRpcError::method_not_found(other))
            }
        };
        Some(response)
    }

    fn handle_initialize(&self, request: JsonRpcRequest) -> JsonRpcResponse {
        if let Some(params) = request.params {
            match serde_json::from_value::<InitializeParams>(params) {
                Ok(params) => info!(
                    "Initialize from {} v{} (protocol {})",
                    params.client_info.name,
                    params.client_info.version,
                    params.protocol_version
                ),
                Err(e) => {
                    return JsonRpcResponse::error(
                        request.id,
                        JsonRpcError::invalid_params(format!("Invalid initialize params: {e}")),
                    );
                }
            }
        }

        let result = InitializeResult {
            protocol_version: MCP_PROTOCOL_VERSION.to_string(),
            capabilities: ServerCapabilities {
                tools: Some(ToolsCapability {
                    list_changed: false,
                }),
            },
            server_info: self.server_info.clone(),
        };
        to_success(request.id, &result)
    }

    fn handle_tools_list(&self, request: JsonRpcRequest) -> JsonRpcResponse {
        let result = ToolsListResult {
            tools: get_tool_definitions(),
        };
        to_success(request.id, &result)
    }

    async fn handle_tools_call(&self, request: JsonRpcRequest) -> JsonRpcResponse {
        let Some(params) = request.params else {
            return JsonRpcResponse::error(
                request.id,
                JsonRpcError::invalid_params("Missing tool call params"),
            );
        };
        let params: ToolsCallParams = match serde_json::from_value(params) {
            Ok(params) => params,
            Err(e) => {
                return JsonRpcResponse::error(
                    request.id,
                    JsonRpcError::invalid_params(format!("Invalid tool call params: {e}")),
                );
            }
        };
        let arguments: Arguments = match params.arguments {
            Value::Object(map) => map,
            Value::Null => Arguments::new(),
            _ => {
                return JsonRpcResponse::error(
                    request.id,
                    JsonRpcError::invalid_params("Tool arguments must be an object"),
                );
            }
        };

        info!("Tool call: {}", params.name);
        let response = self.dispatcher.dispatch(&params.name, &arguments).await;
        to_success(request.id, &ToolsCallResult::from(&response))
    }
}

/// Parses one line into a request, or the error response to send back.
fn parse_request(line: &str) -> std::result::Result<JsonRpcRequest, JsonRpcResponse> {
    let value: Value = serde_json::from_str(line).map_err(|e| {
        warn!("Failed to parse request: {}", e);
        JsonRpcResponse::error(None, JsonRpcError::parse_error(format!("Invalid JSON: {e}")))
    })?;

    let id = value
        .get("id")
        .cloned()
        .and_then(|id| serde_json::from_value(id).ok());

    let request: JsonRpcRequest = serde_json::from_value(value).map_err(|e| {
        JsonRpcResponse::error(
            id.clone(),
            JsonRpcError::invalid_request(format!("Invalid request: {e}")),
        )
    })?;

    if request.jsonrpc != JSONRPC_VERSION {
        return Err(JsonRpcResponse::error(
            id,
            JsonRpcError::invalid_request(format!(
                "Invalid JSON-RPC version: {}",
                request.jsonrpc
            )),
        ));
    }
    Ok(request)
}

fn to_success<T: serde::Serialize>(id: Option<RequestId>, result: &T) -> JsonRpcResponse {
    match serde_json::to_value(result) {
        Ok(value) => JsonRpcResponse::success(id, value),
        Err(e) => {
            error!("Failed to serialize result: {}", e);
            JsonRpcResponse::error(
                id,
                JsonRpcError::internal_error(format!("Failed to serialize result: {e}")),
            )
        }
    }
}

/// Writes each response as one JSON line, flushing after every message.
async fn write_responses<W>(mut writer: W, mut rx: mpsc::Receiver<JsonRpcResponse>) -> Result<()>
where
    W: AsyncWrite + Unpin,
{
    while let Some(response) = rx.recv().await {
        let mut json = serde_json::to_string(&response)
            .map_err(|e| WarehouseMcpError::protocol(format!("Failed to encode response: {e}")))?;
        json.push('\n');
        trace!("Sending: {}", json.trim_end());

        writer
            .write_all(json.as_bytes())
            .await
            .map_err(|e| WarehouseMcpError::protocol(format!("Failed to write response: {e}")))?;
        writer
            .flush()
            .await
            .map_err(|e| WarehouseMcpError::protocol(format!("Failed to flush stdout: {e}")))?;
    }
    Ok(())
}
