//! MCP server implementation.
//!
//! Handles the JSON-RPC method surface (`initialize`, `tools/list`,
//! `tools/call`, `shutdown`) and delegates every tool call to the
//! [`ToolExecutor`]. Tool-level failures, including unknown tool names, are
//! reported inside the tool result envelope; JSON-RPC errors are reserved for
//! protocol-level problems such as malformed params or unknown methods.

use crate::error::McpError;
use crate::executor::ToolExecutor;
use crate::protocol::{CallToolParams, JsonRpcRequest, JsonRpcResponse};
use crate::tools::ToolCatalog;
use serde_json::{Value, json};
use std::io::{BufRead, Write};

/// The MCP server.
pub struct McpServer {
    catalog: ToolCatalog,
    executor: ToolExecutor,
}

impl McpServer {
    pub fn new(executor: ToolExecutor) -> Self {
        Self {
            catalog: ToolCatalog::new(),
            executor,
        }
    }

    /// Run the server over stdio, one JSON-RPC message per line.
    pub async fn run_stdio(&self) -> Result<(), McpError> {
        tracing::info!("starting MCP server with stdio transport");

        let stdin = std::io::stdin();
        let stdout = std::io::stdout();
        let mut stdout_lock = stdout.lock();

        for line in stdin.lock().lines() {
            let line = line?;
            if line.is_empty() {
                continue;
            }

            let response = match serde_json::from_str::<JsonRpcRequest>(&line) {
                Ok(request) => self.handle_request(request).await,
                Err(e) => JsonRpcResponse::error(None, -32700, format!("Parse error: {e}")),
            };
            let response_json = serde_json::to_string(&response)?;

            writeln!(stdout_lock, "{response_json}")?;
            stdout_lock.flush()?;
        }

        Ok(())
    }

    /// Handle a JSON-RPC request.
    pub async fn handle_request(&self, request: JsonRpcRequest) -> JsonRpcResponse {
        let id = request.id.clone();

        match request.method.as_str() {
            "initialize" => self.handle_initialize(id),
            "initialized" => JsonRpcResponse::success(id, json!({})),
            "tools/list" => self.handle_list_tools(id),
            "tools/call" => self.handle_call_tool(id, request.params).await,
            "shutdown" => self.handle_shutdown(id),
            _ => JsonRpcResponse::error(
                id,
                -32601,
                format!("Method not found: {}", request.method),
            ),
        }
    }

    fn handle_initialize(&self, id: Option<Value>) -> JsonRpcResponse {
        let result = json!({
            "protocolVersion": "2024-11-05",
            "serverInfo": {
                "name": "batchrow-mcp",
                "version": env!("CARGO_PKG_VERSION")
            },
            "capabilities": {
                "tools": {
                    "listChanged": false
                }
            }
        });
        JsonRpcResponse::success(id, result)
    }

    fn handle_list_tools(&self, id: Option<Value>) -> JsonRpcResponse {
        JsonRpcResponse::success(id, json!({"tools": self.catalog.definitions()}))
    }

    async fn handle_call_tool(&self, id: Option<Value>, params: Option<Value>) -> JsonRpcResponse {
        let params: CallToolParams = match params {
            Some(p) => match serde_json::from_value(p) {
                Ok(params) => params,
                Err(e) => {
                    return JsonRpcResponse::error(id, -32602, format!("Invalid params: {e}"));
                }
            },
            None => return JsonRpcResponse::error(id, -32602, "Missing params"),
        };

        let envelope = self.executor.execute(&params.name, &params.arguments).await;
        let is_error = envelope["success"] != json!(true);
        let result = json!({
            "content": [{"type": "json", "json": envelope}],
            "isError": is_error
        });
        JsonRpcResponse::success(id, result)
    }

    fn handle_shutdown(&self, id: Option<Value>) -> JsonRpcResponse {
        tracing::info!("MCP server shutdown requested");
        JsonRpcResponse::success(id, json!(null))
    }
}
