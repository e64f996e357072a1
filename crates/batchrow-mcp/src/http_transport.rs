//! HTTP transport for the MCP server.
//!
//! Serves the same JSON-RPC surface as stdio over `POST /mcp`, plus a
//! `GET /health` liveness probe. The server is shared state behind an `Arc`;
//! requests are handled directly in the axum handler.

use crate::error::McpError;
use crate::protocol::JsonRpcRequest;
use crate::server::McpServer;
use axum::{
    Json, Router,
    extract::State,
    response::IntoResponse,
    routing::{get, post},
};
use serde_json::json;
use std::sync::Arc;
use tower_http::trace::TraceLayer;

/// Build the HTTP router for MCP.
pub fn create_router(server: Arc<McpServer>) -> Router {
    Router::new()
        .route("/mcp", post(handle_mcp_post))
        .route("/health", get(handle_health))
        .layer(TraceLayer::new_for_http())
        .with_state(server)
}

/// Bind and serve until the process is stopped.
pub async fn run_http(server: Arc<McpServer>, port: u16) -> Result<(), McpError> {
    let app = create_router(server);
    let addr = format!("0.0.0.0:{port}");
    tracing::info!(%addr, "starting MCP server with HTTP transport");
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .map_err(|e| McpError::StartupFailed(format!("failed to bind {addr}: {e}")))?;
    axum::serve(listener, app)
        .await
        .map_err(|e| McpError::StartupFailed(e.to_string()))?;
    Ok(())
}

async fn handle_mcp_post(
    State(server): State<Arc<McpServer>>,
    Json(request): Json<JsonRpcRequest>,
) -> impl IntoResponse {
    Json(server.handle_request(request).await)
}

async fn handle_health() -> impl IntoResponse {
    Json(json!({"status": "ok", "version": env!("CARGO_PKG_VERSION")}))
}
