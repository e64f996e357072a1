//! Error types and the uniform response envelope.
//!
//! Every tool call answers with the same two shapes:
//! `{success: true, data, metadata?}` or
//! `{success: false, error: {code, message, details?}}`. Nothing is ever
//! thrown raw across the tool-call boundary; [`ToolError::into_envelope`] is
//! the single conversion point.

use crate::validator::ValidationError;
use batchrow_client::StoreError;
use batchrow_core::UnauthorizedTable;
use serde_json::{Value, json};
use thiserror::Error;

/// A failure of one tool call, by kind.
#[derive(Debug, Error)]
pub enum ToolError {
    /// Malformed or out-of-bounds input.
    #[error("{0}")]
    Validation(#[from] ValidationError),

    /// The tool name maps to no known command. Distinct from validation.
    #[error("unknown tool: {name}")]
    UnknownTool { name: String },

    /// Table outside the allow-list or unconfigured.
    #[error(transparent)]
    Unauthorized(#[from] UnauthorizedTable),

    /// Remote API rejection or transport failure.
    #[error(transparent)]
    Store(#[from] StoreError),

    /// No manufacturing order with the given number.
    #[error("manufacturing order '{mo_number}' not found")]
    MoNotFound { mo_number: String },

    /// No finished good with the given iSKU.
    #[error("finished good with iSKU '{isku}' not found")]
    FgNotFound { isku: String },

    /// One or more bom_ids did not resolve. All-or-nothing: nothing was created.
    #[error("BOM mappings not found: {}", missing.iter().map(|id| id.to_string()).collect::<Vec<_>>().join(", "))]
    BomNotFound { missing: Vec<u64> },

    /// Workflow precondition not met (e.g. neither fg_id nor isku given).
    #[error("{message}")]
    InvalidRequest { message: String },

    /// Anything else. Logged in full, surfaced generically.
    #[error("internal error")]
    Internal(String),
}

impl ToolError {
    /// Stable machine-readable code for the envelope.
    pub fn code(&self) -> &'static str {
        match self {
            ToolError::Validation(_) => "VALIDATION_ERROR",
            ToolError::UnknownTool { .. } => "UNKNOWN_TOOL",
            ToolError::Unauthorized(_) => "UNAUTHORIZED_TABLE_ACCESS",
            ToolError::Store(StoreError::Api { .. }) => "API_ERROR",
            ToolError::Store(StoreError::Connection(_)) => "CONNECTION_ERROR",
            ToolError::MoNotFound { .. } => "MO_NOT_FOUND",
            ToolError::FgNotFound { .. } => "FG_NOT_FOUND",
            ToolError::BomNotFound { .. } => "BOM_NOT_FOUND",
            ToolError::InvalidRequest { .. } => "INVALID_REQUEST",
            ToolError::Internal(_) => "INTERNAL_ERROR",
        }
    }

    /// Structured details, where the kind carries any.
    pub fn details(&self) -> Option<Value> {
        match self {
            ToolError::Validation(e) => Some(json!({
                "violations": e
                    .violations
                    .iter()
                    .map(|v| json!({"field": v.field, "reason": v.reason}))
                    .collect::<Vec<_>>()
            })),
            ToolError::Unauthorized(e) => Some(json!({"table": e.table})),
            ToolError::Store(StoreError::Api { status, body }) => {
                Some(json!({"status": status, "body": body}))
            }
            ToolError::Store(StoreError::Connection(source)) => {
                Some(json!({"cause": source.to_string()}))
            }
            ToolError::BomNotFound { missing } => Some(json!({"missing_bom_ids": missing})),
            _ => None,
        }
    }

    /// Convert into the uniform error envelope.
    pub fn into_envelope(self) -> Value {
        if let ToolError::Internal(detail) = &self {
            tracing::error!(%detail, "tool call failed with an internal error");
        }
        let mut error = json!({
            "code": self.code(),
            "message": self.to_string(),
        });
        if let Some(details) = self.details() {
            error["details"] = details;
        }
        json!({"success": false, "error": error})
    }
}

/// Build the uniform success envelope.
pub fn success_envelope(data: Value, metadata: Option<Value>) -> Value {
    match metadata {
        Some(metadata) => json!({"success": true, "data": data, "metadata": metadata}),
        None => json!({"success": true, "data": data}),
    }
}

/// Server-level failures (transport and framing, not tool semantics).
#[derive(Debug, Error)]
pub enum McpError {
    #[error("failed to start MCP server: {0}")]
    StartupFailed(String),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
