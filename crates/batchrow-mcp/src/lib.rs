//! # batchrow-mcp
//!
//! MCP server for Baserow-backed batch production data. Exposes a fixed set
//! of nine tools over stdio or HTTP; every call flows through the same
//! pipeline of allow-list check, validation, execution, and response shaping,
//! and answers with a uniform success/error envelope.

pub mod error;
pub mod executor;
pub mod http_transport;
pub mod protocol;
pub mod server;
pub mod shaper;
pub mod tools;
pub mod validator;
pub mod workflow;

#[cfg(test)]
pub(crate) mod testing;

pub use error::{McpError, ToolError};
pub use executor::ToolExecutor;
pub use server::McpServer;
