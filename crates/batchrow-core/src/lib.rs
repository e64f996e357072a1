//! # batchrow-core
//!
//! Shared foundation for the Batchrow MCP proxy: configuration loaded from the
//! process environment, the static table allow-list, and the record/link
//! model used when reading rows back from Baserow.
//!
//! Everything in this crate is constructed once at startup and read-only
//! afterwards; no module here performs I/O beyond reading environment
//! variables.

pub mod config;
pub mod record;
pub mod tables;

pub use config::{ConfigError, FilterMode, Settings};
pub use record::{LinkRef, LinkReference, field_f64, field_link, field_str, row_id};
pub use tables::{TableDirectory, TableId, TableName, UnauthorizedTable};
