//! The `TableStore` trait and its request/response types.

use async_trait::async_trait;
use batchrow_core::{FilterMode, TableId};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Transport-level failure, split so callers can always tell a remote
/// rejection from a request that never completed.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// The remote store responded with a non-success status.
    #[error("Baserow API error: status {status}")]
    Api {
        status: u16,
        /// Raw response body, preserved verbatim for diagnosis.
        body: String,
    },

    /// The request never reached, or never returned from, the remote store.
    #[error("connection to Baserow failed: {0}")]
    Connection(#[source] reqwest::Error),
}

/// One exact-match or contains filter on a field.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldFilter {
    pub field: String,
    pub value: String,
    pub mode: FilterMode,
}

impl FieldFilter {
    pub fn equal(field: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            value: value.into(),
            mode: FilterMode::Equal,
        }
    }
}

/// Parameters for a list call. Pagination is 1-based, matching the rows API.
#[derive(Debug, Clone)]
pub struct RowQuery {
    pub page: u32,
    pub size: u32,
    pub filters: Vec<FieldFilter>,
}

impl RowQuery {
    pub fn page(page: u32, size: u32) -> Self {
        Self {
            page,
            size,
            filters: Vec::new(),
        }
    }

    pub fn with_filter(mut self, filter: FieldFilter) -> Self {
        self.filters.push(filter);
        self
    }
}

/// One page of rows as reported by the store.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RowPage {
    pub count: u64,
    #[serde(default)]
    pub next: Option<String>,
    #[serde(default)]
    pub previous: Option<String>,
    pub results: Vec<Value>,
}

/// The five row primitives. Each call maps to exactly one HTTP request; the
/// implementation performs no retries and no caching.
#[async_trait]
pub trait TableStore: Send + Sync {
    async fn list_rows(&self, table: TableId, query: RowQuery) -> Result<RowPage, StoreError>;

    async fn get_row(&self, table: TableId, row_id: u64) -> Result<Value, StoreError>;

    async fn create_row(
        &self,
        table: TableId,
        fields: Map<String, Value>,
    ) -> Result<Value, StoreError>;

    /// Partial update: only the supplied fields change.
    async fn update_row(
        &self,
        table: TableId,
        row_id: u64,
        fields: Map<String, Value>,
    ) -> Result<Value, StoreError>;

    /// Unconditional and irreversible.
    async fn delete_row(&self, table: TableId, row_id: u64) -> Result<(), StoreError>;
}
