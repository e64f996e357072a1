//! Tool execution engine.
//!
//! The executor is the single pipeline every tool call goes through:
//! allow-list gate and validation first (either can short-circuit with an
//! error envelope, before any outbound call), then either a direct CRUD
//! primitive or one of the composite workflows, then response shaping.
//!
//! It is explicitly constructed and dependency-injected: the store is an
//! `Arc<dyn TableStore>` so tests substitute an in-memory fake, and the
//! directory is built once at startup and only ever read.

use crate::error::{ToolError, success_envelope};
use crate::shaper::{self, MAX_LIST_RECORDS};
use crate::validator::{self, ToolRequest};
use crate::workflow::Workflows;
use batchrow_client::{FieldFilter, RowQuery, TableStore};
use batchrow_core::{FilterMode, TableDirectory, row_id};
use serde_json::{Map, Value, json};
use std::sync::Arc;

/// Service-enforced page-size cap for `read`, matching the response-size
/// ceiling the shaper works to.
const READ_SIZE_CAP: u32 = MAX_LIST_RECORDS as u32;
/// `batch_create` issues creations in concurrent groups of this size.
const BATCH_CHUNK: usize = 10;

/// Executes validated tool calls against the table store.
#[derive(Clone)]
pub struct ToolExecutor {
    store: Arc<dyn TableStore>,
    tables: TableDirectory,
    filter_mode: FilterMode,
}

impl ToolExecutor {
    pub fn new(store: Arc<dyn TableStore>, tables: TableDirectory, filter_mode: FilterMode) -> Self {
        Self {
            store,
            tables,
            filter_mode,
        }
    }

    /// Run one tool call and produce the uniform response envelope. Never
    /// panics or propagates: every failure becomes an error envelope.
    pub async fn execute(&self, tool: &str, arguments: &Value) -> Value {
        if !validator::is_known_tool(tool) {
            return ToolError::UnknownTool { name: tool.to_string() }.into_envelope();
        }
        let request = match validator::validate(tool, arguments) {
            Ok(request) => request,
            Err(e) => return ToolError::from(e).into_envelope(),
        };

        tracing::debug!(tool, "executing tool call");
        match self.run(request).await {
            Ok((data, metadata)) => success_envelope(data, metadata),
            Err(e) => {
                tracing::debug!(tool, code = e.code(), "tool call failed");
                e.into_envelope()
            }
        }
    }

    async fn run(&self, request: ToolRequest) -> Result<(Value, Option<Value>), ToolError> {
        match request {
            ToolRequest::ListTables => {
                let tables: Map<String, Value> = self
                    .tables
                    .entries()
                    .map(|(name, id)| (name.as_str().to_string(), json!(id.0)))
                    .collect();
                Ok((Value::Object(tables), None))
            }

            ToolRequest::Read { table, filters, page, size } => {
                let (_, table_id) = self.tables.resolve(&table)?;
                let size = size.min(READ_SIZE_CAP);
                let mut query = RowQuery::page(page, size);
                for (field, value) in filters {
                    query = query.with_filter(FieldFilter {
                        field,
                        value,
                        mode: self.filter_mode,
                    });
                }
                let page_data = self.store.list_rows(table_id, query).await?;
                let shaped = shaper::shape_list(page_data.results, page_data.count);
                let data = json!({
                    "count": page_data.count,
                    "results": shaped.results,
                    "next": page_data.next,
                    "previous": page_data.previous,
                });
                let mut metadata = json!({"page": page, "size": size});
                if let Some(note) = shaped.note {
                    metadata["note"] = json!(note);
                }
                Ok((data, Some(metadata)))
            }

            ToolRequest::Create { table, data } => {
                let (_, table_id) = self.tables.resolve(&table)?;
                let row = self.store.create_row(table_id, data).await?;
                Ok((row, None))
            }

            ToolRequest::Update { table, record_id, data } => {
                let (_, table_id) = self.tables.resolve(&table)?;
                let row = self.store.update_row(table_id, record_id, data).await?;
                Ok((row, None))
            }

            ToolRequest::Delete { table, record_id } => {
                let (_, table_id) = self.tables.resolve(&table)?;
                self.store.delete_row(table_id, record_id).await?;
                Ok((json!({"deleted": true, "record_id": record_id}), None))
            }

            ToolRequest::BatchCreate { table, records } => {
                let (_, table_id) = self.tables.resolve(&table)?;
                let mut record_ids = Vec::with_capacity(records.len());
                // Bounded fan-out; a failing chunk aborts the rest with
                // earlier chunks already committed (no rollback).
                for chunk in records.chunks(BATCH_CHUNK) {
                    let creations = chunk
                        .iter()
                        .map(|record| self.store.create_row(table_id, record.clone()));
                    let created = futures::future::try_join_all(creations).await?;
                    record_ids.extend(created.iter().filter_map(row_id));
                }
                Ok((
                    json!({"created_count": record_ids.len(), "record_ids": record_ids}),
                    None,
                ))
            }

            ToolRequest::GetBom { fg_id, isku } => {
                let data = self.workflows().get_bom(fg_id, isku).await?;
                Ok((data, None))
            }

            ToolRequest::ProcessBpr(request) => {
                let data = self.workflows().process_bpr(request).await?;
                Ok((data, None))
            }

            ToolRequest::SearchParts { search_terms } => {
                let data = self.workflows().search_parts(search_terms).await?;
                Ok((data, None))
            }
        }
    }

    fn workflows(&self) -> Workflows<'_> {
        Workflows::new(self.store.as_ref(), &self.tables)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{FakeStore, full_directory, table_id};
    use batchrow_core::{TableId, TableName};
    use std::collections::BTreeMap;

    fn executor_with(store: Arc<FakeStore>) -> ToolExecutor {
        ToolExecutor::new(store, full_directory(), FilterMode::Equal)
    }

    #[tokio::test]
    async fn unknown_table_never_reaches_the_store() {
        let store = Arc::new(FakeStore::new());
        let executor = executor_with(store.clone());
        for (tool, args) in [
            ("read", json!({"table": "users"})),
            ("create", json!({"table": "users", "data": {"Name": "x"}})),
            ("update", json!({"table": "users", "record_id": 1, "data": {"Name": "x"}})),
            ("delete", json!({"table": "users", "record_id": 1})),
        ] {
            let envelope = executor.execute(tool, &args).await;
            assert_eq!(envelope["error"]["code"], "UNAUTHORIZED_TABLE_ACCESS", "{tool}");
            assert_eq!(envelope["error"]["details"]["table"], "users");
        }
        assert!(store.calls().is_empty());
    }

    #[tokio::test]
    async fn unconfigured_table_is_unauthorized_too() {
        let store = Arc::new(FakeStore::new());
        let mut ids = BTreeMap::new();
        ids.insert(TableName::Parts, TableId(601));
        let executor =
            ToolExecutor::new(store.clone(), TableDirectory::new(ids), FilterMode::Equal);
        let envelope = executor
            .execute("read", &json!({"table": "cycle_counts"}))
            .await;
        assert_eq!(envelope["error"]["code"], "UNAUTHORIZED_TABLE_ACCESS");
        assert!(store.calls().is_empty());
    }

    #[tokio::test]
    async fn unknown_tool_is_a_distinct_error() {
        let executor = executor_with(Arc::new(FakeStore::new()));
        let envelope = executor.execute("drop_table", &json!({})).await;
        assert_eq!(envelope["error"]["code"], "UNKNOWN_TOOL");
    }

    #[tokio::test]
    async fn validation_failure_short_circuits() {
        let store = Arc::new(FakeStore::new());
        let executor = executor_with(store.clone());
        let envelope = executor.execute("read", &json!({"size": 500})).await;
        assert_eq!(envelope["error"]["code"], "VALIDATION_ERROR");
        assert!(store.calls().is_empty());
    }

    #[tokio::test]
    async fn list_tables_reads_only_configuration() {
        let store = Arc::new(FakeStore::new());
        let executor = executor_with(store.clone());
        let envelope = executor.execute("list_tables", &json!({})).await;
        assert_eq!(envelope["success"], true);
        assert_eq!(envelope["data"]["parts"], 607);
        assert_eq!(envelope["data"].as_object().unwrap().len(), 9);
        assert!(store.calls().is_empty());
    }

    #[tokio::test]
    async fn read_clamps_size_to_the_service_cap() {
        let store = Arc::new(FakeStore::new());
        let parts = table_id(TableName::Parts);
        for i in 0..40 {
            store.seed(parts, json!({"Name": format!("part-{i}")}));
        }
        let executor = executor_with(store);
        let envelope = executor
            .execute("read", &json!({"table": "parts", "size": 200}))
            .await;
        assert_eq!(envelope["metadata"]["size"], 25);
        assert_eq!(envelope["data"]["results"].as_array().unwrap().len(), 25);
        assert_eq!(envelope["data"]["count"], 40);
    }

    #[tokio::test]
    async fn read_filtered_single_match_scenario() {
        let store = Arc::new(FakeStore::new());
        let parts = table_id(TableName::Parts);
        store.seed(parts, json!({"BOM ID": "RM-PWD-Stevia"}));
        store.seed(parts, json!({"BOM ID": "RM-PWD-Monk"}));
        let executor = executor_with(store);
        let envelope = executor
            .execute(
                "read",
                &json!({"table": "parts", "filters": {"BOM ID": "RM-PWD-Stevia"}, "page": 1, "size": 10}),
            )
            .await;
        let data = &envelope["data"];
        assert_eq!(data["count"], 1);
        assert_eq!(data["results"].as_array().unwrap().len(), 1);
        assert_eq!(data["next"], Value::Null);
        assert_eq!(data["previous"], Value::Null);
        assert_eq!(envelope["metadata"]["page"], 1);
        assert_eq!(envelope["metadata"]["size"], 10);
    }

    #[tokio::test]
    async fn create_then_read_round_trip() {
        let executor = executor_with(Arc::new(FakeStore::new()));
        let created = executor
            .execute(
                "create",
                &json!({"table": "parts", "data": {"BOM ID": "RM-PWD-Xylitol", "Reorder Level": 40}}),
            )
            .await;
        assert_eq!(created["success"], true);
        let read = executor
            .execute(
                "read",
                &json!({"table": "parts", "filters": {"BOM ID": "RM-PWD-Xylitol"}}),
            )
            .await;
        let row = &read["data"]["results"][0];
        assert_eq!(row["BOM ID"], "RM-PWD-Xylitol");
        assert_eq!(row["Reorder Level"], 40);
        assert_eq!(row["id"], created["data"]["id"]);
    }

    #[tokio::test]
    async fn update_is_partial_and_delete_is_final() {
        let store = Arc::new(FakeStore::new());
        let parts = table_id(TableName::Parts);
        let id = store.seed(parts, json!({"Name": "Stevia", "Reorder Level": 10}));
        let executor = executor_with(store.clone());

        let updated = executor
            .execute(
                "update",
                &json!({"table": "parts", "record_id": id, "data": {"Reorder Level": 20}}),
            )
            .await;
        assert_eq!(updated["data"]["Reorder Level"], 20);
        assert_eq!(updated["data"]["Name"], "Stevia");

        let deleted = executor
            .execute("delete", &json!({"table": "parts", "record_id": id}))
            .await;
        assert_eq!(deleted["data"]["deleted"], true);
        assert!(store.rows_in(parts).is_empty());
    }

    #[tokio::test]
    async fn delete_missing_row_surfaces_the_api_error() {
        let executor = executor_with(Arc::new(FakeStore::new()));
        let envelope = executor
            .execute("delete", &json!({"table": "parts", "record_id": 42}))
            .await;
        assert_eq!(envelope["error"]["code"], "API_ERROR");
        assert_eq!(envelope["error"]["details"]["status"], 404);
    }

    #[tokio::test]
    async fn batch_create_creates_everything_in_chunks() {
        let store = Arc::new(FakeStore::new());
        let executor = executor_with(store.clone());
        let records: Vec<Value> = (0..25).map(|i| json!({"Name": format!("p{i}")})).collect();
        let envelope = executor
            .execute("batch_create", &json!({"table": "parts", "records": records}))
            .await;
        assert_eq!(envelope["data"]["created_count"], 25);
        assert_eq!(envelope["data"]["record_ids"].as_array().unwrap().len(), 25);
        assert_eq!(store.rows_in(table_id(TableName::Parts)).len(), 25);
    }

    #[tokio::test]
    async fn batch_create_fails_fast_keeping_earlier_chunks() {
        let store = Arc::new(FakeStore::new());
        store.fail_creates_after(10);
        let executor = executor_with(store.clone());
        let records: Vec<Value> = (0..30).map(|i| json!({"Name": format!("p{i}")})).collect();
        let envelope = executor
            .execute("batch_create", &json!({"table": "parts", "records": records}))
            .await;
        assert_eq!(envelope["error"]["code"], "API_ERROR");
        // The first chunk of ten is committed; nothing past the failure is.
        assert_eq!(store.rows_in(table_id(TableName::Parts)).len(), 10);
    }
}
