//! In-memory test doubles.
//!
//! `FakeStore` implements [`TableStore`] over per-table row vectors, records
//! every call it receives (so tests can assert that denied requests never
//! reached the store), and can be told to start failing creates after N
//! successes to exercise the partial-failure paths.

use async_trait::async_trait;
use batchrow_client::{RowPage, RowQuery, StoreError, TableStore};
use batchrow_core::{FilterMode, TableDirectory, TableId, TableName};
use serde_json::{Map, Value, json};
use std::collections::BTreeMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};

/// A directory with every table configured, ids 601..=609.
pub(crate) fn full_directory() -> TableDirectory {
    let ids = TableName::ALL
        .iter()
        .enumerate()
        .map(|(i, t)| (*t, TableId(601 + i as u64)))
        .collect::<BTreeMap<_, _>>();
    TableDirectory::new(ids)
}

pub(crate) fn table_id(table: TableName) -> TableId {
    full_directory().id_of(table).unwrap()
}

#[derive(Default)]
pub(crate) struct FakeStore {
    rows: Mutex<BTreeMap<u64, Vec<Value>>>,
    next_id: AtomicU64,
    calls: Mutex<Vec<String>>,
    /// When set, creates beyond this many (counted from now) fail with a 400.
    creates_before_failure: Mutex<Option<u64>>,
}

impl FakeStore {
    pub fn new() -> Self {
        Self {
            next_id: AtomicU64::new(1),
            ..Default::default()
        }
    }

    /// Seed a row; returns its assigned id.
    pub fn seed(&self, table: TableId, fields: Value) -> u64 {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        let mut row = json!({"id": id, "order": format!("{id}.0")});
        if let (Some(target), Some(source)) = (row.as_object_mut(), fields.as_object()) {
            for (k, v) in source {
                target.insert(k.clone(), v.clone());
            }
        }
        self.rows.lock().unwrap().entry(table.0).or_default().push(row);
        id
    }

    pub fn fail_creates_after(&self, successes: u64) {
        *self.creates_before_failure.lock().unwrap() = Some(successes);
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    pub fn calls_matching(&self, prefix: &str) -> usize {
        self.calls().iter().filter(|c| c.starts_with(prefix)).count()
    }

    pub fn rows_in(&self, table: TableId) -> Vec<Value> {
        self.rows.lock().unwrap().get(&table.0).cloned().unwrap_or_default()
    }

    fn record(&self, call: String) {
        self.calls.lock().unwrap().push(call);
    }

    fn render(value: &Value) -> String {
        match value {
            Value::String(s) => s.clone(),
            Value::Number(n) => n.to_string(),
            Value::Bool(b) => b.to_string(),
            other => other.to_string(),
        }
    }

    fn matches(row: &Value, query: &RowQuery) -> bool {
        query.filters.iter().all(|f| {
            let Some(value) = row.get(&f.field) else {
                return false;
            };
            let rendered = Self::render(value);
            match f.mode {
                FilterMode::Equal => rendered == f.value,
                FilterMode::Contains => rendered.contains(&f.value),
            }
        })
    }
}

#[async_trait]
impl TableStore for FakeStore {
    async fn list_rows(&self, table: TableId, query: RowQuery) -> Result<RowPage, StoreError> {
        self.record(format!("list:{table}"));
        let all = self.rows_in(table);
        let matched: Vec<Value> = all.into_iter().filter(|r| Self::matches(r, &query)).collect();
        let count = matched.len() as u64;
        let start = ((query.page.max(1) - 1) as usize) * query.size as usize;
        let end = (start + query.size as usize).min(matched.len());
        let results = if start < matched.len() {
            matched[start..end].to_vec()
        } else {
            Vec::new()
        };
        Ok(RowPage {
            count,
            next: (end < matched.len()).then(|| format!("page={}", query.page + 1)),
            previous: (query.page > 1).then(|| format!("page={}", query.page - 1)),
            results,
        })
    }

    async fn get_row(&self, table: TableId, row_id: u64) -> Result<Value, StoreError> {
        self.record(format!("get:{table}:{row_id}"));
        self.rows_in(table)
            .into_iter()
            .find(|r| r.get("id").and_then(Value::as_u64) == Some(row_id))
            .ok_or(StoreError::Api {
                status: 404,
                body: "{\"error\":\"ERROR_ROW_DOES_NOT_EXIST\"}".into(),
            })
    }

    async fn create_row(
        &self,
        table: TableId,
        fields: Map<String, Value>,
    ) -> Result<Value, StoreError> {
        self.record(format!("create:{table}"));
        let mut plan = self.creates_before_failure.lock().unwrap();
        if let Some(remaining) = plan.as_mut() {
            if *remaining == 0 {
                return Err(StoreError::Api {
                    status: 400,
                    body: "{\"error\":\"ERROR_REQUEST_BODY_VALIDATION\"}".into(),
                });
            }
            *remaining -= 1;
        }
        drop(plan);
        let id = self.seed(table, Value::Object(fields));
        self.rows_in(table)
            .into_iter()
            .find(|r| r.get("id").and_then(Value::as_u64) == Some(id))
            .ok_or(StoreError::Api {
                status: 500,
                body: "row vanished after insert".into(),
            })
    }

    async fn update_row(
        &self,
        table: TableId,
        row_id: u64,
        fields: Map<String, Value>,
    ) -> Result<Value, StoreError> {
        self.record(format!("update:{table}:{row_id}"));
        let mut rows = self.rows.lock().unwrap();
        let table_rows = rows.entry(table.0).or_default();
        let row = table_rows
            .iter_mut()
            .find(|r| r.get("id").and_then(Value::as_u64) == Some(row_id))
            .ok_or(StoreError::Api {
                status: 404,
                body: "{\"error\":\"ERROR_ROW_DOES_NOT_EXIST\"}".into(),
            })?;
        if let Some(target) = row.as_object_mut() {
            for (k, v) in fields {
                target.insert(k, v);
            }
        }
        Ok(row.clone())
    }

    async fn delete_row(&self, table: TableId, row_id: u64) -> Result<(), StoreError> {
        self.record(format!("delete:{table}:{row_id}"));
        let mut rows = self.rows.lock().unwrap();
        let table_rows = rows.entry(table.0).or_default();
        let before = table_rows.len();
        table_rows.retain(|r| r.get("id").and_then(Value::as_u64) != Some(row_id));
        if table_rows.len() == before {
            return Err(StoreError::Api {
                status: 404,
                body: "{\"error\":\"ERROR_ROW_DOES_NOT_EXIST\"}".into(),
            });
        }
        Ok(())
    }
}
