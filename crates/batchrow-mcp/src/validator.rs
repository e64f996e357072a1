//! Request validation for tool calls.
//!
//! Each tool has its own schema: required/optional fields, primitive types
//! and numeric bounds. Validation runs to completion and reports every
//! violation (field path + reason) at once; a request either parses into a
//! fully-typed [`ToolRequest`] or fails; there is no partial result, and no
//! network call happens before validation passes.

use chrono::NaiveDate;
use serde_json::{Map, Value};
use std::fmt;

/// Page size ceiling accepted on `read` (the rows API maximum).
pub const MAX_PAGE_SIZE: u64 = 200;
/// Maximum number of records accepted by `batch_create`.
pub const MAX_BATCH_RECORDS: usize = 50;
/// Default page size when `read` omits `size`.
pub const DEFAULT_PAGE_SIZE: u64 = 100;

/// One field-level violation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Violation {
    pub field: String,
    pub reason: String,
}

impl Violation {
    pub fn new(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            reason: reason.into(),
        }
    }
}

/// Malformed input: the full list of violations found.
#[derive(Debug, Clone)]
pub struct ValidationError {
    pub violations: Vec<Violation>,
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid arguments: ")?;
        for (i, v) in self.violations.iter().enumerate() {
            if i > 0 {
                write!(f, "; ")?;
            }
            write!(f, "{} {}", v.field, v.reason)?;
        }
        Ok(())
    }
}

impl std::error::Error for ValidationError {}

/// A strongly-typed, validated tool request.
#[derive(Debug, Clone, PartialEq)]
pub enum ToolRequest {
    ListTables,
    Read {
        table: String,
        filters: Vec<(String, String)>,
        page: u32,
        size: u32,
    },
    Create {
        table: String,
        data: Map<String, Value>,
    },
    Update {
        table: String,
        record_id: u64,
        data: Map<String, Value>,
    },
    Delete {
        table: String,
        record_id: u64,
    },
    BatchCreate {
        table: String,
        records: Vec<Map<String, Value>>,
    },
    GetBom {
        fg_id: Option<u64>,
        isku: Option<String>,
    },
    ProcessBpr(BprRequest),
    SearchParts {
        search_terms: Vec<String>,
    },
}

/// Validated `process_bpr` input.
#[derive(Debug, Clone, PartialEq)]
pub struct BprRequest {
    pub mo_number: String,
    /// ISO date (`YYYY-MM-DD`), validated but kept as a string for the store.
    pub completion_date: String,
    pub gross_produced: f64,
    pub entered_by: Option<String>,
    pub parts_usage: Vec<PartsUsageItem>,
}

/// One parts-usage line. `lot_id`/`label_id` take precedence over
/// `lot_number`/`label_code` when both forms are present.
#[derive(Debug, Clone, PartialEq)]
pub struct PartsUsageItem {
    pub bom_id: u64,
    pub quantity: f64,
    pub lot_id: Option<u64>,
    pub lot_number: Option<String>,
    pub label_id: Option<u64>,
    pub label_code: Option<String>,
    pub waste: Option<f64>,
    pub notes: Option<String>,
}

/// The set of recognized tool names.
pub const TOOL_NAMES: [&str; 9] = [
    "list_tables",
    "read",
    "create",
    "update",
    "delete",
    "batch_create",
    "get_bom",
    "process_bpr",
    "search_parts",
];

/// True when `name` maps to a known command.
pub fn is_known_tool(name: &str) -> bool {
    TOOL_NAMES.contains(&name)
}

/// Parse and validate a tool call. `Err(None)` is never returned: an
/// unrecognized tool name must be rejected by the caller (a distinct
/// condition from validation failure) before calling this.
pub fn validate(tool: &str, args: &Value) -> Result<ToolRequest, ValidationError> {
    let mut reader = ArgReader::new(args);
    let request = match tool {
        "list_tables" => Some(ToolRequest::ListTables),
        "read" => {
            let table = reader.required_str("table");
            let filters = reader.optional_filters("filters");
            let page = reader.optional_bounded("page", 1, u32::MAX as u64, 1);
            let size = reader.optional_bounded("size", 1, MAX_PAGE_SIZE, DEFAULT_PAGE_SIZE);
            table.map(|table| ToolRequest::Read {
                table,
                filters: filters.unwrap_or_default(),
                page: page as u32,
                size: size as u32,
            })
        }
        "create" => {
            let table = reader.required_str("table");
            let data = reader.required_object("data");
            match (table, data) {
                (Some(table), Some(data)) => Some(ToolRequest::Create { table, data }),
                _ => None,
            }
        }
        "update" => {
            let table = reader.required_str("table");
            let record_id = reader.required_id("record_id");
            let data = reader.required_object("data");
            match (table, record_id, data) {
                (Some(table), Some(record_id), Some(data)) => {
                    Some(ToolRequest::Update { table, record_id, data })
                }
                _ => None,
            }
        }
        "delete" => {
            let table = reader.required_str("table");
            let record_id = reader.required_id("record_id");
            match (table, record_id) {
                (Some(table), Some(record_id)) => Some(ToolRequest::Delete { table, record_id }),
                _ => None,
            }
        }
        "batch_create" => {
            let table = reader.required_str("table");
            let records = reader.required_records("records");
            match (table, records) {
                (Some(table), Some(records)) => Some(ToolRequest::BatchCreate { table, records }),
                _ => None,
            }
        }
        "get_bom" => {
            let fg_id = reader.optional_id("fg_id");
            let isku = reader.optional_str("isku");
            Some(ToolRequest::GetBom { fg_id, isku })
        }
        "process_bpr" => reader.bpr_request().map(ToolRequest::ProcessBpr),
        "search_parts" => reader
            .required_string_array("search_terms")
            .map(|search_terms| ToolRequest::SearchParts { search_terms }),
        // Guarded by is_known_tool at the dispatch layer.
        _ => {
            reader.add("tool", format!("'{tool}' is not a recognized tool"));
            None
        }
    };

    match request {
        Some(request) if reader.violations.is_empty() => Ok(request),
        _ => Err(ValidationError {
            violations: reader.violations,
        }),
    }
}

/// Accumulating reader over a loose argument object.
struct ArgReader<'a> {
    args: &'a Value,
    violations: Vec<Violation>,
}

impl<'a> ArgReader<'a> {
    fn new(args: &'a Value) -> Self {
        Self {
            args,
            violations: Vec::new(),
        }
    }

    fn add(&mut self, field: &str, reason: impl Into<String>) {
        self.violations.push(Violation::new(field, reason));
    }

    fn get(&self, field: &str) -> Option<&'a Value> {
        match self.args.get(field) {
            Some(Value::Null) | None => None,
            Some(v) => Some(v),
        }
    }

    fn required_str(&mut self, field: &str) -> Option<String> {
        match self.get(field) {
            Some(Value::String(s)) if !s.trim().is_empty() => Some(s.clone()),
            Some(Value::String(_)) => {
                self.add(field, "must not be empty");
                None
            }
            Some(_) => {
                self.add(field, "must be a string");
                None
            }
            None => {
                self.add(field, "is required");
                None
            }
        }
    }

    fn optional_str(&mut self, field: &str) -> Option<String> {
        match self.get(field) {
            Some(Value::String(s)) if !s.trim().is_empty() => Some(s.clone()),
            Some(Value::String(_)) | None => None,
            Some(_) => {
                self.add(field, "must be a string");
                None
            }
        }
    }

    /// A positive integer identifier.
    fn required_id(&mut self, field: &str) -> Option<u64> {
        match self.get(field) {
            Some(v) => self.parse_id(field, v),
            None => {
                self.add(field, "is required");
                None
            }
        }
    }

    fn optional_id(&mut self, field: &str) -> Option<u64> {
        self.get(field).and_then(|v| self.parse_id(field, v))
    }

    fn parse_id(&mut self, field: &str, value: &Value) -> Option<u64> {
        match value.as_u64() {
            Some(id) if id > 0 => Some(id),
            _ => {
                self.add(field, "must be a positive integer");
                None
            }
        }
    }

    /// An optional integer clamped only by validation bounds; out-of-range is
    /// a violation, not a silent clamp (service-level caps clamp later).
    fn optional_bounded(&mut self, field: &str, min: u64, max: u64, default: u64) -> u64 {
        match self.get(field) {
            Some(v) => match v.as_u64() {
                Some(n) if n >= min && n <= max => n,
                _ => {
                    self.add(field, format!("must be an integer between {min} and {max}"));
                    default
                }
            },
            None => default,
        }
    }

    fn required_object(&mut self, field: &str) -> Option<Map<String, Value>> {
        match self.get(field) {
            Some(Value::Object(map)) if !map.is_empty() => Some(map.clone()),
            Some(Value::Object(_)) => {
                self.add(field, "must not be empty");
                None
            }
            Some(_) => {
                self.add(field, "must be an object");
                None
            }
            None => {
                self.add(field, "is required");
                None
            }
        }
    }

    /// `filters` is an optional flat object of scalar values.
    fn optional_filters(&mut self, field: &str) -> Option<Vec<(String, String)>> {
        let map = match self.get(field) {
            Some(Value::Object(map)) => map,
            Some(_) => {
                self.add(field, "must be an object of field/value pairs");
                return None;
            }
            None => return None,
        };
        let mut filters = Vec::with_capacity(map.len());
        for (name, value) in map {
            let rendered = match value {
                Value::String(s) => s.clone(),
                Value::Number(n) => n.to_string(),
                Value::Bool(b) => b.to_string(),
                _ => {
                    self.add(
                        &format!("{field}.{name}"),
                        "must be a string, number or boolean",
                    );
                    continue;
                }
            };
            filters.push((name.clone(), rendered));
        }
        Some(filters)
    }

    fn required_records(&mut self, field: &str) -> Option<Vec<Map<String, Value>>> {
        let items = match self.get(field) {
            Some(Value::Array(items)) => items,
            Some(_) => {
                self.add(field, "must be an array");
                return None;
            }
            None => {
                self.add(field, "is required");
                return None;
            }
        };
        if items.is_empty() {
            self.add(field, "must contain at least one record");
            return None;
        }
        if items.len() > MAX_BATCH_RECORDS {
            self.add(
                field,
                format!("must contain at most {MAX_BATCH_RECORDS} records"),
            );
            return None;
        }
        let mut records = Vec::with_capacity(items.len());
        for (i, item) in items.iter().enumerate() {
            match item {
                Value::Object(map) if !map.is_empty() => records.push(map.clone()),
                _ => self.add(&format!("{field}[{i}]"), "must be a non-empty object"),
            }
        }
        (records.len() == items.len()).then_some(records)
    }

    fn required_string_array(&mut self, field: &str) -> Option<Vec<String>> {
        let items = match self.get(field) {
            Some(Value::Array(items)) => items,
            Some(_) => {
                self.add(field, "must be an array of strings");
                return None;
            }
            None => {
                self.add(field, "is required");
                return None;
            }
        };
        if items.is_empty() {
            self.add(field, "must contain at least one entry");
            return None;
        }
        let mut terms = Vec::with_capacity(items.len());
        for (i, item) in items.iter().enumerate() {
            match item {
                Value::String(s) if !s.trim().is_empty() => terms.push(s.clone()),
                _ => self.add(&format!("{field}[{i}]"), "must be a non-empty string"),
            }
        }
        (terms.len() == items.len()).then_some(terms)
    }

    fn optional_number(&mut self, field: &str) -> Option<f64> {
        match self.get(field) {
            Some(v) => match v.as_f64() {
                Some(n) if n >= 0.0 => Some(n),
                _ => {
                    self.add(field, "must be a non-negative number");
                    None
                }
            },
            None => None,
        }
    }

    fn required_number(&mut self, field: &str) -> Option<f64> {
        match self.get(field) {
            Some(v) => match v.as_f64() {
                Some(n) if n >= 0.0 => Some(n),
                _ => {
                    self.add(field, "must be a non-negative number");
                    None
                }
            },
            None => {
                self.add(field, "is required");
                None
            }
        }
    }

    fn bpr_request(&mut self) -> Option<BprRequest> {
        let mo_number = self.required_str("mo_number");
        let completion_date = self.required_str("completion_date").and_then(|raw| {
            match NaiveDate::parse_from_str(&raw, "%Y-%m-%d") {
                Ok(_) => Some(raw),
                Err(_) => {
                    self.add("completion_date", "must be an ISO date (YYYY-MM-DD)");
                    None
                }
            }
        });
        let gross_produced = self.required_number("gross_produced");
        let entered_by = self.optional_str("entered_by");
        let parts_usage = self.usage_items("parts_usage");

        match (mo_number, completion_date, gross_produced, parts_usage) {
            (Some(mo_number), Some(completion_date), Some(gross_produced), Some(parts_usage)) => {
                Some(BprRequest {
                    mo_number,
                    completion_date,
                    gross_produced,
                    entered_by,
                    parts_usage,
                })
            }
            _ => None,
        }
    }

    fn usage_items(&mut self, field: &str) -> Option<Vec<PartsUsageItem>> {
        let items = match self.get(field) {
            Some(Value::Array(items)) => items.clone(),
            Some(_) => {
                self.add(field, "must be an array");
                return None;
            }
            None => {
                self.add(field, "is required");
                return None;
            }
        };
        if items.is_empty() {
            self.add(field, "must contain at least one item");
            return None;
        }

        let mut usage = Vec::with_capacity(items.len());
        for (i, item) in items.iter().enumerate() {
            if !item.is_object() {
                self.add(&format!("{field}[{i}]"), "must be an object");
                continue;
            }
            let mut item_reader = ArgReader::new(item);
            let bom_id = item_reader.required_id("bom_id");
            let quantity = item_reader.required_number("quantity");
            let lot_id = item_reader.optional_id("lot_id");
            let lot_number = item_reader.optional_str("lot_number");
            let label_id = item_reader.optional_id("label_id");
            let label_code = item_reader.optional_str("label_code");
            let waste = item_reader.optional_number("waste");
            let notes = item_reader.optional_str("notes");

            for v in item_reader.violations {
                self.add(&format!("{field}[{i}].{}", v.field), v.reason);
            }
            if let (Some(bom_id), Some(quantity)) = (bom_id, quantity) {
                usage.push(PartsUsageItem {
                    bom_id,
                    quantity,
                    lot_id,
                    lot_number,
                    label_id,
                    label_code,
                    waste,
                    notes,
                });
            }
        }
        (usage.len() == items.len()).then_some(usage)
    }
}
