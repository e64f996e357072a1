//! The fixed tool catalog.
//!
//! Unlike a general database proxy there is no dynamic tool generation here:
//! the surface is exactly nine tools, so the definitions are written out
//! statically and served as-is from `tools/list`.

use crate::protocol::ToolDefinition;
use serde_json::json;

/// Registry of the nine tool definitions, looked up by name.
#[derive(Clone)]
pub struct ToolCatalog {
    tools: Vec<ToolDefinition>,
}

impl Default for ToolCatalog {
    fn default() -> Self {
        Self::new()
    }
}

impl ToolCatalog {
    pub fn new() -> Self {
        Self { tools: definitions() }
    }

    pub fn get(&self, name: &str) -> Option<&ToolDefinition> {
        self.tools.iter().find(|t| t.name == name)
    }

    pub fn definitions(&self) -> &[ToolDefinition] {
        &self.tools
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }
}

fn table_property() -> serde_json::Value {
    json!({
        "type": "string",
        "description": "Allow-listed table name, e.g. 'parts' or 'manufacturing_orders'"
    })
}

fn definitions() -> Vec<ToolDefinition> {
    vec![
        ToolDefinition {
            name: "list_tables".into(),
            description: "List the configured table names and their Baserow table ids".into(),
            input_schema: json!({"type": "object", "properties": {}}),
        },
        ToolDefinition {
            name: "read".into(),
            description: "Read rows from an allow-listed table, with optional field filters and pagination".into(),
            input_schema: json!({
                "type": "object",
                "properties": {
                    "table": table_property(),
                    "filters": {
                        "type": "object",
                        "description": "Field name to value; matched per the configured filter mode"
                    },
                    "page": {"type": "integer", "minimum": 1},
                    "size": {"type": "integer", "minimum": 1, "maximum": 200}
                },
                "required": ["table"]
            }),
        },
        ToolDefinition {
            name: "create".into(),
            description: "Create one row in an allow-listed table".into(),
            input_schema: json!({
                "type": "object",
                "properties": {
                    "table": table_property(),
                    "data": {"type": "object", "description": "Field name to value"}
                },
                "required": ["table", "data"]
            }),
        },
        ToolDefinition {
            name: "update".into(),
            description: "Update one row; only the supplied fields change".into(),
            input_schema: json!({
                "type": "object",
                "properties": {
                    "table": table_property(),
                    "record_id": {"type": "integer", "minimum": 1},
                    "data": {"type": "object"}
                },
                "required": ["table", "record_id", "data"]
            }),
        },
        ToolDefinition {
            name: "delete".into(),
            description: "Delete one row. Unconditional and irreversible".into(),
            input_schema: json!({
                "type": "object",
                "properties": {
                    "table": table_property(),
                    "record_id": {"type": "integer", "minimum": 1}
                },
                "required": ["table", "record_id"]
            }),
        },
        ToolDefinition {
            name: "batch_create".into(),
            description: "Create up to 50 rows; runs in small concurrent chunks, fail-fast with no rollback of already-created rows".into(),
            input_schema: json!({
                "type": "object",
                "properties": {
                    "table": table_property(),
                    "records": {
                        "type": "array",
                        "items": {"type": "object"},
                        "minItems": 1,
                        "maxItems": 50
                    }
                },
                "required": ["table", "records"]
            }),
        },
        ToolDefinition {
            name: "get_bom".into(),
            description: "Fetch the bill of materials for a finished good, by row id or by iSKU".into(),
            input_schema: json!({
                "type": "object",
                "properties": {
                    "fg_id": {"type": "integer", "minimum": 1, "description": "Finished Good row id"},
                    "isku": {"type": "string", "description": "Finished Good iSKU (exact match)"}
                }
            }),
        },
        ToolDefinition {
            name: "process_bpr".into(),
            description: "Close out a batch production record: create parts-usage rows for a manufacturing order and mark the MO completed. Non-atomic; already-created rows remain if a later step fails".into(),
            input_schema: json!({
                "type": "object",
                "properties": {
                    "mo_number": {"type": "string"},
                    "completion_date": {"type": "string", "description": "ISO date, YYYY-MM-DD"},
                    "gross_produced": {"type": "number", "minimum": 0},
                    "entered_by": {"type": "string"},
                    "parts_usage": {
                        "type": "array",
                        "minItems": 1,
                        "items": {
                            "type": "object",
                            "properties": {
                                "bom_id": {"type": "integer", "minimum": 1},
                                "quantity": {"type": "number", "minimum": 0},
                                "lot_id": {"type": "integer", "minimum": 1},
                                "lot_number": {"type": "string"},
                                "label_id": {"type": "integer", "minimum": 1},
                                "label_code": {"type": "string"},
                                "waste": {"type": "number", "minimum": 0},
                                "notes": {"type": "string"}
                            },
                            "required": ["bom_id", "quantity"]
                        }
                    }
                },
                "required": ["mo_number", "completion_date", "gross_produced", "parts_usage"]
            }),
        },
        ToolDefinition {
            name: "search_parts".into(),
            description: "Resolve part names or codes to part row ids, with exact-then-fuzzy matching".into(),
            input_schema: json!({
                "type": "object",
                "properties": {
                    "search_terms": {
                        "type": "array",
                        "items": {"type": "string"},
                        "minItems": 1
                    }
                },
                "required": ["search_terms"]
            }),
        },
    ]
}
