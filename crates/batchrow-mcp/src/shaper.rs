//! Response shaping for `read`-style results.
//!
//! Tool responses feed a constrained assistant interface, so list payloads
//! are kept inside an absolute character budget. This stage only ever drops
//! data, never raises errors, and always leaves enough metadata (counts,
//! notes) for the caller to know something was omitted.

use serde_json::{Map, Value, json};

/// Maximum records returned by a single `read` before simplification.
pub const MAX_LIST_RECORDS: usize = 25;
/// Fallback record count when the simplified payload still busts the budget.
pub const FALLBACK_LIST_RECORDS: usize = 10;
/// Absolute serialized-size ceiling, in characters.
pub const RESPONSE_CHAR_BUDGET: usize = 50_000;
/// Link arrays under these entries keep at most a few `{id, value}` pairs.
const LARGE_LINK_FIELDS: [&str; 6] = [
    "Parts Usage",
    "MO Parts Usage",
    "Inventory Transactions",
    "Cycle Counts",
    "Raw Material Lots",
    "Manufacturing Orders",
];

/// A shaped list plus the note describing what was dropped, if anything.
#[derive(Debug)]
pub struct ShapedList {
    pub results: Vec<Value>,
    pub note: Option<String>,
}

/// Shape one page of results against the response budget.
///
/// `total_count` is the store-reported match count, which may exceed the page.
pub fn shape_list(results: Vec<Value>, total_count: u64) -> ShapedList {
    let mut results = results;
    results.truncate(MAX_LIST_RECORDS);
    for row in &mut results {
        simplify_row(row);
    }

    let serialized_len = serde_json::to_string(&results)
        .map(|s| s.len())
        .unwrap_or(usize::MAX);

    let note = if serialized_len > RESPONSE_CHAR_BUDGET && results.len() > FALLBACK_LIST_RECORDS {
        results.truncate(FALLBACK_LIST_RECORDS);
        Some(format!(
            "Response exceeded the size budget; returning the first {} of {} matching records. \
             Narrow the filters or reduce the page size for more.",
            results.len(),
            total_count
        ))
    } else if (results.len() as u64) < total_count {
        Some(format!(
            "Returned {} of {} matching records.",
            results.len(),
            total_count
        ))
    } else {
        None
    };

    ShapedList { results, note }
}

/// Simplify known-large link-reference fields in place. Fields that are not
/// link arrays are left untouched; schema validity stays the store's problem.
fn simplify_row(row: &mut Value) {
    let Some(fields) = row.as_object_mut() else {
        return;
    };
    for name in LARGE_LINK_FIELDS {
        let Some(value) = fields.get_mut(name) else {
            continue;
        };
        let Some(entries) = value.as_array() else {
            continue;
        };
        if entries.is_empty() || !entries.iter().all(|e| e.get("id").is_some()) {
            continue;
        }
        *value = if entries.len() <= 3 {
            Value::Array(
                entries
                    .iter()
                    .map(|e| {
                        let mut slim = Map::new();
                        slim.insert("id".into(), e["id"].clone());
                        if let Some(display) = e.get("value") {
                            slim.insert("value".into(), display.clone());
                        }
                        Value::Object(slim)
                    })
                    .collect(),
            )
        } else {
            json!({
                "_count": entries.len(),
                "_first": {"id": entries[0]["id"]},
                "_note": "linked rows elided; read the linked table for the full list",
            })
        };
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn linked_row(link_count: usize) -> Value {
        let links: Vec<Value> = (0..link_count)
            .map(|i| json!({"id": i + 1, "value": format!("MO-2024-{i:03}"), "order": "1.0"}))
            .collect();
        json!({"id": 1, "Name": "Stevia Powder", "Manufacturing Orders": links})
    }

    #[test]
    fn small_link_arrays_keep_id_and_value_only() {
        let shaped = shape_list(vec![linked_row(2)], 1);
        let links = shaped.results[0]["Manufacturing Orders"].as_array().unwrap();
        assert_eq!(links.len(), 2);
        assert_eq!(links[0], json!({"id": 1, "value": "MO-2024-000"}));
        assert!(shaped.note.is_none());
    }

    #[test]
    fn large_link_arrays_collapse_to_a_summary() {
        let shaped = shape_list(vec![linked_row(8)], 1);
        let collapsed = &shaped.results[0]["Manufacturing Orders"];
        assert_eq!(collapsed["_count"], 8);
        assert_eq!(collapsed["_first"]["id"], 1);
        assert!(collapsed["_note"].is_string());
    }

    #[test]
    fn empty_link_arrays_stay_empty() {
        let shaped = shape_list(vec![linked_row(0)], 1);
        assert_eq!(shaped.results[0]["Manufacturing Orders"], json!([]));
    }

    #[test]
    fn unlisted_fields_are_untouched() {
        let row = json!({"id": 1, "Part": [{"id": 9, "value": "x"}, {"id": 10}, {"id": 11}, {"id": 12}]});
        let shaped = shape_list(vec![row.clone()], 1);
        assert_eq!(shaped.results[0], row);
    }

    #[test]
    fn list_is_truncated_to_the_record_cap_with_a_note() {
        let rows: Vec<Value> = (0..40).map(|i| json!({"id": i})).collect();
        let shaped = shape_list(rows, 40);
        assert_eq!(shaped.results.len(), MAX_LIST_RECORDS);
        assert_eq!(shaped.note.as_deref(), Some("Returned 25 of 40 matching records."));
    }

    #[test]
    fn oversized_payload_falls_back_to_ten_records() {
        let blob = "x".repeat(3_000);
        let rows: Vec<Value> = (0..25).map(|i| json!({"id": i, "Notes": blob})).collect();
        let shaped = shape_list(rows, 25);
        assert_eq!(shaped.results.len(), FALLBACK_LIST_RECORDS);
        assert!(shaped.note.unwrap().contains("size budget"));
    }

    #[test]
    fn partial_page_from_the_store_gets_the_light_note() {
        let rows: Vec<Value> = (0..10).map(|i| json!({"id": i})).collect();
        let shaped = shape_list(rows, 100);
        assert_eq!(shaped.results.len(), 10);
        assert_eq!(shaped.note.as_deref(), Some("Returned 10 of 100 matching records."));
    }
}
