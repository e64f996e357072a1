//! Row and link-reference model.
//!
//! Rows come back from Baserow as loose JSON objects keyed by human-readable
//! field names, plus an `id` and an `order` key. No schema is enforced
//! locally; these helpers give the workflows a single, typed way to pull the
//! values they consult instead of duck-typing maps at every call site.
//!
//! Cross-table relationships ("Manufacturing Order", "Part", "Finished Good")
//! arrive as arrays of `{id, value}` pairs; [`LinkReference`] models that
//! shape explicitly, and the composite workflows only ever consult the first
//! entry via [`LinkReference::primary`].

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// One entry of a link field: a referenced row id plus its display value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LinkRef {
    pub id: u64,
    /// The referenced row's primary-field display value, when present.
    #[serde(default)]
    pub value: Option<String>,
}

/// A link field value: empty, or an ordered list of references.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LinkReference(pub Vec<LinkRef>);

impl LinkReference {
    /// Parse a link reference from a raw field value.
    ///
    /// Returns `None` when the value is not an array of `{id, ...}` objects
    /// (including null/missing fields); an empty array parses to an empty
    /// reference.
    pub fn from_value(value: &Value) -> Option<Self> {
        let entries = value.as_array()?;
        let mut refs = Vec::with_capacity(entries.len());
        for entry in entries {
            let id = entry.get("id")?.as_u64()?;
            let display = entry
                .get("value")
                .and_then(Value::as_str)
                .map(str::to_string);
            refs.push(LinkRef { id, value: display });
        }
        Some(Self(refs))
    }

    /// The first referenced entry, if any. The composite workflows treat this
    /// as the authoritative end of the relationship.
    pub fn primary(&self) -> Option<&LinkRef> {
        self.0.first()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }
}

/// Numeric row id of a Baserow row object.
pub fn row_id(row: &Value) -> Option<u64> {
    row.get("id").and_then(Value::as_u64)
}

/// String value of a field, if present and a string.
pub fn field_str<'a>(row: &'a Value, field: &str) -> Option<&'a str> {
    row.get(field).and_then(Value::as_str)
}

/// Numeric value of a field. Baserow serializes number fields as JSON
/// strings, so both representations parse; anything else yields `None`.
pub fn field_f64(row: &Value, field: &str) -> Option<f64> {
    match row.get(field)? {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

/// Link-reference value of a field, if the field holds one.
pub fn field_link(row: &Value, field: &str) -> Option<LinkReference> {
    row.get(field).and_then(LinkReference::from_value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn link_reference_parses_entries_in_order() {
        let value = json!([
            {"id": 12, "value": "RM-PWD-Stevia"},
            {"id": 15, "value": "RM-PWD-Monk"}
        ]);
        let link = LinkReference::from_value(&value).unwrap();
        assert_eq!(link.len(), 2);
        let first = link.primary().unwrap();
        assert_eq!(first.id, 12);
        assert_eq!(first.value.as_deref(), Some("RM-PWD-Stevia"));
    }

    #[test]
    fn empty_array_is_an_empty_reference() {
        let link = LinkReference::from_value(&json!([])).unwrap();
        assert!(link.is_empty());
        assert!(link.primary().is_none());
    }

    #[test]
    fn non_link_shapes_do_not_parse() {
        assert!(LinkReference::from_value(&json!(null)).is_none());
        assert!(LinkReference::from_value(&json!("MO-2024-001")).is_none());
        assert!(LinkReference::from_value(&json!([{"value": "no id"}])).is_none());
    }

    #[test]
    fn field_f64_accepts_string_numbers() {
        let row = json!({"Quantity Per Unit": "2.5", "Gross Produced": 140});
        assert_eq!(field_f64(&row, "Quantity Per Unit"), Some(2.5));
        assert_eq!(field_f64(&row, "Gross Produced"), Some(140.0));
        assert_eq!(field_f64(&row, "Missing"), None);
    }

    #[test]
    fn row_id_reads_the_id_key() {
        assert_eq!(row_id(&json!({"id": 42, "Name": "x"})), Some(42));
        assert_eq!(row_id(&json!({"Name": "x"})), None);
    }
}
