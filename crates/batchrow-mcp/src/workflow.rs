//! Composite multi-table workflows: `get_bom`, `search_parts` and
//! `process_bpr`.
//!
//! These are where the conditional logic lives. All three compose the same
//! row primitives the CRUD tools use; within a workflow the network calls are
//! intentionally sequential because each later step depends on data fetched
//! earlier. `process_bpr` has no compensating rollback: records created
//! before a failing step remain in the store, and the MO status update is
//! strictly last so a partially-processed order is never marked closed.

use crate::error::ToolError;
use crate::validator::{BprRequest, PartsUsageItem};
use batchrow_client::{FieldFilter, RowQuery, TableStore};
use batchrow_core::{TableDirectory, TableName, field_f64, field_link, field_str, row_id};
use serde_json::{Map, Value, json};
use std::collections::{BTreeMap, BTreeSet, HashMap};

/// Mappings and lookup tables are fetched in one page of this size; the
/// remote store cannot exact-match filter on link fields, so we fetch and
/// filter locally.
const LOOKUP_FETCH_SIZE: u32 = 200;
/// Page size when walking the whole parts table.
const PARTS_PAGE_SIZE: u32 = 200;
/// Hard ceiling on parts pages, bounding unbounded external data growth.
const PARTS_MAX_PAGES: u32 = 50;

// Field names as configured in the Baserow workspace.
const FIELD_MO_NUMBER: &str = "MO Number";
const FIELD_ISKU: &str = "iSKU";
const FIELD_FG_LINK: &str = "Finished Good";
const FIELD_PART_LINK: &str = "Part";
const FIELD_QTY_PER_UNIT: &str = "Quantity Per Unit";
const FIELD_PART_ROLE: &str = "Part Role";
const FIELD_INTERNAL_LOT: &str = "Internal Lot Number";
const FIELD_PART_BOM_ID: &str = "Part BOM ID";

const FIELD_USAGE_MO: &str = "Manufacturing Order";
const FIELD_USAGE_QTY: &str = "Quantity Used";
const FIELD_USAGE_WASTE: &str = "Waste Amount";
const FIELD_USAGE_NOTES: &str = "Notes";
const FIELD_USAGE_ENTERED_BY: &str = "Entered By";
const FIELD_USAGE_LOT: &str = "Raw Material Lot";
const FIELD_USAGE_LABEL: &str = "Label";

const FIELD_MO_STATUS: &str = "Status";
const FIELD_MO_DEDUCTION: &str = "Deduction Method";
const FIELD_MO_COMPLETION_DATE: &str = "Completion Date";
const FIELD_MO_GROSS_PRODUCED: &str = "Gross Produced";
const FIELD_MO_BPR_COMPLETE: &str = "BPR Complete";
const FIELD_MO_INVENTORY_DEDUCTED: &str = "Inventory Deducted";

const MO_STATUS_CLOSED: &str = "Completed";
const MO_DEDUCTION_ACTUAL: &str = "Actual Usage";
const DEFAULT_ENTERED_BY: &str = "MCP Assistant";

/// Candidate name fields for the parts index, in priority order.
const PART_NAME_FIELDS: [&str; 6] = [
    "BOM ID",
    "Name",
    "Part Name",
    "iSKU",
    "Part Number",
    "SKU",
];

/// The composite workflow engine. Borrows the store and directory from the
/// executor for the duration of one request; holds no state of its own.
pub struct Workflows<'a> {
    store: &'a dyn TableStore,
    tables: &'a TableDirectory,
}

/// A BOM mapping resolved far enough to create a usage record from it.
struct ResolvedMapping {
    part_id: u64,
    fg_id: Option<u64>,
}

/// One entry of the parts name index, insertion-ordered from page 1 onward.
/// Insertion order is the documented tie-break for fuzzy matches.
struct PartEntry {
    key: String,
    id: u64,
    name: String,
}

impl<'a> Workflows<'a> {
    pub fn new(store: &'a dyn TableStore, tables: &'a TableDirectory) -> Self {
        Self { store, tables }
    }

    // ------------------------------------------------------------------
    // get_bom
    // ------------------------------------------------------------------

    /// Fetch the bill of materials for one finished good.
    pub async fn get_bom(
        &self,
        fg_id: Option<u64>,
        isku: Option<String>,
    ) -> Result<Value, ToolError> {
        let fg_id = match (fg_id, isku) {
            (Some(id), _) => id,
            (None, Some(isku)) => self.resolve_fg(&isku).await?,
            (None, None) => {
                return Err(ToolError::InvalidRequest {
                    message: "either fg_id or isku is required".into(),
                });
            }
        };

        let mappings_table = self.tables.id_of(TableName::FgPartsMapping)?;
        let page = self
            .store
            .list_rows(mappings_table, RowQuery::page(1, LOOKUP_FETCH_SIZE))
            .await?;

        let mut parts = Vec::new();
        let mut skipped = 0usize;
        for row in &page.results {
            let fg_match = field_link(row, FIELD_FG_LINK)
                .and_then(|l| l.primary().map(|p| p.id))
                == Some(fg_id);
            if !fg_match {
                continue;
            }
            // A mapping whose Part link does not resolve cannot be projected;
            // it is skipped and counted rather than failing the whole BOM.
            let Some(part) = field_link(row, FIELD_PART_LINK).and_then(|l| l.primary().cloned())
            else {
                skipped += 1;
                continue;
            };
            parts.push(json!({
                "mapping_id": row_id(row),
                "part_id": part.id,
                "part_name": part.value.unwrap_or_default(),
                "quantity_per_unit": field_f64(row, FIELD_QTY_PER_UNIT).unwrap_or(0.0),
                "part_role": field_str(row, FIELD_PART_ROLE).unwrap_or(""),
            }));
        }

        if skipped > 0 {
            tracing::warn!(fg_id, skipped, "skipped BOM mappings with no resolvable Part link");
        }

        Ok(json!({
            "fg_id": fg_id,
            "parts": parts,
            "total_parts": parts.len(),
            "skipped_mappings": skipped,
        }))
    }

    async fn resolve_fg(&self, isku: &str) -> Result<u64, ToolError> {
        let table = self.tables.id_of(TableName::FinishedGoods)?;
        let query = RowQuery::page(1, 2).with_filter(FieldFilter::equal(FIELD_ISKU, isku));
        let page = self.store.list_rows(table, query).await?;
        page.results
            .first()
            .and_then(row_id)
            .ok_or_else(|| ToolError::FgNotFound { isku: isku.to_string() })
    }

    // ------------------------------------------------------------------
    // search_parts
    // ------------------------------------------------------------------

    /// Resolve free-form part names to part row ids.
    pub async fn search_parts(&self, search_terms: Vec<String>) -> Result<Value, ToolError> {
        let index = self.load_parts_index().await?;

        let mut results = Vec::with_capacity(search_terms.len());
        let mut found_count = 0usize;
        let mut not_found = Vec::new();
        for term in &search_terms {
            match match_term(&index, term) {
                Some(entry) => {
                    found_count += 1;
                    results.push(json!({
                        "search_term": term,
                        "part_id": entry.id,
                        "part_name": entry.name,
                        "found": true,
                    }));
                }
                None => {
                    not_found.push(term.clone());
                    results.push(json!({
                        "search_term": term,
                        "part_id": 0,
                        "part_name": "",
                        "found": false,
                    }));
                }
            }
        }

        Ok(json!({
            "results": results,
            "found_count": found_count,
            "not_found": not_found,
        }))
    }

    async fn load_parts_index(&self) -> Result<Vec<PartEntry>, ToolError> {
        let table = self.tables.id_of(TableName::Parts)?;
        let mut index = Vec::new();
        let mut page_no = 1u32;
        loop {
            let page = self
                .store
                .list_rows(table, RowQuery::page(page_no, PARTS_PAGE_SIZE))
                .await?;
            if page.results.is_empty() {
                break;
            }
            for row in &page.results {
                let Some(id) = row_id(row) else { continue };
                let Some(name) = PART_NAME_FIELDS
                    .iter()
                    .find_map(|f| field_str(row, f).map(str::trim).filter(|s| !s.is_empty()))
                else {
                    continue;
                };
                index.push(PartEntry {
                    key: name.to_lowercase(),
                    id,
                    name: name.to_string(),
                });
            }
            if page.next.is_none() {
                break;
            }
            if page_no >= PARTS_MAX_PAGES {
                tracing::warn!(
                    pages = page_no,
                    "parts table paging ceiling hit; searching loaded subset"
                );
                break;
            }
            page_no += 1;
        }
        Ok(index)
    }

    // ------------------------------------------------------------------
    // process_bpr
    // ------------------------------------------------------------------

    /// Close out a batch production record.
    ///
    /// Five sequential steps; any failure aborts the remainder. Usage records
    /// created before a failure stay committed (documented limitation), and
    /// the MO update only happens after every creation succeeded.
    pub async fn process_bpr(&self, req: BprRequest) -> Result<Value, ToolError> {
        // Step 1: resolve the manufacturing order by its human-readable number.
        let mo_table = self.tables.id_of(TableName::ManufacturingOrders)?;
        let page = self
            .store
            .list_rows(
                mo_table,
                RowQuery::page(1, 2).with_filter(FieldFilter::equal(FIELD_MO_NUMBER, &req.mo_number)),
            )
            .await?;
        let mo_id = page
            .results
            .first()
            .and_then(row_id)
            .ok_or_else(|| ToolError::MoNotFound { mo_number: req.mo_number.clone() })?;

        // Step 2: resolve every bom_id, all-or-nothing.
        let mappings = self.resolve_mappings(&req.parts_usage).await?;

        // Step 3: per-request lookup maps for lot numbers and label codes.
        let lots = self.lot_index(&req.parts_usage).await?;
        let labels = self.label_index(&req.parts_usage).await?;

        // Step 4: create usage records one at a time, in input order.
        let usage_table = self.tables.id_of(TableName::MoPartsUsage)?;
        let entered_by = req.entered_by.as_deref().unwrap_or(DEFAULT_ENTERED_BY);
        let mut created_ids = Vec::with_capacity(req.parts_usage.len());
        for item in &req.parts_usage {
            let mapping = &mappings[&item.bom_id];
            let fields = build_usage_fields(mo_id, mapping, item, entered_by, &req, &lots, &labels);
            let created = self.store.create_row(usage_table, fields).await?;
            if let Some(id) = row_id(&created) {
                created_ids.push(id);
            }
        }

        // Step 5: close out the MO in a single update.
        let mut mo_fields = Map::new();
        mo_fields.insert(FIELD_MO_STATUS.into(), json!(MO_STATUS_CLOSED));
        mo_fields.insert(FIELD_MO_DEDUCTION.into(), json!(MO_DEDUCTION_ACTUAL));
        mo_fields.insert(FIELD_MO_COMPLETION_DATE.into(), json!(req.completion_date));
        mo_fields.insert(FIELD_MO_GROSS_PRODUCED.into(), json!(req.gross_produced));
        mo_fields.insert(FIELD_MO_BPR_COMPLETE.into(), json!(true));
        mo_fields.insert(FIELD_MO_INVENTORY_DEDUCTED.into(), json!(true));
        self.store.update_row(mo_table, mo_id, mo_fields).await?;

        tracing::info!(
            mo_number = %req.mo_number,
            usage_records = created_ids.len(),
            "closed out batch production record"
        );

        Ok(json!({
            "mo_id": mo_id,
            "mo_number": req.mo_number,
            "created_usage_records": created_ids.len(),
            "usage_record_ids": created_ids,
            "mo_updated": true,
            "summary": format!(
                "Closed out {}: {} parts-usage records created, status set to {}",
                req.mo_number,
                created_ids.len(),
                MO_STATUS_CLOSED
            ),
        }))
    }

    /// Fetch BOM mappings and resolve the requested ids. A requested mapping
    /// that is absent, or present without a resolvable Part link, counts as
    /// missing; partial processing is never attempted.
    async fn resolve_mappings(
        &self,
        items: &[PartsUsageItem],
    ) -> Result<BTreeMap<u64, ResolvedMapping>, ToolError> {
        let requested: BTreeSet<u64> = items.iter().map(|i| i.bom_id).collect();
        let table = self.tables.id_of(TableName::FgPartsMapping)?;
        let page = self
            .store
            .list_rows(table, RowQuery::page(1, LOOKUP_FETCH_SIZE))
            .await?;

        let mut resolved = BTreeMap::new();
        for row in &page.results {
            let Some(id) = row_id(row) else { continue };
            if !requested.contains(&id) {
                continue;
            }
            let Some(part_id) = field_link(row, FIELD_PART_LINK)
                .and_then(|l| l.primary().map(|p| p.id))
            else {
                continue;
            };
            let fg_id = field_link(row, FIELD_FG_LINK).and_then(|l| l.primary().map(|p| p.id));
            resolved.insert(id, ResolvedMapping { part_id, fg_id });
        }

        let missing: Vec<u64> = requested
            .iter()
            .copied()
            .filter(|id| !resolved.contains_key(id))
            .collect();
        if !missing.is_empty() {
            return Err(ToolError::BomNotFound { missing });
        }
        Ok(resolved)
    }

    /// Exact, case-sensitive lot-number index. Only fetched when some item
    /// actually needs a lot resolved by number.
    async fn lot_index(&self, items: &[PartsUsageItem]) -> Result<HashMap<String, u64>, ToolError> {
        let needed = items
            .iter()
            .any(|i| i.lot_id.is_none() && i.lot_number.is_some());
        if !needed {
            return Ok(HashMap::new());
        }
        let table = self.tables.id_of(TableName::RawMaterialLots)?;
        let page = self
            .store
            .list_rows(table, RowQuery::page(1, LOOKUP_FETCH_SIZE))
            .await?;
        let mut index = HashMap::new();
        for row in &page.results {
            if let (Some(id), Some(number)) = (row_id(row), field_str(row, FIELD_INTERNAL_LOT)) {
                index.entry(number.to_string()).or_insert(id);
            }
        }
        Ok(index)
    }

    /// Label index keyed on the lowercased display value of the "Part BOM ID"
    /// link, insertion-ordered for the deterministic fuzzy tie-break.
    async fn label_index(&self, items: &[PartsUsageItem]) -> Result<Vec<(String, u64)>, ToolError> {
        let needed = items
            .iter()
            .any(|i| i.label_id.is_none() && i.label_code.is_some());
        if !needed {
            return Ok(Vec::new());
        }
        let table = self.tables.id_of(TableName::LabelInventory)?;
        let page = self
            .store
            .list_rows(table, RowQuery::page(1, LOOKUP_FETCH_SIZE))
            .await?;
        let mut index = Vec::new();
        for row in &page.results {
            let Some(id) = row_id(row) else { continue };
            let Some(display) = field_link(row, FIELD_PART_BOM_ID)
                .and_then(|l| l.primary().and_then(|p| p.value.clone()))
            else {
                continue;
            };
            index.push((display.to_lowercase(), id));
        }
        Ok(index)
    }
}

/// Exact case-insensitive match first; only then the bidirectional substring
/// fallback, first insertion-order match winning.
fn match_term<'i>(index: &'i [PartEntry], term: &str) -> Option<&'i PartEntry> {
    let needle = term.trim().to_lowercase();
    index
        .iter()
        .find(|e| e.key == needle)
        .or_else(|| {
            index
                .iter()
                .find(|e| e.key.contains(&needle) || needle.contains(&e.key))
        })
}

/// Same matching policy as `match_term`, against the label index.
fn match_label(index: &[(String, u64)], code: &str) -> Option<u64> {
    let needle = code.trim().to_lowercase();
    index
        .iter()
        .find(|(key, _)| *key == needle)
        .or_else(|| {
            index
                .iter()
                .find(|(key, _)| key.contains(&needle) || needle.contains(key.as_str()))
        })
        .map(|(_, id)| *id)
}

#[allow(clippy::too_many_arguments)]
fn build_usage_fields(
    mo_id: u64,
    mapping: &ResolvedMapping,
    item: &PartsUsageItem,
    entered_by: &str,
    req: &BprRequest,
    lots: &HashMap<String, u64>,
    labels: &[(String, u64)],
) -> Map<String, Value> {
    let mut fields = Map::new();
    fields.insert(FIELD_USAGE_MO.into(), json!([mo_id]));
    // Part and Finished Good always come from the mapping, never the caller.
    fields.insert(FIELD_PART_LINK.into(), json!([mapping.part_id]));
    if let Some(fg_id) = mapping.fg_id {
        fields.insert(FIELD_FG_LINK.into(), json!([fg_id]));
    }
    fields.insert(FIELD_USAGE_QTY.into(), json!(item.quantity));
    if let Some(waste) = item.waste {
        fields.insert(FIELD_USAGE_WASTE.into(), json!(waste));
    }
    let notes = item
        .notes
        .clone()
        .unwrap_or_else(|| format!("Recorded from BPR close-out of {}", req.mo_number));
    fields.insert(FIELD_USAGE_NOTES.into(), json!(notes));
    fields.insert(FIELD_USAGE_ENTERED_BY.into(), json!(entered_by));

    // `*_id` wins over `*_number`/`*_code`; unresolved relations are omitted.
    let lot = item
        .lot_id
        .or_else(|| item.lot_number.as_deref().and_then(|n| lots.get(n).copied()));
    if let Some(lot_id) = lot {
        fields.insert(FIELD_USAGE_LOT.into(), json!([lot_id]));
    }
    let label = item
        .label_id
        .or_else(|| item.label_code.as_deref().and_then(|c| match_label(labels, c)));
    if let Some(label_id) = label {
        fields.insert(FIELD_USAGE_LABEL.into(), json!([label_id]));
    }
    fields
}
