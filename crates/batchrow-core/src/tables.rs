//! The table allow-list.
//!
//! Batchrow is deliberately not a general Baserow client: only the nine
//! tables enumerated here are ever reachable, and only when configuration
//! supplied a numeric table id for them. A name outside the enumeration, or
//! inside it but unconfigured, fails with [`UnauthorizedTable`] before any
//! outbound call is made.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Externally-assigned numeric identifier of a Baserow table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct TableId(pub u64);

impl fmt::Display for TableId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// The closed set of semantic table names this proxy may touch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TableName {
    ManufacturingOrders,
    MoPartsUsage,
    RawMaterialLots,
    LabelInventory,
    FinishedGoods,
    FgPartsMapping,
    Parts,
    InventoryTransactions,
    CycleCounts,
}

impl TableName {
    /// Every table in the enumeration, in declaration order.
    pub const ALL: [TableName; 9] = [
        TableName::ManufacturingOrders,
        TableName::MoPartsUsage,
        TableName::RawMaterialLots,
        TableName::LabelInventory,
        TableName::FinishedGoods,
        TableName::FgPartsMapping,
        TableName::Parts,
        TableName::InventoryTransactions,
        TableName::CycleCounts,
    ];

    /// The snake_case name used on the tool surface and in configuration keys.
    pub fn as_str(&self) -> &'static str {
        match self {
            TableName::ManufacturingOrders => "manufacturing_orders",
            TableName::MoPartsUsage => "mo_parts_usage",
            TableName::RawMaterialLots => "raw_material_lots",
            TableName::LabelInventory => "label_inventory",
            TableName::FinishedGoods => "finished_goods",
            TableName::FgPartsMapping => "fg_parts_mapping",
            TableName::Parts => "parts",
            TableName::InventoryTransactions => "inventory_transactions",
            TableName::CycleCounts => "cycle_counts",
        }
    }

    /// Parse a table name from the tool surface. `None` for anything outside
    /// the enumeration.
    pub fn parse(raw: &str) -> Option<Self> {
        TableName::ALL.iter().copied().find(|t| t.as_str() == raw)
    }
}

impl fmt::Display for TableName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when a table is outside the allow-list or unconfigured.
#[derive(Debug, Clone, thiserror::Error)]
#[error("table '{table}' is not in the allow-list or has no configured table id")]
pub struct UnauthorizedTable {
    /// The offending table name as supplied by the caller.
    pub table: String,
}

/// Immutable name → id directory, built once at startup.
///
/// Safe for concurrent reads: after construction nothing mutates it, so it is
/// shared as a plain reference (or inside an `Arc`) with no locking.
#[derive(Debug, Clone)]
pub struct TableDirectory {
    ids: BTreeMap<TableName, TableId>,
}

impl TableDirectory {
    /// Build the directory from configured ids.
    ///
    /// Tables with no configured id are logged and left unreachable; an empty
    /// directory is a startup failure (handled by the caller via
    /// [`Settings`](crate::config::Settings) construction).
    pub fn new(ids: BTreeMap<TableName, TableId>) -> Self {
        for table in TableName::ALL {
            if !ids.contains_key(&table) {
                tracing::warn!(table = %table, "table has no configured id and will be unreachable");
            }
        }
        Self { ids }
    }

    /// True only if `name` is in the enumeration and has a configured id.
    pub fn is_allowed(&self, name: &str) -> bool {
        TableName::parse(name)
            .map(|t| self.ids.contains_key(&t))
            .unwrap_or(false)
    }

    /// Resolve a table name to its id. Never falls back to a default.
    pub fn resolve(&self, name: &str) -> Result<(TableName, TableId), UnauthorizedTable> {
        let table = TableName::parse(name).ok_or_else(|| UnauthorizedTable {
            table: name.to_string(),
        })?;
        let id = self.ids.get(&table).ok_or_else(|| UnauthorizedTable {
            table: name.to_string(),
        })?;
        Ok((table, *id))
    }

    /// Resolve an already-validated table name.
    pub fn id_of(&self, table: TableName) -> Result<TableId, UnauthorizedTable> {
        self.ids.get(&table).copied().ok_or_else(|| UnauthorizedTable {
            table: table.as_str().to_string(),
        })
    }

    /// All configured name → id pairs, in name order.
    pub fn entries(&self) -> impl Iterator<Item = (TableName, TableId)> + '_ {
        self.ids.iter().map(|(t, id)| (*t, *id))
    }

    /// Number of configured tables.
    pub fn len(&self) -> usize {
        self.ids.len()
    }

    /// True when no table resolved from configuration.
    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }
}
