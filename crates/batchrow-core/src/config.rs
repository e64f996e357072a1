//! Environment-driven settings.
//!
//! Everything the proxy needs at startup comes from the process environment:
//! the Baserow token (fatal if absent), the base URL, the filter mode used by
//! `read`, and one numeric table id per allow-listed table
//! (`BASEROW_TABLE_<NAME>`). Missing individual table ids degrade to
//! unreachable tables; a malformed id or zero configured tables aborts
//! startup.

use crate::tables::{TableDirectory, TableId, TableName};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::env;

/// Default public cloud endpoint.
pub const DEFAULT_BASE_URL: &str = "https://api.baserow.io";

/// Errors raised while reading settings from the environment.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// The API token is required; the server cannot start without it.
    #[error("BASEROW_API_TOKEN is not set")]
    MissingToken,

    /// A table id was present but did not parse as a positive integer.
    #[error("invalid table id in {var}: '{value}' is not a positive integer")]
    InvalidTableId { var: String, value: String },

    /// No table resolved at all; every tool would be unreachable.
    #[error("no table ids configured; set at least one BASEROW_TABLE_<NAME> variable")]
    NoTablesConfigured,

    /// Unrecognized filter mode value.
    #[error("invalid BATCHROW_FILTER_MODE: '{0}' (expected 'equal' or 'contains')")]
    InvalidFilterMode(String),
}

/// How `read` filters are expressed against the rows API.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FilterMode {
    /// `filter__<field>__equal`: exact-match equality.
    #[default]
    Equal,
    /// `filter__<field>__contains`: substring containment.
    Contains,
}

impl FilterMode {
    /// The operator segment of the query parameter name.
    pub fn operator(&self) -> &'static str {
        match self {
            FilterMode::Equal => "equal",
            FilterMode::Contains => "contains",
        }
    }
}

/// Process-lifetime configuration.
#[derive(Debug, Clone)]
pub struct Settings {
    /// Baserow database token.
    pub api_token: String,
    /// Base URL of the Baserow instance.
    pub base_url: String,
    /// Filter operator used by the `read` tool.
    pub filter_mode: FilterMode,
    /// Name → id directory for the allow-listed tables.
    pub tables: TableDirectory,
}

impl Settings {
    /// Read settings from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Read settings through an injectable lookup, so tests supply a map
    /// instead of mutating the process environment.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let api_token = lookup("BASEROW_API_TOKEN")
            .filter(|t| !t.trim().is_empty())
            .ok_or(ConfigError::MissingToken)?;

        let base_url = lookup("BASEROW_API_URL")
            .filter(|u| !u.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_BASE_URL.to_string())
            .trim_end_matches('/')
            .to_string();

        let filter_mode = match lookup("BATCHROW_FILTER_MODE").as_deref() {
            None | Some("") => FilterMode::Equal,
            Some("equal") => FilterMode::Equal,
            Some("contains") => FilterMode::Contains,
            Some(other) => return Err(ConfigError::InvalidFilterMode(other.to_string())),
        };

        let mut ids = BTreeMap::new();
        for table in TableName::ALL {
            let var = table_id_var(table);
            let Some(raw) = lookup(&var).filter(|v| !v.trim().is_empty()) else {
                continue;
            };
            match raw.trim().parse::<u64>() {
                Ok(id) if id > 0 => {
                    ids.insert(table, TableId(id));
                }
                _ => {
                    return Err(ConfigError::InvalidTableId { var, value: raw });
                }
            }
        }
        if ids.is_empty() {
            return Err(ConfigError::NoTablesConfigured);
        }

        Ok(Self {
            api_token,
            base_url,
            filter_mode,
            tables: TableDirectory::new(ids),
        })
    }
}

/// Environment variable carrying the id of `table`.
pub fn table_id_var(table: TableName) -> String {
    format!("BASEROW_TABLE_{}", table.as_str().to_ascii_uppercase())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn base_vars() -> HashMap<String, String> {
        let mut vars = HashMap::new();
        vars.insert("BASEROW_API_TOKEN".into(), "tok_abc".into());
        vars.insert("BASEROW_TABLE_PARTS".into(), "601".into());
        vars
    }

    fn load(vars: &HashMap<String, String>) -> Result<Settings, ConfigError> {
        Settings::from_lookup(|k| vars.get(k).cloned())
    }

    #[test]
    fn missing_token_is_fatal() {
        let mut vars = base_vars();
        vars.remove("BASEROW_API_TOKEN");
        assert!(matches!(load(&vars), Err(ConfigError::MissingToken)));
    }

    #[test]
    fn defaults_apply() {
        let settings = load(&base_vars()).unwrap();
        assert_eq!(settings.base_url, DEFAULT_BASE_URL);
        assert_eq!(settings.filter_mode, FilterMode::Equal);
        assert_eq!(settings.tables.len(), 1);
    }

    #[test]
    fn base_url_trailing_slash_is_trimmed() {
        let mut vars = base_vars();
        vars.insert("BASEROW_API_URL".into(), "https://rows.example.com/".into());
        let settings = load(&vars).unwrap();
        assert_eq!(settings.base_url, "https://rows.example.com");
    }

    #[test]
    fn malformed_table_id_is_fatal() {
        let mut vars = base_vars();
        vars.insert("BASEROW_TABLE_MANUFACTURING_ORDERS".into(), "abc".into());
        match load(&vars) {
            Err(ConfigError::InvalidTableId { var, value }) => {
                assert_eq!(var, "BASEROW_TABLE_MANUFACTURING_ORDERS");
                assert_eq!(value, "abc");
            }
            other => panic!("expected InvalidTableId, got {other:?}"),
        }
    }

    #[test]
    fn zero_table_id_is_fatal() {
        let mut vars = base_vars();
        vars.insert("BASEROW_TABLE_PARTS".into(), "0".into());
        assert!(matches!(load(&vars), Err(ConfigError::InvalidTableId { .. })));
    }

    #[test]
    fn no_tables_is_fatal() {
        let mut vars = base_vars();
        vars.remove("BASEROW_TABLE_PARTS");
        assert!(matches!(load(&vars), Err(ConfigError::NoTablesConfigured)));
    }

    #[test]
    fn partially_configured_tables_still_load() {
        let mut vars = base_vars();
        vars.insert("BASEROW_TABLE_FINISHED_GOODS".into(), "604".into());
        let settings = load(&vars).unwrap();
        assert!(settings.tables.is_allowed("finished_goods"));
        assert!(!settings.tables.is_allowed("cycle_counts"));
    }

    #[test]
    fn invalid_filter_mode_is_rejected() {
        let mut vars = base_vars();
        vars.insert("BATCHROW_FILTER_MODE".into(), "fuzzy".into());
        assert!(matches!(load(&vars), Err(ConfigError::InvalidFilterMode(_))));
    }

    #[test]
    fn contains_filter_mode_parses() {
        let mut vars = base_vars();
        vars.insert("BATCHROW_FILTER_MODE".into(), "contains".into());
        let settings = load(&vars).unwrap();
        assert_eq!(settings.filter_mode, FilterMode::Contains);
        assert_eq!(settings.filter_mode.operator(), "contains");
    }
}
