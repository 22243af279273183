//! Declarative extraction configs.
//!
//! A config lists sources (one database each); every source lists views;
//! every view names a primary table plus optional columns, joins, filter
//! groups and a year slice. Configs are read from JSON or TOML.
//!
//! ```toml
//! [[sources]]
//! database = "DB"
//! dataset = "sales"
//! global_filters = ["tenant_id = 42"]
//!
//! [[sources.views]]
//! table = "orders"
//! columns = ["*"]
//! exclude = ["internal_note"]
//! filters = ["status = 'open' | status = 'pending'"]
//! year_slice = { column = "order_year", previous_years = 2 }
//!
//! [[sources.views.joins]]
//! table = "customers"
//! kind = "left"
//! on = ["customer_id"]
//! columns = ["name"]
//! ```

mod filters;
mod planning;
mod validation;

pub use self::filters::*;
pub use self::planning::*;
pub use self::validation::*;

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::ast::{JoinKind, YearSlice};
use crate::error::{WexError, WexResult};

/// Column entry that stands for every known column of a table.
pub const ALL_COLUMNS: &str = "*";

/// Root of an extraction config.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExtractionConfig {
    #[serde(default)]
    pub sources: Vec<SourceConfig>,
}

/// All views read from one database.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceConfig {
    pub database: String,
    /// Dataset label for views without their own `name`.
    #[serde(default)]
    pub dataset: Option<String>,
    /// Single-term filters added to every view, against its primary table
    /// unless qualified.
    #[serde(default)]
    pub global_filters: Vec<FilterSpec>,
    #[serde(default)]
    pub views: Vec<ViewConfig>,
}

/// One logical view, rendered into one or more queries.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ViewConfig {
    pub table: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default = "default_columns")]
    pub columns: Vec<String>,
    #[serde(default)]
    pub exclude: Vec<String>,
    #[serde(default)]
    pub joins: Vec<JoinConfig>,
    #[serde(default)]
    pub filters: Vec<FilterGroup>,
    #[serde(default)]
    pub year_slice: Option<YearSlice>,
}

/// A table joined into a view.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JoinConfig {
    pub table: String,
    /// Left side of the join; the view's primary table when absent.
    #[serde(default)]
    pub from: Option<String>,
    #[serde(default)]
    pub kind: JoinKind,
    pub on: Vec<String>,
    #[serde(default)]
    pub columns: Vec<String>,
    #[serde(default)]
    pub exclude: Vec<String>,
    #[serde(default)]
    pub filters: Vec<FilterGroup>,
}

fn default_columns() -> Vec<String> {
    vec![ALL_COLUMNS.to_string()]
}

impl ViewConfig {
    /// Dataset label: the view name, else the source dataset, else the table.
    pub fn dataset_name<'a>(&'a self, source: &'a SourceConfig) -> &'a str {
        self.name
            .as_deref()
            .or(source.dataset.as_deref())
            .unwrap_or(&self.table)
    }
}

impl JoinConfig {
    pub fn left_table<'a>(&'a self, view: &'a ViewConfig) -> &'a str {
        self.from.as_deref().unwrap_or(&view.table)
    }
}

impl ExtractionConfig {
    pub fn from_json(json: &str) -> WexResult<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn from_toml(toml: &str) -> WexResult<Self> {
        Ok(toml::from_str(toml)?)
    }

    /// Load a config file; `.toml` files are read as TOML, anything else as JSON.
    pub fn from_file<P: AsRef<Path>>(path: P) -> WexResult<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(WexError::FileNotFound(path.to_path_buf()));
        }
        let content = fs::read_to_string(path)?;
        let is_toml = path
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case("toml"));
        if is_toml {
            Self::from_toml(&content)
        } else {
            Self::from_json(&content)
        }
    }

    pub fn view_count(&self) -> usize {
        self.sources.iter().map(|s| s.views.len()).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TOML: &str = r#"
[[sources]]
database = "DB"
dataset = "sales"
global_filters = ["tenant_id = 42"]

[[sources.views]]
table = "orders"
exclude = ["internal_note"]
filters = ["status = 'open' | status = 'pending'"]
year_slice = { column = "order_year", previous_years = 2 }

[[sources.views.joins]]
table = "customers"
kind = "left"
on = ["customer_id"]
columns = ["name"]

[[sources.views]]
table = "returns"
name = "returns_2010s"
columns = ["id", "reason"]
year_slice = { column = "yr", start = 2010, end = 2019 }
"#;

    #[test]
    fn test_parse_toml() {
        let config = ExtractionConfig::from_toml(TOML).unwrap();
        assert_eq!(config.sources.len(), 1);
        assert_eq!(config.view_count(), 2);

        let source = &config.sources[0];
        let orders = &source.views[0];
        assert_eq!(orders.columns, vec!["*".to_string()]);
        assert_eq!(orders.dataset_name(source), "sales");
        assert_eq!(orders.joins[0].kind, JoinKind::Left);
        assert_eq!(orders.joins[0].left_table(orders), "orders");
        assert_eq!(orders.year_slice, Some(YearSlice::dynamic("order_year", 2)));

        let returns = &source.views[1];
        assert_eq!(returns.dataset_name(source), "returns_2010s");
        assert_eq!(returns.year_slice, Some(YearSlice::fixed("yr", 2010, 2019)));
    }

    #[test]
    fn test_parse_json() {
        let json = r#"{
            "sources": [{
                "database": "DB",
                "views": [{
                    "table": "table",
                    "columns": ["column"],
                    "filters": [
                        "column = 1 | column2 = 'lol'",
                        [{ "column": "column3", "operator": "like", "values": ["C%"] }]
                    ]
                }]
            }]
        }"#;
        let config = ExtractionConfig::from_json(json).unwrap();
        let view = &config.sources[0].views[0];
        assert_eq!(view.filters.len(), 2);
        assert_eq!(view.dataset_name(&config.sources[0]), "table");
        assert!(view.joins.is_empty());
    }

    #[test]
    fn test_missing_file() {
        let err = ExtractionConfig::from_file("/no/such/config.toml").unwrap_err();
        assert!(matches!(err, WexError::FileNotFound(_)));
    }
}
