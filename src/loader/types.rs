//! Loader types
//!
//! Declarative datasource definition types for YAML parsing.

use crate::asset::ConnectionConfig;
use crate::error::{Error, Result};
use crate::partition::{ColumnPartitioner, FilePartitioner, Partitioner, PartitionerKind};
use crate::sort::Sorter;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

// ============================================================================
// Datasource Definition
// ============================================================================

/// Top-level datasource definition
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct DatasourceDefinition {
    /// Datasource name
    pub name: String,
    /// How the datasource reaches its data
    pub connection: ConnectionConfig,
    /// Asset definitions
    #[serde(default)]
    pub assets: Vec<AssetDefinition>,
}

// ============================================================================
// Asset Definition
// ============================================================================

/// Asset definition
///
/// Keys not named here are collected as the asset's read options and checked
/// against its type.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct AssetDefinition {
    /// Asset name (unique within the datasource)
    pub name: String,
    /// Asset type tag (csv, json, parquet, excel, table, query)
    #[serde(rename = "type")]
    pub asset_type: String,
    /// Existing id; generated when absent
    #[serde(default)]
    pub id: Option<String>,
    /// File assets: prefix under the base URL
    #[serde(default)]
    pub prefix: Option<String>,
    /// File assets: `**/*` (recursive, default) or `*` (top level only)
    #[serde(default)]
    pub glob_directive: Option<String>,
    /// Table assets: table name, optionally schema-qualified
    #[serde(default)]
    pub table_name: Option<String>,
    /// Query assets: SQL query
    #[serde(default)]
    pub query: Option<String>,
    /// Sorters, as `{key, reverse}` or `"-year"` shorthand
    #[serde(default)]
    pub order_by: Vec<SorterDefinition>,
    /// Batch definitions
    #[serde(default)]
    pub batch_definitions: Vec<BatchDefinitionDef>,
    /// Per-format read options
    #[serde(flatten)]
    pub read_options: BTreeMap<String, Value>,
}

// ============================================================================
// Sorter Definition
// ============================================================================

/// Sorter in either object or shorthand form
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SorterDefinition {
    /// `"year"`, `"+year"` or `"-year"`
    Shorthand(String),
    /// `{key: year, reverse: true}`
    Full {
        key: String,
        #[serde(default)]
        reverse: bool,
    },
}

impl SorterDefinition {
    /// Convert to a runtime sorter
    pub fn to_sorter(&self) -> Result<Sorter> {
        match self {
            SorterDefinition::Shorthand(s) => Sorter::parse(s),
            SorterDefinition::Full { key, reverse } => {
                if key.trim().is_empty() {
                    return Err(Error::invalid_value("order_by", "sorter key cannot be empty"));
                }
                Ok(Sorter {
                    key: key.trim().to_string(),
                    reverse: *reverse,
                })
            }
        }
    }
}

// ============================================================================
// Batch Definition
// ============================================================================

/// Batch definition
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct BatchDefinitionDef {
    /// Definition name (unique within the asset)
    pub name: String,
    /// Existing id; generated when absent
    #[serde(default)]
    pub id: Option<String>,
    /// Partitioner; absent means the whole table (SQL assets)
    #[serde(default)]
    pub partitioner: Option<PartitionerDefinition>,
}

/// Partitioner definition
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct PartitionerDefinition {
    /// yearly, monthly, daily or path
    #[serde(rename = "type")]
    pub kind: PartitionerKind,
    /// Regex over file names (file assets)
    #[serde(default)]
    pub regex: Option<String>,
    /// Date or timestamp column (SQL assets)
    #[serde(default)]
    pub column: Option<String>,
    /// Natural sort direction
    #[serde(default = "default_sort_ascending")]
    pub sort_ascending: bool,
    /// Override the kind's default param names (regex partitioners)
    #[serde(default)]
    pub param_names: Option<Vec<String>>,
}

fn default_sort_ascending() -> bool {
    true
}

impl PartitionerDefinition {
    /// Compile into a runtime partitioner
    pub fn to_partitioner(&self) -> Result<Partitioner> {
        match (&self.regex, &self.column) {
            (Some(regex), None) => Ok(FilePartitioner::new(
                self.kind,
                regex,
                self.param_names.clone(),
                self.sort_ascending,
            )?
            .into()),
            (None, Some(column)) => {
                if self.param_names.is_some() {
                    return Err(Error::invalid_value(
                        "param_names",
                        "column partitioners use the default date-part names",
                    ));
                }
                Ok(ColumnPartitioner::new(self.kind, column, self.sort_ascending)?.into())
            }
            (Some(_), Some(_)) => Err(Error::invalid_value(
                "partitioner",
                "set either 'regex' or 'column', not both",
            )),
            (None, None) => Err(Error::missing_field("regex")),
        }
    }
}
