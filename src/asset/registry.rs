//! Registry of known asset types

use crate::error::{Error, Result};
use crate::types::{ConnectorFamily, ReadOptions};
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};

/// Description of one asset type
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AssetTypeInfo {
    /// Type tag used in configs (`csv`, `table`, ...)
    pub name: String,
    /// Connector family able to serve this type
    pub family: ConnectorFamily,
    /// Reader the execution engine should call for a batch
    pub reader_method: String,
    /// Read option keys accepted for this type
    pub read_options: BTreeSet<String>,
}

impl AssetTypeInfo {
    /// Create a type description
    pub fn new(
        name: impl Into<String>,
        family: ConnectorFamily,
        reader_method: impl Into<String>,
        read_options: &[&str],
    ) -> Self {
        Self {
            name: name.into(),
            family,
            reader_method: reader_method.into(),
            read_options: read_options.iter().map(ToString::to_string).collect(),
        }
    }
}

/// Asset types known to the process, built once at startup
#[derive(Debug, Clone, Default)]
pub struct AssetTypeRegistry {
    types: BTreeMap<String, AssetTypeInfo>,
}

impl AssetTypeRegistry {
    /// Empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with the built-in file and SQL asset types
    pub fn builtin() -> Self {
        let mut registry = Self::new();
        registry.register(AssetTypeInfo::new(
            "csv",
            ConnectorFamily::FilePath,
            "read_csv",
            &[
                "sep",
                "delimiter",
                "header",
                "names",
                "index_col",
                "usecols",
                "dtype",
                "skiprows",
                "nrows",
                "na_values",
                "encoding",
                "quotechar",
                "escapechar",
                "compression",
                "parse_dates",
            ],
        ));
        registry.register(AssetTypeInfo::new(
            "json",
            ConnectorFamily::FilePath,
            "read_json",
            &["orient", "lines", "dtype", "convert_dates", "encoding", "compression", "nrows"],
        ));
        registry.register(AssetTypeInfo::new(
            "parquet",
            ConnectorFamily::FilePath,
            "read_parquet",
            &["columns", "engine", "filters", "use_nullable_dtypes"],
        ));
        registry.register(AssetTypeInfo::new(
            "excel",
            ConnectorFamily::FilePath,
            "read_excel",
            &["sheet_name", "header", "names", "usecols", "skiprows", "nrows", "dtype"],
        ));
        registry.register(AssetTypeInfo::new(
            "table",
            ConnectorFamily::Sql,
            "read_sql_query",
            &["chunksize", "coerce_float"],
        ));
        registry.register(AssetTypeInfo::new(
            "query",
            ConnectorFamily::Sql,
            "read_sql_query",
            &["chunksize", "coerce_float"],
        ));
        registry
    }

    /// Register (or replace) an asset type
    pub fn register(&mut self, info: AssetTypeInfo) {
        self.types.insert(info.name.clone(), info);
    }

    /// Look up an asset type by tag
    pub fn get(&self, name: &str) -> Result<&AssetTypeInfo> {
        self.types.get(name).ok_or_else(|| Error::UnknownAssetType {
            name: name.to_string(),
        })
    }

    /// Every registered type, ordered by name
    pub fn iter(&self) -> impl Iterator<Item = &AssetTypeInfo> {
        self.types.values()
    }

    /// Reject read options the asset type does not accept
    pub fn validate_read_options(
        &self,
        asset: &str,
        asset_type: &str,
        options: &ReadOptions,
    ) -> Result<()> {
        let info = self.get(asset_type)?;
        match options.keys().find(|key| !info.read_options.contains(*key)) {
            Some(key) => Err(Error::unknown_field(
                asset,
                key,
                format!("{asset_type} read options"),
            )),
            None => Ok(()),
        }
    }
}
