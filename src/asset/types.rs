//! Data asset and batch definition types

use crate::batch::BatchRequest;
use crate::error::{Error, Result};
use crate::partition::{
    validate_identifier, BatchOptions, ColumnPartitioner, FilePartitioner, Partitioner,
    PartitionerKind,
};
use crate::sort::Sorter;
use crate::types::{ConnectorFamily, Identifier, JsonValue, ReadOptions};
use std::collections::BTreeSet;

// ============================================================================
// Batch Definition
// ============================================================================

/// Named batching configuration owned by an asset
///
/// `partitioner` is `None` for a whole-table definition (SQL assets only).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchDefinition {
    pub id: Identifier,
    pub name: String,
    pub partitioner: Option<Partitioner>,
}

impl BatchDefinition {
    /// Create a definition with a fresh id
    pub fn new(name: impl Into<String>, partitioner: Option<Partitioner>) -> Self {
        Self {
            id: Identifier::generate(),
            name: name.into(),
            partitioner,
        }
    }

    /// One batch per year of a file name
    pub fn yearly(name: impl Into<String>, regex: &str) -> Result<Self> {
        Ok(Self::new(name, Some(FilePartitioner::yearly(regex)?.into())))
    }

    /// One batch per (year, month) of a file name
    pub fn monthly(name: impl Into<String>, regex: &str) -> Result<Self> {
        Ok(Self::new(name, Some(FilePartitioner::monthly(regex)?.into())))
    }

    /// One batch per (year, month, day) of a file name
    pub fn daily(name: impl Into<String>, regex: &str) -> Result<Self> {
        Ok(Self::new(name, Some(FilePartitioner::daily(regex)?.into())))
    }

    /// One batch per matching path
    pub fn path(name: impl Into<String>, regex: &str) -> Result<Self> {
        Ok(Self::new(name, Some(FilePartitioner::path(regex)?.into())))
    }

    /// Split a SQL relation on the date parts of `column`
    pub fn column(name: impl Into<String>, kind: PartitionerKind, column: &str) -> Result<Self> {
        let partitioner = ColumnPartitioner::new(kind, column, true)?;
        Ok(Self::new(name, Some(partitioner.into())))
    }

    /// The whole SQL table as a single batch
    pub fn whole_table(name: impl Into<String>) -> Self {
        Self::new(name, None)
    }

    /// Keep an existing id
    #[must_use]
    pub fn with_id(mut self, id: impl Into<Identifier>) -> Self {
        self.id = id.into();
        self
    }

    /// Parameter names this definition extracts
    pub fn param_names(&self) -> &[String] {
        self.partitioner
            .as_ref()
            .map_or(&[][..], Partitioner::param_names)
    }
}

// ============================================================================
// Asset Source
// ============================================================================

/// Where an asset's data lives within its datasource
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AssetSource {
    /// Files under a prefix of the datasource's base URL
    Files { prefix: String, recursive: bool },
    /// A SQL table
    Table { table_name: String },
    /// A SQL query
    Query { query: String },
}

impl AssetSource {
    /// Connector family able to serve this source
    pub fn family(&self) -> ConnectorFamily {
        match self {
            AssetSource::Files { .. } => ConnectorFamily::FilePath,
            AssetSource::Table { .. } | AssetSource::Query { .. } => ConnectorFamily::Sql,
        }
    }
}

// ============================================================================
// Data Asset
// ============================================================================

/// A named source of batches within a datasource
#[derive(Debug, Clone, PartialEq)]
pub struct DataAsset {
    name: String,
    asset_type: String,
    id: Identifier,
    datasource: String,
    source: AssetSource,
    order_by: Vec<Sorter>,
    batch_definitions: Vec<BatchDefinition>,
    read_options: ReadOptions,
}

impl DataAsset {
    /// Create an asset; structural checks run when it is added to a datasource
    pub fn new(name: impl Into<String>, asset_type: impl Into<String>, source: AssetSource) -> Self {
        Self {
            name: name.into(),
            asset_type: asset_type.into(),
            id: Identifier::generate(),
            datasource: String::new(),
            source,
            order_by: Vec::new(),
            batch_definitions: Vec::new(),
            read_options: ReadOptions::new(),
        }
    }

    /// File asset listing everything under `prefix`, recursively
    pub fn files(name: impl Into<String>, asset_type: impl Into<String>, prefix: impl Into<String>) -> Self {
        Self::new(
            name,
            asset_type,
            AssetSource::Files {
                prefix: prefix.into(),
                recursive: true,
            },
        )
    }

    /// SQL table asset
    pub fn table(name: impl Into<String>, table_name: impl Into<String>) -> Self {
        Self::new(
            name,
            "table",
            AssetSource::Table {
                table_name: table_name.into(),
            },
        )
    }

    /// SQL query asset
    pub fn query(name: impl Into<String>, query: impl Into<String>) -> Self {
        Self::new(name, "query", AssetSource::Query { query: query.into() })
    }

    /// Keep an existing id
    #[must_use]
    pub fn with_id(mut self, id: impl Into<Identifier>) -> Self {
        self.id = id.into();
        self
    }

    /// Set the sorters
    #[must_use]
    pub fn with_order_by(mut self, order_by: Vec<Sorter>) -> Self {
        self.order_by = order_by;
        self
    }

    /// Append a batch definition
    #[must_use]
    pub fn with_batch_definition(mut self, definition: BatchDefinition) -> Self {
        self.batch_definitions.push(definition);
        self
    }

    /// Set one read option
    #[must_use]
    pub fn with_read_option(mut self, key: impl Into<String>, value: impl Into<JsonValue>) -> Self {
        self.read_options.insert(key.into(), value.into());
        self
    }

    // ------------------------------------------------------------------------
    // Accessors
    // ------------------------------------------------------------------------

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Asset type tag (csv, parquet, table, ...)
    pub fn asset_type(&self) -> &str {
        &self.asset_type
    }

    pub fn id(&self) -> &Identifier {
        &self.id
    }

    /// Name of the owning datasource; empty until added to one
    pub fn datasource(&self) -> &str {
        &self.datasource
    }

    pub fn source(&self) -> &AssetSource {
        &self.source
    }

    pub fn order_by(&self) -> &[Sorter] {
        &self.order_by
    }

    pub fn batch_definitions(&self) -> &[BatchDefinition] {
        &self.batch_definitions
    }

    pub fn read_options(&self) -> &ReadOptions {
        &self.read_options
    }

    pub(crate) fn set_datasource(&mut self, datasource: &str) {
        self.datasource = datasource.to_string();
    }

    /// Take over the ids of the asset this one replaces
    ///
    /// Batch definitions are matched by name; new definitions keep their own id.
    pub(crate) fn inherit_ids(&mut self, previous: &DataAsset) {
        self.id = previous.id.clone();
        for definition in &mut self.batch_definitions {
            if let Some(old) = previous
                .batch_definitions
                .iter()
                .find(|d| d.name == definition.name)
            {
                definition.id = old.id.clone();
            }
        }
    }

    /// Union of parameter names over every batch definition
    pub fn param_names(&self) -> BTreeSet<&str> {
        self.batch_definitions
            .iter()
            .flat_map(|definition| definition.param_names().iter().map(String::as_str))
            .collect()
    }

    // ------------------------------------------------------------------------
    // Validation
    // ------------------------------------------------------------------------

    /// Check the asset's internal consistency
    pub fn validate(&self) -> Result<()> {
        if self.name.trim().is_empty() {
            return Err(Error::missing_field("name"));
        }

        match &self.source {
            AssetSource::Files { .. } => {}
            AssetSource::Table { table_name } => validate_identifier("table_name", table_name)?,
            AssetSource::Query { query } => {
                if query.trim().is_empty() {
                    return Err(Error::invalid_value("query", "query must not be empty"));
                }
            }
        }

        let family = self.source.family();
        let mut seen = BTreeSet::new();
        for definition in &self.batch_definitions {
            if !seen.insert(definition.name.as_str()) {
                return Err(Error::DuplicateBatchDefinition {
                    asset: self.name.clone(),
                    name: definition.name.clone(),
                });
            }
            match &definition.partitioner {
                Some(partitioner) if partitioner.family() != family => {
                    return Err(Error::invalid_value(
                        "partitioner",
                        format!(
                            "batch definition '{}' of asset '{}' uses a {} partitioner, \
                             which cannot run against a {family} asset",
                            definition.name,
                            self.name,
                            partitioner.kind()
                        ),
                    ));
                }
                None if family == ConnectorFamily::FilePath => {
                    return Err(Error::invalid_value(
                        "partitioner",
                        format!(
                            "batch definition '{}' of file asset '{}' needs a partitioner",
                            definition.name, self.name
                        ),
                    ));
                }
                _ => {}
            }
        }

        let params = self.param_names();
        for sorter in &self.order_by {
            if !params.contains(sorter.key.as_str()) {
                return Err(Error::unknown_field(&self.name, &sorter.key, "order_by"));
            }
        }

        Ok(())
    }

    /// Apply `change` to a copy and commit it only if the copy validates
    fn try_update<T>(&mut self, change: impl FnOnce(&mut Self) -> Result<T>) -> Result<T> {
        let mut candidate = self.clone();
        let out = change(&mut candidate)?;
        candidate.validate()?;
        *self = candidate;
        Ok(out)
    }

    // ------------------------------------------------------------------------
    // Batch Definition Management
    // ------------------------------------------------------------------------

    /// Add a batch definition; duplicate names are rejected
    pub fn add_batch_definition(&mut self, definition: BatchDefinition) -> Result<&BatchDefinition> {
        if self.batch_definitions.iter().any(|d| d.name == definition.name) {
            return Err(Error::DuplicateBatchDefinition {
                asset: self.name.clone(),
                name: definition.name,
            });
        }

        let name = definition.name.clone();
        self.try_update(|asset| {
            asset.batch_definitions.push(definition);
            Ok(())
        })?;
        tracing::debug!("Added batch definition {} to asset {}", name, self.name);

        let idx = self.batch_definitions.len() - 1;
        Ok(&self.batch_definitions[idx])
    }

    /// Look up a batch definition by name
    pub fn get_batch_definition(&self, name: &str) -> Result<&BatchDefinition> {
        self.batch_definitions
            .iter()
            .find(|d| d.name == name)
            .ok_or_else(|| Error::BatchDefinitionNotFound {
                asset: self.name.clone(),
                name: name.to_string(),
            })
    }

    fn position(&self, name: &str) -> Result<usize> {
        self.batch_definitions
            .iter()
            .position(|d| d.name == name)
            .ok_or_else(|| Error::BatchDefinitionNotFound {
                asset: self.name.clone(),
                name: name.to_string(),
            })
    }

    /// Replace the partitioner of an existing definition, keeping its id
    pub fn update_batch_definition(
        &mut self,
        name: &str,
        partitioner: Option<Partitioner>,
    ) -> Result<&BatchDefinition> {
        let idx = self.position(name)?;
        self.try_update(|asset| {
            asset.batch_definitions[idx].partitioner = partitioner;
            Ok(())
        })?;
        Ok(&self.batch_definitions[idx])
    }

    /// Remove a definition; rejected if a sorter would lose its field
    pub fn delete_batch_definition(&mut self, name: &str) -> Result<BatchDefinition> {
        let idx = self.position(name)?;
        self.try_update(|asset| Ok(asset.batch_definitions.remove(idx)))
    }

    /// Replace the sorters; every key must be an extracted parameter
    pub fn set_order_by(&mut self, order_by: Vec<Sorter>) -> Result<()> {
        self.try_update(|asset| {
            asset.order_by = order_by;
            Ok(())
        })
    }

    /// Definition a request resolves against
    ///
    /// With no name, the first definition is used; an asset with none resolves
    /// as a whole (SQL only, rejected for file assets before any I/O).
    pub fn resolve_definition(&self, name: Option<&str>) -> Result<Option<&BatchDefinition>> {
        match name {
            Some(name) => self.get_batch_definition(name).map(Some),
            None => match (self.batch_definitions.first(), self.source.family()) {
                (Some(definition), _) => Ok(Some(definition)),
                (None, ConnectorFamily::Sql) => Ok(None),
                (None, ConnectorFamily::FilePath) => Err(Error::config(format!(
                    "File asset '{}' has no batch definitions; add one before requesting batches",
                    self.name
                ))),
            },
        }
    }

    // ------------------------------------------------------------------------
    // Batch Requests
    // ------------------------------------------------------------------------

    /// Option keys a request against `definition` may constrain
    pub fn batch_parameters_template(&self, definition: Option<&str>) -> Result<Vec<String>> {
        Ok(self
            .resolve_definition(definition)?
            .map(|d| d.param_names().to_vec())
            .unwrap_or_default())
    }

    /// Build a request, rejecting unknown option fields eagerly
    pub fn build_batch_request(
        &self,
        definition: Option<&str>,
        options: BatchOptions,
    ) -> Result<BatchRequest> {
        let allowed = self.batch_parameters_template(definition)?;
        if let Some(field) = options.keys().find(|k| !allowed.contains(k)) {
            return Err(Error::unknown_field(&self.name, field, "batch request options"));
        }

        let mut request = BatchRequest::new(&self.datasource, &self.name).with_options(options);
        if let Some(definition) = definition {
            request = request.with_batch_definition(definition);
        }
        Ok(request)
    }
}
