//! YAML parser for datasource definitions
//!
//! Parses datasource YAML files and converts them into runtime
//! [`Datasource`]s, running every configuration check on the way.

use crate::asset::{AssetSource, AssetTypeRegistry, BatchDefinition, DataAsset, Datasource};
use crate::error::{Error, Result};
use crate::loader::types::{AssetDefinition, BatchDefinitionDef, DatasourceDefinition};
use crate::types::ConnectorFamily;
use std::fs;
use std::path::Path;
use std::sync::Arc;

/// Load a datasource from a YAML file using the built-in asset types
///
/// # Examples
///
/// ```ignore
/// let datasource = load_datasource("./datasources/lake.yaml")?;
/// ```
pub fn load_datasource(path: impl AsRef<Path>) -> Result<Datasource> {
    let path = path.as_ref();
    let content = fs::read_to_string(path).map_err(|e| {
        if e.kind() == std::io::ErrorKind::NotFound {
            Error::FileNotFound {
                path: path.display().to_string(),
            }
        } else {
            Error::config(format!(
                "Failed to read datasource file '{}': {}",
                path.display(),
                e
            ))
        }
    })?;
    load_datasource_from_str(&content, Arc::new(AssetTypeRegistry::builtin()))
}

/// Load a datasource from a YAML string
pub fn load_datasource_from_str(yaml: &str, registry: Arc<AssetTypeRegistry>) -> Result<Datasource> {
    let def = parse_definition(yaml)?;
    build_datasource(&def, registry)
}

/// Parse YAML into a definition without building it
pub fn parse_definition(yaml: &str) -> Result<DatasourceDefinition> {
    let def: DatasourceDefinition = serde_yaml::from_str(yaml)?;
    if def.name.trim().is_empty() {
        return Err(Error::config("Datasource name cannot be empty"));
    }
    Ok(def)
}

/// Convert a parsed definition into a datasource
pub fn build_datasource(def: &DatasourceDefinition, registry: Arc<AssetTypeRegistry>) -> Result<Datasource> {
    let mut datasource = Datasource::new(&def.name, def.connection.clone(), registry);
    let family = def.connection.family();

    for asset_def in &def.assets {
        let asset = build_asset(asset_def, family)?;
        datasource.add_asset(asset)?;
    }

    tracing::debug!(
        "Loaded datasource {} with {} assets",
        datasource.name(),
        datasource.assets().len()
    );
    Ok(datasource)
}

/// Build one asset from its definition
fn build_asset(def: &AssetDefinition, family: ConnectorFamily) -> Result<DataAsset> {
    let source = build_source(def, family)?;

    let mut asset = DataAsset::new(&def.name, &def.asset_type, source);
    if let Some(ref id) = def.id {
        asset = asset.with_id(id.as_str());
    }

    for definition in &def.batch_definitions {
        asset = asset.with_batch_definition(build_batch_definition(definition)?);
    }

    let order_by = def
        .order_by
        .iter()
        .map(|sorter| sorter.to_sorter())
        .collect::<Result<Vec<_>>>()?;
    asset = asset.with_order_by(order_by);

    for (key, value) in &def.read_options {
        asset = asset.with_read_option(key, value.clone());
    }

    Ok(asset)
}

/// Where the asset's data lives, checked against the connection family
fn build_source(def: &AssetDefinition, family: ConnectorFamily) -> Result<AssetSource> {
    let context = |field: &str| format!("asset '{}': '{field}' is not valid for a {family} datasource", def.name);

    match family {
        ConnectorFamily::FilePath => {
            if def.table_name.is_some() {
                return Err(Error::invalid_value("table_name", context("table_name")));
            }
            if def.query.is_some() {
                return Err(Error::invalid_value("query", context("query")));
            }
            let recursive = match def.glob_directive.as_deref() {
                None | Some("**/*" | "**") => true,
                Some("*") => false,
                Some(other) => {
                    return Err(Error::invalid_value(
                        "glob_directive",
                        format!("unsupported glob '{other}', expected '**/*' or '*'"),
                    ))
                }
            };
            Ok(AssetSource::Files {
                prefix: def.prefix.clone().unwrap_or_default(),
                recursive,
            })
        }
        ConnectorFamily::Sql => {
            if def.prefix.is_some() || def.glob_directive.is_some() {
                return Err(Error::invalid_value("prefix", context("prefix")));
            }
            match (&def.table_name, &def.query) {
                (Some(table_name), None) => Ok(AssetSource::Table {
                    table_name: table_name.clone(),
                }),
                (None, Some(query)) => Ok(AssetSource::Query { query: query.clone() }),
                (Some(_), Some(_)) => Err(Error::invalid_value(
                    "table_name",
                    format!("asset '{}' must set either 'table_name' or 'query', not both", def.name),
                )),
                // Table assets default to a table named like the asset
                (None, None) if def.asset_type == "table" => Ok(AssetSource::Table {
                    table_name: def.name.clone(),
                }),
                (None, None) => Err(Error::missing_field("query")),
            }
        }
    }
}

/// Build a batch definition, keeping a configured id
fn build_batch_definition(def: &BatchDefinitionDef) -> Result<BatchDefinition> {
    let partitioner = def
        .partitioner
        .as_ref()
        .map(|p| p.to_partitioner())
        .transpose()?;

    let definition = BatchDefinition::new(&def.name, partitioner);
    Ok(match def.id {
        Some(ref id) => definition.with_id(id.as_str()),
        None => definition,
    })
}
