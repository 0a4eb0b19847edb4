//! Datasource: a connection plus the assets served through it

use super::registry::AssetTypeRegistry;
use super::types::DataAsset;
use crate::connector::{DataConnector, ObjectStoreConnector, SqlConnectionConfig, SqlConnector};
use crate::error::{Error, Result};
use crate::template;
use crate::types::ConnectorFamily;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// How a datasource reaches its data
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ConnectionConfig {
    /// Local directory or object-store URL
    Files { base_url: String },
    /// SQL database reached through DuckDB
    Sql(SqlConnectionConfig),
}

impl ConnectionConfig {
    /// Connector family this connection produces
    pub fn family(&self) -> ConnectorFamily {
        match self {
            ConnectionConfig::Files { .. } => ConnectorFamily::FilePath,
            ConnectionConfig::Sql(_) => ConnectorFamily::Sql,
        }
    }
}

/// A named connection and the assets it serves
#[derive(Debug, Clone)]
pub struct Datasource {
    name: String,
    connection: ConnectionConfig,
    registry: Arc<AssetTypeRegistry>,
    assets: Vec<DataAsset>,
}

impl Datasource {
    /// Create an empty datasource
    pub fn new(
        name: impl Into<String>,
        connection: ConnectionConfig,
        registry: Arc<AssetTypeRegistry>,
    ) -> Self {
        Self {
            name: name.into(),
            connection,
            registry,
            assets: Vec::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn connection(&self) -> &ConnectionConfig {
        &self.connection
    }

    pub fn registry(&self) -> &AssetTypeRegistry {
        &self.registry
    }

    pub fn assets(&self) -> &[DataAsset] {
        &self.assets
    }

    /// Asset names in insertion order
    pub fn asset_names(&self) -> Vec<&str> {
        self.assets.iter().map(DataAsset::name).collect()
    }

    /// Validate an asset against this datasource's connection and registry
    fn check_asset(&self, asset: &DataAsset) -> Result<()> {
        asset.validate()?;

        let info = self.registry.get(asset.asset_type())?;
        let family = self.connection.family();
        if info.family != family || asset.source().family() != family {
            return Err(Error::invalid_value(
                "type",
                format!(
                    "asset '{}' of type '{}' cannot be served by {} datasource '{}'",
                    asset.name(),
                    asset.asset_type(),
                    family,
                    self.name
                ),
            ));
        }

        self.registry
            .validate_read_options(asset.name(), asset.asset_type(), asset.read_options())
    }

    /// Add an asset; names are unique within the datasource
    pub fn add_asset(&mut self, mut asset: DataAsset) -> Result<&DataAsset> {
        if self.assets.iter().any(|a| a.name() == asset.name()) {
            return Err(Error::DuplicateAsset {
                datasource: self.name.clone(),
                asset: asset.name().to_string(),
            });
        }

        self.check_asset(&asset)?;
        asset.set_datasource(&self.name);
        tracing::debug!("Added asset {} ({}) to {}", asset.name(), asset.id(), self.name);

        self.assets.push(asset);
        let idx = self.assets.len() - 1;
        Ok(&self.assets[idx])
    }

    /// Add an asset, replacing any existing asset of the same name
    ///
    /// A replacement keeps the ids of the asset and of its same-named batch
    /// definitions.
    pub fn add_or_update_asset(&mut self, mut asset: DataAsset) -> Result<&DataAsset> {
        self.check_asset(&asset)?;
        asset.set_datasource(&self.name);

        let idx = match self.assets.iter().position(|a| a.name() == asset.name()) {
            Some(idx) => {
                asset.inherit_ids(&self.assets[idx]);
                tracing::debug!("Replaced asset {} ({}) in {}", asset.name(), asset.id(), self.name);
                self.assets[idx] = asset;
                idx
            }
            None => {
                self.assets.push(asset);
                self.assets.len() - 1
            }
        };
        Ok(&self.assets[idx])
    }

    fn not_found(&self, name: &str) -> Error {
        Error::AssetNotFound {
            datasource: self.name.clone(),
            asset: name.to_string(),
        }
    }

    /// Look up an asset by name
    pub fn get_asset(&self, name: &str) -> Result<&DataAsset> {
        self.assets
            .iter()
            .find(|a| a.name() == name)
            .ok_or_else(|| self.not_found(name))
    }

    /// Mutable access for batch definition and sorter management
    pub fn get_asset_mut(&mut self, name: &str) -> Result<&mut DataAsset> {
        match self.assets.iter().position(|a| a.name() == name) {
            Some(idx) => Ok(&mut self.assets[idx]),
            None => Err(self.not_found(name)),
        }
    }

    /// Remove an asset
    pub fn delete_asset(&mut self, name: &str) -> Result<DataAsset> {
        match self.assets.iter().position(|a| a.name() == name) {
            Some(idx) => Ok(self.assets.remove(idx)),
            None => Err(self.not_found(name)),
        }
    }

    /// Open a connector for this datasource
    ///
    /// `${VAR}` references in the connection are resolved from the
    /// environment first.
    pub async fn connect(&self) -> Result<Arc<dyn DataConnector>> {
        match &self.connection {
            ConnectionConfig::Files { base_url } => {
                if template::has_templates(base_url) {
                    tracing::debug!(
                        "Resolving {:?} in base URL of datasource {}",
                        template::extract_variables(base_url),
                        self.name
                    );
                }
                let base_url = template::render(base_url)?;
                let connector = ObjectStoreConnector::parse(&base_url)?;
                tracing::debug!("Opened {} store for datasource {}", connector.scheme(), self.name);
                Ok(Arc::new(connector))
            }
            ConnectionConfig::Sql(config) => {
                let config = config.clone();
                let connector = tokio::task::spawn_blocking(move || SqlConnector::connect(&config))
                    .await
                    .map_err(|e| Error::Other(format!("Database task failed: {e}")))??;
                Ok(Arc::new(connector))
            }
        }
    }
}
