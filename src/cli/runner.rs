//! CLI runner - executes commands

use crate::asset::{AssetSource, Datasource};
use crate::batch::{resolve_with_stats, validate_request, BatchRequest};
use crate::cli::commands::{Cli, Commands, OutputFormat};
use crate::connector::{CancellationToken, DataConnector, ListContext};
use crate::error::{Error, Result};
use crate::loader::load_datasource;
use crate::partition::PartitionValue;
use crate::types::{ConnectorFamily, ReadOptions};
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;

/// CLI runner
pub struct Runner {
    cli: Cli,
}

impl Runner {
    /// Create a new runner
    pub fn new(cli: Cli) -> Self {
        Self { cli }
    }

    /// Run the CLI command
    pub async fn run(&self) -> Result<()> {
        match &self.cli.command {
            Commands::Validate { offline } => self.validate(*offline).await,
            Commands::Assets => self.assets(),
            Commands::Types => self.types(),
            Commands::Partitions {
                asset,
                batch_definition,
                timeout_secs,
            } => {
                self.partitions(asset, batch_definition.as_deref(), *timeout_secs)
                    .await
            }
            Commands::Resolve {
                asset,
                batch_definition,
                options,
                read_options,
                timeout_secs,
            } => {
                self.resolve(
                    asset,
                    batch_definition.as_deref(),
                    options,
                    read_options,
                    *timeout_secs,
                )
                .await
            }
        }
    }

    /// Load datasource definition
    fn load_datasource(&self) -> Result<Datasource> {
        let path = self
            .cli
            .datasource
            .as_ref()
            .ok_or_else(|| Error::config("Datasource file not specified (use -d flag)"))?;
        load_datasource(path)
    }

    /// Listing context with an optional deadline, cancelled on Ctrl-C
    fn list_context(timeout_secs: Option<u64>) -> ListContext {
        let token = CancellationToken::new();
        let signal_token = token.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                tracing::warn!("Interrupted, cancelling listing");
                signal_token.cancel();
            }
        });

        let ctx = ListContext::new().with_cancellation(token);
        match timeout_secs {
            Some(secs) => ctx.with_deadline(Duration::from_secs(secs)),
            None => ctx,
        }
    }

    /// Validate definition and connection
    async fn validate(&self, offline: bool) -> Result<()> {
        let datasource = self.load_datasource()?;

        let definitions: usize = datasource
            .assets()
            .iter()
            .map(|a| a.batch_definitions().len())
            .sum();
        self.output_message(&json!({
            "type": "LOG",
            "log": {
                "level": "INFO",
                "message": format!(
                    "Datasource '{}' is valid with {} assets and {} batch definitions",
                    datasource.name(),
                    datasource.assets().len(),
                    definitions
                )
            }
        }));

        if offline {
            return Ok(());
        }

        let status = match self.connect(&datasource).await {
            Ok(connector) => match connector.check().await {
                Ok(()) => json!({
                    "status": "SUCCEEDED",
                    "target": connector.describe()
                }),
                Err(e) => json!({
                    "status": "FAILED",
                    "target": connector.describe(),
                    "message": e.to_string()
                }),
            },
            Err(e) => json!({
                "status": "FAILED",
                "message": e.to_string()
            }),
        };

        self.output_message(&json!({
            "type": "CONNECTION_STATUS",
            "connectionStatus": status
        }));

        Ok(())
    }

    /// List assets
    fn assets(&self) -> Result<()> {
        let datasource = self.load_datasource()?;

        let assets: Vec<Value> = datasource
            .assets()
            .iter()
            .map(|asset| {
                let source = match asset.source() {
                    AssetSource::Files { prefix, recursive } => {
                        json!({ "prefix": prefix, "recursive": recursive })
                    }
                    AssetSource::Table { table_name } => json!({ "table_name": table_name }),
                    AssetSource::Query { query } => json!({ "query": query }),
                };
                let definitions: Vec<Value> = asset
                    .batch_definitions()
                    .iter()
                    .map(|def| {
                        json!({
                            "name": def.name,
                            "id": def.id,
                            "partitioner": def.partitioner.as_ref().map(|p| p.kind().to_string()),
                            "batch_parameters": def.param_names()
                        })
                    })
                    .collect();

                json!({
                    "name": asset.name(),
                    "id": asset.id(),
                    "type": asset.asset_type(),
                    "source": source,
                    "order_by": asset.order_by().iter().map(ToString::to_string).collect::<Vec<_>>(),
                    "batch_definitions": definitions
                })
            })
            .collect();

        self.output_message(&json!({
            "type": "ASSETS",
            "datasource": datasource.name(),
            "assets": assets
        }));

        Ok(())
    }

    /// List registered asset types
    fn types(&self) -> Result<()> {
        let registry = match &self.cli.datasource {
            Some(_) => self.load_datasource()?.registry().clone(),
            None => crate::asset::AssetTypeRegistry::builtin(),
        };
        let types: Vec<_> = registry.iter().collect();

        self.output_message(&json!({
            "type": "ASSET_TYPES",
            "asset_types": types
        }));

        Ok(())
    }

    /// List raw partitions
    async fn partitions(
        &self,
        asset_name: &str,
        batch_definition: Option<&str>,
        timeout_secs: Option<u64>,
    ) -> Result<()> {
        let datasource = self.load_datasource()?;
        let asset = datasource.get_asset(asset_name)?;
        let partitioner = asset
            .resolve_definition(batch_definition)?
            .and_then(|def| def.partitioner.as_ref());

        let connector = self.connect(&datasource).await?;
        let ctx = Self::list_context(timeout_secs);
        let partitions = connector.list_partitions(asset, partitioner, &ctx).await?;

        let partitions: Vec<Value> = partitions
            .iter()
            .map(|p| json!({ "location": p.location, "batch_identifiers": p.key }))
            .collect();

        self.output_message(&json!({
            "type": "PARTITIONS",
            "asset": asset_name,
            "count": partitions.len(),
            "partitions": partitions
        }));

        Ok(())
    }

    /// Resolve a batch request
    async fn resolve(
        &self,
        asset_name: &str,
        batch_definition: Option<&str>,
        options: &[(String, String)],
        read_options: &[(String, String)],
        timeout_secs: Option<u64>,
    ) -> Result<()> {
        let datasource = self.load_datasource()?;
        let family = datasource.get_asset(asset_name)?.source().family();

        let mut request = BatchRequest::new(datasource.name(), asset_name);
        if let Some(name) = batch_definition {
            request = request.with_batch_definition(name);
        }
        for (field, value) in options {
            request = request.with_option(field.as_str(), option_value(family, value));
        }
        if !read_options.is_empty() {
            request = request.with_passthrough(parse_read_options(read_options));
        }

        // Configuration errors surface before the store is touched
        validate_request(&datasource, &request)?;
        let connector = self.connect(&datasource).await?;
        let ctx = Self::list_context(timeout_secs);
        let (specs, stats) =
            resolve_with_stats(&datasource, connector.as_ref(), &request, &ctx).await?;

        let batches: Vec<Value> = specs
            .iter()
            .map(|spec| {
                json!({
                    "id": spec.batch_id(),
                    "spec": spec
                })
            })
            .collect();

        self.output_message(&json!({
            "type": "BATCHES",
            "request": request,
            "batches": batches,
            "stats": stats,
            "resolved_at": chrono::Utc::now().to_rfc3339()
        }));

        Ok(())
    }

    /// Open the datasource's connector
    async fn connect(&self, datasource: &Datasource) -> Result<Arc<dyn DataConnector>> {
        tracing::debug!("Connecting datasource {}", datasource.name());
        datasource.connect().await
    }

    /// Output a message
    fn output_message(&self, msg: &Value) {
        match self.cli.format {
            OutputFormat::Json => {
                println!("{}", serde_json::to_string(msg).unwrap_or_default());
            }
            OutputFormat::Pretty => {
                println!("{}", serde_json::to_string_pretty(msg).unwrap_or_default());
            }
        }
    }
}

/// Typed value for a `field=value` filter option
///
/// SQL column partitions carry integer date parts, so numeric values are
/// compared as integers there (`month=01` matches month 1). File partitions
/// keep the captured text and compare strings.
fn option_value(family: ConnectorFamily, raw: &str) -> PartitionValue {
    match family {
        ConnectorFamily::Sql => raw
            .trim()
            .parse::<i64>()
            .map_or_else(|_| PartitionValue::from(raw), PartitionValue::Int),
        ConnectorFamily::FilePath => PartitionValue::from(raw),
    }
}

/// Parse `key=json` pairs, falling back to a plain string when the value is not JSON
fn parse_read_options(pairs: &[(String, String)]) -> ReadOptions {
    pairs
        .iter()
        .map(|(key, raw)| {
            let value = serde_json::from_str(raw).unwrap_or_else(|_| Value::String(raw.clone()));
            (key.clone(), value)
        })
        .collect()
}
