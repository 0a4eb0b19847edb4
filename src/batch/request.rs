//! Batch requests and their resolution into batch specs

use super::spec::{BatchSpec, BatchSpecTemplate};
use crate::asset::{Datasource, DataAsset};
use crate::connector::{DataConnector, ListContext};
use crate::error::{Error, Result};
use crate::partition::{BatchOptions, PartitionValue, PartitionerKind, Partitioner};
use crate::sort::{sort_by_keys, Sorter};
use crate::types::ReadOptions;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Instant;

// ============================================================================
// Batch Request
// ============================================================================

/// A request for the batches of one asset
///
/// Missing option fields are wildcards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchRequest {
    pub datasource_name: String,
    pub asset_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub batch_definition: Option<String>,
    #[serde(default)]
    pub options: BatchOptions,
    #[serde(default)]
    pub batch_spec_passthrough: ReadOptions,
}

impl BatchRequest {
    /// Unconstrained request against the asset's default batch definition
    pub fn new(datasource_name: impl Into<String>, asset_name: impl Into<String>) -> Self {
        Self {
            datasource_name: datasource_name.into(),
            asset_name: asset_name.into(),
            batch_definition: None,
            options: BatchOptions::new(),
            batch_spec_passthrough: ReadOptions::new(),
        }
    }

    /// Target a named batch definition
    #[must_use]
    pub fn with_batch_definition(mut self, name: impl Into<String>) -> Self {
        self.batch_definition = Some(name.into());
        self
    }

    /// Replace all constraints
    #[must_use]
    pub fn with_options(mut self, options: BatchOptions) -> Self {
        self.options = options;
        self
    }

    /// Constrain one field
    #[must_use]
    pub fn with_option(mut self, field: impl Into<String>, value: impl Into<PartitionValue>) -> Self {
        self.options.insert(field.into(), value.into());
        self
    }

    /// Read options merged into every resulting spec
    #[must_use]
    pub fn with_passthrough(mut self, passthrough: ReadOptions) -> Self {
        self.batch_spec_passthrough = passthrough;
        self
    }
}

// ============================================================================
// Resolution
// ============================================================================

/// Stages a request passes through
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResolutionStage {
    Configured,
    Enumerated,
    Filtered,
    Sorted,
    Resolved,
}

impl fmt::Display for ResolutionStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResolutionStage::Configured => write!(f, "configured"),
            ResolutionStage::Enumerated => write!(f, "enumerated"),
            ResolutionStage::Filtered => write!(f, "filtered"),
            ResolutionStage::Sorted => write!(f, "sorted"),
            ResolutionStage::Resolved => write!(f, "resolved"),
        }
    }
}

/// Statistics from one resolution
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ResolutionStats {
    /// Partitions returned by the connector
    pub enumerated: usize,
    /// Partitions left after filtering
    pub matched: usize,
    /// Duration in milliseconds
    pub duration_ms: u64,
}

/// Everything the request needs, checked before any I/O
struct Plan<'a> {
    asset: &'a DataAsset,
    definition_name: Option<String>,
    partitioner: Option<&'a Partitioner>,
    order: BatchOrder,
    template: BatchSpecTemplate,
}

/// How survivors are ordered
enum BatchOrder {
    /// Multi-key sort over key fields
    Keys(Vec<Sorter>),
    /// Path partitioner: order by location
    Location { ascending: bool },
}

fn plan<'a>(datasource: &'a Datasource, request: &BatchRequest) -> Result<Plan<'a>> {
    if request.datasource_name != datasource.name() {
        return Err(Error::invalid_value(
            "datasource_name",
            format!(
                "request targets '{}' but was resolved against '{}'",
                request.datasource_name,
                datasource.name()
            ),
        ));
    }

    let asset = datasource.get_asset(&request.asset_name)?;
    let definition = asset.resolve_definition(request.batch_definition.as_deref())?;
    let partitioner = definition.and_then(|d| d.partitioner.as_ref());
    let params = definition.map_or(&[][..], |d| d.param_names());

    if let Some(field) = request.options.keys().find(|k| !params.contains(k)) {
        return Err(Error::unknown_field(
            asset.name(),
            field,
            "batch request options",
        ));
    }

    let registry = datasource.registry();
    registry.validate_read_options(
        asset.name(),
        asset.asset_type(),
        &request.batch_spec_passthrough,
    )?;
    let reader_method = &registry.get(asset.asset_type())?.reader_method;

    let order = match partitioner {
        _ if !asset.order_by().is_empty() => BatchOrder::Keys(asset.order_by().to_vec()),
        Some(p) if p.kind() == PartitionerKind::Path => BatchOrder::Location {
            ascending: p.sort_ascending(),
        },
        Some(p) => BatchOrder::Keys(
            p.param_names()
                .iter()
                .map(|name| Sorter {
                    key: name.clone(),
                    reverse: !p.sort_ascending(),
                })
                .collect(),
        ),
        None => BatchOrder::Keys(Vec::new()),
    };

    let definition_name = definition.map(|d| d.name.clone());
    let template = BatchSpecTemplate::new(
        datasource.name(),
        asset.name(),
        definition_name.clone(),
        reader_method.as_str(),
        asset.read_options(),
        &request.batch_spec_passthrough,
    );

    Ok(Plan {
        asset,
        definition_name,
        partitioner,
        order,
        template,
    })
}

/// Run every configuration check of a request without touching any store
///
/// Callers that open a connector per request (the CLI) call this first so a
/// misconfigured request never reaches the network or filesystem.
pub fn validate_request(datasource: &Datasource, request: &BatchRequest) -> Result<()> {
    plan(datasource, request).map(|_| ())
}

/// Resolve a request into an ordered list of batch specs
///
/// Configuration errors are raised before the connector is called. An empty
/// result is not an error.
pub async fn resolve(
    datasource: &Datasource,
    connector: &dyn DataConnector,
    request: &BatchRequest,
    ctx: &ListContext,
) -> Result<Vec<BatchSpec>> {
    resolve_with_stats(datasource, connector, request, ctx)
        .await
        .map(|(specs, _)| specs)
}

/// Resolve a request, also returning resolution statistics
pub async fn resolve_with_stats(
    datasource: &Datasource,
    connector: &dyn DataConnector,
    request: &BatchRequest,
    ctx: &ListContext,
) -> Result<(Vec<BatchSpec>, ResolutionStats)> {
    let start = Instant::now();
    let mut stats = ResolutionStats::default();

    let plan = plan(datasource, request)?;
    let asset_name = plan.asset.name();
    if connector.family() != plan.asset.source().family() {
        return Err(Error::config(format!(
            "Asset '{}' needs a {} connector, got {}",
            asset_name,
            plan.asset.source().family(),
            connector.describe()
        )));
    }
    tracing::debug!(
        "[{}] {}.{} definition={:?} options={:?}",
        ResolutionStage::Configured,
        datasource.name(),
        asset_name,
        plan.definition_name,
        request.options
    );

    let mut partitions = connector
        .list_partitions(plan.asset, plan.partitioner, ctx)
        .await?;
    stats.enumerated = partitions.len();
    tracing::debug!(
        "[{}] {}: {} partitions from {}",
        ResolutionStage::Enumerated,
        asset_name,
        partitions.len(),
        connector.describe()
    );

    partitions.retain(|partition| partition.key.matches(&request.options));
    stats.matched = partitions.len();
    tracing::debug!(
        "[{}] {}: {} of {} partitions match",
        ResolutionStage::Filtered,
        asset_name,
        stats.matched,
        stats.enumerated
    );

    match &plan.order {
        BatchOrder::Keys(sorters) => sort_by_keys(&mut partitions, sorters, |p| &p.key),
        BatchOrder::Location { ascending } => {
            partitions.sort_by(|a, b| a.location.as_str().cmp(b.location.as_str()));
            if !ascending {
                partitions.reverse();
            }
        }
    }
    tracing::debug!("[{}] {}", ResolutionStage::Sorted, asset_name);

    let specs: Vec<BatchSpec> = partitions
        .into_iter()
        .map(|partition| connector.build_batch_spec(&plan.template, partition))
        .collect();

    stats.duration_ms = start.elapsed().as_millis() as u64;
    tracing::info!(
        "[{}] {}.{}: {} batches in {}ms",
        ResolutionStage::Resolved,
        datasource.name(),
        asset_name,
        specs.len(),
        stats.duration_ms
    );

    Ok((specs, stats))
}
