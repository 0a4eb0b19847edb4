//! Resolved batch descriptors

use crate::partition::{Location, Partition, PartitionKey};
use crate::types::ReadOptions;
use serde::Serialize;

/// Immutable, fully resolved description of one batch
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BatchSpec {
    pub datasource_name: String,
    pub asset_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub batch_definition: Option<String>,
    pub location: Location,
    /// Partition identity, in the partitioner's param order
    #[serde(rename = "batch_identifiers")]
    pub key: PartitionKey,
    pub reader_method: String,
    pub read_options: ReadOptions,
}

impl BatchSpec {
    /// Stable human-readable id, e.g. `ds-trips-year_2019-month_01`
    ///
    /// Path partitions carry no key and are identified by their location.
    pub fn batch_id(&self) -> String {
        let mut id = format!("{}-{}", self.datasource_name, self.asset_name);
        for (field, value) in self.key.iter() {
            id.push_str(&format!("-{field}_{value}"));
        }
        if self.key.is_empty() {
            if let Location::Path(path) = &self.location {
                id.push_str(&format!("-path_{path}"));
            }
        }
        id
    }
}

/// The static part of every batch spec of one resolution
///
/// Holds asset identity and merged read options; [`BatchSpecTemplate::build`]
/// adds the per-batch location and key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchSpecTemplate {
    pub datasource_name: String,
    pub asset_name: String,
    pub batch_definition: Option<String>,
    pub reader_method: String,
    pub read_options: ReadOptions,
}

impl BatchSpecTemplate {
    /// Merge asset read options with request passthrough (passthrough wins)
    pub fn new(
        datasource_name: impl Into<String>,
        asset_name: impl Into<String>,
        batch_definition: Option<String>,
        reader_method: impl Into<String>,
        asset_options: &ReadOptions,
        passthrough: &ReadOptions,
    ) -> Self {
        let mut read_options = asset_options.clone();
        read_options.extend(passthrough.iter().map(|(k, v)| (k.clone(), v.clone())));

        Self {
            datasource_name: datasource_name.into(),
            asset_name: asset_name.into(),
            batch_definition,
            reader_method: reader_method.into(),
            read_options,
        }
    }

    /// Build the spec for one partition
    pub fn build(&self, partition: Partition) -> BatchSpec {
        BatchSpec {
            datasource_name: self.datasource_name.clone(),
            asset_name: self.asset_name.clone(),
            batch_definition: self.batch_definition.clone(),
            location: partition.location,
            key: partition.key,
            reader_method: self.reader_method.clone(),
            read_options: self.read_options.clone(),
        }
    }
}
