//! Asset module
//!
//! Datasources, the assets they serve and each asset's batch definitions.
//!
//! # Overview
//!
//! - [`Datasource`] - named connection owning uniquely-named assets
//! - [`DataAsset`] - file, table or query source with sorters and read options
//! - [`BatchDefinition`] - named partitioner (or whole-table) configuration
//! - [`AssetTypeRegistry`] - asset type tags, reader methods and allowed read options

mod datasource;
mod registry;
mod types;

pub use datasource::{ConnectionConfig, Datasource};
pub use registry::{AssetTypeInfo, AssetTypeRegistry};
pub use types::{AssetSource, BatchDefinition, DataAsset};
