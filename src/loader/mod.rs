//! YAML Loader module
//!
//! Parse datasource definitions from YAML files.
//!
//! # Overview
//!
//! The loader module provides:
//! - `DatasourceDefinition` - Declarative datasource specification
//! - `AssetDefinition` - Asset configuration with inline read options
//! - YAML parsing with validation into runtime [`Datasource`](crate::asset::Datasource)s

mod parser;
mod types;

pub use parser::{build_datasource, load_datasource, load_datasource_from_str, parse_definition};
pub use types::{
    AssetDefinition, BatchDefinitionDef, DatasourceDefinition, PartitionerDefinition,
    SorterDefinition,
};
