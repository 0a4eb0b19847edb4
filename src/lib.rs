// Allow common clippy pedantic lints that aren't critical for this codebase
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::cast_sign_loss)]
#![allow(clippy::too_many_lines)]
#![allow(clippy::unused_self)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::items_after_statements)]
#![allow(clippy::match_same_arms)]
#![allow(clippy::needless_pass_by_value)]
#![allow(clippy::unused_async)]

//! # batchkit
//!
//! Batch resolution and partitioning for data-quality pipelines.
//!
//! A datasource owns named data assets (file collections or SQL tables and
//! queries). Each asset carries batch definitions that say how its data is
//! split into partitions. A [`BatchRequest`] names an asset, a batch
//! definition and filter options; resolving it lists the partitions through a
//! [`DataConnector`], keeps the ones matching the options, sorts them and
//! returns one [`BatchSpec`] per survivor.
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use batchkit::{load_datasource, resolve, BatchRequest, ListContext};
//!
//! #[tokio::main]
//! async fn main() -> batchkit::Result<()> {
//!     let datasource = load_datasource("datasources/lake.yaml")?;
//!     let connector = datasource.connect().await?;
//!
//!     let request = BatchRequest::new("lake", "taxi").with_option("year", "2019");
//!     let specs = resolve(&datasource, connector.as_ref(), &request, &ListContext::new()).await?;
//!     for spec in specs {
//!         println!("{} -> {}", spec.batch_id(), spec.location);
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │  BatchRequest → Configured → Enumerated → Filtered → Sorted  │
//! │                                              → Resolved      │
//! └──────────────────────────────────────────────────────────────┘
//!                               │
//! ┌────────────┬────────────────┴──┬──────────────┬─────────────┐
//! │   Asset    │    Partitioner    │    Sorter    │  Connector  │
//! ├────────────┼───────────────────┼──────────────┼─────────────┤
//! │ Datasource │ Yearly / Monthly  │ Multi-key    │ Object store│
//! │ Definitions│ Daily / Path      │ Reverse      │ DuckDB SQL  │
//! │ Registry   │ Column (SQL)      │              │             │
//! └────────────┴───────────────────┴──────────────┴─────────────┘
//! ```

#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::doc_markdown)]

// ============================================================================
// Module declarations
// ============================================================================

/// Error types
pub mod error;

/// Common types and type aliases
pub mod types;

/// Partition keys and partitioners
pub mod partition;

/// Multi-key sorting
pub mod sort;

/// Data connectors (object store, SQL)
pub mod connector;

/// Datasources, data assets and batch definitions
pub mod asset;

/// Batch requests, resolution and batch specs
pub mod batch;

/// YAML loader for datasource definitions
pub mod loader;

/// Environment variable interpolation
pub mod template;

/// Command-line interface
pub mod cli;

// ============================================================================
// Re-exports
// ============================================================================

pub use error::{Error, ErrorKind, Result};
pub use types::*;

// Re-export commonly used types
pub use asset::{AssetSource, BatchDefinition, DataAsset, Datasource};
pub use batch::{resolve, resolve_with_stats, validate_request, BatchRequest, BatchSpec};
pub use connector::{CancellationToken, DataConnector, ListContext};
pub use loader::{load_datasource, load_datasource_from_str};
pub use partition::{Partitioner, PartitionerKind, PartitionKey, PartitionValue};
pub use sort::Sorter;

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Crate name
pub const NAME: &str = env!("CARGO_PKG_NAME");
