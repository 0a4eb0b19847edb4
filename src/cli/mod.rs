//! CLI module
//!
//! Command-line interface for inspecting datasources and resolving batches.
//!
//! # Commands
//!
//! - `validate` - Validate the definition and test the connection
//! - `assets` - List assets and their batch definitions
//! - `types` - List registered asset types
//! - `partitions` - List raw partitions of an asset
//! - `resolve` - Resolve a batch request into batch specs

mod commands;
mod runner;

pub use commands::{Cli, Commands, OutputFormat};
pub use runner::Runner;
