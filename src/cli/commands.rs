//! CLI commands and argument parsing

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Batch resolution and partitioning CLI
#[derive(Parser, Debug)]
#[command(name = "batchkit")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Datasource definition file (YAML)
    #[arg(short, long, global = true)]
    pub datasource: Option<PathBuf>,

    /// Output format
    #[arg(short, long, global = true, default_value = "json")]
    pub format: OutputFormat,

    /// Verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

/// CLI subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Validate the datasource definition and test its connection
    Validate {
        /// Only validate the definition, do not connect
        #[arg(long)]
        offline: bool,
    },

    /// List assets with their batch definitions and parameters
    Assets,

    /// List registered asset types and their read options
    Types,

    /// List every partition of an asset, unfiltered and unsorted
    Partitions {
        /// Asset name
        #[arg(short, long)]
        asset: String,

        /// Batch definition name (defaults to the asset's first)
        #[arg(short, long)]
        batch_definition: Option<String>,

        /// Listing timeout in seconds
        #[arg(long)]
        timeout_secs: Option<u64>,
    },

    /// Resolve a batch request into ordered batch specs
    Resolve {
        /// Asset name
        #[arg(short, long)]
        asset: String,

        /// Batch definition name (defaults to the asset's first)
        #[arg(short, long)]
        batch_definition: Option<String>,

        /// Filter option as field=value (repeatable); numeric values are compared as integers for SQL assets
        #[arg(short, long = "option", value_parser = parse_key_value)]
        options: Vec<(String, String)>,

        /// Read option passed through to every batch spec as key=json (repeatable)
        #[arg(long = "read-option", value_parser = parse_key_value)]
        read_options: Vec<(String, String)>,

        /// Listing timeout in seconds
        #[arg(long)]
        timeout_secs: Option<u64>,
    },
}

/// Output format
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    /// JSON output (one message per line)
    Json,
    /// Human-readable output
    Pretty,
}

/// Parse `key=value`
fn parse_key_value(s: &str) -> Result<(String, String), String> {
    let (key, value) = s
        .split_once('=')
        .ok_or_else(|| format!("expected key=value, got '{s}'"))?;
    let key = key.trim();
    if key.is_empty() {
        return Err(format!("missing key in '{s}'"));
    }
    Ok((key.to_string(), value.to_string()))
}
