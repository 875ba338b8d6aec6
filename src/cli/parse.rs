//! CLI parse: clap types for permadeploy. No behavior; definitions only.

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// permadeploy - incremental deployment of static sites to content-addressed storage
#[derive(Parser, Debug)]
#[command(name = "permadeploy")]
#[command(about = "Incremental deployment of static sites to content-addressed storage")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Directory holding permadeploy.toml
    #[arg(long, default_value = ".")]
    pub workspace: PathBuf,

    /// Configuration file path (replaces permadeploy.toml)
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Enable debug logging
    #[arg(long, short = 'v')]
    pub verbose: bool,

    /// Log level (trace, debug, info, warn, error, off)
    #[arg(long)]
    pub log_level: Option<String>,

    /// Log format (json, text)
    #[arg(long)]
    pub log_format: Option<String>,

    /// Log output (stdout, stderr, file)
    #[arg(long)]
    pub log_output: Option<String>,

    /// Log file path (if output is "file")
    #[arg(long)]
    pub log_file: Option<PathBuf>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Upload changed files and publish a new manifest
    Deploy {
        /// Build output directory to deploy
        #[arg(default_value = ".")]
        root: PathBuf,
        /// Run against in-memory stores; nothing is uploaded or persisted
        #[arg(long)]
        dry_run: bool,
        /// Ignore the stored snapshot and upload every file
        #[arg(long)]
        force: bool,
        /// Override the configured upload batch size
        #[arg(long)]
        batch_size: Option<usize>,
        /// Output format
        #[arg(long, value_enum, default_value = "text")]
        format: OutputFormat,
    },
    /// Show what the next deployment would upload, keep and drop
    Plan {
        #[arg(default_value = ".")]
        root: PathBuf,
        #[arg(long, value_enum, default_value = "text")]
        format: OutputFormat,
    },
    /// List the files eligible for deployment
    Collect {
        #[arg(default_value = ".")]
        root: PathBuf,
        #[arg(long, value_enum, default_value = "text")]
        format: OutputFormat,
    },
    /// Show the stored deployment snapshot
    Snapshot {
        #[arg(long, value_enum, default_value = "text")]
        format: OutputFormat,
        /// Delete the stored snapshot so the next deployment uploads everything
        #[arg(long)]
        clear: bool,
    },
}
