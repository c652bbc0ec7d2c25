//! CLI parse: clap types for provgen. No behavior; definitions only.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// provgen - provenance-driven incremental code generation
#[derive(Parser)]
#[command(name = "provgen")]
#[command(about = "Incremental, isolated code generation driven by provenance reports")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Workspace root directory
    #[arg(long, default_value = ".")]
    pub workspace: PathBuf,

    /// Configuration file path (overrides default config loading)
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Enable verbose logging (default: off)
    #[arg(long, default_value = "false")]
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
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Commands {
    /// Regenerate every unit whose inputs changed since the last successful build
    Build {
        /// Run the generator without isolation (interactive debugging)
        #[arg(long)]
        debug: bool,
        /// Regenerate every unit regardless of provenance
        #[arg(long)]
        force: bool,
        /// Skip the consistency check after generation
        #[arg(long)]
        no_check: bool,
    },
    /// Show which units are up to date, without running anything
    Status {
        /// Output format (text or json)
        #[arg(long, default_value = "text")]
        format: String,
    },
    /// Check the current reports for consistency
    Check,
    /// Delete generated files, reports and the input snapshot
    Clean,
}
