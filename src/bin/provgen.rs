//! provgen command-line entry point

use anyhow::Context;
use clap::Parser;
use provgen::cli::{map_error, Cli, RunContext};
use provgen::config::ConfigLoader;
use provgen::logging::{init_logging, LoggingConfig};
use std::process::ExitCode;

fn main() -> ExitCode {
    let cli = Cli::parse();
    match run(&cli) {
        Ok(output) => {
            println!("{}", output);
            ExitCode::SUCCESS
        }
        Err(e) => {
            tracing::error!(error = %e, "provgen failed");
            eprintln!("{:#}", e);
            ExitCode::from(1)
        }
    }
}

fn run(cli: &Cli) -> anyhow::Result<String> {
    init_logging(&logging_config(cli), &cli.workspace)
        .context("Failed to initialize logging")?;
    tracing::debug!(workspace = %cli.workspace.display(), command = ?cli.command, "provgen starting");

    let context = RunContext::new(cli.workspace.clone(), cli.config.clone())
        .map_err(|e| anyhow::anyhow!(map_error(&e)))
        .context("Invalid configuration")?;
    context
        .execute(&cli.command)
        .map_err(|e| anyhow::anyhow!(map_error(&e)))
}

/// Logging section of the configuration, with the command-line flags on top.
///
/// A configuration that fails to load falls back to default logging; the
/// error itself is reported once the run context loads it again.
fn logging_config(cli: &Cli) -> LoggingConfig {
    let loaded = match &cli.config {
        Some(path) => ConfigLoader::load_from_file(path),
        None => ConfigLoader::load(&cli.workspace),
    };
    let mut logging = loaded.map(|c| c.logging).unwrap_or_default();

    if cli.verbose {
        logging.level = "debug".to_string();
    }
    let overrides = [
        (&cli.log_level, &mut logging.level),
        (&cli.log_format, &mut logging.format),
        (&cli.log_output, &mut logging.output),
    ];
    for (flag, target) in overrides {
        if let Some(value) = flag {
            *target = value.clone();
        }
    }
    logging
}
