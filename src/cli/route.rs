//! CLI route: single route table and run context.

use crate::build::{BuildOptions, IncrementalBuild};
use crate::cli::parse::Commands;
use crate::cli::presentation::{
    format_build_summary, format_consistency_report, format_status_json, format_status_text,
};
use crate::config::{ConfigLoader, ProvgenConfig};
use crate::diagnostics::TracingLogger;
use crate::error::BuildError;
use crate::execution::ModuleCatalog;
use std::path::PathBuf;
use std::time::Instant;

/// Runtime context for CLI execution: workspace and validated configuration.
pub struct RunContext {
    workspace_root: PathBuf,
    config: ProvgenConfig,
}

impl RunContext {
    /// Load and validate configuration for `workspace_root`
    pub fn new(workspace_root: PathBuf, config_path: Option<PathBuf>) -> Result<Self, BuildError> {
        let config = match config_path {
            Some(ref path) => ConfigLoader::load_from_file(path)?,
            None => ConfigLoader::load(&workspace_root)?,
        };
        config.validate().map_err(|errors| {
            let messages: Vec<String> = errors.iter().map(|e| e.to_string()).collect();
            BuildError::ConfigError(format!(
                "Configuration validation failed:\n{}",
                messages.join("\n")
            ))
        })?;
        Ok(Self {
            workspace_root,
            config,
        })
    }

    pub fn config(&self) -> &ProvgenConfig {
        &self.config
    }

    /// Execute a CLI command via the single route table.
    pub fn execute(&self, command: &Commands) -> Result<String, BuildError> {
        let started = Instant::now();
        let result = match command {
            Commands::Build {
                debug,
                force,
                no_check,
            } => self.handle_build(*debug, *force, *no_check),
            Commands::Status { format } => self.handle_status(format),
            Commands::Check => self.handle_check(),
            Commands::Clean => self.handle_clean(),
        };
        tracing::debug!(
            command = ?command,
            ok = result.is_ok(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Command finished"
        );
        result
    }

    fn build(&self, config: &ProvgenConfig) -> Result<IncrementalBuild, BuildError> {
        IncrementalBuild::from_config(
            config,
            &self.workspace_root,
            ModuleCatalog::new(),
            TracingLogger::shared("provgen::build"),
        )
    }

    fn handle_build(&self, debug: bool, force: bool, no_check: bool) -> Result<String, BuildError> {
        if self.config.task.generator.command.is_empty() {
            return Err(BuildError::ConfigError(
                "task.generator.command is required to build from the command line".to_string(),
            ));
        }
        let mut config = self.config.clone();
        config.execution.debug |= debug;

        let build = self.build(&config)?.with_options(BuildOptions {
            force,
            check_consistency: !no_check,
            max_workers: config.execution.workers(),
        });
        let summary = build.run_from_snapshot()?;
        Ok(format_build_summary(&summary))
    }

    fn handle_status(&self, format: &str) -> Result<String, BuildError> {
        let statuses = self.build(&self.config)?.status()?;
        match format {
            "json" => format_status_json(&statuses),
            "text" => Ok(format_status_text(&statuses)),
            other => Err(BuildError::ConfigError(format!(
                "Invalid format: {} (must be 'text' or 'json')",
                other
            ))),
        }
    }

    fn handle_check(&self) -> Result<String, BuildError> {
        let report = self.build(&self.config)?.check()?;
        Ok(format_consistency_report(&report))
    }

    fn handle_clean(&self) -> Result<String, BuildError> {
        let deleted = self.build(&self.config)?.clean()?;
        Ok(format!("Deleted {} generated file(s)", deleted))
    }
}
