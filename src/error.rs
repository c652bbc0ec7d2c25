//! Error types for provenance-driven incremental generation.

use std::path::PathBuf;
use thiserror::Error;

/// Provenance report parse errors
///
/// Only surfaced by the strict parser; `ProvenanceReport::load` degrades these
/// to a report without history.
#[derive(Debug, Error)]
pub enum ProvenanceError {
    #[error("Malformed report line {line}: {reason}")]
    MalformedLine { line: usize, reason: String },

    #[error("Invalid path in report: {0}")]
    InvalidPath(String),

    #[error("Report I/O error: {0}")]
    IoError(#[from] std::io::Error),
}

/// Execution context pool errors
#[derive(Debug, Error)]
pub enum PoolError {
    #[error("Failed to create execution context: {0}")]
    ContextCreation(String),

    #[error("Failed to close execution context: {0}")]
    ContextClose(String),
}

/// Generator execution errors
#[derive(Debug, Error)]
pub enum ExecutionError {
    #[error("Entry point not found: {0}")]
    EntryPointNotFound(String),

    #[error("Entry point {entry_point} has no method '{method}'")]
    UnknownMethod { entry_point: String, method: String },

    #[error("Failed to instantiate {entry_point}: {message}")]
    Instantiation { entry_point: String, message: String },

    #[error("Generator {entry_point} failed: {message}")]
    GenerationFailed { entry_point: String, message: String },

    #[error("Generator {entry_point} panicked: {message}")]
    Panicked { entry_point: String, message: String },

    #[error("Pool error: {0}")]
    Pool(#[from] PoolError),
}

/// Build-level errors
#[derive(Debug, Error)]
pub enum BuildError {
    #[error("Unit {unit} failed: {source}")]
    Execution {
        unit: String,
        #[source]
        source: ExecutionError,
    },

    #[error("Failed to clean {path:?}: {source}")]
    Clean {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Snapshot error: {0}")]
    Snapshot(String),

    #[error("Walk error: {0}")]
    Walk(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Generation failed for {} unit(s): {}", .failed.len(), .failed.join(", "))]
    RunFailed { failed: Vec<String> },

    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),
}

impl From<config::ConfigError> for BuildError {
    fn from(err: config::ConfigError) -> Self {
        BuildError::ConfigError(err.to_string())
    }
}
