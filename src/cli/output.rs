//! CLI output: error mapping from domain errors to stable CLI surface.

use crate::error::BuildError;

/// Map build errors to a string for CLI output.
pub fn map_error(e: &BuildError) -> String {
    match e {
        BuildError::RunFailed { failed } => format!(
            "Generation failed for {} unit(s):\n  {}",
            failed.len(),
            failed.join("\n  ")
        ),
        other => other.to_string(),
    }
}
