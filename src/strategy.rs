//! Generation strategies: how inputs are cut into units and what gets
//! cleaned before a unit regenerates.

pub mod batch;
pub mod per_artifact;

pub use batch::BatchStrategy;
pub use per_artifact::PerArtifactStrategy;

use crate::changes::FileChange;
use crate::diagnostics::BuildLogger;
use crate::error::BuildError;
use crate::unit::{GenerationUnit, TaskLayout};
use crate::uptodate::{Staleness, UpToDateEngine};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};

/// Scheduling policy of a task
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StrategyKind {
    /// One unit and report per input file
    #[default]
    PerArtifact,
    /// One unit and report for the whole input set
    Batch,
}

impl fmt::Display for StrategyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StrategyKind::PerArtifact => f.write_str("per_artifact"),
            StrategyKind::Batch => f.write_str("batch"),
        }
    }
}

impl StrategyKind {
    pub fn strategy(self) -> Box<dyn GenerationStrategy> {
        match self {
            StrategyKind::PerArtifact => Box::new(PerArtifactStrategy),
            StrategyKind::Batch => Box::new(BatchStrategy),
        }
    }
}

/// Outcome of planning one run
#[derive(Debug, Default)]
pub struct WorkPlan {
    /// Units to regenerate, already cleaned, with the reason
    pub stale: Vec<(GenerationUnit, Staleness)>,
    pub up_to_date: Vec<GenerationUnit>,
    /// Files deleted while cleaning
    pub cleaned: usize,
    /// Inputs that disappeared and had their outputs removed
    pub removed_inputs: Vec<PathBuf>,
}

pub trait GenerationStrategy: Send + Sync {
    fn kind(&self) -> StrategyKind;

    /// Units for the current inputs of `layout`
    fn units(&self, layout: &TaskLayout) -> Result<Vec<GenerationUnit>, BuildError>;

    /// Staleness of every unit, without touching the filesystem
    fn assess(
        &self,
        layout: &TaskLayout,
        changes: &[FileChange],
        force: bool,
        engine: &UpToDateEngine,
        logger: &dyn BuildLogger,
    ) -> Result<Vec<(GenerationUnit, Staleness)>, BuildError>;

    /// Decide what regenerates, cleaning stale units as a side effect
    fn plan(
        &self,
        layout: &TaskLayout,
        changes: &[FileChange],
        force: bool,
        engine: &UpToDateEngine,
        logger: &dyn BuildLogger,
    ) -> Result<WorkPlan, BuildError>;
}

/// Delete a unit's reported outputs and its report directory
pub fn clean_unit(unit: &GenerationUnit, logger: &dyn BuildLogger) -> Result<usize, BuildError> {
    let report = unit.load_report(logger);
    let deleted = report.delete_generated_files(logger);
    remove_dir_if_exists(&unit.report_dir)?;
    Ok(deleted)
}

pub(crate) fn remove_dir_if_exists(path: &Path) -> Result<(), BuildError> {
    match std::fs::remove_dir_all(path) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(source) => Err(BuildError::Clean {
            path: path.to_path_buf(),
            source,
        }),
    }
}
