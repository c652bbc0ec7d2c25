//! One unit per input file.

use super::{remove_dir_if_exists, GenerationStrategy, StrategyKind, WorkPlan};
use crate::changes::{ChangeKind, FileChange};
use crate::diagnostics::BuildLogger;
use crate::error::BuildError;
use crate::tree::path::canonicalize_lenient;
use crate::unit::{GenerationUnit, TaskLayout};
use crate::uptodate::{Staleness, UpToDateEngine};

/// Each input gets its own report, derived from its project-relative path
#[derive(Debug, Clone, Copy, Default)]
pub struct PerArtifactStrategy;

impl GenerationStrategy for PerArtifactStrategy {
    fn kind(&self) -> StrategyKind {
        StrategyKind::PerArtifact
    }

    fn units(&self, layout: &TaskLayout) -> Result<Vec<GenerationUnit>, BuildError> {
        Ok(layout
            .input_files()?
            .iter()
            .map(|input| layout.artifact_unit(input))
            .collect())
    }

    fn assess(
        &self,
        layout: &TaskLayout,
        changes: &[FileChange],
        force: bool,
        engine: &UpToDateEngine,
        logger: &dyn BuildLogger,
    ) -> Result<Vec<(GenerationUnit, Staleness)>, BuildError> {
        Ok(self
            .units(layout)?
            .into_iter()
            .map(|unit| {
                let staleness = if force {
                    Staleness::Forced
                } else {
                    engine.check(&unit.label, &unit.load_report(logger), changes)
                };
                (unit, staleness)
            })
            .collect())
    }

    fn plan(
        &self,
        layout: &TaskLayout,
        changes: &[FileChange],
        force: bool,
        engine: &UpToDateEngine,
        logger: &dyn BuildLogger,
    ) -> Result<WorkPlan, BuildError> {
        let inputs = layout.input_files()?;
        let mut plan = WorkPlan::default();

        for change in changes.iter().filter(|c| c.kind == ChangeKind::Removed) {
            let path = canonicalize_lenient(&change.path)?;
            if !layout.is_input_candidate(&path) || inputs.contains(&path) {
                continue;
            }
            let unit = layout.artifact_unit(&path);
            let report = unit.load_report(logger);
            if report.exists() {
                plan.cleaned += report.delete_generated_files(logger);
                logger.info(&format!(
                    "{}: input removed, deleted its previous outputs",
                    unit.label
                ));
            }
            remove_dir_if_exists(&unit.report_dir)?;
            plan.removed_inputs.push(path);
        }

        for (unit, staleness) in self.assess(layout, changes, force, engine, logger)? {
            if staleness.is_up_to_date() {
                plan.up_to_date.push(unit);
                continue;
            }
            plan.cleaned += unit.load_report(logger).delete_generated_files(logger);
            remove_dir_if_exists(&unit.report_dir)?;
            plan.stale.push((unit, staleness));
        }

        Ok(plan)
    }
}
