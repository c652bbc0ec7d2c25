//! One unit for the whole input set.

use super::{remove_dir_if_exists, GenerationStrategy, StrategyKind, WorkPlan};
use crate::changes::FileChange;
use crate::diagnostics::BuildLogger;
use crate::error::BuildError;
use crate::tree::path::canonicalize_lenient;
use crate::tree::walker::Walker;
use crate::unit::{GenerationUnit, TaskLayout};
use crate::uptodate::{Staleness, UpToDateEngine};

/// All inputs share one report at a fixed location
///
/// Besides the report's own read and existence-checked files, an input file
/// appearing or disappearing makes the batch stale: a new input has never been
/// read, so the report alone cannot notice it.
#[derive(Debug, Clone, Copy, Default)]
pub struct BatchStrategy;

impl BatchStrategy {
    fn input_set_change(layout: &TaskLayout, changes: &[FileChange]) -> Option<FileChange> {
        changes.iter().find_map(|change| {
            if !change.kind.alters_existence() {
                return None;
            }
            let path = canonicalize_lenient(&change.path).ok()?;
            layout
                .is_input_candidate(&path)
                .then(|| FileChange::new(path, change.kind))
        })
    }
}

impl GenerationStrategy for BatchStrategy {
    fn kind(&self) -> StrategyKind {
        StrategyKind::Batch
    }

    fn units(&self, layout: &TaskLayout) -> Result<Vec<GenerationUnit>, BuildError> {
        Ok(vec![layout.batch_unit(layout.input_files()?)])
    }

    fn assess(
        &self,
        layout: &TaskLayout,
        changes: &[FileChange],
        force: bool,
        engine: &UpToDateEngine,
        logger: &dyn BuildLogger,
    ) -> Result<Vec<(GenerationUnit, Staleness)>, BuildError> {
        let unit = layout.batch_unit(layout.input_files()?);
        let mut staleness = if force {
            Staleness::Forced
        } else {
            engine.check(&unit.label, &unit.load_report(logger), changes)
        };
        if staleness.is_up_to_date() {
            if let Some(change) = Self::input_set_change(layout, changes) {
                logger.info(&format!(
                    "{}: input {} was {}, regenerating",
                    unit.label,
                    change.path.display(),
                    change.kind
                ));
                staleness = Staleness::Changed(change);
            }
        }
        Ok(vec![(unit, staleness)])
    }

    fn plan(
        &self,
        layout: &TaskLayout,
        changes: &[FileChange],
        force: bool,
        engine: &UpToDateEngine,
        logger: &dyn BuildLogger,
    ) -> Result<WorkPlan, BuildError> {
        let mut plan = WorkPlan::default();
        for (unit, staleness) in self.assess(layout, changes, force, engine, logger)? {
            if staleness.is_up_to_date() {
                plan.up_to_date.push(unit);
                continue;
            }
            plan.cleaned += Walker::new(unit.output_dir.clone())
                .files()
                .map(|files| files.len())
                .unwrap_or(0);
            remove_dir_if_exists(&unit.output_dir)?;
            remove_dir_if_exists(&unit.report_dir)?;
            plan.stale.push((unit, staleness));
        }
        Ok(plan)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diagnostics::RecordingLogger;
    use crate::provenance::ReportWriter;
    use std::fs;
    use std::path::{Path, PathBuf};
    use std::sync::Arc;
    use tempfile::TempDir;

    fn setup() -> (TempDir, TaskLayout) {
        let temp = TempDir::new().unwrap();
        fs::create_dir_all(temp.path().join("in")).unwrap();
        fs::write(temp.path().join("in/A.g"), "a").unwrap();
        fs::write(temp.path().join("in/B.g"), "b").unwrap();
        let layout = TaskLayout::new(
            "models",
            temp.path(),
            &[PathBuf::from("in")],
            &["g".to_string()],
            Path::new("out"),
            Path::new("reports"),
            &[],
            &[],
        )
        .unwrap();
        (temp, layout)
    }

    fn generate(layout: &TaskLayout) {
        let unit = layout.batch_unit(layout.input_files().unwrap());
        fs::create_dir_all(&layout.output_dir).unwrap();
        let mut writer = ReportWriter::new(&layout.project_root);
        for input in &unit.inputs {
            let out = layout
                .output_dir
                .join(format!("{}.txt", input.file_stem().unwrap().to_string_lossy()));
            fs::write(&out, "x").unwrap();
            writer.generated(&out).read(input);
        }
        writer.write_to(&unit.report_file()).unwrap();
    }

    fn plan(layout: &TaskLayout, changes: &[FileChange]) -> WorkPlan {
        let logger = Arc::new(RecordingLogger::new());
        let engine = UpToDateEngine::new(logger.clone());
        BatchStrategy
            .plan(layout, changes, false, &engine, logger.as_ref())
            .unwrap()
    }

    #[test]
    fn test_unchanged_batch_is_up_to_date() {
        let (_temp, layout) = setup();
        generate(&layout);
        let plan = plan(&layout, &[]);
        assert!(plan.stale.is_empty());
        assert_eq!(plan.up_to_date.len(), 1);
    }

    #[test]
    fn test_stale_batch_wipes_output_and_report() {
        let (_temp, layout) = setup();
        generate(&layout);
        let input = layout.input_files().unwrap()[0].clone();
        let plan = plan(&layout, &[FileChange::modified(input)]);
        assert_eq!(plan.stale.len(), 1);
        assert_eq!(plan.stale[0].0.inputs.len(), 2);
        assert_eq!(plan.cleaned, 2);
        assert!(!layout.output_dir.exists());
        assert!(!plan.stale[0].0.report_dir.exists());
    }

    #[test]
    fn test_new_input_makes_batch_stale() {
        let (temp, layout) = setup();
        generate(&layout);
        let added = temp.path().join("in/C.g");
        fs::write(&added, "c").unwrap();
        let plan = plan(&layout, &[FileChange::added(added)]);
        assert_eq!(plan.stale.len(), 1);
        assert!(matches!(plan.stale[0].1, Staleness::Changed(_)));
        assert_eq!(plan.stale[0].0.inputs.len(), 3);
    }

    #[test]
    fn test_unrelated_addition_is_ignored() {
        let (temp, layout) = setup();
        generate(&layout);
        let notes = temp.path().join("in/notes.md");
        fs::write(&notes, "n").unwrap();
        let plan = plan(&layout, &[FileChange::added(notes)]);
        assert!(plan.stale.is_empty());
    }
}
