//! Incremental build orchestration
//!
//! One run: the strategy plans and cleans, stale units are dispatched on
//! worker threads, then every report is reloaded and checked for consistency.
//! The input snapshot that feeds the next run's change stream is only written
//! when every unit succeeded.

use crate::changes::snapshot::SNAPSHOT_FILE_NAME;
use crate::changes::{FileChange, InputSnapshot};
use crate::config::ProvgenConfig;
use crate::consistency::{ConsistencyChecker, ConsistencyReport};
use crate::diagnostics::{BuildLogger, RecordingLogger};
use crate::dispatcher::ExecutionDispatcher;
use crate::error::BuildError;
use crate::execution::{CommandEntryPoint, ModuleCatalog, PoolStats};
use crate::provenance::ProvenanceReport;
use crate::strategy::{clean_unit, remove_dir_if_exists, GenerationStrategy};
use crate::unit::{GenerationUnit, TaskLayout};
use crate::uptodate::UpToDateEngine;
use parking_lot::Mutex;
use serde::Serialize;
use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::thread;

/// Builds the generator arguments of a unit
pub trait UnitArguments: Send + Sync {
    fn arguments(&self, unit: &GenerationUnit) -> Vec<String>;
}

impl<F> UnitArguments for F
where
    F: Fn(&GenerationUnit) -> Vec<String> + Send + Sync,
{
    fn arguments(&self, unit: &GenerationUnit) -> Vec<String> {
        self(unit)
    }
}

/// `extra... --input <file>... --output <dir> --report <file> --base <dir>`
#[derive(Debug, Clone, Default)]
pub struct StandardArguments {
    pub extra: Vec<String>,
}

impl UnitArguments for StandardArguments {
    fn arguments(&self, unit: &GenerationUnit) -> Vec<String> {
        let mut args = self.extra.clone();
        for input in &unit.inputs {
            args.push("--input".to_string());
            args.push(input.display().to_string());
        }
        args.push("--output".to_string());
        args.push(unit.output_dir.display().to_string());
        args.push("--report".to_string());
        args.push(unit.report_file().display().to_string());
        args.push("--base".to_string());
        args.push(unit.base_path.display().to_string());
        args
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BuildOptions {
    /// Regenerate every unit regardless of history
    pub force: bool,
    pub check_consistency: bool,
    pub max_workers: usize,
}

impl Default for BuildOptions {
    fn default() -> Self {
        Self {
            force: false,
            check_consistency: true,
            max_workers: 1,
        }
    }
}

/// What one run did
#[derive(Debug, Clone, Default, Serialize)]
pub struct BuildSummary {
    pub regenerated: Vec<String>,
    pub up_to_date: Vec<String>,
    /// Files deleted before regeneration
    pub cleaned: usize,
    pub removed_inputs: Vec<PathBuf>,
    pub consistency: Option<ConsistencyReport>,
    pub pool: Option<PoolStats>,
}

/// Current state of one unit, as shown by `status`
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UnitStatus {
    pub unit: String,
    pub up_to_date: bool,
    pub reason: String,
    pub generated_files: usize,
}

/// An incremental build of one task
pub struct IncrementalBuild {
    layout: TaskLayout,
    strategy: Box<dyn GenerationStrategy>,
    dispatcher: Arc<ExecutionDispatcher>,
    arguments: Arc<dyn UnitArguments>,
    logger: Arc<dyn BuildLogger>,
    options: BuildOptions,
}

impl IncrementalBuild {
    pub fn new(
        layout: TaskLayout,
        strategy: Box<dyn GenerationStrategy>,
        dispatcher: Arc<ExecutionDispatcher>,
        arguments: Arc<dyn UnitArguments>,
        logger: Arc<dyn BuildLogger>,
    ) -> Self {
        Self {
            layout,
            strategy,
            dispatcher,
            arguments,
            logger,
            options: BuildOptions::default(),
        }
    }

    /// Wire a build from configuration
    ///
    /// A configured generator command is registered in `catalog` under the
    /// entry point name.
    pub fn from_config(
        config: &ProvgenConfig,
        workspace_root: &Path,
        catalog: ModuleCatalog,
        logger: Arc<dyn BuildLogger>,
    ) -> Result<Self, BuildError> {
        let layout = config.task.layout(workspace_root)?;
        let generator = &config.task.generator;
        let catalog = match generator.command.split_first() {
            Some((program, leading)) => CommandEntryPoint::register(
                catalog,
                &generator.entry_point,
                program,
                leading.to_vec(),
                &generator.method,
            ),
            None => catalog,
        };
        let settings = config.dispatch_settings(&layout.project_root)?;
        let dispatcher =
            ExecutionDispatcher::from_catalog(Arc::new(catalog), settings, Arc::clone(&logger));
        let options = BuildOptions {
            max_workers: config.execution.workers(),
            ..BuildOptions::default()
        };
        Ok(Self::new(
            layout,
            config.task.strategy.strategy(),
            Arc::new(dispatcher),
            Arc::new(StandardArguments {
                extra: generator.args.clone(),
            }),
            logger,
        )
        .with_options(options))
    }

    pub fn with_options(mut self, options: BuildOptions) -> Self {
        self.options = options;
        self
    }

    pub fn options(&self) -> BuildOptions {
        self.options
    }

    pub fn layout(&self) -> &TaskLayout {
        &self.layout
    }

    pub fn dispatcher(&self) -> &Arc<ExecutionDispatcher> {
        &self.dispatcher
    }

    pub fn snapshot_path(&self) -> PathBuf {
        self.layout.report_root.join(SNAPSHOT_FILE_NAME)
    }

    /// Run against an externally supplied change stream
    pub fn run(&self, changes: &[FileChange]) -> Result<BuildSummary, BuildError> {
        let engine = UpToDateEngine::new(Arc::clone(&self.logger));
        let plan = self.strategy.plan(
            &self.layout,
            changes,
            self.options.force,
            &engine,
            self.logger.as_ref(),
        )?;

        let mut summary = BuildSummary {
            up_to_date: plan.up_to_date.iter().map(|u| u.label.clone()).collect(),
            cleaned: plan.cleaned,
            removed_inputs: plan.removed_inputs,
            ..BuildSummary::default()
        };

        let stale: Vec<GenerationUnit> = plan.stale.into_iter().map(|(unit, _)| unit).collect();
        for unit in &stale {
            for dir in [&unit.output_dir, &unit.report_dir] {
                std::fs::create_dir_all(dir)?;
            }
        }
        summary.regenerated = stale.iter().map(|u| u.label.clone()).collect();

        let failed = self.dispatch_all(stale);
        summary.pool = self.dispatcher.pool_stats();
        if let Some(stats) = &summary.pool {
            tracing::debug!(
                created = stats.created,
                reused = stats.reused,
                closed = stats.closed,
                live = stats.live,
                "Execution pool"
            );
        }
        if !failed.is_empty() {
            self.logger.error(&format!(
                "{} unit(s) failed, skipping consistency check",
                failed.len()
            ));
            return Err(BuildError::RunFailed { failed });
        }

        if self.options.check_consistency {
            summary.consistency = Some(self.check()?);
        }
        self.logger.info(&format!(
            "{}: {} regenerated, {} up to date",
            self.layout.name,
            summary.regenerated.len(),
            summary.up_to_date.len()
        ));
        Ok(summary)
    }

    /// Run against the changes since the last successful run's snapshot
    pub fn run_from_snapshot(&self) -> Result<BuildSummary, BuildError> {
        let snapshot_path = self.snapshot_path();
        let previous = InputSnapshot::load(&snapshot_path)?;
        let current = InputSnapshot::capture(&self.layout.watched_locations())?;
        let changes = InputSnapshot::diff(previous.as_ref(), &current);
        tracing::debug!(changes = changes.len(), "Computed input changes");

        let summary = self.run(&changes)?;
        current.save(&snapshot_path)?;
        Ok(summary)
    }

    /// Labels of failed units, after every unit has run
    fn dispatch_all(&self, units: Vec<GenerationUnit>) -> Vec<String> {
        if units.is_empty() {
            return Vec::new();
        }
        let workers = self.options.max_workers.clamp(1, units.len());
        let queue = Mutex::new(VecDeque::from(units));
        let failed = Mutex::new(Vec::new());

        thread::scope(|scope| {
            for _ in 0..workers {
                scope.spawn(|| loop {
                    let Some(unit) = queue.lock().pop_front() else {
                        break;
                    };
                    let args = self.arguments.arguments(&unit);
                    if self.dispatcher.run(&unit, args).is_err() {
                        failed.lock().push(unit.label.clone());
                    }
                });
            }
        });

        let mut failed = failed.into_inner();
        failed.sort();
        failed
    }

    /// Reload every unit's report
    pub fn reports(&self) -> Result<Vec<(GenerationUnit, ProvenanceReport)>, BuildError> {
        Ok(self
            .strategy
            .units(&self.layout)?
            .into_iter()
            .map(|unit| {
                let report = unit.load_report(self.logger.as_ref());
                (unit, report)
            })
            .collect())
    }

    /// Consistency check over the reports currently on disk
    pub fn check(&self) -> Result<ConsistencyReport, BuildError> {
        let checker = ConsistencyChecker::new(Arc::clone(&self.logger), self.strategy.kind());
        Ok(checker.check(&self.reports()?))
    }

    /// Up-to-date state of every unit against the snapshot, changing nothing
    pub fn status(&self) -> Result<Vec<UnitStatus>, BuildError> {
        let previous = InputSnapshot::load(&self.snapshot_path())?;
        let current = InputSnapshot::capture(&self.layout.watched_locations())?;
        let changes = InputSnapshot::diff(previous.as_ref(), &current);

        // status is read-only: keep the engine's "regenerating" lines out of the log
        let quiet: Arc<dyn BuildLogger> = Arc::new(RecordingLogger::new());
        let engine = UpToDateEngine::new(Arc::clone(&quiet));
        let assessed = self.strategy.assess(
            &self.layout,
            &changes,
            false,
            &engine,
            quiet.as_ref(),
        )?;

        Ok(assessed
            .into_iter()
            .map(|(unit, staleness)| UnitStatus {
                generated_files: unit
                    .load_report(quiet.as_ref())
                    .generated_files()
                    .len(),
                unit: unit.label,
                up_to_date: staleness.is_up_to_date(),
                reason: staleness.to_string(),
            })
            .collect())
    }

    /// Delete every unit's outputs, every report and the snapshot
    pub fn clean(&self) -> Result<usize, BuildError> {
        let mut deleted = 0;
        for unit in self.strategy.units(&self.layout)? {
            deleted += clean_unit(&unit, self.logger.as_ref())?;
        }
        remove_dir_if_exists(&self.layout.report_root)?;
        self.logger
            .info(&format!("{}: deleted {} generated file(s)", self.layout.name, deleted));
        Ok(deleted)
    }
}
