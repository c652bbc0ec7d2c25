//! Configuration System
//!
//! Layered configuration (defaults, user file, workspace files, environment)
//! deserialized into `ProvgenConfig`. Validation reports every problem at once.

use crate::dispatcher::DispatchSettings;
use crate::error::BuildError;
use crate::execution::{default_pass_through, ResourceSet, DEFAULT_CLOSE_THRESHOLD};
use crate::logging::LoggingConfig;
use crate::strategy::StrategyKind;
use crate::tree::path::{canonicalize_lenient, normalize_lexically};
use crate::unit::TaskLayout;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

mod facade;
mod merge;
mod sources;

pub use facade::ConfigLoader;
pub use sources::workspace_file::WORKSPACE_CONFIG_FILE;

/// Root configuration structure
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProvgenConfig {
    #[serde(default)]
    pub execution: ExecutionConfig,

    #[serde(default)]
    pub task: TaskConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

/// How generators are executed
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutionConfig {
    /// Run generators directly on the caller's loader, without isolation
    #[serde(default)]
    pub debug: bool,

    /// Regenerate units on several worker threads
    #[serde(default)]
    pub concurrent: bool,

    /// Idle time before a pooled context is closed
    #[serde(default = "default_close_threshold_ms")]
    pub close_threshold_ms: u64,

    /// Names resolved against the caller's loader even inside isolated contexts
    #[serde(default = "default_pass_through")]
    pub pass_through: Vec<String>,

    /// Worker limit when concurrent (default: available parallelism)
    #[serde(default)]
    pub max_workers: Option<usize>,
}

fn default_close_threshold_ms() -> u64 {
    DEFAULT_CLOSE_THRESHOLD.as_millis() as u64
}

impl Default for ExecutionConfig {
    fn default() -> Self {
        Self {
            debug: false,
            concurrent: false,
            close_threshold_ms: default_close_threshold_ms(),
            pass_through: default_pass_through(),
            max_workers: None,
        }
    }
}

impl ExecutionConfig {
    pub fn close_threshold(&self) -> Duration {
        Duration::from_millis(self.close_threshold_ms)
    }

    /// Worker threads for one run
    pub fn workers(&self) -> usize {
        if !self.concurrent {
            return 1;
        }
        self.max_workers.unwrap_or_else(|| {
            std::thread::available_parallelism()
                .map(|n| n.get())
                .unwrap_or(1)
        })
    }
}

/// The generation task: inputs, outputs and the generator
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskConfig {
    #[serde(default = "default_task_name")]
    pub name: String,

    #[serde(default)]
    pub strategy: StrategyKind,

    #[serde(default)]
    pub input_dirs: Vec<PathBuf>,

    /// Input file extensions without the dot; empty accepts every file
    #[serde(default)]
    pub extensions: Vec<String>,

    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,

    #[serde(default = "default_report_dir")]
    pub report_dir: PathBuf,

    /// Watched input locations beyond the input directories
    #[serde(default)]
    pub watched: Vec<PathBuf>,

    /// Roots generated files must live under (default: the output directory)
    #[serde(default)]
    pub tracked_outputs: Vec<PathBuf>,

    #[serde(default)]
    pub extra_resources: Vec<PathBuf>,

    #[serde(default)]
    pub base_resources: Vec<PathBuf>,

    /// Units may legitimately produce no report
    #[serde(default)]
    pub produces_no_output: bool,

    #[serde(default)]
    pub generator: GeneratorConfig,
}

fn default_task_name() -> String {
    "generate".to_string()
}

fn default_output_dir() -> PathBuf {
    PathBuf::from("target/generated")
}

fn default_report_dir() -> PathBuf {
    PathBuf::from("target/provgen")
}

impl Default for TaskConfig {
    fn default() -> Self {
        Self {
            name: default_task_name(),
            strategy: StrategyKind::default(),
            input_dirs: Vec::new(),
            extensions: Vec::new(),
            output_dir: default_output_dir(),
            report_dir: default_report_dir(),
            watched: Vec::new(),
            tracked_outputs: Vec::new(),
            extra_resources: Vec::new(),
            base_resources: Vec::new(),
            produces_no_output: false,
            generator: GeneratorConfig::default(),
        }
    }
}

impl TaskConfig {
    /// Resolve the task against `workspace_root`
    pub fn layout(&self, workspace_root: &Path) -> Result<TaskLayout, BuildError> {
        let layout = TaskLayout::new(
            self.name.clone(),
            workspace_root,
            &self.input_dirs,
            &self.extensions,
            &self.output_dir,
            &self.report_dir,
            &self.tracked_outputs,
            &self.watched,
        )?;
        let extra = resolve_all(&layout.project_root, &self.extra_resources)?
            .into_iter()
            .collect::<ResourceSet>();
        Ok(layout
            .with_extra_resources(extra)
            .with_produces_no_output(self.produces_no_output))
    }

    pub fn base_resources(&self, workspace_root: &Path) -> Result<Vec<PathBuf>, BuildError> {
        resolve_all(workspace_root, &self.base_resources)
    }
}

/// Why deleting `dir` could destroy the workspace or its inputs, if it could.
///
/// Paths are compared lexically relative to the workspace; `TaskLayout::new`
/// repeats the check on canonical paths.
fn destructive_overlap(
    label: &str,
    dir: &Path,
    input_dirs: &[PathBuf],
    watched: &[PathBuf],
) -> Option<String> {
    let anchored = |p: &Path| normalize_lexically(&Path::new("/").join(p));
    let dir = anchored(dir);
    if dir.parent().is_none() {
        return Some(format!("{} cannot be the workspace root", label));
    }
    input_dirs
        .iter()
        .chain(watched)
        .find(|location| {
            let location = anchored(location);
            dir.starts_with(&location) || location.starts_with(&dir)
        })
        .map(|location| {
            format!(
                "{} {} overlaps input location {}",
                label,
                dir.display(),
                location.display()
            )
        })
}

fn resolve_all(root: &Path, paths: &[PathBuf]) -> Result<Vec<PathBuf>, BuildError> {
    paths
        .iter()
        .map(|p| canonicalize_lenient(&root.join(p)).map_err(BuildError::from))
        .collect()
}

/// The generator entry point
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GeneratorConfig {
    /// Name the entry point is resolved by
    #[serde(default)]
    pub entry_point: String,

    #[serde(default = "default_method")]
    pub method: String,

    /// External program and its leading arguments; empty for in-process generators
    #[serde(default)]
    pub command: Vec<String>,

    /// Arguments passed ahead of the per-unit arguments
    #[serde(default)]
    pub args: Vec<String>,
}

fn default_method() -> String {
    "run".to_string()
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            entry_point: String::new(),
            method: default_method(),
            command: Vec::new(),
            args: Vec::new(),
        }
    }
}

/// Configuration validation errors
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    Execution(String),
    Task(String),
    Generator(String),
    Logging(String),
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ValidationError::Execution(msg) => write!(f, "Execution: {}", msg),
            ValidationError::Task(msg) => write!(f, "Task: {}", msg),
            ValidationError::Generator(msg) => write!(f, "Generator: {}", msg),
            ValidationError::Logging(msg) => write!(f, "Logging: {}", msg),
        }
    }
}

impl std::error::Error for ValidationError {}

impl ProvgenConfig {
    /// Validate the entire configuration
    pub fn validate(&self) -> Result<(), Vec<ValidationError>> {
        let mut errors = Vec::new();

        if self.execution.close_threshold_ms == 0 {
            errors.push(ValidationError::Execution(
                "close_threshold_ms must be positive".to_string(),
            ));
        }
        if self.execution.max_workers == Some(0) {
            errors.push(ValidationError::Execution(
                "max_workers must be at least 1".to_string(),
            ));
        }

        let task = &self.task;
        if task.name.trim().is_empty() {
            errors.push(ValidationError::Task("name cannot be empty".to_string()));
        }
        if task.input_dirs.is_empty() {
            errors.push(ValidationError::Task(
                "at least one input directory is required".to_string(),
            ));
        }
        if task.output_dir.as_os_str().is_empty() {
            errors.push(ValidationError::Task("output_dir cannot be empty".to_string()));
        }
        if task.report_dir.as_os_str().is_empty() {
            errors.push(ValidationError::Task("report_dir cannot be empty".to_string()));
        }
        for (label, dir) in [("output_dir", &task.output_dir), ("report_dir", &task.report_dir)] {
            let overlap = destructive_overlap(label, dir, &task.input_dirs, &task.watched);
            if let Some(problem) = overlap {
                errors.push(ValidationError::Task(problem));
            }
        }

        if task.generator.entry_point.trim().is_empty() {
            errors.push(ValidationError::Generator(
                "entry_point cannot be empty".to_string(),
            ));
        }
        if task.generator.method.trim().is_empty() {
            errors.push(ValidationError::Generator("method cannot be empty".to_string()));
        }

        if let Err(e) = crate::logging::validate(&self.logging) {
            errors.push(ValidationError::Logging(e));
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }

    /// Dispatcher settings for a workspace
    pub fn dispatch_settings(&self, workspace_root: &Path) -> Result<DispatchSettings, BuildError> {
        Ok(DispatchSettings {
            entry_point: self.task.generator.entry_point.clone(),
            method: self.task.generator.method.clone(),
            debug: self.execution.debug,
            concurrent: self.execution.concurrent,
            keyed_by_resources: !self.task.extra_resources.is_empty(),
            close_threshold: self.execution.close_threshold(),
            pass_through: self.execution.pass_through.clone(),
            base_resources: self.task.base_resources(workspace_root)?,
        })
    }
}
