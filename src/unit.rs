//! Generation units and the task layout they are cut from
//!
//! A unit is the scope of one up-to-date decision and one provenance report:
//! a single input file (per-artifact) or the whole input set (batch).

use crate::diagnostics::BuildLogger;
use crate::error::BuildError;
use crate::execution::ResourceSet;
use crate::provenance::ProvenanceReport;
use crate::tree::path::{canonicalize_lenient, canonicalize_path, is_within};
use crate::tree::walker::{Walker, WalkerConfig};
use std::fmt;
use std::path::{Path, PathBuf};

/// File name of a unit's provenance report inside its report directory
pub const REPORT_FILE_NAME: &str = "provenance.txt";

/// Report directory name used by the batch unit.
///
/// Escaped artifact names never start with `_b`, so it cannot collide.
pub const BATCH_REPORT_DIR: &str = "_batch";

/// What a unit covers
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum UnitScope {
    /// One input file
    Artifact(PathBuf),
    /// Every input of the task
    Batch,
}

/// One schedulable generation unit
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerationUnit {
    pub label: String,
    pub scope: UnitScope,
    /// Canonical input files handed to the generator
    pub inputs: Vec<PathBuf>,
    pub base_path: PathBuf,
    pub output_dir: PathBuf,
    /// This unit's own report directory
    pub report_dir: PathBuf,
    /// Roots every generated file must live under
    pub tracked_outputs: Vec<PathBuf>,
    /// Declared watched input locations (files or directories)
    pub watched: Vec<PathBuf>,
    pub extra_resources: ResourceSet,
    /// The unit may legitimately leave no report behind
    pub produces_no_output: bool,
}

impl GenerationUnit {
    pub fn report_file(&self) -> PathBuf {
        self.report_dir.join(REPORT_FILE_NAME)
    }

    /// Read this unit's prior report (never fails, see `ProvenanceReport::load`)
    pub fn load_report(&self, logger: &dyn BuildLogger) -> ProvenanceReport {
        ProvenanceReport::load(&self.report_file(), &self.base_path, logger)
    }

    /// The single input of a per-artifact unit
    pub fn artifact(&self) -> Option<&Path> {
        match &self.scope {
            UnitScope::Artifact(path) => Some(path),
            UnitScope::Batch => None,
        }
    }

    /// True when `path` is a declared watched file or lies in a watched directory
    pub fn watches(&self, path: &Path) -> bool {
        self.watched.iter().any(|location| is_within(path, location))
    }

    /// True when `path` lies in a watched directory (not merely equal to a watched file)
    pub fn watches_directory_of(&self, path: &Path) -> bool {
        self.watched
            .iter()
            .filter(|location| !location.is_file())
            .any(|location| path != location && is_within(path, location))
    }
}

impl fmt::Display for GenerationUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.label)
    }
}

/// Escape a project-relative path into a single, collision-free directory name.
///
/// `_` becomes `__`, separators become `_s` and dots become `_d`, so every
/// escape sequence is two characters starting with `_` and decoding is unambiguous.
pub fn escape_report_segment(relative: &Path) -> String {
    let raw = relative.to_string_lossy();
    let mut escaped = String::with_capacity(raw.len() + 8);
    for ch in raw.chars() {
        match ch {
            '_' => escaped.push_str("__"),
            '/' | '\\' => escaped.push_str("_s"),
            '.' => escaped.push_str("_d"),
            other => escaped.push(other),
        }
    }
    escaped
}

/// Canonical directories of one generation task
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskLayout {
    pub name: String,
    pub project_root: PathBuf,
    pub input_dirs: Vec<PathBuf>,
    pub extensions: Vec<String>,
    pub output_dir: PathBuf,
    /// Parent of every unit report directory
    pub report_root: PathBuf,
    pub tracked_outputs: Vec<PathBuf>,
    /// Watched locations beyond the input directories
    pub watched: Vec<PathBuf>,
    pub extra_resources: ResourceSet,
    pub produces_no_output: bool,
}

impl TaskLayout {
    /// Resolve every location against `project_root` and canonicalize.
    ///
    /// An empty `tracked_outputs` defaults to the output directory.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        name: impl Into<String>,
        project_root: &Path,
        input_dirs: &[PathBuf],
        extensions: &[String],
        output_dir: &Path,
        report_root: &Path,
        tracked_outputs: &[PathBuf],
        watched: &[PathBuf],
    ) -> Result<Self, BuildError> {
        let project_root = canonicalize_path(project_root)?;
        let resolve = |p: &Path| canonicalize_lenient(&project_root.join(p));
        let resolve_all = |paths: &[PathBuf]| -> Result<Vec<PathBuf>, BuildError> {
            paths
                .iter()
                .map(|p| resolve(p).map_err(BuildError::from))
                .collect()
        };

        let output_dir = resolve(output_dir)?;
        let mut tracked = resolve_all(tracked_outputs)?;
        if tracked.is_empty() {
            tracked.push(output_dir.clone());
        }

        let layout = Self {
            name: name.into(),
            input_dirs: resolve_all(input_dirs)?,
            extensions: extensions.to_vec(),
            output_dir,
            report_root: resolve(report_root)?,
            tracked_outputs: tracked,
            watched: resolve_all(watched)?,
            extra_resources: ResourceSet::default(),
            produces_no_output: false,
            project_root,
        };
        layout.check_deletable_dirs()?;
        Ok(layout)
    }

    /// Output and report directories get wiped wholesale, so neither may be
    /// the project root nor share any part of the tree with an input location.
    fn check_deletable_dirs(&self) -> Result<(), BuildError> {
        for (label, dir) in [("output_dir", &self.output_dir), ("report_dir", &self.report_root)] {
            if is_within(&self.project_root, dir) {
                return Err(BuildError::ConfigError(format!(
                    "{} {} contains the project root",
                    label,
                    dir.display()
                )));
            }
            let overlapping = self
                .input_dirs
                .iter()
                .chain(&self.watched)
                .find(|location| is_within(dir, location) || is_within(location, dir));
            if let Some(location) = overlapping {
                return Err(BuildError::ConfigError(format!(
                    "{} {} overlaps input location {}",
                    label,
                    dir.display(),
                    location.display()
                )));
            }
        }
        Ok(())
    }

    pub fn with_extra_resources(mut self, resources: ResourceSet) -> Self {
        self.extra_resources = resources;
        self
    }

    pub fn with_produces_no_output(mut self, value: bool) -> Self {
        self.produces_no_output = value;
        self
    }

    /// Input directories plus extra watched locations
    pub fn watched_locations(&self) -> Vec<PathBuf> {
        let mut locations = self.input_dirs.clone();
        for location in &self.watched {
            if !locations.contains(location) {
                locations.push(location.clone());
            }
        }
        locations
    }

    /// Every current input file, canonical and sorted
    pub fn input_files(&self) -> Result<Vec<PathBuf>, BuildError> {
        let mut files = Vec::new();
        for dir in &self.input_dirs {
            let config = WalkerConfig {
                extensions: self.extensions.clone(),
                ..WalkerConfig::default()
            };
            let found = Walker::with_config(dir.clone(), config)
                .files()
                .map_err(|e| BuildError::Walk(e.to_string()))?;
            for file in found {
                files.push(canonicalize_path(&file)?);
            }
        }
        files.sort();
        files.dedup();
        Ok(files)
    }

    /// True when `path` has one of the configured input extensions
    pub fn is_input_candidate(&self, path: &Path) -> bool {
        let in_inputs = self.input_dirs.iter().any(|dir| is_within(path, dir));
        let ext_ok = self.extensions.is_empty()
            || path
                .extension()
                .map(|ext| self.extensions.iter().any(|e| e.as_str() == ext.to_string_lossy()))
                .unwrap_or(false);
        in_inputs && ext_ok
    }

    /// Report directory of the per-artifact unit for `input`
    pub fn artifact_report_dir(&self, input: &Path) -> PathBuf {
        let relative = input.strip_prefix(&self.project_root).unwrap_or(input);
        self.report_root.join(escape_report_segment(relative))
    }

    /// The per-artifact unit for one input file
    pub fn artifact_unit(&self, input: &Path) -> GenerationUnit {
        let relative = input.strip_prefix(&self.project_root).unwrap_or(input);
        GenerationUnit {
            label: relative.to_string_lossy().replace('\\', "/"),
            scope: UnitScope::Artifact(input.to_path_buf()),
            inputs: vec![input.to_path_buf()],
            base_path: self.project_root.clone(),
            output_dir: self.output_dir.clone(),
            report_dir: self.artifact_report_dir(input),
            tracked_outputs: self.tracked_outputs.clone(),
            watched: self.watched_locations(),
            extra_resources: self.extra_resources.clone(),
            produces_no_output: self.produces_no_output,
        }
    }

    /// The single unit covering `inputs`
    pub fn batch_unit(&self, inputs: Vec<PathBuf>) -> GenerationUnit {
        GenerationUnit {
            label: self.name.clone(),
            scope: UnitScope::Batch,
            inputs,
            base_path: self.project_root.clone(),
            output_dir: self.output_dir.clone(),
            report_dir: self.report_root.join(BATCH_REPORT_DIR),
            tracked_outputs: self.tracked_outputs.clone(),
            watched: self.watched_locations(),
            extra_resources: self.extra_resources.clone(),
            produces_no_output: self.produces_no_output,
        }
    }
}
