//! Cross-unit invariants over a completed run
//!
//! Every check runs independently and reports all of its findings; nothing
//! here stops at the first problem.

use crate::diagnostics::BuildLogger;
use crate::provenance::ProvenanceReport;
use crate::strategy::StrategyKind;
use crate::tree::path::{canonicalize_path, is_within};
use crate::tree::walker::Walker;
use crate::unit::GenerationUnit;
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// A broken run invariant
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Violation {
    MissingProvenance { unit: String },
    OverlappingOutputs {
        first: String,
        second: String,
        files: Vec<PathBuf>,
    },
    UnreportedOutput { path: PathBuf },
    OutputOutsideTrackedRoots { unit: String, path: PathBuf },
    InputNotRead { unit: String, input: PathBuf },
    UndeclaredInput { path: PathBuf },
    UnresolvableInput { path: PathBuf },
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Violation::MissingProvenance { unit } => {
                write!(f, "{}: no provenance found", unit)
            }
            Violation::OverlappingOutputs {
                first,
                second,
                files,
            } => write!(
                f,
                "{} and {} both generated {} file(s), e.g. {}",
                first,
                second,
                files.len(),
                files.first().map(|p| p.display().to_string()).unwrap_or_default()
            ),
            Violation::UnreportedOutput { path } => {
                write!(f, "{} exists in the output but no unit reported it", path.display())
            }
            Violation::OutputOutsideTrackedRoots { unit, path } => write!(
                f,
                "{}: generated {} outside every tracked output root",
                unit,
                path.display()
            ),
            Violation::InputNotRead { unit, input } => {
                write!(f, "{}: own input {} not reported as read", unit, input.display())
            }
            Violation::UndeclaredInput { path } => write!(
                f,
                "{} was consumed but is not under a declared input location",
                path.display()
            ),
            Violation::UnresolvableInput { path } => write!(
                f,
                "{} does not exist and is not under a declared input directory",
                path.display()
            ),
        }
    }
}

/// Finding that does not break the run's invariants
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ConsistencyWarning {
    ReportedButAbsent { path: PathBuf },
}

impl fmt::Display for ConsistencyWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConsistencyWarning::ReportedButAbsent { path } => {
                write!(f, "{} was reported as generated but does not exist", path.display())
            }
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ConsistencyReport {
    pub violations: Vec<Violation>,
    pub warnings: Vec<ConsistencyWarning>,
}

impl ConsistencyReport {
    pub fn is_consistent(&self) -> bool {
        self.violations.is_empty()
    }
}

/// Validates reports of every unit of one task after a run
pub struct ConsistencyChecker {
    logger: Arc<dyn BuildLogger>,
    strategy: StrategyKind,
}

impl ConsistencyChecker {
    pub fn new(logger: Arc<dyn BuildLogger>, strategy: StrategyKind) -> Self {
        Self { logger, strategy }
    }

    pub fn check(&self, units: &[(GenerationUnit, ProvenanceReport)]) -> ConsistencyReport {
        let mut report = ConsistencyReport::default();
        self.check_provenance_present(units, &mut report);
        if self.strategy == StrategyKind::PerArtifact {
            self.check_disjoint_outputs(units, &mut report);
            self.check_own_input_read(units, &mut report);
        }
        self.check_output_coverage(units, &mut report);
        self.check_tracked_roots(units, &mut report);
        self.check_declared_inputs(units, &mut report);

        for violation in &report.violations {
            self.logger.error(&violation.to_string());
        }
        for warning in &report.warnings {
            self.logger.warn(&warning.to_string());
        }
        report
    }

    fn check_provenance_present(
        &self,
        units: &[(GenerationUnit, ProvenanceReport)],
        out: &mut ConsistencyReport,
    ) {
        for (unit, report) in units {
            if !report.exists() && !unit.produces_no_output {
                out.violations.push(Violation::MissingProvenance {
                    unit: unit.label.clone(),
                });
            }
        }
    }

    fn check_disjoint_outputs(
        &self,
        units: &[(GenerationUnit, ProvenanceReport)],
        out: &mut ConsistencyReport,
    ) {
        for (i, (first, first_report)) in units.iter().enumerate() {
            for (second, second_report) in &units[i + 1..] {
                let shared: Vec<PathBuf> = first_report
                    .generated_files()
                    .intersection(second_report.generated_files())
                    .cloned()
                    .collect();
                if !shared.is_empty() {
                    out.violations.push(Violation::OverlappingOutputs {
                        first: first.label.clone(),
                        second: second.label.clone(),
                        files: shared,
                    });
                }
            }
        }
    }

    fn check_own_input_read(
        &self,
        units: &[(GenerationUnit, ProvenanceReport)],
        out: &mut ConsistencyReport,
    ) {
        for (unit, report) in units {
            if !report.exists() {
                continue;
            }
            if let Some(input) = unit.artifact() {
                if !report.read_files().contains(input) {
                    out.violations.push(Violation::InputNotRead {
                        unit: unit.label.clone(),
                        input: input.to_path_buf(),
                    });
                }
            }
        }
    }

    fn check_output_coverage(
        &self,
        units: &[(GenerationUnit, ProvenanceReport)],
        out: &mut ConsistencyReport,
    ) {
        let reported: BTreeSet<&PathBuf> = units
            .iter()
            .flat_map(|(_, report)| report.generated_files())
            .collect();
        let report_roots: BTreeSet<&Path> = units
            .iter()
            .filter_map(|(unit, _)| unit.report_dir.parent())
            .collect();
        let output_dirs: BTreeSet<&PathBuf> = units.iter().map(|(unit, _)| &unit.output_dir).collect();

        let mut present = BTreeSet::new();
        for dir in output_dirs {
            match Walker::new(dir.clone()).files() {
                Ok(files) => present.extend(
                    files
                        .into_iter()
                        .map(|f| canonicalize_path(&f).unwrap_or(f))
                        .filter(|f| !report_roots.iter().any(|root| is_within(f, root))),
                ),
                Err(e) => self
                    .logger
                    .warn(&format!("Could not list output directory {}: {}", dir.display(), e)),
            }
        }

        for path in &present {
            if !reported.contains(path) {
                out.violations
                    .push(Violation::UnreportedOutput { path: path.clone() });
            }
        }
        for path in reported {
            if !path.exists() {
                out.warnings
                    .push(ConsistencyWarning::ReportedButAbsent { path: path.clone() });
            }
        }
    }

    fn check_tracked_roots(
        &self,
        units: &[(GenerationUnit, ProvenanceReport)],
        out: &mut ConsistencyReport,
    ) {
        for (unit, report) in units {
            for path in report.generated_files() {
                if !unit.tracked_outputs.iter().any(|root| is_within(path, root)) {
                    out.violations.push(Violation::OutputOutsideTrackedRoots {
                        unit: unit.label.clone(),
                        path: path.clone(),
                    });
                }
            }
        }
    }

    fn check_declared_inputs(
        &self,
        units: &[(GenerationUnit, ProvenanceReport)],
        out: &mut ConsistencyReport,
    ) {
        // one finding per file, however many units consumed it
        let mut consumed: BTreeMap<PathBuf, &GenerationUnit> = BTreeMap::new();
        for (unit, report) in units {
            for path in report.consumed_files() {
                consumed.entry(path).or_insert(unit);
            }
        }

        for (path, unit) in consumed {
            if path.exists() {
                if !unit.watches(&path) {
                    out.violations.push(Violation::UndeclaredInput { path });
                }
            } else if !unit.watches_directory_of(&path) {
                out.violations.push(Violation::UnresolvableInput { path });
            }
        }
    }
}
