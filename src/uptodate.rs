//! Up-to-date decisions
//!
//! A unit stays valid unless its report is missing, a file it only checked for
//! existence appeared or disappeared, or a file whose content it read changed
//! in any way.

use crate::changes::FileChange;
use crate::diagnostics::BuildLogger;
use crate::provenance::ProvenanceReport;
use crate::tree::path::canonicalize_lenient;
use std::fmt;
use std::sync::Arc;

/// Outcome of one up-to-date check
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Staleness {
    UpToDate,
    /// No prior report: rebuild
    NoHistory,
    /// First relevant change found in the stream
    Changed(FileChange),
    /// Regeneration requested regardless of history
    Forced,
}

impl Staleness {
    pub fn is_up_to_date(&self) -> bool {
        matches!(self, Staleness::UpToDate)
    }
}

impl fmt::Display for Staleness {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Staleness::UpToDate => f.write_str("up to date"),
            Staleness::NoHistory => f.write_str("no provenance report"),
            Staleness::Changed(change) => write!(f, "{}", change),
            Staleness::Forced => f.write_str("forced"),
        }
    }
}

/// Classifies change streams against provenance reports
#[derive(Clone)]
pub struct UpToDateEngine {
    logger: Arc<dyn BuildLogger>,
}

impl UpToDateEngine {
    pub fn new(logger: Arc<dyn BuildLogger>) -> Self {
        Self { logger }
    }

    /// True when the unit described by `report` can skip regeneration
    pub fn is_up_to_date<'a, I>(&self, report: &ProvenanceReport, changes: I) -> bool
    where
        I: IntoIterator<Item = &'a FileChange>,
    {
        self.check("unit", report, changes).is_up_to_date()
    }

    /// Full classification, logging the change that made `label` stale
    pub fn check<'a, I>(&self, label: &str, report: &ProvenanceReport, changes: I) -> Staleness
    where
        I: IntoIterator<Item = &'a FileChange>,
    {
        if !report.exists() {
            self.logger
                .info(&format!("{}: no provenance report, regenerating", label));
            return Staleness::NoHistory;
        }

        match first_relevant_change(report, changes) {
            Some(change) => {
                self.logger.info(&format!(
                    "{}: {} was {}, regenerating",
                    label,
                    change.path.display(),
                    change.kind
                ));
                Staleness::Changed(change)
            }
            None => {
                self.logger.debug(&format!("{}: up to date", label));
                Staleness::UpToDate
            }
        }
    }
}

/// First change relevant to `report`, with its path canonicalized.
///
/// Existence-checked files matter only when added or removed; read files
/// matter on any change.
pub fn first_relevant_change<'a, I>(report: &ProvenanceReport, changes: I) -> Option<FileChange>
where
    I: IntoIterator<Item = &'a FileChange>,
{
    changes.into_iter().find_map(|change| {
        let path = canonicalize_lenient(&change.path).unwrap_or_else(|_| change.path.clone());
        let relevant = (change.kind.alters_existence()
            && report.existence_checked_files().contains(&path))
            || report.read_files().contains(&path);
        relevant.then(|| FileChange::new(path, change.kind))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::changes::ChangeKind;
    use crate::diagnostics::{RecordingLogger, Severity};
    use std::collections::BTreeSet;
    use std::path::{Path, PathBuf};

    fn report() -> ProvenanceReport {
        ProvenanceReport::from_sets(
            Path::new("/p"),
            BTreeSet::from([PathBuf::from("/p/out/A.java")]),
            BTreeSet::from([PathBuf::from("/p/in/A.g")]),
            BTreeSet::from([PathBuf::from("/p/src/AImpl.java")]),
        )
    }

    fn engine() -> (UpToDateEngine, Arc<RecordingLogger>) {
        let logger = Arc::new(RecordingLogger::new());
        (UpToDateEngine::new(logger.clone()), logger)
    }

    #[test]
    fn test_no_history_is_never_up_to_date() {
        let (engine, _) = engine();
        let missing = ProvenanceReport::missing(Path::new("/p"));
        assert!(!engine.is_up_to_date(&missing, &[]));
    }

    #[test]
    fn test_irrelevant_changes_keep_unit_valid() {
        let (engine, _) = engine();
        let changes = vec![
            FileChange::modified("/p/src/AImpl.java"),
            FileChange::added("/p/in/Other.g"),
            FileChange::modified("/p/out/A.java"),
        ];
        assert!(engine.is_up_to_date(&report(), &changes));
    }

    #[test]
    fn test_existence_checked_file_added_or_removed_is_relevant() {
        let (engine, _) = engine();
        for kind in [ChangeKind::Added, ChangeKind::Removed] {
            let changes = vec![FileChange::new("/p/src/AImpl.java", kind)];
            assert!(!engine.is_up_to_date(&report(), &changes));
        }
    }

    #[test]
    fn test_read_file_any_change_is_relevant() {
        let (engine, logger) = engine();
        for kind in [ChangeKind::Added, ChangeKind::Removed, ChangeKind::Modified] {
            let changes = vec![FileChange::new("/p/in/A.g", kind)];
            let staleness = engine.check("A", &report(), &changes);
            assert_eq!(
                staleness,
                Staleness::Changed(FileChange::new("/p/in/A.g", kind))
            );
        }
        assert_eq!(logger.count(Severity::Info), 3);
    }
}
