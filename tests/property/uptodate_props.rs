//! Property-based tests for up-to-date decisions

use proptest::prelude::*;
use provgen::changes::{ChangeKind, FileChange};
use provgen::diagnostics::RecordingLogger;
use provgen::provenance::ProvenanceReport;
use provgen::uptodate::UpToDateEngine;
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;

const POOL: [&str; 6] = [
    "/p/in/A.g",
    "/p/in/B.g",
    "/p/src/Impl.java",
    "/p/src/Util.java",
    "/p/out/A.java",
    "/p/lib/common.g",
];

fn engine() -> UpToDateEngine {
    UpToDateEngine::new(Arc::new(RecordingLogger::new()))
}

fn subset() -> impl Strategy<Value = BTreeSet<PathBuf>> {
    prop::collection::btree_set(0..POOL.len(), 0..POOL.len())
        .prop_map(|idx| idx.into_iter().map(|i| PathBuf::from(POOL[i])).collect())
}

fn change() -> impl Strategy<Value = FileChange> {
    (
        0..POOL.len(),
        prop_oneof![
            Just(ChangeKind::Added),
            Just(ChangeKind::Removed),
            Just(ChangeKind::Modified)
        ],
    )
        .prop_map(|(i, kind)| FileChange::new(POOL[i], kind))
}

fn report() -> impl Strategy<Value = ProvenanceReport> {
    (subset(), subset(), subset()).prop_map(|(generated, read, checked)| {
        ProvenanceReport::from_sets(Path::new("/p"), generated, read, checked)
    })
}

proptest! {
    /// Adding changes can only turn a valid unit stale, never the reverse
    #[test]
    fn prop_more_changes_never_revalidate(
        report in report(),
        first in prop::collection::vec(change(), 0..6),
        more in prop::collection::vec(change(), 0..6),
    ) {
        let engine = engine();
        let mut all = first.clone();
        all.extend(more);
        if engine.is_up_to_date(&report, &all) {
            prop_assert!(engine.is_up_to_date(&report, &first));
        }
    }

    /// A unit without history is stale whatever the changes
    #[test]
    fn prop_no_history_is_always_stale(changes in prop::collection::vec(change(), 0..8)) {
        let missing = ProvenanceReport::missing(Path::new("/p"));
        prop_assert!(!engine().is_up_to_date(&missing, &changes));
    }

    /// Staleness follows exactly the read and existence-checked rules
    #[test]
    fn prop_staleness_matches_rule(
        report in report(),
        changes in prop::collection::vec(change(), 0..6),
    ) {
        let relevant = changes.iter().any(|c| {
            report.read_files().contains(&c.path)
                || (c.kind != ChangeKind::Modified
                    && report.existence_checked_files().contains(&c.path))
        });
        prop_assert_eq!(engine().is_up_to_date(&report, &changes), !relevant);
    }
}
