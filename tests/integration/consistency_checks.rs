//! Consistency checks after real runs

use crate::integration::test_utils::{harness, workspace};
use provgen::consistency::{ConsistencyChecker, ConsistencyWarning, Violation};
use provgen::diagnostics::{RecordingLogger, Severity};
use provgen::strategy::StrategyKind;
use std::fs;
use std::sync::Arc;

#[test]
fn test_stray_output_file_is_reported() {
    let temp = workspace(&[("A.g", "grammar A;")]);
    let h = harness(temp.path(), StrategyKind::PerArtifact, false);
    h.build.run(&[]).unwrap();

    let stray = h.build.layout().output_dir.join("Stray.java");
    fs::write(&stray, "class Stray {}").unwrap();

    let report = h.build.check().unwrap();
    assert!(!report.is_consistent());
    assert!(report
        .violations
        .iter()
        .any(|v| matches!(v, Violation::UnreportedOutput { path } if path.ends_with("Stray.java"))));
}

#[test]
fn test_deleted_report_is_missing_provenance() {
    let temp = workspace(&[("A.g", "grammar A;"), ("B.g", "grammar B;")]);
    let h = harness(temp.path(), StrategyKind::PerArtifact, false);
    h.build.run(&[]).unwrap();

    let reports = h.build.reports().unwrap();
    fs::remove_file(reports[0].0.report_file()).unwrap();

    let report = h.build.check().unwrap();
    assert!(report
        .violations
        .contains(&Violation::MissingProvenance {
            unit: "in/A.g".to_string()
        }));
}

#[test]
fn test_reported_but_absent_output_only_warns() {
    let temp = workspace(&[("A.g", "grammar A;")]);
    let h = harness(temp.path(), StrategyKind::PerArtifact, false);
    h.build.run(&[]).unwrap();

    fs::remove_file(h.build.layout().output_dir.join("A.java")).unwrap();

    let logger = Arc::new(RecordingLogger::new());
    let checker = ConsistencyChecker::new(logger.clone(), StrategyKind::PerArtifact);
    let report = checker.check(&h.build.reports().unwrap());
    assert!(report.is_consistent());
    assert_eq!(report.warnings.len(), 1);
    assert!(matches!(
        &report.warnings[0],
        ConsistencyWarning::ReportedButAbsent { path } if path.ends_with("A.java")
    ));
    assert_eq!(logger.count(Severity::Warn), 1);
    assert_eq!(logger.count(Severity::Error), 0);
}

#[test]
fn test_clean_leaves_nothing_to_check() {
    let temp = workspace(&[("A.g", "grammar A;")]);
    let h = harness(temp.path(), StrategyKind::Batch, false);
    h.build.run(&[]).unwrap();
    assert!(h.build.clean().unwrap() > 0);

    let statuses = h.build.status().unwrap();
    assert_eq!(statuses.len(), 1);
    assert!(!statuses[0].up_to_date);
}
