//! Three-run scenario over {A.g, B.g}

use crate::integration::test_utils::{harness, workspace};
use provgen::changes::FileChange;
use provgen::consistency::Violation;
use provgen::diagnostics::Severity;
use provgen::strategy::StrategyKind;
use provgen::uptodate::UpToDateEngine;
use std::fs;
use std::sync::atomic::Ordering;

#[test]
fn test_first_run_regenerates_everything_then_nothing() {
    let temp = workspace(&[("A.g", "grammar A;"), ("B.g", "grammar B;")]);
    let h = harness(temp.path(), StrategyKind::PerArtifact, false);

    let first = h.build.run(&[]).unwrap();
    assert_eq!(first.regenerated, vec!["in/A.g", "in/B.g"]);
    assert_eq!(h.calls.load(Ordering::SeqCst), 2);
    assert!(first.consistency.as_ref().unwrap().is_consistent());

    let reports = h.build.reports().unwrap();
    assert_eq!(reports.len(), 2);
    assert!(reports.iter().all(|(_, report)| report.exists()));

    let engine = UpToDateEngine::new(h.logger.clone());
    for (_, report) in &reports {
        assert!(engine.is_up_to_date(report, &Vec::<FileChange>::new()));
    }

    let second = h.build.run(&[]).unwrap();
    assert!(second.regenerated.is_empty());
    assert_eq!(second.up_to_date.len(), 2);
    assert_eq!(h.calls.load(Ordering::SeqCst), 2);
}

#[test]
fn test_changed_input_regenerates_only_its_unit() {
    let temp = workspace(&[("A.g", "grammar A;"), ("B.g", "grammar B;")]);
    let h = harness(temp.path(), StrategyKind::PerArtifact, false);
    h.build.run(&[]).unwrap();

    let layout = h.build.layout();
    let b_out = layout.output_dir.join("B.java");
    let b_report = layout
        .artifact_unit(&layout.input_files().unwrap()[1])
        .report_file();
    let b_out_before = fs::metadata(&b_out).unwrap().modified().unwrap();
    let b_report_before = fs::read_to_string(&b_report).unwrap();

    let a = layout.input_files().unwrap()[0].clone();
    fs::write(&a, "grammar A2;").unwrap();
    let third = h.build.run(&[FileChange::modified(a)]).unwrap();

    assert_eq!(third.regenerated, vec!["in/A.g"]);
    assert_eq!(h.calls.load(Ordering::SeqCst), 3);
    assert!(fs::read_to_string(layout.output_dir.join("A.java"))
        .unwrap()
        .contains("grammar A2;"));
    assert_eq!(fs::metadata(&b_out).unwrap().modified().unwrap(), b_out_before);
    assert_eq!(fs::read_to_string(&b_report).unwrap(), b_report_before);
    assert!(third.consistency.unwrap().is_consistent());
}

#[test]
fn test_snapshot_driven_runs_match_scenario() {
    let temp = workspace(&[("A.g", "grammar A;"), ("B.g", "grammar B;")]);
    let h = harness(temp.path(), StrategyKind::PerArtifact, false);

    assert_eq!(h.build.run_from_snapshot().unwrap().regenerated.len(), 2);
    assert!(h.build.run_from_snapshot().unwrap().regenerated.is_empty());
    fs::write(temp.path().join("in/A.g"), "grammar A3;").unwrap();
    assert_eq!(
        h.build.run_from_snapshot().unwrap().regenerated,
        vec!["in/A.g"]
    );
}

#[test]
fn test_removed_input_drops_its_outputs() {
    let temp = workspace(&[("A.g", "grammar A;"), ("B.g", "grammar B;")]);
    let h = harness(temp.path(), StrategyKind::PerArtifact, false);
    h.build.run_from_snapshot().unwrap();

    fs::remove_file(temp.path().join("in/B.g")).unwrap();
    let summary = h.build.run_from_snapshot().unwrap();
    assert_eq!(summary.removed_inputs.len(), 1);
    assert!(!h.build.layout().output_dir.join("B.java").exists());
    assert!(summary.consistency.unwrap().is_consistent());
}

#[test]
fn test_concurrent_run_prefixes_and_stays_consistent() {
    let names: Vec<String> = (0..8).map(|i| format!("G{}.g", i)).collect();
    let inputs: Vec<(&str, &str)> = names.iter().map(|n| (n.as_str(), "grammar;")).collect();
    let temp = workspace(&inputs);
    let h = harness(temp.path(), StrategyKind::PerArtifact, true);

    let summary = h.build.run(&[]).unwrap();
    assert_eq!(summary.regenerated.len(), 8);
    assert_eq!(h.calls.load(Ordering::SeqCst), 8);
    assert!(summary.consistency.unwrap().is_consistent());
    let pool = summary.pool.unwrap();
    assert!(pool.created >= 1 && pool.created <= 4);
    assert_eq!(pool.created + pool.reused, 8);
    assert_eq!(h.logger.count(Severity::Fatal), 0);
}

#[test]
fn test_batch_scenario() {
    let temp = workspace(&[("A.g", "grammar A;"), ("B.g", "grammar B;")]);
    let h = harness(temp.path(), StrategyKind::Batch, false);

    assert_eq!(h.build.run_from_snapshot().unwrap().regenerated, vec!["grammars"]);
    assert!(h.build.run_from_snapshot().unwrap().regenerated.is_empty());

    fs::write(temp.path().join("in/C.g"), "grammar C;").unwrap();
    let third = h.build.run_from_snapshot().unwrap();
    assert_eq!(third.regenerated, vec!["grammars"]);
    assert!(h.build.layout().output_dir.join("C.java").exists());
    assert_eq!(h.calls.load(Ordering::SeqCst), 2);
    assert!(third.consistency.unwrap().is_consistent());
}

#[test]
fn test_input_without_outputs_is_still_tracked() {
    let temp = workspace(&[("A.g", "grammar A;"), ("Empty.g", "")]);
    let h = harness(temp.path(), StrategyKind::PerArtifact, false);

    let first = h.build.run_from_snapshot().unwrap();
    assert_eq!(first.regenerated, vec!["in/A.g", "in/Empty.g"]);
    let consistency = first.consistency.unwrap();
    assert!(consistency.is_consistent());
    assert!(!consistency.violations.iter().any(|v| matches!(
        v,
        Violation::MissingProvenance { .. } | Violation::InputNotRead { .. }
    )));

    let empty = h
        .build
        .reports()
        .unwrap()
        .into_iter()
        .find(|(unit, _)| unit.label == "in/Empty.g")
        .map(|(_, report)| report)
        .unwrap();
    assert!(empty.exists());
    assert!(empty.generated_files().is_empty());
    assert_eq!(empty.read_files().len(), 1);

    let second = h.build.run_from_snapshot().unwrap();
    assert!(second.regenerated.is_empty());
    assert_eq!(second.up_to_date, vec!["in/A.g", "in/Empty.g"]);

    fs::write(temp.path().join("in/Empty.g"), "\n").unwrap();
    let third = h.build.run_from_snapshot().unwrap();
    assert_eq!(third.regenerated, vec!["in/Empty.g"]);
    assert_eq!(h.calls.load(Ordering::SeqCst), 3);
    assert!(third.consistency.unwrap().is_consistent());
}
