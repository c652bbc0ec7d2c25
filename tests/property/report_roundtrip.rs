//! Property-based tests for report writing and parsing

use proptest::prelude::*;
use provgen::provenance::{ProvenanceReport, ReportWriter};
use std::collections::BTreeSet;
use std::path::PathBuf;
use tempfile::TempDir;

fn relative_path() -> impl Strategy<Value = String> {
    prop::collection::vec("[a-z][a-z0-9_]{0,5}(\\.[a-z]{1,3})?", 1..4).prop_map(|s| s.join("/"))
}

fn path_sets() -> impl Strategy<Value = (Vec<String>, Vec<String>, Vec<String>)> {
    (
        prop::collection::vec(relative_path(), 0..6),
        prop::collection::vec(relative_path(), 0..6),
        prop::collection::vec(relative_path(), 0..6),
    )
}

/// Writing a report and reading it back yields the same three sets
#[test]
fn test_report_roundtrip_property() {
    let temp = TempDir::new().unwrap();
    let base = temp.path().canonicalize().unwrap();
    let mut runner = proptest::test_runner::TestRunner::default();

    runner
        .run(&path_sets(), |(generated, checked, read)| {
            let mut writer = ReportWriter::new(&base);
            for rel in &generated {
                writer.generated(&base.join(rel));
            }
            for rel in &checked {
                writer.hand_written_checked(&base.join(rel));
            }
            for rel in &read {
                writer.read(&base.join(rel));
            }

            let report = ProvenanceReport::parse(&writer.render(), &base).unwrap();
            let expected = |rels: &[String]| -> BTreeSet<PathBuf> {
                rels.iter().map(|rel| base.join(rel)).collect()
            };

            prop_assert!(report.exists());
            prop_assert_eq!(report.generated_files(), &expected(&generated));
            prop_assert_eq!(report.existence_checked_files(), &expected(&checked));
            prop_assert_eq!(report.read_files(), &expected(&read));
            Ok(())
        })
        .unwrap();
}

/// Lines without a known prefix never change the parsed sets
#[test]
fn test_unknown_lines_are_ignored_property() {
    let temp = TempDir::new().unwrap();
    let base = temp.path().canonicalize().unwrap();
    let mut runner = proptest::test_runner::TestRunner::default();

    runner
        .run(
            &(relative_path(), prop::collection::vec("[A-Z#][ -~]{0,20}", 0..5)),
            |(generated, noise)| {
                let mut writer = ReportWriter::new(&base);
                writer.generated(&base.join(&generated));
                let mut content = writer.render();
                for line in &noise {
                    content.push_str(line);
                    content.push('\n');
                }

                let report = ProvenanceReport::parse(&content, &base).unwrap();
                prop_assert_eq!(report.generated_files().len(), 1);
                prop_assert!(report.read_files().is_empty());
                prop_assert!(report.existence_checked_files().is_empty());
                Ok(())
            },
        )
        .unwrap();
}
