//! Provenance reports
//!
//! A generator run leaves one report per generation unit recording what it
//! generated, what it read and what it merely checked for existence. The
//! incremental engine only ever reads prior reports; writing them is the
//! generator's job (`ReportWriter` is what in-process generators use).

pub mod report;
pub mod writer;

pub use report::{ProvenanceReport, ReportLine, READ_DIGEST_SUFFIX_LEN};
pub use writer::ReportWriter;

/// Line prefix for generated files
pub const PREFIX_GENERATED: &str = "out:";
/// Line prefix for existence-checked hand-written code
pub const PREFIX_HAND_WRITTEN: &str = "hwc:";
/// Line prefix for existence-checked generated dependencies
pub const PREFIX_GENERATED_DEPENDENCY: &str = "gen:";
/// Line prefix for read input files (followed by a digest suffix)
pub const PREFIX_READ: &str = "mc4:";
