//! Report loading and the sets it exposes.

use crate::diagnostics::BuildLogger;
use crate::error::ProvenanceError;
use crate::provenance::{
    PREFIX_GENERATED, PREFIX_GENERATED_DEPENDENCY, PREFIX_HAND_WRITTEN, PREFIX_READ,
};
use crate::tree::path::{canonicalize_lenient, resolve_against};
use std::collections::BTreeSet;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

/// Width of the trailing digest on `mc4:` lines: one separator plus 32 hex chars
pub const READ_DIGEST_SUFFIX_LEN: usize = 33;

/// One classified report line, path still relative to the base path
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReportLine {
    Generated(PathBuf),
    ExistenceChecked(PathBuf),
    Read(PathBuf),
}

impl ReportLine {
    /// Classify a single line.
    ///
    /// `Ok(None)` for blank lines and lines without a recognized prefix.
    pub fn parse(line: &str, line_number: usize) -> Result<Option<Self>, ProvenanceError> {
        let line = line.trim_end_matches(['\r', '\n']);
        if line.trim().is_empty() {
            return Ok(None);
        }

        let malformed = |reason: &str| ProvenanceError::MalformedLine {
            line: line_number,
            reason: reason.to_string(),
        };

        let parsed = if let Some(rest) = line.strip_prefix(PREFIX_GENERATED) {
            ReportLine::Generated(non_empty(rest).ok_or_else(|| malformed("empty path"))?)
        } else if let Some(rest) = line
            .strip_prefix(PREFIX_HAND_WRITTEN)
            .or_else(|| line.strip_prefix(PREFIX_GENERATED_DEPENDENCY))
        {
            ReportLine::ExistenceChecked(non_empty(rest).ok_or_else(|| malformed("empty path"))?)
        } else if let Some(rest) = line.strip_prefix(PREFIX_READ) {
            let cut = rest
                .len()
                .checked_sub(READ_DIGEST_SUFFIX_LEN)
                .filter(|cut| rest.is_char_boundary(*cut))
                .ok_or_else(|| malformed("missing digest suffix"))?;
            ReportLine::Read(non_empty(&rest[..cut]).ok_or_else(|| malformed("empty path"))?)
        } else {
            return Ok(None);
        };
        Ok(Some(parsed))
    }
}

fn non_empty(path: &str) -> Option<PathBuf> {
    if path.trim().is_empty() {
        None
    } else {
        Some(PathBuf::from(path))
    }
}

/// Facts recorded by a previous run of one generation unit.
///
/// Immutable once built. All paths are canonical.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProvenanceReport {
    generated_files: BTreeSet<PathBuf>,
    read_files: BTreeSet<PathBuf>,
    existence_checked_files: BTreeSet<PathBuf>,
    base_path: PathBuf,
    exists: bool,
}

impl ProvenanceReport {
    /// A report signalling "no incremental history"
    pub fn missing(base_path: &Path) -> Self {
        Self {
            generated_files: BTreeSet::new(),
            read_files: BTreeSet::new(),
            existence_checked_files: BTreeSet::new(),
            base_path: base_path.to_path_buf(),
            exists: false,
        }
    }

    /// Build a report from already canonical sets
    pub fn from_sets(
        base_path: &Path,
        generated_files: BTreeSet<PathBuf>,
        read_files: BTreeSet<PathBuf>,
        existence_checked_files: BTreeSet<PathBuf>,
    ) -> Self {
        Self {
            generated_files,
            read_files,
            existence_checked_files,
            base_path: base_path.to_path_buf(),
            exists: true,
        }
    }

    /// Load the report at `report_file`, resolving its paths against `base_path`.
    ///
    /// Never fails: a missing file, unreadable file or malformed line yields a
    /// report with `exists() == false`, logged through `logger`.
    pub fn load(report_file: &Path, base_path: &Path, logger: &dyn BuildLogger) -> Self {
        let base = canonicalize_lenient(base_path).unwrap_or_else(|_| base_path.to_path_buf());
        if !report_file.exists() {
            logger.debug(&format!(
                "No provenance report at {}",
                report_file.display()
            ));
            return Self::missing(&base);
        }

        match Self::parse_file(report_file, &base) {
            Ok(report) => report,
            Err(e) => {
                logger.warn(&format!(
                    "Ignoring provenance report {}: {}",
                    report_file.display(),
                    e
                ));
                Self::missing(&base)
            }
        }
    }

    /// Strict variant of `load` for an existing file
    pub fn parse_file(report_file: &Path, base_path: &Path) -> Result<Self, ProvenanceError> {
        let content = fs::read_to_string(report_file)?;
        Self::parse(&content, base_path)
    }

    /// Parse report text, resolving every path against `base_path`
    pub fn parse(content: &str, base_path: &Path) -> Result<Self, ProvenanceError> {
        let mut report = Self::missing(base_path);
        report.exists = true;

        for (index, line) in content.lines().enumerate() {
            let Some(parsed) = ReportLine::parse(line, index + 1)? else {
                continue;
            };
            match parsed {
                ReportLine::Generated(rel) => {
                    report.generated_files.insert(resolve(base_path, &rel)?);
                }
                ReportLine::ExistenceChecked(rel) => {
                    report.existence_checked_files.insert(resolve(base_path, &rel)?);
                }
                ReportLine::Read(rel) => {
                    report.read_files.insert(resolve(base_path, &rel)?);
                }
            }
        }
        Ok(report)
    }

    pub fn exists(&self) -> bool {
        self.exists
    }

    pub fn base_path(&self) -> &Path {
        &self.base_path
    }

    pub fn generated_files(&self) -> &BTreeSet<PathBuf> {
        &self.generated_files
    }

    pub fn read_files(&self) -> &BTreeSet<PathBuf> {
        &self.read_files
    }

    pub fn existence_checked_files(&self) -> &BTreeSet<PathBuf> {
        &self.existence_checked_files
    }

    /// Union of read and existence-checked files
    pub fn consumed_files(&self) -> BTreeSet<PathBuf> {
        self.read_files
            .union(&self.existence_checked_files)
            .cloned()
            .collect()
    }

    /// Best-effort delete of every generated file.
    ///
    /// Returns how many files were removed. Failures are logged, never raised.
    pub fn delete_generated_files(&self, logger: &dyn BuildLogger) -> usize {
        let mut deleted = 0;
        for file in &self.generated_files {
            match fs::remove_file(file) {
                Ok(()) => deleted += 1,
                Err(e) if e.kind() == io::ErrorKind::NotFound => {
                    logger.debug(&format!("Generated file already gone: {}", file.display()));
                }
                Err(e) => {
                    logger.warn(&format!(
                        "Failed to delete generated file {}: {}",
                        file.display(),
                        e
                    ));
                }
            }
        }
        deleted
    }
}

fn resolve(base_path: &Path, relative: &Path) -> Result<PathBuf, ProvenanceError> {
    resolve_against(base_path, relative)
        .map_err(|e| ProvenanceError::InvalidPath(format!("{}: {}", relative.display(), e)))
}
