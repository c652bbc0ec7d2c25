//! Report writer for in-process generators and test fixtures.

use crate::provenance::{
    PREFIX_GENERATED, PREFIX_GENERATED_DEPENDENCY, PREFIX_HAND_WRITTEN, PREFIX_READ,
};
use crate::tree::hasher::report_digest;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

/// Accumulates report lines relative to a base path
#[derive(Debug, Clone)]
pub struct ReportWriter {
    base_path: PathBuf,
    lines: Vec<String>,
}

impl ReportWriter {
    pub fn new(base_path: impl Into<PathBuf>) -> Self {
        Self {
            base_path: base_path.into(),
            lines: Vec::new(),
        }
    }

    /// Record a file the generator created
    pub fn generated(&mut self, path: &Path) -> &mut Self {
        let line = format!("{}{}", PREFIX_GENERATED, self.relative(path));
        self.lines.push(line);
        self
    }

    /// Record a hand-written file whose presence was checked
    pub fn hand_written_checked(&mut self, path: &Path) -> &mut Self {
        let line = format!("{}{}", PREFIX_HAND_WRITTEN, self.relative(path));
        self.lines.push(line);
        self
    }

    /// Record a generated dependency whose presence was checked
    pub fn generated_dependency_checked(&mut self, path: &Path) -> &mut Self {
        let line = format!("{}{}", PREFIX_GENERATED_DEPENDENCY, self.relative(path));
        self.lines.push(line);
        self
    }

    /// Record an input whose content was consumed
    pub fn read(&mut self, path: &Path) -> &mut Self {
        let absolute = if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.base_path.join(path)
        };
        let line = format!(
            "{}{} {}",
            PREFIX_READ,
            self.relative(path),
            report_digest(&absolute)
        );
        self.lines.push(line);
        self
    }

    pub fn render(&self) -> String {
        let mut out = self.lines.join("\n");
        out.push('\n');
        out
    }

    /// Write the report, creating parent directories
    pub fn write_to(&self, report_file: &Path) -> io::Result<()> {
        if let Some(parent) = report_file.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(report_file, self.render())
    }

    fn relative(&self, path: &Path) -> String {
        let relative = path.strip_prefix(&self.base_path).unwrap_or(path);
        relative.to_string_lossy().replace('\\', "/")
    }
}
