//! Filesystem walker for input discovery and output-directory audits

use std::path::{Path, PathBuf};
use walkdir::{DirEntry, WalkDir};

/// Filesystem walker configuration
#[derive(Debug, Clone)]
pub struct WalkerConfig {
    /// Whether to follow symbolic links (default: false for determinism)
    pub follow_symlinks: bool,
    /// Path components to ignore (e.g., ".git")
    pub ignore_patterns: Vec<String>,
    /// File extensions to keep, without the dot. Empty keeps everything.
    pub extensions: Vec<String>,
    /// Maximum depth to traverse (None = unlimited)
    pub max_depth: Option<usize>,
}

impl Default for WalkerConfig {
    fn default() -> Self {
        Self {
            follow_symlinks: false,
            ignore_patterns: vec![".git".to_string()],
            extensions: Vec::new(),
            max_depth: None,
        }
    }
}

/// Filesystem walker
pub struct Walker {
    root: PathBuf,
    config: WalkerConfig,
}

impl Walker {
    /// Create a new walker for the given root path
    pub fn new(root: PathBuf) -> Self {
        Self {
            root,
            config: WalkerConfig::default(),
        }
    }

    /// Create a walker with custom configuration
    pub fn with_config(root: PathBuf, config: WalkerConfig) -> Self {
        Self { root, config }
    }

    /// Collect all regular files under the root, sorted by path.
    ///
    /// A missing root yields an empty list.
    pub fn files(&self) -> Result<Vec<PathBuf>, walkdir::Error> {
        if !self.root.exists() {
            return Ok(Vec::new());
        }

        let walker = WalkDir::new(&self.root)
            .follow_links(self.config.follow_symlinks)
            .max_depth(self.config.max_depth.unwrap_or(usize::MAX))
            .sort_by_file_name();

        let mut files = Vec::new();
        for entry in walker.into_iter().filter_entry(|e| !self.should_ignore(e)) {
            let entry = entry?;
            if entry.file_type().is_file() && self.matches_extension(entry.path()) {
                files.push(entry.into_path());
            }
        }

        files.sort();
        Ok(files)
    }

    fn matches_extension(&self, path: &Path) -> bool {
        if self.config.extensions.is_empty() {
            return true;
        }
        path.extension()
            .map(|ext| {
                let ext = ext.to_string_lossy();
                self.config.extensions.iter().any(|e| e == ext.as_ref())
            })
            .unwrap_or(false)
    }

    fn should_ignore(&self, entry: &DirEntry) -> bool {
        if entry.depth() == 0 {
            return false;
        }
        let name = entry.file_name().to_string_lossy();
        self.config
            .ignore_patterns
            .iter()
            .any(|pattern| pattern.as_str() == name.as_ref())
    }
}
