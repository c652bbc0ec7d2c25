//! File-system change stream
//!
//! The up-to-date engine consumes `FileChange`s describing what happened since
//! the last known-good state. They come either from a caller (a host build
//! tool) or from diffing two `InputSnapshot`s.

pub mod snapshot;

pub use snapshot::InputSnapshot;

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

/// Kind of change observed for one path
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChangeKind {
    Added,
    Removed,
    Modified,
}

impl ChangeKind {
    /// Added or removed: the path started or stopped existing
    pub fn alters_existence(self) -> bool {
        matches!(self, ChangeKind::Added | ChangeKind::Removed)
    }
}

impl fmt::Display for ChangeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChangeKind::Added => f.write_str("added"),
            ChangeKind::Removed => f.write_str("removed"),
            ChangeKind::Modified => f.write_str("modified"),
        }
    }
}

/// One change since the last known-good state
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct FileChange {
    pub path: PathBuf,
    pub kind: ChangeKind,
}

impl FileChange {
    pub fn new(path: impl Into<PathBuf>, kind: ChangeKind) -> Self {
        Self {
            path: path.into(),
            kind,
        }
    }

    pub fn added(path: impl Into<PathBuf>) -> Self {
        Self::new(path, ChangeKind::Added)
    }

    pub fn removed(path: impl Into<PathBuf>) -> Self {
        Self::new(path, ChangeKind::Removed)
    }

    pub fn modified(path: impl Into<PathBuf>) -> Self {
        Self::new(path, ChangeKind::Modified)
    }
}

impl fmt::Display for FileChange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.path.display(), self.kind)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_existence_altering_kinds() {
        assert!(ChangeKind::Added.alters_existence());
        assert!(ChangeKind::Removed.alters_existence());
        assert!(!ChangeKind::Modified.alters_existence());
    }

    #[test]
    fn test_change_display() {
        let change = FileChange::removed("/in/A.g");
        assert_eq!(change.to_string(), "/in/A.g (removed)");
    }
}
