//! Input snapshots: the last known-good content of every watched input.
//!
//! Persisted as JSON next to the provenance reports. Two snapshots diff into a
//! change stream.

use crate::changes::{ChangeKind, FileChange};
use crate::error::BuildError;
use crate::tree::hasher::hash_file;
use crate::tree::path::canonicalize_path;
use crate::tree::walker::{Walker, WalkerConfig};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

const SNAPSHOT_VERSION: u32 = 1;

/// File name of the persisted snapshot inside the report root
pub const SNAPSHOT_FILE_NAME: &str = "input-snapshot.json";

/// Canonical path -> BLAKE3 hex digest for every watched input file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InputSnapshot {
    pub version: u32,
    pub recorded_at: String,
    pub files: BTreeMap<PathBuf, String>,
}

impl Default for InputSnapshot {
    fn default() -> Self {
        Self {
            version: SNAPSHOT_VERSION,
            recorded_at: chrono::Utc::now().to_rfc3339(),
            files: BTreeMap::new(),
        }
    }
}

impl InputSnapshot {
    /// Hash every file found at the given locations (files or directories).
    ///
    /// Locations that do not exist contribute nothing.
    pub fn capture(locations: &[PathBuf]) -> Result<Self, BuildError> {
        let mut snapshot = InputSnapshot::default();
        for location in locations {
            if location.is_file() {
                snapshot.record(location)?;
            } else if location.is_dir() {
                let files = Walker::with_config(location.clone(), WalkerConfig::default())
                    .files()
                    .map_err(|e| BuildError::Walk(e.to_string()))?;
                for file in files {
                    snapshot.record(&file)?;
                }
            }
        }
        Ok(snapshot)
    }

    fn record(&mut self, file: &Path) -> Result<(), BuildError> {
        let canonical = canonicalize_path(file)?;
        let digest = hash_file(&canonical)?;
        self.files.insert(canonical, digest);
        Ok(())
    }

    /// Load a snapshot; `Ok(None)` when none was recorded yet
    pub fn load(path: &Path) -> Result<Option<Self>, BuildError> {
        if !path.exists() {
            return Ok(None);
        }
        let bytes = fs::read(path)?;
        let snapshot: InputSnapshot = serde_json::from_slice(&bytes).map_err(|e| {
            BuildError::Snapshot(format!("Failed to parse snapshot {:?}: {}", path, e))
        })?;
        if snapshot.version != SNAPSHOT_VERSION {
            return Err(BuildError::Snapshot(format!(
                "Unsupported snapshot version: {} (expected {})",
                snapshot.version, SNAPSHOT_VERSION
            )));
        }
        Ok(Some(snapshot))
    }

    /// Save atomically: temporary file + rename
    pub fn save(&self, path: &Path) -> Result<(), BuildError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let serialized = serde_json::to_vec_pretty(self)
            .map_err(|e| BuildError::Snapshot(format!("Failed to serialize snapshot: {}", e)))?;

        let temp_path = path.with_extension("json.tmp");
        fs::write(&temp_path, &serialized)?;
        fs::rename(&temp_path, path).map_err(|e| {
            let _ = fs::remove_file(&temp_path);
            BuildError::IoError(e)
        })?;
        Ok(())
    }

    /// Changes that turn `previous` into `current`, sorted by path.
    ///
    /// Without a previous snapshot every current file counts as added.
    pub fn diff(previous: Option<&InputSnapshot>, current: &InputSnapshot) -> Vec<FileChange> {
        let empty = BTreeMap::new();
        let before = previous.map(|s| &s.files).unwrap_or(&empty);

        let mut changes = Vec::new();
        for (path, digest) in &current.files {
            match before.get(path) {
                None => changes.push(FileChange::new(path.clone(), ChangeKind::Added)),
                Some(old) if old != digest => {
                    changes.push(FileChange::new(path.clone(), ChangeKind::Modified))
                }
                Some(_) => {}
            }
        }
        for path in before.keys() {
            if !current.files.contains_key(path) {
                changes.push(FileChange::new(path.clone(), ChangeKind::Removed));
            }
        }
        changes.sort();
        changes
    }
}
