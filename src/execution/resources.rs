//! Extra resource sets: the equality-comparable key of resource-scoped contexts.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

/// Set of extra resource locations requested for one invocation
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ResourceSet(BTreeSet<PathBuf>);

impl ResourceSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, path: impl Into<PathBuf>) -> bool {
        self.0.insert(path.into())
    }

    pub fn contains(&self, path: &Path) -> bool {
        self.0.contains(path)
    }

    pub fn iter(&self) -> impl Iterator<Item = &PathBuf> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Search path with these resources ahead of `base`, without duplicates
    pub fn search_path(&self, base: &[PathBuf]) -> Vec<PathBuf> {
        let mut path: Vec<PathBuf> = self.0.iter().cloned().collect();
        for entry in base {
            if !self.0.contains(entry) {
                path.push(entry.clone());
            }
        }
        path
    }
}

impl FromIterator<PathBuf> for ResourceSet {
    fn from_iter<I: IntoIterator<Item = PathBuf>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl<'a> IntoIterator for &'a ResourceSet {
    type Item = &'a PathBuf;
    type IntoIter = std::collections::btree_set::Iter<'a, PathBuf>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}
