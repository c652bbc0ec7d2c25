//! Path canonicalization and normalization utilities
//!
//! Provenance reports, change streams and declared locations are all compared
//! as canonical paths. Files named in a report may no longer exist, so the
//! lenient variant canonicalizes the deepest existing ancestor and appends the
//! rest lexically.

use std::io;
use std::path::{Component, Path, PathBuf};
use unicode_normalization::UnicodeNormalization;

/// Canonicalize an existing path (symlinks, `..`, `.` resolved, NFC, no trailing slash)
pub fn canonicalize_path(path: &Path) -> io::Result<PathBuf> {
    let canonical = dunce::canonicalize(path)?;
    Ok(PathBuf::from(normalize_path_string(&canonical.to_string_lossy())))
}

/// Canonicalize a path that may not exist.
///
/// Relative paths are resolved against the current directory.
pub fn canonicalize_lenient(path: &Path) -> io::Result<PathBuf> {
    let absolute = if path.is_absolute() {
        path.to_path_buf()
    } else {
        std::env::current_dir()?.join(path)
    };
    let lexical = normalize_lexically(&absolute);

    let mut existing = lexical.as_path();
    let mut remainder: Vec<&std::ffi::OsStr> = Vec::new();
    loop {
        if existing.exists() {
            break;
        }
        match (existing.file_name(), existing.parent()) {
            (Some(name), Some(parent)) => {
                remainder.push(name);
                existing = parent;
            }
            _ => {
                return Ok(PathBuf::from(normalize_path_string(
                    &lexical.to_string_lossy(),
                )))
            }
        }
    }

    let mut resolved = canonicalize_path(existing)?;
    for name in remainder.into_iter().rev() {
        resolved.push(name);
    }
    Ok(PathBuf::from(normalize_path_string(&resolved.to_string_lossy())))
}

/// Resolve `relative` against `base` and canonicalize leniently
pub fn resolve_against(base: &Path, relative: &Path) -> io::Result<PathBuf> {
    canonicalize_lenient(&base.join(relative))
}

/// Drop `.` components and fold `..` without touching the filesystem
pub fn normalize_lexically(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                if !out.pop() {
                    out.push(component);
                }
            }
            other => out.push(other),
        }
    }
    out
}

/// Normalize a path string (without filesystem access)
///
/// Unicode is normalized to NFC and trailing separators are removed, except for root.
pub fn normalize_path_string(path: &str) -> String {
    let normalized: String = path.nfc().collect();

    let mut result = normalized;
    if result.len() > 1 {
        while result.ends_with('/') || result.ends_with('\\') {
            result.pop();
        }
    }

    result
}

/// True when `path` equals `root` or lies beneath it (both canonical)
pub fn is_within(path: &Path, root: &Path) -> bool {
    path.starts_with(root)
}
