//! Filesystem primitives: canonical paths, deterministic walking, content digests.

pub mod hasher;
pub mod path;
pub mod walker;
