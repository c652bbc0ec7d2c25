//! provgen: provenance-driven incremental code generation
//!
//! Decides per generation unit whether previous output is still valid, using
//! the provenance report the generator left behind, and runs stale units in
//! pooled, isolated execution contexts.

pub mod build;
pub mod changes;
pub mod cli;
pub mod config;
pub mod consistency;
pub mod diagnostics;
pub mod dispatcher;
pub mod error;
pub mod execution;
pub mod logging;
pub mod provenance;
pub mod strategy;
pub mod tree;
pub mod unit;
pub mod uptodate;
