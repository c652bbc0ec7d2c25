//! Integration tests for provenance-driven incremental generation

mod config_integration;
mod consistency_checks;
mod incremental_scenario;
mod pool_reuse;
mod test_utils;
