//! Layered configuration loading

use crate::integration::test_utils::with_xdg_env;
use provgen::config::{ConfigLoader, ProvgenConfig};
use provgen::strategy::StrategyKind;
use std::fs;
use std::path::PathBuf;
use std::time::Duration;
use tempfile::TempDir;

fn write_global(test_dir: &TempDir, content: &str) {
    let dir = test_dir.path().join("config").join("provgen");
    fs::create_dir_all(&dir).unwrap();
    fs::write(dir.join("config.toml"), content).unwrap();
}

#[test]
fn test_defaults_without_any_file() {
    let test_dir = TempDir::new().unwrap();
    let workspace = TempDir::new().unwrap();

    let config = with_xdg_env(&test_dir, || ConfigLoader::load(workspace.path()).unwrap());
    assert_eq!(config.task.strategy, StrategyKind::PerArtifact);
    assert_eq!(config.task.output_dir, PathBuf::from("target/generated"));
    assert_eq!(config.execution, ProvgenConfig::default().execution);
    assert_eq!(config.execution.close_threshold(), Duration::from_millis(6000));
    assert_eq!(config.execution.workers(), 1);
}

#[test]
fn test_workspace_file_overrides_global_file() {
    let test_dir = TempDir::new().unwrap();
    let workspace = TempDir::new().unwrap();
    write_global(
        &test_dir,
        r#"
[execution]
concurrent = true
close_threshold_ms = 1000

[task]
output_dir = "gen-global"
"#,
    );
    fs::write(
        workspace.path().join("provgen.toml"),
        r#"
[task]
output_dir = "gen"
strategy = "batch"
input_dirs = ["grammars"]
"#,
    )
    .unwrap();

    let config = with_xdg_env(&test_dir, || ConfigLoader::load(workspace.path()).unwrap());
    assert!(config.execution.concurrent);
    assert_eq!(config.execution.close_threshold_ms, 1000);
    assert_eq!(config.task.output_dir, PathBuf::from("gen"));
    assert_eq!(config.task.strategy, StrategyKind::Batch);
    assert_eq!(config.task.input_dirs, vec![PathBuf::from("grammars")]);
}

#[test]
fn test_environment_overrides_files() {
    let test_dir = TempDir::new().unwrap();
    let workspace = TempDir::new().unwrap();
    fs::write(
        workspace.path().join("provgen.toml"),
        "[execution]\nconcurrent = false\n",
    )
    .unwrap();

    let config = with_xdg_env(&test_dir, || {
        std::env::set_var("PROVGEN__EXECUTION__CONCURRENT", "true");
        let loaded = ConfigLoader::load(workspace.path());
        std::env::remove_var("PROVGEN__EXECUTION__CONCURRENT");
        loaded.unwrap()
    });
    assert!(config.execution.concurrent);
}

#[test]
fn test_explicit_file_and_validation() {
    let test_dir = TempDir::new().unwrap();
    let path = test_dir.path().join("custom.toml");
    fs::write(
        &path,
        r#"
[execution]
close_threshold_ms = 0

[task.generator]
entry_point = ""
"#,
    )
    .unwrap();

    let config = with_xdg_env(&test_dir, || ConfigLoader::load_from_file(&path).unwrap());
    let errors = config.validate().unwrap_err();
    assert!(errors.len() >= 2);
}

#[test]
fn test_serialized_config_loads_back() {
    let test_dir = TempDir::new().unwrap();
    let mut config = ProvgenConfig::default();
    config.task.input_dirs = vec![PathBuf::from("grammars")];
    config.task.extensions = vec!["g".to_string()];
    config.task.generator.entry_point = "antlr::Tool".to_string();
    config.execution.max_workers = Some(3);

    let path = test_dir.path().join("provgen.toml");
    fs::write(&path, toml::to_string(&config).unwrap()).unwrap();

    let loaded = with_xdg_env(&test_dir, || ConfigLoader::load_from_file(&path).unwrap());
    assert_eq!(loaded, config);
    assert!(loaded.validate().is_ok());
}
