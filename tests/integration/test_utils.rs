//! Shared test utilities for integration tests
//!
//! Workspace fixtures, an in-process generator that honors the provenance
//! report contract, and serialized access to the XDG environment.

use provgen::diagnostics::{BuildLogger, RecordingLogger};
use provgen::dispatcher::{DispatchSettings, ExecutionDispatcher};
use provgen::execution::{EntryPoint, FnEntryPoint, ModuleCatalog};
use provgen::provenance::ReportWriter;
use provgen::build::{IncrementalBuild, StandardArguments};
use provgen::strategy::StrategyKind;
use provgen::unit::TaskLayout;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tempfile::TempDir;

pub const GENERATOR: &str = "grammar::Generator";

/// Global mutex to serialize XDG environment variable access across all tests
static XDG_ENV_MUTEX: Mutex<()> = Mutex::new(());

/// Environment variable state to restore after test
struct EnvState {
    home: Option<String>,
    xdg_config_home: Option<String>,
}

impl EnvState {
    fn capture() -> Self {
        Self {
            home: std::env::var("HOME").ok(),
            xdg_config_home: std::env::var("XDG_CONFIG_HOME").ok(),
        }
    }

    fn restore(self) {
        match self.home {
            Some(orig) => std::env::set_var("HOME", orig),
            None => std::env::remove_var("HOME"),
        }
        match self.xdg_config_home {
            Some(orig) => std::env::set_var("XDG_CONFIG_HOME", orig),
            None => std::env::remove_var("XDG_CONFIG_HOME"),
        }
    }
}

/// Run `f` with HOME and XDG_CONFIG_HOME pointing into `test_dir`
pub fn with_xdg_env<F, R>(test_dir: &TempDir, f: F) -> R
where
    F: FnOnce() -> R,
{
    let _guard = XDG_ENV_MUTEX.lock().unwrap_or_else(|e| e.into_inner());
    let env_state = EnvState::capture();

    let test_config_home = test_dir.path().join("config");
    let test_home = test_dir.path().join("home");
    std::fs::create_dir_all(&test_config_home).unwrap();
    std::fs::create_dir_all(&test_home).unwrap();

    std::env::set_var("HOME", &test_home);
    std::env::set_var("XDG_CONFIG_HOME", &test_config_home);

    let result = f();

    env_state.restore();

    result
}

/// Workspace with `in/<name>` inputs
pub fn workspace(inputs: &[(&str, &str)]) -> TempDir {
    let temp = TempDir::new().unwrap();
    for (name, content) in inputs {
        let path = temp.path().join("in").join(name);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(path, content).unwrap();
    }
    temp
}

pub fn layout(root: &Path) -> TaskLayout {
    TaskLayout::new(
        "grammars",
        root,
        &[PathBuf::from("in")],
        &["g".to_string()],
        Path::new("out"),
        Path::new("build/reports"),
        &[],
        &[],
    )
    .unwrap()
}

fn flag_value(args: &[String], flag: &str) -> anyhow::Result<PathBuf> {
    args.iter()
        .position(|a| a == flag)
        .and_then(|i| args.get(i + 1))
        .map(PathBuf::from)
        .ok_or_else(|| anyhow::anyhow!("missing {}", flag))
}

/// Generator writing `<stem>.java` per input and a faithful report
///
/// A blank grammar is read but yields no output file.
///
/// Every entry point instance counts its invocations in `calls`.
pub fn grammar_catalog(calls: Arc<AtomicUsize>) -> ModuleCatalog {
    ModuleCatalog::new().register(GENERATOR, move |_env| {
        let calls = calls.clone();
        Ok(Arc::new(FnEntryPoint::new().method("run", move |args| {
            calls.fetch_add(1, Ordering::SeqCst);
            let output = flag_value(args, "--output")?;
            let report = flag_value(args, "--report")?;
            let mut writer = ReportWriter::new(flag_value(args, "--base")?);
            for (i, arg) in args.iter().enumerate() {
                if arg != "--input" {
                    continue;
                }
                let input = PathBuf::from(&args[i + 1]);
                let stem = input
                    .file_stem()
                    .unwrap_or_default()
                    .to_string_lossy()
                    .to_string();
                let grammar = std::fs::read_to_string(&input)?;
                writer.read(&input);
                if grammar.trim().is_empty() {
                    continue;
                }
                let target = output.join(format!("{}.java", stem));
                std::fs::write(&target, format!("class {} {{ /* {} */ }}", stem, grammar))?;
                writer.generated(&target);
            }
            writer.write_to(&report)?;
            Ok(())
        })) as Arc<dyn EntryPoint>)
    })
}

pub struct Harness {
    pub build: IncrementalBuild,
    pub calls: Arc<AtomicUsize>,
    pub logger: Arc<RecordingLogger>,
}

pub fn harness(root: &Path, strategy: StrategyKind, concurrent: bool) -> Harness {
    let calls = Arc::new(AtomicUsize::new(0));
    let logger = Arc::new(RecordingLogger::new());
    let shared: Arc<dyn BuildLogger> = logger.clone();
    let mut settings = DispatchSettings::new(GENERATOR);
    settings.concurrent = concurrent;
    let dispatcher = ExecutionDispatcher::from_catalog(
        Arc::new(grammar_catalog(calls.clone())),
        settings,
        shared.clone(),
    );
    let mut build = IncrementalBuild::new(
        layout(root),
        strategy.strategy(),
        Arc::new(dispatcher),
        Arc::new(StandardArguments::default()),
        shared,
    );
    if concurrent {
        let mut options = build.options();
        options.max_workers = 4;
        build = build.with_options(options);
    }
    Harness {
        build,
        calls,
        logger,
    }
}
