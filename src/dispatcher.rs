//! Execution dispatcher: pooled isolated execution or direct debugging runs.

use crate::diagnostics::BuildLogger;
use crate::error::ExecutionError;
use crate::execution::{
    default_pass_through, DirectExecutor, ExtraResourcePool, GeneratorExecutor,
    InvocationRequest, IsolatedLoaderFactory, ModuleCatalog, PassThrough, PoolStats,
    SharedLoader, SimplePool, DEFAULT_CLOSE_THRESHOLD,
};
use crate::unit::GenerationUnit;
use parking_lot::Mutex;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// How the dispatcher runs units
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DispatchSettings {
    pub entry_point: String,
    pub method: String,
    /// Bypass the pool and run on the calling thread's loader
    pub debug: bool,
    /// Units run on several worker threads at once
    pub concurrent: bool,
    /// Pool contexts by extra resource set instead of treating them as interchangeable
    pub keyed_by_resources: bool,
    pub close_threshold: Duration,
    pub pass_through: Vec<String>,
    pub base_resources: Vec<PathBuf>,
}

impl DispatchSettings {
    pub fn new(entry_point: &str) -> Self {
        Self {
            entry_point: entry_point.to_string(),
            method: "run".to_string(),
            debug: false,
            concurrent: false,
            keyed_by_resources: false,
            close_threshold: DEFAULT_CLOSE_THRESHOLD,
            pass_through: default_pass_through(),
            base_resources: Vec::new(),
        }
    }
}

/// Result of one dispatched unit
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DispatchOutcome {
    pub unit: String,
    pub error: Option<String>,
    pub elapsed: Duration,
}

impl DispatchOutcome {
    pub fn succeeded(&self) -> bool {
        self.error.is_none()
    }
}

/// Routes each unit to the pooled or the direct executor
pub struct ExecutionDispatcher {
    pooled: Arc<dyn GeneratorExecutor>,
    direct: Arc<dyn GeneratorExecutor>,
    settings: DispatchSettings,
    logger: Arc<dyn BuildLogger>,
    outcomes: Mutex<Vec<DispatchOutcome>>,
}

impl ExecutionDispatcher {
    pub fn new(
        pooled: Arc<dyn GeneratorExecutor>,
        direct: Arc<dyn GeneratorExecutor>,
        settings: DispatchSettings,
        logger: Arc<dyn BuildLogger>,
    ) -> Self {
        Self {
            pooled,
            direct,
            settings,
            logger,
            outcomes: Mutex::new(Vec::new()),
        }
    }

    /// Wire the pool variant and the direct fallback over `catalog`
    pub fn from_catalog(
        catalog: Arc<ModuleCatalog>,
        settings: DispatchSettings,
        logger: Arc<dyn BuildLogger>,
    ) -> Self {
        let shared = Arc::new(SharedLoader::new(
            Arc::clone(&catalog),
            settings.base_resources.clone(),
        ));
        let factory = IsolatedLoaderFactory::new(
            catalog,
            shared.clone(),
            PassThrough::new(settings.pass_through.clone()),
            settings.base_resources.clone(),
        );
        let pooled: Arc<dyn GeneratorExecutor> = if settings.keyed_by_resources {
            Arc::new(ExtraResourcePool::new(factory, settings.close_threshold))
        } else {
            Arc::new(SimplePool::new(factory, settings.close_threshold))
        };
        let direct: Arc<dyn GeneratorExecutor> = Arc::new(DirectExecutor::new(shared));
        Self::new(pooled, direct, settings, logger)
    }

    pub fn settings(&self) -> &DispatchSettings {
        &self.settings
    }

    /// Run the generator for `unit` with `args`
    pub fn run(&self, unit: &GenerationUnit, args: Vec<String>) -> Result<(), ExecutionError> {
        let executor = if self.settings.debug {
            if self.settings.concurrent {
                self.logger.warn(&format!(
                    "{}: running without isolation while units run concurrently; generator globals are shared",
                    unit.label
                ));
            }
            &self.direct
        } else {
            &self.pooled
        };

        let request = InvocationRequest {
            entry_point: self.settings.entry_point.clone(),
            method: self.settings.method.clone(),
            args,
            prefix: self.settings.concurrent.then(|| unit.label.clone()),
            extra_resources: unit.extra_resources.clone(),
        };

        self.logger.debug(&format!("{}: dispatching", unit.label));
        let started = Instant::now();
        let result = executor.execute(&request);
        let elapsed = started.elapsed();

        match &result {
            Ok(()) => self.logger.info(&format!(
                "{}: generated in {} ms",
                unit.label,
                elapsed.as_millis()
            )),
            Err(e) => self.logger.fatal(&format!("{}: {}", unit.label, e)),
        }
        self.outcomes.lock().push(DispatchOutcome {
            unit: unit.label.clone(),
            error: result.as_ref().err().map(|e| e.to_string()),
            elapsed,
        });
        result
    }

    /// Outcomes recorded so far, in completion order
    pub fn outcomes(&self) -> Vec<DispatchOutcome> {
        self.outcomes.lock().clone()
    }

    pub fn pool_stats(&self) -> Option<PoolStats> {
        self.pooled.stats()
    }
}
