//! The two pooled executor variants.

use crate::error::ExecutionError;
use crate::execution::context::run_in_context;
use crate::execution::loader::IsolatedLoaderFactory;
use crate::execution::pool::{ExecutionPool, PoolStats};
use crate::execution::resources::ResourceSet;
use std::sync::Arc;
use std::time::Duration;

/// One generator invocation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvocationRequest {
    pub entry_point: String,
    pub method: String,
    pub args: Vec<String>,
    /// Console line prefix, set when units run concurrently
    pub prefix: Option<String>,
    pub extra_resources: ResourceSet,
}

/// Runs invocation requests
pub trait GeneratorExecutor: Send + Sync {
    fn execute(&self, request: &InvocationRequest) -> Result<(), ExecutionError>;

    /// Pool counters, when the executor pools contexts
    fn stats(&self) -> Option<PoolStats> {
        None
    }
}

/// Pool where every context is interchangeable
///
/// Extra resources on the request are ignored.
pub struct SimplePool {
    pool: ExecutionPool<()>,
}

impl SimplePool {
    pub fn new(factory: IsolatedLoaderFactory, close_threshold: Duration) -> Self {
        Self {
            pool: ExecutionPool::new(Arc::new(factory), close_threshold),
        }
    }

    pub fn pool(&self) -> &ExecutionPool<()> {
        &self.pool
    }
}

impl GeneratorExecutor for SimplePool {
    fn execute(&self, request: &InvocationRequest) -> Result<(), ExecutionError> {
        let lease = self.pool.acquire(&())?;
        run_in_context(Arc::clone(lease.loader()), request)
    }

    fn stats(&self) -> Option<PoolStats> {
        Some(self.pool.stats())
    }
}

/// Pool keyed by the request's extra resources
///
/// A context is only reused for a request whose resource set equals the one it
/// was created with.
pub struct ExtraResourcePool {
    pool: ExecutionPool<ResourceSet>,
}

impl ExtraResourcePool {
    pub fn new(factory: IsolatedLoaderFactory, close_threshold: Duration) -> Self {
        Self {
            pool: ExecutionPool::new(Arc::new(factory), close_threshold),
        }
    }

    pub fn pool(&self) -> &ExecutionPool<ResourceSet> {
        &self.pool
    }
}

impl GeneratorExecutor for ExtraResourcePool {
    fn execute(&self, request: &InvocationRequest) -> Result<(), ExecutionError> {
        let lease = self.pool.acquire(&request.extra_resources)?;
        run_in_context(Arc::clone(lease.loader()), request)
    }

    fn stats(&self) -> Option<PoolStats> {
        Some(self.pool.stats())
    }
}
