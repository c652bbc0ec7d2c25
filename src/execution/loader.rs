//! Code loaders: the isolation domain generators run in.
//!
//! A `ModuleCatalog` knows how to instantiate every named entry point. The
//! `SharedLoader` is the caller's own loader: one instance per name for the
//! whole process. An `IsolatedLoader` keeps private instances built over its
//! own search path, so state held by a generator never leaks between contexts,
//! except for the pass-through namespaces which resolve against the parent.

use crate::error::{ExecutionError, PoolError};
use crate::execution::pool::ContextFactory;
use crate::execution::resources::ResourceSet;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// A generator entry point, invoked by method name
pub trait EntryPoint: Send + Sync {
    fn has_method(&self, method: &str) -> bool;

    fn invoke(&self, method: &str, args: &[String]) -> anyhow::Result<()>;
}

type MethodFn = dyn Fn(&[String]) -> anyhow::Result<()> + Send + Sync;

/// Entry point backed by closures
#[derive(Default, Clone)]
pub struct FnEntryPoint {
    methods: HashMap<String, Arc<MethodFn>>,
}

impl FnEntryPoint {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn method<F>(mut self, name: &str, f: F) -> Self
    where
        F: Fn(&[String]) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        self.methods.insert(name.to_string(), Arc::new(f));
        self
    }
}

impl EntryPoint for FnEntryPoint {
    fn has_method(&self, method: &str) -> bool {
        self.methods.contains_key(method)
    }

    fn invoke(&self, method: &str, args: &[String]) -> anyhow::Result<()> {
        match self.methods.get(method) {
            Some(f) => f(args),
            None => anyhow::bail!("no method '{}'", method),
        }
    }
}

/// What a module factory sees when instantiating an entry point
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModuleEnv {
    pub search_path: Vec<PathBuf>,
    pub isolated: bool,
}

type ModuleFactory = dyn Fn(&ModuleEnv) -> anyhow::Result<Arc<dyn EntryPoint>> + Send + Sync;

/// Named module factories
#[derive(Default, Clone)]
pub struct ModuleCatalog {
    modules: HashMap<String, Arc<ModuleFactory>>,
}

impl ModuleCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register<F>(mut self, name: &str, factory: F) -> Self
    where
        F: Fn(&ModuleEnv) -> anyhow::Result<Arc<dyn EntryPoint>> + Send + Sync + 'static,
    {
        self.modules.insert(name.to_string(), Arc::new(factory));
        self
    }

    pub fn contains(&self, name: &str) -> bool {
        self.modules.contains_key(name)
    }

    /// Build a fresh instance; `Ok(None)` for unknown names
    pub fn instantiate(
        &self,
        name: &str,
        env: &ModuleEnv,
    ) -> Result<Option<Arc<dyn EntryPoint>>, ExecutionError> {
        let Some(factory) = self.modules.get(name) else {
            return Ok(None);
        };
        factory(env)
            .map(Some)
            .map_err(|e| ExecutionError::Instantiation {
                entry_point: name.to_string(),
                message: e.root_cause().to_string(),
            })
    }
}

/// Resolves entry points by name
pub trait CodeLoader: Send + Sync {
    fn resolve(&self, name: &str) -> Result<Option<Arc<dyn EntryPoint>>, ExecutionError>;

    fn search_path(&self) -> &[PathBuf];

    fn is_isolated(&self) -> bool;

    fn close(&self) -> Result<(), PoolError> {
        Ok(())
    }
}

fn resolve_cached(
    catalog: &ModuleCatalog,
    instances: &Mutex<HashMap<String, Arc<dyn EntryPoint>>>,
    name: &str,
    env: &ModuleEnv,
) -> Result<Option<Arc<dyn EntryPoint>>, ExecutionError> {
    let mut instances = instances.lock();
    if let Some(existing) = instances.get(name) {
        return Ok(Some(Arc::clone(existing)));
    }
    let created = catalog.instantiate(name, env)?;
    if let Some(entry) = &created {
        instances.insert(name.to_string(), Arc::clone(entry));
    }
    Ok(created)
}

/// The caller's own loader: one shared instance per name
pub struct SharedLoader {
    catalog: Arc<ModuleCatalog>,
    env: ModuleEnv,
    instances: Mutex<HashMap<String, Arc<dyn EntryPoint>>>,
}

impl SharedLoader {
    pub fn new(catalog: Arc<ModuleCatalog>, search_path: Vec<PathBuf>) -> Self {
        Self {
            catalog,
            env: ModuleEnv {
                search_path,
                isolated: false,
            },
            instances: Mutex::new(HashMap::new()),
        }
    }

    pub fn catalog(&self) -> &Arc<ModuleCatalog> {
        &self.catalog
    }
}

impl CodeLoader for SharedLoader {
    fn resolve(&self, name: &str) -> Result<Option<Arc<dyn EntryPoint>>, ExecutionError> {
        resolve_cached(&self.catalog, &self.instances, name, &self.env)
    }

    fn search_path(&self) -> &[PathBuf] {
        &self.env.search_path
    }

    fn is_isolated(&self) -> bool {
        false
    }
}

/// Namespaces exempt from isolation
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PassThrough(Vec<String>);

impl PassThrough {
    pub fn new(namespaces: Vec<String>) -> Self {
        Self(namespaces)
    }

    /// `name` equals a namespace or lives beneath it (`ns::...`)
    pub fn covers(&self, name: &str) -> bool {
        self.0.iter().any(|ns| {
            name == ns
                || name
                    .strip_prefix(ns.as_str())
                    .is_some_and(|rest| rest.starts_with("::"))
        })
    }
}

/// Private loader of one execution context
pub struct IsolatedLoader {
    catalog: Arc<ModuleCatalog>,
    parent: Arc<dyn CodeLoader>,
    pass_through: PassThrough,
    env: ModuleEnv,
    instances: Mutex<HashMap<String, Arc<dyn EntryPoint>>>,
    closed: AtomicBool,
}

impl IsolatedLoader {
    pub fn new(
        catalog: Arc<ModuleCatalog>,
        parent: Arc<dyn CodeLoader>,
        pass_through: PassThrough,
        search_path: Vec<PathBuf>,
    ) -> Self {
        Self {
            catalog,
            parent,
            pass_through,
            env: ModuleEnv {
                search_path,
                isolated: true,
            },
            instances: Mutex::new(HashMap::new()),
            closed: AtomicBool::new(false),
        }
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }
}

impl CodeLoader for IsolatedLoader {
    fn resolve(&self, name: &str) -> Result<Option<Arc<dyn EntryPoint>>, ExecutionError> {
        if self.pass_through.covers(name) {
            return self.parent.resolve(name);
        }
        if self.is_closed() {
            return Err(ExecutionError::Pool(PoolError::ContextClose(format!(
                "loader closed before resolving {}",
                name
            ))));
        }
        resolve_cached(&self.catalog, &self.instances, name, &self.env)
    }

    fn search_path(&self) -> &[PathBuf] {
        &self.env.search_path
    }

    fn is_isolated(&self) -> bool {
        true
    }

    fn close(&self) -> Result<(), PoolError> {
        self.closed.store(true, Ordering::Release);
        self.instances.lock().clear();
        Ok(())
    }
}

/// Builds isolated loaders for pooled contexts
#[derive(Clone)]
pub struct IsolatedLoaderFactory {
    catalog: Arc<ModuleCatalog>,
    parent: Arc<dyn CodeLoader>,
    pass_through: PassThrough,
    base_resources: Vec<PathBuf>,
}

impl IsolatedLoaderFactory {
    pub fn new(
        catalog: Arc<ModuleCatalog>,
        parent: Arc<dyn CodeLoader>,
        pass_through: PassThrough,
        base_resources: Vec<PathBuf>,
    ) -> Self {
        Self {
            catalog,
            parent,
            pass_through,
            base_resources,
        }
    }

    fn build(&self, search_path: Vec<PathBuf>) -> Arc<dyn CodeLoader> {
        Arc::new(IsolatedLoader::new(
            Arc::clone(&self.catalog),
            Arc::clone(&self.parent),
            self.pass_through.clone(),
            search_path,
        ))
    }
}

impl ContextFactory<()> for IsolatedLoaderFactory {
    fn create(&self, _key: &()) -> Result<Arc<dyn CodeLoader>, PoolError> {
        Ok(self.build(self.base_resources.clone()))
    }
}

impl ContextFactory<ResourceSet> for IsolatedLoaderFactory {
    fn create(&self, key: &ResourceSet) -> Result<Arc<dyn CodeLoader>, PoolError> {
        for resource in key {
            if !resource.exists() {
                return Err(PoolError::ContextCreation(format!(
                    "extra resource {} does not exist",
                    resource.display()
                )));
            }
        }
        Ok(self.build(key.search_path(&self.base_resources)))
    }
}
