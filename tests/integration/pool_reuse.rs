//! Execution pool reuse and eviction

use provgen::error::{ExecutionError, PoolError};
use provgen::execution::{
    CodeLoader, ContextFactory, EntryPoint, ExecutionPool, ExtraResourcePool, FnEntryPoint,
    GeneratorExecutor, InvocationRequest, IsolatedLoaderFactory, ModuleCatalog, ResourceSet,
    PassThrough, SharedLoader, SimplePool,
};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tempfile::TempDir;

fn catalog(instances: Arc<AtomicUsize>) -> Arc<ModuleCatalog> {
    Arc::new(ModuleCatalog::new().register("gen::Main", move |_env| {
        instances.fetch_add(1, Ordering::SeqCst);
        Ok(Arc::new(FnEntryPoint::new().method("run", |_args| Ok(()))) as Arc<dyn EntryPoint>)
    }))
}

fn factory(catalog: Arc<ModuleCatalog>) -> IsolatedLoaderFactory {
    let shared = Arc::new(SharedLoader::new(catalog.clone(), Vec::new()));
    IsolatedLoaderFactory::new(catalog, shared, PassThrough::new(Vec::new()), Vec::new())
}

fn request(extra: ResourceSet) -> InvocationRequest {
    InvocationRequest {
        entry_point: "gen::Main".to_string(),
        method: "run".to_string(),
        args: Vec::new(),
        prefix: None,
        extra_resources: extra,
    }
}

#[test]
fn test_simple_pool_reuses_one_context_sequentially() {
    let instances = Arc::new(AtomicUsize::new(0));
    let pool = SimplePool::new(factory(catalog(instances.clone())), Duration::from_secs(60));

    for _ in 0..3 {
        pool.execute(&request(ResourceSet::new())).unwrap();
    }

    let stats = pool.stats().unwrap();
    assert_eq!(stats.created, 1);
    assert_eq!(stats.reused, 2);
    assert_eq!(stats.running, 0);
    // the isolated loader keeps its entry point instance
    assert_eq!(instances.load(Ordering::SeqCst), 1);
}

#[test]
fn test_extra_resource_pool_keys_by_set() {
    let temp = TempDir::new().unwrap();
    let lib_a = temp.path().join("a.jar");
    let lib_b = temp.path().join("b.jar");
    std::fs::write(&lib_a, "a").unwrap();
    std::fs::write(&lib_b, "b").unwrap();

    let mut first = ResourceSet::new();
    first.insert(lib_a.clone());
    let mut second = ResourceSet::new();
    second.insert(lib_b.clone());

    let pool = ExtraResourcePool::new(
        factory(catalog(Arc::new(AtomicUsize::new(0)))),
        Duration::from_secs(60),
    );
    pool.execute(&request(first.clone())).unwrap();
    pool.execute(&request(second)).unwrap();
    pool.execute(&request(first)).unwrap();

    let stats = pool.stats().unwrap();
    assert_eq!(stats.created, 2);
    assert_eq!(stats.reused, 1);
    assert_eq!(stats.live, 2);
}

#[test]
fn test_missing_extra_resource_fails_creation() {
    let temp = TempDir::new().unwrap();
    let mut extra = ResourceSet::new();
    extra.insert(temp.path().join("absent.jar"));

    let pool = ExtraResourcePool::new(
        factory(catalog(Arc::new(AtomicUsize::new(0)))),
        Duration::from_secs(60),
    );
    assert!(pool.execute(&request(extra)).is_err());
    assert_eq!(pool.stats().unwrap().live, 0);
}

struct Plain;

impl CodeLoader for Plain {
    fn resolve(&self, _name: &str) -> Result<Option<Arc<dyn EntryPoint>>, ExecutionError> {
        Ok(None)
    }

    fn search_path(&self) -> &[std::path::PathBuf] {
        &[]
    }

    fn is_isolated(&self) -> bool {
        true
    }
}

struct PlainFactory;

impl ContextFactory<u8> for PlainFactory {
    fn create(&self, _key: &u8) -> Result<Arc<dyn CodeLoader>, PoolError> {
        Ok(Arc::new(Plain))
    }
}

#[test]
fn test_sweep_closes_only_idle_expired_contexts() {
    let pool = ExecutionPool::new(Arc::new(PlainFactory), Duration::from_millis(50));

    let running = pool.acquire(&1).unwrap();
    drop(pool.acquire(&2).unwrap());

    let later = Instant::now() + Duration::from_secs(1);
    assert_eq!(pool.sweep_expired(later), 1);

    let stats = pool.stats();
    assert_eq!(stats.live, 1);
    assert_eq!(stats.running, 1);
    assert_eq!(stats.closed, 1);

    drop(running);
    assert_eq!(pool.sweep_expired(Instant::now() + Duration::from_secs(1)), 1);
    assert_eq!(pool.stats().live, 0);
}

#[test]
fn test_concurrent_acquires_never_share_a_context() {
    let pool = ExecutionPool::new(Arc::new(PlainFactory), Duration::from_secs(60));
    let leases: Vec<_> = (0..4).map(|_| pool.acquire(&0).unwrap()).collect();
    let mut ids: Vec<u64> = leases.iter().map(|l| l.id()).collect();
    ids.sort();
    ids.dedup();
    assert_eq!(ids.len(), 4);
    assert_eq!(pool.stats().running, 4);
    drop(leases);
    assert_eq!(pool.stats().running, 0);
}
