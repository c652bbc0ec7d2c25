//! Direct execution for debugging: no isolation, no pooling.

use crate::error::ExecutionError;
use crate::execution::context::run_in_context;
use crate::execution::loader::{CodeLoader, ModuleCatalog, SharedLoader};
use crate::execution::resources::ResourceSet;
use crate::execution::variants::{GeneratorExecutor, InvocationRequest};
use parking_lot::Mutex;
use std::sync::Arc;

/// Runs generators on the calling thread with the caller's own loader
///
/// Requests with extra resources get one loader augmented with them, kept for
/// as long as the same resource set keeps being requested.
pub struct DirectExecutor {
    base: Arc<SharedLoader>,
    augmented: Mutex<Option<(ResourceSet, Arc<dyn CodeLoader>)>>,
}

impl DirectExecutor {
    pub fn new(base: Arc<SharedLoader>) -> Self {
        Self {
            base,
            augmented: Mutex::new(None),
        }
    }

    fn loader_for(&self, extra: &ResourceSet) -> Arc<dyn CodeLoader> {
        if extra.is_empty() {
            return self.base.clone();
        }
        let mut augmented = self.augmented.lock();
        if let Some((key, loader)) = augmented.as_ref() {
            if key == extra {
                return Arc::clone(loader);
            }
        }
        let catalog: Arc<ModuleCatalog> = Arc::clone(self.base.catalog());
        let loader: Arc<dyn CodeLoader> = Arc::new(SharedLoader::new(
            catalog,
            extra.search_path(self.base.search_path()),
        ));
        *augmented = Some((extra.clone(), Arc::clone(&loader)));
        loader
    }
}

impl GeneratorExecutor for DirectExecutor {
    fn execute(&self, request: &InvocationRequest) -> Result<(), ExecutionError> {
        tracing::debug!(entry_point = %request.entry_point, "Running generator directly");
        run_in_context(self.loader_for(&request.extra_resources), request)
    }
}
