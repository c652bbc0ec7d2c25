//! Running an invocation inside a loader.

use crate::error::ExecutionError;
use crate::execution::console::ConsoleRedirect;
use crate::execution::loader::CodeLoader;
use crate::execution::variants::InvocationRequest;
use std::any::Any;
use std::cell::RefCell;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

thread_local! {
    static CURRENT_LOADER: RefCell<Option<Arc<dyn CodeLoader>>> = const { RefCell::new(None) };
}

/// Makes a loader the thread's active loader until dropped
pub struct ActiveLoaderGuard {
    previous: Option<Arc<dyn CodeLoader>>,
}

impl ActiveLoaderGuard {
    pub fn activate(loader: Arc<dyn CodeLoader>) -> Self {
        let previous = CURRENT_LOADER.with(|slot| slot.borrow_mut().replace(loader));
        Self { previous }
    }
}

impl Drop for ActiveLoaderGuard {
    fn drop(&mut self) {
        let previous = self.previous.take();
        CURRENT_LOADER.with(|slot| *slot.borrow_mut() = previous);
    }
}

/// Loader active on this thread, if any
///
/// Generators use this to resolve collaborators through the same context they
/// were invoked in.
pub fn current_loader() -> Option<Arc<dyn CodeLoader>> {
    CURRENT_LOADER.with(|slot| slot.borrow().clone())
}

/// Run `request` with `loader` active and the console redirected
///
/// Both are restored before returning, whatever the outcome.
pub fn run_in_context(
    loader: Arc<dyn CodeLoader>,
    request: &InvocationRequest,
) -> Result<(), ExecutionError> {
    let _console = ConsoleRedirect::install(request.prefix.clone());
    let _active = ActiveLoaderGuard::activate(Arc::clone(&loader));
    invoke_by_name(loader.as_ref(), &request.entry_point, &request.method, &request.args)
}

/// Resolve `entry_point` through `loader` and invoke `method`
pub fn invoke_by_name(
    loader: &dyn CodeLoader,
    entry_point: &str,
    method: &str,
    args: &[String],
) -> Result<(), ExecutionError> {
    let entry = loader
        .resolve(entry_point)?
        .ok_or_else(|| ExecutionError::EntryPointNotFound(entry_point.to_string()))?;
    if !entry.has_method(method) {
        return Err(ExecutionError::UnknownMethod {
            entry_point: entry_point.to_string(),
            method: method.to_string(),
        });
    }

    match panic::catch_unwind(AssertUnwindSafe(|| entry.invoke(method, args))) {
        Ok(Ok(())) => Ok(()),
        // report the underlying cause rather than the outermost context
        Ok(Err(e)) => Err(ExecutionError::GenerationFailed {
            entry_point: entry_point.to_string(),
            message: e.root_cause().to_string(),
        }),
        Err(payload) => Err(ExecutionError::Panicked {
            entry_point: entry_point.to_string(),
            message: panic_message(payload.as_ref()),
        }),
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
