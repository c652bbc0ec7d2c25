//! Isolated execution of generator entry points
//!
//! Generators are reached only by name through a `CodeLoader`. The pool keeps
//! a set of isolated loaders ("execution contexts") alive between units and
//! hands each one to at most one caller at a time; the direct executor skips
//! isolation for interactive debugging.

pub mod console;
pub mod context;
pub mod direct;
pub mod loader;
pub mod pool;
pub mod process;
pub mod resources;
pub mod variants;

pub use console::{Console, ConsoleRedirect, SharedBuffer};
pub use context::{current_loader, invoke_by_name, run_in_context, ActiveLoaderGuard};
pub use direct::DirectExecutor;
pub use loader::{
    CodeLoader, EntryPoint, FnEntryPoint, IsolatedLoader, IsolatedLoaderFactory, ModuleCatalog,
    ModuleEnv, PassThrough, SharedLoader,
};
pub use pool::{ContextFactory, ContextLease, ExecutionPool, PoolStats};
pub use process::CommandEntryPoint;
pub use resources::ResourceSet;
pub use variants::{ExtraResourcePool, GeneratorExecutor, InvocationRequest, SimplePool};

use std::time::Duration;

/// Default idle time after which a pooled context is closed
pub const DEFAULT_CLOSE_THRESHOLD: Duration = Duration::from_millis(6000);

/// Names that always resolve against the caller's loader
pub fn default_pass_through() -> Vec<String> {
    vec!["log".to_string(), "tracing".to_string()]
}
