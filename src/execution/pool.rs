//! Pool of reusable execution contexts
//!
//! A context is an isolated loader plus the key it was created for. At most one
//! caller holds a context at a time: `acquire` hands out a `ContextLease` and
//! the context goes back to idle when the lease drops. Idle contexts are closed
//! by a background sweeper once unused for longer than the close threshold;
//! the sweeper only holds a weak reference and exits when nothing is pooled.

use crate::error::PoolError;
use crate::execution::loader::CodeLoader;
use parking_lot::{Condvar, Mutex};
use serde::Serialize;
use std::sync::{Arc, Weak};
use std::thread;
use std::time::{Duration, Instant};

/// Creates the loader for a new context
pub trait ContextFactory<K>: Send + Sync {
    fn create(&self, key: &K) -> Result<Arc<dyn CodeLoader>, PoolError>;
}

/// Pool counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct PoolStats {
    pub created: u64,
    pub reused: u64,
    pub closed: u64,
    pub live: usize,
    pub running: usize,
}

struct Entry<K> {
    id: u64,
    key: K,
    loader: Arc<dyn CodeLoader>,
    running: bool,
    last_used: Instant,
}

struct State<K> {
    entries: Vec<Entry<K>>,
    next_id: u64,
    created: u64,
    reused: u64,
    closed: u64,
    sweeper_running: bool,
    shutdown: bool,
}

impl<K> State<K> {
    fn take_expired(&mut self, now: Instant, threshold: Duration) -> Vec<Entry<K>> {
        let mut expired = Vec::new();
        let mut kept = Vec::with_capacity(self.entries.len());
        for entry in self.entries.drain(..) {
            if !entry.running && now.saturating_duration_since(entry.last_used) >= threshold {
                expired.push(entry);
            } else {
                kept.push(entry);
            }
        }
        self.entries = kept;
        self.closed += expired.len() as u64;
        expired
    }

    fn next_deadline(&self, threshold: Duration) -> Option<Instant> {
        self.entries
            .iter()
            .filter(|e| !e.running)
            .map(|e| e.last_used + threshold)
            .min()
    }
}

struct Shared<K> {
    state: Mutex<State<K>>,
    wake: Condvar,
    threshold: Duration,
}

fn close_entries<K>(entries: Vec<Entry<K>>) {
    for entry in entries {
        match entry.loader.close() {
            Ok(()) => tracing::debug!(context = entry.id, "Closed idle execution context"),
            Err(e) => tracing::warn!(context = entry.id, error = %e, "Failed to close execution context"),
        }
    }
}

/// Keyed pool of execution contexts
pub struct ExecutionPool<K> {
    shared: Arc<Shared<K>>,
    factory: Arc<dyn ContextFactory<K>>,
}

impl<K> ExecutionPool<K>
where
    K: Clone + PartialEq + Send + 'static,
{
    pub fn new(factory: Arc<dyn ContextFactory<K>>, close_threshold: Duration) -> Self {
        Self {
            shared: Arc::new(Shared {
                state: Mutex::new(State {
                    entries: Vec::new(),
                    next_id: 0,
                    created: 0,
                    reused: 0,
                    closed: 0,
                    sweeper_running: false,
                    shutdown: false,
                }),
                wake: Condvar::new(),
                threshold: close_threshold,
            }),
            factory,
        }
    }

    pub fn close_threshold(&self) -> Duration {
        self.shared.threshold
    }

    /// Lease an idle context created for `key`, or create a new one
    pub fn acquire(&self, key: &K) -> Result<ContextLease<'_, K>, PoolError> {
        let expired = {
            let mut state = self.shared.state.lock();
            if let Some(entry) = state
                .entries
                .iter_mut()
                .find(|e| !e.running && e.key == *key)
            {
                entry.running = true;
                let lease = ContextLease {
                    pool: self,
                    id: entry.id,
                    loader: Arc::clone(&entry.loader),
                };
                state.reused += 1;
                tracing::debug!(context = lease.id, "Reusing execution context");
                return Ok(lease);
            }
            state.take_expired(Instant::now(), self.shared.threshold)
        };
        close_entries(expired);

        // creation may be slow; other callers keep using the pool meanwhile
        let loader = self.factory.create(key)?;

        let mut state = self.shared.state.lock();
        let id = state.next_id;
        state.next_id += 1;
        state.created += 1;
        state.entries.push(Entry {
            id,
            key: key.clone(),
            loader: Arc::clone(&loader),
            running: true,
            last_used: Instant::now(),
        });
        tracing::debug!(context = id, "Created execution context");
        if !state.sweeper_running {
            state.sweeper_running = self.spawn_sweeper();
        }
        Ok(ContextLease {
            pool: self,
            id,
            loader,
        })
    }

    fn spawn_sweeper(&self) -> bool {
        let weak = Arc::downgrade(&self.shared);
        let spawned = thread::Builder::new()
            .name("provgen-pool-sweeper".to_string())
            .spawn(move || sweep_loop(weak));
        match spawned {
            Ok(_) => true,
            Err(e) => {
                tracing::warn!(error = %e, "Could not start pool sweeper; idle contexts close on shutdown");
                false
            }
        }
    }

    fn release(&self, id: u64) {
        let mut state = self.shared.state.lock();
        if let Some(entry) = state.entries.iter_mut().find(|e| e.id == id) {
            entry.running = false;
            entry.last_used = Instant::now();
        }
        self.shared.wake.notify_all();
    }

    /// Close every idle context unused for the threshold as of `now`
    pub fn sweep_expired(&self, now: Instant) -> usize {
        let expired = self
            .shared
            .state
            .lock()
            .take_expired(now, self.shared.threshold);
        let count = expired.len();
        close_entries(expired);
        count
    }

    pub fn stats(&self) -> PoolStats {
        let state = self.shared.state.lock();
        PoolStats {
            created: state.created,
            reused: state.reused,
            closed: state.closed,
            live: state.entries.len(),
            running: state.entries.iter().filter(|e| e.running).count(),
        }
    }
}

fn sweep_loop<K>(weak: Weak<Shared<K>>) {
    loop {
        let Some(shared) = weak.upgrade() else {
            return;
        };
        let expired = {
            let mut state = shared.state.lock();
            if state.shutdown || state.entries.is_empty() {
                state.sweeper_running = false;
                return;
            }
            let now = Instant::now();
            let expired = state.take_expired(now, shared.threshold);
            if expired.is_empty() {
                let wait = state
                    .next_deadline(shared.threshold)
                    .map(|deadline| deadline.saturating_duration_since(now))
                    .unwrap_or(shared.threshold);
                shared.wake.wait_for(&mut state, wait);
            }
            expired
        };
        close_entries(expired);
    }
}

impl<K> Drop for ExecutionPool<K> {
    fn drop(&mut self) {
        let entries = {
            let mut state = self.shared.state.lock();
            state.shutdown = true;
            state.closed += state.entries.len() as u64;
            std::mem::take(&mut state.entries)
        };
        self.shared.wake.notify_all();
        close_entries(entries);
    }
}

/// Exclusive use of one pooled context
pub struct ContextLease<'a, K>
where
    K: Clone + PartialEq + Send + 'static,
{
    pool: &'a ExecutionPool<K>,
    id: u64,
    loader: Arc<dyn CodeLoader>,
}

impl<'a, K> ContextLease<'a, K>
where
    K: Clone + PartialEq + Send + 'static,
{
    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn loader(&self) -> &Arc<dyn CodeLoader> {
        &self.loader
    }
}

impl<'a, K> Drop for ContextLease<'a, K>
where
    K: Clone + PartialEq + Send + 'static,
{
    fn drop(&mut self) {
        self.pool.release(self.id);
    }
}
