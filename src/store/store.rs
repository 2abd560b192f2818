use std::collections::VecDeque;
use std::fmt;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, RwLock, Weak};

use super::settings::{Notification, NotifyOrder, Settings, StoreConfig};
use crate::error::SubscriberFault;
use crate::graph::{path, Selector, Value};

type WakeFn = dyn Fn() + Send + Sync;

struct Entry {
    id: u64,
    selector: Selector,
    settings: Settings,
    wake: Box<WakeFn>,
}

impl Entry {
    fn should_wake(&self, event: &Notification) -> bool {
        event.settings.do_force_update
            || self.settings.do_force_update
            || self.selector.intersects(&event.selector)
    }
}

#[derive(Default)]
struct Registry {
    next_id: u64,
    entries: Vec<Arc<Entry>>,
}

#[derive(Default)]
struct Dispatch {
    notifying: bool,
    pending: VecDeque<Notification>,
}

/// Outcome of a single `notify` call.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NotifyReport {
    /// Registry entries examined.
    pub visited: usize,
    /// Entries whose wake callback was invoked.
    pub woken: usize,
    /// Wake callbacks that panicked.
    pub faults: Vec<SubscriberFault>,
    /// The event was queued behind an in-flight notify and will be
    /// dispatched when that notify finishes.
    pub deferred: bool,
}

impl NotifyReport {
    fn absorb(&mut self, other: NotifyReport) {
        self.visited += other.visited;
        self.woken += other.woken;
        self.faults.extend(other.faults);
    }
}

/// The canonical data graph plus its subscriber registry.
///
/// Cloning a `StoreCore` creates another handle to the same graph and
/// registry.
///
/// # Invariants
///
/// 1. `get()` always returns the most recently committed root.
/// 2. Subscribers are woken in registration order.
/// 3. A notify iterates the registry as it was when the notify started;
///    unsubscribing during a notify takes effect from the next one.
/// 4. A panicking wake callback never prevents the remaining callbacks
///    from running.
pub struct StoreCore {
    graph: Arc<RwLock<Value>>,
    version: Arc<AtomicU64>,
    registry: Arc<Mutex<Registry>>,
    dispatch: Arc<Mutex<Dispatch>>,
    config: StoreConfig,
}

impl StoreCore {
    /// Create a core holding `initial` with the default configuration.
    pub fn new(initial: Value) -> Self {
        Self::with_config(initial, StoreConfig::default())
    }

    pub fn with_config(initial: Value, config: StoreConfig) -> Self {
        Self {
            graph: Arc::new(RwLock::new(initial)),
            version: Arc::new(AtomicU64::new(0)),
            registry: Arc::new(Mutex::new(Registry::default())),
            dispatch: Arc::new(Mutex::new(Dispatch::default())),
            config,
        }
    }

    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    /// The current root. Compound nodes are shared, so this is cheap.
    pub fn get(&self) -> Value {
        self.graph
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// The node at `selector` in the current root.
    pub fn read(&self, selector: &Selector) -> Option<Value> {
        self.with_graph(|graph| path::read(graph, selector).cloned())
    }

    /// Read the current root without cloning it.
    ///
    /// `f` runs under the graph read lock and must not call [`set`](Self::set)
    /// on this store; that would deadlock.
    pub(crate) fn with_graph<F, R>(&self, f: F) -> R
    where
        F: FnOnce(&Value) -> R,
    {
        let graph = self.graph.read().unwrap_or_else(PoisonError::into_inner);
        f(&graph)
    }

    /// Replace the root. Does not notify.
    pub fn set(&self, graph: Value) {
        *self.graph.write().unwrap_or_else(PoisonError::into_inner) = graph;
        let version = self.version.fetch_add(1, Ordering::SeqCst) + 1;
        tracing::trace!(version, "graph committed");
    }

    /// Number of commits since creation.
    pub fn version(&self) -> u64 {
        self.version.load(Ordering::SeqCst)
    }

    /// Register `wake` for changes intersecting `selector`.
    ///
    /// Dropping the returned [`Subscription`] unregisters it. Registering
    /// the same callback twice yields two independent entries.
    pub fn subscribe<F>(&self, selector: Selector, settings: Settings, wake: F) -> Subscription
    where
        F: Fn() + Send + Sync + 'static,
    {
        let mut registry = lock(&self.registry);
        let id = registry.next_id;
        registry.next_id += 1;
        tracing::trace!(id, selector = %selector, force = settings.do_force_update, "subscribe");
        registry.entries.push(Arc::new(Entry {
            id,
            selector,
            settings,
            wake: Box::new(wake),
        }));
        Subscription {
            id,
            registry: Arc::downgrade(&self.registry),
        }
    }

    /// Number of registered entries.
    pub fn subscriber_count(&self) -> usize {
        lock(&self.registry).entries.len()
    }

    /// Wake every entry affected by `event`.
    ///
    /// An entry is woken when the event is forced, when the entry itself
    /// asked for forced updates, or when the two selectors are equal or
    /// one is an ancestor of the other. The root selector is an ancestor
    /// of everything.
    pub fn notify(&self, event: &Notification) -> NotifyReport {
        if self.config.notify_order == NotifyOrder::DepthFirst {
            return self.dispatch(event);
        }

        {
            let mut dispatch = lock(&self.dispatch);
            if dispatch.notifying {
                tracing::trace!(selector = %event.selector, "notify queued behind in-flight pass");
                dispatch.pending.push_back(event.clone());
                return NotifyReport {
                    deferred: true,
                    ..NotifyReport::default()
                };
            }
            dispatch.notifying = true;
        }

        let mut report = self.dispatch(event);
        loop {
            let next = {
                let mut dispatch = lock(&self.dispatch);
                match dispatch.pending.pop_front() {
                    Some(next) => next,
                    None => {
                        dispatch.notifying = false;
                        break;
                    }
                }
            };
            report.absorb(self.dispatch(&next));
        }
        report
    }

    fn dispatch(&self, event: &Notification) -> NotifyReport {
        // Snapshot so callbacks may subscribe, unsubscribe or notify.
        let entries: Vec<Arc<Entry>> = lock(&self.registry).entries.clone();
        let mut report = NotifyReport {
            visited: entries.len(),
            ..NotifyReport::default()
        };

        for (index, entry) in entries.iter().enumerate() {
            if !entry.should_wake(event) {
                continue;
            }
            report.woken += 1;
            if let Err(payload) = catch_unwind(AssertUnwindSafe(|| (entry.wake)())) {
                let fault = SubscriberFault::from_panic(index, payload.as_ref());
                tracing::warn!(
                    index,
                    id = entry.id,
                    selector = %entry.selector,
                    message = %fault.message,
                    "subscriber panicked during notify"
                );
                report.faults.push(fault);
            }
        }

        tracing::trace!(
            selector = %event.selector,
            force = event.settings.do_force_update,
            visited = report.visited,
            woken = report.woken,
            "notify"
        );
        report
    }
}

impl Clone for StoreCore {
    fn clone(&self) -> Self {
        Self {
            graph: Arc::clone(&self.graph),
            version: Arc::clone(&self.version),
            registry: Arc::clone(&self.registry),
            dispatch: Arc::clone(&self.dispatch),
            config: self.config,
        }
    }
}

impl fmt::Debug for StoreCore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StoreCore")
            .field("version", &self.version())
            .field("subscriber_count", &self.subscriber_count())
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

/// RAII guard for a registry entry.
///
/// Dropping it removes the entry. A notify already in progress still
/// finishes with the registry snapshot it took.
pub struct Subscription {
    id: u64,
    registry: Weak<Mutex<Registry>>,
}

impl Subscription {
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Remove the entry now. Same as dropping the guard.
    pub fn unsubscribe(self) {}
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(registry) = self.registry.upgrade() {
            let mut registry = lock(&registry);
            registry.entries.retain(|entry| entry.id != self.id);
            tracing::trace!(id = self.id, "unsubscribe");
        }
    }
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("id", &self.id)
            .finish_non_exhaustive()
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
