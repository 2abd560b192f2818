use std::cell::RefCell;

use crate::error::{Result, StoreError};
use crate::graph::Value;
use crate::store::{Notification, NotifyReport, Store, StoreConfig, StoreCore};

// Thread-local stack of active provider scopes; the innermost is last.
thread_local! {
    static SCOPE_STACK: RefCell<Vec<Store>> = const { RefCell::new(Vec::new()) };
}

/// Owns one store and makes it reachable from code running inside its
/// scope.
///
/// Each provider has its own graph and registry. Scopes nest: inside
/// [`StoreProvider::scope`], [`use_store`] resolves to the innermost
/// provider, and an outer provider's store is not visible.
///
/// A provider starts uninitialized. The first [`activate`](Self::activate)
/// fires one forced notify so every observer subscribed so far renders at
/// least once more; later calls do nothing.
///
/// # Examples
///
/// ```
/// use pathcan::{use_store, StoreProvider, Value};
///
/// let provider = StoreProvider::new(Value::from(serde_json::json!({"title": "hi"})));
/// let title = provider.scope(|| {
///     use_store().map(|store| store.core().get().get("title").cloned())
/// });
/// assert_eq!(title.unwrap(), Some(Value::from("hi")));
///
/// // Outside any scope the store cannot be reached.
/// assert!(use_store().is_err());
/// ```
#[derive(Debug)]
pub struct StoreProvider {
    store: Store,
}

impl StoreProvider {
    /// Create a provider owning `initial` with the default configuration.
    pub fn new(initial: Value) -> Self {
        Self::with_config(initial, StoreConfig::default())
    }

    /// Create a provider with an empty object graph.
    pub fn empty() -> Self {
        Self::new(Value::object())
    }

    pub fn with_config(initial: Value, config: StoreConfig) -> Self {
        Self {
            store: Store::new(StoreCore::with_config(initial, config)),
        }
    }

    /// A facade handle to this provider's store.
    pub fn store(&self) -> Store {
        self.store.clone()
    }

    pub fn is_initialized(&self) -> bool {
        self.store.is_initialized()
    }

    /// Run `f` with this provider as the innermost scope.
    ///
    /// The scope is popped even if `f` panics.
    pub fn scope<F, R>(&self, f: F) -> R
    where
        F: FnOnce() -> R,
    {
        SCOPE_STACK.with(|stack| {
            stack.borrow_mut().push(self.store.clone());
        });

        let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(f));

        SCOPE_STACK.with(|stack| {
            stack.borrow_mut().pop();
        });

        match result {
            Ok(r) => r,
            Err(e) => std::panic::resume_unwind(e),
        }
    }

    /// Move from uninitialized to initialized, waking every subscriber
    /// once. Returns the report of that notify, or `None` if the provider
    /// was already initialized.
    pub fn activate(&self) -> Option<NotifyReport> {
        if !self.store.mark_initialized() {
            return None;
        }
        let report = self.store.core().notify(&Notification::forced());
        tracing::debug!(
            woken = report.woken,
            faults = report.faults.len(),
            "store provider initialized"
        );
        Some(report)
    }

    /// Run `f` inside the scope, then activate.
    ///
    /// Observers rendered by `f` subscribe first and are all woken by the
    /// activation notify.
    pub fn mount<F, R>(&self, f: F) -> R
    where
        F: FnOnce() -> R,
    {
        let result = self.scope(f);
        self.activate();
        result
    }
}

impl Default for StoreProvider {
    fn default() -> Self {
        Self::empty()
    }
}

/// The store of the innermost enclosing provider scope.
///
/// Fails with [`StoreError::ScopeMissing`] when no provider scope is active
/// on this thread.
pub fn use_store() -> Result<Store> {
    SCOPE_STACK
        .with(|stack| stack.borrow().last().cloned())
        .ok_or(StoreError::ScopeMissing)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{Settings, WriteOptions};
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    #[test]
    fn use_store_outside_scope_fails() {
        assert!(matches!(use_store(), Err(StoreError::ScopeMissing)));
    }

    #[test]
    fn nested_scopes_are_isolated() {
        let outer = StoreProvider::new(Value::from(json!({"who": "outer"})));
        let inner = StoreProvider::new(Value::from(json!({"who": "inner"})));

        let seen = outer.scope(|| {
            let before = use_store().unwrap().get_store_data("who", Settings::default()).unwrap();
            let nested = inner.scope(|| {
                let store = use_store().unwrap();
                store.set_store_data("changed", "who", WriteOptions::default()).unwrap();
                store.get_store_data("who", Settings::default()).unwrap()
            });
            let after = use_store().unwrap().get_store_data("who", Settings::default()).unwrap();
            (before, nested, after)
        });

        assert_eq!(seen.0, Some(Value::from("outer")));
        assert_eq!(seen.1, Some(Value::from("changed")));
        assert_eq!(seen.2, Some(Value::from("outer")));
        assert!(use_store().is_err());
    }

    #[test]
    fn activate_fires_once() {
        let provider = StoreProvider::empty();
        let count = Arc::new(AtomicUsize::new(0));
        let count_clone = Arc::clone(&count);
        let _sub = provider.store().core().subscribe(
            crate::graph::Selector::parse("deep.path").unwrap(),
            Settings::default(),
            move || {
                count_clone.fetch_add(1, Ordering::SeqCst);
            },
        );

        assert!(!provider.is_initialized());
        let report = provider.activate().unwrap();
        assert_eq!(report.woken, 1);
        assert!(provider.is_initialized());
        assert!(provider.activate().is_none());
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn scope_pops_on_panic() {
        let provider = StoreProvider::empty();
        let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            provider.scope(|| panic!("child failed"))
        }));
        assert!(result.is_err());
        assert!(use_store().is_err());
    }
}
