use serde::de::DeserializeOwned;
use serde::Serialize;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use super::store::{NotifyReport, StoreCore};
use super::settings::{Notification, Settings, WriteOptions};
use crate::error::{Result, StoreError};
use crate::graph::{path, Selector, Value};
use crate::runtime::bridge;

/// Per-consumer view of a scoped store.
///
/// Obtained through [`use_store`](crate::runtime::use_store) inside a
/// provider scope, or from [`StoreProvider::store`](crate::runtime::StoreProvider::store).
/// Selectors are dotted strings; the empty string addresses the whole graph.
///
/// # Examples
///
/// ```
/// use pathcan::{Settings, StoreProvider, Value, WriteOptions};
///
/// let provider = StoreProvider::new(Value::from(serde_json::json!({"a": {"b": 1}})));
/// provider.activate();
/// let store = provider.store();
///
/// store.set_store_data(2, "a.b", WriteOptions::default()).unwrap();
/// let value = store.get_store_data("a.b", Settings::default()).unwrap();
/// assert_eq!(value, Some(Value::from(2)));
/// ```
#[derive(Clone, Debug)]
pub struct Store {
    core: StoreCore,
    initialized: Arc<AtomicBool>,
}

impl Store {
    pub(crate) fn new(core: StoreCore) -> Self {
        Self {
            core,
            initialized: Arc::new(AtomicBool::new(false)),
        }
    }

    /// The underlying core, for direct get/set/subscribe/notify.
    pub fn core(&self) -> &StoreCore {
        &self.core
    }

    /// True once the owning provider fired its initial forced notify.
    pub fn is_initialized(&self) -> bool {
        self.initialized.load(Ordering::SeqCst)
    }

    /// Returns `true` only for the call that performed the transition.
    pub(crate) fn mark_initialized(&self) -> bool {
        !self.initialized.swap(true, Ordering::SeqCst)
    }

    /// Current value at `selector`, subscribing the rendering observer.
    ///
    /// When called while an [`Observer`](crate::runtime::Observer) renders,
    /// the observer is subscribed to `selector` until it is dropped and is
    /// woken by every intersecting change. Outside a render this is a
    /// plain read.
    ///
    /// `None` means some segment of the path does not exist.
    pub fn get_store_data(&self, selector: &str, settings: Settings) -> Result<Option<Value>> {
        let selector = Selector::parse(selector)?;
        let key = slot_key(&selector, settings);
        let core = &self.core;
        Ok(bridge::subscribe_snapshot(
            &key,
            |wake| core.subscribe(selector.clone(), settings, move || wake()),
            || core.read(&selector),
        ))
    }

    /// Like [`get_store_data`](Self::get_store_data), deserialized into `T`.
    pub fn get_as<T: DeserializeOwned>(&self, selector: &str, settings: Settings) -> Result<Option<T>> {
        self.get_store_data(selector, settings)?
            .map(|value| value.deserialize_into())
            .transpose()
    }

    /// Write `value` at `selector` and, unless suppressed, notify.
    pub fn set_store_data(
        &self,
        value: impl Into<Value>,
        selector: &str,
        options: WriteOptions,
    ) -> Result<()> {
        let value = value.into();
        self.commit(selector, options, move |_| value)
    }

    /// Functional form of [`set_store_data`](Self::set_store_data): the
    /// updater receives the previous value at `selector`.
    pub fn update_store_data<F>(&self, updater: F, selector: &str, options: WriteOptions) -> Result<()>
    where
        F: FnOnce(Option<&Value>) -> Value,
    {
        self.commit(selector, options, updater)
    }

    /// Serialize `value` and write it at `selector`.
    pub fn set_serialized<T: Serialize + ?Sized>(
        &self,
        value: &T,
        selector: &str,
        options: WriteOptions,
    ) -> Result<()> {
        let value = Value::from_serialize(value)?;
        self.commit(selector, options, move |_| value)
    }

    /// Wake every subscriber intersecting `selector` without changing data.
    pub fn update_with_selector(&self, selector: &str) -> Result<NotifyReport> {
        let selector = Selector::parse(selector)?;
        Ok(self.core.notify(&Notification::at(selector)))
    }

    fn commit<F>(&self, selector: &str, options: WriteOptions, produce: F) -> Result<()>
    where
        F: FnOnce(Option<&Value>) -> Value,
    {
        let selector = Selector::parse(selector)?;
        let config = *self.core.config();

        if config.guard_writes_before_init && !selector.is_root() && !self.is_initialized() {
            tracing::warn!(selector = %selector, "write rejected before store initialization");
            return Err(StoreError::Uninitialized {
                selector: selector.to_string(),
            });
        }

        let graph = self.core.get();
        let value = produce(path::read(&graph, &selector));
        let next = path::write(&graph, value, &selector, config.path_conflict)?;
        self.core.set(next);

        if options.notify_observers {
            self.core.notify(&Notification::at(selector));
        }
        Ok(())
    }
}

fn slot_key(selector: &Selector, settings: Settings) -> String {
    format!("{selector}|{}", settings.do_force_update)
}
