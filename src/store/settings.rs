use serde::{Deserialize, Serialize};

use crate::error::{Result, StoreError};
use crate::graph::{PathConflictPolicy, Selector};

/// Per-subscriber options.
///
/// The JSON form is `{ "doForceUpdate": true }`; any other key is rejected.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields, rename_all = "camelCase")]
pub struct Settings {
    /// Wake on every notify regardless of selector relation.
    #[serde(alias = "do_force_update")]
    pub do_force_update: bool,
}

impl Settings {
    /// Settings with `do_force_update` enabled.
    #[must_use]
    pub fn force() -> Self {
        Self {
            do_force_update: true,
        }
    }

    /// Validate a loosely-typed settings object.
    pub fn from_json_value(value: &serde_json::Value) -> Result<Self> {
        Settings::deserialize(value).map_err(StoreError::InvalidSettings)
    }
}

/// A change event handed to `StoreCore::notify`.
///
/// The root selector stands for "the whole graph" and intersects every
/// subscriber.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Notification {
    pub selector: Selector,
    pub settings: Settings,
}

impl Notification {
    /// A change to the whole graph.
    #[must_use]
    pub fn all() -> Self {
        Self::default()
    }

    /// A change at `selector`.
    #[must_use]
    pub fn at(selector: Selector) -> Self {
        Self {
            selector,
            settings: Settings::default(),
        }
    }

    /// Wake every subscriber.
    #[must_use]
    pub fn forced() -> Self {
        Self::all().with_force()
    }

    #[must_use]
    pub fn with_force(mut self) -> Self {
        self.settings.do_force_update = true;
        self
    }
}

/// Options for `Store::set_store_data`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WriteOptions {
    pub notify_observers: bool,
}

impl WriteOptions {
    /// Commit without waking anyone.
    #[must_use]
    pub fn silent() -> Self {
        Self {
            notify_observers: false,
        }
    }
}

impl Default for WriteOptions {
    fn default() -> Self {
        Self {
            notify_observers: true,
        }
    }
}

/// How a `notify` issued from inside a wake callback is scheduled.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotifyOrder {
    /// The nested notify runs to completion before the outer pass moves
    /// on to its next subscriber.
    #[default]
    DepthFirst,
    /// The nested notify is queued and drained after the outer pass.
    Queued,
}

/// Store-wide configuration.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct StoreConfig {
    pub path_conflict: PathConflictPolicy,
    pub notify_order: NotifyOrder,
    /// Reject selector writes until the provider has fired its first
    /// forced notify.
    pub guard_writes_before_init: bool,
}

impl StoreConfig {
    pub fn from_json(text: &str) -> Result<Self> {
        Ok(serde_json::from_str(text)?)
    }
}
