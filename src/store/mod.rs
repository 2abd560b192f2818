//! Selector-scoped state management.
//!
//! [`StoreCore`] holds the graph and the subscriber registry; [`Store`] is
//! the per-consumer facade that reads, writes and forces refreshes by
//! selector.

mod store;
mod facade;
mod settings;

pub use self::store::{NotifyReport, StoreCore, Subscription};
pub use facade::Store;
pub use settings::{Notification, NotifyOrder, Settings, StoreConfig, WriteOptions};
