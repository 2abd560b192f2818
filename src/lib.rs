//! # Pathcan
//!
//! A selector-addressed state store with fine-grained change notification.
//!
//! Observers read slices of one shared data graph by dotted selector
//! (`"settings.theme.accent"`) and are woken only when a write touches
//! that slice, one of its ancestors, or one of its descendants.
//!
//! ## Graph (Low-level)
//!
//! - `Value` - Dynamic tree with reference-counted compound nodes
//! - `Selector` - Parsed dotted path
//! - `graph::path` - Read and write at a selector with structural sharing
//!
//! ## Store
//!
//! - `StoreCore` - Graph plus subscriber registry: get/set/subscribe/notify
//! - `Store` - Per-consumer facade: `get_store_data`, `set_store_data`,
//!   `update_with_selector`
//!
//! ## Runtime
//!
//! - `StoreProvider` - One store per scope, reached through `use_store`
//! - `Observer` - A consumer subscribed for as long as it lives

pub mod error;
pub mod graph;
pub mod runtime;
pub mod store;

// Re-export main types for convenience
pub use error::{Result, StoreError, SubscriberFault};
pub use graph::{PathConflictPolicy, Selector, Value};
pub use runtime::{use_store, Observer, StoreProvider};
pub use store::{
    Notification, NotifyOrder, NotifyReport, Settings, Store, StoreConfig, StoreCore,
    Subscription, WriteOptions,
};
