//! Scope and observer plumbing around the store.
//!
//! - [`StoreProvider`]: owns one store per scope; [`use_store`] finds the
//!   innermost one
//! - [`Observer`]: a consumer whose reads subscribe it for its lifetime
//! - [`bridge`]: the subscribe-then-read adapter between the two

pub mod bridge;
mod context;
mod observer;

pub use context::{use_store, StoreProvider};
pub use observer::{Observer, Wake};
