//! The data graph and the selectors that address it.
//!
//! - [`Value`]: a dynamic tree with reference-counted compound nodes
//! - [`Selector`]: a parsed dotted path
//! - [`path`]: read/write at a selector with structural sharing

pub mod path;
mod selector;
mod value;

pub use path::PathConflictPolicy;
pub use selector::Selector;
pub use value::{Map, Number, Value};
