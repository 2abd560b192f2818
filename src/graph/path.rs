//! Reading and writing values at a selector.
//!
//! Writes never mutate the input graph. Every object on the path from the
//! root to the addressed node is rebuilt; everything else is shared with
//! the previous version by reference.

use serde::{Deserialize, Serialize};

use super::selector::Selector;
use super::value::{Map, Value};
use crate::error::{Result, StoreError};

/// What a write does when an intermediate segment holds a scalar or array.
///
/// `Null` and missing keys are never a conflict; they are replaced by an
/// empty object on the way down.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PathConflictPolicy {
    /// Abort the write with [`StoreError::PathConflict`]. The graph is
    /// left untouched.
    #[default]
    Fail,
    /// Discard the blocking value and continue with an empty object.
    Overwrite,
}

/// The node at `selector`, or `None` if any segment is absent.
pub fn read<'g>(graph: &'g Value, selector: &Selector) -> Option<&'g Value> {
    selector
        .segments()
        .iter()
        .try_fold(graph, |node, key| node.get(key))
}

/// A new graph whose node at `selector` is `value`.
pub fn write(
    graph: &Value,
    value: Value,
    selector: &Selector,
    policy: PathConflictPolicy,
) -> Result<Value> {
    let segments = selector.segments();

    // Walk down, taking a shallow copy of every object on the path.
    // Children are reference-counted, so untouched siblings stay shared.
    let mut ancestors: Vec<Map> = Vec::with_capacity(segments.len());
    let mut node = graph.clone();
    for (depth, key) in segments.iter().enumerate() {
        let mut map = match &node {
            Value::Object(map) => Map::clone(map),
            Value::Null => Map::new(),
            other => match policy {
                PathConflictPolicy::Fail => {
                    return Err(StoreError::PathConflict {
                        selector: selector.to_string(),
                        segment: segment_name(selector, depth),
                        found: other.kind(),
                    });
                }
                PathConflictPolicy::Overwrite => {
                    tracing::warn!(
                        selector = %selector,
                        segment = %segment_name(selector, depth),
                        found = other.kind(),
                        "overwriting non-object segment on write"
                    );
                    Map::new()
                }
            },
        };
        node = map.remove(key).unwrap_or_default();
        ancestors.push(map);
    }

    // Rebuild bottom-up.
    let mut child = value;
    for (mut map, key) in ancestors.into_iter().zip(segments).rev() {
        map.insert(key.clone(), child);
        child = Value::from_map(map);
    }
    Ok(child)
}

fn segment_name(selector: &Selector, depth: usize) -> String {
    if depth == 0 {
        "<root>".to_string()
    } else {
        selector.segments()[..depth].join(".")
    }
}
