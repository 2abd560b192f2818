use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::{Result, StoreError};

/// A dotted path addressing a node of the data graph.
///
/// `"data3.data2.data1"` walks three object keys from the root. The empty
/// string parses to the root selector, which addresses the whole graph.
/// Segments are plain object keys; there is no array indexing.
///
/// Relations between selectors are segment-wise: `"a.b"` is a descendant
/// of `"a"`, while `"a.bc"` is not.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Selector {
    segments: Vec<String>,
}

impl Selector {
    /// Most segments a selector may have. Graph nodes nest once per
    /// segment, and dropping or comparing a node recurses through them.
    pub const MAX_DEPTH: usize = 1024;

    /// The selector addressing the whole graph.
    #[must_use]
    pub fn root() -> Self {
        Self::default()
    }

    /// Parse a dotted string. Empty segments (`"a..b"`, `".a"`, `"a."`)
    /// are rejected, as are selectors deeper than [`Selector::MAX_DEPTH`].
    pub fn parse(input: &str) -> Result<Self> {
        if input.is_empty() {
            return Ok(Self::root());
        }
        let mut segments = Vec::new();
        for part in input.split('.') {
            if part.is_empty() {
                return Err(StoreError::invalid_selector(input, "empty segment"));
            }
            if segments.len() == Self::MAX_DEPTH {
                return Err(too_deep(input));
            }
            segments.push(part.to_string());
        }
        Ok(Self { segments })
    }

    pub fn is_root(&self) -> bool {
        self.segments.is_empty()
    }

    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    /// Number of segments; zero for the root.
    pub fn depth(&self) -> usize {
        self.segments.len()
    }

    /// The enclosing selector, or `None` for the root.
    pub fn parent(&self) -> Option<Selector> {
        let (_, init) = self.segments.split_last()?;
        Some(Self {
            segments: init.to_vec(),
        })
    }

    /// Extend this selector by one key.
    pub fn child(&self, key: &str) -> Result<Selector> {
        if key.is_empty() || key.contains('.') {
            return Err(StoreError::invalid_selector(
                key,
                "child key must be a single non-empty segment",
            ));
        }
        if self.segments.len() == Self::MAX_DEPTH {
            return Err(too_deep(&format!("{self}.{key}")));
        }
        let mut segments = self.segments.clone();
        segments.push(key.to_string());
        Ok(Self { segments })
    }

    /// True if `self` equals `other` or is one of its ancestors.
    pub fn is_prefix_of(&self, other: &Selector) -> bool {
        other.segments.starts_with(&self.segments)
    }

    /// True if `self` is a strict ancestor of `other`.
    pub fn is_ancestor_of(&self, other: &Selector) -> bool {
        self.segments.len() < other.segments.len() && self.is_prefix_of(other)
    }

    /// Equal, ancestor or descendant. A change at one of the two selectors
    /// may change what the other observes.
    pub fn intersects(&self, other: &Selector) -> bool {
        self.is_prefix_of(other) || other.is_prefix_of(self)
    }
}

fn too_deep(input: &str) -> StoreError {
    // Long inputs are cut down to keep the error printable.
    let shown: String = input.chars().take(64).collect();
    StoreError::invalid_selector(
        shown,
        format!("more than {} segments", Selector::MAX_DEPTH),
    )
}

impl fmt::Display for Selector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.segments.join("."))
    }
}

impl FromStr for Selector {
    type Err = StoreError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl TryFrom<&str> for Selector {
    type Error = StoreError;

    fn try_from(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl TryFrom<String> for Selector {
    type Error = StoreError;

    fn try_from(s: String) -> Result<Self> {
        Self::parse(&s)
    }
}

impl From<Selector> for String {
    fn from(selector: Selector) -> Self {
        selector.to_string()
    }
}
