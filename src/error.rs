//! Error types for store operations.

use thiserror::Error;

pub type Result<T> = std::result::Result<T, StoreError>;

/// Errors surfaced synchronously to the caller of a store operation.
///
/// Subscriber panics are not errors of the writer; they are collected as
/// [`SubscriberFault`] values in the [`NotifyReport`](crate::store::NotifyReport).
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("store accessed outside of any provider scope")]
    ScopeMissing,

    #[error("cannot write `{selector}`: segment `{segment}` holds {found}, not an object")]
    PathConflict {
        selector: String,
        segment: String,
        found: &'static str,
    },

    #[error("invalid selector `{input}`: {reason}")]
    InvalidSelector { input: String, reason: String },

    #[error("write to `{selector}` rejected: store not initialized yet")]
    Uninitialized { selector: String },

    #[error("invalid settings: {0}")]
    InvalidSettings(#[source] serde_json::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl StoreError {
    #[must_use]
    pub fn invalid_selector(input: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidSelector {
            input: input.into(),
            reason: reason.into(),
        }
    }
}

/// A wake callback that panicked during `notify`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubscriberFault {
    /// Position of the subscriber in the registry snapshot.
    pub index: usize,
    pub message: String,
}

impl SubscriberFault {
    pub(crate) fn from_panic(index: usize, payload: &(dyn std::any::Any + Send)) -> Self {
        let message = if let Some(s) = payload.downcast_ref::<&str>() {
            (*s).to_string()
        } else if let Some(s) = payload.downcast_ref::<String>() {
            s.clone()
        } else {
            "non-string panic payload".to_string()
        };
        Self { index, message }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn path_conflict_message() {
        let err = StoreError::PathConflict {
            selector: "a.b.c".to_string(),
            segment: "b".to_string(),
            found: "a number",
        };
        assert_eq!(
            err.to_string(),
            "cannot write `a.b.c`: segment `b` holds a number, not an object"
        );
    }

    #[test]
    fn fault_from_string_payload() {
        let payload: Box<dyn std::any::Any + Send> = Box::new(String::from("boom"));
        let fault = SubscriberFault::from_panic(3, payload.as_ref());
        assert_eq!(fault.index, 3);
        assert_eq!(fault.message, "boom");
    }
}
