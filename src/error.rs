//! Typed errors for the storage layer.
//!
//! Producer-path errors propagate to the caller; background-worker errors
//! are logged and swallowed; a store that cannot be opened on the global
//! init path terminates the process.

use std::fmt;

/// Errors surfaced by the shared event store and the queues built on it.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum StoreError {
    /// A storage operation failed. Retrying at the same position is safe;
    /// `read` does not advance its counter when it surfaces one of these.
    #[error("transient storage error during {op}: {message}")]
    Transient { op: &'static str, message: String },

    /// A key the queue's bookkeeping says must exist was not found.
    #[error("expected {expected}, found nothing")]
    KeyNotFound { expected: String },

    /// The backing store could not be opened or created.
    #[error("event store unavailable: {0}")]
    Fatal(String),
}

impl StoreError {
    pub(crate) fn transient(op: &'static str, err: impl fmt::Display) -> Self {
        Self::Transient {
            op,
            message: err.to_string(),
        }
    }

    pub(crate) fn fatal(err: impl fmt::Display) -> Self {
        Self::Fatal(err.to_string())
    }
}
