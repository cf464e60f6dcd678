//! Error types for store operations.

use thiserror::Error;

use crate::{container::ContainerKind, store::StoreId};

/// Errors that can occur while reading, tracking or mutating a store.
///
/// None of these are retried internally. They propagate unmodified to the
/// caller of the read, the write or the tracked evaluation.
#[non_exhaustive]
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    /// A container operation was asked to work on a scalar value.
    #[error("expected a record, sequence, map or set, found {found}")]
    UnsupportedContainerKind {
        /// Name of the kind of value that was found
        found: &'static str,
    },

    /// A tracked evaluation read from a store other than the one its session
    /// is bound to, or bypassed its tracked root.
    #[error("read from store {found} inside a tracked evaluation bound to store {bound}")]
    CrossStoreReadViolation {
        /// The store the innermost open session is bound to
        bound: StoreId,
        /// The store the read went to
        found: StoreId,
    },

    /// The key can't address an entry of this container kind.
    #[error("key `{key}` cannot address an entry of a {kind}")]
    InvalidKey {
        /// Kind of the container
        kind: ContainerKind,
        /// The offending key, rendered as in a path
        key: String,
    },

    /// Whole-store replacement with a snapshot of a different kind.
    #[error("cannot replace the contents of a {expected} with a {found}")]
    KindMismatch {
        /// Kind of the container being replaced
        expected: ContainerKind,
        /// Kind of the snapshot
        found: ContainerKind,
    },

    /// A single-entry write addressed the root itself.
    #[error("cannot set or remove the store root; use `replace` to swap the whole tree")]
    RootPath,

    /// A tracked evaluation was ended while a nested one was still open.
    #[error("tracked evaluation ended before the evaluations nested inside it")]
    UnbalancedSession,

    /// The store was disposed.
    #[error("store {0} has been disposed")]
    Disposed(StoreId),
}

impl StoreError {
    pub fn is_cross_store_read(&self) -> bool {
        matches!(self, StoreError::CrossStoreReadViolation { .. })
    }

    pub fn is_unsupported_kind(&self) -> bool {
        matches!(self, StoreError::UnsupportedContainerKind { .. })
    }
}

pub type Result<T, E = StoreError> = std::result::Result<T, E>;
