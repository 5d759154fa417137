//! Error types for transition-log persistence backends.

use thiserror::Error;

/// Errors a [`crate::TransitionStore`] backend may return.
///
/// Mirrors the shape of `langgraph_checkpoint::error::CheckpointError` in the
/// teacher crate: a small, closed set of backend-facing failure modes plus a
/// `Backend` catch-all for implementations wrapping their own storage error.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The referenced dialog has no entries yet.
    #[error("no transitions recorded for dialog '{0}'")]
    NotFound(String),

    /// Two entries for the same dialog were appended with an identical
    /// `when` timestamp, violating the total-order requirement of spec §5.
    #[error("duplicate transition timestamp for dialog '{0}'")]
    DuplicateTimestamp(String),

    /// Serialization of entry metadata failed.
    #[error("metadata serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Backend-specific failure (I/O, network, etc.) from a custom store.
    #[error("transition store backend error: {0}")]
    Backend(String),
}

pub type Result<T> = std::result::Result<T, StoreError>;
