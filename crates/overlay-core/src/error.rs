//! Error types for the overlay network

use thiserror::Error;

use crate::vaddr::{ContextId, GraphId};

/// Top-level error type for overlay operations
#[derive(Debug, Error)]
pub enum OverlayError {
    /// A lookup of a vertex or host was not present in the directory.
    /// Indicates a programming error: an unannounced graph, or a mapping
    /// mismatch. Fatal to the caller.
    #[error("directory miss in graph {graph:?}: {what}")]
    DirectoryMiss { graph: GraphId, what: String },

    /// An operation referenced a context of which this peer is not a member.
    #[error("context mismatch: not a member of context {0:?}")]
    ContextMismatch(ContextId),

    /// The substrate detected a desynchronized collective (tag or size mismatch).
    #[error("collective desync: {0}")]
    CollectiveDesync(String),

    /// Transport, serialization, or resource errors from the policy layer.
    #[error("substrate failure: {0}")]
    SubstrateFailure(String),

    /// Rejected at construction time.
    #[error("invalid configuration: {0}")]
    ConfigInvalid(String),
}

/// Result type alias for overlay operations
pub type Result<T> = std::result::Result<T, OverlayError>;
