//! Error types for tree operations.

use thiserror::Error;

/// Errors that can occur during ordered-tree operations.
///
/// Most tree operations are best-effort against possibly not-yet-synced
/// replicated state and log-and-skip instead of erroring; only operations
/// that would corrupt the forest shape (moves) or lose data (value writes to
/// missing nodes, undecodable updates) surface an error.
#[derive(Error, Debug)]
pub enum TreeError {
    /// Node key not present in the map (yet, or ever).
    #[error("node not found: {0}")]
    NodeNotFound(String),

    /// Move would make a node an ancestor of itself.
    #[error("move would create a cycle: {node} under {new_parent}")]
    WouldCycle { node: String, new_parent: String },

    /// Value payload could not be encoded or decoded.
    #[error("value serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Incoming replica update could not be decoded.
    #[error("invalid replica update: {0}")]
    InvalidUpdate(String),
}
