//! Error types for outline operations.

use thiserror::Error;

/// Errors surfaced by the outline layer.
///
/// Boundary cases (indent with no previous sibling, outdent at top level)
/// are silent no-ops, not errors; lookups on absent items return `None`.
#[derive(Error, Debug)]
pub enum OutlineError {
    /// Item not found in the tree (yet, or ever).
    #[error("item not found: {0}")]
    ItemNotFound(String),

    /// Underlying tree operation failed.
    #[error(transparent)]
    Tree(#[from] rinkaku_tree::TreeError),

    /// Item payload could not be encoded or decoded.
    #[error("item serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}
