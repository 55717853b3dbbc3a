//! Error types for aggregate operations.

use thiserror::Error;

/// Errors surfaced by the project/page aggregate.
///
/// Connection-class failures are usually reported as `None` returns plus a
/// logged warning (absence, not exception, is the primary failure signal);
/// these variants cover the cases a caller explicitly asked for.
#[derive(Error, Debug)]
pub enum ProjectError {
    /// Operation requires `connect()` first.
    #[error("project not connected: {0}")]
    NotConnected(String),

    /// The document provider failed to open a document.
    #[error("provider error for room {room}: {message}")]
    Provider { room: String, message: String },

    /// Underlying outline operation failed.
    #[error(transparent)]
    Outline(#[from] rinkaku_outline::OutlineError),

    /// Underlying tree operation failed.
    #[error(transparent)]
    Tree(#[from] rinkaku_tree::TreeError),

    /// Metadata payload could not be encoded or decoded.
    #[error("metadata serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}
