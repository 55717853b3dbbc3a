//! Outline domain layer for rinkaku.
//!
//! Translates user-facing outline edits (insert after, indent, outdent, move
//! up/down, annotate) into primitive tree CRDT calls, and fans local change
//! notifications out to registered listeners. One [`OutlineManager`] wraps
//! one tree map inside one replicated document — the project aggregate owns
//! one per connected page.

mod error;
mod manager;

pub use error::OutlineError;
pub use manager::{ListenerId, OutlineManager, OUTLINE_MAP};

/// Result type for outline operations.
pub type Result<T> = std::result::Result<T, OutlineError>;
