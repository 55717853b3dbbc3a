//! Ordered-tree CRDT for rinkaku.
//!
//! Stores a forest of nodes inside one replicated (Yjs-family) map and keeps
//! a total order among siblings that converges identically on every replica
//! regardless of operation interleaving. Tree-shaped operations — insert,
//! move, reparent, delete-with-descendants, reorder — are all realized as
//! last-writer-wins writes against that single map, so the map's own merge
//! semantics are the only cross-replica ordering mechanism.
//!
//! # CRDT Semantics
//!
//! - **Node entries**: per-node nested map, LWW per field (`parent`, `value`)
//! - **Sibling order**: one successor pointer per anchor (`order:<anchor>`),
//!   LWW on the pointer entry; a deterministic key-order fallback positions
//!   any node whose pointer chain cannot be resolved
//! - **Deletes**: plain map removals; delete-wins against concurrent field
//!   writes is not required because sorting and reads ignore absent nodes

mod error;
mod tree;

pub use error::TreeError;
pub use tree::{OrderedTree, ROOT_KEY};

/// Result type for tree operations.
pub type Result<T> = std::result::Result<T, TreeError>;
