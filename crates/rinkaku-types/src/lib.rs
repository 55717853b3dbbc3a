//! Shared domain records and identity types for rinkaku.
//!
//! This crate is the relational foundation: outline item records, page and
//! project metadata, and the identity provider seam. It has **no internal
//! rinkaku dependencies** — a pure leaf crate that other crates build on.
//!
//! # Entity-Relationship Overview
//!
//! ```text
//! Project (project document)
//!     └── ProjectMetadata ← singleton entry, created on first connect
//!     └── PageMetadata    ← one per page, ordered, soft-deleted
//!
//! Page (page document)
//!     └── title node      ← root-level item whose text is the page title
//!         └── ItemRecord  ← visible content, children of the title node
//!             └── Comment / Vote
//! ```
//!
//! All records serialize with camelCase field names so that documents written
//! by this core stay readable by the web client that shares them.

pub mod identity;
pub mod item;
pub mod page;

pub use identity::{IdentityProvider, StaticIdentity, UserProfile};
pub use item::{Comment, ItemPatch, ItemRecord, Vote, VoteKind};
pub use page::{PageMetadata, ProjectMetadata};

/// Current time as Unix milliseconds. Used by constructors throughout the
/// workspace to stamp `created` / `lastChanged` fields.
pub fn now_millis() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_now_millis_is_monotonic_enough() {
        let a = now_millis();
        let b = now_millis();
        assert!(b >= a);
        assert!(a > 1_600_000_000_000); // sanity: after Sep 2020
    }
}
