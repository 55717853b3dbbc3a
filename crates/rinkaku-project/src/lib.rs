//! Project/page aggregate for rinkaku.
//!
//! Owns one project-level replicated document (metadata + page index) and N
//! lazily-connected per-page documents, each wrapping one outline. The
//! transport behind those documents is abstracted as a [`DocumentProvider`];
//! the in-process [`MemoryProvider`] backs tests and offline use.
//!
//! # Document Structure
//!
//! ```text
//! project document
//! ├── metadata (Map)                # "metadata" -> ProjectMetadata JSON
//! └── pagesIndex (Map)              # <page id> -> PageMetadata JSON
//!
//! page document (one per page)
//! └── outline (Map)                 # tree CRDT, see rinkaku-tree
//! ```
//!
//! Page index entries are soft-deleted (flag, never removed) so the index
//! map stays merge-stable; page content documents are left untouched by a
//! delete and simply become unreachable through the index.

mod error;
mod manager;
mod provider;
mod view;

pub use error::ProjectError;
pub use manager::{METADATA_MAP, PAGES_INDEX_MAP, ProjectManager};
pub use provider::{
    ConnectionStatus, DocumentHandle, DocumentProvider, MemoryProvider, page_room, project_room,
};
pub use view::{PageSummary, PageView, ProjectView};

/// Result type for aggregate operations.
pub type Result<T> = std::result::Result<T, ProjectError>;
