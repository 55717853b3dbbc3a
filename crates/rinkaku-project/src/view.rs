//! Read-only aggregate views.

use rinkaku_types::{ItemRecord, PageMetadata, ProjectMetadata};
use serde::Serialize;

/// Project overview: metadata plus one summary entry per page.
///
/// Deliberately NOT the recursive content tree — content is resolved
/// per page through [`crate::ProjectManager::get_page_item`].
#[derive(Clone, Debug, Serialize)]
pub struct ProjectView {
    pub metadata: ProjectMetadata,
    pub pages: Vec<PageSummary>,
}

/// One page, summarized for project-level listings.
#[derive(Clone, Debug, Serialize)]
pub struct PageSummary {
    pub id: String,
    pub title: String,
    pub author: String,
    pub created: u64,
    pub last_changed: u64,
}

impl From<PageMetadata> for PageSummary {
    fn from(meta: PageMetadata) -> Self {
        Self {
            id: meta.id,
            title: meta.title,
            author: meta.author,
            created: meta.created_at,
            last_changed: meta.last_modified,
        }
    }
}

/// One page resolved to content depth one: the title node followed by its
/// direct children, in convergent order.
#[derive(Clone, Debug, Serialize)]
pub struct PageView {
    pub metadata: PageMetadata,
    pub items: Vec<ItemRecord>,
}
