//! Page and project metadata records.

use serde::{Deserialize, Serialize};

/// Metadata for one page, stored in the project-level index map.
///
/// Entries are never physically removed — `deleted` is a soft-delete flag so
/// the index map itself stays merge-stable across replicas.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageMetadata {
    pub id: String,
    pub title: String,
    pub created_at: u64,
    pub last_modified: u64,
    /// Display position among the project's pages.
    pub order: i64,
    pub author: String,
    #[serde(default)]
    pub deleted: bool,
}

impl PageMetadata {
    pub fn new(
        id: impl Into<String>,
        title: impl Into<String>,
        author: impl Into<String>,
        order: i64,
    ) -> Self {
        let now = crate::now_millis();
        Self {
            id: id.into(),
            title: title.into(),
            created_at: now,
            last_modified: now,
            order,
            author: author.into(),
            deleted: false,
        }
    }
}

/// Singleton project metadata, created on first connection.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectMetadata {
    pub id: String,
    pub title: String,
    pub created_at: u64,
    pub last_modified: u64,
    pub author: String,
}

impl ProjectMetadata {
    pub fn new(id: impl Into<String>, title: impl Into<String>, author: impl Into<String>) -> Self {
        let now = crate::now_millis();
        Self {
            id: id.into(),
            title: title.into(),
            created_at: now,
            last_modified: now,
            author: author.into(),
        }
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_page_metadata_defaults() {
        let page = PageMetadata::new("p1", "Notes", "amy", 0);
        assert!(!page.deleted);
        assert_eq!(page.order, 0);
        assert_eq!(page.created_at, page.last_modified);
    }

    #[test]
    fn test_page_metadata_serde_shape() {
        let page = PageMetadata::new("p1", "Notes", "amy", 3);
        let json = serde_json::to_value(&page).unwrap();
        assert_eq!(json["createdAt"], json["lastModified"]);
        assert_eq!(json["order"], 3);
    }

    #[test]
    fn test_deleted_flag_optional_on_read() {
        let json = r#"{"id":"p","title":"T","createdAt":1,"lastModified":1,"order":0,"author":"a"}"#;
        let parsed: PageMetadata = serde_json::from_str(json).unwrap();
        assert!(!parsed.deleted);
    }
}
