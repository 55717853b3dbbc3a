//! Normalized snapshots — the id-independent, order-stable comparison shape.
//!
//! Both representations export into the same shape before any diffing:
//! pages sorted by title (map iteration order must not leak into results),
//! items in sibling order, nothing but text and structure. The shape is
//! JSON-serializable and deterministic, so it doubles as the persisted
//! export format.

use rinkaku_outline::OutlineManager;
use rinkaku_project::{DocumentProvider, ProjectManager};
use rinkaku_types::ItemRecord;
use serde::{Deserialize, Serialize};

use crate::legacy::{LegacyItem, LegacyProject};

/// Id-independent snapshot of one whole project.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NormalizedSnapshot {
    pub project_title: String,
    pub pages: Vec<NormalizedPage>,
}

/// One page: title plus content items (the title node itself is excluded).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NormalizedPage {
    pub title: String,
    pub items: Vec<NormalizedItem>,
}

/// One item: text plus nested children.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NormalizedItem {
    pub text: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<NormalizedItem>,
}

impl NormalizedSnapshot {
    /// Export from a legacy snapshot: top-level items are pages, their
    /// children the content.
    pub fn from_legacy(project: &LegacyProject) -> Self {
        let mut pages: Vec<NormalizedPage> = project
            .items
            .iter()
            .map(|page| NormalizedPage {
                title: page.text.clone(),
                items: page.items.iter().map(normalize_legacy_item).collect(),
            })
            .collect();
        pages.sort_by(|a, b| a.title.cmp(&b.title));
        Self {
            project_title: project.title.clone(),
            pages,
        }
    }

    /// Export from the CRDT-backed project store. Pages are the non-deleted
    /// index entries; per-page content follows the title-node convention
    /// (children of the title node, else non-title root siblings).
    pub async fn from_project<P: DocumentProvider>(
        manager: &ProjectManager<P>,
    ) -> rinkaku_project::Result<Self> {
        let project_title = manager.get_project_title().unwrap_or_default();
        let mut pages = Vec::new();
        for page in manager.get_pages() {
            let outline = manager.connect_to_page(&page.id).await?;
            let items = page_content_items(&outline, &page.title)
                .into_iter()
                .map(|item| normalize_tree_item(&outline, item))
                .collect();
            pages.push(NormalizedPage {
                title: page.title,
                items,
            });
        }
        pages.sort_by(|a, b| a.title.cmp(&b.title));
        Ok(Self {
            project_title,
            pages,
        })
    }
}

fn normalize_legacy_item(item: &LegacyItem) -> NormalizedItem {
    NormalizedItem {
        text: item.text.clone(),
        children: item.items.iter().map(normalize_legacy_item).collect(),
    }
}

fn normalize_tree_item(outline: &OutlineManager, item: ItemRecord) -> NormalizedItem {
    let children = outline
        .get_children(&item.id)
        .into_iter()
        .map(|child| normalize_tree_item(outline, child))
        .collect();
    NormalizedItem {
        text: item.text,
        children,
    }
}

/// The comparable content of a page: children of the title node when it has
/// any, else the non-title root siblings, else every root item when no title
/// node exists at all.
pub(crate) fn page_content_items(outline: &OutlineManager, page_title: &str) -> Vec<ItemRecord> {
    let roots = outline.get_root_items();
    match roots.iter().find(|item| item.text == page_title) {
        Some(title_node) => {
            let children = outline.get_children(&title_node.id);
            if !children.is_empty() {
                children
            } else {
                let title_id = title_node.id.clone();
                roots.into_iter().filter(|item| item.id != title_id).collect()
            }
        }
        None => roots,
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn legacy_fixture() -> LegacyProject {
        LegacyProject {
            id: "proj".into(),
            title: "Demo".into(),
            items: vec![
                LegacyItem {
                    text: "Zebra".into(),
                    id: "p2".into(),
                    items: vec![LegacyItem::new("i3", "only")],
                    ..Default::default()
                },
                LegacyItem {
                    text: "Alpha".into(),
                    id: "p1".into(),
                    items: vec![
                        LegacyItem::new("i1", "first"),
                        LegacyItem {
                            id: "i2".into(),
                            text: "second".into(),
                            items: vec![LegacyItem::new("i2a", "nested")],
                            ..Default::default()
                        },
                    ],
                    ..Default::default()
                },
            ],
        }
    }

    #[test]
    fn test_legacy_normalization_sorts_pages_by_title() {
        let snapshot = NormalizedSnapshot::from_legacy(&legacy_fixture());
        let titles: Vec<&str> = snapshot.pages.iter().map(|p| p.title.as_str()).collect();
        assert_eq!(titles, vec!["Alpha", "Zebra"]);
        assert_eq!(snapshot.pages[0].items[1].children[0].text, "nested");
    }

    #[test]
    fn test_snapshot_json_is_id_free_and_camel_case() {
        let snapshot = NormalizedSnapshot::from_legacy(&legacy_fixture());
        let json = serde_json::to_string(&snapshot).unwrap();
        assert!(json.contains("projectTitle"));
        assert!(!json.contains("\"id\""));
        // Leaf items serialize without an empty children array.
        assert!(json.contains(r#"{"text":"first"}"#));
    }

    #[test]
    fn test_snapshot_roundtrip() {
        let snapshot = NormalizedSnapshot::from_legacy(&legacy_fixture());
        let json = serde_json::to_string(&snapshot).unwrap();
        let parsed: NormalizedSnapshot = serde_json::from_str(&json).unwrap();
        assert_eq!(snapshot, parsed);
    }
}
