//! Legacy tree source — the read interface of the store being migrated off.
//!
//! The legacy client itself is a black box; these are the explicit record
//! types its snapshot export yields. Top-level items are pages; a page
//! item's children are that page's content.

use serde::{Deserialize, Serialize};

/// Snapshot of a legacy project.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LegacyProject {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub items: Vec<LegacyItem>,
}

/// One legacy tree item, recursively.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LegacyItem {
    pub id: String,
    pub text: String,
    #[serde(default)]
    pub author: Option<String>,
    #[serde(default)]
    pub created: Option<u64>,
    #[serde(default)]
    pub last_changed: Option<u64>,
    #[serde(default)]
    pub items: Vec<LegacyItem>,
}

impl LegacyItem {
    /// Convenience constructor for fixtures and adapters.
    pub fn new(id: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            text: text.into(),
            ..Default::default()
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
