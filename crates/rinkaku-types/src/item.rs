//! Outline item records — the payload stored per tree node.

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// One outline item: a line of text plus authorship and annotations.
///
/// This is the `value` payload the outline layer stores in the replicated
/// map. The whole record is replaced on write (last-writer-wins at the
/// record level), so every mutation goes through read-modify-write and
/// restamps `last_changed`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ItemRecord {
    /// Stable item id — identical to the node key in the tree map.
    pub id: String,
    /// Visible text of the item.
    pub text: String,
    /// Author identifier (from the identity provider, or caller-supplied).
    pub author: String,
    /// Creation time, Unix millis.
    pub created: u64,
    /// Last mutation time, Unix millis.
    pub last_changed: u64,
    /// Threaded comments on this item.
    #[serde(default)]
    pub comments: Vec<Comment>,
    /// Up/down votes on this item.
    #[serde(default)]
    pub votes: Vec<Vote>,
}

impl ItemRecord {
    /// Create a fresh record with empty annotations, stamped `now`.
    pub fn new(id: impl Into<String>, text: impl Into<String>, author: impl Into<String>) -> Self {
        let now = crate::now_millis();
        Self {
            id: id.into(),
            text: text.into(),
            author: author.into(),
            created: now,
            last_changed: now,
            comments: Vec::new(),
            votes: Vec::new(),
        }
    }
}

/// A comment attached to an outline item.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Comment {
    pub id: String,
    pub text: String,
    pub author: String,
    pub created: u64,
    pub last_changed: u64,
}

impl Comment {
    pub fn new(text: impl Into<String>, author: impl Into<String>) -> Self {
        let now = crate::now_millis();
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            text: text.into(),
            author: author.into(),
            created: now,
            last_changed: now,
        }
    }
}

/// A vote attached to an outline item.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Vote {
    pub id: String,
    pub author: String,
    pub created: u64,
    #[serde(rename = "type")]
    pub kind: VoteKind,
}

impl Vote {
    pub fn new(author: impl Into<String>, kind: VoteKind) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            author: author.into(),
            created: crate::now_millis(),
            kind,
        }
    }
}

/// Vote direction. Serializes as `"up"` / `"down"`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, Display, EnumString)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum VoteKind {
    Up,
    Down,
}

/// Partial update applied to an [`ItemRecord`] via read-modify-write.
///
/// Only the populated fields change; `last_changed` is restamped regardless.
#[derive(Clone, Debug, Default)]
pub struct ItemPatch {
    pub text: Option<String>,
    pub comments: Option<Vec<Comment>>,
    pub votes: Option<Vec<Vote>>,
}

impl ItemPatch {
    /// Apply this patch to a record, restamping `last_changed`.
    pub fn apply(self, record: &mut ItemRecord) {
        if let Some(text) = self.text {
            record.text = text;
        }
        if let Some(comments) = self.comments {
            record.comments = comments;
        }
        if let Some(votes) = self.votes {
            record.votes = votes;
        }
        record.last_changed = crate::now_millis();
    }
}

// ============================================================================
// Tests
// ============================================================================
