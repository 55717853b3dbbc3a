//! Outline manager — domain operations over one tree map.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::Mutex;
use rinkaku_tree::{OrderedTree, ROOT_KEY};
use rinkaku_types::{Comment, ItemPatch, ItemRecord, Vote, VoteKind, now_millis};
use yrs::Doc;

use crate::Result;

/// Name of the tree map inside a page document.
pub const OUTLINE_MAP: &str = "outline";

/// Handle returned by [`OutlineManager::on_update`], used to unsubscribe.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

type Listener = Arc<dyn Fn() + Send + Sync>;

/// Outline operations over one tree CRDT.
///
/// Mutation methods fire the registered update listeners after the local
/// write completes; remote changes come in through
/// [`apply_remote_update`](Self::apply_remote_update), which merges and then
/// notifies the same listeners. The listener set is process-local fan-out,
/// never replicated.
pub struct OutlineManager {
    tree: OrderedTree,
    listeners: Mutex<HashMap<u64, Listener>>,
    next_listener_id: AtomicU64,
}

impl OutlineManager {
    /// Attach to the named tree map inside a replicated document.
    pub fn new(doc: &Doc, map_name: &str) -> Self {
        tracing::debug!(map_name, "outline manager attached");
        Self {
            tree: OrderedTree::new(doc, map_name),
            listeners: Mutex::new(HashMap::new()),
            next_listener_id: AtomicU64::new(1),
        }
    }

    /// The underlying tree, for callers that need primitive operations.
    pub fn tree(&self) -> &OrderedTree {
        &self.tree
    }

    /// The replicated document this outline lives in.
    pub fn doc(&self) -> &Doc {
        self.tree.doc()
    }

    // =========================================================================
    // Mutations
    // =========================================================================

    /// Insert a new item and return its id.
    ///
    /// Position: after `after_item_id` when given, otherwise after the
    /// current last sibling under the target parent. `custom_id` lets
    /// migration tooling supply a pre-assigned key.
    pub fn insert_item(
        &self,
        text: &str,
        author: &str,
        parent_id: Option<&str>,
        after_item_id: Option<&str>,
        custom_id: Option<String>,
    ) -> Result<String> {
        let item_id = custom_id.unwrap_or_else(OrderedTree::generate_node_key);
        let parent_key = parent_id.unwrap_or(ROOT_KEY);
        let record = ItemRecord::new(item_id.clone(), text, author);

        self.tree
            .create_node(parent_key, &item_id, &serde_json::to_value(&record)?)?;

        match after_item_id {
            Some(after) => self.tree.set_node_after(&item_id, after),
            None => self.tree.set_node_order_to_end(&item_id),
        }

        tracing::debug!(%item_id, parent_key, "item inserted");
        self.notify();
        Ok(item_id)
    }

    /// Make the item a child of its previous sibling. No-op when it is
    /// already the first child.
    pub fn indent_item(&self, item_id: &str) -> Result<()> {
        let Some(parent) = self.tree.get_parent(item_id) else {
            tracing::warn!(item_id, "indent_item: item not visible, skipping");
            return Ok(());
        };
        let siblings = self.tree.sorted_children(&parent);
        let Some(pos) = siblings.iter().position(|k| k == item_id) else {
            return Ok(());
        };
        if pos == 0 {
            return Ok(());
        }
        self.tree.move_to_parent(item_id, &siblings[pos - 1])?;
        self.notify();
        Ok(())
    }

    /// Move the item up to its grandparent level. No-op at top level.
    pub fn outdent_item(&self, item_id: &str) -> Result<()> {
        let Some(parent) = self.tree.get_parent(item_id) else {
            tracing::warn!(item_id, "outdent_item: item not visible, skipping");
            return Ok(());
        };
        if parent == ROOT_KEY {
            return Ok(());
        }
        let grandparent = self.tree.get_parent(&parent).unwrap_or_else(|| ROOT_KEY.to_string());
        self.tree.move_to_parent(item_id, &grandparent)?;
        self.notify();
        Ok(())
    }

    /// Swap the item with its previous sibling. No-op when already first.
    pub fn move_item_up(&self, item_id: &str) {
        let Some(parent) = self.tree.get_parent(item_id) else {
            tracing::warn!(item_id, "move_item_up: item not visible, skipping");
            return;
        };
        let siblings = self.tree.sorted_children(&parent);
        let Some(pos) = siblings.iter().position(|k| k == item_id) else {
            return;
        };
        if pos == 0 {
            return;
        }
        // The previous sibling goes after this item.
        self.tree.set_node_after(&siblings[pos - 1], item_id);
        self.notify();
    }

    /// Swap the item with its next sibling. No-op when already last.
    pub fn move_item_down(&self, item_id: &str) {
        let Some(parent) = self.tree.get_parent(item_id) else {
            tracing::warn!(item_id, "move_item_down: item not visible, skipping");
            return;
        };
        let siblings = self.tree.sorted_children(&parent);
        let Some(pos) = siblings.iter().position(|k| k == item_id) else {
            return;
        };
        if pos + 1 >= siblings.len() {
            return;
        }
        self.tree.set_node_after(item_id, &siblings[pos + 1]);
        self.notify();
    }

    /// Replace the item's text, restamping `last_changed`.
    pub fn update_item_text(&self, item_id: &str, text: &str) -> Result<()> {
        let Some(mut record) = self.get_item(item_id) else {
            tracing::warn!(item_id, "update_item_text: item not found, skipping");
            return Ok(());
        };
        record.text = text.to_string();
        record.last_changed = now_millis();
        self.write_record(&record)?;
        self.notify();
        Ok(())
    }

    /// Apply a partial update, restamping `last_changed`.
    pub fn update_item(&self, item_id: &str, patch: ItemPatch) -> Result<()> {
        let Some(mut record) = self.get_item(item_id) else {
            tracing::warn!(item_id, "update_item: item not found, skipping");
            return Ok(());
        };
        patch.apply(&mut record);
        self.write_record(&record)?;
        self.notify();
        Ok(())
    }

    /// Append a comment to the item.
    pub fn add_comment(&self, item_id: &str, text: &str, author: &str) -> Result<()> {
        let Some(mut record) = self.get_item(item_id) else {
            tracing::warn!(item_id, "add_comment: item not found, skipping");
            return Ok(());
        };
        record.comments.push(Comment::new(text, author));
        record.last_changed = now_millis();
        self.write_record(&record)?;
        self.notify();
        Ok(())
    }

    /// Record a vote on the item. A repeat vote by the same author replaces
    /// their previous one.
    pub fn add_vote(&self, item_id: &str, author: &str, kind: VoteKind) -> Result<()> {
        let Some(mut record) = self.get_item(item_id) else {
            tracing::warn!(item_id, "add_vote: item not found, skipping");
            return Ok(());
        };
        record.votes.retain(|v| v.author != author);
        record.votes.push(Vote::new(author, kind));
        record.last_changed = now_millis();
        self.write_record(&record)?;
        self.notify();
        Ok(())
    }

    /// Delete the item and its whole subtree.
    pub fn remove_item(&self, item_id: &str) {
        self.tree.delete_subtree(item_id);
        tracing::debug!(item_id, "item removed");
        self.notify();
    }

    // =========================================================================
    // Reads
    // =========================================================================

    /// Top-level items in convergent order.
    pub fn get_root_items(&self) -> Vec<ItemRecord> {
        self.get_children(ROOT_KEY)
    }

    /// Children of an item in convergent order. Items whose payload cannot
    /// be decoded are skipped with a warning.
    pub fn get_children(&self, item_id: &str) -> Vec<ItemRecord> {
        self.tree
            .sorted_children(item_id)
            .into_iter()
            .filter_map(|key| self.get_item(&key))
            .collect()
    }

    /// One item by id, or `None` when absent or undecodable.
    pub fn get_item(&self, item_id: &str) -> Option<ItemRecord> {
        let value = self.tree.get_value(item_id)?;
        match serde_json::from_value(value) {
            Ok(record) => Some(record),
            Err(e) => {
                tracing::warn!(item_id, error = %e, "item payload is not a valid record");
                None
            }
        }
    }

    // =========================================================================
    // Change notification
    // =========================================================================

    /// Register a listener fired after every local mutation and every applied
    /// remote update.
    pub fn on_update(&self, listener: impl Fn() + Send + Sync + 'static) -> ListenerId {
        let id = self.next_listener_id.fetch_add(1, Ordering::Relaxed);
        self.listeners.lock().insert(id, Arc::new(listener));
        ListenerId(id)
    }

    /// Remove a previously registered listener.
    pub fn off_update(&self, id: ListenerId) {
        self.listeners.lock().remove(&id.0);
    }

    /// Merge an update from another replica, then notify listeners.
    pub fn apply_remote_update(&self, bytes: &[u8]) -> Result<()> {
        self.tree.apply_update(bytes)?;
        self.notify();
        Ok(())
    }

    fn notify(&self) {
        // Snapshot under the lock, call outside it so listeners may re-enter.
        let callbacks: Vec<Listener> = self.listeners.lock().values().cloned().collect();
        for callback in callbacks {
            callback();
        }
    }

    fn write_record(&self, record: &ItemRecord) -> Result<()> {
        self.tree.set_value(&record.id, &serde_json::to_value(record)?)?;
        Ok(())
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    fn test_outline() -> OutlineManager {
        OutlineManager::new(&Doc::new(), OUTLINE_MAP)
    }

    fn texts(items: &[ItemRecord]) -> Vec<&str> {
        items.iter().map(|i| i.text.as_str()).collect()
    }

    #[test]
    fn test_insert_appends_in_call_order() {
        let outline = test_outline();
        outline.insert_item("one", "amy", None, None, None).unwrap();
        outline.insert_item("two", "amy", None, None, None).unwrap();
        outline.insert_item("three", "amy", None, None, None).unwrap();

        assert_eq!(texts(&outline.get_root_items()), vec!["one", "two", "three"]);
    }

    #[test]
    fn test_insert_after_specific_item() {
        let outline = test_outline();
        let a = outline.insert_item("A", "amy", None, None, None).unwrap();
        let _b = outline.insert_item("B", "amy", None, None, None).unwrap();

        outline.insert_item("X", "amy", None, Some(&a), None).unwrap();
        assert_eq!(texts(&outline.get_root_items()), vec!["A", "X", "B"]);
    }

    #[test]
    fn test_insert_with_custom_id() {
        let outline = test_outline();
        let id = outline
            .insert_item("hello", "amy", None, None, Some("fixed-id".into()))
            .unwrap();
        assert_eq!(id, "fixed-id");
        assert_eq!(outline.get_item("fixed-id").unwrap().text, "hello");
    }

    #[test]
    fn test_nested_insert_and_children() {
        let outline = test_outline();
        let parent = outline.insert_item("parent", "amy", None, None, None).unwrap();
        outline.insert_item("c1", "amy", Some(&parent), None, None).unwrap();
        outline.insert_item("c2", "amy", Some(&parent), None, None).unwrap();

        assert_eq!(texts(&outline.get_children(&parent)), vec!["c1", "c2"]);
        assert_eq!(outline.get_root_items().len(), 1);
    }

    #[test]
    fn test_indent_moves_under_previous_sibling() {
        let outline = test_outline();
        let a = outline.insert_item("a", "amy", None, None, None).unwrap();
        let b = outline.insert_item("b", "amy", None, None, None).unwrap();

        outline.indent_item(&b).unwrap();
        assert_eq!(texts(&outline.get_root_items()), vec!["a"]);
        assert_eq!(texts(&outline.get_children(&a)), vec!["b"]);
    }

    #[test]
    fn test_indent_first_child_is_noop() {
        let outline = test_outline();
        let a = outline.insert_item("a", "amy", None, None, None).unwrap();
        outline.indent_item(&a).unwrap();
        assert_eq!(texts(&outline.get_root_items()), vec!["a"]);
    }

    #[test]
    fn test_indent_then_outdent_restores_parent() {
        let outline = test_outline();
        let _a = outline.insert_item("a", "amy", None, None, None).unwrap();
        let b = outline.insert_item("b", "amy", None, None, None).unwrap();
        let _c = outline.insert_item("c", "amy", None, None, None).unwrap();

        outline.indent_item(&b).unwrap();
        outline.outdent_item(&b).unwrap();

        // Back at top level; order within the level may differ.
        let roots = outline.get_root_items();
        assert_eq!(roots.len(), 3);
        assert!(roots.iter().any(|i| i.id == b));
    }

    #[test]
    fn test_outdent_at_top_level_is_noop() {
        let outline = test_outline();
        let a = outline.insert_item("a", "amy", None, None, None).unwrap();
        outline.outdent_item(&a).unwrap();
        assert_eq!(outline.get_root_items().len(), 1);
    }

    #[test]
    fn test_outdent_lands_at_grandparent() {
        let outline = test_outline();
        let top = outline.insert_item("top", "amy", None, None, None).unwrap();
        let mid = outline.insert_item("mid", "amy", Some(&top), None, None).unwrap();
        let leaf = outline.insert_item("leaf", "amy", Some(&mid), None, None).unwrap();

        outline.outdent_item(&leaf).unwrap();
        assert_eq!(texts(&outline.get_children(&top)), vec!["mid", "leaf"]);
    }

    #[test]
    fn test_move_item_up_and_down() {
        let outline = test_outline();
        let _a = outline.insert_item("a", "amy", None, None, None).unwrap();
        let b = outline.insert_item("b", "amy", None, None, None).unwrap();
        let _c = outline.insert_item("c", "amy", None, None, None).unwrap();

        outline.move_item_up(&b);
        assert_eq!(texts(&outline.get_root_items()), vec!["b", "a", "c"]);

        outline.move_item_down(&b);
        assert_eq!(texts(&outline.get_root_items()), vec!["a", "b", "c"]);

        // Boundaries are no-ops.
        outline.move_item_down(&outline.get_root_items()[2].id.clone());
        outline.move_item_up(&outline.get_root_items()[0].id.clone());
        assert_eq!(texts(&outline.get_root_items()), vec!["a", "b", "c"]);
    }

    #[test]
    fn test_update_item_text_stamps_last_changed() {
        let outline = test_outline();
        let a = outline.insert_item("before", "amy", None, None, None).unwrap();
        let created = outline.get_item(&a).unwrap().created;

        outline.update_item_text(&a, "after").unwrap();
        let record = outline.get_item(&a).unwrap();
        assert_eq!(record.text, "after");
        assert_eq!(record.created, created);
        assert!(record.last_changed >= created);
    }

    #[test]
    fn test_update_missing_item_is_noop() {
        let outline = test_outline();
        outline.update_item_text("ghost", "x").unwrap();
        assert!(outline.get_item("ghost").is_none());
    }

    #[test]
    fn test_comments_and_votes() {
        let outline = test_outline();
        let a = outline.insert_item("a", "amy", None, None, None).unwrap();

        outline.add_comment(&a, "looks good", "bob").unwrap();
        outline.add_vote(&a, "bob", VoteKind::Up).unwrap();
        outline.add_vote(&a, "bob", VoteKind::Down).unwrap(); // replaces

        let record = outline.get_item(&a).unwrap();
        assert_eq!(record.comments.len(), 1);
        assert_eq!(record.comments[0].text, "looks good");
        assert_eq!(record.votes.len(), 1);
        assert_eq!(record.votes[0].kind, VoteKind::Down);
    }

    #[test]
    fn test_remove_item_deletes_subtree() {
        let outline = test_outline();
        let parent = outline.insert_item("parent", "amy", None, None, None).unwrap();
        let child = outline.insert_item("child", "amy", Some(&parent), None, None).unwrap();

        outline.remove_item(&parent);
        assert!(outline.get_item(&parent).is_none());
        assert!(outline.get_item(&child).is_none());
        assert!(outline.get_root_items().is_empty());
    }

    #[test]
    fn test_listeners_fire_and_unsubscribe() {
        let outline = test_outline();
        let fired = Arc::new(AtomicUsize::new(0));

        let counter = fired.clone();
        let id = outline.on_update(move || {
            counter.fetch_add(1, Ordering::SeqCst);
        });

        outline.insert_item("a", "amy", None, None, None).unwrap();
        assert_eq!(fired.load(Ordering::SeqCst), 1);

        outline.off_update(id);
        outline.insert_item("b", "amy", None, None, None).unwrap();
        assert_eq!(fired.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_remote_update_notifies_listeners() {
        let local = test_outline();
        let remote = OutlineManager::new(&Doc::with_client_id(7), OUTLINE_MAP);
        remote.insert_item("from afar", "bob", None, None, None).unwrap();

        let fired = Arc::new(AtomicUsize::new(0));
        let counter = fired.clone();
        local.on_update(move || {
            counter.fetch_add(1, Ordering::SeqCst);
        });

        let update = remote.tree().encode_full_state();
        local.apply_remote_update(&update).unwrap();

        assert_eq!(fired.load(Ordering::SeqCst), 1);
        assert_eq!(texts(&local.get_root_items()), vec!["from afar"]);
    }
}
