//! Ordered-tree CRDT over one named replicated map.
//!
//! # Map Structure
//!
//! ```text
//! <map "outline">
//! ├── node:<key> (Map)              # Per-node data
//! │   ├── parent (Str)              # Parent key, "root" for top level
//! │   └── value (Str)               # JSON payload blob (LWW whole-replace)
//! ├── order:<key> -> Str            # Successor pointer: the sibling that
//! │                                 # immediately follows <key>
//! └── first:<parent> -> Str         # Head slot: <parent>'s first child
//! ```
//!
//! # Convergence
//!
//! Every write is a single last-writer-wins map entry, so two replicas that
//! have applied the same set of updates hold byte-identical map state.
//! [`OrderedTree::sort_children`] is a pure function of that state: it walks
//! the successor chain from the parent head slot, then consumes remaining
//! chain heads in key-lexicographic order. Concurrent claims on the same
//! anchor collapse to one LWW winner and every displaced node still gets a
//! deterministic position, so all replicas derive the same sibling sequence.

use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;

use yrs::updates::decoder::Decode;
use yrs::{
    Any, Doc, Map, MapPrelim, MapRef, ReadTxn, StateVector, Transact, TransactionMut, Update,
    Value, WriteTxn,
};

use crate::{Result, TreeError};

/// Sentinel parent key for top-level nodes. No map entry exists for it.
pub const ROOT_KEY: &str = "root";

const NODE_PREFIX: &str = "node:";
const ORDER_PREFIX: &str = "order:";
const FIRST_PREFIX: &str = "first:";
const FIELD_PARENT: &str = "parent";
const FIELD_VALUE: &str = "value";

fn node_entry_key(key: &str) -> String {
    format!("{NODE_PREFIX}{key}")
}

fn order_entry_key(anchor: &str) -> String {
    format!("{ORDER_PREFIX}{anchor}")
}

fn first_entry_key(parent: &str) -> String {
    format!("{FIRST_PREFIX}{parent}")
}

/// Which pointer slot an operation targets: a parent's head slot or a
/// sibling's successor slot.
#[derive(Clone, Copy)]
enum Slot<'a> {
    Head(&'a str),
    After(&'a str),
}

impl Slot<'_> {
    fn entry_key(&self) -> String {
        match self {
            Slot::Head(parent) => first_entry_key(parent),
            Slot::After(sibling) => order_entry_key(sibling),
        }
    }
}

/// Convergent forest storage with total sibling ordering.
///
/// Wraps one named map inside a replicated [`Doc`]. All mutations are
/// synchronous local map writes; synchronization with other replicas happens
/// through [`apply_update`](Self::apply_update) /
/// [`encode_update_since`](Self::encode_update_since), driven by whatever
/// transport owns the document.
pub struct OrderedTree {
    doc: Doc,
    map_name: Arc<str>,
}

impl OrderedTree {
    /// Attach to (or lazily create) the named tree map inside a document.
    pub fn new(doc: &Doc, map_name: &str) -> Self {
        Self {
            doc: doc.clone(),
            map_name: Arc::from(map_name),
        }
    }

    /// Generate a globally-unique node key, independent of other replicas.
    pub fn generate_node_key() -> String {
        uuid::Uuid::new_v4().to_string()
    }

    /// Whether the named map inside `doc` already carries tree structure.
    pub fn check_for_tree(doc: &Doc, map_name: &str) -> bool {
        let txn = doc.transact();
        let Some(map) = txn.get_map(map_name) else {
            return false;
        };
        map.keys(&txn).any(|k| k.starts_with(NODE_PREFIX))
    }

    /// The document this tree lives in.
    pub fn doc(&self) -> &Doc {
        &self.doc
    }

    // =========================================================================
    // Map access helpers
    // =========================================================================

    fn map_read<T: ReadTxn>(&self, txn: &T) -> Option<MapRef> {
        txn.get_map(self.map_name.as_ref())
    }

    fn map_write(&self, txn: &mut TransactionMut) -> MapRef {
        txn.get_or_insert_map(self.map_name.as_ref())
    }

    fn node_map<T: ReadTxn>(&self, txn: &T, key: &str) -> Option<MapRef> {
        match self.map_read(txn)?.get(txn, &node_entry_key(key)) {
            Some(Value::YMap(node)) => Some(node),
            _ => None,
        }
    }

    fn order_entry<T: ReadTxn>(&self, txn: &T, anchor: &str) -> Option<String> {
        match self.map_read(txn)?.get(txn, &order_entry_key(anchor)) {
            Some(Value::Any(Any::String(next))) => Some(next.to_string()),
            _ => None,
        }
    }

    fn first_entry<T: ReadTxn>(&self, txn: &T, parent: &str) -> Option<String> {
        match self.map_read(txn)?.get(txn, &first_entry_key(parent)) {
            Some(Value::Any(Any::String(first))) => Some(first.to_string()),
            _ => None,
        }
    }

    // =========================================================================
    // Reads
    // =========================================================================

    /// Whether a node entry exists for `key`.
    pub fn node_exists(&self, key: &str) -> bool {
        let txn = self.doc.transact();
        self.node_map(&txn, key).is_some()
    }

    /// Parent key of a node, or `None` when the node is absent.
    pub fn get_parent(&self, key: &str) -> Option<String> {
        let txn = self.doc.transact();
        let node = self.node_map(&txn, key)?;
        match node.get(&txn, FIELD_PARENT) {
            Some(Value::Any(Any::String(parent))) => Some(parent.to_string()),
            _ => None,
        }
    }

    /// Value payload of a node, or `None` when absent or undecodable.
    pub fn get_value(&self, key: &str) -> Option<serde_json::Value> {
        let txn = self.doc.transact();
        let node = self.node_map(&txn, key)?;
        match node.get(&txn, FIELD_VALUE) {
            Some(Value::Any(Any::String(blob))) => match serde_json::from_str(blob.as_ref()) {
                Ok(value) => Some(value),
                Err(e) => {
                    tracing::warn!(key, error = %e, "node value blob is not valid JSON");
                    None
                }
            },
            _ => None,
        }
    }

    /// All node keys present in the map, in unspecified order.
    pub fn node_keys(&self) -> Vec<String> {
        let txn = self.doc.transact();
        let Some(map) = self.map_read(&txn) else {
            return Vec::new();
        };
        map.keys(&txn)
            .filter_map(|k| k.strip_prefix(NODE_PREFIX))
            .map(|k| k.to_string())
            .collect()
    }

    /// Children of `parent_key`, in unspecified collection order.
    pub fn get_children(&self, parent_key: &str) -> Vec<String> {
        let txn = self.doc.transact();
        let Some(map) = self.map_read(&txn) else {
            return Vec::new();
        };
        let mut children = Vec::new();
        for (entry_key, value) in map.iter(&txn) {
            let Some(node_key) = entry_key.strip_prefix(NODE_PREFIX) else {
                continue;
            };
            let Value::YMap(node) = value else { continue };
            if let Some(Value::Any(Any::String(parent))) = node.get(&txn, FIELD_PARENT) {
                if parent.as_ref() == parent_key {
                    children.push(node_key.to_string());
                }
            }
        }
        children
    }

    /// Impose the convergent total order over a child-key set.
    ///
    /// Walks the successor-pointer chain rooted at the parent head slot, then
    /// picks up remaining chain heads in key-lexicographic order (each
    /// consuming its own chain), then any leftover cycle members in key
    /// order. Every input key appears exactly once in the output, so a total
    /// order always exists — even for dangling or self-referential pointers.
    pub fn sort_children(&self, children: &[String], parent_key: &str) -> Vec<String> {
        // Read the head slot and all sibling successor pointers in one
        // transaction.
        let (head, successors): (Option<String>, HashMap<String, String>) = {
            let txn = self.doc.transact();
            let head = self.first_entry(&txn, parent_key);
            let successors = children
                .iter()
                .filter_map(|anchor| {
                    let next = self.order_entry(&txn, anchor)?;
                    Some((anchor.clone(), next))
                })
                .collect();
            (head, successors)
        };

        let mut remaining: BTreeSet<String> = children.iter().cloned().collect();
        let mut ordered = Vec::with_capacity(children.len());

        let walk_chain = |start: &str, remaining: &mut BTreeSet<String>, out: &mut Vec<String>| {
            let mut cursor = start.to_string();
            while let Some(next) = successors.get(&cursor) {
                if !remaining.remove(next) {
                    break; // dangling, already placed, or outside this sibling set
                }
                out.push(next.clone());
                cursor = next.clone();
            }
        };

        // Primary chain: whatever the parent head slot points at.
        if let Some(first) = head {
            if remaining.remove(&first) {
                ordered.push(first.clone());
                walk_chain(&first, &mut remaining, &mut ordered);
            }
        }

        // Remaining chain heads in key order; leftovers are cycles, broken at
        // the lexicographically smallest member.
        while !remaining.is_empty() {
            let head = remaining
                .iter()
                .find(|candidate| {
                    !remaining.iter().any(|anchor| {
                        anchor != *candidate
                            && successors.get(anchor).map(|next| next == *candidate).unwrap_or(false)
                    })
                })
                .cloned();
            let Some(start) = head.or_else(|| remaining.iter().next().cloned()) else {
                break;
            };
            remaining.remove(&start);
            ordered.push(start.clone());
            walk_chain(&start, &mut remaining, &mut ordered);
        }

        ordered
    }

    /// Children of `parent_key` in convergent order.
    pub fn sorted_children(&self, parent_key: &str) -> Vec<String> {
        let children = self.get_children(parent_key);
        self.sort_children(&children, parent_key)
    }

    // =========================================================================
    // Mutations
    // =========================================================================

    /// Insert a node under `parent_key` (use [`ROOT_KEY`] for top level).
    ///
    /// Re-creating an existing key is treated as a value update, never a
    /// duplicate. The node gets no sibling position here — callers position
    /// it with [`set_node_after`](Self::set_node_after) or
    /// [`set_node_order_to_end`](Self::set_node_order_to_end); unpositioned
    /// nodes still sort deterministically via the key-order fallback.
    pub fn create_node(
        &self,
        parent_key: &str,
        node_key: &str,
        value: &serde_json::Value,
    ) -> Result<()> {
        let blob = serde_json::to_string(value)?;

        if self.node_exists(node_key) {
            tracing::warn!(node_key, "create_node on existing key, updating value in place");
            let mut txn = self.doc.transact_mut();
            if let Some(node) = self.node_map(&txn, node_key) {
                node.insert(&mut txn, FIELD_VALUE, blob.as_str());
            }
            return Ok(());
        }

        let mut txn = self.doc.transact_mut();
        let map = self.map_write(&mut txn);
        let node = map.insert(&mut txn, node_entry_key(node_key), MapPrelim::<Any>::new());
        node.insert(&mut txn, FIELD_PARENT, parent_key);
        node.insert(&mut txn, FIELD_VALUE, blob.as_str());
        drop(txn);

        tracing::debug!(node_key, parent_key, "node created");
        Ok(())
    }

    /// Replace a node's value payload (whole-blob last-writer-wins).
    pub fn set_value(&self, node_key: &str, value: &serde_json::Value) -> Result<()> {
        let blob = serde_json::to_string(value)?;
        let mut txn = self.doc.transact_mut();
        let Some(node) = self.node_map(&txn, node_key) else {
            return Err(TreeError::NodeNotFound(node_key.to_string()));
        };
        node.insert(&mut txn, FIELD_VALUE, blob.as_str());
        Ok(())
    }

    /// Position `node_key` immediately after `after_key` among their shared
    /// parent's children.
    ///
    /// Splice semantics: the anchor that currently points at `node_key` is
    /// bypassed, then the two affected pointers are rewritten. Anchors that
    /// are missing or not siblings are logged and skipped — replicated state
    /// may legitimately not have synced them yet.
    pub fn set_node_after(&self, node_key: &str, after_key: &str) {
        if node_key == after_key {
            tracing::warn!(node_key, "set_node_after on itself, skipping");
            return;
        }
        let Some(parent) = self.get_parent(node_key) else {
            tracing::warn!(node_key, "set_node_after: node not visible yet, skipping");
            return;
        };
        match self.get_parent(after_key) {
            Some(anchor_parent) if anchor_parent == parent => {}
            _ => {
                tracing::warn!(
                    node_key,
                    after_key,
                    "set_node_after: anchor missing or not a sibling, skipping"
                );
                return;
            }
        }
        self.splice_into_slot(node_key, Slot::After(after_key), &parent);
    }

    /// Position `node_key` immediately before `before_key` among their
    /// shared parent's children.
    pub fn set_node_before(&self, node_key: &str, before_key: &str) {
        if node_key == before_key {
            tracing::warn!(node_key, "set_node_before on itself, skipping");
            return;
        }
        let Some(parent) = self.get_parent(node_key) else {
            tracing::warn!(node_key, "set_node_before: node not visible yet, skipping");
            return;
        };
        match self.get_parent(before_key) {
            Some(anchor_parent) if anchor_parent == parent => {}
            _ => {
                tracing::warn!(
                    node_key,
                    before_key,
                    "set_node_before: anchor missing or not a sibling, skipping"
                );
                return;
            }
        }

        let ordered = self.sorted_children(&parent);
        let anchor_pos = ordered.iter().position(|k| k == before_key);
        let predecessor = anchor_pos.and_then(|pos| {
            ordered[..pos].iter().rev().find(|k| k.as_str() != node_key).cloned()
        });
        match predecessor {
            // Before the first child: claim the parent head slot.
            None => self.splice_into_slot(node_key, Slot::Head(&parent), &parent),
            Some(prev) => self.splice_into_slot(node_key, Slot::After(&prev), &parent),
        }
    }

    /// Position `node_key` after the current last sibling. No-op when it is
    /// the only child.
    pub fn set_node_order_to_end(&self, node_key: &str) {
        let Some(parent) = self.get_parent(node_key) else {
            tracing::warn!(node_key, "set_node_order_to_end: node not visible yet, skipping");
            return;
        };
        let ordered = self.sorted_children(&parent);
        let last = ordered.iter().filter(|k| k.as_str() != node_key).next_back().cloned();
        if let Some(last) = last {
            self.splice_into_slot(node_key, Slot::After(&last), &parent);
        }
    }

    /// Find the pointer slot (head or sibling successor) currently naming
    /// `node_key`, along with the node's own successor. Used to bypass the
    /// node out of its current chain position.
    fn find_pointer_slot<T: ReadTxn>(
        &self,
        txn: &T,
        node_key: &str,
        parent: &str,
        siblings: &[String],
    ) -> Option<(String, Option<String>)> {
        if self.first_entry(txn, parent).as_deref() == Some(node_key) {
            return Some((first_entry_key(parent), self.order_entry(txn, node_key)));
        }
        for candidate in siblings {
            if candidate == node_key {
                continue;
            }
            if self.order_entry(txn, candidate).as_deref() == Some(node_key) {
                return Some((order_entry_key(candidate), self.order_entry(txn, node_key)));
            }
        }
        None
    }

    /// Bypass the node out of its current sibling chain: whoever points at
    /// it is rewired to its successor.
    fn unlink_from_siblings(&self, node_key: &str, parent: &str) {
        let siblings = self.get_children(parent);
        let bypass = {
            let txn = self.doc.transact();
            self.find_pointer_slot(&txn, node_key, parent, &siblings)
        };
        let Some((bypass_key, node_next)) = bypass else {
            return;
        };
        let mut txn = self.doc.transact_mut();
        let map = self.map_write(&mut txn);
        match node_next {
            Some(next) if next != node_key => {
                map.insert(&mut txn, bypass_key, next.as_str());
            }
            _ => {
                map.remove(&mut txn, &bypass_key);
            }
        }
    }

    /// Core pointer splice: bypass whatever slot currently points at the
    /// node, claim the target slot, and inherit the slot's old successor.
    fn splice_into_slot(&self, node_key: &str, slot: Slot<'_>, parent: &str) {
        let siblings = self.get_children(parent);

        // Read phase: the slot's current occupant, and whichever slot
        // currently points at the node (for the bypass).
        let (old_next, bypass) = {
            let txn = self.doc.transact();
            let old_next = match slot {
                Slot::Head(p) => self.first_entry(&txn, p),
                Slot::After(sibling) => self.order_entry(&txn, sibling),
            };
            let bypass = self.find_pointer_slot(&txn, node_key, parent, &siblings);
            (old_next, bypass)
        };

        let slot_key = slot.entry_key();
        let mut txn = self.doc.transact_mut();
        let map = self.map_write(&mut txn);

        if let Some((bypass_key, node_next)) = bypass {
            if bypass_key != slot_key {
                match node_next {
                    Some(next) if next != node_key => {
                        map.insert(&mut txn, bypass_key, next.as_str());
                    }
                    _ => {
                        map.remove(&mut txn, &bypass_key);
                    }
                }
            }
        }

        map.insert(&mut txn, slot_key, node_key);
        match old_next {
            Some(next) if next != node_key => {
                map.insert(&mut txn, order_entry_key(node_key), next.as_str());
            }
            // Already directly after the slot: keep the node's own successor.
            Some(_) => {}
            None => {
                map.remove(&mut txn, &order_entry_key(node_key));
            }
        }
    }

    /// Rewrite a node's parent, then append it as the last child of the
    /// destination. The stale successor pointers at the old location are
    /// left behind; sorting filters them out because their targets are no
    /// longer in that sibling set.
    pub fn move_to_parent(&self, node_key: &str, new_parent_key: &str) -> Result<()> {
        if !self.node_exists(node_key) {
            return Err(TreeError::NodeNotFound(node_key.to_string()));
        }
        if new_parent_key != ROOT_KEY && !self.node_exists(new_parent_key) {
            return Err(TreeError::NodeNotFound(new_parent_key.to_string()));
        }

        // Cycle guard: the destination must not be the node or a descendant.
        let mut cursor = new_parent_key.to_string();
        while cursor != ROOT_KEY {
            if cursor == node_key {
                return Err(TreeError::WouldCycle {
                    node: node_key.to_string(),
                    new_parent: new_parent_key.to_string(),
                });
            }
            cursor = self.get_parent(&cursor).unwrap_or_else(|| ROOT_KEY.to_string());
        }

        // Splice the node out of its old sibling chain while that chain is
        // still observable, then rewrite the parent edge.
        if let Some(old_parent) = self.get_parent(node_key) {
            self.unlink_from_siblings(node_key, &old_parent);
        }
        {
            let mut txn = self.doc.transact_mut();
            if let Some(node) = self.node_map(&txn, node_key) {
                node.insert(&mut txn, FIELD_PARENT, new_parent_key);
            }
            // The old-location successor pointer is meaningless at the
            // destination; drop it rather than letting it dangle.
            let map = self.map_write(&mut txn);
            map.remove(&mut txn, &order_entry_key(node_key));
        }
        self.set_node_order_to_end(node_key);

        tracing::debug!(node_key, new_parent_key, "node moved");
        Ok(())
    }

    /// Remove a node and its entire subtree from the map.
    ///
    /// Descendants are collected first with an existence re-check per key, so
    /// a concurrent delete arriving from another replica mid-traversal cannot
    /// wedge the walk. Missing root key is a no-op.
    pub fn delete_subtree(&self, node_key: &str) {
        let mut stack = vec![node_key.to_string()];
        let mut doomed = Vec::new();
        while let Some(key) = stack.pop() {
            if !self.node_exists(&key) {
                continue;
            }
            stack.extend(self.get_children(&key));
            doomed.push(key);
        }
        if doomed.is_empty() {
            return;
        }

        let mut txn = self.doc.transact_mut();
        let map = self.map_write(&mut txn);
        for key in &doomed {
            map.remove(&mut txn, &node_entry_key(key));
            map.remove(&mut txn, &order_entry_key(key));
            map.remove(&mut txn, &first_entry_key(key));
        }
        drop(txn);

        tracing::debug!(node_key, removed = doomed.len(), "subtree deleted");
    }

    // =========================================================================
    // Replica exchange
    // =========================================================================

    /// State vector of the underlying document.
    pub fn state_vector(&self) -> StateVector {
        self.doc.transact().state_vector()
    }

    /// Encode every update the given replica is missing.
    pub fn encode_update_since(&self, remote: &StateVector) -> Vec<u8> {
        self.doc.transact().encode_state_as_update_v1(remote)
    }

    /// Encode the full document state as one update.
    pub fn encode_full_state(&self) -> Vec<u8> {
        self.encode_update_since(&StateVector::default())
    }

    /// Merge an update produced by another replica.
    pub fn apply_update(&self, bytes: &[u8]) -> Result<()> {
        let update =
            Update::decode_v1(bytes).map_err(|e| TreeError::InvalidUpdate(e.to_string()))?;
        let mut txn = self.doc.transact_mut();
        txn.apply_update(update);
        Ok(())
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn test_tree() -> OrderedTree {
        OrderedTree::new(&Doc::new(), "outline")
    }

    fn val(text: &str) -> serde_json::Value {
        serde_json::json!({ "text": text })
    }

    #[test]
    fn test_create_and_read_back() {
        let tree = test_tree();
        tree.create_node(ROOT_KEY, "a", &val("hello")).unwrap();

        assert!(tree.node_exists("a"));
        assert_eq!(tree.get_parent("a").as_deref(), Some(ROOT_KEY));
        assert_eq!(tree.get_value("a").unwrap()["text"], "hello");
        assert_eq!(tree.get_children(ROOT_KEY), vec!["a".to_string()]);
    }

    #[test]
    fn test_reads_before_any_write_are_empty() {
        let tree = test_tree();
        assert!(tree.get_children(ROOT_KEY).is_empty());
        assert!(tree.get_value("nope").is_none());
        assert!(tree.get_parent("nope").is_none());
        assert!(!OrderedTree::check_for_tree(tree.doc(), "outline"));
    }

    #[test]
    fn test_idempotent_create_updates_value() {
        let tree = test_tree();
        tree.create_node(ROOT_KEY, "a", &val("one")).unwrap();
        tree.create_node(ROOT_KEY, "b", &val("child-of-root")).unwrap();
        tree.set_node_after("b", "a");

        // Re-create: value updated, no duplicate, children untouched.
        tree.create_node(ROOT_KEY, "a", &val("two")).unwrap();
        assert_eq!(tree.get_value("a").unwrap()["text"], "two");
        assert_eq!(tree.node_keys().len(), 2);
        assert_eq!(tree.sorted_children(ROOT_KEY), vec!["a".to_string(), "b".to_string()]);
    }

    #[test]
    fn test_insert_after_splices_chain() {
        let tree = test_tree();
        tree.create_node(ROOT_KEY, "A", &val("A")).unwrap();
        tree.create_node(ROOT_KEY, "B", &val("B")).unwrap();
        tree.set_node_after("B", "A");
        assert_eq!(tree.sorted_children(ROOT_KEY), vec!["A".to_string(), "B".to_string()]);

        // Insert X between A and B.
        tree.create_node(ROOT_KEY, "X", &val("X")).unwrap();
        tree.set_node_after("X", "A");
        assert_eq!(
            tree.sorted_children(ROOT_KEY),
            vec!["A".to_string(), "X".to_string(), "B".to_string()]
        );
    }

    #[test]
    fn test_set_node_before_first_child() {
        let tree = test_tree();
        tree.create_node(ROOT_KEY, "a", &val("a")).unwrap();
        tree.create_node(ROOT_KEY, "b", &val("b")).unwrap();
        tree.set_node_after("b", "a");

        tree.create_node(ROOT_KEY, "c", &val("c")).unwrap();
        tree.set_node_before("c", "a");
        assert_eq!(
            tree.sorted_children(ROOT_KEY),
            vec!["c".to_string(), "a".to_string(), "b".to_string()]
        );
    }

    #[test]
    fn test_swap_with_adjacent_siblings() {
        let tree = test_tree();
        for key in ["a", "b", "c"] {
            tree.create_node(ROOT_KEY, key, &val(key)).unwrap();
            tree.set_node_order_to_end(key);
        }
        assert_eq!(
            tree.sorted_children(ROOT_KEY),
            vec!["a".to_string(), "b".to_string(), "c".to_string()]
        );

        // Move b up: its previous sibling goes after it.
        tree.set_node_after("a", "b");
        assert_eq!(
            tree.sorted_children(ROOT_KEY),
            vec!["b".to_string(), "a".to_string(), "c".to_string()]
        );

        // Move b down again.
        tree.set_node_after("b", "a");
        assert_eq!(
            tree.sorted_children(ROOT_KEY),
            vec!["a".to_string(), "b".to_string(), "c".to_string()]
        );
    }

    #[test]
    fn test_set_node_after_missing_anchor_is_skipped() {
        let tree = test_tree();
        tree.create_node(ROOT_KEY, "a", &val("a")).unwrap();
        // Anchor never created: operation logs and skips, order falls back.
        tree.set_node_after("a", "ghost");
        assert_eq!(tree.sorted_children(ROOT_KEY), vec!["a".to_string()]);
    }

    #[test]
    fn test_set_node_after_cross_parent_is_skipped() {
        let tree = test_tree();
        tree.create_node(ROOT_KEY, "a", &val("a")).unwrap();
        tree.create_node("a", "a1", &val("a1")).unwrap();
        tree.create_node(ROOT_KEY, "b", &val("b")).unwrap();

        tree.set_node_after("b", "a1"); // not a sibling
        assert_eq!(tree.get_parent("b").as_deref(), Some(ROOT_KEY));
        assert_eq!(tree.sorted_children("a"), vec!["a1".to_string()]);
    }

    #[test]
    fn test_unpositioned_nodes_fall_back_to_key_order() {
        let tree = test_tree();
        // Created without any ordering pointers at all.
        for key in ["m", "c", "x", "a"] {
            tree.create_node(ROOT_KEY, key, &val(key)).unwrap();
        }
        assert_eq!(
            tree.sorted_children(ROOT_KEY),
            vec!["a".to_string(), "c".to_string(), "m".to_string(), "x".to_string()]
        );
    }

    #[test]
    fn test_sort_is_total_under_self_referential_pointer() {
        let tree = test_tree();
        tree.create_node(ROOT_KEY, "a", &val("a")).unwrap();
        tree.create_node(ROOT_KEY, "b", &val("b")).unwrap();
        // Corrupt state by hand: a points at itself.
        {
            let mut txn = tree.doc.transact_mut();
            let map = tree.map_write(&mut txn);
            map.insert(&mut txn, order_entry_key("a"), "a");
        }
        let ordered = tree.sorted_children(ROOT_KEY);
        assert_eq!(ordered.len(), 2);
        assert!(ordered.contains(&"a".to_string()));
        assert!(ordered.contains(&"b".to_string()));
    }

    #[test]
    fn test_move_to_parent_appends_at_end() {
        let tree = test_tree();
        tree.create_node(ROOT_KEY, "p", &val("p")).unwrap();
        for key in ["p1", "p2"] {
            tree.create_node("p", key, &val(key)).unwrap();
            tree.set_node_order_to_end(key);
        }
        tree.create_node(ROOT_KEY, "q", &val("q")).unwrap();

        tree.move_to_parent("q", "p").unwrap();
        assert_eq!(tree.get_parent("q").as_deref(), Some("p"));
        assert_eq!(
            tree.sorted_children("p"),
            vec!["p1".to_string(), "p2".to_string(), "q".to_string()]
        );
        // Old location no longer lists the node.
        assert_eq!(tree.sorted_children(ROOT_KEY), vec!["p".to_string()]);
    }

    #[test]
    fn test_move_to_parent_rejects_cycles() {
        let tree = test_tree();
        tree.create_node(ROOT_KEY, "a", &val("a")).unwrap();
        tree.create_node("a", "b", &val("b")).unwrap();
        tree.create_node("b", "c", &val("c")).unwrap();

        let err = tree.move_to_parent("a", "c").unwrap_err();
        assert!(matches!(err, TreeError::WouldCycle { .. }));
        let err = tree.move_to_parent("a", "a").unwrap_err();
        assert!(matches!(err, TreeError::WouldCycle { .. }));
        // Forest untouched.
        assert_eq!(tree.get_parent("a").as_deref(), Some(ROOT_KEY));
    }

    #[test]
    fn test_move_to_parent_missing_node() {
        let tree = test_tree();
        tree.create_node(ROOT_KEY, "a", &val("a")).unwrap();
        assert!(matches!(
            tree.move_to_parent("ghost", "a"),
            Err(TreeError::NodeNotFound(_))
        ));
        assert!(matches!(
            tree.move_to_parent("a", "ghost"),
            Err(TreeError::NodeNotFound(_))
        ));
    }

    #[test]
    fn test_delete_subtree_removes_descendants() {
        let tree = test_tree();
        tree.create_node(ROOT_KEY, "a", &val("a")).unwrap();
        tree.create_node("a", "b", &val("b")).unwrap();
        tree.create_node("b", "c", &val("c")).unwrap();
        tree.create_node(ROOT_KEY, "z", &val("z")).unwrap();

        tree.delete_subtree("a");
        for key in ["a", "b", "c"] {
            assert!(!tree.node_exists(key), "{key} should be gone");
            assert!(tree.get_value(key).is_none());
        }
        assert!(tree.node_exists("z"));
        assert_eq!(tree.sorted_children(ROOT_KEY), vec!["z".to_string()]);
    }

    #[test]
    fn test_delete_subtree_missing_key_is_noop() {
        let tree = test_tree();
        tree.create_node(ROOT_KEY, "a", &val("a")).unwrap();
        tree.delete_subtree("ghost");
        assert!(tree.node_exists("a"));
    }

    #[test]
    fn test_set_value_on_missing_node_errors() {
        let tree = test_tree();
        assert!(matches!(
            tree.set_value("ghost", &val("x")),
            Err(TreeError::NodeNotFound(_))
        ));
    }

    #[test]
    fn test_generated_keys_are_unique() {
        let a = OrderedTree::generate_node_key();
        let b = OrderedTree::generate_node_key();
        assert_ne!(a, b);
    }

    #[test]
    fn test_check_for_tree_detects_structure() {
        let doc = Doc::new();
        let tree = OrderedTree::new(&doc, "outline");
        assert!(!OrderedTree::check_for_tree(&doc, "outline"));
        tree.create_node(ROOT_KEY, "a", &val("a")).unwrap();
        assert!(OrderedTree::check_for_tree(&doc, "outline"));
        assert!(!OrderedTree::check_for_tree(&doc, "other"));
    }
}
