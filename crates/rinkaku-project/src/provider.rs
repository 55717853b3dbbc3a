//! Document provider seam — the replicated-document transport boundary.
//!
//! The aggregate never talks to a network; it asks a [`DocumentProvider`]
//! for document handles by room name and observes readiness through
//! [`DocumentProvider::status`]. Real deployments plug in a websocket or
//! peer-to-peer provider; [`MemoryProvider`] keeps everything in-process.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use strum::Display;
use yrs::Doc;

use crate::Result;

/// Room name for a project document.
pub fn project_room(project_id: &str) -> String {
    format!("project-{project_id}")
}

/// Room name for a page document.
pub fn page_room(project_id: &str, page_id: &str) -> String {
    format!("project-{project_id}-page-{page_id}")
}

/// Lifecycle state of one room connection.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Display)]
#[strum(serialize_all = "lowercase")]
pub enum ConnectionStatus {
    Connecting,
    Connected,
    Disconnected,
}

/// An open replicated document plus the room it belongs to.
#[derive(Clone)]
pub struct DocumentHandle {
    room: Arc<str>,
    doc: Doc,
}

impl DocumentHandle {
    pub fn new(room: impl Into<Arc<str>>, doc: Doc) -> Self {
        Self {
            room: room.into(),
            doc,
        }
    }

    pub fn room(&self) -> &str {
        &self.room
    }

    pub fn doc(&self) -> &Doc {
        &self.doc
    }
}

/// Opens replicated documents by room and tracks their lifecycle.
///
/// `open_*` must be idempotent: re-opening a room yields a handle onto the
/// same underlying document state.
#[async_trait]
pub trait DocumentProvider: Send + Sync {
    async fn open_project(&self, project_id: &str) -> Result<DocumentHandle>;

    async fn open_page(&self, project_id: &str, page_id: &str) -> Result<DocumentHandle>;

    fn status(&self, room: &str) -> ConnectionStatus;

    fn close(&self, room: &str);
}

/// In-process provider: rooms are shared documents keyed by name.
///
/// Two aggregates created against the same provider and project id observe
/// each other's writes immediately — handy for tests and single-process use.
/// Closing a room marks it disconnected but keeps its state, matching a
/// provider that caches documents for offline reconnect.
#[derive(Default)]
pub struct MemoryProvider {
    rooms: Mutex<HashMap<String, Doc>>,
    open: Mutex<HashSet<String>>,
}

impl MemoryProvider {
    pub fn new() -> Self {
        Self::default()
    }

    fn open_room(&self, room: String) -> DocumentHandle {
        let doc = self
            .rooms
            .lock()
            .entry(room.clone())
            .or_insert_with(Doc::new)
            .clone();
        self.open.lock().insert(room.clone());
        tracing::debug!(%room, "room opened");
        DocumentHandle::new(room, doc)
    }
}

#[async_trait]
impl DocumentProvider for MemoryProvider {
    async fn open_project(&self, project_id: &str) -> Result<DocumentHandle> {
        Ok(self.open_room(project_room(project_id)))
    }

    async fn open_page(&self, project_id: &str, page_id: &str) -> Result<DocumentHandle> {
        Ok(self.open_room(page_room(project_id, page_id)))
    }

    fn status(&self, room: &str) -> ConnectionStatus {
        if self.open.lock().contains(room) {
            ConnectionStatus::Connected
        } else {
            ConnectionStatus::Disconnected
        }
    }

    fn close(&self, room: &str) {
        self.open.lock().remove(room);
        tracing::debug!(room, "room closed");
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use yrs::{Map, ReadTxn, Transact, WriteTxn};

    #[tokio::test]
    async fn test_memory_provider_shares_room_state() {
        let provider = MemoryProvider::new();
        let a = provider.open_project("p1").await.unwrap();
        let b = provider.open_project("p1").await.unwrap();

        {
            let mut txn = a.doc().transact_mut();
            let map = txn.get_or_insert_map("metadata");
            map.insert(&mut txn, "k", "v");
        }
        let txn = b.doc().transact();
        let map = txn.get_map("metadata").unwrap();
        assert!(map.get(&txn, "k").is_some());
    }

    #[tokio::test]
    async fn test_distinct_rooms_are_isolated() {
        let provider = MemoryProvider::new();
        let a = provider.open_page("p1", "page-a").await.unwrap();
        let b = provider.open_page("p1", "page-b").await.unwrap();
        assert_ne!(a.room(), b.room());
    }

    #[tokio::test]
    async fn test_status_tracks_open_and_close() {
        let provider = MemoryProvider::new();
        let room = project_room("p1");
        assert_eq!(provider.status(&room), ConnectionStatus::Disconnected);

        provider.open_project("p1").await.unwrap();
        assert_eq!(provider.status(&room), ConnectionStatus::Connected);

        provider.close(&room);
        assert_eq!(provider.status(&room), ConnectionStatus::Disconnected);

        // Reconnect sees the cached state.
        let again = provider.open_project("p1").await.unwrap();
        assert_eq!(provider.status(again.room()), ConnectionStatus::Connected);
    }
}
