//! Project manager — lifecycle of one project document plus its pages.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use rinkaku_outline::{OUTLINE_MAP, OutlineManager};
use rinkaku_types::{IdentityProvider, PageMetadata, ProjectMetadata};
use serde::Serialize;
use serde::de::DeserializeOwned;
use yrs::{Any, Doc, Map, ReadTxn, Transact, Value, WriteTxn};

use crate::provider::{ConnectionStatus, DocumentHandle, DocumentProvider};
use crate::view::{PageSummary, PageView, ProjectView};
use crate::{ProjectError, Result};

/// Name of the project metadata map. Holds one JSON entry under
/// [`METADATA_KEY`].
pub const METADATA_MAP: &str = "metadata";
/// Name of the page index map: page id -> `PageMetadata` JSON.
pub const PAGES_INDEX_MAP: &str = "pagesIndex";

const METADATA_KEY: &str = "metadata";

/// Author used when nobody is signed in.
const ANONYMOUS_AUTHOR: &str = "anonymous";

/// Owns one project document and its lazily-connected page documents.
///
/// Instantiable any number of times per process; all collaborators come in
/// through the constructor. Connection caches are per-instance memoization
/// keyed by page id, invalidated on [`disconnect`](Self::disconnect) — they
/// are never replicated.
pub struct ProjectManager<P: DocumentProvider> {
    project_id: String,
    provider: Arc<P>,
    identity: Arc<dyn IdentityProvider>,
    project_conn: Mutex<Option<DocumentHandle>>,
    page_conns: Mutex<HashMap<String, DocumentHandle>>,
    page_outlines: Mutex<HashMap<String, Arc<OutlineManager>>>,
}

impl<P: DocumentProvider> ProjectManager<P> {
    pub fn new(
        project_id: impl Into<String>,
        provider: Arc<P>,
        identity: Arc<dyn IdentityProvider>,
    ) -> Self {
        let project_id = project_id.into();
        tracing::debug!(%project_id, "project manager created");
        Self {
            project_id,
            provider,
            identity,
            project_conn: Mutex::new(None),
            page_conns: Mutex::new(HashMap::new()),
            page_outlines: Mutex::new(HashMap::new()),
        }
    }

    pub fn project_id(&self) -> &str {
        &self.project_id
    }

    fn current_author(&self) -> String {
        self.identity
            .current_user()
            .map(|u| u.id)
            .unwrap_or_else(|| ANONYMOUS_AUTHOR.to_string())
    }

    // =========================================================================
    // Connection lifecycle
    // =========================================================================

    /// Open (or join) the project document and seed metadata when absent.
    ///
    /// An existing title is never overwritten here, even when `initial_title`
    /// differs — retitling is the explicit
    /// [`update_project_title`](Self::update_project_title) call.
    pub async fn connect(&self, initial_title: Option<&str>) -> Result<()> {
        let handle = self.provider.open_project(&self.project_id).await?;
        self.init_project_metadata(&handle, initial_title);
        *self.project_conn.lock() = Some(handle);
        tracing::info!(project_id = %self.project_id, "connected to project");
        Ok(())
    }

    pub fn is_connected(&self) -> bool {
        self.project_conn.lock().is_some()
    }

    /// Poll the provider until the project room reports connected, checking
    /// every 100 ms up to `timeout`. Returns `false` on timeout or when
    /// `connect` has not been called — never hangs.
    pub async fn wait_for_ready(&self, timeout: Duration) -> bool {
        let room = self.project_conn.lock().as_ref().map(|h| h.room().to_string());
        let Some(room) = room else {
            return false;
        };
        let deadline = tokio::time::Instant::now() + timeout;
        loop {
            if self.provider.status(&room) == ConnectionStatus::Connected {
                return true;
            }
            if tokio::time::Instant::now() >= deadline {
                tracing::warn!(%room, "timed out waiting for connection");
                return false;
            }
            tokio::time::sleep(Duration::from_millis(100)).await;
        }
    }

    /// Close all page connections, then the project connection. The
    /// per-page outline caches are dropped with them.
    pub fn disconnect(&self) {
        for (_, handle) in self.page_conns.lock().drain() {
            self.provider.close(handle.room());
        }
        self.page_outlines.lock().clear();

        if let Some(handle) = self.project_conn.lock().take() {
            self.provider.close(handle.room());
        }
        tracing::info!(project_id = %self.project_id, "disconnected from project");
    }

    fn project_doc(&self) -> Result<Doc> {
        self.project_conn
            .lock()
            .as_ref()
            .map(|h| h.doc().clone())
            .ok_or_else(|| ProjectError::NotConnected(self.project_id.clone()))
    }

    // =========================================================================
    // Project metadata
    // =========================================================================

    fn init_project_metadata(&self, handle: &DocumentHandle, initial_title: Option<&str>) {
        let existing: Option<ProjectMetadata> =
            read_json_entry(handle.doc(), METADATA_MAP, METADATA_KEY);
        match existing {
            None => {
                let title = initial_title
                    .filter(|t| !t.is_empty())
                    .map(str::to_string)
                    .unwrap_or_else(|| format!("Project {}", self.project_id));
                let metadata = ProjectMetadata::new(&self.project_id, &title, "system");
                if let Err(e) = write_json_entry(handle.doc(), METADATA_MAP, METADATA_KEY, &metadata)
                {
                    tracing::warn!(error = %e, "failed to seed project metadata");
                } else {
                    tracing::info!(%title, "project metadata initialized");
                }
            }
            Some(metadata) => {
                if let Some(title) = initial_title {
                    if !title.is_empty() && title != metadata.title {
                        tracing::info!(
                            stored = %metadata.title,
                            requested = %title,
                            "existing project title kept; use update_project_title to change it"
                        );
                    }
                }
            }
        }
    }

    pub fn get_project_metadata(&self) -> Option<ProjectMetadata> {
        let doc = self.project_doc().ok()?;
        read_json_entry(&doc, METADATA_MAP, METADATA_KEY)
    }

    pub fn get_project_title(&self) -> Option<String> {
        self.get_project_metadata().map(|m| m.title)
    }

    /// Retitle the project, creating metadata when it does not exist yet.
    pub fn update_project_title(&self, new_title: &str) -> bool {
        let Ok(doc) = self.project_doc() else {
            tracing::warn!("cannot update project title: not connected");
            return false;
        };
        let metadata = match read_json_entry::<ProjectMetadata>(&doc, METADATA_MAP, METADATA_KEY) {
            Some(mut existing) => {
                existing.title = new_title.to_string();
                existing.last_modified = rinkaku_types::now_millis();
                existing
            }
            None => ProjectMetadata::new(&self.project_id, new_title, "system"),
        };
        match write_json_entry(&doc, METADATA_MAP, METADATA_KEY, &metadata) {
            Ok(()) => {
                tracing::info!(new_title, "project title updated");
                true
            }
            Err(e) => {
                tracing::warn!(error = %e, "failed to update project title");
                false
            }
        }
    }

    // =========================================================================
    // Page index
    // =========================================================================

    /// Non-deleted pages, sorted by display order.
    pub fn get_pages(&self) -> Vec<PageMetadata> {
        let Ok(doc) = self.project_doc() else {
            return Vec::new();
        };
        let mut pages = read_all_pages(&doc);
        pages.retain(|p| !p.deleted);
        pages.sort_by_key(|p| p.order);
        pages
    }

    /// Raw metadata lookup by page id, including soft-deleted entries.
    pub fn get_page_metadata(&self, page_id: &str) -> Option<PageMetadata> {
        let doc = self.project_doc().ok()?;
        read_json_entry(&doc, PAGES_INDEX_MAP, page_id)
    }

    fn next_page_order(&self) -> i64 {
        self.get_pages().iter().map(|p| p.order + 1).max().unwrap_or(0)
    }

    /// Create a page: index entry, title node at tree root, one child item
    /// per initial line nested under the title node.
    pub async fn create_page(
        &self,
        title: &str,
        author: &str,
        lines: &[String],
        page_id: Option<String>,
    ) -> Result<String> {
        self.create_page_with_item_ids(title, author, lines, page_id, &[]).await
    }

    /// [`create_page`](Self::create_page) with caller-supplied item ids for
    /// the initial lines — used by migration tooling that must keep ids
    /// aligned with another store. Lines beyond `item_ids` get generated ids.
    pub async fn create_page_with_item_ids(
        &self,
        title: &str,
        author: &str,
        lines: &[String],
        page_id: Option<String>,
        item_ids: &[String],
    ) -> Result<String> {
        let doc = self.project_doc()?;
        let final_page_id = page_id.unwrap_or_else(|| uuid::Uuid::new_v4().to_string());

        let metadata = PageMetadata::new(&final_page_id, title, author, self.next_page_order());
        write_json_entry(&doc, PAGES_INDEX_MAP, &final_page_id, &metadata)?;

        let outline = self.connect_to_page(&final_page_id).await?;
        let title_node_id = outline.insert_item(title, author, None, None, None)?;
        for (index, line) in lines.iter().enumerate() {
            let custom_id = item_ids.get(index).cloned();
            outline.insert_item(line, author, Some(&title_node_id), None, custom_id)?;
        }

        tracing::info!(
            page_id = %final_page_id,
            title,
            lines = lines.len(),
            "page created"
        );
        Ok(final_page_id)
    }

    /// Soft-delete a page. The index entry stays, flagged.
    pub fn delete_page(&self, page_id: &str) {
        let Ok(doc) = self.project_doc() else {
            return;
        };
        let Some(mut metadata) = read_json_entry::<PageMetadata>(&doc, PAGES_INDEX_MAP, page_id)
        else {
            tracing::warn!(page_id, "cannot delete page: not found");
            return;
        };
        metadata.deleted = true;
        metadata.last_modified = rinkaku_types::now_millis();
        if let Err(e) = write_json_entry(&doc, PAGES_INDEX_MAP, page_id, &metadata) {
            tracing::warn!(page_id, error = %e, "failed to delete page");
        } else {
            tracing::info!(page_id, "page deleted");
        }
    }

    /// Retitle a page. Missing pages are logged, never created.
    pub fn update_page_title(&self, page_id: &str, new_title: &str) {
        let Ok(doc) = self.project_doc() else {
            return;
        };
        let Some(mut metadata) = read_json_entry::<PageMetadata>(&doc, PAGES_INDEX_MAP, page_id)
        else {
            tracing::warn!(page_id, "cannot update page title: not found");
            return;
        };
        metadata.title = new_title.to_string();
        metadata.last_modified = rinkaku_types::now_millis();
        if let Err(e) = write_json_entry(&doc, PAGES_INDEX_MAP, page_id, &metadata) {
            tracing::warn!(page_id, error = %e, "failed to update page title");
        }
    }

    /// Reposition a page among its project's pages.
    pub fn update_page_order(&self, page_id: &str, new_order: i64) {
        let Ok(doc) = self.project_doc() else {
            return;
        };
        let Some(mut metadata) = read_json_entry::<PageMetadata>(&doc, PAGES_INDEX_MAP, page_id)
        else {
            tracing::warn!(page_id, "cannot update page order: not found");
            return;
        };
        metadata.order = new_order;
        metadata.last_modified = rinkaku_types::now_millis();
        if let Err(e) = write_json_entry(&doc, PAGES_INDEX_MAP, page_id, &metadata) {
            tracing::warn!(page_id, error = %e, "failed to update page order");
        }
    }

    // =========================================================================
    // Page content
    // =========================================================================

    /// Connect to a page document, creating and caching its outline manager.
    pub async fn connect_to_page(&self, page_id: &str) -> Result<Arc<OutlineManager>> {
        if let Some(existing) = self.page_outlines.lock().get(page_id).cloned() {
            return Ok(existing);
        }

        let handle = self.provider.open_page(&self.project_id, page_id).await?;
        let outline = Arc::new(OutlineManager::new(handle.doc(), OUTLINE_MAP));

        // Another task may have connected while we awaited; first one wins.
        let outline = self
            .page_outlines
            .lock()
            .entry(page_id.to_string())
            .or_insert(outline)
            .clone();
        self.page_conns
            .lock()
            .entry(page_id.to_string())
            .or_insert(handle);

        tracing::debug!(page_id, "connected to page");
        Ok(outline)
    }

    /// Cached outline manager for a page, if connected.
    pub fn page_manager(&self, page_id: &str) -> Option<Arc<OutlineManager>> {
        self.page_outlines.lock().get(page_id).cloned()
    }

    /// Add an item to a page.
    ///
    /// `page` resolves by id first, then by title over non-deleted pages
    /// (defensive: callers sometimes hold a title where an id is expected).
    /// When `parent_id` is omitted the item nests under the page's title
    /// node, falling back to tree root with a warning when the title node is
    /// missing. Returns `None` when the page cannot be resolved.
    pub async fn add_item_to_page(
        &self,
        page: &str,
        text: &str,
        author: &str,
        parent_id: Option<&str>,
        custom_id: Option<String>,
    ) -> Result<Option<String>> {
        let Ok(doc) = self.project_doc() else {
            tracing::warn!("cannot add item to page: not connected");
            return Ok(None);
        };

        let direct: Option<PageMetadata> = read_json_entry(&doc, PAGES_INDEX_MAP, page);
        let metadata = match direct.filter(|p| !p.deleted) {
            Some(found) => Some(found),
            None => {
                let by_title = self.get_pages().into_iter().find(|p| p.title == page);
                if let Some(ref found) = by_title {
                    tracing::info!(page, resolved = %found.id, "resolved page id by title match");
                }
                by_title
            }
        };
        let Some(metadata) = metadata else {
            tracing::warn!(page, "page not found or deleted");
            return Ok(None);
        };

        let outline = self.connect_to_page(&metadata.id).await?;

        let parent = match parent_id {
            Some(parent) => Some(parent.to_string()),
            None => {
                let title_node = outline
                    .get_root_items()
                    .into_iter()
                    .find(|item| item.text == metadata.title);
                match title_node {
                    Some(node) => Some(node.id),
                    None => {
                        tracing::warn!(
                            page_id = %metadata.id,
                            "title node not found, creating at root level"
                        );
                        None
                    }
                }
            }
        };

        let item_id = outline.insert_item(text, author, parent.as_deref(), None, custom_id)?;
        tracing::info!(page_id = %metadata.id, %item_id, "item added to page");
        Ok(Some(item_id))
    }

    // =========================================================================
    // Aggregate views
    // =========================================================================

    /// Project overview: metadata plus one summary entry per page.
    pub fn get_project(&self) -> Option<ProjectView> {
        let metadata = self.get_project_metadata()?;
        let pages = self.get_pages().into_iter().map(PageSummary::from).collect();
        Some(ProjectView { metadata, pages })
    }

    /// Resolve one page to content depth one: title node plus its direct
    /// children. `identifier` matches by id first, then by title over
    /// non-deleted pages. Strict: returns `None` on miss.
    pub async fn get_page_item(&self, identifier: &str) -> Result<Option<PageView>> {
        let metadata = match self.get_page_metadata(identifier) {
            Some(found) => Some(found),
            None => self.get_pages().into_iter().find(|p| p.title == identifier),
        };
        let Some(metadata) = metadata else {
            return Ok(None);
        };

        let outline = self.connect_to_page(&metadata.id).await?;
        let roots = outline.get_root_items();
        let title_node = roots.iter().find(|item| item.text == metadata.title).cloned();

        let items = match title_node {
            Some(node) => {
                let mut items = outline.get_children(&node.id);
                items.insert(0, node);
                items
            }
            // No title node (yet): expose whatever the root level holds.
            None => roots,
        };

        Ok(Some(PageView { metadata, items }))
    }

    /// [`get_page_item`](Self::get_page_item), creating an empty page titled
    /// `identifier` when nothing matches. The author is the current user,
    /// or anonymous.
    pub async fn get_or_create_page_item(&self, identifier: &str) -> Result<Option<PageView>> {
        if let Some(view) = self.get_page_item(identifier).await? {
            return Ok(Some(view));
        }
        tracing::info!(identifier, "page not found by id or title, creating");
        let author = self.current_author();
        let page_id = self.create_page(identifier, &author, &[], None).await?;
        self.get_page_item(&page_id).await
    }

    // =========================================================================
    // Test support
    // =========================================================================

    /// Wipe the project document: page index, metadata, and local caches.
    /// Page content documents are left as-is.
    pub fn cleanup_project(&self) {
        let Ok(doc) = self.project_doc() else {
            return;
        };
        clear_map(&doc, PAGES_INDEX_MAP);
        clear_map(&doc, METADATA_MAP);
        self.page_conns.lock().clear();
        self.page_outlines.lock().clear();
        tracing::info!("project cleaned up");
    }
}

// ============================================================================
// JSON-entry map helpers
// ============================================================================

fn read_json_entry<T: DeserializeOwned>(doc: &Doc, map_name: &str, key: &str) -> Option<T> {
    let txn = doc.transact();
    let map = txn.get_map(map_name)?;
    match map.get(&txn, key) {
        Some(Value::Any(Any::String(blob))) => match serde_json::from_str(blob.as_ref()) {
            Ok(value) => Some(value),
            Err(e) => {
                tracing::warn!(map_name, key, error = %e, "entry is not a valid record");
                None
            }
        },
        _ => None,
    }
}

fn write_json_entry<T: Serialize>(doc: &Doc, map_name: &str, key: &str, value: &T) -> Result<()> {
    let blob = serde_json::to_string(value)?;
    let mut txn = doc.transact_mut();
    let map = txn.get_or_insert_map(map_name);
    map.insert(&mut txn, key, blob.as_str());
    Ok(())
}

fn read_all_pages(doc: &Doc) -> Vec<PageMetadata> {
    let txn = doc.transact();
    let Some(map) = txn.get_map(PAGES_INDEX_MAP) else {
        return Vec::new();
    };
    let mut pages = Vec::new();
    for (key, value) in map.iter(&txn) {
        let Value::Any(Any::String(blob)) = value else {
            continue;
        };
        match serde_json::from_str::<PageMetadata>(blob.as_ref()) {
            Ok(page) => pages.push(page),
            Err(e) => tracing::warn!(key, error = %e, "page index entry is not valid metadata"),
        }
    }
    pages
}

fn clear_map(doc: &Doc, map_name: &str) {
    let mut txn = doc.transact_mut();
    let map = txn.get_or_insert_map(map_name);
    let keys: Vec<String> = map.keys(&txn).map(|k| k.to_string()).collect();
    for key in keys {
        map.remove(&mut txn, &key);
    }
}

// ============================================================================
// Tests
// ============================================================================
