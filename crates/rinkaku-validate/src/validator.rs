//! Structural comparison between the legacy source and the CRDT store.

use rinkaku_project::{DocumentProvider, ProjectManager};
use rinkaku_types::{ItemRecord, PageMetadata};
use serde::Serialize;

use crate::legacy::{LegacyItem, LegacyProject};
use crate::snapshot::page_content_items;

/// Which coarse checks to run. Everything defaults to on.
#[derive(Clone, Copy, Debug)]
pub struct ValidationOptions {
    pub check_project_title: bool,
    pub check_page_count: bool,
    pub check_page_titles: bool,
    pub check_item_counts: bool,
}

impl Default for ValidationOptions {
    fn default() -> Self {
        Self {
            check_project_title: true,
            check_page_count: true,
            check_page_titles: true,
            check_item_counts: true,
        }
    }
}

/// One compared field: both sides plus the verdict.
#[derive(Clone, Debug, Serialize)]
pub struct FieldComparison<T> {
    pub legacy: T,
    pub yjs: T,
    pub matches: bool,
}

impl<T: PartialEq> FieldComparison<T> {
    fn new(legacy: T, yjs: T) -> Self {
        let matches = legacy == yjs;
        Self {
            legacy,
            yjs,
            matches,
        }
    }
}

/// Whole-project comparison result.
///
/// `is_valid` is true iff there are zero hard errors anywhere — project
/// level and every page. Warnings (count drift, id/author/timestamp
/// differences) never flip it.
#[derive(Clone, Debug, Serialize)]
pub struct ProjectValidationResult {
    pub is_valid: bool,
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
    pub project_title: FieldComparison<String>,
    pub page_count: FieldComparison<usize>,
    pub pages: Vec<PageValidationResult>,
}

/// Per-page comparison result.
#[derive(Clone, Debug, Serialize)]
pub struct PageValidationResult {
    pub page_id: String,
    pub is_valid: bool,
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
    pub title: FieldComparison<String>,
    pub item_count: FieldComparison<usize>,
    pub items: Vec<ItemValidationResult>,
}

/// One side of a positional item comparison.
#[derive(Clone, Debug, Serialize)]
pub struct ItemSide {
    pub id: String,
    pub text: String,
    pub author: Option<String>,
    pub created: Option<u64>,
    pub last_changed: Option<u64>,
}

impl ItemSide {
    fn from_legacy(item: &LegacyItem) -> Self {
        Self {
            id: item.id.clone(),
            text: item.text.clone(),
            author: item.author.clone(),
            created: item.created,
            last_changed: item.last_changed,
        }
    }

    fn from_record(item: &ItemRecord) -> Self {
        Self {
            id: item.id.clone(),
            text: item.text.clone(),
            author: Some(item.author.clone()),
            created: Some(item.created),
            last_changed: Some(item.last_changed),
        }
    }
}

/// Positional comparison of one item slot.
///
/// `matches` reflects hard differences only: a missing side or a text
/// mismatch. Id, author, and timestamp drift land in `warnings` — the two
/// systems assign those independently, so disagreement is expected.
#[derive(Clone, Debug, Serialize)]
pub struct ItemValidationResult {
    pub index: usize,
    pub legacy: Option<ItemSide>,
    pub yjs: Option<ItemSide>,
    pub matches: bool,
    pub differences: Vec<String>,
    pub warnings: Vec<String>,
}

/// Detects divergence between a legacy snapshot and the CRDT-backed store.
pub struct DataValidator;

impl DataValidator {
    /// Compare the whole project. Legacy pages are matched to CRDT pages by
    /// title; page content is compared positionally.
    pub async fn validate_project<P: DocumentProvider>(
        legacy: &LegacyProject,
        manager: &ProjectManager<P>,
        options: &ValidationOptions,
    ) -> ProjectValidationResult {
        let mut errors = Vec::new();
        let mut warnings = Vec::new();

        let yjs_metadata = manager.get_project_metadata();
        let yjs_pages = manager.get_pages();

        let legacy_title = legacy.title.clone();
        let yjs_title = yjs_metadata.map(|m| m.title).unwrap_or_default();
        let project_title = FieldComparison::new(legacy_title, yjs_title);
        if options.check_project_title && !project_title.matches {
            errors.push(format!(
                "Project title mismatch: legacy=\"{}\", yjs=\"{}\"",
                project_title.legacy, project_title.yjs
            ));
        }

        let page_count = FieldComparison::new(legacy.items.len(), yjs_pages.len());
        if options.check_page_count && !page_count.matches {
            warnings.push(format!(
                "Page count mismatch: legacy={}, yjs={}",
                page_count.legacy, page_count.yjs
            ));
        }

        let mut pages = Vec::new();
        for legacy_page in &legacy.items {
            match yjs_pages.iter().find(|p| p.title == legacy_page.text) {
                Some(yjs_page) => {
                    let page = Self::validate_page(legacy_page, yjs_page, manager, options).await;
                    // Roll page-level hard errors up into the project list so
                    // the aggregate exposes every error in one place.
                    errors.extend(
                        page.errors
                            .iter()
                            .map(|e| format!("Page \"{}\": {}", page.title.legacy, e)),
                    );
                    warnings.extend(page.warnings.iter().cloned());
                    pages.push(page);
                }
                None => {
                    let message =
                        format!("Yjs page not found for legacy page: \"{}\"", legacy_page.text);
                    errors.push(message.clone());
                    pages.push(PageValidationResult {
                        page_id: legacy_page.id.clone(),
                        is_valid: false,
                        errors: vec![message],
                        warnings: Vec::new(),
                        title: FieldComparison::new(legacy_page.text.clone(), String::new()),
                        item_count: FieldComparison::new(legacy_page.items.len(), 0),
                        items: Vec::new(),
                    });
                }
            }
        }

        // Pages only the CRDT side knows about are soft signals.
        for yjs_page in &yjs_pages {
            if !legacy.items.iter().any(|p| p.text == yjs_page.title) {
                warnings.push(format!(
                    "Legacy page not found for Yjs page: \"{}\"",
                    yjs_page.title
                ));
            }
        }

        let is_valid = errors.is_empty();
        ProjectValidationResult {
            is_valid,
            errors,
            warnings,
            project_title,
            page_count,
            pages,
        }
    }

    /// Compare one page: title, item count, then per-item positional diff.
    pub async fn validate_page<P: DocumentProvider>(
        legacy_page: &LegacyItem,
        yjs_page: &PageMetadata,
        manager: &ProjectManager<P>,
        options: &ValidationOptions,
    ) -> PageValidationResult {
        let mut errors = Vec::new();
        let mut warnings = Vec::new();

        let title = FieldComparison::new(legacy_page.text.clone(), yjs_page.title.clone());
        if options.check_page_titles && !title.matches {
            errors.push(format!(
                "Page title mismatch: legacy=\"{}\", yjs=\"{}\"",
                title.legacy, title.yjs
            ));
        }

        let legacy_items = &legacy_page.items;
        let yjs_items = match manager.connect_to_page(&yjs_page.id).await {
            Ok(outline) => page_content_items(&outline, &yjs_page.title),
            Err(e) => {
                warnings.push(format!("Could not get Yjs page items: {e}"));
                Vec::new()
            }
        };

        let item_count = FieldComparison::new(legacy_items.len(), yjs_items.len());
        if options.check_item_counts && !item_count.matches {
            warnings.push(format!(
                "Item count mismatch for page \"{}\": legacy={}, yjs={}",
                title.legacy, item_count.legacy, item_count.yjs
            ));
        }

        let max_len = legacy_items.len().max(yjs_items.len());
        let mut items = Vec::with_capacity(max_len);
        for index in 0..max_len {
            let comparison =
                Self::compare_items(index, legacy_items.get(index), yjs_items.get(index));
            if !comparison.matches {
                for difference in &comparison.differences {
                    errors.push(format!("Item {index}: {difference}"));
                }
            }
            warnings.extend(comparison.warnings.iter().cloned());
            items.push(comparison);
        }

        let is_valid = errors.is_empty();
        PageValidationResult {
            page_id: yjs_page.id.clone(),
            is_valid,
            errors,
            warnings,
            title,
            item_count,
            items,
        }
    }

    /// Compare one item slot across representations.
    fn compare_items(
        index: usize,
        legacy: Option<&LegacyItem>,
        yjs: Option<&ItemRecord>,
    ) -> ItemValidationResult {
        let mut differences = Vec::new();
        let mut warnings = Vec::new();

        if legacy.is_none() && yjs.is_some() {
            differences.push(format!("Legacy item missing at index {index}"));
        }
        if yjs.is_none() && legacy.is_some() {
            differences.push(format!("Yjs item missing at index {index}"));
        }

        if let (Some(legacy_item), Some(yjs_item)) = (legacy, yjs) {
            if legacy_item.text != yjs_item.text {
                differences.push(format!(
                    "Text mismatch: legacy=\"{}\", yjs=\"{}\"",
                    legacy_item.text, yjs_item.text
                ));
            }
            if legacy_item.id != yjs_item.id {
                warnings.push(format!(
                    "Item {index} id mismatch: legacy=\"{}\", yjs=\"{}\"",
                    legacy_item.id, yjs_item.id
                ));
            }
            if legacy_item.author.as_deref() != Some(yjs_item.author.as_str()) {
                warnings.push(format!("Item {index} author mismatch"));
            }
            if legacy_item.created != Some(yjs_item.created) {
                warnings.push(format!("Item {index} created time mismatch"));
            }
            if legacy_item.last_changed != Some(yjs_item.last_changed) {
                warnings.push(format!("Item {index} last changed time mismatch"));
            }
        }

        ItemValidationResult {
            index,
            legacy: legacy.map(ItemSide::from_legacy),
            yjs: yjs.map(ItemSide::from_record),
            matches: differences.is_empty(),
            differences,
            warnings,
        }
    }

    /// Pretty-print a result at the appropriate levels.
    pub fn log_validation_result(result: &ProjectValidationResult) {
        if result.is_valid {
            tracing::info!("data validation passed");
        } else {
            tracing::warn!("data validation failed");
            for error in &result.errors {
                tracing::error!(%error, "validation error");
            }
        }
        for warning in &result.warnings {
            tracing::warn!(%warning, "validation warning");
        }
        tracing::info!(
            title_matches = result.project_title.matches,
            page_count_legacy = result.page_count.legacy,
            page_count_yjs = result.page_count.yjs,
            "project comparison"
        );
        for page in &result.pages {
            tracing::info!(
                page = %page.title.legacy,
                valid = page.is_valid,
                mismatched_items = page.items.iter().filter(|i| !i.matches).count(),
                "page comparison"
            );
            for item in page.items.iter().filter(|i| !i.matches) {
                tracing::warn!(
                    index = item.index,
                    differences = %item.differences.join(", "),
                    "item mismatch"
                );
            }
        }
    }
}
