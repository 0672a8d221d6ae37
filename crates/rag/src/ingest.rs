//! Document ingestion: upload the raw file, split it into page records,
//! and merge them into the index.
//!
//! Re-indexing a file replaces its records: ids from an earlier version
//! that the new version no longer produces are deleted after the merge.

use std::path::Path;
use std::sync::Arc;

use chrono::Utc;
use docchat_config::IngestConfig;
use docchat_core::error::Error;
use docchat_core::search::{SearchIndex, SearchRecord};
use docchat_core::storage::ObjectStore;
use tracing::{info, warn};

use crate::maintenance::MAX_DELETE_BATCH;

/// Separates pages in extracted document text.
pub const PAGE_BREAK: char = '\x0c';

/// Outcome of indexing one file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexReport {
    /// Name the object store kept the upload under
    pub stored_name: String,
    /// Non-empty pages found
    pub pages: usize,
    /// Records merged into the index
    pub records: usize,
    /// Records of an earlier version that were deleted
    pub removed: usize,
}

pub struct Indexer {
    store: Arc<dyn ObjectStore>,
    index: Arc<dyn SearchIndex>,
    section: String,
    chunk_chars: usize,
}

impl Indexer {
    pub fn new(store: Arc<dyn ObjectStore>, index: Arc<dyn SearchIndex>) -> Self {
        Self::from_config(store, index, &IngestConfig::default())
    }

    pub fn from_config(
        store: Arc<dyn ObjectStore>,
        index: Arc<dyn SearchIndex>,
        config: &IngestConfig,
    ) -> Self {
        Self {
            store,
            index,
            section: config.section.clone(),
            chunk_chars: config.chunk_chars,
        }
    }

    pub fn with_section(mut self, section: impl Into<String>) -> Self {
        self.section = section.into();
        self
    }

    pub fn with_chunk_chars(mut self, chunk_chars: usize) -> Self {
        self.chunk_chars = chunk_chars;
        self
    }

    /// Upload `path` and index its text.
    pub async fn index_file(&self, path: &Path) -> docchat_core::Result<IndexReport> {
        let is_file = tokio::fs::metadata(path)
            .await
            .map(|m| m.is_file())
            .unwrap_or(false);
        if !is_file {
            return Err(Error::Input(format!("File not found: {}", path.display())));
        }

        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .ok_or_else(|| Error::Input(format!("Not a file path: {}", path.display())))?;
        let title = path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| file_name.clone());

        let bytes = tokio::fs::read(path).await?;
        let content = std::str::from_utf8(&bytes)
            .map_err(|_| Error::Input(format!("{} is not valid UTF-8 text", path.display())))?
            .to_string();

        let stored_name = self.store.put(&file_name, bytes).await?;
        info!(store = self.store.name(), name = %stored_name, "Uploaded document");

        let pages = split_pages(&content);
        let records = self.build_records(&stored_name, &title, &pages);
        if records.is_empty() {
            warn!(name = %stored_name, "Document has no text to index");
        }

        let current: Vec<String> = records.iter().map(|r| r.id.clone()).collect();
        let page_count = pages.len();
        let record_count = records.len();

        self.index.upsert(records).await?;
        let removed = self
            .remove_stale(&document_id(&stored_name), &title, &current)
            .await?;

        let report = IndexReport {
            stored_name,
            pages: page_count,
            records: record_count,
            removed,
        };
        info!(
            name = %report.stored_name,
            pages = report.pages,
            records = report.records,
            removed = report.removed,
            "Indexed document"
        );

        Ok(report)
    }

    /// Delete this document's records whose ids are not in `current`.
    async fn remove_stale(
        &self,
        base_id: &str,
        title: &str,
        current: &[String],
    ) -> docchat_core::Result<usize> {
        let stale: Vec<String> = self
            .index
            .list_all(&["id", "title"])
            .await?
            .into_iter()
            .filter(|hit| hit.title.as_deref() == Some(title))
            .filter_map(|hit| hit.id)
            .filter(|id| is_record_of(id, base_id) && !current.contains(id))
            .collect();

        for batch in stale.chunks(MAX_DELETE_BATCH) {
            self.index.delete(batch.to_vec()).await?;
        }
        if !stale.is_empty() {
            info!(document = base_id, removed = stale.len(), "Removed stale records");
        }
        Ok(stale.len())
    }

    /// One record per page, or per chunk when chunking is enabled.
    pub fn build_records(
        &self,
        stored_name: &str,
        title: &str,
        pages: &[(u32, &str)],
    ) -> Vec<SearchRecord> {
        let pieces: Vec<(u32, String)> = pages
            .iter()
            .flat_map(|&(page, text)| {
                chunk_text(text, self.chunk_chars)
                    .into_iter()
                    .map(move |chunk| (page, chunk))
            })
            .collect();

        let base_id = document_id(stored_name);
        let numbered = pieces.len() > 1;
        let now = Utc::now();

        pieces
            .into_iter()
            .enumerate()
            .map(|(i, (page_number, content))| SearchRecord {
                id: if numbered {
                    format!("{base_id}_{}", i + 1)
                } else {
                    base_id.clone()
                },
                content,
                title: title.to_string(),
                section: self.section.clone(),
                page_number,
                last_modified: now,
            })
            .collect()
    }
}

/// Index key for a stored name: anything outside `[A-Za-z0-9_\-=]` becomes `_`.
pub fn document_id(stored_name: &str) -> String {
    stored_name
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '=') {
                c
            } else {
                '_'
            }
        })
        .collect()
}

/// True for `base_id` itself and `base_id` followed by `_<n>`.
fn is_record_of(id: &str, base_id: &str) -> bool {
    match id.strip_prefix(base_id) {
        Some("") => true,
        Some(rest) => rest
            .strip_prefix('_')
            .is_some_and(|n| !n.is_empty() && n.bytes().all(|b| b.is_ascii_digit())),
        None => false,
    }
}

/// Non-empty pages with their 1-based physical page numbers.
pub fn split_pages(content: &str) -> Vec<(u32, &str)> {
    content
        .split(PAGE_BREAK)
        .zip(1u32..)
        .filter(|(text, _)| !text.trim().is_empty())
        .map(|(text, page)| (page, text))
        .collect()
}

/// Split into pieces of at most `max_chars` chars; `0` keeps the text whole.
fn chunk_text(text: &str, max_chars: usize) -> Vec<String> {
    if max_chars == 0 {
        return vec![text.to_string()];
    }
    let chars: Vec<char> = text.chars().collect();
    chars
        .chunks(max_chars)
        .map(|c| c.iter().collect::<String>())
        .filter(|c| !c.trim().is_empty())
        .collect()
}
