//! Search index trait: the document store the retriever reads from.
//!
//! One [`SearchRecord`] is stored per document page. Queries return
//! [`SearchHit`]s in the service's relevance order, carrying only the
//! fields that were selected plus optional highlight fragments.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use crate::error::SearchError;

/// A searchable record, one per document page (or page chunk).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchRecord {
    /// Unique key within the index
    pub id: String,

    /// The page text
    pub content: String,

    /// Document title (file name without extension)
    pub title: String,

    /// Section tag, e.g. "benefits_guide" or "default"
    pub section: String,

    /// 1-based page number
    pub page_number: u32,

    /// When the record was last written
    pub last_modified: DateTime<Utc>,
}

/// A query against the index.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SearchQuery {
    /// Free-text search expression ("*" matches everything)
    pub text: String,

    /// Fields to return; empty means all retrievable fields
    #[serde(default)]
    pub select: Vec<String>,

    /// Maximum number of hits
    pub top: usize,

    /// Optional OData filter expression, e.g. `section eq 'default'`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filter: Option<String>,

    /// Fields to request highlight fragments for
    #[serde(default)]
    pub highlight_fields: Vec<String>,
}

impl SearchQuery {
    /// A query for `text` returning at most `top` hits.
    pub fn new(text: impl Into<String>, top: usize) -> Self {
        Self {
            text: text.into(),
            top,
            ..Self::default()
        }
    }

    pub fn select(mut self, fields: &[&str]) -> Self {
        self.select = fields.iter().map(|f| f.to_string()).collect();
        self
    }

    pub fn filter(mut self, filter: impl Into<String>) -> Self {
        self.filter = Some(filter.into());
        self
    }

    pub fn highlight(mut self, fields: &[&str]) -> Self {
        self.highlight_fields = fields.iter().map(|f| f.to_string()).collect();
        self
    }

    /// Whether `field` should be present in hits.
    pub fn selects(&self, field: &str) -> bool {
        self.select.is_empty() || self.select.iter().any(|f| f == field)
    }
}

/// One result row. Fields are `None` when they were not selected.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SearchHit {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub section: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub page_number: Option<u32>,

    /// Relevance score assigned by the index
    #[serde(default)]
    pub score: f64,

    /// Highlight fragments keyed by field name
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub highlights: HashMap<String, Vec<String>>,
}

impl SearchHit {
    /// Highlight fragments for `field`, empty when none were returned.
    pub fn highlights_for(&self, field: &str) -> &[String] {
        self.highlights.get(field).map(Vec::as_slice).unwrap_or(&[])
    }
}

/// The search index collaborator.
///
/// Implementations: Azure AI Search (REST) and an in-memory index for tests.
#[async_trait]
pub trait SearchIndex: Send + Sync {
    /// The backend name (e.g., "azure-search", "in_memory").
    fn name(&self) -> &str;

    /// Run a query; hits come back in relevance order.
    async fn query(&self, query: SearchQuery) -> std::result::Result<Vec<SearchHit>, SearchError>;

    /// Insert or merge records by id.
    async fn upsert(&self, records: Vec<SearchRecord>) -> std::result::Result<(), SearchError>;

    /// Delete records by id. Unknown ids are ignored.
    async fn delete(&self, ids: Vec<String>) -> std::result::Result<(), SearchError>;

    /// Every record in the index, restricted to `fields`.
    async fn list_all(&self, fields: &[&str]) -> std::result::Result<Vec<SearchHit>, SearchError>;
}
