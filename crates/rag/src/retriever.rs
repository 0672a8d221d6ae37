//! Retriever: query → top-K hits → page-annotated context text.
//!
//! The index's relevance order is kept as is. For each hit one excerpt is
//! chosen by [`select_excerpt`], then rendered as
//! `[Page <n>] <title>:\n<excerpt>\n\n`.

use std::sync::Arc;

use docchat_config::RetrievalConfig;
use docchat_core::error::SearchError;
use docchat_core::search::{SearchHit, SearchIndex, SearchQuery};
use tracing::debug;

use crate::snippet::select_excerpt;

/// Fields the retriever reads from each hit.
pub const SELECT_FIELDS: [&str; 3] = ["content", "title", "page_number"];

const HIGHLIGHT_FIELD: &str = "content";

/// One formatted citation block, derived per query and never stored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContextSnippet {
    pub page_number: u32,
    pub title: String,
    pub excerpt: String,
}

impl ContextSnippet {
    fn from_hit(hit: &SearchHit, query: &str, snippet_length: usize) -> Self {
        let content = hit.content.as_deref().unwrap_or_default();
        Self {
            page_number: hit.page_number.unwrap_or(1),
            title: hit.title.clone().unwrap_or_else(|| "Untitled".into()),
            excerpt: select_excerpt(
                content,
                query,
                hit.highlights_for(HIGHLIGHT_FIELD),
                snippet_length,
            ),
        }
    }

    pub fn render(&self) -> String {
        format!("[Page {}] {}:\n{}\n\n", self.page_number, self.title, self.excerpt)
    }
}

/// Concatenate snippets in order; empty input gives `""`.
pub fn format_context(snippets: &[ContextSnippet]) -> String {
    snippets.iter().map(ContextSnippet::render).collect()
}

/// OData filter restricting hits to one section tag.
pub fn section_filter(tag: &str) -> String {
    format!("section eq '{}'", tag.replace('\'', "''"))
}

/// Fetches hits from a [`SearchIndex`] and turns them into context text.
#[derive(Clone)]
pub struct Retriever {
    index: Arc<dyn SearchIndex>,
    top_k: usize,
    snippet_length: usize,
    section: Option<String>,
    highlight: bool,
}

impl Retriever {
    /// A retriever with the default retrieval settings.
    pub fn new(index: Arc<dyn SearchIndex>) -> Self {
        Self::from_config(index, &RetrievalConfig::default())
    }

    pub fn from_config(index: Arc<dyn SearchIndex>, config: &RetrievalConfig) -> Self {
        Self {
            index,
            top_k: config.top_k,
            snippet_length: config.snippet_length,
            section: config.section.clone(),
            highlight: config.highlight,
        }
    }

    pub fn with_top_k(mut self, top_k: usize) -> Self {
        self.top_k = top_k;
        self
    }

    pub fn with_snippet_length(mut self, snippet_length: usize) -> Self {
        self.snippet_length = snippet_length;
        self
    }

    pub fn with_section(mut self, section: impl Into<String>) -> Self {
        self.section = Some(section.into());
        self
    }

    pub fn with_highlight(mut self, highlight: bool) -> Self {
        self.highlight = highlight;
        self
    }

    /// The index query issued for `text`.
    pub fn build_query(&self, text: &str) -> SearchQuery {
        let mut query = SearchQuery::new(text, self.top_k).select(&SELECT_FIELDS);
        if let Some(section) = &self.section {
            query = query.filter(section_filter(section));
        }
        if self.highlight {
            query = query.highlight(&[HIGHLIGHT_FIELD]);
        }
        query
    }

    /// One snippet per hit, in the index's order.
    ///
    /// Blank queries are passed through; the index decides what they match.
    pub async fn retrieve_snippets(&self, query: &str) -> Result<Vec<ContextSnippet>, SearchError> {
        let hits = self.index.query(self.build_query(query)).await?;

        debug!(
            index = self.index.name(),
            hits = hits.len(),
            "Retrieved context hits"
        );

        Ok(hits
            .iter()
            .take(self.top_k)
            .map(|hit| ContextSnippet::from_hit(hit, query, self.snippet_length))
            .collect())
    }

    /// Context text for `query`, or `""` when nothing matched.
    pub async fn retrieve(&self, query: &str) -> Result<String, SearchError> {
        Ok(format_context(&self.retrieve_snippets(query).await?))
    }
}
