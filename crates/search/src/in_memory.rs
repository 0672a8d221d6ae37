//! In-memory index, useful for testing and offline runs.

use async_trait::async_trait;
use docchat_core::error::SearchError;
use docchat_core::search::{SearchHit, SearchIndex, SearchQuery, SearchRecord};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

/// Most highlight fragments returned per field.
const MAX_FRAGMENTS: usize = 5;

/// An index that keeps records in a Vec in insertion order.
///
/// Matching is case-insensitive keyword search over `content` and `title`.
/// A hit matches when any query term occurs; `*` or an empty query
/// matches everything. Highlight fragments are the sentences of a field
/// that contain a query term. Only `section eq '...'` filters are understood.
pub struct InMemoryIndex {
    records: Arc<RwLock<Vec<SearchRecord>>>,
}

impl InMemoryIndex {
    pub fn new() -> Self {
        Self {
            records: Arc::new(RwLock::new(Vec::new())),
        }
    }

    pub async fn count(&self) -> usize {
        self.records.read().await.len()
    }
}

impl Default for InMemoryIndex {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SearchIndex for InMemoryIndex {
    fn name(&self) -> &str {
        "in_memory"
    }

    async fn query(&self, query: SearchQuery) -> Result<Vec<SearchHit>, SearchError> {
        let section = query.filter.as_deref().map(parse_section_filter).transpose()?;
        let terms: Vec<String> = query
            .text
            .split_whitespace()
            .filter(|t| *t != "*")
            .map(str::to_lowercase)
            .collect();

        let records = self.records.read().await;
        let mut results: Vec<SearchHit> = records
            .iter()
            .filter(|r| section.as_deref().is_none_or(|s| r.section == s))
            .filter_map(|r| {
                let score = if terms.is_empty() {
                    1.0
                } else {
                    keyword_score(r, &terms)
                };
                (score > 0.0).then(|| to_hit(r, &query, &terms, score))
            })
            .collect();

        results.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
        results.truncate(query.top);

        Ok(results)
    }

    async fn upsert(&self, records: Vec<SearchRecord>) -> Result<(), SearchError> {
        let mut stored = self.records.write().await;
        for record in records {
            match stored.iter_mut().find(|r| r.id == record.id) {
                Some(existing) => *existing = record,
                None => stored.push(record),
            }
        }
        Ok(())
    }

    async fn delete(&self, ids: Vec<String>) -> Result<(), SearchError> {
        self.records.write().await.retain(|r| !ids.contains(&r.id));
        Ok(())
    }

    async fn list_all(&self, fields: &[&str]) -> Result<Vec<SearchHit>, SearchError> {
        let query = SearchQuery::new("*", usize::MAX).select(fields);
        let records = self.records.read().await;
        Ok(records.iter().map(|r| to_hit(r, &query, &[], 1.0)).collect())
    }
}

/// Extract the tag from `section eq 'tag'`, undoubling quotes.
fn parse_section_filter(filter: &str) -> Result<String, SearchError> {
    let unsupported = || SearchError::ApiError {
        status_code: 400,
        message: format!("Unsupported filter: {filter}"),
    };

    let value = filter
        .trim()
        .strip_prefix("section eq ")
        .ok_or_else(unsupported)?
        .trim();
    let inner = value
        .strip_prefix('\'')
        .and_then(|v| v.strip_suffix('\''))
        .ok_or_else(unsupported)?;

    Ok(inner.replace("''", "'"))
}

/// Term occurrences per hundred characters, in the manner of a crude tf score.
fn keyword_score(record: &SearchRecord, terms: &[String]) -> f64 {
    let haystack = format!("{} {}", record.title, record.content).to_lowercase();
    let occurrences: usize = terms.iter().map(|t| haystack.matches(t.as_str()).count()).sum();
    occurrences as f64 / (haystack.len() as f64 / 100.0).max(1.0)
}

fn to_hit(record: &SearchRecord, query: &SearchQuery, terms: &[String], score: f64) -> SearchHit {
    let pick = |field: &str, value: &str| query.selects(field).then(|| value.to_string());

    let mut highlights = HashMap::new();
    if !terms.is_empty() {
        for field in &query.highlight_fields {
            let text = match field.as_str() {
                "content" => &record.content,
                "title" => &record.title,
                _ => continue,
            };
            let fragments = matching_sentences(text, terms);
            if !fragments.is_empty() {
                highlights.insert(field.clone(), fragments);
            }
        }
    }

    SearchHit {
        id: pick("id", &record.id),
        content: pick("content", &record.content),
        title: pick("title", &record.title),
        section: pick("section", &record.section),
        page_number: query.selects("page_number").then_some(record.page_number),
        score,
        highlights,
    }
}

fn matching_sentences(text: &str, terms: &[String]) -> Vec<String> {
    text.split_inclusive(['.', '!', '?', '\n'])
        .map(str::trim)
        .filter(|s| {
            let lower = s.to_lowercase();
            !s.is_empty() && terms.iter().any(|t| lower.contains(t.as_str()))
        })
        .take(MAX_FRAGMENTS)
        .map(String::from)
        .collect()
}
