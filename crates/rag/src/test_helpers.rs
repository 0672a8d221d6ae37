//! Shared test doubles for the RAG pipeline.

use async_trait::async_trait;
use docchat_core::error::{ProviderError, SearchError};
use docchat_core::message::Message;
use docchat_core::provider::{Choice, PromptPayload, Provider, ProviderResponse, Usage};
use docchat_core::search::{SearchHit, SearchIndex, SearchQuery, SearchRecord};
use std::collections::VecDeque;
use std::sync::Mutex;

/// A provider that replays scripted results and records every payload.
///
/// Once the script runs out it keeps answering with `fallback`, or panics
/// when no fallback was set.
pub struct ScriptedProvider {
    script: Mutex<VecDeque<Result<ProviderResponse, ProviderError>>>,
    fallback: Option<String>,
    payloads: Mutex<Vec<PromptPayload>>,
}

impl ScriptedProvider {
    pub fn new(script: Vec<Result<ProviderResponse, ProviderError>>) -> Self {
        Self {
            script: Mutex::new(script.into()),
            fallback: None,
            payloads: Mutex::new(Vec::new()),
        }
    }

    /// Answer every call with `text`.
    pub fn always(text: &str) -> Self {
        Self {
            fallback: Some(text.into()),
            ..Self::new(vec![])
        }
    }

    pub fn call_count(&self) -> usize {
        self.payloads.lock().unwrap().len()
    }

    pub fn payloads(&self) -> Vec<PromptPayload> {
        self.payloads.lock().unwrap().clone()
    }
}

#[async_trait]
impl Provider for ScriptedProvider {
    fn name(&self) -> &str {
        "scripted_mock"
    }

    async fn complete(&self, payload: PromptPayload) -> Result<ProviderResponse, ProviderError> {
        let call = {
            let mut payloads = self.payloads.lock().unwrap();
            payloads.push(payload);
            payloads.len()
        };

        match self.script.lock().unwrap().pop_front() {
            Some(result) => result,
            None => match &self.fallback {
                Some(text) => Ok(make_text_response(text)),
                None => panic!("ScriptedProvider: no more responses (call #{call})"),
            },
        }
    }
}

/// A one-choice response.
pub fn make_text_response(text: &str) -> ProviderResponse {
    make_multi_response(&[text])
}

/// A response carrying one choice per entry.
pub fn make_multi_response(texts: &[&str]) -> ProviderResponse {
    ProviderResponse {
        choices: texts
            .iter()
            .map(|t| Choice {
                message: Message::assistant(*t),
                finish_reason: Some("stop".into()),
            })
            .collect(),
        usage: Some(Usage {
            prompt_tokens: 10,
            completion_tokens: 5,
            total_tokens: 15,
        }),
        model: "mock-model".into(),
    }
}

/// An index that answers every query with the same hits and records
/// what it was asked. Deletes are recorded per batch; `fail_delete_at`
/// makes the n-th (1-based) delete call fail. `unavailable` fails every query.
pub struct StaticIndex {
    hits: Vec<SearchHit>,
    listing: Vec<SearchHit>,
    fail_delete_at: Option<usize>,
    fail_queries: bool,
    pub queries: Mutex<Vec<SearchQuery>>,
    pub delete_batches: Mutex<Vec<Vec<String>>>,
}

impl StaticIndex {
    pub fn new(hits: Vec<SearchHit>) -> Self {
        Self {
            hits,
            listing: Vec::new(),
            fail_delete_at: None,
            fail_queries: false,
            queries: Mutex::new(Vec::new()),
            delete_batches: Mutex::new(Vec::new()),
        }
    }

    /// An index whose `list_all` returns `count` ids.
    pub fn with_documents(count: usize) -> Self {
        let listing = (0..count)
            .map(|i| SearchHit {
                id: Some(format!("doc-{i}")),
                ..SearchHit::default()
            })
            .collect();
        Self {
            listing,
            ..Self::new(vec![])
        }
    }

    pub fn failing_delete_at(mut self, call: usize) -> Self {
        self.fail_delete_at = Some(call);
        self
    }

    pub fn unavailable() -> Self {
        Self {
            fail_queries: true,
            ..Self::new(vec![])
        }
    }

    pub fn batch_sizes(&self) -> Vec<usize> {
        self.delete_batches.lock().unwrap().iter().map(Vec::len).collect()
    }
}

#[async_trait]
impl SearchIndex for StaticIndex {
    fn name(&self) -> &str {
        "static_mock"
    }

    async fn query(&self, query: SearchQuery) -> Result<Vec<SearchHit>, SearchError> {
        let top = query.top;
        self.queries.lock().unwrap().push(query);
        if self.fail_queries {
            return Err(SearchError::ApiError {
                status_code: 503,
                message: "Service unavailable".into(),
            });
        }
        Ok(self.hits.iter().take(top).cloned().collect())
    }

    async fn upsert(&self, _records: Vec<SearchRecord>) -> Result<(), SearchError> {
        Ok(())
    }

    async fn delete(&self, ids: Vec<String>) -> Result<(), SearchError> {
        let mut batches = self.delete_batches.lock().unwrap();
        if self.fail_delete_at == Some(batches.len() + 1) {
            return Err(SearchError::ApiError {
                status_code: 503,
                message: "Service unavailable".into(),
            });
        }
        batches.push(ids);
        Ok(())
    }

    async fn list_all(&self, _fields: &[&str]) -> Result<Vec<SearchHit>, SearchError> {
        Ok(self.listing.clone())
    }
}

/// A hit as the retriever selects it: content, title and page only.
pub fn hit(title: &str, page: u32, content: &str) -> SearchHit {
    SearchHit {
        content: Some(content.into()),
        title: Some(title.into()),
        page_number: Some(page),
        score: 1.0,
        ..SearchHit::default()
    }
}
