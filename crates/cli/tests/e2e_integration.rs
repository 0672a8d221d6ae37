//! End-to-end integration tests for the DocChat pipeline.
//!
//! These tests wire the real crates together: documents are ingested into
//! an in-memory index, retrieved into prompts, and answered either by a
//! scripted provider or by the Azure OpenAI adapter pointed at a mock
//! server. The Azure Search adapter is exercised the same way.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use docchat_core::error::ProviderError;
use docchat_core::message::{Conversation, Message, Role};
use docchat_core::provider::{Choice, PromptPayload, Provider, ProviderResponse, Usage};
use docchat_core::search::SearchIndex;
use docchat_providers::AzureOpenAiProvider;
use docchat_rag::{ChatLoop, ExitReason, Indexer, PromptAssembler, Retriever, clear_index};
use docchat_search::{AzureSearchIndex, InMemoryIndex};
use docchat_storage::LocalStore;
use serde_json::{Value, json};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, Request, ResponseTemplate};

const SYSTEM: &str = "You are a helpful assistant.";

// ── Mock Provider ────────────────────────────────────────────────────────

/// Answers every call with a fixed text and keeps each payload.
struct ScriptedProvider {
    answer: String,
    payloads: Mutex<Vec<PromptPayload>>,
}

impl ScriptedProvider {
    fn new(answer: &str) -> Self {
        Self {
            answer: answer.into(),
            payloads: Mutex::new(Vec::new()),
        }
    }

    fn payloads(&self) -> Vec<PromptPayload> {
        self.payloads.lock().unwrap().clone()
    }
}

#[async_trait::async_trait]
impl Provider for ScriptedProvider {
    fn name(&self) -> &str {
        "e2e_mock"
    }

    async fn complete(&self, payload: PromptPayload) -> Result<ProviderResponse, ProviderError> {
        self.payloads.lock().unwrap().push(payload);
        Ok(ProviderResponse {
            choices: vec![Choice {
                message: Message::assistant(&self.answer),
                finish_reason: Some("stop".into()),
            }],
            usage: Some(Usage {
                prompt_tokens: 10,
                completion_tokens: 5,
                total_tokens: 15,
            }),
            model: "mock".into(),
        })
    }
}

// ── Fixtures ─────────────────────────────────────────────────────────────

const HANDBOOK: &str = "Welcome to Turnberry.\x0c\
Benefits overview. Full-time staff vacation days accrue monthly at a fixed rate.\x0c\
Remote work requires manager approval.";

/// Ingest the handbook into a fresh in-memory index.
async fn ingested_index(dir: &tempfile::TempDir) -> Arc<InMemoryIndex> {
    let path = dir.path().join("Benefits.txt");
    std::fs::write(&path, HANDBOOK).unwrap();

    let index = Arc::new(InMemoryIndex::new());
    let store = Arc::new(LocalStore::new(dir.path().join("uploads")));
    let report = Indexer::new(store, index.clone())
        .index_file(&path)
        .await
        .expect("indexing should succeed");
    assert_eq!(report.records, 3);

    index
}

fn lines(input: &[&str]) -> VecDeque<String> {
    input.iter().map(|l| l.to_string()).collect()
}

// ── E2E: ingest → retrieve → chat ────────────────────────────────────────

#[tokio::test]
async fn e2e_ingest_then_chat_cites_the_page() {
    let dir = tempfile::tempdir().unwrap();
    let index = ingested_index(&dir).await;

    let provider = Arc::new(ScriptedProvider::new("You accrue 1.5 days per month [Page 2]."));
    let assembler = PromptAssembler::new(Retriever::new(index), "gpt-35-turbo");
    let mut chat = ChatLoop::new(assembler, provider.clone(), Conversation::new(SYSTEM))
        .with_output(Vec::new());

    let outcome = chat
        .run(&mut lines(&["vacation days", "exit"]))
        .await
        .unwrap();

    assert_eq!(outcome.exit_reason, ExitReason::UserExit);
    assert_eq!(outcome.turns_completed, 1);
    assert_eq!(chat.conversation().len(), 3);

    let payload = &provider.payloads()[0];
    let context = &payload.messages[payload.messages.len() - 2];
    assert!(context.content.contains("[Page 2] Benefits:"));
    assert!(context.content.contains("vacation days accrue monthly"));

    let printed = String::from_utf8(chat.output().clone()).unwrap();
    assert!(printed.contains("\nAssistant: You accrue 1.5 days per month [Page 2].\n"));
}

#[tokio::test]
async fn e2e_long_session_keeps_system_message_first() {
    let dir = tempfile::tempdir().unwrap();
    let index = ingested_index(&dir).await;

    let window = 3;
    let turns = window + 5;
    let provider = Arc::new(ScriptedProvider::new("noted"));
    let assembler =
        PromptAssembler::new(Retriever::new(index), "gpt-35-turbo").with_history_window(window);
    let mut chat = ChatLoop::new(assembler, provider.clone(), Conversation::new(SYSTEM))
        .with_output(Vec::new());

    let questions: Vec<String> = (0..turns).map(|i| format!("remote work question {i}")).collect();
    let mut input: VecDeque<String> = questions.into();
    let outcome = chat.run(&mut input).await.unwrap();

    assert_eq!(outcome.exit_reason, ExitReason::EndOfInput);
    assert_eq!(chat.conversation().len(), 1 + 2 * turns);

    for payload in provider.payloads() {
        assert_eq!(payload.messages[0].role, Role::System);
        assert_eq!(payload.messages[0].content, SYSTEM);
        assert!(payload.messages.len() <= 1 + window + 2);
    }
}

#[tokio::test]
async fn e2e_empty_index_still_sends_a_prompt() {
    let provider = Arc::new(ScriptedProvider::new("I could not find that."));
    let assembler = PromptAssembler::new(Retriever::new(Arc::new(InMemoryIndex::new())), "m");
    let mut chat = ChatLoop::new(assembler, provider.clone(), Conversation::new(SYSTEM))
        .with_output(Vec::new());

    chat.run(&mut lines(&["parking policy"])).await.unwrap();

    let payload = &provider.payloads()[0];
    assert_eq!(payload.messages.len(), 3);
    assert!(payload.messages[1].content.ends_with("Context:\n"));
}

// ── E2E: Azure OpenAI adapter over HTTP ──────────────────────────────────

#[tokio::test]
async fn e2e_chat_through_azure_openai_adapter() {
    let dir = tempfile::tempdir().unwrap();
    let index = ingested_index(&dir).await;

    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/openai/deployments/gpt-35-turbo/chat/completions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "model": "gpt-35-turbo",
            "choices": [{
                "index": 0,
                "message": { "role": "assistant", "content": "1.5 days per month." },
                "finish_reason": "stop"
            }]
        })))
        .expect(2)
        .mount(&server)
        .await;

    let provider: Arc<dyn Provider> = Arc::new(
        AzureOpenAiProvider::new(server.uri(), "gpt-35-turbo", "2024-08-01-preview", "key", 5)
            .unwrap(),
    );
    let assembler = PromptAssembler::new(Retriever::new(index), "gpt-35-turbo");
    let mut chat =
        ChatLoop::new(assembler, provider, Conversation::new(SYSTEM)).with_output(Vec::new());

    let outcome = chat
        .run(&mut lines(&["vacation days", "and remote work?", "EXIT"]))
        .await
        .unwrap();
    assert_eq!(outcome.turns_completed, 2);
    assert_eq!(chat.conversation().len(), 5);

    let requests = server.received_requests().await.unwrap();
    let second: Value = serde_json::from_slice(&requests[1].body).unwrap();
    let messages = second["messages"].as_array().unwrap();
    assert_eq!(messages[0]["content"], SYSTEM);
    assert_eq!(messages[1]["content"], "vacation days");
    assert_eq!(messages[2]["content"], "1.5 days per month.");
    assert_eq!(messages[messages.len() - 1]["content"], "and remote work?");
    assert_eq!(second["max_tokens"], 800);
}

#[tokio::test]
async fn e2e_exit_issues_no_completion() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let provider: Arc<dyn Provider> = Arc::new(
        AzureOpenAiProvider::new(server.uri(), "gpt-35-turbo", "2024-08-01-preview", "key", 5)
            .unwrap(),
    );
    let assembler = PromptAssembler::new(Retriever::new(Arc::new(InMemoryIndex::new())), "m");
    let mut chat =
        ChatLoop::new(assembler, provider, Conversation::new(SYSTEM)).with_output(Vec::new());

    let outcome = chat.run(&mut lines(&["Exit"])).await.unwrap();
    assert_eq!(outcome.exit_reason, ExitReason::UserExit);
    assert_eq!(chat.conversation().len(), 1);
}

// ── E2E: maintenance against the Azure Search adapter ────────────────────

#[tokio::test]
async fn e2e_clear_index_deletes_in_two_batches() {
    const DOCS: usize = 1500;
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/indexes/turnberry-documents/docs/search"))
        .respond_with(|req: &Request| {
            let body: Value = serde_json::from_slice(&req.body).unwrap();
            let skip = body["skip"].as_u64().unwrap_or(0) as usize;
            let top = body["top"].as_u64().unwrap() as usize;
            let value: Vec<Value> = (skip..DOCS.min(skip + top))
                .map(|i| json!({ "@search.score": 1.0, "id": format!("doc-{i}") }))
                .collect();
            ResponseTemplate::new(200).set_body_json(json!({ "value": value }))
        })
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path("/indexes/turnberry-documents/docs/index"))
        .respond_with(|req: &Request| {
            let body: Value = serde_json::from_slice(&req.body).unwrap();
            let value: Vec<Value> = body["value"]
                .as_array()
                .unwrap()
                .iter()
                .map(|doc| json!({ "key": doc["id"], "status": true, "statusCode": 200 }))
                .collect();
            ResponseTemplate::new(200).set_body_json(json!({ "value": value }))
        })
        .expect(2)
        .mount(&server)
        .await;

    let index = AzureSearchIndex::new(server.uri(), "turnberry-documents", "key").unwrap();
    let report = clear_index(&index, 1000).await.unwrap();
    assert_eq!(report.documents, DOCS);
    assert_eq!(report.batches, 2);

    let requests = server.received_requests().await.unwrap();
    let batch_sizes: Vec<usize> = requests
        .iter()
        .filter(|r| r.url.path().ends_with("/docs/index"))
        .map(|r| {
            let body: Value = serde_json::from_slice(&r.body).unwrap();
            let actions = body["value"].as_array().unwrap();
            assert!(actions.iter().all(|a| a["@search.action"] == "delete"));
            actions.len()
        })
        .collect();
    assert_eq!(batch_sizes, vec![1000, 500]);
}

#[tokio::test]
async fn e2e_clear_index_stops_on_rejected_batch() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/indexes/turnberry-documents/docs/search"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "value": [{ "id": "a" }, { "id": "b" }]
        })))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/indexes/turnberry-documents/docs/index"))
        .respond_with(ResponseTemplate::new(207).set_body_json(json!({
            "value": [{ "key": "a", "status": false, "errorMessage": "Document is locked", "statusCode": 409 }]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let index = AzureSearchIndex::new(server.uri(), "turnberry-documents", "key").unwrap();
    let err = clear_index(&index, 1).await.unwrap_err();
    assert!(err.to_string().contains("Document is locked"));
}

// ── E2E: ingestion errors ────────────────────────────────────────────────

#[tokio::test]
async fn e2e_missing_file_reports_not_found() {
    let dir = tempfile::tempdir().unwrap();
    let index = Arc::new(InMemoryIndex::new());
    let store = Arc::new(LocalStore::new(dir.path()));
    let indexer = Indexer::new(store, index.clone());

    let missing = dir.path().join("handbook.pdf");
    let err = indexer.index_file(&missing).await.unwrap_err();
    assert_eq!(err.to_string(), format!("File not found: {}", missing.display()));
    assert!(index.list_all(&["id"]).await.unwrap().is_empty());
}
