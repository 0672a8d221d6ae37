//! Prompt assembly.
//!
//! Message order in every payload:
//!
//! 1. the conversation's system message (index 0, unmodified)
//! 2. the last `history_window` messages after it
//! 3. a system message with answering instructions and the retrieved context
//! 4. the user's query

use docchat_config::AppConfig;
use docchat_core::message::{Conversation, Message};
use docchat_core::provider::PromptPayload;
use tracing::debug;

use crate::retriever::Retriever;

/// Instructions placed ahead of the retrieved context.
pub const CONTEXT_INSTRUCTIONS: &str = "Answer the user's question using the context below. \
When you rely on a passage, cite it as [Page N]. \
If the context does not contain the answer, say so.";

/// The synthesized context message. The `Context:` section is present
/// even when `context` is empty.
pub fn context_message(context: &str) -> Message {
    Message::system(format!("{CONTEXT_INSTRUCTIONS}\n\nContext:\n{context}"))
}

pub struct PromptAssembler {
    retriever: Retriever,
    model: String,
    temperature: f32,
    max_tokens: u32,
    history_window: usize,
}

impl PromptAssembler {
    pub fn new(retriever: Retriever, model: impl Into<String>) -> Self {
        let defaults = AppConfig::default();
        Self {
            retriever,
            model: model.into(),
            temperature: defaults.chat.temperature,
            max_tokens: defaults.chat.max_tokens,
            history_window: defaults.session.history_window,
        }
    }

    pub fn from_config(retriever: Retriever, config: &AppConfig) -> Self {
        Self {
            retriever,
            model: config.chat.deployment.clone(),
            temperature: config.chat.temperature,
            max_tokens: config.chat.max_tokens,
            history_window: config.session.history_window,
        }
    }

    pub fn with_history_window(mut self, window: usize) -> Self {
        self.history_window = window;
        self
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    pub fn history_window(&self) -> usize {
        self.history_window
    }

    /// Build the payload for `query` against `history`.
    ///
    /// `history` is read, never modified. Retrieval errors propagate.
    pub async fn assemble(
        &self,
        query: &str,
        history: &Conversation,
    ) -> docchat_core::Result<PromptPayload> {
        let context = self.retriever.retrieve(query).await?;
        let recent = history.recent(self.history_window);

        let mut messages = Vec::with_capacity(recent.len() + 3);
        messages.push(history.system_message().clone());
        messages.extend_from_slice(recent);
        messages.push(context_message(&context));
        messages.push(Message::user(query));

        debug!(
            history = recent.len(),
            context_chars = context.len(),
            "Assembled prompt"
        );

        Ok(PromptPayload {
            model: self.model.clone(),
            messages,
            temperature: self.temperature,
            max_tokens: Some(self.max_tokens),
        })
    }
}
