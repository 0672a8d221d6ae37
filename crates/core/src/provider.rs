//! Provider trait: the abstraction over the chat completion service.
//!
//! A Provider takes a fully assembled [`PromptPayload`] and returns the
//! model's choices in a single round trip. Streaming is not part of the
//! contract.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use crate::error::ProviderError;
use crate::message::Message;

/// Everything submitted in one chat completion call.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PromptPayload {
    /// The model or deployment to use (e.g., "gpt-35-turbo")
    pub model: String,

    /// The ordered messages: system message, recent history, context, query
    pub messages: Vec<Message>,

    /// Temperature (0.0 = deterministic, 1.0 = creative)
    #[serde(default = "default_temperature")]
    pub temperature: f32,

    /// Maximum tokens to generate
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
}

fn default_temperature() -> f32 {
    0.7
}

/// One candidate answer returned by the model.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Choice {
    /// The generated message (role is always assistant)
    pub message: Message,

    /// Why generation stopped ("stop", "length", ...)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub finish_reason: Option<String>,
}

/// A complete (non-streaming) response from a provider.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderResponse {
    /// Returned choices, usually exactly one
    pub choices: Vec<Choice>,

    /// Token usage statistics
    pub usage: Option<Usage>,

    /// Which model actually responded (may differ from requested)
    pub model: String,
}

/// Token usage information.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Usage {
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
    pub total_tokens: u32,
}

/// The chat completion collaborator.
///
/// The chat loop calls `complete()` without knowing which service is behind
/// it; tests plug in scripted implementations.
#[async_trait]
pub trait Provider: Send + Sync {
    /// A human-readable name for this provider (e.g., "azure-openai").
    fn name(&self) -> &str;

    /// Send a payload and get every choice back.
    async fn complete(&self, payload: PromptPayload) -> std::result::Result<ProviderResponse, ProviderError>;

    /// Health check: can we reach the provider?
    async fn health_check(&self) -> std::result::Result<bool, ProviderError> {
        Ok(true)
    }
}
