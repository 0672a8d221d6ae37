//! Azure OpenAI chat completion provider.
//!
//! Talks to a single model deployment:
//! `POST {endpoint}/openai/deployments/{deployment}/chat/completions?api-version=...`
//! authenticated with the resource's `api-key` header.
//!
//! Only non-streaming completions are used. Every returned choice is kept.

use async_trait::async_trait;
use docchat_config::ChatConfig;
use docchat_core::error::ProviderError;
use docchat_core::message::{Message, Role};
use docchat_core::provider::*;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

/// An Azure OpenAI deployment used as the chat completion collaborator.
pub struct AzureOpenAiProvider {
    endpoint: String,
    deployment: String,
    api_version: String,
    api_key: String,
    client: reqwest::Client,
}

impl AzureOpenAiProvider {
    /// Create a provider for one deployment.
    pub fn new(
        endpoint: impl Into<String>,
        deployment: impl Into<String>,
        api_version: impl Into<String>,
        api_key: impl Into<String>,
        timeout_secs: u64,
    ) -> Result<Self, ProviderError> {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(timeout_secs))
            .build()
            .map_err(|e| ProviderError::NotConfigured(format!("HTTP client: {e}")))?;

        Ok(Self {
            endpoint: endpoint.into().trim_end_matches('/').to_string(),
            deployment: deployment.into(),
            api_version: api_version.into(),
            api_key: api_key.into(),
            client,
        })
    }

    /// Build from the `[chat]` config section.
    pub fn from_config(config: &ChatConfig) -> Result<Self, ProviderError> {
        let endpoint = config.endpoint.as_deref().ok_or_else(|| {
            ProviderError::NotConfigured("set chat.endpoint or AZURE_OPENAI_ENDPOINT".into())
        })?;
        let api_key = config.api_key.as_deref().ok_or_else(|| {
            ProviderError::NotConfigured("set chat.api_key or AZURE_OPENAI_API_KEY".into())
        })?;

        Self::new(
            endpoint,
            &config.deployment,
            &config.api_version,
            api_key,
            config.timeout_secs,
        )
    }

    fn completions_url(&self) -> String {
        format!(
            "{}/openai/deployments/{}/chat/completions",
            self.endpoint, self.deployment
        )
    }

    /// Convert our Message types to the wire format.
    fn to_api_messages(messages: &[Message]) -> Vec<ApiMessage> {
        messages
            .iter()
            .map(|m| ApiMessage {
                role: m.role.as_str().into(),
                content: Some(m.content.clone()),
            })
            .collect()
    }

    fn map_send_error(e: reqwest::Error) -> ProviderError {
        if e.is_timeout() {
            ProviderError::Timeout(e.to_string())
        } else {
            ProviderError::Network(e.to_string())
        }
    }
}

#[async_trait]
impl docchat_core::Provider for AzureOpenAiProvider {
    fn name(&self) -> &str {
        "azure-openai"
    }

    async fn complete(
        &self,
        payload: PromptPayload,
    ) -> std::result::Result<ProviderResponse, ProviderError> {
        let mut body = serde_json::json!({
            "messages": Self::to_api_messages(&payload.messages),
            "temperature": payload.temperature,
            "stream": false,
        });

        if let Some(max_tokens) = payload.max_tokens {
            body["max_tokens"] = serde_json::json!(max_tokens);
        }

        debug!(
            deployment = %self.deployment,
            messages = payload.messages.len(),
            "Sending completion request"
        );

        let response = self
            .client
            .post(self.completions_url())
            .query(&[("api-version", self.api_version.as_str())])
            .header("api-key", &self.api_key)
            .header("Content-Type", "application/json")
            .json(&body)
            .send()
            .await
            .map_err(Self::map_send_error)?;

        let status = response.status().as_u16();

        if status == 429 {
            let retry_after_secs = response
                .headers()
                .get("retry-after")
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.parse().ok())
                .unwrap_or(5);
            return Err(ProviderError::RateLimited { retry_after_secs });
        }

        if status == 401 || status == 403 {
            return Err(ProviderError::AuthenticationFailed(
                "Invalid API key or insufficient permissions".into(),
            ));
        }

        if status != 200 {
            let error_body = response.text().await.unwrap_or_default();
            warn!(status, body = %error_body, "Chat completion returned error");
            return Err(ProviderError::ApiError {
                status_code: status,
                message: error_body,
            });
        }

        let api_response: ApiResponse =
            response.json().await.map_err(|e| ProviderError::ApiError {
                status_code: 200,
                message: format!("Failed to parse response: {e}"),
            })?;

        if api_response.choices.is_empty() {
            return Err(ProviderError::ApiError {
                status_code: 200,
                message: "No choices in response".into(),
            });
        }

        let choices = api_response
            .choices
            .into_iter()
            .map(|c| Choice {
                message: Message {
                    id: uuid::Uuid::new_v4().to_string(),
                    role: Role::Assistant,
                    content: c.message.content.unwrap_or_default(),
                    timestamp: chrono::Utc::now(),
                },
                finish_reason: c.finish_reason,
            })
            .collect();

        let usage = api_response.usage.map(|u| Usage {
            prompt_tokens: u.prompt_tokens,
            completion_tokens: u.completion_tokens,
            total_tokens: u.total_tokens,
        });

        Ok(ProviderResponse {
            choices,
            usage,
            model: api_response.model.unwrap_or_else(|| self.deployment.clone()),
        })
    }

    async fn health_check(&self) -> std::result::Result<bool, ProviderError> {
        let url = format!("{}/openai/models", self.endpoint);
        let response = self
            .client
            .get(&url)
            .query(&[("api-version", self.api_version.as_str())])
            .header("api-key", &self.api_key)
            .send()
            .await
            .map_err(Self::map_send_error)?;

        Ok(response.status().is_success())
    }
}

// --- Azure OpenAI API types (internal) ---

#[derive(Debug, Serialize, Deserialize)]
struct ApiMessage {
    role: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ApiResponse {
    #[serde(default)]
    model: Option<String>,
    #[serde(default)]
    choices: Vec<ApiChoice>,
    usage: Option<ApiUsage>,
}

#[derive(Debug, Deserialize)]
struct ApiChoice {
    message: ApiMessage,
    #[serde(default)]
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ApiUsage {
    prompt_tokens: u32,
    completion_tokens: u32,
    total_tokens: u32,
}
