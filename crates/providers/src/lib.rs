//! Chat completion providers for docchat.
//!
//! All providers implement the `docchat_core::Provider` trait.

pub mod azure_openai;

use std::sync::Arc;

use docchat_config::AppConfig;
use docchat_core::error::ProviderError;
use docchat_core::provider::Provider;

pub use azure_openai::AzureOpenAiProvider;

/// Build the configured chat provider.
pub fn build_from_config(config: &AppConfig) -> Result<Arc<dyn Provider>, ProviderError> {
    let provider = AzureOpenAiProvider::from_config(&config.chat)?;
    tracing::debug!(deployment = %config.chat.deployment, "Chat provider ready");
    Ok(Arc::new(provider))
}
