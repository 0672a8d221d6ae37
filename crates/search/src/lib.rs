//! Search index backends for DocChat.
//!
//! - [`AzureSearchIndex`]: Azure AI Search over REST
//! - [`InMemoryIndex`]: keyword matching over a Vec, for tests and offline runs

pub mod azure;
pub mod in_memory;

pub use azure::AzureSearchIndex;
pub use in_memory::InMemoryIndex;

use docchat_config::AppConfig;
use docchat_core::SearchIndex;
use docchat_core::error::SearchError;
use std::sync::Arc;

/// Build the configured search index.
pub fn build_from_config(config: &AppConfig) -> Result<Arc<dyn SearchIndex>, SearchError> {
    Ok(Arc::new(AzureSearchIndex::from_config(&config.search)?))
}
