//! Object storage backends for DocChat.
//!
//! Source documents are uploaded here before their text is indexed.

pub mod azure_blob;
pub mod local;

pub use azure_blob::AzureBlobStore;
pub use local::LocalStore;

use docchat_config::AppConfig;
use docchat_core::ObjectStore;
use docchat_core::error::StorageError;
use std::sync::Arc;

/// Build the configured object store (`storage.backend`).
pub fn build_from_config(config: &AppConfig) -> Result<Arc<dyn ObjectStore>, StorageError> {
    match config.storage.backend.as_str() {
        "azure" => Ok(Arc::new(AzureBlobStore::from_config(&config.storage)?)),
        "local" => {
            let dir = config
                .storage
                .local_dir
                .clone()
                .map(std::path::PathBuf::from)
                .unwrap_or_else(|| AppConfig::config_dir().join("uploads"));
            Ok(Arc::new(LocalStore::new(dir)))
        }
        other => Err(StorageError::NotConfigured(format!(
            "unknown storage backend '{other}' (expected 'azure' or 'local')"
        ))),
    }
}
