//! Object storage trait: where original documents are uploaded before
//! their text is indexed.

use async_trait::async_trait;
use crate::error::StorageError;

/// The object storage collaborator.
///
/// Implementations: Azure Blob Storage and a local directory.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// The backend name (e.g., "azure-blob", "local").
    fn name(&self) -> &str;

    /// Store `bytes` under `name`, overwriting any existing object.
    /// Returns the name the object was stored under.
    async fn put(&self, name: &str, bytes: Vec<u8>) -> std::result::Result<String, StorageError>;
}
