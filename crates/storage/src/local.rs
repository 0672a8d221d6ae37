//! Local directory backend, for offline runs and tests.

use async_trait::async_trait;
use docchat_core::error::StorageError;
use docchat_core::storage::ObjectStore;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Stores each object as a file directly under `root`.
pub struct LocalStore {
    root: PathBuf,
}

impl LocalStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

#[async_trait]
impl ObjectStore for LocalStore {
    fn name(&self) -> &str {
        "local"
    }

    async fn put(&self, name: &str, bytes: Vec<u8>) -> Result<String, StorageError> {
        // Keep only the final component so names cannot escape the root.
        let file_name = Path::new(name)
            .file_name()
            .ok_or_else(|| StorageError::ApiError {
                status_code: 400,
                message: format!("Invalid object name: {name}"),
            })?;

        tokio::fs::create_dir_all(&self.root).await?;
        let target = self.root.join(file_name);
        tokio::fs::write(&target, &bytes).await?;

        debug!(path = %target.display(), bytes = bytes.len(), "Stored object locally");
        Ok(file_name.to_string_lossy().into_owned())
    }
}
