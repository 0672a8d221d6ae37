//! Azure Blob Storage backend.
//!
//! Uploads block blobs with `PUT {account}.blob.core.windows.net/{container}/{blob}`,
//! signed with the account's SharedKey (HMAC-SHA256 over the canonical request).

use async_trait::async_trait;
use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use docchat_config::StorageConfig;
use docchat_core::error::StorageError;
use docchat_core::storage::ObjectStore;
use hmac::{Hmac, Mac};
use sha2::Sha256;
use tracing::{debug, warn};

type HmacSha256 = Hmac<Sha256>;

/// Blob service REST version sent in `x-ms-version`.
const BLOB_API_VERSION: &str = "2021-08-06";

const CONTENT_TYPE: &str = "application/octet-stream";

/// A container in an Azure storage account.
pub struct AzureBlobStore {
    account: String,
    key: Vec<u8>,
    container: String,
    base_url: String,
    client: reqwest::Client,
}

impl AzureBlobStore {
    /// `account_key` is the base64 shared key shown in the portal.
    pub fn new(
        account: impl Into<String>,
        account_key: &str,
        container: impl Into<String>,
    ) -> Result<Self, StorageError> {
        Self::build(account.into(), account_key, container.into(), StorageConfig::default().timeout_secs)
    }

    fn build(
        account: String,
        account_key: &str,
        container: String,
        timeout_secs: u64,
    ) -> Result<Self, StorageError> {
        let key = BASE64
            .decode(account_key.trim())
            .map_err(|e| StorageError::InvalidCredentials(format!("account key is not base64: {e}")))?;

        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(timeout_secs))
            .build()
            .map_err(|e| StorageError::NotConfigured(format!("HTTP client: {e}")))?;

        Ok(Self {
            base_url: format!("https://{account}.blob.core.windows.net"),
            account,
            key,
            container,
            client,
        })
    }

    /// Build from the `[storage]` config section.
    pub fn from_config(config: &StorageConfig) -> Result<Self, StorageError> {
        let account = config.account_name.as_deref().ok_or_else(|| {
            StorageError::NotConfigured("set storage.account_name or AZURE_STORAGE_ACCOUNT_NAME".into())
        })?;
        let key = config.account_key.as_deref().ok_or_else(|| {
            StorageError::NotConfigured("set storage.account_key or AZURE_STORAGE_ACCOUNT_KEY".into())
        })?;
        let container = config.container.as_deref().ok_or_else(|| {
            StorageError::NotConfigured("set storage.container or AZURE_STORAGE_CONTAINER_NAME".into())
        })?;

        Self::build(account.into(), key, container.into(), config.timeout_secs)
    }

    /// Point requests at a different blob endpoint (emulators, tests).
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    fn blob_url(&self, encoded_name: &str) -> String {
        format!("{}/{}/{encoded_name}", self.base_url, self.container)
    }

    /// Canonical string for a block blob PUT.
    fn string_to_sign(&self, content_length: usize, date: &str, encoded_name: &str) -> String {
        // Zero length is signed as an empty string.
        let length = if content_length == 0 {
            String::new()
        } else {
            content_length.to_string()
        };

        let canonical_headers = format!(
            "x-ms-blob-type:BlockBlob\nx-ms-date:{date}\nx-ms-version:{BLOB_API_VERSION}\n"
        );
        let canonical_resource = format!("/{}/{}/{encoded_name}", self.account, self.container);

        // VERB, Content-Encoding, Content-Language, Content-Length, Content-MD5,
        // Content-Type, Date, If-Modified-Since, If-Match, If-None-Match,
        // If-Unmodified-Since, Range
        format!(
            "PUT\n\n\n{length}\n\n{CONTENT_TYPE}\n\n\n\n\n\n\n{canonical_headers}{canonical_resource}"
        )
    }

    fn sign(&self, string_to_sign: &str) -> Result<String, StorageError> {
        let mut mac = HmacSha256::new_from_slice(&self.key)
            .map_err(|e| StorageError::InvalidCredentials(e.to_string()))?;
        mac.update(string_to_sign.as_bytes());
        Ok(BASE64.encode(mac.finalize().into_bytes()))
    }
}

#[async_trait]
impl ObjectStore for AzureBlobStore {
    fn name(&self) -> &str {
        "azure-blob"
    }

    async fn put(&self, name: &str, bytes: Vec<u8>) -> Result<String, StorageError> {
        let encoded = urlencoding::encode(name).into_owned();
        let date = chrono::Utc::now().format("%a, %d %b %Y %H:%M:%S GMT").to_string();
        let signature = self.sign(&self.string_to_sign(bytes.len(), &date, &encoded))?;

        debug!(container = %self.container, blob = name, bytes = bytes.len(), "Uploading blob");

        let response = self
            .client
            .put(self.blob_url(&encoded))
            .header("x-ms-blob-type", "BlockBlob")
            .header("x-ms-date", &date)
            .header("x-ms-version", BLOB_API_VERSION)
            .header("Content-Type", CONTENT_TYPE)
            .header("Authorization", format!("SharedKey {}:{signature}", self.account))
            .body(bytes)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    StorageError::Timeout(e.to_string())
                } else {
                    StorageError::Network(e.to_string())
                }
            })?;

        let status = response.status().as_u16();

        if status == 401 || status == 403 {
            return Err(StorageError::AuthenticationFailed(
                "Storage account rejected the request signature".into(),
            ));
        }

        if !response.status().is_success() {
            let body = response.text().await.unwrap_or_default();
            warn!(status, body = %body, "Blob upload returned error");
            return Err(StorageError::ApiError {
                status_code: status,
                message: body,
            });
        }

        Ok(name.to_string())
    }
}
