//! Configuration loading, validation, and management for docchat.
//!
//! Loads configuration from `~/.docchat/config.toml` with environment
//! variable overrides (a `.env` file in the working directory is read
//! first). Validates all settings at startup.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// The root configuration structure.
///
/// Maps directly to `~/.docchat/config.toml`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Chat completion service
    #[serde(default)]
    pub chat: ChatConfig,

    /// Search index service
    #[serde(default)]
    pub search: SearchConfig,

    /// Object storage for uploaded documents
    #[serde(default)]
    pub storage: StorageConfig,

    /// Retrieval and snippet selection
    #[serde(default)]
    pub retrieval: RetrievalConfig,

    /// Interactive session behavior
    #[serde(default)]
    pub session: SessionConfig,

    /// Document indexing
    #[serde(default)]
    pub ingest: IngestConfig,
}

/// Redact a secret string for Debug output.
fn redact(s: &Option<String>) -> &'static str {
    match s {
        Some(_) => "[REDACTED]",
        None => "None",
    }
}

fn default_true() -> bool {
    true
}

#[derive(Clone, Serialize, Deserialize)]
pub struct ChatConfig {
    /// Azure OpenAI resource endpoint, e.g. `https://my-resource.openai.azure.com`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub endpoint: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    /// Deployment name (also reported as the model)
    #[serde(default = "default_deployment")]
    pub deployment: String,

    #[serde(default = "default_chat_api_version")]
    pub api_version: String,

    #[serde(default = "default_temperature")]
    pub temperature: f32,

    /// Maximum tokens per reply
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,

    /// Instruction placed at the start of every conversation
    #[serde(default = "default_system_prompt")]
    pub system_prompt: String,

    /// HTTP timeout for one completion call
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_deployment() -> String {
    "gpt-35-turbo".into()
}
fn default_chat_api_version() -> String {
    "2024-08-01-preview".into()
}
fn default_temperature() -> f32 {
    0.7
}
fn default_max_tokens() -> u32 {
    800
}
fn default_system_prompt() -> String {
    "You are a helpful assistant.".into()
}
fn default_timeout_secs() -> u64 {
    120
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            endpoint: None,
            api_key: None,
            deployment: default_deployment(),
            api_version: default_chat_api_version(),
            temperature: default_temperature(),
            max_tokens: default_max_tokens(),
            system_prompt: default_system_prompt(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl std::fmt::Debug for ChatConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChatConfig")
            .field("endpoint", &self.endpoint)
            .field("api_key", &redact(&self.api_key))
            .field("deployment", &self.deployment)
            .field("api_version", &self.api_version)
            .field("temperature", &self.temperature)
            .field("max_tokens", &self.max_tokens)
            .field("system_prompt", &self.system_prompt)
            .field("timeout_secs", &self.timeout_secs)
            .finish()
    }
}

#[derive(Clone, Serialize, Deserialize)]
pub struct SearchConfig {
    /// Full service endpoint; takes precedence over `service_name`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub endpoint: Option<String>,

    /// Service name, expanded to `https://<name>.search.windows.net`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub service_name: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    #[serde(default = "default_index_name")]
    pub index_name: String,

    #[serde(default = "default_search_api_version")]
    pub api_version: String,

    /// Markers wrapped around highlighted terms
    #[serde(default = "default_highlight_tag")]
    pub highlight_pre_tag: String,

    #[serde(default = "default_highlight_tag")]
    pub highlight_post_tag: String,

    /// Ids per deletion request when clearing the index
    #[serde(default = "default_delete_batch_size")]
    pub delete_batch_size: usize,

    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_index_name() -> String {
    "turnberry-documents".into()
}
fn default_search_api_version() -> String {
    "2023-11-01".into()
}
fn default_highlight_tag() -> String {
    "**".into()
}
fn default_delete_batch_size() -> usize {
    1000
}

impl SearchConfig {
    /// The endpoint to talk to, if one can be derived.
    pub fn resolved_endpoint(&self) -> Option<String> {
        self.endpoint.clone().or_else(|| {
            self.service_name
                .as_ref()
                .map(|name| format!("https://{name}.search.windows.net"))
        })
    }
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            endpoint: None,
            service_name: None,
            api_key: None,
            index_name: default_index_name(),
            api_version: default_search_api_version(),
            highlight_pre_tag: default_highlight_tag(),
            highlight_post_tag: default_highlight_tag(),
            delete_batch_size: default_delete_batch_size(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl std::fmt::Debug for SearchConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SearchConfig")
            .field("endpoint", &self.endpoint)
            .field("service_name", &self.service_name)
            .field("api_key", &redact(&self.api_key))
            .field("index_name", &self.index_name)
            .field("api_version", &self.api_version)
            .field("delete_batch_size", &self.delete_batch_size)
            .finish()
    }
}

#[derive(Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// "azure" or "local"
    #[serde(default = "default_storage_backend")]
    pub backend: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub account_name: Option<String>,

    /// Base64 shared key of the storage account
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub account_key: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub container: Option<String>,

    /// Target directory when `backend = "local"`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub local_dir: Option<String>,

    /// HTTP timeout for one upload
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_storage_backend() -> String {
    "azure".into()
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            backend: default_storage_backend(),
            account_name: None,
            account_key: None,
            container: None,
            local_dir: None,
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl std::fmt::Debug for StorageConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StorageConfig")
            .field("backend", &self.backend)
            .field("account_name", &self.account_name)
            .field("account_key", &redact(&self.account_key))
            .field("container", &self.container)
            .field("local_dir", &self.local_dir)
            .field("timeout_secs", &self.timeout_secs)
            .finish()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetrievalConfig {
    /// Records fetched per query
    #[serde(default = "default_top_k")]
    pub top_k: usize,

    /// Excerpt length in characters
    #[serde(default = "default_snippet_length")]
    pub snippet_length: usize,

    /// Restrict retrieval to one section tag
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub section: Option<String>,

    /// Ask the index for highlight fragments
    #[serde(default = "default_true")]
    pub highlight: bool,
}

fn default_top_k() -> usize {
    3
}
fn default_snippet_length() -> usize {
    500
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            top_k: default_top_k(),
            snippet_length: default_snippet_length(),
            section: None,
            highlight: true,
        }
    }
}

/// What the chat loop does after a failed turn.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorPolicy {
    /// Report the error and prompt again
    #[default]
    Retry,
    /// Report the error and end the session
    Terminate,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Prior messages (excluding the system message) sent with each prompt
    #[serde(default = "default_history_window")]
    pub history_window: usize,

    #[serde(default)]
    pub on_error: ErrorPolicy,
}

fn default_history_window() -> usize {
    3
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            history_window: default_history_window(),
            on_error: ErrorPolicy::default(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IngestConfig {
    /// Section tag written to every indexed record
    #[serde(default = "default_section")]
    pub section: String,

    /// Split pages into chunks of at most this many chars (0 = whole pages)
    #[serde(default)]
    pub chunk_chars: usize,
}

fn default_section() -> String {
    "default".into()
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            section: default_section(),
            chunk_chars: 0,
        }
    }
}

impl AppConfig {
    /// Load configuration from the default path (~/.docchat/config.toml).
    ///
    /// A `.env` file in the working directory is loaded first, then the
    /// process environment overrides file values (see
    /// [`AppConfig::apply_env_overrides`]).
    pub fn load() -> Result<Self, ConfigError> {
        if let Ok(path) = dotenvy::dotenv() {
            tracing::debug!("Loaded environment from {}", path.display());
        }

        let config_path = Self::config_dir().join("config.toml");
        let mut config = Self::load_from(&config_path)?;
        config.apply_env_overrides(|key| std::env::var(key).ok());
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a specific file path.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            tracing::debug!("No config file found at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        let config: Self = toml::from_str(&content).map_err(|e| ConfigError::ParseError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        config.validate()?;
        Ok(config)
    }

    /// Apply environment overrides using `lookup` to read variables.
    ///
    /// Variables (non-empty values win over the file):
    /// - `AZURE_OPENAI_ENDPOINT`, `AZURE_OPENAI_API_KEY`,
    ///   `AZURE_OPENAI_DEPLOYMENT_NAME`, `OPENAI_API_VERSION`
    /// - `AZURE_SEARCH_ENDPOINT`, `AZURE_SEARCH_SERVICE_NAME`,
    ///   `AZURE_SEARCH_KEY` (or `AZURE_SEARCH_SERVICE_KEY`), `AZURE_SEARCH_INDEX_NAME`
    /// - `AZURE_STORAGE_ACCOUNT_NAME`, `AZURE_STORAGE_ACCOUNT_KEY`,
    ///   `AZURE_STORAGE_CONTAINER_NAME`
    pub fn apply_env_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(v) = get("AZURE_OPENAI_ENDPOINT") {
            self.chat.endpoint = Some(v);
        }
        if let Some(v) = get("AZURE_OPENAI_API_KEY") {
            self.chat.api_key = Some(v);
        }
        if let Some(v) = get("AZURE_OPENAI_DEPLOYMENT_NAME") {
            self.chat.deployment = v;
        }
        if let Some(v) = get("OPENAI_API_VERSION") {
            self.chat.api_version = v;
        }

        if let Some(v) = get("AZURE_SEARCH_ENDPOINT") {
            self.search.endpoint = Some(v);
        }
        if let Some(v) = get("AZURE_SEARCH_SERVICE_NAME") {
            self.search.service_name = Some(v);
        }
        if let Some(v) = get("AZURE_SEARCH_KEY").or_else(|| get("AZURE_SEARCH_SERVICE_KEY")) {
            self.search.api_key = Some(v);
        }
        if let Some(v) = get("AZURE_SEARCH_INDEX_NAME") {
            self.search.index_name = v;
        }

        if let Some(v) = get("AZURE_STORAGE_ACCOUNT_NAME") {
            self.storage.account_name = Some(v);
        }
        if let Some(v) = get("AZURE_STORAGE_ACCOUNT_KEY") {
            self.storage.account_key = Some(v);
        }
        if let Some(v) = get("AZURE_STORAGE_CONTAINER_NAME") {
            self.storage.container = Some(v);
        }
    }

    /// Get the configuration directory path.
    pub fn config_dir() -> PathBuf {
        dirs_home().join(".docchat")
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(0.0..=2.0).contains(&self.chat.temperature) {
            return Err(ConfigError::ValidationError(
                "chat.temperature must be between 0.0 and 2.0".into(),
            ));
        }

        if self.retrieval.top_k == 0 {
            return Err(ConfigError::ValidationError(
                "retrieval.top_k must be at least 1".into(),
            ));
        }

        if self.retrieval.snippet_length == 0 {
            return Err(ConfigError::ValidationError(
                "retrieval.snippet_length must be at least 1".into(),
            ));
        }

        if self.search.delete_batch_size == 0 || self.search.delete_batch_size > 1000 {
            return Err(ConfigError::ValidationError(
                "search.delete_batch_size must be between 1 and 1000".into(),
            ));
        }

        if !matches!(self.storage.backend.as_str(), "azure" | "local") {
            return Err(ConfigError::ValidationError(format!(
                "storage.backend must be \"azure\" or \"local\", got \"{}\"",
                self.storage.backend
            )));
        }

        Ok(())
    }

    /// Generate a default config TOML string.
    pub fn default_toml() -> String {
        let config = Self::default();
        toml::to_string_pretty(&config).unwrap_or_default()
    }
}

/// Get the user's home directory.
fn dirs_home() -> PathBuf {
    #[cfg(target_os = "windows")]
    {
        std::env::var("USERPROFILE")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("C:\\Users\\Default"))
    }
    #[cfg(not(target_os = "windows"))]
    {
        std::env::var("HOME")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("/tmp"))
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file at {path}: {reason}")]
    ReadError { path: PathBuf, reason: String },

    #[error("Failed to parse config file at {path}: {reason}")]
    ParseError { path: PathBuf, reason: String },

    #[error("Configuration validation failed: {0}")]
    ValidationError(String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn default_config_is_valid() {
        let config = AppConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.search.index_name, "turnberry-documents");
        assert_eq!(config.retrieval.top_k, 3);
        assert_eq!(config.retrieval.snippet_length, 500);
        assert_eq!(config.session.history_window, 3);
        assert_eq!(config.session.on_error, ErrorPolicy::Retry);
        assert_eq!(config.chat.system_prompt, "You are a helpful assistant.");
    }

    #[test]
    fn config_roundtrip_toml() {
        let config = AppConfig::default();
        let toml_str = toml::to_string_pretty(&config).unwrap();
        let parsed: AppConfig = toml::from_str(&toml_str).unwrap();
        assert_eq!(parsed.chat.deployment, config.chat.deployment);
        assert_eq!(parsed.search.delete_batch_size, 1000);
    }

    #[test]
    fn invalid_temperature_rejected() {
        let mut config = AppConfig::default();
        config.chat.temperature = 5.0;
        assert!(config.validate().is_err());

        config.chat.temperature = f32::NAN;
        assert!(config.validate().is_err());
    }

    #[test]
    fn storage_timeout_defaults_and_parses() {
        assert_eq!(AppConfig::default().storage.timeout_secs, 120);
        let config: AppConfig = toml::from_str("[storage]\ntimeout_secs = 5\n").unwrap();
        assert_eq!(config.storage.timeout_secs, 5);
    }

    #[test]
    fn oversized_delete_batch_rejected() {
        let mut config = AppConfig::default();
        config.search.delete_batch_size = 1001;
        assert!(config.validate().is_err());
    }

    #[test]
    fn unknown_storage_backend_rejected() {
        let mut config = AppConfig::default();
        config.storage.backend = "s3".into();
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("s3"));
    }

    #[test]
    fn missing_config_file_returns_defaults() {
        let config = AppConfig::load_from(Path::new("/nonexistent/config.toml")).unwrap();
        assert_eq!(config.chat.deployment, "gpt-35-turbo");
    }

    #[test]
    fn load_from_file_with_partial_sections() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(
            &path,
            r#"
[session]
history_window = 10
on_error = "terminate"

[retrieval]
section = "benefits_guide"
highlight = false
"#,
        )
        .unwrap();

        let config = AppConfig::load_from(&path).unwrap();
        assert_eq!(config.session.history_window, 10);
        assert_eq!(config.session.on_error, ErrorPolicy::Terminate);
        assert_eq!(config.retrieval.section.as_deref(), Some("benefits_guide"));
        assert!(!config.retrieval.highlight);
        assert_eq!(config.retrieval.top_k, 3);
    }

    #[test]
    fn unparseable_file_is_a_parse_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[session\nhistory_window = ").unwrap();
        assert!(matches!(
            AppConfig::load_from(&path),
            Err(ConfigError::ParseError { .. })
        ));
    }

    #[test]
    fn env_overrides_apply() {
        let env: HashMap<&str, &str> = [
            ("AZURE_OPENAI_ENDPOINT", "https://res.openai.azure.com"),
            ("AZURE_OPENAI_DEPLOYMENT_NAME", "gpt-4o"),
            ("AZURE_SEARCH_SERVICE_NAME", "docs"),
            ("AZURE_SEARCH_SERVICE_KEY", "search-key"),
            ("AZURE_STORAGE_CONTAINER_NAME", "uploads"),
            ("AZURE_SEARCH_INDEX_NAME", ""),
        ]
        .into_iter()
        .collect();

        let mut config = AppConfig::default();
        config.apply_env_overrides(|k| env.get(k).map(|v| v.to_string()));

        assert_eq!(config.chat.endpoint.as_deref(), Some("https://res.openai.azure.com"));
        assert_eq!(config.chat.deployment, "gpt-4o");
        assert_eq!(config.search.api_key.as_deref(), Some("search-key"));
        assert_eq!(
            config.search.resolved_endpoint().as_deref(),
            Some("https://docs.search.windows.net")
        );
        assert_eq!(config.storage.container.as_deref(), Some("uploads"));
        // Empty values do not clobber defaults.
        assert_eq!(config.search.index_name, "turnberry-documents");
    }

    #[test]
    fn explicit_search_endpoint_wins() {
        let mut config = AppConfig::default();
        config.search.service_name = Some("docs".into());
        config.search.endpoint = Some("http://localhost:8080".into());
        assert_eq!(
            config.search.resolved_endpoint().as_deref(),
            Some("http://localhost:8080")
        );
    }

    #[test]
    fn debug_output_redacts_secrets() {
        let mut config = AppConfig::default();
        config.chat.api_key = Some("sk-secret".into());
        config.storage.account_key = Some("c2VjcmV0".into());
        let debug = format!("{config:?}");
        assert!(!debug.contains("sk-secret"));
        assert!(!debug.contains("c2VjcmV0"));
        assert!(debug.contains("[REDACTED]"));
    }
}
