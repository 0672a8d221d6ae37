pub mod ask;
pub mod chat;
pub mod clear_index;
pub mod doctor;
pub mod index;
pub mod init_index;

use docchat_config::AppConfig;

/// Load configuration, or explain where it was expected.
pub(crate) fn load_config() -> Result<AppConfig, Box<dyn std::error::Error>> {
    AppConfig::load().map_err(|e| format!("Failed to load config: {e}").into())
}
