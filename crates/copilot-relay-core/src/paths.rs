//! Well-known locations for relay state.

use std::path::PathBuf;

use crate::APP_NAME;

/// Local data directory, e.g. `~/.local/share/copilot-relay`.
pub fn data_dir() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(APP_NAME)
}

/// File holding the persisted GitHub token.
pub fn github_token_path() -> PathBuf {
    data_dir().join("github_token")
}

/// Default directory for request payload logs.
pub fn default_request_log_dir() -> PathBuf {
    data_dir().join("request-logs")
}

/// Global config directory, e.g. `~/.config/copilot-relay`.
pub fn config_dir() -> Option<PathBuf> {
    dirs::home_dir().map(|home| home.join(".config").join(APP_NAME))
}
