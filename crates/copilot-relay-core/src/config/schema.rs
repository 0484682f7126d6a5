use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

use crate::policy::{AccountType, RateLimitPolicy};

/// Main relay configuration
///
/// Loaded from (in priority order):
/// 1. `copilot-relay.jsonc` - JSON with comments
/// 2. `copilot-relay.json` - Standard JSON
/// 3. `copilot-relay.yml` / `copilot-relay.yaml` - YAML format
///
/// Hidden variants (`.copilot-relay.*`) and `~/.config/copilot-relay/` are
/// checked as well. Command-line flags are applied on top by the CLI.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RelayConfig {
    #[serde(default)]
    pub server: ServerSettings,

    #[serde(default)]
    pub account: AccountSettings,

    #[serde(default)]
    pub rate_limit: RateLimitSettings,

    #[serde(default)]
    pub approval: ApprovalSettings,

    #[serde(default)]
    pub token: TokenSettings,

    #[serde(default)]
    pub rewrite: RewriteSettings,

    #[serde(default)]
    pub telemetry: TelemetrySettings,
}

impl RelayConfig {
    pub fn rate_limit_policy(&self) -> RateLimitPolicy {
        RateLimitPolicy::from_secs(self.rate_limit.interval_secs, self.rate_limit.wait)
    }

    /// Reject values that cannot describe a usable policy.
    pub fn validate(&self) -> Result<(), String> {
        if self.rate_limit.interval_secs == Some(0) {
            return Err("rate_limit.interval_secs must be a positive integer".to_string());
        }
        if self.approval.timeout_secs == 0 {
            return Err("approval.timeout_secs must be a positive integer".to_string());
        }
        if self.server.port == 0 {
            return Err("server.port must be non-zero".to_string());
        }
        Ok(())
    }
}

// ============================================================================
// Server
// ============================================================================

/// HTTP listener settings
///
/// ```yaml
/// server:
///   port: 4141
///   request_timeout_secs: 300
///   request_log_dir: ./request-logs
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServerSettings {
    /// Preferred port; the next free port is used if it is taken (default: 4141)
    #[serde(default = "default_port")]
    pub port: u16,

    /// Upstream request timeout in seconds (default: 300)
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,

    /// Write every inbound payload to this directory when set
    #[serde(default)]
    pub request_log_dir: Option<PathBuf>,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            port: default_port(),
            request_timeout_secs: default_request_timeout(),
            request_log_dir: None,
        }
    }
}

impl ServerSettings {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

fn default_port() -> u16 {
    4141
}

fn default_request_timeout() -> u64 {
    300
}

// ============================================================================
// Account
// ============================================================================

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AccountSettings {
    #[serde(default)]
    pub account_type: AccountType,
}

// ============================================================================
// Rate limiting
// ============================================================================

/// ```yaml
/// rate_limit:
///   interval_secs: 30
///   wait: true
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RateLimitSettings {
    /// Minimum seconds between admitted requests (unset: unlimited)
    #[serde(default)]
    pub interval_secs: Option<u64>,

    /// Hold throttled requests instead of rejecting them
    #[serde(default)]
    pub wait: bool,
}

// ============================================================================
// Manual approval
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApprovalSettings {
    /// Ask the operator to accept every request
    #[serde(default)]
    pub manual: bool,

    /// Seconds to wait for a decision before rejecting (default: 300)
    #[serde(default = "default_approval_timeout")]
    pub timeout_secs: u64,
}

impl Default for ApprovalSettings {
    fn default() -> Self {
        Self {
            manual: false,
            timeout_secs: default_approval_timeout(),
        }
    }
}

impl ApprovalSettings {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

fn default_approval_timeout() -> u64 {
    300
}

// ============================================================================
// Token lifecycle
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TokenSettings {
    /// Seconds subtracted from the backend-declared lifetime (default: 60)
    #[serde(default = "default_refresh_margin")]
    pub refresh_margin_secs: u64,

    /// Refresh on a timer instead of only on demand (default: true)
    #[serde(default = "default_true")]
    pub proactive_refresh: bool,

    /// Log tokens when they are fetched or refreshed
    #[serde(default)]
    pub show_token: bool,
}

impl Default for TokenSettings {
    fn default() -> Self {
        Self {
            refresh_margin_secs: default_refresh_margin(),
            proactive_refresh: true,
            show_token: false,
        }
    }
}

impl TokenSettings {
    pub fn refresh_margin(&self) -> Duration {
        Duration::from_secs(self.refresh_margin_secs)
    }
}

fn default_refresh_margin() -> u64 {
    60
}

// ============================================================================
// Rewriting
// ============================================================================

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RewriteSettings {
    /// Prepend a synthetic hey/hello exchange to first-turn conversations
    #[serde(default)]
    pub bypass_credit: bool,
}

// ============================================================================
// Telemetry
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TelemetrySettings {
    #[serde(default = "default_level")]
    pub level: String,

    #[serde(default)]
    pub json_output: bool,
}

impl Default for TelemetrySettings {
    fn default() -> Self {
        Self {
            level: default_level(),
            json_output: false,
        }
    }
}

fn default_level() -> String {
    "info".to_string()
}

fn default_true() -> bool {
    true
}
