//! Policy types fixed at process start.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;

/// GitHub Copilot plan the credential belongs to.
///
/// The tier only decides which Copilot API host requests are sent to.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AccountType {
    #[default]
    Individual,
    Business,
    Enterprise,
}

impl AccountType {
    pub fn as_str(&self) -> &'static str {
        match self {
            AccountType::Individual => "individual",
            AccountType::Business => "business",
            AccountType::Enterprise => "enterprise",
        }
    }

    /// Copilot API base URL for this tier.
    pub fn copilot_base_url(&self) -> &'static str {
        match self {
            AccountType::Individual => "https://api.githubcopilot.com",
            AccountType::Business => "https://api.business.githubcopilot.com",
            AccountType::Enterprise => "https://api.enterprise.githubcopilot.com",
        }
    }
}

impl fmt::Display for AccountType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Error)]
#[error("unknown account type '{0}' (expected individual, business or enterprise)")]
pub struct ParseAccountTypeError(String);

impl FromStr for AccountType {
    type Err = ParseAccountTypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "individual" => Ok(AccountType::Individual),
            "business" => Ok(AccountType::Business),
            "enterprise" => Ok(AccountType::Enterprise),
            other => Err(ParseAccountTypeError(other.to_string())),
        }
    }
}

/// Minimum spacing between admitted requests.
///
/// `interval == None` means unlimited. When `wait_on_limit` is set a throttled
/// request is held until the interval has elapsed instead of being rejected.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RateLimitPolicy {
    pub interval: Option<Duration>,
    pub wait_on_limit: bool,
}

impl RateLimitPolicy {
    pub fn unlimited() -> Self {
        Self::default()
    }

    pub fn every(interval: Duration, wait_on_limit: bool) -> Self {
        Self {
            interval: Some(interval),
            wait_on_limit,
        }
    }

    /// Build a policy from a seconds value. Zero is treated as unlimited.
    pub fn from_secs(interval_secs: Option<u64>, wait_on_limit: bool) -> Self {
        Self {
            interval: interval_secs
                .filter(|secs| *secs > 0)
                .map(Duration::from_secs),
            wait_on_limit,
        }
    }

    pub fn is_limited(&self) -> bool {
        self.interval.is_some()
    }
}
