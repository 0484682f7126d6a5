//! The long-lived GitHub credential and the process-wide flags it travels with.

use copilot_relay_core::{AccountType, RateLimitPolicy, RelayConfig};
use parking_lot::RwLock;
use secrecy::{ExposeSecret, SecretString};
use std::sync::Arc;
use std::time::Duration;

/// GitHub token plus the Copilot plan it belongs to.
#[derive(Debug, Clone)]
pub struct Credential {
    secret: SecretString,
    account_type: AccountType,
}

impl Credential {
    pub fn new(secret: impl Into<SecretString>, account_type: AccountType) -> Self {
        Self {
            secret: secret.into(),
            account_type,
        }
    }

    pub fn secret(&self) -> &SecretString {
        &self.secret
    }

    pub fn expose(&self) -> &str {
        self.secret.expose_secret()
    }

    pub fn account_type(&self) -> AccountType {
        self.account_type
    }
}

/// Process-wide switches, fixed at startup.
#[derive(Debug, Clone, PartialEq)]
pub struct RelayFlags {
    pub account_type: AccountType,
    pub rate_limit: RateLimitPolicy,
    pub manual_approval: bool,
    pub approval_timeout: Duration,
    pub bypass_credit: bool,
    pub refresh_margin: Duration,
    pub show_token: bool,
    pub verbose: bool,
}

impl RelayFlags {
    pub fn from_config(config: &RelayConfig, verbose: bool) -> Self {
        Self {
            account_type: config.account.account_type,
            rate_limit: config.rate_limit_policy(),
            manual_approval: config.approval.manual,
            approval_timeout: config.approval.timeout(),
            bypass_credit: config.rewrite.bypass_credit,
            refresh_margin: config.token.refresh_margin(),
            show_token: config.token.show_token,
            verbose,
        }
    }
}

impl Default for RelayFlags {
    fn default() -> Self {
        Self::from_config(&RelayConfig::default(), false)
    }
}

/// Owner of the primary credential.
///
/// Readers get an `Arc` snapshot; [`CredentialStore::replace`] swaps the whole
/// credential and never mutates the one a caller already holds.
#[derive(Debug)]
pub struct CredentialStore {
    credential: RwLock<Arc<Credential>>,
    flags: RelayFlags,
}

impl CredentialStore {
    pub fn new(credential: Credential, flags: RelayFlags) -> Self {
        Self {
            credential: RwLock::new(Arc::new(credential)),
            flags,
        }
    }

    pub fn credential(&self) -> Arc<Credential> {
        self.credential.read().clone()
    }

    pub fn replace(&self, credential: Credential) {
        *self.credential.write() = Arc::new(credential);
    }

    pub fn flags(&self) -> &RelayFlags {
        &self.flags
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_debug_output_redacts_secret() {
        let credential = Credential::new("gho_supersecret", AccountType::Individual);
        let rendered = format!("{:?}", credential);
        assert!(!rendered.contains("gho_supersecret"));
    }

    #[test]
    fn test_replace_keeps_existing_snapshots() {
        let store = CredentialStore::new(
            Credential::new("gho_old", AccountType::Individual),
            RelayFlags::default(),
        );

        let before = store.credential();
        store.replace(Credential::new("gho_new", AccountType::Business));

        assert_eq!(before.expose(), "gho_old");
        assert_eq!(store.credential().expose(), "gho_new");
        assert_eq!(store.credential().account_type(), AccountType::Business);
    }

    #[test]
    fn test_flags_from_config() {
        let mut config = RelayConfig::default();
        config.approval.manual = true;
        config.rewrite.bypass_credit = true;
        config.rate_limit.interval_secs = Some(3);

        let flags = RelayFlags::from_config(&config, true);
        assert!(flags.manual_approval);
        assert!(flags.bypass_credit);
        assert!(flags.verbose);
        assert_eq!(flags.rate_limit.interval, Some(Duration::from_secs(3)));
    }
}
