//! Command-line overrides on top of the config file.

use anyhow::{anyhow, Context, Result};
use copilot_relay_core::{resolve_config, RelayConfig};
use std::path::Path;
use tracing::debug;

use crate::commands::StartArgs;

/// Load the config file (if any) and apply `start` flags over it.
pub fn load(config_path: Option<&Path>, args: &StartArgs) -> Result<RelayConfig> {
    let resolved = resolve_config(config_path).context("failed to load configuration")?;
    if let Some(path) = &resolved.path {
        debug!(path = %path.display(), "loaded config file");
    }

    let config = apply_overrides(resolved.config, args);
    config.validate().map_err(|e| anyhow!(e))?;
    Ok(config)
}

pub fn apply_overrides(mut config: RelayConfig, args: &StartArgs) -> RelayConfig {
    if let Some(port) = args.port {
        config.server.port = port;
    }
    if let Some(dir) = &args.request_log_dir {
        config.server.request_log_dir = Some(dir.clone());
    }
    if let Some(account_type) = args.account_type {
        config.account.account_type = account_type;
    }
    if let Some(secs) = args.rate_limit {
        config.rate_limit.interval_secs = Some(secs);
    }
    if args.wait {
        config.rate_limit.wait = true;
    }
    if args.manual {
        config.approval.manual = true;
    }
    if let Some(secs) = args.approval_timeout {
        config.approval.timeout_secs = secs;
    }
    if args.show_token {
        config.token.show_token = true;
    }
    if args.bypass_credit || args.claude_code {
        config.rewrite.bypass_credit = true;
    }
    config
}

#[cfg(test)]
mod tests {
    use super::*;
    use copilot_relay_core::AccountType;
    use std::path::PathBuf;
    use std::time::Duration;

    #[test]
    fn test_flags_override_file_values() {
        let mut file = RelayConfig::default();
        file.server.port = 8080;
        file.rate_limit.interval_secs = Some(5);

        let args = StartArgs {
            port: Some(9000),
            account_type: Some(AccountType::Business),
            rate_limit: Some(30),
            wait: true,
            request_log_dir: Some(PathBuf::from("/tmp/logs")),
            ..Default::default()
        };

        let config = apply_overrides(file, &args);
        assert_eq!(config.server.port, 9000);
        assert_eq!(config.account.account_type, AccountType::Business);
        assert_eq!(
            config.rate_limit_policy().interval,
            Some(Duration::from_secs(30))
        );
        assert!(config.rate_limit.wait);
        assert_eq!(
            config.server.request_log_dir.as_deref(),
            Some(Path::new("/tmp/logs"))
        );
    }

    #[test]
    fn test_unset_flags_keep_file_values() {
        let mut file = RelayConfig::default();
        file.approval.manual = true;
        file.approval.timeout_secs = 42;

        let config = apply_overrides(file.clone(), &StartArgs::default());
        assert_eq!(config, file);
    }

    #[test]
    fn test_claude_code_implies_bypass() {
        let args = StartArgs {
            claude_code: true,
            ..Default::default()
        };
        assert!(apply_overrides(RelayConfig::default(), &args).rewrite.bypass_credit);
    }

    #[test]
    fn test_load_reads_file_then_flags() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("copilot-relay.yaml");
        std::fs::write(&path, "server:\n  port: 5000\napproval:\n  manual: true\n").unwrap();

        let args = StartArgs {
            approval_timeout: Some(10),
            ..Default::default()
        };
        let config = load(Some(path.as_path()), &args).unwrap();
        assert_eq!(config.server.port, 5000);
        assert!(config.approval.manual);
        assert_eq!(config.approval.timeout_secs, 10);
    }

    #[test]
    fn test_missing_explicit_file_fails() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nope.yaml");
        assert!(load(Some(path.as_path()), &StartArgs::default()).is_err());
    }
}
