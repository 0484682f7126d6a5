//! CLI commands

use clap::{Args, Parser, Subcommand};
use copilot_relay_core::AccountType;
use std::path::PathBuf;

/// Anthropic-compatible gateway in front of GitHub Copilot
#[derive(Parser, Debug)]
#[command(name = "copilot-relay")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Config file (default: discover copilot-relay.{jsonc,json,yml,yaml})
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Start the relay server
    Start(StartArgs),

    /// Sign in to GitHub with the device flow and store the token
    Auth {
        /// Print the GitHub token once it is issued
        #[arg(long)]
        show_token: bool,
    },
}

#[derive(Args, Debug, Default)]
pub struct StartArgs {
    /// Port to listen on; the next free port is used if it is taken
    #[arg(short, long)]
    pub port: Option<u16>,

    /// Copilot plan (individual, business, enterprise)
    #[arg(short, long)]
    pub account_type: Option<AccountType>,

    /// Ask for approval on every request
    #[arg(long)]
    pub manual: bool,

    /// Minimum seconds between requests
    #[arg(short, long, value_parser = clap::value_parser!(u64).range(1..))]
    pub rate_limit: Option<u64>,

    /// Wait instead of failing when the rate limit is hit
    #[arg(short, long)]
    pub wait: bool,

    /// GitHub token to use instead of the stored one
    #[arg(short, long, env = "GH_TOKEN", hide_env_values = true)]
    pub github_token: Option<String>,

    /// Log Copilot tokens when they are fetched or refreshed
    #[arg(long)]
    pub show_token: bool,

    /// Prepend a hey/hello exchange to first-turn conversations
    #[arg(long)]
    pub bypass_credit: bool,

    /// Print a command that launches Claude Code against the relay (implies --bypass-credit)
    #[arg(short, long)]
    pub claude_code: bool,

    /// Seconds to wait for a manual approval before rejecting
    #[arg(long, value_parser = clap::value_parser!(u64).range(1..))]
    pub approval_timeout: Option<u64>,

    /// Write every request payload to this directory
    #[arg(long)]
    pub request_log_dir: Option<PathBuf>,
}
