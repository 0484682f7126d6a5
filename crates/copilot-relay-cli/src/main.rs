//! copilot-relay - Anthropic-compatible gateway for GitHub Copilot

use anyhow::{Context, Result};
use clap::Parser;
use colored::Colorize;
use copilot_relay_auth::{
    Credential, CredentialStore, GithubTokenExchanger, GithubTokenFile, RelayFlags, TokenManager,
};
use copilot_relay_core::RelayConfig;
use copilot_relay_gate::{AdmissionGate, QueuedApprovals};
use copilot_relay_proxy::server::{DEFAULT_HOST, DEFAULT_PORT_ATTEMPTS};
use copilot_relay_proxy::{
    bind_available, serve, AppState, CopilotClient, Gateway, ModelCatalog, RequestLogger,
};
use copilot_relay_telemetry::{init_subscriber, TelemetryConfig};
use std::sync::Arc;
use tokio::io::BufReader;
use tracing::info;

mod commands;
mod config;
mod credentials;
mod launch;
mod prompt;

use commands::{Cli, Commands, StartArgs};
use launch::LaunchEnv;

const APPROVAL_QUEUE_CAPACITY: usize = 32;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let result = match &cli.command {
        Commands::Start(args) => run_start(&cli, args).await,
        Commands::Auth { show_token } => run_auth(&cli, *show_token).await,
    };

    if let Err(e) = result {
        eprintln!("{}: {:#}", "Error".red().bold(), e);
        std::process::exit(1);
    }
}

fn init_logging(config: &RelayConfig, verbose: bool) {
    let telemetry = TelemetryConfig::from_settings(&config.telemetry, verbose);
    if let Err(e) = init_subscriber(&telemetry) {
        eprintln!("{}: {}", "Warning".yellow(), e);
    }
}

fn http_client(config: &RelayConfig) -> Result<reqwest::Client> {
    reqwest::Client::builder()
        .timeout(config.server.request_timeout())
        .build()
        .context("failed to build HTTP client")
}

async fn run_auth(cli: &Cli, show_token: bool) -> Result<()> {
    let config = copilot_relay_core::load_config(cli.config.as_deref())?;
    init_logging(&config, cli.verbose);

    let client = http_client(&config)?;
    credentials::device_login(&client, &GithubTokenFile::default(), show_token).await?;
    Ok(())
}

async fn run_start(cli: &Cli, args: &StartArgs) -> Result<()> {
    let config = config::load(cli.config.as_deref(), args)?;
    init_logging(&config, cli.verbose);

    let flags = RelayFlags::from_config(&config, cli.verbose);
    if flags.account_type != Default::default() {
        info!(account_type = %flags.account_type, "using non-individual Copilot plan");
    }

    let client = http_client(&config)?;
    let (github_token, source) = credentials::resolve_github_token(
        &client,
        args.github_token.as_deref(),
        &GithubTokenFile::default(),
        flags.show_token,
    )
    .await?;
    info!(source = ?source, "GitHub credential ready");

    let store = Arc::new(CredentialStore::new(
        Credential::new(github_token, flags.account_type),
        flags.clone(),
    ));
    let tokens = Arc::new(TokenManager::new(
        store,
        Arc::new(GithubTokenExchanger::new(client.clone())),
    ));
    tokens
        .get_valid_token()
        .await
        .context("failed to obtain a Copilot token")?;
    let _refresh = config
        .token
        .proactive_refresh
        .then(|| tokens.spawn_refresh_loop());

    let upstream = Arc::new(CopilotClient::new(client, flags.account_type));
    let catalog = Arc::new(ModelCatalog::new(tokens.clone(), upstream.clone()));
    let models = catalog
        .refresh()
        .await
        .context("failed to load the Copilot model catalog")?;
    info!(
        count = models.len(),
        models = %models.keys().cloned().collect::<Vec<_>>().join(", "),
        "available models"
    );

    let mut gate = AdmissionGate::new(flags.rate_limit);
    if flags.manual_approval {
        let (approvals, rx) = QueuedApprovals::channel(APPROVAL_QUEUE_CAPACITY);
        gate = gate.with_approval(Arc::new(approvals), flags.approval_timeout);
        tokio::spawn(prompt::run_approval_prompt(
            rx,
            BufReader::new(tokio::io::stdin()),
            tokio::io::stdout(),
        ));
        info!(timeout_secs = flags.approval_timeout.as_secs(), "manual approval enabled");
    }

    let gateway = Arc::new(
        Gateway::new(Arc::new(gate), tokens, catalog, upstream)
            .with_bypass_credit(flags.bypass_credit),
    );

    let request_log = config.server.request_log_dir.as_ref().map(|dir| {
        info!(dir = %dir.display(), "request logging enabled");
        RequestLogger::new(dir)
    });

    let listener = bind_available(DEFAULT_HOST, config.server.port, DEFAULT_PORT_ATTEMPTS)?;
    let addr = listener.local_addr().context("listener has no address")?;
    let base_url = format!("http://{}", addr);

    if args.claude_code {
        let env = LaunchEnv::new(&base_url, &models);
        println!("{}", "Launch Claude Code with:".cyan().bold());
        println!("  {}", env.posix_command());
        println!("{}", "PowerShell:".dimmed());
        println!("  {}", env.powershell_command());
    } else {
        println!("{} {}", "Listening on".green().bold(), base_url.underline());
    }

    serve(
        AppState {
            gateway,
            request_log,
        },
        listener,
    )
    .await
}
