//! Where the GitHub token comes from.

use anyhow::{Context, Result};
use colored::Colorize;
use copilot_relay_auth::secrecy::{ExposeSecret, SecretString};
use copilot_relay_auth::{poll_for_token, start_device_flow, DeviceFlowConfig, GithubTokenFile};
use tracing::info;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenSource {
    Flag,
    File,
    DeviceFlow,
}

/// Flag or `GH_TOKEN` first, then the stored token, then a fresh device flow.
pub async fn resolve_github_token(
    client: &reqwest::Client,
    provided: Option<&str>,
    file: &GithubTokenFile,
    show_token: bool,
) -> Result<(SecretString, TokenSource)> {
    if let Some(token) = provided.map(str::trim).filter(|t| !t.is_empty()) {
        info!("using provided GitHub token");
        return Ok((SecretString::from(token.to_string()), TokenSource::Flag));
    }

    if let Some(token) = file.load().context("failed to read stored GitHub token")? {
        info!(path = %file.path().display(), "using stored GitHub token");
        return Ok((token, TokenSource::File));
    }

    let token = device_login(client, file, show_token).await?;
    Ok((token, TokenSource::DeviceFlow))
}

/// Run the device flow and persist the issued token.
pub async fn device_login(
    client: &reqwest::Client,
    file: &GithubTokenFile,
    show_token: bool,
) -> Result<SecretString> {
    let config = DeviceFlowConfig::github();
    let device = start_device_flow(client, &config)
        .await
        .context("failed to start GitHub device authorization")?;

    println!(
        "{} open {} and enter the code {}",
        "GitHub sign-in:".cyan().bold(),
        device.verification_uri.underline(),
        device.user_code.yellow().bold()
    );

    let token = poll_for_token(
        client,
        &config,
        &device.device_code,
        device.interval,
        device.expires_in,
    )
    .await
    .context("GitHub device authorization did not complete")?;

    file.save(&token)
        .with_context(|| format!("failed to store GitHub token at {}", file.path().display()))?;
    println!(
        "{} token saved to {}",
        "✓".green(),
        file.path().display().to_string().dimmed()
    );

    if show_token {
        println!("{}: {}", "GitHub token".cyan(), token.expose_secret());
    }

    Ok(token)
}
