//! GitHub token → Copilot token exchange.

use async_trait::async_trait;
use secrecy::SecretString;
use serde::Deserialize;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use crate::headers::{github_headers, GITHUB_API_BASE_URL};
use crate::{AuthError, Credential, Result};

/// A freshly issued backend token and how long the backend says it lives.
#[derive(Debug, Clone)]
pub struct ExchangedToken {
    pub token: SecretString,
    pub lifetime: Duration,
}

#[async_trait]
pub trait TokenExchanger: Send + Sync {
    async fn exchange(&self, credential: &Credential) -> Result<ExchangedToken>;
}

#[derive(Debug, Deserialize)]
struct CopilotTokenResponse {
    token: String,
    #[serde(default)]
    expires_at: Option<u64>,
    #[serde(default)]
    refresh_in: Option<u64>,
}

impl CopilotTokenResponse {
    /// `refresh_in` wins; otherwise derive the lifetime from `expires_at`.
    fn lifetime(&self) -> Option<Duration> {
        if let Some(secs) = self.refresh_in {
            return Some(Duration::from_secs(secs));
        }
        let expires_at = self.expires_at?;
        let now = SystemTime::now().duration_since(UNIX_EPOCH).ok()?.as_secs();
        Some(Duration::from_secs(expires_at.saturating_sub(now)))
    }
}

/// Calls `GET /copilot_internal/v2/token` on the GitHub API.
#[derive(Debug, Clone)]
pub struct GithubTokenExchanger {
    client: reqwest::Client,
    api_base_url: String,
}

impl GithubTokenExchanger {
    pub fn new(client: reqwest::Client) -> Self {
        Self::with_base_url(client, GITHUB_API_BASE_URL)
    }

    pub fn with_base_url(client: reqwest::Client, api_base_url: impl Into<String>) -> Self {
        Self {
            client,
            api_base_url: api_base_url.into().trim_end_matches('/').to_string(),
        }
    }
}

#[async_trait]
impl TokenExchanger for GithubTokenExchanger {
    async fn exchange(&self, credential: &Credential) -> Result<ExchangedToken> {
        let url = format!("{}/copilot_internal/v2/token", self.api_base_url);
        let response = github_headers(self.client.get(&url), credential.expose())
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(match status.as_u16() {
                401 | 403 => AuthError::InvalidCredentials {
                    status: status.as_u16(),
                    body,
                },
                code => AuthError::ExchangeFailed { status: code, body },
            });
        }

        let parsed: CopilotTokenResponse = response
            .json()
            .await
            .map_err(|e| AuthError::InvalidResponse(e.to_string()))?;

        let lifetime = parsed.lifetime().ok_or_else(|| {
            AuthError::InvalidResponse("missing refresh_in and expires_at".to_string())
        })?;

        Ok(ExchangedToken {
            token: SecretString::from(parsed.token),
            lifetime,
        })
    }
}
