//! GitHub OAuth device authorization (RFC 8628).
//!
//! Used when no GitHub token was supplied or persisted: the user enters a
//! short code in the browser while the relay polls for the token.

use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tokio::time::Instant;

use crate::headers::{GITHUB_APP_SCOPES, GITHUB_BASE_URL, GITHUB_CLIENT_ID};
use crate::{AuthError, Result};

/// Response from the device authorization endpoint
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeviceCodeResponse {
    pub device_code: String,
    pub user_code: String,
    pub verification_uri: String,
    pub expires_in: u64,
    #[serde(default = "default_interval")]
    pub interval: u64,
}

fn default_interval() -> u64 {
    5
}

#[derive(Debug, Clone, Deserialize)]
struct AccessTokenResponse {
    access_token: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
enum DeviceTokenResponse {
    Success(AccessTokenResponse),
    Pending(DeviceTokenError),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeviceTokenError {
    pub error: String,
    #[serde(default)]
    pub error_description: Option<String>,
}

/// Endpoints and client identity for the flow
#[derive(Debug, Clone)]
pub struct DeviceFlowConfig {
    pub device_code_url: String,
    pub token_url: String,
    pub client_id: String,
    pub scope: String,
}

impl DeviceFlowConfig {
    pub fn github() -> Self {
        Self::with_base_url(GITHUB_BASE_URL)
    }

    pub fn with_base_url(base_url: &str) -> Self {
        let base = base_url.trim_end_matches('/');
        Self {
            device_code_url: format!("{}/login/device/code", base),
            token_url: format!("{}/login/oauth/access_token", base),
            client_id: GITHUB_CLIENT_ID.to_string(),
            scope: GITHUB_APP_SCOPES.to_string(),
        }
    }
}

/// Initiates device authorization flow
pub async fn start_device_flow(
    client: &reqwest::Client,
    config: &DeviceFlowConfig,
) -> Result<DeviceCodeResponse> {
    let response = client
        .post(&config.device_code_url)
        .header("accept", "application/json")
        .form(&[
            ("client_id", config.client_id.as_str()),
            ("scope", config.scope.as_str()),
        ])
        .send()
        .await
        .map_err(|e| AuthError::NetworkError(e.to_string()))?;

    if !response.status().is_success() {
        let status = response.status();
        let body = response
            .text()
            .await
            .unwrap_or_else(|_| "Unable to read response body".to_string());
        return Err(AuthError::OAuthError(format!(
            "Device authorization failed with status {}: {}",
            status, body
        )));
    }

    response
        .json()
        .await
        .map_err(|e| AuthError::OAuthError(format!("Failed to parse device response: {}", e)))
}

/// Polls the token endpoint until authorization completes or the code expires
pub async fn poll_for_token(
    client: &reqwest::Client,
    config: &DeviceFlowConfig,
    device_code: &str,
    interval: u64,
    expires_in: u64,
) -> Result<SecretString> {
    let mut poll_interval = Duration::from_secs(interval);
    let deadline = Instant::now() + Duration::from_secs(expires_in);

    loop {
        if Instant::now() >= deadline {
            return Err(AuthError::DeviceFlowTimeout);
        }

        tokio::time::sleep(poll_interval).await;

        let response = client
            .post(&config.token_url)
            .header("accept", "application/json")
            .form(&[
                ("client_id", config.client_id.as_str()),
                ("device_code", device_code),
                ("grant_type", "urn:ietf:params:oauth:grant-type:device_code"),
            ])
            .send()
            .await
            .map_err(|e| AuthError::NetworkError(e.to_string()))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| AuthError::NetworkError(e.to_string()))?;

        if !status.is_success() && status.as_u16() != 400 {
            return Err(AuthError::OAuthError(format!(
                "Token endpoint returned {}: {}",
                status, body
            )));
        }

        match serde_json::from_str::<DeviceTokenResponse>(&body) {
            Ok(DeviceTokenResponse::Success(token)) => {
                return Ok(SecretString::from(token.access_token));
            }
            Ok(DeviceTokenResponse::Pending(error)) => match error.error.as_str() {
                "authorization_pending" => continue,
                "slow_down" => {
                    // RFC 8628: the interval grows by 5 seconds for good
                    poll_interval += Duration::from_secs(5);
                    continue;
                }
                "expired_token" => return Err(AuthError::DeviceFlowTimeout),
                "access_denied" => {
                    return Err(AuthError::OAuthError(
                        "User denied authorization".to_string(),
                    ))
                }
                _ => {
                    return Err(AuthError::OAuthError(format!(
                        "Device flow error: {} - {}",
                        error.error,
                        error.error_description.unwrap_or_default()
                    )))
                }
            },
            Err(e) => {
                return Err(AuthError::OAuthError(format!(
                    "Failed to parse token response: {} - Body: {}",
                    e, body
                )))
            }
        }
    }
}
