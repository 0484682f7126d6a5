//! reqwest-backed [`Upstream`] for the GitHub Copilot API.

use async_trait::async_trait;
use copilot_relay_auth::headers::{editor_headers, GITHUB_API_VERSION};
use copilot_relay_auth::AccessToken;
use copilot_relay_core::AccountType;
use futures::StreamExt;
use reqwest::{Method, RequestBuilder};
use serde::Deserialize;
use serde_json::Value;
use tracing::debug;
use uuid::Uuid;

use crate::catalog::ModelCatalogEntry;
use crate::upstream::{
    classify_upstream_error, EndpointKind, ResponseBody, Upstream, UpstreamError,
};

const COPILOT_INTEGRATION_ID: &str = "vscode-chat";

#[derive(Debug, Deserialize)]
struct ModelsResponse {
    data: Vec<ModelCatalogEntry>,
}

#[derive(Debug, Clone)]
pub struct CopilotClient {
    client: reqwest::Client,
    base_url: String,
}

impl CopilotClient {
    /// Client for the API host of the given plan.
    pub fn new(client: reqwest::Client, account_type: AccountType) -> Self {
        Self::with_base_url(client, account_type.copilot_base_url())
    }

    pub fn with_base_url(client: reqwest::Client, base_url: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn request(&self, method: Method, path: &str, token: &AccessToken) -> RequestBuilder {
        let url = format!("{}{}", self.base_url, path);
        editor_headers(self.client.request(method, url))
            .bearer_auth(token.expose())
            .header("copilot-integration-id", COPILOT_INTEGRATION_ID)
            .header("openai-intent", "conversation-panel")
            .header("x-github-api-version", GITHUB_API_VERSION)
            .header("x-request-id", Uuid::new_v4().to_string())
    }
}

/// `agent` once the conversation contains assistant or tool turns.
pub fn initiator(body: &Value) -> &'static str {
    let agent_turn = messages(body).any(|m| {
        matches!(
            m.get("role").and_then(|r| r.as_str()),
            Some("assistant") | Some("tool")
        )
    });
    if agent_turn {
        "agent"
    } else {
        "user"
    }
}

pub fn has_vision_content(body: &Value) -> bool {
    messages(body).any(|m| {
        m.get("content")
            .and_then(|c| c.as_array())
            .map_or(false, |parts| {
                parts
                    .iter()
                    .any(|p| p.get("type").and_then(|t| t.as_str()) == Some("image_url"))
            })
    })
}

fn messages(body: &Value) -> impl Iterator<Item = &Value> {
    body.get("messages")
        .and_then(|m| m.as_array())
        .into_iter()
        .flatten()
}

async fn error_from(response: reqwest::Response) -> UpstreamError {
    let status = response.status().as_u16();
    let body = response.text().await.unwrap_or_default();
    classify_upstream_error(status, body)
}

#[async_trait]
impl Upstream for CopilotClient {
    async fn list_models(
        &self,
        token: &AccessToken,
    ) -> Result<Vec<ModelCatalogEntry>, UpstreamError> {
        let response = self.request(Method::GET, "/models", token).send().await?;

        if !response.status().is_success() {
            return Err(error_from(response).await);
        }

        let parsed: ModelsResponse = response
            .json()
            .await
            .map_err(|e| UpstreamError::Decode(e.to_string()))?;
        Ok(parsed.data)
    }

    async fn forward(
        &self,
        token: &AccessToken,
        endpoint: EndpointKind,
        body: &Value,
    ) -> Result<ResponseBody, UpstreamError> {
        let mut request = self.request(Method::POST, endpoint.path(), token);

        if endpoint == EndpointKind::ChatCompletions {
            request = request.header("x-initiator", initiator(body));
            if has_vision_content(body) {
                request = request.header("copilot-vision-request", "true");
            }
        }

        debug!(endpoint = endpoint.path(), "forwarding to Copilot");
        let response = request.json(body).send().await?;

        if !response.status().is_success() {
            return Err(error_from(response).await);
        }

        let is_event_stream = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map_or(false, |ct| ct.starts_with("text/event-stream"));

        if is_event_stream {
            let stream = response
                .bytes_stream()
                .map(|chunk| chunk.map_err(UpstreamError::from))
                .boxed();
            return Ok(ResponseBody::EventStream(stream));
        }

        let json = response
            .json()
            .await
            .map_err(|e| UpstreamError::Decode(e.to_string()))?;
        Ok(ResponseBody::Json(json))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_initiator() {
        assert_eq!(
            initiator(&json!({"messages": [{"role": "user", "content": "hi"}]})),
            "user"
        );
        assert_eq!(
            initiator(&json!({"messages": [
                {"role": "user", "content": "hi"},
                {"role": "assistant", "content": "hello"},
                {"role": "user", "content": "more"}
            ]})),
            "agent"
        );
        assert_eq!(initiator(&json!({"input": "embed me"})), "user");
    }

    #[test]
    fn test_vision_detection() {
        let body = json!({"messages": [{"role": "user", "content": [
            {"type": "text", "text": "look"},
            {"type": "image_url", "image_url": {"url": "data:image/png;base64,AA"}}
        ]}]});
        assert!(has_vision_content(&body));
        assert!(!has_vision_content(&json!({"messages": [{"role": "user", "content": "x"}]})));
    }

    #[test]
    fn test_base_url_follows_account_type() {
        let client = CopilotClient::new(reqwest::Client::new(), AccountType::Business);
        assert_eq!(client.base_url(), AccountType::Business.copilot_base_url());
    }
}
