//! Per-request pipeline: admission, token, rewrite, forward, relay.

use copilot_relay_auth::{AccessToken, TokenManager};
use copilot_relay_gate::{AdmissionGate, RequestDescriptor};
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::catalog::{CatalogError, CatalogSnapshot, ModelCatalog};
use crate::error::{GatewayError, TranslationError};
use crate::rewrite::{rewrite, rewrite_chat_body};
use crate::streaming::translate_stream;
use crate::translation::{from_chat_completion, to_chat_completion};
use crate::types::{MessagesRequest, TokenCountRequest, TokenCountResponse};
use crate::upstream::{EndpointKind, ResponseBody, Upstream, UpstreamError};

/// Rough characters-per-token ratio for local estimates.
const CHARS_PER_TOKEN: usize = 4;

pub struct Gateway {
    gate: Arc<AdmissionGate>,
    tokens: Arc<TokenManager>,
    catalog: Arc<ModelCatalog>,
    upstream: Arc<dyn Upstream>,
    bypass_credit: bool,
}

impl Gateway {
    pub fn new(
        gate: Arc<AdmissionGate>,
        tokens: Arc<TokenManager>,
        catalog: Arc<ModelCatalog>,
        upstream: Arc<dyn Upstream>,
    ) -> Self {
        Self {
            gate,
            tokens,
            catalog,
            upstream,
            bypass_credit: false,
        }
    }

    pub fn with_bypass_credit(mut self, enabled: bool) -> Self {
        self.bypass_credit = enabled;
        self
    }

    pub fn gate(&self) -> &AdmissionGate {
        &self.gate
    }

    pub fn catalog(&self) -> &ModelCatalog {
        &self.catalog
    }

    /// Anthropic `/v1/messages`.
    pub async fn messages(&self, mut request: MessagesRequest) -> Result<ResponseBody, GatewayError> {
        let descriptor = RequestDescriptor::new(
            "/v1/messages",
            Some(request.model.clone()),
            request.messages.len(),
        );
        self.gate.admit(&descriptor).await?;

        let token = self.tokens.get_valid_token().await?;

        request.messages = rewrite(std::mem::take(&mut request.messages), self.bypass_credit);
        let payload = to_chat_completion(&request)?;

        debug!(
            request_id = %descriptor.id,
            model = %request.model,
            stream = request.is_stream(),
            "forwarding messages request"
        );

        match self
            .forward(token, EndpointKind::ChatCompletions, &payload)
            .await?
        {
            ResponseBody::Json(v) => {
                let response = from_chat_completion(v, &request.model)?;
                let value = serde_json::to_value(response)
                    .map_err(|e| TranslationError::new(e.to_string()))?;
                Ok(ResponseBody::Json(value))
            }
            ResponseBody::EventStream(stream) => Ok(ResponseBody::EventStream(Box::pin(
                translate_stream(stream, request.model),
            ))),
        }
    }

    /// OpenAI-style `/chat/completions`, relayed as-is after rewriting.
    pub async fn chat_completions(&self, mut body: Value) -> Result<ResponseBody, GatewayError> {
        let messages = body
            .get("messages")
            .and_then(|m| m.as_array())
            .ok_or_else(|| GatewayError::InvalidRequest("`messages` must be an array".to_string()))?;

        let descriptor = RequestDescriptor::new(
            "/chat/completions",
            model_of(&body),
            messages.len(),
        );
        self.gate.admit(&descriptor).await?;

        let token = self.tokens.get_valid_token().await?;
        rewrite_chat_body(&mut body, self.bypass_credit);

        self.forward(token, EndpointKind::ChatCompletions, &body)
            .await
    }

    /// `/embeddings`, never rewritten.
    pub async fn embeddings(&self, body: Value) -> Result<ResponseBody, GatewayError> {
        let descriptor = RequestDescriptor::new("/embeddings", model_of(&body), 0);
        self.gate.admit(&descriptor).await?;

        let token = self.tokens.get_valid_token().await?;
        self.forward(token, EndpointKind::Embeddings, &body).await
    }

    pub fn models(&self) -> Result<CatalogSnapshot, CatalogError> {
        self.catalog.list()
    }

    /// OpenAI list shape of the catalog snapshot.
    pub fn models_list(&self) -> Result<Value, GatewayError> {
        let snapshot = self.models()?;
        let data: Vec<Value> = snapshot.values().map(|m| m.to_openai_model()).collect();
        Ok(json!({"object": "list", "data": data, "has_more": false}))
    }

    /// Local estimate for `/v1/messages/count_tokens`; no upstream call.
    pub fn count_tokens(&self, request: &TokenCountRequest) -> TokenCountResponse {
        let mut chars: usize = request
            .messages
            .iter()
            .map(|m| m.content.to_plaintext().chars().count())
            .sum();

        if let Some(system) = &request.system {
            chars += system.to_plaintext().chars().count();
        }
        if let Some(tools) = &request.tools {
            chars += tools
                .iter()
                .map(|t| serde_json::to_string(t).map(|s| s.len()).unwrap_or(0))
                .sum::<usize>();
        }

        let estimate = chars.div_ceil(CHARS_PER_TOKEN).max(1);
        TokenCountResponse {
            input_tokens: u32::try_from(estimate).unwrap_or(u32::MAX),
        }
    }

    /// Send with `token`; on an auth-shaped rejection, refresh once and retry.
    async fn forward(
        &self,
        token: AccessToken,
        endpoint: EndpointKind,
        body: &Value,
    ) -> Result<ResponseBody, GatewayError> {
        match self.upstream.forward(&token, endpoint, body).await {
            Err(UpstreamError::Unauthorized { status, .. }) => {
                warn!(
                    status,
                    endpoint = endpoint.path(),
                    "upstream rejected access token, refreshing and retrying once"
                );
                let fresh = self.tokens.force_refresh(&token).await?;
                let result = self.upstream.forward(&fresh, endpoint, body).await;
                if result.is_ok() {
                    info!(endpoint = endpoint.path(), "retry with refreshed token succeeded");
                }
                Ok(result?)
            }
            other => Ok(other?),
        }
    }
}

fn model_of(body: &Value) -> Option<String> {
    body.get("model")
        .and_then(|m| m.as_str())
        .map(str::to_string)
}
