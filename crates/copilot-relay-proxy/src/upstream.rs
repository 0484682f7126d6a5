//! The backend seam: whatever serves `chat/completions`, `embeddings` and the
//! model list on behalf of the gateway.

use async_trait::async_trait;
use bytes::Bytes;
use copilot_relay_auth::AccessToken;
use futures::stream::BoxStream;
use lazy_static::lazy_static;
use regex::Regex;
use serde_json::Value;
use thiserror::Error;

use crate::catalog::ModelCatalogEntry;

/// Raw response bytes relayed to the client as they arrive.
pub type ByteStream = BoxStream<'static, Result<Bytes, UpstreamError>>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EndpointKind {
    ChatCompletions,
    Embeddings,
}

impl EndpointKind {
    pub fn path(&self) -> &'static str {
        match self {
            EndpointKind::ChatCompletions => "/chat/completions",
            EndpointKind::Embeddings => "/embeddings",
        }
    }
}

/// Successful upstream reply.
pub enum ResponseBody {
    Json(Value),
    EventStream(ByteStream),
}

impl std::fmt::Debug for ResponseBody {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ResponseBody::Json(v) => f.debug_tuple("Json").field(v).finish(),
            ResponseBody::EventStream(_) => f.write_str("EventStream(..)"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum UpstreamError {
    /// Auth-shaped rejection; the gateway retries once with a fresh token.
    #[error("Upstream rejected the access token ({status}): {body}")]
    Unauthorized { status: u16, body: String },

    #[error("Upstream returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Upstream request failed: {0}")]
    Network(String),

    #[error("Failed to decode upstream response: {0}")]
    Decode(String),
}

impl From<reqwest::Error> for UpstreamError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            UpstreamError::Decode(err.to_string())
        } else {
            UpstreamError::Network(err.to_string())
        }
    }
}

#[async_trait]
pub trait Upstream: Send + Sync {
    async fn list_models(&self, token: &AccessToken)
        -> Result<Vec<ModelCatalogEntry>, UpstreamError>;

    async fn forward(
        &self,
        token: &AccessToken,
        endpoint: EndpointKind,
        body: &Value,
    ) -> Result<ResponseBody, UpstreamError>;
}

lazy_static! {
    static ref AUTH_PATTERNS: Vec<Regex> = vec![
        Regex::new(r"(?i)unauthorized").unwrap(),
        Regex::new(r"(?i)token.*expired").unwrap(),
        Regex::new(r"(?i)invalid[_\s]?token").unwrap(),
        Regex::new(r"(?i)authentication failed").unwrap(),
        Regex::new(r"(?i)bad credentials").unwrap(),
    ];
}

fn is_auth(message: &str) -> bool {
    AUTH_PATTERNS.iter().any(|pattern| pattern.is_match(message))
}

/// Map a non-success upstream reply to an error.
///
/// 401 is always auth-shaped. Other client errors count when the body reads
/// like a token problem; rate limiting (429) never does.
pub fn classify_upstream_error(status: u16, body: String) -> UpstreamError {
    let auth_shaped = match status {
        401 => true,
        429 => false,
        400..=499 => is_auth(&body),
        _ => false,
    };

    if auth_shaped {
        UpstreamError::Unauthorized { status, body }
    } else {
        UpstreamError::Status { status, body }
    }
}
