//! Gateway error taxonomy and its HTTP mapping.

use actix_web::http::{header, StatusCode};
use actix_web::{HttpResponse, ResponseError};
use copilot_relay_auth::AuthError;
use copilot_relay_gate::GateError;
use serde_json::json;
use thiserror::Error;

use crate::catalog::CatalogError;
use crate::upstream::UpstreamError;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{0}")]
pub struct TranslationError(String);

impl TranslationError {
    pub fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }
}

#[derive(Debug, Error)]
pub enum GatewayError {
    #[error(transparent)]
    Admission(#[from] GateError),

    #[error("Upstream authentication failed: {0}")]
    Authentication(#[from] AuthError),

    #[error(transparent)]
    Upstream(#[from] UpstreamError),

    #[error(transparent)]
    Catalog(#[from] CatalogError),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Response translation failed: {0}")]
    Translation(#[from] TranslationError),
}

impl GatewayError {
    /// Anthropic error `type` for the envelope.
    pub fn error_type(&self) -> &'static str {
        match self.status_code().as_u16() {
            400 => "invalid_request_error",
            401 => "authentication_error",
            403 => "permission_error",
            404 => "not_found_error",
            408 => "timeout_error",
            413 => "request_too_large",
            429 => "rate_limit_error",
            503 | 529 => "overloaded_error",
            _ => "api_error",
        }
    }

    fn upstream_status(err: &UpstreamError) -> StatusCode {
        match err {
            UpstreamError::Unauthorized { .. } => StatusCode::UNAUTHORIZED,
            UpstreamError::Status { status, .. } => {
                StatusCode::from_u16(*status).unwrap_or(StatusCode::BAD_GATEWAY)
            }
            UpstreamError::Network(_) | UpstreamError::Decode(_) => StatusCode::BAD_GATEWAY,
        }
    }
}

impl ResponseError for GatewayError {
    fn status_code(&self) -> StatusCode {
        match self {
            GatewayError::Admission(GateError::RateLimitExceeded { .. }) => {
                StatusCode::TOO_MANY_REQUESTS
            }
            GatewayError::Admission(GateError::RequestDenied) => StatusCode::FORBIDDEN,
            GatewayError::Admission(GateError::ApprovalTimedOut { .. }) => {
                StatusCode::REQUEST_TIMEOUT
            }
            GatewayError::Authentication(_) => StatusCode::UNAUTHORIZED,
            GatewayError::Upstream(err) => Self::upstream_status(err),
            GatewayError::Catalog(CatalogError::NotInitialized) => {
                StatusCode::SERVICE_UNAVAILABLE
            }
            GatewayError::Catalog(CatalogError::Auth(_)) => StatusCode::UNAUTHORIZED,
            GatewayError::Catalog(CatalogError::Upstream(err)) => Self::upstream_status(err),
            GatewayError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            GatewayError::Translation(_) => StatusCode::BAD_GATEWAY,
        }
    }

    fn error_response(&self) -> HttpResponse {
        let status = self.status_code();

        // Upstream error bodies are relayed unchanged.
        if let GatewayError::Upstream(UpstreamError::Status { body, .. }) = self {
            let content_type = if serde_json::from_str::<serde_json::Value>(body).is_ok() {
                "application/json"
            } else {
                "text/plain; charset=utf-8"
            };
            return HttpResponse::build(status)
                .content_type(content_type)
                .body(body.clone());
        }

        let mut builder = HttpResponse::build(status);
        if let GatewayError::Admission(err) = self {
            if let Some(secs) = err.retry_after_secs() {
                builder.insert_header((header::RETRY_AFTER, secs.to_string()));
            }
        }

        builder.json(json!({
            "type": "error",
            "error": {
                "type": self.error_type(),
                "message": self.to_string(),
            }
        }))
    }
}
