//! Actix Web HTTP server.
//!
//! Anthropic endpoints:
//! - `POST /v1/messages` (and `/messages`)
//! - `POST /v1/messages/count_tokens`
//!
//! OpenAI-compatible endpoints:
//! - `POST /chat/completions`, `/v1/chat/completions`
//! - `POST /embeddings`, `/v1/embeddings`
//! - `GET /models`, `/v1/models`

use actix_cors::Cors;
use actix_web::{error, web, App, HttpRequest, HttpResponse, HttpServer};
use anyhow::{bail, Context, Result};
use serde_json::Value;
use std::net::TcpListener;
use std::sync::Arc;
use tracing::{info, warn};

use crate::error::GatewayError;
use crate::gateway::Gateway;
use crate::request_log::RequestLogger;
use crate::types::{MessagesRequest, TokenCountRequest};
use crate::upstream::ResponseBody;

pub const DEFAULT_HOST: &str = "127.0.0.1";
pub const DEFAULT_PORT_ATTEMPTS: u16 = 10;

pub struct AppState {
    pub gateway: Arc<Gateway>,
    pub request_log: Option<RequestLogger>,
}

/// Bind the first free port in `start..start + attempts`.
pub fn bind_available(host: &str, start: u16, attempts: u16) -> Result<TcpListener> {
    for offset in 0..attempts {
        let Some(port) = start.checked_add(offset) else {
            break;
        };
        match TcpListener::bind((host, port)) {
            Ok(listener) => {
                if offset > 0 {
                    warn!(requested = start, port, "requested port busy, using next free port");
                }
                return Ok(listener);
            }
            Err(e) if e.kind() == std::io::ErrorKind::AddrInUse => continue,
            Err(e) => return Err(e).with_context(|| format!("failed to bind {}:{}", host, port)),
        }
    }

    bail!(
        "no free port between {} and {}",
        start,
        start.saturating_add(attempts.saturating_sub(1))
    )
}

/// Register routes and the JSON error handler. The caller supplies
/// `web::Data<AppState>`.
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.app_data(web::JsonConfig::default().limit(32 * 1024 * 1024).error_handler(
        |err, _req| {
            let message = err.to_string();
            error::InternalError::from_response(
                err,
                actix_web::ResponseError::error_response(&GatewayError::InvalidRequest(message)),
            )
            .into()
        },
    ))
    .route("/", web::get().to(health_check))
    .route("/models", web::get().to(handle_models))
    .route("/v1/models", web::get().to(handle_models))
    .route("/chat/completions", web::post().to(handle_chat_completions))
    .route("/v1/chat/completions", web::post().to(handle_chat_completions))
    .route("/embeddings", web::post().to(handle_embeddings))
    .route("/v1/embeddings", web::post().to(handle_embeddings))
    .route("/messages", web::post().to(handle_messages))
    .route("/v1/messages", web::post().to(handle_messages))
    .route(
        "/v1/messages/count_tokens",
        web::post().to(handle_count_tokens),
    );
}

pub async fn serve(state: AppState, listener: TcpListener) -> Result<()> {
    let addr = listener.local_addr().context("listener has no address")?;
    info!(addr = %addr, "copilot-relay listening");

    let state = web::Data::new(state);

    HttpServer::new(move || {
        App::new()
            .app_data(state.clone())
            .wrap(Cors::permissive())
            .configure(configure)
    })
    .listen(listener)
    .with_context(|| format!("failed to listen on {}", addr))?
    .run()
    .await
    .context("server error")?;

    Ok(())
}

async fn health_check() -> &'static str {
    "Server running"
}

fn reply(body: ResponseBody) -> HttpResponse {
    match body {
        ResponseBody::Json(v) => HttpResponse::Ok().json(v),
        ResponseBody::EventStream(stream) => HttpResponse::Ok()
            .content_type("text/event-stream")
            .insert_header(("cache-control", "no-cache"))
            .streaming(stream),
    }
}

async fn log_request(state: &AppState, req: &HttpRequest, payload: &Value) {
    let Some(logger) = &state.request_log else {
        return;
    };

    let headers = req.headers();
    let header = |name: &str| headers.get(name).and_then(|v| v.to_str().ok());
    let peer = req.peer_addr().map(|a| a.ip().to_string());
    let ip = header("x-forwarded-for")
        .or_else(|| header("x-real-ip"))
        .or(peer.as_deref());

    logger
        .log_request(
            req.path(),
            req.method().as_str(),
            payload,
            header("user-agent"),
            ip,
        )
        .await;
}

async fn handle_models(state: web::Data<AppState>) -> Result<HttpResponse, GatewayError> {
    Ok(HttpResponse::Ok().json(state.gateway.models_list()?))
}

async fn handle_messages(
    state: web::Data<AppState>,
    req: HttpRequest,
    body: web::Json<Value>,
) -> Result<HttpResponse, GatewayError> {
    let payload = body.into_inner();
    log_request(&state, &req, &payload).await;

    let request: MessagesRequest = serde_json::from_value(payload)
        .map_err(|e| GatewayError::InvalidRequest(e.to_string()))?;

    Ok(reply(state.gateway.messages(request).await?))
}

async fn handle_chat_completions(
    state: web::Data<AppState>,
    req: HttpRequest,
    body: web::Json<Value>,
) -> Result<HttpResponse, GatewayError> {
    let payload = body.into_inner();
    log_request(&state, &req, &payload).await;

    Ok(reply(state.gateway.chat_completions(payload).await?))
}

async fn handle_embeddings(
    state: web::Data<AppState>,
    req: HttpRequest,
    body: web::Json<Value>,
) -> Result<HttpResponse, GatewayError> {
    let payload = body.into_inner();
    log_request(&state, &req, &payload).await;

    Ok(reply(state.gateway.embeddings(payload).await?))
}

async fn handle_count_tokens(
    state: web::Data<AppState>,
    body: web::Json<TokenCountRequest>,
) -> HttpResponse {
    HttpResponse::Ok().json(state.gateway.count_tokens(&body))
}
