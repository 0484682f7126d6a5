//! Anthropic-compatible front end for the GitHub Copilot API.
//!
//! Inbound `/v1/messages` traffic is admitted by the gate, rewritten,
//! translated to `chat/completions`, forwarded with a valid Copilot token and
//! translated back (including SSE streams). OpenAI-style `chat/completions`
//! and `embeddings` requests are relayed with the same admission and token
//! handling.

pub mod catalog;
pub mod copilot;
pub mod error;
pub mod gateway;
pub mod request_log;
pub mod rewrite;
pub mod server;
pub mod streaming;
pub mod translation;
pub mod types;
pub mod upstream;

pub use catalog::{CatalogError, CatalogSnapshot, ModelCatalog, ModelCatalogEntry};
pub use copilot::CopilotClient;
pub use error::{GatewayError, TranslationError};
pub use gateway::Gateway;
pub use request_log::RequestLogger;
pub use server::{bind_available, serve, AppState};
pub use upstream::{
    classify_upstream_error, ByteStream, EndpointKind, ResponseBody, Upstream, UpstreamError,
};
