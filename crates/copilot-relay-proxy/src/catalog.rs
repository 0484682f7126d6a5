//! Cached view of the models the backend advertises.

use copilot_relay_auth::{AuthError, TokenManager};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::sync::Arc;
use thiserror::Error;
use tracing::{info, warn};

use crate::upstream::{Upstream, UpstreamError};

/// A model id plus whatever capability metadata the backend attached to it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelCatalogEntry {
    pub id: String,
    #[serde(flatten)]
    pub capabilities: Map<String, Value>,
}

impl ModelCatalogEntry {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            capabilities: Map::new(),
        }
    }

    fn str_field(&self, key: &str) -> Option<&str> {
        self.capabilities.get(key).and_then(|v| v.as_str())
    }

    /// Entry in the OpenAI `/models` list shape.
    pub fn to_openai_model(&self) -> Value {
        serde_json::json!({
            "id": self.id,
            "object": "model",
            "type": "model",
            "created": 0,
            "created_at": "1970-01-01T00:00:00.000Z",
            "owned_by": self.str_field("vendor").unwrap_or("github-copilot"),
            "display_name": self.str_field("name").unwrap_or(&self.id),
        })
    }
}

pub type CatalogSnapshot = Arc<BTreeMap<String, ModelCatalogEntry>>;

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("Model catalog has not been loaded yet")]
    NotInitialized,

    #[error("Failed to obtain an access token: {0}")]
    Auth(#[from] AuthError),

    #[error(transparent)]
    Upstream(#[from] UpstreamError),
}

/// Snapshot of the model list, replaced wholesale on every refresh.
pub struct ModelCatalog {
    tokens: Arc<TokenManager>,
    upstream: Arc<dyn Upstream>,
    snapshot: RwLock<Option<CatalogSnapshot>>,
}

impl ModelCatalog {
    pub fn new(tokens: Arc<TokenManager>, upstream: Arc<dyn Upstream>) -> Self {
        Self {
            tokens,
            upstream,
            snapshot: RwLock::new(None),
        }
    }

    /// Fetch the model list and swap it in. On failure the previous snapshot
    /// stays in place.
    pub async fn refresh(&self) -> Result<CatalogSnapshot, CatalogError> {
        let token = self.tokens.get_valid_token().await?;

        let entries = match self.upstream.list_models(&token).await {
            Ok(entries) => entries,
            Err(e) => {
                warn!(error = %e, "model catalog refresh failed");
                return Err(e.into());
            }
        };

        let snapshot: CatalogSnapshot = Arc::new(
            entries
                .into_iter()
                .map(|entry| (entry.id.clone(), entry))
                .collect(),
        );

        info!(models = snapshot.len(), "model catalog refreshed");
        *self.snapshot.write() = Some(Arc::clone(&snapshot));
        Ok(snapshot)
    }

    pub fn list(&self) -> Result<CatalogSnapshot, CatalogError> {
        self.snapshot
            .read()
            .clone()
            .ok_or(CatalogError::NotInitialized)
    }

    pub fn get(&self, id: &str) -> Result<Option<ModelCatalogEntry>, CatalogError> {
        Ok(self.list()?.get(id).cloned())
    }
}
