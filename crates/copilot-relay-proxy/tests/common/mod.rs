//! Scripted collaborators shared by the gateway integration tests.

#![allow(dead_code)]

use async_trait::async_trait;
use bytes::Bytes;
use copilot_relay_auth::secrecy::SecretString;
use copilot_relay_auth::{
    AccessToken, Credential, CredentialStore, ExchangedToken, RelayFlags, TokenExchanger,
    TokenManager,
};
use copilot_relay_core::AccountType;
use copilot_relay_gate::AdmissionGate;
use copilot_relay_proxy::{
    EndpointKind, Gateway, ModelCatalog, ModelCatalogEntry, ResponseBody, Upstream,
    UpstreamError,
};
use futures::StreamExt;
use parking_lot::Mutex;
use serde_json::{json, Value};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

pub struct CountingExchanger {
    calls: AtomicUsize,
}

impl CountingExchanger {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            calls: AtomicUsize::new(0),
        })
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl TokenExchanger for CountingExchanger {
    async fn exchange(&self, _credential: &Credential) -> copilot_relay_auth::Result<ExchangedToken> {
        let n = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        Ok(ExchangedToken {
            token: SecretString::from(format!("copilot-{}", n)),
            lifetime: Duration::from_secs(1500),
        })
    }
}

pub enum Scripted {
    Json(Value),
    Stream(Vec<&'static str>),
    Fail(UpstreamError),
}

#[derive(Debug, Clone)]
pub struct ForwardCall {
    pub token: String,
    pub endpoint: EndpointKind,
    pub body: Value,
}

/// Upstream that replays scripted replies and records every call.
pub struct MockUpstream {
    script: Mutex<VecDeque<Scripted>>,
    calls: Mutex<Vec<ForwardCall>>,
    models: Mutex<Result<Vec<ModelCatalogEntry>, UpstreamError>>,
}

impl MockUpstream {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            script: Mutex::new(VecDeque::new()),
            calls: Mutex::new(Vec::new()),
            models: Mutex::new(Ok(vec![
                ModelCatalogEntry::new("gpt-4.1"),
                ModelCatalogEntry::new("claude-sonnet-4"),
            ])),
        })
    }

    pub fn push(&self, reply: Scripted) {
        self.script.lock().push_back(reply);
    }

    pub fn set_models(&self, models: Result<Vec<ModelCatalogEntry>, UpstreamError>) {
        *self.models.lock() = models;
    }

    pub fn calls(&self) -> Vec<ForwardCall> {
        self.calls.lock().clone()
    }
}

pub fn chat_completion(text: &str) -> Value {
    json!({
        "id": "chatcmpl-1",
        "model": "gpt-4.1",
        "choices": [{
            "index": 0,
            "finish_reason": "stop",
            "message": {"role": "assistant", "content": text}
        }],
        "usage": {"prompt_tokens": 7, "completion_tokens": 3}
    })
}

#[async_trait]
impl Upstream for MockUpstream {
    async fn list_models(
        &self,
        _token: &AccessToken,
    ) -> Result<Vec<ModelCatalogEntry>, UpstreamError> {
        self.models.lock().clone()
    }

    async fn forward(
        &self,
        token: &AccessToken,
        endpoint: EndpointKind,
        body: &Value,
    ) -> Result<ResponseBody, UpstreamError> {
        self.calls.lock().push(ForwardCall {
            token: token.expose().to_string(),
            endpoint,
            body: body.clone(),
        });

        let next = self.script.lock().pop_front();
        match next {
            Some(Scripted::Json(v)) => Ok(ResponseBody::Json(v)),
            Some(Scripted::Stream(frames)) => {
                let chunks: Vec<Result<Bytes, UpstreamError>> =
                    frames.into_iter().map(|f| Ok(Bytes::from(f))).collect();
                Ok(ResponseBody::EventStream(futures::stream::iter(chunks).boxed()))
            }
            Some(Scripted::Fail(e)) => Err(e),
            None => Ok(ResponseBody::Json(chat_completion("ok"))),
        }
    }
}

pub struct Harness {
    pub gateway: Arc<Gateway>,
    pub gate: Arc<AdmissionGate>,
    pub tokens: Arc<TokenManager>,
    pub catalog: Arc<ModelCatalog>,
    pub upstream: Arc<MockUpstream>,
    pub exchanger: Arc<CountingExchanger>,
}

pub fn harness(gate: AdmissionGate, bypass_credit: bool) -> Harness {
    let exchanger = CountingExchanger::new();
    let upstream = MockUpstream::new();

    let store = Arc::new(CredentialStore::new(
        Credential::new("gho_test", AccountType::Individual),
        RelayFlags::default(),
    ));
    let tokens = Arc::new(TokenManager::new(store, exchanger.clone()));
    let catalog = Arc::new(ModelCatalog::new(tokens.clone(), upstream.clone()));
    let gate = Arc::new(gate);

    let gateway = Arc::new(
        Gateway::new(gate.clone(), tokens.clone(), catalog.clone(), upstream.clone())
            .with_bypass_credit(bypass_credit),
    );

    Harness {
        gateway,
        gate,
        tokens,
        catalog,
        upstream,
        exchanger,
    }
}

pub fn unauthorized() -> UpstreamError {
    UpstreamError::Unauthorized {
        status: 401,
        body: "unauthorized: token expired".to_string(),
    }
}
