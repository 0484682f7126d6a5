//! Opt-in per-request payload logging.
//!
//! Each inbound payload is written to its own JSON file,
//! `request-<unix-millis>-<id>.json`, under the configured directory.
//! Secrets are redacted before the SHA-256 digest is taken.

use chrono::Utc;
use serde::Serialize;
use serde_json::Value;
use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};
use uuid::Uuid;

const SECRET_KEYS: &[&str] = &[
    "api_key",
    "apiKey",
    "token",
    "access_token",
    "authorization",
    "secret",
];

#[derive(Debug, Clone, Serialize)]
pub struct RequestLogEntry {
    pub timestamp: String,
    pub endpoint: String,
    pub method: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_agent: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ip: Option<String>,
    pub payload_digest: String,
    pub payload: Value,
}

#[derive(Debug, Clone)]
pub struct RequestLogger {
    dir: PathBuf,
}

impl RequestLogger {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Write one entry. Failures are logged and otherwise ignored; the
    /// request itself is never affected.
    pub async fn log_request(
        &self,
        endpoint: &str,
        method: &str,
        payload: &Value,
        user_agent: Option<&str>,
        ip: Option<&str>,
    ) -> Option<PathBuf> {
        let redacted = redact_secrets(payload);
        let entry = RequestLogEntry {
            timestamp: Utc::now().to_rfc3339(),
            endpoint: endpoint.to_string(),
            method: method.to_string(),
            user_agent: user_agent.map(str::to_string),
            ip: ip.map(str::to_string),
            payload_digest: compute_digest(&redacted),
            payload: redacted,
        };

        match self.write_entry(&entry).await {
            Ok(path) => {
                debug!(path = %path.display(), endpoint, "request logged");
                Some(path)
            }
            Err(e) => {
                warn!(error = %e, dir = %self.dir.display(), "failed to write request log");
                None
            }
        }
    }

    async fn write_entry(&self, entry: &RequestLogEntry) -> std::io::Result<PathBuf> {
        tokio::fs::create_dir_all(&self.dir).await?;

        let id = Uuid::new_v4().simple().to_string();
        let filename = format!(
            "request-{}-{}.json",
            Utc::now().timestamp_millis(),
            &id[..9]
        );
        let path = self.dir.join(filename);

        let json = serde_json::to_vec_pretty(entry)?;
        tokio::fs::write(&path, json).await?;
        Ok(path)
    }
}

/// Replace secret-looking fields at any depth.
fn redact_secrets(payload: &Value) -> Value {
    match payload {
        Value::Object(obj) => Value::Object(
            obj.iter()
                .map(|(k, v)| {
                    let v = if SECRET_KEYS.contains(&k.as_str()) {
                        Value::String("[REDACTED]".to_string())
                    } else {
                        redact_secrets(v)
                    };
                    (k.clone(), v)
                })
                .collect(),
        ),
        Value::Array(items) => Value::Array(items.iter().map(redact_secrets).collect()),
        other => other.clone(),
    }
}

fn compute_digest(payload: &Value) -> String {
    let json_str = serde_json::to_string(payload).unwrap_or_default();
    let mut hasher = Sha256::new();
    hasher.update(json_str.as_bytes());
    hex::encode(hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::tempdir;

    #[test]
    fn test_redact_secrets_nested() {
        let payload = json!({
            "model": "gpt-4.1",
            "api_key": "sk-secret",
            "metadata": {"token": "abc", "user_id": "u1"},
            "messages": [{"role": "user", "content": "hello"}]
        });

        let redacted = redact_secrets(&payload);
        assert_eq!(redacted["api_key"], "[REDACTED]");
        assert_eq!(redacted["metadata"]["token"], "[REDACTED]");
        assert_eq!(redacted["metadata"]["user_id"], "u1");
        assert_eq!(redacted["messages"][0]["content"], "hello");
    }

    #[test]
    fn test_compute_digest() {
        let digest = compute_digest(&json!({"test": "data"}));
        assert_eq!(digest.len(), 64);
        assert_eq!(digest, compute_digest(&json!({"test": "data"})));
    }

    #[tokio::test]
    async fn test_log_request_writes_file() {
        let dir = tempdir().unwrap();
        let logger = RequestLogger::new(dir.path().join("logs"));

        let path = logger
            .log_request(
                "/v1/messages",
                "POST",
                &json!({"model": "gpt-4.1", "authorization": "Bearer x"}),
                Some("claude-cli/1.0"),
                Some("127.0.0.1"),
            )
            .await
            .unwrap();

        let name = path.file_name().unwrap().to_str().unwrap();
        assert!(name.starts_with("request-"));
        assert!(name.ends_with(".json"));

        let written: Value = serde_json::from_slice(&std::fs::read(&path).unwrap()).unwrap();
        assert_eq!(written["endpoint"], "/v1/messages");
        assert_eq!(written["user_agent"], "claude-cli/1.0");
        assert_eq!(written["payload"]["authorization"], "[REDACTED]");
        assert_eq!(written["payload_digest"].as_str().unwrap().len(), 64);
    }

    #[tokio::test]
    async fn test_unwritable_dir_does_not_fail() {
        let dir = tempdir().unwrap();
        let blocker = dir.path().join("file");
        std::fs::write(&blocker, "x").unwrap();

        let logger = RequestLogger::new(blocker.join("logs"));
        let path = logger
            .log_request("/embeddings", "POST", &json!({}), None, None)
            .await;
        assert!(path.is_none());
    }
}
