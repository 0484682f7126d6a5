//! Shell snippets for pointing Claude Code at the relay.

use copilot_relay_proxy::CatalogSnapshot;

const PREFERRED_MODEL: &str = "claude-sonnet-4";
const PREFERRED_SMALL_MODEL: &str = "gpt-4.1";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LaunchEnv {
    pub base_url: String,
    pub model: String,
    pub small_fast_model: String,
}

impl LaunchEnv {
    pub fn new(base_url: impl Into<String>, catalog: &CatalogSnapshot) -> Self {
        let model = pick(catalog, PREFERRED_MODEL, |id| id.contains("claude"));
        let small_fast_model = pick(catalog, PREFERRED_SMALL_MODEL, |id| id.starts_with("gpt"));
        Self {
            base_url: base_url.into(),
            model,
            small_fast_model,
        }
    }

    fn vars(&self) -> [(&'static str, &str); 4] {
        [
            ("ANTHROPIC_BASE_URL", &self.base_url),
            ("ANTHROPIC_AUTH_TOKEN", "dummy"),
            ("ANTHROPIC_MODEL", &self.model),
            ("ANTHROPIC_SMALL_FAST_MODEL", &self.small_fast_model),
        ]
    }

    pub fn posix_command(&self) -> String {
        let vars: Vec<String> = self
            .vars()
            .iter()
            .map(|(k, v)| format!("{}={}", k, v))
            .collect();
        format!("{} claude", vars.join(" "))
    }

    pub fn powershell_command(&self) -> String {
        let vars: Vec<String> = self
            .vars()
            .iter()
            .map(|(k, v)| format!("$env:{}=\"{}\";", k, v))
            .collect();
        format!("{} claude", vars.join(" "))
    }
}

/// Exact id, then the first id matching `fallback`, then the first id.
fn pick(catalog: &CatalogSnapshot, preferred: &str, fallback: impl Fn(&str) -> bool) -> String {
    if catalog.contains_key(preferred) {
        return preferred.to_string();
    }
    catalog
        .keys()
        .find(|id| fallback(id))
        .or_else(|| catalog.keys().next())
        .cloned()
        .unwrap_or_else(|| preferred.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use copilot_relay_proxy::ModelCatalogEntry;
    use std::collections::BTreeMap;
    use std::sync::Arc;

    fn catalog(ids: &[&str]) -> CatalogSnapshot {
        Arc::new(
            ids.iter()
                .map(|id| (id.to_string(), ModelCatalogEntry::new(*id)))
                .collect::<BTreeMap<_, _>>(),
        )
    }

    #[test]
    fn test_preferred_models() {
        let env = LaunchEnv::new(
            "http://127.0.0.1:4141",
            &catalog(&["claude-sonnet-4", "gpt-4.1", "o3-mini"]),
        );
        assert_eq!(
            env.posix_command(),
            "ANTHROPIC_BASE_URL=http://127.0.0.1:4141 ANTHROPIC_AUTH_TOKEN=dummy \
             ANTHROPIC_MODEL=claude-sonnet-4 ANTHROPIC_SMALL_FAST_MODEL=gpt-4.1 claude"
        );
        assert!(env
            .powershell_command()
            .starts_with("$env:ANTHROPIC_BASE_URL=\"http://127.0.0.1:4141\";"));
    }

    #[test]
    fn test_fallback_models() {
        let env = LaunchEnv::new("http://x", &catalog(&["claude-3.7-sonnet", "gpt-4o", "o1"]));
        assert_eq!(env.model, "claude-3.7-sonnet");
        assert_eq!(env.small_fast_model, "gpt-4o");

        let env = LaunchEnv::new("http://x", &catalog(&["o1"]));
        assert_eq!(env.model, "o1");
        assert_eq!(env.small_fast_model, "o1");
    }
}
