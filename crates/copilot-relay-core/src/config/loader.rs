use anyhow::{anyhow, Context, Result};
use std::fs;
use std::path::{Path, PathBuf};

use super::schema::RelayConfig;
use crate::paths;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigFormat {
    Jsonc,
    Json,
    Yaml,
}

impl ConfigFormat {
    pub fn from_path(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_str()?;

        match ext {
            "jsonc" => Some(Self::Jsonc),
            "json" => Some(Self::Json),
            "yml" | "yaml" => Some(Self::Yaml),
            _ => None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ResolvedConfig {
    pub config: RelayConfig,
    pub path: Option<PathBuf>,
    pub format: Option<ConfigFormat>,
}

/// Load the configuration, falling back to defaults when no file exists.
///
/// An explicit `config_path` must exist; discovered candidates are optional.
pub fn load_config(config_path: Option<&Path>) -> Result<RelayConfig> {
    resolve_config(config_path).map(|r| r.config)
}

pub fn resolve_config(config_path: Option<&Path>) -> Result<ResolvedConfig> {
    let path = match config_path {
        Some(path) => Some(path.to_path_buf()),
        None => find_config_file(),
    };

    match path {
        Some(path) => load_config_from_file(&path),
        None => Ok(ResolvedConfig {
            config: RelayConfig::default(),
            path: None,
            format: None,
        }),
    }
}

pub fn load_config_from_file(path: &Path) -> Result<ResolvedConfig> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    let format = ConfigFormat::from_path(path)
        .ok_or_else(|| anyhow!("Unknown config format for: {}", path.display()))?;

    let config = parse_config_content(&content, format)?;
    config
        .validate()
        .map_err(|e| anyhow!("Invalid config {}: {}", path.display(), e))?;

    Ok(ResolvedConfig {
        config,
        path: Some(path.to_path_buf()),
        format: Some(format),
    })
}

fn parse_config_content(content: &str, format: ConfigFormat) -> Result<RelayConfig> {
    match format {
        ConfigFormat::Jsonc => json5::from_str(content).context("Failed to parse JSONC"),
        ConfigFormat::Json => serde_json::from_str(content).context("Failed to parse JSON"),
        ConfigFormat::Yaml => serde_yaml_ng::from_str(content).context("Failed to parse YAML"),
    }
}

const CONFIG_CANDIDATES: &[&str] = &[
    "copilot-relay.jsonc",
    "copilot-relay.json",
    "copilot-relay.yml",
    "copilot-relay.yaml",
    ".copilot-relay.jsonc",
    ".copilot-relay.json",
    ".copilot-relay.yml",
    ".copilot-relay.yaml",
];

pub fn find_config_file() -> Option<PathBuf> {
    find_config_in(Path::new(".")).or_else(|| paths::config_dir().and_then(|d| find_config_in(&d)))
}

fn find_config_in(dir: &Path) -> Option<PathBuf> {
    CONFIG_CANDIDATES
        .iter()
        .map(|candidate| dir.join(candidate))
        .find(|path| path.exists())
}
