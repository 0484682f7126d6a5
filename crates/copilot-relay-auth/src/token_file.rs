use copilot_relay_core::{atomic_write_secure, paths};
use secrecy::{ExposeSecret, SecretString};
use std::path::{Path, PathBuf};

use crate::{AuthError, Result};

/// On-disk copy of the GitHub token obtained through the device flow.
#[derive(Debug, Clone)]
pub struct GithubTokenFile {
    path: PathBuf,
}

impl Default for GithubTokenFile {
    fn default() -> Self {
        Self::new(paths::github_token_path())
    }
}

impl GithubTokenFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// `Ok(None)` when the file is missing or blank.
    pub fn load(&self) -> Result<Option<SecretString>> {
        if !self.path.exists() {
            return Ok(None);
        }

        let content = std::fs::read_to_string(&self.path)
            .map_err(|e| AuthError::StorageError(format!("Failed to read: {}", e)))?;
        let token = content.trim();

        if token.is_empty() {
            return Ok(None);
        }
        Ok(Some(SecretString::from(token.to_string())))
    }

    pub fn save(&self, token: &SecretString) -> Result<()> {
        atomic_write_secure(&self.path, token.expose_secret().as_bytes())
            .map_err(|e| AuthError::StorageError(format!("Failed to write: {}", e)))
    }

    pub fn clear(&self) -> Result<()> {
        match std::fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}
