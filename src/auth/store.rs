//! Persisted configuration: credentials and tokens kept on disk between runs

use super::token::{TokenPair, TokenState, access_token_expired, now_unix, remaining_until};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::io::Write;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Environment variable overriding the store location
pub const CONFIG_PATH_ENV: &str = "SP_API_AUTH_CONFIG";

/// Errors that can occur while reading or writing the store
#[derive(Debug, Error)]
pub enum StoreError {
    /// I/O error during storage operations
    #[error("Storage I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Replacing the store file with the updated copy failed
    #[error("Could not replace {path}: {source}")]
    Persist {
        /// Store file that was being replaced
        path: PathBuf,
        /// Underlying rename error
        source: std::io::Error,
    },
}

/// On-disk key-value document
///
/// Keys other than the ones below are kept as-is so operator-managed settings
/// survive token updates.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PersistedConfig {
    /// OAuth client identifier (operator supplied)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client_id: Option<String>,

    /// OAuth client secret (operator supplied)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client_secret: Option<String>,

    /// Long-lived refresh token
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,

    /// Current access token
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub access_token: Option<String>,

    /// Unix timestamp when `access_token` expires
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub access_token_expires_at: Option<u64>,

    /// Unix timestamp when `access_token` was obtained
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub access_token_obtained_at: Option<u64>,

    /// Everything else found in the file
    #[serde(flatten)]
    pub extra: BTreeMap<String, serde_json::Value>,
}

impl PersistedConfig {
    /// Replace both tokens and the expiry with a freshly obtained pair
    pub fn set_tokens(&mut self, tokens: &TokenPair) {
        self.refresh_token = Some(tokens.refresh_token.clone());
        self.apply_access_token(tokens);
    }

    /// Replace the access token and its timestamps, leaving the refresh token alone
    pub fn apply_access_token(&mut self, tokens: &TokenPair) {
        self.access_token = Some(tokens.access_token.clone());
        self.access_token_expires_at = tokens.expires_at;
        self.access_token_obtained_at = Some(tokens.obtained_at);
    }

    /// Current token pair, if both tokens are stored
    #[must_use]
    pub fn token_pair(&self) -> Option<TokenPair> {
        Some(TokenPair {
            refresh_token: self.refresh_token.clone()?,
            access_token: self.access_token.clone()?,
            obtained_at: self.access_token_obtained_at.unwrap_or_default(),
            expires_at: self.access_token_expires_at,
        })
    }

    /// Lifecycle state of the stored tokens
    #[must_use]
    pub fn state(&self) -> TokenState {
        self.state_at(now_unix())
    }

    pub(crate) fn state_at(&self, now: u64) -> TokenState {
        if self.refresh_token.as_deref().is_none_or(str::is_empty) {
            return TokenState::NoToken;
        }
        match self.access_token.as_deref() {
            Some(token) if !token.is_empty() => {
                if access_token_expired(self.access_token_expires_at, now) {
                    TokenState::Expired
                } else {
                    TokenState::Valid {
                        expires_in: remaining_until(self.access_token_expires_at, now)
                            .unwrap_or_default(),
                    }
                }
            }
            _ => TokenState::Expired,
        }
    }
}

/// File-backed store for [`PersistedConfig`]
#[derive(Debug, Clone)]
pub struct ConfigStore {
    storage_path: PathBuf,
}

impl Default for ConfigStore {
    fn default() -> Self {
        Self::new()
    }
}

impl ConfigStore {
    /// Create a store at the default location
    ///
    /// `SP_API_AUTH_CONFIG` wins over the platform-specific config directory.
    #[must_use]
    pub fn new() -> Self {
        if let Some(path) = std::env::var_os(CONFIG_PATH_ENV).filter(|p| !p.is_empty()) {
            return Self::with_path(PathBuf::from(path));
        }

        let config_dir = dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("sp-api-auth");

        Self {
            storage_path: config_dir.join("config.json"),
        }
    }

    /// Create a store with a custom path
    #[must_use]
    pub fn with_path(path: PathBuf) -> Self {
        Self { storage_path: path }
    }

    /// Get the storage path
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.storage_path
    }

    /// Load the document; a missing file reads as an empty document
    ///
    /// # Errors
    ///
    /// Returns I/O and JSON errors if the file exists but cannot be read.
    pub fn load(&self) -> Result<PersistedConfig, StoreError> {
        if !self.storage_path.exists() {
            return Ok(PersistedConfig::default());
        }

        let content = std::fs::read_to_string(&self.storage_path)?;
        if content.trim().is_empty() {
            return Ok(PersistedConfig::default());
        }
        Ok(serde_json::from_str(&content)?)
    }

    /// Read, mutate and write back the document as one unit
    ///
    /// The mutation runs on an in-memory copy. The result is written to a temporary
    /// file next to the store, synced, and renamed over the original, so a crash
    /// leaves either the old or the new document on disk.
    ///
    /// # Errors
    ///
    /// Returns an error if the current document cannot be read or the new one
    /// cannot be written. The file on disk is unchanged in that case.
    pub fn update<F>(&self, mutate: F) -> Result<PersistedConfig, StoreError>
    where
        F: FnOnce(&mut PersistedConfig),
    {
        let mut config = self.load()?;
        mutate(&mut config);
        self.write(&config)?;
        Ok(config)
    }

    fn write(&self, config: &PersistedConfig) -> Result<(), StoreError> {
        let parent = match self.storage_path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        };
        std::fs::create_dir_all(&parent)?;

        let content = serde_json::to_string_pretty(config)?;

        let temp = tempfile::NamedTempFile::new_in(&parent)?;
        {
            let mut file = temp.as_file();
            #[cfg(unix)]
            {
                use std::os::unix::fs::PermissionsExt;
                file.set_permissions(std::fs::Permissions::from_mode(0o600))?;
            }
            file.write_all(content.as_bytes())?;
            file.write_all(b"\n")?;
            file.sync_all()?;
        }
        temp.persist(&self.storage_path)
            .map_err(|e| StoreError::Persist {
                path: self.storage_path.clone(),
                source: e.error,
            })?;

        tracing::debug!(path = %self.storage_path.display(), "Persisted config written");
        Ok(())
    }
}
