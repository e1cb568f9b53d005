//! Token pair and token endpoint response types

use crate::utils::mask_secret;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

/// Seconds before `expires_at` at which an access token is already treated as expired
pub const EXPIRY_BUFFER_SECS: u64 = 60;

/// Lifetime assumed when the token endpoint omits `expires_in` (Login with Amazon issues one-hour tokens)
pub const DEFAULT_ACCESS_TOKEN_TTL_SECS: u64 = 3600;

/// Current Unix time in seconds
#[must_use]
pub fn now_unix() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or(Duration::ZERO)
        .as_secs()
}

/// Refresh token together with the access token it most recently produced
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenPair {
    /// Long-lived credential, durable across runs
    pub refresh_token: String,

    /// Short-lived credential for API calls
    pub access_token: String,

    /// Unix timestamp when the access token was obtained
    pub obtained_at: u64,

    /// Unix timestamp when the access token expires (`None` only for hand-edited stores)
    pub expires_at: Option<u64>,
}

impl TokenPair {
    /// Build a pair from freshly issued tokens
    ///
    /// A missing `expires_in` falls back to [`DEFAULT_ACCESS_TOKEN_TTL_SECS`]. Oversized
    /// values saturate instead of overflowing.
    #[must_use]
    pub fn new(refresh_token: String, access_token: String, expires_in: Option<u64>) -> Self {
        let obtained_at = now_unix();
        let lifetime = expires_in.unwrap_or(DEFAULT_ACCESS_TOKEN_TTL_SECS);
        Self {
            refresh_token,
            access_token,
            obtained_at,
            expires_at: Some(obtained_at.saturating_add(lifetime)),
        }
    }

    /// Check if the access token is expired (with 60 second buffer)
    #[must_use]
    pub fn is_expired(&self) -> bool {
        access_token_expired(self.expires_at, now_unix())
    }

    /// Get remaining validity of the access token, if known
    #[must_use]
    pub fn remaining_validity(&self) -> Option<Duration> {
        remaining_until(self.expires_at, now_unix())
    }
}

impl fmt::Debug for TokenPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenPair")
            .field("refresh_token", &mask_secret(&self.refresh_token))
            .field("access_token", &mask_secret(&self.access_token))
            .field("obtained_at", &self.obtained_at)
            .field("expires_at", &self.expires_at)
            .finish()
    }
}

/// An access token without a recorded expiry is never trusted
pub(crate) fn access_token_expired(expires_at: Option<u64>, now: u64) -> bool {
    match expires_at {
        Some(expires_at) => now.saturating_add(EXPIRY_BUFFER_SECS) >= expires_at,
        None => true,
    }
}

pub(crate) fn remaining_until(expires_at: Option<u64>, now: u64) -> Option<Duration> {
    expires_at.and_then(|expires_at| {
        if expires_at > now {
            Some(Duration::from_secs(expires_at - now))
        } else {
            None
        }
    })
}

/// JSON body returned by the token endpoint for either grant type
///
/// Every field is optional here; each flow decides which ones it requires.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TokenResponse {
    /// Newly issued access token
    #[serde(default)]
    pub access_token: Option<String>,

    /// Refresh token (always on code exchange, only on rotation for refresh)
    #[serde(default)]
    pub refresh_token: Option<String>,

    /// Token type (usually "bearer")
    #[serde(default)]
    pub token_type: Option<String>,

    /// Access token lifetime in seconds
    #[serde(default)]
    pub expires_in: Option<u64>,
}

impl TokenResponse {
    /// Parse a response body
    ///
    /// # Errors
    ///
    /// Returns a description of the problem when the body is not a JSON object.
    pub fn parse(body: &str) -> Result<Self, String> {
        serde_json::from_str(body).map_err(|e| format!("failed to parse token response: {e}"))
    }
}

/// Lifecycle state derived from what the store currently holds
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenState {
    /// No refresh token stored; authorization has to run first
    NoToken,
    /// Refresh token stored but the access token is missing or expired
    Expired,
    /// Access token present and not expired
    Valid {
        /// Remaining validity
        expires_in: Duration,
    },
}

impl TokenState {
    /// Short label for operator output
    #[must_use]
    pub fn label(&self) -> &'static str {
        match self {
            TokenState::NoToken => "no token",
            TokenState::Expired => "expired",
            TokenState::Valid { .. } => "valid",
        }
    }
}
