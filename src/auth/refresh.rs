//! Non-interactive refresh of the access token

use super::endpoint::TokenEndpoint;
use super::store::ConfigStore;
use super::token::TokenPair;
use crate::config::{ClientCredentials, ConfigError, OAuthConfig};
use crate::error::RefreshError;

/// Exchanges the stored refresh token for a new access token
#[derive(Debug, Clone)]
pub struct TokenRefresher {
    endpoint: TokenEndpoint,
    storage: ConfigStore,
}

impl TokenRefresher {
    /// Create a refresher for `config.token_url` writing to `storage`
    ///
    /// # Errors
    ///
    /// Returns an error if the token URL is invalid or the HTTP client cannot be built.
    pub fn new(config: &OAuthConfig, storage: ConfigStore) -> Result<Self, ConfigError> {
        url::Url::parse(&config.token_url).map_err(|source| ConfigError::InvalidUrl {
            field: "token_url",
            value: config.token_url.clone(),
            source,
        })?;

        Ok(Self {
            endpoint: TokenEndpoint::new(config)?,
            storage,
        })
    }

    /// Get the token storage
    #[must_use]
    pub fn storage(&self) -> &ConfigStore {
        &self.storage
    }

    /// Refresh the access token once
    ///
    /// Only the access token and its timestamps change in the store. If the vendor
    /// rotates the refresh token, the new one replaces the old one in the same write.
    /// No request is sent when no refresh token is stored, and nothing is written
    /// unless the exchange succeeds, so a failed call can simply be repeated.
    ///
    /// # Errors
    ///
    /// Returns a [`RefreshError`] describing the failure.
    pub async fn refresh(&self, credentials: &ClientCredentials) -> Result<TokenPair, RefreshError> {
        let stored = self.storage.load().map_err(RefreshError::Store)?;
        let refresh_token = stored
            .refresh_token
            .filter(|t| !t.is_empty())
            .ok_or(RefreshError::NoRefreshToken)?;

        tracing::debug!("Refreshing access token");
        let response = self
            .endpoint
            .refresh(credentials, &refresh_token)
            .await
            .map_err(RefreshError::from)?;

        let access_token = response
            .access_token
            .filter(|t| !t.is_empty())
            .ok_or_else(|| RefreshError::MalformedResponse("no access_token in response".into()))?;

        let rotated = response.refresh_token.filter(|t| !t.is_empty() && *t != refresh_token);
        if rotated.is_some() {
            tracing::info!("Vendor rotated the refresh token; storing the new one");
        }

        let tokens = TokenPair::new(
            rotated.clone().unwrap_or(refresh_token),
            access_token,
            response.expires_in,
        );

        self.storage
            .update(|config| {
                if rotated.is_some() {
                    config.set_tokens(&tokens);
                } else {
                    config.apply_access_token(&tokens);
                }
            })
            .map_err(RefreshError::PersistFailed)?;

        tracing::info!(
            expires_at = tokens.expires_at,
            path = %self.storage.path().display(),
            "Access token refreshed"
        );
        Ok(tokens)
    }
}
