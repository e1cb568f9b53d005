//! HTTP client for the vendor token endpoint

use super::token::TokenResponse;
use crate::config::{ClientCredentials, OAuthConfig};
use crate::error::{AuthFlowError, RefreshError};
use crate::utils::truncate_for_display;
use std::time::Duration;

/// Longest body excerpt written to logs
const LOGGED_BODY_BYTES: usize = 512;

/// Why a token endpoint call did not produce a parsed response
#[derive(Debug)]
pub(crate) enum ExchangeError {
    /// Non-2xx answer
    Status { status: u16, body: String },
    /// 2xx answer that is not a token JSON object
    Malformed(String),
    /// Connection, timeout or body read failure
    Transport(reqwest::Error),
}

impl From<ExchangeError> for AuthFlowError {
    fn from(err: ExchangeError) -> Self {
        match err {
            ExchangeError::Status { status, body } => Self::ExchangeFailed { status, body },
            ExchangeError::Malformed(msg) => Self::MalformedResponse(msg),
            ExchangeError::Transport(e) => Self::Transport(e),
        }
    }
}

impl From<ExchangeError> for RefreshError {
    fn from(err: ExchangeError) -> Self {
        match err {
            ExchangeError::Status { status, body } => Self::ExchangeFailed { status, body },
            ExchangeError::Malformed(msg) => Self::MalformedResponse(msg),
            ExchangeError::Transport(e) => Self::Transport(e),
        }
    }
}

/// Form-encoded POST client for both grant types
#[derive(Debug, Clone)]
pub struct TokenEndpoint {
    token_url: String,
    http_client: reqwest::Client,
}

impl TokenEndpoint {
    /// Create a client for `config.token_url` with `config.http_timeout`
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be constructed (TLS backend failure).
    pub fn new(config: &OAuthConfig) -> Result<Self, reqwest::Error> {
        Self::with_timeout(config.token_url.clone(), config.http_timeout)
    }

    /// Create a client for an explicit endpoint URL
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be constructed.
    pub fn with_timeout(token_url: String, timeout: Duration) -> Result<Self, reqwest::Error> {
        let http_client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            token_url,
            http_client,
        })
    }

    /// Endpoint URL
    #[must_use]
    pub fn url(&self) -> &str {
        &self.token_url
    }

    /// `grant_type=authorization_code`
    pub(crate) async fn exchange_code(
        &self,
        credentials: &ClientCredentials,
        code: &str,
        redirect_uri: &str,
    ) -> Result<TokenResponse, ExchangeError> {
        let form = [
            ("grant_type", "authorization_code"),
            ("code", code),
            ("client_id", credentials.client_id.as_str()),
            ("client_secret", credentials.client_secret.as_str()),
            ("redirect_uri", redirect_uri),
        ];
        self.post(&form).await
    }

    /// `grant_type=refresh_token`
    pub(crate) async fn refresh(
        &self,
        credentials: &ClientCredentials,
        refresh_token: &str,
    ) -> Result<TokenResponse, ExchangeError> {
        let form = [
            ("grant_type", "refresh_token"),
            ("refresh_token", refresh_token),
            ("client_id", credentials.client_id.as_str()),
            ("client_secret", credentials.client_secret.as_str()),
        ];
        self.post(&form).await
    }

    async fn post(&self, form: &[(&str, &str)]) -> Result<TokenResponse, ExchangeError> {
        let grant_type = form
            .iter()
            .find(|(key, _)| *key == "grant_type")
            .map_or("", |(_, value)| *value);
        tracing::debug!(url = %self.token_url, grant_type, "Calling token endpoint");

        let response = self
            .http_client
            .post(&self.token_url)
            .header("Accept", "application/json")
            .form(form)
            .send()
            .await
            .map_err(ExchangeError::Transport)?;

        let status = response.status();
        let body = response.text().await.map_err(ExchangeError::Transport)?;

        if !status.is_success() {
            tracing::warn!(
                status = status.as_u16(),
                body = %truncate_for_display(&body, LOGGED_BODY_BYTES),
                "Token endpoint rejected {grant_type} grant"
            );
            return Err(ExchangeError::Status {
                status: status.as_u16(),
                body,
            });
        }

        TokenResponse::parse(&body).map_err(ExchangeError::Malformed)
    }
}
