//! One-time authorization code flow that produces the refresh token

use super::browser::{BrowserLauncher, SystemBrowser};
use super::callback::{CallbackListener, CallbackParams, WaitError};
use super::endpoint::TokenEndpoint;
use super::store::ConfigStore;
use super::token::TokenPair;
use crate::config::{ClientCredentials, ConfigError, OAuthConfig};
use crate::error::AuthFlowError;
use crate::utils::mask_secret;
use base64::{Engine, engine::general_purpose::URL_SAFE_NO_PAD};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use url::Url;

/// Generate a CSRF `state` value (32 random bytes, base64url)
fn generate_state() -> String {
    URL_SAFE_NO_PAD.encode(rand::random::<[u8; 32]>())
}

/// Check the redirect against the generated state and pull out the code
///
/// The state is checked first: a redirect that does not belong to this run is
/// rejected even if it carries a code.
fn check_callback(params: CallbackParams, expected_state: &str) -> Result<String, AuthFlowError> {
    if params.state.as_deref() != Some(expected_state) {
        return Err(AuthFlowError::StateMismatch);
    }
    let vendor_error = params.vendor_error();
    params
        .code
        .ok_or(AuthFlowError::MissingCode {
            error: vendor_error,
        })
}

/// Builder for [`AuthorizationBootstrapper`]
pub struct AuthorizationBootstrapperBuilder {
    config: OAuthConfig,
    storage: Option<ConfigStore>,
    browser: Arc<dyn BrowserLauncher>,
    cancel: CancellationToken,
}

impl AuthorizationBootstrapperBuilder {
    fn new() -> Self {
        Self {
            config: OAuthConfig::default(),
            storage: None,
            browser: Arc::new(SystemBrowser),
            cancel: CancellationToken::new(),
        }
    }

    /// Set endpoint configuration
    #[must_use]
    pub fn config(mut self, config: OAuthConfig) -> Self {
        self.config = config;
        self
    }

    /// Set the store the tokens are written to
    #[must_use]
    pub fn storage(mut self, storage: ConfigStore) -> Self {
        self.storage = Some(storage);
        self
    }

    /// Set how the consent page is opened (default: system browser)
    #[must_use]
    pub fn browser(mut self, browser: Arc<dyn BrowserLauncher>) -> Self {
        self.browser = browser;
        self
    }

    /// Token that aborts the wait for the redirect
    #[must_use]
    pub fn cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// Build the bootstrapper
    ///
    /// # Errors
    ///
    /// Returns an error if the consent URL is invalid or the HTTP client cannot be built.
    pub fn build(self) -> Result<AuthorizationBootstrapper, ConfigError> {
        let authorize_url =
            Url::parse(&self.config.authorize_url).map_err(|source| ConfigError::InvalidUrl {
                field: "authorize_url",
                value: self.config.authorize_url.clone(),
                source,
            })?;
        Url::parse(&self.config.token_url).map_err(|source| ConfigError::InvalidUrl {
            field: "token_url",
            value: self.config.token_url.clone(),
            source,
        })?;
        let endpoint = TokenEndpoint::new(&self.config)?;

        Ok(AuthorizationBootstrapper {
            authorize_url,
            endpoint,
            storage: self.storage.unwrap_or_default(),
            browser: self.browser,
            cancel: self.cancel,
            config: self.config,
        })
    }
}

/// Interactive flow: consent page → redirect → code exchange → persisted tokens
pub struct AuthorizationBootstrapper {
    config: OAuthConfig,
    authorize_url: Url,
    endpoint: TokenEndpoint,
    storage: ConfigStore,
    browser: Arc<dyn BrowserLauncher>,
    cancel: CancellationToken,
}

impl std::fmt::Debug for AuthorizationBootstrapper {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthorizationBootstrapper")
            .field("config", &self.config)
            .field("storage", &self.storage)
            .finish_non_exhaustive()
    }
}

impl AuthorizationBootstrapper {
    /// Create a builder for custom configuration
    #[must_use]
    pub fn builder() -> AuthorizationBootstrapperBuilder {
        AuthorizationBootstrapperBuilder::new()
    }

    /// Get the token storage
    #[must_use]
    pub fn storage(&self) -> &ConfigStore {
        &self.storage
    }

    /// Consent page URL for one run of the flow
    #[must_use]
    pub fn consent_url(&self, client_id: &str, redirect_uri: &str, state: &str) -> Url {
        let mut url = self.authorize_url.clone();
        {
            let mut params = url.query_pairs_mut();
            params.append_pair("response_type", "code");
            params.append_pair("client_id", client_id);
            params.append_pair("redirect_uri", redirect_uri);
            params.append_pair("state", state);
            for (key, value) in &self.config.extra_authorize_params {
                params.append_pair(key, value);
            }
        }
        url
    }

    /// Run the authorization code flow once
    ///
    /// Binds the redirect listener on `redirect_port`, opens the consent page, waits for
    /// the redirect, exchanges the code and writes both tokens to the store.
    ///
    /// # Errors
    ///
    /// Returns an [`AuthFlowError`] for any failure. The store is only written after a
    /// successful exchange; if that write fails the tokens travel inside
    /// [`AuthFlowError::PersistFailed`].
    pub async fn run(
        &self,
        credentials: &ClientCredentials,
        redirect_port: u16,
    ) -> Result<TokenPair, AuthFlowError> {
        let state = generate_state();

        let listener = CallbackListener::bind(redirect_port, self.config.callback_path.clone())
            .await
            .map_err(AuthFlowError::Listener)?;
        let redirect_uri = listener.redirect_uri();
        let consent_url = self.consent_url(&credentials.client_id, &redirect_uri, &state);

        println!("\nSP-API Authorization");
        println!("────────────────────");
        println!();
        println!("Client ID: {}", mask_secret(&credentials.client_id));
        println!("Redirect URI (must be registered for the app): {redirect_uri}");
        println!();
        println!("Authorization URL:");
        println!("  {consent_url}");
        println!();

        match self.browser.open(consent_url.as_str()) {
            Ok(()) => println!("(Opening browser...)"),
            Err(e) => {
                tracing::debug!("Could not open browser: {e}");
                println!("(Could not open browser automatically - please open the URL manually)");
            }
        }
        println!(
            "Waiting up to {}s for authorization on port {}...",
            self.config.callback_timeout.as_secs(),
            listener.port()
        );

        let params = listener
            .wait(self.config.callback_timeout, &self.cancel)
            .await
            .map_err(|e| match e {
                WaitError::Timeout => AuthFlowError::Timeout(self.config.callback_timeout),
                WaitError::Cancelled => AuthFlowError::Cancelled,
            })?;

        let code = check_callback(params, &state)?;
        tracing::info!("Authorization code received");
        println!("\nReceived authorization code. Exchanging for tokens...");

        let response = self
            .endpoint
            .exchange_code(credentials, &code, &redirect_uri)
            .await
            .map_err(AuthFlowError::from)?;

        let refresh_token = response
            .refresh_token
            .filter(|t| !t.is_empty())
            .ok_or_else(|| AuthFlowError::MalformedResponse("no refresh_token in response".into()))?;
        let access_token = response
            .access_token
            .filter(|t| !t.is_empty())
            .ok_or_else(|| AuthFlowError::MalformedResponse("no access_token in response".into()))?;
        let tokens = TokenPair::new(refresh_token, access_token, response.expires_in);

        println!();
        println!("✓ Tokens received.");
        println!("  Access token:  {}", mask_secret(&tokens.access_token));
        println!("  Refresh token: {}", mask_secret(&tokens.refresh_token));
        if let Some(expires_in) = response.expires_in {
            println!("  Access token expires in: {expires_in} seconds");
        }

        self.storage
            .update(|config| config.set_tokens(&tokens))
            .map_err(|source| AuthFlowError::PersistFailed {
                tokens: Box::new(tokens.clone()),
                source,
            })?;

        tracing::info!(path = %self.storage.path().display(), "Tokens persisted");
        println!();
        println!("✓ Tokens saved to:");
        println!("  {}", self.storage.path().display());

        Ok(tokens)
    }
}
