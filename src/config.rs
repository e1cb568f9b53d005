//! Vendor endpoint configuration and client credentials

use crate::auth::store::{PersistedConfig, StoreError};
use std::fmt;
use std::time::Duration;
use thiserror::Error;
use typed_builder::TypedBuilder;

/// Seller Central consent page
pub const DEFAULT_AUTHORIZE_URL: &str = "https://sellercentral.amazon.com/apps/authorize/consent";
/// Login with Amazon token endpoint
pub const DEFAULT_TOKEN_URL: &str = "https://api.amazon.com/auth/o2/token";
/// Path served by the local redirect listener
pub const DEFAULT_CALLBACK_PATH: &str = "/callback";
/// Port of the local redirect listener
pub const DEFAULT_REDIRECT_PORT: u16 = 8888;
/// How long the bootstrapper waits for the browser redirect
pub const DEFAULT_CALLBACK_TIMEOUT: Duration = Duration::from_secs(300);
/// Network timeout for token endpoint requests
pub const DEFAULT_HTTP_TIMEOUT: Duration = Duration::from_secs(30);

/// Environment variable overriding the client id
pub const CLIENT_ID_ENV: &str = "AMAZON_CLIENT_ID";
/// Environment variable overriding the client secret
pub const CLIENT_SECRET_ENV: &str = "AMAZON_CLIENT_SECRET";

/// Errors resolving configuration before a flow can start
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A credential is neither in the store nor in the environment
    #[error("Missing {field}: set it in the config file or via {env}")]
    MissingCredentials {
        /// Store key that is missing
        field: &'static str,
        /// Environment variable that could supply it
        env: &'static str,
    },

    /// The store could not be read
    #[error("Could not read config: {0}")]
    Store(#[from] StoreError),

    /// A configured endpoint is not a valid absolute URL
    #[error("Invalid {field} {value:?}: {source}")]
    InvalidUrl {
        /// Which setting
        field: &'static str,
        /// Configured value
        value: String,
        /// Parse failure
        source: url::ParseError,
    },

    /// The HTTP client could not be constructed
    #[error("Could not build HTTP client: {0}")]
    HttpClient(#[from] reqwest::Error),
}

/// OAuth client credentials issued by the vendor
///
/// The secret never appears in `Debug` output.
#[derive(Clone, PartialEq, Eq)]
pub struct ClientCredentials {
    /// OAuth client identifier
    pub client_id: String,
    /// OAuth client secret
    pub client_secret: String,
}

impl ClientCredentials {
    /// Create credentials from explicit values
    pub fn new(client_id: impl Into<String>, client_secret: impl Into<String>) -> Self {
        Self {
            client_id: client_id.into(),
            client_secret: client_secret.into(),
        }
    }

    /// Resolve credentials from the store, letting the process environment override them
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::MissingCredentials` if either value is unset or empty.
    pub fn resolve(config: &PersistedConfig) -> Result<Self, ConfigError> {
        Self::resolve_with(config, |key| std::env::var(key).ok())
    }

    /// Same as [`resolve`](Self::resolve) with an explicit environment lookup
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::MissingCredentials` if either value is unset or empty.
    pub fn resolve_with<F>(config: &PersistedConfig, lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let pick = |env: &'static str, field: &'static str, stored: &Option<String>| {
            lookup(env)
                .filter(|v| !v.is_empty())
                .or_else(|| stored.clone().filter(|v| !v.is_empty()))
                .ok_or(ConfigError::MissingCredentials { field, env })
        };

        Ok(Self {
            client_id: pick(CLIENT_ID_ENV, "client_id", &config.client_id)?,
            client_secret: pick(CLIENT_SECRET_ENV, "client_secret", &config.client_secret)?,
        })
    }
}

impl fmt::Debug for ClientCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientCredentials")
            .field("client_id", &self.client_id)
            .field("client_secret", &"<redacted>")
            .finish()
    }
}

/// Vendor endpoints and flow limits
#[derive(Debug, Clone, TypedBuilder)]
#[builder(
    builder_method(doc = "Create a new builder for OAuthConfig"),
    builder_type(doc = "Builder for OAuthConfig", vis = "pub"),
    build_method(doc = "Build the OAuthConfig")
)]
pub struct OAuthConfig {
    /// Consent page the operator is sent to
    #[builder(default = DEFAULT_AUTHORIZE_URL.to_string(), setter(into))]
    pub authorize_url: String,

    /// Token endpoint for both grant types
    #[builder(default = DEFAULT_TOKEN_URL.to_string(), setter(into))]
    pub token_url: String,

    /// Path the local listener accepts the redirect on
    #[builder(default = DEFAULT_CALLBACK_PATH.to_string(), setter(into))]
    pub callback_path: String,

    /// Port the local listener binds (0 picks a free port)
    #[builder(default = DEFAULT_REDIRECT_PORT)]
    pub redirect_port: u16,

    /// Upper bound on the wait for the browser redirect
    #[builder(default = DEFAULT_CALLBACK_TIMEOUT)]
    pub callback_timeout: Duration,

    /// Network timeout for token endpoint requests
    #[builder(default = DEFAULT_HTTP_TIMEOUT)]
    pub http_timeout: Duration,

    /// Additional query parameters for the consent URL
    #[builder(default)]
    pub extra_authorize_params: Vec<(String, String)>,
}

impl Default for OAuthConfig {
    fn default() -> Self {
        Self::builder().build()
    }
}

impl OAuthConfig {
    /// Defaults overridden by `SP_API_*` environment variables
    #[must_use]
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub(crate) fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(url) = lookup("SP_API_AUTHORIZE_URL").filter(|v| !v.is_empty()) {
            config.authorize_url = url;
        }
        if let Some(url) = lookup("SP_API_TOKEN_URL").filter(|v| !v.is_empty()) {
            config.token_url = url;
        }
        if let Some(port) = lookup("SP_API_REDIRECT_PORT") {
            match port.parse() {
                Ok(port) => config.redirect_port = port,
                Err(e) => tracing::warn!("Ignoring SP_API_REDIRECT_PORT={port}: {e}"),
            }
        }
        // Seller Central identifies the app by its application id, not the LWA client id
        if let Some(app_id) = lookup("SP_API_APPLICATION_ID").filter(|v| !v.is_empty()) {
            config
                .extra_authorize_params
                .push(("application_id".to_string(), app_id));
            config
                .extra_authorize_params
                .push(("version".to_string(), "beta".to_string()));
        }

        config
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env(pairs: &[(&str, &str)]) -> Box<dyn Fn(&str) -> Option<String>> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        Box::new(move |key| map.get(key).cloned())
    }

    #[test]
    fn test_oauth_config_default() {
        let config = OAuthConfig::default();
        assert_eq!(config.authorize_url, DEFAULT_AUTHORIZE_URL);
        assert_eq!(config.token_url, DEFAULT_TOKEN_URL);
        assert_eq!(config.redirect_port, 8888);
        assert_eq!(config.callback_timeout, Duration::from_secs(300));
        assert_eq!(config.http_timeout, Duration::from_secs(30));
        assert!(config.extra_authorize_params.is_empty());
    }

    #[test]
    fn test_oauth_config_builder() {
        let config = OAuthConfig::builder()
            .token_url("http://127.0.0.1:9999/auth/o2/token")
            .redirect_port(0)
            .build();
        assert_eq!(config.token_url, "http://127.0.0.1:9999/auth/o2/token");
        assert_eq!(config.redirect_port, 0);
        assert_eq!(config.callback_path, DEFAULT_CALLBACK_PATH);
    }

    #[test]
    fn test_oauth_config_from_lookup() {
        let config = OAuthConfig::from_lookup(env(&[
            ("SP_API_TOKEN_URL", "https://api.amazon.co.uk/auth/o2/token"),
            ("SP_API_REDIRECT_PORT", "9090"),
            ("SP_API_APPLICATION_ID", "amzn1.sp.solution.abc"),
        ]));
        assert_eq!(config.token_url, "https://api.amazon.co.uk/auth/o2/token");
        assert_eq!(config.redirect_port, 9090);
        assert_eq!(
            config.extra_authorize_params,
            vec![
                ("application_id".to_string(), "amzn1.sp.solution.abc".to_string()),
                ("version".to_string(), "beta".to_string()),
            ]
        );
    }

    #[test]
    fn test_invalid_port_keeps_default() {
        let config = OAuthConfig::from_lookup(env(&[("SP_API_REDIRECT_PORT", "eighty")]));
        assert_eq!(config.redirect_port, DEFAULT_REDIRECT_PORT);
    }

    #[test]
    fn test_credentials_from_store() {
        let stored = PersistedConfig {
            client_id: Some("client".to_string()),
            client_secret: Some("secret".to_string()),
            ..Default::default()
        };
        let creds = ClientCredentials::resolve_with(&stored, env(&[])).unwrap();
        assert_eq!(creds, ClientCredentials::new("client", "secret"));
    }

    #[test]
    fn test_environment_overrides_store() {
        let stored = PersistedConfig {
            client_id: Some("client".to_string()),
            client_secret: Some("secret".to_string()),
            ..Default::default()
        };
        let creds =
            ClientCredentials::resolve_with(&stored, env(&[(CLIENT_SECRET_ENV, "rotated")]))
                .unwrap();
        assert_eq!(creds.client_id, "client");
        assert_eq!(creds.client_secret, "rotated");
    }

    #[test]
    fn test_missing_credentials() {
        let stored = PersistedConfig {
            client_id: Some("client".to_string()),
            client_secret: Some(String::new()),
            ..Default::default()
        };
        let err = ClientCredentials::resolve_with(&stored, env(&[])).unwrap_err();
        assert!(matches!(
            err,
            ConfigError::MissingCredentials {
                field: "client_secret",
                ..
            }
        ));
    }

    #[test]
    fn test_debug_redacts_secret() {
        let creds = ClientCredentials::new("client", "super-secret");
        let debug = format!("{creds:?}");
        assert!(debug.contains("client"));
        assert!(!debug.contains("super-secret"));
    }
}
