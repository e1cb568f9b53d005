//! OAuth 2.0 token lifecycle for the Selling Partner API
//!
//! # Overview
//!
//! Two flows share one persisted configuration file:
//!
//! 1. [`AuthorizationBootstrapper`] runs once. It binds a local redirect listener,
//!    opens the Seller Central consent page, receives the authorization code,
//!    exchanges it for a refresh token and an access token, and stores both.
//! 2. [`TokenRefresher`] runs whenever a fresh access token is needed. It exchanges
//!    the stored refresh token and overwrites only the access token and its expiry.
//!
//! # Example
//!
//! ```no_run
//! use sp_api_auth::auth::{ConfigStore, TokenRefresher};
//! use sp_api_auth::config::{ClientCredentials, OAuthConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let storage = ConfigStore::new();
//!     let credentials = ClientCredentials::resolve(&storage.load()?)?;
//!
//!     let refresher = TokenRefresher::new(&OAuthConfig::from_env(), storage)?;
//!     let tokens = refresher.refresh(&credentials).await?;
//!     println!("Access token expires at: {:?}", tokens.expires_at);
//!     Ok(())
//! }
//! ```
//!
//! # Storage
//!
//! The store is a JSON file in the platform-specific config directory by default
//! (e.g. `~/.config/sp-api-auth/config.json` on Linux). Every write replaces the file
//! atomically and leaves it readable by the owner only. Keep it out of version control.
//!
//! # Security
//!
//! - A random `state` ties the redirect to the run that started it
//! - The listener binds to loopback only and accepts a single redirect
//! - Secrets are masked in output and never logged

mod bootstrap;
mod browser;
mod callback;
mod endpoint;
mod refresh;
pub mod store;
pub mod token;

pub use bootstrap::{AuthorizationBootstrapper, AuthorizationBootstrapperBuilder};
pub use browser::{BrowserLauncher, ManualBrowser, SystemBrowser};
pub use callback::CallbackParams;
pub use endpoint::TokenEndpoint;
pub use refresh::TokenRefresher;
pub use store::{ConfigStore, PersistedConfig, StoreError};
pub use token::{TokenPair, TokenResponse, TokenState};
