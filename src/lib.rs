//! # SP-API OAuth token utilities
//!
//! Obtain and refresh Login with Amazon tokens for the Selling Partner API.
//! Async/await, strong typing, tokio-based.
//!
//! ## Quick Start
//!
//! Run the one-time authorization, then refresh whenever the access token is stale:
//!
//! ```bash
//! export AMAZON_CLIENT_ID=amzn1.application-oa2-client.xxxxx
//! export AMAZON_CLIENT_SECRET=xxxxx
//! obtain-tokens            # browser consent, stores refresh + access token
//! refresh-token            # new access token from the stored refresh token
//! token-status             # what is stored and whether it is still valid
//! ```
//!
//! The same flows are available as a library:
//!
//! ```no_run
//! use sp_api_auth::auth::{AuthorizationBootstrapper, ConfigStore};
//! use sp_api_auth::config::{ClientCredentials, OAuthConfig};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = OAuthConfig::from_env();
//! let port = config.redirect_port;
//! let bootstrapper = AuthorizationBootstrapper::builder()
//!     .config(config)
//!     .storage(ConfigStore::new())
//!     .build()?;
//!
//! let credentials = ClientCredentials::new("client-id", "client-secret");
//! let tokens = bootstrapper.run(&credentials, port).await?;
//! # Ok(())
//! # }
//! ```
//!
//! ## Architecture
//!
//! - [`auth`]: authorization and refresh flows, token types, persisted store
//! - [`config`]: endpoint configuration and client credentials
//! - [`error`]: flow error types and failure classification
//! - [`logging`]: tracing subscriber setup for the binaries
//! - [`utils`]: masking and truncation for operator output
//!
//! ## Logging
//!
//! This crate uses [`tracing`](https://crates.io/crates/tracing). Events are zero-cost
//! when no subscriber is attached; the binaries install one through [`logging::init`].
//!
//! ## Error Handling
//!
//! Each flow has its own error type. Both classify failures as retryable or fatal:
//!
//! ```no_run
//! # use sp_api_auth::auth::{ConfigStore, TokenRefresher};
//! # use sp_api_auth::config::{ClientCredentials, OAuthConfig};
//! # use sp_api_auth::error::{FailureKind, RefreshError};
//! # async fn example(refresher: TokenRefresher, credentials: ClientCredentials) {
//! match refresher.refresh(&credentials).await {
//!     Ok(tokens) => println!("expires at {:?}", tokens.expires_at),
//!     Err(RefreshError::NoRefreshToken) => eprintln!("run obtain-tokens first"),
//!     Err(e) if e.failure_kind() == FailureKind::Retryable => eprintln!("retry later: {e}"),
//!     Err(e) => eprintln!("{}: {e}\n{}", e.kind(), e.hint()),
//! }
//! # }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod auth;
pub mod config;
pub mod error;
pub mod logging;
pub mod utils;

pub use auth::{AuthorizationBootstrapper, ConfigStore, PersistedConfig, TokenPair, TokenRefresher};
pub use config::{ClientCredentials, ConfigError, OAuthConfig};
pub use error::{AuthFlowError, FailureKind, RefreshError};

/// Version of the crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
