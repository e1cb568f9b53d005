//! Error types for the authorization and refresh flows

use crate::auth::store::StoreError;
use crate::auth::token::TokenPair;
use std::time::Duration;
use thiserror::Error;

/// Whether a failed invocation is worth repeating unchanged
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    /// Network trouble or a vendor-side 5xx; retry later
    Retryable,
    /// Needs operator action before another attempt can succeed
    Fatal,
}

/// Exit status for a transient failure (`EX_TEMPFAIL` from sysexits.h)
pub const EXIT_TEMPFAIL: u8 = 75;
/// Exit status for a failure that needs operator action
pub const EXIT_FATAL: u8 = 1;

impl FailureKind {
    /// Process exit status for a command that failed this way
    #[must_use]
    pub fn exit_code(self) -> u8 {
        match self {
            FailureKind::Retryable => EXIT_TEMPFAIL,
            FailureKind::Fatal => EXIT_FATAL,
        }
    }

    fn from_status(status: u16) -> Self {
        if status >= 500 || status == 429 {
            FailureKind::Retryable
        } else {
            FailureKind::Fatal
        }
    }
}

fn vendor_suffix(error: &Option<String>) -> String {
    error
        .as_deref()
        .map(|e| format!(" (vendor error: {e})"))
        .unwrap_or_default()
}

/// Errors from the one-time authorization code flow
#[derive(Error, Debug)]
pub enum AuthFlowError {
    /// The callback `state` did not match the generated value
    #[error("State mismatch: the redirect did not carry the state this flow generated")]
    StateMismatch,

    /// The redirect arrived without an authorization code
    #[error("Missing authorization code{}", vendor_suffix(.error))]
    MissingCode {
        /// `error` / `error_description` reported by the vendor, if any
        error: Option<String>,
    },

    /// Token endpoint answered with a non-2xx status
    #[error("Token exchange failed with HTTP {status}")]
    ExchangeFailed {
        /// HTTP status code
        status: u16,
        /// Raw response body
        body: String,
    },

    /// Token endpoint answered 2xx but the body is unusable
    #[error("Malformed token response: {0}")]
    MalformedResponse(String),

    /// Tokens were obtained but could not be written to the store
    #[error("Tokens obtained but could not be saved: {source}")]
    PersistFailed {
        /// The tokens that were not persisted
        tokens: Box<TokenPair>,
        /// Underlying store error
        #[source]
        source: StoreError,
    },

    /// No redirect arrived within the configured bound
    #[error("Timed out after {}s waiting for the authorization redirect", .0.as_secs())]
    Timeout(Duration),

    /// The wait was interrupted by the operator
    #[error("Authorization cancelled")]
    Cancelled,

    /// The local redirect listener could not be started
    #[error("Could not start local redirect listener: {0}")]
    Listener(#[source] std::io::Error),

    /// The token endpoint could not be reached
    #[error("Token endpoint request failed: {0}")]
    Transport(#[source] reqwest::Error),
}

impl AuthFlowError {
    /// Stable short name of the error kind
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::StateMismatch => "StateMismatch",
            Self::MissingCode { .. } => "MissingCode",
            Self::ExchangeFailed { .. } => "ExchangeFailed",
            Self::MalformedResponse(_) => "MalformedResponse",
            Self::PersistFailed { .. } => "PersistFailed",
            Self::Timeout(_) => "Timeout",
            Self::Cancelled => "Cancelled",
            Self::Listener(_) => "Listener",
            Self::Transport(_) => "Transport",
        }
    }

    /// Vendor response body, when the failure carries one
    #[must_use]
    pub fn response_body(&self) -> Option<&str> {
        match self {
            Self::ExchangeFailed { body, .. } => Some(body),
            _ => None,
        }
    }

    /// Exit status of `obtain-tokens` for this failure
    ///
    /// Always [`EXIT_FATAL`]; only `refresh-token` distinguishes retryable failures.
    #[must_use]
    pub fn exit_code(&self) -> u8 {
        EXIT_FATAL
    }

    /// Whether repeating the flow as-is may succeed
    #[must_use]
    pub fn failure_kind(&self) -> FailureKind {
        match self {
            Self::ExchangeFailed { status, .. } => FailureKind::from_status(*status),
            Self::Transport(_) | Self::Listener(_) | Self::Timeout(_) => FailureKind::Retryable,
            _ => FailureKind::Fatal,
        }
    }

    /// Operator guidance for this failure
    #[must_use]
    pub fn hint(&self) -> &'static str {
        match self {
            Self::StateMismatch => {
                "The redirect may not belong to this run. Start obtain-tokens again."
            }
            Self::MissingCode { .. } => {
                "Consent was not granted. Approve the application in the browser and retry."
            }
            Self::ExchangeFailed { status, .. }
                if FailureKind::from_status(*status) == FailureKind::Fatal =>
            {
                "The authorization code was rejected (it is single-use and short-lived). \
                 Check client credentials and redirect URI, then re-run obtain-tokens."
            }
            Self::ExchangeFailed { .. } | Self::Transport(_) => {
                "Transient failure, retry later."
            }
            Self::MalformedResponse(_) => "The token endpoint returned an unexpected body.",
            Self::PersistFailed { .. } => {
                "Copy the tokens printed above into the config file manually."
            }
            Self::Timeout(_) => "Complete the consent page faster or raise --timeout.",
            Self::Cancelled => "Nothing was saved.",
            Self::Listener(_) => "Another process may be using the redirect port; pick another with --port.",
        }
    }
}

/// Errors from the repeatable refresh flow
#[derive(Error, Debug)]
pub enum RefreshError {
    /// No refresh token in the store
    #[error("No refresh token stored")]
    NoRefreshToken,

    /// Token endpoint answered with a non-2xx status
    #[error("Token refresh failed with HTTP {status}")]
    ExchangeFailed {
        /// HTTP status code
        status: u16,
        /// Raw response body
        body: String,
    },

    /// Token endpoint answered 2xx but the body is unusable
    #[error("Malformed token response: {0}")]
    MalformedResponse(String),

    /// The refreshed access token could not be written to the store
    #[error("Access token obtained but could not be saved: {0}")]
    PersistFailed(#[source] StoreError),

    /// The store could not be read
    #[error("Could not read stored tokens: {0}")]
    Store(#[source] StoreError),

    /// The token endpoint could not be reached
    #[error("Token endpoint request failed: {0}")]
    Transport(#[source] reqwest::Error),
}

impl RefreshError {
    /// Stable short name of the error kind
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::NoRefreshToken => "NoRefreshToken",
            Self::ExchangeFailed { .. } => "ExchangeFailed",
            Self::MalformedResponse(_) => "MalformedResponse",
            Self::PersistFailed(_) => "PersistFailed",
            Self::Store(_) => "Store",
            Self::Transport(_) => "Transport",
        }
    }

    /// Vendor response body, when the failure carries one
    #[must_use]
    pub fn response_body(&self) -> Option<&str> {
        match self {
            Self::ExchangeFailed { body, .. } => Some(body),
            _ => None,
        }
    }

    /// Exit status of `refresh-token`: [`EXIT_TEMPFAIL`] when retryable, else [`EXIT_FATAL`]
    #[must_use]
    pub fn exit_code(&self) -> u8 {
        self.failure_kind().exit_code()
    }

    /// Whether repeating the refresh as-is may succeed
    #[must_use]
    pub fn failure_kind(&self) -> FailureKind {
        match self {
            Self::ExchangeFailed { status, .. } => FailureKind::from_status(*status),
            Self::Transport(_) => FailureKind::Retryable,
            _ => FailureKind::Fatal,
        }
    }

    /// Operator guidance for this failure
    #[must_use]
    pub fn hint(&self) -> &'static str {
        match self {
            Self::NoRefreshToken => "Run obtain-tokens first.",
            Self::ExchangeFailed { status, .. }
                if FailureKind::from_status(*status) == FailureKind::Fatal =>
            {
                "Refresh token invalid or revoked, re-run obtain-tokens."
            }
            Self::ExchangeFailed { .. } | Self::Transport(_) => "Transient failure, retry later.",
            Self::MalformedResponse(_) => "The token endpoint returned an unexpected body.",
            Self::PersistFailed(_) | Self::Store(_) => {
                "Check that the config file is readable, writable and valid JSON."
            }
        }
    }
}
