//! One-shot local listener for the OAuth redirect

use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::Html;
use axum::routing::get;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::sync::{Mutex, oneshot};
use tokio_util::sync::CancellationToken;

const SUCCESS_PAGE: &str = r#"<!DOCTYPE html>
<html>
<head><title>SP-API Authorization</title></head>
<body style="font-family: system-ui; text-align: center; padding-top: 80px;">
<h2>Authorization code received</h2>
<p>You can close this window and return to the terminal.</p>
</body>
</html>"#;

const FAILURE_PAGE: &str = r#"<!DOCTYPE html>
<html>
<head><title>SP-API Authorization Failed</title></head>
<body style="font-family: system-ui; text-align: center; padding-top: 80px;">
<h2>Authorization failed</h2>
<p>No authorization code was received. Check the terminal and try again.</p>
</body>
</html>"#;

const DUPLICATE_PAGE: &str = r#"<!DOCTYPE html>
<html>
<head><title>SP-API Authorization</title></head>
<body style="font-family: system-ui; text-align: center; padding-top: 80px;">
<h2>Already handled</h2>
<p>This authorization request has already been answered.</p>
</body>
</html>"#;

/// Query parameters of the redirect request
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CallbackParams {
    /// Authorization code, from `code` or `spapi_oauth_code` (absent when consent was denied)
    pub code: Option<String>,
    /// State echoed back by the vendor
    pub state: Option<String>,
    /// OAuth `error` parameter
    pub error: Option<String>,
    /// OAuth `error_description` parameter
    pub error_description: Option<String>,
}

impl CallbackParams {
    fn from_query(mut query: HashMap<String, String>) -> Self {
        let mut take = |key: &str| query.remove(key).filter(|v| !v.is_empty());
        // Seller Central redirects with spapi_oauth_code instead of code
        let code = take("code").or_else(|| take("spapi_oauth_code"));
        Self {
            code,
            state: take("state"),
            error: take("error"),
            error_description: take("error_description"),
        }
    }

    /// Vendor error text, preferring the description
    #[must_use]
    pub fn vendor_error(&self) -> Option<String> {
        match (&self.error, &self.error_description) {
            (Some(error), Some(description)) => Some(format!("{error}: {description}")),
            (Some(error), None) => Some(error.clone()),
            (None, Some(description)) => Some(description.clone()),
            (None, None) => None,
        }
    }
}

/// Why no callback was delivered
#[derive(Debug, PartialEq, Eq)]
pub(crate) enum WaitError {
    Timeout,
    Cancelled,
}

/// How long open connections may delay shutdown once the wait is over
const SHUTDOWN_GRACE: Duration = Duration::from_secs(1);

type CallbackSender = Arc<Mutex<Option<oneshot::Sender<CallbackParams>>>>;

/// Local HTTP listener that accepts exactly one redirect
#[derive(Debug)]
pub struct CallbackListener {
    listener: TcpListener,
    path: String,
    port: u16,
}

impl CallbackListener {
    /// Bind `127.0.0.1:port`; port 0 picks a free port
    ///
    /// # Errors
    ///
    /// Returns an error if the port is taken or cannot be bound.
    pub async fn bind(port: u16, path: impl Into<String>) -> std::io::Result<Self> {
        let mut path = path.into();
        if !path.starts_with('/') {
            path.insert(0, '/');
        }

        let listener = TcpListener::bind(("127.0.0.1", port)).await?;
        let port = listener.local_addr()?.port();
        tracing::debug!(port, path = %path, "Redirect listener bound");
        Ok(Self {
            listener,
            path,
            port,
        })
    }

    /// Port actually bound
    #[must_use]
    pub fn port(&self) -> u16 {
        self.port
    }

    /// Redirect URI to register with the vendor for this listener
    #[must_use]
    pub fn redirect_uri(&self) -> String {
        format!("http://localhost:{}{}", self.port, self.path)
    }

    /// Serve until one redirect arrives, `timeout` elapses or `cancel` fires
    ///
    /// The server is shut down before this returns, whatever the outcome.
    pub(crate) async fn wait(
        self,
        timeout: Duration,
        cancel: &CancellationToken,
    ) -> Result<CallbackParams, WaitError> {
        let (tx, rx) = oneshot::channel();
        let sender: CallbackSender = Arc::new(Mutex::new(Some(tx)));
        let app = axum::Router::new()
            .route(&self.path, get(handle_redirect))
            .with_state(sender);

        let shutdown = CancellationToken::new();
        let mut server = tokio::spawn({
            let shutdown = shutdown.clone();
            async move {
                axum::serve(self.listener, app)
                    .with_graceful_shutdown(async move { shutdown.cancelled().await })
                    .await
            }
        });

        let outcome = tokio::select! {
            received = rx => received.map_err(|_| WaitError::Cancelled),
            () = tokio::time::sleep(timeout) => Err(WaitError::Timeout),
            () = cancel.cancelled() => Err(WaitError::Cancelled),
        };

        shutdown.cancel();
        match tokio::time::timeout(SHUTDOWN_GRACE, &mut server).await {
            Ok(Ok(Ok(()))) => {}
            Ok(Ok(Err(e))) => tracing::warn!("Redirect listener stopped with error: {e}"),
            Ok(Err(e)) => tracing::warn!("Redirect listener task failed: {e}"),
            Err(_) => {
                // A half-sent request keeps graceful shutdown waiting
                tracing::debug!("Redirect listener did not drain in time; aborting");
                server.abort();
            }
        }

        outcome
    }
}

async fn handle_redirect(
    State(sender): State<CallbackSender>,
    Query(query): Query<HashMap<String, String>>,
) -> (StatusCode, Html<&'static str>) {
    let params = CallbackParams::from_query(query);
    let Some(tx) = sender.lock().await.take() else {
        return (StatusCode::CONFLICT, Html(DUPLICATE_PAGE));
    };

    let page = if params.code.is_some() {
        (StatusCode::OK, Html(SUCCESS_PAGE))
    } else {
        (StatusCode::BAD_REQUEST, Html(FAILURE_PAGE))
    };
    // Receiver is gone only if the flow already stopped waiting
    let _ = tx.send(params);
    page
}
