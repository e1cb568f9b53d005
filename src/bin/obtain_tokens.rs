//! One-time SP-API authorization.
//!
//! Opens the Seller Central consent page, captures the redirect on a local port and
//! stores the resulting refresh and access tokens.
//!
//! Usage:
//! ```bash
//! # Credentials from the config file or AMAZON_CLIENT_ID / AMAZON_CLIENT_SECRET
//! obtain-tokens
//!
//! # Custom config file and redirect port
//! obtain-tokens --config ./sp-api.json --port 9090
//!
//! # Print the URL instead of launching a browser
//! obtain-tokens --no-browser
//! ```

use anyhow::{Context, Result};
use clap::Parser;
use sp_api_auth::auth::{BrowserLauncher, ConfigStore, ManualBrowser, SystemBrowser};
use sp_api_auth::{AuthFlowError, AuthorizationBootstrapper, ClientCredentials, OAuthConfig};
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

#[derive(Parser)]
#[command(
    name = "obtain-tokens",
    about = "Obtain an SP-API refresh token through the browser consent flow",
    long_about = "Runs the OAuth authorization code flow once and stores the refresh and access tokens in the config file"
)]
struct Args {
    /// Config file (default: platform config dir, or SP_API_AUTH_CONFIG)
    #[arg(long, short = 'c')]
    config: Option<PathBuf>,

    /// Local port for the redirect listener (default: 8888 or SP_API_REDIRECT_PORT)
    #[arg(long, short = 'p')]
    port: Option<u16>,

    /// Seconds to wait for the browser redirect
    #[arg(long, default_value_t = 300)]
    timeout: u64,

    /// Do not launch a browser; print the URL only
    #[arg(long)]
    no_browser: bool,

    /// Enable verbose logging
    #[arg(long, short = 'v')]
    verbose: bool,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    let args = Args::parse();
    sp_api_auth::logging::init(args.verbose);

    match run(args).await {
        Ok(code) => code,
        Err(e) => {
            eprintln!("error: {e:#}");
            ExitCode::FAILURE
        }
    }
}

async fn run(args: Args) -> Result<ExitCode> {
    let storage = args
        .config
        .map_or_else(ConfigStore::new, ConfigStore::with_path);
    let stored = storage
        .load()
        .with_context(|| format!("reading {}", storage.path().display()))?;
    let credentials = ClientCredentials::resolve(&stored)?;

    let mut config = OAuthConfig::from_env();
    config.callback_timeout = Duration::from_secs(args.timeout);
    let port = args.port.unwrap_or(config.redirect_port);

    let browser: Arc<dyn BrowserLauncher> = if args.no_browser {
        Arc::new(ManualBrowser)
    } else {
        Arc::new(SystemBrowser)
    };

    let cancel = CancellationToken::new();
    tokio::spawn({
        let cancel = cancel.clone();
        async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                cancel.cancel();
            }
        }
    });

    let bootstrapper = AuthorizationBootstrapper::builder()
        .config(config)
        .storage(storage)
        .browser(browser)
        .cancellation(cancel)
        .build()?;

    match bootstrapper.run(&credentials, port).await {
        Ok(_) => {
            println!();
            println!("Your application can now authenticate with the Selling Partner API.");
            Ok(ExitCode::SUCCESS)
        }
        Err(e) => {
            report(&e);
            Ok(ExitCode::from(e.exit_code()))
        }
    }
}

fn report(err: &AuthFlowError) {
    eprintln!();
    eprintln!("error [{}]: {err}", err.kind());
    if let Some(body) = err.response_body() {
        eprintln!("response: {body}");
    }
    if let AuthFlowError::PersistFailed { tokens, .. } = err {
        // Printed in full so the one-time exchange is not lost
        println!("refresh_token: {}", tokens.refresh_token);
        println!("access_token: {}", tokens.access_token);
    }
    eprintln!("hint: {}", err.hint());
}
