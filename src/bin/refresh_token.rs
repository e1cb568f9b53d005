//! SP-API access token refresh.
//!
//! Exchanges the stored refresh token for a new access token and updates the config
//! file. Meant to be run by hand or from a scheduler; it never retries by itself.
//!
//! Exit codes: 0 on success, 75 when the failure is transient (network, 5xx, 429),
//! 1 otherwise.
//!
//! Usage:
//! ```bash
//! refresh-token
//! refresh-token --config ./sp-api.json --http-timeout 10
//! ```

use anyhow::{Context, Result};
use clap::Parser;
use sp_api_auth::auth::ConfigStore;
use sp_api_auth::utils::mask_secret;
use sp_api_auth::{ClientCredentials, OAuthConfig, RefreshError, TokenRefresher};
use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;

#[derive(Parser)]
#[command(
    name = "refresh-token",
    about = "Refresh the SP-API access token from the stored refresh token"
)]
struct Args {
    /// Config file (default: platform config dir, or SP_API_AUTH_CONFIG)
    #[arg(long, short = 'c')]
    config: Option<PathBuf>,

    /// Network timeout for the token request, in seconds
    #[arg(long, default_value_t = 30)]
    http_timeout: u64,

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
    config.http_timeout = Duration::from_secs(args.http_timeout);

    println!("SP-API Token Refresh");
    println!("────────────────────");
    println!("Client ID: {}", mask_secret(&credentials.client_id));
    println!(
        "Refresh token: {}",
        if stored.refresh_token.is_some() {
            "available"
        } else {
            "not available"
        }
    );
    println!();
    println!("Refreshing access token...");

    let refresher = TokenRefresher::new(&config, storage)?;
    match refresher.refresh(&credentials).await {
        Ok(tokens) => {
            println!("✓ New access token received.");
            println!("  Access token: {}", mask_secret(&tokens.access_token));
            if let Some(remaining) = tokens.remaining_validity() {
                println!("  Expires in: {} seconds", remaining.as_secs());
            }
            println!();
            println!("Saved to {}", refresher.storage().path().display());
            Ok(ExitCode::SUCCESS)
        }
        Err(e) => {
            report(&e);
            Ok(ExitCode::from(e.exit_code()))
        }
    }
}

fn report(err: &RefreshError) {
    eprintln!("error [{}]: {err}", err.kind());
    if let Some(body) = err.response_body() {
        eprintln!("response: {body}");
    }
    eprintln!("hint: {}", err.hint());
}
