//! Show what the SP-API config file currently holds.
//!
//! Reads the store only; no network requests.

use anyhow::{Context, Result};
use clap::Parser;
use sp_api_auth::auth::{ConfigStore, TokenState};
use sp_api_auth::utils::mask_secret;
use std::path::PathBuf;
use std::process::ExitCode;

#[derive(Parser)]
#[command(name = "token-status", about = "Show stored SP-API token status")]
struct Args {
    /// Config file (default: platform config dir, or SP_API_AUTH_CONFIG)
    #[arg(long, short = 'c')]
    config: Option<PathBuf>,
}

fn main() -> ExitCode {
    let args = Args::parse();
    sp_api_auth::logging::init(false);

    match run(args) {
        Ok(code) => code,
        Err(e) => {
            eprintln!("error: {e:#}");
            ExitCode::FAILURE
        }
    }
}

fn run(args: Args) -> Result<ExitCode> {
    let storage = args
        .config
        .map_or_else(ConfigStore::new, ConfigStore::with_path);
    let stored = storage
        .load()
        .with_context(|| format!("reading {}", storage.path().display()))?;

    println!("Authentication Status");
    println!("─────────────────────");
    println!();

    let show = |label: &str, value: &Option<String>| match value {
        Some(v) if !v.is_empty() => println!("  {label}: {}", mask_secret(v)),
        _ => println!("  {label}: (not set)"),
    };
    show("Client ID", &stored.client_id);
    show("Client secret", &stored.client_secret);
    show("Refresh token", &stored.refresh_token);
    show("Access token", &stored.access_token);
    println!();

    let state = stored.state();
    println!("Status: {}", state.label());
    match state {
        TokenState::NoToken => println!("Run obtain-tokens to authorize the application."),
        TokenState::Expired => println!("Run refresh-token to get a new access token."),
        TokenState::Valid { expires_in: remaining } => {
            let hours = remaining.as_secs() / 3600;
            let minutes = (remaining.as_secs() % 3600) / 60;
            println!("Expires in: {hours}h {minutes}m");
        }
    }

    println!();
    println!("Token storage: {}", storage.path().display());

    Ok(if matches!(state, TokenState::Valid { .. }) {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}
