//! Tracing setup for the command-line tools

use tracing_subscriber::EnvFilter;

/// Install a stderr `fmt` subscriber
///
/// `RUST_LOG` wins when set; otherwise this crate logs at `info`, or `debug` when
/// `verbose` is true. Calling it twice is harmless.
pub fn init(verbose: bool) {
    let default_filter = if verbose {
        "sp_api_auth=debug"
    } else {
        "sp_api_auth=info"
    };

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}
