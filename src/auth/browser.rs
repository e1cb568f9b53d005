//! Opening the consent page in the operator's browser

use std::io;
use std::process::{Command, Stdio};

/// Capability to show a URL to the operator
///
/// The bootstrapper only needs the side effect started; it never waits on it.
pub trait BrowserLauncher: Send + Sync {
    /// Open `url`
    ///
    /// # Errors
    ///
    /// Returns an error if no browser could be started. The flow then prints the URL
    /// for the operator to open by hand.
    fn open(&self, url: &str) -> io::Result<()>;
}

/// Launches the platform default browser
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemBrowser;

impl BrowserLauncher for SystemBrowser {
    fn open(&self, url: &str) -> io::Result<()> {
        let mut command = platform_command(url);
        command
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()?;
        Ok(())
    }
}

#[cfg(target_os = "macos")]
fn platform_command(url: &str) -> Command {
    let mut command = Command::new("open");
    command.arg(url);
    command
}

#[cfg(target_os = "windows")]
fn platform_command(url: &str) -> Command {
    let mut command = Command::new("cmd");
    command.args(["/C", "start", "", url]);
    command
}

#[cfg(not(any(target_os = "macos", target_os = "windows")))]
fn platform_command(url: &str) -> Command {
    let mut command = Command::new("xdg-open");
    command.arg(url);
    command
}

/// Never opens anything; the operator copies the printed URL instead
#[derive(Debug, Clone, Copy, Default)]
pub struct ManualBrowser;

impl BrowserLauncher for ManualBrowser {
    fn open(&self, _url: &str) -> io::Result<()> {
        Err(io::Error::new(
            io::ErrorKind::Unsupported,
            "automatic browser launch disabled",
        ))
    }
}
