//! Browser process launching.
//!
//! The launcher resolves an executable, prepares a user-data directory,
//! binds a free debugging port, spawns the process, and polls the
//! DevTools HTTP side-channel until `webSocketDebuggerUrl` appears.

use std::env;
use std::net::TcpListener;
use std::path::PathBuf;
use std::process::{Command, Stdio};
use std::time::Duration;

use kestrel_cdp::{CdpConnection, DiscoveryOptions};
use tempfile::TempDir;
use tracing::{debug, info, instrument, warn};

use super::Browser;
use crate::error::BrowserError;
use crate::profile::Profile;

/// Default deadline for a launch.
const DEFAULT_LAUNCH_TIMEOUT: Duration = Duration::from_secs(30);

/// Common Chromium locations, checked in order.
const CHROMIUM_PATHS: &[&str] = &[
    // Linux
    "/usr/bin/chromium",
    "/usr/bin/chromium-browser",
    "/usr/bin/google-chrome",
    "/usr/bin/google-chrome-stable",
    "/snap/bin/chromium",
    // macOS
    "/Applications/Chromium.app/Contents/MacOS/Chromium",
    "/Applications/Google Chrome.app/Contents/MacOS/Google Chrome",
    // Windows
    r"C:\Program Files\Google\Chrome\Application\chrome.exe",
    r"C:\Program Files (x86)\Google\Chrome\Application\chrome.exe",
];

/// Flags that keep an automated browser quiet and deterministic.
const STABILITY_ARGS: &[&str] = &[
    "--disable-background-networking",
    "--disable-background-timer-throttling",
    "--disable-backgrounding-occluded-windows",
    "--disable-breakpad",
    "--disable-component-extensions-with-background-pages",
    "--disable-component-update",
    "--disable-default-apps",
    "--disable-dev-shm-usage",
    "--disable-extensions",
    "--disable-features=TranslateUI",
    "--disable-hang-monitor",
    "--disable-ipc-flooding-protection",
    "--disable-popup-blocking",
    "--disable-prompt-on-repost",
    "--disable-renderer-backgrounding",
    "--disable-sync",
    "--force-color-profile=srgb",
    "--metrics-recording-only",
    "--no-first-run",
    "--password-store=basic",
    "--use-mock-keychain",
];

/// User-data directory strategy.
#[derive(Debug)]
pub enum UserDataDir {
    /// Fresh temporary directory, removed when the browser closes.
    Temp,
    /// A caller-provided directory, kept after close.
    Persist(PathBuf),
    /// A managed profile; its advisory lock is held for the browser's
    /// lifetime.
    Profile(Profile),
    /// No `--user-data-dir` flag; the system default profile.
    System,
}

/// Builder for launching a browser.
#[derive(Debug)]
pub struct BrowserBuilder {
    executable_path: Option<PathBuf>,
    headless: bool,
    args: Vec<String>,
    timeout: Duration,
    user_data_dir: UserDataDir,
    port: Option<u16>,
}

impl Default for BrowserBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl BrowserBuilder {
    /// Defaults: headless, isolated temp profile, free port, 30 s
    /// deadline.
    pub fn new() -> Self {
        Self {
            executable_path: None,
            headless: true,
            args: Vec::new(),
            timeout: DEFAULT_LAUNCH_TIMEOUT,
            user_data_dir: UserDataDir::Temp,
            port: None,
        }
    }

    /// Explicit executable path. Without one, `CHROMIUM_PATH` and the
    /// common install locations are searched.
    #[must_use]
    pub fn executable_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.executable_path = Some(path.into());
        self
    }

    /// Headless mode; defaults to on.
    #[must_use]
    pub fn headless(mut self, headless: bool) -> Self {
        self.headless = headless;
        self
    }

    /// Extra command-line arguments.
    #[must_use]
    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    /// Launch deadline; covers spawn and endpoint discovery.
    #[must_use]
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Persist browser state in `path` across launches.
    #[must_use]
    pub fn user_data_dir(mut self, path: impl Into<PathBuf>) -> Self {
        self.user_data_dir = UserDataDir::Persist(path.into());
        self
    }

    /// Launch against a managed profile, acquiring its lock.
    #[must_use]
    pub fn profile(mut self, profile: Profile) -> Self {
        self.user_data_dir = UserDataDir::Profile(profile);
        self
    }

    /// Use the system default profile directory.
    #[must_use]
    pub fn user_data_dir_system(mut self) -> Self {
        self.user_data_dir = UserDataDir::System;
        self
    }

    /// Fix the remote-debugging port instead of picking a free one.
    #[must_use]
    pub fn port(mut self, port: u16) -> Self {
        self.port = Some(port);
        self
    }

    /// Spawn the browser and connect.
    ///
    /// # Errors
    ///
    /// Returns an error when no executable is found, the process fails
    /// to spawn, or the DevTools endpoint is not ready in time.
    #[instrument(level = "info", skip(self), fields(headless = self.headless))]
    pub async fn launch(self) -> Result<Browser, BrowserError> {
        info!("Launching browser");

        let executable = self.find_executable()?;
        info!(executable = %executable.display(), "Found browser executable");

        let (user_data_path, temp_dir, profile_lock) = match self.user_data_dir {
            UserDataDir::Temp => {
                let temp = TempDir::with_prefix("kestrel-browser-").map_err(|e| {
                    BrowserError::LaunchFailed(format!(
                        "failed to create temporary user data directory: {e}"
                    ))
                })?;
                (Some(temp.path().to_path_buf()), Some(temp), None)
            }
            UserDataDir::Persist(path) => (Some(path), None, None),
            UserDataDir::Profile(mut profile) => {
                let lock = profile
                    .acquire()
                    .map_err(|e| BrowserError::LaunchFailed(e.to_string()))?;
                (Some(profile.user_data_dir()), None, Some(lock))
            }
            UserDataDir::System => (None, None, None),
        };

        let port = match self.port {
            Some(port) => port,
            None => pick_free_port()?,
        };

        let mut cmd = Command::new(&executable);
        cmd.arg(format!("--remote-debugging-port={port}"));
        if self.headless {
            cmd.arg("--headless=new");
        }
        cmd.args(STABILITY_ARGS);
        if let Some(dir) = &user_data_path {
            cmd.arg(format!("--user-data-dir={}", dir.display()));
            debug!(user_data_dir = %dir.display(), "Using user data directory");
        }
        if !self.args.is_empty() {
            cmd.args(&self.args);
            debug!(user_args = ?self.args, "Added user arguments");
        }
        cmd.stdout(Stdio::null());
        cmd.stderr(Stdio::null());

        let child = cmd.spawn().map_err(|e| {
            warn!(error = %e, "Failed to spawn browser process");
            BrowserError::LaunchFailed(e.to_string())
        })?;
        info!(pid = child.id(), port, "Browser process spawned");

        // Poll the HTTP side-channel until the endpoint is ready.
        let endpoint = format!("http://127.0.0.1:{port}");
        let options = DiscoveryOptions::new().timeout(self.timeout);
        let ws_url = match kestrel_cdp::poll_websocket_url(&endpoint, &options).await {
            Ok(ws_url) => ws_url,
            Err(e) => {
                let mut child = child;
                let _ = child.kill();
                return match e {
                    kestrel_cdp::CdpError::DiscoveryTimeout(t) => {
                        warn!(timeout_ms = t.as_millis(), "Browser launch timed out");
                        Err(BrowserError::LaunchTimeout(t))
                    }
                    other => Err(BrowserError::LaunchFailed(other.to_string())),
                };
            }
        };
        info!(ws_url = %ws_url, "Got DevTools WebSocket URL");

        let connection = CdpConnection::connect(&ws_url)
            .await
            .map_err(|e| BrowserError::ConnectionFailed(e.to_string()))?;

        Browser::bootstrap(connection, Some(child), temp_dir, profile_lock).await
    }

    /// Resolve the browser executable.
    fn find_executable(&self) -> Result<PathBuf, BrowserError> {
        if let Some(path) = &self.executable_path {
            if path.exists() {
                return Ok(path.clone());
            }
            warn!(path = %path.display(), "Explicit executable path does not exist");
            return Err(BrowserError::ChromiumNotFound);
        }

        if let Ok(path_str) = env::var("CHROMIUM_PATH") {
            let path = PathBuf::from(&path_str);
            if path.exists() {
                return Ok(path);
            }
            warn!(path = %path.display(), "CHROMIUM_PATH does not exist");
        }

        for candidate in CHROMIUM_PATHS {
            let path = PathBuf::from(candidate);
            if path.exists() {
                return Ok(path);
            }
        }

        // Fall back to a PATH lookup for the bare names.
        for name in ["chromium", "chromium-browser", "google-chrome"] {
            if let Ok(output) = Command::new("which").arg(name).output() {
                if output.status.success() {
                    let found = String::from_utf8_lossy(&output.stdout).trim().to_string();
                    if !found.is_empty() {
                        return Ok(PathBuf::from(found));
                    }
                }
            }
        }

        warn!("No browser executable found");
        Err(BrowserError::ChromiumNotFound)
    }
}

/// Bind port 0, read the assigned port, release the socket.
///
/// The browser binds the port a moment later; the small race is
/// acceptable for ephemeral local ports.
fn pick_free_port() -> Result<u16, BrowserError> {
    let listener = TcpListener::bind("127.0.0.1:0")
        .map_err(|e| BrowserError::LaunchFailed(format!("failed to pick a free port: {e}")))?;
    let port = listener
        .local_addr()
        .map_err(|e| BrowserError::LaunchFailed(e.to_string()))?
        .port();
    Ok(port)
}
