//! Launching and terminating the persistent browser process.
//!
//! The browser runs with a fixed local debugging port and a private
//! per-installation profile directory, never the user's real profile.
//! Termination is graceful-first: SIGTERM (or `taskkill` on Windows), and
//! a failed signal is logged but never fatal, because a session record
//! pointing at a dead process is strictly worse than no record at all.

use std::path::PathBuf;
use std::process::{Command, Stdio};

use anyhow::{Context, Result, anyhow};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use super::readiness::wait_for_endpoint;
use super::store::{SessionRecord, SessionError, SessionStore};
use crate::utils::constants::DEFAULT_READY_WAIT;

/// Environment variable overriding browser executable discovery.
pub const CHROME_PATH_ENV: &str = "BROWSER_TOOLS_CHROME";

/// Executable names probed on the OS search path.
const CANDIDATE_NAMES: &[&str] = &[
    "google-chrome",
    "google-chrome-stable",
    "chrome",
    "chromium",
    "chromium-browser",
];

/// Find a Chrome/Chromium executable: env override first, then the OS
/// search path, then well-known platform install locations.
pub fn find_browser_executable() -> Result<PathBuf> {
    if let Ok(path) = std::env::var(CHROME_PATH_ENV) {
        let path = PathBuf::from(path);
        if path.exists() {
            info!(path = %path.display(), "using browser from {CHROME_PATH_ENV}");
            return Ok(path);
        }
        warn!(
            path = %path.display(),
            "{CHROME_PATH_ENV} points to a non-existent file, ignoring"
        );
    }

    if !cfg!(target_os = "windows") {
        for name in CANDIDATE_NAMES {
            let output = Command::new("which").arg(name).output();
            if let Ok(output) = output
                && output.status.success()
            {
                let path_str = String::from_utf8_lossy(&output.stdout).trim().to_string();
                if !path_str.is_empty() {
                    let path = PathBuf::from(path_str);
                    info!(path = %path.display(), "found browser on search path");
                    return Ok(path);
                }
            }
        }
    }

    for path_str in platform_install_paths() {
        let path = PathBuf::from(path_str);
        if path.exists() {
            info!(path = %path.display(), "found browser at well-known location");
            return Ok(path);
        }
    }

    Err(anyhow!(
        "Chrome/Chromium executable not found; install Chrome or set {CHROME_PATH_ENV}"
    ))
}

fn platform_install_paths() -> Vec<&'static str> {
    if cfg!(target_os = "windows") {
        vec![
            r"C:\Program Files\Google\Chrome\Application\chrome.exe",
            r"C:\Program Files (x86)\Google\Chrome\Application\chrome.exe",
            r"C:\Program Files\Chromium\Application\chrome.exe",
        ]
    } else if cfg!(target_os = "macos") {
        vec![
            "/Applications/Google Chrome.app/Contents/MacOS/Google Chrome",
            "/Applications/Chromium.app/Contents/MacOS/Chromium",
            "/opt/homebrew/bin/chromium",
        ]
    } else {
        vec![
            "/usr/bin/google-chrome",
            "/usr/bin/google-chrome-stable",
            "/usr/bin/chromium",
            "/usr/bin/chromium-browser",
            "/snap/bin/chromium",
            "/usr/local/bin/chromium",
            "/opt/google/chrome/chrome",
        ]
    }
}

/// Launch a persistent browser and record its endpoint and pid.
///
/// Fails fast when a session record already exists. If readiness polling
/// or record persistence fails, the freshly spawned process is killed so
/// nothing leaks.
pub async fn start(
    store: &SessionStore,
    port: u16,
    headless: bool,
    cancel: &CancellationToken,
) -> Result<SessionRecord> {
    if let Ok(existing) = store.load() {
        return Err(SessionError::AlreadyRunning { pid: existing.pid }.into());
    }

    let chrome_path = find_browser_executable()?;
    let user_data_dir = store.user_data_dir();
    std::fs::create_dir_all(&user_data_dir).context("failed to create browser profile directory")?;

    let mut command = Command::new(&chrome_path);
    command
        .arg(format!("--remote-debugging-port={port}"))
        .arg(format!("--user-data-dir={}", user_data_dir.display()))
        .arg("--no-first-run")
        .arg("--no-default-browser-check")
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null());
    if headless {
        command.arg("--headless=new");
    }

    let mut child = command
        .spawn()
        .with_context(|| format!("failed to start browser at {}", chrome_path.display()))?;
    let pid = child.id() as i32;

    let endpoint = format!("ws://127.0.0.1:{port}");
    info!(%endpoint, pid, "waiting for browser to become ready");

    if let Err(err) = wait_for_endpoint(&endpoint, DEFAULT_READY_WAIT, cancel).await {
        if let Err(kill_err) = child.kill() {
            warn!(pid, error = %kill_err, "failed to kill unready browser");
        }
        return Err(err.context("error waiting for browser"));
    }

    let record = SessionRecord {
        url: endpoint,
        pid,
    };
    if let Err(err) = store.save(&record) {
        if let Err(kill_err) = child.kill() {
            warn!(pid, error = %kill_err, "failed to kill browser after record save failure");
        }
        return Err(anyhow::Error::from(err).context("failed to save session record"));
    }

    info!(pid, "browser started");
    Ok(record)
}

/// Outcome of [`close`]; closing an already-stopped session is success.
#[derive(Debug, PartialEq, Eq)]
pub enum CloseOutcome {
    Closed { pid: i32 },
    NotRunning,
}

/// Terminate the persistent browser and remove its session record.
///
/// The record is removed even when signaling fails: an orphaned but
/// unreferenced process is an acceptable degraded outcome, a stuck
/// record is not.
pub fn close(store: &SessionStore) -> Result<CloseOutcome> {
    let record = match store.load() {
        Ok(record) => record,
        Err(SessionError::NotRunning) => {
            info!("browser is not running, nothing to close");
            return Ok(CloseOutcome::NotRunning);
        }
        Err(err) => {
            // Unreadable record: remove it so the session is not wedged.
            warn!(error = %err, "session record unreadable, removing it");
            store.remove()?;
            return Ok(CloseOutcome::NotRunning);
        }
    };

    info!(pid = record.pid, "closing browser");
    if let Err(err) = terminate_process(record.pid) {
        warn!(pid = record.pid, error = %err, "failed to signal browser process, removing record anyway");
    }

    store.remove().context("failed to remove session record")?;
    info!("browser session closed and cleaned up");
    Ok(CloseOutcome::Closed { pid: record.pid })
}

/// Send a graceful stop signal to `pid`.
#[cfg(unix)]
fn terminate_process(pid: i32) -> std::io::Result<()> {
    let rc = unsafe { libc::kill(pid, libc::SIGTERM) };
    if rc == 0 {
        Ok(())
    } else {
        Err(std::io::Error::last_os_error())
    }
}

#[cfg(windows)]
fn terminate_process(pid: i32) -> std::io::Result<()> {
    let status = Command::new("taskkill")
        .args(["/PID", &pid.to_string()])
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()?;
    if status.success() {
        Ok(())
    } else {
        Err(std::io::Error::other(format!(
            "taskkill exited with {status}"
        )))
    }
}
