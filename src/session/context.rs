//! A usable browser connection for one command invocation.
//!
//! Two modes produce the same handle: attaching to the persistent browser
//! recorded by `start`, or launching a throwaway browser that lives for a
//! single invocation. The handle knows which resources it owns, and
//! `release` tears down exactly those: an attached browser must keep
//! running after the command exits, an owned one must not.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result, anyhow};
use chromiumoxide::Page;
use chromiumoxide::browser::{Browser, BrowserConfigBuilder, HeadlessMode};
use futures::StreamExt;
use rand::Rng as _;
use tokio::task::{self, JoinHandle};
use tracing::{debug, error, info, trace, warn};

use super::lifecycle::find_browser_executable;
use super::readiness::host_port;
use super::store::SessionStore;
use crate::utils::constants::CHROME_USER_AGENT;

/// Live connection to a browser plus the resources backing it.
pub struct SessionContext {
    browser: Browser,
    handler: JoinHandle<()>,
    /// Profile directory to delete on release; only set for owned browsers.
    temp_profile: Option<PathBuf>,
    /// Whether this context spawned the browser process itself.
    owns_process: bool,
    released: bool,
}

impl SessionContext {
    /// Attach to the persistent browser named by the session record.
    ///
    /// The record stores the debugging endpoint address; the actual
    /// DevTools websocket URL is re-resolved from the browser at attach
    /// time, since Chrome generates a fresh path on every launch.
    pub async fn attach_persistent(store: &SessionStore) -> Result<Self> {
        let record = store.load()?;
        let ws_url = resolve_ws_url(&record.url).await?;
        debug!(%ws_url, "attaching to persistent browser");

        let (browser, handler) = Browser::connect(ws_url)
            .await
            .context("failed to connect to browser; run 'start' first or remove a stale session with 'close'")?;
        let handler_task = spawn_handler(handler);

        Ok(Self {
            browser,
            handler: handler_task,
            temp_profile: None,
            owns_process: false,
            released: false,
        })
    }

    /// Launch a throwaway browser with a unique temporary profile.
    pub async fn create_temporary(headless: bool) -> Result<Self> {
        let chrome_path = find_browser_executable()?;

        let suffix: u32 = rand::rng().random();
        let temp_profile = std::env::temp_dir()
            .join(format!("browser-tools-{}-{suffix:08x}", std::process::id()));
        std::fs::create_dir_all(&temp_profile)
            .context("failed to create temporary profile directory")?;

        let mut config_builder = BrowserConfigBuilder::default()
            .request_timeout(Duration::from_secs(30))
            .window_size(1920, 1080)
            .user_data_dir(temp_profile.clone())
            .chrome_executable(chrome_path);

        if headless {
            config_builder = config_builder.headless_mode(HeadlessMode::default());
        } else {
            config_builder = config_builder.with_head();
        }

        config_builder = config_builder
            .arg(format!("--user-agent={CHROME_USER_AGENT}"))
            .arg("--disable-blink-features=AutomationControlled")
            .arg("--disable-infobars")
            .arg("--disable-notifications")
            .arg("--no-first-run")
            .arg("--no-default-browser-check")
            .arg("--mute-audio");

        let config = config_builder
            .build()
            .map_err(|e| anyhow!("failed to build browser config: {e}"))?;

        info!(profile = %temp_profile.display(), headless, "launching temporary browser");
        let (browser, handler) = Browser::launch(config)
            .await
            .context("failed to launch browser")?;
        let handler_task = spawn_handler(handler);

        Ok(Self {
            browser,
            handler: handler_task,
            temp_profile: Some(temp_profile),
            owns_process: true,
            released: false,
        })
    }

    pub fn browser(&self) -> &Browser {
        &self.browser
    }

    /// Page to run the command against.
    ///
    /// Attached mode reuses the browser's current page so successive
    /// commands observe each other's navigation; owned mode always opens
    /// a fresh one.
    pub async fn page(&self) -> Result<Page> {
        if !self.owns_process
            && let Some(page) = self.browser.pages().await?.into_iter().next()
        {
            return Ok(page);
        }
        Ok(self.browser.new_page("about:blank").await?)
    }

    /// Tear down exactly what this context owns. Idempotent.
    pub async fn release(&mut self) -> Result<()> {
        if self.released {
            return Ok(());
        }
        self.released = true;

        if self.owns_process {
            if let Err(err) = self.browser.close().await {
                warn!(error = %err, "error closing temporary browser");
            }
            if let Err(err) = self.browser.wait().await {
                warn!(error = %err, "error waiting for temporary browser to exit");
            }
        }
        self.handler.abort();

        if let Some(dir) = self.temp_profile.take()
            && let Err(err) = std::fs::remove_dir_all(&dir)
        {
            warn!(dir = %dir.display(), error = %err, "failed to remove temporary profile");
        }
        Ok(())
    }
}

impl Drop for SessionContext {
    fn drop(&mut self) {
        // Best-effort fallback when release() was skipped; the handler
        // task must not outlive the context.
        if !self.released {
            self.handler.abort();
        }
    }
}

/// Ask the browser's HTTP endpoint for its current DevTools websocket URL.
async fn resolve_ws_url(endpoint: &str) -> Result<String> {
    let version_url = format!("http://{}/json/version", host_port(endpoint));
    let info: serde_json::Value = reqwest::Client::new()
        .get(&version_url)
        .send()
        .await
        .with_context(|| format!("browser endpoint {version_url} is unreachable; is the browser running?"))?
        .json()
        .await
        .context("browser returned an invalid version response")?;

    info["webSocketDebuggerUrl"]
        .as_str()
        .map(str::to_string)
        .ok_or_else(|| anyhow!("browser version response has no webSocketDebuggerUrl"))
}

/// Drive the CDP message loop until the connection closes.
fn spawn_handler(mut handler: chromiumoxide::Handler) -> JoinHandle<()> {
    task::spawn(async move {
        while let Some(event) = handler.next().await {
            if let Err(e) = event {
                let msg = e.to_string();
                // Chrome sends CDP events chromiumoxide does not model;
                // those deserialization failures are noise, not faults.
                let benign = msg.contains("data did not match any variant of untagged enum Message")
                    || msg.contains("Failed to deserialize WS response");
                if benign {
                    trace!("suppressed benign CDP serialization error: {msg}");
                } else {
                    error!("browser handler error: {msg}");
                }
            }
        }
        debug!("browser handler loop finished");
    })
}
