//! Chromium-backed sessions using chromiumoxide.
//!
//! Every session launches its own browser with a throwaway profile
//! directory, a randomized identity and the configured masking directives.

use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use chromiumoxide::browser::{Browser, BrowserConfig};
use chromiumoxide::cdp::browser_protocol::page::AddScriptToEvaluateOnNewDocumentParams;
use chromiumoxide::handler::viewport::Viewport as CdpViewport;
use chromiumoxide::page::Page;
use futures::StreamExt;
use tempfile::TempDir;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use super::cleanup::{self, PROFILE_DIR_PREFIX};
use super::stealth::{launch_args, masking_script, pick_identity, SessionIdentity};
use super::{BrowserSession, NavigationResult, SessionFactory};
use crate::config::SessionConfig;
use crate::error::{IntelError, IntelResult};

/// Find the Chrome/Chromium binary.
///
/// Order: explicit config path, `PROFILESCOPE_CHROME_PATH`, `CHROME_BIN`,
/// then the usual binary names on `PATH`.
pub fn find_chromium(explicit: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = explicit {
        if path.exists() {
            return Some(path.to_path_buf());
        }
    }

    for var in ["PROFILESCOPE_CHROME_PATH", "CHROME_BIN"] {
        if let Ok(p) = std::env::var(var) {
            let path = PathBuf::from(&p);
            if path.exists() {
                return Some(path);
            }
        }
    }

    for name in ["google-chrome", "google-chrome-stable", "chromium", "chromium-browser"] {
        if let Ok(path) = which::which(name) {
            return Some(path);
        }
    }

    if cfg!(target_os = "macos") {
        let common = PathBuf::from("/Applications/Google Chrome.app/Contents/MacOS/Google Chrome");
        if common.exists() {
            return Some(common);
        }
    }

    None
}

/// Opens one fresh Chromium instance per session.
pub struct ChromiumSessionManager {
    config: SessionConfig,
}

impl ChromiumSessionManager {
    pub fn new(config: SessionConfig) -> Self {
        Self { config }
    }

    fn full_config(
        &self,
        exe: &Path,
        profile_dir: &Path,
        identity: &SessionIdentity,
    ) -> Result<BrowserConfig> {
        let width = identity.viewport.width;
        let height = identity.viewport.height;
        let mut builder = BrowserConfig::builder()
            .chrome_executable(exe)
            .user_data_dir(profile_dir)
            .request_timeout(self.config.page_load_timeout())
            .viewport(CdpViewport {
                width,
                height,
                device_scale_factor: Some(1.0),
                emulating_mobile: false,
                is_landscape: true,
                has_touch: false,
            })
            .window_size(width, height)
            .arg("--headless=new")
            .arg("--disable-gpu")
            .arg("--no-sandbox")
            .arg("--disable-dev-shm-usage")
            .arg("--disable-extensions")
            .arg("--disable-background-networking")
            .arg("--no-first-run")
            .arg("--no-default-browser-check")
            .arg(format!("--user-agent={}", identity.user_agent));

        for arg in launch_args(&self.config.masking) {
            builder = builder.arg(arg);
        }

        builder
            .build()
            .map_err(|e| anyhow::anyhow!("failed to build browser config: {e}"))
    }

    /// Minimal flags only, used when the full configuration fails to launch.
    fn degraded_config(&self, exe: &Path, profile_dir: &Path) -> Result<BrowserConfig> {
        BrowserConfig::builder()
            .chrome_executable(exe)
            .user_data_dir(profile_dir)
            .request_timeout(self.config.page_load_timeout())
            .arg("--headless=new")
            .arg("--no-sandbox")
            .arg("--disable-dev-shm-usage")
            .build()
            .map_err(|e| anyhow::anyhow!("failed to build degraded browser config: {e}"))
    }
}

async fn launch(config: BrowserConfig) -> Result<(Browser, JoinHandle<()>)> {
    let (browser, mut handler) = Browser::launch(config)
        .await
        .context("failed to launch Chromium")?;

    let handler_task = tokio::spawn(async move {
        while let Some(event) = handler.next().await {
            let _ = event;
        }
    });

    Ok((browser, handler_task))
}

#[async_trait]
impl SessionFactory for ChromiumSessionManager {
    async fn open(&self) -> IntelResult<Box<dyn BrowserSession>> {
        let exe = find_chromium(self.config.chrome_path.as_deref()).ok_or_else(|| {
            IntelError::SessionCreation(
                "Chromium not found. Set PROFILESCOPE_CHROME_PATH or session.chrome_path"
                    .to_string(),
            )
        })?;

        let profile_dir = tempfile::Builder::new()
            .prefix(PROFILE_DIR_PREFIX)
            .tempdir()
            .map_err(|e| IntelError::SessionCreation(format!("profile dir: {e}")))?;
        let marker = profile_dir.path().to_string_lossy().into_owned();

        let identity = {
            let mut rng = rand::thread_rng();
            pick_identity(&self.config.identities, &mut rng)
        };

        let full = self
            .full_config(&exe, profile_dir.path(), &identity)
            .map_err(|e| IntelError::SessionCreation(format!("{e:#}")))?;

        let (mut browser, handler) = match launch(full).await {
            Ok(launched) => launched,
            Err(first) => {
                warn!("browser launch failed, retrying with minimal flags: {first:#}");
                cleanup::kill_orphans_off_thread(&marker).await;
                let degraded = self
                    .degraded_config(&exe, profile_dir.path())
                    .map_err(|e| IntelError::SessionCreation(format!("{e:#}")))?;
                match launch(degraded).await {
                    Ok(launched) => launched,
                    Err(second) => {
                        cleanup::kill_orphans_off_thread(&marker).await;
                        return Err(IntelError::SessionCreation(format!(
                            "{first:#}; degraded retry: {second:#}"
                        )));
                    }
                }
            }
        };

        let page = match browser.new_page("about:blank").await {
            Ok(page) => page,
            Err(e) => {
                let _ = browser.close().await;
                handler.abort();
                cleanup::kill_orphans_off_thread(&marker).await;
                return Err(IntelError::SessionCreation(format!(
                    "failed to create page: {e}"
                )));
            }
        };

        let script = masking_script(&self.config.masking);
        if !script.is_empty() {
            if let Err(e) = page
                .execute(AddScriptToEvaluateOnNewDocumentParams::new(script))
                .await
            {
                warn!("failed to inject masking script: {e}");
            }
        }

        let id = uuid::Uuid::new_v4().to_string();
        info!(
            session = %id,
            width = identity.viewport.width,
            height = identity.viewport.height,
            "browser session opened"
        );

        Ok(Box::new(ChromiumSession {
            id,
            browser: Some(browser),
            page: Some(page),
            handler: Some(handler),
            profile_dir: Some(profile_dir),
            marker,
            page_load_timeout: self.config.page_load_timeout(),
            implicit_wait: self.config.implicit_wait(),
        }))
    }
}

/// One live browser plus its single page.
pub struct ChromiumSession {
    id: String,
    browser: Option<Browser>,
    page: Option<Page>,
    handler: Option<JoinHandle<()>>,
    profile_dir: Option<TempDir>,
    marker: String,
    page_load_timeout: Duration,
    implicit_wait: Duration,
}

impl ChromiumSession {
    fn page(&self) -> Result<&Page> {
        self.page.as_ref().context("session already closed")
    }

    /// Poll until the document reports `complete` or the implicit wait ends.
    async fn wait_until_ready(&self) {
        let page = match self.page() {
            Ok(page) => page,
            Err(_) => return,
        };
        let deadline = Instant::now() + self.implicit_wait;
        while Instant::now() < deadline {
            let ready = page
                .evaluate("document.readyState")
                .await
                .ok()
                .and_then(|r| r.into_value::<String>().ok());
            if ready.as_deref() == Some("complete") {
                return;
            }
            tokio::time::sleep(Duration::from_millis(250)).await;
        }
        debug!(session = %self.id, "page not complete after implicit wait");
    }

    async fn shutdown(&mut self) {
        if let Some(page) = self.page.take() {
            let _ = page.close().await;
        }
        if let Some(mut browser) = self.browser.take() {
            if let Err(e) = browser.close().await {
                warn!(session = %self.id, "browser close failed: {e}");
            }
            let _ = tokio::time::timeout(Duration::from_secs(5), browser.wait()).await;
        }
        if let Some(handler) = self.handler.take() {
            handler.abort();
        }

        if let Some(reaping) = cleanup::reap_detached(self.marker.clone(), self.profile_dir.take()) {
            let _ = reaping.await;
        }
    }
}

#[async_trait]
impl BrowserSession for ChromiumSession {
    fn id(&self) -> &str {
        &self.id
    }

    async fn navigate(&mut self, url: &str) -> Result<NavigationResult> {
        let start = Instant::now();
        let page = self.page()?;

        let result = tokio::time::timeout(self.page_load_timeout, page.goto(url)).await;

        match result {
            Ok(Ok(_)) => {
                let _ = tokio::time::timeout(self.page_load_timeout, page.wait_for_navigation())
                    .await;
                self.wait_until_ready().await;

                let final_url = self
                    .page()?
                    .url()
                    .await
                    .unwrap_or_default()
                    .unwrap_or_else(|| url.to_string());

                Ok(NavigationResult {
                    final_url,
                    load_time_ms: start.elapsed().as_millis() as u64,
                })
            }
            Ok(Err(e)) => bail!("navigation failed: {e}"),
            Err(_) => bail!(
                "navigation timed out after {}ms",
                self.page_load_timeout.as_millis()
            ),
        }
    }

    async fn execute_js(&self, script: &str) -> Result<serde_json::Value> {
        let result = self
            .page()?
            .evaluate(script)
            .await
            .context("JS execution failed")?;

        result
            .into_value()
            .map_err(|e| anyhow::anyhow!("failed to convert JS result: {e:?}"))
    }

    async fn get_html(&self) -> Result<String> {
        self.page()?
            .content()
            .await
            .context("failed to get HTML")
    }

    async fn get_url(&self) -> Result<String> {
        let url = self
            .page()?
            .url()
            .await
            .context("failed to get URL")?
            .unwrap_or_default();
        Ok(url)
    }

    async fn close(mut self: Box<Self>) -> Result<()> {
        self.shutdown().await;
        Ok(())
    }
}

impl Drop for ChromiumSession {
    fn drop(&mut self) {
        if self.browser.is_none() {
            return;
        }
        warn!(session = %self.id, "session dropped without close, killing browser");
        // Dropping the browser kills its child process.
        self.page.take();
        self.browser.take();
        if let Some(handler) = self.handler.take() {
            handler.abort();
        }
        // Detached: nothing awaits the blocking scan from here.
        let _ = cleanup::reap_detached(std::mem::take(&mut self.marker), self.profile_dir.take());
    }
}
