//! Automation session abstraction.
//!
//! Defines the `SessionFactory` and `BrowserSession` traits that abstract
//! over the browser engine (currently Chromium via chromiumoxide). One
//! session belongs to exactly one acquisition run and is never reused.

pub mod chromium;
pub mod cleanup;
pub mod pacing;
pub mod stealth;

use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::{IntelError, IntelResult};

/// Result of navigating to a URL.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NavigationResult {
    /// The final URL after any redirects.
    pub final_url: String,
    /// Time taken to load the page in milliseconds.
    pub load_time_ms: u64,
}

/// A live automated browser page.
#[async_trait]
pub trait BrowserSession: Send + Sync {
    /// Unique identifier for logging.
    fn id(&self) -> &str;
    /// Navigate to a URL, bounded by the page-load timeout.
    async fn navigate(&mut self, url: &str) -> Result<NavigationResult>;
    /// Execute JavaScript in the page context and return the result.
    async fn execute_js(&self, script: &str) -> Result<serde_json::Value>;
    /// Get the full page HTML.
    async fn get_html(&self) -> Result<String>;
    /// Get the current URL.
    async fn get_url(&self) -> Result<String>;
    /// Tear the session down: page, browser process, orphaned children and
    /// the temporary profile directory.
    async fn close(self: Box<Self>) -> Result<()>;
}

/// Creates fresh, exclusively-owned sessions.
#[async_trait]
pub trait SessionFactory: Send + Sync {
    async fn open(&self) -> IntelResult<Box<dyn BrowserSession>>;
}

/// Factory used when no browser is available.
///
/// Every `open` fails, so the primary tier always escalates.
pub struct NoopSessionFactory;

#[async_trait]
impl SessionFactory for NoopSessionFactory {
    async fn open(&self) -> IntelResult<Box<dyn BrowserSession>> {
        Err(IntelError::SessionCreation(
            "browser automation disabled".to_string(),
        ))
    }
}

/// Close a session, logging rather than propagating teardown failures.
pub async fn close_quietly(session: Box<dyn BrowserSession>) {
    let id = session.id().to_string();
    match session.close().await {
        Ok(()) => tracing::debug!(session = %id, "session closed"),
        Err(e) => tracing::warn!(session = %id, "session close failed: {e:#}"),
    }
}
