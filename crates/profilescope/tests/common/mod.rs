//! Fakes shared by the integration tests: a scripted browser, search
//! provider and crawl API. No network, no Chromium.

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use anyhow::{bail, Result};
use async_trait::async_trait;

use profilescope::config::{ExtractionConfig, ScoringConfig, SearchConfig};
use profilescope::resolve::{AudienceProbe, CandidateScorer, CandidateValidator};
use profilescope::session::pacing::Pacing;
use profilescope::{
    AcquisitionOrchestrator, BrowserSession, CandidateSearchEngine, ContentExtractor, CrawlApi,
    CrawlBlock, CrawlFallback, IntelError, IntelResult, NavigationResult, RateLimiter, ResolutionCandidate,
    SearchApi, SearchHit, SessionFactory, SlugResolver,
};

// ── Browser ─────────────────────────────────────────────────────────────────

/// Serves canned HTML per URL.
#[derive(Default)]
pub struct FakeBrowser {
    pub pages: HashMap<String, String>,
    pub fail_open: bool,
    pub fail_navigate: bool,
    pub nav_delay: Duration,
    pub opened: AtomicUsize,
    pub closed: Arc<AtomicUsize>,
    pub visited: Arc<Mutex<Vec<String>>>,
}

impl FakeBrowser {
    pub fn with_page(mut self, url: &str, html: &str) -> Self {
        self.pages.insert(url.to_string(), html.to_string());
        self
    }

    pub fn opened(&self) -> usize {
        self.opened.load(Ordering::SeqCst)
    }

    pub fn closed(&self) -> usize {
        self.closed.load(Ordering::SeqCst)
    }

    pub fn visited(&self) -> Vec<String> {
        self.visited.lock().unwrap().clone()
    }
}

#[async_trait]
impl SessionFactory for FakeBrowser {
    async fn open(&self) -> IntelResult<Box<dyn BrowserSession>> {
        if self.fail_open {
            return Err(IntelError::SessionCreation("no browser in test".to_string()));
        }
        let n = self.opened.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(FakeSession {
            id: format!("fake-{n}"),
            pages: self.pages.clone(),
            current: "about:blank".to_string(),
            fail_navigate: self.fail_navigate,
            nav_delay: self.nav_delay,
            closed: self.closed.clone(),
            visited: self.visited.clone(),
        }))
    }
}

pub struct FakeSession {
    id: String,
    pages: HashMap<String, String>,
    current: String,
    fail_navigate: bool,
    nav_delay: Duration,
    closed: Arc<AtomicUsize>,
    visited: Arc<Mutex<Vec<String>>>,
}

#[async_trait]
impl BrowserSession for FakeSession {
    fn id(&self) -> &str {
        &self.id
    }

    async fn navigate(&mut self, url: &str) -> Result<NavigationResult> {
        if !self.nav_delay.is_zero() {
            tokio::time::sleep(self.nav_delay).await;
        }
        self.visited.lock().unwrap().push(url.to_string());
        if self.fail_navigate {
            bail!("net::ERR_CONNECTION_RESET");
        }
        self.current = url.to_string();
        Ok(NavigationResult {
            final_url: url.to_string(),
            load_time_ms: 1,
        })
    }

    /// No script engine: every evaluation yields `null`, which sends the
    /// extractor down its static-HTML paths.
    async fn execute_js(&self, _script: &str) -> Result<serde_json::Value> {
        Ok(serde_json::Value::Null)
    }

    async fn get_html(&self) -> Result<String> {
        Ok(self
            .pages
            .get(&self.current)
            .cloned()
            .unwrap_or_else(|| "<html><body></body></html>".to_string()))
    }

    async fn get_url(&self) -> Result<String> {
        Ok(self.current.clone())
    }

    async fn close(self: Box<Self>) -> Result<()> {
        self.closed.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

// ── Search ──────────────────────────────────────────────────────────────────

/// Answers every query with the same hits.
#[derive(Default)]
pub struct FixedSearch {
    pub hits: Vec<SearchHit>,
    pub calls: AtomicUsize,
}

impl FixedSearch {
    pub fn returning(hits: Vec<SearchHit>) -> Self {
        Self {
            hits,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SearchApi for FixedSearch {
    fn name(&self) -> &str {
        "fixed"
    }

    async fn search(&self, _query: &str, _max: usize, _filter: Option<&str>) -> Result<Vec<SearchHit>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.hits.clone())
    }
}

pub fn hit(url: &str, title: &str, content: &str) -> SearchHit {
    SearchHit {
        url: url.to_string(),
        title: title.to_string(),
        content: content.to_string(),
    }
}

// ── Validation ──────────────────────────────────────────────────────────────

/// Reports a fixed audience per slug.
pub struct SlugAudience(pub HashMap<String, u64>);

#[async_trait]
impl AudienceProbe for SlugAudience {
    fn name(&self) -> &str {
        "slug-audience"
    }

    async fn probe_all(&self, candidates: &[ResolutionCandidate]) -> Result<Vec<Option<u64>>> {
        Ok(candidates.iter().map(|c| self.0.get(&c.slug).copied()).collect())
    }
}

// ── Crawl ───────────────────────────────────────────────────────────────────

pub struct FakeCrawl {
    pub blocks: Option<Vec<CrawlBlock>>,
    pub urls: Mutex<Vec<String>>,
}

impl FakeCrawl {
    pub fn returning(blocks: Vec<CrawlBlock>) -> Self {
        Self {
            blocks: Some(blocks),
            urls: Mutex::new(Vec::new()),
        }
    }

    pub fn failing() -> Self {
        Self {
            blocks: None,
            urls: Mutex::new(Vec::new()),
        }
    }
}

#[async_trait]
impl CrawlApi for FakeCrawl {
    fn name(&self) -> &str {
        "fake-crawl"
    }

    async fn crawl(&self, url: &str, _instructions: &str) -> Result<Vec<CrawlBlock>> {
        self.urls.lock().unwrap().push(url.to_string());
        match self.blocks {
            Some(ref blocks) => Ok(blocks.clone()),
            None => bail!("crawl quota exhausted"),
        }
    }
}

// ── Fixtures ────────────────────────────────────────────────────────────────

pub const ACME_PROFILE: &str = "https://www.linkedin.com/company/acme/";
pub const ACME_POSTS: &str = "https://www.linkedin.com/company/acme/posts/";

pub const ACME_PROFILE_HTML: &str = r#"<html><head><title>Acme Inc | LinkedIn</title></head><body>
<h1 class="top-card-layout__title">Acme Inc</h1>
<p data-test-id="about-us__description">Acme Inc designs and manufactures precision anvils, rocket skates and other demanding hardware for customers worldwide.</p>
</body></html>"#;

pub const ACME_POSTS_HTML: &str = r#"<html><body>
<article><p>We just opened a new factory in Arizona to double our anvil output.</p></article>
<article><p>2w</p></article>
<article><p>We just opened a new factory in Arizona to double our anvil output.</p></article>
<article><p>Our rocket skates passed their final safety certification this week.</p></article>
<article><p>Acme Inc</p></article>
</body></html>"#;

pub fn acme_browser() -> FakeBrowser {
    FakeBrowser::default()
        .with_page(ACME_PROFILE, ACME_PROFILE_HTML)
        .with_page(ACME_POSTS, ACME_POSTS_HTML)
}

pub fn unlimited() -> Arc<RateLimiter> {
    Arc::new(RateLimiter::new(Duration::ZERO, 1_000, Duration::from_secs(3600)))
}

pub fn resolver(search: Arc<dyn SearchApi>, probes: Vec<Arc<dyn AudienceProbe>>) -> SlugResolver {
    SlugResolver::new(
        CandidateSearchEngine::new(vec![search], SearchConfig::default()),
        CandidateValidator::new(CandidateScorer::new(ScoringConfig::default()), probes),
    )
}

pub fn extractor() -> ContentExtractor {
    ContentExtractor::new(ExtractionConfig::default(), 2, Duration::ZERO, Pacing::none())
}

pub fn crawl_tier(api: Arc<dyn CrawlApi>) -> CrawlFallback {
    CrawlFallback::new(api, ExtractionConfig::default(), SearchConfig::default())
}

pub fn orchestrator(
    limiter: Arc<RateLimiter>,
    search: Arc<dyn SearchApi>,
    browser: Arc<dyn SessionFactory>,
) -> AcquisitionOrchestrator {
    AcquisitionOrchestrator::new(limiter, resolver(search, Vec::new()), browser, extractor())
}
