// Copyright 2026 Profilescope Contributors
// SPDX-License-Identifier: Apache-2.0

//! End-to-end acquisition with the PRIMARY -> FALLBACK_CRAWL -> MINIMAL chain.
//!
//! A run takes a rate-limit permit, then tries each tier in order. Failures
//! inside a tier never reach the caller; they are recorded in
//! [`AcquisitionResult::errors`] and the next tier runs. The only error
//! `acquire_profile` returns is the rate limiter's.
//!
//! The PRIMARY tier runs on its own task so that session teardown completes
//! even when the caller drops the returned future.

use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use tracing::{info, warn};

use crate::audit::AuditLogger;
use crate::config::{ExtractionConfig, IntelConfig};
use crate::crawl::{CrawlApi, CrawlFallback};
use crate::error::{IntelError, IntelResult};
use crate::events::{AcquisitionEventKind, AcquisitionState, EventEmitter, EventReceiver, EventSender};
use crate::extract::{synthetic_description, ContentExtractor};
use crate::http::HttpClient;
use crate::rate_limit::RateLimiter;
use crate::resolve::{
    AudienceProbe, BrowserProbe, CandidateScorer, CandidateValidator, HttpProbe, Resolution,
    SlugResolver,
};
use crate::search::{CandidateSearchEngine, SearchApi, SerperClient, TavilyClient};
use crate::session::chromium::ChromiumSessionManager;
use crate::session::pacing::Pacing;
use crate::session::stealth::pick_identity;
use crate::session::{close_quietly, BrowserSession, SessionFactory};
use crate::types::{AcquiredContent, AcquisitionResult, SourceTier};

/// Outcome of the PRIMARY tier. The resolution survives a later failure so
/// the crawl tier can start from the resolved profile.
struct PrimaryAttempt {
    resolution: Option<Resolution>,
    outcome: IntelResult<AcquiredContent>,
}

/// Resolve, fetch and extract through an automated session.
#[derive(Clone)]
struct PrimaryTier {
    resolver: Arc<SlugResolver>,
    sessions: Arc<dyn SessionFactory>,
    extractor: Arc<ContentExtractor>,
}

impl PrimaryTier {
    async fn run(self, company: String, known_slug: Option<String>, mut events: EventEmitter) -> PrimaryAttempt {
        events.state(AcquisitionState::Resolving);
        let resolution = match self.resolver.resolve(&company, known_slug.as_deref()).await {
            Ok(resolution) => resolution,
            Err(e) => {
                return PrimaryAttempt {
                    resolution: None,
                    outcome: Err(e),
                }
            }
        };

        events.state(AcquisitionState::Fetching);
        let outcome = self.fetch(&company, &resolution.profile_url, &mut events).await;
        PrimaryAttempt {
            resolution: Some(resolution),
            outcome,
        }
    }

    async fn fetch(&self, company: &str, url: &str, events: &mut EventEmitter) -> IntelResult<AcquiredContent> {
        let mut session = self.sessions.open().await?;
        let outcome = self.drive(session.as_mut(), company, url, events).await;
        close_quietly(session).await;
        outcome
    }

    async fn drive(
        &self,
        session: &mut dyn BrowserSession,
        company: &str,
        url: &str,
        events: &mut EventEmitter,
    ) -> IntelResult<AcquiredContent> {
        let nav = session
            .navigate(url)
            .await
            .map_err(|e| IntelError::Fetch(format!("{url}: {e:#}")))?;
        info!(company, url = %nav.final_url, load_ms = nav.load_time_ms, "profile loaded");

        events.state(AcquisitionState::Extracting);
        let content = self.extractor.extract(session, company).await?;
        let floor = self.extractor.config().absolute_floor_chars;
        if content.raw_text_length < floor {
            return Err(IntelError::InsufficientContent {
                chars: content.raw_text_length,
                required: floor,
            });
        }
        Ok(content)
    }
}

pub struct AcquisitionOrchestrator {
    limiter: Arc<RateLimiter>,
    primary: PrimaryTier,
    crawl: Option<CrawlFallback>,
    events: Option<EventSender>,
    audit: Option<Mutex<AuditLogger>>,
}

impl AcquisitionOrchestrator {
    /// An orchestrator with no crawl tier, events or audit log.
    pub fn new(
        limiter: Arc<RateLimiter>,
        resolver: SlugResolver,
        sessions: Arc<dyn SessionFactory>,
        extractor: ContentExtractor,
    ) -> Self {
        Self {
            limiter,
            primary: PrimaryTier {
                resolver: Arc::new(resolver),
                sessions,
                extractor: Arc::new(extractor),
            },
            crawl: None,
            events: None,
            audit: None,
        }
    }

    pub fn with_crawl(mut self, crawl: CrawlFallback) -> Self {
        self.crawl = Some(crawl);
        self
    }

    pub fn with_events(mut self, tx: EventSender) -> Self {
        self.events = Some(tx);
        self
    }

    pub fn with_audit(mut self, logger: AuditLogger) -> Self {
        self.audit = Some(Mutex::new(logger));
        self
    }

    /// Wire every component from configuration.
    ///
    /// Search providers and the crawl tier are enabled by their API keys.
    /// `limiter` is shared: pass the same handle to every orchestrator in
    /// the process.
    pub fn from_config(config: &IntelConfig, limiter: Arc<RateLimiter>) -> Self {
        let timeout = Duration::from_millis(config.api.request_timeout_ms);

        let tavily = config.api.tavily_api_key.as_deref().map(|key| {
            Arc::new(
                TavilyClient::new(key, &config.api.tavily_base_url, timeout)
                    .with_crawl_limit(config.api.crawl_limit),
            )
        });
        let mut providers: Vec<Arc<dyn SearchApi>> = Vec::new();
        if let Some(ref client) = tavily {
            providers.push(client.clone());
        }
        if let Some(key) = config.api.serper_api_key.as_deref() {
            providers.push(Arc::new(SerperClient::new(key, &config.api.serper_base_url, timeout)));
        }
        if providers.is_empty() {
            warn!("no search API key configured, resolution limited to supplied and known slugs");
        }

        let sessions: Arc<dyn SessionFactory> =
            Arc::new(ChromiumSessionManager::new(config.session.clone()));

        let search = &config.search;
        let user_agent = {
            let mut rng = rand::thread_rng();
            pick_identity(&config.session.identities, &mut rng).user_agent
        };
        let probes: Vec<Arc<dyn AudienceProbe>> = vec![
            Arc::new(BrowserProbe::new(
                sessions.clone(),
                search.profile_host.clone(),
                search.profile_path_prefix.clone(),
                Pacing::from_config(&config.session),
            )),
            Arc::new(HttpProbe::new(
                HttpClient::new(&user_agent, timeout),
                &search.profile_host,
                &search.profile_path_prefix,
            )),
        ];

        let resolver = SlugResolver::new(
            CandidateSearchEngine::new(providers, config.search.clone()),
            CandidateValidator::new(CandidateScorer::new(config.scoring.clone()), probes),
        );

        let mut orchestrator = Self::new(
            limiter,
            resolver,
            sessions,
            ContentExtractor::from_config(config),
        );

        if let Some(client) = tavily {
            orchestrator = orchestrator.with_crawl(CrawlFallback::new(
                client as Arc<dyn CrawlApi>,
                config.extraction.clone(),
                config.search.clone(),
            ));
        }

        if let Some(ref path) = config.paths.audit_log {
            match AuditLogger::open(path) {
                Ok(logger) => orchestrator = orchestrator.with_audit(logger),
                Err(e) => warn!(path = %path.display(), "audit log disabled: {e:#}"),
            }
        }
        orchestrator
    }

    pub fn limiter(&self) -> &Arc<RateLimiter> {
        &self.limiter
    }

    pub fn resolver(&self) -> &SlugResolver {
        &self.primary.resolver
    }

    pub fn extraction_config(&self) -> &ExtractionConfig {
        self.primary.extractor.config()
    }

    /// Subscribe to acquisition events, when a channel is attached.
    pub fn subscribe(&self) -> Option<EventReceiver> {
        self.events.as_ref().map(|tx| tx.subscribe())
    }

    /// Acquire profile content for `company`.
    ///
    /// Always yields a result with a non-empty description, except when the
    /// rate limiter refuses the run.
    pub async fn acquire_profile(
        &self,
        company: &str,
        known_slug: Option<&str>,
    ) -> IntelResult<AcquisitionResult> {
        self.limiter.acquire_permit().await?;

        let started = Instant::now();
        let mut events = EventEmitter::new(self.events.clone(), company);
        let mut errors = Vec::new();
        info!(company, run = %events.run_id(), "acquisition started");

        // ── PRIMARY ──
        let tier_start = Instant::now();
        events.emit(AcquisitionEventKind::TierStarted {
            tier: SourceTier::Primary,
        });
        let task = tokio::spawn(self.primary.clone().run(
            company.to_string(),
            known_slug.map(str::to_string),
            events.clone(),
        ));
        let attempt = match task.await {
            Ok(attempt) => attempt,
            Err(e) => PrimaryAttempt {
                resolution: None,
                outcome: Err(IntelError::Fetch(format!("primary task aborted: {e}"))),
            },
        };
        let resolved_slug = attempt.resolution.as_ref().map(|r| r.slug.clone());
        let resolved_url = attempt.resolution.as_ref().map(|r| r.profile_url.clone());

        match attempt.outcome {
            Ok(content) => {
                self.tier_completed(&mut events, SourceTier::Primary, &content, tier_start);
                return Ok(self.finish(
                    company,
                    content,
                    SourceTier::Primary,
                    started,
                    errors,
                    resolved_slug,
                    resolved_url,
                    &mut events,
                ));
            }
            Err(e) if !e.is_escalatable() => {
                events.state(AcquisitionState::Failed);
                return Err(e);
            }
            Err(e) => self.tier_failed(&mut events, SourceTier::Primary, &e, tier_start, &mut errors),
        }

        // ── FALLBACK_CRAWL ──
        let tier_start = Instant::now();
        events.emit(AcquisitionEventKind::TierStarted {
            tier: SourceTier::FallbackCrawl,
        });
        let crawled = match self.crawl {
            Some(ref crawl) => crawl.acquire(company, resolved_url.as_deref()).await,
            None => Err(IntelError::external("crawl", "no crawl API configured")),
        };
        match crawled {
            Ok(content) => {
                self.tier_completed(&mut events, SourceTier::FallbackCrawl, &content, tier_start);
                let url = resolved_url
                    .clone()
                    .or_else(|| self.crawl.as_ref().map(|c| c.start_url(company, None)));
                return Ok(self.finish(
                    company,
                    content,
                    SourceTier::FallbackCrawl,
                    started,
                    errors,
                    resolved_slug,
                    url,
                    &mut events,
                ));
            }
            Err(e) => self.tier_failed(&mut events, SourceTier::FallbackCrawl, &e, tier_start, &mut errors),
        }

        // ── MINIMAL ──
        let tier_start = Instant::now();
        events.emit(AcquisitionEventKind::TierStarted {
            tier: SourceTier::Minimal,
        });
        let content = minimal_content(company);
        self.tier_completed(&mut events, SourceTier::Minimal, &content, tier_start);
        Ok(self.finish(
            company,
            content,
            SourceTier::Minimal,
            started,
            errors,
            resolved_slug,
            None,
            &mut events,
        ))
    }

    fn tier_completed(
        &self,
        events: &mut EventEmitter,
        tier: SourceTier,
        content: &AcquiredContent,
        tier_start: Instant,
    ) {
        let elapsed_ms = elapsed_ms(tier_start);
        info!(%tier, elapsed_ms, chars = content.raw_text_length, "tier succeeded");
        events.emit(AcquisitionEventKind::TierCompleted {
            tier,
            chars: content.raw_text_length,
            elapsed_ms,
        });
    }

    fn tier_failed(
        &self,
        events: &mut EventEmitter,
        tier: SourceTier,
        error: &IntelError,
        tier_start: Instant,
        errors: &mut Vec<String>,
    ) {
        let elapsed_ms = elapsed_ms(tier_start);
        warn!(%tier, elapsed_ms, "tier failed, escalating: {error}");
        errors.push(format!("{tier}: {error}"));
        events.state(AcquisitionState::Failed);
        events.emit(AcquisitionEventKind::TierFailed {
            tier,
            error: error.to_string(),
            elapsed_ms,
        });
    }

    #[allow(clippy::too_many_arguments)]
    fn finish(
        &self,
        company: &str,
        content: AcquiredContent,
        tier: SourceTier,
        started: Instant,
        errors: Vec<String>,
        resolved_slug: Option<String>,
        profile_url: Option<String>,
        events: &mut EventEmitter,
    ) -> AcquisitionResult {
        let result = AcquisitionResult {
            company_name: company.to_string(),
            content,
            source_tier: tier,
            duration_ms: elapsed_ms(started),
            errors,
            resolved_slug,
            profile_url,
        };
        events.state(AcquisitionState::Done);
        info!(
            company,
            %tier,
            elapsed_ms = result.duration_ms,
            errors = result.errors.len(),
            "acquisition finished"
        );

        if let Some(ref audit) = self.audit {
            match audit.lock() {
                Ok(mut logger) => {
                    if let Err(e) = logger.log_result(&result) {
                        warn!("failed to write audit event: {e:#}");
                    }
                }
                Err(_) => warn!("audit logger lock poisoned"),
            }
        }
        result
    }
}

/// Placeholder content for the MINIMAL tier. Composes static text only.
pub fn minimal_content(company: &str) -> AcquiredContent {
    AcquiredContent::new(company, synthetic_description(company))
}

fn elapsed_ms(since: Instant) -> u64 {
    since.elapsed().as_millis() as u64
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{ScoringConfig, SearchConfig};
    use crate::crawl::testing::ScriptedCrawl;
    use crate::crawl::CrawlBlock;
    use crate::search::testing::ScriptedSearch;
    use crate::session::NoopSessionFactory;

    fn orchestrator(limiter: RateLimiter) -> AcquisitionOrchestrator {
        let resolver = SlugResolver::new(
            CandidateSearchEngine::new(
                vec![Arc::new(ScriptedSearch::default()) as Arc<dyn SearchApi>],
                SearchConfig::default(),
            ),
            CandidateValidator::new(CandidateScorer::new(ScoringConfig::default()), Vec::new()),
        );
        AcquisitionOrchestrator::new(
            Arc::new(limiter),
            resolver,
            Arc::new(NoopSessionFactory),
            ContentExtractor::new(
                ExtractionConfig::default(),
                0,
                Duration::ZERO,
                Pacing::none(),
            ),
        )
    }

    fn unlimited() -> RateLimiter {
        RateLimiter::new(Duration::ZERO, 1_000, Duration::from_secs(3600))
    }

    #[tokio::test]
    async fn test_minimal_when_everything_fails() {
        let orch = orchestrator(unlimited());
        let result = orch.acquire_profile("Obscure Startup", None).await.unwrap();
        assert_eq!(result.source_tier, SourceTier::Minimal);
        assert!(!result.content.description.is_empty());
        assert_eq!(result.errors.len(), 2);
        assert!(result.errors[0].starts_with("PRIMARY: "));
        assert!(result.errors[1].starts_with("FALLBACK_CRAWL: "));
        assert_eq!(result.content.raw_text_length, 0);
    }

    #[tokio::test]
    async fn test_crawl_tier_uses_resolved_url() {
        let crawl = Arc::new(ScriptedCrawl::returning(vec![CrawlBlock {
            url: "https://www.linkedin.com/company/tesla-motors/".to_string(),
            raw_content: "# Tesla\n\nTesla accelerates the world's transition to sustainable energy \
                          with electric cars."
                .to_string(),
        }]));
        let orch = orchestrator(unlimited()).with_crawl(CrawlFallback::new(
            crawl.clone() as Arc<dyn CrawlApi>,
            ExtractionConfig::default(),
            SearchConfig::default(),
        ));

        let result = orch.acquire_profile("Tesla", None).await.unwrap();
        assert_eq!(result.source_tier, SourceTier::FallbackCrawl);
        assert_eq!(result.resolved_slug.as_deref(), Some("tesla-motors"));
        assert!(result.errors[0].contains("browser automation disabled"));
        let calls = crawl.calls.lock().unwrap().clone();
        assert_eq!(calls[0].0, "https://www.linkedin.com/company/tesla-motors/");
    }

    #[tokio::test]
    async fn test_rate_limit_propagates() {
        let orch = orchestrator(RateLimiter::new(
            Duration::ZERO,
            1,
            Duration::from_secs(3600),
        ));
        orch.acquire_profile("Acme", None).await.unwrap();
        let err = orch.acquire_profile("Acme", None).await.unwrap_err();
        assert!(matches!(err, IntelError::RateLimitExceeded { .. }));
    }

    #[tokio::test]
    async fn test_events_follow_tiers() {
        let (tx, mut rx) = crate::events::channel();
        let orch = orchestrator(unlimited()).with_events(tx);
        orch.acquire_profile("Obscure Startup", None).await.unwrap();

        let mut kinds = Vec::new();
        while let Ok(event) = rx.try_recv() {
            kinds.push(event.event);
        }
        assert!(matches!(
            kinds.first(),
            Some(AcquisitionEventKind::TierStarted {
                tier: SourceTier::Primary
            })
        ));
        assert!(kinds.iter().any(|k| matches!(
            k,
            AcquisitionEventKind::TierFailed {
                tier: SourceTier::FallbackCrawl,
                ..
            }
        )));
        assert!(matches!(
            kinds.last(),
            Some(AcquisitionEventKind::StateChanged {
                state: AcquisitionState::Done
            })
        ));
    }

    #[tokio::test]
    async fn test_minimal_completion_reports_measured_tier() {
        let (tx, mut rx) = crate::events::channel();
        let orch = orchestrator(unlimited()).with_events(tx);
        let result = orch.acquire_profile("Obscure Startup", None).await.unwrap();

        let mut minimal = None;
        while let Ok(event) = rx.try_recv() {
            if let AcquisitionEventKind::TierCompleted {
                tier: SourceTier::Minimal,
                chars,
                elapsed_ms,
            } = event.event
            {
                minimal = Some((chars, elapsed_ms));
            }
        }
        let (chars, elapsed_ms) = minimal.expect("minimal tier completed");
        assert_eq!(chars, result.content.raw_text_length);
        assert!(elapsed_ms <= result.duration_ms);
    }

    #[tokio::test]
    async fn test_audit_records_each_run() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("audit.jsonl");
        let orch = orchestrator(unlimited()).with_audit(AuditLogger::open(&path).unwrap());
        orch.acquire_profile("Acme", None).await.unwrap();
        orch.acquire_profile("Globex", None).await.unwrap();

        let events = crate::audit::read_events(&path).unwrap();
        assert_eq!(events.len(), 2);
        assert_eq!(events[1].company, "Globex");
        assert_eq!(events[1].tier, SourceTier::Minimal);
        assert_eq!(events[1].error_count, 2);
    }
}
