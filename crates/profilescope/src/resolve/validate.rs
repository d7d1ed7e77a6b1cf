//! Candidate validation: audience probes with a heuristic fallback.

use std::sync::Arc;

use anyhow::{bail, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use super::audience::parse_audience_size;
use super::scoring::CandidateScorer;
use crate::extract::html::page_text;
use crate::http::HttpClient;
use crate::names::profile_url;
use crate::session::pacing::Pacing;
use crate::session::{close_quietly, SessionFactory};
use crate::types::ResolutionCandidate;

const PAGE_TEXT_JS: &str = r#"(() => {
    const meta = document.querySelector('meta[property="og:description"]');
    const body = document.body ? document.body.innerText : '';
    return (meta ? meta.content + ' ' : '') + body;
})()"#;

/// Reads an audience signal for each candidate.
#[async_trait]
pub trait AudienceProbe: Send + Sync {
    fn name(&self) -> &str;

    /// One reading per candidate, in order. `Err` means the tier as a whole
    /// was unavailable.
    async fn probe_all(&self, candidates: &[ResolutionCandidate]) -> Result<Vec<Option<u64>>>;
}

/// Visits every candidate in one automated browser session.
pub struct BrowserProbe {
    sessions: Arc<dyn SessionFactory>,
    host: String,
    path_prefix: String,
    pacing: Pacing,
}

impl BrowserProbe {
    pub fn new(
        sessions: Arc<dyn SessionFactory>,
        host: impl Into<String>,
        path_prefix: impl Into<String>,
        pacing: Pacing,
    ) -> Self {
        Self {
            sessions,
            host: host.into(),
            path_prefix: path_prefix.into(),
            pacing,
        }
    }
}

#[async_trait]
impl AudienceProbe for BrowserProbe {
    fn name(&self) -> &str {
        "browser"
    }

    async fn probe_all(&self, candidates: &[ResolutionCandidate]) -> Result<Vec<Option<u64>>> {
        let mut session = self.sessions.open().await?;

        let mut readings = Vec::with_capacity(candidates.len());
        let mut visited = 0usize;
        for candidate in candidates {
            let url = profile_url(&candidate.slug, &self.host, &self.path_prefix);
            let reading = match session.navigate(&url).await {
                Ok(_) => {
                    visited += 1;
                    self.pacing.pause().await;
                    match session.execute_js(PAGE_TEXT_JS).await {
                        Ok(value) => value.as_str().and_then(parse_audience_size),
                        Err(e) => {
                            debug!(slug = %candidate.slug, "page text read failed: {e:#}");
                            None
                        }
                    }
                }
                Err(e) => {
                    debug!(slug = %candidate.slug, url = %url, "candidate visit failed: {e:#}");
                    None
                }
            };
            readings.push(reading);
        }

        close_quietly(session).await;

        if visited == 0 && !candidates.is_empty() {
            bail!("every candidate visit failed");
        }
        Ok(readings)
    }
}

/// Plain HTTP fetch of every candidate page, no rendering.
pub struct HttpProbe {
    http: HttpClient,
    /// Everything before the slug, e.g. `https://www.linkedin.com/company/`.
    base: String,
}

impl HttpProbe {
    pub fn new(http: HttpClient, host: &str, path_prefix: &str) -> Self {
        Self::with_base(http, &format!("https://www.{host}{path_prefix}"))
    }

    /// Probe profiles under an arbitrary base URL.
    pub fn with_base(http: HttpClient, base: &str) -> Self {
        Self {
            http,
            base: format!("{}/", base.trim_end_matches('/')),
        }
    }

    fn url_for(&self, slug: &str) -> String {
        format!("{}{slug}/", self.base)
    }

    async fn probe_one(&self, slug: &str) -> Result<Option<u64>> {
        let url = self.url_for(slug);
        if !self.http.exists(&url).await? {
            debug!(slug, url = %url, "candidate profile does not exist");
            return Ok(None);
        }
        let resp = self.http.get(&url).await?;
        if !resp.is_success() {
            return Ok(None);
        }
        Ok(parse_audience_size(&page_text(&resp.body)))
    }
}

#[async_trait]
impl AudienceProbe for HttpProbe {
    fn name(&self) -> &str {
        "http"
    }

    async fn probe_all(&self, candidates: &[ResolutionCandidate]) -> Result<Vec<Option<u64>>> {
        let mut readings = Vec::with_capacity(candidates.len());
        let mut failures = 0usize;
        let mut last_error = None;
        for candidate in candidates {
            match self.probe_one(&candidate.slug).await {
                Ok(reading) => readings.push(reading),
                Err(e) => {
                    failures += 1;
                    last_error = Some(format!("{e:#}"));
                    readings.push(None);
                }
            }
        }
        if failures == candidates.len() && failures > 0 {
            bail!(
                "every candidate fetch failed: {}",
                last_error.unwrap_or_default()
            );
        }
        Ok(readings)
    }
}

/// How the winning candidate was chosen.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "method", rename_all = "snake_case")]
pub enum Selection {
    /// Only one candidate existed.
    SingleCandidate { low_confidence: bool },
    /// Largest audience according to the named probe.
    Audience { probe: String },
    /// No probe produced a usable signal.
    Heuristic,
}

/// Outcome of validating a candidate list.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Validation {
    pub winner: Option<ResolutionCandidate>,
    pub selection: Option<Selection>,
    /// Every scored candidate, losers carrying a rejection reason.
    pub candidates: Vec<ResolutionCandidate>,
}

impl Validation {
    fn empty() -> Self {
        Self {
            winner: None,
            selection: None,
            candidates: Vec::new(),
        }
    }

    /// Winner first, then the rest by descending relevance.
    pub fn ranked(&self) -> Vec<&ResolutionCandidate> {
        let mut ranked: Vec<&ResolutionCandidate> = self.candidates.iter().collect();
        ranked.sort_by(|a, b| {
            let a_wins = a.rejection_reason.is_none();
            let b_wins = b.rejection_reason.is_none();
            b_wins.cmp(&a_wins).then(
                b.relevance_score
                    .partial_cmp(&a.relevance_score)
                    .unwrap_or(std::cmp::Ordering::Equal),
            )
        });
        ranked
    }
}

/// Scores candidates and picks a winner through the probe tiers.
pub struct CandidateValidator {
    scorer: CandidateScorer,
    probes: Vec<Arc<dyn AudienceProbe>>,
}

impl CandidateValidator {
    /// `probes` are tried in order; the heavyweight one goes first.
    pub fn new(scorer: CandidateScorer, probes: Vec<Arc<dyn AudienceProbe>>) -> Self {
        Self { scorer, probes }
    }

    pub fn scorer(&self) -> &CandidateScorer {
        &self.scorer
    }

    /// Best candidate for `company`, or `None` when there is none.
    pub async fn validate_and_score(
        &self,
        company: &str,
        candidates: Vec<ResolutionCandidate>,
    ) -> Option<ResolutionCandidate> {
        self.evaluate(company, candidates).await.winner
    }

    /// Full validation, keeping every scored candidate.
    pub async fn evaluate(&self, company: &str, candidates: Vec<ResolutionCandidate>) -> Validation {
        let mut candidates: Vec<ResolutionCandidate> = candidates
            .into_iter()
            .filter(|c| !c.slug.trim().is_empty())
            .collect();
        if candidates.is_empty() {
            return Validation::empty();
        }
        self.scorer.score_all(company, &mut candidates);

        // Single-candidate fast path.
        if candidates.len() == 1 {
            let score = candidates[0].relevance_score;
            let low_confidence = score < self.scorer.config().single_candidate_threshold;
            if low_confidence {
                warn!(
                    company,
                    slug = %candidates[0].slug,
                    score,
                    "accepting lone candidate with low confidence"
                );
            }
            return finish(
                candidates,
                0,
                Selection::SingleCandidate { low_confidence },
                |_, _| String::new(),
            );
        }

        // Probe tiers, heaviest first.
        for probe in &self.probes {
            match probe.probe_all(&candidates).await {
                Ok(readings) if readings.len() == candidates.len() => {
                    if readings.iter().all(Option::is_none) {
                        info!(company, probe = probe.name(), "probe found no audience signal");
                        continue;
                    }
                    for (candidate, reading) in candidates.iter_mut().zip(readings) {
                        candidate.audience_size = reading;
                    }
                    if let Some(winner) = self.scorer.pick_by_audience(company, &candidates) {
                        info!(company, probe = probe.name(), slug = %candidates[winner].slug, "selected by audience");
                        let best = candidates[winner].audience_size;
                        return finish(
                            candidates,
                            winner,
                            Selection::Audience {
                                probe: probe.name().to_string(),
                            },
                            move |loser, _| match (loser.audience_size, best) {
                                (Some(a), Some(b)) if a == b => "equal audience, lower relevance".into(),
                                (Some(a), Some(b)) => format!("smaller audience ({a} < {b})"),
                                _ => "no audience reading".into(),
                            },
                        );
                    }
                }
                Ok(readings) => {
                    warn!(
                        company,
                        probe = probe.name(),
                        got = readings.len(),
                        expected = candidates.len(),
                        "probe returned mismatched readings"
                    );
                }
                Err(e) => {
                    warn!(company, probe = probe.name(), "validation tier unavailable: {e:#}");
                }
            }
        }

        // Pure heuristics always produce an answer.
        for candidate in candidates.iter_mut() {
            candidate.audience_size = None;
        }
        let winner = self
            .scorer
            .pick_heuristic(company, &candidates)
            .unwrap_or(0);
        info!(company, slug = %candidates[winner].slug, "selected by heuristic");
        let distributors: Vec<bool> = candidates
            .iter()
            .map(|c| self.scorer.is_distributor(company, c))
            .collect();
        let best_score = candidates[winner].relevance_score;
        finish(candidates, winner, Selection::Heuristic, move |loser, i| {
            if distributors[i] {
                "distributor or reseller indicators".into()
            } else {
                format!(
                    "lower relevance ({:.0} vs {:.0})",
                    loser.relevance_score, best_score
                )
            }
        })
    }
}

fn finish<F>(
    mut candidates: Vec<ResolutionCandidate>,
    winner: usize,
    selection: Selection,
    reason: F,
) -> Validation
where
    F: Fn(&ResolutionCandidate, usize) -> String,
{
    for i in 0..candidates.len() {
        if i != winner {
            let why = reason(&candidates[i], i);
            candidates[i].rejection_reason = Some(why);
        }
    }
    Validation {
        winner: candidates.get(winner).cloned(),
        selection: Some(selection),
        candidates,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ScoringConfig;
    use std::time::Duration;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn candidate(slug: &str, title: &str) -> ResolutionCandidate {
        ResolutionCandidate::new(slug, format!("https://www.linkedin.com/company/{slug}/"), title, "")
    }

    struct FixedProbe(Result<Vec<Option<u64>>, String>);

    #[async_trait]
    impl AudienceProbe for FixedProbe {
        fn name(&self) -> &str {
            "fixed"
        }

        async fn probe_all(&self, _: &[ResolutionCandidate]) -> Result<Vec<Option<u64>>> {
            self.0.clone().map_err(anyhow::Error::msg)
        }
    }

    fn validator(probes: Vec<Arc<dyn AudienceProbe>>) -> CandidateValidator {
        CandidateValidator::new(CandidateScorer::new(ScoringConfig::default()), probes)
    }

    #[tokio::test]
    async fn test_empty_candidates_yield_none() {
        assert!(validator(vec![]).validate_and_score("Acme", vec![]).await.is_none());
        let blank = vec![candidate("  ", "Blank")];
        assert!(validator(vec![]).validate_and_score("Acme", blank).await.is_none());
    }

    #[tokio::test]
    async fn test_single_candidate_accepted_even_when_weak() {
        let v = validator(vec![]);
        let result = v.evaluate("Acme", vec![candidate("globex", "Globex")]).await;
        assert_eq!(result.winner.map(|w| w.slug).as_deref(), Some("globex"));
        assert_eq!(
            result.selection,
            Some(Selection::SingleCandidate { low_confidence: true })
        );
    }

    #[tokio::test]
    async fn test_first_probe_with_signal_wins() {
        let v = validator(vec![
            Arc::new(FixedProbe(Ok(vec![Some(10), Some(5_000)]))),
            Arc::new(FixedProbe(Ok(vec![Some(9_999), Some(1)]))),
        ]);
        let result = v
            .evaluate("Acme", vec![candidate("acme", "Acme"), candidate("acme-labs", "Acme Labs")])
            .await;
        assert_eq!(result.winner.map(|w| w.slug).as_deref(), Some("acme-labs"));
        assert!(result.candidates[0]
            .rejection_reason
            .as_deref()
            .is_some_and(|r| r.contains("smaller audience")));
    }

    #[tokio::test]
    async fn test_failed_tier_falls_through_to_next() {
        let v = validator(vec![
            Arc::new(FixedProbe(Err("no browser".into()))),
            Arc::new(FixedProbe(Ok(vec![Some(1), Some(2)]))),
        ]);
        let result = v
            .evaluate("Acme", vec![candidate("acme", "Acme"), candidate("acme-labs", "Acme Labs")])
            .await;
        assert_eq!(
            result.selection,
            Some(Selection::Audience { probe: "fixed".into() })
        );
        assert_eq!(result.winner.map(|w| w.slug).as_deref(), Some("acme-labs"));
    }

    #[tokio::test]
    async fn test_no_signal_uses_heuristic() {
        let v = validator(vec![
            Arc::new(FixedProbe(Err("no browser".into()))),
            Arc::new(FixedProbe(Ok(vec![None, None]))),
        ]);
        let result = v
            .evaluate(
                "Acme",
                vec![
                    candidate("acme-distribution-partner", "Acme Distribution Partner"),
                    candidate("acme", "Acme Inc"),
                ],
            )
            .await;
        assert_eq!(result.selection, Some(Selection::Heuristic));
        let winner = result.winner.clone().unwrap();
        assert_eq!(winner.slug, "acme");
        assert!(winner.rejection_reason.is_none());
        assert_eq!(
            result.candidates[0].rejection_reason.as_deref(),
            Some("distributor or reseller indicators")
        );
        assert_eq!(result.ranked()[0].slug, "acme");
    }

    #[tokio::test]
    async fn test_http_probe_reads_followers() {
        let server = MockServer::start().await;
        Mock::given(method("HEAD"))
            .and(path("/acme/"))
            .respond_with(ResponseTemplate::new(200))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/acme/"))
            .respond_with(ResponseTemplate::new(200).set_body_string(
                r#"<html><head><meta property="og:description" content="Acme | 4.2K followers on LinkedIn"></head><body></body></html>"#,
            ))
            .mount(&server)
            .await;
        Mock::given(method("HEAD"))
            .and(path("/ghost/"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let probe = HttpProbe::with_base(
            HttpClient::new("profilescope-test", Duration::from_secs(5)),
            &server.uri(),
        );
        let readings = probe
            .probe_all(&[candidate("acme", "Acme"), candidate("ghost", "Ghost")])
            .await
            .unwrap();
        assert_eq!(readings, vec![Some(4_200), None]);
    }
}
