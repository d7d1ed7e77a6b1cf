//! Candidate discovery through external search services.

pub mod query;
pub mod serper;
pub mod tavily;

use std::collections::HashSet;
use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::config::SearchConfig;
use crate::error::{IntelError, IntelResult};
use crate::names::{profile_url, slug_from_url};
use crate::types::ResolutionCandidate;

pub use query::{build_queries, QueryKind, SearchQuery};
pub use serper::SerperClient;
pub use tavily::TavilyClient;

/// One raw hit returned by a search service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchHit {
    pub url: String,
    pub title: String,
    pub content: String,
}

/// An external web search service.
#[async_trait]
pub trait SearchApi: Send + Sync {
    /// Short provider name for logs and error messages.
    fn name(&self) -> &str;

    /// Run `query`, optionally restricted to `domain_filter`
    /// (`host` or `host/path`).
    async fn search(
        &self,
        query: &str,
        max_results: usize,
        domain_filter: Option<&str>,
    ) -> Result<Vec<SearchHit>>;
}

/// Turns a company name into deduplicated profile candidates.
pub struct CandidateSearchEngine {
    providers: Vec<Arc<dyn SearchApi>>,
    config: SearchConfig,
}

impl CandidateSearchEngine {
    pub fn new(providers: Vec<Arc<dyn SearchApi>>, config: SearchConfig) -> Self {
        Self { providers, config }
    }

    pub fn config(&self) -> &SearchConfig {
        &self.config
    }

    /// Search for profile candidates for `company`.
    ///
    /// Queries run in priority order and every provider is asked each
    /// query in turn. Stops early once `min_candidates` unique candidates
    /// are known. Only fails when there are no providers or every provider
    /// call failed; an empty result is not an error here.
    pub async fn search(&self, company: &str) -> IntelResult<Vec<ResolutionCandidate>> {
        if self.providers.is_empty() {
            return Err(IntelError::external("search", "no search provider configured"));
        }

        let queries = build_queries(company, &self.config);
        let mut seen: HashSet<String> = HashSet::new();
        let mut candidates: Vec<ResolutionCandidate> = Vec::new();
        let mut attempts = 0usize;
        let mut failures: Vec<String> = Vec::new();

        'queries: for query in &queries {
            for provider in &self.providers {
                attempts += 1;
                let hits = match provider
                    .search(
                        &query.text,
                        self.config.results_per_query,
                        query.domain_filter.as_deref(),
                    )
                    .await
                {
                    Ok(hits) => hits,
                    Err(e) => {
                        warn!(provider = provider.name(), query = %query.text, "search failed: {e:#}");
                        failures.push(format!("{}: {e:#}", provider.name()));
                        continue;
                    }
                };

                let added = self.collect(hits, &mut seen, &mut candidates);
                debug!(
                    provider = provider.name(),
                    kind = ?query.kind,
                    query = %query.text,
                    added,
                    "search query complete"
                );

                if candidates.len() >= self.config.min_candidates {
                    break 'queries;
                }
            }
        }

        if candidates.is_empty() && attempts > 0 && failures.len() == attempts {
            return Err(IntelError::external(
                "search",
                failures.last().cloned().unwrap_or_default(),
            ));
        }

        info!(company, count = candidates.len(), attempts, "candidate search complete");
        Ok(candidates)
    }

    /// Keep hits on the profile path, deduplicated by canonical URL.
    fn collect(
        &self,
        hits: Vec<SearchHit>,
        seen: &mut HashSet<String>,
        candidates: &mut Vec<ResolutionCandidate>,
    ) -> usize {
        let host = &self.config.profile_host;
        let prefix = &self.config.profile_path_prefix;
        let mut added = 0;
        for hit in hits {
            let Some(slug) = slug_from_url(&hit.url, host, prefix) else {
                continue;
            };
            if !seen.insert(profile_url(&slug, host, prefix)) {
                continue;
            }
            candidates.push(ResolutionCandidate::new(slug, hit.url, hit.title, hit.content));
            added += 1;
        }
        added
    }
}


#[cfg(test)]
mod tests {
    use super::testing::{hit, ScriptedSearch};
    use super::*;

    fn engine(providers: Vec<Arc<dyn SearchApi>>, min_candidates: usize) -> CandidateSearchEngine {
        CandidateSearchEngine::new(
            providers,
            SearchConfig {
                min_candidates,
                ..SearchConfig::default()
            },
        )
    }

    #[tokio::test]
    async fn test_keeps_only_profile_urls_and_dedupes() {
        let provider = Arc::new(ScriptedSearch::answering(
            "Acme",
            vec![
                hit("https://www.linkedin.com/company/acme/", "Acme", "a"),
                hit("https://uk.linkedin.com/company/acme/about", "Acme UK", "b"),
                hit("https://www.linkedin.com/in/someone", "Person", "c"),
                hit("https://acme.com", "Acme site", "d"),
                hit("https://www.linkedin.com/company/acme-labs", "Acme Labs", "e"),
            ],
        ));
        let engine = engine(vec![provider as Arc<dyn SearchApi>], 10);
        let candidates = engine.search("Acme").await.unwrap();
        let slugs: Vec<_> = candidates.iter().map(|c| c.slug.as_str()).collect();
        assert_eq!(slugs, vec!["acme", "acme-labs"]);
        assert_eq!(candidates[0].title, "Acme");
    }

    #[tokio::test]
    async fn test_stops_once_enough_candidates() {
        let provider = Arc::new(ScriptedSearch::answering(
            "Acme",
            vec![
                hit("https://www.linkedin.com/company/acme/", "Acme", ""),
                hit("https://www.linkedin.com/company/acme-inc/", "Acme Inc", ""),
            ],
        ));
        let engine = engine(vec![provider.clone() as Arc<dyn SearchApi>], 2);
        engine.search("Acme").await.unwrap();
        assert_eq!(provider.calls(), vec!["Acme"]);
    }

    #[tokio::test]
    async fn test_runs_every_query_when_results_are_sparse() {
        let provider = Arc::new(ScriptedSearch::default());
        let engine = engine(vec![provider.clone() as Arc<dyn SearchApi>], 3);
        let candidates = engine.search("Acme Corp").await.unwrap();
        assert!(candidates.is_empty());
        let expected = build_queries("Acme Corp", engine.config()).len();
        assert_eq!(provider.calls().len(), expected);
    }

    #[tokio::test]
    async fn test_failing_provider_is_skipped() {
        let broken = Arc::new(ScriptedSearch {
            fail: true,
            ..Default::default()
        });
        let working = Arc::new(ScriptedSearch::answering(
            "Acme",
            vec![hit("https://www.linkedin.com/company/acme/", "Acme", "")],
        ));
        let engine = engine(vec![broken as Arc<dyn SearchApi>, working], 1);
        let candidates = engine.search("Acme").await.unwrap();
        assert_eq!(candidates.len(), 1);
    }

    #[tokio::test]
    async fn test_all_providers_failing_is_external_error() {
        let broken = Arc::new(ScriptedSearch {
            fail: true,
            ..Default::default()
        });
        let engine = engine(vec![broken as Arc<dyn SearchApi>], 1);
        let err = engine.search("Acme").await.unwrap_err();
        assert!(matches!(err, IntelError::ExternalService { .. }));
    }

    #[tokio::test]
    async fn test_no_providers_is_external_error() {
        let engine = engine(Vec::new(), 1);
        assert!(matches!(
            engine.search("Acme").await,
            Err(IntelError::ExternalService { .. })
        ));
    }
}
