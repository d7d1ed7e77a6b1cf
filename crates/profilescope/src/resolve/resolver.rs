//! Company name to profile slug.

use serde::{Deserialize, Serialize};
use tracing::info;

use super::validate::{CandidateValidator, Validation};
use crate::error::{IntelError, IntelResult};
use crate::names::{known_slug, profile_url, slug_from_url};
use crate::search::CandidateSearchEngine;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResolutionMethod {
    /// Slug passed in by the caller.
    Supplied,
    /// Curated slug table.
    KnownTable,
    /// Search, validation and scoring.
    Search,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Resolution {
    pub slug: String,
    pub profile_url: String,
    pub method: ResolutionMethod,
    /// Present when the slug came from search.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub validation: Option<Validation>,
}

pub struct SlugResolver {
    search: CandidateSearchEngine,
    validator: CandidateValidator,
}

impl SlugResolver {
    pub fn new(search: CandidateSearchEngine, validator: CandidateValidator) -> Self {
        Self { search, validator }
    }

    /// Resolve `company` to a profile.
    ///
    /// A caller-supplied slug wins, then the curated table; only then is
    /// search consulted.
    pub async fn resolve(&self, company: &str, supplied: Option<&str>) -> IntelResult<Resolution> {
        if let Some(slug) = supplied.and_then(|s| self.clean_supplied(s)) {
            info!(company, slug = %slug, "using supplied slug");
            return Ok(self.direct(slug, ResolutionMethod::Supplied));
        }

        if let Some(slug) = known_slug(company) {
            info!(company, slug, "using known slug");
            return Ok(self.direct(slug.to_string(), ResolutionMethod::KnownTable));
        }

        let validation = self.rank(company).await?;
        let Some(winner) = validation.winner.clone() else {
            return Err(IntelError::Resolution {
                company: company.to_string(),
                reason: "no candidate profiles found".to_string(),
            });
        };

        info!(company, slug = %winner.slug, score = winner.relevance_score, "resolved by search");
        Ok(Resolution {
            profile_url: self.url_for(&winner.slug),
            slug: winner.slug,
            method: ResolutionMethod::Search,
            validation: Some(validation),
        })
    }

    /// Search and validate without the slug shortcuts.
    pub async fn rank(&self, company: &str) -> IntelResult<Validation> {
        if company.trim().is_empty() {
            return Err(IntelError::Resolution {
                company: company.to_string(),
                reason: "empty company name".to_string(),
            });
        }
        let candidates = self.search.search(company).await?;
        Ok(self.validator.evaluate(company, candidates).await)
    }

    fn direct(&self, slug: String, method: ResolutionMethod) -> Resolution {
        Resolution {
            profile_url: self.url_for(&slug),
            slug,
            method,
            validation: None,
        }
    }

    fn url_for(&self, slug: &str) -> String {
        let config = self.search.config();
        profile_url(slug, &config.profile_host, &config.profile_path_prefix)
    }

    /// Accept either a bare slug or a full profile URL.
    fn clean_supplied(&self, raw: &str) -> Option<String> {
        let raw = raw.trim();
        if raw.is_empty() {
            return None;
        }
        let config = self.search.config();
        if raw.contains("://") {
            return slug_from_url(raw, &config.profile_host, &config.profile_path_prefix);
        }
        let slug = raw.trim_matches('/').to_lowercase();
        (!slug.is_empty()).then_some(slug)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::config::{ScoringConfig, SearchConfig};
    use crate::resolve::scoring::CandidateScorer;
    use crate::search::testing::{hit, ScriptedSearch};
    use crate::search::SearchApi;

    fn resolver(provider: Arc<ScriptedSearch>) -> SlugResolver {
        SlugResolver::new(
            CandidateSearchEngine::new(vec![provider as Arc<dyn SearchApi>], SearchConfig::default()),
            CandidateValidator::new(CandidateScorer::new(ScoringConfig::default()), Vec::new()),
        )
    }

    #[tokio::test]
    async fn test_known_slug_skips_search() {
        let provider = Arc::new(ScriptedSearch::default());
        let r = resolver(provider.clone());
        let resolution = r.resolve("Tesla", None).await.unwrap();
        assert_eq!(resolution.slug, "tesla-motors");
        assert_eq!(resolution.method, ResolutionMethod::KnownTable);
        assert_eq!(
            resolution.profile_url,
            "https://www.linkedin.com/company/tesla-motors/"
        );
        assert!(provider.calls().is_empty());
    }

    #[tokio::test]
    async fn test_supplied_slug_wins_over_table() {
        let provider = Arc::new(ScriptedSearch::default());
        let r = resolver(provider.clone());
        let resolution = r.resolve("Tesla", Some("tesla-energy")).await.unwrap();
        assert_eq!(resolution.slug, "tesla-energy");
        assert_eq!(resolution.method, ResolutionMethod::Supplied);

        let from_url = r
            .resolve("Anything", Some("https://www.linkedin.com/company/Acme/about/"))
            .await
            .unwrap();
        assert_eq!(from_url.slug, "acme");
        assert!(provider.calls().is_empty());
    }

    #[tokio::test]
    async fn test_empty_search_is_resolution_failure() {
        let r = resolver(Arc::new(ScriptedSearch::default()));
        let err = r.resolve("Obscure Startup", None).await.unwrap_err();
        assert!(matches!(err, IntelError::Resolution { .. }));
    }

    #[tokio::test]
    async fn test_search_path_picks_exact_slug() {
        let provider = Arc::new(ScriptedSearch::answering(
            "Acme",
            vec![
                hit(
                    "https://www.linkedin.com/company/acme-distribution-partner/",
                    "Acme Distribution Partner",
                    "",
                ),
                hit("https://www.linkedin.com/company/acme/", "Acme Inc", ""),
            ],
        ));
        let resolution = resolver(provider).resolve("Acme", None).await.unwrap();
        assert_eq!(resolution.slug, "acme");
        assert_eq!(resolution.method, ResolutionMethod::Search);
        assert_eq!(resolution.validation.map(|v| v.candidates.len()), Some(2));
    }
}
