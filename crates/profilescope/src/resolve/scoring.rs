//! Heuristic relevance scoring and winner selection.

use crate::config::ScoringConfig;
use crate::names::{compact_key, is_suffixed_slug, normalize_name, slug_key, strip_corporate_suffix};
use crate::types::ResolutionCandidate;

/// Normalized forms of a company name, computed once per scoring pass.
struct NameForms {
    normalized: String,
    stripped: String,
    key: String,
    stripped_key: String,
    compact: String,
    stripped_compact: String,
}

impl NameForms {
    fn new(company: &str) -> Self {
        let normalized = normalize_name(company);
        let stripped = strip_corporate_suffix(&normalized);
        Self {
            key: slug_key(company),
            stripped_key: stripped.replace(' ', "-"),
            compact: compact_key(company),
            stripped_compact: stripped.replace(' ', ""),
            normalized,
            stripped,
        }
    }

    fn contained_in(&self, text: &str) -> bool {
        let text = normalize_name(text);
        !self.stripped.is_empty() && (text.contains(&self.normalized) || text.contains(&self.stripped))
    }
}

/// Whether `slug` is exactly the company name in slug form.
///
/// Hyphenated, compact and suffix-stripped spellings all count.
pub fn is_exact_slug(company: &str, slug: &str) -> bool {
    let forms = NameForms::new(company);
    exact(&forms, slug)
}

fn exact(forms: &NameForms, slug: &str) -> bool {
    if slug.is_empty() || forms.key.is_empty() {
        return false;
    }
    let compact = slug.replace('-', "");
    slug == forms.key
        || slug == forms.stripped_key
        || compact == forms.compact
        || compact == forms.stripped_compact
}

pub struct CandidateScorer {
    config: ScoringConfig,
}

impl CandidateScorer {
    pub fn new(config: ScoringConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ScoringConfig {
        &self.config
    }

    /// Relevance of one candidate to `company`.
    pub fn score(&self, company: &str, candidate: &ResolutionCandidate) -> f64 {
        let forms = NameForms::new(company);
        self.score_with(&forms, company, candidate)
    }

    fn score_with(&self, forms: &NameForms, company: &str, candidate: &ResolutionCandidate) -> f64 {
        let slug = candidate.slug.as_str();
        if slug.is_empty() || forms.compact.is_empty() {
            return 0.0;
        }
        let c = &self.config;
        let mut score = 0.0;

        // Name containment, either direction, ignoring separators.
        let slug_compact = slug.replace('-', "");
        let name = forms.stripped_compact.as_str();
        if !slug_compact.is_empty()
            && !name.is_empty()
            && (slug_compact.contains(name) || name.contains(slug_compact.as_str()))
        {
            score += c.name_containment;
        }

        if exact(forms, slug) {
            score += c.exact_slug;
        }

        if forms.contained_in(&candidate.title) {
            score += c.title_containment;
        }

        if forms.contained_in(&candidate.snippet) {
            score += c.content_containment;
        }

        if self.is_distributor(company, candidate) {
            score += c.distributor_penalty;
        }

        score
    }

    /// Compute `relevance_score` for every candidate in place.
    pub fn score_all(&self, company: &str, candidates: &mut [ResolutionCandidate]) {
        let forms = NameForms::new(company);
        for candidate in candidates.iter_mut() {
            candidate.relevance_score = self.score_with(&forms, company, candidate);
        }
    }

    /// Whether the slug or title carries a distributor/reseller keyword
    /// that the company name itself does not.
    pub fn is_distributor(&self, company: &str, candidate: &ResolutionCandidate) -> bool {
        let company_words = normalize_name(company);
        let company_words: Vec<&str> = company_words.split_whitespace().collect();
        let text = format!(
            "{} {}",
            normalize_name(&candidate.slug),
            normalize_name(&candidate.title)
        );
        text.split_whitespace().any(|word| {
            self.config
                .distributor_keywords
                .iter()
                .any(|k| k == word && !company_words.contains(&word))
        })
    }

    /// Pure heuristic choice. Candidates must already be scored.
    ///
    /// Exact or suffixed slug matches first, then the best non-distributor,
    /// then the best overall. Ties go to the earlier candidate.
    pub fn pick_heuristic(&self, company: &str, candidates: &[ResolutionCandidate]) -> Option<usize> {
        let forms = NameForms::new(company);

        let exact_matches = best_by_score(candidates, |c| {
            exact(&forms, &c.slug) || is_suffixed_slug(&c.slug, company)
        });
        if exact_matches.is_some() {
            return exact_matches;
        }

        best_by_score(candidates, |c| !self.is_distributor(company, c))
            .or_else(|| best_by_score(candidates, |_| true))
    }

    /// Choice by audience size. Candidates must already be scored.
    ///
    /// Largest audience wins, ties broken by relevance. Distributor
    /// candidates only compete when no other candidate has a reading.
    pub fn pick_by_audience(&self, company: &str, candidates: &[ResolutionCandidate]) -> Option<usize> {
        best_by_audience(candidates, |c| !self.is_distributor(company, c))
            .or_else(|| best_by_audience(candidates, |_| true))
    }
}

fn best_by_score<F>(candidates: &[ResolutionCandidate], eligible: F) -> Option<usize>
where
    F: Fn(&ResolutionCandidate) -> bool,
{
    let mut best: Option<usize> = None;
    for (i, c) in candidates.iter().enumerate() {
        if c.slug.is_empty() || !eligible(c) {
            continue;
        }
        match best {
            Some(b) if candidates[b].relevance_score >= c.relevance_score => {}
            _ => best = Some(i),
        }
    }
    best
}

fn best_by_audience<F>(candidates: &[ResolutionCandidate], eligible: F) -> Option<usize>
where
    F: Fn(&ResolutionCandidate) -> bool,
{
    let mut best: Option<(usize, u64)> = None;
    for (i, c) in candidates.iter().enumerate() {
        let Some(audience) = c.audience_size else {
            continue;
        };
        if c.slug.is_empty() || !eligible(c) {
            continue;
        }
        let better = match best {
            None => true,
            Some((b, best_audience)) => {
                audience > best_audience
                    || (audience == best_audience
                        && c.relevance_score > candidates[b].relevance_score)
            }
        };
        if better {
            best = Some((i, audience));
        }
    }
    best.map(|(i, _)| i)
}
