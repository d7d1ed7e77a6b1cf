//! Core data types shared across the resolution and acquisition pipeline.

use serde::{Deserialize, Serialize};

/// A tentative profile discovered by search, not yet confirmed correct.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResolutionCandidate {
    /// Path segment identifying the profile on the target host.
    pub slug: String,
    /// URL the search hit pointed at.
    pub source_url: String,
    /// Title of the search hit.
    pub title: String,
    /// Content snippet of the search hit.
    pub snippet: String,
    /// Follower count, when a validation tier could read one.
    pub audience_size: Option<u64>,
    /// Heuristic relevance computed by the scorer.
    pub relevance_score: f64,
    /// Why the candidate lost, once a winner has been chosen.
    pub rejection_reason: Option<String>,
}

impl ResolutionCandidate {
    pub fn new(
        slug: impl Into<String>,
        source_url: impl Into<String>,
        title: impl Into<String>,
        snippet: impl Into<String>,
    ) -> Self {
        Self {
            slug: slug.into(),
            source_url: source_url.into(),
            title: title.into(),
            snippet: snippet.into(),
            audience_size: None,
            relevance_score: 0.0,
            rejection_reason: None,
        }
    }
}

/// Text acquired from a company profile.
///
/// Posts are kept unique (case-sensitive) in first-seen order; use
/// [`AcquiredContent::push_post`] rather than touching the vector directly.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AcquiredContent {
    pub profile_title: String,
    pub description: String,
    pub posts: Vec<String>,
    /// Length of the text actually extracted from the source, excluding
    /// any synthetic filler.
    pub raw_text_length: usize,
}

impl AcquiredContent {
    pub fn new(profile_title: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            profile_title: profile_title.into(),
            description: description.into(),
            ..Default::default()
        }
    }

    /// Append a post unless an identical one is already present.
    /// Returns whether the post was added.
    pub fn push_post(&mut self, post: impl Into<String>) -> bool {
        let post = post.into();
        if self.posts.contains(&post) {
            return false;
        }
        self.posts.push(post);
        true
    }

    /// Combined length of title, description and posts, in chars.
    pub fn text_len(&self) -> usize {
        char_len(&self.profile_title)
            + char_len(&self.description)
            + self.posts.iter().map(|p| char_len(p)).sum::<usize>()
    }

    pub fn is_empty(&self) -> bool {
        self.text_len() == 0
    }
}

/// Length in chars, the unit every content threshold is expressed in.
pub(crate) fn char_len(text: &str) -> usize {
    text.chars().count()
}

/// Which fallback tier produced the content of a result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SourceTier {
    /// Resolved, fetched and extracted through an automated browser session.
    Primary,
    /// Content returned by the external crawl API.
    FallbackCrawl,
    /// Synthesized placeholder stating limited data availability.
    Minimal,
}

impl std::fmt::Display for SourceTier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Primary => write!(f, "PRIMARY"),
            Self::FallbackCrawl => write!(f, "FALLBACK_CRAWL"),
            Self::Minimal => write!(f, "MINIMAL"),
        }
    }
}

/// Terminal output of one orchestration run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AcquisitionResult {
    pub company_name: String,
    pub content: AcquiredContent,
    pub source_tier: SourceTier,
    pub duration_ms: u64,
    /// Escalation causes, in the order they occurred.
    pub errors: Vec<String>,
    /// Slug the resolver settled on, if resolution got that far.
    pub resolved_slug: Option<String>,
    /// Profile URL content was acquired from, if any.
    pub profile_url: Option<String>,
}
