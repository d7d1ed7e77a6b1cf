//! Secondary acquisition through an external crawl API.

pub mod tavily;

use std::sync::{Arc, OnceLock};

use anyhow::Result;
use async_trait::async_trait;
use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::config::{ExtractionConfig, SearchConfig};
use crate::error::{IntelError, IntelResult};
use crate::extract::filter::{clean_text, PostFilter};
use crate::names::{known_slug, normalize_name, profile_url, slug_key, strip_corporate_suffix};
use crate::types::{char_len, AcquiredContent};

/// Longer paragraphs are content, not headings.
const MAX_TITLE_WORDS: usize = 8;

/// Raw page content returned by a crawl.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CrawlBlock {
    pub url: String,
    pub raw_content: String,
}

#[async_trait]
pub trait CrawlApi: Send + Sync {
    fn name(&self) -> &str;

    /// Crawl from `url`, guided by natural-language `instructions`.
    async fn crawl(&self, url: &str, instructions: &str) -> Result<Vec<CrawlBlock>>;
}

fn markdown_link_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"!?\[([^\]]*)\]\([^)]*\)").expect("valid regex"))
}

/// Split crawl output into cleaned paragraphs, dropping markdown markup.
pub fn paragraphs(raw: &str) -> Vec<String> {
    raw.lines()
        .map(|line| {
            let line = markdown_link_re().replace_all(line, "$1");
            let line = line.trim_start_matches(|c: char| "#*->|".contains(c) || c.is_whitespace());
            clean_text(line.trim_end_matches(['*', '|']))
        })
        .filter(|p| !p.is_empty())
        .collect()
}

/// Instructions handed to the crawl API for `company`.
pub fn crawl_instructions(company: &str) -> String {
    format!(
        "Find the official company profile for \"{company}\". Extract the company name, \
         the about or overview description, and the text of recent posts or updates. \
         Ignore job listings, employee profiles and sign-in prompts."
    )
}

/// The FALLBACK_CRAWL tier.
pub struct CrawlFallback {
    api: Arc<dyn CrawlApi>,
    extraction: ExtractionConfig,
    search: SearchConfig,
}

impl CrawlFallback {
    pub fn new(api: Arc<dyn CrawlApi>, extraction: ExtractionConfig, search: SearchConfig) -> Self {
        Self {
            api,
            extraction,
            search,
        }
    }

    /// Starting URL: the resolved profile when known, else a best guess.
    pub fn start_url(&self, company: &str, resolved: Option<&str>) -> String {
        if let Some(url) = resolved {
            return url.to_string();
        }
        let slug = known_slug(company)
            .map(str::to_string)
            .unwrap_or_else(|| slug_key(company));
        profile_url(&slug, &self.search.profile_host, &self.search.profile_path_prefix)
    }

    /// Crawl and clean profile content for `company`.
    pub async fn acquire(&self, company: &str, resolved_url: Option<&str>) -> IntelResult<AcquiredContent> {
        let url = self.start_url(company, resolved_url);
        let blocks = self
            .api
            .crawl(&url, &crawl_instructions(company))
            .await
            .map_err(|e| IntelError::external(format!("{} crawl", self.api.name()), format!("{e:#}")))?;

        let content = self.build_content(company, &blocks);
        if content.description.is_empty()
            || content.raw_text_length < self.extraction.absolute_floor_chars
        {
            return Err(IntelError::InsufficientContent {
                chars: content.raw_text_length,
                required: self.extraction.absolute_floor_chars,
            });
        }
        info!(
            company,
            blocks = blocks.len(),
            posts = content.posts.len(),
            raw_text_length = content.raw_text_length,
            "crawl content accepted"
        );
        Ok(content)
    }

    /// Relevance-filter the blocks and shape them like extracted content.
    pub fn build_content(&self, company: &str, blocks: &[CrawlBlock]) -> AcquiredContent {
        let name = normalize_name(company);
        let stripped = strip_corporate_suffix(&name);
        let mentions = |text: &str| {
            let text = normalize_name(text);
            !stripped.is_empty() && (text.contains(&name) || text.contains(&stripped))
        };
        let host = self.search.profile_host.to_ascii_lowercase();

        let relevant: Vec<&CrawlBlock> = blocks
            .iter()
            .filter(|b| b.url.to_ascii_lowercase().contains(&host) || mentions(b.raw_content.as_str()))
            .collect();
        debug!(company, total = blocks.len(), relevant = relevant.len(), "crawl blocks filtered");

        let texts: Vec<String> = relevant.iter().flat_map(|b| paragraphs(&b.raw_content)).collect();

        let title = texts
            .iter()
            .find(|t| t.split_whitespace().count() <= MAX_TITLE_WORDS && mentions(t.as_str()))
            .cloned();

        let filter = PostFilter::new(company, &self.extraction);
        let mut accepted = filter.apply(
            texts.iter().filter(|t| Some(*t) != title.as_ref()).cloned(),
            self.extraction.max_posts + 1,
        );

        // The first accepted paragraph mentioning the company describes it.
        let description = match accepted.iter().position(|t| mentions(t.as_str())) {
            Some(i) => accepted.remove(i),
            None if !accepted.is_empty() => accepted.remove(0),
            None => String::new(),
        };
        accepted.truncate(self.extraction.max_posts);

        let raw_len = char_len(&description)
            + accepted.iter().map(|p| char_len(p)).sum::<usize>()
            + title.as_deref().map_or(0, char_len);

        let mut content = AcquiredContent::new(
            title.unwrap_or_else(|| company.to_string()),
            description,
        );
        for post in accepted {
            content.push_post(post);
        }
        content.raw_text_length = raw_len;
        content
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use std::sync::Mutex;

    use super::*;

    /// Crawl API returning fixed blocks or a fixed failure.
    pub struct ScriptedCrawl {
        pub result: Result<Vec<CrawlBlock>, String>,
        pub calls: Mutex<Vec<(String, String)>>,
    }

    impl ScriptedCrawl {
        pub fn returning(blocks: Vec<CrawlBlock>) -> Self {
            Self {
                result: Ok(blocks),
                calls: Mutex::new(Vec::new()),
            }
        }

        pub fn failing(message: &str) -> Self {
            Self {
                result: Err(message.to_string()),
                calls: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl CrawlApi for ScriptedCrawl {
        fn name(&self) -> &str {
            "scripted"
        }

        async fn crawl(&self, url: &str, instructions: &str) -> Result<Vec<CrawlBlock>> {
            if let Ok(mut calls) = self.calls.lock() {
                calls.push((url.to_string(), instructions.to_string()));
            }
            self.result.clone().map_err(anyhow::Error::msg)
        }
    }
}
