//! Profile content extraction from a loaded session.
//!
//! Title and description come from ordered selector strategies over the
//! page HTML. Posts are loaded through the live session (posts view,
//! expansion, bounded scrolling) and then read with a primary live selector
//! and static fallbacks. Every text passes [`filter::PostFilter`].

pub mod filter;
pub mod html;
pub mod strategy;

use std::time::Duration;

use scraper::Html;
use tracing::{debug, info, warn};

use crate::config::{ExtractionConfig, IntelConfig};
use crate::error::{IntelError, IntelResult};
use crate::session::pacing::Pacing;
use crate::session::BrowserSession;
use crate::types::{char_len, AcquiredContent};

use filter::{clean_text, PostFilter};
use strategy::{first_match, DESCRIPTION_STRATEGIES, POST_STRATEGIES, PRIMARY_POST_SELECTOR, TITLE_STRATEGIES};

/// Longest body-text excerpt used by the last-resort fallback.
const BODY_EXCERPT_CHARS: usize = 2_000;

const POSTS_LINK_JS: &str = r#"(() => {
    const link = Array.from(document.querySelectorAll('a[href]'))
        .find(a => /\/posts\/?(\?|$)/.test(a.getAttribute('href') || ''));
    return link ? link.href : null;
})()"#;

const EXPAND_JS: &str = r#"(() => {
    let clicked = 0;
    document.querySelectorAll('button, a[role="button"]').forEach(el => {
        const label = (el.innerText || el.getAttribute('aria-label') || '').toLowerCase();
        if (label.includes('see more') || label.includes('show more') || label.includes('…more')) {
            try { el.click(); clicked++; } catch (e) {}
        }
    });
    return clicked;
})()"#;

const SCROLL_HEIGHT_JS: &str = "document.body ? document.body.scrollHeight : 0";
const SCROLL_DOWN_JS: &str = "window.scrollTo(0, document.body ? document.body.scrollHeight : 0); true";

fn primary_posts_js() -> String {
    let selector = serde_json::Value::String(PRIMARY_POST_SELECTOR.to_string());
    format!("Array.from(document.querySelectorAll({selector})).map(e => e.innerText || '')")
}

/// Fields read from a static HTML snapshot.
#[derive(Debug, Default)]
struct StaticFields {
    title: Option<String>,
    description: Option<String>,
}

fn read_static_fields(page: &str) -> StaticFields {
    let document = Html::parse_document(page);
    let title = first_match(&document, TITLE_STRATEGIES).map(|(name, t)| {
        debug!(strategy = name, "title found");
        clean_text(&t)
    });
    let description = first_match(&document, DESCRIPTION_STRATEGIES).map(|(name, d)| {
        debug!(strategy = name, "description found");
        clean_text(&d)
    });
    StaticFields { title, description }
}

fn read_static_posts(page: &str) -> Vec<String> {
    let document = Html::parse_document(page);
    match first_match(&document, POST_STRATEGIES) {
        Some((name, posts)) => {
            debug!(strategy = name, count = posts.len(), "static post fallback hit");
            posts
        }
        None => Vec::new(),
    }
}

fn body_excerpt(page: &str) -> String {
    let document = Html::parse_document(page);
    html::body_text(&document)
        .chars()
        .take(BODY_EXCERPT_CHARS)
        .collect()
}

/// Placeholder description used when nothing usable was extracted.
pub fn synthetic_description(company: &str) -> String {
    format!(
        "{company} maintains a public company profile, but only limited information \
         could be retrieved from it at this time."
    )
}

/// Profile URL of the dedicated posts view for `url`.
pub fn posts_url(url: &str) -> String {
    let base = url.split(['?', '#']).next().unwrap_or(url).trim_end_matches('/');
    let base = base
        .strip_suffix("/about")
        .or_else(|| base.strip_suffix("/posts"))
        .unwrap_or(base);
    format!("{base}/posts/")
}

pub struct ContentExtractor {
    config: ExtractionConfig,
    scroll_attempts: u32,
    scroll_pause: Duration,
    pacing: Pacing,
}

impl ContentExtractor {
    pub fn new(
        config: ExtractionConfig,
        scroll_attempts: u32,
        scroll_pause: Duration,
        pacing: Pacing,
    ) -> Self {
        Self {
            config,
            scroll_attempts,
            scroll_pause,
            pacing,
        }
    }

    pub fn from_config(config: &IntelConfig) -> Self {
        Self::new(
            config.extraction.clone(),
            config.session.scroll_attempts,
            config.session.scroll_pause(),
            Pacing::from_config(&config.session),
        )
    }

    pub fn config(&self) -> &ExtractionConfig {
        &self.config
    }

    /// Extract profile content from the page currently loaded in `session`.
    ///
    /// Never returns empty text: below the absolute floor a synthetic
    /// description is substituted. `raw_text_length` only counts text that
    /// came from the page.
    pub async fn extract(
        &self,
        session: &mut dyn BrowserSession,
        company: &str,
    ) -> IntelResult<AcquiredContent> {
        let profile_html = session
            .get_html()
            .await
            .map_err(|e| IntelError::Fetch(format!("{e:#}")))?;
        let profile_url = session.get_url().await.unwrap_or_default();

        let fields = read_static_fields(&profile_html);
        let extracted_title = fields.title.is_some();
        let mut content = AcquiredContent::new(
            fields.title.unwrap_or_else(|| company.to_string()),
            fields.description.unwrap_or_default(),
        );

        let raw_posts = self.collect_posts(session, &profile_url).await;
        let filter = PostFilter::new(company, &self.config);
        for post in filter.apply(raw_posts, self.config.max_posts) {
            content.push_post(post);
        }

        let mut raw_len = char_len(&content.description)
            + content.posts.iter().map(|p| char_len(p)).sum::<usize>()
            + if extracted_title {
                char_len(&content.profile_title)
            } else {
                0
            };

        // Last resort: generic page body text.
        if raw_len < self.config.min_content_chars {
            let excerpt = body_excerpt(&profile_html);
            if !excerpt.is_empty() && !content.description.contains(&excerpt) {
                let excerpt_len = char_len(&excerpt);
                debug!(company, chars = excerpt_len, "using body text fallback");
                raw_len += excerpt_len;
                if content.description.is_empty() {
                    content.description = excerpt;
                } else {
                    content.description = format!("{}\n\n{excerpt}", content.description);
                }
            }
        }

        if content.description.trim().is_empty() || raw_len < self.config.absolute_floor_chars {
            warn!(company, raw_len, "extracted text below floor, substituting description");
            content.description = synthetic_description(company);
        }
        content.raw_text_length = raw_len;

        info!(
            company,
            posts = content.posts.len(),
            raw_text_length = raw_len,
            "extraction complete"
        );
        Ok(content)
    }

    /// Load and read post texts. Failures here only shrink the post list.
    async fn collect_posts(&self, session: &mut dyn BrowserSession, profile_url: &str) -> Vec<String> {
        // (a) Posts view: link if present, else the URL pattern.
        let target = match session.execute_js(POSTS_LINK_JS).await {
            Ok(serde_json::Value::String(href)) if !href.is_empty() => href,
            _ => posts_url(profile_url),
        };
        self.pacing.pause().await;
        if let Err(e) = session.navigate(&target).await {
            warn!(url = %target, "posts view unavailable: {e:#}");
        }

        // (b) Expand truncated items.
        self.expand(session).await;

        // (c) Bounded scroll-to-load.
        self.scroll(session).await;
        self.expand(session).await;

        // (d) Primary live selector, then static fallbacks.
        let live: Vec<String> = match session.execute_js(&primary_posts_js()).await {
            Ok(serde_json::Value::Array(items)) => items
                .into_iter()
                .filter_map(|v| v.as_str().map(str::to_string))
                .filter(|t| !t.trim().is_empty())
                .collect(),
            Ok(_) => Vec::new(),
            Err(e) => {
                debug!("primary post selector failed: {e:#}");
                Vec::new()
            }
        };
        if !live.is_empty() {
            return live;
        }

        match session.get_html().await {
            Ok(page) => read_static_posts(&page),
            Err(e) => {
                debug!("posts page HTML unavailable: {e:#}");
                Vec::new()
            }
        }
    }

    async fn expand(&self, session: &mut dyn BrowserSession) {
        if let Ok(clicked) = session.execute_js(EXPAND_JS).await {
            if clicked.as_u64().unwrap_or(0) > 0 {
                debug!(clicked = %clicked, "expanded truncated items");
                self.pacing.pause().await;
            }
        }
    }

    async fn scroll(&self, session: &mut dyn BrowserSession) {
        let mut last_height = page_height(session).await;
        for attempt in 0..self.scroll_attempts {
            if session.execute_js(SCROLL_DOWN_JS).await.is_err() {
                break;
            }
            tokio::time::sleep(self.scroll_pause).await;
            let height = page_height(session).await;
            if height <= last_height {
                debug!(attempt, height, "page stopped growing");
                break;
            }
            last_height = height;
        }
    }
}

async fn page_height(session: &mut dyn BrowserSession) -> u64 {
    session
        .execute_js(SCROLL_HEIGHT_JS)
        .await
        .ok()
        .and_then(|v| v.as_u64().or_else(|| v.as_f64().map(|f| f as u64)))
        .unwrap_or(0)
}
