//! Configuration loading and resolution.
//!
//! Every tunable threshold used by the pipeline lives here. The defaults are
//! empirically chosen and uncalibrated; treat them as starting points.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{IntelError, IntelResult};
use crate::session::stealth::{default_masking_directives, Identity, MaskingDirective};

/// Minimum spacing between acquisitions against the profile host.
pub const DEFAULT_MIN_INTERVAL_SECS: u64 = 5 * 60;
/// Maximum acquisitions inside one rate-limit window.
pub const DEFAULT_MAX_PER_WINDOW: u32 = 10;
/// Rate-limit window length.
pub const DEFAULT_WINDOW_SECS: u64 = 60 * 60;

/// Search stops issuing query variants once this many candidates exist.
pub const DEFAULT_MIN_CANDIDATES: usize = 3;
/// Upper bound on generated name variants.
pub const DEFAULT_MAX_VARIANTS: usize = 4;
pub const DEFAULT_RESULTS_PER_QUERY: usize = 10;

pub const DEFAULT_SINGLE_CANDIDATE_THRESHOLD: f64 = 30.0;
pub const DEFAULT_NAME_CONTAINMENT_WEIGHT: f64 = 50.0;
pub const DEFAULT_EXACT_SLUG_WEIGHT: f64 = 100.0;
pub const DEFAULT_TITLE_WEIGHT: f64 = 30.0;
pub const DEFAULT_CONTENT_WEIGHT: f64 = 20.0;
pub const DEFAULT_DISTRIBUTOR_PENALTY: f64 = -25.0;

pub const DEFAULT_MIN_POST_CHARS: usize = 30;
pub const DEFAULT_MIN_POST_WORDS: usize = 5;
/// Below this many extracted chars the body-text fallback runs.
pub const DEFAULT_MIN_CONTENT_CHARS: usize = 200;
/// Below this many extracted chars content counts as insufficient.
pub const DEFAULT_ABSOLUTE_FLOOR_CHARS: usize = 50;
pub const DEFAULT_MAX_POSTS: usize = 20;
pub const DEFAULT_SCROLL_ATTEMPTS: u32 = 5;

/// Top-level configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct IntelConfig {
    pub rate_limit: RateLimitConfig,
    pub search: SearchConfig,
    pub scoring: ScoringConfig,
    pub session: SessionConfig,
    pub extraction: ExtractionConfig,
    pub api: ApiConfig,
    pub paths: PathsConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RateLimitConfig {
    pub min_interval_secs: u64,
    pub max_per_window: u32,
    pub window_secs: u64,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            min_interval_secs: DEFAULT_MIN_INTERVAL_SECS,
            max_per_window: DEFAULT_MAX_PER_WINDOW,
            window_secs: DEFAULT_WINDOW_SECS,
        }
    }
}

impl RateLimitConfig {
    pub fn min_interval(&self) -> Duration {
        Duration::from_secs(self.min_interval_secs)
    }

    pub fn window(&self) -> Duration {
        Duration::from_secs(self.window_secs)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchConfig {
    pub min_candidates: usize,
    pub max_variants: usize,
    pub results_per_query: usize,
    /// Host serving company profiles, without scheme or `www.`.
    pub profile_host: String,
    /// Path prefix preceding the slug, with leading and trailing slash.
    pub profile_path_prefix: String,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            min_candidates: DEFAULT_MIN_CANDIDATES,
            max_variants: DEFAULT_MAX_VARIANTS,
            results_per_query: DEFAULT_RESULTS_PER_QUERY,
            profile_host: "linkedin.com".to_string(),
            profile_path_prefix: "/company/".to_string(),
        }
    }
}

impl SearchConfig {
    /// Domain filter handed to search providers, e.g. `linkedin.com/company`.
    pub fn domain_filter(&self) -> String {
        format!(
            "{}{}",
            self.profile_host,
            self.profile_path_prefix.trim_end_matches('/')
        )
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoringConfig {
    /// A lone candidate scoring below this is still accepted, with a warning.
    pub single_candidate_threshold: f64,
    pub name_containment: f64,
    pub exact_slug: f64,
    pub title_containment: f64,
    pub content_containment: f64,
    pub distributor_penalty: f64,
    pub distributor_keywords: Vec<String>,
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            single_candidate_threshold: DEFAULT_SINGLE_CANDIDATE_THRESHOLD,
            name_containment: DEFAULT_NAME_CONTAINMENT_WEIGHT,
            exact_slug: DEFAULT_EXACT_SLUG_WEIGHT,
            title_containment: DEFAULT_TITLE_WEIGHT,
            content_containment: DEFAULT_CONTENT_WEIGHT,
            distributor_penalty: DEFAULT_DISTRIBUTOR_PENALTY,
            distributor_keywords: [
                "distributor",
                "distribution",
                "distributors",
                "reseller",
                "resellers",
                "dealer",
                "dealers",
                "dealership",
                "partner",
                "partners",
                "wholesale",
                "supplier",
                "authorized",
                "authorised",
                "retailer",
                "franchise",
            ]
            .iter()
            .map(|s| s.to_string())
            .collect(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    pub page_load_timeout_ms: u64,
    /// How long to poll for an expected element before giving up.
    pub implicit_wait_ms: u64,
    pub scroll_attempts: u32,
    pub scroll_pause_ms: u64,
    /// Random pause range between browser actions, in milliseconds.
    pub pacing_min_ms: u64,
    pub pacing_max_ms: u64,
    /// Explicit browser binary; discovered automatically when unset.
    pub chrome_path: Option<PathBuf>,
    pub masking: Vec<MaskingDirective>,
    pub identities: Vec<Identity>,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            page_load_timeout_ms: 30_000,
            implicit_wait_ms: 10_000,
            scroll_attempts: DEFAULT_SCROLL_ATTEMPTS,
            scroll_pause_ms: 1_500,
            pacing_min_ms: 800,
            pacing_max_ms: 2_500,
            chrome_path: None,
            masking: default_masking_directives(),
            identities: Identity::default_pool(),
        }
    }
}

impl SessionConfig {
    pub fn page_load_timeout(&self) -> Duration {
        Duration::from_millis(self.page_load_timeout_ms)
    }

    pub fn implicit_wait(&self) -> Duration {
        Duration::from_millis(self.implicit_wait_ms)
    }

    pub fn scroll_pause(&self) -> Duration {
        Duration::from_millis(self.scroll_pause_ms)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtractionConfig {
    pub min_post_chars: usize,
    pub min_post_words: usize,
    pub min_content_chars: usize,
    pub absolute_floor_chars: usize,
    pub max_posts: usize,
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self {
            min_post_chars: DEFAULT_MIN_POST_CHARS,
            min_post_words: DEFAULT_MIN_POST_WORDS,
            min_content_chars: DEFAULT_MIN_CONTENT_CHARS,
            absolute_floor_chars: DEFAULT_ABSOLUTE_FLOOR_CHARS,
            max_posts: DEFAULT_MAX_POSTS,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    pub tavily_api_key: Option<String>,
    pub tavily_base_url: String,
    pub serper_api_key: Option<String>,
    pub serper_base_url: String,
    pub request_timeout_ms: u64,
    /// Page limit handed to the crawl API.
    pub crawl_limit: u32,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            tavily_api_key: None,
            tavily_base_url: "https://api.tavily.com".to_string(),
            serper_api_key: None,
            serper_base_url: "https://google.serper.dev".to_string(),
            request_timeout_ms: 30_000,
            crawl_limit: 5,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PathsConfig {
    /// Append-only acquisition log. Disabled when unset.
    pub audit_log: Option<PathBuf>,
    /// Persisted rate-limit snapshot used by the CLI.
    pub rate_limit_state: Option<PathBuf>,
}

impl IntelConfig {
    /// Resolve configuration: defaults, then a JSON file, then environment.
    ///
    /// The file is `explicit` if given, else `PROFILESCOPE_CONFIG`, else
    /// `~/.profilescope/config.json` when it exists.
    pub fn load(explicit: Option<&Path>) -> IntelResult<Self> {
        let path = explicit
            .map(Path::to_path_buf)
            .or_else(|| std::env::var("PROFILESCOPE_CONFIG").ok().map(PathBuf::from))
            .or_else(|| {
                let default = default_dir().join("config.json");
                default.exists().then_some(default)
            });

        let mut config = match path {
            Some(path) => Self::from_file(&path)?,
            None => Self::default(),
        };
        config.apply_env();
        config.fill_default_paths();
        Ok(config)
    }

    /// Parse a JSON config file.
    pub fn from_file(path: &Path) -> IntelResult<Self> {
        let raw = std::fs::read_to_string(path).map_err(|e| {
            IntelError::Config(format!("failed to read {}: {e}", path.display()))
        })?;
        serde_json::from_str(&raw)
            .map_err(|e| IntelError::Config(format!("invalid config {}: {e}", path.display())))
    }

    /// Overlay environment variables on top of file values.
    pub fn apply_env(&mut self) {
        if let Ok(key) = std::env::var("TAVILY_API_KEY") {
            if !key.is_empty() {
                self.api.tavily_api_key = Some(key);
            }
        }
        if let Ok(key) = std::env::var("SERPER_API_KEY") {
            if !key.is_empty() {
                self.api.serper_api_key = Some(key);
            }
        }
        let chrome = std::env::var("PROFILESCOPE_CHROME_PATH")
            .or_else(|_| std::env::var("CHROME_BIN"))
            .ok()
            .filter(|p| !p.is_empty());
        if let Some(path) = chrome {
            self.session.chrome_path = Some(PathBuf::from(path));
        }
    }

    fn fill_default_paths(&mut self) {
        if self.paths.audit_log.is_none() {
            self.paths.audit_log = Some(default_dir().join("audit.jsonl"));
        }
        if self.paths.rate_limit_state.is_none() {
            self.paths.rate_limit_state = Some(default_dir().join("ratelimit.json"));
        }
    }
}

/// `~/.profilescope`, or `./.profilescope` when no home directory exists.
pub fn default_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".profilescope")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_documented_thresholds() {
        let cfg = IntelConfig::default();
        assert_eq!(cfg.rate_limit.min_interval(), Duration::from_secs(300));
        assert_eq!(cfg.rate_limit.max_per_window, 10);
        assert_eq!(cfg.scoring.exact_slug, 100.0);
        assert_eq!(cfg.scoring.distributor_penalty, -25.0);
        assert_eq!(cfg.extraction.absolute_floor_chars, 50);
        assert_eq!(cfg.search.domain_filter(), "linkedin.com/company");
    }

    #[test]
    fn test_partial_file_keeps_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(
            &path,
            r#"{"rate_limit": {"max_per_window": 3}, "paths": {"audit_log": "/tmp/a.jsonl"}}"#,
        )
        .unwrap();

        let cfg = IntelConfig::from_file(&path).unwrap();
        assert_eq!(cfg.rate_limit.max_per_window, 3);
        assert_eq!(cfg.rate_limit.min_interval_secs, DEFAULT_MIN_INTERVAL_SECS);
        assert_eq!(cfg.search.min_candidates, DEFAULT_MIN_CANDIDATES);
        assert!(!cfg.session.masking.is_empty());
        assert_eq!(cfg.paths.audit_log, Some(PathBuf::from("/tmp/a.jsonl")));
    }

    #[test]
    fn test_invalid_file_is_config_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, "{ not json").unwrap();
        let err = IntelConfig::from_file(&path).unwrap_err();
        assert!(matches!(err, IntelError::Config(_)));
    }

    #[test]
    fn test_explicit_path_wins() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("custom.json");
        std::fs::write(&path, r#"{"search": {"min_candidates": 7}}"#).unwrap();
        let cfg = IntelConfig::load(Some(&path)).unwrap();
        assert_eq!(cfg.search.min_candidates, 7);
        assert!(cfg.paths.rate_limit_state.is_some());
    }
}
