//! Error taxonomy for profile resolution and acquisition.

use std::time::Duration;

/// All errors that can surface from the resolver pipeline.
#[derive(thiserror::Error, Debug)]
pub enum IntelError {
    /// No usable candidate was found for the company name.
    #[error("Resolution failed for '{company}': {reason}")]
    Resolution { company: String, reason: String },

    /// The automation environment could not produce a browser session.
    #[error("Session creation failed: {0}")]
    SessionCreation(String),

    /// A page could not be loaded in an open session.
    #[error("Fetch failed: {0}")]
    Fetch(String),

    /// Extraction produced less text than the configured floor.
    #[error("Insufficient content: {chars} chars extracted, {required} required")]
    InsufficientContent { chars: usize, required: usize },

    /// The hourly acquisition cap was reached. Not retryable within this call.
    #[error("Rate limit exceeded: {count} requests in the current window, retry in {}s", retry_after.as_secs())]
    RateLimitExceeded { count: u32, retry_after: Duration },

    /// A search or crawl API returned an error or timed out.
    #[error("{service} error: {message}")]
    ExternalService { service: String, message: String },

    #[error("Config error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl IntelError {
    pub fn external(service: impl Into<String>, message: impl std::fmt::Display) -> Self {
        IntelError::ExternalService {
            service: service.into(),
            message: message.to_string(),
        }
    }

    /// Whether a failure inside a tier should escalate to the next tier.
    ///
    /// Rate limiting is a policy decision, not a data-availability problem,
    /// so it is the only failure that bypasses the fallback chain.
    pub fn is_escalatable(&self) -> bool {
        !matches!(self, IntelError::RateLimitExceeded { .. })
    }
}

/// Convenience result type.
pub type IntelResult<T> = Result<T, IntelError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rate_limit_is_not_escalatable() {
        let err = IntelError::RateLimitExceeded {
            count: 10,
            retry_after: Duration::from_secs(120),
        };
        assert!(!err.is_escalatable());
        assert!(err.to_string().contains("retry in 120s"));
    }

    #[test]
    fn test_other_failures_escalate() {
        let errs = [
            IntelError::Resolution {
                company: "Acme".into(),
                reason: "no candidates".into(),
            },
            IntelError::SessionCreation("chromium missing".into()),
            IntelError::InsufficientContent {
                chars: 3,
                required: 50,
            },
            IntelError::external("tavily", "timeout"),
        ];
        for err in errs {
            assert!(err.is_escalatable(), "{err} should escalate");
        }
    }
}
