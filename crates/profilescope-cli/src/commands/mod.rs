//! Subcommand implementations.

pub mod acquire;
pub mod batch;
pub mod doctor;
pub mod ratelimit;
pub mod resolve;

use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::debug;

use profilescope::{IntelConfig, RateLimiter};

pub fn load_config(explicit: Option<&Path>) -> Result<IntelConfig> {
    IntelConfig::load(explicit).context("failed to load configuration")
}

/// Limiter sharing its window with every other invocation through the
/// configured state file. Permits are persisted as they are granted.
pub fn load_limiter(config: &IntelConfig) -> Arc<RateLimiter> {
    let limiter = RateLimiter::from_config(&config.rate_limit);
    let limiter = match config.paths.rate_limit_state {
        Some(ref path) => {
            debug!(path = %path.display(), "rate-limit state file");
            limiter.with_state_file(path)
        }
        None => limiter,
    };
    Arc::new(limiter)
}
