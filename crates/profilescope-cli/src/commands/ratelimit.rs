//! `profilescope ratelimit status|reset`

use std::path::Path;

use anyhow::Result;

use super::{load_config, load_limiter};
use crate::output;

pub async fn status(config_path: Option<&Path>) -> Result<()> {
    let config = load_config(config_path)?;
    let limiter = load_limiter(&config);
    let status = limiter.status().await;

    if output::is_json() {
        output::print_json(&status);
    } else {
        print!("{}", output::render_status(&status));
        if let Some(ref path) = config.paths.rate_limit_state {
            println!("State file:         {}", path.display());
        }
    }
    Ok(())
}

pub async fn reset(config_path: Option<&Path>) -> Result<()> {
    let config = load_config(config_path)?;
    let limiter = load_limiter(&config);
    limiter.reset().await?;

    if output::is_json() {
        output::print_json(&serde_json::json!({ "reset": true }));
    } else {
        println!("Rate-limit state cleared.");
    }
    Ok(())
}
