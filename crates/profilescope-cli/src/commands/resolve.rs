//! `profilescope resolve <name>`: resolution only, no content acquisition.

use std::path::Path;

use anyhow::Result;

use profilescope::AcquisitionOrchestrator;

use super::{load_config, load_limiter};
use crate::output;

pub async fn run(config_path: Option<&Path>, name: &str) -> Result<()> {
    let config = load_config(config_path)?;
    let limiter = load_limiter(&config);
    let orchestrator = AcquisitionOrchestrator::from_config(&config, limiter.clone());

    // Validation may visit candidate profiles, so it counts against the limit.
    limiter.acquire_permit().await?;

    let resolution = orchestrator.resolver().resolve(name, None).await?;
    if output::is_json() {
        output::print_json(&resolution);
    } else {
        print!("{}", output::render_resolution(name, &resolution));
    }
    Ok(())
}
