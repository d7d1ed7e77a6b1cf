//! `profilescope acquire <name>`

use std::path::Path;

use anyhow::Result;

use profilescope::summarize::DEFAULT_SUMMARY_INPUT_CHARS;
use profilescope::{prepare_summary_input, AcquisitionOrchestrator};

use super::{load_config, load_limiter};
use crate::output;

pub async fn run(config_path: Option<&Path>, name: &str, slug: Option<&str>, prepared: bool) -> Result<()> {
    let config = load_config(config_path)?;
    let orchestrator = AcquisitionOrchestrator::from_config(&config, load_limiter(&config));

    let result = orchestrator.acquire_profile(name, slug).await?;

    if prepared {
        let text = prepare_summary_input(&result, DEFAULT_SUMMARY_INPUT_CHARS);
        if output::is_json() {
            output::print_json(&serde_json::json!({
                "company": result.company_name,
                "source_tier": result.source_tier,
                "prepared": text,
            }));
        } else {
            print!("{text}");
        }
    } else if output::is_json() {
        output::print_json(&result);
    } else {
        print!("{}", output::render_result(&result));
    }
    Ok(())
}
