//! Terminal and JSON rendering.

use std::sync::atomic::{AtomicBool, Ordering};

use serde::Serialize;

use profilescope::resolve::{Resolution, Validation};
use profilescope::{AcquisitionResult, RateLimitStatus};

static JSON: AtomicBool = AtomicBool::new(false);

pub fn set_json(enabled: bool) {
    JSON.store(enabled, Ordering::Relaxed);
}

pub fn is_json() -> bool {
    JSON.load(Ordering::Relaxed)
}

pub fn print_json<T: Serialize + ?Sized>(value: &T) {
    match serde_json::to_string_pretty(value) {
        Ok(s) => println!("{s}"),
        Err(e) => eprintln!("Error: failed to serialize output: {e}"),
    }
}

fn truncate(text: &str, max: usize) -> String {
    if text.chars().count() <= max {
        text.to_string()
    } else {
        let head: String = text.chars().take(max.saturating_sub(3)).collect();
        format!("{head}...")
    }
}

pub fn render_result(result: &AcquisitionResult) -> String {
    let mut out = String::new();
    out.push_str(&format!("{} [{}]\n", result.company_name, result.source_tier));
    if let Some(ref url) = result.profile_url {
        out.push_str(&format!("  Profile:  {url}\n"));
    }
    out.push_str(&format!("  Title:    {}\n", result.content.profile_title));
    out.push_str(&format!(
        "  About:    {}\n",
        truncate(&result.content.description, 160)
    ));
    out.push_str(&format!(
        "  Posts:    {} ({} chars extracted, {}ms)\n",
        result.content.posts.len(),
        result.content.raw_text_length,
        result.duration_ms
    ));
    for (i, post) in result.content.posts.iter().enumerate() {
        out.push_str(&format!("    {:>2}. {}\n", i + 1, truncate(post, 100)));
    }
    for error in &result.errors {
        out.push_str(&format!("  [!!] {error}\n"));
    }
    out
}

pub fn render_validation(validation: &Validation) -> String {
    let mut out = String::new();
    for (rank, candidate) in validation.ranked().into_iter().enumerate() {
        let audience = candidate
            .audience_size
            .map(|a| a.to_string())
            .unwrap_or_else(|| "-".to_string());
        out.push_str(&format!(
            "  {:>2}. {:<40} score {:>6.1}  audience {:>9}\n",
            rank + 1,
            candidate.slug,
            candidate.relevance_score,
            audience
        ));
        if let Some(ref reason) = candidate.rejection_reason {
            out.push_str(&format!("      rejected: {reason}\n"));
        }
    }
    out
}

pub fn render_resolution(company: &str, resolution: &Resolution) -> String {
    let mut out = format!(
        "{company} -> {} ({:?})\n  {}\n",
        resolution.slug, resolution.method, resolution.profile_url
    );
    if let Some(ref validation) = resolution.validation {
        if let Some(ref selection) = validation.selection {
            out.push_str(&format!("  Selected by: {selection:?}\n"));
        }
        out.push_str(&render_validation(validation));
    }
    out
}

pub fn render_status(status: &RateLimitStatus) -> String {
    let last = status
        .snapshot
        .last_request_epoch_ms
        .and_then(chrono::DateTime::from_timestamp_millis)
        .map(|t| t.to_rfc3339())
        .unwrap_or_else(|| "never".to_string());
    format!(
        "Last acquisition:   {last}\n\
         In current window:  {} of {}\n\
         Remaining:          {}\n\
         Next permit in:     {}s\n",
        status.snapshot.request_count_in_window,
        status.max_per_window,
        status.remaining_in_window,
        status.next_permit_in_ms.div_ceil(1000)
    )
}
