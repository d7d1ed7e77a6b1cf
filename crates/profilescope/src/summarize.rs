//! Interface to the narrative summarization collaborator.
//!
//! No concrete model client lives here. [`prepare_summary_input`] renders an
//! acquisition result into the bounded plain text handed to whatever
//! implementation the caller plugs in.

use anyhow::Result;
use async_trait::async_trait;

use crate::types::{AcquisitionResult, SourceTier};

/// Default upper bound on prepared input, in characters.
pub const DEFAULT_SUMMARY_INPUT_CHARS: usize = 12_000;

#[async_trait]
pub trait SummarizationService: Send + Sync {
    /// Produce narrative text about `company` from prepared content.
    async fn summarize(&self, prepared: &str, company: &str) -> Result<String>;
}

/// Render title, description and numbered posts, truncated to `max_chars`.
///
/// Posts are dropped whole from the end before anything is cut mid-text;
/// the description is only truncated when it alone exceeds the bound.
pub fn prepare_summary_input(result: &AcquisitionResult, max_chars: usize) -> String {
    let content = &result.content;
    let mut out = format!("Company: {}\n", result.company_name);
    if !content.profile_title.is_empty() && content.profile_title != result.company_name {
        out.push_str(&format!("Profile: {}\n", content.profile_title));
    }
    if result.source_tier == SourceTier::Minimal {
        out.push_str("Note: only limited public information was available.\n");
    }
    out.push_str("\nDescription:\n");
    out.push_str(&content.description);
    out.push('\n');

    if char_len(&out) > max_chars {
        return truncate_chars(&out, max_chars);
    }

    let mut header_written = false;
    for (i, post) in content.posts.iter().enumerate() {
        let header = if header_written { "" } else { "\nRecent posts:\n" };
        let entry = format!("{header}{}. {post}\n", i + 1);
        if char_len(&out) + char_len(&entry) > max_chars {
            break;
        }
        out.push_str(&entry);
        header_written = true;
    }
    out
}

fn char_len(s: &str) -> usize {
    s.chars().count()
}

fn truncate_chars(s: &str, max: usize) -> String {
    s.chars().take(max).collect()
}
