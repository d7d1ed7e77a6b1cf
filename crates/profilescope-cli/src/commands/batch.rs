//! `profilescope batch <file>`: many companies, one shared rate limiter.

use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use futures::stream::{self, StreamExt};
use indicatif::{ProgressBar, ProgressStyle};
use serde::Serialize;

use profilescope::{AcquisitionOrchestrator, AcquisitionResult};

use super::{load_config, load_limiter};
use crate::output;

/// Outcome for one input line.
#[derive(Debug, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum BatchEntry {
    Acquired {
        #[serde(flatten)]
        result: AcquisitionResult,
    },
    Failed {
        company: String,
        error: String,
    },
}

/// Company names from a batch file, skipping blanks and `#` comments.
pub fn parse_companies(raw: &str) -> Vec<String> {
    raw.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .map(str::to_string)
        .collect()
}

pub async fn run(config_path: Option<&Path>, file: &Path, concurrency: usize) -> Result<()> {
    let raw = std::fs::read_to_string(file)
        .with_context(|| format!("failed to read batch file: {}", file.display()))?;
    let companies = parse_companies(&raw);
    if companies.is_empty() {
        anyhow::bail!("no companies listed in {}", file.display());
    }

    let config = load_config(config_path)?;
    let orchestrator = Arc::new(AcquisitionOrchestrator::from_config(&config, load_limiter(&config)));

    let progress = if output::is_json() {
        ProgressBar::hidden()
    } else {
        let pb = ProgressBar::new(companies.len() as u64);
        pb.set_style(
            ProgressStyle::default_bar()
                .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_bar())
                .progress_chars("#>-"),
        );
        pb
    };

    let entries = run_batch(orchestrator, companies, concurrency, &progress).await;
    progress.finish_and_clear();

    if output::is_json() {
        output::print_json(&entries);
        return Ok(());
    }
    for entry in &entries {
        match entry {
            BatchEntry::Acquired { result } => print!("{}", output::render_result(result)),
            BatchEntry::Failed { company, error } => println!("{company} [FAILED]\n  [!!] {error}"),
        }
    }
    let failed = entries
        .iter()
        .filter(|e| matches!(e, BatchEntry::Failed { .. }))
        .count();
    println!("\n{} acquired, {failed} failed", entries.len() - failed);
    Ok(())
}

/// Acquire every company with at most `concurrency` runs in flight.
///
/// Results come back in input order. A run refused by the rate limiter is
/// reported as failed; the others still proceed.
pub async fn run_batch(
    orchestrator: Arc<AcquisitionOrchestrator>,
    companies: Vec<String>,
    concurrency: usize,
    progress: &ProgressBar,
) -> Vec<BatchEntry> {
    let mut indexed: Vec<(usize, BatchEntry)> = stream::iter(companies.into_iter().enumerate())
        .map(|(i, company)| {
            let orchestrator = orchestrator.clone();
            async move {
                let entry = match orchestrator.acquire_profile(&company, None).await {
                    Ok(result) => BatchEntry::Acquired { result },
                    Err(e) => BatchEntry::Failed {
                        error: e.to_string(),
                        company,
                    },
                };
                (i, entry)
            }
        })
        .buffer_unordered(concurrency.max(1))
        .inspect(|(_, entry)| {
            if let BatchEntry::Acquired { result } = entry {
                progress.set_message(format!("{} [{}]", result.company_name, result.source_tier));
            }
            progress.inc(1);
        })
        .collect()
        .await;
    indexed.sort_by_key(|(i, _)| *i);
    indexed.into_iter().map(|(_, entry)| entry).collect()
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use profilescope::config::{ExtractionConfig, ScoringConfig, SearchConfig};
    use profilescope::resolve::{CandidateScorer, CandidateValidator};
    use profilescope::session::pacing::Pacing;
    use profilescope::session::NoopSessionFactory;
    use profilescope::{CandidateSearchEngine, ContentExtractor, RateLimiter, SlugResolver, SourceTier};

    use super::*;

    fn offline_orchestrator(cap: u32) -> Arc<AcquisitionOrchestrator> {
        let resolver = SlugResolver::new(
            CandidateSearchEngine::new(Vec::new(), SearchConfig::default()),
            CandidateValidator::new(CandidateScorer::new(ScoringConfig::default()), Vec::new()),
        );
        Arc::new(AcquisitionOrchestrator::new(
            Arc::new(RateLimiter::new(Duration::ZERO, cap, Duration::from_secs(3600))),
            resolver,
            Arc::new(NoopSessionFactory),
            ContentExtractor::new(ExtractionConfig::default(), 0, Duration::ZERO, Pacing::none()),
        ))
    }

    fn names(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[tokio::test]
    async fn test_batch_keeps_input_order() {
        let entries = run_batch(
            offline_orchestrator(100),
            names(&["Acme", "Globex", "Tesla", "Initech"]),
            3,
            &ProgressBar::hidden(),
        )
        .await;
        let companies: Vec<&str> = entries
            .iter()
            .map(|e| match e {
                BatchEntry::Acquired { result } => {
                    assert_eq!(result.source_tier, SourceTier::Minimal);
                    result.company_name.as_str()
                }
                BatchEntry::Failed { company, .. } => company.as_str(),
            })
            .collect();
        assert_eq!(companies, ["Acme", "Globex", "Tesla", "Initech"]);
    }

    #[tokio::test]
    async fn test_batch_reports_rate_limited_runs() {
        let entries = run_batch(
            offline_orchestrator(2),
            names(&["Acme", "Globex", "Tesla"]),
            1,
            &ProgressBar::hidden(),
        )
        .await;
        assert!(matches!(entries[0], BatchEntry::Acquired { .. }));
        assert!(matches!(entries[1], BatchEntry::Acquired { .. }));
        match &entries[2] {
            BatchEntry::Failed { company, error } => {
                assert_eq!(company, "Tesla");
                assert!(error.contains("Rate limit exceeded"));
            }
            other => panic!("expected failure, got {other:?}"),
        }
    }

    #[test]
    fn test_parse_companies_skips_comments_and_blanks() {
        let companies = parse_companies("# competitors\nAcme Inc\n\n  Globex  \n#Initech\nHooli\n");
        assert_eq!(companies, vec!["Acme Inc", "Globex", "Hooli"]);
    }

    #[test]
    fn test_failed_entry_serialization() {
        let entry = BatchEntry::Failed {
            company: "Acme".to_string(),
            error: "Rate limit exceeded".to_string(),
        };
        let json = serde_json::to_value(&entry).unwrap();
        assert_eq!(json["status"], "failed");
        assert_eq!(json["company"], "Acme");
    }
}
