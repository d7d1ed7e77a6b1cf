//! Serper (Google Search) adapter.

use std::time::Duration;

use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use serde::Deserialize;
use tracing::info;

use super::{SearchApi, SearchHit};

pub const DEFAULT_BASE_URL: &str = "https://google.serper.dev";

pub struct SerperClient {
    api_key: String,
    base_url: String,
    client: reqwest::Client,
}

#[derive(Debug, Deserialize)]
struct SerperResponse {
    #[serde(default)]
    organic: Vec<SerperResult>,
}

#[derive(Debug, Deserialize)]
struct SerperResult {
    #[serde(default)]
    link: String,
    #[serde(default)]
    title: String,
    #[serde(default)]
    snippet: String,
}

impl SerperClient {
    pub fn new(api_key: &str, base_url: &str, timeout: Duration) -> Self {
        Self {
            api_key: api_key.to_string(),
            base_url: base_url.trim_end_matches('/').to_string(),
            client: reqwest::Client::builder()
                .timeout(timeout)
                .build()
                .unwrap_or_default(),
        }
    }
}

/// Google has no domain parameter; the filter becomes a `site:` operator.
fn with_site_filter(query: &str, domain_filter: Option<&str>) -> String {
    match domain_filter {
        Some(filter) => format!("site:{filter} {query}"),
        None => query.to_string(),
    }
}

#[async_trait]
impl SearchApi for SerperClient {
    fn name(&self) -> &str {
        "serper"
    }

    async fn search(
        &self,
        query: &str,
        max_results: usize,
        domain_filter: Option<&str>,
    ) -> Result<Vec<SearchHit>> {
        let q = with_site_filter(query, domain_filter);
        info!(query = %q, max_results, "Serper search");

        let body = serde_json::json!({
            "q": q,
            "num": max_results,
        });

        let resp = self
            .client
            .post(format!("{}/search", self.base_url))
            .header("X-API-KEY", &self.api_key)
            .header("Content-Type", "application/json")
            .json(&body)
            .send()
            .await
            .context("Serper API request failed")?;

        let status = resp.status();
        if !status.is_success() {
            let text = resp.text().await.unwrap_or_default();
            bail!("Serper API returned {status}: {text}");
        }

        let data: SerperResponse = resp
            .json()
            .await
            .context("Failed to parse Serper response")?;

        let hits: Vec<SearchHit> = data
            .organic
            .into_iter()
            .take(max_results)
            .map(|r| SearchHit {
                url: r.link,
                title: r.title,
                content: r.snippet,
            })
            .collect();

        info!(query = %q, count = hits.len(), "Serper search complete");
        Ok(hits)
    }
}
