//! Tavily adapter: search here, crawl in [`crate::crawl`].

use std::time::Duration;

use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use serde::Deserialize;
use tracing::info;

use super::{SearchApi, SearchHit};

pub const DEFAULT_BASE_URL: &str = "https://api.tavily.com";

/// Client for the Tavily search and crawl endpoints.
pub struct TavilyClient {
    api_key: String,
    base_url: String,
    client: reqwest::Client,
    pub(crate) crawl_limit: u32,
}

#[derive(Debug, Deserialize)]
struct TavilySearchResponse {
    #[serde(default)]
    results: Vec<TavilyResult>,
}

#[derive(Debug, Deserialize)]
struct TavilyResult {
    #[serde(default)]
    url: String,
    #[serde(default)]
    title: String,
    #[serde(default)]
    content: String,
}

impl TavilyClient {
    pub fn new(api_key: &str, base_url: &str, timeout: Duration) -> Self {
        Self {
            api_key: api_key.to_string(),
            base_url: base_url.trim_end_matches('/').to_string(),
            client: reqwest::Client::builder()
                .timeout(timeout)
                .build()
                .unwrap_or_default(),
            crawl_limit: 5,
        }
    }

    /// Maximum pages a crawl may visit.
    pub fn with_crawl_limit(mut self, limit: u32) -> Self {
        self.crawl_limit = limit.max(1);
        self
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    pub(crate) fn post(&self, path: &str) -> reqwest::RequestBuilder {
        self.client
            .post(self.endpoint(path))
            .bearer_auth(&self.api_key)
            .header("Content-Type", "application/json")
    }
}

/// Tavily filters on bare domains; any path part of the filter is dropped
/// and left to the caller's URL pattern check.
fn include_domain(domain_filter: &str) -> &str {
    domain_filter.split('/').next().unwrap_or(domain_filter)
}

#[async_trait]
impl SearchApi for TavilyClient {
    fn name(&self) -> &str {
        "tavily"
    }

    async fn search(
        &self,
        query: &str,
        max_results: usize,
        domain_filter: Option<&str>,
    ) -> Result<Vec<SearchHit>> {
        info!(query, max_results, ?domain_filter, "Tavily search");

        let mut body = serde_json::json!({
            "query": query,
            "max_results": max_results,
            "search_depth": "basic",
        });
        if let Some(filter) = domain_filter {
            body["include_domains"] = serde_json::json!([include_domain(filter)]);
        }

        let resp = self
            .post("search")
            .json(&body)
            .send()
            .await
            .context("Tavily search request failed")?;

        let status = resp.status();
        if !status.is_success() {
            let text = resp.text().await.unwrap_or_default();
            bail!("Tavily search returned {status}: {text}");
        }

        let data: TavilySearchResponse = resp
            .json()
            .await
            .context("Failed to parse Tavily search response")?;

        let hits: Vec<SearchHit> = data
            .results
            .into_iter()
            .map(|r| SearchHit {
                url: r.url,
                title: r.title,
                content: r.content,
            })
            .collect();

        info!(query, count = hits.len(), "Tavily search complete");
        Ok(hits)
    }
}
