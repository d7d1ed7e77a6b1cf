//! Tavily crawl endpoint.

use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use serde::Deserialize;
use tracing::info;

use super::{CrawlApi, CrawlBlock};
use crate::search::TavilyClient;

#[derive(Debug, Deserialize)]
struct TavilyCrawlResponse {
    #[serde(default)]
    results: Vec<TavilyCrawlResult>,
}

#[derive(Debug, Deserialize)]
struct TavilyCrawlResult {
    #[serde(default)]
    url: String,
    #[serde(default)]
    raw_content: Option<String>,
}

#[async_trait]
impl CrawlApi for TavilyClient {
    fn name(&self) -> &str {
        "tavily"
    }

    async fn crawl(&self, url: &str, instructions: &str) -> Result<Vec<CrawlBlock>> {
        info!(url, limit = self.crawl_limit, "Tavily crawl");

        let body = serde_json::json!({
            "url": url,
            "instructions": instructions,
            "max_depth": 1,
            "limit": self.crawl_limit,
        });

        let resp = self
            .post("crawl")
            .json(&body)
            .send()
            .await
            .context("Tavily crawl request failed")?;

        let status = resp.status();
        if !status.is_success() {
            let text = resp.text().await.unwrap_or_default();
            bail!("Tavily crawl returned {status}: {text}");
        }

        let data: TavilyCrawlResponse = resp
            .json()
            .await
            .context("Failed to parse Tavily crawl response")?;

        let blocks: Vec<CrawlBlock> = data
            .results
            .into_iter()
            .filter_map(|r| {
                let raw_content = r.raw_content?;
                (!raw_content.trim().is_empty()).then_some(CrawlBlock {
                    url: r.url,
                    raw_content,
                })
            })
            .collect();

        info!(url, count = blocks.len(), "Tavily crawl complete");
        Ok(blocks)
    }
}
