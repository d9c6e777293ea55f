//! Web search through a SearXNG-compatible JSON endpoint

use crate::ResearchResult;
use async_trait::async_trait;
use delve_core::{network_error, SearchHit, SearchResult, SearchSettings};
use reqwest::StatusCode;
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, warn};

#[async_trait]
pub trait SearchProvider: Send + Sync {
    /// Search for `query`; failures come back as a single failure record
    async fn search(&self, query: &str, max_results: usize) -> Vec<SearchResult>;
}

#[derive(Debug, Deserialize)]
struct SearxngResponse {
    #[serde(default)]
    results: Vec<SearxngResult>,
}

#[derive(Debug, Deserialize)]
struct SearxngResult {
    title: Option<String>,
    url: Option<String>,
    content: Option<String>,
}

impl From<SearxngResult> for SearchHit {
    fn from(result: SearxngResult) -> Self {
        SearchHit {
            title: result.title.unwrap_or_else(|| "No Title".to_string()),
            url: result.url.unwrap_or_else(|| "#".to_string()),
            snippet: result
                .content
                .unwrap_or_else(|| "No summary available.".to_string()),
            document: None,
        }
    }
}

/// SearXNG search backend
pub struct SearxngSearch {
    client: reqwest::Client,
    base_url: String,
    timeout: Duration,
}

impl SearxngSearch {
    pub fn new(settings: &SearchSettings) -> ResearchResult<Self> {
        let client = reqwest::Client::builder()
            .build()
            .map_err(|e| {
                network_error!(format!("Failed to build HTTP client: {}", e), "search", e)
            })?;

        Ok(Self {
            client,
            base_url: settings.base_url.clone(),
            timeout: Duration::from_secs(settings.timeout_secs),
        })
    }
}

#[async_trait]
impl SearchProvider for SearxngSearch {
    async fn search(&self, query: &str, max_results: usize) -> Vec<SearchResult> {
        let num = max_results.to_string();
        let response = self
            .client
            .get(&self.base_url)
            .query(&[("q", query), ("format", "json"), ("num", num.as_str())])
            .timeout(self.timeout)
            .send()
            .await;

        let response = match response {
            Ok(response) => response,
            Err(e) => {
                warn!(query = query, error = %e, "Search request failed");
                return vec![SearchResult::failed(format!("Search failed: {}", e), query)];
            }
        };

        if response.status() != StatusCode::OK {
            warn!(query = query, status = %response.status(), "Search backend returned an error");
            return vec![SearchResult::failed("Search failed", query)];
        }

        let body: SearxngResponse = match response.json().await {
            Ok(body) => body,
            Err(e) => {
                warn!(query = query, error = %e, "Search response could not be decoded");
                return vec![SearchResult::failed(format!("Search failed: {}", e), query)];
            }
        };

        let hits: Vec<SearchResult> = body
            .results
            .into_iter()
            .take(max_results)
            .map(|result| SearchResult::Hit(result.into()))
            .collect();

        debug!(query = query, hits = hits.len(), "Search completed");
        hits
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_fields_get_defaults() {
        let body: SearxngResponse = serde_json::from_str(
            r#"{"results": [{"title": "Remote work study"}, {"url": "https://a.example", "content": null}]}"#,
        )
        .unwrap();

        let hits: Vec<SearchHit> = body.results.into_iter().map(SearchHit::from).collect();
        assert_eq!(hits[0].url, "#");
        assert_eq!(hits[0].snippet, "No summary available.");
        assert_eq!(hits[1].title, "No Title");
        assert_eq!(hits[1].snippet, "No summary available.");
    }

    #[test]
    fn test_missing_results_is_empty() {
        let body: SearxngResponse = serde_json::from_str("{}").unwrap();
        assert!(body.results.is_empty());
    }
}
