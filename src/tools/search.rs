//! Web search tool backed by the Google Custom Search API.
//!
//! The tool is only registered when both credentials are configured at
//! startup; an unconfigured provider means no tool, not a call-time error.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;
use serde_json::Value;

use super::Tool;
use crate::core::errors::ApiError;

const RESULT_LIMIT: usize = 3;
const SEARCH_TIMEOUT_SECS: u64 = 30;

#[derive(Debug, Clone, Serialize)]
pub struct SearchResult {
    pub title: String,
    pub snippet: String,
    pub link: String,
}

pub struct SearchTool {
    api_key: String,
    engine_id: String,
    client: Client,
}

impl SearchTool {
    pub fn new(api_key: String, engine_id: String) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(SEARCH_TIMEOUT_SECS))
            .build()
            .unwrap_or_default();

        Self {
            api_key,
            engine_id,
            client,
        }
    }

    async fn google_search(&self, query: &str) -> Result<Vec<SearchResult>, ApiError> {
        let url = format!(
            "https://www.googleapis.com/customsearch/v1?key={}&cx={}&q={}",
            self.api_key,
            self.engine_id,
            urlencoding::encode(query)
        );

        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(ApiError::internal)?;

        if !response.status().is_success() {
            return Err(ApiError::Internal(format!(
                "search request failed: {}",
                response.status()
            )));
        }

        let payload: Value = response.json().await.map_err(ApiError::internal)?;
        Ok(parse_results(&payload))
    }
}

fn parse_results(payload: &Value) -> Vec<SearchResult> {
    let items = payload
        .get("items")
        .and_then(|v| v.as_array())
        .cloned()
        .unwrap_or_default();

    let mut results = Vec::new();
    for item in items.iter().take(RESULT_LIMIT) {
        let title = item
            .get("title")
            .and_then(|v| v.as_str())
            .unwrap_or("")
            .to_string();
        let snippet = item
            .get("snippet")
            .and_then(|v| v.as_str())
            .unwrap_or("")
            .to_string();
        let link = item
            .get("link")
            .and_then(|v| v.as_str())
            .unwrap_or("")
            .to_string();
        if !title.is_empty() && !link.is_empty() {
            results.push(SearchResult {
                title,
                snippet,
                link,
            });
        }
    }

    results
}

fn format_results(results: &[SearchResult]) -> String {
    results
        .iter()
        .map(|result| {
            format!(
                "Title: {}\nSnippet: {}\nLink: {}\n",
                result.title, result.snippet, result.link
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

#[async_trait]
impl Tool for SearchTool {
    fn name(&self) -> &str {
        "google_search"
    }

    fn description(&self) -> &str {
        "Useful for searching the web for current information. Input should be a search query."
    }

    async fn run(&self, input: &str) -> String {
        let query = input.trim();
        if query.is_empty() {
            return "Error: search query is empty".to_string();
        }

        match self.google_search(query).await {
            Ok(results) if results.is_empty() => {
                format!("No search results found for: {}", query)
            }
            Ok(results) => format_results(&results),
            Err(err) => format!("Error performing search for '{}': {}", query, err),
        }
    }
}
