//! Web search connector backed by Tavily

use super::SearchConnector;
use crate::error::ResearchError;
use crate::models::{ActionResult, SearchHit};
use crate::Result;
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::json;
use tracing::{debug, warn};

const SOURCE: &str = "Tavily";

/// Question prefixes dropped before a query is sent to the search provider
const QUESTION_PREFIXES: &[&str] = &["what is", "explain", "was ist", "erkläre"];

pub struct TavilySearchConnector {
    client: Client,
    base_url: String,
    api_key: String,
    max_results: usize,
}

#[derive(Debug, Deserialize)]
struct TavilyResponse {
    #[serde(default)]
    results: Vec<TavilyResult>,
}

#[derive(Debug, Deserialize)]
struct TavilyResult {
    #[serde(default)]
    content: String,
    url: Option<String>,
}

impl TavilySearchConnector {
    pub fn new(client: Client, base_url: &str, api_key: &str, max_results: usize) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
            max_results,
        }
    }

    async fn search(&self, query: &str) -> Result<Vec<SearchHit>> {
        let body = json!({
            "api_key": self.api_key,
            "query": query,
            "search_depth": "basic",
            "max_results": self.max_results,
            "include_answer": false,
        });

        let response = self
            .client
            .post(format!("{}/search", self.base_url))
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(ResearchError::UpstreamStatus {
                source_name: SOURCE,
                status: status.as_u16(),
            });
        }

        let parsed: TavilyResponse = response
            .json()
            .await
            .map_err(|e| ResearchError::connector(SOURCE, format!("invalid response: {}", e)))?;

        Ok(parsed
            .results
            .into_iter()
            .filter(|r| !r.content.trim().is_empty())
            .take(self.max_results)
            .map(|r| SearchHit {
                snippet: r.content,
                source: r.url,
            })
            .collect())
    }
}

#[async_trait]
impl SearchConnector for TavilySearchConnector {
    async fn fetch(&self, query: &str) -> ActionResult {
        let cleaned = clean_search_query(query);
        debug!(query = %cleaned, "Searching the web");

        match self.search(&cleaned).await {
            Ok(hits) if hits.is_empty() => ActionResult::Search(vec![SearchHit::no_results()]),
            Ok(hits) => ActionResult::Search(hits),
            Err(e) => {
                warn!(query = %cleaned, error = %e, "Web search failed");
                ActionResult::error(format!("Web search failed: {}", e))
            }
        }
    }
}

/// Strip a leading question prefix ("what is", "explain", ...) and stray `?`
pub fn clean_search_query(query: &str) -> String {
    let trimmed = query.trim();

    for prefix in QUESTION_PREFIXES {
        let prefix_chars = prefix.chars().count();
        let head: String = trimmed.chars().take(prefix_chars).collect();
        if head.to_lowercase() != *prefix {
            continue;
        }

        let rest = &trimmed[head.len()..];
        if rest.chars().next().map_or(false, char::is_alphanumeric) {
            continue;
        }

        let cleaned = rest.trim_matches(|c: char| c.is_whitespace() || c == '?');
        if !cleaned.is_empty() {
            return cleaned.to_string();
        }
    }

    trimmed.to_string()
}
