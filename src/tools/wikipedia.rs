//! Wikipedia search tool backed by the MediaWiki API.

use crate::error::{AgentError, Result};
use reqwest::Client;
use serde::Deserialize;
use std::collections::HashMap;
use std::time::Duration;
use tracing::{debug, instrument};

/// Default MediaWiki API endpoint.
pub const DEFAULT_ENDPOINT: &str = "https://en.wikipedia.org/w/api.php";

/// User-Agent string, required by Wikimedia's API etiquette.
const USER_AGENT: &str = concat!("gaia-agent/", env!("CARGO_PKG_VERSION"));

/// Searches Wikipedia and returns page summaries.
pub struct WikipediaClient {
    client: Client,
    endpoint: String,
}

impl WikipediaClient {
    pub fn new() -> Result<Self> {
        Self::with_endpoint(DEFAULT_ENDPOINT)
    }

    pub fn with_endpoint(endpoint: &str) -> Result<Self> {
        let client = Client::builder()
            .user_agent(USER_AGENT)
            .timeout(Duration::from_secs(20))
            .build()
            .map_err(|e| AgentError::Config(format!("failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            endpoint: endpoint.to_string(),
        })
    }

    /// Run a search and format the result block, turning failures into an
    /// error-prefixed string.
    pub async fn search_formatted(&self, query: &str, top_k: usize, max_chars: usize) -> String {
        match self.search(query, top_k, max_chars).await {
            Ok(body) => format!(
                "=== WIKIPEDIA SEARCH: {} ===\n\n{}\n\n=== END WIKIPEDIA RESULTS ===",
                query, body
            ),
            Err(e) => format!("ERROR - Wikipedia search failed: {}", e),
        }
    }

    /// Find up to `top_k` pages and return `Page:`/`Summary:` blocks, each summary
    /// cut to `max_chars` characters.
    #[instrument(skip(self))]
    pub async fn search(&self, query: &str, top_k: usize, max_chars: usize) -> Result<String> {
        let titles = self.search_titles(query, top_k).await?;
        if titles.is_empty() {
            return Ok("No good Wikipedia Search Result was found".to_string());
        }

        let mut blocks = Vec::new();
        for title in &titles {
            if let Some(summary) = self.summary(title).await? {
                let summary: String = summary.chars().take(max_chars).collect();
                blocks.push(format!("Page: {}\nSummary: {}", title, summary));
            }
        }

        debug!("Fetched {} page summaries", blocks.len());
        Ok(blocks.join("\n\n"))
    }

    async fn search_titles(&self, query: &str, top_k: usize) -> Result<Vec<String>> {
        let limit = top_k.to_string();
        let response: SearchResponse = self
            .get(&[
                ("action", "query"),
                ("list", "search"),
                ("srsearch", query),
                ("srlimit", limit.as_str()),
                ("format", "json"),
            ])
            .await?;

        Ok(response
            .query
            .map(|q| q.search.into_iter().map(|hit| hit.title).collect())
            .unwrap_or_default())
    }

    async fn summary(&self, title: &str) -> Result<Option<String>> {
        let response: ExtractResponse = self
            .get(&[
                ("action", "query"),
                ("prop", "extracts"),
                ("exintro", "1"),
                ("explaintext", "1"),
                ("redirects", "1"),
                ("titles", title),
                ("format", "json"),
            ])
            .await?;

        Ok(response
            .query
            .and_then(|q| q.pages.into_values().next())
            .and_then(|page| page.extract)
            .filter(|extract| !extract.trim().is_empty()))
    }

    async fn get<T: for<'de> Deserialize<'de>>(&self, params: &[(&str, &str)]) -> Result<T> {
        let response = self
            .client
            .get(&self.endpoint)
            .query(params)
            .send()
            .await
            .map_err(|e| AgentError::network(&self.endpoint, e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(AgentError::network(&self.endpoint, format!("HTTP {}", status)));
        }

        response
            .json()
            .await
            .map_err(|e| AgentError::Tool(format!("invalid Wikipedia response: {}", e)))
    }
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    query: Option<SearchQuery>,
}

#[derive(Debug, Deserialize)]
struct SearchQuery {
    #[serde(default)]
    search: Vec<SearchHit>,
}

#[derive(Debug, Deserialize)]
struct SearchHit {
    title: String,
}

#[derive(Debug, Deserialize)]
struct ExtractResponse {
    query: Option<ExtractQuery>,
}

#[derive(Debug, Deserialize)]
struct ExtractQuery {
    #[serde(default)]
    pages: HashMap<String, ExtractPage>,
}

#[derive(Debug, Deserialize)]
struct ExtractPage {
    #[serde(default)]
    extract: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn test_search_formats_pages() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(query_param("list", "search"))
            .and(query_param("srsearch", "Mercedes Sosa"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "query": { "search": [{ "title": "Mercedes Sosa" }] }
            })))
            .mount(&server)
            .await;

        Mock::given(method("GET"))
            .and(query_param("prop", "extracts"))
            .and(query_param("titles", "Mercedes Sosa"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "query": { "pages": { "123": {
                    "title": "Mercedes Sosa",
                    "extract": "Haydée Mercedes Sosa was an Argentine singer."
                } } }
            })))
            .mount(&server)
            .await;

        let wiki = WikipediaClient::with_endpoint(&format!("{}/w/api.php", server.uri())).unwrap();
        let out = wiki.search_formatted("Mercedes Sosa", 3, 20).await;

        assert!(out.starts_with("=== WIKIPEDIA SEARCH: Mercedes Sosa ==="));
        assert!(out.contains("Page: Mercedes Sosa\nSummary: Haydée Mercedes Sosa"));
        // Summary is cut to 20 characters
        assert!(!out.contains("Argentine"));
        assert!(out.ends_with("=== END WIKIPEDIA RESULTS ==="));
    }

    #[tokio::test]
    async fn test_search_no_hits() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "query": { "search": [] }
            })))
            .mount(&server)
            .await;

        let wiki = WikipediaClient::with_endpoint(&server.uri()).unwrap();
        let out = wiki.search("zzzz", 3, 100).await.unwrap();
        assert_eq!(out, "No good Wikipedia Search Result was found");
    }

    #[tokio::test]
    async fn test_search_failure_is_error_string() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;

        let wiki = WikipediaClient::with_endpoint(&server.uri()).unwrap();
        let out = wiki.search_formatted("anything", 3, 100).await;
        assert!(out.starts_with("ERROR - Wikipedia search failed:"));
    }
}
