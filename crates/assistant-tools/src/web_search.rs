//! Web Search
//!
//! Scrapes the DuckDuckGo HTML endpoint, which needs no API key.

use async_trait::async_trait;
use scraper::{ElementRef, Html, Selector};
use serde::{Deserialize, Serialize};

use assistant_core::{Result as CoreResult, Tool};

use crate::error::{Result, SearchError};

const NO_RESULTS: &str = "No good DuckDuckGo Search Result was found";

/// Web search configuration
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct WebSearchConfig {
    /// HTML search endpoint
    pub base_url: String,

    /// Snippets returned per query
    pub max_results: usize,
}

impl Default for WebSearchConfig {
    fn default() -> Self {
        Self {
            base_url: "https://html.duckduckgo.com/html/".into(),
            max_results: 5,
        }
    }
}

/// One organic search hit
#[derive(Clone, Debug, PartialEq)]
pub struct SearchHit {
    pub title: String,
    pub snippet: String,
    pub url: String,
}

impl std::fmt::Display for SearchHit {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}\n{}", self.title, self.snippet)?;
        if !self.url.is_empty() {
            write!(f, "\nURL: {}", self.url)?;
        }
        Ok(())
    }
}

/// Tool for searching the web
pub struct WebSearchTool {
    client: reqwest::Client,
    config: WebSearchConfig,
}

impl WebSearchTool {
    pub fn new(client: reqwest::Client, config: WebSearchConfig) -> Self {
        Self { client, config }
    }

    pub fn config(&self) -> &WebSearchConfig {
        &self.config
    }

    pub fn query_url(&self, query: &str) -> Result<String> {
        let query = query.trim();
        if query.is_empty() {
            return Err(SearchError::EmptyQuery);
        }
        Ok(format!("{}?q={}", self.config.base_url, urlencoding::encode(query)))
    }

    /// Fetch and render snippets for a query
    pub async fn search(&self, query: &str) -> Result<String> {
        let url = self.query_url(query)?;
        tracing::debug!(url = %url, "Querying DuckDuckGo");

        let response = self.client.get(&url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(SearchError::Status { service: "DuckDuckGo", status: status.as_u16() });
        }

        let html = response.text().await?;
        let hits = extract_results(&html, self.config.max_results)?;
        tracing::info!(query = %query, results = hits.len(), "Web search complete");

        if hits.is_empty() {
            return Ok(NO_RESULTS.into());
        }

        Ok(hits
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join("\n\n"))
    }
}

#[async_trait]
impl Tool for WebSearchTool {
    fn name(&self) -> &str {
        "WebSearch"
    }

    fn description(&self) -> &str {
        "Search the internet for current information, news and general knowledge. Input should be a search query."
    }

    async fn invoke(&self, query: &str) -> CoreResult<String> {
        Ok(self.search(query).await?)
    }
}

/// Organic results from a DuckDuckGo HTML page, ads skipped
pub fn extract_results(html: &str, limit: usize) -> Result<Vec<SearchHit>> {
    let document = Html::parse_document(html);
    let result = selector(".result")?;
    let title = selector(".result__a")?;
    let snippet = selector(".result__snippet")?;
    let url = selector(".result__url")?;

    let hits = document
        .select(&result)
        .filter(|el| !el.value().classes().any(|class| class == "result--ad"))
        .filter_map(|el| {
            let title = first_text(el, &title)?;
            let snippet = first_text(el, &snippet)?;
            Some(SearchHit {
                title,
                snippet,
                url: first_text(el, &url).unwrap_or_default(),
            })
        })
        .take(limit)
        .collect();

    Ok(hits)
}

fn selector(css: &str) -> Result<Selector> {
    Selector::parse(css).map_err(|e| SearchError::Parse {
        service: "DuckDuckGo",
        reason: format!("bad selector '{}': {}", css, e),
    })
}

fn first_text(element: ElementRef<'_>, selector: &Selector) -> Option<String> {
    element
        .select(selector)
        .next()
        .map(|el| el.text().collect::<String>().split_whitespace().collect::<Vec<_>>().join(" "))
        .filter(|text| !text.is_empty())
}
