//! arXiv Paper Search
//!
//! Queries the arXiv Atom API and renders the top hits as short plain-text
//! records the model can read.

use async_trait::async_trait;
use scraper::{ElementRef, Html, Selector};
use serde::{Deserialize, Serialize};

use assistant_core::{Result as CoreResult, Tool};

use crate::error::{Result, SearchError};

const NO_RESULTS: &str = "No good Arxiv Result was found";

/// Paper search configuration
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ArxivConfig {
    /// Atom query endpoint
    pub base_url: String,

    /// Papers returned per query
    pub top_k_results: usize,

    /// Character cap applied to each rendered paper
    pub doc_content_chars_max: usize,

    /// Longer queries are cut before sending
    pub max_query_len: usize,
}

impl Default for ArxivConfig {
    fn default() -> Self {
        Self {
            base_url: "https://export.arxiv.org/api/query".into(),
            top_k_results: 3,
            doc_content_chars_max: 200,
            max_query_len: 300,
        }
    }
}

/// One paper from the feed
#[derive(Clone, Debug, PartialEq)]
pub struct Paper {
    pub published: String,
    pub title: String,
    pub authors: Vec<String>,
    pub summary: String,
}

impl Paper {
    /// Plain-text record, cut to `max_chars`
    pub fn render(&self, max_chars: usize) -> String {
        let text = format!(
            "Published: {}\nTitle: {}\nAuthors: {}\nSummary: {}",
            self.published,
            self.title,
            self.authors.join(", "),
            self.summary
        );
        text.chars().take(max_chars).collect()
    }
}

/// Tool for searching arXiv
pub struct ArxivSearchTool {
    client: reqwest::Client,
    config: ArxivConfig,
}

impl ArxivSearchTool {
    pub fn new(client: reqwest::Client, config: ArxivConfig) -> Self {
        Self { client, config }
    }

    pub fn config(&self) -> &ArxivConfig {
        &self.config
    }

    /// Request URL for a query: identifier lookup or full-text search
    pub fn query_url(&self, query: &str) -> Result<String> {
        let query: String = query.trim().chars().take(self.config.max_query_len).collect();
        if query.trim().is_empty() {
            return Err(SearchError::EmptyQuery);
        }

        let ids: Option<Vec<&str>> = query.split_whitespace().map(bare_identifier).collect();
        if let Some(ids) = ids {
            return Ok(format!(
                "{}?id_list={}&max_results={}",
                self.config.base_url,
                urlencoding::encode(&ids.join(",")),
                self.config.top_k_results
            ));
        }

        Ok(format!(
            "{}?search_query=all:{}&start=0&max_results={}",
            self.config.base_url,
            urlencoding::encode(query.trim()),
            self.config.top_k_results
        ))
    }

    /// Fetch and render papers for a query
    pub async fn search(&self, query: &str) -> Result<String> {
        let url = self.query_url(query)?;
        tracing::debug!(url = %url, "Querying arXiv");

        let response = self.client.get(&url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(SearchError::Status { service: "arXiv", status: status.as_u16() });
        }

        let feed = response.text().await?;
        let papers = parse_feed(&feed, self.config.top_k_results)?;
        tracing::info!(query = %query, results = papers.len(), "arXiv search complete");

        if papers.is_empty() {
            return Ok(NO_RESULTS.into());
        }

        Ok(papers
            .iter()
            .map(|paper| paper.render(self.config.doc_content_chars_max))
            .collect::<Vec<_>>()
            .join("\n\n"))
    }
}

#[async_trait]
impl Tool for ArxivSearchTool {
    fn name(&self) -> &str {
        "arxiv"
    }

    fn description(&self) -> &str {
        "Search arxiv.org for scientific papers in physics, mathematics, computer science, quantitative biology, quantitative finance, statistics, electrical engineering and economics. Input should be a search query or an arXiv identifier."
    }

    async fn invoke(&self, query: &str) -> CoreResult<String> {
        Ok(self.search(query).await?)
    }
}

/// Whether `text` looks like an arXiv identifier (`2301.01234v2`, `hep-th/9901001`)
pub fn is_arxiv_identifier(text: &str) -> bool {
    bare_identifier(text).is_some()
}

/// The identifier without its `arXiv:` prefix, if `text` is one.
/// `id_list` rejects the prefixed form.
pub fn bare_identifier(text: &str) -> Option<&str> {
    let bare = text.strip_prefix("arXiv:").unwrap_or(text);
    is_bare_identifier(bare).then_some(bare)
}

fn is_bare_identifier(text: &str) -> bool {
    let base = match text.rsplit_once('v') {
        Some((base, version)) if is_digits(version) => base,
        _ => text,
    };

    if let Some((year_month, number)) = base.split_once('.') {
        if year_month.len() == 4 && is_digits(year_month) && (4..=5).contains(&number.len()) && is_digits(number) {
            return true;
        }
    }

    match base.split_once('/') {
        Some((archive, number)) => {
            let archive = archive.split_once('.').map_or(archive, |(a, _)| a);
            !archive.is_empty()
                && archive.chars().all(|c| c.is_ascii_lowercase() || c == '-')
                && number.len() == 7
                && is_digits(number)
        }
        None => false,
    }
}

fn is_digits(s: &str) -> bool {
    !s.is_empty() && s.bytes().all(|b| b.is_ascii_digit())
}

/// Extract at most `limit` papers from an Atom feed
pub fn parse_feed(feed: &str, limit: usize) -> Result<Vec<Paper>> {
    let document = Html::parse_document(feed);
    let entry = selector("entry")?;
    let title = selector("title")?;
    let published = selector("published")?;
    let summary = selector("summary")?;
    let author_name = selector("author name")?;

    let papers = document
        .select(&entry)
        .filter_map(|entry| {
            let title = first_text(entry, &title)?;
            // The API reports a missing query as a single "Error" entry
            if title == "Error" {
                return None;
            }
            Some(Paper {
                published: first_text(entry, &published)
                    .map(|p| p.chars().take(10).collect())
                    .unwrap_or_default(),
                title,
                authors: entry.select(&author_name).map(collapsed_text).collect(),
                summary: first_text(entry, &summary).unwrap_or_default(),
            })
        })
        .take(limit)
        .collect();

    Ok(papers)
}

fn selector(css: &str) -> Result<Selector> {
    Selector::parse(css).map_err(|e| SearchError::Parse {
        service: "arXiv",
        reason: format!("bad selector '{}': {}", css, e),
    })
}

fn first_text(element: ElementRef<'_>, selector: &Selector) -> Option<String> {
    element
        .select(selector)
        .next()
        .map(collapsed_text)
        .filter(|text| !text.is_empty())
}

fn collapsed_text(element: ElementRef<'_>) -> String {
    element
        .text()
        .collect::<String>()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}
