//! # assistant-tools
//!
//! Search tools for the assistant: arXiv paper search and DuckDuckGo web
//! search. Both are keyless and share one HTTP client.
//!
//! ```text
//! ┌──────────────────────────────────────────────────────┐
//! │  ToolRegistry (registration order = prompt order)    │
//! ├──────────────────────────────────────────────────────┤
//! │  arxiv      export.arxiv.org Atom API  → top 3 × 200 │
//! │  WebSearch  html.duckduckgo.com        → top 5       │
//! └──────────────────────────────────────────────────────┘
//! ```

pub mod arxiv;
pub mod error;
pub mod web_search;

use std::time::Duration;

use assistant_core::ToolRegistry;

pub use arxiv::{ArxivConfig, ArxivSearchTool, Paper};
pub use error::{Result, SearchError};
pub use web_search::{SearchHit, WebSearchConfig, WebSearchTool};

const USER_AGENT: &str = concat!("assistant-tools/", env!("CARGO_PKG_VERSION"));

/// HTTP client shared by the search tools
pub fn http_client(timeout: Duration) -> Result<reqwest::Client> {
    Ok(reqwest::Client::builder()
        .timeout(timeout)
        .user_agent(USER_AGENT)
        .build()?)
}

/// Registry with the paper search first and the web search second
pub fn search_tools(
    client: reqwest::Client,
    arxiv: ArxivConfig,
    web: WebSearchConfig,
) -> assistant_core::Result<ToolRegistry> {
    let mut registry = ToolRegistry::new();
    registry.register(ArxivSearchTool::new(client.clone(), arxiv))?;
    registry.register(WebSearchTool::new(client, web))?;
    Ok(registry)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_search_tools_order() {
        let client = http_client(Duration::from_secs(5)).unwrap();
        let registry = search_tools(client, ArxivConfig::default(), WebSearchConfig::default()).unwrap();
        assert_eq!(registry.names(), vec!["arxiv", "WebSearch"]);
        assert!(registry.generate_prompt_section().contains("Valid tool names: arxiv, WebSearch"));
    }
}
