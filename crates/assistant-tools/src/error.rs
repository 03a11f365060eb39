//! Error Types for Search Tools

use assistant_core::AgentError;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, SearchError>;

#[derive(Error, Debug)]
pub enum SearchError {
    #[error("Empty search query")]
    EmptyQuery,

    #[error("{service} returned HTTP {status}")]
    Status { service: &'static str, status: u16 },

    #[error("Could not read {service} response: {reason}")]
    Parse { service: &'static str, reason: String },

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),
}

impl From<SearchError> for AgentError {
    fn from(err: SearchError) -> Self {
        AgentError::ToolExecution(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_converts_to_tool_execution() {
        let err: AgentError = SearchError::Status { service: "DuckDuckGo", status: 429 }.into();
        assert!(matches!(err, AgentError::ToolExecution(msg) if msg == "DuckDuckGo returned HTTP 429"));
    }
}
