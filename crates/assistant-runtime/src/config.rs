//! Environment Configuration
//!
//! Every knob has a default; a value that does not parse is logged and
//! replaced by its default rather than aborting startup.

use std::str::FromStr;
use std::time::Duration;

use assistant_core::{AgentConfig, MemoryConfig};
use assistant_tools::{ArxivConfig, WebSearchConfig};

pub const DEFAULT_TITLE: &str = "AI Search Engine: Context Aware Agent";

/// Assistant configuration (API key excluded)
#[derive(Clone, Debug)]
pub struct AssistantConfig {
    /// OpenAI-compatible endpoint
    pub groq_base_url: String,

    /// Model id
    pub model: String,

    /// Sampling temperature
    pub temperature: f32,

    /// Iteration cap per submission
    pub max_iterations: usize,

    /// Timeout for each model and tool call
    pub call_timeout: Duration,

    /// Memory summary bound
    pub summary_max_chars: usize,

    /// Display title
    pub title: String,

    /// Paper search settings
    pub arxiv: ArxivConfig,

    /// Web search settings
    pub web: WebSearchConfig,

    /// Server listen address
    pub bind_addr: String,
}

impl Default for AssistantConfig {
    fn default() -> Self {
        Self {
            groq_base_url: "https://api.groq.com/openai/v1".into(),
            model: "llama-3.3-70b-versatile".into(),
            temperature: 0.7,
            max_iterations: 15,
            call_timeout: Duration::from_secs(60),
            summary_max_chars: 2000,
            title: DEFAULT_TITLE.into(),
            arxiv: ArxivConfig::default(),
            web: WebSearchConfig::default(),
            bind_addr: "0.0.0.0:3000".into(),
        }
    }
}

impl AssistantConfig {
    /// Read configuration from the process environment
    pub fn from_env() -> Self {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Read configuration through an arbitrary variable lookup
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        let get = |name: &str| lookup(name).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        Self {
            groq_base_url: get("GROQ_BASE_URL").unwrap_or(defaults.groq_base_url),
            model: get("ASSISTANT_MODEL").unwrap_or(defaults.model),
            temperature: parse_or(&get, "ASSISTANT_TEMPERATURE", defaults.temperature),
            max_iterations: nonzero_or(&get, "ASSISTANT_MAX_ITERATIONS", defaults.max_iterations),
            call_timeout: Duration::from_secs(nonzero_or(
                &get,
                "ASSISTANT_CALL_TIMEOUT_SECS",
                defaults.call_timeout.as_secs(),
            )),
            summary_max_chars: nonzero_or(&get, "ASSISTANT_SUMMARY_MAX_CHARS", defaults.summary_max_chars),
            title: get("ASSISTANT_TITLE").unwrap_or(defaults.title),
            arxiv: ArxivConfig {
                top_k_results: nonzero_or(&get, "ARXIV_TOP_K", defaults.arxiv.top_k_results),
                doc_content_chars_max: nonzero_or(&get, "ARXIV_MAX_CHARS", defaults.arxiv.doc_content_chars_max),
                ..defaults.arxiv
            },
            web: WebSearchConfig {
                max_results: nonzero_or(&get, "WEB_SEARCH_MAX_RESULTS", defaults.web.max_results),
                ..defaults.web
            },
            bind_addr: get("BIND_ADDR").unwrap_or(defaults.bind_addr),
        }
    }

    /// Agent settings derived from this configuration
    pub fn agent_config(&self) -> AgentConfig {
        let mut config = AgentConfig {
            max_iterations: self.max_iterations,
            call_timeout: self.call_timeout,
            ..AgentConfig::default()
        };
        config.generation.model = self.model.clone();
        config.generation.temperature = self.temperature;
        config
    }

    /// Memory settings derived from this configuration
    pub fn memory_config(&self) -> MemoryConfig {
        MemoryConfig {
            max_summary_chars: self.summary_max_chars,
            timeout: self.call_timeout,
            ..MemoryConfig::default()
        }
    }
}

fn parse_or<T, G>(get: &G, name: &str, default: T) -> T
where
    T: FromStr + std::fmt::Debug,
    G: Fn(&str) -> Option<String>,
{
    let Some(raw) = get(name) else {
        return default;
    };

    match raw.parse() {
        Ok(value) => value,
        Err(_) => {
            tracing::warn!(variable = name, value = %raw, default = ?default, "Invalid value, using default");
            default
        }
    }
}

/// Like `parse_or`, but a zero count or timeout also falls back
fn nonzero_or<T, G>(get: &G, name: &str, default: T) -> T
where
    T: FromStr + std::fmt::Debug + Default + PartialEq + Copy,
    G: Fn(&str) -> Option<String>,
{
    let value = parse_or(get, name, default);
    if value == T::default() {
        tracing::warn!(variable = name, default = ?default, "Zero is not allowed, using default");
        return default;
    }
    value
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn from_pairs(pairs: &[(&str, &str)]) -> AssistantConfig {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        AssistantConfig::from_lookup(|name| vars.get(name).cloned())
    }

    #[test]
    fn test_defaults_when_unset() {
        let config = from_pairs(&[]);
        assert_eq!(config.model, "llama-3.3-70b-versatile");
        assert_eq!(config.max_iterations, 15);
        assert_eq!(config.arxiv.top_k_results, 3);
        assert_eq!(config.arxiv.doc_content_chars_max, 200);
        assert_eq!(config.web.max_results, 5);
        assert_eq!(config.title, DEFAULT_TITLE);
        assert_eq!(config.bind_addr, "0.0.0.0:3000");
    }

    #[test]
    fn test_overrides() {
        let config = from_pairs(&[
            ("ASSISTANT_MODEL", "llama-3.1-8b-instant"),
            ("ASSISTANT_TEMPERATURE", "0.2"),
            ("ASSISTANT_CALL_TIMEOUT_SECS", "5"),
            ("ARXIV_TOP_K", "5"),
            ("BIND_ADDR", "127.0.0.1:8080"),
        ]);
        assert_eq!(config.model, "llama-3.1-8b-instant");
        assert!((config.temperature - 0.2).abs() < f32::EPSILON);
        assert_eq!(config.call_timeout, Duration::from_secs(5));
        assert_eq!(config.arxiv.top_k_results, 5);
        assert_eq!(config.bind_addr, "127.0.0.1:8080");
    }

    #[test]
    fn test_invalid_numbers_fall_back() {
        let config = from_pairs(&[
            ("ASSISTANT_MAX_ITERATIONS", "many"),
            ("ARXIV_MAX_CHARS", "-1"),
            ("ASSISTANT_MODEL", "   "),
        ]);
        assert_eq!(config.max_iterations, 15);
        assert_eq!(config.arxiv.doc_content_chars_max, 200);
        assert_eq!(config.model, "llama-3.3-70b-versatile");
    }

    #[test]
    fn test_zero_limits_fall_back() {
        let config = from_pairs(&[
            ("ASSISTANT_MAX_ITERATIONS", "0"),
            ("ASSISTANT_CALL_TIMEOUT_SECS", "0"),
            ("ARXIV_TOP_K", "0"),
        ]);
        assert_eq!(config.max_iterations, 15);
        assert_eq!(config.call_timeout, Duration::from_secs(60));
        assert_eq!(config.arxiv.top_k_results, 3);
    }

    #[test]
    fn test_derived_configs() {
        let config = from_pairs(&[("ASSISTANT_MAX_ITERATIONS", "4"), ("ASSISTANT_SUMMARY_MAX_CHARS", "500")]);

        let agent = config.agent_config();
        assert_eq!(agent.max_iterations, 4);
        assert_eq!(agent.generation.stop_sequences, vec!["\nObservation:".to_string()]);

        assert_eq!(config.memory_config().max_summary_chars, 500);
    }
}
