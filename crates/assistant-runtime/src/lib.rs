//! # assistant-runtime
//!
//! Wires the assistant together: environment configuration, the Groq
//! provider and the search tools.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use assistant_runtime::{AssistantConfig, open_shell};
//!
//! let config = AssistantConfig::from_env();
//! let shell = open_shell(&config, &CredentialProvider::groq(), &prompt, &sink)?;
//! shell.on_submit(&mut session, "Find a recent paper on transformer quantization", &sink).await?;
//! ```

pub mod config;
pub mod groq;

use std::sync::Arc;

use assistant_core::{
    Agent, AgentError, ApiKey, CredentialProvider, EventSink, Result, SecretPrompt, Shell,
};
use assistant_tools::{http_client, search_tools};

pub use config::AssistantConfig;
pub use groq::{GroqConfig, GroqProvider};

// Re-export core types for convenience
pub use assistant_core::{
    AgentOutcome, ConversationMemory, Session, SessionEvent, SessionId, SessionStore,
};

/// Groq provider for the configured endpoint
pub fn groq_provider(config: &AssistantConfig, api_key: ApiKey) -> Result<GroqProvider> {
    GroqProvider::new(GroqConfig {
        base_url: config.groq_base_url.clone(),
        api_key,
        timeout: config.call_timeout,
    })
}

/// Build the Groq-backed agent with the search tools registered
pub fn build_agent(config: &AssistantConfig, api_key: ApiKey) -> Result<Agent> {
    let provider = groq_provider(config, api_key)?;

    let client = http_client(config.call_timeout)
        .map_err(|e| AgentError::Config(e.to_string()))?;
    let tools = search_tools(client, config.arxiv.clone(), config.web.clone())?;

    tracing::info!(
        model = %config.model,
        tools = ?tools.names(),
        max_iterations = config.max_iterations,
        "Agent assembled"
    );

    Ok(Agent::new(Arc::new(provider), Arc::new(tools), config.agent_config()))
}

/// Resolve the key and open a shell; fails closed without a key
pub fn open_shell(
    config: &AssistantConfig,
    credentials: &CredentialProvider,
    prompt: &dyn SecretPrompt,
    sink: &dyn EventSink,
) -> Result<Shell> {
    Shell::open(credentials, prompt, sink, config.title.clone(), |key| build_agent(config, key))
}

#[cfg(test)]
mod tests {
    use super::*;
    use assistant_core::{EventLog, LlmProvider, NoPrompt, SuppliedSecret};

    #[test]
    fn test_open_shell_without_key_warns() {
        let log = EventLog::new();
        let credentials = CredentialProvider::groq().with_lookup(|_| None);

        let result = open_shell(&AssistantConfig::default(), &credentials, &NoPrompt, &log);

        assert!(matches!(result, Err(AgentError::MissingCredential(_))));
        assert!(matches!(log.snapshot().last(), Some(SessionEvent::Warning { .. })));
    }

    #[test]
    fn test_open_shell_registers_tools() {
        let credentials = CredentialProvider::groq().with_lookup(|_| None);
        let shell = open_shell(
            &AssistantConfig::default(),
            &credentials,
            &SuppliedSecret(Some("gsk_test".into())),
            &EventLog::new(),
        )
        .unwrap();

        assert_eq!(shell.title(), config::DEFAULT_TITLE);
        assert_eq!(shell.agent().tools().names(), vec!["arxiv", "WebSearch"]);
        assert_eq!(shell.agent().provider().name(), "groq");
    }

    #[tokio::test]
    async fn test_health_check_unreachable_endpoint_is_false() {
        let config = AssistantConfig {
            groq_base_url: "http://127.0.0.1:9".into(),
            call_timeout: std::time::Duration::from_secs(2),
            ..AssistantConfig::default()
        };
        let provider = groq_provider(&config, ApiKey::new("gsk_test")).unwrap();

        assert!(!provider.health_check().await.unwrap());
    }
}
