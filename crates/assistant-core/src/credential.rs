//! Credentials
//!
//! The model API key comes from the process environment first and from an
//! interactive prompt second. Without a key the session must not start.

use crate::error::{AgentError, Result};

/// Model API key; never printed
#[derive(Clone, PartialEq, Eq)]
pub struct ApiKey(String);

impl ApiKey {
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    /// Raw key for the Authorization header
    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Debug for ApiKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("ApiKey(***)")
    }
}

/// Interactive secret input (terminal prompt, sidebar field)
pub trait SecretPrompt: Send + Sync {
    /// Ask for a secret; `None` when the user gives nothing
    fn ask(&self, label: &str) -> Option<String>;
}

/// A secret that was already collected, e.g. from a request body
pub struct SuppliedSecret(pub Option<String>);

impl SecretPrompt for SuppliedSecret {
    fn ask(&self, _label: &str) -> Option<String> {
        self.0.clone()
    }
}

/// Non-interactive surfaces
pub struct NoPrompt;

impl SecretPrompt for NoPrompt {
    fn ask(&self, _label: &str) -> Option<String> {
        None
    }
}

type Lookup = Box<dyn Fn(&str) -> Option<String> + Send + Sync>;

/// Resolves the API key: environment first, then the prompt
pub struct CredentialProvider {
    env_var: String,
    label: String,
    lookup: Lookup,
}

impl CredentialProvider {
    pub fn new(env_var: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            env_var: env_var.into(),
            label: label.into(),
            lookup: Box::new(|name| std::env::var(name).ok()),
        }
    }

    /// `GROQ_API_KEY`, shown to the user as "Groq API Key"
    pub fn groq() -> Self {
        Self::new("GROQ_API_KEY", "Groq API Key")
    }

    /// Replace the environment lookup
    pub fn with_lookup<F>(mut self, lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String> + Send + Sync + 'static,
    {
        self.lookup = Box::new(lookup);
        self
    }

    pub fn env_var(&self) -> &str {
        &self.env_var
    }

    /// Human-readable name of the credential
    pub fn label(&self) -> &str {
        &self.label
    }

    /// Environment value if non-blank, otherwise whatever the prompt returns
    pub fn get_key(&self, prompt: &dyn SecretPrompt) -> Option<ApiKey> {
        if let Some(key) = non_blank((self.lookup)(&self.env_var)) {
            tracing::debug!(env_var = %self.env_var, "Credential found in environment");
            return Some(ApiKey(key));
        }

        let key = non_blank(prompt.ask(&self.label));
        if key.is_some() {
            tracing::debug!(label = %self.label, "Credential supplied interactively");
        }
        key.map(ApiKey)
    }

    /// Like `get_key`, but absence is a `MissingCredential` error
    pub fn require(&self, prompt: &dyn SecretPrompt) -> Result<ApiKey> {
        self.get_key(prompt)
            .ok_or_else(|| AgentError::MissingCredential(self.label.clone()))
    }
}

impl Default for CredentialProvider {
    fn default() -> Self {
        Self::groq()
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}
