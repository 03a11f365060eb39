//! Application State

use std::sync::Arc;

use assistant_core::{CredentialProvider, SessionStore};
use assistant_runtime::AssistantConfig;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    /// Model, tool and display settings
    pub config: Arc<AssistantConfig>,

    /// Per-session transcripts and memories
    pub sessions: Arc<SessionStore>,

    /// Environment key lookup; the request's sidebar key is the fallback
    pub credentials: Arc<CredentialProvider>,
}

impl AppState {
    pub fn new(config: AssistantConfig, credentials: CredentialProvider) -> Self {
        let sessions = SessionStore::new(config.memory_config());
        Self {
            config: Arc::new(config),
            sessions: Arc::new(sessions),
            credentials: Arc::new(credentials),
        }
    }
}
