//! Session Management
//!
//! A session owns the transcript and the summary memory of one user. The
//! store hands every session out behind its own async mutex, so one
//! session handles a single submission at a time while different sessions
//! run independently.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};
use uuid::Uuid;

use crate::memory::{ConversationMemory, MemoryConfig};
use crate::transcript::Transcript;

/// Unique session identifier
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SessionId(String);

impl SessionId {
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    pub fn from_string(s: impl Into<String>) -> Self {
        Self(s.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for SessionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// One user's conversation state
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Session {
    /// Unique identifier
    pub id: SessionId,

    /// Append-only chat log for replay
    pub transcript: Transcript,

    /// Rolling summary the agent reads
    pub memory: ConversationMemory,

    /// Creation timestamp
    pub created_at: DateTime<Utc>,

    /// Last activity timestamp
    pub updated_at: DateTime<Utc>,
}

impl Session {
    /// Create a new session
    pub fn new(memory_config: MemoryConfig) -> Self {
        Self::with_id(SessionId::new(), memory_config)
    }

    /// Create with specific ID
    pub fn with_id(id: SessionId, memory_config: MemoryConfig) -> Self {
        let now = Utc::now();
        Self {
            id,
            transcript: Transcript::new(),
            memory: ConversationMemory::new(memory_config),
            created_at: now,
            updated_at: now,
        }
    }

    /// Update the activity timestamp
    pub fn touch(&mut self) {
        self.updated_at = Utc::now();
    }

    /// Number of chat turns
    pub fn turn_count(&self) -> usize {
        self.transcript.len()
    }
}

impl Default for Session {
    fn default() -> Self {
        Self::new(MemoryConfig::default())
    }
}

/// Shared handle to one session
pub type SharedSession = Arc<Mutex<Session>>;

/// In-process session registry
#[derive(Default)]
pub struct SessionStore {
    sessions: RwLock<HashMap<SessionId, SharedSession>>,
    memory_config: MemoryConfig,
}

impl SessionStore {
    pub fn new(memory_config: MemoryConfig) -> Self {
        Self {
            sessions: RwLock::new(HashMap::new()),
            memory_config,
        }
    }

    /// Create and register a fresh session
    pub async fn create(&self) -> (SessionId, SharedSession) {
        self.insert(SessionId::new()).await
    }

    /// Look up a session
    pub async fn get(&self, id: &SessionId) -> Option<SharedSession> {
        self.sessions.read().await.get(id).cloned()
    }

    /// Existing session for `id`, or a new one registered under it
    pub async fn get_or_create(&self, id: Option<SessionId>) -> (SessionId, SharedSession) {
        let Some(id) = id else {
            return self.create().await;
        };

        if let Some(session) = self.get(&id).await {
            return (id, session);
        }
        self.insert(id).await
    }

    /// Drop a session; its transcript and memory go with it
    pub async fn remove(&self, id: &SessionId) -> bool {
        let removed = self.sessions.write().await.remove(id).is_some();
        if removed {
            tracing::info!(session_id = %id, "Session ended");
        }
        removed
    }

    pub async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.sessions.read().await.is_empty()
    }

    async fn insert(&self, id: SessionId) -> (SessionId, SharedSession) {
        let mut sessions = self.sessions.write().await;
        let session = sessions
            .entry(id.clone())
            .or_insert_with(|| {
                tracing::info!(session_id = %id, "Session created");
                Arc::new(Mutex::new(Session::with_id(id.clone(), self.memory_config.clone())))
            })
            .clone();
        (id, session)
    }
}
