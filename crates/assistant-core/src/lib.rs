//! # assistant-core
//!
//! Core of the tool-augmented query assistant: a reason/act/observe agent,
//! an ordered tool registry, summary memory and the session shell that ties
//! them to a display surface.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                           Shell                              │
//! │  ┌────────────┐   ┌─────────────────────────────────────┐    │
//! │  │  Session   │   │               Agent                 │    │
//! │  │ Transcript │──▶│  Thinking ─▶ ToolCall ─▶ Observing  │    │
//! │  │  Memory    │◀──│      ▲______________________│       │    │
//! │  └────────────┘   │  ToolRegistry     LlmProvider       │    │
//! │                   └─────────────────────────────────────┘    │
//! │        │ SessionEvent                                        │
//! │        ▼                                                     │
//! │    EventSink (terminal, websocket, in-memory log)            │
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! Nothing here talks to the network directly. Model backends implement
//! [`LlmProvider`], search backends implement [`Tool`], and display surfaces
//! implement [`EventSink`].

pub mod credential;
pub mod error;
pub mod events;
pub mod memory;
pub mod message;
pub mod parse;
pub mod provider;
pub mod reasoning;
pub mod session;
pub mod shell;
pub mod tool;
pub mod transcript;

#[cfg(test)]
pub(crate) mod testing;

pub use credential::{ApiKey, CredentialProvider, NoPrompt, SecretPrompt, SuppliedSecret};
pub use error::{AgentError, Result};
pub use events::{EventLog, EventSink, NullSink, SessionEvent};
pub use memory::{ConversationMemory, MemoryConfig};
pub use message::{Conversation, Message, Role};
pub use provider::{Completion, GenerationOptions, LlmProvider};
pub use reasoning::{Agent, AgentBuilder, AgentConfig, AgentOutcome, AgentState};
pub use session::{Session, SessionId, SessionStore, SharedSession};
pub use shell::Shell;
pub use tool::{Tool, ToolCall, ToolRegistry, ToolResult};
pub use transcript::{ChatTurn, Transcript, TurnRole};
