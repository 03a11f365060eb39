//! Session Events
//!
//! Everything a display surface needs to render a session arrives as a
//! [`SessionEvent`]. The agent emits thoughts, tool calls, observations and
//! answers; the shell emits the title, chat turns and warnings. Emission is
//! fire-and-forget: a sink must never block the reasoning loop.

use serde::{Deserialize, Serialize};
use std::sync::Mutex;
use tokio::sync::mpsc;

use crate::transcript::ChatTurn;

/// One renderable event
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SessionEvent {
    /// Display title
    Title { text: String },
    /// A chat turn was appended to the transcript
    Turn { turn: ChatTurn },
    /// Intermediate reasoning, informational only
    Thought { step: usize, text: String },
    /// The agent is about to invoke a tool
    ToolCall { step: usize, tool: String, input: String },
    /// What a tool returned (or why it failed)
    Observation { step: usize, tool: String, output: String, success: bool },
    /// Final answer for the current submission
    Answer { text: String, degraded: bool },
    /// User-visible warning (missing credentials, failures)
    Warning { text: String },
}

impl SessionEvent {
    /// Whether this event is intermediate reasoning rather than a result
    pub fn is_thought(&self) -> bool {
        matches!(
            self,
            SessionEvent::Thought { .. } | SessionEvent::ToolCall { .. } | SessionEvent::Observation { .. }
        )
    }
}

/// A display surface
pub trait EventSink: Send + Sync {
    fn emit(&self, event: SessionEvent);
}

/// Discards everything
pub struct NullSink;

impl EventSink for NullSink {
    fn emit(&self, _event: SessionEvent) {}
}

impl EventSink for mpsc::UnboundedSender<SessionEvent> {
    fn emit(&self, event: SessionEvent) {
        // Receiver gone means the display went away; the submission still completes.
        if self.send(event).is_err() {
            tracing::debug!("Event receiver dropped");
        }
    }
}

/// In-memory event recorder
#[derive(Default)]
pub struct EventLog {
    events: Mutex<Vec<SessionEvent>>,
}

impl EventLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Copy of everything recorded so far
    pub fn snapshot(&self) -> Vec<SessionEvent> {
        self.events.lock().map(|events| events.clone()).unwrap_or_default()
    }

    /// Drain recorded events
    pub fn take(&self) -> Vec<SessionEvent> {
        self.events
            .lock()
            .map(|mut events| std::mem::take(&mut *events))
            .unwrap_or_default()
    }

    pub fn len(&self) -> usize {
        self.events.lock().map(|events| events.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl EventSink for EventLog {
    fn emit(&self, event: SessionEvent) {
        if let Ok(mut events) = self.events.lock() {
            events.push(event);
        }
    }
}
