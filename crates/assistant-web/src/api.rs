//! API Client

use serde::{Deserialize, Serialize};

/// What a message bubble shows
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EntryKind {
    User,
    Assistant,
    Thought,
    Warning,
}

impl EntryKind {
    pub fn css(self) -> &'static str {
        match self {
            EntryKind::User => "user",
            EntryKind::Assistant => "assistant",
            EntryKind::Thought => "thought",
            EntryKind::Warning => "warning",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            EntryKind::User => "user",
            EntryKind::Assistant => "assistant",
            EntryKind::Thought => "thinking",
            EntryKind::Warning => "warning",
        }
    }
}

/// Chat entry for display
#[derive(Clone, Debug, PartialEq)]
pub struct ChatEntry {
    pub id: usize,
    pub kind: EntryKind,
    pub content: String,
}

/// Event emitted by the server during a submission
#[derive(Clone, Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerEvent {
    Title { text: String },
    Turn { turn: serde_json::Value },
    Thought { step: usize, text: String },
    ToolCall { step: usize, tool: String, input: String },
    Observation { step: usize, tool: String, output: String, success: bool },
    Answer { text: String, degraded: bool },
    Warning { text: String },
}

impl ServerEvent {
    /// Reasoning and warnings become their own bubbles; turns and answers
    /// are rendered from the reply itself
    pub fn display(&self) -> Option<(EntryKind, String)> {
        match self {
            ServerEvent::Thought { step, text } => Some((EntryKind::Thought, format!("[{}] {}", step, text))),
            ServerEvent::ToolCall { step, tool, input } => {
                Some((EntryKind::Thought, format!("[{}] {}: {}", step, tool, input)))
            }
            ServerEvent::Observation { step, tool, output, success } => {
                let verb = if *success { "returned" } else { "failed" };
                Some((EntryKind::Thought, format!("[{}] {} {}:\n{}", step, tool, verb, output)))
            }
            ServerEvent::Warning { text } => Some((EntryKind::Warning, text.clone())),
            ServerEvent::Title { .. } | ServerEvent::Turn { .. } | ServerEvent::Answer { .. } => None,
        }
    }
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    message: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    session_id: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    api_key: Option<&'a str>,
}

/// Successful chat reply
#[derive(Clone, Debug, Deserialize)]
pub struct ChatReply {
    pub session_id: String,
    pub answer: String,
    pub degraded: bool,
    pub events: Vec<ServerEvent>,
}

#[derive(Deserialize)]
struct ErrorBody {
    error: String,
}

#[derive(Deserialize)]
struct ConfigBody {
    title: String,
}

/// Absolute URL on the serving origin
fn endpoint(path: &str) -> String {
    let origin = web_sys::window()
        .and_then(|w| w.location().origin().ok())
        .unwrap_or_else(|| "http://localhost:3000".into());
    format!("{}{}", origin, path)
}

/// Display title configured on the server
pub async fn fetch_title() -> Result<String, String> {
    let response = reqwest::get(endpoint("/api/config"))
        .await
        .map_err(|e| e.to_string())?;
    let body: ConfigBody = response.json().await.map_err(|e| e.to_string())?;
    Ok(body.title)
}

/// Send a chat message to the backend
pub async fn send_chat(
    message: &str,
    session_id: Option<&str>,
    api_key: Option<&str>,
) -> Result<ChatReply, String> {
    let client = reqwest::Client::new();

    let response = client
        .post(endpoint("/api/chat"))
        .json(&ChatRequest { message, session_id, api_key })
        .send()
        .await
        .map_err(|e| e.to_string())?;

    if response.status().is_success() {
        response.json().await.map_err(|e| e.to_string())
    } else {
        let body: Option<ErrorBody> = response.json().await.ok();
        Err(body.map_or_else(|| "Request failed".into(), |b| b.error))
    }
}
