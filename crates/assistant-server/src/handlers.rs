//! HTTP/WebSocket Handlers

use axum::{
    extract::{Path, State, WebSocketUpgrade, ws::{Message, WebSocket}},
    http::StatusCode,
    response::Response,
    Json,
};
use futures::{Sink, SinkExt, Stream, StreamExt};
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

use assistant_core::{
    AgentError, AgentOutcome, ChatTurn, EventLog, EventSink, LlmProvider, SessionEvent,
    SessionId, SuppliedSecret,
};
use assistant_runtime::{groq_provider, open_shell};

use crate::state::AppState;

// ============================================================================
// Request / Response Types
// ============================================================================

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
    pub credential_configured: bool,
    /// `None` when there is no server-side key to check with
    pub provider_reachable: Option<bool>,
    pub sessions: usize,
}

#[derive(Serialize)]
pub struct ConfigResponse {
    pub title: String,
    pub model: String,
}

#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    pub message: String,
    #[serde(default)]
    pub session_id: Option<String>,
    /// Sidebar key, used only when the server has none in its environment
    #[serde(default)]
    pub api_key: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ChatResponse {
    pub session_id: String,
    pub answer: String,
    pub degraded: bool,
    pub events: Vec<SessionEvent>,
}

#[derive(Debug, Serialize)]
pub struct SessionResponse {
    pub session_id: String,
}

#[derive(Debug, Serialize)]
pub struct TranscriptResponse {
    pub session_id: String,
    pub turns: Vec<ChatTurn>,
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: String,
    /// Whether the same request may succeed if sent again
    pub retryable: bool,
}

type ApiError = (StatusCode, Json<ErrorResponse>);

fn api_error(e: &AgentError) -> ApiError {
    let (status, code) = match e {
        AgentError::MissingCredential(_) => (StatusCode::UNAUTHORIZED, "MISSING_CREDENTIAL"),
        AgentError::Auth(_) => (StatusCode::UNAUTHORIZED, "AUTH_FAILED"),
        AgentError::EmptyInput => (StatusCode::BAD_REQUEST, "EMPTY_INPUT"),
        AgentError::RateLimited(_) => (StatusCode::TOO_MANY_REQUESTS, "RATE_LIMITED"),
        AgentError::Timeout(..) => (StatusCode::GATEWAY_TIMEOUT, "TIMEOUT"),
        AgentError::Provider(_) | AgentError::ProviderUnavailable(_) => (StatusCode::BAD_GATEWAY, "PROVIDER_ERROR"),
        _ => (StatusCode::INTERNAL_SERVER_ERROR, "AGENT_ERROR"),
    };

    (
        status,
        Json(ErrorResponse {
            error: e.user_message(),
            code: code.into(),
            retryable: e.is_retryable(),
        }),
    )
}

// ============================================================================
// Submission
// ============================================================================

/// Open a shell for the request and run one submission in its session
async fn submit(
    state: &AppState,
    request: ChatRequest,
    sink: &dyn EventSink,
) -> Result<(SessionId, AgentOutcome), AgentError> {
    let shell = open_shell(
        &state.config,
        &state.credentials,
        &SuppliedSecret(request.api_key),
        sink,
    )?;

    let (id, session) = state
        .sessions
        .get_or_create(request.session_id.map(SessionId::from_string))
        .await;

    // One submission per session at a time
    let mut session = session.lock().await;
    let outcome = shell.on_submit(&mut session, &request.message, sink).await?;
    Ok((id, outcome))
}

// ============================================================================
// Handlers
// ============================================================================

/// Health check endpoint
pub async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    let key = state.credentials.get_key(&SuppliedSecret(None));
    let credential_configured = key.is_some();

    let provider_reachable = match key.map(|key| groq_provider(&state.config, key)) {
        Some(Ok(provider)) => Some(provider.health_check().await.unwrap_or(false)),
        Some(Err(e)) => {
            tracing::warn!(error = %e, "Could not build provider for health check");
            Some(false)
        }
        None => None,
    };

    Json(HealthResponse {
        status: "healthy",
        version: env!("CARGO_PKG_VERSION"),
        credential_configured,
        provider_reachable,
        sessions: state.sessions.len().await,
    })
}

/// Display settings for the frontend
pub async fn get_config(State(state): State<AppState>) -> Json<ConfigResponse> {
    Json(ConfigResponse {
        title: state.config.title.clone(),
        model: state.config.model.clone(),
    })
}

/// Start an empty session
pub async fn create_session(State(state): State<AppState>) -> (StatusCode, Json<SessionResponse>) {
    let (id, _) = state.sessions.create().await;
    (
        StatusCode::CREATED,
        Json(SessionResponse {
            session_id: id.to_string(),
        }),
    )
}

/// Chat log of a session, for replay
pub async fn get_transcript(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<TranscriptResponse>, ApiError> {
    let id = SessionId::from_string(id);
    let session = state.sessions.get(&id).await.ok_or_else(|| {
        (
            StatusCode::NOT_FOUND,
            Json(ErrorResponse {
                error: format!("Session {} not found", id),
                code: "SESSION_NOT_FOUND".into(),
                retryable: false,
            }),
        )
    })?;

    let turns = session.lock().await.transcript.turns().to_vec();
    Ok(Json(TranscriptResponse {
        session_id: id.to_string(),
        turns,
    }))
}

/// Main chat endpoint (non-streaming)
pub async fn chat_handler(
    State(state): State<AppState>,
    Json(payload): Json<ChatRequest>,
) -> Result<Json<ChatResponse>, ApiError> {
    let log = EventLog::new();

    let (id, outcome) = submit(&state, payload, &log).await.map_err(|e| {
        tracing::error!("Chat error: {}", e);
        api_error(&e)
    })?;

    Ok(Json(ChatResponse {
        session_id: id.to_string(),
        answer: outcome.answer,
        degraded: outcome.degraded,
        events: log.take(),
    }))
}

/// WebSocket streaming chat
pub async fn chat_stream_handler(
    ws: WebSocketUpgrade,
    State(state): State<AppState>,
) -> Response {
    ws.on_upgrade(move |socket| handle_stream(socket, state))
}

async fn handle_stream(socket: WebSocket, state: AppState) {
    let (sender, receiver) = socket.split();
    stream_session(sender, receiver, state).await;
}

/// Frame loop of the streaming route: each text frame is a `ChatRequest`,
/// answered by its `SessionEvent` frames and a closing `done` frame
async fn stream_session<S, R, E>(mut sender: S, mut receiver: R, state: AppState)
where
    S: Sink<Message> + Unpin,
    R: Stream<Item = Result<Message, E>> + Unpin,
    E: std::fmt::Display,
{
    while let Some(msg) = receiver.next().await {
        let msg = match msg {
            Ok(Message::Text(text)) => text,
            Ok(Message::Close(_)) => break,
            Err(e) => {
                tracing::error!("WebSocket error: {}", e);
                break;
            }
            _ => continue,
        };

        // Parse request
        let request: ChatRequest = match serde_json::from_str(&msg) {
            Ok(r) => r,
            Err(e) => {
                let error = serde_json::json!({"type": "error", "error": e.to_string()});
                let _ = sender.send(Message::Text(error.to_string().into())).await;
                continue;
            }
        };

        // Events flow through the channel while the submission runs
        let (tx, mut rx) = mpsc::unbounded_channel::<SessionEvent>();
        let task_state = state.clone();
        let task = tokio::spawn(async move { submit(&task_state, request, &tx).await });

        let mut connected = true;
        while let Some(event) = rx.recv().await {
            let Ok(frame) = serde_json::to_string(&event) else {
                continue;
            };
            if sender.send(Message::Text(frame.into())).await.is_err() {
                connected = false;
                break;
            }
        }

        let done = match task.await {
            Ok(Ok((id, outcome))) => serde_json::json!({
                "type": "done",
                "session_id": id.to_string(),
                "degraded": outcome.degraded,
            }),
            Ok(Err(e)) => serde_json::json!({"type": "done", "error": e.user_message()}),
            Err(e) => {
                tracing::error!("Submission task failed: {}", e);
                serde_json::json!({"type": "done", "error": "Internal error"})
            }
        };

        if !connected || sender.send(Message::Text(done.to_string().into())).await.is_err() {
            break;
        }
    }
}
