//! Search Assistant HTTP Server
//!
//! Axum-based server providing REST API and WebSocket endpoints for the
//! tool-augmented search assistant, plus the WASM frontend from `static/`.

mod handlers;
mod state;

use axum::{routing::{get, post}, Router};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use assistant_core::{CredentialProvider, SuppliedSecret};
use assistant_runtime::AssistantConfig;

use crate::handlers::{
    chat_handler, chat_stream_handler, create_session, get_config, get_transcript, health_check,
};
use crate::state::AppState;

fn router(state: AppState) -> Router {
    // CORS configuration
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        // Health & info
        .route("/health", get(health_check))
        .route("/api/config", get(get_config))

        // Sessions
        .route("/api/sessions", post(create_session))
        .route("/api/sessions/{id}/transcript", get(get_transcript))

        // Agent API
        .route("/api/chat", post(chat_handler))
        .route("/api/chat/stream", get(chat_stream_handler))

        // Static files (WASM frontend)
        .fallback_service(tower_http::services::ServeDir::new("static"))

        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info,tower_http=debug".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load environment
    dotenvy::dotenv().ok();

    let config = AssistantConfig::from_env();
    let credentials = CredentialProvider::groq();

    if credentials.get_key(&SuppliedSecret(None)).is_some() {
        tracing::info!("✓ {} found in environment", credentials.env_var());
    } else {
        tracing::warn!("⚠ {} not set - each request must supply a key from the sidebar", credentials.env_var());
    }

    tracing::info!(
        model = %config.model,
        max_iterations = config.max_iterations,
        arxiv_top_k = config.arxiv.top_k_results,
        web_max_results = config.web.max_results,
        "Configuration loaded"
    );

    let addr = config.bind_addr.clone();
    let app = router(AppState::new(config, credentials));

    // Start server
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    tracing::info!("══════════════════════════════════════════════════");
    tracing::info!("🔎 search assistant running on http://{}", addr);
    tracing::info!("══════════════════════════════════════════════════");
    tracing::info!("");
    tracing::info!("Endpoints:");
    tracing::info!("  GET  /health                        - Health check");
    tracing::info!("  GET  /api/config                    - Display title");
    tracing::info!("  POST /api/sessions                  - Start a session");
    tracing::info!("  GET  /api/sessions/{{id}}/transcript  - Session transcript");
    tracing::info!("  POST /api/chat                      - Send message");
    tracing::info!("  GET  /api/chat/stream               - WebSocket streaming");
    tracing::info!("");

    axum::serve(listener, app).await?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::{Body, to_bytes};
    use axum::http::{Request, StatusCode};
    use tower::ServiceExt;

    fn app() -> Router {
        router(AppState::new(
            AssistantConfig::default(),
            CredentialProvider::groq().with_lookup(|_| None),
        ))
    }

    async fn json_body(response: axum::response::Response) -> serde_json::Value {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_config_route_returns_title() {
        let response = app()
            .oneshot(Request::get("/api/config").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = json_body(response).await;
        assert_eq!(body["title"], "AI Search Engine: Context Aware Agent");
    }

    #[tokio::test]
    async fn test_health_route_reports_missing_key() {
        let response = app()
            .oneshot(Request::get("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();

        let body = json_body(response).await;
        assert_eq!(body["status"], "healthy");
        assert_eq!(body["credential_configured"], false);
        assert!(body["provider_reachable"].is_null());
    }

    #[tokio::test]
    async fn test_chat_route_without_key_is_401() {
        let request = Request::post("/api/chat")
            .header("content-type", "application/json")
            .body(Body::from(r#"{"message": "hello"}"#))
            .unwrap();

        let response = app().oneshot(request).await.unwrap();

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        let body = json_body(response).await;
        assert_eq!(body["code"], "MISSING_CREDENTIAL");
    }

    #[tokio::test]
    async fn test_session_routes() {
        let app = app();
        let response = app
            .clone()
            .oneshot(Request::post("/api/sessions").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::CREATED);
        let id = json_body(response).await["session_id"].as_str().unwrap().to_string();

        let response = app
            .oneshot(
                Request::get(format!("/api/sessions/{}/transcript", id))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(json_body(response).await["turns"], serde_json::json!([]));
    }
}
