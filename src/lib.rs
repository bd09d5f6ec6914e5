pub mod config;
pub mod error;
pub mod mcp;
pub mod openapi;
pub mod splunk;
pub mod state;
pub mod tools;

use axum::Json;
use axum::extract::State;
use axum::http::{Method, header};
use axum::routing::{get, post};
use axum::Router;
use serde_json::{Value, json};
use tower_http::cors::{Any, CorsLayer};
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::trace::TraceLayer;

use state::AppState;

/// Build the application router with the given state.
/// Extracted from `main()` so integration tests can construct the app
/// without binding to a network port.
pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION]);

    Router::new()
        // MCP transports
        .route("/sse", get(mcp::sse::sse_handler))
        .route("/messages", post(mcp::sse::messages_handler))
        .route("/mcp", post(mcp::server::mcp_handler))
        // Introspection
        .route("/openapi.json", get(openapi::openapi_handler))
        .route("/health", get(health))
        .layer(RequestBodyLimitLayer::new(1024 * 1024))
        .layer(cors)
        .layer(
            TraceLayer::new_for_http().make_span_with(|request: &axum::http::Request<_>| {
                tracing::info_span!(
                    "http_request",
                    method = %request.method(),
                    uri = %request.uri(),
                )
            }),
        )
        .with_state(state)
}

/// Process liveness only — no Splunk round-trip. Connectivity is the
/// `health_check` tool's job.
async fn health(State(state): State<AppState>) -> Json<Value> {
    Json(json!({
        "status": "ok",
        "service": tools::SERVER_NAME,
        "version": tools::VERSION,
        "uptime_seconds": state.start_time.elapsed().as_secs(),
        "sse_sessions": state.session_count().await,
    }))
}
