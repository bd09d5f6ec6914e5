//! Tool-level tests against a canned Splunk stand-in.
//!
//! A throwaway axum router on a loopback port plays the management API:
//! fixed JSON for known resources, Splunk-style 404 bodies for everything
//! else. Tools connect to it with a bearer token, so no login round-trip
//! is involved. Each test spawns its own server on an ephemeral port.

use std::sync::Arc;

use axum::extract::State;
use axum::http::{StatusCode, Uri};
use axum::routing::get;
use axum::{Json, Router};
use serde_json::{Value, json};
use tokio::sync::Mutex;

use splunk_mcp::config::{SearchMode, SplunkConfig};
use splunk_mcp::error::ToolError;
use splunk_mcp::state::AppState;
use splunk_mcp::tools;

/// Request paths seen by the stand-in, as received on the wire.
#[derive(Clone, Default)]
struct Recorded(Arc<Mutex<Vec<String>>>);

async fn index_main() -> Json<Value> {
    Json(json!({
        "entry": [{
            "name": "main",
            "acl": { "app": "system" },
            "content": {
                "totalEventCount": "12345",
                "currentDBSizeMB": "128",
                "maxTotalDataSizeMB": "500000",
                "minTime": "2024-01-01T00:00:00+00:00",
                "maxTime": "2024-06-01T00:00:00+00:00"
            }
        }]
    }))
}

async fn index_broken() -> (StatusCode, Json<Value>) {
    (
        StatusCode::SERVICE_UNAVAILABLE,
        Json(json!({
            "messages": [{ "type": "ERROR", "text": "KV store initialization has failed" }]
        })),
    )
}

async fn apps_local() -> Json<Value> {
    Json(json!({
        "entry": [
            { "name": "search", "content": { "label": "Search & Reporting", "version": "9.2.1" } },
            { "name": "launcher", "content": {} },
            { "content": { "label": "nameless, must be skipped" } }
        ]
    }))
}

async fn not_found(State(recorded): State<Recorded>, uri: Uri) -> (StatusCode, Json<Value>) {
    recorded.0.lock().await.push(uri.path().to_string());
    (
        StatusCode::NOT_FOUND,
        Json(json!({
            "messages": [{ "type": "ERROR", "text": "Could not find object" }]
        })),
    )
}

/// Bind the stand-in on an ephemeral loopback port and return a state
/// pointing at it, plus the recorded-paths handle.
async fn splunk_stand_in() -> (AppState, Recorded) {
    let recorded = Recorded::default();
    let app = Router::new()
        .route("/services/data/indexes/main", get(index_main))
        .route("/services/data/indexes/broken", get(index_broken))
        .route("/services/apps/local", get(apps_local))
        .fallback(not_found)
        .with_state(recorded.clone());

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    let state = AppState::new(SplunkConfig {
        host: "127.0.0.1".to_string(),
        port,
        scheme: "http".to_string(),
        username: "admin".to_string(),
        password: "changeme".to_string(),
        token: Some("test-token".to_string()),
        verify_ssl: true,
        mcp_port: 8000,
        debug: false,
        search_mode: SearchMode::Blocking,
    });
    (state, recorded)
}

#[tokio::test]
async fn known_index_is_reshaped() {
    let (state, _) = splunk_stand_in().await;
    let info = tools::execute_tool("get_index_info", &json!({ "index_name": "main" }), &state)
        .await
        .unwrap();
    assert_eq!(info["name"], "main");
    assert_eq!(info["total_event_count"], "12345");
    assert_eq!(info["current_size"], "128");
}

#[tokio::test]
async fn unknown_index_is_not_found_not_remote() {
    let (state, _) = splunk_stand_in().await;
    let err = tools::execute_tool("get_index_info", &json!({ "index_name": "missing" }), &state)
        .await
        .unwrap_err();
    assert!(matches!(err, ToolError::NotFound(_)));
    assert_eq!(err.code(), -32002);
    assert_eq!(err.to_string(), "Index not found: missing");
}

#[tokio::test]
async fn remote_failure_keeps_its_own_class() {
    let (state, _) = splunk_stand_in().await;
    let err = tools::execute_tool("get_index_info", &json!({ "index_name": "broken" }), &state)
        .await
        .unwrap_err();
    assert!(matches!(err, ToolError::Remote { status: 503, .. }));
    assert_eq!(err.code(), -32000);
    assert!(err.to_string().contains("KV store initialization has failed"));
}

#[tokio::test]
async fn health_check_app_count_matches_app_list() {
    let (state, _) = splunk_stand_in().await;
    let health = tools::execute_tool("health_check", &json!({}), &state)
        .await
        .unwrap();

    assert_eq!(health["status"], "healthy");
    let apps = health["apps"].as_array().unwrap();
    assert_eq!(health["apps_count"], apps.len());
    // The nameless entry is skipped, the rest survive.
    assert_eq!(apps.len(), 2);
    assert_eq!(apps[0]["name"], "search");
    assert_eq!(apps[0]["label"], "Search & Reporting");
    assert_eq!(apps[1]["label"], "launcher");
    assert_eq!(health["connection"]["host"], "127.0.0.1");
    assert_eq!(health["connection"]["username"], "admin");
}

#[tokio::test]
async fn resource_names_are_encoded_in_request_paths() {
    let (state, recorded) = splunk_stand_in().await;
    let err = tools::execute_tool(
        "get_index_info",
        &json!({ "index_name": "prod/metrics A" }),
        &state,
    )
    .await
    .unwrap_err();
    assert!(matches!(err, ToolError::NotFound(_)));

    let paths = recorded.0.lock().await;
    assert!(
        paths
            .iter()
            .any(|p| p == "/services/data/indexes/prod%2Fmetrics%20A"),
        "paths seen: {paths:?}"
    );
}
