//! MCP JSON-RPC 2.0 method dispatch.
//!
//! Transport-independent: SSE, stdio, and the plain POST endpoint all feed
//! requests through [`handle_message`] and deliver whatever it returns.
//!
//! Supported methods:
//! - `initialize` — protocol version + server identity
//! - `notifications/initialized` — client ack (no response)
//! - `ping` — protocol-level liveness (empty result)
//! - `tools/list` — the tool catalog with input schemas
//! - `tools/call` — execute a tool by name
//!
//! Tool failures become protocol-level JSON-RPC errors carrying the
//! classified code and the original message text, so a caller can always
//! distinguish bad input (-32602) from a missing resource (-32002), an
//! unreachable Splunk (-32003), or a remote-side failure (-32000).

use axum::Json;
use axum::extract::State;
use axum::http::StatusCode;
use serde_json::{Value, json};

use crate::state::AppState;
use crate::tools;

pub const PROTOCOL_VERSION: &str = "2024-11-05";

/// Plain HTTP POST endpoint handler. Notifications get an empty body back.
pub async fn mcp_handler(
    State(state): State<AppState>,
    Json(request): Json<Value>,
) -> (StatusCode, Json<Value>) {
    match handle_message(&state, &request).await {
        Some(response) => (StatusCode::OK, Json(response)),
        None => (StatusCode::OK, Json(json!({}))),
    }
}

/// Route a single JSON-RPC request. Returns `None` for notifications,
/// which expect no response on any transport.
pub async fn handle_message(state: &AppState, request: &Value) -> Option<Value> {
    let method = request.get("method").and_then(|m| m.as_str()).unwrap_or("");
    let id = request.get("id").cloned().unwrap_or(Value::Null);

    tracing::debug!(method = %method, "incoming JSON-RPC request");

    let response = match method {
        "initialize" => handle_initialize(&id),
        "notifications/initialized" => return None,
        "ping" => handle_ping(&id),
        "tools/list" => handle_tools_list(&id),
        "tools/call" => handle_tools_call(state, request, &id).await,
        _ => json_rpc_error(id, -32601, &format!("Method not found: {method}")),
    };

    Some(response)
}

// ── initialize ──────────────────────────────────────────────────────────────

fn handle_initialize(id: &Value) -> Value {
    json!({
        "jsonrpc": "2.0",
        "id": id,
        "result": {
            "protocolVersion": PROTOCOL_VERSION,
            "capabilities": {
                "tools": { "listChanged": false }
            },
            "serverInfo": {
                "name": tools::SERVER_NAME,
                "version": tools::VERSION
            }
        }
    })
}

// ── ping ────────────────────────────────────────────────────────────────────

fn handle_ping(id: &Value) -> Value {
    json!({
        "jsonrpc": "2.0",
        "id": id,
        "result": {}
    })
}

// ── tools/list ──────────────────────────────────────────────────────────────

fn handle_tools_list(id: &Value) -> Value {
    let tool_list: Vec<Value> = tools::catalog()
        .iter()
        .map(|t| {
            json!({
                "name": t.name,
                "description": t.description,
                "inputSchema": t.input_schema,
            })
        })
        .collect();

    json!({
        "jsonrpc": "2.0",
        "id": id,
        "result": {
            "tools": tool_list
        }
    })
}

// ── tools/call ──────────────────────────────────────────────────────────────

async fn handle_tools_call(state: &AppState, request: &Value, id: &Value) -> Value {
    let params = request.get("params").cloned().unwrap_or(json!({}));
    let tool_name = params.get("name").and_then(|n| n.as_str()).unwrap_or("");
    let arguments = params.get("arguments").cloned().unwrap_or(json!({}));

    if tool_name.is_empty() {
        return json_rpc_error(id.clone(), -32602, "Missing 'name' in params");
    }
    if !tools::is_known_tool(tool_name) {
        return json_rpc_error(
            id.clone(),
            -32601,
            &format!("Unknown tool: {tool_name}"),
        );
    }

    tracing::info!(tool = %tool_name, "tools/call");

    match tools::execute_tool(tool_name, &arguments, state).await {
        Ok(output) => {
            let text = serde_json::to_string_pretty(&output)
                .unwrap_or_else(|_| output.to_string());
            json!({
                "jsonrpc": "2.0",
                "id": id,
                "result": {
                    "content": [{ "type": "text", "text": text }],
                    "isError": false
                }
            })
        }
        Err(e) => {
            tracing::warn!(tool = %tool_name, error = %e, "tool call failed");
            json_rpc_error(id.clone(), e.code(), &e.to_string())
        }
    }
}

// ── JSON-RPC error helper ───────────────────────────────────────────────────

pub fn json_rpc_error(id: Value, code: i32, message: &str) -> Value {
    json!({
        "jsonrpc": "2.0",
        "id": id,
        "error": {
            "code": code,
            "message": message
        }
    })
}
