//! SSE transport.
//!
//! `GET /sse` opens an event stream: the first event (`endpoint`) tells the
//! client where to POST its JSON-RPC requests, including a fresh session id.
//! Every request arriving on `POST /messages?session_id=...` is acknowledged
//! with `202 Accepted` and answered asynchronously over the event stream.

use std::convert::Infallible;

use axum::Json;
use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::sse::{Event, KeepAlive, Sse};
use serde::Deserialize;
use serde_json::{Value, json};
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;
use tokio_stream::{Stream, StreamExt};
use uuid::Uuid;

use crate::mcp::server;
use crate::state::AppState;

const SESSION_CHANNEL_CAPACITY: usize = 32;

/// Evicts the session from the registry when the event stream is dropped,
/// so a client that opens `/sse` and walks away without ever receiving a
/// message does not leak its registry entry.
struct SessionGuard {
    state: AppState,
    session_id: String,
}

impl Drop for SessionGuard {
    fn drop(&mut self) {
        let state = self.state.clone();
        let session_id = std::mem::take(&mut self.session_id);
        tokio::spawn(async move {
            state.remove_session(&session_id).await;
        });
    }
}

/// `GET /sse` — open an event stream and register its session.
pub async fn sse_handler(
    State(state): State<AppState>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let session_id = Uuid::new_v4().to_string();
    let (tx, rx) = mpsc::channel::<String>(SESSION_CHANNEL_CAPACITY);
    state.register_session(session_id.clone(), tx).await;
    tracing::info!(session_id = %session_id, "SSE session opened");

    let guard = SessionGuard {
        state: state.clone(),
        session_id: session_id.clone(),
    };
    let endpoint = format!("/messages?session_id={session_id}");
    let stream = tokio_stream::once(Ok(Event::default().event("endpoint").data(endpoint)))
        .chain(ReceiverStream::new(rx).map(move |payload| {
            let _ = &guard;
            Ok(Event::default().event("message").data(payload))
        }));

    Sse::new(stream).keep_alive(KeepAlive::default())
}

#[derive(Deserialize)]
pub struct MessagesQuery {
    pub session_id: String,
}

/// `POST /messages` — accept a JSON-RPC request for an open session.
///
/// The HTTP response only acknowledges receipt; the JSON-RPC response (if
/// the request is not a notification) goes out over the session's event
/// stream. Unknown session ids are rejected up front.
pub async fn messages_handler(
    State(state): State<AppState>,
    Query(query): Query<MessagesQuery>,
    Json(request): Json<Value>,
) -> (StatusCode, Json<Value>) {
    let session_id = query.session_id;
    if !state.has_session(&session_id).await {
        return (
            StatusCode::NOT_FOUND,
            Json(json!({ "error": "unknown session" })),
        );
    }

    if let Some(response) = server::handle_message(&state, &request).await {
        match serde_json::to_string(&response) {
            Ok(payload) => {
                if !state.push_to_session(&session_id, payload).await {
                    tracing::warn!(session_id = %session_id, "session closed before response delivery");
                }
            }
            Err(e) => {
                tracing::error!(error = %e, "could not serialize JSON-RPC response");
            }
        }
    }

    (StatusCode::ACCEPTED, Json(json!({ "status": "accepted" })))
}
