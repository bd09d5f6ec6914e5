//! Application state.
//!
//! Deliberately small: tool calls are stateless and build their own Splunk
//! connection per invocation, so the only shared mutable state is the SSE
//! session registry (the send-halves of open event streams).

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;

use tokio::sync::{RwLock, mpsc};

use crate::config::SplunkConfig;

/// Central application state. Clone-friendly — all fields are Arc.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<SplunkConfig>,
    pub start_time: Instant,
    /// Open SSE sessions: session id → sender for serialized JSON-RPC
    /// responses. Entries are dropped when a push fails (client went away).
    sse_sessions: Arc<RwLock<HashMap<String, mpsc::Sender<String>>>>,
}

impl AppState {
    pub fn new(config: SplunkConfig) -> Self {
        Self {
            config: Arc::new(config),
            start_time: Instant::now(),
            sse_sessions: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    pub async fn register_session(&self, session_id: String, tx: mpsc::Sender<String>) {
        self.sse_sessions.write().await.insert(session_id, tx);
    }

    pub async fn remove_session(&self, session_id: &str) {
        if self.sse_sessions.write().await.remove(session_id).is_some() {
            tracing::debug!(session_id, "SSE session removed");
        }
    }

    /// Push a serialized response onto a session's event stream.
    /// Returns false when the session is unknown or the client disconnected
    /// (in which case the stale entry is dropped).
    pub async fn push_to_session(&self, session_id: &str, payload: String) -> bool {
        let tx = {
            let sessions = self.sse_sessions.read().await;
            sessions.get(session_id).cloned()
        };
        match tx {
            Some(tx) => {
                if tx.send(payload).await.is_err() {
                    self.remove_session(session_id).await;
                    false
                } else {
                    true
                }
            }
            None => false,
        }
    }

    pub async fn has_session(&self, session_id: &str) -> bool {
        self.sse_sessions.read().await.contains_key(session_id)
    }

    pub async fn session_count(&self) -> usize {
        self.sse_sessions.read().await.len()
    }
}
