//! stdio transport.
//!
//! Line-delimited JSON-RPC: one request per stdin line, one response per
//! stdout line, flushed immediately. Notifications produce no output.
//! Logging must go to stderr in this mode — stdout is the protocol channel.

use anyhow::Result;
use serde_json::Value;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};

use crate::mcp::server;
use crate::state::AppState;

/// Serve JSON-RPC over stdin/stdout until stdin reaches EOF.
pub async fn run(state: AppState) -> Result<()> {
    let stdin = BufReader::new(tokio::io::stdin());
    let mut lines = stdin.lines();
    let mut stdout = tokio::io::stdout();

    tracing::info!("stdio transport ready");

    while let Some(line) = lines.next_line().await? {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        let request: Value = match serde_json::from_str(line) {
            Ok(v) => v,
            Err(e) => {
                tracing::warn!(error = %e, "discarding unparseable input line");
                let response =
                    server::json_rpc_error(Value::Null, -32700, &format!("Parse error: {e}"));
                write_line(&mut stdout, &response).await?;
                continue;
            }
        };

        if let Some(response) = server::handle_message(&state, &request).await {
            write_line(&mut stdout, &response).await?;
        }
    }

    tracing::info!("stdin closed, stdio transport shutting down");
    Ok(())
}

async fn write_line(stdout: &mut tokio::io::Stdout, response: &Value) -> Result<()> {
    let mut payload = serde_json::to_string(response)?;
    payload.push('\n');
    stdout.write_all(payload.as_bytes()).await?;
    stdout.flush().await?;
    Ok(())
}
