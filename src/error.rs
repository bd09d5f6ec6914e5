//! Tool-layer error taxonomy.
//!
//! Four classes, each surfaced to MCP clients as a protocol-level JSON-RPC
//! error with a class-specific code so callers can tell validation mistakes
//! apart from missing resources and remote failures.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ToolError {
    /// Request rejected before any remote call (empty query, missing or
    /// malformed parameter).
    #[error("{0}")]
    Validation(String),

    /// The named remote resource does not exist (unknown index, user,
    /// collection).
    #[error("{0}")]
    NotFound(String),

    /// Network / TLS / authentication failure while reaching Splunk.
    #[error("failed to connect to Splunk at {url}: {message}")]
    Connection { url: String, message: String },

    /// Splunk accepted the connection but rejected or failed the request
    /// (bad search syntax, job failure, permission error).
    #[error("Splunk returned HTTP {status}: {message}")]
    Remote { status: u16, message: String },
}

impl ToolError {
    /// JSON-RPC 2.0 error code for this class.
    pub fn code(&self) -> i32 {
        match self {
            ToolError::Validation(_) => -32602,
            ToolError::NotFound(_) => -32002,
            ToolError::Connection { .. } => -32003,
            ToolError::Remote { .. } => -32000,
        }
    }
}
