//! Environment-sourced configuration.
//!
//! All settings come from the process environment (optionally seeded from a
//! `.env` file by `main`). There is no config file layer — the deployment
//! story is container env vars, same as the Splunk connection itself.

use std::env;

/// How search jobs are executed against Splunk.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchMode {
    /// `exec_mode=blocking` — the job creation call returns when the job is
    /// done. This is the production path.
    Blocking,
    /// Legacy variant: `exec_mode=normal` plus a manual poll-with-timeout
    /// loop. Kept selectable for environments where blocking dispatch
    /// misbehaves behind proxies.
    Poll,
}

/// Connection + server settings resolved once at startup.
#[derive(Debug, Clone)]
pub struct SplunkConfig {
    pub host: String,
    pub port: u16,
    pub scheme: String,
    pub username: String,
    pub password: String,
    /// Bearer token; takes precedence over username/password when set.
    pub token: Option<String>,
    /// When false, certificate validation and hostname checking are both
    /// disabled. Accepted trade-off for lab/dev deployments.
    pub verify_ssl: bool,
    /// Listening port for the SSE transport.
    pub mcp_port: u16,
    pub debug: bool,
    pub search_mode: SearchMode,
}

impl SplunkConfig {
    pub fn from_env() -> Self {
        let host = env::var("SPLUNK_HOST").unwrap_or_else(|_| "localhost".to_string());
        let port = env_u16("SPLUNK_PORT", 8089);
        let scheme = env::var("SPLUNK_SCHEME").unwrap_or_else(|_| "https".to_string());
        let username = env::var("SPLUNK_USERNAME").unwrap_or_else(|_| "admin".to_string());
        let password = env::var("SPLUNK_PASSWORD").unwrap_or_else(|_| "admin".to_string());
        let token = env::var("SPLUNK_TOKEN").ok().filter(|t| !t.is_empty());
        let verify_ssl = env_bool("VERIFY_SSL", true);
        let mcp_port = env_u16("MCP_PORT", 8000);
        let debug = env_bool("DEBUG", false);
        let search_mode = match env::var("SPLUNK_SEARCH_MODE").as_deref() {
            Ok("poll") => SearchMode::Poll,
            _ => SearchMode::Blocking,
        };

        Self {
            host,
            port,
            scheme,
            username,
            password,
            token,
            verify_ssl,
            mcp_port,
            debug,
            search_mode,
        }
    }

    /// Base URL of the Splunk management API, no trailing slash.
    pub fn base_url(&self) -> String {
        format!("{}://{}:{}", self.scheme, self.host, self.port)
    }
}

fn env_u16(key: &str, default: u16) -> u16 {
    env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

fn env_bool(key: &str, default: bool) -> bool {
    match env::var(key) {
        Ok(v) => matches!(v.to_lowercase().as_str(), "true" | "1" | "yes"),
        Err(_) => default,
    }
}
