//! Connection factory and REST plumbing for the Splunk management API.
//!
//! One `SplunkClient` is built per tool invocation — no pooling, no reuse
//! across calls. Credential modes: bearer token (takes precedence) or
//! username/password via `/services/auth/login`. All requests carry
//! `output_mode=json`; non-2xx responses are classified into the
//! [`ToolError`] taxonomy with Splunk's own message text when present.

use std::time::Duration;

use reqwest::{Client, Method, StatusCode};
use serde_json::{Map, Value};

use crate::config::SplunkConfig;
use crate::error::ToolError;

const CONNECT_TIMEOUT: Duration = Duration::from_secs(5);
const REQUEST_TIMEOUT: Duration = Duration::from_secs(120);

pub struct SplunkClient {
    http: Client,
    base_url: String,
    auth_header: String,
}

impl SplunkClient {
    /// Connect to Splunk: build an HTTP client honoring the TLS policy and
    /// resolve an Authorization header. Username/password mode performs the
    /// login round-trip immediately so auth failures surface here, not on
    /// the first real request. No retry on any failure.
    pub async fn connect(config: &SplunkConfig) -> Result<Self, ToolError> {
        let base_url = config.base_url();

        let mut builder = Client::builder()
            .connect_timeout(CONNECT_TIMEOUT)
            .timeout(REQUEST_TIMEOUT);
        if !config.verify_ssl {
            builder = builder
                .danger_accept_invalid_certs(true)
                .danger_accept_invalid_hostnames(true);
        }
        let http = builder.build().map_err(|e| ToolError::Connection {
            url: base_url.clone(),
            message: e.to_string(),
        })?;

        let auth_header = match &config.token {
            Some(token) => format!("Bearer {token}"),
            None => {
                let session_key = login(&http, &base_url, &config.username, &config.password).await?;
                format!("Splunk {session_key}")
            }
        };

        tracing::debug!(url = %base_url, username = %config.username, "connected to Splunk");

        Ok(Self {
            http,
            base_url,
            auth_header,
        })
    }

    /// GET a management endpoint, JSON-decoded.
    pub async fn get_json(
        &self,
        path: &str,
        query: &[(&str, &str)],
    ) -> Result<Value, ToolError> {
        self.request(Method::GET, path, query, &[]).await
    }

    /// POST a form to a management endpoint, JSON-decoded response.
    pub async fn post_form(
        &self,
        path: &str,
        params: &[(&str, &str)],
    ) -> Result<Value, ToolError> {
        self.request(Method::POST, path, &[], params).await
    }

    /// DELETE a management resource.
    pub async fn delete(&self, path: &str) -> Result<(), ToolError> {
        self.request(Method::DELETE, path, &[], &[]).await?;
        Ok(())
    }

    async fn request(
        &self,
        method: Method,
        path: &str,
        query: &[(&str, &str)],
        form: &[(&str, &str)],
    ) -> Result<Value, ToolError> {
        let url = format!("{}{}", self.base_url, path);

        let mut req = self
            .http
            .request(method.clone(), &url)
            .header("Authorization", &self.auth_header)
            .query(&[("output_mode", "json")])
            .query(query);
        if !form.is_empty() {
            let mut body: Vec<(&str, &str)> = form.to_vec();
            body.push(("output_mode", "json"));
            req = req.form(&body);
        }

        let response = req.send().await.map_err(|e| ToolError::Connection {
            url: url.clone(),
            message: e.to_string(),
        })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let message = extract_splunk_message(&body)
                .unwrap_or_else(|| truncate(&body, 500));
            if status == StatusCode::NOT_FOUND {
                return Err(ToolError::NotFound(message));
            }
            return Err(ToolError::Remote {
                status: status.as_u16(),
                message,
            });
        }

        // Some mutations return an empty body on success.
        let body = response.text().await.map_err(|e| ToolError::Connection {
            url,
            message: e.to_string(),
        })?;
        if body.trim().is_empty() {
            return Ok(Value::Null);
        }
        serde_json::from_str(&body).map_err(|e| ToolError::Remote {
            status: status.as_u16(),
            message: format!("response is not valid JSON: {e}"),
        })
    }
}

async fn login(
    http: &Client,
    base_url: &str,
    username: &str,
    password: &str,
) -> Result<String, ToolError> {
    let url = format!("{base_url}/services/auth/login");
    let response = http
        .post(&url)
        .form(&[
            ("username", username),
            ("password", password),
            ("output_mode", "json"),
        ])
        .send()
        .await
        .map_err(|e| ToolError::Connection {
            url: url.clone(),
            message: e.to_string(),
        })?;

    let status = response.status();
    let body = response.text().await.unwrap_or_default();
    if !status.is_success() {
        let message = extract_splunk_message(&body)
            .unwrap_or_else(|| format!("login rejected with HTTP {status}"));
        return Err(ToolError::Connection { url, message });
    }

    let parsed: Value = serde_json::from_str(&body).map_err(|e| ToolError::Connection {
        url: url.clone(),
        message: format!("login response is not valid JSON: {e}"),
    })?;
    parsed
        .get("sessionKey")
        .and_then(|k| k.as_str())
        .map(String::from)
        .ok_or(ToolError::Connection {
            url,
            message: "login response carried no sessionKey".to_string(),
        })
}

/// Pull `messages[0].text` out of a Splunk error body, if it is one.
fn extract_splunk_message(body: &str) -> Option<String> {
    let parsed: Value = serde_json::from_str(body).ok()?;
    parsed
        .pointer("/messages/0/text")
        .and_then(|t| t.as_str())
        .map(String::from)
}

fn truncate(s: &str, max_len: usize) -> String {
    if s.len() <= max_len {
        s.to_string()
    } else {
        let boundary = s
            .char_indices()
            .take_while(|(i, _)| *i < max_len)
            .last()
            .map(|(i, c)| i + c.len_utf8())
            .unwrap_or(max_len);
        format!("{}...", &s[..boundary])
    }
}

// ── Canonical resource record ───────────────────────────────────────────────

/// One entry of an Atom-style listing response, adapted at the boundary.
/// Tools reshape from this — never from raw listing JSON — so release-to-
/// release differences in Splunk's entity encoding stay contained here.
#[derive(Debug, Clone)]
pub struct ResourceEntry {
    pub name: String,
    /// Owning app from the entry ACL, when present.
    pub app: Option<String>,
    pub content: Map<String, Value>,
}

impl ResourceEntry {
    /// Adapt a listing response (`{"entry": [...]}`). Entries without a
    /// string `name` are malformed and skipped with a warning.
    pub fn from_listing(response: &Value) -> Vec<ResourceEntry> {
        let Some(entries) = response.get("entry").and_then(|e| e.as_array()) else {
            return Vec::new();
        };
        entries
            .iter()
            .filter_map(|entry| match Self::from_entry(entry) {
                Some(e) => Some(e),
                None => {
                    tracing::warn!("skipping malformed listing entry: missing name");
                    None
                }
            })
            .collect()
    }

    fn from_entry(entry: &Value) -> Option<ResourceEntry> {
        let name = entry.get("name")?.as_str()?.to_string();
        let app = entry
            .pointer("/acl/app")
            .and_then(|a| a.as_str())
            .map(String::from);
        let content = entry
            .get("content")
            .and_then(|c| c.as_object())
            .cloned()
            .unwrap_or_default();
        Some(ResourceEntry { name, app, content })
    }

    /// String field, or `default` when absent, null, or empty.
    pub fn string_or(&self, key: &str, default: &str) -> String {
        match self.content.get(key) {
            Some(Value::String(s)) if !s.is_empty() => s.clone(),
            Some(Value::Number(n)) => n.to_string(),
            _ => default.to_string(),
        }
    }

    /// String field converted for numeric metadata Splunk encodes either
    /// way; `None` when absent.
    pub fn string_field(&self, key: &str) -> Option<String> {
        match self.content.get(key) {
            Some(Value::String(s)) => Some(s.clone()),
            Some(Value::Number(n)) => Some(n.to_string()),
            _ => None,
        }
    }

    /// List field normalized from Splunk's three encodings: absent/null →
    /// empty, bare string → one-element list, array → strings.
    pub fn list_field(&self, key: &str) -> Vec<String> {
        match self.content.get(key) {
            Some(Value::String(s)) => vec![s.clone()],
            Some(Value::Array(items)) => items
                .iter()
                .filter_map(|i| i.as_str().map(String::from))
                .collect(),
            _ => Vec::new(),
        }
    }
}
