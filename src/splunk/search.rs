//! Search job execution.
//!
//! The production path creates the job with `exec_mode=blocking`, so the
//! dispatch call itself waits for completion and the results fetch is a
//! single follow-up GET. A legacy polled variant (`exec_mode=normal` plus a
//! wait-with-timeout loop) is kept selectable via `SPLUNK_SEARCH_MODE=poll`.
//! Search errors (bad syntax, job failure) propagate unchanged.

use std::time::Duration;

use serde_json::Value;
use tokio::time::{Instant, sleep};

use crate::config::SearchMode;
use crate::error::ToolError;

use super::client::SplunkClient;

const POLL_INTERVAL: Duration = Duration::from_millis(500);
const POLL_TIMEOUT: Duration = Duration::from_secs(60);

#[derive(Debug, Clone)]
pub struct SearchOptions {
    pub earliest_time: String,
    pub latest_time: String,
    pub max_results: u64,
}

impl Default for SearchOptions {
    fn default() -> Self {
        Self {
            earliest_time: "-24h".to_string(),
            latest_time: "now".to_string(),
            max_results: 100,
        }
    }
}

/// Run a search in the configured execution mode and return up to
/// `max_results` JSON-decoded result records.
pub async fn run(
    client: &SplunkClient,
    mode: SearchMode,
    query: &str,
    options: &SearchOptions,
) -> Result<Vec<Value>, ToolError> {
    match mode {
        SearchMode::Blocking => run_blocking(client, query, options).await,
        SearchMode::Poll => run_polled(client, query, options, POLL_TIMEOUT).await,
    }
}

/// Blocking dispatch: job creation returns once the job has finished.
pub async fn run_blocking(
    client: &SplunkClient,
    query: &str,
    options: &SearchOptions,
) -> Result<Vec<Value>, ToolError> {
    let sid = create_job(client, query, options, "blocking").await?;
    fetch_results(client, &sid, options.max_results).await
}

/// Legacy polled dispatch: create the job asynchronously and poll its status
/// until `isDone`, `FAILED`, or the timeout elapses.
pub async fn run_polled(
    client: &SplunkClient,
    query: &str,
    options: &SearchOptions,
    timeout: Duration,
) -> Result<Vec<Value>, ToolError> {
    let sid = create_job(client, query, options, "normal").await?;
    let deadline = Instant::now() + timeout;

    loop {
        let status = client
            .get_json(&format!("/services/search/jobs/{sid}"), &[])
            .await?;

        if job_failed(&status) {
            return Err(ToolError::Remote {
                status: 200,
                message: format!("search job {sid} failed"),
            });
        }
        if job_is_done(&status) {
            break;
        }
        if Instant::now() >= deadline {
            return Err(ToolError::Remote {
                status: 200,
                message: format!(
                    "search job {sid} did not complete within {}s",
                    timeout.as_secs()
                ),
            });
        }
        sleep(POLL_INTERVAL).await;
    }

    fetch_results(client, &sid, options.max_results).await
}

async fn create_job(
    client: &SplunkClient,
    query: &str,
    options: &SearchOptions,
    exec_mode: &str,
) -> Result<String, ToolError> {
    tracing::info!(query, exec_mode, "dispatching search job");
    let response = client
        .post_form(
            "/services/search/jobs",
            &[
                ("search", query),
                ("earliest_time", &options.earliest_time),
                ("latest_time", &options.latest_time),
                ("exec_mode", exec_mode),
            ],
        )
        .await?;

    response
        .get("sid")
        .and_then(|s| s.as_str())
        .map(String::from)
        .ok_or(ToolError::Remote {
            status: 200,
            message: "job creation response carried no sid".to_string(),
        })
}

async fn fetch_results(
    client: &SplunkClient,
    sid: &str,
    max_results: u64,
) -> Result<Vec<Value>, ToolError> {
    let count = max_results.to_string();
    let response = client
        .get_json(
            &format!("/services/search/jobs/{sid}/results"),
            &[("count", count.as_str())],
        )
        .await?;

    Ok(response
        .get("results")
        .and_then(|r| r.as_array())
        .cloned()
        .unwrap_or_default())
}

/// Splunk encodes `isDone` as a bool or as the string "1" depending on
/// release; accept either.
fn job_is_done(status: &Value) -> bool {
    match status.pointer("/entry/0/content/isDone") {
        Some(Value::Bool(b)) => *b,
        Some(Value::String(s)) => s == "1",
        _ => false,
    }
}

fn job_failed(status: &Value) -> bool {
    status
        .pointer("/entry/0/content/dispatchState")
        .and_then(|d| d.as_str())
        .is_some_and(|d| d == "FAILED")
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn status(is_done: Value, dispatch_state: &str) -> Value {
        json!({
            "entry": [{
                "name": "search_job",
                "content": { "isDone": is_done, "dispatchState": dispatch_state }
            }]
        })
    }

    #[test]
    fn is_done_accepts_both_encodings() {
        assert!(job_is_done(&status(json!(true), "DONE")));
        assert!(job_is_done(&status(json!("1"), "DONE")));
        assert!(!job_is_done(&status(json!(false), "RUNNING")));
        assert!(!job_is_done(&status(json!("0"), "RUNNING")));
        assert!(!job_is_done(&json!({})));
    }

    #[test]
    fn failed_only_on_failed_dispatch_state() {
        assert!(job_failed(&status(json!(false), "FAILED")));
        assert!(!job_failed(&status(json!(false), "RUNNING")));
        assert!(!job_failed(&json!({})));
    }
}
