//! Tool catalog and execution.
//!
//! Every tool: (a) builds its own Splunk connection, (b) issues one or more
//! management API calls, (c) reshapes the response into a flat
//! JSON-serializable value, (d) returns it or a classified [`ToolError`].
//! Calls are independent and stateless — nothing is cached between them.
//!
//! Catalog:
//! - `search_splunk` — run a search query, blocking until the job finishes
//! - `list_indexes` / `get_index_info` / `get_index_metadata`
//! - `list_saved_searches`
//! - `current_user` / `list_users`
//! - `list_kvstore_collections` / `create_kvstore_collection` / `delete_kvstore_collection`
//! - `health_check` / `health` — connectivity probe + app inventory
//! - `get_indexes_and_sourcetypes` — index list joined with a tstats search
//! - `list_tools` — the catalog itself
//! - `ping` — static liveness signal, no remote call

use std::collections::HashMap;

use chrono::Utc;
use serde_json::{Map, Value, json};

use crate::error::ToolError;
use crate::splunk::client::{ResourceEntry, SplunkClient};
use crate::splunk::search::{self, SearchOptions};
use crate::state::AppState;

pub const SERVER_NAME: &str = "splunk-mcp";
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Central dispatcher — routes a tool call to the appropriate handler.
pub async fn execute_tool(
    name: &str,
    args: &Value,
    state: &AppState,
) -> Result<Value, ToolError> {
    match name {
        "search_splunk" => {
            let query = require_str(args, "search_query")?;
            let options = SearchOptions {
                earliest_time: args["earliest_time"].as_str().unwrap_or("-24h").to_string(),
                latest_time: args["latest_time"].as_str().unwrap_or("now").to_string(),
                max_results: args["max_results"].as_u64().unwrap_or(100),
            };
            search_splunk(state, query, &options).await
        }
        "list_indexes" => list_indexes(state).await,
        "get_index_info" | "get_index_metadata" => {
            let index_name = require_str(args, "index_name")?;
            get_index_info(state, index_name).await
        }
        "list_saved_searches" => list_saved_searches(state).await,
        "current_user" => current_user(state).await,
        "list_users" => list_users(state).await,
        "list_kvstore_collections" => list_kvstore_collections(state).await,
        "create_kvstore_collection" => {
            let collection = require_str(args, "collection_name")?;
            let app = require_str(args, "app_name")?;
            let fields = args
                .get("fields")
                .and_then(|f| f.as_object())
                .cloned()
                .unwrap_or_default();
            create_kvstore_collection(state, collection, app, &fields).await
        }
        "delete_kvstore_collection" => {
            let collection = require_str(args, "collection_name")?;
            let app = require_str(args, "app_name")?;
            delete_kvstore_collection(state, collection, app).await
        }
        "health_check" | "health" => health_check(state).await,
        "get_indexes_and_sourcetypes" => get_indexes_and_sourcetypes(state).await,
        "list_tools" => Ok(list_tools()),
        "ping" => Ok(ping()),
        _ => Err(ToolError::Validation(format!("Unknown tool: {name}"))),
    }
}

/// Whether `name` is in the catalog (including aliases).
pub fn is_known_tool(name: &str) -> bool {
    catalog().iter().any(|t| t.name == name)
}

fn require_str<'a>(args: &'a Value, key: &str) -> Result<&'a str, ToolError> {
    args[key]
        .as_str()
        .ok_or_else(|| ToolError::Validation(format!("Missing required argument: {key}")))
}

// ---------------------------------------------------------------------------
// search_splunk
// ---------------------------------------------------------------------------

async fn search_splunk(
    state: &AppState,
    query: &str,
    options: &SearchOptions,
) -> Result<Value, ToolError> {
    // Rejected before any remote call — no connection is made for an empty
    // query.
    if query.trim().is_empty() {
        return Err(ToolError::Validation(
            "Search query cannot be empty".to_string(),
        ));
    }

    let client = SplunkClient::connect(&state.config).await?;
    let results = search::run(&client, state.config.search_mode, query, options).await?;
    tracing::info!(count = results.len(), "search completed");
    Ok(Value::Array(results))
}

// ---------------------------------------------------------------------------
// Indexes
// ---------------------------------------------------------------------------

async fn list_indexes(state: &AppState) -> Result<Value, ToolError> {
    let client = SplunkClient::connect(&state.config).await?;
    let response = client
        .get_json("/services/data/indexes", &[("count", "0")])
        .await?;
    let names: Vec<String> = ResourceEntry::from_listing(&response)
        .into_iter()
        .map(|e| e.name)
        .collect();
    tracing::info!(count = names.len(), "listed indexes");
    Ok(json!({ "indexes": names }))
}

async fn get_index_info(state: &AppState, index_name: &str) -> Result<Value, ToolError> {
    let client = SplunkClient::connect(&state.config).await?;
    let response = client
        .get_json(
            &format!("/services/data/indexes/{}", urlencoding::encode(index_name)),
            &[],
        )
        .await
        .map_err(|e| match e {
            ToolError::NotFound(_) => {
                ToolError::NotFound(format!("Index not found: {index_name}"))
            }
            other => other,
        })?;

    let entry = ResourceEntry::from_listing(&response)
        .into_iter()
        .next()
        .ok_or_else(|| ToolError::NotFound(format!("Index not found: {index_name}")))?;

    Ok(reshape_index(&entry))
}

fn reshape_index(entry: &ResourceEntry) -> Value {
    json!({
        "name": entry.name,
        "total_event_count": entry.string_or("totalEventCount", "0"),
        "current_size": entry.string_or("currentDBSizeMB", "0"),
        "max_size": entry.string_or("maxTotalDataSizeMB", "0"),
        "min_time": entry.string_or("minTime", ""),
        "max_time": entry.string_or("maxTime", ""),
    })
}

// ---------------------------------------------------------------------------
// Saved searches
// ---------------------------------------------------------------------------

async fn list_saved_searches(state: &AppState) -> Result<Value, ToolError> {
    let client = SplunkClient::connect(&state.config).await?;
    let response = client
        .get_json("/services/saved/searches", &[("count", "0")])
        .await?;
    let entries = ResourceEntry::from_listing(&response);
    Ok(Value::Array(reshape_saved_searches(&entries)))
}

/// Per-entry failures degrade to a partial list — an entry without a search
/// string is logged and skipped, never aborting the remaining entries.
fn reshape_saved_searches(entries: &[ResourceEntry]) -> Vec<Value> {
    entries
        .iter()
        .filter_map(|entry| match entry.string_field("search") {
            Some(search) => Some(json!({
                "name": entry.name,
                "description": entry.string_or("description", ""),
                "search": search,
            })),
            None => {
                tracing::warn!(name = %entry.name, "skipping saved search without query string");
                None
            }
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Users
// ---------------------------------------------------------------------------

async fn current_user(state: &AppState) -> Result<Value, ToolError> {
    let client = SplunkClient::connect(&state.config).await?;

    // Start from the configured username; the current-context endpoint
    // overrides it when reachable (it knows about token auth).
    let mut username = state.config.username.clone();
    match client
        .get_json("/services/authentication/current-context", &[])
        .await
    {
        Ok(context) => {
            if let Some(ctx_user) = context
                .pointer("/entry/0/content/username")
                .and_then(|u| u.as_str())
            {
                username = ctx_user.to_string();
            }
        }
        Err(e) => {
            tracing::warn!(error = %e, "could not resolve username from current-context");
        }
    }

    let response = client
        .get_json(
            &format!(
                "/services/authentication/users/{}",
                urlencoding::encode(&username)
            ),
            &[],
        )
        .await
        .map_err(|e| match e {
            ToolError::NotFound(_) => ToolError::NotFound(format!("User not found: {username}")),
            other => other,
        })?;

    let entry = ResourceEntry::from_listing(&response)
        .into_iter()
        .next()
        .ok_or_else(|| ToolError::NotFound(format!("User not found: {username}")))?;

    tracing::info!(username = %entry.name, "resolved current user");
    Ok(reshape_user(&entry))
}

async fn list_users(state: &AppState) -> Result<Value, ToolError> {
    let client = SplunkClient::connect(&state.config).await?;
    let response = client
        .get_json("/services/authentication/users", &[("count", "0")])
        .await?;
    let users: Vec<Value> = ResourceEntry::from_listing(&response)
        .iter()
        .map(reshape_user)
        .collect();
    tracing::info!(count = users.len(), "listed users");
    Ok(Value::Array(users))
}

/// Missing optional fields default to placeholders; roles/capabilities are
/// normalized to lists regardless of how Splunk encoded them.
fn reshape_user(entry: &ResourceEntry) -> Value {
    json!({
        "username": entry.name,
        "real_name": entry.string_or("realname", "N/A"),
        "email": entry.string_or("email", "N/A"),
        "roles": entry.list_field("roles"),
        "capabilities": entry.list_field("capabilities"),
        "default_app": entry.string_or("defaultApp", "search"),
        "type": entry.string_or("type", "user"),
    })
}

// ---------------------------------------------------------------------------
// KV store
// ---------------------------------------------------------------------------

async fn list_kvstore_collections(state: &AppState) -> Result<Value, ToolError> {
    let client = SplunkClient::connect(&state.config).await?;

    // Stats are best-effort: a collection with no stats entry reports zero
    // records rather than failing the listing.
    let stats = match client
        .get_json(
            "/services/server/introspection/kvstore/collectionstats",
            &[],
        )
        .await
    {
        Ok(response) => parse_collection_stats(&response),
        Err(e) => {
            tracing::warn!(error = %e, "could not retrieve KV store collection stats");
            HashMap::new()
        }
    };

    let response = client
        .get_json("/servicesNS/-/-/storage/collections/config", &[("count", "0")])
        .await?;
    let entries = ResourceEntry::from_listing(&response);
    let collections = reshape_collections(&entries, &stats);
    tracing::info!(count = collections.len(), "listed KV store collections");
    Ok(Value::Array(collections))
}

/// Record counts come back as a list of JSON-encoded strings under
/// `entry[0].content.data`, each with an `ns` ("app.collection") and a
/// `count`. Unparseable items are skipped.
fn parse_collection_stats(response: &Value) -> HashMap<String, u64> {
    let mut stats = HashMap::new();
    let Some(data) = response
        .pointer("/entry/0/content/data")
        .and_then(|d| d.as_array())
    else {
        return stats;
    };
    for item in data {
        let Some(raw) = item.as_str() else { continue };
        let Ok(parsed) = serde_json::from_str::<Value>(raw) else {
            continue;
        };
        if let (Some(ns), Some(count)) = (
            parsed.get("ns").and_then(|n| n.as_str()),
            parsed.get("count").and_then(|c| c.as_u64()),
        ) {
            stats.insert(ns.to_string(), count);
        }
    }
    stats
}

fn reshape_collections(
    entries: &[ResourceEntry],
    stats: &HashMap<String, u64>,
) -> Vec<Value> {
    entries
        .iter()
        .filter_map(|entry| match &entry.app {
            Some(app) => {
                let ns = format!("{app}.{}", entry.name);
                Some(json!({
                    "name": entry.name,
                    "app": app,
                    "fields": schema_fields(entry, "field."),
                    "accelerated_fields": schema_fields(entry, "accelerated_field."),
                    "record_count": stats.get(&ns).copied().unwrap_or(0),
                }))
            }
            None => {
                tracing::warn!(name = %entry.name, "skipping collection entry without owning app");
                None
            }
        })
        .collect()
}

/// Field names are flattened into the entry content as `field.<name>` /
/// `accelerated_field.<name>` keys; strip the prefix to recover the schema.
fn schema_fields(entry: &ResourceEntry, prefix: &str) -> Vec<String> {
    entry
        .content
        .keys()
        .filter_map(|k| k.strip_prefix(prefix).map(String::from))
        .collect()
}

async fn create_kvstore_collection(
    state: &AppState,
    collection: &str,
    app: &str,
    fields: &Map<String, Value>,
) -> Result<Value, ToolError> {
    if collection.is_empty() || app.is_empty() {
        return Err(ToolError::Validation(
            "collection_name and app_name must not be empty".to_string(),
        ));
    }

    let client = SplunkClient::connect(&state.config).await?;
    let config_path = format!(
        "/servicesNS/nobody/{}/storage/collections/config",
        urlencoding::encode(app)
    );
    let collection_path = format!("{config_path}/{}", urlencoding::encode(collection));

    // Not idempotent: creating an existing collection surfaces the remote
    // error as-is. Not atomic either — if the field definition or the
    // descriptor fetch below fails, the collection already exists remotely.
    client
        .post_form(&config_path, &[("name", collection)])
        .await?;
    tracing::info!(collection, app, "created KV store collection");

    if !fields.is_empty() {
        let mut params: Vec<(String, String)> = Vec::with_capacity(fields.len());
        for (field, field_type) in fields {
            let field_type = field_type.as_str().ok_or_else(|| {
                ToolError::Validation(format!("field type for '{field}' must be a string"))
            })?;
            params.push((format!("field.{field}"), field_type.to_string()));
        }
        let borrowed: Vec<(&str, &str)> = params
            .iter()
            .map(|(k, v)| (k.as_str(), v.as_str()))
            .collect();
        client.post_form(&collection_path, &borrowed).await?;
    }

    let response = client.get_json(&collection_path, &[]).await?;
    let entry = ResourceEntry::from_listing(&response)
        .into_iter()
        .next()
        .ok_or_else(|| ToolError::Remote {
            status: 200,
            message: format!("collection '{collection}' created but descriptor fetch was empty"),
        })?;

    Ok(json!({
        "name": entry.name,
        "app": app,
        "fields": schema_fields(&entry, "field."),
    }))
}

async fn delete_kvstore_collection(
    state: &AppState,
    collection: &str,
    app: &str,
) -> Result<Value, ToolError> {
    if collection.is_empty() || app.is_empty() {
        return Err(ToolError::Validation(
            "collection_name and app_name must not be empty".to_string(),
        ));
    }

    let client = SplunkClient::connect(&state.config).await?;
    client
        .delete(&format!(
            "/servicesNS/nobody/{}/storage/collections/config/{}",
            urlencoding::encode(app),
            urlencoding::encode(collection)
        ))
        .await?;
    tracing::info!(collection, app, "deleted KV store collection");
    Ok(json!(true))
}

// ---------------------------------------------------------------------------
// Health & identity
// ---------------------------------------------------------------------------

async fn health_check(state: &AppState) -> Result<Value, ToolError> {
    let client = SplunkClient::connect(&state.config).await?;
    let response = client
        .get_json("/services/apps/local", &[("count", "0")])
        .await?;
    let apps: Vec<Value> = ResourceEntry::from_listing(&response)
        .iter()
        .map(reshape_app)
        .collect();

    tracing::info!(apps = apps.len(), "health check successful");
    Ok(json!({
        "status": "healthy",
        "connection": {
            "host": state.config.host,
            "port": state.config.port,
            "scheme": state.config.scheme,
            "username": state.config.username,
            "ssl_verify": state.config.verify_ssl,
        },
        "apps_count": apps.len(),
        "apps": apps,
    }))
}

fn reshape_app(entry: &ResourceEntry) -> Value {
    json!({
        "name": entry.name,
        "label": entry.string_or("label", &entry.name),
        "version": entry.string_or("version", ""),
    })
}

// ---------------------------------------------------------------------------
// get_indexes_and_sourcetypes
// ---------------------------------------------------------------------------

const SOURCETYPE_QUERY: &str = "| tstats count WHERE index=* BY index, sourcetype \
     | stats count BY index, sourcetype \
     | sort - count";

async fn get_indexes_and_sourcetypes(state: &AppState) -> Result<Value, ToolError> {
    let client = SplunkClient::connect(&state.config).await?;

    let response = client
        .get_json("/services/data/indexes", &[("count", "0")])
        .await?;
    let indexes: Vec<String> = ResourceEntry::from_listing(&response)
        .into_iter()
        .map(|e| e.name)
        .collect();

    let options = SearchOptions {
        max_results: 10_000,
        ..SearchOptions::default()
    };
    let results = search::run(
        &client,
        state.config.search_mode,
        SOURCETYPE_QUERY,
        &options,
    )
    .await?;
    let sourcetypes = group_sourcetypes(&results);
    let total_indexes = indexes.len();
    let total_sourcetypes: usize = sourcetypes
        .values()
        .filter_map(|v| v.as_array().map(|a| a.len()))
        .sum();

    Ok(json!({
        "indexes": indexes,
        "sourcetypes": sourcetypes,
        "metadata": {
            "total_indexes": total_indexes,
            "total_sourcetypes": total_sourcetypes,
            "search_time_range": "24 hours",
        },
    }))
}

fn group_sourcetypes(results: &[Value]) -> Map<String, Value> {
    let mut by_index: Map<String, Value> = Map::new();
    for result in results {
        let index = result.get("index").and_then(|i| i.as_str()).unwrap_or("");
        let sourcetype = result
            .get("sourcetype")
            .and_then(|s| s.as_str())
            .unwrap_or("");
        let count = result.get("count").and_then(|c| c.as_str()).unwrap_or("0");

        let bucket = by_index
            .entry(index.to_string())
            .or_insert_with(|| Value::Array(Vec::new()));
        if let Some(arr) = bucket.as_array_mut() {
            arr.push(json!({ "sourcetype": sourcetype, "count": count }));
        }
    }
    by_index
}

// ---------------------------------------------------------------------------
// list_tools / ping
// ---------------------------------------------------------------------------

fn list_tools() -> Value {
    let mut tools: Vec<Value> = catalog()
        .iter()
        .map(|t| {
            json!({
                "name": t.name,
                "description": t.description,
                "parameters": t.input_schema,
            })
        })
        .collect();
    tools.sort_by(|a, b| a["name"].as_str().cmp(&b["name"].as_str()));
    Value::Array(tools)
}

/// Static liveness signal — no Splunk dependency at all.
fn ping() -> Value {
    json!({
        "status": "ok",
        "server": SERVER_NAME,
        "version": VERSION,
        "timestamp": Utc::now().to_rfc3339(),
        "protocol": "mcp",
        "capabilities": ["splunk"],
    })
}

// ---------------------------------------------------------------------------
// Catalog
// ---------------------------------------------------------------------------

pub struct ToolSpec {
    pub name: &'static str,
    pub description: &'static str,
    pub input_schema: Value,
}

fn tool(name: &'static str, description: &'static str, input_schema: Value) -> ToolSpec {
    ToolSpec {
        name,
        description,
        input_schema,
    }
}

fn no_params() -> Value {
    json!({ "type": "object", "properties": {} })
}

fn index_name_params() -> Value {
    json!({
        "type": "object",
        "properties": {
            "index_name": { "type": "string", "description": "Name of the index" }
        },
        "required": ["index_name"]
    })
}

fn kvstore_target_params() -> Value {
    json!({
        "type": "object",
        "properties": {
            "collection_name": { "type": "string", "description": "Collection name" },
            "app_name": { "type": "string", "description": "Owning Splunk app" }
        },
        "required": ["collection_name", "app_name"]
    })
}

pub fn catalog() -> Vec<ToolSpec> {
    vec![
        tool(
            "search_splunk",
            "Execute a Splunk search query and return the results.",
            json!({
                "type": "object",
                "properties": {
                    "search_query": { "type": "string", "description": "The search query to execute" },
                    "earliest_time": { "type": "string", "description": "Start of the search window (default: -24h)", "default": "-24h" },
                    "latest_time": { "type": "string", "description": "End of the search window (default: now)", "default": "now" },
                    "max_results": { "type": "integer", "description": "Maximum number of results to return (default: 100)", "default": 100 }
                },
                "required": ["search_query"]
            }),
        ),
        tool(
            "list_indexes",
            "Get a list of all available Splunk indexes.",
            no_params(),
        ),
        tool(
            "get_index_info",
            "Get metadata for a specific Splunk index (event count, size, time range).",
            index_name_params(),
        ),
        tool(
            "get_index_metadata",
            "Alias of get_index_info.",
            index_name_params(),
        ),
        tool(
            "list_saved_searches",
            "List all saved searches with their names, descriptions, and query strings.",
            no_params(),
        ),
        tool(
            "current_user",
            "Get information about the currently authenticated user (roles, capabilities, default app).",
            no_params(),
        ),
        tool(
            "list_users",
            "List all Splunk users (requires admin privileges).",
            no_params(),
        ),
        tool(
            "list_kvstore_collections",
            "List all KV store collections across apps, with field schemas and record counts.",
            no_params(),
        ),
        tool(
            "create_kvstore_collection",
            "Create a KV store collection in an app, optionally defining its field schema.",
            json!({
                "type": "object",
                "properties": {
                    "collection_name": { "type": "string", "description": "Collection name" },
                    "app_name": { "type": "string", "description": "Owning Splunk app" },
                    "fields": {
                        "type": "object",
                        "description": "Field schema: field name to type (string, number, bool, time)"
                    }
                },
                "required": ["collection_name", "app_name"]
            }),
        ),
        tool(
            "delete_kvstore_collection",
            "Delete a KV store collection from an app. Returns true on success.",
            kvstore_target_params(),
        ),
        tool(
            "health_check",
            "Check Splunk connectivity and list installed apps.",
            no_params(),
        ),
        tool("health", "Alias of health_check.", no_params()),
        tool(
            "get_indexes_and_sourcetypes",
            "List all indexes and the sourcetypes seen in each over the last 24 hours.",
            no_params(),
        ),
        tool(
            "list_tools",
            "List all available tools with their parameter schemas.",
            no_params(),
        ),
        tool(
            "ping",
            "Check server availability; returns identity and timestamp without contacting Splunk.",
            no_params(),
        ),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{SearchMode, SplunkConfig};

    fn test_state() -> AppState {
        // 192.0.2.0/24 is TEST-NET; nothing here should ever dial it.
        AppState::new(SplunkConfig {
            host: "192.0.2.1".to_string(),
            port: 8089,
            scheme: "https".to_string(),
            username: "admin".to_string(),
            password: "changeme".to_string(),
            token: None,
            verify_ssl: false,
            mcp_port: 8000,
            debug: false,
            search_mode: SearchMode::Blocking,
        })
    }

    fn entry(name: &str, app: Option<&str>, content: Value) -> ResourceEntry {
        ResourceEntry {
            name: name.to_string(),
            app: app.map(String::from),
            content: content.as_object().cloned().unwrap_or_default(),
        }
    }

    // ── catalog ─────────────────────────────────────────────────────────

    #[test]
    fn catalog_covers_the_full_tool_surface() {
        let names: Vec<&str> = catalog().iter().map(|t| t.name).collect();
        for expected in [
            "search_splunk",
            "list_indexes",
            "get_index_info",
            "get_index_metadata",
            "list_saved_searches",
            "current_user",
            "list_users",
            "list_kvstore_collections",
            "create_kvstore_collection",
            "delete_kvstore_collection",
            "health_check",
            "health",
            "get_indexes_and_sourcetypes",
            "list_tools",
            "ping",
        ] {
            assert!(names.contains(&expected), "missing tool: {expected}");
        }
        let mut deduped = names.clone();
        deduped.sort_unstable();
        deduped.dedup();
        assert_eq!(deduped.len(), names.len(), "duplicate tool names");
    }

    #[test]
    fn every_schema_is_an_object_schema() {
        for spec in catalog() {
            assert_eq!(spec.input_schema["type"], "object", "tool {}", spec.name);
        }
    }

    #[test]
    fn list_tools_is_sorted_by_name() {
        let tools = list_tools();
        let names: Vec<&str> = tools
            .as_array()
            .unwrap()
            .iter()
            .map(|t| t["name"].as_str().unwrap())
            .collect();
        let mut sorted = names.clone();
        sorted.sort_unstable();
        assert_eq!(names, sorted);
    }

    #[test]
    fn unknown_tools_are_not_known() {
        assert!(is_known_tool("ping"));
        assert!(is_known_tool("health"));
        assert!(!is_known_tool("drop_all_indexes"));
    }

    // ── ping ────────────────────────────────────────────────────────────

    #[test]
    fn ping_has_the_fixed_shape() {
        let p = ping();
        assert_eq!(p["status"], "ok");
        assert_eq!(p["server"], "splunk-mcp");
        assert_eq!(p["protocol"], "mcp");
        assert_eq!(p["capabilities"], json!(["splunk"]));
        assert_eq!(p["version"], VERSION);

        let ts = p["timestamp"].as_str().unwrap();
        assert!(chrono::DateTime::parse_from_rfc3339(ts).is_ok());
    }

    // ── validation before any remote call ───────────────────────────────

    #[tokio::test]
    async fn empty_search_query_fails_validation_without_connecting() {
        let state = test_state();
        let err = execute_tool("search_splunk", &json!({ "search_query": "" }), &state)
            .await
            .unwrap_err();
        assert!(matches!(err, ToolError::Validation(_)));
        assert_eq!(err.to_string(), "Search query cannot be empty");
    }

    #[tokio::test]
    async fn whitespace_query_is_also_rejected() {
        let state = test_state();
        let err = execute_tool("search_splunk", &json!({ "search_query": "   " }), &state)
            .await
            .unwrap_err();
        assert!(matches!(err, ToolError::Validation(_)));
    }

    #[tokio::test]
    async fn missing_required_argument_is_a_validation_error() {
        let state = test_state();
        let err = execute_tool("get_index_info", &json!({}), &state)
            .await
            .unwrap_err();
        assert!(matches!(err, ToolError::Validation(_)));
        assert!(err.to_string().contains("index_name"));
    }

    #[tokio::test]
    async fn empty_kvstore_names_are_rejected_before_connecting() {
        let state = test_state();
        let err = execute_tool(
            "delete_kvstore_collection",
            &json!({ "collection_name": "", "app_name": "search" }),
            &state,
        )
        .await
        .unwrap_err();
        assert!(matches!(err, ToolError::Validation(_)));
    }

    // ── reshaping ───────────────────────────────────────────────────────

    #[test]
    fn index_reshape_stringifies_metadata() {
        let e = entry(
            "main",
            None,
            json!({
                "totalEventCount": 42,
                "currentDBSizeMB": "128",
                "maxTotalDataSizeMB": 500000,
                "minTime": "2024-01-01T00:00:00+00:00",
                "maxTime": "2024-06-01T00:00:00+00:00"
            }),
        );
        let info = reshape_index(&e);
        assert_eq!(info["name"], "main");
        assert_eq!(info["total_event_count"], "42");
        assert_eq!(info["current_size"], "128");
        assert_eq!(info["max_size"], "500000");
        assert_eq!(info["min_time"], "2024-01-01T00:00:00+00:00");
    }

    #[test]
    fn saved_search_without_query_is_skipped() {
        let entries = vec![
            entry("errors", None, json!({ "search": "index=main error", "description": "Errors" })),
            entry("broken", None, json!({ "description": "no search field" })),
            entry("logins", None, json!({ "search": "index=auth action=login" })),
        ];
        let reshaped = reshape_saved_searches(&entries);
        assert_eq!(reshaped.len(), 2);
        assert_eq!(reshaped[0]["name"], "errors");
        assert_eq!(reshaped[0]["description"], "Errors");
        assert_eq!(reshaped[1]["name"], "logins");
        assert_eq!(reshaped[1]["description"], "");
    }

    #[test]
    fn user_reshape_fills_placeholders_and_normalizes_lists() {
        let sparse = entry("svc-account", None, json!({ "roles": "user" }));
        let info = reshape_user(&sparse);
        assert_eq!(info["username"], "svc-account");
        assert_eq!(info["real_name"], "N/A");
        assert_eq!(info["email"], "N/A");
        assert_eq!(info["roles"], json!(["user"]));
        assert_eq!(info["capabilities"], json!([]));
        assert_eq!(info["default_app"], "search");
        assert_eq!(info["type"], "user");

        let full = entry(
            "admin",
            None,
            json!({
                "realname": "Administrator",
                "email": "admin@example.com",
                "roles": ["admin", "power"],
                "defaultApp": "launcher",
                "type": "Splunk"
            }),
        );
        let info = reshape_user(&full);
        assert_eq!(info["real_name"], "Administrator");
        assert_eq!(info["roles"], json!(["admin", "power"]));
        assert_eq!(info["default_app"], "launcher");
    }

    // ── KV store ────────────────────────────────────────────────────────

    #[test]
    fn collection_stats_parse_from_embedded_json_strings() {
        let response = json!({
            "entry": [{
                "name": "collectionstats",
                "content": {
                    "data": [
                        r#"{"ns":"search.kvcoll","count":7,"size":1024}"#,
                        r#"{"ns":"myapp.lookups","count":120}"#,
                        "not json",
                        r#"{"count":3}"#
                    ]
                }
            }]
        });
        let stats = parse_collection_stats(&response);
        assert_eq!(stats.len(), 2);
        assert_eq!(stats.get("search.kvcoll"), Some(&7));
        assert_eq!(stats.get("myapp.lookups"), Some(&120));
    }

    #[test]
    fn collections_join_stats_and_default_to_zero() {
        let mut stats = HashMap::new();
        stats.insert("search.kvcoll".to_string(), 7u64);

        let entries = vec![
            entry(
                "kvcoll",
                Some("search"),
                json!({
                    "field.username": "string",
                    "field.attempts": "number",
                    "accelerated_field.username": r#"{"username": 1}"#,
                    "enforceTypes": "false"
                }),
            ),
            entry("unstatted", Some("myapp"), json!({})),
            entry("orphan", None, json!({})),
        ];

        let collections = reshape_collections(&entries, &stats);
        assert_eq!(collections.len(), 2, "entry without app is skipped");

        let kv = &collections[0];
        assert_eq!(kv["name"], "kvcoll");
        assert_eq!(kv["app"], "search");
        assert_eq!(kv["record_count"], 7);
        let mut fields: Vec<&str> = kv["fields"]
            .as_array()
            .unwrap()
            .iter()
            .map(|f| f.as_str().unwrap())
            .collect();
        fields.sort_unstable();
        assert_eq!(fields, vec!["attempts", "username"]);
        assert_eq!(kv["accelerated_fields"], json!(["username"]));

        assert_eq!(collections[1]["record_count"], 0);
    }

    // ── app inventory / sourcetype grouping ─────────────────────────────

    #[test]
    fn app_reshape_defaults_label_to_name() {
        let e = entry("search", None, json!({ "version": "9.2.1" }));
        let app = reshape_app(&e);
        assert_eq!(app["name"], "search");
        assert_eq!(app["label"], "search");
        assert_eq!(app["version"], "9.2.1");
    }

    #[test]
    fn sourcetypes_group_by_index() {
        let results = vec![
            json!({ "index": "main", "sourcetype": "access_combined", "count": "120" }),
            json!({ "index": "main", "sourcetype": "syslog", "count": "45" }),
            json!({ "index": "_internal", "sourcetype": "splunkd", "count": "9000" }),
        ];
        let grouped = group_sourcetypes(&results);
        assert_eq!(grouped.len(), 2);
        assert_eq!(grouped["main"].as_array().unwrap().len(), 2);
        assert_eq!(grouped["_internal"][0]["sourcetype"], "splunkd");
        assert_eq!(grouped["_internal"][0]["count"], "9000");
    }
}
