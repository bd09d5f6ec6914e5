//! Synthesized OpenAPI document.
//!
//! `GET /openapi.json` documents the MCP surface for HTTP-first tooling:
//! the transport endpoints under `paths`, per-tool parameter schemas under
//! `components.schemas`, and one pseudo-operation per tool under the
//! `x-mcp-tools` extension. Built from the live catalog, so it never drifts
//! from what `tools/list` reports.

use axum::Json;
use serde_json::{Map, Value, json};

use crate::tools;

pub async fn openapi_handler() -> Json<Value> {
    Json(build_schema())
}

fn build_schema() -> Value {
    let catalog = tools::catalog();

    let mut schemas = Map::new();
    schemas.insert(
        "ToolRequest".to_string(),
        json!({
            "type": "object",
            "required": ["tool", "parameters"],
            "properties": {
                "tool": { "type": "string", "description": "The name of the tool to execute" },
                "parameters": { "type": "object", "description": "Parameters for the tool execution" }
            }
        }),
    );
    schemas.insert(
        "ToolResponse".to_string(),
        json!({
            "type": "object",
            "properties": {
                "result": { "type": "object", "description": "The result of the tool execution" },
                "error": { "type": "string", "description": "Error message if the execution failed" }
            }
        }),
    );
    for spec in &catalog {
        schemas.insert(format!("{}Parameters", spec.name), spec.input_schema.clone());
    }

    let mut operations = Map::new();
    for spec in &catalog {
        operations.insert(
            format!("execute_{}", spec.name),
            json!({
                "summary": spec.description,
                "description": spec.description,
                "tags": ["MCP Tools"],
                "requestBody": {
                    "required": true,
                    "content": {
                        "application/json": {
                            "schema": {
                                "type": "object",
                                "required": ["parameters"],
                                "properties": {
                                    "parameters": spec.input_schema
                                }
                            }
                        }
                    }
                },
                "responses": {
                    "200": {
                        "description": "Successful tool execution",
                        "content": {
                            "application/json": {
                                "schema": { "$ref": "#/components/schemas/ToolResponse" }
                            }
                        }
                    }
                }
            }),
        );
    }

    json!({
        "openapi": "3.0.2",
        "info": {
            "title": "Splunk MCP API",
            "description": "MCP server for interacting with Splunk Enterprise/Cloud",
            "version": tools::VERSION
        },
        "paths": {
            "/sse": {
                "get": {
                    "summary": "SSE Connection",
                    "description": "Establishes a Server-Sent Events connection for real-time communication",
                    "tags": ["MCP Core"],
                    "responses": { "200": { "description": "SSE connection established" } }
                }
            },
            "/messages": {
                "post": {
                    "summary": "Messages Endpoint",
                    "description": "JSON-RPC requests for an open SSE session",
                    "tags": ["MCP Core"],
                    "responses": { "202": { "description": "Request accepted" } }
                }
            },
            "/mcp": {
                "post": {
                    "summary": "JSON-RPC Endpoint",
                    "description": "Sessionless MCP JSON-RPC 2.0 over HTTP POST",
                    "tags": ["MCP Core"],
                    "responses": { "200": { "description": "JSON-RPC response" } }
                }
            }
        },
        "components": { "schemas": schemas },
        "tags": [
            { "name": "MCP Core", "description": "Core MCP server endpoints" },
            { "name": "MCP Tools", "description": "Available MCP tools and operations" }
        ],
        "x-mcp-tools": operations
    })
}
