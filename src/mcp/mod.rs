//! MCP protocol surface.
//!
//! `server` implements the JSON-RPC 2.0 method dispatch shared by every
//! transport; `sse` and `stdio` are the two transports that carry it. A
//! plain HTTP POST endpoint (`/mcp`) is also wired for clients that speak
//! JSON-RPC without a session.

pub mod server;
pub mod sse;
pub mod stdio;
