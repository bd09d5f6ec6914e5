//! Splunk management API access.
//!
//! `client` is the per-call connection factory plus thin REST helpers;
//! `search` drives search jobs to completion. Everything above this module
//! works with the canonical [`client::ResourceEntry`] shape rather than raw
//! Atom-style JSON.

pub mod client;
pub mod search;
