//! Model Context Protocol surface
//!
//! Exposes `community_search` and `get_server_context` as MCP tools over
//! stdio. Both tools share the orchestrator used by the HTTP API, so the
//! cache and rate limiter are process-wide.

pub mod server;

pub use server::{CommunityResearchServer, start_stdio_server};
