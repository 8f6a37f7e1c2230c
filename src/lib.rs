//! # community-research
//!
//! A community research engine. Given a specific technical question it
//! searches a Q&A site, an issue tracker, a discussion forum and a link
//! aggregator concurrently, then has an LLM distill the evidence into a
//! small set of ranked, actionable recommendations.
//!
//! ## Overview
//!
//! community-research can be used in three ways:
//!
//! 1. **As an MCP server** - run the `community-research` binary with no arguments
//! 2. **As an HTTP server** - `community-research serve`
//! 3. **As a library** - embed the [`Orchestrator`] in your own Rust project
//!
//! ### Basic Example
//!
//! ```rust,ignore
//! use community_research::{Orchestrator, ResearchConfig};
//! use community_research::types::Query;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = ResearchConfig::load_or_default("research.toml")?;
//!     let orchestrator = Orchestrator::from_config(&config)?;
//!
//!     let set = orchestrator
//!         .research(
//!             Query::new("FastAPI background task queue with Redis and Celery")
//!                 .with_language("Python"),
//!         )
//!         .await?;
//!
//!     for rec in &set.recommendations {
//!         println!("{} ({}, {} upvotes)", rec.title, rec.difficulty, rec.evidence.upvotes_or_stars);
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Description |
//! |---------|-------------|
//! | `mcp` | Model Context Protocol stdio server (default) |
//! | `swagger-ui` | Interactive API docs at `/swagger-ui/` |
//!
//! ## Modules
//!
//! - [`research`] - Validation, orchestration, rendering, server context
//! - [`sources`] - Search clients, retry policy and concurrent aggregation
//! - [`synthesis`] - Prompting and strict parsing of LLM output
//! - [`llm`] - Synthesis backends and provider discovery
//! - [`cache`] - TTL result cache
//! - [`rate_limit`] - Sliding-window admission control
//! - [`api`] - REST API handlers and routes
//! - [`types`] - Domain types and error handling
//!
//! ## Configuration
//!
//! Everything is configured from `research.toml` (see
//! [`utils::toml_config`]); credentials come only from environment variables
//! whose names the config file lists.

#![cfg_attr(docsrs, feature(doc_cfg))]
#![warn(rustdoc::missing_crate_level_docs)]

/// HTTP API handlers and routes.
pub mod api;
/// TTL result cache.
pub mod cache;
/// Command-line interface.
pub mod cli;
/// Synthesis backends and provider discovery.
pub mod llm;
/// Model Context Protocol (MCP) server integration.
#[cfg(feature = "mcp")]
pub mod mcp;
/// Sliding-window rate limiting.
pub mod rate_limit;
/// Research orchestration, validation and rendering.
pub mod research;
/// Community search clients and aggregation.
pub mod sources;
/// LLM synthesis of recommendations.
pub mod synthesis;
/// Core types (queries, results, errors).
pub mod types;
/// Configuration utilities.
pub mod utils;

// Re-export commonly used types
pub use cache::{ResearchCache, TtlResearchCache};
pub use llm::{LLMClient, LLMClientFactory, Provider, ProviderRegistry};
pub use research::{Orchestrator, ServerContext};
pub use sources::{SearchAggregator, SourceClient};
pub use types::{AppError, Result};
pub use utils::toml_config::ResearchConfig;

use std::sync::Arc;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    /// The research pipeline, shared with the MCP surface when both run
    pub orchestrator: Arc<Orchestrator>,
    /// Loaded configuration
    pub config: Arc<ResearchConfig>,
}
