//! Research orchestration
//!
//! The single externally visible operation, `research(query)`, lives in
//! [`orchestrator::Orchestrator`]. It composes the other modules of the
//! crate:
//!
//! - [`validator::QueryValidator`] - rejects vague queries before any I/O
//! - [`crate::cache`] - TTL cache in front of the whole pipeline
//! - [`crate::rate_limit`] - process-wide admission control
//! - [`crate::sources`] - concurrent fan-out to the search backends
//! - [`crate::synthesis`] - turns evidence into ranked recommendations
//!
//! # Usage
//!
//! ```ignore
//! use community_research::research::orchestrator::Orchestrator;
//! use community_research::types::Query;
//!
//! let orchestrator = Orchestrator::from_config(&config)?;
//! let set = orchestrator
//!     .research(Query::new("FastAPI background task queue with Redis").with_language("Python"))
//!     .await?;
//!
//! for rec in &set.recommendations {
//!     println!("{} ({})", rec.title, rec.difficulty);
//! }
//! ```

/// Server and workspace context snapshot.
pub mod context;
/// Stage machine composing validation, caching, search and synthesis.
pub mod orchestrator;
/// Markdown/JSON output for results and errors.
pub mod render;
/// Query specificity checks.
pub mod validator;

pub use context::ServerContext;
pub use orchestrator::{Components, Orchestrator, ResearchStage};
pub use validator::QueryValidator;
