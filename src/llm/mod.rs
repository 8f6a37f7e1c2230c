//! Synthesis backends
//!
//! Every language-model backend sits behind the [`LLMClient`] trait. The
//! [`ProviderRegistry`] discovers which backends have credentials at
//! startup, selects one per request by fixed priority, and builds its
//! client through the [`LLMClientFactory`] seam.
//!
//! # Example
//!
//! ```ignore
//! use community_research::llm::{LLMClientFactory, ProviderRegistry};
//!
//! let registry = ProviderRegistry::discover(&overrides, options, http, &|k| std::env::var(k).ok());
//! let descriptor = registry.select()?;
//! let client = registry.create(&descriptor)?;
//! let text = client.generate_with_system("Reply in JSON.", "...").await?;
//! ```

/// Core LLM client trait, provider enum and factory seam.
pub mod client;
/// Startup credential discovery and priority selection.
pub mod provider_registry;

pub mod anthropic;
pub mod gemini;
pub mod ollama;
pub mod openai;

pub use client::{GenerationOptions, LLMClient, LLMClientFactory, Provider};
pub use provider_registry::{select_provider, ProviderRegistry, KNOWN_BACKENDS};
