//! LLM client abstractions and provider construction
//!
//! This module provides a unified interface over the synthesis backends:
//! - **Gemini**: `generateContent` REST API
//! - **OpenAI-compatible**: OpenAI, OpenRouter and Perplexity chat completions
//! - **Anthropic**: Messages API
//! - **Ollama**: local `/api/generate`
//!
//! All backends are plain `reqwest` exchanges. Failures are reported as
//! [`AppError::SynthesisFailure`] tagged with the provider name; no backend
//! error ever carries the credential.

use crate::types::{AppError, Credential, ProviderDescriptor, Result};
use async_trait::async_trait;
use serde::de::DeserializeOwned;

/// Generic LLM client trait for provider abstraction
///
/// All synthesis backends implement this trait, so the pipeline never
/// depends on a concrete provider.
#[async_trait]
pub trait LLMClient: Send + Sync {
    /// Generate a completion from a prompt
    async fn generate(&self, prompt: &str) -> Result<String>;

    /// Generate with system prompt
    async fn generate_with_system(&self, system: &str, prompt: &str) -> Result<String>;

    /// Get the model name/identifier
    fn model_name(&self) -> &str;
}

/// Sampling settings shared by every backend
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GenerationOptions {
    pub temperature: f32,
    pub max_tokens: u32,
}

impl Default for GenerationOptions {
    fn default() -> Self {
        Self {
            temperature: 0.3,
            max_tokens: 4096,
        }
    }
}

/// Provider enum for runtime client construction
#[derive(Debug, Clone)]
pub enum Provider {
    /// Google Gemini
    ///
    /// # Example
    /// ```rust,ignore
    /// let provider = Provider::Gemini {
    ///     api_key: Credential::new("AIza..."),
    ///     api_base: "https://generativelanguage.googleapis.com/v1beta".to_string(),
    ///     model: "gemini-2.0-flash".to_string(),
    /// };
    /// ```
    Gemini {
        api_key: Credential,
        api_base: String,
        model: String,
    },

    /// Any OpenAI-style `/chat/completions` API (OpenAI, OpenRouter, Perplexity)
    OpenAICompatible {
        name: String,
        api_key: Credential,
        api_base: String,
        model: String,
    },

    /// Anthropic Claude Messages API
    Anthropic {
        api_key: Credential,
        api_base: String,
        model: String,
    },

    /// Ollama local LLM server
    ///
    /// # Example
    /// ```rust,ignore
    /// let provider = Provider::Ollama {
    ///     base_url: "http://localhost:11434".to_string(),
    ///     model: "llama3.2".to_string(),
    /// };
    /// ```
    Ollama { base_url: String, model: String },
}

impl Provider {
    /// Create a client instance for this provider
    pub fn create_client(
        &self,
        http: reqwest::Client,
        options: GenerationOptions,
    ) -> Box<dyn LLMClient> {
        match self {
            Provider::Gemini {
                api_key,
                api_base,
                model,
            } => Box::new(super::gemini::GeminiClient::new(
                http,
                api_key.clone(),
                api_base.clone(),
                model.clone(),
                options,
            )),

            Provider::OpenAICompatible {
                name,
                api_key,
                api_base,
                model,
            } => Box::new(super::openai::OpenAIClient::new(
                http,
                name.clone(),
                api_key.clone(),
                api_base.clone(),
                model.clone(),
                options,
            )),

            Provider::Anthropic {
                api_key,
                api_base,
                model,
            } => Box::new(super::anthropic::AnthropicClient::new(
                http,
                api_key.clone(),
                api_base.clone(),
                model.clone(),
                options,
            )),

            Provider::Ollama { base_url, model } => Box::new(super::ollama::OllamaClient::new(
                http,
                base_url.clone(),
                model.clone(),
                options,
            )),
        }
    }

    /// Backend name as it appears in provider descriptors
    pub fn name(&self) -> &str {
        match self {
            Provider::Gemini { .. } => "gemini",
            Provider::OpenAICompatible { name, .. } => name,
            Provider::Anthropic { .. } => "anthropic",
            Provider::Ollama { .. } => "ollama",
        }
    }

    pub fn model(&self) -> &str {
        match self {
            Provider::Gemini { model, .. }
            | Provider::OpenAICompatible { model, .. }
            | Provider::Anthropic { model, .. }
            | Provider::Ollama { model, .. } => model,
        }
    }
}

/// Builds a client for a selected provider descriptor
///
/// The orchestrator depends on this seam rather than on a concrete registry
/// so tests can inject scripted clients.
#[cfg_attr(test, mockall::automock)]
pub trait LLMClientFactory: Send + Sync {
    fn create(&self, descriptor: &ProviderDescriptor) -> Result<Box<dyn LLMClient>>;
}

/// Send a JSON request to a backend and decode the JSON reply
pub(crate) async fn send_json<T: DeserializeOwned>(
    provider: &str,
    request: reqwest::RequestBuilder,
) -> Result<T> {
    let failure = |reason: String| AppError::SynthesisFailure {
        provider: provider.to_string(),
        reason,
    };

    let response = request
        .send()
        .await
        .map_err(|e| failure(format!("request failed: {}", e.without_url())))?;

    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        let body: String = body.chars().take(300).collect();
        return Err(failure(format!("backend returned HTTP {}: {}", status.as_u16(), body)));
    }

    response
        .json::<T>()
        .await
        .map_err(|e| failure(format!("unexpected response shape: {}", e.without_url())))
}

/// Build a failure for a response that parsed but carried no text
pub(crate) fn empty_response(provider: &str) -> AppError {
    AppError::SynthesisFailure {
        provider: provider.to_string(),
        reason: "backend returned no text".to_string(),
    }
}
