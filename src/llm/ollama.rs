//! Ollama local inference client (`/api/generate`, non-streaming)

use super::client::{empty_response, send_json, GenerationOptions, LLMClient};
use crate::types::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize)]
struct GenerateRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    system: Option<&'a str>,
    stream: bool,
    format: &'static str,
    options: ModelOptions,
}

#[derive(Debug, Serialize)]
struct ModelOptions {
    temperature: f32,
    num_predict: u32,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    response: String,
}

pub struct OllamaClient {
    http: reqwest::Client,
    base_url: String,
    model: String,
    options: GenerationOptions,
}

impl OllamaClient {
    pub fn new(
        http: reqwest::Client,
        base_url: String,
        model: String,
        options: GenerationOptions,
    ) -> Self {
        Self {
            http,
            base_url: normalize_host(&base_url),
            model,
            options,
        }
    }

    async fn call(&self, system: Option<&str>, prompt: &str) -> Result<String> {
        let body = GenerateRequest {
            model: &self.model,
            prompt,
            system,
            stream: false,
            format: "json",
            options: ModelOptions {
                temperature: self.options.temperature,
                num_predict: self.options.max_tokens,
            },
        };

        let request = self
            .http
            .post(format!("{}/api/generate", self.base_url))
            .json(&body);

        let response: GenerateResponse = send_json("ollama", request).await?;
        if response.response.trim().is_empty() {
            return Err(empty_response("ollama"));
        }
        Ok(response.response)
    }
}

/// `OLLAMA_HOST` is often set without a scheme (`127.0.0.1:11434`)
pub fn normalize_host(host: &str) -> String {
    let host = host.trim().trim_end_matches('/');
    if host.starts_with("http://") || host.starts_with("https://") {
        host.to_string()
    } else {
        format!("http://{}", host)
    }
}

#[async_trait]
impl LLMClient for OllamaClient {
    async fn generate(&self, prompt: &str) -> Result<String> {
        self.call(None, prompt).await
    }

    async fn generate_with_system(&self, system: &str, prompt: &str) -> Result<String> {
        self.call(Some(system), prompt).await
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_host() {
        assert_eq!(normalize_host("127.0.0.1:11434"), "http://127.0.0.1:11434");
        assert_eq!(
            normalize_host("http://localhost:11434/"),
            "http://localhost:11434"
        );
        assert_eq!(
            normalize_host("https://ollama.internal"),
            "https://ollama.internal"
        );
    }
}
