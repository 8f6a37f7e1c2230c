//! OpenAI-compatible chat completions client
//!
//! Serves OpenAI itself plus OpenRouter and Perplexity, which expose the
//! same `/chat/completions` contract under a different base URL.

use super::client::{empty_response, send_json, GenerationOptions, LLMClient};
use crate::types::{Credential, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    temperature: f32,
    max_tokens: u32,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ResponseMessage {
    #[serde(default)]
    content: Option<String>,
}

pub struct OpenAIClient {
    http: reqwest::Client,
    name: String,
    api_key: Credential,
    api_base: String,
    model: String,
    options: GenerationOptions,
}

impl OpenAIClient {
    pub fn new(
        http: reqwest::Client,
        name: String,
        api_key: Credential,
        api_base: String,
        model: String,
        options: GenerationOptions,
    ) -> Self {
        Self {
            http,
            name,
            api_key,
            api_base: api_base.trim_end_matches('/').to_string(),
            model,
            options,
        }
    }

    async fn chat(&self, messages: Vec<ChatMessage<'_>>) -> Result<String> {
        let body = ChatRequest {
            model: &self.model,
            messages,
            temperature: self.options.temperature,
            max_tokens: self.options.max_tokens,
        };

        let request = self
            .http
            .post(format!("{}/chat/completions", self.api_base))
            .bearer_auth(self.api_key.expose())
            .json(&body);

        let response: ChatResponse = send_json(&self.name, request).await?;

        response
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .filter(|text| !text.trim().is_empty())
            .ok_or_else(|| empty_response(&self.name))
    }
}

#[async_trait]
impl LLMClient for OpenAIClient {
    async fn generate(&self, prompt: &str) -> Result<String> {
        self.chat(vec![ChatMessage {
            role: "user",
            content: prompt,
        }])
        .await
    }

    async fn generate_with_system(&self, system: &str, prompt: &str) -> Result<String> {
        self.chat(vec![
            ChatMessage {
                role: "system",
                content: system,
            },
            ChatMessage {
                role: "user",
                content: prompt,
            },
        ])
        .await
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}
