//! Synthesis pipeline
//!
//! Turns aggregated evidence into a [`RecommendationSet`] using the provider
//! selected for the request. The provider is fixed for the whole call; a
//! failure never falls back to another backend.
//!
//! Each backend call runs under `timeout_secs`. Transport failures and
//! timeouts surface immediately as [`AppError::SynthesisFailure`]. Output
//! that fails strict parsing is retried `parse_retries` times (default 1)
//! against the same client with a correction appended to the prompt.

pub mod prompt;
pub mod schema;

pub use schema::{parse_recommendations, ParseFailure};

use crate::llm::{GenerationOptions, LLMClientFactory};
use crate::types::{
    AggregatedEvidence, AppError, ProviderDescriptor, Query, RecommendationSet, Result,
};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;

/// The `[synthesis]` configuration section
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SynthesisConfig {
    /// Timeout per backend call in seconds (default: 60)
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    #[serde(default = "default_temperature")]
    pub temperature: f32,

    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,

    /// Extra attempts after unparseable output (default: 1)
    #[serde(default = "default_parse_retries")]
    pub parse_retries: u32,
}

fn default_timeout_secs() -> u64 {
    60
}

fn default_temperature() -> f32 {
    0.3
}

fn default_max_tokens() -> u32 {
    4096
}

fn default_parse_retries() -> u32 {
    1
}

impl Default for SynthesisConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_timeout_secs(),
            temperature: default_temperature(),
            max_tokens: default_max_tokens(),
            parse_retries: default_parse_retries(),
        }
    }
}

impl SynthesisConfig {
    pub fn generation_options(&self) -> GenerationOptions {
        GenerationOptions {
            temperature: self.temperature,
            max_tokens: self.max_tokens,
        }
    }
}

pub struct SynthesisPipeline {
    factory: Arc<dyn LLMClientFactory>,
    timeout: Duration,
    parse_retries: u32,
}

impl SynthesisPipeline {
    pub fn new(factory: Arc<dyn LLMClientFactory>, config: &SynthesisConfig) -> Self {
        Self {
            factory,
            timeout: Duration::from_secs(config.timeout_secs),
            parse_retries: config.parse_retries,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Synthesize recommendations with `provider`
    pub async fn synthesize(
        &self,
        query: &Query,
        evidence: &AggregatedEvidence,
        provider: &ProviderDescriptor,
    ) -> Result<RecommendationSet> {
        let client = self.factory.create(provider)?;
        let base_prompt = prompt::build_prompt(query, evidence);
        let attempts = self.parse_retries + 1;

        let mut prompt_text = base_prompt.clone();
        let mut last_failure = None;

        for attempt in 1..=attempts {
            tracing::debug!(
                provider = %provider.name,
                model = client.model_name(),
                attempt,
                "Requesting synthesis"
            );

            let reply = tokio::time::timeout(
                self.timeout,
                client.generate_with_system(prompt::SYSTEM_PROMPT, &prompt_text),
            )
            .await
            .map_err(|_| AppError::SynthesisFailure {
                provider: provider.name.clone(),
                reason: format!("no response within {}s", self.timeout.as_secs()),
            })?
            .map_err(|e| match e {
                AppError::SynthesisFailure { .. } => e,
                other => AppError::SynthesisFailure {
                    provider: provider.name.clone(),
                    reason: other.to_string(),
                },
            })?;

            match schema::parse_recommendations(&reply) {
                Ok(recommendations) => {
                    tracing::info!(
                        provider = %provider.name,
                        count = recommendations.len(),
                        "Synthesis complete"
                    );
                    return Ok(RecommendationSet {
                        query: query.clone(),
                        recommendations,
                        generated_at: Utc::now(),
                        provider: provider.name.clone(),
                        sources: evidence.summary(),
                    });
                }
                Err(failure) => {
                    tracing::warn!(
                        provider = %provider.name,
                        attempt,
                        error = %failure,
                        "Synthesis output rejected"
                    );
                    prompt_text = prompt::build_retry_prompt(&base_prompt, &failure);
                    last_failure = Some(failure);
                }
            }
        }

        Err(AppError::SynthesisFailure {
            provider: provider.name.clone(),
            reason: match last_failure {
                Some(failure) => format!("unusable output after {} attempts: {}", attempts, failure),
                None => "no attempts made".to_string(),
            },
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::client::{LLMClient, MockLLMClientFactory};
    use crate::types::{SearchResult, SourceEvidence, SourceKind};
    use async_trait::async_trait;
    use parking_lot::Mutex;
    use std::collections::VecDeque;

    struct ScriptedClient {
        replies: Mutex<VecDeque<Result<String>>>,
        prompts: Arc<Mutex<Vec<String>>>,
        delay: Duration,
    }

    #[async_trait]
    impl LLMClient for ScriptedClient {
        async fn generate(&self, prompt: &str) -> Result<String> {
            self.generate_with_system("", prompt).await
        }

        async fn generate_with_system(&self, _system: &str, prompt: &str) -> Result<String> {
            self.prompts.lock().push(prompt.to_string());
            tokio::time::sleep(self.delay).await;
            self.replies
                .lock()
                .pop_front()
                .unwrap_or_else(|| Err(AppError::Internal("script exhausted".into())))
        }

        fn model_name(&self) -> &str {
            "scripted"
        }
    }

    const GOOD: &str = r#"{"recommendations":[{"title":"Use Celery","description":"Run workers.","code_example":null,"evidence":{"mentions":3,"upvotes_or_stars":120},"difficulty":"Medium","gotchas":[]}]}"#;

    fn pipeline_with(
        replies: Vec<Result<String>>,
        delay: Duration,
    ) -> (SynthesisPipeline, Arc<Mutex<Vec<String>>>) {
        let prompts = Arc::new(Mutex::new(Vec::new()));
        let client_prompts = Arc::clone(&prompts);
        let replies = Mutex::new(Some(replies));

        let mut factory = MockLLMClientFactory::new();
        factory.expect_create().times(1).returning(move |_| {
            let client: Box<dyn LLMClient> = Box::new(ScriptedClient {
                replies: Mutex::new(replies.lock().take().unwrap_or_default().into()),
                prompts: Arc::clone(&client_prompts),
                delay,
            });
            Ok(client)
        });

        let pipeline = SynthesisPipeline::new(Arc::new(factory), &SynthesisConfig::default());
        (pipeline, prompts)
    }

    fn evidence() -> AggregatedEvidence {
        AggregatedEvidence {
            sources: vec![SourceEvidence::ok(
                SourceKind::StackExchangeLike,
                vec![SearchResult {
                    source: SourceKind::StackExchangeLike,
                    title: "Celery with FastAPI".into(),
                    url: "https://stackoverflow.com/q/1".into(),
                    score: 40,
                    snippet: String::new(),
                    retrieved_at: Utc::now(),
                }],
            )],
        }
    }

    fn provider() -> ProviderDescriptor {
        ProviderDescriptor {
            name: "gemini".into(),
            priority: 1,
            available: true,
        }
    }

    fn query() -> Query {
        Query::new("FastAPI background task queue").with_language("Python")
    }

    #[tokio::test]
    async fn test_successful_synthesis() {
        let (pipeline, prompts) = pipeline_with(vec![Ok(GOOD.to_string())], Duration::ZERO);
        let set = pipeline
            .synthesize(&query(), &evidence(), &provider())
            .await
            .unwrap();

        assert_eq!(set.recommendations.len(), 1);
        assert_eq!(set.provider, "gemini");
        assert_eq!(set.sources.len(), 1);
        assert_eq!(set.query, query());
        assert_eq!(prompts.lock().len(), 1);
    }

    #[tokio::test]
    async fn test_parse_failure_is_retried_once() {
        let (pipeline, prompts) = pipeline_with(
            vec![Ok("Sure! Use Celery.".to_string()), Ok(format!("```json\n{}\n```", GOOD))],
            Duration::ZERO,
        );
        let set = pipeline
            .synthesize(&query(), &evidence(), &provider())
            .await
            .unwrap();

        assert_eq!(set.recommendations[0].title, "Use Celery");
        let prompts = prompts.lock();
        assert_eq!(prompts.len(), 2);
        assert!(prompts[1].contains("## Correction"));
    }

    #[tokio::test]
    async fn test_two_parse_failures_surface_synthesis_failure() {
        let (pipeline, prompts) = pipeline_with(
            vec![Ok("nope".to_string()), Ok(r#"{"recommendations":[]}"#.to_string())],
            Duration::ZERO,
        );
        let err = pipeline
            .synthesize(&query(), &evidence(), &provider())
            .await
            .unwrap_err();

        match err {
            AppError::SynthesisFailure { provider, reason } => {
                assert_eq!(provider, "gemini");
                assert!(reason.contains("2 attempts"));
            }
            other => panic!("expected SynthesisFailure, got {other:?}"),
        }
        assert_eq!(prompts.lock().len(), 2);
    }

    #[tokio::test]
    async fn test_transport_error_is_not_retried() {
        let (pipeline, prompts) = pipeline_with(
            vec![
                Err(AppError::Http("connection refused".into())),
                Ok(GOOD.to_string()),
            ],
            Duration::ZERO,
        );
        let err = pipeline
            .synthesize(&query(), &evidence(), &provider())
            .await
            .unwrap_err();

        assert!(matches!(err, AppError::SynthesisFailure { .. }));
        assert!(err.to_string().contains("connection refused"));
        assert_eq!(prompts.lock().len(), 1);
    }

    #[tokio::test]
    async fn test_timeout_surfaces_synthesis_failure() {
        let (pipeline, _) = pipeline_with(vec![Ok(GOOD.to_string())], Duration::from_secs(30));
        let pipeline = pipeline.with_timeout(Duration::from_millis(50));

        let err = pipeline
            .synthesize(&query(), &evidence(), &provider())
            .await
            .unwrap_err();
        assert!(err.to_string().contains("no response within"));
    }
}
