//! Shared test doubles.
//!
//! `CountingSource` and `ScriptedFactory` stand in for the network so the
//! orchestrator and the HTTP/MCP surfaces can be exercised end to end.

#![allow(dead_code)]

use async_trait::async_trait;
use chrono::Utc;
use community_research::llm::{LLMClient, LLMClientFactory, ProviderRegistry};
use community_research::research::orchestrator::Components;
use community_research::sources::{SourceClient, SourceError};
use community_research::types::{
    AppError, ProviderDescriptor, Query, Result, SearchResult, SourceKind,
};
use community_research::{Orchestrator, ResearchConfig};
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

pub fn hit(source: SourceKind, title: &str, score: i64) -> SearchResult {
    SearchResult {
        source,
        title: title.to_string(),
        url: format!("https://example.com/{}", title.replace(' ', "-").to_lowercase()),
        score,
        snippet: format!("{} snippet", title),
        retrieved_at: Utc::now(),
    }
}

/// Search source returning a fixed outcome and counting calls
pub struct CountingSource {
    kind: SourceKind,
    outcome: std::result::Result<Vec<SearchResult>, SourceError>,
    delay: Option<Duration>,
    calls: Arc<AtomicUsize>,
}

impl CountingSource {
    pub fn ok(kind: SourceKind, results: Vec<SearchResult>) -> Self {
        Self {
            kind,
            outcome: Ok(results),
            delay: None,
            calls: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn failing(kind: SourceKind, err: SourceError) -> Self {
        Self {
            kind,
            outcome: Err(err),
            delay: None,
            calls: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Call counter that survives moving the source into an orchestrator
    pub fn counter(&self) -> Arc<AtomicUsize> {
        Arc::clone(&self.calls)
    }
}

#[async_trait]
impl SourceClient for CountingSource {
    fn kind(&self) -> SourceKind {
        self.kind
    }

    async fn search(&self, _query: &Query) -> std::result::Result<Vec<SearchResult>, SourceError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        self.outcome.clone()
    }
}

#[derive(Default)]
struct Script {
    replies: Mutex<VecDeque<std::result::Result<String, String>>>,
    calls: AtomicUsize,
    prompts: Mutex<Vec<String>>,
}

/// Factory whose clients replay scripted replies in order.
///
/// Once the script runs out the last reply repeats.
#[derive(Clone, Default)]
pub struct ScriptedFactory {
    script: Arc<Script>,
}

impl ScriptedFactory {
    pub fn replying(replies: Vec<&str>) -> Self {
        let factory = Self::default();
        factory
            .script
            .replies
            .lock()
            .extend(replies.into_iter().map(|r| Ok(r.to_string())));
        factory
    }

    pub fn failing(reason: &str) -> Self {
        let factory = Self::default();
        factory.script.replies.lock().push_back(Err(reason.to_string()));
        factory
    }

    pub fn calls(&self) -> usize {
        self.script.calls.load(Ordering::SeqCst)
    }

    pub fn prompts(&self) -> Vec<String> {
        self.script.prompts.lock().clone()
    }
}

impl LLMClientFactory for ScriptedFactory {
    fn create(&self, _descriptor: &ProviderDescriptor) -> Result<Box<dyn LLMClient>> {
        Ok(Box::new(ScriptedClient {
            script: Arc::clone(&self.script),
        }))
    }
}

struct ScriptedClient {
    script: Arc<Script>,
}

impl ScriptedClient {
    fn next(&self, prompt: &str) -> Result<String> {
        self.script.calls.fetch_add(1, Ordering::SeqCst);
        self.script.prompts.lock().push(prompt.to_string());

        let mut replies = self.script.replies.lock();
        let reply = if replies.len() > 1 {
            replies.pop_front()
        } else {
            replies.front().cloned()
        };
        match reply {
            Some(Ok(text)) => Ok(text),
            Some(Err(reason)) => Err(AppError::SynthesisFailure {
                provider: "scripted".to_string(),
                reason,
            }),
            None => Ok(String::new()),
        }
    }
}

#[async_trait]
impl LLMClient for ScriptedClient {
    async fn generate(&self, prompt: &str) -> Result<String> {
        self.next(prompt)
    }

    async fn generate_with_system(&self, _system: &str, prompt: &str) -> Result<String> {
        self.next(prompt)
    }

    fn model_name(&self) -> &str {
        "scripted"
    }
}

/// A valid synthesis reply with `count` recommendations
pub fn recommendations_reply(count: usize) -> String {
    let recommendations: Vec<serde_json::Value> = (1..=count)
        .map(|i| {
            serde_json::json!({
                "title": format!("Approach {}", i),
                "description": "Run Celery workers against the Redis broker and enqueue from FastAPI routes.",
                "code_example": "celery -A app.worker worker --loglevel=info",
                "evidence": { "mentions": 3 + i, "upvotes_or_stars": 100 * i },
                "difficulty": "Medium",
                "gotchas": ["Workers do not share the FastAPI event loop"]
            })
        })
        .collect();
    serde_json::json!({ "recommendations": recommendations }).to_string()
}

pub fn gemini_available() -> Arc<ProviderRegistry> {
    Arc::new(ProviderRegistry::from_descriptors(vec![ProviderDescriptor {
        name: "gemini".to_string(),
        priority: 1,
        available: true,
    }]))
}

pub fn orchestrator(
    config: &ResearchConfig,
    sources: Vec<Arc<dyn SourceClient>>,
    factory: ScriptedFactory,
) -> Orchestrator {
    Orchestrator::new(
        config,
        Components {
            sources,
            providers: gemini_available(),
            llm_factory: Arc::new(factory),
        },
    )
}

pub fn fastapi_query() -> Query {
    Query::new("FastAPI background task queue with Redis and Celery")
        .with_language("Python")
        .with_goal("run jobs outside the request cycle")
}
