//! The `research` façade
//!
//! One call walks a fixed sequence of stages:
//!
//! ```text
//! Validating -> CacheCheck -> RateLimitCheck -> Searching -> Synthesizing -> Done
//! ```
//!
//! A cache hit returns straight from `CacheCheck` without touching the rate
//! limiter or the network. Any stage can exit with a typed [`AppError`].
//! Only a completed `Synthesizing` stage writes to the cache, so a dropped
//! or failed request leaves nothing behind.
//!
//! The provider is chosen once, right after the cache check, so a server
//! without credentials can still answer cached queries but never spends
//! rate-limit budget or source calls on a request it cannot synthesize.

use crate::cache::{CacheStats, ResearchCache, TtlResearchCache};
use crate::llm::{LLMClientFactory, ProviderRegistry};
use crate::rate_limit::{RateLimitStatus, RateLimiter};
use crate::research::validator::QueryValidator;
use crate::sources::{build_sources, SearchAggregator, SourceClient};
use crate::synthesis::SynthesisPipeline;
use crate::types::{AppError, ProviderDescriptor, Query, RecommendationSet, Result, SourceKind};
use crate::utils::toml_config::ResearchConfig;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tracing::Instrument;
use uuid::Uuid;

/// Stage of a single research call
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResearchStage {
    Validating,
    CacheCheck,
    RateLimitCheck,
    Searching,
    Synthesizing,
    Done,
}

impl fmt::Display for ResearchStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            ResearchStage::Validating => "validating",
            ResearchStage::CacheCheck => "cache_check",
            ResearchStage::RateLimitCheck => "rate_limit_check",
            ResearchStage::Searching => "searching",
            ResearchStage::Synthesizing => "synthesizing",
            ResearchStage::Done => "done",
        };
        f.write_str(label)
    }
}

/// Injected collaborators for an [`Orchestrator`]
pub struct Components {
    pub sources: Vec<Arc<dyn SourceClient>>,
    pub providers: Arc<ProviderRegistry>,
    pub llm_factory: Arc<dyn LLMClientFactory>,
}

impl Components {
    /// Build real HTTP sources and discover providers from the environment
    pub fn discover(
        config: &ResearchConfig,
        env: &dyn Fn(&str) -> Option<String>,
    ) -> Result<Self> {
        let http = reqwest::Client::builder()
            .user_agent(config.search.user_agent.clone())
            .build()
            .map_err(|e| AppError::Internal(format!("failed to build HTTP client: {}", e)))?;

        let sources = build_sources(&config.sources, &config.search, http.clone(), env);
        let providers = Arc::new(ProviderRegistry::discover(
            &config.providers,
            config.synthesis.generation_options(),
            http,
            env,
        ));

        Ok(Self {
            sources,
            llm_factory: providers.clone(),
            providers,
        })
    }
}

pub struct Orchestrator {
    validator: QueryValidator,
    cache: Arc<dyn ResearchCache>,
    cache_ttl: Duration,
    rate_limiter: Arc<RateLimiter>,
    aggregator: SearchAggregator,
    providers: Arc<ProviderRegistry>,
    synthesis: SynthesisPipeline,
}

impl Orchestrator {
    /// Wire an orchestrator from configuration and explicit collaborators
    pub fn new(config: &ResearchConfig, components: Components) -> Self {
        Self {
            validator: QueryValidator::new(),
            cache: Arc::new(TtlResearchCache::new(config.cache.clone())),
            cache_ttl: config.cache.ttl(),
            rate_limiter: Arc::new(RateLimiter::new(&config.rate_limit)),
            aggregator: SearchAggregator::new(
                components.sources,
                config.search.aggregation_timeout(),
            ),
            providers: components.providers,
            synthesis: SynthesisPipeline::new(components.llm_factory, &config.synthesis),
        }
    }

    /// Build everything from configuration and the process environment
    pub fn from_config(config: &ResearchConfig) -> Result<Self> {
        let env = |name: &str| std::env::var(name).ok();
        let components = Components::discover(config, &env)?;
        Ok(Self::new(config, components))
    }

    /// Share an existing cache (e.g. between the HTTP and MCP surfaces)
    pub fn with_cache(mut self, cache: Arc<dyn ResearchCache>) -> Self {
        self.cache = cache;
        self
    }

    /// Answer a query with cached or freshly synthesized recommendations
    pub async fn research(&self, query: Query) -> Result<Arc<RecommendationSet>> {
        let request_id = Uuid::new_v4();
        let span = tracing::info_span!("research", %request_id, topic = %query.topic);
        self.run(query).instrument(span).await
    }

    async fn run(&self, query: Query) -> Result<Arc<RecommendationSet>> {
        let mut stage = ResearchStage::Validating;
        let result = self.run_stages(&query, &mut stage).await;

        match &result {
            Ok(_) => tracing::debug!(stage = %ResearchStage::Done, "Research finished"),
            Err(err) => tracing::info!(stage = %stage, kind = err.kind(), error = %err, "Research failed"),
        }
        result
    }

    async fn run_stages(
        &self,
        query: &Query,
        stage: &mut ResearchStage,
    ) -> Result<Arc<RecommendationSet>> {
        Self::enter(stage, ResearchStage::Validating);
        self.validator.validate(query).into_result()?;

        Self::enter(stage, ResearchStage::CacheCheck);
        let key = self.cache.compute_key(query);
        if let Some(hit) = self.cache.get(&key) {
            tracing::debug!(cache_key = %key, "Cache hit");
            return Ok(hit);
        }

        let provider = self.providers.select()?;

        Self::enter(stage, ResearchStage::RateLimitCheck);
        let _permit = self.rate_limiter.acquire()?;

        Self::enter(stage, ResearchStage::Searching);
        let evidence = self.aggregator.aggregate(query).await?;

        Self::enter(stage, ResearchStage::Synthesizing);
        let set = Arc::new(self.synthesis.synthesize(query, &evidence, &provider).await?);

        self.cache.put(&key, Arc::clone(&set), Some(self.cache_ttl));
        Self::enter(stage, ResearchStage::Done);
        Ok(set)
    }

    fn enter(stage: &mut ResearchStage, next: ResearchStage) {
        *stage = next;
        tracing::debug!(stage = %next, "Research stage");
    }

    /// Validate without any side effects
    pub fn validate(&self, query: &Query) -> crate::types::ValidationResult {
        self.validator.validate(query)
    }

    /// Every known backend in priority order
    pub fn providers(&self) -> &[ProviderDescriptor] {
        self.providers.descriptors()
    }

    /// The backend `research` would use now, if any
    pub fn selected_provider(&self) -> Option<ProviderDescriptor> {
        self.providers.select().ok()
    }

    pub fn rate_limit_status(&self) -> RateLimitStatus {
        self.rate_limiter.status()
    }

    pub fn cache_stats(&self) -> CacheStats {
        self.cache.stats()
    }

    pub fn active_sources(&self) -> Vec<SourceKind> {
        self.aggregator.source_kinds()
    }
}
