use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;
use utoipa::ToSchema;

// ============= Query Types =============

/// A developer's research question.
///
/// `topic` is the only required field. Queries are built per request and
/// never mutated once handed to the orchestrator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct Query {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,
    pub topic: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub goal: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current_setup: Option<String>,
}

impl Query {
    pub fn new(topic: impl Into<String>) -> Self {
        Self {
            language: None,
            topic: topic.into(),
            goal: None,
            current_setup: None,
        }
    }

    pub fn with_language(mut self, language: impl Into<String>) -> Self {
        self.language = Some(language.into());
        self
    }

    pub fn with_goal(mut self, goal: impl Into<String>) -> Self {
        self.goal = Some(goal.into());
        self
    }

    pub fn with_current_setup(mut self, current_setup: impl Into<String>) -> Self {
        self.current_setup = Some(current_setup.into());
        self
    }

    /// Free-text search string sent to the sources: `language topic goal`.
    pub fn search_text(&self) -> String {
        [
            self.language.as_deref(),
            Some(self.topic.as_str()),
            self.goal.as_deref(),
        ]
        .into_iter()
        .flatten()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
    }

    /// Language with surrounding whitespace removed, `None` when blank.
    pub fn language_hint(&self) -> Option<&str> {
        self.language
            .as_deref()
            .map(str::trim)
            .filter(|l| !l.is_empty())
    }
}

/// Output format requested by the caller
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema, JsonSchema,
)]
#[serde(rename_all = "lowercase")]
pub enum ResponseFormat {
    #[default]
    Markdown,
    Json,
}

/// Inbound `research` request shared by the HTTP and MCP surfaces
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct ResearchRequest {
    #[serde(default)]
    pub language: Option<String>,
    pub topic: String,
    #[serde(default)]
    pub goal: Option<String>,
    #[serde(default)]
    pub current_setup: Option<String>,
    #[serde(default)]
    pub response_format: ResponseFormat,
}

impl ResearchRequest {
    pub fn into_query(self) -> (Query, ResponseFormat) {
        let blank_to_none = |v: Option<String>| v.filter(|s| !s.trim().is_empty());
        (
            Query {
                language: blank_to_none(self.language),
                topic: self.topic,
                goal: blank_to_none(self.goal),
                current_setup: blank_to_none(self.current_setup),
            },
            self.response_format,
        )
    }
}

/// Outcome of query validation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct ValidationResult {
    pub accepted: bool,
    pub reason: Option<String>,
    pub suggestion: Option<String>,
}

impl ValidationResult {
    pub fn accept() -> Self {
        Self {
            accepted: true,
            reason: None,
            suggestion: None,
        }
    }

    pub fn reject(reason: impl Into<String>, suggestion: impl Into<String>) -> Self {
        Self {
            accepted: false,
            reason: Some(reason.into()),
            suggestion: Some(suggestion.into()),
        }
    }

    /// Convert a rejection into [`AppError::InvalidQuery`]
    pub fn into_result(self) -> Result<()> {
        if self.accepted {
            return Ok(());
        }
        Err(AppError::InvalidQuery {
            reason: self.reason.unwrap_or_else(|| "query rejected".to_string()),
            suggestion: self.suggestion.unwrap_or_default(),
        })
    }
}

// ============= Evidence Types =============

/// The kind of external search backend a result came from.
///
/// Declaration order is the stable ordering used in aggregated evidence.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, ToSchema,
)]
#[serde(rename_all = "snake_case")]
pub enum SourceKind {
    StackExchangeLike,
    IssueTrackerLike,
    ForumLike,
    AggregatorLike,
}

impl SourceKind {
    pub const ALL: [SourceKind; 4] = [
        SourceKind::StackExchangeLike,
        SourceKind::IssueTrackerLike,
        SourceKind::ForumLike,
        SourceKind::AggregatorLike,
    ];

    /// Human-readable backend name used in rendered output
    pub fn display_name(&self) -> &'static str {
        match self {
            SourceKind::StackExchangeLike => "Stack Overflow",
            SourceKind::IssueTrackerLike => "GitHub Issues",
            SourceKind::ForumLike => "Reddit",
            SourceKind::AggregatorLike => "Hacker News",
        }
    }

    /// Configuration key for this source
    pub fn config_key(&self) -> &'static str {
        match self {
            SourceKind::StackExchangeLike => "stackexchange",
            SourceKind::IssueTrackerLike => "github",
            SourceKind::ForumLike => "reddit",
            SourceKind::AggregatorLike => "hackernews",
        }
    }
}

impl fmt::Display for SourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}

/// A single hit returned by a source
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct SearchResult {
    pub source: SourceKind,
    pub title: String,
    pub url: String,
    /// Source-native ranking signal (votes, reactions, points)
    pub score: i64,
    pub snippet: String,
    pub retrieved_at: DateTime<Utc>,
}

/// Per-source outcome of an aggregation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum SourceStatus {
    Ok,
    TimedOut,
    Failed,
    RateLimited,
}

impl SourceStatus {
    pub fn is_ok(&self) -> bool {
        matches!(self, SourceStatus::Ok)
    }
}

impl fmt::Display for SourceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            SourceStatus::Ok => "ok",
            SourceStatus::TimedOut => "timed out",
            SourceStatus::Failed => "failed",
            SourceStatus::RateLimited => "rate limited",
        };
        f.write_str(label)
    }
}

/// Results and status from one source
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceEvidence {
    pub source: SourceKind,
    pub status: SourceStatus,
    pub results: Vec<SearchResult>,
    /// Failure detail for non-ok sources
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl SourceEvidence {
    pub fn ok(source: SourceKind, results: Vec<SearchResult>) -> Self {
        Self {
            source,
            status: SourceStatus::Ok,
            results,
            error: None,
        }
    }

    pub fn failed(source: SourceKind, status: SourceStatus, error: impl Into<String>) -> Self {
        Self {
            source,
            status,
            results: Vec::new(),
            error: Some(error.into()),
        }
    }
}

/// Evidence gathered for one query, grouped by source in declaration order.
///
/// Partial evidence (some sources failed) is a valid state.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AggregatedEvidence {
    pub sources: Vec<SourceEvidence>,
}

impl AggregatedEvidence {
    pub fn total_results(&self) -> usize {
        self.sources.iter().map(|s| s.results.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.total_results() == 0
    }

    /// Sources that answered successfully and contributed at least one hit
    pub fn contributing(&self) -> impl Iterator<Item = &SourceEvidence> {
        self.sources
            .iter()
            .filter(|s| s.status.is_ok() && !s.results.is_empty())
    }

    /// All results, by source order then by the source's own rank
    pub fn results(&self) -> impl Iterator<Item = &SearchResult> {
        self.sources.iter().flat_map(|s| s.results.iter())
    }

    pub fn status_of(&self, source: SourceKind) -> Option<SourceStatus> {
        self.sources
            .iter()
            .find(|s| s.source == source)
            .map(|s| s.status)
    }

    pub fn summary(&self) -> Vec<SourceSummary> {
        self.sources
            .iter()
            .map(|s| SourceSummary {
                source: s.source,
                status: s.status,
                result_count: s.results.len(),
            })
            .collect()
    }
}

// ============= Recommendation Types =============

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub enum Difficulty {
    Easy,
    Medium,
    Hard,
}

impl fmt::Display for Difficulty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Difficulty::Easy => "Easy",
            Difficulty::Medium => "Medium",
            Difficulty::Hard => "Hard",
        };
        f.write_str(label)
    }
}

/// Community validation behind a recommendation
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct EvidenceSignal {
    pub mentions: u64,
    pub upvotes_or_stars: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Recommendation {
    pub title: String,
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code_example: Option<String>,
    pub evidence: EvidenceSignal,
    pub difficulty: Difficulty,
    #[serde(default)]
    pub gotchas: Vec<String>,
}

/// Result count and status of one source, carried alongside recommendations
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct SourceSummary {
    pub source: SourceKind,
    pub status: SourceStatus,
    pub result_count: usize,
}

/// 1 to 5 ranked recommendations for a query.
///
/// This is the unit stored in the cache and returned to callers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct RecommendationSet {
    pub query: Query,
    pub recommendations: Vec<Recommendation>,
    pub generated_at: DateTime<Utc>,
    /// Synthesis backend that produced the recommendations
    pub provider: String,
    #[serde(default)]
    pub sources: Vec<SourceSummary>,
}

// ============= Provider Types =============

/// A synthesis backend known to the server.
///
/// `available` means a credential for it was discovered at startup.
/// Lower `priority` values are preferred.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct ProviderDescriptor {
    pub name: String,
    pub priority: u32,
    pub available: bool,
}

/// An API key or token read from the environment.
///
/// `Debug` never prints the value, so configs and clients holding one can
/// be logged freely.
#[derive(Clone, PartialEq, Eq)]
pub struct Credential(String);

impl Credential {
    /// Wrap a raw environment value; blank values count as absent
    pub fn from_env_value(value: Option<String>) -> Option<Self> {
        value
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
            .map(Credential)
    }

    pub fn new(value: impl Into<String>) -> Self {
        Credential(value.into())
    }

    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Credential(***)")
    }
}

// ============= Error Types =============

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Invalid query: {reason}")]
    InvalidQuery { reason: String, suggestion: String },

    #[error("Rate limit exceeded, retry in {} seconds", retry_after_secs(.retry_after))]
    RateLimited { retry_after: Duration },

    #[error("No results found for \"{topic}\" in any source")]
    NoResultsFound { topic: String },

    #[error("No synthesis provider configured")]
    NoProviderConfigured,

    #[error("Synthesis with '{provider}' failed: {reason}")]
    SynthesisFailure { provider: String, reason: String },

    #[error("Source {origin} unavailable: {reason}")]
    SourceUnavailable { origin: SourceKind, reason: String },

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("HTTP error: {0}")]
    Http(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

/// Whole seconds to wait, rounded up so a pending wait never reads as zero
pub fn retry_after_secs(retry_after: &Duration) -> u64 {
    let secs = retry_after.as_secs();
    if retry_after.subsec_nanos() > 0 || secs == 0 {
        secs + 1
    } else {
        secs
    }
}

impl AppError {
    /// Stable machine-readable identifier for this error kind
    pub fn kind(&self) -> &'static str {
        match self {
            AppError::InvalidQuery { .. } => "invalid_query",
            AppError::RateLimited { .. } => "rate_limited",
            AppError::NoResultsFound { .. } => "no_results_found",
            AppError::NoProviderConfigured => "no_provider_configured",
            AppError::SynthesisFailure { .. } => "synthesis_failure",
            AppError::SourceUnavailable { .. } => "source_unavailable",
            AppError::Configuration(_) => "configuration",
            AppError::Http(_) => "http",
            AppError::Internal(_) => "internal",
        }
    }

    /// What the user or operator should do about this error
    pub fn corrective_action(&self) -> String {
        match self {
            AppError::InvalidQuery { suggestion, .. } => suggestion.clone(),
            AppError::RateLimited { retry_after } => format!(
                "Wait {} seconds and retry the same query.",
                retry_after_secs(retry_after)
            ),
            AppError::NoResultsFound { .. } => {
                "Broaden the topic: use more common terms, drop version numbers, or remove the goal."
                    .to_string()
            }
            AppError::NoProviderConfigured => {
                "Set one of GEMINI_API_KEY, OPENAI_API_KEY, ANTHROPIC_API_KEY, OPENROUTER_API_KEY, \
                 PERPLEXITY_API_KEY or OLLAMA_HOST in the server environment (or .env) and restart."
                    .to_string()
            }
            AppError::SynthesisFailure { provider, .. } => format!(
                "Retry the query; if it keeps failing, check the '{}' API key, quota and model settings.",
                provider
            ),
            AppError::SourceUnavailable { origin, .. } => format!(
                "{} is the only enabled source and it is unreachable. Retry later or enable more sources.",
                origin
            ),
            AppError::Configuration(_) => {
                "Fix the configuration file and restart the server.".to_string()
            }
            AppError::Http(_) => "Check network connectivity and retry.".to_string(),
            AppError::Internal(_) => "Retry the request; report the issue if it persists.".to_string(),
        }
    }

    /// Retry-after hint, only for rate limiting
    pub fn retry_after(&self) -> Option<Duration> {
        match self {
            AppError::RateLimited { retry_after } => Some(*retry_after),
            _ => None,
        }
    }

    /// `{error, kind, action, retry_after_secs?}` body shared by every surface
    pub fn to_json(&self) -> serde_json::Value {
        let mut body = serde_json::json!({
            "error": self.to_string(),
            "kind": self.kind(),
            "action": self.corrective_action(),
        });
        if let Some(retry_after) = self.retry_after() {
            body["retry_after_secs"] = serde_json::json!(retry_after_secs(&retry_after));
        }
        body
    }

    fn status_code(&self) -> axum::http::StatusCode {
        use axum::http::StatusCode;
        match self {
            AppError::InvalidQuery { .. } => StatusCode::BAD_REQUEST,
            AppError::RateLimited { .. } => StatusCode::TOO_MANY_REQUESTS,
            AppError::NoResultsFound { .. } => StatusCode::NOT_FOUND,
            AppError::NoProviderConfigured => StatusCode::SERVICE_UNAVAILABLE,
            AppError::SynthesisFailure { .. } => StatusCode::BAD_GATEWAY,
            AppError::SourceUnavailable { .. } => StatusCode::BAD_GATEWAY,
            AppError::Http(_) => StatusCode::BAD_GATEWAY,
            AppError::Configuration(_) | AppError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl From<reqwest::Error> for AppError {
    fn from(err: reqwest::Error) -> Self {
        AppError::Http(err.to_string())
    }
}

impl axum::response::IntoResponse for AppError {
    fn into_response(self) -> axum::response::Response {
        let status = self.status_code();
        let retry_after = self.retry_after().map(|d| retry_after_secs(&d));

        let mut response = (status, axum::Json(self.to_json())).into_response();
        if let Some(secs) = retry_after {
            if let Ok(value) = axum::http::HeaderValue::from_str(&secs.to_string()) {
                response
                    .headers_mut()
                    .insert(axum::http::header::RETRY_AFTER, value);
            }
        }
        response
    }
}

pub type Result<T> = std::result::Result<T, AppError>;
