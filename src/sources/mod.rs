//! External search sources
//!
//! One [`SourceClient`] per public knowledge backend, each normalizing its
//! native ranking signal into [`SearchResult::score`] and truncating to a
//! bounded result count. Every client runs its HTTP exchange under a
//! [`RetryPolicy`](retry::RetryPolicy); a client that exhausts its retries
//! reports a [`SourceError`], which the [`SearchAggregator`] records as a
//! per-source status rather than failing the request.
//!
//! | Backend | Kind | Score |
//! |---------|------|-------|
//! | Stack Exchange | `StackExchangeLike` | question score |
//! | GitHub issues | `IssueTrackerLike` | reactions (fallback: comments) |
//! | Reddit | `ForumLike` | post score |
//! | Hacker News (Algolia) | `AggregatorLike` | points |

pub mod aggregator;
pub mod github;
pub mod hackernews;
pub mod reddit;
pub mod retry;
pub mod stackexchange;

pub use aggregator::SearchAggregator;
pub use retry::RetryPolicy;

use crate::types::{Credential, Query, SearchResult, SourceKind, SourceStatus};
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;

/// Common capability of every search backend
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait SourceClient: Send + Sync {
    /// Which backend this client talks to
    fn kind(&self) -> SourceKind;

    /// Search the backend, returning at most the configured number of hits
    /// in the backend's own rank order
    async fn search(&self, query: &Query) -> std::result::Result<Vec<SearchResult>, SourceError>;
}

// ============= Errors =============

/// Failure of a single source request
#[derive(Debug, Clone, thiserror::Error)]
pub enum SourceError {
    #[error("network error: {0}")]
    Network(String),

    #[error("request timed out after {0:?}")]
    Timeout(Duration),

    #[error("rate limited by backend")]
    RateLimited { retry_after: Option<Duration> },

    #[error("HTTP {status}: {body}")]
    Status { status: u16, body: String },

    #[error("malformed response: {0}")]
    Malformed(String),
}

impl SourceError {
    /// Whether another attempt might succeed
    pub fn is_transient(&self) -> bool {
        match self {
            SourceError::Network(_) | SourceError::Timeout(_) | SourceError::RateLimited { .. } => {
                true
            }
            SourceError::Status { status, .. } => *status >= 500,
            SourceError::Malformed(_) => false,
        }
    }

    /// Per-source status recorded in aggregated evidence
    pub fn status(&self) -> SourceStatus {
        match self {
            SourceError::Timeout(_) => SourceStatus::TimedOut,
            SourceError::RateLimited { .. } => SourceStatus::RateLimited,
            _ => SourceStatus::Failed,
        }
    }
}

impl From<reqwest::Error> for SourceError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            SourceError::Malformed(err.to_string())
        } else {
            // strip the URL so query strings with keys never reach the logs
            SourceError::Network(err.without_url().to_string())
        }
    }
}

// ============= Configuration =============

/// Retry and timeout settings shared by all sources
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchConfig {
    /// Timeout for a single HTTP attempt (default: 10)
    #[serde(default = "default_attempt_timeout_secs")]
    pub attempt_timeout_secs: u64,

    /// Budget for the whole fan-out (default: 40)
    #[serde(default = "default_aggregation_timeout_secs")]
    pub aggregation_timeout_secs: u64,

    /// Attempts per source, including the first (default: 3)
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    #[serde(default = "default_base_delay_ms")]
    pub base_delay_ms: u64,

    #[serde(default = "default_max_delay_ms")]
    pub max_delay_ms: u64,

    /// User-Agent sent to every backend
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

fn default_attempt_timeout_secs() -> u64 {
    10
}

fn default_aggregation_timeout_secs() -> u64 {
    40
}

fn default_max_attempts() -> u32 {
    3
}

fn default_base_delay_ms() -> u64 {
    500
}

fn default_max_delay_ms() -> u64 {
    4000
}

fn default_user_agent() -> String {
    format!("community-research/{}", env!("CARGO_PKG_VERSION"))
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            attempt_timeout_secs: default_attempt_timeout_secs(),
            aggregation_timeout_secs: default_aggregation_timeout_secs(),
            max_attempts: default_max_attempts(),
            base_delay_ms: default_base_delay_ms(),
            max_delay_ms: default_max_delay_ms(),
            user_agent: default_user_agent(),
        }
    }
}

impl SearchConfig {
    pub fn aggregation_timeout(&self) -> Duration {
        Duration::from_secs(self.aggregation_timeout_secs)
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_attempts: self.max_attempts,
            attempt_timeout: Duration::from_secs(self.attempt_timeout_secs),
            base_delay: Duration::from_millis(self.base_delay_ms),
            max_delay: Duration::from_millis(self.max_delay_ms),
        }
    }
}

/// Settings for one source (`[sources.<name>]`)
///
/// Unset fields fall back to per-backend defaults, see [`SourceDefaults`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceConfig {
    #[serde(default = "default_source_enabled")]
    pub enabled: bool,

    /// Base URL override, e.g. to point at a proxy or a mock server
    #[serde(default)]
    pub endpoint: Option<String>,

    /// Environment variable holding the optional API key/token
    #[serde(default)]
    pub credential_env: Option<String>,

    /// Drop the source when its credential is missing
    #[serde(default)]
    pub requires_credential: bool,

    #[serde(default)]
    pub max_results: Option<usize>,
}

fn default_source_enabled() -> bool {
    true
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            enabled: default_source_enabled(),
            endpoint: None,
            credential_env: None,
            requires_credential: false,
            max_results: None,
        }
    }
}

/// The `[sources]` table
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SourcesConfig {
    #[serde(default)]
    pub stackexchange: SourceConfig,
    #[serde(default)]
    pub github: SourceConfig,
    #[serde(default)]
    pub reddit: SourceConfig,
    #[serde(default)]
    pub hackernews: SourceConfig,
}

impl SourcesConfig {
    pub fn get(&self, kind: SourceKind) -> &SourceConfig {
        match kind {
            SourceKind::StackExchangeLike => &self.stackexchange,
            SourceKind::IssueTrackerLike => &self.github,
            SourceKind::ForumLike => &self.reddit,
            SourceKind::AggregatorLike => &self.hackernews,
        }
    }

    pub fn enabled(&self) -> impl Iterator<Item = SourceKind> + '_ {
        SourceKind::ALL
            .into_iter()
            .filter(|kind| self.get(*kind).enabled)
    }
}

/// Built-in endpoint, result cap and credential variable per backend
#[derive(Debug, Clone, Copy)]
pub struct SourceDefaults {
    pub endpoint: &'static str,
    pub max_results: usize,
    pub credential_env: Option<&'static str>,
}

impl SourceDefaults {
    pub fn for_kind(kind: SourceKind) -> Self {
        match kind {
            SourceKind::StackExchangeLike => Self {
                endpoint: "https://api.stackexchange.com/2.3",
                max_results: 5,
                credential_env: Some("STACKEXCHANGE_KEY"),
            },
            SourceKind::IssueTrackerLike => Self {
                endpoint: "https://api.github.com",
                max_results: 5,
                credential_env: Some("GITHUB_TOKEN"),
            },
            SourceKind::ForumLike => Self {
                endpoint: "https://www.reddit.com",
                max_results: 5,
                credential_env: None,
            },
            SourceKind::AggregatorLike => Self {
                endpoint: "https://hn.algolia.com/api/v1",
                max_results: 3,
                credential_env: None,
            },
        }
    }
}

/// Resolved per-client settings handed to each [`SourceClient`]
#[derive(Debug, Clone)]
pub struct SourceSettings {
    pub endpoint: String,
    pub credential: Option<Credential>,
    pub max_results: usize,
    pub user_agent: String,
    pub retry: RetryPolicy,
}

impl SourceSettings {
    pub fn resolve(
        kind: SourceKind,
        config: &SourceConfig,
        search: &SearchConfig,
        env: &dyn Fn(&str) -> Option<String>,
    ) -> Self {
        let defaults = SourceDefaults::for_kind(kind);
        let credential_env = config.credential_env.as_deref().or(defaults.credential_env);

        Self {
            endpoint: config
                .endpoint
                .clone()
                .unwrap_or_else(|| defaults.endpoint.to_string())
                .trim_end_matches('/')
                .to_string(),
            credential: credential_env.and_then(|name| Credential::from_env_value(env(name))),
            max_results: config.max_results.unwrap_or(defaults.max_results),
            user_agent: search.user_agent.clone(),
            retry: search.retry_policy(),
        }
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.endpoint, path)
    }
}

/// Build the active source set in declaration order.
///
/// Disabled sources are skipped; a source that requires a credential and
/// has none is dropped with a log line instead of failing startup.
pub fn build_sources(
    sources: &SourcesConfig,
    search: &SearchConfig,
    http: reqwest::Client,
    env: &dyn Fn(&str) -> Option<String>,
) -> Vec<Arc<dyn SourceClient>> {
    let mut active: Vec<Arc<dyn SourceClient>> = Vec::new();

    for kind in sources.enabled() {
        let config = sources.get(kind);
        let settings = SourceSettings::resolve(kind, config, search, env);

        if config.requires_credential && settings.credential.is_none() {
            tracing::info!(source = %kind, "Skipping source: credential not configured");
            continue;
        }

        let client: Arc<dyn SourceClient> = match kind {
            SourceKind::StackExchangeLike => Arc::new(stackexchange::StackExchangeClient::new(
                http.clone(),
                settings,
            )),
            SourceKind::IssueTrackerLike => {
                Arc::new(github::GitHubClient::new(http.clone(), settings))
            }
            SourceKind::ForumLike => Arc::new(reddit::RedditClient::new(http.clone(), settings)),
            SourceKind::AggregatorLike => {
                Arc::new(hackernews::HackerNewsClient::new(http.clone(), settings))
            }
        };
        active.push(client);
    }

    tracing::debug!(count = active.len(), "Search sources configured");
    active
}

// ============= Shared HTTP helpers =============

/// Send a request and decode a JSON body, classifying failures
pub(crate) async fn fetch_json<T: DeserializeOwned>(
    request: reqwest::RequestBuilder,
) -> std::result::Result<T, SourceError> {
    let response = request.send().await?;
    let status = response.status();

    if is_rate_limited(&response) {
        return Err(SourceError::RateLimited {
            retry_after: retry_after_header(&response),
        });
    }

    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        return Err(SourceError::Status {
            status: status.as_u16(),
            body: truncate_chars(&body, 200),
        });
    }

    let bytes = response.bytes().await?;
    serde_json::from_slice(&bytes).map_err(|e| SourceError::Malformed(e.to_string()))
}

fn is_rate_limited(response: &reqwest::Response) -> bool {
    if response.status() == reqwest::StatusCode::TOO_MANY_REQUESTS {
        return true;
    }
    // GitHub signals an exhausted quota with 403 plus a zero remaining count
    response.status() == reqwest::StatusCode::FORBIDDEN
        && response
            .headers()
            .get("x-ratelimit-remaining")
            .and_then(|v| v.to_str().ok())
            == Some("0")
}

fn retry_after_header(response: &reqwest::Response) -> Option<Duration> {
    response
        .headers()
        .get(reqwest::header::RETRY_AFTER)?
        .to_str()
        .ok()?
        .trim()
        .parse::<u64>()
        .ok()
        .map(Duration::from_secs)
}

/// Truncate to at most `max` characters, never splitting a code point
pub fn truncate_chars(text: &str, max: usize) -> String {
    match text.char_indices().nth(max) {
        Some((idx, _)) => format!("{}...", &text[..idx]),
        None => text.to_string(),
    }
}

/// Maximum snippet length kept per result
pub const SNIPPET_CHARS: usize = 500;

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_transient_classification() {
        assert!(SourceError::Network("reset".into()).is_transient());
        assert!(SourceError::Timeout(Duration::from_secs(10)).is_transient());
        assert!(SourceError::RateLimited { retry_after: None }.is_transient());
        assert!(SourceError::Status {
            status: 503,
            body: String::new()
        }
        .is_transient());

        assert!(!SourceError::Status {
            status: 404,
            body: String::new()
        }
        .is_transient());
        assert!(!SourceError::Malformed("eof".into()).is_transient());
    }

    #[test]
    fn test_error_status_mapping() {
        assert_eq!(
            SourceError::Timeout(Duration::from_secs(1)).status(),
            SourceStatus::TimedOut
        );
        assert_eq!(
            SourceError::RateLimited { retry_after: None }.status(),
            SourceStatus::RateLimited
        );
        assert_eq!(
            SourceError::Malformed("x".into()).status(),
            SourceStatus::Failed
        );
    }

    #[test]
    fn test_truncate_chars_respects_boundaries() {
        assert_eq!(truncate_chars("short", 10), "short");
        assert_eq!(truncate_chars("héllo wörld", 5), "héllo...");
    }

    #[test]
    fn test_settings_resolve_defaults_and_env() {
        let mut vars = HashMap::new();
        vars.insert("GITHUB_TOKEN", "ghp_123");
        let env = |name: &str| vars.get(name).map(|v| v.to_string());

        let settings = SourceSettings::resolve(
            SourceKind::IssueTrackerLike,
            &SourceConfig::default(),
            &SearchConfig::default(),
            &env,
        );
        assert_eq!(settings.endpoint, "https://api.github.com");
        assert_eq!(settings.max_results, 5);
        assert_eq!(settings.credential.unwrap().expose(), "ghp_123");

        let hn = SourceSettings::resolve(
            SourceKind::AggregatorLike,
            &SourceConfig {
                endpoint: Some("http://127.0.0.1:9000/".into()),
                ..Default::default()
            },
            &SearchConfig::default(),
            &env,
        );
        assert_eq!(hn.endpoint, "http://127.0.0.1:9000");
        assert_eq!(hn.max_results, 3);
        assert!(hn.credential.is_none());
    }

    #[test]
    fn test_build_sources_skips_disabled_and_missing_credentials() {
        let sources = SourcesConfig {
            reddit: SourceConfig {
                enabled: false,
                ..Default::default()
            },
            stackexchange: SourceConfig {
                requires_credential: true,
                ..Default::default()
            },
            ..Default::default()
        };
        let env = |_: &str| None;

        let active = build_sources(
            &sources,
            &SearchConfig::default(),
            reqwest::Client::new(),
            &env,
        );
        let kinds: Vec<_> = active.iter().map(|s| s.kind()).collect();
        assert_eq!(
            kinds,
            vec![SourceKind::IssueTrackerLike, SourceKind::AggregatorLike]
        );
    }
}
