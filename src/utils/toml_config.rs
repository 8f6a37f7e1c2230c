//! TOML-based configuration for the research engine
//!
//! Every section is optional; a missing `research.toml` means built-in
//! defaults. Credentials never live in the file: sources and providers only
//! name the environment variable that holds them.
//!
//! ```toml
//! [server]
//! port = 3000
//!
//! [rate_limit]
//! max_requests = 10
//! window_secs = 60
//!
//! [sources.github]
//! credential_env = "GITHUB_TOKEN"
//!
//! [providers.openai]
//! model = "gpt-4o"
//! ```
//!
//! The file is read once at startup. Provider discovery depends on it, and
//! the discovered provider list is fixed for the life of the process, so
//! there is no hot reload.

use crate::cache::CacheConfig;
use crate::llm::provider_registry::is_known_backend;
use crate::rate_limit::RateLimitConfig;
use crate::sources::{SearchConfig, SourcesConfig};
use crate::synthesis::SynthesisConfig;
use crate::types::AppError;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

/// Default configuration file name, looked up in the working directory
pub const DEFAULT_CONFIG_FILE: &str = "research.toml";

/// Root configuration structure loaded from research.toml
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ResearchConfig {
    #[serde(default)]
    pub server: ServerConfig,

    #[serde(default)]
    pub rate_limit: RateLimitConfig,

    #[serde(default)]
    pub cache: CacheConfig,

    #[serde(default)]
    pub search: SearchConfig,

    #[serde(default)]
    pub sources: SourcesConfig,

    #[serde(default)]
    pub synthesis: SynthesisConfig,

    /// Per-backend overrides keyed by backend name (`gemini`, `openai`, ...)
    #[serde(default)]
    pub providers: HashMap<String, ProviderConfig>,

    #[serde(default)]
    pub output: OutputConfig,
}

// ============= Server Configuration =============

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,

    #[serde(default = "default_log_level")]
    pub log_level: String,
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    3000
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            log_level: default_log_level(),
        }
    }
}

// ============= Provider Configuration =============

/// Override for one synthesis backend (`[providers.<name>]`)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderConfig {
    #[serde(default = "default_provider_enabled")]
    pub enabled: bool,

    /// Environment variable holding the API key (or host, for ollama)
    #[serde(default)]
    pub api_key_env: Option<String>,

    #[serde(default)]
    pub api_base: Option<String>,

    #[serde(default)]
    pub model: Option<String>,
}

fn default_provider_enabled() -> bool {
    true
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            enabled: default_provider_enabled(),
            api_key_env: None,
            api_base: None,
            model: None,
        }
    }
}

// ============= Output Configuration =============

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputConfig {
    /// Maximum rendered response size in characters (default: 25000)
    #[serde(default = "default_character_limit")]
    pub character_limit: usize,
}

fn default_character_limit() -> usize {
    25_000
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            character_limit: default_character_limit(),
        }
    }
}

// ============= Errors =============

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Configuration file not found: {0}")]
    FileNotFound(PathBuf),

    #[error("Failed to read configuration file: {0}")]
    ReadError(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    ParseError(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Unknown provider '{0}' in [providers]; known: gemini, openai, anthropic, openrouter, perplexity, ollama")]
    UnknownProvider(String),
}

impl From<ConfigError> for AppError {
    fn from(err: ConfigError) -> Self {
        AppError::Configuration(err.to_string())
    }
}

impl ResearchConfig {
    /// Load configuration from a TOML file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();

        if !path.exists() {
            return Err(ConfigError::FileNotFound(path.to_path_buf()));
        }

        let content = fs::read_to_string(path)?;
        let config = Self::from_toml(&content)?;

        tracing::info!(path = %path.display(), "Loaded configuration");
        Ok(config)
    }

    /// Load the file if present, otherwise fall back to defaults
    pub fn load_or_default<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        match Self::load(path.as_ref()) {
            Err(ConfigError::FileNotFound(missing)) => {
                tracing::debug!(path = %missing.display(), "No configuration file, using defaults");
                Ok(Self::default())
            }
            other => other,
        }
    }

    /// Parse and validate a TOML document
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let config: ResearchConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate counts, timeout ordering and names
    pub fn validate(&self) -> Result<(), ConfigError> {
        let positive = [
            ("rate_limit.max_requests", self.rate_limit.max_requests as u64),
            ("rate_limit.window_secs", self.rate_limit.window_secs),
            ("cache.ttl_secs", self.cache.ttl_secs),
            ("search.attempt_timeout_secs", self.search.attempt_timeout_secs),
            ("search.aggregation_timeout_secs", self.search.aggregation_timeout_secs),
            ("search.max_attempts", self.search.max_attempts as u64),
            ("synthesis.timeout_secs", self.synthesis.timeout_secs),
            ("synthesis.max_tokens", self.synthesis.max_tokens as u64),
            ("output.character_limit", self.output.character_limit as u64),
        ];
        for (name, value) in positive {
            if value == 0 {
                return Err(ConfigError::ValidationError(format!(
                    "{} must be greater than zero",
                    name
                )));
            }
        }

        if self.search.attempt_timeout_secs >= self.search.aggregation_timeout_secs {
            return Err(ConfigError::ValidationError(format!(
                "search.attempt_timeout_secs ({}) must be less than search.aggregation_timeout_secs ({})",
                self.search.attempt_timeout_secs, self.search.aggregation_timeout_secs
            )));
        }

        if self.search.base_delay_ms > self.search.max_delay_ms {
            return Err(ConfigError::ValidationError(
                "search.base_delay_ms must not exceed search.max_delay_ms".to_string(),
            ));
        }

        if !(0.0..=2.0).contains(&self.synthesis.temperature) {
            return Err(ConfigError::ValidationError(format!(
                "synthesis.temperature must be within 0.0..=2.0, got {}",
                self.synthesis.temperature
            )));
        }

        if self.sources.enabled().next().is_none() {
            return Err(ConfigError::ValidationError(
                "at least one source must be enabled".to_string(),
            ));
        }

        for kind in crate::types::SourceKind::ALL {
            let source = self.sources.get(kind);
            if let Some(max) = source.max_results {
                if !(1..=25).contains(&max) {
                    return Err(ConfigError::ValidationError(format!(
                        "sources.{}.max_results must be within 1..=25, got {}",
                        kind.config_key(),
                        max
                    )));
                }
            }
        }

        if let Some(name) = self.providers.keys().find(|name| !is_known_backend(name)) {
            return Err(ConfigError::UnknownProvider(name.clone()));
        }

        Ok(())
    }
}
