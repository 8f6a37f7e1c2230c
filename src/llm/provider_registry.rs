//! Provider registry and selection
//!
//! The registry probes the environment once at startup for a credential per
//! known synthesis backend and freezes the result into an ordered list of
//! [`ProviderDescriptor`]s. Nothing re-reads the environment afterwards, so
//! [`ProviderRegistry::select`] is a pure function of that list.
//!
//! | Backend | Priority | Credential | Default model |
//! |---------|----------|------------|---------------|
//! | gemini | 1 | `GEMINI_API_KEY` | `gemini-2.0-flash` |
//! | openai | 2 | `OPENAI_API_KEY` | `gpt-4o-mini` |
//! | anthropic | 3 | `ANTHROPIC_API_KEY` | `claude-3-5-haiku-20241022` |
//! | openrouter | 4 | `OPENROUTER_API_KEY` | `google/gemini-2.0-flash-exp:free` |
//! | perplexity | 5 | `PERPLEXITY_API_KEY` | `sonar` |
//! | ollama | 6 | `OLLAMA_HOST` | `llama3.2` |

use crate::llm::client::{GenerationOptions, LLMClient, LLMClientFactory, Provider};
use crate::types::{AppError, Credential, ProviderDescriptor, Result};
use crate::utils::toml_config::ProviderConfig;
use std::collections::HashMap;

/// Wire protocol spoken by a backend
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApiStyle {
    Gemini,
    OpenAICompatible,
    Anthropic,
    Ollama,
}

/// Static description of a supported backend
#[derive(Debug, Clone, Copy)]
pub struct BackendSpec {
    pub name: &'static str,
    pub priority: u32,
    pub credential_env: &'static str,
    pub api_base: &'static str,
    pub model: &'static str,
    pub style: ApiStyle,
}

pub const KNOWN_BACKENDS: [BackendSpec; 6] = [
    BackendSpec {
        name: "gemini",
        priority: 1,
        credential_env: "GEMINI_API_KEY",
        api_base: super::gemini::DEFAULT_API_BASE,
        model: "gemini-2.0-flash",
        style: ApiStyle::Gemini,
    },
    BackendSpec {
        name: "openai",
        priority: 2,
        credential_env: "OPENAI_API_KEY",
        api_base: "https://api.openai.com/v1",
        model: "gpt-4o-mini",
        style: ApiStyle::OpenAICompatible,
    },
    BackendSpec {
        name: "anthropic",
        priority: 3,
        credential_env: "ANTHROPIC_API_KEY",
        api_base: super::anthropic::DEFAULT_API_BASE,
        model: "claude-3-5-haiku-20241022",
        style: ApiStyle::Anthropic,
    },
    BackendSpec {
        name: "openrouter",
        priority: 4,
        credential_env: "OPENROUTER_API_KEY",
        api_base: "https://openrouter.ai/api/v1",
        model: "google/gemini-2.0-flash-exp:free",
        style: ApiStyle::OpenAICompatible,
    },
    BackendSpec {
        name: "perplexity",
        priority: 5,
        credential_env: "PERPLEXITY_API_KEY",
        api_base: "https://api.perplexity.ai",
        model: "sonar",
        style: ApiStyle::OpenAICompatible,
    },
    BackendSpec {
        name: "ollama",
        priority: 6,
        credential_env: "OLLAMA_HOST",
        api_base: "http://localhost:11434",
        model: "llama3.2",
        style: ApiStyle::Ollama,
    },
];

/// Whether `name` is one of [`KNOWN_BACKENDS`]
pub fn is_known_backend(name: &str) -> bool {
    KNOWN_BACKENDS.iter().any(|b| b.name == name)
}

/// Highest-priority available descriptor (lowest `priority` number)
pub fn select_provider(descriptors: &[ProviderDescriptor]) -> Result<ProviderDescriptor> {
    descriptors
        .iter()
        .filter(|d| d.available)
        .min_by_key(|d| d.priority)
        .cloned()
        .ok_or(AppError::NoProviderConfigured)
}

#[derive(Debug, Clone)]
struct ResolvedBackend {
    spec: BackendSpec,
    credential: Option<Credential>,
    api_base: Option<String>,
    model: String,
}

/// Immutable, startup-computed view of the synthesis backends
#[derive(Debug)]
pub struct ProviderRegistry {
    descriptors: Vec<ProviderDescriptor>,
    backends: HashMap<String, ResolvedBackend>,
    http: reqwest::Client,
    options: GenerationOptions,
}

impl ProviderRegistry {
    /// Probe credentials for every known backend.
    ///
    /// `env` is the credential lookup; the binary passes `std::env::var`,
    /// tests pass a fixture map.
    pub fn discover(
        overrides: &HashMap<String, ProviderConfig>,
        options: GenerationOptions,
        http: reqwest::Client,
        env: &dyn Fn(&str) -> Option<String>,
    ) -> Self {
        let mut descriptors = Vec::with_capacity(KNOWN_BACKENDS.len());
        let mut backends = HashMap::new();

        for spec in KNOWN_BACKENDS {
            let config = overrides.get(spec.name).cloned().unwrap_or_default();
            let credential_env = config.api_key_env.as_deref().unwrap_or(spec.credential_env);
            let credential = if config.enabled {
                Credential::from_env_value(env(credential_env))
            } else {
                None
            };

            descriptors.push(ProviderDescriptor {
                name: spec.name.to_string(),
                priority: spec.priority,
                available: credential.is_some(),
            });
            backends.insert(
                spec.name.to_string(),
                ResolvedBackend {
                    spec,
                    credential,
                    api_base: config.api_base.clone(),
                    model: config.model.clone().unwrap_or_else(|| spec.model.to_string()),
                },
            );
        }

        descriptors.sort_by_key(|d| d.priority);

        let available: Vec<&str> = descriptors
            .iter()
            .filter(|d| d.available)
            .map(|d| d.name.as_str())
            .collect();
        if available.is_empty() {
            tracing::warn!("No synthesis provider credentials found; research calls will fail");
        } else {
            tracing::info!(providers = ?available, "Synthesis providers discovered");
        }

        Self {
            descriptors,
            backends,
            http,
            options,
        }
    }

    /// Registry over a fixed descriptor list, with no backend clients behind it
    pub fn from_descriptors(mut descriptors: Vec<ProviderDescriptor>) -> Self {
        descriptors.sort_by_key(|d| d.priority);
        Self {
            descriptors,
            backends: HashMap::new(),
            http: reqwest::Client::new(),
            options: GenerationOptions::default(),
        }
    }

    /// All known backends in priority order, available or not
    pub fn descriptors(&self) -> &[ProviderDescriptor] {
        &self.descriptors
    }

    pub fn select(&self) -> Result<ProviderDescriptor> {
        select_provider(&self.descriptors)
    }

    /// Model that will be used for a backend
    pub fn model_for(&self, name: &str) -> Option<&str> {
        self.backends.get(name).map(|b| b.model.as_str())
    }

    /// Resolve a descriptor to a concrete provider with its credential
    pub fn provider_for(&self, descriptor: &ProviderDescriptor) -> Result<Provider> {
        let backend = self
            .backends
            .get(&descriptor.name)
            .ok_or_else(|| AppError::Configuration(format!("Unknown provider '{}'", descriptor.name)))?;

        let credential = backend
            .credential
            .clone()
            .ok_or(AppError::NoProviderConfigured)?;
        let api_base = backend
            .api_base
            .clone()
            .unwrap_or_else(|| backend.spec.api_base.to_string());
        let model = backend.model.clone();

        Ok(match backend.spec.style {
            ApiStyle::Gemini => Provider::Gemini {
                api_key: credential,
                api_base,
                model,
            },
            ApiStyle::OpenAICompatible => Provider::OpenAICompatible {
                name: backend.spec.name.to_string(),
                api_key: credential,
                api_base,
                model,
            },
            ApiStyle::Anthropic => Provider::Anthropic {
                api_key: credential,
                api_base,
                model,
            },
            // the discovered host is the endpoint unless explicitly overridden
            ApiStyle::Ollama => Provider::Ollama {
                base_url: backend
                    .api_base
                    .clone()
                    .unwrap_or_else(|| credential.expose().to_string()),
                model,
            },
        })
    }
}

impl LLMClientFactory for ProviderRegistry {
    fn create(&self, descriptor: &ProviderDescriptor) -> Result<Box<dyn LLMClient>> {
        let provider = self.provider_for(descriptor)?;
        tracing::debug!(provider = provider.name(), model = provider.model(), "Creating LLM client");
        Ok(provider.create_client(self.http.clone(), self.options))
    }
}
