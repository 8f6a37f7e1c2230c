//! Recommendation Cache
//!
//! A TTL-keyed store in front of the search/synthesis pipeline. A hit
//! short-circuits the whole request: no rate-limit budget is consumed and
//! no source or backend is contacted.
//!
//! # Cache Key Strategy
//!
//! Keys are SHA-256 hashes of the query fields `(language, topic, goal,
//! current_setup)` after case folding and whitespace collapsing, so
//! near-identical queries share one entry.
//!
//! # Concurrency
//!
//! Entries are stored as `Arc<RecommendationSet>` and never mutated after
//! insertion; a refresh replaces the entry under the same key. Two
//! concurrent misses for the same key both run the full pipeline and the
//! later `put` wins. That duplicate work is accepted; there is no
//! single-flight deduplication.
//!
//! # Example
//!
//! ```ignore
//! use community_research::cache::{CacheConfig, ResearchCache, TtlResearchCache};
//!
//! let cache = TtlResearchCache::new(CacheConfig::default());
//! let key = cache.compute_key(&query);
//! if let Some(hit) = cache.get(&key) {
//!     return Ok(hit);
//! }
//! cache.put(&key, Arc::new(set), None);
//! ```

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use utoipa::ToSchema;

use crate::types::{Query, RecommendationSet};

// ============================================================================
// Cache Types
// ============================================================================

/// Statistics for cache performance monitoring
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct CacheStats {
    /// Number of cache hits
    pub hits: u64,
    /// Number of cache misses (including expired entries)
    pub misses: u64,
    /// Number of entries in cache
    pub entry_count: usize,
    /// Number of evictions due to capacity
    pub evictions: u64,
}

impl CacheStats {
    /// Calculate hit rate as a percentage
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            (self.hits as f64 / total as f64) * 100.0
        }
    }
}

/// Configuration for the recommendation cache
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    /// Whether the cache is enabled
    #[serde(default = "default_enabled")]
    pub enabled: bool,

    /// Time-to-live for entries in seconds (default: 1 hour)
    #[serde(default = "default_ttl_secs")]
    pub ttl_secs: u64,

    /// Maximum number of entries kept (default: 256)
    #[serde(default = "default_max_entries")]
    pub max_entries: usize,
}

fn default_enabled() -> bool {
    true
}

fn default_ttl_secs() -> u64 {
    3600
}

fn default_max_entries() -> usize {
    256
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: default_enabled(),
            ttl_secs: default_ttl_secs(),
            max_entries: default_max_entries(),
        }
    }
}

impl CacheConfig {
    pub fn ttl(&self) -> Duration {
        Duration::from_secs(self.ttl_secs)
    }
}

// ============================================================================
// Cache Trait
// ============================================================================

/// Trait for recommendation cache implementations
pub trait ResearchCache: Send + Sync {
    /// Get a live entry; expired entries are dropped and reported as a miss
    fn get(&self, key: &str) -> Option<Arc<RecommendationSet>>;

    /// Store an entry with an optional TTL override
    fn put(&self, key: &str, value: Arc<RecommendationSet>, ttl: Option<Duration>);

    /// Remove an entry from the cache
    fn invalidate(&self, key: &str);

    /// Clear all entries from the cache
    fn clear(&self);

    /// Get cache statistics
    fn stats(&self) -> CacheStats;

    /// Compute the cache key for a query
    fn compute_key(&self, query: &Query) -> String {
        cache_key(query)
    }
}

/// Normalized SHA-256 key over the query fields
pub fn cache_key(query: &Query) -> String {
    let fields = [
        query.language.as_deref(),
        Some(query.topic.as_str()),
        query.goal.as_deref(),
        query.current_setup.as_deref(),
    ];

    let mut hasher = Sha256::new();
    for (i, field) in fields.iter().enumerate() {
        if i > 0 {
            hasher.update([0x1f]);
        }
        hasher.update(normalize(field.unwrap_or_default()).as_bytes());
    }
    format!("{:x}", hasher.finalize())
}

fn normalize(text: &str) -> String {
    text.split_whitespace()
        .map(str::to_lowercase)
        .collect::<Vec<_>>()
        .join(" ")
}

// ============================================================================
// Cache Entry
// ============================================================================

#[derive(Debug, Clone)]
struct CacheEntry {
    value: Arc<RecommendationSet>,
    expires_at: Instant,
}

impl CacheEntry {
    fn is_expired_at(&self, now: Instant) -> bool {
        now >= self.expires_at
    }
}

// ============================================================================
// TTL Cache
// ============================================================================

/// In-memory TTL cache for recommendation sets
///
/// Thread-safe via `parking_lot::RwLock`. Expired entries are evicted
/// lazily on read; when the entry count reaches `max_entries`, the entry
/// closest to expiry is evicted to make room.
pub struct TtlResearchCache {
    cache: RwLock<HashMap<String, CacheEntry>>,
    config: CacheConfig,
    hits: AtomicU64,
    misses: AtomicU64,
    evictions: AtomicU64,
}

impl TtlResearchCache {
    pub fn new(config: CacheConfig) -> Self {
        Self {
            cache: RwLock::new(HashMap::new()),
            config,
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
            evictions: AtomicU64::new(0),
        }
    }

    pub fn with_defaults() -> Self {
        Self::new(CacheConfig::default())
    }

    pub fn len(&self) -> usize {
        self.cache.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.cache.read().is_empty()
    }

    /// Remove expired entries from the cache
    pub fn cleanup_expired(&self) {
        let now = Instant::now();
        self.cache.write().retain(|_, entry| !entry.is_expired_at(now));
    }

    fn get_at(&self, key: &str, now: Instant) -> Option<Arc<RecommendationSet>> {
        if !self.config.enabled {
            return None;
        }

        {
            let cache = self.cache.read();
            match cache.get(key) {
                Some(entry) if !entry.is_expired_at(now) => {
                    self.hits.fetch_add(1, Ordering::Relaxed);
                    return Some(Arc::clone(&entry.value));
                }
                Some(_) => {}
                None => {
                    self.misses.fetch_add(1, Ordering::Relaxed);
                    return None;
                }
            }
        }

        // Expired: drop it under the write lock unless a fresh put raced us
        let mut cache = self.cache.write();
        if cache.get(key).is_some_and(|e| e.is_expired_at(now)) {
            cache.remove(key);
        }
        self.misses.fetch_add(1, Ordering::Relaxed);
        None
    }

    fn put_at(&self, key: &str, value: Arc<RecommendationSet>, ttl: Option<Duration>, now: Instant) {
        if !self.config.enabled || self.config.max_entries == 0 {
            return;
        }

        let entry = CacheEntry {
            value,
            expires_at: now + ttl.unwrap_or_else(|| self.config.ttl()),
        };

        let mut cache = self.cache.write();
        if !cache.contains_key(key) {
            while cache.len() >= self.config.max_entries {
                let oldest = cache
                    .iter()
                    .min_by_key(|(_, entry)| entry.expires_at)
                    .map(|(key, _)| key.clone());

                match oldest {
                    Some(oldest) => {
                        cache.remove(&oldest);
                        self.evictions.fetch_add(1, Ordering::Relaxed);
                    }
                    None => break,
                }
            }
        }
        cache.insert(key.to_string(), entry);
    }
}

impl ResearchCache for TtlResearchCache {
    fn get(&self, key: &str) -> Option<Arc<RecommendationSet>> {
        self.get_at(key, Instant::now())
    }

    fn put(&self, key: &str, value: Arc<RecommendationSet>, ttl: Option<Duration>) {
        self.put_at(key, value, ttl, Instant::now());
    }

    fn invalidate(&self, key: &str) {
        self.cache.write().remove(key);
    }

    fn clear(&self) {
        self.cache.write().clear();
    }

    fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            entry_count: self.cache.read().len(),
            evictions: self.evictions.load(Ordering::Relaxed),
        }
    }
}
