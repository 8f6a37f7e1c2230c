//! Process-wide research rate limiting
//!
//! Bounds the number of top-level research operations admitted in any
//! rolling window. One `acquire` is charged per `research` call; the
//! individual source searches it fans out to are not counted separately.
//!
//! The limiter keeps a log of admission instants rather than a token
//! bucket, so "at most N admissions in any window of length W" holds
//! exactly instead of on average. It never blocks: an over-limit call
//! fails immediately with the time until the oldest admission expires.

use crate::types::{AppError, Result};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::time::{Duration, Instant};
use utoipa::ToSchema;

/// Configuration for the research rate limiter
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RateLimitConfig {
    /// Maximum admitted research calls per window (default: 10)
    #[serde(default = "default_max_requests")]
    pub max_requests: usize,

    /// Window length in seconds (default: 60)
    #[serde(default = "default_window_secs")]
    pub window_secs: u64,
}

fn default_max_requests() -> usize {
    10
}

fn default_window_secs() -> u64 {
    60
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            max_requests: default_max_requests(),
            window_secs: default_window_secs(),
        }
    }
}

/// Proof that a research call was admitted
#[derive(Debug)]
#[must_use]
pub struct RateLimitPermit {
    admitted_at: Instant,
}

impl RateLimitPermit {
    pub fn admitted_at(&self) -> Instant {
        self.admitted_at
    }
}

/// Read-only view of the limiter for context snapshots
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct RateLimitStatus {
    pub limit: usize,
    pub window_secs: u64,
    pub used: usize,
    pub remaining: usize,
    /// Seconds until the oldest admission leaves the window (0 when idle)
    pub resets_in_secs: u64,
}

/// Sliding-window research rate limiter
#[derive(Debug)]
pub struct RateLimiter {
    max_requests: usize,
    window: Duration,
    admitted: Mutex<VecDeque<Instant>>,
}

impl RateLimiter {
    pub fn new(config: &RateLimitConfig) -> Self {
        Self::with_window(config.max_requests, Duration::from_secs(config.window_secs))
    }

    pub fn with_window(max_requests: usize, window: Duration) -> Self {
        Self {
            max_requests,
            window,
            admitted: Mutex::new(VecDeque::with_capacity(max_requests)),
        }
    }

    /// Admit one research call or fail with [`AppError::RateLimited`]
    pub fn acquire(&self) -> Result<RateLimitPermit> {
        self.acquire_at(Instant::now())
    }

    fn acquire_at(&self, now: Instant) -> Result<RateLimitPermit> {
        let mut admitted = self.admitted.lock();
        self.evict_expired(&mut admitted, now);

        if admitted.len() >= self.max_requests {
            let retry_after = admitted
                .front()
                .map(|oldest| (*oldest + self.window).saturating_duration_since(now))
                .filter(|d| !d.is_zero())
                .unwrap_or(Duration::from_millis(1));

            tracing::info!(
                limit = self.max_requests,
                retry_after_ms = retry_after.as_millis() as u64,
                "Research rate limit exceeded"
            );
            return Err(AppError::RateLimited { retry_after });
        }

        admitted.push_back(now);
        Ok(RateLimitPermit { admitted_at: now })
    }

    /// Snapshot of current usage; does not consume budget
    pub fn status(&self) -> RateLimitStatus {
        self.status_at(Instant::now())
    }

    fn status_at(&self, now: Instant) -> RateLimitStatus {
        let mut admitted = self.admitted.lock();
        self.evict_expired(&mut admitted, now);

        let used = admitted.len();
        let resets_in = admitted
            .front()
            .map(|oldest| (*oldest + self.window).saturating_duration_since(now))
            .unwrap_or_default();

        RateLimitStatus {
            limit: self.max_requests,
            window_secs: self.window.as_secs(),
            used,
            remaining: self.max_requests.saturating_sub(used),
            resets_in_secs: resets_in.as_secs_f64().ceil() as u64,
        }
    }

    fn evict_expired(&self, admitted: &mut VecDeque<Instant>, now: Instant) {
        while let Some(oldest) = admitted.front() {
            if now.saturating_duration_since(*oldest) >= self.window {
                admitted.pop_front();
            } else {
                break;
            }
        }
    }
}
