//! Per-source retry with exponential backoff
//!
//! Each attempt runs under its own timeout. Transient failures (network,
//! timeout, 5xx, backend rate limiting) are retried after
//! `base_delay * 2^attempt`, capped at `max_delay`, plus up to half that
//! again as random jitter. Permanent failures return immediately.

use super::SourceError;
use crate::types::SourceKind;
use rand::Rng;
use std::future::Future;
use std::time::Duration;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts including the first
    pub max_attempts: u32,
    pub attempt_timeout: Duration,
    pub base_delay: Duration,
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            attempt_timeout: Duration::from_secs(10),
            base_delay: Duration::from_millis(500),
            max_delay: Duration::from_secs(4),
        }
    }
}

impl RetryPolicy {
    /// Backoff before the attempt following `attempt` (0-based), without jitter
    pub fn backoff_delay(&self, attempt: u32) -> Duration {
        let factor = 2u32.saturating_pow(attempt);
        self.base_delay.saturating_mul(factor).min(self.max_delay)
    }

    fn jittered(&self, attempt: u32) -> Duration {
        let delay = self.backoff_delay(attempt);
        let spread = delay.as_millis() as u64 / 2;
        if spread == 0 {
            return delay;
        }
        delay + Duration::from_millis(rand::rng().random_range(0..=spread))
    }

    /// Worst-case wall time of one `run`, used to check timeout budgets
    pub fn worst_case(&self) -> Duration {
        let attempts = self.max_attempts.max(1);
        let waits: Duration = (0..attempts - 1)
            .map(|a| {
                let d = self.backoff_delay(a);
                d + d / 2
            })
            .sum();
        self.attempt_timeout * attempts + waits
    }

    /// Run `op` until it succeeds, fails permanently, or attempts run out
    pub async fn run<T, F, Fut>(&self, source: SourceKind, mut op: F) -> Result<T, SourceError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, SourceError>>,
    {
        let attempts = self.max_attempts.max(1);
        let mut attempt = 0;

        loop {
            let outcome = match tokio::time::timeout(self.attempt_timeout, op()).await {
                Ok(result) => result,
                Err(_) => Err(SourceError::Timeout(self.attempt_timeout)),
            };

            let err = match outcome {
                Ok(value) => return Ok(value),
                Err(err) => err,
            };

            if !err.is_transient() || attempt + 1 >= attempts {
                return Err(err);
            }

            let mut delay = self.jittered(attempt);
            if let SourceError::RateLimited {
                retry_after: Some(hint),
            } = &err
            {
                delay = delay.max((*hint).min(self.max_delay));
            }

            tracing::debug!(
                source = %source,
                attempt = attempt + 1,
                delay_ms = delay.as_millis() as u64,
                error = %err,
                "Retrying source request"
            );
            tokio::time::sleep(delay).await;
            attempt += 1;
        }
    }
}
