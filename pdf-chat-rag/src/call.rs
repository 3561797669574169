//! Timeout and opt-in retry for calls to external providers.
//!
//! Every embedding and generation call made by the pipelines goes through
//! [`CallPolicy::run`]. Each attempt is bounded by a wall-clock timeout; when
//! it elapses the in-flight future is dropped and [`RagError::Timeout`] is
//! returned. Retries only happen when [`RetryConfig::enabled`] is set and the
//! error is [transient](RagError::is_transient).

use std::future::Future;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::{RagError, Result};

/// Retry settings for external calls. Disabled by default.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RetryConfig {
    /// Whether failed transient calls are retried at all.
    pub enabled: bool,
    /// Total attempts including the first one.
    pub max_attempts: u32,
    /// Delay before the second attempt; doubles after each further failure.
    pub initial_backoff_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self { enabled: false, max_attempts: 3, initial_backoff_ms: 500 }
    }
}

/// How the pipelines call external providers.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CallPolicy {
    /// Per-attempt timeout in seconds.
    pub timeout_secs: u64,
    /// Retry behaviour for transient failures.
    pub retry: RetryConfig,
}

impl Default for CallPolicy {
    fn default() -> Self {
        Self { timeout_secs: 60, retry: RetryConfig::default() }
    }
}

impl CallPolicy {
    /// The per-attempt timeout.
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    fn max_attempts(&self) -> u32 {
        if self.retry.enabled { self.retry.max_attempts.max(1) } else { 1 }
    }

    /// Run `call` under this policy.
    ///
    /// `call` is invoked once per attempt and must build a fresh future each time.
    pub async fn run<T, F, Fut>(&self, operation: &str, mut call: F) -> Result<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let max_attempts = self.max_attempts();
        let mut backoff = Duration::from_millis(self.retry.initial_backoff_ms);
        let mut attempt = 1;

        loop {
            let result = match tokio::time::timeout(self.timeout(), call()).await {
                Ok(result) => result,
                Err(_) => Err(RagError::Timeout {
                    operation: operation.to_string(),
                    seconds: self.timeout_secs,
                }),
            };

            match result {
                Ok(value) => return Ok(value),
                Err(e) if attempt < max_attempts && e.is_transient() => {
                    warn!(operation, attempt, max_attempts, error = %e, "retrying external call");
                    tokio::time::sleep(backoff).await;
                    backoff = backoff.saturating_mul(2);
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }
}
