//! Configuration for the ingestion and query pipelines.

use serde::{Deserialize, Serialize};

use crate::call::{CallPolicy, RetryConfig};
use crate::error::{RagError, Result};

/// Configuration parameters shared by the RAG pipelines.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RagConfig {
    /// Maximum chunk size in characters.
    pub chunk_size: usize,
    /// Number of overlapping characters between consecutive chunks.
    pub chunk_overlap: usize,
    /// Number of chunks retrieved as context for each query.
    pub top_k: usize,
    /// Timeout and retry policy for embedding and generation calls.
    pub call: CallPolicy,
}

impl Default for RagConfig {
    fn default() -> Self {
        Self { chunk_size: 1000, chunk_overlap: 200, top_k: 4, call: CallPolicy::default() }
    }
}

impl RagConfig {
    /// Create a new builder for constructing a [`RagConfig`].
    pub fn builder() -> RagConfigBuilder {
        RagConfigBuilder::default()
    }

    /// Check that the parameters are consistent.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::Config`] if:
    /// - `chunk_overlap >= chunk_size`
    /// - `top_k == 0`
    /// - `timeout_secs == 0`
    /// - retries are enabled with `max_attempts == 0`
    pub fn validate(&self) -> Result<()> {
        if self.chunk_overlap >= self.chunk_size {
            return Err(RagError::Config(format!(
                "chunk_overlap ({}) must be less than chunk_size ({})",
                self.chunk_overlap, self.chunk_size
            )));
        }
        if self.top_k == 0 {
            return Err(RagError::Config("top_k must be greater than zero".to_string()));
        }
        if self.call.timeout_secs == 0 {
            return Err(RagError::Config("timeout_secs must be greater than zero".to_string()));
        }
        if self.call.retry.enabled && self.call.retry.max_attempts == 0 {
            return Err(RagError::Config(
                "retry.max_attempts must be at least 1 when retries are enabled".to_string(),
            ));
        }
        Ok(())
    }
}

/// Builder for constructing a validated [`RagConfig`].
#[derive(Debug, Clone, Default)]
pub struct RagConfigBuilder {
    config: RagConfig,
}

impl RagConfigBuilder {
    /// Set the maximum chunk size in characters.
    pub fn chunk_size(mut self, size: usize) -> Self {
        self.config.chunk_size = size;
        self
    }

    /// Set the overlap between consecutive chunks in characters.
    pub fn chunk_overlap(mut self, overlap: usize) -> Self {
        self.config.chunk_overlap = overlap;
        self
    }

    /// Set the number of chunks retrieved per query.
    pub fn top_k(mut self, k: usize) -> Self {
        self.config.top_k = k;
        self
    }

    /// Set the per-attempt timeout for external calls, in seconds.
    pub fn timeout_secs(mut self, secs: u64) -> Self {
        self.config.call.timeout_secs = secs;
        self
    }

    /// Set the retry policy for external calls.
    pub fn retry(mut self, retry: RetryConfig) -> Self {
        self.config.call.retry = retry;
        self
    }

    /// Build the [`RagConfig`], validating that parameters are consistent.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::Config`] if:
    /// - `chunk_overlap >= chunk_size`
    /// - `top_k == 0`
    /// - `timeout_secs == 0`
    /// - retries are enabled with `max_attempts == 0`
    pub fn build(self) -> Result<RagConfig> {
        self.config.validate()?;
        Ok(self.config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_upload_settings() {
        let config = RagConfig::default();
        assert_eq!((config.chunk_size, config.chunk_overlap, config.top_k), (1000, 200, 4));
        assert!(!config.call.retry.enabled);
    }

    #[test]
    fn builder_rejects_overlap_at_or_above_size() {
        let err = RagConfig::builder().chunk_size(100).chunk_overlap(100).build().unwrap_err();
        assert!(matches!(err, RagError::Config(_)));
    }

    #[test]
    fn builder_rejects_zero_top_k() {
        assert!(RagConfig::builder().top_k(0).build().is_err());
    }

    #[test]
    fn builder_rejects_enabled_retry_without_attempts() {
        let retry = RetryConfig { enabled: true, max_attempts: 0, initial_backoff_ms: 10 };
        assert!(RagConfig::builder().retry(retry).build().is_err());
    }

    #[test]
    fn builder_accepts_valid_values() {
        let config = RagConfig::builder()
            .chunk_size(500)
            .chunk_overlap(50)
            .top_k(8)
            .timeout_secs(30)
            .build()
            .unwrap();
        assert_eq!(config.top_k, 8);
        assert_eq!(config.call.timeout_secs, 30);
    }
}
