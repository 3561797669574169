//! Generation trait for answering a query with a system instruction.

use async_trait::async_trait;

use crate::error::Result;

/// A large-language-model backend that answers a prompt.
///
/// Failures are reported as [`RagError::GenerationService`](crate::RagError::GenerationService).
/// Like [`EmbeddingProvider`](crate::EmbeddingProvider), implementations do
/// not retry.
#[async_trait]
pub trait Generator: Send + Sync {
    /// Generate a reply to `query`, conditioned on `system_instruction`.
    ///
    /// Returns an empty string when the model produced no text.
    async fn generate(&self, query: &str, system_instruction: &str) -> Result<String>;
}
