//! Error types for the `pdf-chat-rag` crate.

use thiserror::Error;

/// Errors that can occur while ingesting a document or answering a query.
#[derive(Debug, Error)]
pub enum RagError {
    /// The uploaded file was missing, empty, or not a PDF.
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// A query request was missing its query text or collection name.
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// The PDF could not be read or contained no extractable text.
    #[error("Parse error: {0}")]
    Parse(String),

    /// An error occurred during embedding generation.
    #[error("Embedding error ({provider}): {message}")]
    EmbeddingService {
        /// The embedding provider that produced the error.
        provider: String,
        /// A description of the failure.
        message: String,
    },

    /// An error occurred while generating an answer.
    #[error("Generation error ({provider}): {message}")]
    GenerationService {
        /// The generation provider that produced the error.
        provider: String,
        /// A description of the failure.
        message: String,
    },

    /// An error occurred in the vector store backend.
    #[error("Vector store error ({backend}): {message}")]
    Index {
        /// The vector store backend that produced the error.
        backend: String,
        /// A description of the failure.
        message: String,
    },

    /// The named collection does not exist.
    #[error("Collection '{0}' not found")]
    CollectionNotFound(String),

    /// An external call did not complete within its time budget.
    #[error("{operation} timed out after {seconds}s")]
    Timeout {
        /// The guarded operation, e.g. `embed_query`.
        operation: String,
        /// The timeout that elapsed.
        seconds: u64,
    },

    /// A configuration validation error.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Local I/O failure (temp file handling).
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl RagError {
    /// Whether the failure came from an external provider and may succeed on retry.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            RagError::EmbeddingService { .. }
                | RagError::GenerationService { .. }
                | RagError::Timeout { .. }
        )
    }

    /// A short, client-safe description of the failure.
    ///
    /// Provider messages and paths never appear here; they are logged instead.
    pub fn public_message(&self) -> &'static str {
        match self {
            RagError::InvalidInput(_) => "the upload must be a named, non-empty PDF file",
            RagError::InvalidRequest(_) => "query and collection name are required",
            RagError::Parse(_) => "the PDF could not be read or contains no text",
            RagError::EmbeddingService { .. } => "the embedding service failed",
            RagError::GenerationService { .. } => "the generation service failed",
            RagError::Index { .. } => "the vector index operation failed",
            RagError::CollectionNotFound(_) => {
                "no document is indexed under this name, please upload it again"
            }
            RagError::Timeout { .. } => "an upstream service timed out",
            RagError::Config(_) => "the service is misconfigured",
            RagError::Io(_) => "a local storage error occurred",
        }
    }
}

/// A convenience result type for RAG operations.
pub type Result<T> = std::result::Result<T, RagError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_provider_failures_are_transient() {
        assert!(RagError::EmbeddingService { provider: "p".into(), message: "m".into() }
            .is_transient());
        assert!(RagError::Timeout { operation: "embed".into(), seconds: 1 }.is_transient());
        assert!(!RagError::CollectionNotFound("a.pdf".into()).is_transient());
        assert!(!RagError::Parse("bad".into()).is_transient());
    }

    #[test]
    fn public_message_hides_provider_detail() {
        let err = RagError::GenerationService {
            provider: "Gemini".into(),
            message: "quota exceeded for key AIza-secret".into(),
        };
        assert!(!err.public_message().contains("AIza"));
        assert!(err.to_string().contains("quota exceeded"));
    }
}
