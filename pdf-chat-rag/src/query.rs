//! Query pipeline: question → embedding → top-k chunks → prompt → answer.

use std::sync::Arc;

use tracing::{debug, error, info};

use crate::config::RagConfig;
use crate::document::{Answer, SearchResult};
use crate::embedding::EmbeddingProvider;
use crate::error::{RagError, Result};
use crate::generation::Generator;
use crate::vectorstore::VectorStore;

/// Returned instead of an empty string when the model produces no text.
pub const FALLBACK_ANSWER: &str = "I could not find an answer in the uploaded document.";

/// Join retrieved chunk texts, most similar first, separated by a blank line.
pub fn build_context(results: &[SearchResult]) -> String {
    results.iter().map(|r| r.chunk.text.as_str()).collect::<Vec<_>>().join("\n\n")
}

/// The system instruction that carries the retrieved context to the generator.
pub fn system_instruction(context: &str) -> String {
    format!(
        "You are a helpful assistant that can answer questions from the provided context.\n\
         context: {context}"
    )
}

/// Answers questions against a previously ingested collection.
///
/// Stateless: every call embeds the query, searches, and generates afresh.
/// Construct one via [`QueryPipeline::builder()`].
pub struct QueryPipeline {
    config: RagConfig,
    embedding_provider: Arc<dyn EmbeddingProvider>,
    vector_store: Arc<dyn VectorStore>,
    generator: Arc<dyn Generator>,
}

impl QueryPipeline {
    /// Create a new [`QueryPipelineBuilder`].
    pub fn builder() -> QueryPipelineBuilder {
        QueryPipelineBuilder::default()
    }

    /// Return a reference to the pipeline configuration.
    pub fn config(&self) -> &RagConfig {
        &self.config
    }

    /// Answer `query` using the chunks stored under `collection_name`.
    ///
    /// # Errors
    ///
    /// - [`RagError::InvalidRequest`] if either argument is blank; no network
    ///   call is made
    /// - [`RagError::CollectionNotFound`] if nothing is indexed under the name;
    ///   the generator is not called
    /// - [`RagError::EmbeddingService`], [`RagError::GenerationService`],
    ///   [`RagError::Index`] or [`RagError::Timeout`] from the collaborators
    pub async fn answer(&self, query: &str, collection_name: &str) -> Result<Answer> {
        let query = query.trim();
        let collection_name = collection_name.trim();
        if query.is_empty() || collection_name.is_empty() {
            return Err(RagError::InvalidRequest(
                "query and collection name are required".to_string(),
            ));
        }

        self.run(query, collection_name).await.inspect_err(|e| {
            error!(collection = collection_name, error = %e, "failed to answer query");
        })
    }

    async fn run(&self, query: &str, collection: &str) -> Result<Answer> {
        let call = &self.config.call;

        let query_embedding =
            call.run("embed_query", || self.embedding_provider.embed(query)).await?;

        let sources =
            self.vector_store.search(collection, &query_embedding, self.config.top_k).await?;
        debug!(collection, result_count = sources.len(), "retrieved context");

        let instruction = system_instruction(&build_context(&sources));
        let text = call.run("generate", || self.generator.generate(query, &instruction)).await?;

        let text = if text.trim().is_empty() {
            info!(collection, "generator returned no text, using fallback");
            FALLBACK_ANSWER.to_string()
        } else {
            text
        };

        info!(collection, source_count = sources.len(), "query answered");
        Ok(Answer { text, sources })
    }
}

/// Builder for constructing a [`QueryPipeline`].
///
/// `embedding_provider`, `vector_store` and `generator` are required.
#[derive(Default)]
pub struct QueryPipelineBuilder {
    config: Option<RagConfig>,
    embedding_provider: Option<Arc<dyn EmbeddingProvider>>,
    vector_store: Option<Arc<dyn VectorStore>>,
    generator: Option<Arc<dyn Generator>>,
}

impl QueryPipelineBuilder {
    /// Set the pipeline configuration. Defaults to [`RagConfig::default()`].
    pub fn config(mut self, config: RagConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// Set the embedding provider. Must be the one used for ingestion.
    pub fn embedding_provider(mut self, provider: Arc<dyn EmbeddingProvider>) -> Self {
        self.embedding_provider = Some(provider);
        self
    }

    /// Set the vector store backend.
    pub fn vector_store(mut self, store: Arc<dyn VectorStore>) -> Self {
        self.vector_store = Some(store);
        self
    }

    /// Set the generation backend.
    pub fn generator(mut self, generator: Arc<dyn Generator>) -> Self {
        self.generator = Some(generator);
        self
    }

    /// Build the [`QueryPipeline`].
    ///
    /// # Errors
    ///
    /// Returns [`RagError::Config`] if any required field is missing or the
    /// config fails [`RagConfig::validate`].
    pub fn build(self) -> Result<QueryPipeline> {
        let config = self.config.unwrap_or_default();
        config.validate()?;
        let embedding_provider = self
            .embedding_provider
            .ok_or_else(|| RagError::Config("embedding_provider is required".to_string()))?;
        let vector_store = self
            .vector_store
            .ok_or_else(|| RagError::Config("vector_store is required".to_string()))?;
        let generator = self
            .generator
            .ok_or_else(|| RagError::Config("generator is required".to_string()))?;

        Ok(QueryPipeline {
            config,
            embedding_provider,
            vector_store,
            generator,
        })
    }
}
