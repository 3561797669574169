use std::sync::Arc;

use pdf_chat_rag::gemini::{GeminiClient, GeminiEmbeddingProvider, GeminiGenerator};
use pdf_chat_rag::qdrant::QdrantVectorStore;
use pdf_chat_rag::{
    EmbeddingProvider, Generator, IngestionPipeline, QueryPipeline, RagConfig, VectorStore,
};

use crate::config::ServerConfig;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub ingestion: Arc<IngestionPipeline>,
    pub query: Arc<QueryPipeline>,
    pub max_upload_bytes: usize,
}

impl AppState {
    pub fn new(ingestion: IngestionPipeline, query: QueryPipeline, max_upload_bytes: usize) -> Self {
        Self { ingestion: Arc::new(ingestion), query: Arc::new(query), max_upload_bytes }
    }

    /// Wire both pipelines around one set of collaborators.
    pub fn from_parts(
        rag: RagConfig,
        embedding_provider: Arc<dyn EmbeddingProvider>,
        vector_store: Arc<dyn VectorStore>,
        generator: Arc<dyn Generator>,
        upload_tmp_dir: Option<std::path::PathBuf>,
        max_upload_bytes: usize,
    ) -> anyhow::Result<Self> {
        let mut ingestion = IngestionPipeline::builder()
            .config(rag.clone())
            .embedding_provider(Arc::clone(&embedding_provider))
            .vector_store(Arc::clone(&vector_store));
        if let Some(dir) = upload_tmp_dir {
            ingestion = ingestion.temp_dir(dir);
        }

        let query = QueryPipeline::builder()
            .config(rag)
            .embedding_provider(embedding_provider)
            .vector_store(vector_store)
            .generator(generator)
            .build()?;

        Ok(Self::new(ingestion.build()?, query, max_upload_bytes))
    }

    /// Build the production state: Gemini for embeddings and generation, Qdrant for storage.
    pub fn from_config(config: &ServerConfig) -> anyhow::Result<Self> {
        let client = GeminiClient::with_base_url(&config.gemini.api_key, &config.gemini.base_url)?;
        let embedding_provider = GeminiEmbeddingProvider::new(client.clone())
            .with_model(config.gemini.embedding_model.clone())
            .with_dimensions(config.gemini.embedding_dim);
        let generator =
            GeminiGenerator::new(client).with_model(config.gemini.chat_model.clone());
        let vector_store =
            QdrantVectorStore::new(&config.qdrant_url, config.qdrant_api_key.clone())?;

        Self::from_parts(
            config.rag.clone(),
            Arc::new(embedding_provider),
            Arc::new(vector_store),
            Arc::new(generator),
            config.upload_tmp_dir.clone(),
            config.max_upload_bytes,
        )
    }
}
