//! Ingestion pipeline: PDF upload → text → chunks → embeddings → collection.
//!
//! [`IngestionPipeline::ingest`] moves an [`Upload`] through the stages of
//! [`IngestStage`]. Any failure moves it to [`IngestStage::Failed`]; the stage
//! that failed is logged and the error is returned unchanged.
//!
//! # Example
//!
//! ```rust,ignore
//! use pdf_chat_rag::{IngestionPipeline, InMemoryVectorStore, RagConfig, Upload};
//!
//! let pipeline = IngestionPipeline::builder()
//!     .config(RagConfig::default())
//!     .embedding_provider(Arc::new(embedder))
//!     .vector_store(Arc::new(InMemoryVectorStore::new()))
//!     .build()?;
//!
//! let ingestion = pipeline.ingest(Upload::new("report.pdf", bytes)).await?;
//! assert_eq!(ingestion.collection_name, "report.pdf");
//! ```

use std::fmt;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::{debug, error, info};

use crate::chunking::{Chunker, FixedSizeChunker};
use crate::config::RagConfig;
use crate::document::{Chunk, Document, Upload};
use crate::embedding::EmbeddingProvider;
use crate::error::{RagError, Result};
use crate::pdf::{PdfExtractParser, PdfParser, looks_like_pdf};
use crate::vectorstore::VectorStore;

/// The stages an upload passes through.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IngestStage {
    /// Validating the raw upload.
    ReceivingFile,
    /// Extracting text from the PDF.
    Parsing,
    /// Splitting text into chunks.
    Chunking,
    /// Embedding chunk texts.
    Embedding,
    /// Replacing the collection in the vector store.
    Indexing,
    /// Finished successfully.
    Done,
    /// Terminal failure.
    Failed,
}

impl fmt::Display for IngestStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            IngestStage::ReceivingFile => "receiving_file",
            IngestStage::Parsing => "parsing",
            IngestStage::Chunking => "chunking",
            IngestStage::Embedding => "embedding",
            IngestStage::Indexing => "indexing",
            IngestStage::Done => "done",
            IngestStage::Failed => "failed",
        };
        f.write_str(name)
    }
}

/// The outcome of a successful ingestion.
#[derive(Debug, Clone)]
pub struct Ingestion {
    /// Name of the collection now holding the document.
    pub collection_name: String,
    /// The indexed chunks, in document order, without embeddings.
    pub chunks: Vec<Chunk>,
}

/// Orchestrates parse → chunk → embed → index for one uploaded document.
///
/// Construct one via [`IngestionPipeline::builder()`].
pub struct IngestionPipeline {
    config: RagConfig,
    parser: Arc<dyn PdfParser>,
    chunker: Arc<dyn Chunker>,
    embedding_provider: Arc<dyn EmbeddingProvider>,
    vector_store: Arc<dyn VectorStore>,
    temp_dir: Option<PathBuf>,
}

impl IngestionPipeline {
    /// Create a new [`IngestionPipelineBuilder`].
    pub fn builder() -> IngestionPipelineBuilder {
        IngestionPipelineBuilder::default()
    }

    /// Return a reference to the pipeline configuration.
    pub fn config(&self) -> &RagConfig {
        &self.config
    }

    /// Ingest an uploaded PDF into the collection named after the file.
    ///
    /// An existing collection with the same name is replaced. The temporary
    /// copy of the upload is removed before this returns, whatever the outcome.
    ///
    /// # Errors
    ///
    /// - [`RagError::InvalidInput`] for empty, unnamed or non-PDF uploads
    /// - [`RagError::Parse`] if the PDF is unreadable or has no text
    /// - [`RagError::EmbeddingService`] or [`RagError::Timeout`] if embedding fails;
    ///   nothing is written to the index in that case
    /// - [`RagError::Index`] if the vector store rejects the collection
    pub async fn ingest(&self, upload: Upload) -> Result<Ingestion> {
        let mut stage = IngestStage::ReceivingFile;
        let file_name = upload.file_name.clone();

        match self.run(upload, &mut stage).await {
            Ok(ingestion) => {
                info!(
                    collection = %ingestion.collection_name,
                    chunk_count = ingestion.chunks.len(),
                    stage = %IngestStage::Done,
                    "ingested document"
                );
                Ok(ingestion)
            }
            Err(e) => {
                error!(
                    file_name = %file_name,
                    failed_stage = %stage,
                    stage = %IngestStage::Failed,
                    error = %e,
                    "ingestion failed"
                );
                Err(e)
            }
        }
    }

    async fn run(&self, upload: Upload, stage: &mut IngestStage) -> Result<Ingestion> {
        let name = validate_upload(&upload)?;

        *stage = IngestStage::Parsing;
        debug!(collection = %name, %stage, bytes = upload.bytes.len(), "parsing upload");
        let pages = self.extract_pages(upload.bytes).await?;

        *stage = IngestStage::Chunking;
        if pages.iter().all(|page| page.trim().is_empty()) {
            return Err(RagError::Parse(format!("'{name}' contains no extractable text")));
        }
        let document = Document::from_pages(name, &pages);
        let mut chunks = self.chunker.chunk(&document);
        debug!(collection = %document.name, %stage, chunk_count = chunks.len(), "chunked document");

        *stage = IngestStage::Embedding;
        let embeddings = {
            let texts: Vec<&str> = chunks.iter().map(|c| c.text.as_str()).collect();
            self.config
                .call
                .run("embed_chunks", || self.embedding_provider.embed_batch(&texts))
                .await?
        };
        if embeddings.len() != chunks.len() {
            return Err(RagError::EmbeddingService {
                provider: "pipeline".into(),
                message: format!(
                    "expected {} embeddings, got {}",
                    chunks.len(),
                    embeddings.len()
                ),
            });
        }
        for (chunk, embedding) in chunks.iter_mut().zip(embeddings) {
            chunk.embedding = embedding;
        }

        *stage = IngestStage::Indexing;
        let dimensions = self.embedding_provider.dimensions();
        self.vector_store.upsert_collection(&document.name, dimensions, &chunks).await?;

        *stage = IngestStage::Done;
        for chunk in &mut chunks {
            chunk.embedding = Vec::new();
        }
        Ok(Ingestion { collection_name: document.name, chunks })
    }

    /// Write the upload to a temp file and run the parser on it, off the async runtime.
    ///
    /// The temp file lives only inside the blocking task and is removed when
    /// the task ends, including when the parser panics.
    async fn extract_pages(&self, bytes: Vec<u8>) -> Result<Vec<String>> {
        let parser = Arc::clone(&self.parser);
        let temp_dir = self.temp_dir.clone();

        let task = tokio::task::spawn_blocking(move || -> Result<Vec<String>> {
            let mut file = temp_file(temp_dir.as_deref())?;
            file.write_all(&bytes)?;
            file.flush()?;
            parser.extract_pages(file.path())
        });

        match task.await {
            Ok(result) => result,
            Err(e) => Err(RagError::Parse(format!("pdf extraction aborted: {e}"))),
        }
    }
}

fn temp_file(dir: Option<&Path>) -> std::io::Result<tempfile::NamedTempFile> {
    let mut builder = tempfile::Builder::new();
    builder.prefix("upload-").suffix(".pdf");
    match dir {
        Some(dir) => builder.tempfile_in(dir),
        None => builder.tempfile(),
    }
}

/// Check an upload before any parsing or network call and return its collection name.
fn validate_upload(upload: &Upload) -> Result<String> {
    if upload.bytes.is_empty() {
        return Err(RagError::InvalidInput("uploaded file is empty".into()));
    }

    // Browsers may send a full client-side path; keep the last component only.
    let name = upload
        .file_name
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or_default()
        .trim()
        .to_string();
    if name.is_empty() {
        return Err(RagError::InvalidInput("uploaded file has no name".into()));
    }

    if !looks_like_pdf(&upload.bytes) {
        return Err(RagError::InvalidInput(format!("'{name}' is not a PDF")));
    }
    Ok(name)
}

/// Builder for constructing an [`IngestionPipeline`].
///
/// `embedding_provider` and `vector_store` are required. When no chunker is
/// set, a [`FixedSizeChunker`] is built from the config; when no parser is
/// set, [`PdfExtractParser`] is used.
#[derive(Default)]
pub struct IngestionPipelineBuilder {
    config: Option<RagConfig>,
    parser: Option<Arc<dyn PdfParser>>,
    chunker: Option<Arc<dyn Chunker>>,
    embedding_provider: Option<Arc<dyn EmbeddingProvider>>,
    vector_store: Option<Arc<dyn VectorStore>>,
    temp_dir: Option<PathBuf>,
}

impl IngestionPipelineBuilder {
    /// Set the pipeline configuration. Defaults to [`RagConfig::default()`].
    pub fn config(mut self, config: RagConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// Set the PDF text extractor.
    pub fn parser(mut self, parser: Arc<dyn PdfParser>) -> Self {
        self.parser = Some(parser);
        self
    }

    /// Set the document chunker.
    pub fn chunker(mut self, chunker: Arc<dyn Chunker>) -> Self {
        self.chunker = Some(chunker);
        self
    }

    /// Set the embedding provider.
    pub fn embedding_provider(mut self, provider: Arc<dyn EmbeddingProvider>) -> Self {
        self.embedding_provider = Some(provider);
        self
    }

    /// Set the vector store backend.
    pub fn vector_store(mut self, store: Arc<dyn VectorStore>) -> Self {
        self.vector_store = Some(store);
        self
    }

    /// Directory for temporary upload copies. Defaults to the system temp dir.
    pub fn temp_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.temp_dir = Some(dir.into());
        self
    }

    /// Build the [`IngestionPipeline`], validating that all required fields are set.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::Config`] if a required field is missing or the
    /// config fails [`RagConfig::validate`].
    pub fn build(self) -> Result<IngestionPipeline> {
        let config = self.config.unwrap_or_default();
        config.validate()?;
        let embedding_provider = self
            .embedding_provider
            .ok_or_else(|| RagError::Config("embedding_provider is required".to_string()))?;
        let vector_store = self
            .vector_store
            .ok_or_else(|| RagError::Config("vector_store is required".to_string()))?;
        let chunker = match self.chunker {
            Some(chunker) => chunker,
            None => Arc::new(FixedSizeChunker::new(config.chunk_size, config.chunk_overlap)?),
        };
        let parser = self.parser.unwrap_or_else(|| Arc::new(PdfExtractParser));

        Ok(IngestionPipeline {
            config,
            parser,
            chunker,
            embedding_provider,
            vector_store,
            temp_dir: self.temp_dir,
        })
    }
}
