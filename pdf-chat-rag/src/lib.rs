//! # pdf-chat-rag
//!
//! Retrieval-augmented question answering over uploaded PDFs.
//!
//! Two pipelines share an [`EmbeddingProvider`] and a [`VectorStore`]:
//!
//! ```text
//!  upload ──► IngestionPipeline: validate ─► parse ─► chunk ─► embed ─► upsert_collection(name)
//!
//!  query  ──► QueryPipeline:     embed ─► search(name, top_k) ─► context prompt ─► generate
//! ```
//!
//! All collaborators are traits and are injected through the pipeline
//! builders, so tests substitute fakes for the network-bound ones.
//!
//! ## Feature flags
//!
//! - `gemini`: [`gemini::GeminiEmbeddingProvider`] and [`gemini::GeminiGenerator`]
//! - `qdrant`: [`qdrant::QdrantVectorStore`]
//! - `full`: both

pub mod call;
pub mod chunking;
pub mod config;
pub mod document;
pub mod embedding;
pub mod error;
pub mod generation;
pub mod ingest;
pub mod inmemory;
pub mod pdf;
pub mod query;
pub mod vectorstore;

#[cfg(feature = "gemini")]
pub mod gemini;
#[cfg(feature = "qdrant")]
pub mod qdrant;

pub use call::{CallPolicy, RetryConfig};
pub use chunking::{Chunker, FixedSizeChunker};
pub use config::{RagConfig, RagConfigBuilder};
pub use document::{Answer, Chunk, Document, SearchResult, Upload};
pub use embedding::EmbeddingProvider;
pub use error::{RagError, Result};
pub use generation::Generator;
pub use ingest::{IngestStage, Ingestion, IngestionPipeline, IngestionPipelineBuilder};
pub use inmemory::InMemoryVectorStore;
pub use pdf::{PdfExtractParser, PdfParser, looks_like_pdf};
pub use query::{FALLBACK_ANSWER, QueryPipeline, QueryPipelineBuilder};
pub use vectorstore::VectorStore;
