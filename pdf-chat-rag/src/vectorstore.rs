//! Vector store trait for storing and searching vector embeddings.

use async_trait::async_trait;
use tracing::{debug, info};

use crate::document::{Chunk, SearchResult};
use crate::error::Result;

/// A storage backend for vector embeddings with similarity search.
///
/// Implementations manage named collections of [`Chunk`]s. One collection
/// holds exactly one document; the collection name is the document name.
///
/// # Example
///
/// ```rust,ignore
/// use pdf_chat_rag::{InMemoryVectorStore, VectorStore};
///
/// let store = InMemoryVectorStore::new();
/// store.upsert_collection("report.pdf", 768, &chunks).await?;
/// let results = store.search("report.pdf", &query_embedding, 4).await?;
/// ```
#[async_trait]
pub trait VectorStore: Send + Sync {
    /// Whether a collection with this name exists.
    async fn collection_exists(&self, name: &str) -> Result<bool>;

    /// Create a named, empty collection.
    async fn create_collection(&self, name: &str, dimensions: usize) -> Result<()>;

    /// Delete a named collection and all its data. No-op if it does not exist.
    async fn delete_collection(&self, name: &str) -> Result<()>;

    /// Insert chunks into an existing collection. Chunks must have embeddings set.
    async fn upsert(&self, collection: &str, chunks: &[Chunk]) -> Result<()>;

    /// Search for the `top_k` most similar chunks to the given embedding.
    ///
    /// Returns results ordered by descending similarity score.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::CollectionNotFound`](crate::RagError::CollectionNotFound)
    /// if the collection does not exist.
    async fn search(
        &self,
        collection: &str,
        embedding: &[f32],
        top_k: usize,
    ) -> Result<Vec<SearchResult>>;

    /// Replace the collection `name` with exactly `chunks`.
    ///
    /// An existing collection of that name is deleted first, then a fresh one
    /// is created and filled. There is no merge with the previous contents.
    /// If creation or insertion fails after the delete, the collection is
    /// left absent rather than restored.
    async fn upsert_collection(
        &self,
        name: &str,
        dimensions: usize,
        chunks: &[Chunk],
    ) -> Result<()> {
        if self.collection_exists(name).await? {
            debug!(collection = name, "replacing existing collection");
            self.delete_collection(name).await?;
        }
        self.create_collection(name, dimensions).await?;
        self.upsert(name, chunks).await?;
        info!(collection = name, chunk_count = chunks.len(), "collection replaced");
        Ok(())
    }
}
