//! Document chunking.
//!
//! [`FixedSizeChunker`] splits text into windows of at most `chunk_size`
//! characters, each sharing exactly `chunk_overlap` characters with its
//! predecessor. Lengths are counted in `char`s so a boundary never lands
//! inside a multi-byte code point.

use std::collections::HashMap;

use crate::document::{Chunk, Document};
use crate::error::{RagError, Result};

/// A strategy for splitting documents into chunks.
///
/// Implementations produce [`Chunk`]s with text and metadata but no embeddings.
/// Embeddings are attached later by the ingestion pipeline.
pub trait Chunker: Send + Sync {
    /// Split a document into chunks, in document order.
    ///
    /// Returns an empty `Vec` if the document has empty text.
    fn chunk(&self, document: &Document) -> Vec<Chunk>;
}

/// Splits text into fixed-size chunks by character count with configurable overlap.
///
/// # Example
///
/// ```rust,ignore
/// use pdf_chat_rag::FixedSizeChunker;
///
/// let chunker = FixedSizeChunker::new(1000, 200)?;
/// let chunks = chunker.chunk(&document);
/// ```
#[derive(Debug, Clone)]
pub struct FixedSizeChunker {
    chunk_size: usize,
    chunk_overlap: usize,
}

impl FixedSizeChunker {
    /// Create a new `FixedSizeChunker`.
    ///
    /// # Arguments
    ///
    /// * `chunk_size`: maximum number of characters per chunk
    /// * `chunk_overlap`: number of characters shared by consecutive chunks
    ///
    /// # Errors
    ///
    /// Returns [`RagError::Config`] if `chunk_overlap >= chunk_size`.
    pub fn new(chunk_size: usize, chunk_overlap: usize) -> Result<Self> {
        if chunk_overlap >= chunk_size {
            return Err(RagError::Config(format!(
                "chunk_overlap ({chunk_overlap}) must be less than chunk_size ({chunk_size})"
            )));
        }
        Ok(Self { chunk_size, chunk_overlap })
    }

    /// Maximum characters per chunk.
    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    /// Characters shared by consecutive chunks.
    pub fn chunk_overlap(&self) -> usize {
        self.chunk_overlap
    }

    /// Compute `(start, end)` character windows for a text of `len` characters.
    fn windows(&self, len: usize) -> Vec<(usize, usize)> {
        let mut windows = Vec::new();
        if len == 0 {
            return windows;
        }

        let mut start = 0;
        loop {
            let end = (start + self.chunk_size).min(len);
            windows.push((start, end));
            if end == len {
                break;
            }
            // end - overlap > start because overlap < chunk_size
            start = end - self.chunk_overlap;
        }
        windows
    }
}

impl Chunker for FixedSizeChunker {
    fn chunk(&self, document: &Document) -> Vec<Chunk> {
        let text = &document.text;
        // Byte offset of every char boundary, including the end of the string.
        let boundaries: Vec<usize> =
            text.char_indices().map(|(i, _)| i).chain(std::iter::once(text.len())).collect();
        let char_count = boundaries.len() - 1;

        self.windows(char_count)
            .into_iter()
            .enumerate()
            .map(|(index, (start, end))| {
                let mut metadata = HashMap::from([
                    ("source".to_string(), document.name.clone()),
                    ("chunk_index".to_string(), index.to_string()),
                ]);
                if let Some(page) = document.page_at(start) {
                    metadata.insert("page".to_string(), page.to_string());
                }
                Chunk {
                    index,
                    text: text[boundaries[start]..boundaries[end]].to_string(),
                    start,
                    end,
                    embedding: Vec::new(),
                    metadata,
                }
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn doc(text: &str) -> Document {
        Document::new("report.pdf", text)
    }

    #[test]
    fn rejects_overlap_not_smaller_than_size() {
        assert!(matches!(FixedSizeChunker::new(10, 10), Err(RagError::Config(_))));
        assert!(matches!(FixedSizeChunker::new(10, 11), Err(RagError::Config(_))));
        assert!(matches!(FixedSizeChunker::new(0, 0), Err(RagError::Config(_))));
        assert!(FixedSizeChunker::new(10, 9).is_ok());
    }

    #[test]
    fn short_text_is_a_single_chunk() {
        let chunker = FixedSizeChunker::new(100, 20).unwrap();
        let chunks = chunker.chunk(&doc("hello world"));
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].text, "hello world");
        assert_eq!((chunks[0].start, chunks[0].end), (0, 11));
    }

    #[test]
    fn empty_text_has_no_chunks() {
        let chunker = FixedSizeChunker::new(100, 20).unwrap();
        assert!(chunker.chunk(&doc("")).is_empty());
    }

    #[test]
    fn windows_share_overlap() {
        let chunker = FixedSizeChunker::new(4, 1).unwrap();
        let texts: Vec<String> =
            chunker.chunk(&doc("abcdefghij")).into_iter().map(|c| c.text).collect();
        assert_eq!(texts, vec!["abcd", "defg", "ghij"]);
    }

    #[test]
    fn trailing_window_may_be_short() {
        let chunker = FixedSizeChunker::new(4, 2).unwrap();
        let texts: Vec<String> =
            chunker.chunk(&doc("abcdefg")).into_iter().map(|c| c.text).collect();
        assert_eq!(texts, vec!["abcd", "cdef", "efg"]);
    }

    #[test]
    fn multibyte_text_is_split_on_char_boundaries() {
        let chunker = FixedSizeChunker::new(3, 1).unwrap();
        let chunks = chunker.chunk(&doc("héllo wörld"));
        for chunk in &chunks {
            assert!(chunk.text.chars().count() <= 3);
        }
        assert_eq!(chunks[0].text, "hél");
        assert_eq!(chunks[1].text, "llo");
    }

    #[test]
    fn metadata_records_source_and_index() {
        let chunker = FixedSizeChunker::new(4, 1).unwrap();
        let chunks = chunker.chunk(&doc("abcdefghij"));
        assert_eq!(chunks[2].metadata.get("source").map(String::as_str), Some("report.pdf"));
        assert_eq!(chunks[2].metadata.get("chunk_index").map(String::as_str), Some("2"));
        assert_eq!(chunks[2].index, 2);
        assert!(!chunks[2].metadata.contains_key("page"));
    }

    #[test]
    fn page_comes_from_chunk_start() {
        let pages = ["aaaaaa".to_string(), "bbbbbb".to_string()];
        let document = Document::from_pages("report.pdf", &pages);
        let chunker = FixedSizeChunker::new(4, 1).unwrap();
        let chunks = chunker.chunk(&document);

        let page = |c: &Chunk| c.metadata.get("page").cloned().unwrap_or_default();
        // page 2 starts at offset 7
        assert_eq!(chunks.iter().map(|c| c.start).collect::<Vec<_>>(), vec![0, 3, 6, 9]);
        assert_eq!(chunks.iter().map(page).collect::<Vec<_>>(), vec!["1", "1", "1", "2"]);
        assert_eq!(chunks[2].text, "a\nbb");
    }
}
