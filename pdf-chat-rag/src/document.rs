//! Data types for uploads, documents, chunks, and search results.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// Raw bytes of an uploaded file together with the name it was uploaded under.
#[derive(Debug, Clone)]
pub struct Upload {
    /// The original file name, used as the collection identifier.
    pub file_name: String,
    /// The file contents.
    pub bytes: Vec<u8>,
}

impl Upload {
    /// Create a new upload.
    pub fn new(file_name: impl Into<String>, bytes: impl Into<Vec<u8>>) -> Self {
        Self { file_name: file_name.into(), bytes: bytes.into() }
    }
}

/// A parsed document: its display name and extracted plain text.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Document {
    /// Display name; doubles as the collection name.
    pub name: String,
    /// The extracted text content.
    pub text: String,
    /// Character offset in `text` where each page begins, ascending.
    /// Empty when page boundaries are unknown.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub page_starts: Vec<usize>,
}

impl Document {
    /// A document without page boundaries.
    pub fn new(name: impl Into<String>, text: impl Into<String>) -> Self {
        Self { name: name.into(), text: text.into(), page_starts: Vec::new() }
    }

    /// Join per-page texts with a newline, remembering where each page starts.
    pub fn from_pages(name: impl Into<String>, pages: &[String]) -> Self {
        let mut text = String::new();
        let mut page_starts = Vec::with_capacity(pages.len());
        let mut offset = 0;
        for (i, page) in pages.iter().enumerate() {
            if i > 0 {
                text.push('\n');
                offset += 1;
            }
            page_starts.push(offset);
            text.push_str(page);
            offset += page.chars().count();
        }
        Self { name: name.into(), text, page_starts }
    }

    /// The 1-based page holding the char at `offset`, if pages are known.
    pub fn page_at(&self, offset: usize) -> Option<usize> {
        match self.page_starts.partition_point(|&start| start <= offset) {
            0 => None,
            page => Some(page),
        }
    }
}

/// A segment of a [`Document`] with its vector embedding.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Chunk {
    /// Position of the chunk within its document.
    pub index: usize,
    /// The text content of the chunk.
    pub text: String,
    /// Character offset of the first char of this chunk in the document text.
    pub start: usize,
    /// Character offset one past the last char of this chunk.
    pub end: usize,
    /// The vector embedding for this chunk's text. Empty until embedded.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub embedding: Vec<f32>,
    /// `source`, `chunk_index` and, for paged documents, `page`.
    pub metadata: HashMap<String, String>,
}

/// A retrieved [`Chunk`] paired with a relevance score.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchResult {
    /// The retrieved chunk.
    pub chunk: Chunk,
    /// The similarity score (higher is more relevant).
    pub score: f32,
}

/// The result of answering a query.
#[derive(Debug, Clone, Serialize)]
pub struct Answer {
    /// The generated answer, or the fallback message when generation produced nothing.
    pub text: String,
    /// The chunks that were given to the generator as context, most similar first.
    pub sources: Vec<SearchResult>,
}
