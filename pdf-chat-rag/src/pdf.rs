//! PDF text extraction.

use std::path::Path;

use tracing::debug;

use crate::error::{RagError, Result};

const PDF_MAGIC: &[u8] = b"%PDF-";

/// Whether `bytes` start with the PDF header.
///
/// This is a cheap structural check done before any parsing or network call;
/// it does not guarantee the file parses.
pub fn looks_like_pdf(bytes: &[u8]) -> bool {
    bytes.starts_with(PDF_MAGIC)
}

/// Extracts plain text from a PDF file on disk, one string per page.
///
/// Extraction is blocking; the ingestion pipeline calls it from
/// `tokio::task::spawn_blocking`.
pub trait PdfParser: Send + Sync {
    /// Read the PDF at `path` and return the text of each page in order.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::Parse`] if the file is malformed or unreadable.
    fn extract_pages(&self, path: &Path) -> Result<Vec<String>>;
}

/// A [`PdfParser`] backed by the `pdf-extract` crate.
#[derive(Debug, Clone, Copy, Default)]
pub struct PdfExtractParser;

impl PdfParser for PdfExtractParser {
    fn extract_pages(&self, path: &Path) -> Result<Vec<String>> {
        let pages = pdf_extract::extract_text_by_pages(path)
            .map_err(|e| RagError::Parse(format!("failed to extract text: {e}")))?;
        debug!(page_count = pages.len(), "extracted pdf text");
        Ok(pages)
    }
}
