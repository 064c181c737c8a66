//! PDF text extraction behind a narrow collaborator interface

use lopdf::Document as PdfDocument;

use crate::error::{Error, Result};

/// Text content of a single PDF page. Page numbers are 1-indexed.
#[derive(Debug, Clone)]
pub struct PageText {
    /// Page number (1-indexed)
    pub page_number: u32,
    /// Extracted text; empty for scanned or image-only pages
    pub text: String,
}

/// Narrow interface over a PDF text extractor.
///
/// Scanned or image-only pages surface as empty text, not as errors; only a
/// document that cannot be opened at all is an extraction failure.
pub trait PdfExtractor: Send + Sync {
    /// Extract the ordered pages of a PDF from raw bytes
    fn extract_pages(&self, filename: &str, data: &[u8]) -> Result<Vec<PageText>>;
}

/// Extractor backed by lopdf
pub struct LopdfExtractor;

impl PdfExtractor for LopdfExtractor {
    fn extract_pages(&self, filename: &str, data: &[u8]) -> Result<Vec<PageText>> {
        let doc = PdfDocument::load_mem(data)
            .map_err(|e| Error::extraction(filename, e.to_string()))?;

        let mut pages = Vec::new();
        for (page_number, _) in doc.get_pages() {
            // Pages whose text cannot be decoded (scanned, exotic fonts)
            // degrade to empty text rather than failing the document
            let text = doc.extract_text(&[page_number]).unwrap_or_default();
            pages.push(PageText { page_number, text });
        }

        if pages.is_empty() {
            return Err(Error::extraction(filename, "document has no pages"));
        }

        Ok(pages)
    }
}
