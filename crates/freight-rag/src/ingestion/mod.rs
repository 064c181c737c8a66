//! Document ingestion: PDF page extraction and chunking

pub mod chunker;
pub mod pdf;

pub use chunker::TextChunker;
pub use pdf::{LopdfExtractor, PageText, PdfExtractor};
