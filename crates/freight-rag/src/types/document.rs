//! Document and chunk types with source tracking for citations

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use uuid::Uuid;

/// A PDF document admitted to the corpus.
///
/// The filename is the document's identity and must be unique within the
/// corpus. The raw bytes live on disk under the storage root; this record
/// is what the registry persists.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Document {
    /// Filename as uploaded; unique within the corpus
    pub filename: String,
    /// Hex sha256 of the raw bytes
    pub content_hash: String,
    /// Total number of pages
    pub total_pages: u32,
    /// Number of chunks currently derived from this document
    pub total_chunks: u32,
    /// File size in bytes
    pub file_size: u64,
    /// Ingestion timestamp
    pub ingested_at: chrono::DateTime<chrono::Utc>,
}

impl Document {
    /// Create a new document record
    pub fn new(filename: String, content_hash: String, file_size: u64) -> Self {
        Self {
            filename,
            content_hash,
            total_pages: 0,
            total_chunks: 0,
            file_size,
            ingested_at: chrono::Utc::now(),
        }
    }
}

/// Hex sha256 of raw file bytes
pub fn content_hash(data: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(data);
    hex::encode(hasher.finalize())
}

/// Source information carried by every chunk, used for citations.
///
/// Page numbers are 1-indexed throughout the pipeline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChunkSource {
    /// Originating document filename
    pub filename: String,
    /// Page the chunk was extracted from (1-indexed)
    pub page_number: u32,
    /// Total pages in the document
    pub page_count: u32,
}

impl ChunkSource {
    /// Format the source for display
    pub fn format_citation(&self) -> String {
        format!("{}, page {}", self.filename, self.page_number)
    }
}

/// A bounded text segment extracted from one document page; the unit of
/// indexing and retrieval. Immutable once created.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Chunk {
    /// Unique chunk ID
    pub id: Uuid,
    /// Text content
    pub content: String,
    /// Embedding vector, filled at index time
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub embedding: Vec<f32>,
    /// Source information for citations
    pub source: ChunkSource,
    /// Chunk sequence index within the document
    pub chunk_index: u32,
}

impl Chunk {
    /// Create a new chunk without an embedding
    pub fn new(content: String, source: ChunkSource, chunk_index: u32) -> Self {
        Self {
            id: Uuid::new_v4(),
            content,
            embedding: Vec::new(),
            source,
            chunk_index,
        }
    }
}
