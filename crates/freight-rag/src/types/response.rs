//! Response types for ingestion, removal, and query operations

use serde::{Deserialize, Serialize};

use super::document::Chunk;

/// Fixed answer returned when retrieval finds nothing relevant.
pub const NOT_FOUND_ANSWER: &str =
    "I couldn't find any relevant information in the uploaded documents.";

/// Citation justifying part of an answer
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Citation {
    /// Source filename
    pub filename: String,
    /// Page number (1-indexed)
    pub page_number: u32,
    /// Truncated excerpt from the cited chunk
    pub excerpt: String,
    /// Cosine similarity to the query (0.0-1.0, higher is better)
    pub similarity_score: f32,
}

impl Citation {
    /// Create a citation from a retrieved chunk
    pub fn from_chunk(chunk: &Chunk, similarity_score: f32, max_excerpt_chars: usize) -> Self {
        Self {
            filename: chunk.source.filename.clone(),
            page_number: chunk.source.page_number,
            excerpt: truncate_excerpt(&chunk.content, max_excerpt_chars),
            similarity_score,
        }
    }
}

/// Truncate text to a maximum length at a character boundary, preferring a
/// word boundary, appending an ellipsis when cut.
fn truncate_excerpt(text: &str, max_chars: usize) -> String {
    if text.len() <= max_chars {
        return text.to_string();
    }

    let mut end = max_chars;
    while end > 0 && !text.is_char_boundary(end) {
        end -= 1;
    }

    if let Some(pos) = text[..end].rfind(' ') {
        return format!("{}...", &text[..pos]);
    }

    format!("{}...", &text[..end])
}

/// Response from a question against the corpus
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryResponse {
    /// Generated answer
    pub answer: String,
    /// Citations in relevance order (empty when sources were not requested)
    pub citations: Vec<Citation>,
    /// Number of chunks used as context
    pub chunks_retrieved: usize,
    /// Processing time in milliseconds
    pub processing_time_ms: u64,
}

impl QueryResponse {
    /// Successful response for a query with no relevant chunks
    pub fn not_found(processing_time_ms: u64) -> Self {
        Self {
            answer: NOT_FOUND_ANSWER.to_string(),
            citations: Vec::new(),
            chunks_retrieved: 0,
            processing_time_ms,
        }
    }
}

/// An accepted file within an ingestion batch
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AcceptedFile {
    /// Filename as uploaded
    pub filename: String,
    /// Chunks created for this file
    pub chunks: u32,
}

/// A rejected file within an ingestion batch
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RejectedFile {
    /// Filename as uploaded
    pub filename: String,
    /// Human-readable rejection reason
    pub reason: String,
}

/// Partitioned result of an ingestion batch.
///
/// Rejections are data, not errors; `success` is false when no file in the
/// batch was accepted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IngestReport {
    /// Whether at least one file was accepted
    pub success: bool,
    /// Accepted files with chunk counts
    pub accepted: Vec<AcceptedFile>,
    /// Rejected files with reasons
    pub rejected: Vec<RejectedFile>,
    /// Total chunks created across the batch
    pub total_chunks: u32,
}

impl IngestReport {
    /// Build a report from the per-file outcomes
    pub fn new(accepted: Vec<AcceptedFile>, rejected: Vec<RejectedFile>) -> Self {
        let total_chunks = accepted.iter().map(|f| f.chunks).sum();
        Self {
            success: !accepted.is_empty(),
            accepted,
            rejected,
            total_chunks,
        }
    }
}

/// Outcome of removing a document from the corpus
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RemovalOutcome {
    /// Documents remaining after removal
    pub remaining_documents: usize,
    /// Whether the index was rebuilt (false when the last document was removed)
    pub rebuilt: bool,
    /// Chunks in the index after the operation
    pub chunks_indexed: usize,
}

/// A corpus document as listed to callers
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentInfo {
    /// Filename
    pub filename: String,
    /// File size in bytes
    pub size_bytes: u64,
}

/// Corpus health snapshot
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthStatus {
    /// Whether the index is attached, non-empty, and queryable
    pub index_ready: bool,
    /// Number of documents in the corpus
    pub documents: usize,
    /// Number of chunks in the index
    pub chunks: usize,
}
