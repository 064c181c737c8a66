//! freight-rag: logistics document Q&A with domain-gated ingestion and cited answers
//!
//! This crate implements the retrieval pipeline behind a logistics document
//! assistant: uploaded PDFs pass a domain-relevance gate, get chunked and
//! embedded into a vector index, and questions are answered strictly from
//! the indexed content with per-excerpt citations.
//!
//! The HTTP layer, chat UI, and concrete model vendors are out of scope;
//! the public surface is [`CorpusManager`] plus the provider traits in
//! [`providers`] and [`ingestion`].

pub mod classify;
pub mod config;
pub mod corpus;
pub mod error;
pub mod generation;
pub mod ingestion;
pub mod providers;
pub mod retrieval;
pub mod types;

pub use config::RagConfig;
pub use corpus::{CorpusManager, CorpusState};
pub use error::{Error, Result};
pub use types::{
    document::{Chunk, ChunkSource, Document},
    response::{Citation, HealthStatus, IngestReport, QueryResponse, RemovalOutcome},
};
