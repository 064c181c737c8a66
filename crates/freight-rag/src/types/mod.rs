//! Core data types shared across the pipeline

pub mod document;
pub mod response;

pub use document::{Chunk, ChunkSource, Document};
pub use response::{Citation, QueryResponse};
