//! Vector retrieval over the chunk index

pub mod store;

pub use store::{ScoredChunk, VectorIndex};
