//! Provider abstractions for embeddings and text generation
//!
//! Trait-based seams over the external model services so the pipeline never
//! depends on a concrete vendor. The shipped implementation talks to an
//! Ollama-compatible server.

pub mod embedding;
pub mod generation;
pub mod ollama;

pub use embedding::EmbeddingProvider;
pub use generation::{ChatMessage, GenerationProvider, Role};
pub use ollama::{OllamaClient, OllamaEmbedder, OllamaGenerator};
