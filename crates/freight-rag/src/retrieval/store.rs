//! Vector index: a consistency wrapper over an HNSW graph with a JSON snapshot
//!
//! The wrapper keeps three things in step: the chunk list (the authoritative
//! entry set), the in-memory nearest-neighbor graph built over it, and the
//! on-disk snapshot that survives restarts. All entries live under a single
//! logical collection; a search never mixes entries from another collection.

use std::cmp::Ordering;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use hnsw_rs::prelude::{DistCosine, Hnsw};
use parking_lot::RwLock;

use crate::config::IndexConfig;
use crate::error::{Error, Result};
use crate::providers::EmbeddingProvider;
use crate::types::document::Chunk;

/// A retrieved chunk with its similarity to the query (higher is better)
#[derive(Debug, Clone)]
pub struct ScoredChunk {
    /// The retrieved chunk (embedding stripped)
    pub chunk: Chunk,
    /// Cosine similarity (0.0-1.0 for normalized embeddings)
    pub similarity: f32,
}

/// Chunk list plus the graph built over it; swapped wholesale on rebuild
struct IndexState {
    chunks: Vec<Chunk>,
    graph: Hnsw<'static, f32, DistCosine>,
}

impl IndexState {
    fn empty(config: &IndexConfig) -> Self {
        Self {
            chunks: Vec::new(),
            graph: new_graph(config),
        }
    }
}

fn new_graph(config: &IndexConfig) -> Hnsw<'static, f32, DistCosine> {
    Hnsw::new(
        config.hnsw_m,
        config.max_elements,
        16,
        config.hnsw_ef_construction,
        DistCosine {},
    )
}

/// Thin wrapper around the nearest-neighbor store.
///
/// Mutations (insert, rebuild, clear, destroy) take the write lock and
/// persist the snapshot before returning; searches take the read lock and
/// may observe the pre-rebuild state, which is acceptable.
pub struct VectorIndex {
    collection: String,
    snapshot_path: PathBuf,
    config: IndexConfig,
    embedder: Arc<dyn EmbeddingProvider>,
    state: RwLock<IndexState>,
}

impl VectorIndex {
    /// Create an empty index for the configured collection.
    ///
    /// Nothing is read from disk until [`VectorIndex::load`] is called.
    pub fn new(config: &IndexConfig, storage_dir: &Path, embedder: Arc<dyn EmbeddingProvider>) -> Self {
        let snapshot_path = storage_dir.join(format!("{}.json", config.collection));
        Self {
            collection: config.collection.clone(),
            snapshot_path,
            config: config.clone(),
            embedder,
            state: RwLock::new(IndexState::empty(config)),
        }
    }

    /// Logical collection name all entries are stored under
    pub fn collection(&self) -> &str {
        &self.collection
    }

    /// Load the persisted snapshot, if any, and rebuild the graph from it.
    ///
    /// Returns the number of entries restored (0 when no snapshot exists).
    /// A corrupt snapshot is an [`Error::Index`] so the caller can fall back
    /// to a rebuild from the source documents.
    pub fn load(&self) -> Result<usize> {
        if !self.snapshot_path.exists() {
            return Ok(0);
        }

        let data = fs::read_to_string(&self.snapshot_path)?;
        let chunks: Vec<Chunk> = serde_json::from_str(&data).map_err(|e| {
            Error::index(format!(
                "corrupt snapshot {}: {e}",
                self.snapshot_path.display()
            ))
        })?;

        let mut state = self.state.write();
        *state = IndexState::empty(&self.config);
        for (i, chunk) in chunks.iter().enumerate() {
            if chunk.embedding.is_empty() {
                return Err(Error::index(format!(
                    "snapshot entry {} has no embedding",
                    chunk.id
                )));
            }
            state.graph.insert((&chunk.embedding, i));
        }
        state.chunks = chunks;

        tracing::info!(
            collection = %self.collection,
            entries = state.chunks.len(),
            "loaded index snapshot"
        );
        Ok(state.chunks.len())
    }

    /// Embed and insert chunks.
    ///
    /// Safe on an empty index (creates the collection snapshot) and on a
    /// populated one (appends). Returns the number of entries inserted.
    pub async fn insert(&self, mut chunks: Vec<Chunk>) -> Result<usize> {
        if chunks.is_empty() {
            return Ok(0);
        }

        let texts: Vec<String> = chunks.iter().map(|c| c.content.clone()).collect();
        let embeddings = self.embedder.embed_batch(&texts).await?;
        for (chunk, embedding) in chunks.iter_mut().zip(embeddings) {
            chunk.embedding = embedding;
        }

        let inserted = chunks.len();
        let mut state = self.state.write();
        for chunk in chunks {
            let id = state.chunks.len();
            state.graph.insert((&chunk.embedding, id));
            state.chunks.push(chunk);
        }
        self.persist(&state.chunks)?;

        tracing::debug!(collection = %self.collection, inserted, "inserted chunks");
        Ok(inserted)
    }

    /// Re-embed the given chunks and swap them in as the entire index.
    ///
    /// All-or-nothing: embedding happens before the live state is touched,
    /// so a provider failure leaves the previous index fully usable.
    pub async fn rebuild(&self, mut chunks: Vec<Chunk>) -> Result<usize> {
        let texts: Vec<String> = chunks.iter().map(|c| c.content.clone()).collect();
        let embeddings = self.embedder.embed_batch(&texts).await?;
        for (chunk, embedding) in chunks.iter_mut().zip(embeddings) {
            chunk.embedding = embedding;
        }

        let mut fresh = IndexState::empty(&self.config);
        for chunk in chunks {
            let id = fresh.chunks.len();
            fresh.graph.insert((&chunk.embedding, id));
            fresh.chunks.push(chunk);
        }

        let mut state = self.state.write();
        *state = fresh;
        self.persist(&state.chunks)?;

        tracing::info!(
            collection = %self.collection,
            entries = state.chunks.len(),
            "index rebuilt"
        );
        Ok(state.chunks.len())
    }

    /// Embed the query and return the `k` nearest chunks, best first.
    ///
    /// An empty index yields an empty result, not an error.
    pub async fn search(&self, query: &str, k: usize) -> Result<Vec<ScoredChunk>> {
        if k == 0 || self.count() == 0 {
            return Ok(Vec::new());
        }

        let embedding = self.embedder.embed(query).await?;

        let state = self.state.read();
        if state.chunks.is_empty() {
            return Ok(Vec::new());
        }

        let neighbours = state.graph.search(
            &embedding,
            k.min(state.chunks.len()),
            self.config.hnsw_ef_search,
        );

        let mut results = Vec::with_capacity(neighbours.len());
        for neighbour in neighbours {
            let Some(chunk) = state.chunks.get(neighbour.d_id) else {
                continue;
            };
            let mut chunk = chunk.clone();
            chunk.embedding = Vec::new();
            // DistCosine yields a distance; similarity is its complement
            results.push(ScoredChunk {
                chunk,
                similarity: 1.0 - neighbour.distance,
            });
        }

        results.sort_by(|a, b| {
            b.similarity
                .partial_cmp(&a.similarity)
                .unwrap_or(Ordering::Equal)
        });
        results.truncate(k);
        Ok(results)
    }

    /// Number of entries currently stored
    pub fn count(&self) -> usize {
        self.state.read().chunks.len()
    }

    /// Irreversibly drop all in-memory entries; used before a full rebuild
    pub fn clear(&self) {
        let mut state = self.state.write();
        *state = IndexState::empty(&self.config);
    }

    /// Drop all entries and remove the snapshot file
    pub fn destroy(&self) -> Result<()> {
        self.clear();
        if self.snapshot_path.exists() {
            fs::remove_file(&self.snapshot_path)?;
        }
        tracing::info!(collection = %self.collection, "index destroyed");
        Ok(())
    }

    /// Write the snapshot via a temp file and rename so a crash never leaves
    /// a torn snapshot referenced as valid
    fn persist(&self, chunks: &[Chunk]) -> Result<()> {
        let json = serde_json::to_string(chunks)?;
        let tmp = self.snapshot_path.with_extension("json.tmp");
        fs::write(&tmp, json)?;
        fs::rename(&tmp, &self.snapshot_path)?;
        Ok(())
    }
}
