//! Corpus manager: the state machine governing corpus mutation
//!
//! Owns the document set on disk, the registry, and the vector index, and
//! keeps them consistent with a full-rebuild-on-mutation policy: deleting a
//! document clears and reconstructs the whole index from the surviving raw
//! files rather than patching entries incrementally, because the underlying
//! store does not guarantee stable per-chunk ids across rebuilds.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use dashmap::DashMap;
use parking_lot::RwLock;
use tokio::sync::Mutex;

use crate::classify::DomainClassifier;
use crate::config::RagConfig;
use crate::error::{Error, Result};
use crate::generation::AnswerComposer;
use crate::ingestion::{PdfExtractor, TextChunker};
use crate::providers::{EmbeddingProvider, GenerationProvider};
use crate::retrieval::VectorIndex;
use crate::types::document::{content_hash, Document};
use crate::types::response::{
    AcceptedFile, DocumentInfo, HealthStatus, IngestReport, QueryResponse, RejectedFile,
    RemovalOutcome,
};

/// Lifecycle of the corpus index
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CorpusState {
    /// No index attached; the corpus may be empty or never loaded
    Uninitialized,
    /// Index attached but not yet confirmed usable
    Loaded,
    /// Index confirmed non-empty and consistent with the document set
    Ready,
}

/// Per-file outcome inside an ingestion batch
enum Ingested {
    Accepted(u32),
    Rejected(String),
}

/// The corpus: documents on disk, their registry, and the index built over
/// their chunks. One instance per corpus; multiple independent corpora can
/// coexist in a process.
pub struct CorpusManager {
    config: RagConfig,
    extractor: Arc<dyn PdfExtractor>,
    classifier: DomainClassifier,
    chunker: TextChunker,
    index: VectorIndex,
    composer: AnswerComposer,
    documents: DashMap<String, Document>,
    registry_path: PathBuf,
    raw_dir: PathBuf,
    state: RwLock<CorpusState>,
    /// Only one rebuild may be in flight per corpus
    rebuild_lock: Mutex<()>,
}

impl CorpusManager {
    /// Attach to (or create) the corpus under `config.storage.root`.
    ///
    /// A persisted index snapshot is loaded when present. An empty or
    /// corrupt snapshot with source documents still on disk triggers one
    /// automatic rebuild; if that rebuild also fails, opening fails and the
    /// caller may retry later.
    pub async fn open(
        config: RagConfig,
        extractor: Arc<dyn PdfExtractor>,
        embedder: Arc<dyn EmbeddingProvider>,
        generator: Arc<dyn GenerationProvider>,
    ) -> Result<Self> {
        config.validate()?;

        let raw_dir = config.storage.raw_dir();
        fs::create_dir_all(&raw_dir)?;
        let registry_path = config.storage.root.join("documents.json");

        let documents = load_registry(&registry_path);
        let index = VectorIndex::new(&config.index, &config.storage.root, embedder);
        let classifier = DomainClassifier::new(config.classifier.clone(), Arc::clone(&generator));
        let chunker = TextChunker::new(&config.chunking);
        let composer = AnswerComposer::new(generator);

        let manager = Self {
            config,
            extractor,
            classifier,
            chunker,
            index,
            composer,
            documents,
            registry_path,
            raw_dir,
            state: RwLock::new(CorpusState::Uninitialized),
            rebuild_lock: Mutex::new(()),
        };

        manager.attach_index().await?;
        Ok(manager)
    }

    /// Startup transition: attach the persisted index or rebuild from source
    async fn attach_index(&self) -> Result<()> {
        match self.index.load() {
            Ok(count) if count > 0 => {
                *self.state.write() = CorpusState::Ready;
                return Ok(());
            }
            Ok(_) => {}
            Err(e) => tracing::warn!("failed to load index snapshot: {e}"),
        }

        if self.documents.is_empty() {
            *self.state.write() = CorpusState::Uninitialized;
            return Ok(());
        }

        *self.state.write() = CorpusState::Loaded;
        tracing::warn!(
            documents = self.documents.len(),
            "index empty or unreadable with documents on disk, rebuilding"
        );
        self.rebuild_index().await?;
        Ok(())
    }

    /// Classify and ingest a batch of uploaded files.
    ///
    /// Rejections are per-file data, never batch-aborting errors; the
    /// report's `success` flag is false when no file was accepted.
    pub async fn add_documents(&self, files: Vec<(String, Vec<u8>)>) -> Result<IngestReport> {
        let mut accepted = Vec::new();
        let mut rejected = Vec::new();

        for (filename, data) in files {
            match self.ingest_file(&filename, &data).await {
                Ok(Ingested::Accepted(chunks)) => accepted.push(AcceptedFile { filename, chunks }),
                Ok(Ingested::Rejected(reason)) => rejected.push(RejectedFile { filename, reason }),
                Err(e) => rejected.push(RejectedFile {
                    filename,
                    reason: format!("Processing error: {e}"),
                }),
            }
        }

        let report = IngestReport::new(accepted, rejected);
        tracing::info!(
            accepted = report.accepted.len(),
            rejected = report.rejected.len(),
            total_chunks = report.total_chunks,
            "ingestion batch complete"
        );
        Ok(report)
    }

    async fn ingest_file(&self, filename: &str, data: &[u8]) -> Result<Ingested> {
        if !filename.to_lowercase().ends_with(".pdf") {
            return Ok(Ingested::Rejected("Only PDF files are allowed.".to_string()));
        }
        if filename.contains('/') || filename.contains('\\') {
            return Ok(Ingested::Rejected("Invalid filename.".to_string()));
        }
        if self.documents.contains_key(filename) {
            return Ok(Ingested::Rejected(
                "A document with this filename already exists.".to_string(),
            ));
        }

        let pages = match self.extractor.extract_pages(filename, data) {
            Ok(pages) => pages,
            Err(e) => return Ok(Ingested::Rejected(e.to_string())),
        };

        tracing::info!(filename, "classifying upload");
        let verdict = self.classifier.classify(&pages).await;
        if !verdict.accepted {
            tracing::info!(filename, reason = %verdict.reason, "rejected by domain gate");
            return Ok(Ingested::Rejected(format!(
                "Not a logistics document: {}",
                verdict.reason
            )));
        }
        tracing::info!(filename, reason = %verdict.reason, "accepted by domain gate");

        let chunks = self.chunker.chunk_pages(filename, &pages);
        if chunks.is_empty() {
            return Ok(Ingested::Rejected(
                "No extractable content in document.".to_string(),
            ));
        }
        let chunk_count = chunks.len() as u32;

        // The raw file is persisted only after the gate has passed
        let path = self.raw_dir.join(filename);
        fs::write(&path, data)?;

        if let Err(e) = self.index.insert(chunks).await {
            // Never leave an unindexed file behind
            let _ = fs::remove_file(&path);
            return Err(e);
        }

        let mut doc = Document::new(
            filename.to_string(),
            content_hash(data),
            data.len() as u64,
        );
        doc.total_pages = pages.len() as u32;
        doc.total_chunks = chunk_count;
        self.documents.insert(filename.to_string(), doc);
        self.save_registry();
        *self.state.write() = CorpusState::Ready;

        Ok(Ingested::Accepted(chunk_count))
    }

    /// Remove a document and restore index consistency.
    ///
    /// Remaining documents trigger a full rebuild; removing the last one
    /// destroys the index and returns the corpus to `Uninitialized`.
    pub async fn remove_document(&self, filename: &str) -> Result<RemovalOutcome> {
        if self.documents.remove(filename).is_none() {
            return Err(Error::DocumentNotFound(filename.to_string()));
        }
        self.save_registry();

        let path = self.raw_dir.join(filename);
        if path.exists() {
            fs::remove_file(&path)?;
        }

        let remaining = self.documents.len();
        if remaining == 0 {
            self.index.destroy()?;
            *self.state.write() = CorpusState::Uninitialized;
            tracing::info!(filename, "deleted last document, index destroyed");
            return Ok(RemovalOutcome {
                remaining_documents: 0,
                rebuilt: false,
                chunks_indexed: 0,
            });
        }

        let chunks_indexed = self.rebuild_index().await?;
        tracing::info!(filename, remaining, chunks_indexed, "document deleted, index rebuilt");
        Ok(RemovalOutcome {
            remaining_documents: remaining,
            rebuilt: true,
            chunks_indexed,
        })
    }

    /// Re-chunk and re-embed every registered document from its raw file and
    /// swap the result in as the new index.
    ///
    /// All-or-nothing: extraction and embedding complete before the live
    /// index is touched, so any failure leaves the previous index in place
    /// and the operation retryable.
    async fn rebuild_index(&self) -> Result<usize> {
        let _guard = self.rebuild_lock.lock().await;

        let mut filenames: Vec<String> =
            self.documents.iter().map(|e| e.key().clone()).collect();
        // Deterministic chunk ordering across rebuilds
        filenames.sort();

        let mut all_chunks = Vec::new();
        for filename in &filenames {
            let data = fs::read(self.raw_dir.join(filename))?;
            let pages = self.extractor.extract_pages(filename, &data)?;
            let chunks = self.chunker.chunk_pages(filename, &pages);
            if let Some(mut entry) = self.documents.get_mut(filename) {
                entry.total_pages = pages.len() as u32;
                entry.total_chunks = chunks.len() as u32;
            }
            all_chunks.extend(chunks);
        }

        let count = self.index.rebuild(all_chunks).await?;
        self.save_registry();
        *self.state.write() = if count > 0 {
            CorpusState::Ready
        } else {
            CorpusState::Uninitialized
        };
        Ok(count)
    }

    /// Answer a question from the indexed corpus.
    ///
    /// `top_k` defaults to the configured retrieval depth. Requires a
    /// `Ready` corpus; an empty corpus is [`Error::NoDocumentsIndexed`].
    pub async fn ask(
        &self,
        question: &str,
        top_k: Option<usize>,
        include_sources: bool,
    ) -> Result<QueryResponse> {
        if *self.state.read() != CorpusState::Ready {
            return Err(Error::NoDocumentsIndexed);
        }

        let k = top_k.unwrap_or(self.config.retrieval.top_k);
        let mut results = self.index.search(question, k).await?;
        results.retain(|r| r.similarity >= self.config.retrieval.min_similarity);

        self.composer.answer(question, &results, include_sources).await
    }

    /// List corpus documents, sorted by filename
    pub fn list_documents(&self) -> Vec<DocumentInfo> {
        let mut docs: Vec<DocumentInfo> = self
            .documents
            .iter()
            .map(|e| DocumentInfo {
                filename: e.key().clone(),
                size_bytes: e.value().file_size,
            })
            .collect();
        docs.sort_by(|a, b| a.filename.cmp(&b.filename));
        docs
    }

    /// Current lifecycle state
    pub fn state(&self) -> CorpusState {
        *self.state.read()
    }

    /// Corpus health snapshot
    pub fn health(&self) -> HealthStatus {
        HealthStatus {
            index_ready: self.state() == CorpusState::Ready,
            documents: self.documents.len(),
            chunks: self.index.count(),
        }
    }

    /// Persist the registry, logging rather than failing on IO problems
    fn save_registry(&self) {
        let mut docs: Vec<Document> = self.documents.iter().map(|e| e.value().clone()).collect();
        docs.sort_by(|a, b| a.filename.cmp(&b.filename));

        match serde_json::to_string_pretty(&docs) {
            Ok(content) => {
                if let Err(e) = fs::write(&self.registry_path, content) {
                    tracing::error!("failed to save {}: {e}", self.registry_path.display());
                }
            }
            Err(e) => tracing::error!("failed to serialize document registry: {e}"),
        }
    }
}

/// Load the document registry, tolerating a missing or unparsable file
fn load_registry(path: &Path) -> DashMap<String, Document> {
    let documents = DashMap::new();

    if path.exists() {
        match fs::read_to_string(path) {
            Ok(content) => match serde_json::from_str::<Vec<Document>>(&content) {
                Ok(docs) => {
                    for doc in docs {
                        documents.insert(doc.filename.clone(), doc);
                    }
                }
                Err(e) => tracing::warn!("failed to parse {}: {e}", path.display()),
            },
            Err(e) => tracing::warn!("failed to read {}: {e}", path.display()),
        }
    }

    documents
}
