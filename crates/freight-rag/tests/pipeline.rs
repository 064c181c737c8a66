//! End-to-end pipeline tests using stub providers.
//!
//! The stubs stand in for the external collaborators: a text-based page
//! extractor, a deterministic bag-of-words embedder, and a generation stub
//! that classifies by content and otherwise echoes its grounded context so
//! assertions can check which facts reached the model.

use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;

use freight_rag::config::RagConfig;
use freight_rag::corpus::{CorpusManager, CorpusState};
use freight_rag::error::{Error, Result};
use freight_rag::ingestion::{PageText, PdfExtractor};
use freight_rag::providers::generation::ChatMessage;
use freight_rag::providers::{EmbeddingProvider, GenerationProvider};

/// Treats the upload bytes as UTF-8 text with form-feed page breaks
struct TextPagesExtractor;

impl PdfExtractor for TextPagesExtractor {
    fn extract_pages(&self, filename: &str, data: &[u8]) -> Result<Vec<PageText>> {
        let text = std::str::from_utf8(data)
            .map_err(|_| Error::extraction(filename, "unreadable bytes"))?;
        Ok(text
            .split('\x0c')
            .enumerate()
            .map(|(i, page)| PageText {
                page_number: i as u32 + 1,
                text: page.to_string(),
            })
            .collect())
    }
}

/// Deterministic bag-of-words embedder
struct HashEmbedder;

#[async_trait]
impl EmbeddingProvider for HashEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let mut v = vec![0.0f32; 256];
        for word in text.to_lowercase().split_whitespace() {
            let word: String = word.chars().filter(|c| c.is_alphanumeric()).collect();
            if word.is_empty() {
                continue;
            }
            let mut h: u64 = 0;
            for b in word.bytes() {
                h = h.wrapping_mul(31).wrapping_add(b as u64);
            }
            v[(h % 256) as usize] += 1.0;
        }
        let norm = v.iter().map(|x| x * x).sum::<f32>().sqrt();
        if norm > 0.0 {
            for x in &mut v {
                *x /= norm;
            }
        } else {
            v[0] = 1.0;
        }
        Ok(v)
    }

    fn name(&self) -> &str {
        "hash-stub"
    }
}

/// Generation stub: classification prompts get a verdict keyed off the
/// sampled text; answering prompts echo the full grounded context.
struct StubLlm {
    /// When true, classification calls fail (service outage)
    classifier_offline: bool,
}

impl StubLlm {
    fn online() -> Self {
        Self {
            classifier_offline: false,
        }
    }

    fn classifier_offline() -> Self {
        Self {
            classifier_offline: true,
        }
    }
}

#[async_trait]
impl GenerationProvider for StubLlm {
    async fn generate(&self, messages: &[ChatMessage], _temperature: f32) -> Result<String> {
        let prompt = messages
            .iter()
            .map(|m| m.content.as_str())
            .collect::<Vec<_>>()
            .join("\n");

        if prompt.contains("You are a document classifier") {
            if self.classifier_offline {
                return Err(Error::generation("classification service unreachable"));
            }
            // Judge only the sampled document text, not the prompt template
            let sample = prompt
                .split("Text sample:")
                .nth(1)
                .and_then(|s| s.split("Keyword hints").next())
                .unwrap_or("");
            return if sample.to_lowercase().contains("freight") {
                Ok(r#"{"is_logistics": true, "confidence": "high", "reason": "Freight content."}"#
                    .to_string())
            } else {
                Ok(r#"{"is_logistics": false, "confidence": "high", "reason": "Not about logistics operations."}"#
                    .to_string())
            };
        }

        Ok(format!("GROUNDED ANSWER BASED ON:\n{prompt}"))
    }

    fn name(&self) -> &str {
        "stub"
    }
}

fn config(root: &Path) -> RagConfig {
    let mut config = RagConfig::default();
    config.storage.root = root.to_path_buf();
    config
}

async fn corpus(root: &Path, llm: StubLlm) -> CorpusManager {
    CorpusManager::open(
        config(root),
        Arc::new(TextPagesExtractor),
        Arc::new(HashEmbedder),
        Arc::new(llm),
    )
    .await
    .unwrap()
}

fn rates_pdf() -> (String, Vec<u8>) {
    (
        "rates.pdf".to_string(),
        b"Freight rate card for container shipment services. \
          Container (20ft): $1,200 base rate. Customs clearance included."
            .to_vec(),
    )
}

#[tokio::test]
async fn single_page_rate_card_is_answered_with_citation() {
    let dir = tempfile::tempdir().unwrap();
    let corpus = corpus(dir.path(), StubLlm::online()).await;

    let report = corpus.add_documents(vec![rates_pdf()]).await.unwrap();
    assert!(report.success);
    assert_eq!(report.accepted.len(), 1);
    assert_eq!(report.accepted[0].filename, "rates.pdf");
    assert!(report.accepted[0].chunks >= 1);
    assert_eq!(corpus.state(), CorpusState::Ready);

    let response = corpus
        .ask("What is the 20ft container base rate?", None, true)
        .await
        .unwrap();
    assert!(response.answer.contains("$1,200"), "answer: {}", response.answer);
    assert!(!response.citations.is_empty());
    assert_eq!(response.citations[0].filename, "rates.pdf");
    assert_eq!(response.citations[0].page_number, 1);
    assert!(response.citations[0].excerpt.len() <= 203);
}

#[tokio::test]
async fn non_logistics_document_is_rejected_and_never_indexed() {
    let dir = tempfile::tempdir().unwrap();
    let corpus = corpus(dir.path(), StubLlm::online()).await;

    let report = corpus
        .add_documents(vec![(
            "recipe.pdf".to_string(),
            b"Whisk the eggs with flour and sugar until smooth.".to_vec(),
        )])
        .await
        .unwrap();

    assert!(!report.success);
    assert_eq!(report.rejected.len(), 1);
    assert!(report.rejected[0].reason.contains("Not a logistics document"));
    assert_eq!(corpus.health().documents, 0);
    assert_eq!(corpus.health().chunks, 0);
    assert!(corpus.list_documents().is_empty());
}

#[tokio::test]
async fn batch_partitions_accepted_and_rejected_files() {
    let dir = tempfile::tempdir().unwrap();
    let corpus = corpus(dir.path(), StubLlm::online()).await;

    let report = corpus
        .add_documents(vec![
            rates_pdf(),
            (
                "recipe.pdf".to_string(),
                b"Whisk the eggs with flour and sugar.".to_vec(),
            ),
            ("blank.pdf".to_string(), b"   \x0c \t ".to_vec()),
            ("notes.txt".to_string(), b"freight notes".to_vec()),
        ])
        .await
        .unwrap();

    assert!(report.success);
    assert_eq!(report.accepted.len(), 1);
    assert_eq!(report.rejected.len(), 3);

    let reasons: Vec<&str> = report.rejected.iter().map(|r| r.reason.as_str()).collect();
    assert!(reasons.iter().any(|r| r.contains("Not a logistics document")));
    assert!(reasons.iter().any(|r| r.contains("empty or unreadable")));
    assert!(reasons.iter().any(|r| r.contains("Only PDF files")));
}

#[tokio::test]
async fn asking_an_empty_corpus_is_a_no_documents_error() {
    let dir = tempfile::tempdir().unwrap();
    let corpus = corpus(dir.path(), StubLlm::online()).await;

    assert_eq!(corpus.state(), CorpusState::Uninitialized);
    let err = corpus.ask("anything?", None, true).await.unwrap_err();
    assert!(matches!(err, Error::NoDocumentsIndexed));
    assert!(!corpus.health().index_ready);
}

#[tokio::test]
async fn unrelated_query_gets_the_fixed_not_found_answer() {
    let dir = tempfile::tempdir().unwrap();
    let corpus = corpus(dir.path(), StubLlm::online()).await;
    corpus.add_documents(vec![rates_pdf()]).await.unwrap();

    let response = corpus
        .ask("quantum entanglement spectroscopy wavelength", None, true)
        .await
        .unwrap();
    assert_eq!(
        response.answer,
        "I couldn't find any relevant information in the uploaded documents."
    );
    assert!(response.citations.is_empty());
    assert_eq!(response.chunks_retrieved, 0);
}

#[tokio::test]
async fn classifier_outage_accepts_by_default() {
    let dir = tempfile::tempdir().unwrap();
    let corpus = corpus(dir.path(), StubLlm::classifier_offline()).await;

    let report = corpus.add_documents(vec![rates_pdf()]).await.unwrap();
    assert!(report.success, "outage must not block ingestion");
    assert_eq!(report.accepted.len(), 1);
    assert_eq!(corpus.state(), CorpusState::Ready);
}

#[tokio::test]
async fn deleting_one_of_three_documents_rebuilds_without_its_chunks() {
    let dir = tempfile::tempdir().unwrap();
    let corpus = corpus(dir.path(), StubLlm::online()).await;

    let report = corpus
        .add_documents(vec![
            (
                "alpha.pdf".to_string(),
                b"Freight terms for alpha carrier routes and alpha surcharges.".to_vec(),
            ),
            (
                "beta.pdf".to_string(),
                b"Freight manifest for beta warehouse pallets and beta storage.".to_vec(),
            ),
            (
                "gamma.pdf".to_string(),
                b"Freight customs forms for gamma imports and gamma duties.".to_vec(),
            ),
        ])
        .await
        .unwrap();
    assert_eq!(report.accepted.len(), 3);
    let chunks_before = corpus.health().chunks;

    let outcome = corpus.remove_document("beta.pdf").await.unwrap();
    assert!(outcome.rebuilt);
    assert_eq!(outcome.remaining_documents, 2);
    assert!(outcome.chunks_indexed < chunks_before);
    assert_eq!(corpus.health().chunks, outcome.chunks_indexed);

    // The deleted document's chunks are absent from any search result
    let response = corpus
        .ask("beta warehouse pallets storage manifest", None, true)
        .await
        .unwrap();
    assert!(response
        .citations
        .iter()
        .all(|c| c.filename != "beta.pdf"));

    // The survivors are still fully queryable
    let response = corpus
        .ask("gamma customs imports duties forms", None, true)
        .await
        .unwrap();
    assert!(response
        .citations
        .iter()
        .any(|c| c.filename == "gamma.pdf"));
}

#[tokio::test]
async fn delete_then_readd_restores_equivalent_results() {
    let dir = tempfile::tempdir().unwrap();
    let corpus = corpus(dir.path(), StubLlm::online()).await;

    let beta = (
        "beta.pdf".to_string(),
        b"Freight manifest for beta warehouse pallets and beta storage.".to_vec(),
    );
    corpus
        .add_documents(vec![
            (
                "alpha.pdf".to_string(),
                b"Freight terms for alpha carrier routes and alpha surcharges.".to_vec(),
            ),
            beta.clone(),
        ])
        .await
        .unwrap();

    let query = "beta warehouse pallets and alpha routes";
    let before: Vec<(String, u32)> = corpus
        .ask(query, None, true)
        .await
        .unwrap()
        .citations
        .iter()
        .map(|c| (c.filename.clone(), c.page_number))
        .collect();
    assert!(!before.is_empty());

    corpus.remove_document("beta.pdf").await.unwrap();
    corpus.add_documents(vec![beta]).await.unwrap();

    let after: Vec<(String, u32)> = corpus
        .ask(query, None, true)
        .await
        .unwrap()
        .citations
        .iter()
        .map(|c| (c.filename.clone(), c.page_number))
        .collect();

    assert_eq!(before, after, "identical content must rank identically");
}

#[tokio::test]
async fn removing_the_last_document_destroys_the_index() {
    let dir = tempfile::tempdir().unwrap();
    let corpus = corpus(dir.path(), StubLlm::online()).await;
    corpus.add_documents(vec![rates_pdf()]).await.unwrap();

    let outcome = corpus.remove_document("rates.pdf").await.unwrap();
    assert!(!outcome.rebuilt);
    assert_eq!(outcome.remaining_documents, 0);
    assert_eq!(outcome.chunks_indexed, 0);
    assert_eq!(corpus.state(), CorpusState::Uninitialized);

    let err = corpus.ask("rates?", None, true).await.unwrap_err();
    assert!(matches!(err, Error::NoDocumentsIndexed));
}

#[tokio::test]
async fn removing_an_unknown_document_is_not_found() {
    let dir = tempfile::tempdir().unwrap();
    let corpus = corpus(dir.path(), StubLlm::online()).await;

    let err = corpus.remove_document("ghost.pdf").await.unwrap_err();
    assert!(matches!(err, Error::DocumentNotFound(_)));
}

#[tokio::test]
async fn corpus_survives_a_restart() {
    let dir = tempfile::tempdir().unwrap();
    {
        let corpus = corpus(dir.path(), StubLlm::online()).await;
        corpus.add_documents(vec![rates_pdf()]).await.unwrap();
        assert_eq!(corpus.state(), CorpusState::Ready);
    }

    let reopened = corpus(dir.path(), StubLlm::online()).await;
    assert_eq!(reopened.state(), CorpusState::Ready);
    assert_eq!(reopened.health().documents, 1);

    let response = reopened
        .ask("What is the 20ft container base rate?", None, true)
        .await
        .unwrap();
    assert!(response.answer.contains("$1,200"));
}

#[tokio::test]
async fn corrupt_snapshot_triggers_rebuild_on_open() {
    let dir = tempfile::tempdir().unwrap();
    {
        let corpus = corpus(dir.path(), StubLlm::online()).await;
        corpus.add_documents(vec![rates_pdf()]).await.unwrap();
    }

    // Clobber the snapshot; the raw file and registry survive
    std::fs::write(dir.path().join("logistics_docs.json"), "{ torn").unwrap();

    let reopened = corpus(dir.path(), StubLlm::online()).await;
    assert_eq!(reopened.state(), CorpusState::Ready);
    assert!(reopened.health().chunks >= 1);

    let response = reopened
        .ask("What is the 20ft container base rate?", None, true)
        .await
        .unwrap();
    assert!(response.answer.contains("$1,200"));
}

#[tokio::test]
async fn duplicate_filenames_are_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let corpus = corpus(dir.path(), StubLlm::online()).await;

    corpus.add_documents(vec![rates_pdf()]).await.unwrap();
    let report = corpus.add_documents(vec![rates_pdf()]).await.unwrap();
    assert!(!report.success);
    assert!(report.rejected[0].reason.contains("already exists"));
}
