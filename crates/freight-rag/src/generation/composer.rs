//! Answer composer: retrieval results to a grounded answer with citations

use std::sync::Arc;
use std::time::Instant;

use crate::error::Result;
use crate::providers::GenerationProvider;
use crate::retrieval::ScoredChunk;
use crate::types::response::{Citation, QueryResponse};

use super::prompt::PromptBuilder;

/// Citation excerpt budget in characters
const EXCERPT_CHARS: usize = 200;

/// Composes grounded answers from retrieved chunks
pub struct AnswerComposer {
    llm: Arc<dyn GenerationProvider>,
}

impl AnswerComposer {
    /// Create a composer using the given generation provider
    pub fn new(llm: Arc<dyn GenerationProvider>) -> Self {
        Self { llm }
    }

    /// Compose a grounded answer.
    ///
    /// Zero retrieved chunks is a successful "nothing relevant" response,
    /// not an error. A generation failure propagates as
    /// [`crate::Error::Generation`] without any partial answer.
    pub async fn answer(
        &self,
        question: &str,
        results: &[ScoredChunk],
        include_sources: bool,
    ) -> Result<QueryResponse> {
        let start = Instant::now();

        if results.is_empty() {
            return Ok(QueryResponse::not_found(elapsed_ms(start)));
        }

        let context = PromptBuilder::build_context(results);
        let messages = PromptBuilder::build_messages(question, &context);

        // Temperature 0 keeps repeated runs of the same question+context stable
        let answer = self.llm.generate(&messages, 0.0).await?;

        let citations = if include_sources {
            results
                .iter()
                .map(|r| Citation::from_chunk(&r.chunk, r.similarity, EXCERPT_CHARS))
                .collect()
        } else {
            Vec::new()
        };

        Ok(QueryResponse {
            answer,
            citations,
            chunks_retrieved: results.len(),
            processing_time_ms: elapsed_ms(start),
        })
    }
}

fn elapsed_ms(start: Instant) -> u64 {
    start.elapsed().as_millis() as u64
}
