//! Prompt templates enforcing the answer-only-from-context contract

use crate::providers::generation::ChatMessage;
use crate::retrieval::ScoredChunk;

/// The exact sentence the model must emit when the context lacks the answer
pub const REFUSAL_SENTENCE: &str =
    "I could not find that information in the provided documents.";

/// Prompt builder for grounded answering
pub struct PromptBuilder;

impl PromptBuilder {
    /// Concatenate retrieved chunks in descending relevance order, each
    /// labeled with its excerpt number, source filename, and page.
    pub fn build_context(results: &[ScoredChunk]) -> String {
        results
            .iter()
            .enumerate()
            .map(|(i, result)| {
                format!(
                    "[Excerpt {} | {} | page {}]\n{}",
                    i + 1,
                    result.chunk.source.filename,
                    result.chunk.source.page_number,
                    result.chunk.content
                )
            })
            .collect::<Vec<_>>()
            .join("\n\n")
    }

    /// Build the grounded answering messages for a question and its context
    pub fn build_messages(question: &str, context: &str) -> Vec<ChatMessage> {
        let system = format!(
            r#"You are a helpful logistics assistant. Use ONLY the document excerpts below to answer the question.

Rules:
- Answer using ONLY the information in the excerpts.
- Quote exact numbers, names, codes, and dates where possible.
- If the excerpts do not contain the answer, say exactly: "{REFUSAL_SENTENCE}"
- Be concise and clear.

Document excerpts:
----------------
{context}
----------------"#
        );

        vec![ChatMessage::system(system), ChatMessage::user(question)]
    }
}
