//! Logistics-domain relevance gate for uploaded documents
//!
//! Classification combines a keyword scan with a generative-model call. The
//! model reply is parsed tolerantly ([`structured`]); an unusable reply
//! falls back to the keyword count, and an unreachable model accepts the
//! document by default so ingestion is never blocked by an auxiliary
//! service. Both fallback paths are observable on the returned [`Verdict`].

pub mod structured;

use serde::Deserialize;
use std::sync::Arc;

use crate::config::ClassifierConfig;
use crate::ingestion::PageText;
use crate::providers::generation::{ChatMessage, GenerationProvider};

/// How the verdict was reached
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Fallback {
    /// The model's structured reply was used directly
    None,
    /// The reply was unusable; the keyword count decided
    KeywordHeuristic,
    /// The classification call failed; accepted by default
    ServiceUnavailable,
}

/// Binary gate decision with a human-readable reason
#[derive(Debug, Clone)]
pub struct Verdict {
    /// Whether the document belongs in the corpus
    pub accepted: bool,
    /// Reason shown to the uploader
    pub reason: String,
    /// Which fallback, if any, produced this verdict
    pub fallback: Fallback,
}

impl Verdict {
    fn reject(reason: impl Into<String>) -> Self {
        Self {
            accepted: false,
            reason: reason.into(),
            fallback: Fallback::None,
        }
    }
}

/// Structured payload requested from the classification model
#[derive(Debug, Deserialize)]
struct ClassifierReply {
    is_logistics: bool,
    #[serde(default)]
    reason: Option<String>,
}

/// Domain-relevance gate over the leading pages of an uploaded document
pub struct DomainClassifier {
    config: ClassifierConfig,
    llm: Arc<dyn GenerationProvider>,
}

impl DomainClassifier {
    /// Create a classifier using the given generation provider
    pub fn new(config: ClassifierConfig, llm: Arc<dyn GenerationProvider>) -> Self {
        Self { config, llm }
    }

    /// Decide whether a document belongs in the logistics corpus.
    ///
    /// Never returns an error: classification-service failures resolve to an
    /// accept-by-default verdict flagged as [`Fallback::ServiceUnavailable`].
    pub async fn classify(&self, pages: &[PageText]) -> Verdict {
        let sample = self.sample_text(pages);
        if sample.trim().is_empty() {
            return Verdict::reject("The PDF appears to be empty or unreadable.");
        }

        let lowered = sample.to_lowercase();
        let hits: Vec<&str> = self
            .config
            .keywords
            .iter()
            .map(String::as_str)
            .filter(|kw| lowered.contains(&kw.to_lowercase()))
            .collect();

        let prompt = self.classification_prompt(&sample, &hits);
        let messages = [ChatMessage::user(prompt)];

        match self.llm.generate(&messages, 0.0).await {
            Ok(reply) => self.interpret_reply(&reply, &hits),
            Err(e) => {
                tracing::warn!("classification call failed, accepting by default: {e}");
                Verdict {
                    accepted: true,
                    reason: "Classification service unavailable, document accepted.".to_string(),
                    fallback: Fallback::ServiceUnavailable,
                }
            }
        }
    }

    /// Join the leading non-empty pages and cap the sample length
    fn sample_text(&self, pages: &[PageText]) -> String {
        let joined = pages
            .iter()
            .take(self.config.sample_pages)
            .map(|p| p.text.trim())
            .filter(|t| !t.is_empty())
            .collect::<Vec<_>>()
            .join("\n\n");

        if joined.len() <= self.config.sample_chars {
            return joined;
        }
        let mut end = self.config.sample_chars;
        while end > 0 && !joined.is_char_boundary(end) {
            end -= 1;
        }
        joined[..end].to_string()
    }

    fn interpret_reply(&self, reply: &str, hits: &[&str]) -> Verdict {
        if let Some(block) = structured::first_json_block(reply) {
            if let Ok(parsed) = serde_json::from_str::<ClassifierReply>(block) {
                return Verdict {
                    accepted: parsed.is_logistics,
                    reason: parsed
                        .reason
                        .unwrap_or_else(|| "Classification complete.".to_string()),
                    fallback: Fallback::None,
                };
            }
        }

        let accepted = hits.len() >= self.config.min_keyword_hits;
        Verdict {
            accepted,
            reason: format!("Keyword-based detection: {hits:?}"),
            fallback: Fallback::KeywordHeuristic,
        }
    }

    fn classification_prompt(&self, sample: &str, hits: &[&str]) -> String {
        let hints = if hits.is_empty() {
            "none".to_string()
        } else {
            hits.join(", ")
        };

        format!(
            r#"You are a document classifier. Analyze the following text from a PDF and determine if it is related to logistics, transportation, supply chain, shipping, freight, or related domains.

Text sample:
"""
{sample}
"""

Keyword hints found: {hints}

Respond with ONLY a JSON object in this exact format (no markdown, no explanation):
{{"is_logistics": true, "confidence": "high", "reason": "one sentence explanation"}}

Be strict: only return true if the document is genuinely about logistics/transport/supply chain operations."#
        )
    }
}
