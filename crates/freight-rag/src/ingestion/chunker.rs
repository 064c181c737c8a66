//! Recursive character chunking with page tracking
//!
//! Splitting prefers the coarsest separator that keeps segments under the
//! size limit: paragraph break, then line break, then sentence period, then
//! space, and finally a raw character split. Consecutive chunks share a
//! bounded overlap so context survives a split boundary.

use crate::config::ChunkingConfig;
use crate::types::document::{Chunk, ChunkSource};

use super::pdf::PageText;

/// Separator cascade, coarsest first. Raw character splitting is the final
/// fallback when none of these occur in an oversized segment.
const SEPARATORS: [&str; 4] = ["\n\n", "\n", ".", " "];

/// Text chunker with configurable size and overlap
pub struct TextChunker {
    /// Maximum chunk size in characters
    chunk_size: usize,
    /// Overlap carried between consecutive chunks
    overlap: usize,
}

impl TextChunker {
    /// Create a chunker from configuration
    pub fn new(config: &ChunkingConfig) -> Self {
        Self {
            chunk_size: config.chunk_size,
            overlap: config.chunk_overlap,
        }
    }

    /// Chunk all pages of a document.
    ///
    /// Whitespace-only pages contribute no chunks; every chunk is tagged with
    /// its filename, page number, and running sequence index.
    pub fn chunk_pages(&self, filename: &str, pages: &[PageText]) -> Vec<Chunk> {
        let page_count = pages.len() as u32;
        let mut chunks = Vec::new();

        for page in pages {
            if page.text.trim().is_empty() {
                continue;
            }
            for piece in self.split_text(&page.text) {
                let trimmed = piece.trim();
                if trimmed.is_empty() {
                    continue;
                }
                let source = ChunkSource {
                    filename: filename.to_string(),
                    page_number: page.page_number,
                    page_count,
                };
                chunks.push(Chunk::new(trimmed.to_string(), source, chunks.len() as u32));
            }
        }

        chunks
    }

    /// Split raw text into segments of at most `chunk_size` characters with
    /// at most `overlap` characters shared between consecutive segments.
    pub fn split_text(&self, text: &str) -> Vec<String> {
        let pieces = self.split_recursive(text, &SEPARATORS);
        self.merge_pieces(pieces)
    }

    /// Break text into pieces no longer than `chunk_size`, trying the given
    /// separators coarsest-first and recursing into finer ones only for
    /// pieces that are still too large.
    fn split_recursive(&self, text: &str, separators: &[&str]) -> Vec<String> {
        if text.len() <= self.chunk_size {
            return vec![text.to_string()];
        }

        let Some((sep, finer)) = separators.split_first() else {
            return self.split_chars(text);
        };

        if !text.contains(sep) {
            return self.split_recursive(text, finer);
        }

        let mut pieces = Vec::new();
        for piece in split_keeping_separator(text, sep) {
            if piece.len() > self.chunk_size {
                pieces.extend(self.split_recursive(&piece, finer));
            } else {
                pieces.push(piece);
            }
        }
        pieces
    }

    /// Raw character fallback for text with no usable separators
    fn split_chars(&self, text: &str) -> Vec<String> {
        let mut pieces = Vec::new();
        let mut start = 0;
        while start < text.len() {
            let mut end = (start + self.chunk_size).min(text.len());
            while !text.is_char_boundary(end) {
                end -= 1;
            }
            pieces.push(text[start..end].to_string());
            start = end;
        }
        pieces
    }

    /// Merge small pieces into chunks, carrying at most `overlap` characters
    /// across each boundary. Emitted chunks never exceed `chunk_size`.
    fn merge_pieces(&self, pieces: Vec<String>) -> Vec<String> {
        let mut chunks = Vec::new();
        let mut current = String::new();

        for piece in pieces {
            if !current.is_empty() && current.len() + piece.len() > self.chunk_size {
                chunks.push(current.clone());

                let mut tail = overlap_tail(&current, self.overlap);
                if tail.len() + piece.len() > self.chunk_size {
                    tail = overlap_tail(&tail, self.chunk_size.saturating_sub(piece.len()));
                }
                current = tail;
            }
            current.push_str(&piece);
        }

        if !current.trim().is_empty() {
            chunks.push(current);
        }

        chunks
    }
}

/// Split `text` by `sep`, keeping the separator attached to the preceding
/// piece so concatenating the pieces reproduces the input.
fn split_keeping_separator(text: &str, sep: &str) -> Vec<String> {
    let mut pieces = Vec::new();
    let mut rest = text;
    while let Some(idx) = rest.find(sep) {
        let end = idx + sep.len();
        pieces.push(rest[..end].to_string());
        rest = &rest[end..];
    }
    if !rest.is_empty() {
        pieces.push(rest.to_string());
    }
    pieces
}

/// Last `max` characters of `text`, starting at a character boundary and
/// preferably just after a space so the overlap begins on a whole word.
fn overlap_tail(text: &str, max: usize) -> String {
    if max == 0 {
        return String::new();
    }
    if text.len() <= max {
        return text.to_string();
    }

    let mut start = text.len() - max;
    while start < text.len() && !text.is_char_boundary(start) {
        start += 1;
    }
    let tail = &text[start..];

    match tail.find(' ') {
        Some(pos) if pos + 1 < tail.len() => tail[pos + 1..].to_string(),
        _ => tail.to_string(),
    }
}
