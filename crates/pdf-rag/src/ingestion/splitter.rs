//! Recursive character text splitting with page tracking
//!
//! Text is split on the coarsest separator that occurs in it (paragraphs,
//! then lines, then words, then characters). Pieces that still exceed the
//! chunk size are split again with the finer separators; small pieces are
//! merged back together up to the chunk size, carrying up to
//! `chunk_overlap` characters from the end of one chunk into the next.
//! All lengths are counted in characters, not bytes.

use std::collections::VecDeque;

use crate::config::ChunkingConfig;

use super::parser::PageContent;

/// A chunk of page text, before embedding
#[derive(Debug, Clone, PartialEq)]
pub struct SplitChunk {
    /// Page the chunk was cut from (1-indexed)
    pub page_number: u32,
    /// Chunk text, trimmed
    pub content: String,
    /// Byte offset of the chunk in the page text
    pub start_index: usize,
}

/// Recursive character text splitter
#[derive(Debug, Clone)]
pub struct TextSplitter {
    chunk_size: usize,
    chunk_overlap: usize,
    separators: Vec<String>,
}

fn char_len(s: &str) -> usize {
    s.chars().count()
}

/// Byte length of the last `chars` characters of `s`
fn tail_bytes(s: &str, chars: usize) -> usize {
    if chars == 0 {
        return 0;
    }
    s.char_indices()
        .rev()
        .nth(chars - 1)
        .map(|(i, _)| s.len() - i)
        .unwrap_or(s.len())
}

/// Split `text` on `separator`, keeping the separator at the start of the
/// following piece. Empty pieces are dropped. An empty separator splits
/// into characters.
fn split_keep_separator<'a>(text: &'a str, separator: &str) -> Vec<&'a str> {
    if separator.is_empty() {
        return text
            .char_indices()
            .map(|(i, c)| &text[i..i + c.len_utf8()])
            .collect();
    }

    let mut pieces = Vec::new();
    let mut start = 0;
    for (idx, _) in text.match_indices(separator) {
        pieces.push(&text[start..idx]);
        start = idx;
    }
    pieces.push(&text[start..]);

    pieces.into_iter().filter(|p| !p.is_empty()).collect()
}

impl TextSplitter {
    /// Create a new splitter
    pub fn new(chunk_size: usize, chunk_overlap: usize, separators: Vec<String>) -> Self {
        Self {
            chunk_size: chunk_size.max(1),
            chunk_overlap: chunk_overlap.min(chunk_size.saturating_sub(1)),
            separators,
        }
    }

    /// Create a splitter from configuration
    pub fn from_config(config: &ChunkingConfig) -> Self {
        Self::new(
            config.chunk_size,
            config.chunk_overlap,
            config.separators.clone(),
        )
    }

    /// Split text into trimmed, non-empty chunks
    pub fn split_text(&self, text: &str) -> Vec<String> {
        self.split_recursive(text, &self.separators)
            .into_iter()
            .map(|c| c.trim().to_string())
            .filter(|c| !c.is_empty())
            .collect()
    }

    /// Split every page, keeping page numbers and offsets
    pub fn split_pages(&self, pages: &[PageContent]) -> Vec<SplitChunk> {
        let mut chunks = Vec::new();

        for page in pages {
            let text = page.content.as_str();
            let mut index = 0usize;
            let mut previous_len = 0usize;
            let mut previous_overlap = 0usize;

            for content in self.split_text(text) {
                let mut offset = (index + previous_len)
                    .saturating_sub(previous_overlap)
                    .min(text.len());
                while !text.is_char_boundary(offset) {
                    offset -= 1;
                }

                index = text[offset..]
                    .find(content.as_str())
                    .map(|pos| pos + offset)
                    .or_else(|| text.find(content.as_str()))
                    .unwrap_or(0);
                previous_len = content.len();
                previous_overlap = tail_bytes(&content, self.chunk_overlap);

                chunks.push(SplitChunk {
                    page_number: page.page_number,
                    content,
                    start_index: index,
                });
            }
        }

        chunks
    }

    fn split_recursive(&self, text: &str, separators: &[String]) -> Vec<String> {
        let mut separator = separators.last().map(String::as_str).unwrap_or("");
        let mut remaining: &[String] = &[];

        for (i, candidate) in separators.iter().enumerate() {
            if candidate.is_empty() {
                separator = "";
                break;
            }
            if text.contains(candidate.as_str()) {
                separator = candidate;
                remaining = &separators[i + 1..];
                break;
            }
        }

        let mut final_chunks = Vec::new();
        let mut good_splits: Vec<&str> = Vec::new();

        for piece in split_keep_separator(text, separator) {
            if char_len(piece) < self.chunk_size {
                good_splits.push(piece);
                continue;
            }

            if !good_splits.is_empty() {
                final_chunks.extend(self.merge_splits(&good_splits));
                good_splits.clear();
            }

            if remaining.is_empty() {
                final_chunks.push(piece.to_string());
            } else {
                final_chunks.extend(self.split_recursive(piece, remaining));
            }
        }

        if !good_splits.is_empty() {
            final_chunks.extend(self.merge_splits(&good_splits));
        }

        final_chunks
    }

    /// Greedily merge small pieces into chunks, carrying overlap forward
    fn merge_splits(&self, splits: &[&str]) -> Vec<String> {
        let mut docs = Vec::new();
        let mut current: VecDeque<&str> = VecDeque::new();
        let mut total = 0usize;

        for piece in splits {
            let len = char_len(piece);

            if total + len > self.chunk_size {
                if total > self.chunk_size {
                    tracing::warn!(
                        "Created a chunk of size {}, which is longer than the specified {}",
                        total,
                        self.chunk_size
                    );
                }

                if !current.is_empty() {
                    if let Some(doc) = Self::join(&current) {
                        docs.push(doc);
                    }

                    while total > self.chunk_overlap
                        || (total + len > self.chunk_size && total > 0)
                    {
                        match current.pop_front() {
                            Some(front) => total -= char_len(front),
                            None => break,
                        }
                    }
                }
            }

            current.push_back(piece);
            total += len;
        }

        if let Some(doc) = Self::join(&current) {
            docs.push(doc);
        }

        docs
    }

    fn join(pieces: &VecDeque<&str>) -> Option<String> {
        let joined: String = pieces.iter().copied().collect();
        let trimmed = joined.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(trimmed.to_string())
        }
    }
}
