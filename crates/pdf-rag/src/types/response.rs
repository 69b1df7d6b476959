//! Response types for chat, ingestion and history

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::chat::ChatMessage;
use super::document::{Chunk, Document};

/// Citation from a source document
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Citation {
    /// Chunk ID
    pub chunk_id: Uuid,
    /// Document ID
    pub document_id: Uuid,
    /// Source filename
    pub filename: String,
    /// Page number (1-indexed)
    pub page_number: u32,
    /// Exact snippet from the source
    pub snippet: String,
    /// Snippet with highlighted query terms (<mark> tags)
    pub snippet_highlighted: String,
    /// Cosine similarity to the question
    pub similarity_score: f32,
}

impl Citation {
    /// Create a citation from a chunk and similarity score
    pub fn from_chunk(chunk: &Chunk, similarity_score: f32) -> Self {
        Self {
            chunk_id: chunk.id,
            document_id: chunk.document_id,
            filename: chunk.source.filename.clone(),
            page_number: chunk.source.page_number,
            snippet: chunk.content.clone(),
            snippet_highlighted: chunk.content.clone(),
            similarity_score,
        }
    }

    /// Format citation for display in text
    pub fn format_inline(&self) -> String {
        format!("[Source: {}, Page {}]", self.filename, self.page_number)
    }

    /// Highlight query terms in the snippet
    ///
    /// Terms shorter than three characters are ignored so that articles and
    /// pronouns do not light up the whole snippet.
    pub fn highlight_terms(&mut self, terms: &[&str]) {
        let terms: Vec<String> = terms
            .iter()
            .map(|t| t.trim_matches(|c: char| !c.is_alphanumeric()))
            .filter(|t| t.chars().count() >= 3)
            .map(regex::escape)
            .collect();

        if terms.is_empty() {
            self.snippet_highlighted = self.snippet.clone();
            return;
        }

        // Single alternation so already inserted tags are never re-matched
        let pattern = format!("(?:{})", terms.join("|"));
        self.snippet_highlighted = match regex::RegexBuilder::new(&pattern)
            .case_insensitive(true)
            .build()
        {
            Ok(re) => re
                .replace_all(&self.snippet, |caps: &regex::Captures| {
                    format!("<mark>{}</mark>", &caps[0])
                })
                .to_string(),
            Err(_) => self.snippet.clone(),
        };
    }
}

/// Answer to a chat question
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatResponse {
    /// Generated answer
    pub answer: String,
    /// Chunks the answer was grounded on
    pub citations: Vec<Citation>,
    /// Number of chunks retrieved
    pub chunks_retrieved: usize,
    /// Processing time in milliseconds
    pub processing_time_ms: u64,
}

/// Result of ingesting a PDF
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IngestResponse {
    /// The stored document
    pub document: Document,
    /// Number of chunks created
    pub chunks: usize,
    /// Whether an earlier copy of the same file was replaced
    pub replaced: bool,
    /// Human-readable summary
    pub message: String,
}

/// A message as shown to chat frontends
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistoryEntry {
    /// "user" or "assistant"
    pub role: String,
    pub content: String,
    pub timestamp: chrono::DateTime<chrono::Utc>,
}

impl From<&ChatMessage> for HistoryEntry {
    fn from(message: &ChatMessage) -> Self {
        Self {
            role: message.role.display_role().to_string(),
            content: message.content.clone(),
            timestamp: message.timestamp,
        }
    }
}

/// Conversation history
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistoryResponse {
    pub messages: Vec<HistoryEntry>,
}

impl HistoryResponse {
    pub fn from_messages(messages: &[ChatMessage]) -> Self {
        Self {
            messages: messages.iter().map(HistoryEntry::from).collect(),
        }
    }
}
