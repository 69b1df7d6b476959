//! Document and chunk types with page tracking for citations

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A PDF that has been ingested
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Document {
    /// Unique document ID
    pub id: Uuid,
    /// Filename as uploaded by the user
    pub filename: String,
    /// SHA-256 of the raw file bytes, used for deduplication
    pub content_hash: String,
    /// Total number of pages
    pub total_pages: u32,
    /// Total number of chunks created
    pub total_chunks: u32,
    /// File size in bytes
    pub file_size: u64,
    /// Ingestion timestamp
    pub ingested_at: chrono::DateTime<chrono::Utc>,
}

impl Document {
    /// Create a new document record
    pub fn new(filename: String, content_hash: String, total_pages: u32, file_size: u64) -> Self {
        Self {
            id: Uuid::new_v4(),
            filename,
            content_hash,
            total_pages,
            total_chunks: 0,
            file_size,
            ingested_at: chrono::Utc::now(),
        }
    }
}

/// Where a chunk came from
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ChunkSource {
    /// Original filename (used in citations)
    pub filename: String,
    /// Page number (1-indexed)
    pub page_number: u32,
    /// Total pages in the document
    pub page_count: u32,
}

impl ChunkSource {
    /// Create source info for a PDF page
    pub fn pdf(filename: String, page_number: u32, page_count: u32) -> Self {
        Self {
            filename,
            page_number,
            page_count,
        }
    }

    /// Format source for display
    pub fn format_citation(&self) -> String {
        format!("{}, Page {}", self.filename, self.page_number)
    }
}

/// A chunk of text from a document
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Chunk {
    /// Unique chunk ID
    pub id: Uuid,
    /// Parent document ID
    pub document_id: Uuid,
    /// Text content
    pub content: String,
    /// Embedding vector
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub embedding: Vec<f32>,
    /// Source information for citations
    pub source: ChunkSource,
    /// Byte offset of the chunk inside its page text
    pub start_index: usize,
    /// Chunk index within the document
    pub chunk_index: u32,
}

impl Chunk {
    /// Create a new chunk without an embedding
    pub fn new(
        document_id: Uuid,
        content: String,
        source: ChunkSource,
        start_index: usize,
        chunk_index: u32,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            document_id,
            content,
            embedding: Vec::new(),
            source,
            start_index,
            chunk_index,
        }
    }

    /// Attach an embedding
    pub fn with_embedding(mut self, embedding: Vec<f32>) -> Self {
        self.embedding = embedding;
        self
    }

    /// Copy without the embedding, for search results
    pub fn without_embedding(&self) -> Self {
        Self {
            id: self.id,
            document_id: self.document_id,
            content: self.content.clone(),
            embedding: Vec::new(),
            source: self.source.clone(),
            start_index: self.start_index,
            chunk_index: self.chunk_index,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_citation() {
        let source = ChunkSource::pdf("manual.pdf".to_string(), 4, 10);
        assert_eq!(source.format_citation(), "manual.pdf, Page 4");
    }

    #[test]
    fn test_empty_embedding_not_serialized() {
        let chunk = Chunk::new(
            Uuid::new_v4(),
            "text".to_string(),
            ChunkSource::pdf("a.pdf".to_string(), 1, 1),
            0,
            0,
        );
        let json = serde_json::to_value(&chunk).unwrap();
        assert!(json.get("embedding").is_none());

        let with = chunk.clone().with_embedding(vec![0.5, 0.5]);
        let json = serde_json::to_value(&with).unwrap();
        assert_eq!(json["embedding"].as_array().unwrap().len(), 2);
        assert!(with.without_embedding().embedding.is_empty());
    }
}
