//! Vector store provider trait for storing and searching embeddings

use async_trait::async_trait;
use uuid::Uuid;

use crate::error::Result;
use crate::types::{Chunk, Document};

pub use crate::retrieval::SearchResult;

/// Trait for vector storage and similarity search
///
/// Implementations:
/// - `LocalVectorStore`: JSON-backed collection with exhaustive cosine scan
#[async_trait]
pub trait VectorStoreProvider: Send + Sync {
    /// Register a document and insert its embedded chunks
    async fn insert_chunks(&self, document: &Document, chunks: &[Chunk]) -> Result<()> {
        self.replace_document(&[], document, chunks).await.map(|_| ())
    }

    /// Remove the `replaced` documents and insert `document` in one step
    ///
    /// Either everything is applied or nothing is. Returns the number of
    /// chunks removed.
    async fn replace_document(
        &self,
        replaced: &[Uuid],
        document: &Document,
        chunks: &[Chunk],
    ) -> Result<usize>;

    /// Search for the `k` chunks most similar to the query
    async fn search(&self, query_embedding: &[f32], k: usize) -> Result<Vec<SearchResult>>;

    /// Delete a document and its chunks, returning the number of chunks removed
    async fn delete_by_document(&self, document_id: &Uuid) -> Result<usize>;

    /// Documents currently in the store
    async fn documents(&self) -> Result<Vec<Document>>;

    /// Get total number of vectors stored
    async fn len(&self) -> Result<usize>;

    /// Check if store is empty
    async fn is_empty(&self) -> Result<bool> {
        Ok(self.len().await? == 0)
    }

    /// Flush the store to durable storage
    async fn persist(&self) -> Result<()>;

    /// Check if the provider is healthy
    async fn health_check(&self) -> Result<bool>;

    /// Get provider name for logging
    fn name(&self) -> &str;
}
