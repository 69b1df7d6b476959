//! Local provider implementation backed by the on-disk collection

use async_trait::async_trait;
use std::sync::Arc;
use uuid::Uuid;

use crate::config::StorageConfig;
use crate::error::{Error, Result};
use crate::retrieval::{SearchResult, VectorStore};
use crate::types::{Chunk, Document};

use super::vector_store::VectorStoreProvider;

/// Local vector store wrapping a [`VectorStore`] collection
pub struct LocalVectorStore {
    store: Arc<VectorStore>,
}

impl LocalVectorStore {
    /// Create from existing VectorStore
    pub fn new(store: Arc<VectorStore>) -> Self {
        Self { store }
    }

    /// Open the configured collection
    pub fn from_config(config: &StorageConfig) -> Result<Self> {
        let store = VectorStore::open(&config.vector_dir, &config.collection)?;
        Ok(Self::new(Arc::new(store)))
    }

    /// Run a store operation on the blocking pool
    async fn blocking<T, F>(&self, op: F) -> Result<T>
    where
        T: Send + 'static,
        F: FnOnce(&VectorStore) -> Result<T> + Send + 'static,
    {
        let store = self.store.clone();
        tokio::task::spawn_blocking(move || op(store.as_ref()))
            .await
            .map_err(|e| Error::internal(format!("Task join error: {}", e)))?
    }
}

#[async_trait]
impl VectorStoreProvider for LocalVectorStore {
    async fn replace_document(
        &self,
        replaced: &[Uuid],
        document: &Document,
        chunks: &[Chunk],
    ) -> Result<usize> {
        let replaced = replaced.to_vec();
        let document = document.clone();
        let chunks = chunks.to_vec();
        self.blocking(move |store| store.replace(&replaced, document, &chunks))
            .await
    }

    async fn search(&self, query_embedding: &[f32], k: usize) -> Result<Vec<SearchResult>> {
        let query = query_embedding.to_vec();
        self.blocking(move |store| store.search(&query, k)).await
    }

    async fn delete_by_document(&self, document_id: &Uuid) -> Result<usize> {
        let id = *document_id;
        self.blocking(move |store| Ok(store.delete_by_document(&id)))
            .await
    }

    async fn documents(&self) -> Result<Vec<Document>> {
        Ok(self.store.documents())
    }

    async fn len(&self) -> Result<usize> {
        Ok(self.store.len())
    }

    async fn persist(&self) -> Result<()> {
        self.blocking(|store| store.persist()).await
    }

    async fn health_check(&self) -> Result<bool> {
        let dir = self.store.path().parent().map(|p| p.to_path_buf());
        Ok(dir.map_or(true, |d| d.as_os_str().is_empty() || d.exists()))
    }

    fn name(&self) -> &str {
        "local-json"
    }
}
