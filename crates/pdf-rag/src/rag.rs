//! Retrieval-augmented generation over ingested PDFs

use std::path::Path;
use std::sync::Arc;

use crate::config::{GenerationParams, RagConfig};
use crate::error::{Error, Result};
use crate::ingestion::{IngestOutcome, IngestPipeline};
use crate::providers::ollama::ollama_providers;
use crate::providers::{EmbeddingProvider, LlmProvider, LocalVectorStore, VectorStoreProvider};
use crate::retrieval::SearchResult;
use crate::types::Document;

/// The document index plus the models that read and answer from it
pub struct RagSystem {
    config: RagConfig,
    embedder: Arc<dyn EmbeddingProvider>,
    llm: Arc<dyn LlmProvider>,
    store: Arc<dyn VectorStoreProvider>,
    pipeline: IngestPipeline,
}

impl RagSystem {
    pub fn new(
        config: RagConfig,
        embedder: Arc<dyn EmbeddingProvider>,
        llm: Arc<dyn LlmProvider>,
        store: Arc<dyn VectorStoreProvider>,
    ) -> Self {
        let pipeline = IngestPipeline::new(&config, embedder.clone(), store.clone());
        Self {
            config,
            embedder,
            llm,
            store,
            pipeline,
        }
    }

    /// Wire the Ollama providers and open the local collection
    pub fn from_config(config: RagConfig) -> Result<Self> {
        let (embedder, llm) = ollama_providers(&config.llm, &config.embeddings)?;
        let store = LocalVectorStore::from_config(&config.storage)?;

        tracing::info!(
            "RAG system ready: llm={}, embeddings={}, collection={}",
            llm.model(),
            embedder.model(),
            config.storage.collection
        );

        Ok(Self::new(
            config,
            Arc::new(embedder),
            Arc::new(llm),
            Arc::new(store),
        ))
    }

    pub fn config(&self) -> &RagConfig {
        &self.config
    }

    pub fn llm(&self) -> &Arc<dyn LlmProvider> {
        &self.llm
    }

    pub fn embedder(&self) -> &Arc<dyn EmbeddingProvider> {
        &self.embedder
    }

    /// Name of the vector store backend
    pub fn store_name(&self) -> &str {
        self.store.name()
    }

    /// Ingest an uploaded PDF
    pub async fn process_pdf(&self, filename: &str, data: Vec<u8>) -> Result<IngestOutcome> {
        let outcome = self.pipeline.ingest(filename, data).await?;
        tracing::info!(
            "Processed {}: {} chunks{}",
            filename,
            outcome.chunks,
            if outcome.replaced { " (replaced earlier copy)" } else { "" }
        );
        Ok(outcome)
    }

    /// Ingest a PDF from disk
    pub async fn process_path(&self, path: &Path) -> Result<IngestOutcome> {
        let outcome = self.pipeline.ingest_path(path).await?;
        tracing::info!("Processed {}: {} chunks", path.display(), outcome.chunks);
        Ok(outcome)
    }

    /// Retrieve the `k` chunks most relevant to a question
    pub async fn query(&self, question: &str, k: usize) -> Result<Vec<SearchResult>> {
        if self.store.is_empty().await? {
            return Err(Error::NoDocuments);
        }
        if question.trim().is_empty() {
            return Err(Error::invalid("question must not be empty"));
        }

        let embedding = self.embedder.embed(question).await?;
        let results = self.store.search(&embedding, k).await?;

        for result in &results {
            tracing::debug!(
                "Retrieved {} (similarity {:.3})",
                result.chunk.source.format_citation(),
                result.similarity
            );
        }
        Ok(results)
    }

    /// Complete a rendered prompt with the configured LLM
    pub async fn generate(&self, prompt: &str, params: &GenerationParams) -> Result<String> {
        self.llm.generate(prompt, params).await
    }

    /// Documents in the collection
    pub async fn documents(&self) -> Result<Vec<Document>> {
        self.store.documents().await
    }

    /// Whether any document has been loaded
    pub async fn has_documents(&self) -> Result<bool> {
        Ok(!self.store.is_empty().await?)
    }

    /// Whether the LLM backend answers
    pub async fn llm_ready(&self) -> bool {
        match self.llm.health_check().await {
            Ok(ready) => ready,
            Err(e) => {
                tracing::warn!("{} health check failed: {}", self.llm.name(), e);
                false
            }
        }
    }
}
