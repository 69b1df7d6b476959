//! Ingestion pipeline orchestration

use std::path::Path;
use std::sync::Arc;

use uuid::Uuid;

use crate::config::RagConfig;
use crate::error::{Error, Result};
use crate::providers::{EmbeddingProvider, VectorStoreProvider};
use crate::types::{Chunk, ChunkSource, Document};

use super::parser::PdfParser;
use super::splitter::TextSplitter;

/// What an ingestion produced
#[derive(Debug, Clone)]
pub struct IngestOutcome {
    /// The stored document
    pub document: Document,
    /// Number of chunks stored
    pub chunks: usize,
    /// Whether chunks of an identical earlier upload were replaced
    pub replaced: bool,
}

/// Main ingestion pipeline: parse, split, embed, store
pub struct IngestPipeline {
    splitter: TextSplitter,
    embedder: Arc<dyn EmbeddingProvider>,
    store: Arc<dyn VectorStoreProvider>,
    batch_size: usize,
}

impl IngestPipeline {
    /// Create a new ingestion pipeline
    pub fn new(
        config: &RagConfig,
        embedder: Arc<dyn EmbeddingProvider>,
        store: Arc<dyn VectorStoreProvider>,
    ) -> Self {
        Self {
            splitter: TextSplitter::from_config(&config.chunking),
            embedder,
            store,
            batch_size: config.embeddings.batch_size.max(1),
        }
    }

    /// Parse and split a PDF into chunks without embeddings
    pub fn prepare(
        splitter: &TextSplitter,
        filename: &str,
        data: &[u8],
    ) -> Result<(Document, Vec<Chunk>)> {
        let parsed = PdfParser::parse(filename, data)?;

        let mut document = Document::new(
            filename.to_string(),
            parsed.content_hash.clone(),
            parsed.total_pages,
            data.len() as u64,
        );

        let chunks: Vec<Chunk> = splitter
            .split_pages(&parsed.pages)
            .into_iter()
            .enumerate()
            .map(|(i, split)| {
                Chunk::new(
                    document.id,
                    split.content,
                    ChunkSource::pdf(filename.to_string(), split.page_number, parsed.total_pages),
                    split.start_index,
                    i as u32,
                )
            })
            .collect();

        document.total_chunks = chunks.len() as u32;
        Ok((document, chunks))
    }

    /// Full ingestion of an uploaded PDF
    ///
    /// An earlier document with the same content hash is replaced once the
    /// new chunks are embedded. The swap is a single store operation, so a
    /// failed embedding or insert leaves the earlier copy untouched.
    pub async fn ingest(&self, filename: &str, data: Vec<u8>) -> Result<IngestOutcome> {
        let splitter = self.splitter.clone();
        let name = filename.to_string();
        let (document, chunks) =
            tokio::task::spawn_blocking(move || Self::prepare(&splitter, &name, &data))
                .await
                .map_err(|e| Error::internal(format!("Task join error: {}", e)))??;

        if chunks.is_empty() {
            return Err(Error::file_parse(filename, "PDF produced no text chunks"));
        }

        tracing::info!(
            "Split {} ({} pages) into {} chunks",
            filename,
            document.total_pages,
            chunks.len()
        );

        let embedded = self.embed_chunks(chunks).await?;

        let previous: Vec<Document> = self
            .store
            .documents()
            .await?
            .into_iter()
            .filter(|d| d.content_hash == document.content_hash)
            .collect();
        let previous_ids: Vec<Uuid> = previous.iter().map(|d| d.id).collect();

        let removed = self
            .store
            .replace_document(&previous_ids, &document, &embedded)
            .await?;
        for old in &previous {
            tracing::info!("Replaced earlier upload of {}", old.filename);
        }
        if removed > 0 {
            tracing::debug!("{} old chunks removed", removed);
        }
        let replaced = !previous.is_empty();

        self.store.persist().await?;

        Ok(IngestOutcome {
            chunks: embedded.len(),
            document,
            replaced,
        })
    }

    /// Read a PDF from disk and ingest it
    pub async fn ingest_path(&self, path: &Path) -> Result<IngestOutcome> {
        let data = tokio::fs::read(path).await?;
        let filename = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .ok_or_else(|| Error::invalid(format!("{} is not a file", path.display())))?;

        self.ingest(&filename, data).await
    }

    async fn embed_chunks(&self, chunks: Vec<Chunk>) -> Result<Vec<Chunk>> {
        let total = chunks.len();
        let mut embedded = Vec::with_capacity(total);

        for batch in chunks.chunks(self.batch_size) {
            let texts: Vec<String> = batch.iter().map(|c| c.content.clone()).collect();
            let vectors = self.embedder.embed_batch(&texts).await?;

            if vectors.len() != batch.len() {
                return Err(Error::embedding(format!(
                    "{} returned {} embeddings for {} texts",
                    self.embedder.name(),
                    vectors.len(),
                    batch.len()
                )));
            }

            embedded.extend(
                batch
                    .iter()
                    .cloned()
                    .zip(vectors)
                    .map(|(chunk, vector)| chunk.with_embedding(vector)),
            );
            tracing::debug!("Embedded {}/{} chunks", embedded.len(), total);
        }

        Ok(embedded)
    }
}
