//! Persistent vector collection with exhaustive cosine search

use std::io::Write;
use std::path::{Path, PathBuf};

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{Error, Result};
use crate::types::{Chunk, Document};

/// Search result with chunk and similarity
#[derive(Debug, Clone)]
pub struct SearchResult {
    /// The retrieved chunk
    pub chunk: Chunk,
    /// Cosine similarity to the query (-1.0 to 1.0, higher is better)
    pub similarity: f32,
}

/// On-disk layout of a collection
#[derive(Debug, Default, Serialize, Deserialize)]
struct Collection {
    name: String,
    /// Fixed by the first insert
    dimension: Option<usize>,
    metric: String,
    documents: Vec<Document>,
    entries: Vec<Chunk>,
}

/// Cosine similarity between two vectors
///
/// Returns 0.0 when either vector has zero magnitude, the lengths differ or
/// the result is not a finite number.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }

    let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();

    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }

    let similarity = dot / (norm_a * norm_b);
    if similarity.is_finite() {
        similarity
    } else {
        0.0
    }
}

/// Check that every chunk carries a finite embedding of one dimension
///
/// Returns the dimension the collection has after the chunks are added.
fn check_chunks(dimension: Option<usize>, chunks: &[Chunk]) -> Result<Option<usize>> {
    let mut dimension = dimension;
    for chunk in chunks {
        if chunk.embedding.is_empty() {
            return Err(Error::vector_db(format!("Chunk {} has no embedding", chunk.id)));
        }
        if chunk.embedding.iter().any(|x| !x.is_finite()) {
            return Err(Error::vector_db(format!(
                "Chunk {} has non-finite embedding values",
                chunk.id
            )));
        }
        match dimension {
            Some(d) if d != chunk.embedding.len() => {
                return Err(Error::vector_db(format!(
                    "Embedding dimension mismatch: collection has {}, chunk has {}",
                    d,
                    chunk.embedding.len()
                )));
            }
            Some(_) => {}
            None => dimension = Some(chunk.embedding.len()),
        }
    }
    Ok(dimension)
}

/// Vector store backed by a single JSON file per collection
pub struct VectorStore {
    path: PathBuf,
    collection: RwLock<Collection>,
}

impl VectorStore {
    /// Open `{dir}/{collection}.json`, or start an empty collection
    pub fn open(dir: &Path, collection: &str) -> Result<Self> {
        std::fs::create_dir_all(dir)?;
        let path = dir.join(format!("{}.json", collection));

        let loaded = if path.exists() {
            let raw = std::fs::read_to_string(&path)?;
            let loaded: Collection = serde_json::from_str(&raw).map_err(|e| {
                Error::vector_db(format!("Corrupt collection {}: {}", path.display(), e))
            })?;
            tracing::info!(
                "Loaded collection '{}' with {} chunks from {} documents",
                collection,
                loaded.entries.len(),
                loaded.documents.len()
            );
            loaded
        } else {
            tracing::debug!("Creating new collection '{}' at {}", collection, path.display());
            Collection {
                name: collection.to_string(),
                metric: "cosine".to_string(),
                ..Default::default()
            }
        };

        Ok(Self {
            path,
            collection: RwLock::new(loaded),
        })
    }

    /// Path of the collection file
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Embedding dimension, once known
    pub fn dimension(&self) -> Option<usize> {
        self.collection.read().dimension
    }

    /// Insert chunks; all or nothing
    pub fn insert(&self, chunks: &[Chunk]) -> Result<()> {
        let mut collection = self.collection.write();
        let dimension = check_chunks(collection.dimension, chunks)?;
        collection.dimension = dimension;
        collection.entries.extend(chunks.iter().cloned());
        Ok(())
    }

    /// Swap the documents in `replaced` for `document` and its chunks
    ///
    /// Validation happens before anything is removed, so on error the
    /// collection is unchanged. Returns the number of chunks removed.
    pub fn replace(
        &self,
        replaced: &[Uuid],
        document: Document,
        chunks: &[Chunk],
    ) -> Result<usize> {
        let mut collection = self.collection.write();

        let remaining = collection
            .entries
            .iter()
            .filter(|c| !replaced.contains(&c.document_id))
            .count();
        let base = if remaining == 0 { None } else { collection.dimension };
        let dimension = check_chunks(base, chunks)?;

        let before = collection.entries.len();
        collection.entries.retain(|c| !replaced.contains(&c.document_id));
        let removed = before - collection.entries.len();

        collection.dimension = dimension;
        collection.entries.extend(chunks.iter().cloned());
        collection
            .documents
            .retain(|d| d.id != document.id && !replaced.contains(&d.id));
        collection.documents.push(document);

        Ok(removed)
    }

    /// Top-k chunks by cosine similarity, ties kept in insertion order
    pub fn search(&self, query: &[f32], k: usize) -> Result<Vec<SearchResult>> {
        let collection = self.collection.read();

        if k == 0 || collection.entries.is_empty() {
            return Ok(Vec::new());
        }

        if let Some(d) = collection.dimension {
            if d != query.len() {
                return Err(Error::vector_db(format!(
                    "Query dimension {} does not match collection dimension {}",
                    query.len(),
                    d
                )));
            }
        }

        let mut scored: Vec<(usize, f32)> = collection
            .entries
            .iter()
            .enumerate()
            .map(|(i, chunk)| (i, cosine_similarity(query, &chunk.embedding)))
            .collect();

        // sort_by is stable, so equal scores keep insertion order
        scored.sort_by(|a, b| b.1.total_cmp(&a.1));
        scored.truncate(k);

        Ok(scored
            .into_iter()
            .map(|(i, similarity)| SearchResult {
                chunk: collection.entries[i].without_embedding(),
                similarity,
            })
            .collect())
    }

    /// Remove a document and all of its chunks; returns the number of chunks removed
    pub fn delete_by_document(&self, document_id: &Uuid) -> usize {
        let mut collection = self.collection.write();
        let before = collection.entries.len();
        collection.entries.retain(|c| c.document_id != *document_id);
        collection.documents.retain(|d| d.id != *document_id);
        if collection.entries.is_empty() {
            collection.dimension = None;
        }
        before - collection.entries.len()
    }

    /// Find a stored document by content hash
    pub fn find_by_hash(&self, content_hash: &str) -> Option<Document> {
        self.collection
            .read()
            .documents
            .iter()
            .find(|d| d.content_hash == content_hash)
            .cloned()
    }

    /// Record a document, replacing any record with the same id
    pub fn register_document(&self, document: Document) {
        let mut collection = self.collection.write();
        collection.documents.retain(|d| d.id != document.id);
        collection.documents.push(document);
    }

    /// Stored documents in ingestion order
    pub fn documents(&self) -> Vec<Document> {
        self.collection.read().documents.clone()
    }

    /// Number of stored chunks
    pub fn len(&self) -> usize {
        self.collection.read().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Write the collection to disk atomically
    pub fn persist(&self) -> Result<()> {
        let dir = self
            .path
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."));

        let json = {
            let collection = self.collection.read();
            serde_json::to_vec(&*collection)?
        };

        let mut tmp = tempfile::NamedTempFile::new_in(dir)?;
        tmp.write_all(&json)?;
        tmp.flush()?;
        tmp.persist(&self.path)
            .map_err(|e| Error::vector_db(format!("Failed to persist collection: {}", e)))?;

        tracing::debug!("Persisted {} bytes to {}", json.len(), self.path.display());
        Ok(())
    }
}
