//! Provider abstractions for embeddings, LLM and vector storage
//!
//! The RAG pipeline only talks to these traits, so the Ollama and local
//! store implementations can be swapped (or faked in tests).

pub mod embedding;
pub mod llm;
pub mod local;
pub mod ollama;
pub mod vector_store;

#[cfg(test)]
pub(crate) mod testing;

pub use embedding::EmbeddingProvider;
pub use llm::LlmProvider;
pub use local::LocalVectorStore;
pub use ollama::{OllamaEmbedder, OllamaLlm};
pub use vector_store::VectorStoreProvider;
