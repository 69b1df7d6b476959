//! pdf-rag: chat with PDF documents over a local Ollama model
//!
//! PDFs are split into overlapping chunks, embedded with Ollama and kept in a
//! persistent cosine-similarity collection. Questions retrieve the closest
//! chunks, which are stuffed into a prompt together with the remembered
//! conversation and answered by the configured Ollama model.

pub mod chat;
pub mod config;
pub mod error;
pub mod generation;
pub mod ingestion;
pub mod memory;
pub mod providers;
pub mod rag;
pub mod retrieval;
pub mod server;
pub mod types;

pub use chat::ChatService;
pub use config::RagConfig;
pub use error::{Error, Result};
pub use rag::RagSystem;
pub use types::{
    document::{Chunk, ChunkSource, Document},
    query::ChatRequest,
    response::{ChatResponse, Citation},
};
