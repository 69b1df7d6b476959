//! Core types for the PDF chat system

pub mod chat;
pub mod document;
pub mod query;
pub mod response;

pub use chat::{ChatMessage, Role};
pub use document::{Chunk, ChunkSource, Document};
pub use query::ChatRequest;
pub use response::{ChatResponse, Citation, HistoryResponse, IngestResponse};
