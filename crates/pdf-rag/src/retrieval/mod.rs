//! Vector storage and similarity search

pub mod search;

pub use search::{cosine_similarity, SearchResult, VectorStore};
