//! API routes for the PDF chat server

pub mod chat;
pub mod documents;
pub mod history;

use axum::{
    extract::{DefaultBodyLimit, State},
    routing::{get, post},
    Json, Router,
};

use crate::server::state::AppState;

/// Build all API routes
pub fn api_routes(max_upload_size: usize) -> Router<AppState> {
    Router::new()
        .route(
            "/documents",
            post(documents::upload_document)
                .layer(DefaultBodyLimit::max(max_upload_size))
                .get(documents::list_documents),
        )
        .route("/chat", post(chat::chat))
        .route(
            "/history",
            get(history::get_history).delete(history::clear_history),
        )
        .route("/info", get(info))
}

/// API info endpoint
async fn info(State(state): State<AppState>) -> Json<serde_json::Value> {
    let config = state.config();
    let rag = state.rag();
    Json(serde_json::json!({
        "name": "pdf-rag",
        "version": env!("CARGO_PKG_VERSION"),
        "description": "Chat with PDF documents using a local Ollama model",
        "models": {
            "llm": rag.llm().model(),
            "embeddings": rag.embedder().model(),
            "vector_store": rag.store_name(),
        },
        "retrieval": {
            "top_k": config.retrieval.top_k,
            "chunk_size": config.chunking.chunk_size,
            "chunk_overlap": config.chunking.chunk_overlap,
        },
        "endpoints": {
            "POST /api/documents": "Upload a PDF (multipart field 'file')",
            "GET /api/documents": "List loaded documents",
            "POST /api/chat": "Ask a question about the loaded documents",
            "GET /api/history": "Conversation history",
            "DELETE /api/history": "Clear the conversation",
            "GET /health": "Liveness",
            "GET /ready": "Ollama reachability"
        }
    }))
}
