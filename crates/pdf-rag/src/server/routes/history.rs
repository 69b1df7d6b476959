//! Conversation history endpoints

use axum::{extract::State, http::StatusCode, Json};

use crate::error::Result;
use crate::server::state::AppState;
use crate::types::HistoryResponse;

/// GET /api/history
pub async fn get_history(State(state): State<AppState>) -> Json<HistoryResponse> {
    Json(state.chat().history())
}

/// DELETE /api/history
pub async fn clear_history(State(state): State<AppState>) -> Result<StatusCode> {
    state.chat().clear_memory().await?;
    Ok(StatusCode::NO_CONTENT)
}
