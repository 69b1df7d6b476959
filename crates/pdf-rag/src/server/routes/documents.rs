//! Document upload and listing endpoints

use axum::{
    extract::{multipart::MultipartError, Multipart, State},
    http::StatusCode,
    Json,
};

use crate::error::{Error, Result};
use crate::ingestion::PdfParser;
use crate::server::state::AppState;
use crate::types::{Document, IngestResponse};

/// Keep the 413 of an over-limit body, everything else is a bad request
fn multipart_error(context: &str, e: MultipartError) -> Error {
    if e.status() == StatusCode::PAYLOAD_TOO_LARGE {
        Error::PayloadTooLarge(e.body_text())
    } else {
        Error::invalid(format!("{}: {}", context, e))
    }
}

/// POST /api/documents - Upload a PDF and index it
///
/// The upload is kept at `{data_dir}/document.pdf`, overwriting the
/// previous one.
pub async fn upload_document(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<IngestResponse>> {
    let mut upload = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| multipart_error("Failed to read multipart field", e))?
    {
        if field.name() != Some("file") {
            continue;
        }

        let filename = field
            .file_name()
            .map(|s| s.to_string())
            .unwrap_or_else(|| "document.pdf".to_string());
        let data = field
            .bytes()
            .await
            .map_err(|e| multipart_error("Failed to read file", e))?;

        upload = Some((filename, data.to_vec()));
        break;
    }

    let (filename, data) =
        upload.ok_or_else(|| Error::invalid("multipart field 'file' is required"))?;

    tracing::info!("Received upload: {} ({} bytes)", filename, data.len());
    PdfParser::check_type(&filename, &data)?;

    let upload_path = state.config().storage.upload_path();
    if let Some(parent) = upload_path.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }
    tokio::fs::write(&upload_path, &data).await?;
    tracing::debug!("Saved upload to {}", upload_path.display());

    let outcome = state.rag().process_pdf(&filename, data).await?;

    Ok(Json(IngestResponse {
        message: format!(
            "Processed {} ({} pages, {} chunks)",
            outcome.document.filename, outcome.document.total_pages, outcome.chunks
        ),
        document: outcome.document,
        chunks: outcome.chunks,
        replaced: outcome.replaced,
    }))
}

/// GET /api/documents - Documents in the collection
pub async fn list_documents(State(state): State<AppState>) -> Result<Json<Vec<Document>>> {
    Ok(Json(state.rag().documents().await?))
}
