use axum::Json;
use axum::extract::rejection::JsonRejection;
use axum::extract::{Multipart, State};
use pdf_chat_rag::{Chunk, Upload};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::ApiError;
use crate::state::AppState;

/// Multipart field carrying the uploaded file.
pub const PDF_FIELD: &str = "pdf";

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadResponse {
    pub message: &'static str,
    pub collection_name: String,
    pub content: Vec<Chunk>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatRequest {
    #[serde(default)]
    pub query: Option<String>,
    #[serde(default)]
    pub collection_name: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ChatResponse {
    pub message: &'static str,
    pub response: String,
}

/// POST /api/pdf - Parse, chunk, embed and index an uploaded PDF
pub async fn upload_pdf(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<UploadResponse>, ApiError> {
    let mut upload = None;
    while let Some(field) = multipart.next_field().await? {
        if field.name() != Some(PDF_FIELD) {
            debug!(field = ?field.name(), "skipping multipart field");
            continue;
        }
        let file_name = field.file_name().unwrap_or_default().to_string();
        let bytes = field.bytes().await?;
        upload = Some(Upload::new(file_name, bytes.to_vec()));
        break;
    }
    let upload = upload.ok_or(ApiError::NoPdf)?;

    info!(file_name = %upload.file_name, bytes = upload.bytes.len(), "received pdf upload");
    let ingestion = state.ingestion.ingest(upload).await.map_err(ApiError::Upload)?;

    Ok(Json(UploadResponse {
        message: "PDF processed successfully",
        collection_name: ingestion.collection_name,
        content: ingestion.chunks,
    }))
}

/// POST /api/chat - Answer a question against a previously uploaded PDF
pub async fn chat(
    State(state): State<AppState>,
    payload: Result<Json<ChatRequest>, JsonRejection>,
) -> Result<Json<ChatResponse>, ApiError> {
    let Json(req) = payload.map_err(|e| {
        debug!(error = %e, "rejected chat body");
        ApiError::ChatFields
    })?;
    let (Some(query), Some(collection_name)) = (req.query, req.collection_name) else {
        return Err(ApiError::ChatFields);
    };

    let answer = state.query.answer(&query, &collection_name).await.map_err(ApiError::Chat)?;

    Ok(Json(ChatResponse { message: "Chat completed successfully", response: answer.text }))
}

/// GET /health
pub async fn health() -> &'static str {
    "ok"
}
