use axum::Json;
use axum::extract::multipart::MultipartError;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use pdf_chat_rag::RagError;
use serde_json::json;
use tracing::{error, warn};

pub const NO_PDF_UPLOADED: &str = "No PDF file uploaded";
pub const PDF_FAILED: &str = "Failed to process PDF";
pub const CHAT_FIELDS_REQUIRED: &str = "Query and collection name are required";
pub const CHAT_FAILED: &str = "Failed to answer query";

/// An error returned from an API handler.
///
/// Full detail is logged; the client only sees a short JSON body.
#[derive(Debug)]
pub enum ApiError {
    /// The multipart body has no `pdf` field.
    NoPdf,
    /// The multipart body could not be read.
    Multipart(MultipartError),
    /// Ingestion of an uploaded PDF failed.
    Upload(RagError),
    /// The chat request body is missing fields or is not JSON.
    ChatFields,
    /// Answering a chat query failed.
    Chat(RagError),
}

impl From<MultipartError> for ApiError {
    fn from(e: MultipartError) -> Self {
        ApiError::Multipart(e)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, body) = match self {
            ApiError::NoPdf => (StatusCode::BAD_REQUEST, json!({ "error": NO_PDF_UPLOADED })),
            ApiError::Multipart(e) => {
                let status = e.status();
                warn!(%status, error = %e.body_text(), "rejected multipart upload");
                (status, json!({ "error": e.body_text() }))
            }
            ApiError::Upload(e @ RagError::InvalidInput(_)) => {
                warn!(error = %e, "rejected upload");
                (StatusCode::BAD_REQUEST, json!({ "error": e.public_message() }))
            }
            ApiError::Upload(e) => {
                error!(error = %e, "pdf upload failed");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    json!({ "error": PDF_FAILED, "details": e.public_message() }),
                )
            }
            ApiError::ChatFields => {
                (StatusCode::BAD_REQUEST, json!({ "error": CHAT_FIELDS_REQUIRED }))
            }
            ApiError::Chat(RagError::InvalidRequest(_)) => {
                (StatusCode::BAD_REQUEST, json!({ "error": CHAT_FIELDS_REQUIRED }))
            }
            ApiError::Chat(RagError::CollectionNotFound(name)) => {
                warn!(collection = %name, "chat against unknown collection");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    json!({
                        "error": format!(
                            "No document named '{name}' is available. Please upload the PDF again."
                        )
                    }),
                )
            }
            ApiError::Chat(e) => {
                error!(error = %e, "chat failed");
                (StatusCode::INTERNAL_SERVER_ERROR, json!({ "error": CHAT_FAILED }))
            }
        };
        (status, Json(body)).into_response()
    }
}
