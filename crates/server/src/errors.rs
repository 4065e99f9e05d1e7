use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use ragbase::KnowledgeError;
use serde_json::json;
use tracing::error;

/// A custom error type for the server application.
///
/// This enum encapsulates different kinds of errors that can occur within the
/// server, allowing them to be converted into appropriate HTTP responses:
/// validation failures become 400s, missing resources 404s, required-path
/// upstream failures 502s, and everything else a 500.
pub enum AppError {
    /// Errors originating from the `ragbase` library.
    Knowledge(KnowledgeError),
    /// A requested resource does not exist.
    NotFound(String),
    /// Generic internal server errors.
    Internal(anyhow::Error),
}

impl From<KnowledgeError> for AppError {
    fn from(err: KnowledgeError) -> Self {
        AppError::Knowledge(err)
    }
}

impl From<anyhow::Error> for AppError {
    fn from(err: anyhow::Error) -> Self {
        AppError::Internal(err)
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status_code, error_message) = match self {
            AppError::Knowledge(err) => {
                error!("KnowledgeError: {:?}", err);
                match err {
                    KnowledgeError::EmptyQuestion | KnowledgeError::InvalidDocumentId(_) => {
                        (StatusCode::BAD_REQUEST, err.to_string())
                    }
                    KnowledgeError::BlobRequest(e) => (
                        StatusCode::BAD_GATEWAY,
                        format!("Request to the blob store failed: {e}"),
                    ),
                    KnowledgeError::BlobApi(e) => {
                        (StatusCode::BAD_GATEWAY, format!("Blob store error: {e}"))
                    }
                    KnowledgeError::SearchRequest(e) => (
                        StatusCode::BAD_GATEWAY,
                        format!("Request to the search service failed: {e}"),
                    ),
                    KnowledgeError::SearchDeserialization(e) => (
                        StatusCode::BAD_GATEWAY,
                        format!("Failed to deserialize search service response: {e}"),
                    ),
                    KnowledgeError::SearchApi(e) => (
                        StatusCode::BAD_GATEWAY,
                        format!("Search service error: {e}"),
                    ),
                    KnowledgeError::Storage(e) => (
                        StatusCode::INTERNAL_SERVER_ERROR,
                        format!("Storage operation failed: {e}"),
                    ),
                    KnowledgeError::ReqwestClientBuild(e) => (
                        StatusCode::INTERNAL_SERVER_ERROR,
                        format!("Failed to build HTTP client: {e}"),
                    ),
                }
            }
            AppError::NotFound(message) => (StatusCode::NOT_FOUND, message),
            AppError::Internal(err) => {
                error!("Internal server error: {:?}", err);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "An internal server error occurred.".to_string(),
                )
            }
        };

        let body = Json(json!({
            "error": error_message,
        }));

        (status_code, body).into_response()
    }
}
