use thiserror::Error;

/// Custom error types for the knowledge-base library.
///
/// Variants fall into three families that the server maps to distinct status
/// codes: validation failures (no external call was made), upstream failures
/// (a required call to the blob store or the search service failed hard), and
/// storage failures (the local catalog/history database).
#[derive(Error, Debug)]
pub enum KnowledgeError {
    #[error("Question cannot be empty")]
    EmptyQuestion,
    #[error("Invalid file_id format: '{0}'")]
    InvalidDocumentId(String),
    #[error("Failed to build Reqwest client: {0}")]
    ReqwestClientBuild(reqwest::Error),
    #[error("Failed to send request to the blob store: {0}")]
    BlobRequest(reqwest::Error),
    #[error("Blob store returned an error: {0}")]
    BlobApi(String),
    #[error("Failed to send request to the search service: {0}")]
    SearchRequest(reqwest::Error),
    #[error("Failed to deserialize search service response: {0}")]
    SearchDeserialization(reqwest::Error),
    #[error("Search service returned an error: {0}")]
    SearchApi(String),
    #[error("Storage operation failed: {0}")]
    Storage(String),
}

impl From<turso::Error> for KnowledgeError {
    fn from(err: turso::Error) -> Self {
        KnowledgeError::Storage(err.to_string())
    }
}
