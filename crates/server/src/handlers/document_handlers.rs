//! # Document Route Handlers
//!
//! Upload (the ingestion pipeline), listing, and deletion of knowledge-base
//! documents.

use super::humanize_epoch;
use crate::{errors::AppError, state::AppState};
use axum::{
    extract::{Path, State},
    Json,
};
use axum_extra::extract::Multipart;
use ragbase::{delete_document, ingest_document, IngestOptions};
use serde::Serialize;
use serde_json::{json, Value};
use tracing::info;

// --- API Payloads for Documents ---

#[derive(Serialize)]
pub struct UploadResponse {
    pub status: String,
    pub original_filename: String,
    pub gcp_link: String,
    pub id: String,
}

/// A listing item. Legacy records may lack a blob link or a usable
/// timestamp; the listing still returns them with defaults.
#[derive(Serialize)]
pub struct FileInfo {
    pub id: String,
    pub original_filename: String,
    pub display_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gcp_link: Option<String>,
    pub uploaded_at: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub uploaded_at_human: Option<String>,
}

#[derive(Serialize)]
pub struct FileListResponse {
    pub files: Vec<FileInfo>,
}

/// Reads the `file` and `display_name` fields out of a multipart body.
pub(crate) async fn read_upload_fields(
    multipart: &mut Multipart,
) -> Result<(String, Vec<u8>, Option<String>, Option<String>), AppError> {
    let mut filename: Option<String> = None;
    let mut bytes: Option<Vec<u8>> = None;
    let mut display_name: Option<String> = None;
    let mut question: Option<String> = None;

    while let Some(field) = multipart.next_field().await.map_err(anyhow::Error::from)? {
        let name = field.name().unwrap_or("").to_string();
        match name.as_str() {
            "file" => {
                filename = Some(field.file_name().unwrap_or("uploaded_file").to_string());
                bytes = Some(field.bytes().await.map_err(anyhow::Error::from)?.to_vec());
            }
            "display_name" => {
                display_name = Some(field.text().await.map_err(anyhow::Error::from)?);
            }
            "question" => {
                question = Some(field.text().await.map_err(anyhow::Error::from)?);
            }
            _ => {}
        }
    }

    let filename = filename
        .ok_or_else(|| AppError::Internal(anyhow::anyhow!("File data not found in request.")))?;
    let bytes = bytes
        .ok_or_else(|| AppError::Internal(anyhow::anyhow!("File data not found in request.")))?;
    Ok((filename, bytes, display_name, question))
}

// --- Document Handlers ---

/// Handler for uploading one document through the full ingestion pipeline.
pub async fn upload_handler(
    State(app_state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<UploadResponse>, AppError> {
    let (filename, bytes, display_name, _) = read_upload_fields(&mut multipart).await?;
    info!(filename = %filename, size = bytes.len(), "Received upload");

    let store_name = app_state.active_store_name().await?.to_string();
    let outcome = ingest_document(
        app_state.blob_store.as_ref(),
        app_state.search_store.as_ref(),
        &app_state.catalog,
        &store_name,
        bytes,
        IngestOptions {
            original_filename: filename,
            display_name,
            metadata: None,
        },
        app_state.config.ingest.registration_failure_policy,
        &app_state.poll_config(),
    )
    .await?;

    Ok(Json(UploadResponse {
        status: "success".to_string(),
        original_filename: outcome.original_filename,
        gcp_link: outcome.blob_url,
        id: outcome.id,
    }))
}

/// Handler for listing all active documents.
pub async fn list_files_handler(
    State(app_state): State<AppState>,
) -> Result<Json<FileListResponse>, AppError> {
    let records = app_state.catalog.list_active().await?;
    let files = records
        .into_iter()
        .map(|record| {
            let original_filename = if record.original_filename.is_empty() {
                "unknown".to_string()
            } else {
                record.original_filename
            };
            let display_name = if record.display_name.is_empty() {
                original_filename.clone()
            } else {
                record.display_name
            };
            FileInfo {
                id: record.id,
                uploaded_at_human: humanize_epoch(record.uploaded_at),
                original_filename,
                display_name,
                gcp_link: record.blob_url,
                uploaded_at: record.uploaded_at,
            }
        })
        .collect();

    Ok(Json(FileListResponse { files }))
}

/// Handler for deleting a document by id (or original filename).
pub async fn delete_document_handler(
    State(app_state): State<AppState>,
    Path(doc_id): Path<String>,
) -> Result<Json<Value>, AppError> {
    let deleted = delete_document(
        app_state.blob_store.as_ref(),
        app_state.search_store.as_ref(),
        &app_state.catalog,
        &doc_id,
    )
    .await?;

    if deleted {
        Ok(Json(json!({ "status": "deleted", "id": doc_id })))
    } else {
        Err(AppError::NotFound(format!(
            "Document with id '{doc_id}' not found"
        )))
    }
}
