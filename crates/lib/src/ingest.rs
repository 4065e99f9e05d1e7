//! # Ingestion Pipeline
//!
//! The upload orchestrator: one logical "add a document" transaction across
//! the blob store, the search service, and the catalog, plus the best-effort
//! delete cascade. The pipeline is an explicit sequence of steps, each fatal
//! or non-fatal:
//!
//! 1. blob upload — fatal, nothing is recorded on failure;
//! 2. file registration with the search service — fatal or degraded,
//!    depending on [`RegistrationFailurePolicy`];
//! 3. index import — non-fatal, polled with a bounded wait; an incomplete
//!    import only delays the document's visibility in global search;
//! 4. catalog insert — fatal.
//!
//! There is no rollback of earlier steps when a later one fails: orphaned
//! blobs and file references are harmless and cleanable out-of-band.

use crate::{
    catalog::{Catalog, NewDocument},
    constants::{BLOB_KEY_PREFIX, IMPORT_MAX_WAIT_SECS, IMPORT_POLL_INTERVAL_SECS},
    errors::KnowledgeError,
    providers::{blob::BlobStore, search::SearchStore},
};
use chrono::Utc;
use serde::Deserialize;
use serde_json::Value;
use std::time::Duration;
use tracing::{info, warn};

/// What to do when the search service rejects the file registration while a
/// blob URL already exists.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RegistrationFailurePolicy {
    /// Fail the whole ingest; no catalog record is written.
    #[default]
    Abort,
    /// Persist a degraded record without a `search_file_ref`; the document
    /// stays listable and its blob retrievable, but cannot be asked about.
    PersistDegraded,
}

/// Bounds for polling the asynchronous index import.
#[derive(Debug, Clone)]
pub struct PollConfig {
    pub max_wait: Duration,
    pub interval: Duration,
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            max_wait: Duration::from_secs(IMPORT_MAX_WAIT_SECS),
            interval: Duration::from_secs(IMPORT_POLL_INTERVAL_SECS),
        }
    }
}

/// Caller-supplied fields for one ingest.
#[derive(Debug, Clone)]
pub struct IngestOptions {
    pub original_filename: String,
    pub display_name: Option<String>,
    pub metadata: Option<Value>,
}

/// The result of a completed ingest.
#[derive(Debug, Clone)]
pub struct IngestOutcome {
    pub id: String,
    pub original_filename: String,
    pub blob_url: String,
    pub search_file_ref: Option<String>,
    /// `false` when the index import timed out or failed; the document is
    /// still usable for direct-reference asks.
    pub index_import_complete: bool,
}

/// Runs the full upload pipeline and returns the new catalog record's id
/// together with the blob URL.
#[allow(clippy::too_many_arguments)]
pub async fn ingest_document(
    blob: &dyn BlobStore,
    search: &dyn SearchStore,
    catalog: &Catalog,
    store_name: &str,
    bytes: Vec<u8>,
    options: IngestOptions,
    policy: RegistrationFailurePolicy,
    poll: &PollConfig,
) -> Result<IngestOutcome, KnowledgeError> {
    let display_name = options
        .display_name
        .clone()
        .unwrap_or_else(|| options.original_filename.clone());
    let mime_type = mime_guess::from_path(&options.original_filename)
        .first_or_octet_stream()
        .to_string();

    // Step 1: blob upload. The timestamp prefix keeps keys collision-free.
    let key = format!(
        "{BLOB_KEY_PREFIX}/{}_{}",
        Utc::now().timestamp(),
        options.original_filename
    );
    let blob_url = blob.upload(&key, bytes.clone(), &mime_type).await?;
    info!(url = %blob_url, "Uploaded blob");

    // Step 2: register the raw content with the search service.
    let search_file_ref = match search
        .register_file(bytes.clone(), &display_name, &mime_type)
        .await
    {
        Ok(file_ref) => {
            info!(file_ref = %file_ref, "Registered file with search service");
            Some(file_ref)
        }
        Err(e) => match policy {
            RegistrationFailurePolicy::Abort => return Err(e),
            RegistrationFailurePolicy::PersistDegraded => {
                warn!("File registration failed, persisting degraded record: {e}");
                None
            }
        },
    };

    // Step 3: import into the search index. Non-fatal throughout.
    let mut index_import_complete = false;
    if search_file_ref.is_some() {
        index_import_complete =
            import_with_bounded_wait(search, store_name, bytes, &display_name, poll).await;
    }

    // Step 4: catalog record.
    let uploaded_at = Utc::now().timestamp_micros() as f64 / 1_000_000.0;
    let id = catalog
        .insert(NewDocument {
            original_filename: options.original_filename.clone(),
            display_name,
            blob_url: Some(blob_url.clone()),
            search_file_ref: search_file_ref.clone(),
            uploaded_at,
            metadata: options.metadata.unwrap_or_else(|| Value::Object(Default::default())),
        })
        .await?;
    info!(document_id = %id, "Saved catalog record");

    Ok(IngestOutcome {
        id,
        original_filename: options.original_filename,
        blob_url,
        search_file_ref,
        index_import_complete,
    })
}

/// Starts the index import and polls until it completes or the bounded wait
/// elapses. Returns whether the import was observed to finish; every failure
/// path is logged and swallowed.
async fn import_with_bounded_wait(
    search: &dyn SearchStore,
    store_name: &str,
    bytes: Vec<u8>,
    display_name: &str,
    poll: &PollConfig,
) -> bool {
    let operation = match search.begin_import(store_name, bytes, display_name).await {
        Ok(operation) => operation,
        Err(e) => {
            warn!("Could not import into the search index: {e}");
            return false;
        }
    };
    if operation.done {
        return true;
    }

    let mut waited = Duration::ZERO;
    while waited < poll.max_wait {
        tokio::time::sleep(poll.interval).await;
        waited += poll.interval;
        match search.operation_done(&operation.name).await {
            Ok(true) => {
                info!(operation = %operation.name, "Index import complete");
                return true;
            }
            Ok(false) => {}
            Err(e) => {
                warn!("Polling index import failed: {e}");
                return false;
            }
        }
    }
    warn!(operation = %operation.name, "Timed out waiting for index import, continuing");
    false
}

/// Deletes a document by id or original filename.
///
/// The hosted file reference and the blob are removed best-effort; only the
/// catalog row removal decides the reported result. Returns `false` when no
/// matching record exists.
pub async fn delete_document(
    blob: &dyn BlobStore,
    search: &dyn SearchStore,
    catalog: &Catalog,
    id_or_filename: &str,
) -> Result<bool, KnowledgeError> {
    let Some(record) = catalog.find_by_id_or_filename(id_or_filename).await? else {
        return Ok(false);
    };

    if let Some(file_ref) = &record.search_file_ref {
        if let Err(e) = search.delete_file(file_ref).await {
            warn!(file_ref = %file_ref, "Could not delete hosted file: {e}");
        }
    }

    if let Some(blob_url) = &record.blob_url {
        match blob.object_key_for_url(blob_url) {
            Some(key) => {
                if let Err(e) = blob.delete(&key).await {
                    warn!(key = %key, "Could not delete blob: {e}");
                }
            }
            None => warn!(url = %blob_url, "Blob URL does not match the configured bucket"),
        }
    }

    let deleted = catalog.delete(&record.id).await?;
    if deleted {
        info!(document_id = %record.id, "Deleted catalog record");
    }
    Ok(deleted)
}
