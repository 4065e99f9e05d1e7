#![allow(dead_code)]
//! # Common Test Utilities
//!
//! Shared helpers for the library integration tests: a tracing guard, an
//! in-memory catalog/history pair, and adapters pointed at a wiremock server.

use ragbase::{
    catalog::{open_database, Catalog, NewDocument},
    history::HistoryStore,
    providers::{blob::GcsBlobStore, search::GeminiSearchStore},
};
use serde_json::json;
use std::sync::Once;
use wiremock::MockServer;

pub const TEST_BUCKET: &str = "kb-bucket";
pub const TEST_PROJECT: &str = "test-project";
pub const TEST_STORE: &str = "fileSearchStores/test-store";
pub const TEST_MODEL: &str = "gemini-test";

static INIT: Once = Once::new();

/// Initializes the tracing subscriber for tests.
pub fn setup_tracing() {
    INIT.call_once(|| {
        tracing_subscriber::fmt::init();
    });
}

/// Creates an isolated in-memory catalog and history store sharing one
/// database, with the schema applied.
pub async fn memory_stores() -> (Catalog, HistoryStore) {
    let db = open_database(":memory:")
        .await
        .expect("Failed to open in-memory database");
    let catalog = Catalog::new(db.clone());
    catalog
        .initialize_schema()
        .await
        .expect("Failed to initialize schema");
    (catalog, HistoryStore::new(db))
}

/// A blob store whose API and public URLs both point at the mock server.
pub fn gcs_store(server: &MockServer) -> GcsBlobStore {
    GcsBlobStore::new(
        server.uri(),
        server.uri(),
        TEST_BUCKET.to_string(),
        TEST_PROJECT.to_string(),
        None,
    )
    .expect("Failed to build GcsBlobStore")
}

/// A search store pointed at the mock server.
pub fn gemini_store(server: &MockServer) -> GeminiSearchStore {
    GeminiSearchStore::new(server.uri(), "test-key".to_string(), TEST_MODEL.to_string())
        .expect("Failed to build GeminiSearchStore")
}

/// Inserts a catalog record directly, bypassing the pipeline.
pub async fn seed_document(
    catalog: &Catalog,
    original_filename: &str,
    blob_url: Option<&str>,
    search_file_ref: Option<&str>,
    uploaded_at: f64,
) -> String {
    catalog
        .insert(NewDocument {
            original_filename: original_filename.to_string(),
            display_name: original_filename.to_string(),
            blob_url: blob_url.map(str::to_string),
            search_file_ref: search_file_ref.map(str::to_string),
            uploaded_at,
            metadata: json!({}),
        })
        .await
        .expect("Failed to seed document")
}
