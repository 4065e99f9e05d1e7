//! # Ingestion Pipeline Tests
//!
//! Exercises the upload pipeline against mocked blob-store and search-service
//! endpoints: the happy path, both registration-failure policies, the
//! non-fatal import timeout, and the best-effort delete cascade.

mod common;

use common::{
    gcs_store, gemini_store, memory_stores, seed_document, setup_tracing, TEST_BUCKET, TEST_STORE,
};
use ragbase::{
    delete_document, ingest_document, IngestOptions, KnowledgeError, PollConfig,
    RegistrationFailurePolicy,
};
use serde_json::json;
use std::time::Duration;
use wiremock::matchers::{method, path, path_regex};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn fast_poll() -> PollConfig {
    PollConfig {
        max_wait: Duration::from_millis(50),
        interval: Duration::from_millis(10),
    }
}

fn options(filename: &str) -> IngestOptions {
    IngestOptions {
        original_filename: filename.to_string(),
        display_name: None,
        metadata: None,
    }
}

async fn mount_blob_store_ok(server: &MockServer) {
    Mock::given(method("GET"))
        .and(path(format!("/storage/v1/b/{TEST_BUCKET}")))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"name": TEST_BUCKET})))
        .mount(server)
        .await;
    Mock::given(method("POST"))
        .and(path(format!("/upload/storage/v1/b/{TEST_BUCKET}/o")))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
        .mount(server)
        .await;
}

async fn mount_registration_ok(server: &MockServer, file_ref: &str) {
    Mock::given(method("POST"))
        .and(path("/upload/v1beta/files"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "file": {
                "name": file_ref,
                "uri": format!("https://files.test/{file_ref}"),
                "mimeType": "application/pdf"
            }
        })))
        .mount(server)
        .await;
}

async fn mount_import(server: &MockServer, operation: &str, done_immediately: bool) {
    Mock::given(method("POST"))
        .and(path(format!("/upload/v1beta/{TEST_STORE}:uploadToFileSearchStore")))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "name": operation,
            "done": done_immediately
        })))
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_ingest_happy_path_creates_catalog_record() {
    setup_tracing();
    let server = MockServer::start().await;
    let (catalog, _history) = memory_stores().await;

    mount_blob_store_ok(&server).await;
    mount_registration_ok(&server, "files/reg-1").await;
    mount_import(&server, "operations/import-1", false).await;
    Mock::given(method("GET"))
        .and(path("/v1beta/operations/import-1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "name": "operations/import-1",
            "done": true
        })))
        .mount(&server)
        .await;

    let blob = gcs_store(&server);
    let search = gemini_store(&server);
    let outcome = ingest_document(
        &blob,
        &search,
        &catalog,
        TEST_STORE,
        b"%PDF-1.4 fake".to_vec(),
        options("report.pdf"),
        RegistrationFailurePolicy::Abort,
        &fast_poll(),
    )
    .await
    .expect("Ingest should succeed");

    assert_eq!(outcome.original_filename, "report.pdf");
    assert_eq!(outcome.search_file_ref.as_deref(), Some("files/reg-1"));
    assert!(outcome.index_import_complete);
    let expected_prefix = format!("{}/{TEST_BUCKET}/kb/", server.uri());
    assert!(
        outcome.blob_url.starts_with(&expected_prefix),
        "Blob URL '{}' should start with '{expected_prefix}'",
        outcome.blob_url
    );
    assert!(outcome.blob_url.ends_with("_report.pdf"));

    // The returned id must subsequently appear in the listing.
    let listed = catalog.list_active().await.unwrap();
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0].id, outcome.id);
    assert_eq!(listed[0].original_filename, "report.pdf");
}

#[tokio::test]
async fn test_blob_upload_failure_is_fatal() {
    setup_tracing();
    let server = MockServer::start().await;
    let (catalog, _history) = memory_stores().await;

    Mock::given(method("GET"))
        .and(path(format!("/storage/v1/b/{TEST_BUCKET}")))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path(format!("/upload/storage/v1/b/{TEST_BUCKET}/o")))
        .respond_with(ResponseTemplate::new(500).set_body_string("disk on fire"))
        .mount(&server)
        .await;

    let blob = gcs_store(&server);
    let search = gemini_store(&server);
    let result = ingest_document(
        &blob,
        &search,
        &catalog,
        TEST_STORE,
        b"bytes".to_vec(),
        options("a.pdf"),
        RegistrationFailurePolicy::Abort,
        &fast_poll(),
    )
    .await;

    assert!(matches!(result, Err(KnowledgeError::BlobApi(_))));
    assert_eq!(catalog.count_active().await.unwrap(), 0);
}

#[tokio::test]
async fn test_registration_failure_abort_policy_writes_nothing() {
    setup_tracing();
    let server = MockServer::start().await;
    let (catalog, _history) = memory_stores().await;

    mount_blob_store_ok(&server).await;
    Mock::given(method("POST"))
        .and(path("/upload/v1beta/files"))
        .respond_with(ResponseTemplate::new(503).set_body_string("unavailable"))
        .mount(&server)
        .await;

    let blob = gcs_store(&server);
    let search = gemini_store(&server);
    let result = ingest_document(
        &blob,
        &search,
        &catalog,
        TEST_STORE,
        b"bytes".to_vec(),
        options("a.pdf"),
        RegistrationFailurePolicy::Abort,
        &fast_poll(),
    )
    .await;

    assert!(matches!(result, Err(KnowledgeError::SearchApi(_))));
    assert_eq!(catalog.count_active().await.unwrap(), 0);
}

#[tokio::test]
async fn test_registration_failure_degraded_policy_persists_record() {
    setup_tracing();
    let server = MockServer::start().await;
    let (catalog, _history) = memory_stores().await;

    mount_blob_store_ok(&server).await;
    Mock::given(method("POST"))
        .and(path("/upload/v1beta/files"))
        .respond_with(ResponseTemplate::new(503).set_body_string("unavailable"))
        .mount(&server)
        .await;

    let blob = gcs_store(&server);
    let search = gemini_store(&server);
    let outcome = ingest_document(
        &blob,
        &search,
        &catalog,
        TEST_STORE,
        b"bytes".to_vec(),
        options("a.pdf"),
        RegistrationFailurePolicy::PersistDegraded,
        &fast_poll(),
    )
    .await
    .expect("Degraded ingest should still succeed");

    assert!(outcome.search_file_ref.is_none());
    assert!(!outcome.index_import_complete);
    let listed = catalog.list_active().await.unwrap();
    assert_eq!(listed.len(), 1);
    assert!(listed[0].search_file_ref.is_none());
    assert!(listed[0].blob_url.is_some());
}

#[tokio::test]
async fn test_import_timeout_is_non_fatal() {
    setup_tracing();
    let server = MockServer::start().await;
    let (catalog, _history) = memory_stores().await;

    mount_blob_store_ok(&server).await;
    mount_registration_ok(&server, "files/reg-2").await;
    mount_import(&server, "operations/slow", false).await;
    // The operation never completes within the bounded wait.
    Mock::given(method("GET"))
        .and(path("/v1beta/operations/slow"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "name": "operations/slow",
            "done": false
        })))
        .mount(&server)
        .await;

    let blob = gcs_store(&server);
    let search = gemini_store(&server);
    let outcome = ingest_document(
        &blob,
        &search,
        &catalog,
        TEST_STORE,
        b"bytes".to_vec(),
        options("slow.pdf"),
        RegistrationFailurePolicy::Abort,
        &fast_poll(),
    )
    .await
    .expect("Timeout must not fail the ingest");

    assert!(!outcome.index_import_complete);
    assert_eq!(outcome.search_file_ref.as_deref(), Some("files/reg-2"));
    assert_eq!(catalog.count_active().await.unwrap(), 1);
}

#[tokio::test]
async fn test_delete_cascade_is_best_effort() {
    setup_tracing();
    let server = MockServer::start().await;
    let (catalog, _history) = memory_stores().await;

    let blob_url = format!("{}/{TEST_BUCKET}/kb/123_doc.pdf", server.uri());
    let id = seed_document(
        &catalog,
        "doc.pdf",
        Some(&blob_url),
        Some("files/gone"),
        1_000.0,
    )
    .await;

    // Hosted file delete fails; blob delete succeeds. Neither decides the
    // overall result.
    Mock::given(method("DELETE"))
        .and(path("/v1beta/files/gone"))
        .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
        .mount(&server)
        .await;
    Mock::given(method("DELETE"))
        .and(path_regex(format!(
            "^/storage/v1/b/{TEST_BUCKET}/o/.+$"
        )))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
        .mount(&server)
        .await;

    let blob = gcs_store(&server);
    let search = gemini_store(&server);

    let deleted = delete_document(&blob, &search, &catalog, &id)
        .await
        .expect("Delete should not propagate upstream failures");
    assert!(deleted);
    assert_eq!(catalog.count_active().await.unwrap(), 0);

    // Deleting the same id again reports not-found.
    let deleted_again = delete_document(&blob, &search, &catalog, &id).await.unwrap();
    assert!(!deleted_again);
}

#[tokio::test]
async fn test_delete_resolves_by_original_filename() {
    setup_tracing();
    let server = MockServer::start().await;
    let (catalog, _history) = memory_stores().await;

    // No blob URL and no search ref: only the catalog row is touched.
    seed_document(&catalog, "legacy.pdf", None, None, 1_000.0).await;

    let blob = gcs_store(&server);
    let search = gemini_store(&server);
    let deleted = delete_document(&blob, &search, &catalog, "legacy.pdf")
        .await
        .unwrap();
    assert!(deleted);
    assert!(server.received_requests().await.unwrap().is_empty());
}
