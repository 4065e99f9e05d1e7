//! # Upload Endpoint Tests
//!
//! Integration tests for `POST /upload` and `GET /list`: the full pipeline
//! against mocked collaborators, and both registration-failure policies.

mod common;

use anyhow::Result;
use common::TestApp;
use httpmock::Method;
use serde_json::json;

#[tokio::test]
async fn test_upload_then_list_shows_document() -> Result<()> {
    let app = TestApp::spawn().await?;
    app.mock_store_listing();
    app.mock_blob_store_ok();
    app.mock_register_file("files/reg-1");
    app.mock_import_done();

    let form = TestApp::upload_form("report.pdf", b"%PDF-1.4 fake", &[]);
    let response = app
        .client
        .post(format!("{}/upload", app.address))
        .multipart(form)
        .send()
        .await?;

    assert!(
        response.status().is_success(),
        "Upload failed with status: {}",
        response.status()
    );
    let body: serde_json::Value = response.json().await?;
    assert_eq!(body["status"], "success");
    assert_eq!(body["original_filename"], "report.pdf");
    let id = body["id"].as_str().expect("id missing").to_string();
    let gcp_link = body["gcp_link"].as_str().expect("gcp_link missing");
    assert!(gcp_link.contains("/kb-bucket/kb/"));
    assert!(gcp_link.ends_with("_report.pdf"));

    // The returned id must appear in the listing with a matching filename.
    let response = app.client.get(format!("{}/list", app.address)).send().await?;
    assert!(response.status().is_success());
    let body: serde_json::Value = response.json().await?;
    let files = body["files"].as_array().expect("files missing");
    assert_eq!(files.len(), 1);
    assert_eq!(files[0]["id"], json!(id));
    assert_eq!(files[0]["original_filename"], "report.pdf");
    assert_eq!(files[0]["display_name"], "report.pdf");
    assert!(files[0]["uploaded_at_human"].is_string());

    Ok(())
}

#[tokio::test]
async fn test_upload_with_display_name() -> Result<()> {
    let app = TestApp::spawn().await?;
    app.mock_store_listing();
    app.mock_blob_store_ok();
    app.mock_register_file("files/reg-2");
    app.mock_import_done();

    let form = TestApp::upload_form("q3.pdf", b"bytes", &[("display_name", "Q3 Report")]);
    let response = app
        .client
        .post(format!("{}/upload", app.address))
        .multipart(form)
        .send()
        .await?;
    assert!(response.status().is_success());

    let response = app.client.get(format!("{}/list", app.address)).send().await?;
    let body: serde_json::Value = response.json().await?;
    assert_eq!(body["files"][0]["display_name"], "Q3 Report");
    assert_eq!(body["files"][0]["original_filename"], "q3.pdf");

    Ok(())
}

#[tokio::test]
async fn test_registration_failure_aborts_under_default_policy() -> Result<()> {
    let app = TestApp::spawn().await?;
    app.mock_store_listing();
    app.mock_blob_store_ok();
    app.mock_server.mock(|when, then| {
        when.method(Method::POST).path("/upload/v1beta/files");
        then.status(503).body("registration down");
    });

    let form = TestApp::upload_form("report.pdf", b"bytes", &[]);
    let response = app
        .client
        .post(format!("{}/upload", app.address))
        .multipart(form)
        .send()
        .await?;

    assert_eq!(response.status(), 502);

    // No catalog record was written.
    let response = app.client.get(format!("{}/list", app.address)).send().await?;
    let body: serde_json::Value = response.json().await?;
    assert!(body["files"].as_array().unwrap().is_empty());

    Ok(())
}

#[tokio::test]
async fn test_registration_failure_persists_degraded_record_when_configured() -> Result<()> {
    let app = TestApp::spawn_with_policy("persist_degraded").await?;
    app.mock_store_listing();
    app.mock_blob_store_ok();
    app.mock_server.mock(|when, then| {
        when.method(Method::POST).path("/upload/v1beta/files");
        then.status(503).body("registration down");
    });

    let form = TestApp::upload_form("report.pdf", b"bytes", &[]);
    let response = app
        .client
        .post(format!("{}/upload", app.address))
        .multipart(form)
        .send()
        .await?;

    assert!(
        response.status().is_success(),
        "Degraded ingest should succeed, got {}",
        response.status()
    );

    // The record is listable; it has a blob link but no hosted file.
    let response = app.client.get(format!("{}/list", app.address)).send().await?;
    let body: serde_json::Value = response.json().await?;
    let files = body["files"].as_array().unwrap();
    assert_eq!(files.len(), 1);
    assert!(files[0]["gcp_link"].is_string());

    Ok(())
}

#[tokio::test]
async fn test_health_and_root() -> Result<()> {
    let app = TestApp::spawn().await?;

    let response = app
        .client
        .get(format!("{}/health", app.address))
        .send()
        .await?;
    assert!(response.status().is_success());
    assert_eq!(response.text().await?, "OK");

    let response = app.client.get(format!("{}/", app.address)).send().await?;
    assert!(response.status().is_success());
    let body: serde_json::Value = response.json().await?;
    assert!(body["endpoints"].as_array().unwrap().len() >= 10);

    Ok(())
}
