//! # Common Test Utilities
//!
//! A full application harness for the server integration tests: spawns the
//! real Axum server on a random port with a temporary database, pointing both
//! external adapters at a single `httpmock::MockServer`.

// Allow unused code because this is a test utility module, and not all
// helpers are used by every test file that includes it.
#![allow(unused)]

use anyhow::Result;
use httpmock::{Method, Mock, MockServer};
use ragbase::catalog::NewDocument;
use ragbase_server::{config, router, state::AppState};
use reqwest::Client;
use serde_json::json;
use std::{fs::File, io::Write, net::SocketAddr, path::PathBuf};
use tempfile::{tempdir, NamedTempFile, TempDir};
use tokio::{net::TcpListener, task::JoinHandle};

pub const TEST_BUCKET: &str = "kb-bucket";
pub const TEST_STORE: &str = "fileSearchStores/test-store";
pub const TEST_MODEL: &str = "gemini-test";
pub const TEST_STORE_DISPLAY_NAME: &str = "Test KB";

/// A harness for end-to-end testing of the Axum server.
pub struct TestApp {
    pub address: String,
    pub client: Client,
    pub mock_server: MockServer,
    pub app_state: AppState,
    _db_file: NamedTempFile,
    _config_dir: TempDir,
    _server_handle: JoinHandle<()>,
    shutdown_tx: Option<tokio::sync::oneshot::Sender<()>>,
}

impl TestApp {
    /// Spawns the application with the default (abort) registration policy.
    pub async fn spawn() -> Result<Self> {
        Self::spawn_with_policy("abort").await
    }

    /// Spawns the application with the given registration-failure policy.
    pub async fn spawn_with_policy(policy: &str) -> Result<Self> {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .compact()
            .try_init();

        let mock_server = MockServer::start();
        let db_file = NamedTempFile::new()?;
        let db_path = db_file.path().to_path_buf();

        let config_dir = tempdir()?;
        let config_path = config_dir.path().join("config.yml");
        let config_content = format!(
            r#"
port: 0
db_url: "{db}"
storage:
  api_base: "{base}"
  public_base: "{base}"
  bucket: "{bucket}"
  project: "test-project"
search:
  api_base: "{base}"
  api_key: "test-key"
  model_name: "{model}"
  store_display_name: "{display_name}"
ingest:
  registration_failure_policy: "{policy}"
  import_max_wait_secs: 1
  import_poll_interval_secs: 1
"#,
            db = db_path.to_str().unwrap(),
            base = mock_server.base_url(),
            bucket = TEST_BUCKET,
            model = TEST_MODEL,
            display_name = TEST_STORE_DISPLAY_NAME,
        );
        let mut file = File::create(&config_path)?;
        file.write_all(config_content.as_bytes())?;

        let config = config::get_config(Some(config_path.to_str().unwrap()))?;
        let app_state = ragbase_server::state::build_app_state(config).await?;
        let app_state_for_harness = app_state.clone();

        let listener = TcpListener::bind("127.0.0.1:0").await?;
        let addr: SocketAddr = listener.local_addr()?;
        let address = format!("http://{addr}");

        let (shutdown_tx, shutdown_rx) = tokio::sync::oneshot::channel();
        let server_handle = tokio::spawn(async move {
            let app = router::create_router(app_state);
            let server = axum::serve(listener, app).with_graceful_shutdown(async {
                shutdown_rx.await.ok();
            });
            if let Err(e) = server.await {
                tracing::error!("[TestApp] Server error: {}", e);
            }
        });

        tokio::time::sleep(tokio::time::Duration::from_millis(50)).await;

        Ok(Self {
            address,
            client: Client::new(),
            mock_server,
            app_state: app_state_for_harness,
            _db_file: db_file,
            _config_dir: config_dir,
            _server_handle: server_handle,
            shutdown_tx: Some(shutdown_tx),
        })
    }

    /// Seeds a catalog record directly, bypassing the pipeline.
    pub async fn add_document(
        &self,
        original_filename: &str,
        blob_url: Option<&str>,
        search_file_ref: Option<&str>,
        uploaded_at: f64,
    ) -> String {
        self.app_state
            .catalog
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

    // --- Mock helpers for the hosted collaborators ---

    /// The search-store listing already contains the configured store.
    pub fn mock_store_listing(&self) -> Mock<'_> {
        self.mock_server.mock(|when, then| {
            when.method(Method::GET).path("/v1beta/fileSearchStores");
            then.status(200).json_body(json!({
                "fileSearchStores": [
                    {"name": TEST_STORE, "displayName": TEST_STORE_DISPLAY_NAME}
                ]
            }));
        })
    }

    /// Bucket exists and blob uploads succeed.
    pub fn mock_blob_store_ok(&self) -> (Mock<'_>, Mock<'_>) {
        let bucket = self.mock_server.mock(|when, then| {
            when.method(Method::GET)
                .path(format!("/storage/v1/b/{TEST_BUCKET}"));
            then.status(200).json_body(json!({"name": TEST_BUCKET}));
        });
        let upload = self.mock_server.mock(|when, then| {
            when.method(Method::POST)
                .path(format!("/upload/storage/v1/b/{TEST_BUCKET}/o"));
            then.status(200).json_body(json!({}));
        });
        (bucket, upload)
    }

    /// File registration returns the given file reference.
    pub fn mock_register_file(&self, file_ref: &str) -> Mock<'_> {
        let body = json!({
            "file": {
                "name": file_ref,
                "uri": format!("https://files.test/{file_ref}"),
                "mimeType": "application/pdf"
            }
        });
        self.mock_server.mock(|when, then| {
            when.method(Method::POST).path("/upload/v1beta/files");
            then.status(200).json_body(body);
        })
    }

    /// Index import completes immediately.
    pub fn mock_import_done(&self) -> Mock<'_> {
        self.mock_server.mock(|when, then| {
            when.method(Method::POST)
                .path(format!("/upload/v1beta/{TEST_STORE}:uploadToFileSearchStore"));
            then.status(200)
                .json_body(json!({"name": "operations/import", "done": true}));
        })
    }

    /// The hosted file handle for `file_ref` is fetchable.
    pub fn mock_fetch_file(&self, file_ref: &str) -> Mock<'_> {
        let body = json!({
            "name": file_ref,
            "uri": format!("https://files.test/{file_ref}"),
            "mimeType": "application/pdf"
        });
        self.mock_server.mock(|when, then| {
            when.method(Method::GET).path(format!("/v1beta/{file_ref}"));
            then.status(200).json_body(body);
        })
    }

    /// The generation endpoint answers with the given text.
    pub fn mock_generate(&self, text: &str) -> Mock<'_> {
        let body = json!({
            "candidates": [{"content": {"parts": [{"text": text}]}}]
        });
        self.mock_server.mock(|when, then| {
            when.method(Method::POST)
                .path(format!("/v1beta/models/{TEST_MODEL}:generateContent"));
            then.status(200).json_body(body);
        })
    }

    /// A multipart form carrying one file and optional extra text fields.
    pub fn upload_form(
        filename: &str,
        bytes: &[u8],
        fields: &[(&str, &str)],
    ) -> reqwest::multipart::Form {
        let mut form = reqwest::multipart::Form::new().part(
            "file",
            reqwest::multipart::Part::bytes(bytes.to_vec())
                .file_name(filename.to_string())
                .mime_str("application/pdf")
                .expect("Invalid mime type"),
        );
        for (name, value) in fields {
            form = form.text(name.to_string(), value.to_string());
        }
        form
    }
}

impl Drop for TestApp {
    fn drop(&mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
    }
}
