//! # Application State
//!
//! The shared `AppState` holds the configuration, the catalog and history
//! stores, and the two external-service adapters. The hosted search-index
//! handle is process-wide state: it is resolved lazily exactly once via a
//! `OnceCell`, so concurrent first requests race safely on the same
//! find-or-create call.

use crate::config::AppConfig;
use ragbase::{
    catalog::open_database,
    providers::{
        blob::{BlobStore, GcsBlobStore},
        search::{GeminiSearchStore, SearchStore},
    },
    Catalog, HistoryStore, KnowledgeError, PollConfig,
};
use std::{sync::Arc, time::Duration};
use tokio::sync::OnceCell;

/// The shared application state, accessible from all request handlers.
#[derive(Clone)]
pub struct AppState {
    /// The application's configuration, loaded from `config.yml` and the
    /// environment.
    pub config: Arc<AppConfig>,
    /// The document metadata store.
    pub catalog: Arc<Catalog>,
    /// The Q&A/chat recorder, sharing the catalog's database.
    pub history: Arc<HistoryStore>,
    /// The object-storage adapter.
    pub blob_store: Arc<dyn BlobStore>,
    /// The hosted file-search/generation adapter.
    pub search_store: Arc<dyn SearchStore>,
    /// Lazily resolved search-index resource name.
    active_store: Arc<OnceCell<String>>,
}

impl AppState {
    /// Returns the active search-index name, resolving it on first use.
    /// Find-or-create by display name; idempotent under concurrency.
    pub async fn active_store_name(&self) -> Result<&str, KnowledgeError> {
        let name = self
            .active_store
            .get_or_try_init(|| async {
                self.search_store
                    .ensure_store(&self.config.search.store_display_name)
                    .await
            })
            .await?;
        Ok(name.as_str())
    }

    /// Import-poll bounds from the configuration.
    pub fn poll_config(&self) -> PollConfig {
        PollConfig {
            max_wait: Duration::from_secs(self.config.ingest.import_max_wait_secs),
            interval: Duration::from_secs(self.config.ingest.import_poll_interval_secs),
        }
    }
}

/// Builds the shared application state from the configuration.
///
/// Opens the local database (applying the schema), and instantiates the blob
/// and search adapters.
pub async fn build_app_state(config: AppConfig) -> anyhow::Result<AppState> {
    let db = open_database(&config.db_url).await?;
    tracing::info!(db_path = %config.db_url, "Initialized local document store");

    let catalog = Catalog::new(db.clone());
    catalog.initialize_schema().await?;
    let history = HistoryStore::new(db);

    let blob_store = GcsBlobStore::new(
        config.storage.api_base.clone(),
        config.storage.public_base.clone(),
        config.storage.bucket.clone(),
        config.storage.project.clone(),
        config.storage.auth_token.clone(),
    )?;
    let search_store = GeminiSearchStore::new(
        config.search.api_base.clone(),
        config.search.api_key.clone(),
        config.search.model_name.clone(),
    )?;

    Ok(AppState {
        config: Arc::new(config),
        catalog: Arc::new(catalog),
        history: Arc::new(history),
        blob_store: Arc::new(blob_store),
        search_store: Arc::new(search_store),
        active_store: Arc::new(OnceCell::new()),
    })
}
