//! # Application Configuration
//!
//! Loads the server configuration from an optional `config.yml` file and
//! environment variables. `${ENV_VAR}` placeholders in the file are expanded
//! before parsing; top-level keys can be overridden by plain environment
//! variables (`PORT`, `DB_URL`) and nested keys by `RAGBASE_`-prefixed ones
//! (e.g., `RAGBASE_SEARCH__API_KEY`).

use config::{Config as ConfigBuilder, Environment, File, FileFormat};
use ragbase::RegistrationFailurePolicy;
use regex::Regex;
use serde::Deserialize;
use std::env;
use std::fs;
use tracing::info;

/// A custom error type for configuration issues.
#[derive(Debug)]
pub enum ConfigError {
    /// Indicates an error from the underlying `config` crate.
    General(String),
    /// Indicates a required configuration file was not found.
    NotFound(String),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::General(msg) => write!(f, "Configuration error: {msg}"),
            ConfigError::NotFound(msg) => write!(f, "{msg}"),
        }
    }
}

impl std::error::Error for ConfigError {}

impl From<config::ConfigError> for ConfigError {
    fn from(err: config::ConfigError) -> Self {
        ConfigError::General(err.to_string())
    }
}

/// The root configuration structure, mapping directly to `config.yml`.
#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    /// The port for the server to listen on. Loaded from `PORT` env var.
    #[serde(default = "default_port")]
    pub port: u16,
    /// The path to the SQLite database file. Loaded from `DB_URL` env var.
    #[serde(default = "default_db_url")]
    pub db_url: String,
    /// Object-storage settings for uploaded document blobs.
    pub storage: StorageConfig,
    /// Hosted file-search/generation settings.
    pub search: SearchConfig,
    /// Ingestion pipeline policy knobs.
    #[serde(default)]
    pub ingest: IngestConfig,
}

fn default_port() -> u16 {
    9090
}

fn default_db_url() -> String {
    "db/ragbase.db".to_string()
}

/// Configuration for the blob store.
#[derive(Debug, Deserialize, Clone)]
pub struct StorageConfig {
    /// API host, without a trailing slash.
    #[serde(default = "default_storage_api_base")]
    pub api_base: String,
    /// Host baked into public retrieval URLs. Usually equals `api_base`.
    #[serde(default = "default_storage_api_base")]
    pub public_base: String,
    pub bucket: String,
    pub project: String,
    /// Optional bearer token for the storage API.
    #[serde(default)]
    pub auth_token: Option<String>,
}

fn default_storage_api_base() -> String {
    "https://storage.googleapis.com".to_string()
}

/// Configuration for the hosted search/generation service.
#[derive(Debug, Deserialize, Clone)]
pub struct SearchConfig {
    /// API host, without a trailing slash.
    #[serde(default = "default_search_api_base")]
    pub api_base: String,
    pub api_key: String,
    #[serde(default = "default_model_name")]
    pub model_name: String,
    /// Display name used to find-or-create the search index.
    #[serde(default = "default_store_display_name")]
    pub store_display_name: String,
}

fn default_search_api_base() -> String {
    "https://generativelanguage.googleapis.com".to_string()
}

fn default_model_name() -> String {
    "gemini-2.0-flash".to_string()
}

fn default_store_display_name() -> String {
    "RAG Knowledge Base".to_string()
}

/// Ingestion pipeline knobs.
#[derive(Debug, Deserialize, Clone)]
pub struct IngestConfig {
    /// What to do when file registration fails after the blob upload
    /// succeeded.
    #[serde(default)]
    pub registration_failure_policy: RegistrationFailurePolicy,
    #[serde(default = "default_import_max_wait_secs")]
    pub import_max_wait_secs: u64,
    #[serde(default = "default_import_poll_interval_secs")]
    pub import_poll_interval_secs: u64,
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            registration_failure_policy: RegistrationFailurePolicy::default(),
            import_max_wait_secs: default_import_max_wait_secs(),
            import_poll_interval_secs: default_import_poll_interval_secs(),
        }
    }
}

fn default_import_max_wait_secs() -> u64 {
    ragbase::constants::IMPORT_MAX_WAIT_SECS
}

fn default_import_poll_interval_secs() -> u64 {
    ragbase::constants::IMPORT_POLL_INTERVAL_SECS
}

// Helper to read a file, substitute env vars, and return its content.
// Returns Ok(None) if the file does not exist, or an error if it fails to read.
fn read_and_substitute(path: &str) -> Result<Option<String>, ConfigError> {
    if !std::path::Path::new(path).exists() {
        return Ok(None);
    }

    let content = fs::read_to_string(path)
        .map_err(|e| ConfigError::General(format!("Failed to read config file '{path}': {e}")))?;

    let re = Regex::new(r"\$\{(?P<var>[A-Z0-9_]+)\}").unwrap();
    let expanded_content = re.replace_all(&content, |caps: &regex::Captures| {
        let var_name = &caps["var"];
        env::var(var_name).unwrap_or_else(|_| "".to_string())
    });

    Ok(Some(expanded_content.to_string()))
}

/// Loads the application configuration.
///
/// Pass a path to use a specific file; otherwise `config.yml` next to the
/// binary's manifest is used when present, and environment variables alone
/// can carry a complete configuration.
pub fn get_config(config_path_override: Option<&str>) -> Result<AppConfig, ConfigError> {
    let mut builder = ConfigBuilder::builder();

    let main_config_path = match config_path_override {
        Some(path) => Some(path.to_string()),
        None => {
            let default_path = format!("{}/config.yml", env!("CARGO_MANIFEST_DIR"));
            std::path::Path::new(&default_path)
                .exists()
                .then_some(default_path)
        }
    };

    if let Some(path) = main_config_path {
        let content = read_and_substitute(&path)?
            .ok_or_else(|| ConfigError::NotFound(format!("Config file not found at '{path}'")))?;
        info!("Loading configuration from '{path}'.");
        builder = builder.add_source(File::from_str(&content, FileFormat::Yaml));
    }

    let settings = builder
        // Environment variables for top-level keys like PORT.
        .add_source(Environment::default())
        // Prefixed environment variables for deeper overrides.
        .add_source(
            Environment::with_prefix("RAGBASE")
                .prefix_separator("_")
                .try_parsing(true)
                .separator("__"),
        )
        .build()?;

    Ok(settings.try_deserialize()?)
}
