pub mod gemini;

use crate::errors::KnowledgeError;
use async_trait::async_trait;
use dyn_clone::DynClone;
use std::fmt::Debug;

pub use gemini::GeminiSearchStore;

/// A live handle to a file registered with the hosted search service.
///
/// Handles are time-limited on the hosted side (~48h); callers must treat a
/// failed fetch as a recoverable condition, never a crash.
#[derive(Debug, Clone)]
pub struct HostedFile {
    /// Opaque resource name, used as the catalog's `search_file_ref`.
    pub name: String,
    /// Retrieval URI to attach as a content part.
    pub uri: String,
    pub mime_type: String,
}

/// A long-running import of a file into a search index.
#[derive(Debug, Clone)]
pub struct ImportOperation {
    pub name: String,
    pub done: bool,
}

/// A trait for interacting with the hosted file-search/generation service.
///
/// This covers the full lifecycle the pipeline needs: index bootstrap, file
/// registration, asynchronous index import, handle refresh, deletion, and the
/// grounded generation call itself.
#[async_trait]
pub trait SearchStore: Send + Sync + Debug + DynClone {
    /// Returns the resource name of the search index with the given display
    /// name, creating it when absent. Find-or-create, idempotent.
    async fn ensure_store(&self, display_name: &str) -> Result<String, KnowledgeError>;

    /// Registers raw file content with the service (server-side content
    /// extraction) and returns its opaque file reference.
    async fn register_file(
        &self,
        bytes: Vec<u8>,
        display_name: &str,
        mime_type: &str,
    ) -> Result<String, KnowledgeError>;

    /// Starts importing file content into the named index. The returned
    /// operation may already be complete.
    async fn begin_import(
        &self,
        store_name: &str,
        bytes: Vec<u8>,
        display_name: &str,
    ) -> Result<ImportOperation, KnowledgeError>;

    /// Checks whether a previously started import has finished.
    async fn operation_done(&self, operation_name: &str) -> Result<bool, KnowledgeError>;

    /// Re-fetches the live handle for a registered file. Fails when the
    /// hosted file has expired or was deleted.
    async fn fetch_file(&self, file_ref: &str) -> Result<HostedFile, KnowledgeError>;

    /// Deletes a registered file from the service.
    async fn delete_file(&self, file_ref: &str) -> Result<(), KnowledgeError>;

    /// Issues one grounded generation request. `files` are attached as
    /// content parts ahead of the question (direct-reference grounding);
    /// an empty slice means the whole index is searched (global grounding).
    async fn generate_grounded(
        &self,
        store_name: &str,
        question: &str,
        files: &[HostedFile],
    ) -> Result<String, KnowledgeError>;
}

dyn_clone::clone_trait_object!(SearchStore);
