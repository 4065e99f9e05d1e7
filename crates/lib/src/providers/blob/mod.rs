pub mod gcs;

use crate::errors::KnowledgeError;
use async_trait::async_trait;
use dyn_clone::DynClone;
use std::fmt::Debug;

pub use gcs::GcsBlobStore;

/// A trait for interacting with an object-storage service.
///
/// Implementations store raw document bytes under a key and hand back a stable
/// public URL for later retrieval.
#[async_trait]
pub trait BlobStore: Send + Sync + Debug + DynClone {
    /// Ensures the backing bucket exists. Find-or-create, idempotent.
    async fn ensure_bucket(&self) -> Result<(), KnowledgeError>;

    /// Uploads `bytes` under `key` and returns the public retrieval URL.
    async fn upload(
        &self,
        key: &str,
        bytes: Vec<u8>,
        content_type: &str,
    ) -> Result<String, KnowledgeError>;

    /// Deletes the object stored under `key`.
    async fn delete(&self, key: &str) -> Result<(), KnowledgeError>;

    /// Derives the object key back from a public URL produced by [`upload`],
    /// or `None` when the URL does not belong to this store.
    ///
    /// [`upload`]: BlobStore::upload
    fn object_key_for_url(&self, url: &str) -> Option<String>;
}

dyn_clone::clone_trait_object!(BlobStore);
