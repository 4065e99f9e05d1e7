use crate::{errors::KnowledgeError, providers::blob::BlobStore};
use async_trait::async_trait;
use reqwest::Client as ReqwestClient;
use serde::Serialize;
use tracing::info;

/// A blob store backed by the Google Cloud Storage JSON API.
///
/// `api_base` is the API host (`https://storage.googleapis.com` in production,
/// a mock server in tests); `public_base` is the host baked into the returned
/// retrieval URLs. They are usually the same.
#[derive(Clone, Debug)]
pub struct GcsBlobStore {
    client: ReqwestClient,
    api_base: String,
    public_base: String,
    bucket: String,
    project: String,
    auth_token: Option<String>,
}

#[derive(Serialize)]
struct CreateBucketRequest<'a> {
    name: &'a str,
}

impl GcsBlobStore {
    pub fn new(
        api_base: String,
        public_base: String,
        bucket: String,
        project: String,
        auth_token: Option<String>,
    ) -> Result<Self, KnowledgeError> {
        let client = ReqwestClient::builder()
            .build()
            .map_err(KnowledgeError::ReqwestClientBuild)?;
        Ok(Self {
            client,
            api_base,
            public_base,
            bucket,
            project,
            auth_token,
        })
    }

    fn authorize(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.auth_token {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }

    /// Object names appear in the URL path; the separator must be escaped.
    fn encode_key(key: &str) -> String {
        key.replace('/', "%2F")
    }
}

#[async_trait]
impl BlobStore for GcsBlobStore {
    async fn ensure_bucket(&self) -> Result<(), KnowledgeError> {
        let url = format!("{}/storage/v1/b/{}", self.api_base, self.bucket);
        let response = self
            .authorize(self.client.get(&url))
            .send()
            .await
            .map_err(KnowledgeError::BlobRequest)?;

        if response.status().is_success() {
            return Ok(());
        }
        if response.status() != reqwest::StatusCode::NOT_FOUND {
            let error_text = response.text().await.unwrap_or_default();
            return Err(KnowledgeError::BlobApi(error_text));
        }

        info!(bucket = %self.bucket, "Bucket not found, creating");
        let create_url = format!("{}/storage/v1/b?project={}", self.api_base, self.project);
        let response = self
            .authorize(self.client.post(&create_url))
            .json(&CreateBucketRequest { name: &self.bucket })
            .send()
            .await
            .map_err(KnowledgeError::BlobRequest)?;

        if !response.status().is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(KnowledgeError::BlobApi(error_text));
        }
        Ok(())
    }

    async fn upload(
        &self,
        key: &str,
        bytes: Vec<u8>,
        content_type: &str,
    ) -> Result<String, KnowledgeError> {
        self.ensure_bucket().await?;

        let url = format!(
            "{}/upload/storage/v1/b/{}/o?uploadType=media&name={}",
            self.api_base,
            self.bucket,
            Self::encode_key(key)
        );
        let response = self
            .authorize(self.client.post(&url))
            .header(reqwest::header::CONTENT_TYPE, content_type)
            .body(bytes)
            .send()
            .await
            .map_err(KnowledgeError::BlobRequest)?;

        if !response.status().is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(KnowledgeError::BlobApi(error_text));
        }

        Ok(format!("{}/{}/{}", self.public_base, self.bucket, key))
    }

    async fn delete(&self, key: &str) -> Result<(), KnowledgeError> {
        let url = format!(
            "{}/storage/v1/b/{}/o/{}",
            self.api_base,
            self.bucket,
            Self::encode_key(key)
        );
        let response = self
            .authorize(self.client.delete(&url))
            .send()
            .await
            .map_err(KnowledgeError::BlobRequest)?;

        if !response.status().is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(KnowledgeError::BlobApi(error_text));
        }
        Ok(())
    }

    fn object_key_for_url(&self, url: &str) -> Option<String> {
        let prefix = format!("{}/{}/", self.public_base, self.bucket);
        url.strip_prefix(&prefix)
            .filter(|key| !key.is_empty())
            .map(str::to_string)
    }
}
