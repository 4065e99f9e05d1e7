use crate::{
    constants::{GENERATION_MAX_OUTPUT_TOKENS, GENERATION_TEMPERATURE},
    errors::KnowledgeError,
    providers::search::{HostedFile, ImportOperation, SearchStore},
};
use async_trait::async_trait;
use reqwest::Client as ReqwestClient;
use serde::{Deserialize, Serialize};
use tracing::info;

// --- Gemini-specific request and response structures ---

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateRequest<'a> {
    contents: Vec<Content<'a>>,
    generation_config: GenerationConfig,
    tools: Vec<Tool<'a>>,
}

#[derive(Serialize)]
struct Content<'a> {
    parts: Vec<Part<'a>>,
}

#[derive(Serialize)]
enum Part<'a> {
    #[serde(rename = "fileData")]
    FileData(FileData<'a>),
    #[serde(rename = "text")]
    Text(&'a str),
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct FileData<'a> {
    file_uri: &'a str,
    mime_type: &'a str,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    temperature: f64,
    max_output_tokens: u32,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct Tool<'a> {
    file_search: FileSearchTool<'a>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct FileSearchTool<'a> {
    file_search_store_names: Vec<&'a str>,
}

#[derive(Deserialize, Debug)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Deserialize, Debug)]
struct Candidate {
    content: ContentResponse,
}

#[derive(Deserialize, Debug)]
struct ContentResponse {
    #[serde(default)]
    parts: Vec<PartResponse>,
}

#[derive(Deserialize, Debug)]
struct PartResponse {
    #[serde(default)]
    text: Option<String>,
}

#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
struct StoreListResponse {
    #[serde(default)]
    file_search_stores: Vec<StoreResource>,
}

#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
struct StoreResource {
    name: String,
    #[serde(default)]
    display_name: Option<String>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct CreateStoreRequest<'a> {
    display_name: &'a str,
}

#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
struct FileUploadResponse {
    file: FileResource,
}

#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
struct FileResource {
    name: String,
    #[serde(default)]
    uri: Option<String>,
    #[serde(default)]
    mime_type: Option<String>,
}

#[derive(Deserialize, Debug)]
struct OperationResponse {
    name: String,
    #[serde(default)]
    done: bool,
}

// --- Gemini SearchStore implementation ---

/// An adapter for the Gemini File Search and generation APIs.
#[derive(Clone, Debug)]
pub struct GeminiSearchStore {
    client: ReqwestClient,
    api_base: String,
    api_key: String,
    model: String,
}

impl GeminiSearchStore {
    /// Creates a new `GeminiSearchStore`.
    ///
    /// `api_base` is the API host without a trailing slash
    /// (`https://generativelanguage.googleapis.com` in production).
    pub fn new(api_base: String, api_key: String, model: String) -> Result<Self, KnowledgeError> {
        let client = ReqwestClient::builder()
            .build()
            .map_err(KnowledgeError::ReqwestClientBuild)?;
        Ok(Self {
            client,
            api_base,
            api_key,
            model,
        })
    }

    async fn check_status(response: reqwest::Response) -> Result<reqwest::Response, KnowledgeError> {
        if response.status().is_success() {
            Ok(response)
        } else {
            let error_text = response.text().await.unwrap_or_default();
            Err(KnowledgeError::SearchApi(error_text))
        }
    }
}

#[async_trait]
impl SearchStore for GeminiSearchStore {
    async fn ensure_store(&self, display_name: &str) -> Result<String, KnowledgeError> {
        let url = format!("{}/v1beta/fileSearchStores", self.api_base);
        let response = self
            .client
            .get(&url)
            .query(&[("key", &self.api_key)])
            .send()
            .await
            .map_err(KnowledgeError::SearchRequest)?;
        let listing: StoreListResponse = Self::check_status(response)
            .await?
            .json()
            .await
            .map_err(KnowledgeError::SearchDeserialization)?;

        if let Some(store) = listing
            .file_search_stores
            .iter()
            .find(|s| s.display_name.as_deref() == Some(display_name))
        {
            info!(store = %store.name, "Using existing search store");
            return Ok(store.name.clone());
        }

        let response = self
            .client
            .post(&url)
            .query(&[("key", &self.api_key)])
            .json(&CreateStoreRequest { display_name })
            .send()
            .await
            .map_err(KnowledgeError::SearchRequest)?;
        let store: StoreResource = Self::check_status(response)
            .await?
            .json()
            .await
            .map_err(KnowledgeError::SearchDeserialization)?;
        info!(store = %store.name, "Created new search store");
        Ok(store.name)
    }

    async fn register_file(
        &self,
        bytes: Vec<u8>,
        display_name: &str,
        mime_type: &str,
    ) -> Result<String, KnowledgeError> {
        let url = format!("{}/upload/v1beta/files", self.api_base);
        let response = self
            .client
            .post(&url)
            .query(&[("key", self.api_key.as_str()), ("displayName", display_name)])
            .header("X-Goog-Upload-Protocol", "raw")
            .header(reqwest::header::CONTENT_TYPE, mime_type)
            .body(bytes)
            .send()
            .await
            .map_err(KnowledgeError::SearchRequest)?;
        let uploaded: FileUploadResponse = Self::check_status(response)
            .await?
            .json()
            .await
            .map_err(KnowledgeError::SearchDeserialization)?;
        Ok(uploaded.file.name)
    }

    async fn begin_import(
        &self,
        store_name: &str,
        bytes: Vec<u8>,
        display_name: &str,
    ) -> Result<ImportOperation, KnowledgeError> {
        let url = format!(
            "{}/upload/v1beta/{}:uploadToFileSearchStore",
            self.api_base, store_name
        );
        let response = self
            .client
            .post(&url)
            .query(&[("key", self.api_key.as_str()), ("displayName", display_name)])
            .header("X-Goog-Upload-Protocol", "raw")
            .body(bytes)
            .send()
            .await
            .map_err(KnowledgeError::SearchRequest)?;
        let operation: OperationResponse = Self::check_status(response)
            .await?
            .json()
            .await
            .map_err(KnowledgeError::SearchDeserialization)?;
        Ok(ImportOperation {
            name: operation.name,
            done: operation.done,
        })
    }

    async fn operation_done(&self, operation_name: &str) -> Result<bool, KnowledgeError> {
        let url = format!("{}/v1beta/{}", self.api_base, operation_name);
        let response = self
            .client
            .get(&url)
            .query(&[("key", &self.api_key)])
            .send()
            .await
            .map_err(KnowledgeError::SearchRequest)?;
        let operation: OperationResponse = Self::check_status(response)
            .await?
            .json()
            .await
            .map_err(KnowledgeError::SearchDeserialization)?;
        Ok(operation.done)
    }

    async fn fetch_file(&self, file_ref: &str) -> Result<HostedFile, KnowledgeError> {
        let url = format!("{}/v1beta/{}", self.api_base, file_ref);
        let response = self
            .client
            .get(&url)
            .query(&[("key", &self.api_key)])
            .send()
            .await
            .map_err(KnowledgeError::SearchRequest)?;
        let file: FileResource = Self::check_status(response)
            .await?
            .json()
            .await
            .map_err(KnowledgeError::SearchDeserialization)?;
        Ok(HostedFile {
            uri: file.uri.unwrap_or_default(),
            mime_type: file
                .mime_type
                .unwrap_or_else(|| "application/octet-stream".to_string()),
            name: file.name,
        })
    }

    async fn delete_file(&self, file_ref: &str) -> Result<(), KnowledgeError> {
        let url = format!("{}/v1beta/{}", self.api_base, file_ref);
        let response = self
            .client
            .delete(&url)
            .query(&[("key", &self.api_key)])
            .send()
            .await
            .map_err(KnowledgeError::SearchRequest)?;
        Self::check_status(response).await?;
        Ok(())
    }

    async fn generate_grounded(
        &self,
        store_name: &str,
        question: &str,
        files: &[HostedFile],
    ) -> Result<String, KnowledgeError> {
        let mut parts: Vec<Part> = files
            .iter()
            .map(|file| {
                Part::FileData(FileData {
                    file_uri: &file.uri,
                    mime_type: &file.mime_type,
                })
            })
            .collect();
        parts.push(Part::Text(question));

        let request_body = GenerateRequest {
            contents: vec![Content { parts }],
            generation_config: GenerationConfig {
                temperature: GENERATION_TEMPERATURE,
                max_output_tokens: GENERATION_MAX_OUTPUT_TOKENS,
            },
            tools: vec![Tool {
                file_search: FileSearchTool {
                    file_search_store_names: vec![store_name],
                },
            }],
        };

        let url = format!(
            "{}/v1beta/models/{}:generateContent",
            self.api_base, self.model
        );
        let response = self
            .client
            .post(&url)
            .query(&[("key", &self.api_key)])
            .json(&request_body)
            .send()
            .await
            .map_err(KnowledgeError::SearchRequest)?;
        let generated: GenerateResponse = Self::check_status(response)
            .await?
            .json()
            .await
            .map_err(KnowledgeError::SearchDeserialization)?;

        let text = generated
            .candidates
            .first()
            .and_then(|c| c.content.parts.first())
            .and_then(|p| p.text.clone())
            .unwrap_or_default();
        Ok(text)
    }
}
