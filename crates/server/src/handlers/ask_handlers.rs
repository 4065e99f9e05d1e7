//! # Ask Route Handlers
//!
//! The two question-answering endpoints: `/kb-ask` against existing
//! documents, and `/upload-and-ask` which runs the ingestion pipeline first
//! and then asks scoped to the fresh document. Both record the exchange in
//! the Q&A history best-effort.

use super::document_handlers::read_upload_fields;
use crate::{errors::AppError, state::AppState};
use axum::{extract::State, Form, Json};
use axum_extra::extract::Multipart;
use ragbase::{
    answer_question,
    catalog::validate_document_ids,
    history::NewHistoryEntry,
    ingest_document, AnswerOutcome, AskScope, IngestOptions, KnowledgeError,
};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

// --- API Payloads for Asks ---

#[derive(Deserialize)]
pub struct KbAskForm {
    pub question: String,
    /// Comma-separated catalog ids, or the literal `all` for global search.
    #[serde(default)]
    pub file_ids: Option<String>,
    /// Comma-separated blob URLs from `/list`.
    #[serde(default)]
    pub file_urls: Option<String>,
}

#[derive(Serialize)]
pub struct AskResponse {
    pub question: String,
    pub answer: String,
    pub selected_documents_count: usize,
}

// --- Ask Handlers ---

/// Handler for asking a question against the knowledge base with an optional
/// document scope.
pub async fn kb_ask_handler(
    State(app_state): State<AppState>,
    Form(payload): Form<KbAskForm>,
) -> Result<Json<AskResponse>, AppError> {
    if payload.question.trim().is_empty() {
        return Err(KnowledgeError::EmptyQuestion.into());
    }

    let scope = AskScope::resolve(payload.file_ids.as_deref(), payload.file_urls.as_deref());
    info!(scope = ?scope, "Received kb-ask");

    // Malformed ids must fail before the store handle (a hosted resource)
    // is even resolved.
    if let AskScope::ByIds(ids) = &scope {
        validate_document_ids(ids)?;
    }

    let store_name = app_state.active_store_name().await?.to_string();
    let outcome = answer_question(
        app_state.search_store.as_ref(),
        &app_state.catalog,
        &store_name,
        &payload.question,
        scope.clone(),
    )
    .await?;

    record_exchange(&app_state, &payload.question, "kb-ask", &scope, &outcome).await;

    Ok(Json(AskResponse {
        question: payload.question,
        answer: outcome.answer,
        selected_documents_count: outcome.selected_documents_count,
    }))
}

/// Handler for uploading a document and immediately asking about it.
pub async fn upload_and_ask_handler(
    State(app_state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<AskResponse>, AppError> {
    let (filename, bytes, _, question) = read_upload_fields(&mut multipart).await?;
    let question = question.unwrap_or_default();
    if question.trim().is_empty() {
        return Err(KnowledgeError::EmptyQuestion.into());
    }

    let store_name = app_state.active_store_name().await?.to_string();
    let ingested = ingest_document(
        app_state.blob_store.as_ref(),
        app_state.search_store.as_ref(),
        &app_state.catalog,
        &store_name,
        bytes,
        IngestOptions {
            original_filename: filename,
            display_name: None,
            metadata: None,
        },
        app_state.config.ingest.registration_failure_policy,
        &app_state.poll_config(),
    )
    .await?;

    // Ask using only the freshly uploaded document.
    let scope = AskScope::ByIds(vec![ingested.id]);
    let outcome = answer_question(
        app_state.search_store.as_ref(),
        &app_state.catalog,
        &store_name,
        &question,
        scope.clone(),
    )
    .await?;

    record_exchange(&app_state, &question, "upload-and-ask", &scope, &outcome).await;

    Ok(Json(AskResponse {
        question,
        answer: outcome.answer,
        selected_documents_count: outcome.selected_documents_count,
    }))
}

/// Persists the exchange. Recording failures are logged, never surfaced.
async fn record_exchange(
    app_state: &AppState,
    question: &str,
    source: &str,
    scope: &AskScope,
    outcome: &AnswerOutcome,
) {
    let (file_ids, file_urls) = match scope {
        AskScope::ByIds(ids) => (ids.clone(), Vec::new()),
        AskScope::ByUrls(urls) => (Vec::new(), urls.clone()),
        AskScope::All | AskScope::Default => (Vec::new(), Vec::new()),
    };
    let entry = NewHistoryEntry {
        question: question.to_string(),
        answer: outcome.answer.clone(),
        source: source.to_string(),
        file_ids,
        file_urls,
        search_all: outcome.search_all,
        selected_documents_count: outcome.selected_documents_count,
    };
    if let Err(e) = app_state.history.record_exchange(entry).await {
        warn!("Failed to record Q&A history entry: {e}");
    }
}
