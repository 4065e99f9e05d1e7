//! # History and Chat Route Handlers
//!
//! Read/delete endpoints over the Q&A history, the unified chat-turn log,
//! and the derived conversation summaries.

use super::humanize_epoch;
use crate::{errors::AppError, state::AppState};
use axum::{
    extract::{Path, Query, State},
    Json,
};
use ragbase::history::{ChatTurnFilter, NewChatTurn};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

// --- API Payloads for History ---

#[derive(Deserialize)]
pub struct HistoryParams {
    pub limit: Option<usize>,
}

#[derive(Serialize)]
pub struct HistoryEntryResponse {
    pub id: String,
    pub question: String,
    pub answer: String,
    pub source: String,
    pub file_ids: Vec<String>,
    pub file_urls: Vec<String>,
    pub search_all: bool,
    pub selected_documents_count: usize,
    pub asked_at: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub asked_at_human: Option<String>,
}

#[derive(Deserialize)]
pub struct SaveChatTurnRequest {
    pub question: String,
    pub answer: String,
    pub source: String,
    #[serde(default)]
    pub conversation_id: Option<String>,
    #[serde(default)]
    pub chat_id: Option<String>,
}

#[derive(Deserialize)]
pub struct ChatHistoryParams {
    pub limit: Option<usize>,
    #[serde(default)]
    pub source: Option<String>,
    #[serde(default)]
    pub conversation_id: Option<String>,
}

// --- History Handlers ---

/// Handler for listing the Q&A history, newest first.
pub async fn history_handler(
    State(app_state): State<AppState>,
    Query(params): Query<HistoryParams>,
) -> Result<Json<Value>, AppError> {
    let limit = params.limit.unwrap_or(50);
    let entries = app_state.history.list_history(limit).await?;
    let history: Vec<HistoryEntryResponse> = entries
        .into_iter()
        .map(|entry| HistoryEntryResponse {
            id: entry.id,
            question: entry.question,
            answer: entry.answer,
            source: entry.source,
            file_ids: entry.file_ids,
            file_urls: entry.file_urls,
            search_all: entry.search_all,
            selected_documents_count: entry.selected_documents_count,
            asked_at_human: humanize_epoch(entry.asked_at),
            asked_at: entry.asked_at,
        })
        .collect();
    Ok(Json(json!({ "history": history })))
}

/// Handler for deleting one Q&A history entry.
pub async fn delete_history_handler(
    State(app_state): State<AppState>,
    Path(entry_id): Path<String>,
) -> Result<Json<Value>, AppError> {
    if app_state.history.delete_entry(&entry_id).await? {
        Ok(Json(json!({ "status": "deleted", "id": entry_id })))
    } else {
        Err(AppError::NotFound(format!(
            "History entry '{entry_id}' not found"
        )))
    }
}

/// Handler for appending a chat turn from a UI flow.
pub async fn save_chat_turn_handler(
    State(app_state): State<AppState>,
    Json(payload): Json<SaveChatTurnRequest>,
) -> Result<Json<Value>, AppError> {
    let id = app_state
        .history
        .record_chat_turn(NewChatTurn {
            question: payload.question,
            answer: payload.answer,
            source: payload.source,
            conversation_id: payload.conversation_id,
            chat_id: payload.chat_id,
        })
        .await?;
    Ok(Json(json!({ "status": "saved", "id": id })))
}

/// Handler for the unified chat history, with optional source and
/// conversation filters.
pub async fn chat_history_handler(
    State(app_state): State<AppState>,
    Query(params): Query<ChatHistoryParams>,
) -> Result<Json<Value>, AppError> {
    let turns = app_state
        .history
        .list_chat_turns(ChatTurnFilter {
            limit: params.limit.unwrap_or(100),
            source: params.source,
            conversation_id: params.conversation_id,
        })
        .await?;
    let chat_history: Vec<Value> = turns
        .into_iter()
        .map(|turn| {
            json!({
                "id": turn.id,
                "question": turn.question,
                "answer": turn.answer,
                "source": turn.source,
                "conversation_id": turn.conversation_id.unwrap_or_default(),
                "chat_id": turn.chat_id.unwrap_or_default(),
                "asked_at": turn.asked_at,
                "asked_at_human": humanize_epoch(turn.asked_at),
            })
        })
        .collect();
    Ok(Json(json!({ "chat_history": chat_history })))
}

/// Handler for the sidebar conversation summaries.
pub async fn conversations_handler(
    State(app_state): State<AppState>,
    Query(params): Query<HistoryParams>,
) -> Result<Json<Value>, AppError> {
    let limit = params.limit.unwrap_or(50);
    let summaries = app_state.history.conversations(limit).await?;
    let conversations: Vec<Value> = summaries
        .into_iter()
        .map(|summary| {
            json!({
                "id": summary.id,
                "title": summary.title,
                "preview": summary.preview,
                "timestamp": summary.timestamp,
                "message_count": summary.message_count,
            })
        })
        .collect();
    Ok(Json(json!({ "conversations": conversations })))
}

/// Handler for deleting a full conversation by id.
pub async fn delete_conversation_handler(
    State(app_state): State<AppState>,
    Path(conversation_id): Path<String>,
) -> Result<Json<Value>, AppError> {
    let deleted_count = app_state
        .history
        .delete_conversation(&conversation_id)
        .await?;
    Ok(Json(json!({
        "status": "deleted",
        "conversation_id": conversation_id,
        "deleted_count": deleted_count,
    })))
}
