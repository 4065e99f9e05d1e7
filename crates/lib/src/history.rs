//! # History and Chat Recording
//!
//! Two append-only logs backed by the same database as the catalog: `qa_history`
//! for question/answer exchanges and `chat_history` for unified chat turns.
//! Conversation summaries for the sidebar are a derived view, computed in
//! [`summarize_conversations`] from the turns of each conversation.

use crate::{
    constants::{
        CONVERSATION_PREVIEW_MAX_CHARS, CONVERSATION_QUESTION_PREVIEW_MAX_CHARS,
        CONVERSATION_TITLE_MAX_CHARS,
    },
    errors::KnowledgeError,
};
use chrono::Utc;
use std::collections::HashMap;
use turso::{params, Database, Value as TursoValue};
use uuid::Uuid;

/// A persisted question/answer exchange.
#[derive(Debug, Clone)]
pub struct HistoryEntry {
    pub id: String,
    pub question: String,
    pub answer: String,
    pub source: String,
    pub file_ids: Vec<String>,
    pub file_urls: Vec<String>,
    pub search_all: bool,
    pub selected_documents_count: usize,
    pub asked_at: f64,
}

/// Fields supplied when recording an exchange.
#[derive(Debug, Clone, Default)]
pub struct NewHistoryEntry {
    pub question: String,
    pub answer: String,
    pub source: String,
    pub file_ids: Vec<String>,
    pub file_urls: Vec<String>,
    pub search_all: bool,
    pub selected_documents_count: usize,
}

/// A persisted chat turn from a UI flow.
#[derive(Debug, Clone)]
pub struct ChatTurn {
    pub id: String,
    pub question: String,
    pub answer: String,
    pub source: String,
    pub conversation_id: Option<String>,
    pub chat_id: Option<String>,
    pub asked_at: f64,
}

/// Fields supplied when recording a chat turn.
#[derive(Debug, Clone, Default)]
pub struct NewChatTurn {
    pub question: String,
    pub answer: String,
    pub source: String,
    pub conversation_id: Option<String>,
    pub chat_id: Option<String>,
}

/// Filters for listing chat turns.
#[derive(Debug, Clone, Default)]
pub struct ChatTurnFilter {
    pub limit: usize,
    pub source: Option<String>,
    pub conversation_id: Option<String>,
}

/// A sidebar-ready conversation summary.
#[derive(Debug, Clone, PartialEq)]
pub struct ConversationSummary {
    pub id: String,
    pub title: String,
    pub preview: String,
    pub timestamp: f64,
    pub message_count: usize,
}

/// The append-only recorder for exchanges and chat turns.
#[derive(Clone)]
pub struct HistoryStore {
    db: Database,
}

impl HistoryStore {
    /// Tables are created by [`crate::Catalog::initialize_schema`].
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    /// Appends a question/answer exchange and returns its id.
    pub async fn record_exchange(&self, entry: NewHistoryEntry) -> Result<String, KnowledgeError> {
        let id = Uuid::new_v4().to_string();
        let asked_at = Utc::now().timestamp_micros() as f64 / 1_000_000.0;
        let conn = self.db.connect()?;
        conn.execute(
            "INSERT INTO qa_history
                (id, question, answer, source, file_ids, file_urls, search_all,
                 selected_documents_count, asked_at)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)",
            params![
                id.clone(),
                entry.question,
                entry.answer,
                entry.source,
                serde_json::to_string(&entry.file_ids).unwrap_or_else(|_| "[]".to_string()),
                serde_json::to_string(&entry.file_urls).unwrap_or_else(|_| "[]".to_string()),
                entry.search_all as i64,
                entry.selected_documents_count as i64,
                asked_at
            ],
        )
        .await?;
        Ok(id)
    }

    /// Lists exchanges, newest first.
    pub async fn list_history(&self, limit: usize) -> Result<Vec<HistoryEntry>, KnowledgeError> {
        let conn = self.db.connect()?;
        let mut rows = conn
            .query(
                "SELECT id, question, answer, source, file_ids, file_urls, search_all,
                        selected_documents_count, asked_at
                 FROM qa_history ORDER BY asked_at DESC LIMIT ?",
                params![limit as i64],
            )
            .await?;
        let mut entries = Vec::new();
        while let Some(row) = rows.next().await? {
            entries.push(HistoryEntry {
                id: text(row.get_value(0)?),
                question: text(row.get_value(1)?),
                answer: text(row.get_value(2)?),
                source: text(row.get_value(3)?),
                file_ids: json_string_list(row.get_value(4)?),
                file_urls: json_string_list(row.get_value(5)?),
                search_all: integer(row.get_value(6)?) != 0,
                selected_documents_count: integer(row.get_value(7)?) as usize,
                asked_at: real(row.get_value(8)?),
            });
        }
        Ok(entries)
    }

    /// Removes a single exchange. Returns `true` when a row was deleted.
    pub async fn delete_entry(&self, id: &str) -> Result<bool, KnowledgeError> {
        let conn = self.db.connect()?;
        let affected = conn
            .execute("DELETE FROM qa_history WHERE id = ?", params![id])
            .await?;
        Ok(affected > 0)
    }

    /// Appends a chat turn and returns its id.
    pub async fn record_chat_turn(&self, turn: NewChatTurn) -> Result<String, KnowledgeError> {
        let id = Uuid::new_v4().to_string();
        let asked_at = Utc::now().timestamp_micros() as f64 / 1_000_000.0;
        let conn = self.db.connect()?;
        let params: Vec<TursoValue> = vec![
            TursoValue::Text(id.clone()),
            TursoValue::Text(turn.question),
            TursoValue::Text(turn.answer),
            TursoValue::Text(turn.source),
            turn.conversation_id
                .map(TursoValue::Text)
                .unwrap_or(TursoValue::Null),
            turn.chat_id.map(TursoValue::Text).unwrap_or(TursoValue::Null),
            TursoValue::Real(asked_at),
        ];
        conn.execute(
            "INSERT INTO chat_history
                (id, question, answer, source, conversation_id, chat_id, asked_at)
             VALUES (?, ?, ?, ?, ?, ?, ?)",
            params,
        )
        .await?;
        Ok(id)
    }

    /// Lists chat turns. Within a single conversation the turns come back in
    /// chronological order; the unified feed comes back newest first.
    pub async fn list_chat_turns(
        &self,
        filter: ChatTurnFilter,
    ) -> Result<Vec<ChatTurn>, KnowledgeError> {
        let mut clauses = Vec::new();
        let mut params: Vec<TursoValue> = Vec::new();
        if let Some(source) = &filter.source {
            clauses.push("source = ?");
            params.push(TursoValue::Text(source.clone()));
        }
        if let Some(conversation_id) = &filter.conversation_id {
            clauses.push("conversation_id = ?");
            params.push(TursoValue::Text(conversation_id.clone()));
        }
        let where_sql = if clauses.is_empty() {
            String::new()
        } else {
            format!("WHERE {}", clauses.join(" AND "))
        };
        let order = if filter.conversation_id.is_some() {
            "ASC"
        } else {
            "DESC"
        };
        let sql = format!(
            "SELECT id, question, answer, source, conversation_id, chat_id, asked_at
             FROM chat_history {where_sql} ORDER BY asked_at {order} LIMIT ?"
        );
        params.push(TursoValue::Integer(filter.limit as i64));

        let conn = self.db.connect()?;
        let mut rows = conn.query(&sql, params).await?;
        let mut turns = Vec::new();
        while let Some(row) = rows.next().await? {
            turns.push(chat_turn_from_row(&row)?);
        }
        Ok(turns)
    }

    /// Derives sidebar conversation summaries, most recent activity first.
    pub async fn conversations(
        &self,
        limit: usize,
    ) -> Result<Vec<ConversationSummary>, KnowledgeError> {
        let conn = self.db.connect()?;
        let mut rows = conn
            .query(
                "SELECT id, question, answer, source, conversation_id, chat_id, asked_at
                 FROM chat_history
                 WHERE conversation_id IS NOT NULL AND conversation_id != ''
                 ORDER BY asked_at ASC",
                (),
            )
            .await?;
        let mut turns = Vec::new();
        while let Some(row) = rows.next().await? {
            turns.push(chat_turn_from_row(&row)?);
        }
        Ok(summarize_conversations(&turns, limit))
    }

    /// Removes all turns of one conversation. Returns the deleted count.
    pub async fn delete_conversation(
        &self,
        conversation_id: &str,
    ) -> Result<usize, KnowledgeError> {
        let conn = self.db.connect()?;
        let affected = conn
            .execute(
                "DELETE FROM chat_history WHERE conversation_id = ?",
                params![conversation_id],
            )
            .await?;
        Ok(affected as usize)
    }
}

impl std::fmt::Debug for HistoryStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HistoryStore").finish_non_exhaustive()
    }
}

/// Groups chat turns by conversation and builds the sidebar summaries.
///
/// `turns` must be in ascending `asked_at` order. Title is the first question,
/// preview is the last answer (or `You: <last question>` when the answer is
/// empty), both truncated to fixed widths.
pub fn summarize_conversations(turns: &[ChatTurn], limit: usize) -> Vec<ConversationSummary> {
    struct Group {
        first_question: String,
        last_question: String,
        last_answer: String,
        timestamp: f64,
        message_count: usize,
    }

    let mut groups: HashMap<String, Group> = HashMap::new();
    for turn in turns {
        let Some(conversation_id) = turn.conversation_id.as_deref().filter(|c| !c.is_empty())
        else {
            continue;
        };
        let group = groups
            .entry(conversation_id.to_string())
            .or_insert_with(|| Group {
                first_question: turn.question.clone(),
                last_question: String::new(),
                last_answer: String::new(),
                timestamp: turn.asked_at,
                message_count: 0,
            });
        group.last_question = turn.question.clone();
        group.last_answer = turn.answer.clone();
        group.timestamp = group.timestamp.max(turn.asked_at);
        group.message_count += 1;
    }

    let mut summaries: Vec<ConversationSummary> = groups
        .into_iter()
        .map(|(id, group)| {
            let mut title = truncate_with_ellipsis(
                group.first_question.trim(),
                CONVERSATION_TITLE_MAX_CHARS,
            );
            if title.is_empty() {
                title = "New chat".to_string();
            }
            let last_answer = group.last_answer.trim();
            let preview = if last_answer.is_empty() {
                let question = truncate_with_ellipsis(
                    group.last_question.trim(),
                    CONVERSATION_QUESTION_PREVIEW_MAX_CHARS,
                );
                format!("You: {question}")
            } else {
                last_answer.to_string()
            };
            ConversationSummary {
                id,
                title,
                preview: truncate_with_ellipsis(&preview, CONVERSATION_PREVIEW_MAX_CHARS),
                timestamp: group.timestamp,
                message_count: group.message_count,
            }
        })
        .collect();

    summaries.sort_by(|a, b| {
        b.timestamp
            .partial_cmp(&a.timestamp)
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    summaries.truncate(limit);
    summaries
}

/// Cuts `s` to at most `max_chars` characters, appending `…` when cut.
fn truncate_with_ellipsis(s: &str, max_chars: usize) -> String {
    if s.chars().count() > max_chars {
        let cut: String = s.chars().take(max_chars).collect();
        format!("{cut}…")
    } else {
        s.to_string()
    }
}

fn chat_turn_from_row(row: &turso::Row) -> Result<ChatTurn, KnowledgeError> {
    Ok(ChatTurn {
        id: text(row.get_value(0)?),
        question: text(row.get_value(1)?),
        answer: text(row.get_value(2)?),
        source: text(row.get_value(3)?),
        conversation_id: opt_text(row.get_value(4)?),
        chat_id: opt_text(row.get_value(5)?),
        asked_at: real(row.get_value(6)?),
    })
}

fn text(value: TursoValue) -> String {
    match value {
        TursoValue::Text(s) => s,
        _ => String::new(),
    }
}

fn opt_text(value: TursoValue) -> Option<String> {
    match value {
        TursoValue::Text(s) if !s.is_empty() => Some(s),
        _ => None,
    }
}

fn integer(value: TursoValue) -> i64 {
    match value {
        TursoValue::Integer(i) => i,
        _ => 0,
    }
}

fn real(value: TursoValue) -> f64 {
    match value {
        TursoValue::Real(f) => f,
        TursoValue::Integer(i) => i as f64,
        _ => 0.0,
    }
}

fn json_string_list(value: TursoValue) -> Vec<String> {
    match value {
        TursoValue::Text(raw) => serde_json::from_str(&raw).unwrap_or_default(),
        _ => Vec::new(),
    }
}
