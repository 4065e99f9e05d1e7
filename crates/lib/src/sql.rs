//! # Table Creation SQL
//!
//! Centralizes the schema statements so startup can create every table
//! idempotently in one pass.

/// All `CREATE TABLE` statements required by the catalog and the recorders.
/// Safe to execute on every startup.
pub const ALL_TABLE_CREATION_SQL: &[&str] = &[
    "CREATE TABLE IF NOT EXISTS documents (
        id TEXT PRIMARY KEY,
        original_filename TEXT NOT NULL,
        display_name TEXT NOT NULL,
        blob_url TEXT,
        search_file_ref TEXT,
        uploaded_at REAL NOT NULL,
        status TEXT NOT NULL DEFAULT 'active',
        metadata TEXT NOT NULL DEFAULT '{}'
    )",
    "CREATE TABLE IF NOT EXISTS qa_history (
        id TEXT PRIMARY KEY,
        question TEXT NOT NULL,
        answer TEXT NOT NULL,
        source TEXT NOT NULL,
        file_ids TEXT NOT NULL DEFAULT '[]',
        file_urls TEXT NOT NULL DEFAULT '[]',
        search_all INTEGER NOT NULL DEFAULT 0,
        selected_documents_count INTEGER NOT NULL DEFAULT 0,
        asked_at REAL NOT NULL
    )",
    "CREATE TABLE IF NOT EXISTS chat_history (
        id TEXT PRIMARY KEY,
        question TEXT NOT NULL,
        answer TEXT NOT NULL,
        source TEXT NOT NULL,
        conversation_id TEXT,
        chat_id TEXT,
        asked_at REAL NOT NULL
    )",
];
