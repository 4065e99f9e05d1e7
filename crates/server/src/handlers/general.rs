//! # General Route Handlers
//!
//! The service banner and the health check.

use axum::Json;
use serde_json::{json, Value};

/// The handler for the root (`/`) endpoint: a small self-describing banner.
pub async fn root() -> Json<Value> {
    Json(json!({
        "message": "RAG knowledge base server is running",
        "time": chrono::Utc::now().to_rfc3339(),
        "endpoints": [
            "POST /upload          — Upload a document to the knowledge base",
            "GET  /list            — List all documents",
            "POST /upload-and-ask  — Upload a document and immediately ask about it",
            "POST /kb-ask          — Ask a question against existing documents",
            "GET  /history         — View Q&A history",
            "DELETE /history/{id}  — Delete a history entry",
            "POST /save-chat-turn  — Save a chat turn",
            "GET  /chat-history    — View unified chat history",
            "GET  /conversations   — List conversations for the sidebar",
            "DELETE /conversations/{id} — Delete a conversation",
            "DELETE /delete/{id}   — Delete a document",
        ]
    }))
}

/// The handler for the health check (`/health`) endpoint.
pub async fn health_check() -> &'static str {
    "OK"
}
