//! # API Route Handlers
//!
//! This module organizes all the Axum route handlers for the
//! `ragbase-server`, split into logical sub-modules: documents (upload, list,
//! delete), asks, and the history/chat recorders.

pub mod ask_handlers;
pub mod document_handlers;
pub mod general;
pub mod history_handlers;

// Re-export all handlers from the sub-modules to make them easily accessible
// to the router under a single `handlers::` path.
pub use ask_handlers::*;
pub use document_handlers::*;
pub use general::*;
pub use history_handlers::*;

/// Formats a float epoch timestamp for listings. Zero or invalid stamps
/// (legacy rows) yield `None`.
pub(crate) fn humanize_epoch(seconds: f64) -> Option<String> {
    if seconds <= 0.0 {
        return None;
    }
    chrono::DateTime::from_timestamp(seconds as i64, 0)
        .map(|dt| dt.format("%Y-%m-%d %H:%M:%S UTC").to_string())
}
