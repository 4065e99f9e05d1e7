//! # Knowledge Base Orchestration
//!
//! This crate wires three external collaborators — an object-storage bucket, a
//! hosted file-search/generation service, and a local SQLite catalog — into a
//! document knowledge base: upload a document once, then ask questions that are
//! grounded in a chosen slice of the corpus.
//!
//! The interesting pieces are the [`ingest`] pipeline (multi-step upload with
//! explicit partial-failure semantics) and the [`answer`] resolver (turning an
//! ambiguous document-scope request into the right grounding strategy).

pub mod answer;
pub mod catalog;
pub mod constants;
pub mod errors;
pub mod history;
pub mod ingest;
pub mod providers;
mod sql;

pub use answer::{answer_question, AnswerOutcome, AskScope};
pub use catalog::{Catalog, DocumentRecord};
pub use errors::KnowledgeError;
pub use history::HistoryStore;
pub use ingest::{
    delete_document, ingest_document, IngestOptions, IngestOutcome, PollConfig,
    RegistrationFailurePolicy,
};
