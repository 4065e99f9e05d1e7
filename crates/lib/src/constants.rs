//! # Shared Constants
//!
//! Centralized values shared across the pipeline, the resolver, and the server
//! crate. Keeping the user-facing degradation strings here makes them easy to
//! assert on in tests.

/// Sampling temperature for grounded generation requests.
pub const GENERATION_TEMPERATURE: f64 = 0.3;

/// Output cap, in tokens, for grounded generation requests.
pub const GENERATION_MAX_OUTPUT_TOKENS: u32 = 1500;

/// Default upper bound, in seconds, for waiting on a search-store import.
pub const IMPORT_MAX_WAIT_SECS: u64 = 60;

/// Default delay, in seconds, between polls of a pending import operation.
pub const IMPORT_POLL_INTERVAL_SECS: u64 = 2;

/// Key prefix for uploaded blobs; the timestamp portion keeps keys unique.
pub const BLOB_KEY_PREFIX: &str = "kb";

/// Returned when every requested document lost its hosted file handle.
/// This is a designed degradation path, not an error.
pub const NO_RETRIEVABLE_DOCUMENTS_MESSAGE: &str = "The selected document(s) could not be \
    retrieved from the search service. They may be legacy documents (uploaded before this \
    version) or may have expired (hosted files expire after 48h). Please re-upload using \
    /upload and use the new ID, or use /kb-ask without file_ids to search all documents.";

/// Substituted when a direct-reference generation returns empty text.
pub const EMPTY_DIRECT_ANSWER_MESSAGE: &str = "The model could not extract a relevant answer \
    from the selected document(s). Try rephrasing your question.";

/// Substituted when a global-search generation returns empty text.
pub const EMPTY_GLOBAL_ANSWER_MESSAGE: &str = "I couldn't find relevant information in the \
    knowledge base. Please make sure documents have been uploaded and try rephrasing your \
    question.";

/// Conversation titles are cut to this many characters before the ellipsis.
pub const CONVERSATION_TITLE_MAX_CHARS: usize = 35;

/// Question previews ("You: ...") are cut to this many characters.
pub const CONVERSATION_QUESTION_PREVIEW_MAX_CHARS: usize = 37;

/// Overall cap on a conversation preview line.
pub const CONVERSATION_PREVIEW_MAX_CHARS: usize = 45;
