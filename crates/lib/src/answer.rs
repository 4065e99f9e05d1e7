//! # Grounding Resolver
//!
//! Given a question and an optional, ambiguous document-scope specifier, pick
//! the grounding strategy, resolve identifiers against the catalog, and issue
//! one grounded generation request. The scope is a tagged union so the
//! priority order is an exhaustive `match`, not a chain of null-checks.

use crate::{
    catalog::{validate_document_ids, Catalog, DocumentRecord},
    constants::{
        EMPTY_DIRECT_ANSWER_MESSAGE, EMPTY_GLOBAL_ANSWER_MESSAGE, NO_RETRIEVABLE_DOCUMENTS_MESSAGE,
    },
    errors::KnowledgeError,
    providers::search::SearchStore,
};
use tracing::{debug, info, warn};

/// The caller's specification of which documents an ask should consider.
///
/// Resolution priority: explicit ids (or the `all` sentinel supplied in their
/// place) beat explicit URLs; nothing at all falls back to the most recent
/// upload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AskScope {
    /// Explicit catalog ids.
    ByIds(Vec<String>),
    /// Explicit blob URLs, matched exactly against the catalog.
    ByUrls(Vec<String>),
    /// The literal `all` sentinel: search the whole index.
    All,
    /// Nothing supplied: the most recently uploaded document, or global
    /// search when the catalog is empty.
    Default,
}

impl AskScope {
    /// Builds a scope from the raw comma-separated form fields.
    pub fn resolve(file_ids: Option<&str>, file_urls: Option<&str>) -> Self {
        if let Some(raw) = file_ids {
            if raw.trim().eq_ignore_ascii_case("all") {
                return AskScope::All;
            }
            let ids = split_list(raw);
            if !ids.is_empty() {
                return AskScope::ByIds(ids);
            }
        }
        if let Some(raw) = file_urls {
            let urls = split_list(raw);
            if !urls.is_empty() {
                return AskScope::ByUrls(urls);
            }
        }
        AskScope::Default
    }
}

fn split_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|item| !item.is_empty())
        .map(str::to_string)
        .collect()
}

/// The resolver's result, including what the caller needs to echo back.
#[derive(Debug, Clone)]
pub struct AnswerOutcome {
    pub answer: String,
    pub selected_documents_count: usize,
    pub search_all: bool,
}

/// Answers a question using the grounding strategy selected by `scope`.
///
/// An empty or whitespace-only question fails validation before any hosted
/// call is made. Hosted generation failures propagate; per-file attachment
/// failures inside direct-reference grounding do not.
pub async fn answer_question(
    search: &dyn SearchStore,
    catalog: &Catalog,
    store_name: &str,
    question: &str,
    scope: AskScope,
) -> Result<AnswerOutcome, KnowledgeError> {
    if question.trim().is_empty() {
        return Err(KnowledgeError::EmptyQuestion);
    }

    match scope {
        AskScope::ByIds(ids) => {
            validate_document_ids(&ids)?;
            let records = catalog.find_by_ids(&ids).await?;
            let answer = ask_with_file_refs(search, store_name, question, &records).await?;
            Ok(AnswerOutcome {
                answer,
                selected_documents_count: ids.len(),
                search_all: false,
            })
        }
        AskScope::ByUrls(urls) => {
            let records = catalog.find_by_urls(&urls).await?;
            let answer = ask_with_file_refs(search, store_name, question, &records).await?;
            Ok(AnswerOutcome {
                answer,
                selected_documents_count: urls.len(),
                search_all: false,
            })
        }
        AskScope::All => {
            let answer = ask_global(search, store_name, question).await?;
            Ok(AnswerOutcome {
                answer,
                selected_documents_count: catalog.count_active().await?,
                search_all: true,
            })
        }
        AskScope::Default => {
            let answer = match catalog.latest_with_search_ref().await? {
                Some(latest) => {
                    info!(
                        filename = %latest.original_filename,
                        "No scope given, defaulting to the latest upload"
                    );
                    ask_with_file_refs(search, store_name, question, &[latest]).await?
                }
                None => {
                    info!("Catalog is empty, falling back to global search");
                    ask_global(search, store_name, question).await?
                }
            };
            Ok(AnswerOutcome {
                answer,
                selected_documents_count: 1,
                search_all: false,
            })
        }
    }
}

/// Direct-reference grounding: attach each resolvable hosted file handle and
/// ask once. Records without a handle, or whose handle can no longer be
/// fetched (hosted files expire), are skipped individually.
async fn ask_with_file_refs(
    search: &dyn SearchStore,
    store_name: &str,
    question: &str,
    records: &[DocumentRecord],
) -> Result<String, KnowledgeError> {
    let mut file_parts = Vec::new();
    for record in records {
        let Some(file_ref) = &record.search_file_ref else {
            warn!(
                filename = %record.original_filename,
                "Skipping record without a hosted file reference (legacy document)"
            );
            continue;
        };
        match search.fetch_file(file_ref).await {
            Ok(file) => {
                debug!(file_ref = %file_ref, "Attached hosted file");
                file_parts.push(file);
            }
            Err(e) => warn!(file_ref = %file_ref, "Could not attach hosted file: {e}"),
        }
    }

    if file_parts.is_empty() {
        return Ok(NO_RETRIEVABLE_DOCUMENTS_MESSAGE.to_string());
    }

    info!(files = file_parts.len(), "Direct-reference ask");
    let answer = search
        .generate_grounded(store_name, question, &file_parts)
        .await?;
    let answer = answer.trim();
    if answer.is_empty() {
        Ok(EMPTY_DIRECT_ANSWER_MESSAGE.to_string())
    } else {
        Ok(answer.to_string())
    }
}

/// Global grounding: one request against the full index, no file filter.
async fn ask_global(
    search: &dyn SearchStore,
    store_name: &str,
    question: &str,
) -> Result<String, KnowledgeError> {
    info!(store = %store_name, "Global search ask");
    let answer = search.generate_grounded(store_name, question, &[]).await?;
    let answer = answer.trim();
    if answer.is_empty() {
        Ok(EMPTY_GLOBAL_ANSWER_MESSAGE.to_string())
    } else {
        Ok(answer.to_string())
    }
}
