//! # Document Catalog
//!
//! The catalog is the local metadata store for uploaded documents, backed by a
//! Turso (SQLite) database. Every uploaded document gets one row here; the
//! hosted file reference and the blob URL are best-effort fields whose absence
//! every reader must tolerate.

use crate::{errors::KnowledgeError, sql};
use serde_json::Value;
use tracing::debug;
use turso::{params, Database, Value as TursoValue};
use uuid::Uuid;

/// A document metadata record as persisted in the `documents` table.
#[derive(Debug, Clone)]
pub struct DocumentRecord {
    pub id: String,
    pub original_filename: String,
    pub display_name: String,
    /// Public retrieval URL in the blob store. Absent for legacy records.
    pub blob_url: Option<String>,
    /// Opaque handle into the hosted search service. Absent when registration
    /// failed (degraded record) or for legacy records.
    pub search_file_ref: Option<String>,
    /// Seconds since epoch.
    pub uploaded_at: f64,
    pub status: String,
    pub metadata: Value,
}

/// Fields supplied when inserting a new catalog record.
#[derive(Debug, Clone)]
pub struct NewDocument {
    pub original_filename: String,
    pub display_name: String,
    pub blob_url: Option<String>,
    pub search_file_ref: Option<String>,
    pub uploaded_at: f64,
    pub metadata: Value,
}

/// Opens (or creates) the local database and enables WAL mode.
///
/// Use `":memory:"` for a unique, isolated in-memory database. To share an
/// in-memory database across stores (e.g., in tests), open it once and
/// `.clone()` the returned `Database`.
pub async fn open_database(db_path: &str) -> Result<Database, KnowledgeError> {
    let db = turso::Builder::new_local(db_path)
        .build()
        .await
        .map_err(|e| KnowledgeError::Storage(e.to_string()))?;

    // WAL benefits file-backed databases and is a no-op for in-memory ones.
    let conn = db.connect()?;
    conn.query("PRAGMA journal_mode=WAL;", ()).await?;

    Ok(db)
}

/// Validates that every supplied document id parses as a UUID.
///
/// Called before any hosted request is made, so a malformed id is a pure
/// local validation failure.
pub fn validate_document_ids(ids: &[String]) -> Result<(), KnowledgeError> {
    for id in ids {
        Uuid::parse_str(id).map_err(|_| KnowledgeError::InvalidDocumentId(id.clone()))?;
    }
    Ok(())
}

/// The document metadata store.
///
/// Cloning shares the underlying database, which manages its own connection
/// pool; each operation takes a fresh connection.
#[derive(Clone)]
pub struct Catalog {
    db: Database,
}

impl Catalog {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    /// Ensures all application tables exist. Idempotent, runs at startup.
    pub async fn initialize_schema(&self) -> Result<(), KnowledgeError> {
        let conn = self.db.connect()?;
        for statement in sql::ALL_TABLE_CREATION_SQL {
            conn.execute(statement, ()).await?;
        }
        Ok(())
    }

    /// Inserts a new record and returns its assigned id.
    pub async fn insert(&self, doc: NewDocument) -> Result<String, KnowledgeError> {
        let id = Uuid::new_v4().to_string();
        let conn = self.db.connect()?;
        let params: Vec<TursoValue> = vec![
            TursoValue::Text(id.clone()),
            TursoValue::Text(doc.original_filename),
            TursoValue::Text(doc.display_name),
            doc.blob_url.map(TursoValue::Text).unwrap_or(TursoValue::Null),
            doc.search_file_ref
                .map(TursoValue::Text)
                .unwrap_or(TursoValue::Null),
            TursoValue::Real(doc.uploaded_at),
            TursoValue::Text(doc.metadata.to_string()),
        ];
        conn.execute(
            "INSERT INTO documents
                (id, original_filename, display_name, blob_url, search_file_ref,
                 uploaded_at, status, metadata)
             VALUES (?, ?, ?, ?, ?, ?, 'active', ?)",
            params,
        )
        .await?;
        debug!(document_id = %id, "Catalog record inserted");
        Ok(id)
    }

    /// Returns all active records, newest first.
    pub async fn list_active(&self) -> Result<Vec<DocumentRecord>, KnowledgeError> {
        let conn = self.db.connect()?;
        let mut rows = conn
            .query(
                &format!("{SELECT_RECORD} WHERE status = 'active' ORDER BY uploaded_at DESC"),
                (),
            )
            .await?;
        let mut records = Vec::new();
        while let Some(row) = rows.next().await? {
            records.push(record_from_row(&row)?);
        }
        Ok(records)
    }

    /// Returns the number of active records.
    pub async fn count_active(&self) -> Result<usize, KnowledgeError> {
        let conn = self.db.connect()?;
        let mut rows = conn
            .query("SELECT COUNT(*) FROM documents WHERE status = 'active'", ())
            .await?;
        let count = match rows.next().await? {
            Some(row) => match row.get_value(0)? {
                TursoValue::Integer(n) => n as usize,
                _ => 0,
            },
            None => 0,
        };
        Ok(count)
    }

    /// Fetches the records matching the given ids. Ids must already be
    /// validated; unknown ids are simply absent from the result.
    pub async fn find_by_ids(&self, ids: &[String]) -> Result<Vec<DocumentRecord>, KnowledgeError> {
        self.find_by_column("id", ids).await
    }

    /// Fetches the records whose `blob_url` exactly matches one of the URLs.
    pub async fn find_by_urls(
        &self,
        urls: &[String],
    ) -> Result<Vec<DocumentRecord>, KnowledgeError> {
        self.find_by_column("blob_url", urls).await
    }

    async fn find_by_column(
        &self,
        column: &str,
        values: &[String],
    ) -> Result<Vec<DocumentRecord>, KnowledgeError> {
        if values.is_empty() {
            return Ok(Vec::new());
        }
        let placeholders = vec!["?"; values.len()].join(", ");
        let sql = format!("{SELECT_RECORD} WHERE {column} IN ({placeholders})");
        let params: Vec<TursoValue> = values
            .iter()
            .map(|v| TursoValue::Text(v.clone()))
            .collect();

        let conn = self.db.connect()?;
        let mut rows = conn.query(&sql, params).await?;
        let mut records = Vec::new();
        while let Some(row) = rows.next().await? {
            records.push(record_from_row(&row)?);
        }
        Ok(records)
    }

    /// Returns the most recently uploaded active record that still carries a
    /// hosted file reference, if any.
    pub async fn latest_with_search_ref(
        &self,
    ) -> Result<Option<DocumentRecord>, KnowledgeError> {
        let conn = self.db.connect()?;
        let mut rows = conn
            .query(
                &format!(
                    "{SELECT_RECORD}
                     WHERE status = 'active'
                       AND search_file_ref IS NOT NULL AND search_file_ref != ''
                     ORDER BY uploaded_at DESC LIMIT 1"
                ),
                (),
            )
            .await?;
        match rows.next().await? {
            Some(row) => Ok(Some(record_from_row(&row)?)),
            None => Ok(None),
        }
    }

    /// Resolves a document by store id or, when the input is not a valid id,
    /// by exact `original_filename` match.
    pub async fn find_by_id_or_filename(
        &self,
        id_or_filename: &str,
    ) -> Result<Option<DocumentRecord>, KnowledgeError> {
        let column = if Uuid::parse_str(id_or_filename).is_ok() {
            "id"
        } else {
            "original_filename"
        };
        let conn = self.db.connect()?;
        let mut rows = conn
            .query(
                &format!("{SELECT_RECORD} WHERE {column} = ? LIMIT 1"),
                params![id_or_filename],
            )
            .await?;
        match rows.next().await? {
            Some(row) => Ok(Some(record_from_row(&row)?)),
            None => Ok(None),
        }
    }

    /// Removes a record by id. Returns `true` when a row was deleted.
    pub async fn delete(&self, id: &str) -> Result<bool, KnowledgeError> {
        let conn = self.db.connect()?;
        let affected = conn
            .execute("DELETE FROM documents WHERE id = ?", params![id])
            .await?;
        Ok(affected > 0)
    }
}

impl std::fmt::Debug for Catalog {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Catalog").finish_non_exhaustive()
    }
}

const SELECT_RECORD: &str = "SELECT id, original_filename, display_name, blob_url, \
     search_file_ref, uploaded_at, status, metadata FROM documents";

fn record_from_row(row: &turso::Row) -> Result<DocumentRecord, KnowledgeError> {
    Ok(DocumentRecord {
        id: text(row.get_value(0)?),
        original_filename: text(row.get_value(1)?),
        display_name: text(row.get_value(2)?),
        blob_url: opt_text(row.get_value(3)?),
        search_file_ref: opt_text(row.get_value(4)?),
        uploaded_at: real(row.get_value(5)?),
        status: text(row.get_value(6)?),
        metadata: opt_text(row.get_value(7)?)
            .and_then(|raw| serde_json::from_str(&raw).ok())
            .unwrap_or(Value::Null),
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

fn real(value: TursoValue) -> f64 {
    match value {
        TursoValue::Real(f) => f,
        TursoValue::Integer(i) => i as f64,
        _ => 0.0,
    }
}
