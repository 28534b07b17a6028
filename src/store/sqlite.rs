//! `sqlx`/SQLite-backed [`Repository`] implementation.
//!
//! Deliberately avoids the `sqlx::query!` macro family (which needs a
//! live database reachable at build time) in favor of the runtime-checked
//! `sqlx::query`/`query_as` builders, binding and reading columns by
//! position.

use super::models::{Chunk, Document, DocumentStatus, KnowledgeBase, PipelineRun, RunKind, RunStatus};
use super::repository::{validate_transition, Repository};
use crate::error::{PipelineError, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::sqlite::SqlitePoolOptions;
use sqlx::{Row, SqlitePool};
use uuid::Uuid;

const SCHEMA: &str = r"
CREATE TABLE IF NOT EXISTS knowledge_bases (
    id TEXT PRIMARY KEY,
    tenant_id TEXT NOT NULL,
    name TEXT NOT NULL,
    embedding_dimension INTEGER NOT NULL,
    ssot_source_type TEXT,
    defaults_json TEXT NOT NULL DEFAULT '{}',
    created_at TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS documents (
    id TEXT PRIMARY KEY,
    knowledge_base_id TEXT NOT NULL,
    filename TEXT NOT NULL,
    checksum TEXT NOT NULL,
    is_ssot INTEGER NOT NULL,
    source_external_id TEXT,
    blob_uri TEXT NOT NULL,
    file_type TEXT NOT NULL DEFAULT 'unknown',
    size INTEGER NOT NULL DEFAULT 0,
    chunk_count INTEGER NOT NULL DEFAULT 0,
    metadata_json TEXT NOT NULL DEFAULT '{}',
    status TEXT NOT NULL,
    version INTEGER NOT NULL,
    tombstoned INTEGER NOT NULL DEFAULT 0,
    error_message TEXT,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL
);

CREATE UNIQUE INDEX IF NOT EXISTS documents_kb_checksum
    ON documents (knowledge_base_id, checksum);

CREATE TABLE IF NOT EXISTS chunks (
    id TEXT PRIMARY KEY,
    document_id TEXT NOT NULL,
    idx INTEGER NOT NULL,
    content TEXT NOT NULL,
    start_char INTEGER,
    end_char INTEGER,
    content_hash TEXT NOT NULL DEFAULT '',
    embedding_model TEXT NOT NULL DEFAULT '',
    vector_id TEXT NOT NULL DEFAULT '',
    text_id TEXT NOT NULL DEFAULT '',
    created_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS chunks_document_id ON chunks (document_id);

CREATE TABLE IF NOT EXISTS pipeline_runs (
    id TEXT PRIMARY KEY,
    knowledge_base_id TEXT NOT NULL,
    document_id TEXT,
    kind TEXT NOT NULL,
    status TEXT NOT NULL,
    config_json TEXT NOT NULL DEFAULT '{}',
    result_json TEXT,
    error_code TEXT,
    error_message TEXT,
    started_at TEXT NOT NULL,
    completed_at TEXT
);

CREATE INDEX IF NOT EXISTS pipeline_runs_kb ON pipeline_runs (knowledge_base_id);
";

/// A `sqlx`-backed [`Repository`] over a SQLite database.
pub struct SqliteRepository {
    pool: SqlitePool,
}

impl SqliteRepository {
    /// Connect to `database_url` (e.g. `sqlite://path/to/db.sqlite` or
    /// `sqlite::memory:`) and run schema migrations.
    ///
    /// # Errors
    ///
    /// Returns `PipelineError::BackendFault` if the connection or
    /// migration fails.
    pub async fn connect(database_url: &str) -> Result<Self> {
        let pool = SqlitePoolOptions::new()
            .max_connections(8)
            .connect(database_url)
            .await
            .map_err(|e| PipelineError::backend_fault_with_source("sqlite", "failed to connect", e.into()))?;

        sqlx::query(SCHEMA)
            .execute(&pool)
            .await
            .map_err(|e| PipelineError::backend_fault_with_source("sqlite", "failed to migrate schema", e.into()))?;

        Ok(Self { pool })
    }

    /// Open an in-process, ephemeral database (used by tests).
    ///
    /// # Errors
    ///
    /// Returns `PipelineError::BackendFault` if the pool cannot be created.
    pub async fn in_memory() -> Result<Self> {
        Self::connect("sqlite::memory:").await
    }
}

fn status_str(status: DocumentStatus) -> &'static str {
    match status {
        DocumentStatus::Pending => "pending",
        DocumentStatus::Processing => "processing",
        DocumentStatus::Indexed => "indexed",
        DocumentStatus::Failed => "failed",
    }
}

fn parse_status(raw: &str) -> Result<DocumentStatus> {
    match raw {
        "pending" => Ok(DocumentStatus::Pending),
        "processing" => Ok(DocumentStatus::Processing),
        "indexed" => Ok(DocumentStatus::Indexed),
        "failed" => Ok(DocumentStatus::Failed),
        other => Err(PipelineError::internal(format!("unknown document status '{other}' in storage"))),
    }
}

fn run_kind_str(kind: RunKind) -> &'static str {
    match kind {
        RunKind::Ingestion => "ingestion",
        RunKind::Retrieval => "retrieval",
        RunKind::Sync => "sync",
    }
}

fn parse_run_kind(raw: &str) -> Result<RunKind> {
    match raw {
        "ingestion" => Ok(RunKind::Ingestion),
        "retrieval" => Ok(RunKind::Retrieval),
        "sync" => Ok(RunKind::Sync),
        other => Err(PipelineError::internal(format!("unknown run kind '{other}' in storage"))),
    }
}

fn run_status_str(status: RunStatus) -> &'static str {
    match status {
        RunStatus::Pending => "pending",
        RunStatus::Running => "running",
        RunStatus::Succeeded => "succeeded",
        RunStatus::Failed => "failed",
    }
}

fn parse_run_status(raw: &str) -> Result<RunStatus> {
    match raw {
        "pending" => Ok(RunStatus::Pending),
        "running" => Ok(RunStatus::Running),
        "succeeded" => Ok(RunStatus::Succeeded),
        "failed" => Ok(RunStatus::Failed),
        other => Err(PipelineError::internal(format!("unknown run status '{other}' in storage"))),
    }
}

fn document_from_row(row: &sqlx::sqlite::SqliteRow) -> Result<Document> {
    let status: String = row.try_get("status").map_err(sqlx_err)?;
    let metadata_json: String = row.try_get("metadata_json").map_err(sqlx_err)?;
    Ok(Document {
        id: parse_uuid(row.try_get("id").map_err(sqlx_err)?)?,
        knowledge_base_id: parse_uuid(row.try_get("knowledge_base_id").map_err(sqlx_err)?)?,
        filename: row.try_get("filename").map_err(sqlx_err)?,
        checksum: row.try_get("checksum").map_err(sqlx_err)?,
        is_ssot: row.try_get::<i64, _>("is_ssot").map_err(sqlx_err)? != 0,
        source_external_id: row.try_get("source_external_id").map_err(sqlx_err)?,
        blob_uri: row.try_get("blob_uri").map_err(sqlx_err)?,
        file_type: row.try_get("file_type").map_err(sqlx_err)?,
        size: row.try_get("size").map_err(sqlx_err)?,
        chunk_count: row.try_get("chunk_count").map_err(sqlx_err)?,
        metadata: serde_json::from_str(&metadata_json)
            .map_err(|e| PipelineError::internal(format!("corrupt metadata_json in storage: {e}")))?,
        status: parse_status(&status)?,
        version: u32::try_from(row.try_get::<i64, _>("version").map_err(sqlx_err)?).unwrap_or(0),
        tombstoned: row.try_get::<i64, _>("tombstoned").map_err(sqlx_err)? != 0,
        error_message: row.try_get("error_message").map_err(sqlx_err)?,
        created_at: parse_timestamp(row.try_get("created_at").map_err(sqlx_err)?)?,
        updated_at: parse_timestamp(row.try_get("updated_at").map_err(sqlx_err)?)?,
    })
}

fn chunk_from_row(row: &sqlx::sqlite::SqliteRow) -> Result<Chunk> {
    Ok(Chunk {
        id: parse_uuid(row.try_get("id").map_err(sqlx_err)?)?,
        document_id: parse_uuid(row.try_get("document_id").map_err(sqlx_err)?)?,
        index: usize::try_from(row.try_get::<i64, _>("idx").map_err(sqlx_err)?).unwrap_or(0),
        content: row.try_get("content").map_err(sqlx_err)?,
        start_char: row
            .try_get::<Option<i64>, _>("start_char")
            .map_err(sqlx_err)?
            .map(|v| v as usize),
        end_char: row
            .try_get::<Option<i64>, _>("end_char")
            .map_err(sqlx_err)?
            .map(|v| v as usize),
        content_hash: row.try_get("content_hash").map_err(sqlx_err)?,
        embedding_model: row.try_get("embedding_model").map_err(sqlx_err)?,
        vector_id: row.try_get("vector_id").map_err(sqlx_err)?,
        text_id: row.try_get("text_id").map_err(sqlx_err)?,
        created_at: parse_timestamp(row.try_get("created_at").map_err(sqlx_err)?)?,
    })
}

fn run_from_row(row: &sqlx::sqlite::SqliteRow) -> Result<PipelineRun> {
    let kind: String = row.try_get("kind").map_err(sqlx_err)?;
    let status: String = row.try_get("status").map_err(sqlx_err)?;
    let document_id: Option<String> = row.try_get("document_id").map_err(sqlx_err)?;
    let completed_at: Option<String> = row.try_get("completed_at").map_err(sqlx_err)?;
    let config_json: String = row.try_get("config_json").map_err(sqlx_err)?;
    let result_json: Option<String> = row.try_get("result_json").map_err(sqlx_err)?;
    Ok(PipelineRun {
        id: parse_uuid(row.try_get("id").map_err(sqlx_err)?)?,
        knowledge_base_id: parse_uuid(row.try_get("knowledge_base_id").map_err(sqlx_err)?)?,
        document_id: document_id.map(|s| parse_uuid(s)).transpose()?,
        kind: parse_run_kind(&kind)?,
        status: parse_run_status(&status)?,
        config_snapshot: serde_json::from_str(&config_json)
            .map_err(|e| PipelineError::internal(format!("corrupt config_json in storage: {e}")))?,
        result_snapshot: result_json
            .map(|s| serde_json::from_str(&s))
            .transpose()
            .map_err(|e| PipelineError::internal(format!("corrupt result_json in storage: {e}")))?,
        error_code: row.try_get("error_code").map_err(sqlx_err)?,
        error_message: row.try_get("error_message").map_err(sqlx_err)?,
        started_at: parse_timestamp(row.try_get("started_at").map_err(sqlx_err)?)?,
        completed_at: completed_at.map(|s| parse_timestamp(s)).transpose()?,
    })
}

fn parse_uuid(raw: String) -> Result<Uuid> {
    Uuid::parse_str(&raw).map_err(|e| PipelineError::internal(format!("corrupt uuid '{raw}' in storage: {e}")))
}

fn parse_timestamp(raw: String) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(&raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| PipelineError::internal(format!("corrupt timestamp '{raw}' in storage: {e}")))
}

fn sqlx_err(e: sqlx::Error) -> PipelineError {
    PipelineError::backend_fault_with_source("sqlite", "row decode failed", e.into())
}

#[async_trait]
impl Repository for SqliteRepository {
    async fn create_knowledge_base(&self, kb: &KnowledgeBase) -> Result<()> {
        let defaults_json = serde_json::to_string(&kb.defaults_json)
            .map_err(|e| PipelineError::internal(format!("failed to serialize knowledge base defaults: {e}")))?;

        sqlx::query(
            "INSERT INTO knowledge_bases \
             (id, tenant_id, name, embedding_dimension, ssot_source_type, defaults_json, created_at) \
             VALUES (?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(kb.id.to_string())
        .bind(&kb.tenant_id)
        .bind(&kb.name)
        .bind(i64::try_from(kb.embedding_dimension).unwrap_or(i64::MAX))
        .bind(&kb.ssot_source_type)
        .bind(defaults_json)
        .bind(kb.created_at.to_rfc3339())
        .execute(&self.pool)
        .await
        .map_err(|e| PipelineError::backend_fault_with_source("sqlite", "insert knowledge_base failed", e.into()))?;
        Ok(())
    }

    async fn get_knowledge_base(&self, id: Uuid) -> Result<KnowledgeBase> {
        let row = sqlx::query(
            "SELECT kb.*, \
             (SELECT COUNT(*) FROM documents d WHERE d.knowledge_base_id = kb.id AND d.tombstoned = 0) AS document_count, \
             (SELECT COUNT(*) FROM chunks c JOIN documents d ON d.id = c.document_id WHERE d.knowledge_base_id = kb.id) AS chunk_count \
             FROM knowledge_bases kb WHERE kb.id = ?",
        )
        .bind(id.to_string())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| PipelineError::backend_fault_with_source("sqlite", "select knowledge_base failed", e.into()))?
        .ok_or_else(|| PipelineError::not_found("knowledge_base", id.to_string()))?;

        let defaults_json: String = row.try_get("defaults_json").map_err(sqlx_err)?;
        Ok(KnowledgeBase {
            id: parse_uuid(row.try_get("id").map_err(sqlx_err)?)?,
            tenant_id: row.try_get("tenant_id").map_err(sqlx_err)?,
            name: row.try_get("name").map_err(sqlx_err)?,
            embedding_dimension: usize::try_from(row.try_get::<i64, _>("embedding_dimension").map_err(sqlx_err)?)
                .unwrap_or(0),
            ssot_source_type: row.try_get("ssot_source_type").map_err(sqlx_err)?,
            defaults_json: serde_json::from_str(&defaults_json)
                .map_err(|e| PipelineError::internal(format!("corrupt defaults_json in storage: {e}")))?,
            document_count: row.try_get("document_count").map_err(sqlx_err)?,
            chunk_count: row.try_get("chunk_count").map_err(sqlx_err)?,
            created_at: parse_timestamp(row.try_get("created_at").map_err(sqlx_err)?)?,
        })
    }

    async fn find_document_by_checksum(
        &self,
        knowledge_base_id: Uuid,
        checksum: &str,
    ) -> Result<Option<Document>> {
        let row = sqlx::query("SELECT * FROM documents WHERE knowledge_base_id = ? AND checksum = ?")
            .bind(knowledge_base_id.to_string())
            .bind(checksum)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| PipelineError::backend_fault_with_source("sqlite", "select document failed", e.into()))?;

        row.as_ref().map(document_from_row).transpose()
    }

    async fn get_document(&self, id: Uuid) -> Result<Document> {
        let row = sqlx::query("SELECT * FROM documents WHERE id = ?")
            .bind(id.to_string())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| PipelineError::backend_fault_with_source("sqlite", "select document failed", e.into()))?
            .ok_or_else(|| PipelineError::not_found("document", id.to_string()))?;
        document_from_row(&row)
    }

    async fn insert_document(&self, document: &Document) -> Result<()> {
        let existing = self
            .find_document_by_checksum(document.knowledge_base_id, &document.checksum)
            .await?;
        if let Some(existing) = existing {
            if existing.id != document.id {
                return Err(PipelineError::duplicate_document(existing.id.to_string(), existing.is_ssot));
            }
        }

        let metadata_json = serde_json::to_string(&document.metadata)
            .map_err(|e| PipelineError::internal(format!("failed to serialize document metadata: {e}")))?;

        sqlx::query(
            "INSERT INTO documents \
             (id, knowledge_base_id, filename, checksum, is_ssot, source_external_id, blob_uri, file_type, size, \
              chunk_count, metadata_json, status, version, tombstoned, error_message, created_at, updated_at) \
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(document.id.to_string())
        .bind(document.knowledge_base_id.to_string())
        .bind(&document.filename)
        .bind(&document.checksum)
        .bind(i64::from(document.is_ssot))
        .bind(&document.source_external_id)
        .bind(&document.blob_uri)
        .bind(&document.file_type)
        .bind(document.size)
        .bind(document.chunk_count)
        .bind(metadata_json)
        .bind(status_str(document.status))
        .bind(i64::from(document.version))
        .bind(i64::from(document.tombstoned))
        .bind(&document.error_message)
        .bind(document.created_at.to_rfc3339())
        .bind(document.updated_at.to_rfc3339())
        .execute(&self.pool)
        .await
        .map_err(|e| PipelineError::backend_fault_with_source("sqlite", "insert document failed", e.into()))?;
        Ok(())
    }

    async fn update_document(&self, document: &Document) -> Result<()> {
        let current = self.get_document(document.id).await?;
        validate_transition(current.status, document.status)?;

        if let Some(existing) = self
            .find_document_by_checksum(document.knowledge_base_id, &document.checksum)
            .await?
        {
            if existing.id != document.id {
                return Err(PipelineError::duplicate_document(existing.id.to_string(), existing.is_ssot));
            }
        }

        let metadata_json = serde_json::to_string(&document.metadata)
            .map_err(|e| PipelineError::internal(format!("failed to serialize document metadata: {e}")))?;

        sqlx::query(
            "UPDATE documents SET filename = ?, checksum = ?, is_ssot = ?, source_external_id = ?, blob_uri = ?, \
             file_type = ?, size = ?, chunk_count = ?, metadata_json = ?, status = ?, version = ?, tombstoned = ?, \
             error_message = ?, updated_at = ? WHERE id = ?",
        )
        .bind(&document.filename)
        .bind(&document.checksum)
        .bind(i64::from(document.is_ssot))
        .bind(&document.source_external_id)
        .bind(&document.blob_uri)
        .bind(&document.file_type)
        .bind(document.size)
        .bind(document.chunk_count)
        .bind(metadata_json)
        .bind(status_str(document.status))
        .bind(i64::from(document.version))
        .bind(i64::from(document.tombstoned))
        .bind(&document.error_message)
        .bind(document.updated_at.to_rfc3339())
        .bind(document.id.to_string())
        .execute(&self.pool)
        .await
        .map_err(|e| PipelineError::backend_fault_with_source("sqlite", "update document failed", e.into()))?;
        Ok(())
    }

    async fn list_documents(&self, knowledge_base_id: Uuid, ssot_only: bool) -> Result<Vec<Document>> {
        let query = if ssot_only {
            "SELECT * FROM documents WHERE knowledge_base_id = ? AND is_ssot = 1"
        } else {
            "SELECT * FROM documents WHERE knowledge_base_id = ?"
        };
        let rows = sqlx::query(query)
            .bind(knowledge_base_id.to_string())
            .fetch_all(&self.pool)
            .await
            .map_err(|e| PipelineError::backend_fault_with_source("sqlite", "list documents failed", e.into()))?;
        rows.iter().map(document_from_row).collect()
    }

    async fn replace_chunks(&self, document_id: Uuid, chunks: &[Chunk]) -> Result<()> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| PipelineError::backend_fault_with_source("sqlite", "begin transaction failed", e.into()))?;

        sqlx::query("DELETE FROM chunks WHERE document_id = ?")
            .bind(document_id.to_string())
            .execute(&mut *tx)
            .await
            .map_err(|e| PipelineError::backend_fault_with_source("sqlite", "delete chunks failed", e.into()))?;

        for chunk in chunks {
            sqlx::query(
                "INSERT INTO chunks \
                 (id, document_id, idx, content, start_char, end_char, content_hash, embedding_model, vector_id, \
                  text_id, created_at) \
                 VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
            )
            .bind(chunk.id.to_string())
            .bind(chunk.document_id.to_string())
            .bind(i64::try_from(chunk.index).unwrap_or(0))
            .bind(&chunk.content)
            .bind(chunk.start_char.map(|v| i64::try_from(v).unwrap_or(0)))
            .bind(chunk.end_char.map(|v| i64::try_from(v).unwrap_or(0)))
            .bind(&chunk.content_hash)
            .bind(&chunk.embedding_model)
            .bind(&chunk.vector_id)
            .bind(&chunk.text_id)
            .bind(chunk.created_at.to_rfc3339())
            .execute(&mut *tx)
            .await
            .map_err(|e| PipelineError::backend_fault_with_source("sqlite", "insert chunk failed", e.into()))?;
        }

        tx.commit()
            .await
            .map_err(|e| PipelineError::backend_fault_with_source("sqlite", "commit transaction failed", e.into()))?;
        Ok(())
    }

    async fn list_chunks(&self, document_id: Uuid) -> Result<Vec<Chunk>> {
        let rows = sqlx::query("SELECT * FROM chunks WHERE document_id = ? ORDER BY idx ASC")
            .bind(document_id.to_string())
            .fetch_all(&self.pool)
            .await
            .map_err(|e| PipelineError::backend_fault_with_source("sqlite", "list chunks failed", e.into()))?;
        rows.iter().map(chunk_from_row).collect()
    }

    async fn get_chunks(&self, ids: &[Uuid]) -> Result<Vec<Chunk>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let placeholders = std::iter::repeat("?").take(ids.len()).collect::<Vec<_>>().join(", ");
        let sql = format!("SELECT * FROM chunks WHERE id IN ({placeholders})");
        let mut query = sqlx::query(&sql);
        for id in ids {
            query = query.bind(id.to_string());
        }
        let rows = query
            .fetch_all(&self.pool)
            .await
            .map_err(|e| PipelineError::backend_fault_with_source("sqlite", "get chunks failed", e.into()))?;
        let mut by_id = std::collections::HashMap::new();
        for row in &rows {
            let chunk = chunk_from_row(row)?;
            by_id.insert(chunk.id, chunk);
        }
        Ok(ids.iter().filter_map(|id| by_id.remove(id)).collect())
    }

    async fn create_run(&self, run: &PipelineRun) -> Result<()> {
        let config_json = serde_json::to_string(&run.config_snapshot)
            .map_err(|e| PipelineError::internal(format!("failed to serialize run config: {e}")))?;

        sqlx::query(
            "INSERT INTO pipeline_runs \
             (id, knowledge_base_id, document_id, kind, status, config_json, error_code, error_message, \
              started_at, completed_at) \
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(run.id.to_string())
        .bind(run.knowledge_base_id.to_string())
        .bind(run.document_id.map(|id| id.to_string()))
        .bind(run_kind_str(run.kind))
        .bind(run_status_str(run.status))
        .bind(config_json)
        .bind(&run.error_code)
        .bind(&run.error_message)
        .bind(run.started_at.to_rfc3339())
        .bind(run.completed_at.map(|t| t.to_rfc3339()))
        .execute(&self.pool)
        .await
        .map_err(|e| PipelineError::backend_fault_with_source("sqlite", "insert run failed", e.into()))?;
        Ok(())
    }

    async fn complete_run(
        &self,
        id: Uuid,
        status: RunStatus,
        result_snapshot: serde_json::Value,
        error_code: Option<String>,
        error_message: Option<String>,
    ) -> Result<()> {
        let result_json = serde_json::to_string(&result_snapshot)
            .map_err(|e| PipelineError::internal(format!("failed to serialize run result: {e}")))?;

        sqlx::query(
            "UPDATE pipeline_runs SET status = ?, result_json = ?, error_code = ?, error_message = ?, \
             completed_at = ? WHERE id = ?",
        )
        .bind(run_status_str(status))
        .bind(result_json)
        .bind(error_code)
        .bind(error_message)
        .bind(Utc::now().to_rfc3339())
        .bind(id.to_string())
        .execute(&self.pool)
        .await
        .map_err(|e| PipelineError::backend_fault_with_source("sqlite", "complete run failed", e.into()))?;
        Ok(())
    }

    async fn get_run(&self, id: Uuid) -> Result<PipelineRun> {
        let row = sqlx::query("SELECT * FROM pipeline_runs WHERE id = ?")
            .bind(id.to_string())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| PipelineError::backend_fault_with_source("sqlite", "select run failed", e.into()))?
            .ok_or_else(|| PipelineError::not_found("pipeline_run", id.to_string()))?;
        run_from_row(&row)
    }

    async fn list_runs(&self, knowledge_base_id: Uuid, kind: Option<RunKind>) -> Result<Vec<PipelineRun>> {
        let rows = if let Some(kind) = kind {
            sqlx::query(
                "SELECT * FROM pipeline_runs WHERE knowledge_base_id = ? AND kind = ? ORDER BY started_at DESC",
            )
            .bind(knowledge_base_id.to_string())
            .bind(run_kind_str(kind))
            .fetch_all(&self.pool)
            .await
        } else {
            sqlx::query("SELECT * FROM pipeline_runs WHERE knowledge_base_id = ? ORDER BY started_at DESC")
                .bind(knowledge_base_id.to_string())
                .fetch_all(&self.pool)
                .await
        }
        .map_err(|e| PipelineError::backend_fault_with_source("sqlite", "list runs failed", e.into()))?;
        rows.iter().map(run_from_row).collect()
    }
}
