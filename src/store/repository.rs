//! Repository trait: the only way the rest of the engine touches the
//! metadata store.

use super::models::{Chunk, Document, DocumentStatus, KnowledgeBase, PipelineRun, RunKind, RunStatus};
use crate::error::Result;
use async_trait::async_trait;
use uuid::Uuid;

/// Metadata persistence contract. One implementation ([`super::SqliteRepository`])
/// is provided; the trait exists so orchestrators and tests can swap in
/// an in-memory fake without touching call sites.
#[async_trait]
pub trait Repository: Send + Sync {
    /// Create a knowledge base.
    async fn create_knowledge_base(&self, kb: &KnowledgeBase) -> Result<()>;

    /// Fetch a knowledge base by id.
    ///
    /// # Errors
    ///
    /// Returns `PipelineError::NotFound` if it doesn't exist.
    async fn get_knowledge_base(&self, id: Uuid) -> Result<KnowledgeBase>;

    /// Find a document by (knowledge base, checksum), the lookup the
    /// ingestion orchestrator uses to detect duplicates. The checksum
    /// slot is occupied regardless of status, tombstoned or not.
    async fn find_document_by_checksum(
        &self,
        knowledge_base_id: Uuid,
        checksum: &str,
    ) -> Result<Option<Document>>;

    /// Fetch a document by id.
    ///
    /// # Errors
    ///
    /// Returns `PipelineError::NotFound` if it doesn't exist.
    async fn get_document(&self, id: Uuid) -> Result<Document>;

    /// Insert a new document row.
    async fn insert_document(&self, document: &Document) -> Result<()>;

    /// Update an existing document's mutable fields (status, version,
    /// checksum, error_message, blob_uri, updated_at).
    ///
    /// # Errors
    ///
    /// Returns `PipelineError::Internal` if `next.status` is not a
    /// legal transition from the document's current stored status.
    async fn update_document(&self, document: &Document) -> Result<()>;

    /// List documents in a knowledge base, optionally restricted to
    /// SSOT documents only (used by the sync sweep to detect
    /// deletions).
    async fn list_documents(&self, knowledge_base_id: Uuid, ssot_only: bool) -> Result<Vec<Document>>;

    /// Replace all chunks for a document atomically (delete then
    /// insert, within one transaction).
    async fn replace_chunks(&self, document_id: Uuid, chunks: &[Chunk]) -> Result<()>;

    /// List a document's chunks in index order.
    async fn list_chunks(&self, document_id: Uuid) -> Result<Vec<Chunk>>;

    /// Fetch chunks by id, preserving the order of `ids`. Missing ids
    /// are silently omitted rather than erroring, since a chunk can be
    /// deleted between a search and an enrichment lookup.
    async fn get_chunks(&self, ids: &[Uuid]) -> Result<Vec<Chunk>>;

    /// Create a pipeline run in `Pending` status.
    async fn create_run(&self, run: &PipelineRun) -> Result<()>;

    /// Transition a run to a terminal status, recording its result
    /// snapshot and, iff `status == Failed`, an error code/message.
    async fn complete_run(
        &self,
        id: Uuid,
        status: RunStatus,
        result_snapshot: serde_json::Value,
        error_code: Option<String>,
        error_message: Option<String>,
    ) -> Result<()>;

    /// Fetch a run by id.
    ///
    /// # Errors
    ///
    /// Returns `PipelineError::NotFound` if it doesn't exist.
    async fn get_run(&self, id: Uuid) -> Result<PipelineRun>;

    /// List runs for a knowledge base, most recent first, optionally
    /// filtered by kind.
    async fn list_runs(&self, knowledge_base_id: Uuid, kind: Option<RunKind>) -> Result<Vec<PipelineRun>>;
}

/// Helper re-exported for implementations to validate a status
/// transition before writing it.
pub(crate) fn validate_transition(from: DocumentStatus, to: DocumentStatus) -> Result<()> {
    if from == to || from.can_transition_to(to) {
        Ok(())
    } else {
        Err(crate::error::PipelineError::internal(format!(
            "illegal document status transition {from:?} -> {to:?}"
        )))
    }
}
