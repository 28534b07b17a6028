//! Data model: [`KnowledgeBase`], [`Document`], [`Chunk`], [`PipelineRun`].

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A tenant-scoped collection of documents sharing one embedding
/// dimension and one set of configured pipeline components.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KnowledgeBase {
    /// Primary key.
    pub id: Uuid,
    /// Owning tenant.
    pub tenant_id: String,
    /// Display name.
    pub name: String,
    /// Embedding dimension every document's chunks are indexed at.
    /// Fixed at creation; changing the embedder later requires a new
    /// knowledge base.
    pub embedding_dimension: usize,
    /// Adapter type name for SSOT sync, if this knowledge base has one
    /// configured (see [`crate::blob::SourceAdapter::source_type`]).
    pub ssot_source_type: Option<String>,
    /// Default ingestion/retrieval component configs for this knowledge
    /// base, applied when a caller doesn't pass an explicit config.
    pub defaults_json: serde_json::Value,
    /// Aggregate count of non-tombstoned documents, computed via a join
    /// each time the knowledge base is read rather than stored and kept
    /// in sync on every document write.
    pub document_count: i64,
    /// Aggregate count of chunks across all of this knowledge base's
    /// documents.
    pub chunk_count: i64,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
}

/// A document's lifecycle state: `Pending -> Processing -> {Indexed,
/// Failed}`, with `Indexed`/`Failed` both re-enterable via `Processing`
/// for re-ingestion or retry, or via `Pending` when SSOT sync detects
/// that the source content changed underneath an already-processed
/// document and the next pipeline run needs to start from scratch.
/// SSOT deletions also land on `Failed` (with [`Document::tombstoned`]
/// set) rather than a dedicated deleted state, so that existing "failed
/// documents need attention" consumer queries keep working — the dual
/// use is intentional, not an oversight.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DocumentStatus {
    /// Accepted, not yet parsed/chunked/embedded/indexed.
    Pending,
    /// Ingestion pipeline is currently running for this document.
    Processing,
    /// All chunks indexed successfully; searchable.
    Indexed,
    /// Ingestion failed, or the document was tombstoned by SSOT sync;
    /// not searchable. Retried or re-ingested by transitioning back to
    /// `Processing`.
    Failed,
}

impl DocumentStatus {
    /// Whether `self -> next` is a legal transition.
    #[must_use]
    pub const fn can_transition_to(self, next: Self) -> bool {
        matches!(
            (self, next),
            (Self::Pending, Self::Processing)
                | (Self::Processing, Self::Indexed)
                | (Self::Processing, Self::Failed)
                | (Self::Indexed, Self::Processing)
                | (Self::Indexed, Self::Failed)
                | (Self::Indexed, Self::Pending)
                | (Self::Failed, Self::Processing)
                | (Self::Failed, Self::Pending)
        )
    }
}

/// A single ingested document within a knowledge base.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Document {
    /// Primary key.
    pub id: Uuid,
    /// Owning knowledge base.
    pub knowledge_base_id: Uuid,
    /// Original filename, used for parser dispatch.
    pub filename: String,
    /// SHA-256 content hash, hex-encoded. Unique per
    /// `knowledge_base_id` across all documents, tombstoned or not —
    /// the checksum slot is never freed.
    pub checksum: String,
    /// Whether this document came from a synced SSOT source rather
    /// than a direct user upload. SSOT documents take precedence on a
    /// checksum collision.
    pub is_ssot: bool,
    /// External id (source path) at the SSOT source, if `is_ssot`.
    pub source_external_id: Option<String>,
    /// Canonical blob storage location of the raw content.
    pub blob_uri: String,
    /// Detected file type (lowercased extension, e.g. `"pdf"`, or
    /// `"unknown"` when the filename carries none).
    pub file_type: String,
    /// Raw content size in bytes, as stored in the blob.
    pub size: i64,
    /// Number of chunks produced by the most recent successful
    /// ingestion. Zero until the document reaches `Indexed`.
    pub chunk_count: i64,
    /// Parser-contributed document-level metadata (title, detected
    /// delimiter, etc.), persisted verbatim from [`crate::parsers::ParsedDocument::metadata`].
    pub metadata: serde_json::Value,
    /// Current lifecycle state.
    pub status: DocumentStatus,
    /// Monotonically increasing version, bumped on every re-ingestion
    /// of the same document (same id, new content/checksum).
    pub version: u32,
    /// Set by SSOT sync when the source object has disappeared from
    /// the current enumeration. Documents are never hard-deleted
    /// through the sync path.
    pub tombstoned: bool,
    /// Set when `status == Failed`.
    pub error_message: Option<String>,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Last status-change timestamp.
    pub updated_at: DateTime<Utc>,
}

/// A persisted chunk of a document's parsed content.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Chunk {
    /// Primary key.
    pub id: Uuid,
    /// Owning document.
    pub document_id: Uuid,
    /// 0-based index within the document.
    pub index: usize,
    /// Chunk text.
    pub content: String,
    /// Start char offset into the parsed document text, if known.
    pub start_char: Option<usize>,
    /// End char offset (exclusive), if known.
    pub end_char: Option<usize>,
    /// SHA-256 hash of `content`, hex-encoded. Lets a caller detect an
    /// unchanged chunk across re-ingestion without re-embedding it.
    pub content_hash: String,
    /// Name of the embedder that produced this chunk's vector.
    pub embedding_model: String,
    /// Id under which this chunk's vector is stored in the vector
    /// backend (see [`crate::indexers::VectorRecord::chunk_id`]).
    pub vector_id: String,
    /// Id under which this chunk's text is stored in the text backend
    /// (see [`crate::indexers::TextRecord::chunk_id`]).
    pub text_id: String,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
}

/// What kind of pipeline a [`PipelineRun`] records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunKind {
    /// Parse -> chunk -> embed -> index for one document.
    Ingestion,
    /// Embed query -> search -> optimize for one request.
    Retrieval,
    /// SSOT classification sweep for a knowledge base.
    Sync,
}

/// A [`PipelineRun`]'s lifecycle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    /// Accepted, not yet started.
    Pending,
    /// Currently executing.
    Running,
    /// Completed without error.
    Succeeded,
    /// Completed with a recorded, non-boundary error. Validation and
    /// not-found errors are boundary-only and are never recorded here
    /// (see `PipelineError::is_boundary_only`).
    Failed,
}

/// An audit record of one pipeline execution.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineRun {
    /// Primary key.
    pub id: Uuid,
    /// Owning knowledge base.
    pub knowledge_base_id: Uuid,
    /// Document this run processed, for `Ingestion` runs.
    pub document_id: Option<Uuid>,
    /// Which kind of pipeline this run recorded.
    pub kind: RunKind,
    /// Current status.
    pub status: RunStatus,
    /// The pipeline config this run was invoked with, persisted
    /// verbatim for audit.
    pub config_snapshot: serde_json::Value,
    /// Result summary (counters, metrics), set once the run reaches a
    /// terminal status.
    pub result_snapshot: Option<serde_json::Value>,
    /// Stable error code (`PipelineError::code()`), set iff `status ==
    /// Failed`.
    pub error_code: Option<String>,
    /// Human-readable error detail, set iff `status == Failed`.
    pub error_message: Option<String>,
    /// When the run was created.
    pub started_at: DateTime<Utc>,
    /// When the run reached a terminal status, if it has.
    pub completed_at: Option<DateTime<Utc>>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn legal_transitions_are_allowed() {
        assert!(DocumentStatus::Pending.can_transition_to(DocumentStatus::Processing));
        assert!(DocumentStatus::Processing.can_transition_to(DocumentStatus::Indexed));
        assert!(DocumentStatus::Indexed.can_transition_to(DocumentStatus::Failed));
    }

    #[test]
    fn failed_and_indexed_are_both_re_enterable() {
        assert!(DocumentStatus::Failed.can_transition_to(DocumentStatus::Processing));
        assert!(DocumentStatus::Indexed.can_transition_to(DocumentStatus::Processing));
    }

    #[test]
    fn ssot_content_change_can_reset_a_processed_document_to_pending() {
        assert!(DocumentStatus::Indexed.can_transition_to(DocumentStatus::Pending));
        assert!(DocumentStatus::Failed.can_transition_to(DocumentStatus::Pending));
    }

    #[test]
    fn cannot_skip_processing() {
        assert!(!DocumentStatus::Pending.can_transition_to(DocumentStatus::Indexed));
    }
}
