//! Relational metadata store: knowledge bases, documents, chunks, and
//! pipeline runs, behind a thin [`Repository`] trait so the engine
//! never depends on `sqlx` directly outside this module — the same
//! "ORM-style mapping replaced by a thin repository interface" pattern
//! the ambient-stack design note calls for.

mod models;
mod repository;
mod sqlite;

pub use models::{
    Chunk as StoredChunk, Document, DocumentStatus, KnowledgeBase, PipelineRun, RunKind, RunStatus,
};
pub use repository::Repository;
pub use sqlite::SqliteRepository;
