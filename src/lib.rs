//! # ragcore
//!
//! Multi-tenant ingestion and hybrid retrieval pipeline engine for
//! Retrieval-Augmented Generation.
//!
//! This crate provides:
//! - A component registry with JSON-schema-validated factories for
//!   parsers, chunkers, embedders, indexers, searchers, and optimizers
//! - An ingestion orchestrator: parse -> chunk -> embed -> index
//! - A retrieval orchestrator: embed query -> search -> optimize
//! - An SSOT synchronizer that reconciles a knowledge base against an
//!   external source of truth
//! - Pluggable blob storage (`object_store`) and a `sqlx`-backed
//!   metadata store
//!
//! ## Architecture
//!
//! - `registry`: component factories and config schema validation
//! - `parsers`: document parsers (text, markdown, HTML, CSV, PDF, DOCX)
//! - `chunking`: chunking strategies (fixed, sentence, paragraph, semantic)
//! - `embeddings`: embedding models (local, remote)
//! - `indexers`: vector (HNSW) and text (inverted index) storage backends
//! - `searchers`: semantic, lexical, and hybrid (RRF) search
//! - `optimizers`: score threshold, deduplication, rerank, max-results
//! - `blob`: blob storage client and SSOT source adapters
//! - `store`: metadata store (knowledge bases, documents, chunks, runs)
//! - `pipeline`: the three orchestrators tying every module together
//! - `config`: process-level connection configuration
//! - `error`: the crate-wide error type

pub mod blob;
pub mod chunking;
pub mod config;
pub mod embeddings;
pub mod error;
pub mod indexers;
pub mod optimizers;
pub mod parsers;
pub mod pipeline;
pub mod registry;
pub mod searchers;
pub mod store;

/// Prelude for convenient imports.
pub mod prelude {
    pub use crate::blob::{BlobClient, BlobUri, ObjectStoreBlobClient, SourceAdapter, SourceItem};
    pub use crate::chunking::{Chunk, ChunkConfig, Chunker};
    pub use crate::config::EngineConfig;
    pub use crate::embeddings::EmbeddingModel;
    pub use crate::error::{PipelineError, Result};
    pub use crate::indexers::{CollectionKey, TextStorage, VectorStorage};
    pub use crate::parsers::Parser;
    pub use crate::pipeline::{
        DocumentInput, IngestionConfig, IngestionOrchestrator, IngestionOutcome, RetrievalConfig, RetrievalOrchestrator,
        RetrievalOutcome, SsotStrategy, SsotSynchronizer, SyncResult,
    };
    pub use crate::registry::Factory;
    pub use crate::store::{Document, DocumentStatus, KnowledgeBase, Repository, SqliteRepository};
}

/// Library version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn version_is_non_empty() {
        assert!(!VERSION.is_empty());
    }
}
