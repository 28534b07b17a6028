//! Indexers: persist chunk vectors and lexical postings behind
//! tenant/knowledge-base-namespaced collections. Two independent
//! backends — [`vector`] (approximate nearest neighbor via HNSW) and
//! [`text`] (inverted index with BM25 scoring) — since
//! `searchers::hybrid` fans out to both concurrently.

mod text;
mod vector;

pub use text::{InvertedTextIndexer, TextIndexer};
pub use vector::{HnswVectorIndexer, VectorIndexer, VectorMetric};

use crate::error::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// One scored hit returned by an indexer's `search`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexHit {
    /// Chunk identifier.
    pub chunk_id: String,
    /// Backend-native score. Vector backends return a similarity in
    /// `[-1, 1]` or `[0, 1]` depending on metric; text backends return
    /// an unbounded BM25 score. Callers normalize before combining.
    pub score: f32,
}

/// A vector to index, paired with the chunk id it represents.
#[derive(Debug, Clone)]
pub struct VectorRecord {
    /// Chunk identifier.
    pub chunk_id: String,
    /// Dense embedding vector.
    pub vector: Vec<f32>,
}

/// A lexical document to index, paired with the chunk id it represents.
#[derive(Debug, Clone)]
pub struct TextRecord {
    /// Chunk identifier.
    pub chunk_id: String,
    /// Chunk text content.
    pub content: String,
}

/// Identifies a single collection: one per (tenant, knowledge base).
/// Both indexer backends namespace all state under this key so a
/// `delete_collection` call can never leak across tenants.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CollectionKey {
    /// Tenant identifier.
    pub tenant_id: String,
    /// Knowledge base identifier.
    pub knowledge_base_id: String,
}

impl CollectionKey {
    /// Build a collection key.
    #[must_use]
    pub fn new(tenant_id: impl Into<String>, knowledge_base_id: impl Into<String>) -> Self {
        Self {
            tenant_id: tenant_id.into(),
            knowledge_base_id: knowledge_base_id.into(),
        }
    }

    fn namespace(&self) -> String {
        format!("{}:{}", self.tenant_id, self.knowledge_base_id)
    }
}

/// Vector storage contract: dense-vector indexing and ANN search.
#[async_trait]
pub trait VectorStorage: Send + Sync {
    /// Idempotently ensure a collection exists for `key` at the given
    /// vector `dimension` and distance `metric`. A second call with the
    /// same dimension and metric is a no-op; a call with a different
    /// dimension is a validation error.
    ///
    /// # Errors
    ///
    /// Returns `PipelineError::Validation` on a dimension mismatch.
    async fn ensure_collection(&self, key: &CollectionKey, dimension: usize, metric: VectorMetric) -> Result<()>;

    /// Index a batch of vectors atomically: either all are visible to
    /// subsequent searches or none are (on error, none are).
    ///
    /// # Errors
    ///
    /// Returns `PipelineError::Validation` if any vector's length
    /// disagrees with the collection's configured dimension, or
    /// `PipelineError::NotFound` if the collection doesn't exist.
    async fn index(&self, key: &CollectionKey, records: &[VectorRecord]) -> Result<()>;

    /// Return the `top_k` nearest chunks to `query` by the collection's
    /// configured metric.
    ///
    /// # Errors
    ///
    /// Returns `PipelineError::NotFound` if the collection doesn't
    /// exist, `PipelineError::Validation` if `query`'s length disagrees
    /// with the collection's dimension.
    async fn search(&self, key: &CollectionKey, query: &[f32], top_k: usize) -> Result<Vec<IndexHit>>;

    /// Remove a chunk's vector from the index, if present.
    ///
    /// # Errors
    ///
    /// Returns `PipelineError::NotFound` if the collection doesn't exist.
    async fn delete(&self, key: &CollectionKey, chunk_id: &str) -> Result<()>;

    /// Drop an entire collection and all its vectors.
    async fn delete_collection(&self, key: &CollectionKey) -> Result<()>;
}

/// Text storage contract: lexical indexing and BM25 search.
#[async_trait]
pub trait TextStorage: Send + Sync {
    /// Idempotently ensure a collection exists for `key`.
    async fn ensure_collection(&self, key: &CollectionKey) -> Result<()>;

    /// Index a batch of documents atomically.
    async fn index(&self, key: &CollectionKey, records: &[TextRecord]) -> Result<()>;

    /// Return the `top_k` highest-scoring chunks for `query` by BM25.
    ///
    /// # Errors
    ///
    /// Returns `PipelineError::NotFound` if the collection doesn't exist.
    async fn search(&self, key: &CollectionKey, query: &str, top_k: usize) -> Result<Vec<IndexHit>>;

    /// Remove a chunk's postings from the index, if present.
    async fn delete(&self, key: &CollectionKey, chunk_id: &str) -> Result<()>;

    /// Drop an entire collection and all its postings.
    async fn delete_collection(&self, key: &CollectionKey) -> Result<()>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn collection_keys_with_same_fields_are_equal() {
        let a = CollectionKey::new("t1", "kb1");
        let b = CollectionKey::new("t1", "kb1");
        assert_eq!(a, b);
        assert_eq!(a.namespace(), "t1:kb1");
    }

    #[test]
    fn collection_keys_differ_by_tenant() {
        let a = CollectionKey::new("t1", "kb1");
        let b = CollectionKey::new("t2", "kb1");
        assert_ne!(a, b);
    }
}
