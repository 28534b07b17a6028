//! HNSW-backed vector indexer, one `hnsw_rs` graph per collection.
//! `hnsw_rs` is generic over its distance function, so each collection
//! owns one of three concrete graphs selected by [`VectorMetric`] —
//! there is no single type that can hold all three, so dispatch is by
//! `match` rather than a trait object.

use super::{CollectionKey, IndexHit, VectorRecord, VectorStorage};
use crate::error::{PipelineError, Result};
use async_trait::async_trait;
use dashmap::DashMap;
use hnsw_rs::prelude::*;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};

const MAX_NB_CONNECTION: usize = 24;
const EF_CONSTRUCTION: usize = 200;
const EF_SEARCH: usize = 64;
const MAX_LAYER: usize = 16;
const CAPACITY_HINT: usize = 100_000;

/// Distance metric a collection's HNSW graph is built with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VectorMetric {
    /// Euclidean distance; smaller is more similar.
    L2,
    /// Dot product; larger is more similar.
    InnerProduct,
    /// 1 minus cosine similarity; smaller is more similar.
    Cosine,
}

impl Default for VectorMetric {
    fn default() -> Self {
        Self::Cosine
    }
}

enum Graph {
    L2(Hnsw<'static, f32, DistL2>),
    Dot(Hnsw<'static, f32, DistDot>),
    Cosine(Hnsw<'static, f32, DistCosine>),
}

impl Graph {
    fn new(metric: VectorMetric) -> Self {
        match metric {
            VectorMetric::L2 => Self::L2(Hnsw::new(
                MAX_NB_CONNECTION,
                CAPACITY_HINT,
                MAX_LAYER,
                EF_CONSTRUCTION,
                DistL2 {},
            )),
            VectorMetric::InnerProduct => Self::Dot(Hnsw::new(
                MAX_NB_CONNECTION,
                CAPACITY_HINT,
                MAX_LAYER,
                EF_CONSTRUCTION,
                DistDot {},
            )),
            VectorMetric::Cosine => Self::Cosine(Hnsw::new(
                MAX_NB_CONNECTION,
                CAPACITY_HINT,
                MAX_LAYER,
                EF_CONSTRUCTION,
                DistCosine {},
            )),
        }
    }

    fn insert(&self, vector: &[f32], internal_id: usize) {
        match self {
            Self::L2(g) => g.insert((vector, internal_id)),
            Self::Dot(g) => g.insert((vector, internal_id)),
            Self::Cosine(g) => g.insert((vector, internal_id)),
        }
    }

    fn search(&self, vector: &[f32], top_k: usize) -> Vec<(usize, f32)> {
        match self {
            Self::L2(g) => g
                .search(vector, top_k, EF_SEARCH)
                .into_iter()
                .map(|n| (n.d_id, n.distance))
                .collect(),
            Self::Dot(g) => g
                .search(vector, top_k, EF_SEARCH)
                .into_iter()
                .map(|n| (n.d_id, n.distance))
                .collect(),
            Self::Cosine(g) => g
                .search(vector, top_k, EF_SEARCH)
                .into_iter()
                .map(|n| (n.d_id, n.distance))
                .collect(),
        }
    }
}

fn score_from_distance(metric: VectorMetric, distance: f32) -> f32 {
    match metric {
        VectorMetric::L2 => 1.0 / (1.0 + distance),
        VectorMetric::InnerProduct | VectorMetric::Cosine => 1.0 - distance,
    }
}

struct Collection {
    metric: VectorMetric,
    dimension: usize,
    graph: RwLock<Graph>,
    next_internal_id: AtomicUsize,
    chunk_to_internal: RwLock<HashMap<String, usize>>,
    internal_to_chunk: RwLock<HashMap<usize, String>>,
    deleted: RwLock<std::collections::HashSet<usize>>,
}

impl Collection {
    fn new(metric: VectorMetric, dimension: usize) -> Self {
        Self {
            metric,
            dimension,
            graph: RwLock::new(Graph::new(metric)),
            next_internal_id: AtomicUsize::new(0),
            chunk_to_internal: RwLock::new(HashMap::new()),
            internal_to_chunk: RwLock::new(HashMap::new()),
            deleted: RwLock::new(std::collections::HashSet::new()),
        }
    }
}

/// HNSW-backed implementation of [`VectorStorage`].
///
/// Deletion is soft: `hnsw_rs` does not support node removal, so
/// deleted chunk ids are tracked in a tombstone set and filtered out of
/// search results. A collection that accumulates many tombstones should
/// eventually be rebuilt; that maintenance operation is out of scope
/// here (see design note on compaction).
pub struct HnswVectorIndexer {
    collections: DashMap<String, Collection>,
}

impl HnswVectorIndexer {
    /// Create an empty indexer with no collections.
    #[must_use]
    pub fn new() -> Self {
        Self {
            collections: DashMap::new(),
        }
    }
}

impl Default for HnswVectorIndexer {
    fn default() -> Self {
        Self::new()
    }
}

/// Alias kept for call sites that refer to "the vector indexer" in the
/// abstract; the concrete backend is [`HnswVectorIndexer`].
pub type VectorIndexer = HnswVectorIndexer;

#[async_trait]
impl VectorStorage for HnswVectorIndexer {
    async fn ensure_collection(&self, key: &CollectionKey, dimension: usize, metric: VectorMetric) -> Result<()> {
        let namespace = key.namespace();
        if let Some(existing) = self.collections.get(&namespace) {
            if existing.dimension != dimension {
                return Err(PipelineError::validation(format!(
                    "collection '{namespace}' already exists with dimension {}, got {dimension}",
                    existing.dimension
                )));
            }
            return Ok(());
        }
        self.collections.insert(namespace, Collection::new(metric, dimension));
        Ok(())
    }

    async fn index(&self, key: &CollectionKey, records: &[VectorRecord]) -> Result<()> {
        let namespace = key.namespace();
        let collection = self
            .collections
            .get(&namespace)
            .ok_or_else(|| PipelineError::not_found("vector_collection", &namespace))?;

        for record in records {
            if record.vector.len() != collection.dimension {
                return Err(PipelineError::validation(format!(
                    "vector for chunk '{}' has dimension {}, collection expects {}",
                    record.chunk_id,
                    record.vector.len(),
                    collection.dimension
                )));
            }
        }

        let graph = collection.graph.write();
        for record in records {
            let internal_id = collection.next_internal_id.fetch_add(1, Ordering::SeqCst);
            graph.insert(&record.vector, internal_id);
            collection
                .chunk_to_internal
                .write()
                .insert(record.chunk_id.clone(), internal_id);
            collection
                .internal_to_chunk
                .write()
                .insert(internal_id, record.chunk_id.clone());
        }
        Ok(())
    }

    async fn search(&self, key: &CollectionKey, query: &[f32], top_k: usize) -> Result<Vec<IndexHit>> {
        let namespace = key.namespace();
        let collection = self
            .collections
            .get(&namespace)
            .ok_or_else(|| PipelineError::not_found("vector_collection", &namespace))?;

        if query.len() != collection.dimension {
            return Err(PipelineError::validation(format!(
                "query vector has dimension {}, collection expects {}",
                query.len(),
                collection.dimension
            )));
        }

        let deleted = collection.deleted.read();
        let over_fetch = top_k + deleted.len();
        let raw = collection.graph.read().search(query, over_fetch.max(top_k));
        let internal_to_chunk = collection.internal_to_chunk.read();

        let mut hits = Vec::with_capacity(top_k);
        for (internal_id, distance) in raw {
            if deleted.contains(&internal_id) {
                continue;
            }
            let Some(chunk_id) = internal_to_chunk.get(&internal_id) else {
                continue;
            };
            hits.push(IndexHit {
                chunk_id: chunk_id.clone(),
                score: score_from_distance(collection.metric, distance),
            });
            if hits.len() == top_k {
                break;
            }
        }
        Ok(hits)
    }

    async fn delete(&self, key: &CollectionKey, chunk_id: &str) -> Result<()> {
        let namespace = key.namespace();
        let collection = self
            .collections
            .get(&namespace)
            .ok_or_else(|| PipelineError::not_found("vector_collection", &namespace))?;
        if let Some(internal_id) = collection.chunk_to_internal.write().remove(chunk_id) {
            collection.internal_to_chunk.write().remove(&internal_id);
            collection.deleted.write().insert(internal_id);
        }
        Ok(())
    }

    async fn delete_collection(&self, key: &CollectionKey) -> Result<()> {
        self.collections.remove(&key.namespace());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key() -> CollectionKey {
        CollectionKey::new("tenant-a", "kb-1")
    }

    #[tokio::test]
    async fn ensure_collection_is_idempotent() {
        let indexer = HnswVectorIndexer::new();
        indexer.ensure_collection(&key(), 4, VectorMetric::Cosine).await.unwrap();
        indexer.ensure_collection(&key(), 4, VectorMetric::Cosine).await.unwrap();
    }

    #[tokio::test]
    async fn ensure_collection_rejects_dimension_mismatch() {
        let indexer = HnswVectorIndexer::new();
        indexer.ensure_collection(&key(), 4, VectorMetric::Cosine).await.unwrap();
        let err = indexer.ensure_collection(&key(), 8, VectorMetric::Cosine).await.unwrap_err();
        assert_eq!(err.code(), "validation");
    }

    #[tokio::test]
    async fn index_and_search_roundtrips() {
        let indexer = HnswVectorIndexer::new();
        indexer.ensure_collection(&key(), 3, VectorMetric::Cosine).await.unwrap();
        indexer
            .index(
                &key(),
                &[
                    VectorRecord {
                        chunk_id: "c1".to_string(),
                        vector: vec![1.0, 0.0, 0.0],
                    },
                    VectorRecord {
                        chunk_id: "c2".to_string(),
                        vector: vec![0.0, 1.0, 0.0],
                    },
                ],
            )
            .await
            .unwrap();

        let hits = indexer.search(&key(), &[1.0, 0.0, 0.0], 1).await.unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].chunk_id, "c1");
    }

    #[tokio::test]
    async fn search_excludes_deleted_chunks() {
        let indexer = HnswVectorIndexer::new();
        indexer.ensure_collection(&key(), 2, VectorMetric::Cosine).await.unwrap();
        indexer
            .index(
                &key(),
                &[VectorRecord {
                    chunk_id: "c1".to_string(),
                    vector: vec![1.0, 0.0],
                }],
            )
            .await
            .unwrap();
        indexer.delete(&key(), "c1").await.unwrap();
        let hits = indexer.search(&key(), &[1.0, 0.0], 5).await.unwrap();
        assert!(hits.is_empty());
    }

    #[tokio::test]
    async fn search_unknown_collection_is_not_found() {
        let indexer = HnswVectorIndexer::new();
        let err = indexer.search(&key(), &[1.0], 1).await.unwrap_err();
        assert_eq!(err.code(), "not_found");
    }
}
