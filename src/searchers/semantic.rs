//! Vector-only searcher: delegates directly to [`VectorStorage`].

use super::{SearchQuery, SearchResult, Searcher};
use crate::error::{PipelineError, Result};
use crate::indexers::VectorStorage;
use async_trait::async_trait;
use std::sync::Arc;

/// Searches a single vector collection.
pub struct SemanticSearcher {
    storage: Arc<dyn VectorStorage>,
}

impl SemanticSearcher {
    /// Create a searcher over the given vector storage backend.
    #[must_use]
    pub fn new(storage: Arc<dyn VectorStorage>) -> Self {
        Self { storage }
    }
}

#[async_trait]
impl Searcher for SemanticSearcher {
    async fn search(&self, query: &SearchQuery) -> Result<Vec<SearchResult>> {
        let vector = query.vector.as_ref().ok_or_else(|| {
            PipelineError::validation("semantic search requires a pre-embedded query vector")
        })?;
        let hits = self
            .storage
            .search(&query.collection, vector, query.top_k)
            .await?;

        Ok(hits
            .into_iter()
            .enumerate()
            .map(|(rank, hit)| SearchResult {
                chunk_id: hit.chunk_id,
                score: hit.score,
                rank,
                partial_lexical_failure: false,
                content: None,
                original_score: None,
            })
            .collect())
    }

    fn name(&self) -> &'static str {
        "semantic"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::indexers::{CollectionKey, HnswVectorIndexer, VectorMetric, VectorRecord};

    #[tokio::test]
    async fn requires_a_query_vector() {
        let storage = Arc::new(HnswVectorIndexer::new());
        let searcher = SemanticSearcher::new(storage);
        let query = SearchQuery {
            collection: CollectionKey::new("t", "kb"),
            text: "hello".to_string(),
            vector: None,
            top_k: 5,
        };
        assert!(searcher.search(&query).await.is_err());
    }

    #[tokio::test]
    async fn returns_ranked_results() {
        let storage = Arc::new(HnswVectorIndexer::new());
        storage
            .ensure_collection(&CollectionKey::new("t", "kb"), 2, VectorMetric::Cosine)
            .await
            .unwrap();
        storage
            .index(
                &CollectionKey::new("t", "kb"),
                &[VectorRecord {
                    chunk_id: "c1".to_string(),
                    vector: vec![1.0, 0.0],
                }],
            )
            .await
            .unwrap();

        let searcher = SemanticSearcher::new(storage);
        let query = SearchQuery {
            collection: CollectionKey::new("t", "kb"),
            text: "hello".to_string(),
            vector: Some(vec![1.0, 0.0]),
            top_k: 5,
        };
        let results = searcher.search(&query).await.unwrap();
        assert_eq!(results[0].chunk_id, "c1");
        assert_eq!(results[0].rank, 0);
    }
}
