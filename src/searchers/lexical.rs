//! BM25-only searcher: delegates directly to [`TextStorage`].

use super::{SearchQuery, SearchResult, Searcher};
use crate::error::{PipelineError, Result};
use crate::indexers::TextStorage;
use async_trait::async_trait;
use std::sync::Arc;

/// Searches a single text collection.
pub struct LexicalSearcher {
    storage: Arc<dyn TextStorage>,
}

impl LexicalSearcher {
    /// Create a searcher over the given text storage backend.
    #[must_use]
    pub fn new(storage: Arc<dyn TextStorage>) -> Self {
        Self { storage }
    }
}

#[async_trait]
impl Searcher for LexicalSearcher {
    async fn search(&self, query: &SearchQuery) -> Result<Vec<SearchResult>> {
        if query.text.trim().is_empty() {
            return Err(PipelineError::validation("lexical search requires non-empty query text"));
        }
        let hits = self
            .storage
            .search(&query.collection, &query.text, query.top_k)
            .await?;

        // BM25 scores are unbounded, so normalize to [0, 1] by the top hit
        // to keep them comparable across queries and to other searchers.
        let max_score = hits.first().map_or(0.0, |hit| hit.score);

        Ok(hits
            .into_iter()
            .enumerate()
            .map(|(rank, hit)| SearchResult {
                chunk_id: hit.chunk_id,
                score: if max_score > 0.0 { hit.score / max_score } else { 0.0 },
                rank,
                partial_lexical_failure: false,
                content: None,
                original_score: None,
            })
            .collect())
    }

    fn name(&self) -> &'static str {
        "lexical"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::indexers::{CollectionKey, InvertedTextIndexer, TextRecord};

    #[tokio::test]
    async fn rejects_empty_query_text() {
        let storage = Arc::new(InvertedTextIndexer::new());
        let searcher = LexicalSearcher::new(storage);
        let query = SearchQuery {
            collection: CollectionKey::new("t", "kb"),
            text: "   ".to_string(),
            vector: None,
            top_k: 5,
        };
        assert!(searcher.search(&query).await.is_err());
    }

    #[tokio::test]
    async fn returns_ranked_results() {
        let storage = Arc::new(InvertedTextIndexer::new());
        storage.ensure_collection(&CollectionKey::new("t", "kb")).await.unwrap();
        storage
            .index(
                &CollectionKey::new("t", "kb"),
                &[TextRecord {
                    chunk_id: "c1".to_string(),
                    content: "the quick brown fox".to_string(),
                }],
            )
            .await
            .unwrap();

        let searcher = LexicalSearcher::new(storage);
        let query = SearchQuery {
            collection: CollectionKey::new("t", "kb"),
            text: "quick fox".to_string(),
            vector: None,
            top_k: 5,
        };
        let results = searcher.search(&query).await.unwrap();
        assert_eq!(results[0].chunk_id, "c1");
    }
}
