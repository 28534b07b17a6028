//! Hybrid searcher: fans out to the vector and text legs concurrently
//! via `tokio::join!`, fuses with Reciprocal Rank Fusion, and degrades
//! to whichever leg succeeded if the other one faults rather than
//! failing the whole search.

use super::{reciprocal_rank_fusion, SearchQuery, SearchResult, Searcher};
use crate::error::{PipelineError, Result};
use crate::indexers::{TextStorage, VectorStorage};
use async_trait::async_trait;
use std::sync::Arc;
use tracing::warn;

const RRF_K: f32 = 60.0;

/// Fuses semantic and lexical search via Reciprocal Rank Fusion.
pub struct HybridSearcher {
    vector: Arc<dyn VectorStorage>,
    text: Arc<dyn TextStorage>,
    /// Weight assigned to the semantic leg; the lexical leg gets
    /// `1.0 - semantic_weight`.
    semantic_weight: f32,
}

impl HybridSearcher {
    /// Create a hybrid searcher over both backends with the given
    /// semantic-leg weight in `[0, 1]`.
    #[must_use]
    pub fn new(vector: Arc<dyn VectorStorage>, text: Arc<dyn TextStorage>, semantic_weight: f32) -> Self {
        Self {
            vector,
            text,
            semantic_weight: semantic_weight.clamp(0.0, 1.0),
        }
    }
}

#[async_trait]
impl Searcher for HybridSearcher {
    async fn search(&self, query: &SearchQuery) -> Result<Vec<SearchResult>> {
        let vector = query
            .vector
            .as_ref()
            .ok_or_else(|| PipelineError::validation("hybrid search requires a pre-embedded query vector"))?;

        let (semantic_outcome, lexical_outcome) = tokio::join!(
            self.vector.search(&query.collection, vector, query.top_k),
            self.text.search(&query.collection, &query.text, query.top_k),
        );

        let semantic_hits = match semantic_outcome {
            Ok(hits) => Some(hits),
            Err(e) => {
                warn!(error = %e, "semantic leg of hybrid search failed");
                None
            }
        };
        let lexical_hits = match lexical_outcome {
            Ok(hits) => Some(hits),
            Err(e) => {
                warn!(error = %e, "lexical leg of hybrid search failed");
                None
            }
        };

        if semantic_hits.is_none() && lexical_hits.is_none() {
            return Err(PipelineError::backend_fault(
                "hybrid_searcher",
                "both semantic and lexical legs failed",
            ));
        }

        let to_ranked = |hits: Vec<crate::indexers::IndexHit>| -> Vec<SearchResult> {
            hits.into_iter()
                .enumerate()
                .map(|(rank, hit)| SearchResult {
                    chunk_id: hit.chunk_id,
                    score: hit.score,
                    rank,
                    partial_lexical_failure: false,
                    content: None,
                    original_score: None,
                })
                .collect()
        };

        let partial_failure = semantic_hits.is_none() || lexical_hits.is_none();

        let mut lists = Vec::new();
        if let Some(hits) = semantic_hits {
            lists.push((to_ranked(hits), self.semantic_weight));
        }
        if let Some(hits) = lexical_hits {
            lists.push((to_ranked(hits), 1.0 - self.semantic_weight));
        }

        let mut fused = reciprocal_rank_fusion(&lists, RRF_K);
        fused.truncate(query.top_k);
        if partial_failure {
            for result in &mut fused {
                result.partial_lexical_failure = true;
            }
        }
        Ok(fused)
    }

    fn name(&self) -> &'static str {
        "hybrid"
    }
}
