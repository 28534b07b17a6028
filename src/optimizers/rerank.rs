//! Rescales results by bi-encoder similarity between the query and each
//! result's content, as a placeholder for a true cross-encoder reranker
//! (none of the pack's dependencies ship one). Degrades to a passthrough
//! — original order and scores preserved — whenever it can't rerank: no
//! embedder configured, or a result missing `content`.

use super::{reassign_ranks, Optimizer};
use crate::embeddings::{cosine_similarity, EmbeddingModel};
use crate::error::Result;
use crate::searchers::SearchResult;
use async_trait::async_trait;
use std::sync::Arc;

/// Results beyond this rank, within the `with_content` group, are left
/// untouched when no explicit `top_n` is configured — rescoring the
/// whole result set costs one embedding call per result, which doesn't
/// pay for itself past the results a caller will actually look at.
const DEFAULT_TOP_N: usize = 20;

/// Rescales the top `top_n` results (by incoming rank) by similarity to
/// `query_vector`, recording the pre-rerank score in `original_score`.
/// Results past `top_n`, and any missing `content`, are appended
/// unchanged after the rescaled group.
pub struct RerankOptimizer {
    embedder: Option<Arc<dyn EmbeddingModel>>,
    query_vector: Option<Vec<f32>>,
    top_n: usize,
}

impl RerankOptimizer {
    /// Create a reranker. Passing `None` for either of `embedder` or
    /// `query_vector` makes every call a passthrough, which is the
    /// degrade path rather than an error — a misconfigured reranker
    /// should never fail retrieval.
    #[must_use]
    pub fn new(embedder: Option<Arc<dyn EmbeddingModel>>, query_vector: Option<Vec<f32>>) -> Self {
        Self::with_top_n(embedder, query_vector, DEFAULT_TOP_N)
    }

    /// Create a reranker that only rescales the first `top_n` results.
    #[must_use]
    pub fn with_top_n(embedder: Option<Arc<dyn EmbeddingModel>>, query_vector: Option<Vec<f32>>, top_n: usize) -> Self {
        Self { embedder, query_vector, top_n }
    }

    async fn rescore(&self, embedder: &Arc<dyn EmbeddingModel>, query_vector: &[f32], results: Vec<SearchResult>) -> Result<Vec<SearchResult>> {
        let (with_content, without_content): (Vec<_>, Vec<_>) =
            results.into_iter().partition(|r| r.content.is_some());

        if with_content.is_empty() {
            let mut passthrough = without_content;
            return Ok(reassign_ranks(std::mem::take(&mut passthrough)));
        }

        let split_at = self.top_n.min(with_content.len());
        let mut to_rescore = with_content;
        let remainder = to_rescore.split_off(split_at);

        let texts: Vec<String> = to_rescore
            .iter()
            .map(|r| r.content.clone().unwrap_or_default())
            .collect();
        let embeddings = embedder.embed(&texts).await?;

        let mut rescored: Vec<SearchResult> = to_rescore
            .into_iter()
            .zip(embeddings)
            .map(|(mut r, embedding)| {
                let new_score = cosine_similarity(query_vector, &embedding);
                r.original_score = Some(r.score);
                r.score = new_score;
                r
            })
            .collect();

        rescored.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
        rescored.extend(remainder);
        rescored.extend(without_content);
        Ok(reassign_ranks(rescored))
    }
}

#[async_trait]
impl Optimizer for RerankOptimizer {
    async fn optimize(&self, results: Vec<SearchResult>) -> Result<Vec<SearchResult>> {
        match (&self.embedder, &self.query_vector) {
            (Some(embedder), Some(query_vector)) => {
                self.rescore(embedder, query_vector, results).await
            }
            _ => Ok(reassign_ranks(results)),
        }
    }

    fn name(&self) -> &'static str {
        "rerank"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embeddings::{EmbedderConfig, LocalEmbedder};

    fn with_content(chunk_id: &str, score: f32, content: &str) -> SearchResult {
        let mut r = SearchResult::new(chunk_id.to_string(), score, 0);
        r.content = Some(content.to_string());
        r
    }

    #[tokio::test]
    async fn passthrough_without_embedder() {
        let optimizer = RerankOptimizer::new(None, None);
        let results = vec![with_content("a", 0.5, "hello")];
        let out = optimizer.optimize(results).await.unwrap();
        assert_eq!(out[0].original_score, None);
        assert_eq!(out[0].score, 0.5);
    }

    #[tokio::test]
    async fn rescoring_records_original_score() {
        let embedder: Arc<dyn EmbeddingModel> =
            Arc::new(LocalEmbedder::new(EmbedderConfig { dimensions: 8, ..Default::default() }));
        let query_vector = embedder.embed_one("hello").await.unwrap();
        let optimizer = RerankOptimizer::new(Some(embedder), Some(query_vector));

        let results = vec![with_content("a", 0.1, "hello")];
        let out = optimizer.optimize(results).await.unwrap();
        assert_eq!(out[0].original_score, Some(0.1));
    }

    #[tokio::test]
    async fn results_without_content_are_left_unscored_and_appended() {
        let embedder: Arc<dyn EmbeddingModel> =
            Arc::new(LocalEmbedder::new(EmbedderConfig { dimensions: 8, ..Default::default() }));
        let query_vector = embedder.embed_one("hello").await.unwrap();
        let optimizer = RerankOptimizer::new(Some(embedder), Some(query_vector));

        let results = vec![with_content("a", 0.9, "hello"), SearchResult::new("b".to_string(), 0.8, 1)];
        let out = optimizer.optimize(results).await.unwrap();
        assert_eq!(out.len(), 2);
        assert_eq!(out.last().unwrap().chunk_id, "b");
    }

    #[tokio::test]
    async fn results_past_top_n_are_left_unrescored() {
        let embedder: Arc<dyn EmbeddingModel> =
            Arc::new(LocalEmbedder::new(EmbedderConfig { dimensions: 8, ..Default::default() }));
        let query_vector = embedder.embed_one("hello").await.unwrap();
        let optimizer = RerankOptimizer::with_top_n(Some(embedder), Some(query_vector), 1);

        let results = vec![with_content("a", 0.9, "hello"), with_content("b", 0.8, "world")];
        let out = optimizer.optimize(results).await.unwrap();
        assert_eq!(out.len(), 2);
        // "a" was rescored (its score is now a similarity, not the original 0.9);
        // "b" fell past top_n and kept its original score untouched.
        assert_eq!(out[0].chunk_id, "a");
        assert!(out[0].original_score.is_some());
        assert_eq!(out[1].chunk_id, "b");
        assert_eq!(out[1].score, 0.8);
        assert_eq!(out[1].original_score, None);
    }
}
