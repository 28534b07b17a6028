//! Drops results below a minimum score.

use super::{reassign_ranks, Optimizer};
use crate::error::Result;
use crate::searchers::SearchResult;
use async_trait::async_trait;

/// Filters out results with `score < min_score`.
pub struct ScoreThresholdOptimizer {
    min_score: f32,
}

impl ScoreThresholdOptimizer {
    /// Create an optimizer with the given minimum score.
    #[must_use]
    pub const fn new(min_score: f32) -> Self {
        Self { min_score }
    }
}

#[async_trait]
impl Optimizer for ScoreThresholdOptimizer {
    async fn optimize(&self, results: Vec<SearchResult>) -> Result<Vec<SearchResult>> {
        let filtered: Vec<SearchResult> = results
            .into_iter()
            .filter(|r| r.score >= self.min_score)
            .collect();
        Ok(reassign_ranks(filtered))
    }

    fn name(&self) -> &'static str {
        "score_threshold"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn result(chunk_id: &str, score: f32) -> SearchResult {
        SearchResult::new(chunk_id.to_string(), score, 0)
    }

    #[tokio::test]
    async fn drops_results_below_threshold() {
        let optimizer = ScoreThresholdOptimizer::new(0.5);
        let results = vec![result("a", 0.9), result("b", 0.3), result("c", 0.5)];
        let filtered = optimizer.optimize(results).await.unwrap();
        assert_eq!(filtered.len(), 2);
        assert_eq!(filtered[0].chunk_id, "a");
        assert_eq!(filtered[1].chunk_id, "c");
    }

    #[tokio::test]
    async fn empty_input_yields_empty_output() {
        let optimizer = ScoreThresholdOptimizer::new(0.5);
        assert!(optimizer.optimize(Vec::new()).await.unwrap().is_empty());
    }
}
