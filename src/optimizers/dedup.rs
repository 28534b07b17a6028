//! Drops near-duplicate results, keeping the highest-scored survivor of
//! each duplicate group.

use super::{reassign_ranks, Optimizer};
use crate::error::Result;
use crate::searchers::SearchResult;
use async_trait::async_trait;
use std::collections::HashSet;

/// How two results are compared for duplication.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DedupStrategy {
    /// Exact chunk-id match (trivial; mostly a no-op since search
    /// results are already keyed by chunk id, kept for symmetry with
    /// the other strategies and for callers merging multiple searches).
    Id,
    /// Exact, case-sensitive content match.
    Content,
    /// Jaccard similarity of whitespace-tokenized content above
    /// `jaccard_threshold`.
    Jaccard {
        /// Minimum token-set overlap ratio to treat two results as
        /// duplicates.
        threshold: f32,
    },
}

/// Removes near-duplicate results per a configured [`DedupStrategy`].
/// Results lacking `content` (e.g. bare searcher output not yet
/// enriched) are never treated as duplicates under `Content`/`Jaccard`
/// strategies — missing data never causes a false merge.
pub struct DeduplicationOptimizer {
    strategy: DedupStrategy,
}

impl DeduplicationOptimizer {
    /// Create an optimizer using the given strategy.
    #[must_use]
    pub const fn new(strategy: DedupStrategy) -> Self {
        Self { strategy }
    }

    fn token_set(text: &str) -> HashSet<&str> {
        text.split_whitespace().collect()
    }

    fn jaccard(a: &HashSet<&str>, b: &HashSet<&str>) -> f32 {
        if a.is_empty() && b.is_empty() {
            return 1.0;
        }
        #[allow(clippy::cast_precision_loss)]
        {
            let intersection = a.intersection(b).count() as f32;
            let union = a.union(b).count() as f32;
            if union == 0.0 {
                0.0
            } else {
                intersection / union
            }
        }
    }

    fn is_duplicate(&self, kept: &SearchResult, candidate: &SearchResult) -> bool {
        match self.strategy {
            DedupStrategy::Id => kept.chunk_id == candidate.chunk_id,
            DedupStrategy::Content => match (&kept.content, &candidate.content) {
                (Some(a), Some(b)) => a == b,
                _ => false,
            },
            DedupStrategy::Jaccard { threshold } => match (&kept.content, &candidate.content) {
                (Some(a), Some(b)) => {
                    Self::jaccard(&Self::token_set(a), &Self::token_set(b)) >= threshold
                }
                _ => false,
            },
        }
    }
}

#[async_trait]
impl Optimizer for DeduplicationOptimizer {
    async fn optimize(&self, results: Vec<SearchResult>) -> Result<Vec<SearchResult>> {
        // `results` is sorted by descending score already; keeping the
        // first occurrence of a duplicate group always keeps the
        // highest-scored one.
        let mut kept: Vec<SearchResult> = Vec::with_capacity(results.len());
        for candidate in results {
            if kept.iter().any(|k| self.is_duplicate(k, &candidate)) {
                continue;
            }
            kept.push(candidate);
        }
        Ok(reassign_ranks(kept))
    }

    fn name(&self) -> &'static str {
        "deduplication"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn with_content(chunk_id: &str, score: f32, content: &str) -> SearchResult {
        let mut r = SearchResult::new(chunk_id.to_string(), score, 0);
        r.content = Some(content.to_string());
        r
    }

    #[tokio::test]
    async fn content_strategy_keeps_highest_scored_duplicate() {
        let optimizer = DeduplicationOptimizer::new(DedupStrategy::Content);
        let results = vec![
            with_content("a", 0.9, "same text"),
            with_content("b", 0.8, "same text"),
            with_content("c", 0.7, "different"),
        ];
        let deduped = optimizer.optimize(results).await.unwrap();
        assert_eq!(deduped.len(), 2);
        assert_eq!(deduped[0].chunk_id, "a");
    }

    #[tokio::test]
    async fn jaccard_strategy_merges_near_duplicates() {
        let optimizer = DeduplicationOptimizer::new(DedupStrategy::Jaccard { threshold: 0.5 });
        let results = vec![
            with_content("a", 0.9, "the quick brown fox jumps"),
            with_content("b", 0.8, "the quick brown fox leaps"),
        ];
        let deduped = optimizer.optimize(results).await.unwrap();
        assert_eq!(deduped.len(), 1);
        assert_eq!(deduped[0].chunk_id, "a");
    }

    #[tokio::test]
    async fn missing_content_never_falsely_merges() {
        let optimizer = DeduplicationOptimizer::new(DedupStrategy::Content);
        let results = vec![SearchResult::new("a".to_string(), 0.9, 0), SearchResult::new("b".to_string(), 0.8, 1)];
        let deduped = optimizer.optimize(results).await.unwrap();
        assert_eq!(deduped.len(), 2);
    }
}
