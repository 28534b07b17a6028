//! Searchers: turn a query into ranked chunks. Three variants —
//! [`semantic`] (vector-only), [`lexical`] (BM25-only), and [`hybrid`]
//! (both, fused by Reciprocal Rank Fusion with a structured, parallel
//! fan-out).

mod hybrid;
mod lexical;
mod semantic;

pub use hybrid::HybridSearcher;
pub use lexical::LexicalSearcher;
pub use semantic::SemanticSearcher;

use crate::error::Result;
use crate::indexers::{CollectionKey, TextStorage, VectorStorage};
use crate::registry::{Category, ConfigSchema, Factory, ParamSchema};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;

/// One scored, ranked search result.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchResult {
    /// Chunk identifier.
    pub chunk_id: String,
    /// Fused or backend-native score, depending on searcher.
    pub score: f32,
    /// 0-based rank within this result set (0 = best).
    pub rank: usize,
    /// Whether the lexical leg of a hybrid search failed and this
    /// result comes from the vector leg alone (or vice versa).
    pub partial_lexical_failure: bool,
    /// Chunk text, populated by the retrieval orchestrator after
    /// searching so that optimizers (`dedup`, `rerank`) and callers
    /// don't need a second lookup round-trip. `None` immediately after
    /// a bare searcher call.
    pub content: Option<String>,
    /// Score before `optimizers::rerank` replaced it, if reranking ran.
    pub original_score: Option<f32>,
}

impl SearchResult {
    /// Construct a bare result with no content attached yet.
    #[must_use]
    pub const fn new(chunk_id: String, score: f32, rank: usize) -> Self {
        Self {
            chunk_id,
            score,
            rank,
            partial_lexical_failure: false,
            content: None,
            original_score: None,
        }
    }
}

/// A search request.
#[derive(Debug, Clone)]
pub struct SearchQuery {
    /// Collection to search within.
    pub collection: CollectionKey,
    /// Raw query text.
    pub text: String,
    /// Pre-embedded query vector, required for `semantic`/`hybrid`.
    pub vector: Option<Vec<f32>>,
    /// Number of results to return.
    pub top_k: usize,
}

/// Searcher component contract.
#[async_trait]
pub trait Searcher: Send + Sync {
    /// Execute a search and return up to `query.top_k` ranked results.
    ///
    /// # Errors
    ///
    /// Returns `PipelineError::Validation` if the query is missing
    /// fields this searcher requires (e.g. a vector for `semantic`), or
    /// `PipelineError::NotFound` if the collection doesn't exist.
    async fn search(&self, query: &SearchQuery) -> Result<Vec<SearchResult>>;

    /// Registered component name.
    fn name(&self) -> &'static str;
}

/// Reciprocal Rank Fusion: `score(d) = Σ wᵢ / (k + rankᵢ(d))` over the
/// result lists that contain `d`, where `rankᵢ(d)` is 1-based.
#[must_use]
pub fn reciprocal_rank_fusion(
    result_lists: &[(Vec<SearchResult>, f32)],
    k: f32,
) -> Vec<SearchResult> {
    use std::collections::HashMap;

    let mut fused: HashMap<String, f32> = HashMap::new();
    let mut first_seen_rank: HashMap<String, usize> = HashMap::new();

    for (results, weight) in result_lists {
        for (i, result) in results.iter().enumerate() {
            let rank = i + 1;
            #[allow(clippy::cast_precision_loss)]
            let contribution = weight / (k + rank as f32);
            *fused.entry(result.chunk_id.clone()).or_insert(0.0) += contribution;
            first_seen_rank.entry(result.chunk_id.clone()).or_insert(rank);
        }
    }

    let mut merged: Vec<(String, f32)> = fused.into_iter().collect();
    // Ties break by the best (lowest) original rank across input lists,
    // not an arbitrary hash-map iteration order.
    merged.sort_by(|a, b| {
        b.1.partial_cmp(&a.1)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| {
                first_seen_rank
                    .get(&a.0)
                    .unwrap_or(&usize::MAX)
                    .cmp(first_seen_rank.get(&b.0).unwrap_or(&usize::MAX))
            })
    });

    // Normalize to [0, 1] by the top score so a fused result's score is
    // comparable across queries and to other searchers' scores, rather
    // than carrying the raw, query-shape-dependent RRF sum.
    let max_score = merged.first().map_or(0.0, |(_, score)| *score);

    merged
        .into_iter()
        .enumerate()
        .map(|(rank, (chunk_id, score))| {
            let normalized = if max_score > 0.0 { score / max_score } else { 0.0 };
            SearchResult::new(chunk_id, normalized, rank)
        })
        .collect()
}

fn searcher_config_schema() -> ConfigSchema {
    ConfigSchema {
        params: vec![ParamSchema {
            name: "semantic_weight",
            kind: "number",
            required: false,
            allowed: &[],
        }],
    }
}

/// Build the default searcher factory, closing over the shared
/// vector/text storage backends every variant is constructed against.
#[must_use]
pub fn default_factory(vector_storage: Arc<dyn VectorStorage>, text_storage: Arc<dyn TextStorage>) -> Factory<Arc<dyn Searcher>> {
    let mut factory = Factory::new(Category::Searchers);

    {
        let vector_storage = vector_storage.clone();
        factory.register(
            "semantic",
            "Vector-only search against the embedding index",
            searcher_config_schema(),
            move |_cfg| Ok(Arc::new(SemanticSearcher::new(vector_storage.clone())) as Arc<dyn Searcher>),
        );
    }
    {
        let text_storage = text_storage.clone();
        factory.register(
            "lexical",
            "BM25-only search against the inverted text index",
            searcher_config_schema(),
            move |_cfg| Ok(Arc::new(LexicalSearcher::new(text_storage.clone())) as Arc<dyn Searcher>),
        );
    }
    factory.register(
        "hybrid",
        "Fuses semantic and lexical legs by Reciprocal Rank Fusion",
        searcher_config_schema(),
        move |cfg| {
            let semantic_weight = cfg.get("semantic_weight").and_then(Value::as_f64).map_or(0.5, |w| w as f32);
            Ok(Arc::new(HybridSearcher::new(vector_storage.clone(), text_storage.clone(), semantic_weight)) as Arc<dyn Searcher>)
        },
    );

    factory
}

#[cfg(test)]
mod tests {
    use super::*;

    fn result(chunk_id: &str, rank: usize) -> SearchResult {
        SearchResult::new(chunk_id.to_string(), 1.0, rank)
    }

    #[test]
    fn rrf_combines_lists_with_equal_weight() {
        let semantic = vec![result("a", 0), result("b", 1)];
        let lexical = vec![result("b", 0), result("a", 1)];
        let fused = reciprocal_rank_fusion(&[(semantic, 1.0), (lexical, 1.0)], 60.0);
        // a: 1/(60+1) + 1/(60+2); b: 1/(60+1) + 1/(60+2) -- symmetric, tie broken by first-seen rank
        assert_eq!(fused.len(), 2);
        assert!((fused[0].score - fused[1].score).abs() < 1e-9);
    }

    #[test]
    fn rrf_favors_items_ranked_well_in_both_lists() {
        let semantic = vec![result("a", 0), result("b", 1), result("c", 2)];
        let lexical = vec![result("a", 0), result("c", 1), result("b", 2)];
        let fused = reciprocal_rank_fusion(&[(semantic, 1.0), (lexical, 1.0)], 60.0);
        assert_eq!(fused[0].chunk_id, "a");
    }

    #[test]
    fn rrf_normalizes_top_score_to_one() {
        let semantic = vec![result("a", 0), result("b", 1)];
        let fused = reciprocal_rank_fusion(&[(semantic, 1.0)], 60.0);
        assert!((fused[0].score - 1.0).abs() < 1e-6);
    }

    #[test]
    fn default_factory_creates_each_registered_searcher() {
        let vector_storage: Arc<dyn VectorStorage> = Arc::new(crate::indexers::VectorIndexer::new());
        let text_storage: Arc<dyn TextStorage> = Arc::new(crate::indexers::TextIndexer::new());
        let factory = default_factory(vector_storage, text_storage);
        assert!(factory.create("semantic", &serde_json::json!({})).is_ok());
        assert!(factory.create("lexical", &serde_json::json!({})).is_ok());
        assert!(factory.create("hybrid", &serde_json::json!({"semantic_weight": 0.7})).is_ok());
        assert!(factory.create("bogus", &serde_json::json!({})).is_err());
    }
}
