//! Optimizers: result-list transforms composed into a chain —
//! [`threshold`], [`dedup`], [`rerank`], and `max_results` (the last is
//! a plain truncation, not a separate module). Every optimizer degrades
//! to a passthrough rather than erroring when its preconditions aren't
//! met (e.g. `rerank` with no model configured).

mod dedup;
mod rerank;
mod threshold;

pub use dedup::{DedupStrategy, DeduplicationOptimizer};
pub use rerank::RerankOptimizer;
pub use threshold::ScoreThresholdOptimizer;

use crate::error::Result;
use crate::registry::{Category, ConfigSchema, Factory, ParamSchema};
use crate::searchers::SearchResult;
use async_trait::async_trait;
use serde_json::Value;
use std::sync::Arc;

/// Optimizer component contract: a pure transform over a ranked result
/// list. Always re-ranks (reassigns `rank` 0..n) before returning.
#[async_trait]
pub trait Optimizer: Send + Sync {
    /// Transform `results`, which are assumed already sorted by
    /// descending score.
    ///
    /// # Errors
    ///
    /// Infallible in the provided implementations; the `Result` return
    /// exists so future optimizers that call out to a backend (e.g. a
    /// hosted reranker) can surface `PipelineError::BackendFault`.
    async fn optimize(&self, results: Vec<SearchResult>) -> Result<Vec<SearchResult>>;

    /// Registered component name.
    fn name(&self) -> &'static str;
}

/// Truncate to the first `max_results` entries.
#[must_use]
pub fn max_results(mut results: Vec<SearchResult>, max_results: usize) -> Vec<SearchResult> {
    results.truncate(max_results);
    reassign_ranks(results)
}

/// A registered, config-driven wrapper around [`max_results`], so a
/// caller can cap the candidate set mid-chain (e.g. before an expensive
/// `rerank` step) independent of the final result-count truncation
/// [`run_chain`] always applies afterward.
pub struct MaxResultsOptimizer {
    limit: usize,
}

impl MaxResultsOptimizer {
    /// Create an optimizer that truncates to `limit` entries.
    #[must_use]
    pub const fn new(limit: usize) -> Self {
        Self { limit }
    }
}

#[async_trait]
impl Optimizer for MaxResultsOptimizer {
    async fn optimize(&self, results: Vec<SearchResult>) -> Result<Vec<SearchResult>> {
        Ok(max_results(results, self.limit))
    }

    fn name(&self) -> &'static str {
        "max_results"
    }
}

/// Reassign `rank` to match current list order (0-based).
pub(crate) fn reassign_ranks(mut results: Vec<SearchResult>) -> Vec<SearchResult> {
    for (rank, result) in results.iter_mut().enumerate() {
        result.rank = rank;
    }
    results
}

/// Run a chain of optimizers in order, then apply `max_results` against
/// the caller's requested `final_max_results`. This final truncation
/// always runs, even when the chain already contains an explicit
/// `max_results` step — that step bounds an intermediate stage, this one
/// guarantees the caller never sees more than they asked for.
///
/// # Errors
///
/// Propagates the first error from any optimizer in the chain.
pub async fn run_chain(
    chain: &[Arc<dyn Optimizer>],
    mut results: Vec<SearchResult>,
    final_max_results: usize,
) -> Result<Vec<SearchResult>> {
    for optimizer in chain {
        results = optimizer.optimize(results).await?;
    }
    Ok(max_results(results, final_max_results))
}

fn threshold_schema() -> ConfigSchema {
    ConfigSchema {
        params: vec![ParamSchema {
            name: "min_score",
            kind: "number",
            required: false,
            allowed: &[],
        }],
    }
}

fn dedup_schema() -> ConfigSchema {
    ConfigSchema {
        params: vec![
            ParamSchema {
                name: "dedup_by",
                kind: "string",
                required: false,
                allowed: &["id", "content", "jaccard"],
            },
            ParamSchema {
                name: "jaccard_threshold",
                kind: "number",
                required: false,
                allowed: &[],
            },
        ],
    }
}

fn max_results_schema() -> ConfigSchema {
    ConfigSchema {
        params: vec![ParamSchema {
            name: "limit",
            kind: "integer",
            required: false,
            allowed: &[],
        }],
    }
}

fn rerank_schema() -> ConfigSchema {
    ConfigSchema { params: vec![] }
}

/// Build the default optimizer factory. `threshold`, `dedup`, and
/// `max_results` are fully config-driven and constructed here;
/// `rerank` is registered for discovery (`list()`), but
/// `pipeline::retrieval::RetrievalOrchestrator` constructs its real
/// instances directly, since a reranker needs the request's embedder
/// and query vector, which a `&serde_json::Value` config can't carry.
#[must_use]
pub fn default_factory() -> Factory<Arc<dyn Optimizer>> {
    let mut factory = Factory::new(Category::Optimizers);

    factory.register(
        "threshold",
        "Drops results scoring below a minimum",
        threshold_schema(),
        |cfg| {
            let min_score = cfg.get("min_score").and_then(Value::as_f64).map_or(0.0, |v| v as f32);
            Ok(Arc::new(ScoreThresholdOptimizer::new(min_score)) as Arc<dyn Optimizer>)
        },
    );
    factory.register(
        "dedup",
        "Removes duplicate results by id, content, or Jaccard overlap",
        dedup_schema(),
        |cfg| {
            let strategy = match cfg.get("dedup_by").and_then(Value::as_str) {
                Some("id") => DedupStrategy::Id,
                Some("jaccard") => DedupStrategy::Jaccard {
                    threshold: cfg.get("jaccard_threshold").and_then(Value::as_f64).map_or(0.8, |v| v as f32),
                },
                Some("content") | None | Some(_) => DedupStrategy::Content,
            };
            Ok(Arc::new(DeduplicationOptimizer::new(strategy)) as Arc<dyn Optimizer>)
        },
    );
    factory.register(
        "max_results",
        "Truncates the candidate set mid-chain",
        max_results_schema(),
        |cfg| {
            let limit = cfg.get("limit").and_then(Value::as_u64).map_or(usize::MAX, |v| v as usize);
            Ok(Arc::new(MaxResultsOptimizer::new(limit)) as Arc<dyn Optimizer>)
        },
    );
    factory.register(
        "rerank",
        "Rescales top results by query/content similarity",
        rerank_schema(),
        |_cfg| Ok(Arc::new(RerankOptimizer::new(None, None)) as Arc<dyn Optimizer>),
    );

    factory
}

#[cfg(test)]
mod tests {
    use super::*;

    fn result(chunk_id: &str, score: f32, rank: usize) -> SearchResult {
        SearchResult::new(chunk_id.to_string(), score, rank)
    }

    #[test]
    fn max_results_truncates_and_reassigns_rank() {
        let results = vec![result("a", 0.9, 0), result("b", 0.8, 1), result("c", 0.7, 2)];
        let limited = max_results(results, 2);
        assert_eq!(limited.len(), 2);
        assert_eq!(limited[1].rank, 1);
    }

    #[tokio::test]
    async fn default_factory_creates_max_results_from_config() {
        let factory = default_factory();
        let optimizer = factory.create("max_results", &serde_json::json!({"limit": 2})).unwrap();
        let results = vec![result("a", 0.9, 0), result("b", 0.8, 1), result("c", 0.7, 2)];
        let out = optimizer.optimize(results).await.unwrap();
        assert_eq!(out.len(), 2);
    }

    #[test]
    fn default_factory_rejects_unknown_kind() {
        let factory = default_factory();
        assert!(factory.create("bogus", &serde_json::json!({})).is_err());
    }
}
