//! Retrieval orchestrator: embed query -> search -> optimize -> enrich.
//! Every stage's wall-clock is recorded into the run's result snapshot
//! so a caller can see where time went.

use super::collection::default_collection_name;
use crate::embeddings::EmbeddingModel;
use crate::error::{PipelineError, Result};
use crate::indexers::{CollectionKey, TextStorage, VectorStorage};
use crate::optimizers::{self, Optimizer, RerankOptimizer};
use crate::registry::Factory;
use crate::searchers::{self, SearchQuery, Searcher};
use crate::store::{KnowledgeBase, PipelineRun, Repository, RunKind, RunStatus};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;
use tracing::info;
use uuid::Uuid;

/// A `fetch_k = top_k * FETCH_MULTIPLIER` over-fetch is used whenever
/// an optimizer chain is configured, since optimizers can only narrow
/// the candidate pool, never widen it.
const DEFAULT_FETCH_MULTIPLIER: usize = 3;

/// Searcher placement: which component to use and its tunables.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SearcherSettings {
    /// `"semantic"`, `"lexical"`, or `"hybrid"`.
    #[serde(rename = "type")]
    pub kind: String,
    /// Semantic-leg weight for `hybrid`; ignored otherwise.
    #[serde(default = "default_semantic_weight")]
    pub semantic_weight: f32,
    /// Explicit collection name override.
    #[serde(default)]
    pub collection_name: Option<String>,
    /// Over-fetch multiplier applied when optimizers are configured.
    #[serde(default = "default_fetch_multiplier")]
    pub fetch_multiplier: usize,
}

const fn default_semantic_weight() -> f32 {
    0.5
}
const fn default_fetch_multiplier() -> usize {
    DEFAULT_FETCH_MULTIPLIER
}

/// One optimizer step's config, by `type`.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct OptimizerSettings {
    /// `"threshold"`, `"dedup"`, or `"rerank"`.
    #[serde(rename = "type")]
    pub kind: String,
    /// `threshold`: minimum score to keep.
    #[serde(default)]
    pub min_score: Option<f32>,
    /// `dedup`: `"id"`, `"content"`, or `"jaccard"`.
    #[serde(default)]
    pub dedup_by: Option<String>,
    /// `dedup`: Jaccard overlap threshold, when `dedup_by = "jaccard"`.
    #[serde(default)]
    pub jaccard_threshold: Option<f32>,
    /// `max_results`: candidate-set cap applied at this point in the
    /// chain, independent of the retrieval call's own `top_k`.
    #[serde(default)]
    pub limit: Option<usize>,
}

/// Retrieval pipeline configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RetrievalConfig {
    /// `{type, model?, ...}` embedder component config.
    pub embedder: Value,
    /// Searcher placement and tunables.
    pub searcher: SearcherSettings,
    /// Optimizer chain, applied in order.
    #[serde(default)]
    pub optimizers: Vec<OptimizerSettings>,
    /// Number of final results to return.
    pub top_k: usize,
}

/// One enriched retrieval hit, matching the external result envelope.
#[derive(Debug, Clone, Serialize)]
pub struct RetrievedResult {
    /// Chunk id.
    pub id: Uuid,
    /// Chunk text.
    pub content: Option<String>,
    /// Final (post-optimization) score.
    pub score: f32,
    /// Owning document id, when the chunk's document is still resolvable.
    pub document_id: Option<Uuid>,
    /// Owning document's filename, when resolvable.
    pub document_filename: Option<String>,
    /// 0-based chunk index within its document.
    pub chunk_index: Option<usize>,
    /// Supplementary metadata (character span, etc.).
    pub metadata: Value,
}

/// Per-stage timing and counts for one retrieval call.
#[derive(Debug, Clone, Serialize)]
pub struct RetrievalMetrics {
    /// Total wall-clock duration.
    pub duration_ms: u64,
    /// Time spent embedding the query.
    pub embed_time_ms: u64,
    /// Time spent in the searcher.
    pub search_time_ms: u64,
    /// Time spent running the optimizer chain.
    pub optimize_time_ms: u64,
    /// Final result count.
    pub results_count: usize,
    /// Set when the searcher degraded (e.g. hybrid's lexical leg faulted).
    pub search_error: Option<String>,
}

/// Outcome of one retrieval run.
#[derive(Debug, Clone, Serialize)]
pub struct RetrievalOutcome {
    /// The `PipelineRun` id this retrieval was recorded under.
    pub run_id: Uuid,
    /// The query that was run.
    pub query: String,
    /// Final, enriched, ranked results.
    pub results: Vec<RetrievedResult>,
    /// Total results before any `top_k` truncation by the caller's view
    /// (equal to `results.len()`; kept distinct for forward compatibility
    /// with future pagination).
    pub total_results: usize,
    /// Per-stage metrics.
    pub metrics: RetrievalMetrics,
}

/// Drives one retrieval call against the shared storage collaborators.
pub struct RetrievalOrchestrator {
    repository: Arc<dyn Repository>,
    vector_storage: Arc<dyn VectorStorage>,
    text_storage: Arc<dyn TextStorage>,
    embedders: Arc<Factory<Arc<dyn EmbeddingModel>>>,
    searchers: Factory<Arc<dyn Searcher>>,
    optimizers: Factory<Arc<dyn Optimizer>>,
}

impl RetrievalOrchestrator {
    /// Build an orchestrator over the given collaborators. The searcher
    /// and optimizer component factories are built here, closing over
    /// `vector_storage`/`text_storage`, rather than taking them as
    /// constructor params — they have no tunables of their own to
    /// inject from outside.
    #[must_use]
    pub fn new(
        repository: Arc<dyn Repository>,
        vector_storage: Arc<dyn VectorStorage>,
        text_storage: Arc<dyn TextStorage>,
        embedders: Arc<Factory<Arc<dyn EmbeddingModel>>>,
    ) -> Self {
        let searchers = searchers::default_factory(vector_storage.clone(), text_storage.clone());
        let optimizers = optimizers::default_factory();
        Self {
            repository,
            vector_storage,
            text_storage,
            embedders,
            searchers,
            optimizers,
        }
    }

    /// Run a query against `knowledge_base`.
    ///
    /// # Errors
    ///
    /// Returns an error only when the run cannot be attempted at all
    /// (unknown embedder, an empty query, or a searcher that requires a
    /// collection that doesn't exist).
    pub async fn retrieve(
        &self,
        knowledge_base: &KnowledgeBase,
        query: &str,
        config: RetrievalConfig,
    ) -> Result<RetrievalOutcome> {
        if query.trim().is_empty() {
            return Err(PipelineError::validation("retrieval query must not be empty"));
        }

        let start = std::time::Instant::now();
        let run = PipelineRun {
            id: Uuid::new_v4(),
            knowledge_base_id: knowledge_base.id,
            document_id: None,
            kind: RunKind::Retrieval,
            status: RunStatus::Running,
            config_snapshot: serde_json::to_value(&config).unwrap_or(Value::Null),
            result_snapshot: None,
            error_code: None,
            error_message: None,
            started_at: Utc::now(),
            completed_at: None,
        };
        self.repository.create_run(&run).await?;
        info!(run_id = %run.id, query, "retrieval run started");

        let embedder_type = config
            .embedder
            .get("type")
            .and_then(Value::as_str)
            .ok_or_else(|| PipelineError::validation("embedder config missing required 'type' field"))?;
        let embedder = self.embedders.create(embedder_type, &config.embedder)?;

        let embed_start = std::time::Instant::now();
        let query_vector = embedder.embed_one(query).await?;
        let embed_time_ms = elapsed_ms(embed_start);

        let collection_name = config
            .searcher
            .collection_name
            .clone()
            .unwrap_or_else(|| default_collection_name(&knowledge_base.tenant_id, &knowledge_base.id.to_string()));
        let key = CollectionKey::new(knowledge_base.tenant_id.clone(), collection_name);

        let searcher = self.searchers.create(
            &config.searcher.kind,
            &serde_json::json!({"semantic_weight": config.searcher.semantic_weight}),
        )?;

        let fetch_k = if config.optimizers.is_empty() {
            config.top_k
        } else {
            config.top_k * config.searcher.fetch_multiplier
        };

        let search_start = std::time::Instant::now();
        let search_query = SearchQuery {
            collection: key,
            text: query.to_string(),
            vector: Some(query_vector.clone()),
            top_k: fetch_k,
        };
        let mut results = searcher.search(&search_query).await?;
        let search_time_ms = elapsed_ms(search_start);
        let search_error = results
            .iter()
            .any(|r| r.partial_lexical_failure)
            .then(|| "one searcher leg degraded; results are partial".to_string());

        let chunk_ids: Vec<Uuid> = results
            .iter()
            .filter_map(|r| Uuid::parse_str(&r.chunk_id).ok())
            .collect();
        let chunks = self.repository.get_chunks(&chunk_ids).await?;
        let chunk_by_id: std::collections::HashMap<Uuid, _> =
            chunks.into_iter().map(|c| (c.id, c)).collect();

        for result in &mut results {
            if let Ok(id) = Uuid::parse_str(&result.chunk_id) {
                if let Some(chunk) = chunk_by_id.get(&id) {
                    result.content = Some(chunk.content.clone());
                }
            }
        }

        let chain = self.build_optimizer_chain(&config.optimizers, &embedder, &query_vector);
        let optimize_start = std::time::Instant::now();
        let optimized = optimizers::run_chain(&chain, results, config.top_k).await?;
        let optimize_time_ms = elapsed_ms(optimize_start);

        let mut documents_cache = std::collections::HashMap::new();
        let mut enriched = Vec::with_capacity(optimized.len());
        for result in optimized {
            let Ok(chunk_id) = Uuid::parse_str(&result.chunk_id) else {
                continue;
            };
            let chunk = chunk_by_id.get(&chunk_id);

            let document = if let Some(chunk) = chunk {
                if let std::collections::hash_map::Entry::Vacant(entry) = documents_cache.entry(chunk.document_id) {
                    let fetched = self.repository.get_document(chunk.document_id).await.ok();
                    entry.insert(fetched);
                }
                documents_cache.get(&chunk.document_id).and_then(Clone::clone)
            } else {
                None
            };

            enriched.push(RetrievedResult {
                id: chunk_id,
                content: result.content,
                score: result.score,
                document_id: document.as_ref().map(|d| d.id),
                document_filename: document.as_ref().map(|d| d.filename.clone()),
                chunk_index: chunk.map(|c| c.index),
                metadata: serde_json::json!({
                    "start_char": chunk.and_then(|c| c.start_char),
                    "end_char": chunk.and_then(|c| c.end_char),
                }),
            });
        }

        let duration_ms = elapsed_ms(start);
        let results_count = enriched.len();
        self.repository
            .complete_run(
                run.id,
                RunStatus::Succeeded,
                serde_json::json!({
                    "results_count": results_count,
                    "duration_ms": duration_ms,
                    "embed_time_ms": embed_time_ms,
                    "search_time_ms": search_time_ms,
                    "optimize_time_ms": optimize_time_ms,
                    "search_error": search_error,
                }),
                None,
                None,
            )
            .await?;
        info!(run_id = %run.id, results_count, duration_ms, "retrieval run completed");

        Ok(RetrievalOutcome {
            run_id: run.id,
            query: query.to_string(),
            total_results: results_count,
            results: enriched,
            metrics: RetrievalMetrics {
                duration_ms,
                embed_time_ms,
                search_time_ms,
                optimize_time_ms,
                results_count,
                search_error,
            },
        })
    }

    /// Build the configured optimizer chain via the `optimizers`
    /// factory. `rerank` is the one exception: it's constructed
    /// directly rather than through `Factory::create`, since it needs
    /// this request's embedder and query vector, which a bare
    /// `serde_json::Value` config can't carry. Unrecognized kinds are
    /// dropped rather than failing the whole retrieval.
    fn build_optimizer_chain(
        &self,
        settings: &[OptimizerSettings],
        embedder: &Arc<dyn EmbeddingModel>,
        query_vector: &[f32],
    ) -> Vec<Arc<dyn Optimizer>> {
        settings
            .iter()
            .filter_map(|s| {
                if s.kind == "rerank" {
                    return Some(Arc::new(RerankOptimizer::new(Some(embedder.clone()), Some(query_vector.to_vec()))) as Arc<dyn Optimizer>);
                }
                self.optimizers.create(&s.kind, &optimizer_config_value(s)).ok()
            })
            .collect()
    }
}

/// Project one `OptimizerSettings` down to the config object its own
/// `kind` actually needs, so `Factory::create`'s schema validation
/// (which rejects unknown keys) doesn't trip over fields that belong to
/// a different kind.
fn optimizer_config_value(settings: &OptimizerSettings) -> Value {
    let mut obj = serde_json::Map::new();
    match settings.kind.as_str() {
        "threshold" => {
            if let Some(v) = settings.min_score {
                obj.insert("min_score".to_string(), serde_json::json!(v));
            }
        }
        "dedup" => {
            if let Some(v) = &settings.dedup_by {
                obj.insert("dedup_by".to_string(), serde_json::json!(v));
            }
            if let Some(v) = settings.jaccard_threshold {
                obj.insert("jaccard_threshold".to_string(), serde_json::json!(v));
            }
        }
        "max_results" => {
            if let Some(v) = settings.limit {
                obj.insert("limit".to_string(), serde_json::json!(v));
            }
        }
        _ => {}
    }
    Value::Object(obj)
}

fn elapsed_ms(start: std::time::Instant) -> u64 {
    u64::try_from(start.elapsed().as_millis()).unwrap_or(u64::MAX)
}
