//! Embedders: turn text into dense vectors. Two variants: [`local`]
//! (in-process, deterministic-for-testing) and [`remote`] (HTTP
//! API-backed, batched).

mod local;
mod remote;

pub use local::LocalEmbedder;
pub use remote::RemoteEmbedder;

use crate::error::{PipelineError, Result};
use crate::registry::{Category, ConfigSchema, Factory, ParamSchema};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Embedding component contract. Implementors turn a batch of strings
/// into equal-length dense vectors, one per input, preserving order.
#[async_trait]
pub trait EmbeddingModel: Send + Sync {
    /// Embed a batch of texts. Empty strings are coerced to a single
    /// space rather than rejected, since most backends error on
    /// zero-length input.
    ///
    /// # Errors
    ///
    /// Returns `PipelineError::BackendFault` if the backend call fails,
    /// or `PipelineError::Validation` if `texts` is inconsistent with
    /// the configured batch size.
    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>>;

    /// Output vector dimensionality.
    fn dimensions(&self) -> usize;

    /// Registered component name.
    fn name(&self) -> &'static str;

    /// Embed a single query string. Default implementation delegates to
    /// [`EmbeddingModel::embed`]; remote providers may override to hit a
    /// cheaper single-item endpoint.
    async fn embed_one(&self, text: &str) -> Result<Vec<f32>> {
        let mut batch = self.embed(std::slice::from_ref(&text.to_string())).await?;
        batch.pop().ok_or_else(|| {
            PipelineError::internal("embedder returned no vector for single-item batch")
        })
    }
}

/// Configuration shared by both embedder variants.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EmbedderConfig {
    /// Model name or identifier.
    pub model: String,
    /// Output dimensionality. Required for `local`; advisory for
    /// `remote` backends that return a fixed size regardless.
    pub dimensions: usize,
    /// Environment variable carrying the API key, for `remote`.
    pub api_key_env: Option<String>,
    /// Base URL override, for `remote`.
    pub base_url: Option<String>,
    /// Maximum texts per backend call.
    pub max_batch_size: usize,
    /// Normalize output vectors to unit length.
    pub normalize: bool,
}

impl Default for EmbedderConfig {
    fn default() -> Self {
        Self {
            model: "local-mock".to_string(),
            dimensions: 384,
            api_key_env: None,
            base_url: None,
            max_batch_size: 100,
            normalize: true,
        }
    }
}

fn embedder_schema() -> ConfigSchema {
    ConfigSchema {
        params: vec![
            ParamSchema {
                name: "model",
                kind: "string",
                required: true,
                allowed: &[],
            },
            ParamSchema {
                name: "dimensions",
                kind: "integer",
                required: false,
                allowed: &[],
            },
            ParamSchema {
                name: "api_key_env",
                kind: "string",
                required: false,
                allowed: &[],
            },
            ParamSchema {
                name: "base_url",
                kind: "string",
                required: false,
                allowed: &[],
            },
            ParamSchema {
                name: "max_batch_size",
                kind: "integer",
                required: false,
                allowed: &[],
            },
            ParamSchema {
                name: "normalize",
                kind: "boolean",
                required: false,
                allowed: &[],
            },
        ],
    }
}

/// Build the default embedder factory with `local` and `remote`
/// registered under their canonical names.
#[must_use]
pub fn default_factory() -> Factory<Arc<dyn EmbeddingModel>> {
    let mut factory = Factory::new(Category::Embedders);

    factory.register_with_dimension(
        "local",
        "In-process deterministic mock embedder for development and tests",
        embedder_schema(),
        384,
        |cfg| {
            let config: EmbedderConfig = serde_json::from_value(cfg.clone())
                .map_err(|e| PipelineError::validation(format!("invalid local embedder config: {e}")))?;
            Ok(Arc::new(LocalEmbedder::new(config)) as Arc<dyn EmbeddingModel>)
        },
    );

    factory.register(
        "remote",
        "HTTP API-backed embedder (OpenAI-compatible embeddings endpoint)",
        embedder_schema(),
        |cfg| {
            let config: EmbedderConfig = serde_json::from_value(cfg.clone())
                .map_err(|e| PipelineError::validation(format!("invalid remote embedder config: {e}")))?;
            Ok(Arc::new(RemoteEmbedder::new(config)?) as Arc<dyn EmbeddingModel>)
        },
    );

    factory
}

/// Compute cosine similarity between two equal-length vectors. Shared
/// by the `semantic` chunker and the `optimizers::rerank` module.
#[must_use]
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    let mut dot = 0.0f32;
    let mut norm_a = 0.0f32;
    let mut norm_b = 0.0f32;
    for i in 0..a.len().min(b.len()) {
        dot += a[i] * b[i];
        norm_a += a[i] * a[i];
        norm_b += b[i] * b[i];
    }
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    dot / (norm_a.sqrt() * norm_b.sqrt())
}

/// Normalize a vector to unit length in place. No-op on a zero vector.
pub fn normalize(vector: &mut [f32]) {
    let norm: f32 = vector.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm > 0.0 {
        for v in vector {
            *v /= norm;
        }
    }
}

/// Coerce empty strings to a single space; most embedding backends
/// error on zero-length input.
pub(crate) fn sanitize_batch(texts: &[String]) -> Vec<String> {
    texts
        .iter()
        .map(|t| if t.is_empty() { " ".to_string() } else { t.clone() })
        .collect()
}

/// Split `texts` into chunks no larger than `max_batch_size`.
pub(crate) fn batches(texts: &[String], max_batch_size: usize) -> Vec<&[String]> {
    if max_batch_size == 0 {
        return vec![texts];
    }
    texts.chunks(max_batch_size).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cosine_similarity_identical_vectors_is_one() {
        let v = vec![1.0, 2.0, 3.0];
        assert!((cosine_similarity(&v, &v) - 1.0).abs() < 1e-6);
    }

    #[test]
    fn cosine_similarity_orthogonal_vectors_is_zero() {
        assert!((cosine_similarity(&[1.0, 0.0], &[0.0, 1.0])).abs() < 1e-6);
    }

    #[test]
    fn sanitize_replaces_empty_strings() {
        let out = sanitize_batch(&["".to_string(), "hi".to_string()]);
        assert_eq!(out[0], " ");
        assert_eq!(out[1], "hi");
    }

    #[test]
    fn batches_splits_by_max_size() {
        let texts: Vec<String> = (0..5).map(|i| i.to_string()).collect();
        let chunks = batches(&texts, 2);
        assert_eq!(chunks.len(), 3);
        assert_eq!(chunks[2].len(), 1);
    }
}
