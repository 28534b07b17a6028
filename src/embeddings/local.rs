//! In-process embedder: deterministic hash-based mock vectors. Not a
//! real model — useful for development, tests, and offline pipelines
//! where a real backend isn't available or desired.

use super::{normalize, sanitize_batch, EmbedderConfig, EmbeddingModel};
use crate::error::Result;
use async_trait::async_trait;
use std::hash::{Hash, Hasher};

/// Deterministic hash-based embedder.
#[derive(Debug)]
pub struct LocalEmbedder {
    model: String,
    dimensions: usize,
    normalize: bool,
}

impl LocalEmbedder {
    /// Create a new local embedder from config.
    #[must_use]
    pub fn new(config: EmbedderConfig) -> Self {
        Self {
            model: config.model,
            dimensions: config.dimensions,
            normalize: config.normalize,
        }
    }

    /// Generate a deterministic pseudo-random vector from a text hash.
    #[allow(clippy::cast_precision_loss)]
    fn generate(&self, text: &str) -> Vec<f32> {
        let mut hasher = std::collections::hash_map::DefaultHasher::new();
        text.hash(&mut hasher);
        let seed = hasher.finish();

        let mut vector = Vec::with_capacity(self.dimensions);
        for i in 0..self.dimensions {
            let value = (((seed.wrapping_mul(i as u64 + 1)) % 2000) as f32 / 1000.0) - 1.0;
            vector.push(value);
        }
        if self.normalize {
            normalize(&mut vector);
        }
        vector
    }
}

#[async_trait]
impl EmbeddingModel for LocalEmbedder {
    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let sanitized = sanitize_batch(texts);
        Ok(sanitized.iter().map(|t| self.generate(t)).collect())
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }

    fn name(&self) -> &'static str {
        "local"
    }
}
