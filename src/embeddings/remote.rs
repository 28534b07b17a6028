//! HTTP API-backed embedder, modeled on `OpenAI`'s `/embeddings`
//! endpoint shape (also served, compatibly, by many self-hosted
//! gateways). Batches requests to `max_batch_size` and treats any
//! non-2xx response or transport failure as a backend fault rather
//! than a config error.

use super::{batches, sanitize_batch, EmbedderConfig, EmbeddingModel};
use crate::error::{PipelineError, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::env;

/// Remote, HTTP-backed embedding model.
#[derive(Debug)]
pub struct RemoteEmbedder {
    model: String,
    api_key: String,
    base_url: String,
    dimensions: usize,
    max_batch_size: usize,
    normalize: bool,
    client: Client,
}

impl RemoteEmbedder {
    /// Construct a remote embedder from config, resolving the API key
    /// from the environment variable it names.
    ///
    /// # Errors
    ///
    /// Returns `PipelineError::Validation` if `api_key_env` is unset or
    /// names a variable that isn't present in the environment.
    pub fn new(config: EmbedderConfig) -> Result<Self> {
        let env_var = config.api_key_env.as_deref().ok_or_else(|| {
            PipelineError::validation("remote embedder requires api_key_env".to_string())
        })?;
        let api_key = env::var(env_var).map_err(|_| {
            PipelineError::validation(format!(
                "environment variable '{env_var}' is not set for remote embedder"
            ))
        })?;

        Ok(Self {
            model: config.model,
            api_key,
            base_url: config
                .base_url
                .unwrap_or_else(|| "https://api.openai.com/v1".to_string()),
            dimensions: config.dimensions,
            max_batch_size: config.max_batch_size.max(1),
            normalize: config.normalize,
            client: Client::new(),
        })
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let request = EmbeddingRequest {
            input: texts.to_vec(),
            model: self.model.clone(),
            encoding_format: "float",
        };

        let url = format!("{}/embeddings", self.base_url);
        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                PipelineError::backend_fault_with_source(
                    "remote-embedder",
                    format!("request failed: {e}"),
                    e.into(),
                )
            })?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(PipelineError::backend_fault(
                "remote-embedder",
                format!("embeddings endpoint returned {status}: {body}"),
                None,
            ));
        }

        let parsed: EmbeddingResponse = response.json().await.map_err(|e| {
            PipelineError::backend_fault_with_source(
                "remote-embedder",
                format!("malformed response: {e}"),
                e.into(),
            )
        })?;

        let mut vectors: Vec<_> = parsed.data;
        vectors.sort_by_key(|d| d.index);
        let mut out: Vec<Vec<f32>> = vectors.into_iter().map(|d| d.embedding).collect();
        if self.normalize {
            for v in &mut out {
                super::normalize(v);
            }
        }
        Ok(out)
    }
}

#[async_trait]
impl EmbeddingModel for RemoteEmbedder {
    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }
        let sanitized = sanitize_batch(texts);
        let mut out = Vec::with_capacity(sanitized.len());
        for chunk in batches(&sanitized, self.max_batch_size) {
            out.extend(self.embed_batch(chunk).await?);
        }
        Ok(out)
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }

    fn name(&self) -> &'static str {
        "remote"
    }
}

#[derive(Debug, Serialize)]
struct EmbeddingRequest {
    input: Vec<String>,
    model: String,
    encoding_format: &'static str,
}

#[derive(Debug, Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingData>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingData {
    embedding: Vec<f32>,
    index: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_api_key_env_is_a_validation_error() {
        let config = EmbedderConfig {
            api_key_env: None,
            ..Default::default()
        };
        let err = RemoteEmbedder::new(config).unwrap_err();
        assert_eq!(err.code(), "validation");
    }

    #[test]
    fn unset_env_var_is_a_validation_error() {
        let config = EmbedderConfig {
            api_key_env: Some("RAGCORE_TEST_UNSET_KEY_VAR".to_string()),
            ..Default::default()
        };
        assert!(RemoteEmbedder::new(config).is_err());
    }
}
