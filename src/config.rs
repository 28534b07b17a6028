//! Process configuration: connection parameters for the blob store,
//! vector store, text store, and metadata store, plus optional remote
//! embedder credentials. Parsed from TOML into a typed value object
//! rather than read ad hoc from environment variables at each call
//! site.

use crate::error::{PipelineError, Result};
use serde::{Deserialize, Serialize};

/// Top-level engine configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Metadata store connection.
    pub metadata_store: MetadataStoreConfig,
    /// Blob store connection.
    pub blob_store: BlobStoreConfig,
    /// Remote embedder credentials, if any component uses `remote`.
    pub remote_embedder: Option<RemoteEmbedderConfig>,
    /// Default knowledge base embedding dimension, used when a caller
    /// doesn't pin one explicitly.
    pub default_embedding_dimension: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            metadata_store: MetadataStoreConfig::default(),
            blob_store: BlobStoreConfig::default(),
            remote_embedder: None,
            default_embedding_dimension: 384,
        }
    }
}

/// The relational metadata store's connection parameters. Vector and
/// text storage have no connection parameters of their own — both are
/// in-process (HNSW, inverted index) rather than external services, so
/// there is nothing here to configure beyond what `EngineConfig`
/// already carries at the knowledge-base level.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MetadataStoreConfig {
    /// `sqlx` connection string, e.g. `sqlite:///var/lib/ragcore/meta.db`
    /// or `sqlite::memory:` for ephemeral pipelines.
    pub database_url: String,
}

impl Default for MetadataStoreConfig {
    fn default() -> Self {
        Self {
            database_url: "sqlite::memory:".to_string(),
        }
    }
}

/// Blob store connection parameters. `backend` selects which
/// `object_store` implementation is constructed; the remaining fields
/// are interpreted according to it.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BlobStoreConfig {
    /// `"memory"`, `"filesystem"`, or `"s3"`.
    pub backend: String,
    /// Filesystem root, when `backend = "filesystem"`.
    pub root_path: Option<String>,
    /// Bucket name, when `backend = "s3"`.
    pub bucket: Option<String>,
    /// Region, when `backend = "s3"`.
    pub region: Option<String>,
    /// Endpoint override, when `backend = "s3"` (e.g. an S3-compatible
    /// provider).
    pub endpoint: Option<String>,
}

impl Default for BlobStoreConfig {
    fn default() -> Self {
        Self {
            backend: "memory".to_string(),
            root_path: None,
            bucket: None,
            region: None,
            endpoint: None,
        }
    }
}

/// Credentials and endpoint for the `remote` embedder variant.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RemoteEmbedderConfig {
    /// Environment variable name carrying the API key. The key itself
    /// is never stored in this struct or logged.
    pub api_key_env: String,
    /// Base URL of the embeddings endpoint.
    pub base_url: String,
}

impl EngineConfig {
    /// Parse configuration from a TOML document.
    ///
    /// # Errors
    ///
    /// Returns `PipelineError::Validation` if the document doesn't
    /// match the expected shape.
    pub fn from_toml(raw: &str) -> Result<Self> {
        toml::from_str(raw).map_err(|e| PipelineError::validation(format!("invalid engine config: {e}")))
    }

    /// Validate cross-field invariants not expressible in the type
    /// alone (e.g. backend-specific required fields).
    ///
    /// # Errors
    ///
    /// Returns `PipelineError::Validation` if the config is internally
    /// inconsistent.
    pub fn validate(&self) -> Result<()> {
        match self.blob_store.backend.as_str() {
            "memory" => {}
            "filesystem" => {
                if self.blob_store.root_path.is_none() {
                    return Err(PipelineError::validation(
                        "blob_store.root_path is required when backend = 'filesystem'",
                    ));
                }
            }
            "s3" => {
                if self.blob_store.bucket.is_none() {
                    return Err(PipelineError::validation(
                        "blob_store.bucket is required when backend = 's3'",
                    ));
                }
            }
            other => {
                return Err(PipelineError::validation(format!(
                    "unknown blob_store.backend '{other}'"
                )));
            }
        }
        if self.default_embedding_dimension == 0 {
            return Err(PipelineError::validation("default_embedding_dimension must be non-zero"));
        }
        Ok(())
    }
}
