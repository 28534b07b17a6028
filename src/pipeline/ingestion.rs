//! Ingestion orchestrator: parse -> chunk -> embed -> index. One bad
//! document never aborts the batch — failures are isolated to the
//! document's own result and status.

use super::collection::{default_collection_name, file_extension, DOCUMENT_BUCKET};
use crate::blob::{document_object_key, BlobClient, BlobUri};
use crate::chunking::{ChunkConfig, Chunker};
use crate::embeddings::EmbeddingModel;
use crate::error::{PipelineError, Result};
use crate::indexers::{CollectionKey, TextRecord, TextStorage, VectorMetric, VectorRecord, VectorStorage};
use crate::parsers::Parser;
use crate::registry::Factory;
use crate::store::{Document, DocumentStatus, KnowledgeBase, PipelineRun, Repository, RunKind, RunStatus, StoredChunk};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sha2::{Digest, Sha256};
use std::sync::Arc;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// One document to ingest: where its raw bytes currently live, and what
/// to call it.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DocumentInput {
    /// Blob URI (any accepted form, see [`BlobUri::parse`]) the raw
    /// bytes can currently be downloaded from.
    pub source_uri: String,
    /// Original filename, used for parser dispatch.
    pub filename: String,
    /// Whether this input came from a synced SSOT source.
    #[serde(default)]
    pub is_ssot: bool,
    /// External id (source path) at the SSOT source, if `is_ssot`.
    #[serde(default)]
    pub source_external_id: Option<String>,
}

/// Ingestion pipeline configuration: one component config per stage.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct IngestionConfig {
    /// `{type, ...}` parser component config.
    pub parser: Value,
    /// `{type, chunk_size, chunk_overlap, ...}` chunker component config.
    pub chunker: Value,
    /// `{type, model?, ...}` embedder component config.
    pub embedder: Value,
    /// Indexer placement settings (both vector and text backends are
    /// always populated; this controls naming/dimension only).
    #[serde(default)]
    pub indexer: IndexerSettings,
}

/// Indexer placement: which collection to write into, and at what
/// dimension (defaulting to the embedder's own).
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct IndexerSettings {
    /// Explicit collection name override.
    #[serde(default)]
    pub collection_name: Option<String>,
    /// Explicit vector dimension override.
    #[serde(default)]
    pub dimension: Option<usize>,
    /// Distance metric the vector collection is created with. Only takes
    /// effect the first time a collection is created; ignored on later
    /// calls against an already-existing collection.
    #[serde(default)]
    pub metric: VectorMetric,
}

/// Outcome of ingesting one document.
#[derive(Debug, Clone, Serialize)]
pub struct DocumentResult {
    /// The document's id, if one was created.
    pub document_id: Option<Uuid>,
    /// Original filename.
    pub filename: String,
    /// Final status: `"indexed"` or `"failed"`.
    pub status: &'static str,
    /// Number of chunks indexed.
    pub chunk_count: usize,
    /// Stable error code, if this document failed.
    pub error_code: Option<String>,
    /// Error detail, if this document failed.
    pub error_message: Option<String>,
    /// Set when the failure is a checksum collision.
    pub duplicate_of: Option<Uuid>,
}

/// Summary of one ingestion run.
#[derive(Debug, Clone, Serialize)]
pub struct IngestionOutcome {
    /// The `PipelineRun` id this ingestion was recorded under.
    pub run_id: Uuid,
    /// Per-document outcomes, in input order.
    pub results: Vec<DocumentResult>,
    /// Wall-clock duration of the whole batch.
    pub duration_ms: u64,
}

/// Drives one ingestion run against the shared storage collaborators.
pub struct IngestionOrchestrator {
    repository: Arc<dyn Repository>,
    blob_client: Arc<dyn BlobClient>,
    vector_storage: Arc<dyn VectorStorage>,
    text_storage: Arc<dyn TextStorage>,
    parsers: Arc<Factory<Arc<dyn Parser>>>,
    chunkers: Arc<Factory<Arc<dyn Chunker>>>,
    embedders: Arc<Factory<Arc<dyn EmbeddingModel>>>,
}

impl IngestionOrchestrator {
    /// Build an orchestrator over the given collaborators and component
    /// factories.
    #[must_use]
    pub fn new(
        repository: Arc<dyn Repository>,
        blob_client: Arc<dyn BlobClient>,
        vector_storage: Arc<dyn VectorStorage>,
        text_storage: Arc<dyn TextStorage>,
        parsers: Arc<Factory<Arc<dyn Parser>>>,
        chunkers: Arc<Factory<Arc<dyn Chunker>>>,
        embedders: Arc<Factory<Arc<dyn EmbeddingModel>>>,
    ) -> Self {
        Self {
            repository,
            blob_client,
            vector_storage,
            text_storage,
            parsers,
            chunkers,
            embedders,
        }
    }

    /// Ingest `inputs` into `knowledge_base`.
    ///
    /// # Errors
    ///
    /// Returns an error only for failures that prevent the run from
    /// starting at all (unknown component names, `ensure_collection`
    /// faults). Per-document failures are reported in
    /// [`IngestionOutcome::results`], never propagated here.
    pub async fn ingest(
        &self,
        knowledge_base: &KnowledgeBase,
        inputs: Vec<DocumentInput>,
        config: IngestionConfig,
    ) -> Result<IngestionOutcome> {
        let start = std::time::Instant::now();

        let run = PipelineRun {
            id: Uuid::new_v4(),
            knowledge_base_id: knowledge_base.id,
            document_id: None,
            kind: RunKind::Ingestion,
            status: RunStatus::Running,
            config_snapshot: serde_json::to_value(&config).unwrap_or(Value::Null),
            result_snapshot: None,
            error_code: None,
            error_message: None,
            started_at: Utc::now(),
            completed_at: None,
        };
        self.repository.create_run(&run).await?;
        info!(run_id = %run.id, documents = inputs.len(), "ingestion run started");

        let parser_type = component_type(&config.parser)?;
        let parser = self.parsers.create(parser_type, &config.parser)?;
        let chunker_type = component_type(&config.chunker)?;
        let chunker = self.chunkers.create(chunker_type, &config.chunker)?;
        let embedder_type = component_type(&config.embedder)?;
        let embedder = self.embedders.create(embedder_type, &config.embedder)?;

        let chunk_config: ChunkConfig = serde_json::from_value(config.chunker.clone())
            .map_err(|e| PipelineError::validation(format!("invalid chunker config: {e}")))?;
        chunk_config.validate()?;

        let collection_name = config
            .indexer
            .collection_name
            .clone()
            .unwrap_or_else(|| default_collection_name(&knowledge_base.tenant_id, &knowledge_base.id.to_string()));
        let key = CollectionKey::new(knowledge_base.tenant_id.clone(), collection_name);
        let dimension = config.indexer.dimension.unwrap_or_else(|| embedder.dimensions());

        self.vector_storage
            .ensure_collection(&key, dimension, config.indexer.metric)
            .await?;
        self.text_storage.ensure_collection(&key).await?;

        let mut results = Vec::with_capacity(inputs.len());
        for input in inputs {
            let outcome = self
                .ingest_one(knowledge_base, &input, &*parser, &*chunker, &chunk_config, &*embedder, &key)
                .await;
            match outcome {
                Ok(result) => results.push(result),
                Err((filename, err)) => {
                    warn!(filename = %filename, error = %err, "document ingestion failed before a record could be created");
                    results.push(DocumentResult {
                        document_id: None,
                        filename,
                        status: "failed",
                        chunk_count: 0,
                        error_code: Some(err.code().to_string()),
                        error_message: Some(err.to_string()),
                        duplicate_of: None,
                    });
                }
            }
        }

        let duration_ms = u64::try_from(start.elapsed().as_millis()).unwrap_or(u64::MAX);
        let indexed = results.iter().filter(|r| r.status == "indexed").count();
        let failed = results.len() - indexed;
        self.repository
            .complete_run(
                run.id,
                RunStatus::Succeeded,
                serde_json::json!({"indexed": indexed, "failed": failed, "duration_ms": duration_ms}),
                None,
                None,
            )
            .await?;
        info!(run_id = %run.id, indexed, failed, duration_ms, "ingestion run completed");

        Ok(IngestionOutcome {
            run_id: run.id,
            results,
            duration_ms,
        })
    }

    #[allow(clippy::too_many_arguments)]
    async fn ingest_one(
        &self,
        knowledge_base: &KnowledgeBase,
        input: &DocumentInput,
        parser: &dyn Parser,
        chunker: &dyn Chunker,
        chunk_config: &ChunkConfig,
        embedder: &dyn EmbeddingModel,
        key: &CollectionKey,
    ) -> std::result::Result<DocumentResult, (String, PipelineError)> {
        let source_uri =
            BlobUri::parse(&input.source_uri).map_err(|e| (input.filename.clone(), e))?;
        let bytes = self
            .blob_client
            .get(&source_uri)
            .await
            .map_err(|e| (input.filename.clone(), e))?;

        let checksum = sha256_hex(&bytes);

        if let Some(existing) = self
            .repository
            .find_document_by_checksum(knowledge_base.id, &checksum)
            .await
            .map_err(|e| (input.filename.clone(), e))?
        {
            debug!(existing_id = %existing.id, filename = %input.filename, "duplicate checksum");
            return Ok(DocumentResult {
                document_id: None,
                filename: input.filename.clone(),
                status: "failed",
                chunk_count: 0,
                error_code: Some("duplicate_document".to_string()),
                error_message: Some(format!("checksum already exists as document {}", existing.id)),
                duplicate_of: Some(existing.id),
            });
        }

        let document_id = Uuid::new_v4();
        let now = Utc::now();
        let mut document = Document {
            id: document_id,
            knowledge_base_id: knowledge_base.id,
            filename: input.filename.clone(),
            checksum: checksum.clone(),
            is_ssot: input.is_ssot,
            source_external_id: input.source_external_id.clone(),
            blob_uri: source_uri.to_canonical(),
            file_type: file_extension(&input.filename),
            size: i64::try_from(bytes.len()).unwrap_or(i64::MAX),
            chunk_count: 0,
            metadata: serde_json::json!({}),
            status: DocumentStatus::Pending,
            version: 1,
            tombstoned: false,
            error_message: None,
            created_at: now,
            updated_at: now,
        };
        self.repository.insert_document(&document).await.map_err(|e| (input.filename.clone(), e))?;

        match self
            .process_document(knowledge_base, &mut document, &bytes, parser, chunker, chunk_config, embedder, key)
            .await
        {
            Ok(chunk_count) => Ok(DocumentResult {
                document_id: Some(document.id),
                filename: document.filename.clone(),
                status: "indexed",
                chunk_count,
                error_code: None,
                error_message: None,
                duplicate_of: None,
            }),
            Err(err) => {
                document.status = DocumentStatus::Failed;
                document.error_message = Some(err.to_string());
                document.updated_at = Utc::now();
                let _ = self.repository.update_document(&document).await;
                Ok(DocumentResult {
                    document_id: Some(document.id),
                    filename: document.filename.clone(),
                    status: "failed",
                    chunk_count: 0,
                    error_code: Some(err.code().to_string()),
                    error_message: Some(err.to_string()),
                    duplicate_of: None,
                })
            }
        }
    }

    #[allow(clippy::too_many_arguments)]
    async fn process_document(
        &self,
        knowledge_base: &KnowledgeBase,
        document: &mut Document,
        bytes: &[u8],
        parser: &dyn Parser,
        chunker: &dyn Chunker,
        chunk_config: &ChunkConfig,
        embedder: &dyn EmbeddingModel,
        key: &CollectionKey,
    ) -> Result<usize> {
        document.status = DocumentStatus::Processing;
        document.updated_at = Utc::now();
        self.repository.update_document(document).await?;

        let canonical_key =
            document_object_key(&knowledge_base.tenant_id, &knowledge_base.id.to_string(), &document.id.to_string(), document.version);
        let canonical_uri = BlobUri::new(DOCUMENT_BUCKET, canonical_key);
        self.blob_client.put(&canonical_uri, bytes.to_vec()).await?;
        document.blob_uri = canonical_uri.to_canonical();

        let parsed = parser.parse(bytes, &document.filename).await?;
        document.metadata = serde_json::to_value(&parsed.metadata).unwrap_or(Value::Null);
        let chunks = chunker.chunk(&parsed.content, chunk_config).await?;

        if chunks.is_empty() {
            document.chunk_count = 0;
            document.status = DocumentStatus::Indexed;
            document.updated_at = Utc::now();
            self.repository.update_document(document).await?;
            self.repository.replace_chunks(document.id, &[]).await?;
            return Ok(0);
        }

        let contents: Vec<String> = chunks.iter().map(|c| c.content.clone()).collect();
        let vectors = embedder.embed(&contents).await?;
        if vectors.len() != chunks.len() {
            return Err(PipelineError::internal(format!(
                "embedder returned {} vectors for {} chunks",
                vectors.len(),
                chunks.len()
            )));
        }

        let now = Utc::now();
        let stored_chunks: Vec<StoredChunk> = chunks
            .iter()
            .map(|c| {
                let id = Uuid::new_v4();
                StoredChunk {
                    id,
                    document_id: document.id,
                    index: c.index,
                    content_hash: sha256_hex(c.content.as_bytes()),
                    content: c.content.clone(),
                    start_char: c.start_char,
                    end_char: c.end_char,
                    embedding_model: embedder.name().to_string(),
                    vector_id: id.to_string(),
                    text_id: id.to_string(),
                    created_at: now,
                }
            })
            .collect();

        let vector_records: Vec<VectorRecord> = stored_chunks
            .iter()
            .zip(vectors.iter())
            .map(|(chunk, vector)| VectorRecord {
                chunk_id: chunk.id.to_string(),
                vector: vector.clone(),
            })
            .collect();
        let text_records: Vec<TextRecord> = stored_chunks
            .iter()
            .map(|chunk| TextRecord {
                chunk_id: chunk.id.to_string(),
                content: chunk.content.clone(),
            })
            .collect();

        self.vector_storage.index(key, &vector_records).await?;
        self.text_storage.index(key, &text_records).await?;
        self.repository.replace_chunks(document.id, &stored_chunks).await?;

        document.chunk_count = i64::try_from(stored_chunks.len()).unwrap_or(i64::MAX);
        document.status = DocumentStatus::Indexed;
        document.updated_at = Utc::now();
        self.repository.update_document(document).await?;

        Ok(stored_chunks.len())
    }
}

fn component_type(config: &Value) -> Result<&str> {
    config
        .get("type")
        .and_then(Value::as_str)
        .ok_or_else(|| PipelineError::validation("component config missing required 'type' field"))
}

fn sha256_hex(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    format!("{:x}", hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::blob::ObjectStoreBlobClient;
    use crate::indexers::{TextIndexer, VectorIndexer};
    use crate::store::SqliteRepository;

    async fn new_orchestrator() -> (IngestionOrchestrator, Arc<dyn BlobClient>) {
        let repository: Arc<dyn Repository> = Arc::new(SqliteRepository::in_memory().await.unwrap());
        let blob_client: Arc<dyn BlobClient> = Arc::new(ObjectStoreBlobClient::in_memory());
        let vector_storage: Arc<dyn VectorStorage> = Arc::new(VectorIndexer::new());
        let text_storage: Arc<dyn TextStorage> = Arc::new(TextIndexer::new());

        let orchestrator = IngestionOrchestrator::new(
            repository,
            blob_client.clone(),
            vector_storage,
            text_storage,
            Arc::new(crate::parsers::default_factory()),
            Arc::new(crate::chunking::default_factory()),
            Arc::new(crate::embeddings::default_factory()),
        );
        (orchestrator, blob_client)
    }

    #[tokio::test]
    async fn happy_path_ingest_produces_expected_chunk_offsets() {
        let (orchestrator, blob_client) = new_orchestrator().await;
        let kb = KnowledgeBase {
            id: Uuid::new_v4(),
            tenant_id: "t1".to_string(),
            name: "kb1".to_string(),
            embedding_dimension: 4,
            ssot_source_type: None,
            defaults_json: serde_json::json!({}),
            document_count: 0,
            chunk_count: 0,
            created_at: Utc::now(),
        };

        let text = "The cat sat. The cat sat on the mat. Goodbye.";
        let uri = BlobUri::new("uploads", "a.txt");
        blob_client.put(&uri, text.as_bytes().to_vec()).await.unwrap();

        let config = IngestionConfig {
            parser: serde_json::json!({"type": "text"}),
            chunker: serde_json::json!({"type": "fixed", "chunk_size": 20, "chunk_overlap": 5}),
            embedder: serde_json::json!({"type": "local", "model": "local-mock", "dimensions": 4}),
            indexer: IndexerSettings::default(),
        };

        let outcome = orchestrator
            .ingest(
                &kb,
                vec![DocumentInput {
                    source_uri: uri.to_canonical(),
                    filename: "a.txt".to_string(),
                    is_ssot: false,
                    source_external_id: None,
                }],
                config,
            )
            .await
            .unwrap();

        assert_eq!(outcome.results.len(), 1);
        let result = &outcome.results[0];
        assert_eq!(result.status, "indexed");
        assert_eq!(result.chunk_count, 3);
    }

    #[tokio::test]
    async fn duplicate_bytes_are_rejected_on_second_ingest() {
        let (orchestrator, blob_client) = new_orchestrator().await;
        let kb = KnowledgeBase {
            id: Uuid::new_v4(),
            tenant_id: "t1".to_string(),
            name: "kb1".to_string(),
            embedding_dimension: 4,
            ssot_source_type: None,
            defaults_json: serde_json::json!({}),
            document_count: 0,
            chunk_count: 0,
            created_at: Utc::now(),
        };

        let uri = BlobUri::new("uploads", "a.txt");
        blob_client.put(&uri, b"hello world".to_vec()).await.unwrap();

        let config = || IngestionConfig {
            parser: serde_json::json!({"type": "text"}),
            chunker: serde_json::json!({"type": "fixed", "chunk_size": 20, "chunk_overlap": 5}),
            embedder: serde_json::json!({"type": "local", "model": "local-mock", "dimensions": 4}),
            indexer: IndexerSettings::default(),
        };
        let input = || DocumentInput {
            source_uri: uri.to_canonical(),
            filename: "a.txt".to_string(),
            is_ssot: false,
            source_external_id: None,
        };

        let first = orchestrator.ingest(&kb, vec![input()], config()).await.unwrap();
        assert_eq!(first.results[0].status, "indexed");
        let first_id = first.results[0].document_id.unwrap();

        let second = orchestrator.ingest(&kb, vec![input()], config()).await.unwrap();
        assert_eq!(second.results[0].status, "failed");
        assert_eq!(second.results[0].duplicate_of, Some(first_id));
    }
}
