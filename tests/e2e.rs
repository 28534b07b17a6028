//! End-to-end scenarios exercising the full ingestion, retrieval, and
//! SSOT sync dataflows through the public orchestrator API rather than
//! individual component units.

use ragcore::blob::{BlobClient, BlobSourceAdapter, BlobUri, ObjectStoreBlobClient};
use ragcore::chunking::default_factory as chunker_factory;
use ragcore::embeddings::default_factory as embedder_factory;
use ragcore::indexers::{TextIndexer, VectorIndexer, VectorMetric};
use ragcore::parsers::default_factory as parser_factory;
use ragcore::pipeline::{
    DocumentInput, IndexerSettings, IngestionConfig, IngestionOrchestrator, OptimizerSettings, RetrievalConfig,
    RetrievalOrchestrator, SearcherSettings, SsotStrategy, SsotSynchronizer,
};
use ragcore::searchers::{reciprocal_rank_fusion, SearchResult};
use ragcore::store::{KnowledgeBase, Repository, SqliteRepository};
use serde_json::json;
use std::sync::Arc;
use uuid::Uuid;

async fn seeded_knowledge_base(repository: &Arc<dyn Repository>) -> KnowledgeBase {
    let kb = KnowledgeBase {
        id: Uuid::new_v4(),
        tenant_id: "t1".to_string(),
        name: "kb1".to_string(),
        embedding_dimension: 4,
        ssot_source_type: None,
        defaults_json: json!({}),
        document_count: 0,
        chunk_count: 0,
        created_at: chrono::Utc::now(),
    };
    repository.create_knowledge_base(&kb).await.unwrap();
    kb
}

async fn ingestion_harness() -> (Arc<dyn Repository>, Arc<dyn BlobClient>, IngestionOrchestrator) {
    let repository: Arc<dyn Repository> = Arc::new(SqliteRepository::in_memory().await.unwrap());
    let blob_client: Arc<dyn BlobClient> = Arc::new(ObjectStoreBlobClient::in_memory());
    let vector_storage = Arc::new(VectorIndexer::new());
    let text_storage = Arc::new(TextIndexer::new());
    let orchestrator = IngestionOrchestrator::new(
        repository.clone(),
        blob_client.clone(),
        vector_storage,
        text_storage,
        Arc::new(parser_factory()),
        Arc::new(chunker_factory()),
        Arc::new(embedder_factory()),
    );
    (repository, blob_client, orchestrator)
}

#[tokio::test]
async fn scenario_1_happy_path_ingest_produces_expected_chunk_offsets() {
    let (repository, blob_client, orchestrator) = ingestion_harness().await;
    let kb = seeded_knowledge_base(&repository).await;

    let text = "The cat sat. The cat sat on the mat. Goodbye.";
    assert_eq!(text.chars().count(), 45, "fixture text length must match the seeded scenario");
    blob_client.put(&BlobUri::new("uploads", "doc1.txt"), text.as_bytes().to_vec()).await.unwrap();

    let config = IngestionConfig {
        parser: json!({"type": "text"}),
        chunker: json!({"type": "fixed", "chunk_size": 20, "chunk_overlap": 5}),
        embedder: json!({"type": "local", "model": "local-mock", "dimensions": 4}),
        indexer: IndexerSettings::default(),
    };
    let inputs = vec![DocumentInput {
        source_uri: "blob://uploads/doc1.txt".to_string(),
        filename: "doc1.txt".to_string(),
        is_ssot: false,
        source_external_id: None,
    }];

    let outcome = orchestrator.ingest(&kb, inputs, config).await.unwrap();
    assert_eq!(outcome.results.len(), 1);
    let result = &outcome.results[0];
    assert_eq!(result.status, "indexed");
    assert_eq!(result.chunk_count, 3);

    let document = repository.get_document(result.document_id.unwrap()).await.unwrap();
    let chunks = repository.list_chunks(document.id).await.unwrap();
    let starts: Vec<Option<usize>> = chunks.iter().map(|c| c.start_char).collect();
    assert_eq!(starts, vec![Some(0), Some(15), Some(30)]);
}

#[tokio::test]
async fn scenario_2_duplicate_bytes_are_rejected_on_second_ingest() {
    let (repository, blob_client, orchestrator) = ingestion_harness().await;
    let kb = seeded_knowledge_base(&repository).await;

    let bytes = b"repeated content".to_vec();
    blob_client.put(&BlobUri::new("uploads", "a.txt"), bytes.clone()).await.unwrap();
    blob_client.put(&BlobUri::new("uploads", "b.txt"), bytes).await.unwrap();

    let config = || IngestionConfig {
        parser: json!({"type": "text"}),
        chunker: json!({"type": "fixed", "chunk_size": 20, "chunk_overlap": 5}),
        embedder: json!({"type": "local", "model": "local-mock", "dimensions": 4}),
        indexer: IndexerSettings::default(),
    };

    let first = orchestrator
        .ingest(
            &kb,
            vec![DocumentInput {
                source_uri: "blob://uploads/a.txt".to_string(),
                filename: "a.txt".to_string(),
                is_ssot: false,
                source_external_id: None,
            }],
            config(),
        )
        .await
        .unwrap();
    assert_eq!(first.results[0].status, "indexed");
    let first_id = first.results[0].document_id.unwrap();

    let second = orchestrator
        .ingest(
            &kb,
            vec![DocumentInput {
                source_uri: "blob://uploads/b.txt".to_string(),
                filename: "b.txt".to_string(),
                is_ssot: false,
                source_external_id: None,
            }],
            config(),
        )
        .await
        .unwrap();
    assert_eq!(second.results[0].status, "failed");
    assert_eq!(second.results[0].error_code.as_deref(), Some("duplicate_document"));
    assert_eq!(second.results[0].duplicate_of, Some(first_id));
}

#[test]
fn scenario_3_hybrid_rrf_favors_the_item_ranked_well_in_both_lists() {
    let semantic = vec![SearchResult::new("a".to_string(), 1.0, 0), SearchResult::new("b".to_string(), 1.0, 1)];
    let lexical = vec![SearchResult::new("b".to_string(), 1.0, 0), SearchResult::new("a".to_string(), 1.0, 1)];
    let fused = reciprocal_rank_fusion(&[(semantic, 0.7), (lexical, 0.3)], 60.0);

    let raw_a = 0.7 / 61.0 + 0.3 / 62.0;
    let raw_b = 0.7 / 62.0 + 0.3 / 61.0;
    assert!(raw_a > raw_b);
    // Fused scores are normalized to [0, 1] by the top raw score.
    let expected_b = raw_b / raw_a;
    assert_eq!(fused[0].chunk_id, "a");
    assert!((fused[0].score - 1.0).abs() < 1e-6);
    assert!((fused[1].score - expected_b).abs() < 1e-6);
}

#[tokio::test]
async fn scenario_4_optimizer_chain_thresholds_dedups_and_truncates() {
    let scores = [0.95_f32, 0.85, 0.80, 0.75, 0.70, 0.55, 0.50, 0.45, 0.30, 0.10];
    let results: Vec<SearchResult> = scores
        .iter()
        .enumerate()
        .map(|(i, s)| {
            let mut r = SearchResult::new(format!("c{i}"), *s, i);
            // c2 and c3 share content, as do c5 and c6, to exercise content dedup.
            r.content = Some(match i {
                2 | 3 => "duplicate group one".to_string(),
                5 | 6 => "duplicate group two".to_string(),
                _ => format!("unique content {i}"),
            });
            r
        })
        .collect();

    let factory = ragcore::optimizers::default_factory();
    let chain = vec![
        factory.create("threshold", &json!({"min_score": 0.5})).unwrap(),
        factory.create("dedup", &json!({"dedup_by": "content"})).unwrap(),
    ];
    let final_results = ragcore::optimizers::run_chain(&chain, results, 3).await.unwrap();
    assert!(final_results.iter().all(|r| r.score >= 0.5));
    assert_eq!(final_results.len(), 3);
    assert!(final_results.windows(2).all(|w| w[0].score >= w[1].score));
    let unique_ids: std::collections::HashSet<_> = final_results.iter().map(|r| r.content.clone()).collect();
    assert_eq!(unique_ids.len(), final_results.len());
}

#[tokio::test]
async fn scenario_5_ssot_sweep_classifies_new_unchanged_and_modified() {
    let repository: Arc<dyn Repository> = Arc::new(SqliteRepository::in_memory().await.unwrap());
    let blob_client: Arc<dyn BlobClient> = Arc::new(ObjectStoreBlobClient::in_memory());
    let adapter = Arc::new(BlobSourceAdapter::new(blob_client.clone(), "ssot", "docs"));
    let kb = KnowledgeBase {
        id: Uuid::new_v4(),
        tenant_id: "t1".to_string(),
        name: "kb1".to_string(),
        embedding_dimension: 4,
        ssot_source_type: Some("blob".to_string()),
        defaults_json: json!({}),
        document_count: 0,
        chunk_count: 0,
        created_at: chrono::Utc::now(),
    };
    repository.create_knowledge_base(&kb).await.unwrap();
    let synchronizer = SsotSynchronizer::new(repository.clone(), blob_client.clone(), adapter);

    blob_client.put(&BlobUri::new("ssot", "docs/a.pdf"), b"version one".to_vec()).await.unwrap();
    let sweep1 = synchronizer.sync(&kb, SsotStrategy::Full).await.unwrap();
    assert_eq!(sweep1.new_count, 1);
    let document_id = sweep1.outcomes[0].document_id.unwrap();
    let after_sweep1 = repository.get_document(document_id).await.unwrap();
    assert_eq!(after_sweep1.version, 1);
    assert_eq!(after_sweep1.status, ragcore::store::DocumentStatus::Pending);

    let sweep2 = synchronizer.sync(&kb, SsotStrategy::Full).await.unwrap();
    assert_eq!(sweep2.unchanged_count, 1);
    let after_sweep2 = repository.get_document(document_id).await.unwrap();
    assert_eq!(after_sweep2.version, 1);

    blob_client.put(&BlobUri::new("ssot", "docs/a.pdf"), b"version two, with new content".to_vec()).await.unwrap();
    let sweep3 = synchronizer.sync(&kb, SsotStrategy::Full).await.unwrap();
    assert_eq!(sweep3.modified_count, 1);
    let after_sweep3 = repository.get_document(document_id).await.unwrap();
    assert_eq!(after_sweep3.version, 2);
    assert_eq!(after_sweep3.status, ragcore::store::DocumentStatus::Pending);
}

#[tokio::test]
async fn scenario_6_hybrid_retrieval_degrades_when_the_lexical_leg_is_unavailable() {
    let repository: Arc<dyn Repository> = Arc::new(SqliteRepository::in_memory().await.unwrap());
    let kb = seeded_knowledge_base(&repository).await;

    let vector_storage = Arc::new(VectorIndexer::new());
    let text_storage = Arc::new(TextIndexer::new());
    let key = ragcore::indexers::CollectionKey::new(kb.tenant_id.clone(), kb.id.to_string());
    vector_storage.ensure_collection(&key, 4, VectorMetric::Cosine).await.unwrap();
    // The text collection is deliberately never created, so the lexical
    // leg of the hybrid search faults and the searcher must degrade to
    // the vector leg alone.

    let document = ragcore::store::Document {
        id: Uuid::new_v4(),
        knowledge_base_id: kb.id,
        filename: "a.txt".to_string(),
        checksum: "deadbeef".to_string(),
        is_ssot: false,
        source_external_id: None,
        blob_uri: "blob://documents/a".to_string(),
        file_type: "txt".to_string(),
        size: 23,
        chunk_count: 1,
        metadata: json!({}),
        status: ragcore::store::DocumentStatus::Indexed,
        version: 1,
        tombstoned: false,
        error_message: None,
        created_at: chrono::Utc::now(),
        updated_at: chrono::Utc::now(),
    };
    repository.insert_document(&document).await.unwrap();
    let chunk = ragcore::store::StoredChunk {
        id: Uuid::new_v4(),
        document_id: document.id,
        index: 0,
        content: "the cat sat on the mat".to_string(),
        start_char: Some(0),
        end_char: Some(23),
        content_hash: "deadbeef".to_string(),
        embedding_model: "local-mock".to_string(),
        vector_id: Uuid::new_v4().to_string(),
        text_id: Uuid::new_v4().to_string(),
        created_at: chrono::Utc::now(),
    };
    repository.replace_chunks(document.id, std::slice::from_ref(&chunk)).await.unwrap();
    vector_storage
        .index(&key, &[ragcore::indexers::VectorRecord { chunk_id: chunk.id.to_string(), vector: vec![1.0, 0.0, 0.0, 0.0] }])
        .await
        .unwrap();

    let orchestrator = RetrievalOrchestrator::new(repository, vector_storage, text_storage, Arc::new(embedder_factory()));
    let config = RetrievalConfig {
        embedder: json!({"type": "local", "model": "local-mock", "dimensions": 4}),
        searcher: SearcherSettings {
            kind: "hybrid".to_string(),
            semantic_weight: 0.5,
            collection_name: None,
            fetch_multiplier: 3,
        },
        optimizers: Vec::<OptimizerSettings>::new(),
        top_k: 5,
    };

    let outcome = orchestrator.retrieve(&kb, "the cat", config).await.unwrap();
    assert_eq!(outcome.results.len(), 1);
    assert!(outcome.metrics.search_error.is_some());
}
