//! SSOT synchronizer: reconciles a knowledge base's documents against an
//! external [`SourceAdapter`]. A sweep never indexes — it only
//! classifies and updates [`Document`] rows; the caller triggers
//! ingestion afterward for any document left `Pending`.

use super::collection::{file_extension, DOCUMENT_BUCKET};
use crate::blob::{document_object_key, BlobClient, BlobUri, SourceAdapter, SourceItem};
use crate::error::Result;
use crate::store::{Document, DocumentStatus, KnowledgeBase, Repository};
use chrono::Utc;
use serde::Serialize;
use sha2::{Digest, Sha256};
use std::sync::Arc;
use tracing::{info, warn};
use uuid::Uuid;

/// How aggressively a sweep re-checks items it has already seen.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SsotStrategy {
    /// Re-download and re-checksum every item on every sweep.
    Full,
    /// Skip the download when the source reports a `modified_at` no
    /// later than the existing document's `updated_at`. Degrades to
    /// [`SsotStrategy::Full`] for adapters that don't report
    /// modification times (e.g. [`crate::blob::BlobSourceAdapter`]).
    Incremental,
}

/// One item's outcome during a sweep, recorded even on success so a
/// caller can audit exactly what happened without re-deriving it from
/// the before/after document list.
#[derive(Debug, Clone, Serialize)]
pub struct ItemOutcome {
    /// The source's external id for this item.
    pub external_id: String,
    /// `"new"`, `"modified"`, `"unchanged"`, or `"deleted"`.
    pub classification: &'static str,
    /// The document id affected, if any.
    pub document_id: Option<Uuid>,
}

/// Summary of one sync sweep.
#[derive(Debug, Clone, Default, Serialize)]
pub struct SyncResult {
    /// Count of items classified `new`.
    pub new_count: usize,
    /// Count of items classified `modified` (content actually changed).
    pub modified_count: usize,
    /// Count of items classified `unchanged`.
    pub unchanged_count: usize,
    /// Count of existing documents classified `deleted` (tombstoned).
    pub deleted_count: usize,
    /// Per-item outcomes, in sweep order.
    pub outcomes: Vec<ItemOutcome>,
    /// One entry per item whose processing failed; a failure here never
    /// aborts the rest of the sweep.
    pub errors: Vec<String>,
}

/// Drives one SSOT sweep for a knowledge base against one adapter.
pub struct SsotSynchronizer {
    repository: Arc<dyn Repository>,
    blob_client: Arc<dyn BlobClient>,
    adapter: Arc<dyn SourceAdapter>,
}

impl SsotSynchronizer {
    /// Build a synchronizer over the given collaborators.
    #[must_use]
    pub fn new(repository: Arc<dyn Repository>, blob_client: Arc<dyn BlobClient>, adapter: Arc<dyn SourceAdapter>) -> Self {
        Self {
            repository,
            blob_client,
            adapter,
        }
    }

    /// Sweep the source, reconciling it against `knowledge_base`'s
    /// existing SSOT documents.
    ///
    /// # Errors
    ///
    /// Returns an error only if the source listing itself fails;
    /// per-item failures are collected into [`SyncResult::errors`].
    pub async fn sync(&self, knowledge_base: &KnowledgeBase, strategy: SsotStrategy) -> Result<SyncResult> {
        let items = self.adapter.list_items().await?;
        info!(knowledge_base_id = %knowledge_base.id, items = items.len(), "ssot sweep started");

        let existing = self.repository.list_documents(knowledge_base.id, true).await?;
        let mut by_external_id: std::collections::HashMap<String, Document> = existing
            .into_iter()
            .filter_map(|d| d.source_external_id.clone().map(|id| (id, d)))
            .collect();

        let mut result = SyncResult::default();
        let seen: std::collections::HashSet<String> = items.iter().map(|i| i.external_id.clone()).collect();

        for item in &items {
            match self.reconcile_item(knowledge_base, item, strategy, by_external_id.remove(&item.external_id)).await {
                Ok(outcome) => {
                    match outcome.classification {
                        "new" => result.new_count += 1,
                        "modified" => result.modified_count += 1,
                        "unchanged" => result.unchanged_count += 1,
                        _ => {}
                    }
                    result.outcomes.push(outcome);
                }
                Err(e) => {
                    warn!(external_id = %item.external_id, error = %e, "ssot item reconciliation failed");
                    result.errors.push(format!("{}: {e}", item.external_id));
                }
            }
        }

        // Anything left in `by_external_id` existed before this sweep but
        // wasn't in the current listing: tombstone it.
        for (external_id, mut document) in by_external_id {
            if seen.contains(&external_id) {
                continue;
            }
            document.tombstoned = true;
            document.status = DocumentStatus::Failed;
            document.updated_at = Utc::now();
            match self.repository.update_document(&document).await {
                Ok(()) => {
                    result.deleted_count += 1;
                    result.outcomes.push(ItemOutcome {
                        external_id: external_id.clone(),
                        classification: "deleted",
                        document_id: Some(document.id),
                    });
                }
                Err(e) => {
                    warn!(external_id = %external_id, error = %e, "failed to tombstone deleted ssot document");
                    result.errors.push(format!("{external_id}: {e}"));
                }
            }
        }

        info!(
            knowledge_base_id = %knowledge_base.id,
            new = result.new_count,
            modified = result.modified_count,
            unchanged = result.unchanged_count,
            deleted = result.deleted_count,
            errors = result.errors.len(),
            "ssot sweep completed"
        );
        Ok(result)
    }

    async fn reconcile_item(
        &self,
        knowledge_base: &KnowledgeBase,
        item: &SourceItem,
        strategy: SsotStrategy,
        existing: Option<Document>,
    ) -> Result<ItemOutcome> {
        let Some(mut document) = existing else {
            return self.ingest_new(knowledge_base, item).await;
        };

        if strategy == SsotStrategy::Incremental {
            if let Some(modified_at) = item.modified_at {
                if modified_at <= document.updated_at {
                    return Ok(ItemOutcome {
                        external_id: item.external_id.clone(),
                        classification: "unchanged",
                        document_id: Some(document.id),
                    });
                }
            }
        }

        let bytes = self.adapter.fetch(item).await?;
        let checksum = sha256_hex(&bytes);

        if checksum == document.checksum {
            document.updated_at = Utc::now();
            self.repository.update_document(&document).await?;
            return Ok(ItemOutcome {
                external_id: item.external_id.clone(),
                classification: "unchanged",
                document_id: Some(document.id),
            });
        }

        document.version += 1;
        document.checksum = checksum;
        let key = document_object_key(&knowledge_base.tenant_id, &knowledge_base.id.to_string(), &document.id.to_string(), document.version);
        let uri = BlobUri::new(DOCUMENT_BUCKET, key);
        document.size = i64::try_from(bytes.len()).unwrap_or(i64::MAX);
        self.blob_client.put(&uri, bytes).await?;
        document.blob_uri = uri.to_canonical();
        document.status = DocumentStatus::Pending;
        document.tombstoned = false;
        document.error_message = None;
        document.updated_at = Utc::now();
        self.repository.update_document(&document).await?;

        Ok(ItemOutcome {
            external_id: item.external_id.clone(),
            classification: "modified",
            document_id: Some(document.id),
        })
    }

    async fn ingest_new(&self, knowledge_base: &KnowledgeBase, item: &SourceItem) -> Result<ItemOutcome> {
        let bytes = self.adapter.fetch(item).await?;
        let checksum = sha256_hex(&bytes);

        if let Some(existing) = self.repository.find_document_by_checksum(knowledge_base.id, &checksum).await? {
            return Ok(ItemOutcome {
                external_id: item.external_id.clone(),
                classification: "unchanged",
                document_id: Some(existing.id),
            });
        }

        let document_id = Uuid::new_v4();
        let key = document_object_key(&knowledge_base.tenant_id, &knowledge_base.id.to_string(), &document_id.to_string(), 1);
        let uri = BlobUri::new(DOCUMENT_BUCKET, key);
        let size = i64::try_from(bytes.len()).unwrap_or(i64::MAX);
        self.blob_client.put(&uri, bytes).await?;

        let now = Utc::now();
        let document = Document {
            id: document_id,
            knowledge_base_id: knowledge_base.id,
            filename: item.filename.clone(),
            checksum,
            is_ssot: true,
            source_external_id: Some(item.external_id.clone()),
            blob_uri: uri.to_canonical(),
            file_type: file_extension(&item.filename),
            size,
            chunk_count: 0,
            metadata: serde_json::json!({}),
            status: DocumentStatus::Pending,
            version: 1,
            tombstoned: false,
            error_message: None,
            created_at: now,
            updated_at: now,
        };
        self.repository.insert_document(&document).await?;

        Ok(ItemOutcome {
            external_id: item.external_id.clone(),
            classification: "new",
            document_id: Some(document.id),
        })
    }
}

fn sha256_hex(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    format!("{:x}", hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::blob::{BlobSourceAdapter, ObjectStoreBlobClient};
    use crate::store::SqliteRepository;

    async fn new_synchronizer() -> (SsotSynchronizer, Arc<dyn BlobClient>, KnowledgeBase) {
        let repository: Arc<dyn Repository> = Arc::new(SqliteRepository::in_memory().await.unwrap());
        let blob_client: Arc<dyn BlobClient> = Arc::new(ObjectStoreBlobClient::in_memory());
        let adapter: Arc<dyn SourceAdapter> = Arc::new(BlobSourceAdapter::new(blob_client.clone(), "ssot", "docs"));
        let kb = KnowledgeBase {
            id: Uuid::new_v4(),
            tenant_id: "t1".to_string(),
            name: "kb1".to_string(),
            embedding_dimension: 4,
            ssot_source_type: Some("blob".to_string()),
            defaults_json: serde_json::json!({}),
            document_count: 0,
            chunk_count: 0,
            created_at: Utc::now(),
        };
        let synchronizer = SsotSynchronizer::new(repository, blob_client.clone(), adapter);
        (synchronizer, blob_client, kb)
    }

    #[tokio::test]
    async fn first_sweep_creates_pending_documents() {
        let (synchronizer, blob_client, kb) = new_synchronizer().await;
        blob_client
            .put(&BlobUri::new("ssot", "docs/a.pdf"), b"version one".to_vec())
            .await
            .unwrap();

        let result = synchronizer.sync(&kb, SsotStrategy::Full).await.unwrap();
        assert_eq!(result.new_count, 1);
        assert_eq!(result.outcomes[0].classification, "new");
    }

    #[tokio::test]
    async fn unchanged_bytes_leave_version_untouched() {
        let (synchronizer, blob_client, kb) = new_synchronizer().await;
        blob_client
            .put(&BlobUri::new("ssot", "docs/a.pdf"), b"version one".to_vec())
            .await
            .unwrap();
        synchronizer.sync(&kb, SsotStrategy::Full).await.unwrap();

        let result = synchronizer.sync(&kb, SsotStrategy::Full).await.unwrap();
        assert_eq!(result.unchanged_count, 1);
    }

    #[tokio::test]
    async fn changed_bytes_bump_version_and_reset_to_pending() {
        let (synchronizer, blob_client, kb) = new_synchronizer().await;
        blob_client
            .put(&BlobUri::new("ssot", "docs/a.pdf"), b"version one".to_vec())
            .await
            .unwrap();
        synchronizer.sync(&kb, SsotStrategy::Full).await.unwrap();

        blob_client
            .put(&BlobUri::new("ssot", "docs/a.pdf"), b"version two, much longer".to_vec())
            .await
            .unwrap();
        let result = synchronizer.sync(&kb, SsotStrategy::Full).await.unwrap();
        assert_eq!(result.modified_count, 1);
    }

    #[tokio::test]
    async fn item_removed_from_source_is_tombstoned() {
        let (synchronizer, blob_client, kb) = new_synchronizer().await;
        blob_client
            .put(&BlobUri::new("ssot", "docs/a.pdf"), b"version one".to_vec())
            .await
            .unwrap();
        synchronizer.sync(&kb, SsotStrategy::Full).await.unwrap();

        blob_client.delete(&BlobUri::new("ssot", "docs/a.pdf")).await.unwrap();
        let result = synchronizer.sync(&kb, SsotStrategy::Full).await.unwrap();
        assert_eq!(result.deleted_count, 1);
    }
}
