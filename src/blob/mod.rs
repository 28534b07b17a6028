//! Blob client: content storage behind a single `object_store` backend,
//! with tenant/knowledge-base/document/version path namespacing and a
//! `blob://bucket/path` URI scheme (plus the legacy bare-path forms the
//! original service accepted) so callers never hand-assemble paths.

mod adapter;
mod uri;

pub use adapter::{BlobSourceAdapter, SourceAdapter, SourceItem};
pub use uri::BlobUri;

use crate::error::{PipelineError, Result};
use bytes::Bytes;
use object_store::{path::Path as ObjectPath, ObjectStore};
use std::sync::Arc;

/// Blob storage contract. A single implementation wraps one
/// `object_store` backend; "buckets" in [`BlobUri`] are just the first
/// path segment within it, not separate backend instances — this keeps
/// local filesystem and in-memory backends usable for tests without a
/// real multi-bucket object store.
#[async_trait::async_trait]
pub trait BlobClient: Send + Sync {
    /// Fetch an object's full content.
    ///
    /// # Errors
    ///
    /// Returns `PipelineError::NotFound` if the object doesn't exist,
    /// `PipelineError::BackendFault` on any other backend error.
    async fn get(&self, uri: &BlobUri) -> Result<Vec<u8>>;

    /// Write an object, creating or overwriting it.
    ///
    /// # Errors
    ///
    /// Returns `PipelineError::BackendFault` on a backend error.
    async fn put(&self, uri: &BlobUri, content: Vec<u8>) -> Result<()>;

    /// List object keys under `bucket`/`prefix`.
    ///
    /// # Errors
    ///
    /// Returns `PipelineError::BackendFault` on a backend error.
    async fn list(&self, bucket: &str, prefix: &str) -> Result<Vec<String>>;

    /// Delete an object. Deleting a missing object is not an error.
    ///
    /// # Errors
    ///
    /// Returns `PipelineError::BackendFault` on a backend error.
    async fn delete(&self, uri: &BlobUri) -> Result<()>;

    /// Check whether an object exists.
    async fn exists(&self, uri: &BlobUri) -> Result<bool>;
}

/// `object_store`-backed implementation, usable with any backend the
/// crate supports (local filesystem, in-memory, or S3-compatible).
pub struct ObjectStoreBlobClient {
    store: Arc<dyn ObjectStore>,
}

impl ObjectStoreBlobClient {
    /// Wrap an already-configured `object_store` backend.
    #[must_use]
    pub fn new(store: Arc<dyn ObjectStore>) -> Self {
        Self { store }
    }

    /// Convenience constructor backed by an in-process, non-persistent
    /// store — used in tests and for ephemeral pipelines.
    #[must_use]
    pub fn in_memory() -> Self {
        Self::new(Arc::new(object_store::memory::InMemory::new()))
    }

    fn object_path(uri: &BlobUri) -> ObjectPath {
        ObjectPath::from(format!("{}/{}", uri.bucket, uri.key))
    }
}

#[async_trait::async_trait]
impl BlobClient for ObjectStoreBlobClient {
    async fn get(&self, uri: &BlobUri) -> Result<Vec<u8>> {
        let path = Self::object_path(uri);
        match self.store.get(&path).await {
            Ok(result) => {
                let bytes: Bytes = result.bytes().await.map_err(|e| {
                    PipelineError::backend_fault_with_source("blob_client", format!("failed to read object body: {e}"), e.into())
                })?;
                Ok(bytes.to_vec())
            }
            Err(object_store::Error::NotFound { .. }) => {
                Err(PipelineError::not_found("blob", uri.to_canonical()))
            }
            Err(e) => Err(PipelineError::backend_fault_with_source(
                "blob_client",
                format!("get failed: {e}"),
                e.into(),
            )),
        }
    }

    async fn put(&self, uri: &BlobUri, content: Vec<u8>) -> Result<()> {
        let path = Self::object_path(uri);
        self.store
            .put(&path, content.into())
            .await
            .map_err(|e| {
                PipelineError::backend_fault_with_source("blob_client", format!("put failed: {e}"), e.into())
            })?;
        Ok(())
    }

    async fn list(&self, bucket: &str, prefix: &str) -> Result<Vec<String>> {
        use futures_util::StreamExt;

        let full_prefix = ObjectPath::from(format!("{bucket}/{prefix}"));
        let mut stream = self.store.list(Some(&full_prefix));
        let mut keys = Vec::new();
        while let Some(meta) = stream.next().await {
            let meta = meta.map_err(|e| {
                PipelineError::backend_fault_with_source("blob_client", format!("list failed: {e}"), e.into())
            })?;
            if let Some(key) = meta.location.as_ref().strip_prefix(&format!("{bucket}/")) {
                keys.push(key.to_string());
            }
        }
        Ok(keys)
    }

    async fn delete(&self, uri: &BlobUri) -> Result<()> {
        let path = Self::object_path(uri);
        match self.store.delete(&path).await {
            Ok(()) | Err(object_store::Error::NotFound { .. }) => Ok(()),
            Err(e) => Err(PipelineError::backend_fault_with_source(
                "blob_client",
                format!("delete failed: {e}"),
                e.into(),
            )),
        }
    }

    async fn exists(&self, uri: &BlobUri) -> Result<bool> {
        let path = Self::object_path(uri);
        match self.store.head(&path).await {
            Ok(_) => Ok(true),
            Err(object_store::Error::NotFound { .. }) => Ok(false),
            Err(e) => Err(PipelineError::backend_fault_with_source(
                "blob_client",
                format!("exists check failed: {e}"),
                e.into(),
            )),
        }
    }
}

/// Build the canonical object key for one version of one document's
/// content within a knowledge base: `tenants/<tenant>/kb/<kb>/documents/<doc>/v<version>/content`.
#[must_use]
pub fn document_object_key(tenant_id: &str, knowledge_base_id: &str, document_id: &str, version: u32) -> String {
    format!("tenants/{tenant_id}/kb/{knowledge_base_id}/documents/{document_id}/v{version}/content")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn uri() -> BlobUri {
        BlobUri::parse("blob://docs/tenants/t1/kb1/doc1").unwrap()
    }

    #[tokio::test]
    async fn put_then_get_roundtrips() {
        let client = ObjectStoreBlobClient::in_memory();
        client.put(&uri(), b"hello world".to_vec()).await.unwrap();
        let content = client.get(&uri()).await.unwrap();
        assert_eq!(content, b"hello world");
    }

    #[tokio::test]
    async fn get_missing_object_is_not_found() {
        let client = ObjectStoreBlobClient::in_memory();
        let err = client.get(&uri()).await.unwrap_err();
        assert_eq!(err.code(), "not_found");
    }

    #[tokio::test]
    async fn delete_missing_object_is_not_an_error() {
        let client = ObjectStoreBlobClient::in_memory();
        client.delete(&uri()).await.unwrap();
    }

    #[tokio::test]
    async fn exists_reflects_put_and_delete() {
        let client = ObjectStoreBlobClient::in_memory();
        assert!(!client.exists(&uri()).await.unwrap());
        client.put(&uri(), b"x".to_vec()).await.unwrap();
        assert!(client.exists(&uri()).await.unwrap());
        client.delete(&uri()).await.unwrap();
        assert!(!client.exists(&uri()).await.unwrap());
    }

    #[test]
    fn document_object_key_is_versioned_and_namespaced() {
        let key = document_object_key("t1", "kb1", "doc1", 3);
        assert_eq!(key, "tenants/t1/kb/kb1/documents/doc1/v3/content");
    }
}
