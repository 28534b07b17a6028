//! Pluggable SSOT source adapters: list and fetch the external items a
//! [`crate::pipeline::ssot`] sync sweeps over. [`BlobSourceAdapter`] is
//! the bundled default (treats a bucket prefix as the source of truth);
//! a GitHub-repo-backed adapter or similar is a natural extension point
//! implementing the same trait.

use crate::blob::{BlobClient, BlobUri};
use crate::error::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::sync::Arc;

/// One item visible at the external source, prior to download.
#[derive(Debug, Clone)]
pub struct SourceItem {
    /// Stable identifier for this item at the source (a path, a file
    /// id, etc.) — this is what the synchronizer diffs against
    /// previously-seen items.
    pub external_id: String,
    /// Display filename, used for parser dispatch.
    pub filename: String,
    /// Size in bytes, if known without downloading.
    pub size: Option<u64>,
    /// Last-modified time at the source, if known.
    pub modified_at: Option<DateTime<Utc>>,
    /// Guessed MIME content type.
    pub content_type: Option<String>,
}

/// Contract for any external system the SSOT synchronizer can sweep:
/// list what's there, then fetch bytes for specific items.
#[async_trait]
pub trait SourceAdapter: Send + Sync {
    /// List all items currently visible at the source.
    ///
    /// # Errors
    ///
    /// Returns `PipelineError::BackendFault` if the source is
    /// unreachable or returns a malformed listing.
    async fn list_items(&self) -> Result<Vec<SourceItem>>;

    /// Download one item's content.
    ///
    /// # Errors
    ///
    /// Returns `PipelineError::NotFound` if the item no longer exists
    /// at the source, `PipelineError::BackendFault` otherwise.
    async fn fetch(&self, item: &SourceItem) -> Result<Vec<u8>>;

    /// Adapter type name, recorded on the knowledge base's SSOT config.
    fn source_type(&self) -> &'static str;
}

fn guess_content_type(filename: &str) -> Option<String> {
    let lower = filename.to_ascii_lowercase();
    let mapping: &[(&str, &str)] = &[
        (".md", "text/markdown"),
        (".markdown", "text/markdown"),
        (".txt", "text/plain"),
        (".pdf", "application/pdf"),
        (".json", "application/json"),
        (".html", "text/html"),
        (".htm", "text/html"),
        (".csv", "text/csv"),
        (".docx", "application/vnd.openxmlformats-officedocument.wordprocessingml.document"),
    ];
    mapping
        .iter()
        .find(|(ext, _)| lower.ends_with(ext))
        .map(|(_, mime)| (*mime).to_string())
}

/// Default adapter: treats one bucket/prefix in a [`BlobClient`] as the
/// single source of truth. Useful when the SSOT lives in the same
/// object store as ingested documents (e.g. a curated "master" bucket
/// synced by some out-of-band process).
pub struct BlobSourceAdapter {
    client: Arc<dyn BlobClient>,
    bucket: String,
    prefix: String,
}

impl BlobSourceAdapter {
    /// Create an adapter rooted at `bucket`/`prefix`.
    #[must_use]
    pub fn new(client: Arc<dyn BlobClient>, bucket: impl Into<String>, prefix: impl Into<String>) -> Self {
        Self {
            client,
            bucket: bucket.into(),
            prefix: prefix.into(),
        }
    }
}

#[async_trait]
impl SourceAdapter for BlobSourceAdapter {
    async fn list_items(&self) -> Result<Vec<SourceItem>> {
        let keys = self.client.list(&self.bucket, &self.prefix).await?;
        Ok(keys
            .into_iter()
            .map(|key| {
                let filename = key.rsplit('/').next().unwrap_or(&key).to_string();
                SourceItem {
                    content_type: guess_content_type(&filename),
                    external_id: key,
                    filename,
                    size: None,
                    modified_at: None,
                }
            })
            .collect())
    }

    async fn fetch(&self, item: &SourceItem) -> Result<Vec<u8>> {
        let uri = BlobUri::new(self.bucket.clone(), item.external_id.clone());
        self.client.get(&uri).await
    }

    fn source_type(&self) -> &'static str {
        "blob"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::blob::ObjectStoreBlobClient;

    #[tokio::test]
    async fn lists_and_fetches_items_under_prefix() {
        let client: Arc<dyn BlobClient> = Arc::new(ObjectStoreBlobClient::in_memory());
        client
            .put(&BlobUri::new("ssot", "docs/readme.md"), b"hello".to_vec())
            .await
            .unwrap();

        let adapter = BlobSourceAdapter::new(client, "ssot", "docs");
        let items = adapter.list_items().await.unwrap();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].filename, "readme.md");
        assert_eq!(items[0].content_type.as_deref(), Some("text/markdown"));

        let content = adapter.fetch(&items[0]).await.unwrap();
        assert_eq!(content, b"hello");
    }

    #[test]
    fn guesses_known_extensions() {
        assert_eq!(guess_content_type("a.pdf").as_deref(), Some("application/pdf"));
        assert_eq!(guess_content_type("a.unknown"), None);
    }
}
