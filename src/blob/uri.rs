//! `blob://bucket/path` URIs, plus the bare `bucket/path` and
//! `/bucket/path` legacy forms the original MinIO-backed service
//! accepted.

use crate::error::{PipelineError, Result};

/// A parsed blob location: a bucket (first path segment) and a key
/// (everything after it).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlobUri {
    /// Bucket name.
    pub bucket: String,
    /// Object key within the bucket.
    pub key: String,
}

impl BlobUri {
    /// Construct directly from parts.
    #[must_use]
    pub fn new(bucket: impl Into<String>, key: impl Into<String>) -> Self {
        Self {
            bucket: bucket.into(),
            key: key.into(),
        }
    }

    /// Parse any of the accepted forms:
    /// - `blob://bucket/path/to/object`
    /// - `bucket/path/to/object`
    /// - `/bucket/path/to/object`
    ///
    /// # Errors
    ///
    /// Returns `PipelineError::Validation` if the input has no bucket
    /// segment (empty, or only a leading slash).
    pub fn parse(raw: &str) -> Result<Self> {
        let rest = raw.strip_prefix("blob://").unwrap_or(raw);
        let rest = rest.strip_prefix('/').unwrap_or(rest);

        let mut parts = rest.splitn(2, '/');
        let bucket = parts.next().unwrap_or("");
        let key = parts.next().unwrap_or("");

        if bucket.is_empty() {
            return Err(PipelineError::validation(format!("blob URI '{raw}' has no bucket segment")));
        }

        Ok(Self {
            bucket: bucket.to_string(),
            key: key.to_string(),
        })
    }

    /// Render in canonical `blob://bucket/path` form.
    #[must_use]
    pub fn to_canonical(&self) -> String {
        format!("blob://{}/{}", self.bucket, self.key)
    }
}

impl std::fmt::Display for BlobUri {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.to_canonical())
    }
}
