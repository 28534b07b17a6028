//! Shared collection-naming and blob-bucket conventions used across the
//! orchestrators.

/// Bucket documents' raw content is stored under, namespaced further by
/// [`crate::blob::document_object_key`].
pub const DOCUMENT_BUCKET: &str = "documents";

/// Default collection name derivation: `kb_<tenant>_<kb>`, used when an
/// ingestion/retrieval config doesn't supply an explicit name.
#[must_use]
pub fn default_collection_name(tenant_id: &str, knowledge_base_id: &str) -> String {
    format!("kb_{tenant_id}_{knowledge_base_id}")
}

/// Lowercased filename extension, or `"unknown"` if `filename` carries
/// none. Used to populate `Document::file_type`.
#[must_use]
pub fn file_extension(filename: &str) -> String {
    filename
        .rsplit_once('.')
        .map(|(_, ext)| ext.to_ascii_lowercase())
        .filter(|ext| !ext.is_empty())
        .unwrap_or_else(|| "unknown".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn derives_default_collection_name() {
        assert_eq!(default_collection_name("t1", "kb1"), "kb_t1_kb1");
    }

    #[test]
    fn extracts_lowercased_extension() {
        assert_eq!(file_extension("Report.PDF"), "pdf");
        assert_eq!(file_extension("no_extension"), "unknown");
        assert_eq!(file_extension("trailing."), "unknown");
    }
}
