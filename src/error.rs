//! Crate-wide error type.
//!
//! Every fallible component or orchestrator operation returns this error.
//! Each variant corresponds to one of the six error kinds in the design
//! (`Validation`, `DuplicateDocument`, `NotFound`, `Timeout`, `BackendFault`,
//! `Internal`) and carries a stable `code()` so callers and audit records
//! can key off it without string-matching the display message.

use thiserror::Error;

/// Crate-wide result alias.
pub type Result<T> = std::result::Result<T, PipelineError>;

/// All errors the pipeline engine can surface.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// Unknown component, schema violation, empty query, `top_k` out of
    /// range, etc. Surfaced at the boundary; never recorded to a run.
    #[error("validation error: {message}")]
    Validation {
        /// Human-readable detail.
        message: String,
    },

    /// Checksum collision within a knowledge base. Carries the existing
    /// document id and whether it is an SSOT document, per I2.
    #[error("duplicate document: checksum already exists as {existing_id} (ssot={existing_is_ssot})")]
    DuplicateDocument {
        /// Id of the document already occupying this (KB, checksum) slot.
        existing_id: String,
        /// Whether the existing document is an SSOT document.
        existing_is_ssot: bool,
    },

    /// Unknown run, document, or knowledge base.
    #[error("not found: {kind} {id}")]
    NotFound {
        /// The kind of entity that was not found (e.g. "document").
        kind: String,
        /// The id that was looked up.
        id: String,
    },

    /// Deadline exceeded on an embed or search call.
    #[error("timeout after {elapsed_ms}ms in {operation}")]
    Timeout {
        /// The operation that timed out (e.g. "embed", "search").
        operation: String,
        /// How long the operation ran before the deadline fired.
        elapsed_ms: u64,
    },

    /// Vector/text store unavailable, embedder backend 5xx, etc.
    #[error("backend fault in {backend}: {message}")]
    BackendFault {
        /// Which backend faulted (e.g. "vector_indexer", "embedder").
        backend: String,
        /// Human-readable detail.
        message: String,
        /// Underlying error, if any.
        #[source]
        source: Option<anyhow::Error>,
    },

    /// Contract violation, e.g. an embedder returning the wrong dimension.
    #[error("internal error: {message}")]
    Internal {
        /// Human-readable detail.
        message: String,
    },
}

impl PipelineError {
    /// Stable error code for audit records and metrics.
    #[must_use]
    pub const fn code(&self) -> &'static str {
        match self {
            Self::Validation { .. } => "validation",
            Self::DuplicateDocument { .. } => "duplicate_document",
            Self::NotFound { .. } => "not_found",
            Self::Timeout { .. } => "timeout",
            Self::BackendFault { .. } => "backend_fault",
            Self::Internal { .. } => "internal",
        }
    }

    /// Whether this error is the kind that must never be recorded onto a
    /// durable `PipelineRun` or `Document` — validation and not-found
    /// failures are boundary-only, surfaced to the caller and never
    /// persisted.
    #[must_use]
    pub const fn is_boundary_only(&self) -> bool {
        matches!(self, Self::Validation { .. } | Self::NotFound { .. })
    }

    /// Construct a validation error.
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }

    /// Construct a not-found error.
    pub fn not_found(kind: impl Into<String>, id: impl Into<String>) -> Self {
        Self::NotFound {
            kind: kind.into(),
            id: id.into(),
        }
    }

    /// Construct a backend-fault error.
    pub fn backend_fault(backend: impl Into<String>, message: impl Into<String>) -> Self {
        Self::BackendFault {
            backend: backend.into(),
            message: message.into(),
            source: None,
        }
    }

    /// Construct a backend-fault error with an underlying source error.
    pub fn backend_fault_with_source(
        backend: impl Into<String>,
        message: impl Into<String>,
        source: anyhow::Error,
    ) -> Self {
        Self::BackendFault {
            backend: backend.into(),
            message: message.into(),
            source: Some(source),
        }
    }

    /// Construct a duplicate-document error.
    pub fn duplicate_document(existing_id: impl Into<String>, existing_is_ssot: bool) -> Self {
        Self::DuplicateDocument {
            existing_id: existing_id.into(),
            existing_is_ssot,
        }
    }

    /// Construct an internal error.
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }
}

impl From<anyhow::Error> for PipelineError {
    fn from(err: anyhow::Error) -> Self {
        Self::Internal {
            message: err.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codes_are_stable() {
        assert_eq!(PipelineError::validation("x").code(), "validation");
        assert_eq!(
            PipelineError::not_found("document", "abc").code(),
            "not_found"
        );
        assert_eq!(
            PipelineError::DuplicateDocument {
                existing_id: "d1".into(),
                existing_is_ssot: true
            }
            .code(),
            "duplicate_document"
        );
    }

    #[test]
    fn validation_and_not_found_are_boundary_only() {
        assert!(PipelineError::validation("x").is_boundary_only());
        assert!(PipelineError::not_found("kb", "1").is_boundary_only());
        assert!(!PipelineError::internal("x").is_boundary_only());
    }
}
