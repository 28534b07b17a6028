//! Chunkers: split normalized text into overlapping, position-tagged
//! pieces. Four variants: [`recursive`], [`fixed`], [`sentence`], and
//! [`semantic`].

mod fixed;
mod recursive;
mod semantic;
mod sentence;

pub use fixed::FixedChunker;
pub use recursive::RecursiveChunker;
pub use semantic::SemanticChunker;
pub use sentence::SentenceChunker;

use crate::embeddings::EmbeddingModel;
use crate::error::{PipelineError, Result};
use crate::registry::{Category, ConfigSchema, Factory, ParamSchema};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;

/// One chunk of a document: text plus position metadata.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Chunk {
    /// Chunk text content.
    pub content: String,
    /// 0-based index of this chunk within the document.
    pub index: usize,
    /// Start offset (chars) into the parsed text, when derivable.
    pub start_char: Option<usize>,
    /// End offset (chars, exclusive) into the parsed text, when derivable.
    pub end_char: Option<usize>,
    /// Chunker-contributed metadata.
    pub metadata: std::collections::HashMap<String, Value>,
}

impl Chunk {
    /// Create a new chunk with no metadata.
    #[must_use]
    pub fn new(content: impl Into<String>, index: usize) -> Self {
        Self {
            content: content.into(),
            index,
            start_char: None,
            end_char: None,
            metadata: std::collections::HashMap::new(),
        }
    }

    /// Attach a character span.
    #[must_use]
    pub const fn with_span(mut self, start: usize, end: usize) -> Self {
        self.start_char = Some(start);
        self.end_char = Some(end);
        self
    }
}

/// Configuration shared by all chunking strategies.
#[derive(Clone, Serialize, Deserialize)]
pub struct ChunkConfig {
    /// Target chunk size. Characters for `fixed`/`recursive`, sentences
    /// for `sentence`, windows for `semantic`.
    pub chunk_size: usize,
    /// Overlap between consecutive chunks, in the same unit as `chunk_size`.
    pub chunk_overlap: usize,
    /// Minimum chunk size for `semantic` windowing.
    #[serde(default = "default_min_size")]
    pub min_size: usize,
    /// Maximum chunk size for `semantic` windowing.
    #[serde(default = "default_max_size")]
    pub max_size: usize,
    /// Cosine-similarity drop threshold that triggers a semantic boundary.
    #[serde(default = "default_similarity_threshold")]
    pub similarity_threshold: f32,
    /// Embedder used by `semantic` chunking, injected rather than looked
    /// up globally (see design note: scoped pool with dependency
    /// injection). `None` degrades semantic chunking to greedy sentence
    /// grouping.
    #[serde(skip)]
    pub embedder: Option<Arc<dyn EmbeddingModel>>,
}

const fn default_min_size() -> usize {
    1
}
const fn default_max_size() -> usize {
    10
}
const fn default_similarity_threshold() -> f32 {
    0.5
}

impl std::fmt::Debug for ChunkConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChunkConfig")
            .field("chunk_size", &self.chunk_size)
            .field("chunk_overlap", &self.chunk_overlap)
            .field("min_size", &self.min_size)
            .field("max_size", &self.max_size)
            .field("similarity_threshold", &self.similarity_threshold)
            .field("has_embedder", &self.embedder.is_some())
            .finish()
    }
}

impl Default for ChunkConfig {
    fn default() -> Self {
        Self {
            chunk_size: 512,
            chunk_overlap: 64,
            min_size: default_min_size(),
            max_size: default_max_size(),
            similarity_threshold: default_similarity_threshold(),
            embedder: None,
        }
    }
}

impl ChunkConfig {
    /// Validate invariants shared by every chunker.
    ///
    /// # Errors
    ///
    /// Returns `PipelineError::Validation` if `chunk_overlap >= chunk_size`.
    pub fn validate(&self) -> Result<()> {
        if self.chunk_overlap >= self.chunk_size {
            return Err(PipelineError::validation(format!(
                "chunk_overlap ({}) must be less than chunk_size ({})",
                self.chunk_overlap, self.chunk_size
            )));
        }
        Ok(())
    }
}

/// Chunker component contract.
#[async_trait]
pub trait Chunker: Send + Sync {
    /// Split `text` into chunks per `config`.
    ///
    /// Empty input yields an empty list; a single-sentence/single-window
    /// input yields one chunk.
    ///
    /// # Errors
    ///
    /// Returns `PipelineError::Validation` if `config` is invalid.
    async fn chunk(&self, text: &str, config: &ChunkConfig) -> Result<Vec<Chunk>>;

    /// Registered component name.
    fn name(&self) -> &'static str;
}

fn chunk_config_schema() -> ConfigSchema {
    ConfigSchema {
        params: vec![
            ParamSchema {
                name: "chunk_size",
                kind: "integer",
                required: true,
                allowed: &[],
            },
            ParamSchema {
                name: "chunk_overlap",
                kind: "integer",
                required: true,
                allowed: &[],
            },
            ParamSchema {
                name: "min_size",
                kind: "integer",
                required: false,
                allowed: &[],
            },
            ParamSchema {
                name: "max_size",
                kind: "integer",
                required: false,
                allowed: &[],
            },
            ParamSchema {
                name: "similarity_threshold",
                kind: "number",
                required: false,
                allowed: &[],
            },
        ],
    }
}

/// Build the default chunker factory with all required variants
/// registered under their canonical names.
#[must_use]
pub fn default_factory() -> Factory<Arc<dyn Chunker>> {
    let mut factory = Factory::new(Category::Chunkers);

    factory.register(
        "recursive",
        "Descends paragraph/line/sentence/word/char separators",
        chunk_config_schema(),
        |_cfg| Ok(Arc::new(RecursiveChunker) as Arc<dyn Chunker>),
    );
    factory.register(
        "fixed",
        "Fixed-size window with fixed stride",
        chunk_config_schema(),
        |_cfg| Ok(Arc::new(FixedChunker) as Arc<dyn Chunker>),
    );
    factory.register(
        "sentence",
        "Groups sentences respecting chunk_size, overlap in sentences",
        chunk_config_schema(),
        |_cfg| Ok(Arc::new(SentenceChunker) as Arc<dyn Chunker>),
    );
    factory.register(
        "semantic",
        "Windows sentences, splits on embedding similarity drop",
        chunk_config_schema(),
        |_cfg| Ok(Arc::new(SemanticChunker) as Arc<dyn Chunker>),
    );

    factory
}

/// Split `text` into sentences on terminal punctuation followed by
/// whitespace and a capital letter (or end of text). Shared by
/// [`sentence`] and [`semantic`] chunkers.
pub(crate) fn split_sentences(text: &str) -> Vec<&str> {
    if text.is_empty() {
        return Vec::new();
    }
    let mut sentences = Vec::new();
    let bytes = text.as_bytes();
    let mut start = 0usize;
    let mut i = 0usize;
    while i < bytes.len() {
        let ch = bytes[i];
        if matches!(ch, b'.' | b'!' | b'?') {
            let mut j = i + 1;
            while j < bytes.len() && bytes[j].is_ascii_whitespace() {
                j += 1;
            }
            let next_is_capital_or_end =
                j >= bytes.len() || text[j..].chars().next().is_some_and(char::is_uppercase);
            if j > i + 1 && next_is_capital_or_end {
                sentences.push(text[start..=i].trim());
                start = j;
                i = j;
                continue;
            }
        }
        i += 1;
    }
    if start < text.len() {
        let tail = text[start..].trim();
        if !tail.is_empty() {
            sentences.push(tail);
        }
    }
    sentences.retain(|s| !s.is_empty());
    sentences
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn overlap_gte_size_is_rejected() {
        let config = ChunkConfig {
            chunk_size: 100,
            chunk_overlap: 100,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn splits_on_terminal_punctuation() {
        let sentences = split_sentences("The cat sat. The cat sat on the mat. Goodbye.");
        assert_eq!(sentences.len(), 3);
        assert_eq!(sentences[0], "The cat sat.");
    }

    #[test]
    fn empty_text_has_no_sentences() {
        assert!(split_sentences("").is_empty());
    }
}
