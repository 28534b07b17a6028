//! Semantic chunker: embeds each sentence with an injected embedder and
//! starts a new chunk wherever cosine similarity between consecutive
//! sentences drops below `similarity_threshold`, bounded by
//! `min_size`/`max_size` sentences per chunk. Without an embedder this
//! degrades to greedy sentence grouping — the same behavior as
//! [`super::SentenceChunker`] — rather than failing the whole chunk
//! operation.

use super::{split_sentences, Chunk, ChunkConfig, Chunker, SentenceChunker};
use crate::embeddings::cosine_similarity;
use crate::error::Result;
use async_trait::async_trait;

/// Embedding-similarity chunker.
#[derive(Debug, Default)]
pub struct SemanticChunker;

#[async_trait]
impl Chunker for SemanticChunker {
    async fn chunk(&self, text: &str, config: &ChunkConfig) -> Result<Vec<Chunk>> {
        config.validate()?;
        let sentences = split_sentences(text);
        if sentences.is_empty() {
            return Ok(Vec::new());
        }
        if sentences.len() == 1 {
            return Ok(vec![Chunk::new(sentences[0].to_string(), 0)]);
        }

        let Some(embedder) = &config.embedder else {
            return SentenceChunker.chunk(text, config).await;
        };

        let owned: Vec<String> = sentences.iter().map(ToString::to_string).collect();
        let embeddings = embedder.embed(&owned).await?;

        let mut chunks = Vec::new();
        let mut group: Vec<&str> = vec![sentences[0]];
        let mut index = 0usize;

        for i in 1..sentences.len() {
            let similarity = cosine_similarity(&embeddings[i - 1], &embeddings[i]);
            let at_max = group.len() >= config.max_size;
            let boundary = (similarity < config.similarity_threshold && group.len() >= config.min_size)
                || at_max;

            if boundary {
                chunks.push(Chunk::new(group.join(" "), index));
                index += 1;
                group = vec![sentences[i]];
            } else {
                group.push(sentences[i]);
            }
        }

        if !group.is_empty() {
            chunks.push(Chunk::new(group.join(" "), index));
        }

        Ok(chunks)
    }

    fn name(&self) -> &'static str {
        "semantic"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embeddings::{EmbedderConfig, LocalEmbedder};
    use std::sync::Arc;

    fn config_with_embedder() -> ChunkConfig {
        ChunkConfig {
            chunk_size: 10,
            chunk_overlap: 0,
            min_size: 1,
            max_size: 3,
            similarity_threshold: 0.0,
            embedder: Some(Arc::new(LocalEmbedder::new(EmbedderConfig {
                dimensions: 8,
                ..Default::default()
            }))),
        }
    }

    #[tokio::test]
    async fn degrades_to_sentence_grouping_without_embedder() {
        let config = ChunkConfig {
            chunk_size: 2,
            chunk_overlap: 1,
            embedder: None,
            ..Default::default()
        };
        let text = "One. Two. Three.";
        let chunks = SemanticChunker.chunk(text, &config).await.unwrap();
        assert!(!chunks.is_empty());
    }

    #[tokio::test]
    async fn respects_max_size_even_with_similarity_threshold_zero() {
        let text = "One. Two. Three. Four. Five. Six. Seven.";
        let chunks = SemanticChunker.chunk(text, &config_with_embedder()).await.unwrap();
        for c in &chunks {
            let sentence_count = c.content.matches('.').count();
            assert!(sentence_count <= 3);
        }
    }

    #[tokio::test]
    async fn single_sentence_is_one_chunk() {
        let chunks = SemanticChunker
            .chunk("Only one sentence here.", &config_with_embedder())
            .await
            .unwrap();
        assert_eq!(chunks.len(), 1);
    }

    #[tokio::test]
    async fn empty_text_yields_no_chunks() {
        assert!(SemanticChunker
            .chunk("", &config_with_embedder())
            .await
            .unwrap()
            .is_empty());
    }
}
