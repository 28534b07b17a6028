//! Sentence chunker: groups whole sentences up to `chunk_size`
//! sentences per chunk, overlapping the last `chunk_overlap` sentences
//! of one chunk into the start of the next. Never splits a sentence
//! across chunk boundaries.

use super::{split_sentences, Chunk, ChunkConfig, Chunker};
use crate::error::Result;
use async_trait::async_trait;

/// Sentence-grouping chunker.
#[derive(Debug, Default)]
pub struct SentenceChunker;

#[async_trait]
impl Chunker for SentenceChunker {
    async fn chunk(&self, text: &str, config: &ChunkConfig) -> Result<Vec<Chunk>> {
        config.validate()?;
        let sentences = split_sentences(text);
        if sentences.is_empty() {
            return Ok(Vec::new());
        }
        if sentences.len() <= config.chunk_size {
            return Ok(vec![Chunk::new(sentences.join(" "), 0)]);
        }

        let stride = config.chunk_size - config.chunk_overlap;
        let mut chunks = Vec::new();
        let mut index = 0usize;
        let mut start = 0usize;

        while start < sentences.len() {
            let end = (start + config.chunk_size).min(sentences.len());
            let content = sentences[start..end].join(" ");
            chunks.push(Chunk::new(content, index));
            index += 1;
            if end == sentences.len() {
                break;
            }
            start += stride;
        }

        Ok(chunks)
    }

    fn name(&self) -> &'static str {
        "sentence"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> ChunkConfig {
        ChunkConfig {
            chunk_size: 2,
            chunk_overlap: 1,
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn groups_sentences_up_to_chunk_size() {
        let text = "One. Two. Three. Four.";
        let chunks = SentenceChunker.chunk(text, &config()).await.unwrap();
        assert!(chunks.len() >= 2);
        assert!(chunks[0].content.contains("One."));
        assert!(chunks[0].content.contains("Two."));
    }

    #[tokio::test]
    async fn single_sentence_is_one_chunk() {
        let chunks = SentenceChunker
            .chunk("Just one sentence.", &config())
            .await
            .unwrap();
        assert_eq!(chunks.len(), 1);
    }

    #[tokio::test]
    async fn empty_text_yields_no_chunks() {
        assert!(SentenceChunker.chunk("", &config()).await.unwrap().is_empty());
    }
}
