//! Fixed-size window chunker: slices text into `chunk_size`-character
//! windows with a fixed `chunk_overlap`-character stride, the simplest
//! strategy and the fallback every other strategy degrades to.

use super::{Chunk, ChunkConfig, Chunker};
use crate::error::Result;
use async_trait::async_trait;

/// Fixed-size sliding window chunker, operating on character offsets.
#[derive(Debug, Default)]
pub struct FixedChunker;

#[async_trait]
impl Chunker for FixedChunker {
    async fn chunk(&self, text: &str, config: &ChunkConfig) -> Result<Vec<Chunk>> {
        config.validate()?;
        if text.is_empty() {
            return Ok(Vec::new());
        }

        let chars: Vec<char> = text.chars().collect();
        let stride = config.chunk_size - config.chunk_overlap;
        let mut chunks = Vec::new();
        let mut start = 0usize;
        let mut index = 0usize;

        while start < chars.len() {
            let end = (start + config.chunk_size).min(chars.len());
            let content: String = chars[start..end].iter().collect();
            chunks.push(Chunk::new(content, index).with_span(start, end));
            index += 1;
            if end == chars.len() {
                break;
            }
            start += stride;
        }

        Ok(chunks)
    }

    fn name(&self) -> &'static str {
        "fixed"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> ChunkConfig {
        ChunkConfig {
            chunk_size: 10,
            chunk_overlap: 2,
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn single_short_text_yields_one_chunk() {
        let chunks = FixedChunker.chunk("short", &config()).await.unwrap();
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].content, "short");
    }

    #[tokio::test]
    async fn empty_text_yields_no_chunks() {
        let chunks = FixedChunker.chunk("", &config()).await.unwrap();
        assert!(chunks.is_empty());
    }

    #[tokio::test]
    async fn windows_overlap_by_configured_amount() {
        let text = "abcdefghijklmnopqrstuvwxyz";
        let chunks = FixedChunker.chunk(text, &config()).await.unwrap();
        assert!(chunks.len() > 1);
        assert_eq!(chunks[0].start_char, Some(0));
        assert_eq!(chunks[1].start_char, Some(8));
    }
}
