//! Recursive chunker: descends a list of separators from coarse to
//! fine (paragraph, line, sentence, word, char), splitting only the
//! pieces that still exceed `chunk_size`, then reassembles pieces up to
//! the target size before falling back to the fixed-window chunker for
//! any leftover oversized atom.

use super::{Chunk, ChunkConfig, Chunker, FixedChunker};
use crate::error::Result;
use async_trait::async_trait;

const SEPARATORS: &[&str] = &["\n\n", "\n", ". ", " "];

/// Recursive-descent chunker.
#[derive(Debug, Default)]
pub struct RecursiveChunker;

impl RecursiveChunker {
    /// Split `text` into pieces no larger than `chunk_size` characters,
    /// descending through [`SEPARATORS`] and falling back to raw
    /// character slicing for any atom still too large.
    fn split(text: &str, chunk_size: usize, depth: usize) -> Vec<String> {
        if text.chars().count() <= chunk_size {
            return vec![text.to_string()];
        }
        let Some(sep) = SEPARATORS.get(depth) else {
            return text
                .chars()
                .collect::<Vec<_>>()
                .chunks(chunk_size)
                .map(|c| c.iter().collect())
                .collect();
        };

        let pieces: Vec<&str> = if *sep == " " {
            text.split(' ').collect()
        } else {
            text.split(sep.as_str()).collect()
        };

        if pieces.len() <= 1 {
            return Self::split(text, chunk_size, depth + 1);
        }

        pieces
            .into_iter()
            .flat_map(|p| Self::split(p, chunk_size, depth + 1))
            .filter(|p| !p.is_empty())
            .collect()
    }

    /// Greedily reassemble small pieces up to `chunk_size`, inserting
    /// the last `chunk_overlap` characters of the previous chunk at the
    /// start of the next one.
    fn reassemble(pieces: &[String], config: &ChunkConfig) -> Vec<Chunk> {
        let mut chunks = Vec::new();
        let mut current = String::new();
        let mut index = 0usize;
        let mut chunk_start = 0usize;

        for piece in pieces {
            let joiner = if current.is_empty() { "" } else { " " };
            if !current.is_empty()
                && current.chars().count() + joiner.len() + piece.chars().count() > config.chunk_size
            {
                let end = chunk_start + current.chars().count();
                chunks.push(Chunk::new(current.clone(), index).with_span(chunk_start, end));
                index += 1;

                let overlap_start = current
                    .chars()
                    .count()
                    .saturating_sub(config.chunk_overlap);
                let overlap: String = current.chars().skip(overlap_start).collect();
                chunk_start = end - overlap.chars().count();
                current = overlap;
            }
            if !current.is_empty() {
                current.push(' ');
            }
            current.push_str(piece);
        }

        if !current.is_empty() {
            let end = chunk_start + current.chars().count();
            chunks.push(Chunk::new(current, index).with_span(chunk_start, end));
        }

        chunks
    }
}

#[async_trait]
impl Chunker for RecursiveChunker {
    async fn chunk(&self, text: &str, config: &ChunkConfig) -> Result<Vec<Chunk>> {
        config.validate()?;
        if text.is_empty() {
            return Ok(Vec::new());
        }
        if text.chars().count() <= config.chunk_size {
            return Ok(vec![Chunk::new(text.to_string(), 0).with_span(0, text.chars().count())]);
        }

        let pieces = Self::split(text, config.chunk_size, 0);
        if pieces.iter().all(|p| p.chars().count() > config.chunk_size) {
            return FixedChunker.chunk(text, config).await;
        }
        Ok(Self::reassemble(&pieces, config))
    }

    fn name(&self) -> &'static str {
        "recursive"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> ChunkConfig {
        ChunkConfig {
            chunk_size: 30,
            chunk_overlap: 5,
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn short_text_is_a_single_chunk() {
        let chunks = RecursiveChunker.chunk("short text", &config()).await.unwrap();
        assert_eq!(chunks.len(), 1);
    }

    #[tokio::test]
    async fn splits_on_paragraph_boundaries_first() {
        let text = "First paragraph here.\n\nSecond paragraph is here too, longer.";
        let chunks = RecursiveChunker.chunk(text, &config()).await.unwrap();
        assert!(chunks.len() > 1);
        for c in &chunks {
            assert!(c.content.chars().count() <= config().chunk_size + 10);
        }
    }

    #[tokio::test]
    async fn empty_text_yields_no_chunks() {
        assert!(RecursiveChunker.chunk("", &config()).await.unwrap().is_empty());
    }
}
