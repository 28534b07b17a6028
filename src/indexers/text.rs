//! Inverted-index text indexer with BM25 scoring. No crate in the
//! dependency pack offers a full-text index (no tantivy, no bm25
//! binding), so this is a deliberately small hand-rolled implementation
//! rather than a fabricated dependency — lowercased whitespace/
//! punctuation tokenization, per-collection postings, and the standard
//! BM25 formula with `k1 = 1.2`, `b = 0.75`.

use super::{CollectionKey, IndexHit, TextRecord, TextStorage};
use crate::error::{PipelineError, Result};
use async_trait::async_trait;
use dashmap::DashMap;
use parking_lot::RwLock;
use std::collections::HashMap;

const K1: f32 = 1.2;
const B: f32 = 0.75;

/// Lowercase, split on non-alphanumeric runs, drop empty tokens.
fn tokenize(text: &str) -> Vec<String> {
    text.to_lowercase()
        .split(|c: char| !c.is_alphanumeric())
        .filter(|t| !t.is_empty())
        .map(str::to_string)
        .collect()
}

#[derive(Default)]
struct Collection {
    /// term -> chunk_id -> term frequency in that chunk
    postings: HashMap<String, HashMap<String, usize>>,
    /// chunk_id -> token count
    doc_lengths: HashMap<String, usize>,
    total_length: usize,
}

impl Collection {
    fn avg_doc_length(&self) -> f32 {
        if self.doc_lengths.is_empty() {
            0.0
        } else {
            #[allow(clippy::cast_precision_loss)]
            {
                self.total_length as f32 / self.doc_lengths.len() as f32
            }
        }
    }

    fn remove_chunk(&mut self, chunk_id: &str) {
        if let Some(length) = self.doc_lengths.remove(chunk_id) {
            self.total_length = self.total_length.saturating_sub(length);
        }
        for postings in self.postings.values_mut() {
            postings.remove(chunk_id);
        }
        self.postings.retain(|_, postings| !postings.is_empty());
    }

    fn add_chunk(&mut self, chunk_id: &str, content: &str) {
        self.remove_chunk(chunk_id);
        let tokens = tokenize(content);
        self.doc_lengths.insert(chunk_id.to_string(), tokens.len());
        self.total_length += tokens.len();

        let mut term_counts: HashMap<String, usize> = HashMap::new();
        for token in tokens {
            *term_counts.entry(token).or_insert(0) += 1;
        }
        for (term, count) in term_counts {
            self.postings
                .entry(term)
                .or_default()
                .insert(chunk_id.to_string(), count);
        }
    }

    fn bm25(&self, query_terms: &[String], top_k: usize) -> Vec<IndexHit> {
        let doc_count = self.doc_lengths.len();
        if doc_count == 0 {
            return Vec::new();
        }
        let avg_len = self.avg_doc_length();
        let mut scores: HashMap<String, f32> = HashMap::new();

        for term in query_terms {
            let Some(postings) = self.postings.get(term) else {
                continue;
            };
            #[allow(clippy::cast_precision_loss)]
            let idf = {
                let n_q = postings.len() as f32;
                ((doc_count as f32 - n_q + 0.5) / (n_q + 0.5) + 1.0).ln()
            };

            for (chunk_id, &freq) in postings {
                #[allow(clippy::cast_precision_loss)]
                let doc_len = *self.doc_lengths.get(chunk_id).unwrap_or(&0) as f32;
                let freq = freq as f32;
                let denom = freq + K1 * (1.0 - B + B * doc_len / avg_len.max(1.0));
                let term_score = idf * (freq * (K1 + 1.0)) / denom.max(f32::EPSILON);
                *scores.entry(chunk_id.clone()).or_insert(0.0) += term_score;
            }
        }

        let mut hits: Vec<IndexHit> = scores
            .into_iter()
            .map(|(chunk_id, score)| IndexHit { chunk_id, score })
            .collect();
        hits.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
        hits.truncate(top_k);
        hits
    }
}

/// Inverted-index implementation of [`TextStorage`].
pub struct InvertedTextIndexer {
    collections: DashMap<String, RwLock<Collection>>,
}

impl InvertedTextIndexer {
    /// Create an empty indexer with no collections.
    #[must_use]
    pub fn new() -> Self {
        Self {
            collections: DashMap::new(),
        }
    }
}

impl Default for InvertedTextIndexer {
    fn default() -> Self {
        Self::new()
    }
}

/// Alias kept for call sites that refer to "the text indexer" in the
/// abstract; the concrete backend is [`InvertedTextIndexer`].
pub type TextIndexer = InvertedTextIndexer;

#[async_trait]
impl TextStorage for InvertedTextIndexer {
    async fn ensure_collection(&self, key: &CollectionKey) -> Result<()> {
        self.collections
            .entry(key.namespace())
            .or_insert_with(|| RwLock::new(Collection::default()));
        Ok(())
    }

    async fn index(&self, key: &CollectionKey, records: &[TextRecord]) -> Result<()> {
        let namespace = key.namespace();
        let collection = self
            .collections
            .get(&namespace)
            .ok_or_else(|| PipelineError::not_found("text_collection", &namespace))?;
        let mut guard = collection.write();
        for record in records {
            guard.add_chunk(&record.chunk_id, &record.content);
        }
        Ok(())
    }

    async fn search(&self, key: &CollectionKey, query: &str, top_k: usize) -> Result<Vec<IndexHit>> {
        let namespace = key.namespace();
        let collection = self
            .collections
            .get(&namespace)
            .ok_or_else(|| PipelineError::not_found("text_collection", &namespace))?;
        let query_terms = tokenize(query);
        Ok(collection.read().bm25(&query_terms, top_k))
    }

    async fn delete(&self, key: &CollectionKey, chunk_id: &str) -> Result<()> {
        let namespace = key.namespace();
        let collection = self
            .collections
            .get(&namespace)
            .ok_or_else(|| PipelineError::not_found("text_collection", &namespace))?;
        collection.write().remove_chunk(chunk_id);
        Ok(())
    }

    async fn delete_collection(&self, key: &CollectionKey) -> Result<()> {
        self.collections.remove(&key.namespace());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key() -> CollectionKey {
        CollectionKey::new("tenant-a", "kb-1")
    }

    #[tokio::test]
    async fn search_ranks_exact_term_matches_first() {
        let indexer = InvertedTextIndexer::new();
        indexer.ensure_collection(&key()).await.unwrap();
        indexer
            .index(
                &key(),
                &[
                    TextRecord {
                        chunk_id: "c1".to_string(),
                        content: "the quick brown fox".to_string(),
                    },
                    TextRecord {
                        chunk_id: "c2".to_string(),
                        content: "a slow green turtle".to_string(),
                    },
                ],
            )
            .await
            .unwrap();

        let hits = indexer.search(&key(), "quick fox", 5).await.unwrap();
        assert_eq!(hits[0].chunk_id, "c1");
    }

    #[tokio::test]
    async fn delete_removes_chunk_from_results() {
        let indexer = InvertedTextIndexer::new();
        indexer.ensure_collection(&key()).await.unwrap();
        indexer
            .index(
                &key(),
                &[TextRecord {
                    chunk_id: "c1".to_string(),
                    content: "unique needle phrase".to_string(),
                }],
            )
            .await
            .unwrap();
        indexer.delete(&key(), "c1").await.unwrap();
        let hits = indexer.search(&key(), "needle", 5).await.unwrap();
        assert!(hits.is_empty());
    }

    #[tokio::test]
    async fn tokenize_lowercases_and_strips_punctuation() {
        let tokens = tokenize("Hello, World! It's a test.");
        assert_eq!(tokens, vec!["hello", "world", "it", "s", "a", "test"]);
    }

    #[tokio::test]
    async fn search_unknown_collection_is_not_found() {
        let indexer = InvertedTextIndexer::new();
        let err = indexer.search(&key(), "x", 1).await.unwrap_err();
        assert_eq!(err.code(), "not_found");
    }
}
