//! In-memory brute-force vector store.
//!
//! Entries are keyed by `doc_id`. Indexing a document replaces its entries
//! wholesale under the write lock, so a reader either sees the old set or
//! the new set, never a mix, and re-ingestion can never leave stale
//! duplicates behind to pollute top-k results.

use std::collections::HashMap;
use std::sync::RwLock;

use serde::{Deserialize, Serialize};

use pdfrag_core::traits::VectorIndex;
use pdfrag_core::types::ScoredChunk;
use pdfrag_core::{Error, Result};

/// Ceiling on `top_k` to keep the composed prompt bounded for very large
/// documents.
pub const MAX_TOP_K: usize = 20;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredChunk {
    pub content: String,
    pub chunk_index: usize,
    pub vector: Vec<f32>,
}

#[derive(Default)]
pub struct VectorStore {
    docs: RwLock<HashMap<String, Vec<StoredChunk>>>,
}

impl VectorStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_entries(entries: HashMap<String, Vec<StoredChunk>>) -> Self {
        Self { docs: RwLock::new(entries) }
    }

    /// Replace the entries for `doc_id` with the given chunk/vector pairs.
    pub fn index(&self, doc_id: &str, chunks: &[String], vectors: &[Vec<f32>]) -> Result<()> {
        if chunks.len() != vectors.len() {
            return Err(Error::InvalidConfiguration(format!(
                "chunk count ({}) does not match vector count ({})",
                chunks.len(),
                vectors.len()
            )));
        }
        let entries: Vec<StoredChunk> = chunks
            .iter()
            .zip(vectors.iter())
            .enumerate()
            .map(|(chunk_index, (content, vector))| StoredChunk {
                content: content.clone(),
                chunk_index,
                vector: vector.clone(),
            })
            .collect();
        let mut docs = self
            .docs
            .write()
            .map_err(|_| Error::Store("store lock poisoned".to_string()))?;
        docs.insert(doc_id.to_string(), entries);
        Ok(())
    }

    /// Top-k chunks for `doc_id` by cosine similarity, descending. Ties keep
    /// original chunk order (entries are stored in chunk order and the sort
    /// is stable). Unknown `doc_id` is "no context found", not an error.
    pub fn search(&self, doc_id: &str, query_vec: &[f32], top_k: usize) -> Result<Vec<ScoredChunk>> {
        let docs = self
            .docs
            .read()
            .map_err(|_| Error::Store("store lock poisoned".to_string()))?;
        let entries = match docs.get(doc_id) {
            Some(entries) => entries,
            None => return Ok(Vec::new()),
        };
        let mut scored: Vec<ScoredChunk> = entries
            .iter()
            .map(|e| ScoredChunk {
                content: e.content.clone(),
                chunk_index: e.chunk_index,
                score: cosine_similarity(query_vec, &e.vector),
            })
            .collect();
        scored.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
        scored.truncate(top_k.min(MAX_TOP_K));
        Ok(scored)
    }

    /// Number of chunks indexed for `doc_id`.
    pub fn doc_len(&self, doc_id: &str) -> usize {
        self.docs
            .read()
            .map(|docs| docs.get(doc_id).map(Vec::len).unwrap_or(0))
            .unwrap_or(0)
    }

    pub(crate) fn export(&self) -> Result<HashMap<String, Vec<StoredChunk>>> {
        let docs = self
            .docs
            .read()
            .map_err(|_| Error::Store("store lock poisoned".to_string()))?;
        Ok(docs.clone())
    }
}

impl VectorIndex for VectorStore {
    fn index(&self, doc_id: &str, chunks: &[String], vectors: &[Vec<f32>]) -> Result<()> {
        VectorStore::index(self, doc_id, chunks, vectors)
    }

    fn search(&self, doc_id: &str, query_vec: &[f32], top_k: usize) -> Result<Vec<ScoredChunk>> {
        VectorStore::search(self, doc_id, query_vec, top_k)
    }
}

/// Cosine similarity: dot product over the product of magnitudes. Returns
/// 0.0 on dimension mismatch or a zero vector so a malformed entry ranks
/// last instead of crashing retrieval.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }
    let mut dot = 0.0f32;
    let mut norm_a = 0.0f32;
    let mut norm_b = 0.0f32;
    for (x, y) in a.iter().zip(b.iter()) {
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }
    let denom = (norm_a * norm_b).sqrt();
    if denom == 0.0 {
        return 0.0;
    }
    dot / denom
}
