//! Fixed-stride window chunking.
//!
//! Windows are measured in characters, not bytes, so a window boundary can
//! never split a UTF-8 sequence. The math is deterministic and pure: the
//! same `(text, chunk_size, chunk_overlap)` always yields the same windows.

use crate::error::{Error, Result};
use crate::types::DocumentChunk;

#[derive(Debug, Clone)]
pub struct ChunkingConfig {
    pub chunk_size: usize,
    pub chunk_overlap: usize,
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self { chunk_size: 500, chunk_overlap: 0 }
    }
}

/// Split `text` into windows of `chunk_size` characters taken every
/// `chunk_size - chunk_overlap` characters. The final window may be shorter
/// than `chunk_size`; it is kept, not padded or dropped.
pub fn chunk_text(text: &str, chunk_size: usize, chunk_overlap: usize) -> Result<Vec<String>> {
    let step = step_size(chunk_size, chunk_overlap)?;
    let chars: Vec<char> = text.chars().collect();
    if chars.is_empty() {
        return Ok(Vec::new());
    }
    let mut windows = Vec::new();
    let mut start = 0usize;
    while start < chars.len() {
        let end = (start + chunk_size).min(chars.len());
        windows.push(chars[start..end].iter().collect());
        start += step;
    }
    Ok(windows)
}

/// Chunk a whole document, attaching `doc_id`, position and character offset
/// to each window.
pub fn chunk_document(doc_id: &str, text: &str, cfg: &ChunkingConfig) -> Result<Vec<DocumentChunk>> {
    let step = step_size(cfg.chunk_size, cfg.chunk_overlap)?;
    let windows = chunk_text(text, cfg.chunk_size, cfg.chunk_overlap)?;
    let total_chunks = windows.len();
    Ok(windows
        .into_iter()
        .enumerate()
        .map(|(chunk_index, content)| DocumentChunk {
            doc_id: doc_id.to_string(),
            content,
            chunk_index,
            total_chunks,
            start_offset: chunk_index * step,
        })
        .collect())
}

/// In-process `Chunker` collaborator over the windowing above.
#[derive(Debug, Default, Clone, Copy)]
pub struct WindowChunker;

impl crate::traits::Chunker for WindowChunker {
    fn chunk(&self, text: &str, chunk_size: usize, chunk_overlap: usize) -> Result<Vec<String>> {
        chunk_text(text, chunk_size, chunk_overlap)
    }
}

/// Validated stride. A zero or negative stride would loop forever or emit
/// duplicate windows, so bad parameters are rejected before any work runs.
fn step_size(chunk_size: usize, chunk_overlap: usize) -> Result<usize> {
    if chunk_size == 0 {
        return Err(Error::InvalidConfiguration(
            "chunk_size must be positive".to_string(),
        ));
    }
    if chunk_overlap >= chunk_size {
        return Err(Error::InvalidConfiguration(format!(
            "chunk_overlap ({chunk_overlap}) must be smaller than chunk_size ({chunk_size})"
        )));
    }
    Ok(if chunk_overlap > 0 { chunk_size - chunk_overlap } else { chunk_size })
}
