//! Domain types shared across pipeline stages.

use serde::{Deserialize, Serialize};
use std::path::Path;

/// A window of a source document that is independently embedded and indexed.
///
/// - `doc_id`: stable document identity (file stem of the source path)
/// - `content`: the text payload of the window
/// - `chunk_index`/`total_chunks`: position within the parent document
/// - `start_offset`: character offset of the window in the raw text
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentChunk {
    pub doc_id: String,
    pub content: String,
    pub chunk_index: usize,
    pub total_chunks: usize,
    pub start_offset: usize,
}

/// A retrieved chunk with its similarity score. Higher is always better.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoredChunk {
    pub content: String,
    pub chunk_index: usize,
    pub score: f32,
}

/// Derive the stable document identity from a source path: the file name
/// without its extension. This is the join key across chunking, embedding,
/// indexing and question answering, so every caller must go through here.
pub fn doc_id_from_path(path: &Path) -> String {
    path.file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_else(|| path.to_string_lossy().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn doc_id_strips_directory_and_extension() {
        assert_eq!(doc_id_from_path(Path::new("/tmp/report.pdf")), "report");
        assert_eq!(doc_id_from_path(Path::new("notes.2024.pdf")), "notes.2024");
        assert_eq!(doc_id_from_path(Path::new("bare")), "bare");
    }
}
