//! JSON snapshot of the whole store.
//!
//! The tool server runs one process per invocation, so indexed state has to
//! survive between processes. The snapshot is the entire doc map written
//! through a temp file and renamed into place; a reader never observes a
//! half-written file.

use std::collections::HashMap;
use std::fs;
use std::io::Write;
use std::path::Path;

use tempfile::NamedTempFile;

use pdfrag_core::{Error, Result};

use crate::store::{StoredChunk, VectorStore};

/// Load a store from `path`. A missing file is an empty store, matching the
/// first run before anything was indexed.
pub fn load(path: &Path) -> Result<VectorStore> {
    if !path.exists() {
        return Ok(VectorStore::new());
    }
    let raw = fs::read_to_string(path)
        .map_err(|e| Error::Store(format!("failed to read {}: {e}", path.display())))?;
    let entries: HashMap<String, Vec<StoredChunk>> = serde_json::from_str(&raw)
        .map_err(|e| Error::Store(format!("corrupt snapshot {}: {e}", path.display())))?;
    Ok(VectorStore::from_entries(entries))
}

/// `VectorIndex` that reads and writes the snapshot around every operation.
///
/// This is how two short-lived processes (the CLI and a tool-server
/// invocation) observe the same indexed state: each `index` is
/// load-replace-save, each `search` reads the latest snapshot.
pub struct SnapshotIndex {
    path: std::path::PathBuf,
}

impl SnapshotIndex {
    pub fn new(path: impl Into<std::path::PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl pdfrag_core::traits::VectorIndex for SnapshotIndex {
    fn index(&self, doc_id: &str, chunks: &[String], vectors: &[Vec<f32>]) -> Result<()> {
        let store = load(&self.path)?;
        store.index(doc_id, chunks, vectors)?;
        save(&store, &self.path)
    }

    fn search(
        &self,
        doc_id: &str,
        query_vec: &[f32],
        top_k: usize,
    ) -> Result<Vec<pdfrag_core::types::ScoredChunk>> {
        load(&self.path)?.search(doc_id, query_vec, top_k)
    }
}

/// Write the store to `path` atomically (temp file in the same directory,
/// then rename).
pub fn save(store: &VectorStore, path: &Path) -> Result<()> {
    let entries = store.export()?;
    let json = serde_json::to_string(&entries)
        .map_err(|e| Error::Store(format!("failed to encode snapshot: {e}")))?;
    let dir = path.parent().unwrap_or_else(|| Path::new("."));
    fs::create_dir_all(dir)
        .map_err(|e| Error::Store(format!("failed to create {}: {e}", dir.display())))?;
    let mut tmp = NamedTempFile::new_in(dir)
        .map_err(|e| Error::Store(format!("failed to create temp file: {e}")))?;
    tmp.write_all(json.as_bytes())
        .map_err(|e| Error::Store(format!("failed to write snapshot: {e}")))?;
    tmp.persist(path)
        .map_err(|e| Error::Store(format!("failed to persist {}: {e}", path.display())))?;
    Ok(())
}
