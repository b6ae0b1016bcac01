//! Document processing pipeline.
//!
//! Ingestion runs Extract → Chunk → Embed → Index, each stage's full output
//! feeding the next, one document at a time. Question answering embeds the
//! query, retrieves top-k context (unless the caller supplied context
//! verbatim), and hands the pair to the language-model collaborator.

pub mod collab;
pub mod extract;

use std::fmt;
use std::path::Path;

use pdfrag_core::chunker::ChunkingConfig;
use pdfrag_core::traits::{Chunker, Completer, Embedder, Extractor, VectorIndex};
use pdfrag_core::types::doc_id_from_path;
use pdfrag_core::{Error, Result};

pub const DEFAULT_TOP_K: usize = 5;

/// Where a run of the pipeline currently stands. `Failed` is terminal for
/// the run; re-loading the document starts over from `Extracting`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineStage {
    Idle,
    Extracting,
    Chunking,
    Embedding,
    Indexed,
    Failed(FailedStage),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailedStage {
    Extracting,
    Chunking,
    Embedding,
    Indexing,
}

impl fmt::Display for FailedStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            FailedStage::Extracting => "extracting",
            FailedStage::Chunking => "chunking",
            FailedStage::Embedding => "embedding",
            FailedStage::Indexing => "indexing",
        };
        write!(f, "{name}")
    }
}

#[derive(Debug, Clone)]
pub struct PipelineConfig {
    pub chunking: ChunkingConfig,
    pub top_k: usize,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self { chunking: ChunkingConfig::default(), top_k: DEFAULT_TOP_K }
    }
}

/// Outcome of a successful ingestion.
#[derive(Debug, Clone)]
pub struct IngestReport {
    pub doc_id: String,
    pub chunk_count: usize,
}

pub struct DocumentPipeline {
    extractor: Box<dyn Extractor>,
    chunker: Box<dyn Chunker>,
    embedder: Box<dyn Embedder>,
    index: Box<dyn VectorIndex>,
    completer: Box<dyn Completer>,
    cfg: PipelineConfig,
    stage: PipelineStage,
    doc_id: Option<String>,
    text: Option<String>,
    chunks: Vec<String>,
}

impl DocumentPipeline {
    pub fn new(
        extractor: Box<dyn Extractor>,
        chunker: Box<dyn Chunker>,
        embedder: Box<dyn Embedder>,
        index: Box<dyn VectorIndex>,
        completer: Box<dyn Completer>,
        cfg: PipelineConfig,
    ) -> Self {
        Self {
            extractor,
            chunker,
            embedder,
            index,
            completer,
            cfg,
            stage: PipelineStage::Idle,
            doc_id: None,
            text: None,
            chunks: Vec::new(),
        }
    }

    pub fn stage(&self) -> PipelineStage {
        self.stage
    }

    pub fn doc_id(&self) -> Option<&str> {
        self.doc_id.as_deref()
    }

    /// Ingest `pdf_path`: extract, chunk, embed all chunks in one batch,
    /// index. Loading the same document again restarts from extraction and
    /// replaces the previous index state wholesale; a failure at any stage
    /// leaves the failing stage recorded and writes nothing to the index.
    pub fn load(&mut self, pdf_path: &str, pages: Option<&str>) -> Result<IngestReport> {
        let doc_id = doc_id_from_path(Path::new(pdf_path));
        self.doc_id = None;
        self.text = None;
        self.chunks = Vec::new();

        self.stage = PipelineStage::Extracting;
        let text = self
            .extractor
            .extract(pdf_path, pages)
            .map_err(|e| self.fail(FailedStage::Extracting, e))?;
        // Raw text is usable (for summaries) as soon as extraction lands.
        self.text = Some(text.clone());

        self.stage = PipelineStage::Chunking;
        let chunks = self
            .chunker
            .chunk(&text, self.cfg.chunking.chunk_size, self.cfg.chunking.chunk_overlap)
            .map_err(|e| self.fail(FailedStage::Chunking, e))?;
        self.chunks = chunks.clone();

        self.stage = PipelineStage::Embedding;
        let vectors = self
            .embedder
            .embed_batch(&chunks)
            .map_err(|e| self.fail(FailedStage::Embedding, e))?;

        self.index
            .index(&doc_id, &chunks, &vectors)
            .map_err(|e| self.fail(FailedStage::Indexing, e))?;

        self.stage = PipelineStage::Indexed;
        self.doc_id = Some(doc_id.clone());
        Ok(IngestReport { doc_id, chunk_count: self.chunks.len() })
    }

    /// Answer `question` from the loaded document. When `context` is given
    /// it is used verbatim and retrieval is skipped; otherwise the top-k
    /// chunks are joined in ranked order. The completion comes back
    /// unmodified, including the sentinel "no answer" reply.
    pub fn ask(&self, question: &str, top_k: Option<usize>, context: Option<&str>) -> Result<String> {
        let doc_id = match (&self.stage, &self.doc_id) {
            (PipelineStage::Indexed, Some(doc_id)) => doc_id.clone(),
            _ => {
                return Err(Error::DocumentNotLoaded(
                    "load a document before asking questions".to_string(),
                ))
            }
        };
        let query_vec = self.embedder.embed_query(question)?;
        let context_text = match context {
            Some(context) => context.to_string(),
            None => {
                let hits =
                    self.index
                        .search(&doc_id, &query_vec, top_k.unwrap_or(self.cfg.top_k))?;
                hits.iter().map(|h| h.content.as_str()).collect::<Vec<_>>().join("\n")
            }
        };
        self.completer.answer(question, &context_text)
    }

    /// Summarize the loaded document. Needs the raw text only, so this works
    /// even if a later stage failed after extraction.
    pub fn summarize(&self) -> Result<String> {
        let text = self.text.as_ref().ok_or_else(|| {
            Error::DocumentNotLoaded("load a document before summarizing".to_string())
        })?;
        let body = if self.chunks.is_empty() { text.clone() } else { self.chunks.join("\n") };
        self.completer.summarize(&body)
    }

    fn fail(&mut self, stage: FailedStage, err: Error) -> Error {
        self.stage = PipelineStage::Failed(stage);
        eprintln!("Pipeline stage '{stage}' failed: {err}");
        err
    }
}
