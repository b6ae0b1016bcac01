use crate::error::Result;
use crate::types::ScoredChunk;

/// Pulls raw text out of a source PDF. `pages` is the collaborator's
/// comma-separated page selector (negative values count from the end).
pub trait Extractor: Send + Sync {
    fn extract(&self, pdf_path: &str, pages: Option<&str>) -> Result<String>;
}

/// Splits raw text into overlapping fixed-size windows.
pub trait Chunker: Send + Sync {
    fn chunk(&self, text: &str, chunk_size: usize, chunk_overlap: usize) -> Result<Vec<String>>;
}

/// Maps text to fixed-length vectors. `embed_batch` is order-preserving and
/// one-to-one with its input; `embed_query` must use the same model and
/// dimensionality so stored and query vectors are comparable.
pub trait Embedder: Send + Sync {
    fn dim(&self) -> usize;
    fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>>;
    fn embed_query(&self, text: &str) -> Result<Vec<f32>>;
}

/// Per-document chunk/vector storage with top-k cosine retrieval.
pub trait VectorIndex: Send + Sync {
    fn index(&self, doc_id: &str, chunks: &[String], vectors: &[Vec<f32>]) -> Result<()>;
    fn search(&self, doc_id: &str, query_vec: &[f32], top_k: usize) -> Result<Vec<ScoredChunk>>;
}

/// Language-model surface the pipeline talks to. `answer` must ground itself
/// in `context` alone (the fixed prompt template enforces this and names the
/// sentinel reply for missing answers); `summarize` condenses `text`. Both
/// wrap a single prompt-in/completion-out call underneath.
pub trait Completer: Send + Sync {
    fn answer(&self, question: &str, context: &str) -> Result<String>;
    fn summarize(&self, text: &str) -> Result<String>;
}
