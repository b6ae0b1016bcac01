use std::sync::{Arc, Mutex};

use pdfrag_core::chunker::{ChunkingConfig, WindowChunker};
use pdfrag_core::traits::{Completer, Embedder, Extractor};
use pdfrag_core::{Error, Result};
use pdfrag_pipeline::{DocumentPipeline, FailedStage, PipelineConfig, PipelineStage};
use pdfrag_vector::VectorStore;

/// Extractor fake: hands back whatever text the test loaded into it. Clones
/// share the text cell so a test can swap content between ingestions.
#[derive(Clone)]
struct StubExtractor {
    text: Arc<Mutex<String>>,
}

impl StubExtractor {
    fn new(text: &str) -> Self {
        Self { text: Arc::new(Mutex::new(text.to_string())) }
    }

    fn set_text(&self, text: &str) {
        *self.text.lock().expect("lock") = text.to_string();
    }
}

impl Extractor for StubExtractor {
    fn extract(&self, _pdf_path: &str, _pages: Option<&str>) -> Result<String> {
        Ok(self.text.lock().expect("lock").clone())
    }
}

/// Embedder fake with a controlled geometry: texts mentioning "sky" land on
/// one axis, everything else on the other, so retrieval order is forced.
struct StubEmbedder;

impl Embedder for StubEmbedder {
    fn dim(&self) -> usize {
        2
    }

    fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        Ok(texts
            .iter()
            .map(|t| if t.contains("sky") { vec![1.0, 0.0] } else { vec![0.0, 1.0] })
            .collect())
    }

    fn embed_query(&self, text: &str) -> Result<Vec<f32>> {
        Ok(self.embed_batch(&[text.to_string()])?.remove(0))
    }
}

/// Embedder fake that always fails, for the halted-pipeline cases.
struct DownEmbedder;

impl Embedder for DownEmbedder {
    fn dim(&self) -> usize {
        2
    }

    fn embed_batch(&self, _texts: &[String]) -> Result<Vec<Vec<f32>>> {
        Err(Error::EmbeddingUnavailable("endpoint down".to_string()))
    }

    fn embed_query(&self, _text: &str) -> Result<Vec<f32>> {
        Err(Error::EmbeddingUnavailable("endpoint down".to_string()))
    }
}

/// Completer fake: records what reached it and replies with a canned answer.
/// Clones share the call log.
#[derive(Default, Clone)]
struct RecordingCompleter {
    calls: Arc<Mutex<Vec<(String, String)>>>,
}

impl Completer for RecordingCompleter {
    fn answer(&self, question: &str, context: &str) -> Result<String> {
        self.calls
            .lock()
            .expect("lock")
            .push((question.to_string(), context.to_string()));
        Ok("canned answer".to_string())
    }

    fn summarize(&self, text: &str) -> Result<String> {
        self.calls
            .lock()
            .expect("lock")
            .push(("<summary>".to_string(), text.to_string()));
        Ok("canned summary".to_string())
    }
}

fn pipeline_with(
    extractor: StubExtractor,
    embedder: Box<dyn Embedder>,
    store: Arc<VectorStore>,
    completer: RecordingCompleter,
    chunking: ChunkingConfig,
) -> DocumentPipeline {
    struct SharedStore(Arc<VectorStore>);
    impl pdfrag_core::traits::VectorIndex for SharedStore {
        fn index(&self, doc_id: &str, chunks: &[String], vectors: &[Vec<f32>]) -> Result<()> {
            self.0.index(doc_id, chunks, vectors)
        }
        fn search(
            &self,
            doc_id: &str,
            query_vec: &[f32],
            top_k: usize,
        ) -> Result<Vec<pdfrag_core::types::ScoredChunk>> {
            self.0.search(doc_id, query_vec, top_k)
        }
    }
    DocumentPipeline::new(
        Box::new(extractor),
        Box::new(WindowChunker),
        embedder,
        Box::new(SharedStore(store)),
        Box::new(completer),
        PipelineConfig { chunking, top_k: 5 },
    )
}

#[test]
fn end_to_end_sky_question_retrieves_the_sky_chunk() {
    let extractor = StubExtractor::new("The sky is blue. Grass is green.");
    let completer = RecordingCompleter::default();
    let store = Arc::new(VectorStore::new());
    let mut pipeline = pipeline_with(
        extractor,
        Box::new(StubEmbedder),
        store,
        completer.clone(),
        ChunkingConfig { chunk_size: 16, chunk_overlap: 0 },
    );

    let report = pipeline.load("/docs/colors.pdf", None).expect("load");
    assert_eq!(report.doc_id, "colors");
    assert_eq!(report.chunk_count, 2);
    assert_eq!(pipeline.stage(), PipelineStage::Indexed);

    let answer = pipeline
        .ask("What color is the sky?", Some(1), None)
        .expect("ask");
    assert_eq!(answer, "canned answer");

    let calls = completer.calls.lock().expect("lock");
    let (question, context) = &calls[0];
    assert_eq!(question, "What color is the sky?");
    assert_eq!(context, "The sky is blue.", "top-1 context is exactly the first chunk");
}

#[test]
fn explicit_context_skips_retrieval_and_passes_verbatim() {
    let extractor = StubExtractor::new("The sky is blue. Grass is green.");
    let completer = RecordingCompleter::default();
    let mut pipeline = pipeline_with(
        extractor,
        Box::new(StubEmbedder),
        Arc::new(VectorStore::new()),
        completer.clone(),
        ChunkingConfig { chunk_size: 16, chunk_overlap: 0 },
    );
    pipeline.load("/docs/colors.pdf", None).expect("load");

    pipeline
        .ask("Whatever?", None, Some("injected context"))
        .expect("ask");
    let calls = completer.calls.lock().expect("lock");
    assert_eq!(calls[0].1, "injected context");
}

#[test]
fn no_indexed_chunks_means_empty_context_not_an_error() {
    let extractor = StubExtractor::new("");
    let completer = RecordingCompleter::default();
    let mut pipeline = pipeline_with(
        extractor,
        Box::new(StubEmbedder),
        Arc::new(VectorStore::new()),
        completer.clone(),
        ChunkingConfig::default(),
    );
    pipeline.load("/docs/empty.pdf", None).expect("load");

    pipeline.ask("Anything in here?", None, None).expect("ask");
    let calls = completer.calls.lock().expect("lock");
    assert_eq!(calls[0].1, "", "completer sees an empty context section");
}

#[test]
fn ask_before_load_is_document_not_loaded() {
    let extractor = StubExtractor::new("unused");
    let completer = RecordingCompleter::default();
    let pipeline = pipeline_with(
        extractor,
        Box::new(StubEmbedder),
        Arc::new(VectorStore::new()),
        completer,
        ChunkingConfig::default(),
    );
    let err = pipeline.ask("Anyone home?", None, None).unwrap_err();
    assert!(matches!(err, Error::DocumentNotLoaded(_)));
}

#[test]
fn failed_embedding_halts_pipeline_and_writes_nothing() {
    let extractor = StubExtractor::new("some text to embed");
    let completer = RecordingCompleter::default();
    let store = Arc::new(VectorStore::new());
    let mut pipeline = pipeline_with(
        extractor,
        Box::new(DownEmbedder),
        store.clone(),
        completer,
        ChunkingConfig::default(),
    );

    let err = pipeline.load("/docs/doomed.pdf", None).unwrap_err();
    assert!(matches!(err, Error::EmbeddingUnavailable(_)));
    assert_eq!(pipeline.stage(), PipelineStage::Failed(FailedStage::Embedding));
    assert_eq!(store.doc_len("doomed"), 0, "no partial index was written");

    let err = pipeline.ask("still there?", None, None).unwrap_err();
    assert!(matches!(err, Error::DocumentNotLoaded(_)));
}

#[test]
fn summary_works_from_raw_text_even_when_embedding_failed() {
    let extractor = StubExtractor::new("raw text to summarize");
    let completer = RecordingCompleter::default();
    let mut pipeline = pipeline_with(
        extractor,
        Box::new(DownEmbedder),
        Arc::new(VectorStore::new()),
        completer.clone(),
        ChunkingConfig::default(),
    );
    pipeline.load("/docs/doomed.pdf", None).unwrap_err();

    let summary = pipeline.summarize().expect("summarize");
    assert_eq!(summary, "canned summary");
    let calls = completer.calls.lock().expect("lock");
    assert!(calls[0].1.contains("raw text to summarize"));
}

#[test]
fn reingest_supersedes_previous_content() {
    let extractor = StubExtractor::new("The sky is blue. Grass is green.");
    let completer = RecordingCompleter::default();
    let store = Arc::new(VectorStore::new());
    let mut pipeline = pipeline_with(
        extractor.clone(),
        Box::new(StubEmbedder),
        store.clone(),
        completer.clone(),
        ChunkingConfig { chunk_size: 64, chunk_overlap: 0 },
    );
    pipeline.load("/docs/colors.pdf", None).expect("load");
    assert_eq!(store.doc_len("colors"), 1);

    extractor.set_text("The sky is gray today.");
    pipeline.load("/docs/colors.pdf", None).expect("reload");
    assert_eq!(store.doc_len("colors"), 1);

    pipeline.ask("What about the sky?", Some(5), None).expect("ask");
    let calls = completer.calls.lock().expect("lock");
    let context = &calls.last().expect("one call").1;
    assert_eq!(context, "The sky is gray today.", "only new content is retrievable");
}

#[test]
fn ingesting_twice_without_changes_is_idempotent() {
    let extractor = StubExtractor::new("The sky is blue. Grass is green.");
    let completer = RecordingCompleter::default();
    let store = Arc::new(VectorStore::new());
    let mut pipeline = pipeline_with(
        extractor,
        Box::new(StubEmbedder),
        store.clone(),
        completer,
        ChunkingConfig { chunk_size: 16, chunk_overlap: 0 },
    );
    pipeline.load("/docs/colors.pdf", None).expect("first load");
    let first = store.search("colors", &[1.0, 0.0], 10).expect("search");
    pipeline.load("/docs/colors.pdf", None).expect("second load");
    let second = store.search("colors", &[1.0, 0.0], 10).expect("search");

    assert_eq!(first.len(), second.len());
    for (a, b) in first.iter().zip(second.iter()) {
        assert_eq!(a.content, b.content);
        assert_eq!(a.chunk_index, b.chunk_index);
        assert!((a.score - b.score).abs() < 1e-6);
    }
}
