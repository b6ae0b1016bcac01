//! Stdio tool server exposing the document-processing stages.
//!
//! One process serves one client session over stdin/stdout; the caller
//! launches a fresh instance per invocation. Indexed state lives in the
//! snapshot file so separate invocations observe each other's writes.

use std::io;
use std::path::PathBuf;
use std::sync::Arc;

use serde_json::{Map, Value};

use pdfrag_core::chunker::chunk_text;
use pdfrag_core::config::Config;
use pdfrag_core::traits::{Completer, Embedder, Extractor};
use pdfrag_pipeline::extract::PdfExtractor;
use pdfrag_tool::{ContentItem, ParamKind, ParamSpec, ToolDef, ToolRegistry};
use pdfrag_vector::snapshot;

const DEFAULT_CHUNK_SIZE: usize = 500;
const DEFAULT_CHUNK_OVERLAP: usize = 0;
const DEFAULT_TOP_K: usize = 5;

fn main() -> anyhow::Result<()> {
    let config = Config::load().map_err(|e| {
        eprintln!("Error loading config: {}", e);
        e
    })?;
    let registry = build_registry(&config)?;
    let stdin = io::stdin();
    let stdout = io::stdout();
    registry.serve(stdin.lock(), stdout.lock())
}

fn build_registry(config: &Config) -> anyhow::Result<ToolRegistry> {
    let embedder: Arc<dyn Embedder> = Arc::from(pdfrag_embed::embedder_from_config(config)?);
    // The LLM may be unavailable (no key); only the two tools that need it
    // should fail in that case, not the whole server.
    let completer: Option<Arc<dyn Completer>> = match pdfrag_llm::completer_from_config(config) {
        Ok(completer) => Some(Arc::from(completer)),
        Err(e) => {
            eprintln!("⚠️  LLM tools disabled: {e}");
            None
        }
    };
    let snapshot_path = snapshot_path(config);
    let chunk_size: usize = config.get("chunking.chunk_size").unwrap_or(DEFAULT_CHUNK_SIZE);
    let chunk_overlap: usize = config
        .get("chunking.chunk_overlap")
        .unwrap_or(DEFAULT_CHUNK_OVERLAP);
    let top_k_default: usize = config.get("qna.top_k").unwrap_or(DEFAULT_TOP_K);

    let mut registry = ToolRegistry::new("pdfrag-toolserver");

    registry.register(ToolDef {
        name: "extract_pdf_contents",
        description: "Extracts text from a PDF file, optionally limited to a page selection",
        params: vec![
            ParamSpec::required("pdf_path", ParamKind::String),
            ParamSpec::optional("pages", ParamKind::String),
        ],
        handler: Box::new(move |args| {
            let pdf_path = require_str(args, "pdf_path")?;
            let pages = args.get("pages").and_then(Value::as_str);
            let text = PdfExtractor.extract(pdf_path, pages)?;
            Ok(vec![ContentItem::text(text)])
        }),
    });

    registry.register(ToolDef {
        name: "chunk_text",
        description: "Splits text into overlapping fixed-size windows, one content item per window",
        params: vec![
            ParamSpec::required("text", ParamKind::String),
            ParamSpec::optional("chunk_size", ParamKind::Integer),
            ParamSpec::optional("chunk_overlap", ParamKind::Integer),
        ],
        handler: Box::new(move |args| {
            let text = require_str(args, "text")?;
            let size = opt_usize(args, "chunk_size").unwrap_or(chunk_size);
            let overlap = opt_usize(args, "chunk_overlap").unwrap_or(chunk_overlap);
            let windows = chunk_text(text, size, overlap)?;
            Ok(windows.into_iter().map(ContentItem::text).collect())
        }),
    });

    let embed_embedder = embedder.clone();
    let embed_snapshot = snapshot_path.clone();
    registry.register(ToolDef {
        name: "embed_chunks",
        description: "Embeds text chunks; with doc_id the vectors are indexed instead of returned",
        params: vec![
            ParamSpec::optional("text_chunks", ParamKind::Array),
            ParamSpec::optional("chunks", ParamKind::Array),
            ParamSpec::optional("doc_id", ParamKind::String),
        ],
        handler: Box::new(move |args| {
            // Both argument spellings are in use by existing callers.
            let chunks = string_array(args, "text_chunks")?
                .or(string_array(args, "chunks")?)
                .ok_or_else(|| anyhow::anyhow!("either 'text_chunks' or 'chunks' is required"))?;
            let vectors = embed_embedder.embed_batch(&chunks)?;
            match args.get("doc_id").and_then(Value::as_str) {
                Some(doc_id) => {
                    let store = snapshot::load(&embed_snapshot)?;
                    store.index(doc_id, &chunks, &vectors)?;
                    snapshot::save(&store, &embed_snapshot)?;
                    Ok(vec![ContentItem::text(format!(
                        "Indexed {} chunks for doc_id '{doc_id}'",
                        chunks.len()
                    ))])
                }
                None => vectors
                    .iter()
                    .map(|v| {
                        serde_json::to_string(v)
                            .map(ContentItem::text)
                            .map_err(anyhow::Error::from)
                    })
                    .collect(),
            }
        }),
    });

    let search_snapshot = snapshot_path.clone();
    registry.register(ToolDef {
        name: "search_embeddings",
        description: "Returns the chunks of a document most similar to a query embedding",
        params: vec![
            ParamSpec::required("doc_id", ParamKind::String),
            ParamSpec::required("query_embedding", ParamKind::Array),
            ParamSpec::optional("top_k", ParamKind::Integer),
        ],
        handler: Box::new(move |args| {
            let doc_id = require_str(args, "doc_id")?;
            let query = float_array(args, "query_embedding")?;
            let top_k = opt_usize(args, "top_k").unwrap_or(top_k_default);
            let store = snapshot::load(&search_snapshot)?;
            let hits = store.search(doc_id, &query, top_k)?;
            Ok(hits
                .into_iter()
                .map(|h| ContentItem::text(h.content))
                .collect())
        }),
    });

    let qna_completer = completer.clone();
    let qna_embedder = embedder;
    let qna_snapshot = snapshot_path;
    registry.register(ToolDef {
        name: "answer_question",
        description: "Answers a question from retrieved document context (RAG)",
        params: vec![
            ParamSpec::required("question", ParamKind::String),
            ParamSpec::optional("doc_id", ParamKind::String),
            ParamSpec::optional("context", ParamKind::String),
            ParamSpec::optional("top_k", ParamKind::Integer),
        ],
        handler: Box::new(move |args| {
            let question = require_str(args, "question")?;
            let completer = qna_completer
                .as_ref()
                .ok_or_else(|| anyhow::anyhow!("LLM unavailable: no API key configured"))?;
            let context = match args.get("context").and_then(Value::as_str) {
                Some(context) => context.to_string(),
                None => {
                    let doc_id = require_str(args, "doc_id")
                        .map_err(|_| anyhow::anyhow!("'doc_id' is required when no context is given"))?;
                    let top_k = opt_usize(args, "top_k").unwrap_or(top_k_default);
                    let query_vec = qna_embedder.embed_query(question)?;
                    let store = snapshot::load(&qna_snapshot)?;
                    let hits = store.search(doc_id, &query_vec, top_k)?;
                    hits.iter()
                        .map(|h| h.content.as_str())
                        .collect::<Vec<_>>()
                        .join("\n")
                }
            };
            let answer = completer.answer(question, &context)?;
            Ok(vec![ContentItem::text(answer)])
        }),
    });

    registry.register(ToolDef {
        name: "summarize_text",
        description: "Summarizes text or joined chunks as concisely as possible",
        params: vec![ParamSpec::required("text", ParamKind::String)],
        handler: Box::new(move |args| {
            let text = require_str(args, "text")?;
            let completer = completer
                .as_ref()
                .ok_or_else(|| anyhow::anyhow!("LLM unavailable: no API key configured"))?;
            let summary = completer.summarize(text)?;
            Ok(vec![ContentItem::text(summary)])
        }),
    });

    Ok(registry)
}

fn snapshot_path(config: &Config) -> PathBuf {
    config
        .get::<String>("snapshot_path")
        .map(PathBuf::from)
        .unwrap_or_else(|_| std::env::temp_dir().join("pdfrag").join("store.json"))
}

fn require_str<'a>(args: &'a Map<String, Value>, name: &str) -> anyhow::Result<&'a str> {
    args.get(name)
        .and_then(Value::as_str)
        .ok_or_else(|| anyhow::anyhow!("missing required argument '{name}'"))
}

fn opt_usize(args: &Map<String, Value>, name: &str) -> Option<usize> {
    args.get(name).and_then(Value::as_u64).map(|v| v as usize)
}

fn string_array(args: &Map<String, Value>, name: &str) -> anyhow::Result<Option<Vec<String>>> {
    match args.get(name) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::Array(items)) => items
            .iter()
            .map(|v| {
                v.as_str()
                    .map(str::to_string)
                    .ok_or_else(|| anyhow::anyhow!("'{name}' must be an array of strings"))
            })
            .collect::<anyhow::Result<Vec<String>>>()
            .map(Some),
        Some(_) => anyhow::bail!("'{name}' must be an array"),
    }
}

fn float_array(args: &Map<String, Value>, name: &str) -> anyhow::Result<Vec<f32>> {
    let items = args
        .get(name)
        .and_then(Value::as_array)
        .ok_or_else(|| anyhow::anyhow!("missing required argument '{name}'"))?;
    items
        .iter()
        .map(|v| {
            v.as_f64()
                .map(|f| f as f32)
                .ok_or_else(|| anyhow::anyhow!("'{name}' must be an array of numbers"))
        })
        .collect()
}
