//! Tool-backed collaborators.
//!
//! Each impl maps one core trait onto a wire-contract tool invoked through a
//! `ToolChannel`, so every stage runs in its own short-lived server process.
//! The channel is shared: it only holds the launch spec, each invocation
//! still gets a fresh session.

use std::sync::Arc;

use serde_json::json;

use pdfrag_core::traits::{Chunker, Completer, Embedder, Extractor};
use pdfrag_core::{Error, Result};
use pdfrag_tool::{ContentItem, ToolChannel};

pub struct ToolExtractor {
    channel: Arc<ToolChannel>,
}

impl ToolExtractor {
    pub fn new(channel: Arc<ToolChannel>) -> Self {
        Self { channel }
    }
}

impl Extractor for ToolExtractor {
    fn extract(&self, pdf_path: &str, pages: Option<&str>) -> Result<String> {
        let mut args = json!({ "pdf_path": pdf_path });
        if let Some(pages) = pages {
            args["pages"] = json!(pages);
        }
        let items = self.channel.invoke("extract_pdf_contents", args)?;
        items
            .into_iter()
            .next()
            .map(ContentItem::into_text)
            .ok_or_else(|| Error::ExtractionFailed("extractor returned no content".to_string()))
    }
}

pub struct ToolChunker {
    channel: Arc<ToolChannel>,
}

impl ToolChunker {
    pub fn new(channel: Arc<ToolChannel>) -> Self {
        Self { channel }
    }
}

impl Chunker for ToolChunker {
    fn chunk(&self, text: &str, chunk_size: usize, chunk_overlap: usize) -> Result<Vec<String>> {
        let items = self.channel.invoke(
            "chunk_text",
            json!({
                "text": text,
                "chunk_size": chunk_size,
                "chunk_overlap": chunk_overlap,
            }),
        )?;
        // One content item per window, in document order.
        Ok(items.into_iter().map(ContentItem::into_text).collect())
    }
}

pub struct ToolEmbedder {
    channel: Arc<ToolChannel>,
    dim: usize,
}

impl ToolEmbedder {
    pub fn new(channel: Arc<ToolChannel>, dim: usize) -> Self {
        Self { channel, dim }
    }

    fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let items = self
            .channel
            .invoke("embed_chunks", json!({ "text_chunks": texts }))?;
        if items.len() != texts.len() {
            return Err(Error::EmbeddingUnavailable(format!(
                "embedder returned {} vectors for {} chunks",
                items.len(),
                texts.len()
            )));
        }
        // The embedder emits one JSON-encoded vector per content item.
        items
            .into_iter()
            .map(|item| {
                serde_json::from_str::<Vec<f32>>(&item.into_text())
                    .map_err(|e| Error::EmbeddingUnavailable(format!("malformed vector: {e}")))
            })
            .collect()
    }
}

impl Embedder for ToolEmbedder {
    fn dim(&self) -> usize {
        self.dim
    }

    fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }
        self.embed(texts)
    }

    fn embed_query(&self, text: &str) -> Result<Vec<f32>> {
        let mut vectors = self.embed(&[text.to_string()])?;
        Ok(vectors.remove(0))
    }
}

pub struct ToolCompleter {
    channel: Arc<ToolChannel>,
}

impl ToolCompleter {
    pub fn new(channel: Arc<ToolChannel>) -> Self {
        Self { channel }
    }

    fn first_text(items: Vec<ContentItem>, tool: &str) -> Result<String> {
        items
            .into_iter()
            .next()
            .map(ContentItem::into_text)
            .ok_or_else(|| Error::ToolInvocation(format!("tool '{tool}' returned no content")))
    }
}

impl Completer for ToolCompleter {
    fn answer(&self, question: &str, context: &str) -> Result<String> {
        let items = self.channel.invoke(
            "answer_question",
            json!({ "question": question, "context": context }),
        )?;
        Self::first_text(items, "answer_question")
    }

    fn summarize(&self, text: &str) -> Result<String> {
        let items = self
            .channel
            .invoke("summarize_text", json!({ "text": text }))?;
        Self::first_text(items, "summarize_text")
    }
}
