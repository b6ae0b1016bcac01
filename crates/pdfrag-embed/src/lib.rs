//! Embedding clients.
//!
//! `OpenAiEmbedder` talks to an OpenAI-compatible `/embeddings` endpoint;
//! `FakeEmbedder` is a deterministic hash-based stand-in selected with
//! `APP_USE_FAKE_EMBEDDINGS=1` so tests and offline runs never touch the
//! network. Both produce unit-norm vectors of a fixed dimensionality.

use std::thread;
use std::time::Duration;

use reqwest::blocking::Client;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};

use pdfrag_core::config::{api_key, Config};
use pdfrag_core::traits::Embedder;
use pdfrag_core::{Error, Result};

pub const DEFAULT_ENDPOINT: &str = "https://api.openai.com/v1";
pub const DEFAULT_MODEL: &str = "text-embedding-3-small";
pub const DEFAULT_DIM: usize = 1536;

const MAX_RETRIES: usize = 3;

/// Blocking embeddings client for OpenAI-compatible endpoints.
///
/// One remote call per `embed_batch`; nothing is cached across calls. A
/// failed call surfaces as `EmbeddingUnavailable`, never as a placeholder
/// vector.
pub struct OpenAiEmbedder {
    client: Client,
    endpoint: String,
    model: String,
    dim: usize,
}

impl OpenAiEmbedder {
    pub fn new(api_key: &str, base_url: &str, model: &str, dim: usize) -> Result<Self> {
        if api_key.trim().is_empty() {
            return Err(Error::EmbeddingUnavailable("missing API key".to_string()));
        }
        let mut headers = HeaderMap::new();
        let auth = format!("Bearer {}", api_key.trim());
        headers.insert(
            AUTHORIZATION,
            HeaderValue::from_str(&auth)
                .map_err(|e| Error::EmbeddingUnavailable(format!("invalid API key: {e}")))?,
        );
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        let client = Client::builder()
            .timeout(Duration::from_secs(60))
            .default_headers(headers)
            .build()
            .map_err(|e| Error::EmbeddingUnavailable(format!("failed to build HTTP client: {e}")))?;
        let endpoint = format!("{}/embeddings", base_url.trim_end_matches('/'));
        Ok(Self { client, endpoint, model: model.to_string(), dim })
    }

    fn request(&self, inputs: &[String]) -> Result<Vec<Vec<f32>>> {
        let mut attempt = 0usize;
        loop {
            let body = EmbeddingRequest { model: &self.model, input: inputs };
            let response = self.client.post(&self.endpoint).json(&body).send();
            match response {
                Ok(resp) => {
                    let status = resp.status();
                    if status.is_success() {
                        let mut parsed: EmbeddingResponse = resp.json().map_err(|e| {
                            Error::EmbeddingUnavailable(format!("bad embedding response: {e}"))
                        })?;
                        parsed.data.sort_by_key(|row| row.index);
                        if parsed.data.len() != inputs.len() {
                            return Err(Error::EmbeddingUnavailable(format!(
                                "endpoint returned {} embeddings for {} inputs",
                                parsed.data.len(),
                                inputs.len()
                            )));
                        }
                        return Ok(parsed.data.into_iter().map(|row| row.embedding).collect());
                    }
                    let retryable =
                        status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error();
                    if retryable && attempt + 1 < MAX_RETRIES {
                        attempt += 1;
                        thread::sleep(retry_backoff(attempt));
                        continue;
                    }
                    let text = resp
                        .text()
                        .unwrap_or_else(|_| "<body unavailable>".to_string());
                    return Err(Error::EmbeddingUnavailable(format!(
                        "embeddings request failed ({status}): {text}"
                    )));
                }
                Err(err) => {
                    let retryable = err.is_timeout() || err.is_connect() || err.is_request();
                    if retryable && attempt + 1 < MAX_RETRIES {
                        attempt += 1;
                        thread::sleep(retry_backoff(attempt));
                        continue;
                    }
                    return Err(Error::EmbeddingUnavailable(err.to_string()));
                }
            }
        }
    }
}

impl Embedder for OpenAiEmbedder {
    fn dim(&self) -> usize {
        self.dim
    }

    fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }
        self.request(texts)
    }

    fn embed_query(&self, text: &str) -> Result<Vec<f32>> {
        let mut vectors = self.request(&[text.to_string()])?;
        Ok(vectors.remove(0))
    }
}

fn retry_backoff(attempt: usize) -> Duration {
    let capped = attempt.min(5) as u32;
    Duration::from_millis(500 * (1 << capped))
}

#[derive(Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    input: &'a [String],
}

#[derive(Debug, Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingRow>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingRow {
    embedding: Vec<f32>,
    index: usize,
}

/// Deterministic offline embedder: tokens hash into buckets and the result
/// is L2-normalized. Same text, same vector, no network.
pub struct FakeEmbedder {
    dim: usize,
}

impl FakeEmbedder {
    pub fn new(dim: usize) -> Self {
        Self { dim }
    }

    fn embed_one(&self, text: &str) -> Vec<f32> {
        use std::hash::{Hash, Hasher};
        use twox_hash::XxHash64;
        let mut v = vec![0f32; self.dim];
        for (i, token) in text.split_whitespace().enumerate() {
            let mut hasher = XxHash64::with_seed(0);
            token.hash(&mut hasher);
            let h = hasher.finish();
            let idx = (h as usize) % self.dim;
            let val = (((h >> 32) as u32) as f32) / (u32::MAX as f32);
            v[idx] += val + (i as f32 % 3.0) * 0.01;
        }
        let norm = v.iter().map(|x| x * x).sum::<f32>().sqrt().max(1e-6);
        for x in &mut v {
            *x /= norm;
        }
        v
    }
}

impl Embedder for FakeEmbedder {
    fn dim(&self) -> usize {
        self.dim
    }

    fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        Ok(texts.iter().map(|t| self.embed_one(t)).collect())
    }

    fn embed_query(&self, text: &str) -> Result<Vec<f32>> {
        Ok(self.embed_one(text))
    }
}

/// Build the configured embedder. `APP_USE_FAKE_EMBEDDINGS=1` short-circuits
/// to the deterministic fake; otherwise the remote client is constructed and
/// a missing API key fails here, before any document work starts.
pub fn embedder_from_config(config: &Config) -> Result<Box<dyn Embedder>> {
    let use_fake = std::env::var("APP_USE_FAKE_EMBEDDINGS")
        .ok()
        .map(|v| v == "1" || v.eq_ignore_ascii_case("true"))
        .unwrap_or(false);
    if use_fake {
        println!("🧪 Using FakeEmbedder");
        return Ok(Box::new(FakeEmbedder::new(
            config.get("embedding.dim").unwrap_or(DEFAULT_DIM),
        )));
    }
    let key = api_key().ok_or_else(|| {
        Error::EmbeddingUnavailable("no API key in APP_API_KEY or OPENAI_API_KEY".to_string())
    })?;
    let endpoint: String = config
        .get("embedding.endpoint")
        .unwrap_or_else(|_| DEFAULT_ENDPOINT.to_string());
    let model: String = config
        .get("embedding.model")
        .unwrap_or_else(|_| DEFAULT_MODEL.to_string());
    let dim = config.get("embedding.dim").unwrap_or(DEFAULT_DIM);
    Ok(Box::new(OpenAiEmbedder::new(&key, &endpoint, &model, dim)?))
}
