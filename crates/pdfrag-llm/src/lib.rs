//! Chat-completion client.
//!
//! `OpenAiCompleter::complete` is the opaque capability itself: single
//! prompt in, single completion out, against an OpenAI-compatible
//! `/chat/completions` endpoint. The `Completer` trait methods compose the
//! fixed templates in `prompt` around it. Multi-turn behavior, if a caller
//! wants it, is reconstructed by re-sending context each call; nothing is
//! kept here.

pub mod prompt;

use std::time::Duration;

use reqwest::blocking::Client;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use serde::{Deserialize, Serialize};

use pdfrag_core::config::{api_key, Config};
use pdfrag_core::traits::Completer;
use pdfrag_core::{Error, Result};

pub const DEFAULT_ENDPOINT: &str = "https://api.openai.com/v1";
pub const DEFAULT_MODEL: &str = "gpt-4-turbo-preview";
pub const DEFAULT_TEMPERATURE: f32 = 0.0;
pub const DEFAULT_MAX_TOKENS: usize = 1024;

pub struct OpenAiCompleter {
    client: Client,
    endpoint: String,
    model: String,
    temperature: f32,
    max_tokens: usize,
}

impl OpenAiCompleter {
    pub fn new(
        api_key: &str,
        base_url: &str,
        model: &str,
        temperature: f32,
        max_tokens: usize,
    ) -> Result<Self> {
        if api_key.trim().is_empty() {
            return Err(Error::ToolInvocation("missing API key for LLM".to_string()));
        }
        let mut headers = HeaderMap::new();
        let auth = format!("Bearer {}", api_key.trim());
        headers.insert(
            AUTHORIZATION,
            HeaderValue::from_str(&auth)
                .map_err(|e| Error::ToolInvocation(format!("invalid API key: {e}")))?,
        );
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        let client = Client::builder()
            .timeout(Duration::from_secs(120))
            .default_headers(headers)
            .build()
            .map_err(|e| Error::ToolInvocation(format!("failed to build HTTP client: {e}")))?;
        let endpoint = format!("{}/chat/completions", base_url.trim_end_matches('/'));
        Ok(Self {
            client,
            endpoint,
            model: model.to_string(),
            temperature,
            max_tokens,
        })
    }

    /// Single prompt in, single completion out, returned verbatim.
    pub fn complete(&self, prompt: &str) -> Result<String> {
        let body = ChatRequest {
            model: &self.model,
            temperature: self.temperature,
            max_tokens: self.max_tokens,
            messages: vec![ChatMessage { role: "user", content: prompt }],
        };
        let resp = self
            .client
            .post(&self.endpoint)
            .json(&body)
            .send()
            .map_err(|e| Error::ToolInvocation(format!("chat completion call failed: {e}")))?;
        if !resp.status().is_success() {
            let status = resp.status();
            let text = resp
                .text()
                .unwrap_or_else(|_| "<body unavailable>".to_string());
            return Err(Error::ToolInvocation(format!(
                "chat completion returned {status}: {text}"
            )));
        }
        let parsed: ChatResponse = resp
            .json()
            .map_err(|e| Error::ToolInvocation(format!("bad chat completion response: {e}")))?;
        let answer = parsed
            .choices
            .into_iter()
            .next()
            .map(|choice| choice.message.content)
            .unwrap_or_default();
        Ok(answer)
    }
}

impl Completer for OpenAiCompleter {
    fn answer(&self, question: &str, context: &str) -> Result<String> {
        self.complete(&prompt::qna_prompt(question, context))
    }

    fn summarize(&self, text: &str) -> Result<String> {
        self.complete(&prompt::summary_prompt(text))
    }
}

/// Deterministic offline completer selected with `APP_USE_FAKE_LLM=1`.
/// Answers echo the supplied context (or the sentinel when there is none),
/// which makes end-to-end retrieval observable in tests without a network.
pub struct FakeCompleter;

impl Completer for FakeCompleter {
    fn answer(&self, _question: &str, context: &str) -> Result<String> {
        if context.trim().is_empty() {
            Ok(prompt::NOT_FOUND_REPLY.to_string())
        } else {
            Ok(context.to_string())
        }
    }

    fn summarize(&self, text: &str) -> Result<String> {
        Ok(format!("Summary ({} chars)", text.chars().count()))
    }
}

/// Build the configured completer; a missing API key fails here, at
/// startup, not in the middle of a question.
pub fn completer_from_config(config: &Config) -> Result<Box<dyn Completer>> {
    let use_fake = std::env::var("APP_USE_FAKE_LLM")
        .ok()
        .map(|v| v == "1" || v.eq_ignore_ascii_case("true"))
        .unwrap_or(false);
    if use_fake {
        println!("🧪 Using FakeCompleter");
        return Ok(Box::new(FakeCompleter));
    }
    let key = api_key().ok_or_else(|| {
        Error::ToolInvocation("no API key in APP_API_KEY or OPENAI_API_KEY".to_string())
    })?;
    let endpoint: String = config
        .get("llm.endpoint")
        .unwrap_or_else(|_| DEFAULT_ENDPOINT.to_string());
    let model: String = config
        .get("llm.model")
        .unwrap_or_else(|_| DEFAULT_MODEL.to_string());
    let temperature = config.get("llm.temperature").unwrap_or(DEFAULT_TEMPERATURE);
    let max_tokens = config.get("llm.max_tokens").unwrap_or(DEFAULT_MAX_TOKENS);
    Ok(Box::new(OpenAiCompleter::new(
        &key,
        &endpoint,
        &model,
        temperature,
        max_tokens,
    )?))
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    temperature: f32,
    max_tokens: usize,
    messages: Vec<ChatMessage<'a>>,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: AssistantMessage,
}

#[derive(Debug, Deserialize)]
struct AssistantMessage {
    content: String,
}
