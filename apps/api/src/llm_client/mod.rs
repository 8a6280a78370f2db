//! LLM Client: the single point of entry for text completion calls.
//!
//! Field generators only ever see `TextCompletionProvider`; `LlmClient` is the
//! Gemini `generateContent` implementation wired in at startup. One call is one
//! attempt: retries, backoff and per-attempt timeouts live in `retry::with_retry`.
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

pub mod prompts;
pub mod retry;

pub use retry::{with_retry, RetryPolicy};

const GEMINI_API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta/models";
pub const DEFAULT_MODEL: &str = "gemini-2.5-flash";
const MIN_OUTPUT_TOKENS: usize = 1024;
const MAX_OUTPUT_TOKENS: usize = 8192;
const TEMPERATURE: f32 = 0.7;

#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("provider returned empty content")]
    EmptyContent,

    #[error("provider call timed out after {seconds}s")]
    Timeout { seconds: u64 },

    #[error("failed to build HTTP client: {0}")]
    Client(String),

    #[error("provider failed after {attempts} attempts: {source}")]
    RetriesExhausted {
        attempts: u32,
        #[source]
        source: Box<ProviderError>,
    },
}

impl ProviderError {
    /// Rate limits, upstream 5xx, transport failures, timeouts and empty
    /// completions are worth another attempt. Everything else is final.
    pub fn is_retryable(&self) -> bool {
        match self {
            ProviderError::Http(e) => e.is_timeout() || e.is_connect() || e.is_request(),
            ProviderError::Api { status, .. } => *status == 429 || *status >= 500,
            ProviderError::EmptyContent | ProviderError::Timeout { .. } => true,
            ProviderError::Client(_) | ProviderError::RetriesExhausted { .. } => false,
        }
    }
}

/// Plain text completion. `max_output_hint` is the expected output length in chars.
#[async_trait]
pub trait TextCompletionProvider: Send + Sync {
    async fn complete(&self, prompt: &str, max_output_hint: usize) -> Result<String, ProviderError>;
}

// ────────────────────────────────────────────────────────────────────────────
// Gemini wire format
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentRequest<'a> {
    system_instruction: Content<'a>,
    contents: Vec<Content<'a>>,
    generation_config: GenerationConfig,
}

#[derive(Debug, Serialize)]
struct Content<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    role: Option<&'a str>,
    parts: Vec<RequestPart<'a>>,
}

#[derive(Debug, Serialize)]
struct RequestPart<'a> {
    text: &'a str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    max_output_tokens: usize,
    temperature: f32,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateContentResponse {
    #[serde(default)]
    pub candidates: Vec<Candidate>,
    pub usage_metadata: Option<UsageMetadata>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Candidate {
    pub content: Option<CandidateContent>,
    pub finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct CandidateContent {
    #[serde(default)]
    pub parts: Vec<ResponsePart>,
}

#[derive(Debug, Deserialize)]
pub struct ResponsePart {
    pub text: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UsageMetadata {
    #[serde(default)]
    pub prompt_token_count: u32,
    #[serde(default)]
    pub candidates_token_count: u32,
}

impl GenerateContentResponse {
    /// Concatenated text parts of the first candidate.
    pub fn text(&self) -> Option<String> {
        let content = self.candidates.first()?.content.as_ref()?;
        let text: String = content
            .parts
            .iter()
            .filter_map(|p| p.text.as_deref())
            .collect();
        (!text.trim().is_empty()).then_some(text)
    }
}

#[derive(Debug, Deserialize)]
struct GeminiError {
    error: GeminiErrorBody,
}

#[derive(Debug, Deserialize)]
struct GeminiErrorBody {
    message: String,
}

// ────────────────────────────────────────────────────────────────────────────
// Client
// ────────────────────────────────────────────────────────────────────────────

#[derive(Clone)]
pub struct LlmClient {
    client: Client,
    api_key: String,
    model: String,
}

impl LlmClient {
    pub fn new(api_key: String, model: String) -> Result<Self, ProviderError> {
        // Per-attempt deadlines come from RetryPolicy; this only bounds a hung socket.
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(120))
            .build()
            .map_err(|e| ProviderError::Client(e.to_string()))?;

        Ok(Self {
            client,
            api_key,
            model,
        })
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    fn endpoint(&self) -> String {
        format!("{GEMINI_API_BASE}/{}:generateContent", self.model)
    }

    /// One `generateContent` round trip.
    pub async fn call(
        &self,
        prompt: &str,
        max_output_tokens: usize,
    ) -> Result<GenerateContentResponse, ProviderError> {
        let request_body = GenerateContentRequest {
            system_instruction: Content {
                role: None,
                parts: vec![RequestPart {
                    text: prompts::PLAIN_TEXT_SYSTEM,
                }],
            },
            contents: vec![Content {
                role: Some("user"),
                parts: vec![RequestPart { text: prompt }],
            }],
            generation_config: GenerationConfig {
                max_output_tokens,
                temperature: TEMPERATURE,
            },
        };

        let response = self
            .client
            .post(self.endpoint())
            .header("x-goog-api-key", &self.api_key)
            .header("content-type", "application/json")
            .json(&request_body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<GeminiError>(&body)
                .map(|e| e.error.message)
                .unwrap_or(body);
            return Err(ProviderError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let parsed: GenerateContentResponse = response.json().await?;

        if let Some(usage) = &parsed.usage_metadata {
            debug!(
                model = %self.model,
                input_tokens = usage.prompt_token_count,
                output_tokens = usage.candidates_token_count,
                "Gemini call succeeded"
            );
        }

        Ok(parsed)
    }
}

#[async_trait]
impl TextCompletionProvider for LlmClient {
    async fn complete(&self, prompt: &str, max_output_hint: usize) -> Result<String, ProviderError> {
        let response = self.call(prompt, output_token_budget(max_output_hint)).await?;
        let Some(text) = response.text() else {
            let finish_reason = response
                .candidates
                .first()
                .and_then(|c| c.finish_reason.as_deref())
                .unwrap_or("none");
            warn!(model = %self.model, finish_reason, "Gemini returned no text");
            return Err(ProviderError::EmptyContent);
        };
        Ok(clean_completion(&text))
    }
}

// Japanese runs close to one token per char; double it to leave room for markup.
fn output_token_budget(max_output_hint: usize) -> usize {
    max_output_hint
        .saturating_mul(2)
        .clamp(MIN_OUTPUT_TOKENS, MAX_OUTPUT_TOKENS)
}

/// Strips code fences and wrapping quotes that models add around plain text.
pub fn clean_completion(text: &str) -> String {
    let text = text.trim();
    let text = if let Some(stripped) = text.strip_prefix("```") {
        // drop an optional language tag on the opening fence line
        let body = stripped
            .split_once('\n')
            .map(|(_, rest)| rest)
            .unwrap_or(stripped);
        body.trim_end().strip_suffix("```").unwrap_or(body).trim()
    } else {
        text
    };

    let quote_pairs = [('"', '"'), ('「', '」'), ('『', '』'), ('“', '”')];
    for (open, close) in quote_pairs {
        if let Some(inner) = text.strip_prefix(open).and_then(|t| t.strip_suffix(close)) {
            if !inner.contains(open) && !inner.contains(close) {
                return inner.trim().to_string();
            }
        }
    }
    text.to_string()
}
