//! Gemini embedding and generation clients over the REST API.
//!
//! This module is only available when the `gemini` feature is enabled.
//!
//! # Example
//!
//! ```rust,ignore
//! use pdf_chat_rag::gemini::{GeminiClient, GeminiEmbeddingProvider, GeminiGenerator};
//!
//! let client = GeminiClient::new("your-api-key")?;
//! let embedder = GeminiEmbeddingProvider::new(client.clone());
//! let generator = GeminiGenerator::new(client);
//! ```

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::{debug, error, instrument};
use url::Url;

use crate::embedding::EmbeddingProvider;
use crate::error::{RagError, Result};
use crate::generation::Generator;

/// The public Generative Language API endpoint.
pub const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta/";

/// The default embedding model.
pub const DEFAULT_EMBEDDING_MODEL: &str = "text-embedding-004";

/// Output size of `text-embedding-004`.
pub const DEFAULT_EMBEDDING_DIMENSIONS: usize = 768;

/// The default generation model.
pub const DEFAULT_CHAT_MODEL: &str = "gemini-2.0-flash";

/// `batchEmbedContents` accepts at most this many requests per call.
const MAX_BATCH_SIZE: usize = 100;

const PROVIDER: &str = "Gemini";

/// Authenticated HTTP access to the Gemini REST API.
///
/// Cheap to clone; clones share the underlying connection pool.
#[derive(Debug, Clone)]
pub struct GeminiClient {
    http_client: reqwest::Client,
    base_url: Url,
}

impl GeminiClient {
    /// Create a client for the public endpoint.
    pub fn new(api_key: &str) -> Result<Self> {
        Self::with_base_url(api_key, DEFAULT_BASE_URL)
    }

    /// Create a client for a custom endpoint (proxies, test servers).
    pub fn with_base_url(api_key: &str, base_url: &str) -> Result<Self> {
        if api_key.is_empty() {
            return Err(RagError::Config("Gemini API key must not be empty".into()));
        }

        // Url::join drops the last path segment unless the base ends with '/'
        let base_url = if base_url.ends_with('/') {
            base_url.to_string()
        } else {
            format!("{base_url}/")
        };
        let base_url = Url::parse(&base_url)
            .map_err(|e| RagError::Config(format!("invalid Gemini base URL '{base_url}': {e}")))?;

        let api_key = HeaderValue::from_str(api_key)
            .map_err(|_| RagError::Config("Gemini API key is not a valid header value".into()))?;
        let headers = HeaderMap::from_iter([(HeaderName::from_static("x-goog-api-key"), api_key)]);

        let http_client = reqwest::Client::builder()
            .default_headers(headers)
            .connect_timeout(Duration::from_secs(10))
            .build()
            .map_err(|e| RagError::Config(format!("failed to build HTTP client: {e}")))?;

        Ok(Self { http_client, base_url })
    }

    fn model_url(&self, model: &str, method: &str) -> std::result::Result<Url, String> {
        self.base_url
            .join(&format!("models/{model}:{method}"))
            .map_err(|e| format!("failed to build URL: {e}"))
    }

    /// POST `body` to `models/{model}:{method}` and decode the JSON reply.
    ///
    /// Errors are returned as plain messages so each caller can attach its own
    /// error kind.
    async fn post_json<Req: Serialize, Res: DeserializeOwned>(
        &self,
        model: &str,
        method: &str,
        body: &Req,
    ) -> std::result::Result<Res, String> {
        let url = self.model_url(model, method)?;
        let response = self
            .http_client
            .post(url)
            .json(body)
            .send()
            .await
            .map_err(|e| format!("request failed: {e}"))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let detail = serde_json::from_str::<ErrorResponse>(&body)
                .map(|e| e.error.message)
                .unwrap_or(body);
            return Err(format!("API returned {status}: {detail}"));
        }

        response.json().await.map_err(|e| format!("failed to parse response: {e}"))
    }
}

// ── Gemini API request/response types ──────────────────────────────

#[derive(Debug, Serialize, Deserialize, Default)]
struct Content {
    #[serde(skip_serializing_if = "Option::is_none")]
    role: Option<String>,
    #[serde(default)]
    parts: Vec<Part>,
}

impl Content {
    fn text(role: Option<&str>, text: &str) -> Self {
        Self { role: role.map(str::to_string), parts: vec![Part { text: Some(text.to_string()) }] }
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct Part {
    #[serde(skip_serializing_if = "Option::is_none")]
    text: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct EmbedContentRequest {
    model: String,
    content: Content,
    task_type: &'static str,
}

#[derive(Debug, Serialize)]
struct BatchEmbedContentsRequest {
    requests: Vec<EmbedContentRequest>,
}

#[derive(Debug, Deserialize)]
struct ContentEmbedding {
    values: Vec<f32>,
}

#[derive(Debug, Deserialize)]
struct EmbedContentResponse {
    embedding: ContentEmbedding,
}

#[derive(Debug, Deserialize)]
struct BatchEmbedContentsResponse {
    #[serde(default)]
    embeddings: Vec<ContentEmbedding>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentRequest {
    contents: Vec<Content>,
    system_instruction: Content,
}

#[derive(Debug, Deserialize)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    #[serde(default)]
    content: Content,
}

impl GenerateContentResponse {
    /// Concatenated text parts of the first candidate.
    fn text(&self) -> String {
        self.candidates
            .first()
            .map(|c| c.content.parts.iter().filter_map(|p| p.text.as_deref()).collect::<String>())
            .unwrap_or_default()
    }
}

#[derive(Debug, Deserialize)]
struct ErrorResponse {
    error: ErrorDetail,
}

#[derive(Debug, Deserialize)]
struct ErrorDetail {
    message: String,
}

// ── EmbeddingProvider implementation ───────────────────────────────

/// An [`EmbeddingProvider`] backed by the Gemini `embedContent` API.
///
/// Single texts are embedded as queries (`RETRIEVAL_QUERY`); batches are
/// embedded as documents (`RETRIEVAL_DOCUMENT`).
#[derive(Debug, Clone)]
pub struct GeminiEmbeddingProvider {
    client: GeminiClient,
    model: String,
    dimensions: usize,
}

impl GeminiEmbeddingProvider {
    /// Create a provider for `text-embedding-004`.
    pub fn new(client: GeminiClient) -> Self {
        Self {
            client,
            model: DEFAULT_EMBEDDING_MODEL.into(),
            dimensions: DEFAULT_EMBEDDING_DIMENSIONS,
        }
    }

    /// Set the model name (without the `models/` prefix).
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    /// Set the dimensionality the model produces.
    pub fn with_dimensions(mut self, dimensions: usize) -> Self {
        self.dimensions = dimensions;
        self
    }

    fn request(&self, text: &str, task_type: &'static str) -> EmbedContentRequest {
        EmbedContentRequest {
            model: format!("models/{}", self.model),
            content: Content::text(None, text),
            task_type,
        }
    }

    fn map_err(message: String) -> RagError {
        error!(provider = PROVIDER, %message, "embedding request failed");
        RagError::EmbeddingService { provider: PROVIDER.into(), message }
    }
}

#[async_trait]
impl EmbeddingProvider for GeminiEmbeddingProvider {
    #[instrument(skip_all, fields(model = %self.model, text_len = text.len()))]
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let request = self.request(text, "RETRIEVAL_QUERY");
        let response: EmbedContentResponse = self
            .client
            .post_json(&self.model, "embedContent", &request)
            .await
            .map_err(Self::map_err)?;
        Ok(response.embedding.values)
    }

    #[instrument(skip_all, fields(model = %self.model, batch_size = texts.len()))]
    async fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        let mut embeddings = Vec::with_capacity(texts.len());
        for group in texts.chunks(MAX_BATCH_SIZE) {
            let request = BatchEmbedContentsRequest {
                requests: group.iter().map(|t| self.request(t, "RETRIEVAL_DOCUMENT")).collect(),
            };
            let response: BatchEmbedContentsResponse = self
                .client
                .post_json(&self.model, "batchEmbedContents", &request)
                .await
                .map_err(Self::map_err)?;

            if response.embeddings.len() != group.len() {
                return Err(Self::map_err(format!(
                    "expected {} embeddings, got {}",
                    group.len(),
                    response.embeddings.len()
                )));
            }
            embeddings.extend(response.embeddings.into_iter().map(|e| e.values));
            debug!(provider = PROVIDER, done = embeddings.len(), "embedded batch group");
        }

        Ok(embeddings)
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }
}

// ── Generator implementation ───────────────────────────────────────

/// A [`Generator`] backed by the Gemini `generateContent` API.
#[derive(Debug, Clone)]
pub struct GeminiGenerator {
    client: GeminiClient,
    model: String,
}

impl GeminiGenerator {
    /// Create a generator for `gemini-2.0-flash`.
    pub fn new(client: GeminiClient) -> Self {
        Self { client, model: DEFAULT_CHAT_MODEL.into() }
    }

    /// Set the model name (without the `models/` prefix).
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }
}

#[async_trait]
impl Generator for GeminiGenerator {
    #[instrument(skip_all, fields(model = %self.model, query_len = query.len()))]
    async fn generate(&self, query: &str, system_instruction: &str) -> Result<String> {
        let request = GenerateContentRequest {
            contents: vec![Content::text(Some("user"), query)],
            system_instruction: Content::text(None, system_instruction),
        };

        let response: GenerateContentResponse = self
            .client
            .post_json(&self.model, "generateContent", &request)
            .await
            .map_err(|message| {
                error!(provider = PROVIDER, %message, "generation request failed");
                RagError::GenerationService { provider: PROVIDER.into(), message }
            })?;

        Ok(response.text())
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn rejects_empty_api_key() {
        assert!(matches!(GeminiClient::new(""), Err(RagError::Config(_))));
    }

    #[test]
    fn builds_model_urls_under_base_path() {
        let client = GeminiClient::with_base_url("key", "http://localhost:8080/v1beta").unwrap();
        let url = client.model_url("text-embedding-004", "embedContent").unwrap();
        assert_eq!(
            url.as_str(),
            "http://localhost:8080/v1beta/models/text-embedding-004:embedContent"
        );
    }

    #[test]
    fn embed_request_uses_camel_case_and_model_prefix() {
        let client = GeminiClient::new("key").unwrap();
        let provider = GeminiEmbeddingProvider::new(client);
        let value = serde_json::to_value(provider.request("hi", "RETRIEVAL_QUERY")).unwrap();
        assert_eq!(
            value,
            json!({
                "model": "models/text-embedding-004",
                "content": { "parts": [{ "text": "hi" }] },
                "taskType": "RETRIEVAL_QUERY"
            })
        );
    }

    #[test]
    fn generate_request_carries_system_instruction() {
        let request = GenerateContentRequest {
            contents: vec![Content::text(Some("user"), "What is the summary?")],
            system_instruction: Content::text(None, "context: abc"),
        };
        let value = serde_json::to_value(request).unwrap();
        assert_eq!(value["contents"][0]["role"], "user");
        assert_eq!(value["systemInstruction"]["parts"][0]["text"], "context: abc");
    }

    #[test]
    fn parses_generation_text_across_parts() {
        let response: GenerateContentResponse = serde_json::from_value(json!({
            "candidates": [{
                "content": { "role": "model", "parts": [{ "text": "Hello, " }, { "text": "world" }] },
                "finishReason": "STOP"
            }]
        }))
        .unwrap();
        assert_eq!(response.text(), "Hello, world");
    }

    #[test]
    fn blocked_prompt_yields_empty_text() {
        let response: GenerateContentResponse =
            serde_json::from_value(json!({ "promptFeedback": { "blockReason": "SAFETY" } }))
                .unwrap();
        assert_eq!(response.text(), "");
    }

    #[test]
    fn parses_batch_embeddings() {
        let response: BatchEmbedContentsResponse = serde_json::from_value(json!({
            "embeddings": [{ "values": [0.1, 0.2] }, { "values": [0.3, 0.4] }]
        }))
        .unwrap();
        assert_eq!(response.embeddings.len(), 2);
        assert_eq!(response.embeddings[1].values, vec![0.3, 0.4]);
    }

    #[test]
    fn parses_api_error_message() {
        let err: ErrorResponse = serde_json::from_value(json!({
            "error": { "code": 400, "message": "API key not valid", "status": "INVALID_ARGUMENT" }
        }))
        .unwrap();
        assert_eq!(err.error.message, "API key not valid");
    }
}
