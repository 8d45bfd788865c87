//! Gemini embedding and generation providers over the Generative Language REST API.
//!
//! This module is only available when the `gemini` feature is enabled.

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::{debug, error};

use crate::embedding::EmbeddingProvider;
use crate::error::{RagError, Result};
use crate::generation::{GenerationProvider, GenerationRequest};

/// The default API root.
pub const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta/";

/// The default embedding model.
pub const DEFAULT_EMBEDDING_MODEL: &str = "text-embedding-004";

/// The default generation model.
pub const DEFAULT_GENERATION_MODEL: &str = "gemini-2.5-flash";

/// Output dimensionality of `text-embedding-004`.
const DEFAULT_DIMENSIONS: usize = 768;

/// Maximum number of requests accepted by `batchEmbedContents`.
const MAX_BATCH_SIZE: usize = 100;

/// Shared HTTP client for Gemini API calls.
///
/// Authenticates with the `x-goog-api-key` header.
#[derive(Clone)]
pub struct GeminiClient {
    http: reqwest::Client,
    api_key: String,
    base_url: String,
}

impl std::fmt::Debug for GeminiClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GeminiClient").field("base_url", &self.base_url).finish_non_exhaustive()
    }
}

impl GeminiClient {
    /// Create a client for the public Generative Language API.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::ConfigError`] if the API key is empty.
    pub fn new(api_key: impl Into<String>) -> Result<Self> {
        let api_key = api_key.into();
        if api_key.trim().is_empty() {
            return Err(RagError::ConfigError("Gemini API key must not be empty".into()));
        }
        Ok(Self {
            http: reqwest::Client::new(),
            api_key: api_key.trim().to_string(),
            base_url: DEFAULT_BASE_URL.to_string(),
        })
    }

    /// Point the client at a different API root (proxies, tests).
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        let mut base_url = base_url.into();
        if !base_url.ends_with('/') {
            base_url.push('/');
        }
        self.base_url = base_url;
        self
    }

    fn model_url(&self, model: &str, method: &str) -> String {
        format!("{}models/{}:{method}", self.base_url, bare_model(model))
    }

    /// POST a JSON body and decode the JSON response.
    ///
    /// The error string carries the HTTP status and the API's own message so
    /// that callers can tell credential, quota and transport failures apart.
    async fn post_json<Req, Res>(&self, url: &str, body: &Req) -> std::result::Result<Res, String>
    where
        Req: Serialize + ?Sized,
        Res: DeserializeOwned,
    {
        let response = self
            .http
            .post(url)
            .header("x-goog-api-key", &self.api_key)
            .json(body)
            .send()
            .await
            .map_err(|e| format!("request failed: {e}"))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(format!("API returned {status}: {}", error_detail(&body)));
        }

        response.json::<Res>().await.map_err(|e| format!("failed to parse response: {e}"))
    }
}

/// Strip a leading `models/` so both spellings of a model name work.
fn bare_model(model: &str) -> &str {
    model.strip_prefix("models/").unwrap_or(model)
}

/// Pull the human-readable message out of a Gemini error body.
fn error_detail(body: &str) -> String {
    serde_json::from_str::<ErrorResponse>(body).map(|e| e.error.message).unwrap_or_else(|_| {
        if body.is_empty() { "no response body".to_string() } else { body.to_string() }
    })
}

// ── Gemini API request/response types ──────────────────────────────

#[derive(Serialize)]
struct Content<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    role: Option<&'a str>,
    parts: Vec<Part<'a>>,
}

impl<'a> Content<'a> {
    fn text(role: Option<&'a str>, text: &'a str) -> Self {
        Self { role, parts: vec![Part { text }] }
    }
}

#[derive(Serialize)]
struct Part<'a> {
    text: &'a str,
}

/// Embedding task hint sent to the API.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TaskType {
    /// Text used as a search query.
    RetrievalQuery,
    /// Text stored for later retrieval.
    RetrievalDocument,
    /// Symmetric similarity comparisons.
    SemanticSimilarity,
    /// Classification features.
    Classification,
    /// Clustering features.
    Clustering,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct EmbedContentRequest<'a> {
    model: String,
    content: Content<'a>,
    #[serde(skip_serializing_if = "Option::is_none")]
    task_type: Option<TaskType>,
    #[serde(skip_serializing_if = "Option::is_none")]
    output_dimensionality: Option<usize>,
}

#[derive(Serialize)]
struct BatchEmbedContentsRequest<'a> {
    requests: Vec<EmbedContentRequest<'a>>,
}

#[derive(Deserialize)]
struct ContentEmbedding {
    #[serde(default)]
    values: Vec<f32>,
}

#[derive(Deserialize)]
struct EmbedContentResponse {
    embedding: ContentEmbedding,
}

#[derive(Deserialize)]
struct BatchEmbedContentsResponse {
    #[serde(default)]
    embeddings: Vec<ContentEmbedding>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentRequest<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    system_instruction: Option<Content<'a>>,
    contents: Vec<Content<'a>>,
    generation_config: GenerationConfig,
}

#[derive(Serialize)]
struct GenerationConfig {
    temperature: f32,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    prompt_feedback: Option<PromptFeedback>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct Candidate {
    content: Option<CandidateContent>,
    finish_reason: Option<String>,
}

#[derive(Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Deserialize)]
struct ResponsePart {
    text: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct PromptFeedback {
    block_reason: Option<String>,
}

#[derive(Deserialize)]
struct ErrorResponse {
    error: ErrorDetail,
}

#[derive(Deserialize)]
struct ErrorDetail {
    message: String,
}

impl GenerateContentResponse {
    /// Concatenated text of the first candidate.
    fn into_text(self) -> std::result::Result<String, String> {
        let Some(candidate) = self.candidates.into_iter().next() else {
            let reason = self
                .prompt_feedback
                .and_then(|f| f.block_reason)
                .unwrap_or_else(|| "no candidates returned".to_string());
            return Err(format!("prompt blocked: {reason}"));
        };

        let text: String = candidate
            .content
            .map(|c| c.parts.into_iter().filter_map(|p| p.text).collect())
            .unwrap_or_default();

        if text.trim().is_empty() {
            let reason = candidate.finish_reason.unwrap_or_else(|| "unknown".to_string());
            return Err(format!("empty response (finish reason: {reason})"));
        }
        Ok(text)
    }
}

// ── EmbeddingProvider implementation ───────────────────────────────

/// An [`EmbeddingProvider`] backed by the Gemini embedding API.
///
/// # Configuration
///
/// - `model` – defaults to `text-embedding-004` (768 dimensions).
/// - `task_type` – unset by default so single and batch calls embed the same
///   text identically; set with [`GeminiEmbeddingProvider::with_task_type`].
/// - `output_dimensionality` – optional truncation of the output vector.
///
/// # Example
///
/// ```rust,ignore
/// use sage_rag::gemini::GeminiEmbeddingProvider;
///
/// let provider = GeminiEmbeddingProvider::new("your-api-key")?;
/// let embedding = provider.embed("ORA-01555 snapshot too old").await?;
/// ```
#[derive(Debug, Clone)]
pub struct GeminiEmbeddingProvider {
    client: GeminiClient,
    model: String,
    task_type: Option<TaskType>,
    output_dimensionality: Option<usize>,
    dimensions: usize,
}

impl GeminiEmbeddingProvider {
    /// Create a new provider using the given API key and the default model.
    pub fn new(api_key: impl Into<String>) -> Result<Self> {
        Ok(Self::from_client(GeminiClient::new(api_key)?))
    }

    /// Create a new provider from an existing [`GeminiClient`].
    pub fn from_client(client: GeminiClient) -> Self {
        Self {
            client,
            model: DEFAULT_EMBEDDING_MODEL.to_string(),
            task_type: None,
            output_dimensionality: None,
            dimensions: DEFAULT_DIMENSIONS,
        }
    }

    /// Set the model name (with or without the `models/` prefix).
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    /// Set the task type used for embedding requests.
    pub fn with_task_type(mut self, task_type: TaskType) -> Self {
        self.task_type = Some(task_type);
        self
    }

    /// Set the output dimensionality (truncates the embedding vector).
    pub fn with_output_dimensionality(mut self, dims: usize) -> Self {
        self.output_dimensionality = Some(dims);
        self.dimensions = dims;
        self
    }

    fn request<'a>(&self, text: &'a str) -> EmbedContentRequest<'a> {
        EmbedContentRequest {
            model: format!("models/{}", bare_model(&self.model)),
            content: Content::text(None, text),
            task_type: self.task_type,
            output_dimensionality: self.output_dimensionality,
        }
    }

    fn failure(&self, message: String) -> RagError {
        error!(provider = "Gemini", model = %self.model, error = %message, "embedding request failed");
        RagError::EmbeddingError { provider: "Gemini".into(), message }
    }
}

#[async_trait]
impl EmbeddingProvider for GeminiEmbeddingProvider {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        debug!(provider = "Gemini", text_len = text.len(), "embedding single text");

        let url = self.client.model_url(&self.model, "embedContent");
        let response: EmbedContentResponse =
            self.client.post_json(&url, &self.request(text)).await.map_err(|e| self.failure(e))?;

        Ok(response.embedding.values)
    }

    async fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        debug!(provider = "Gemini", batch_size = texts.len(), model = %self.model, "embedding batch");

        let url = self.client.model_url(&self.model, "batchEmbedContents");
        let mut results = Vec::with_capacity(texts.len());
        for batch in texts.chunks(MAX_BATCH_SIZE) {
            let body = BatchEmbedContentsRequest {
                requests: batch.iter().map(|text| self.request(text)).collect(),
            };
            let response: BatchEmbedContentsResponse =
                self.client.post_json(&url, &body).await.map_err(|e| self.failure(e))?;

            if response.embeddings.len() != batch.len() {
                return Err(self.failure(format!(
                    "API returned {} embeddings for {} inputs",
                    response.embeddings.len(),
                    batch.len()
                )));
            }
            results.extend(response.embeddings.into_iter().map(|e| e.values));
        }

        Ok(results)
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }
}

// ── GenerationProvider implementation ──────────────────────────────

/// A [`GenerationProvider`] backed by Gemini `generateContent`.
///
/// The system instruction carries the persona and retrieved context; the
/// question is sent as a single user turn.
///
/// # Example
///
/// ```rust,ignore
/// use sage_rag::gemini::GeminiGenerationProvider;
///
/// let provider = GeminiGenerationProvider::new("your-api-key")?;
/// let text = provider.generate(&request).await?;
/// ```
#[derive(Debug, Clone)]
pub struct GeminiGenerationProvider {
    client: GeminiClient,
    model: String,
}

impl GeminiGenerationProvider {
    /// Create a new provider using the given API key and the default model.
    pub fn new(api_key: impl Into<String>) -> Result<Self> {
        Ok(Self::from_client(GeminiClient::new(api_key)?))
    }

    /// Create a new provider from an existing [`GeminiClient`].
    pub fn from_client(client: GeminiClient) -> Self {
        Self { client, model: DEFAULT_GENERATION_MODEL.to_string() }
    }

    /// Set the model name (with or without the `models/` prefix).
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }
}

#[async_trait]
impl GenerationProvider for GeminiGenerationProvider {
    async fn generate(&self, request: &GenerationRequest) -> Result<String> {
        debug!(
            provider = "Gemini",
            model = %self.model,
            system_len = request.system_instruction.len(),
            temperature = request.temperature,
            "generating answer"
        );

        let body = GenerateContentRequest {
            system_instruction: (!request.system_instruction.is_empty())
                .then(|| Content::text(None, &request.system_instruction)),
            contents: vec![Content::text(Some("user"), &request.user_message)],
            generation_config: GenerationConfig { temperature: request.temperature },
        };

        let url = self.client.model_url(&self.model, "generateContent");
        self.client
            .post_json::<_, GenerateContentResponse>(&url, &body)
            .await
            .and_then(GenerateContentResponse::into_text)
            .map_err(|message| {
                error!(provider = "Gemini", model = %self.model, error = %message, "generation failed");
                RagError::GenerationError { provider: "Gemini".into(), message }
            })
    }

    fn name(&self) -> &str {
        &self.model
    }
}
