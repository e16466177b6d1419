//! Embedding clients for generating vector representations
//!
//! Supports the OpenAI embedding API (remote), Ollama (local model) and a
//! deterministic hashed pseudo-embedding used when no model is reachable.
//!
//! Author: hephaex@gmail.com

use crate::similarity::normalize;
use async_trait::async_trait;
use folio_core::{EmbeddingConfig, FolioError, Result};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

// ============================================================================
// Backend Labels
// ============================================================================

/// Which backend produced a set of vectors
///
/// The label is persisted as the index's `model` field so the query path can
/// embed questions with the same backend that embedded the corpus.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EmbeddingBackend {
    /// Remote OpenAI-compatible embedding API
    Remote { model: String },
    /// Local model served by Ollama
    Local { model: String },
    /// Hashed token buckets
    Pseudo { dimension: usize },
}

impl EmbeddingBackend {
    /// Persisted label, e.g. `ollama/all-minilm`
    pub fn label(&self) -> String {
        match self {
            Self::Remote { model } => format!("openai/{model}"),
            Self::Local { model } => format!("ollama/{model}"),
            Self::Pseudo { dimension } => format!("pseudo/{dimension}"),
        }
    }

    /// Parse a persisted label; unlabelled legacy model names yield `None`
    pub fn parse(label: &str) -> Option<Self> {
        let (kind, rest) = label.split_once('/')?;
        if rest.is_empty() {
            return None;
        }
        match kind {
            "openai" => Some(Self::Remote {
                model: rest.to_string(),
            }),
            "ollama" => Some(Self::Local {
                model: rest.to_string(),
            }),
            "pseudo" => rest
                .parse()
                .ok()
                .filter(|d| *d > 0)
                .map(|dimension| Self::Pseudo { dimension }),
            _ => None,
        }
    }
}

impl fmt::Display for EmbeddingBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.label())
    }
}

// ============================================================================
// Embedding Trait
// ============================================================================

/// Trait for embedding generation
#[async_trait]
pub trait EmbeddingClient: Send + Sync {
    /// Generate embedding for a single text
    async fn embed(&self, text: &str) -> Result<Vec<f32>>;

    /// Generate embeddings for multiple texts (batch)
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>>;

    /// Expected embedding dimension
    fn dimension(&self) -> usize;

    /// Backend identity, persisted with the vectors it produces
    fn backend(&self) -> EmbeddingBackend;
}

fn http_client(timeout_secs: u64) -> Result<Client> {
    Client::builder()
        .timeout(Duration::from_secs(timeout_secs))
        .build()
        .map_err(|e| FolioError::ConfigError(format!("Failed to build HTTP client: {e}")))
}

// ============================================================================
// OpenAI Embedding Client
// ============================================================================

/// OpenAI embedding API client
pub struct OpenAiEmbedding {
    client: Client,
    api_key: String,
    base_url: String,
    model: String,
    dimension: usize,
}

#[derive(Debug, Serialize)]
struct OpenAiEmbeddingRequest<'a> {
    input: &'a [String],
    model: &'a str,
}

#[derive(Debug, Deserialize)]
struct OpenAiEmbeddingResponse {
    data: Vec<EmbeddingData>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingData {
    embedding: Vec<f32>,
    index: usize,
}

impl OpenAiEmbedding {
    /// Create a new OpenAI embedding client
    pub fn new(api_key: impl Into<String>, model: impl Into<String>) -> Self {
        let model = model.into();
        let dimension = match model.as_str() {
            "text-embedding-3-small" => 1536,
            "text-embedding-3-large" => 3072,
            "text-embedding-ada-002" => 1536,
            _ => 1536, // Default
        };

        Self {
            client: Client::new(),
            api_key: api_key.into(),
            base_url: "https://api.openai.com/v1".to_string(),
            model,
            dimension,
        }
    }

    /// Create from config, using `model` instead of the configured one when given
    pub fn from_config(
        config: &EmbeddingConfig,
        api_key: Option<&str>,
        base_url: &str,
        model: Option<&str>,
    ) -> Result<Self> {
        let api_key = api_key
            .ok_or_else(|| FolioError::ConfigError("OpenAI API key required".to_string()))?;
        let model = model.unwrap_or(&config.remote_model);

        Ok(Self {
            client: http_client(config.timeout_secs)?,
            ..Self::new(api_key, model).with_base_url(base_url)
        })
    }

    /// Set custom base URL (for compatible APIs)
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into().trim_end_matches('/').to_string();
        self
    }
}

#[async_trait]
impl EmbeddingClient for OpenAiEmbedding {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let results = self.embed_batch(&[text.to_string()]).await?;
        results
            .into_iter()
            .next()
            .ok_or_else(|| FolioError::EmbeddingError("No embedding returned".to_string()))
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        let request = OpenAiEmbeddingRequest {
            input: texts,
            model: &self.model,
        };

        let response = self
            .client
            .post(format!("{}/embeddings", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| FolioError::EmbeddingError(format!("Embedding request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(FolioError::EmbeddingError(format!(
                "OpenAI embedding error ({status}): {error_text}"
            )));
        }

        let result: OpenAiEmbeddingResponse = response.json().await.map_err(|e| {
            FolioError::EmbeddingError(format!("Failed to parse embedding response: {e}"))
        })?;

        if result.data.len() != texts.len() {
            return Err(FolioError::EmbeddingError(format!(
                "Expected {} embeddings, got {}",
                texts.len(),
                result.data.len()
            )));
        }

        // Sort by index and extract embeddings
        let mut embeddings = result.data;
        embeddings.sort_by_key(|e| e.index);

        Ok(embeddings.into_iter().map(|e| e.embedding).collect())
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    fn backend(&self) -> EmbeddingBackend {
        EmbeddingBackend::Remote {
            model: self.model.clone(),
        }
    }
}

// ============================================================================
// Ollama Embedding Client
// ============================================================================

/// Local embedding model served by Ollama
///
/// Vectors are mean-pooled by the server and L2-normalised here.
pub struct OllamaEmbedding {
    client: Client,
    base_url: String,
    model: String,
    dimension: usize,
}

#[derive(Debug, Serialize)]
struct OllamaEmbeddingRequest<'a> {
    model: &'a str,
    prompt: &'a str,
}

#[derive(Debug, Deserialize)]
struct OllamaEmbeddingResponse {
    embedding: Vec<f32>,
}

impl OllamaEmbedding {
    /// Create a new Ollama embedding client
    pub fn new(base_url: impl Into<String>, model: impl Into<String>) -> Self {
        let model = model.into();
        let dimension = match model.as_str() {
            "nomic-embed-text" => 768,
            "mxbai-embed-large" => 1024,
            "all-minilm" => 384,
            _ => 768, // Default for most models
        };

        Self {
            client: Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            model,
            dimension,
        }
    }

    /// Create from config, using `model` instead of the configured one when given
    pub fn from_config(config: &EmbeddingConfig, model: Option<&str>) -> Result<Self> {
        let model = model.unwrap_or(&config.local_model);
        Ok(Self {
            client: http_client(config.timeout_secs)?,
            ..Self::new(config.ollama_url.clone(), model)
        })
    }
}

#[async_trait]
impl EmbeddingClient for OllamaEmbedding {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let request = OllamaEmbeddingRequest {
            model: &self.model,
            prompt: text,
        };

        let response = self
            .client
            .post(format!("{}/api/embeddings", self.base_url))
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                FolioError::EmbeddingError(format!("Ollama embedding request failed: {e}"))
            })?;

        if !response.status().is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(FolioError::EmbeddingError(format!(
                "Ollama embedding error: {error_text}"
            )));
        }

        let result: OllamaEmbeddingResponse = response.json().await.map_err(|e| {
            FolioError::EmbeddingError(format!("Failed to parse embedding response: {e}"))
        })?;

        if result.embedding.is_empty() {
            return Err(FolioError::EmbeddingError(format!(
                "Ollama returned an empty embedding for {}",
                self.model
            )));
        }

        Ok(normalize(result.embedding))
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        // Ollama doesn't have native batch embedding, so we process sequentially
        let mut results = Vec::with_capacity(texts.len());
        for text in texts {
            results.push(self.embed(text).await?);
        }
        Ok(results)
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    fn backend(&self) -> EmbeddingBackend {
        EmbeddingBackend::Local {
            model: self.model.clone(),
        }
    }
}

// ============================================================================
// Pseudo Embeddings
// ============================================================================

/// How text is hashed into buckets
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HashStrategy {
    /// Lowercase alphanumeric tokens, each hashed to one bucket (indexing)
    Tokens,
    /// Every character's code point added to bucket `position % dimension`
    /// (query fallback)
    Characters,
}

/// Deterministic, model-free embedding
///
/// Retrieval quality is poor, but it never fails and always yields a unit
/// vector for non-empty input.
#[derive(Debug, Clone)]
pub struct PseudoEmbedding {
    dimension: usize,
    strategy: HashStrategy,
}

impl PseudoEmbedding {
    pub fn new(dimension: usize, strategy: HashStrategy) -> Self {
        Self {
            dimension: dimension.max(1),
            strategy,
        }
    }

    pub fn tokens(dimension: usize) -> Self {
        Self::new(dimension, HashStrategy::Tokens)
    }

    pub fn characters(dimension: usize) -> Self {
        Self::new(dimension, HashStrategy::Characters)
    }

    /// Embed one text synchronously
    pub fn embed_text(&self, text: &str) -> Vec<f32> {
        let mut vector = match self.strategy {
            HashStrategy::Tokens => self.token_buckets(text),
            HashStrategy::Characters => self.character_buckets(text),
        };

        // Text made only of punctuation has no tokens
        if self.strategy == HashStrategy::Tokens && vector.iter().all(|v| *v == 0.0) {
            vector = self.character_buckets(text);
        }

        normalize(vector)
    }

    fn token_buckets(&self, text: &str) -> Vec<f32> {
        let mut vector = vec![0.0f32; self.dimension];
        let cleaned: String = text
            .to_lowercase()
            .chars()
            .map(|c| {
                if c.is_ascii_alphanumeric() || c.is_whitespace() {
                    c
                } else {
                    ' '
                }
            })
            .collect();

        for token in cleaned.split_whitespace() {
            let bucket = hash_token(token) as usize % self.dimension;
            vector[bucket] += 1.0;
        }
        vector
    }

    fn character_buckets(&self, text: &str) -> Vec<f32> {
        let mut vector = vec![0.0f32; self.dimension];
        for (position, c) in text.chars().enumerate() {
            vector[position % self.dimension] += c as u32 as f32;
        }
        vector
    }
}

/// 32-bit `h * 31 + c` string hash, absolute value
fn hash_token(token: &str) -> u32 {
    let hash = token.chars().fold(0i32, |hash, c| {
        hash.wrapping_shl(5)
            .wrapping_sub(hash)
            .wrapping_add(c as u32 as i32)
    });
    hash.unsigned_abs()
}

#[async_trait]
impl EmbeddingClient for PseudoEmbedding {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        Ok(self.embed_text(text))
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        Ok(texts.iter().map(|t| self.embed_text(t)).collect())
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    fn backend(&self) -> EmbeddingBackend {
        EmbeddingBackend::Pseudo {
            dimension: self.dimension,
        }
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn norm(v: &[f32]) -> f32 {
        v.iter().map(|x| x * x).sum::<f32>().sqrt()
    }

    #[test]
    fn test_openai_dimension() {
        let client = OpenAiEmbedding::new("test-key", "text-embedding-3-small");
        assert_eq!(client.dimension(), 1536);

        let client = OpenAiEmbedding::new("test-key", "text-embedding-3-large");
        assert_eq!(client.dimension(), 3072);
    }

    #[test]
    fn test_ollama_dimension() {
        let client = OllamaEmbedding::new("http://localhost:11434", "all-minilm");
        assert_eq!(client.dimension(), 384);

        let client = OllamaEmbedding::new("http://localhost:11434", "nomic-embed-text");
        assert_eq!(client.dimension(), 768);
    }

    #[test]
    fn test_backend_labels() {
        let backends = [
            EmbeddingBackend::Remote {
                model: "text-embedding-3-small".into(),
            },
            EmbeddingBackend::Local {
                model: "all-minilm".into(),
            },
            EmbeddingBackend::Pseudo { dimension: 384 },
        ];
        for backend in backends {
            assert_eq!(EmbeddingBackend::parse(&backend.label()), Some(backend));
        }
    }

    #[test]
    fn test_legacy_labels_are_unknown() {
        assert_eq!(EmbeddingBackend::parse("Xenova/all-MiniLM-L6-v2"), None);
        assert_eq!(EmbeddingBackend::parse("text-embedding-3-small"), None);
        assert_eq!(EmbeddingBackend::parse("pseudo/zero"), None);
        assert_eq!(EmbeddingBackend::parse("pseudo/0"), None);
        assert_eq!(EmbeddingBackend::parse("ollama/"), None);
    }

    #[test]
    fn test_token_hash_matches_reference_values() {
        assert_eq!(hash_token("a"), 97);
        assert_eq!(hash_token("ab"), 97 * 31 + 98);
        assert_eq!(hash_token(""), 0);
    }

    #[test]
    fn test_pseudo_tokens_ignore_case_and_punctuation() {
        let embedder = PseudoEmbedding::tokens(64);
        assert_eq!(
            embedder.embed_text("Rust, Projects!"),
            embedder.embed_text("rust projects")
        );
    }

    #[test]
    fn test_pseudo_characters_are_positional() {
        let embedder = PseudoEmbedding::characters(4);
        let v = embedder.embed_text("ab");
        let expected = normalize(vec![97.0, 98.0, 0.0, 0.0]);
        assert_eq!(v, expected);
    }

    #[test]
    fn test_pseudo_punctuation_only_still_unit() {
        let v = PseudoEmbedding::tokens(32).embed_text("?!");
        assert!((norm(&v) - 1.0).abs() < 1e-4);
    }

    #[test]
    fn test_pseudo_empty_text_is_zero() {
        let v = PseudoEmbedding::characters(8).embed_text("");
        assert!(v.iter().all(|x| *x == 0.0));
    }

    proptest! {
        #[test]
        fn prop_pseudo_embeddings_are_unit_vectors(
            text in "\\PC{1,200}",
            dim in 1usize..512,
        ) {
            for embedder in [PseudoEmbedding::tokens(dim), PseudoEmbedding::characters(dim)] {
                let v = embedder.embed_text(&text);
                prop_assert_eq!(v.len(), dim);
                prop_assert!((norm(&v) - 1.0).abs() < 1e-3);
            }
        }
    }

    #[tokio::test]
    async fn test_openai_batch_sorted_by_index() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/embeddings"))
            .and(header("authorization", "Bearer sk-test"))
            .and(body_partial_json(serde_json::json!({"model": "text-embedding-3-small"})))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "data": [
                    {"embedding": [0.0, 1.0], "index": 1},
                    {"embedding": [1.0, 0.0], "index": 0}
                ]
            })))
            .mount(&server)
            .await;

        let client = OpenAiEmbedding::new("sk-test", "text-embedding-3-small")
            .with_base_url(format!("{}/v1/", server.uri()));
        let vectors = client
            .embed_batch(&["first".to_string(), "second".to_string()])
            .await
            .unwrap();

        assert_eq!(vectors, vec![vec![1.0, 0.0], vec![0.0, 1.0]]);
    }

    #[tokio::test]
    async fn test_openai_error_status() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/embeddings"))
            .respond_with(ResponseTemplate::new(429).set_body_string("insufficient_quota"))
            .mount(&server)
            .await;

        let client = OpenAiEmbedding::new("sk-test", "text-embedding-3-small")
            .with_base_url(server.uri());
        let err = client.embed("hello").await.unwrap_err();

        assert!(matches!(err, FolioError::EmbeddingError(ref m) if m.contains("insufficient_quota")));
    }

    #[tokio::test]
    async fn test_ollama_embedding_is_normalised() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/embeddings"))
            .and(body_partial_json(serde_json::json!({"model": "all-minilm", "prompt": "hi"})))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(serde_json::json!({"embedding": [3.0, 4.0]})),
            )
            .mount(&server)
            .await;

        let client = OllamaEmbedding::new(server.uri(), "all-minilm");
        let v = client.embed("hi").await.unwrap();

        assert!((v[0] - 0.6).abs() < 1e-6);
        assert!((v[1] - 0.8).abs() < 1e-6);
    }

    #[test]
    fn test_remote_requires_api_key() {
        let config = EmbeddingConfig::default();
        let result = OpenAiEmbedding::from_config(&config, None, "https://api.openai.com/v1", None);
        assert!(matches!(result, Err(FolioError::ConfigError(_))));
    }
}
