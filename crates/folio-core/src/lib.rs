//! Folio Core - Domain models, traits, and shared types
//!
//! This crate defines the core abstractions used throughout Folio:
//! - Corpus models (documents, chunks, the persisted vector index)
//! - Conversation models (chat messages, completions, token usage)
//! - Common error types
//! - Shared traits for retrieval backends and chat-completion clients
//! - Configuration management

pub mod config;

pub use config::{
    AppConfig, ConfigError, EmbeddingConfig, LlmConfig, LoggingConfig, PersonaConfig, RagConfig,
    ServerConfig,
};

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use thiserror::Error;

// ============================================================================
// Error Types
// ============================================================================

/// Core error types for Folio operations
#[derive(Error, Debug)]
pub enum FolioError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Vector index error: {0}")]
    IndexError(String),

    #[error("Embedding dimension mismatch: index has {expected}, query has {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    #[error("Embedding error: {0}")]
    EmbeddingError(String),

    #[error("LLM error: {0}")]
    LlmError(String),

    #[error("All chat models failed: {0}")]
    ModelsExhausted(String),

    #[error("Model {model} did not respond within {seconds}s")]
    Timeout { model: String, seconds: u64 },

    #[error("IO error on {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub type Result<T> = std::result::Result<T, FolioError>;

/// Failure of a single chat-completion call against one model
#[derive(Error, Debug, Clone, PartialEq)]
pub enum CompletionError {
    /// The API answered with a non-success status
    #[error("API error ({status}): {message}")]
    Api {
        status: u16,
        code: Option<String>,
        message: String,
    },

    /// The request never produced an HTTP response
    #[error("Transport error: {0}")]
    Transport(String),

    /// The response body could not be decoded
    #[error("Malformed response: {0}")]
    Decode(String),
}

static RATE_LIMIT_CODE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)rate[_-]?limit").expect("valid rate limit code pattern"));
static RATE_LIMIT_MESSAGE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)rate limit").expect("valid rate limit message pattern"));

impl CompletionError {
    /// Whether the failure means "this model is throttled, try another one"
    pub fn is_rate_limited(&self) -> bool {
        match self {
            Self::Api {
                status,
                code,
                message,
            } => {
                *status == 429
                    || code
                        .as_deref()
                        .map(|c| RATE_LIMIT_CODE.is_match(c))
                        .unwrap_or(false)
                    || RATE_LIMIT_MESSAGE.is_match(message)
            }
            Self::Transport(message) | Self::Decode(message) => {
                RATE_LIMIT_MESSAGE.is_match(message)
            }
        }
    }
}

// ============================================================================
// Corpus Models
// ============================================================================

/// A named source text, e.g. one markdown file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Document {
    /// Path of the document relative to the working directory
    pub source: String,

    /// Raw content
    pub text: String,
}

impl Document {
    pub fn new(source: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            text: text.into(),
        }
    }
}

/// An embedded chunk of a document, as stored in the vector index
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Chunk {
    /// `<source>:<index>`
    pub id: String,

    /// Source document path
    pub source: String,

    /// Trimmed chunk text
    pub text: String,

    /// Embedding vector
    pub embedding: Vec<f32>,
}

impl Chunk {
    /// Derive the stable chunk identifier from its document and position
    pub fn make_id(source: &str, index: usize) -> String {
        format!("{source}:{index}")
    }
}

/// The persisted vector index consumed by the online retriever
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VectorIndex {
    /// Label of the embedding backend that produced every vector
    pub model: String,

    /// Embedded chunks in insertion order
    pub items: Vec<Chunk>,
}

impl VectorIndex {
    /// Dimensionality of the stored vectors (taken from the first item)
    pub fn dimension(&self) -> Option<usize> {
        self.items.first().map(|c| c.embedding.len())
    }
}

/// A chunk ranked against a query
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScoredChunk {
    pub chunk: Chunk,
    pub score: f32,
}

// ============================================================================
// Conversation Models
// ============================================================================

/// Author of a chat message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

impl Role {
    /// Parse a caller-supplied role; only conversation roles are accepted
    pub fn from_conversation(role: &str) -> Option<Self> {
        match role {
            "user" => Some(Self::User),
            "assistant" => Some(Self::Assistant),
            _ => None,
        }
    }
}

/// A single chat message
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }
}

/// Token accounting reported by the chat-completion API
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenUsage {
    pub prompt: u32,
    pub completion: u32,
    pub total: u32,
}

/// Request for one chat completion against one model
#[derive(Debug, Clone, PartialEq)]
pub struct CompletionRequest {
    pub model: String,
    pub messages: Vec<ChatMessage>,
    pub temperature: f32,
    pub max_tokens: Option<u32>,
}

/// Result of a successful chat completion
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Completion {
    /// Content of the first choice, if any
    pub content: Option<String>,
    pub usage: TokenUsage,
}

/// Final answer returned to a chat caller
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChatAnswer {
    pub reply: String,
    pub model: String,
    pub usage: TokenUsage,
}

// ============================================================================
// Traits
// ============================================================================

/// Trait for retrieval backends
#[async_trait::async_trait]
pub trait SearchBackend: Send + Sync {
    /// Return up to `limit` chunks ranked by relevance to `query`
    async fn search(&self, query: &str, limit: usize) -> Result<Vec<ScoredChunk>>;

    /// Get backend name for logging
    fn name(&self) -> &str;
}

/// Trait for chat-completion clients
#[async_trait::async_trait]
pub trait LlmClient: Send + Sync {
    /// Run one completion; failures keep enough detail to classify rate limits
    async fn complete(
        &self,
        request: &CompletionRequest,
    ) -> std::result::Result<Completion, CompletionError>;
}

// ============================================================================
// Tests
// ============================================================================
