//! Folio Configuration Management
//!
//! Handles configuration from environment variables and TOML config files
//! with sensible defaults for local development.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::str::FromStr;

/// Main application configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct AppConfig {
    /// Server configuration
    pub server: ServerConfig,

    /// Chat-completion configuration
    pub llm: LlmConfig,

    /// Embedding backends
    pub embedding: EmbeddingConfig,

    /// RAG pipeline configuration
    pub rag: RagConfig,

    /// Who the assistant talks about
    pub persona: PersonaConfig,

    /// Logging configuration
    pub logging: LoggingConfig,
}

impl AppConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut config = Self::default();
        config.apply_env(|key| std::env::var(key).ok())?;
        Ok(config)
    }

    /// Load from a TOML file
    pub fn from_file(path: impl Into<PathBuf>) -> Result<Self, ConfigError> {
        let path = path.into();
        let content = std::fs::read_to_string(&path).map_err(|e| ConfigError::FileReadError {
            path: path.clone(),
            source: e,
        })?;

        toml::from_str(&content).map_err(|e| ConfigError::ParseError {
            path,
            message: e.to_string(),
        })
    }

    /// Merge with environment variables (env takes precedence)
    pub fn with_env_override(mut self) -> Result<Self, ConfigError> {
        self.apply_env(|key| std::env::var(key).ok())?;
        Ok(self)
    }

    /// Apply every recognised variable found by `lookup`
    fn apply_env<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        // Server
        if let Some(host) = lookup("API_HOST") {
            self.server.host = host;
        }
        if let Some(port) = lookup("API_PORT") {
            self.server.port = parse_value("API_PORT", port)?;
        }
        if let Some(enabled) = lookup("CORS_ENABLED") {
            self.server.cors_enabled = parse_flag(&enabled);
        }
        if let Some(dir) = lookup("PHOTOGRAPHY_DIR") {
            self.server.photography_dir = PathBuf::from(dir);
        }

        // Chat completion
        if let Some(key) = lookup("OPENAI_API_KEY").filter(|k| !k.trim().is_empty()) {
            self.llm.openai_api_key = Some(key);
        }
        if let Some(url) = lookup("OPENAI_BASE_URL").filter(|u| !u.trim().is_empty()) {
            self.llm.openai_base_url = url;
        }
        if let Some(models) = lookup("CHAT_MODELS") {
            self.llm.models = models
                .split(',')
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect();
        }
        if let Some(temperature) = lookup("CHAT_TEMPERATURE") {
            self.llm.temperature = parse_value("CHAT_TEMPERATURE", temperature)?;
        }
        if let Some(timeout) = lookup("CHAT_TIMEOUT_SECS") {
            self.llm.timeout_secs = parse_value("CHAT_TIMEOUT_SECS", timeout)?;
        }

        // Embeddings
        if let Some(model) = lookup("EMBEDDING_MODEL") {
            self.embedding.remote_model = model;
        }
        if let Some(model) = lookup("LOCAL_EMBEDDING_MODEL") {
            self.embedding.local_model = model;
        }
        if let Some(url) = lookup("OLLAMA_URL") {
            self.embedding.ollama_url = url;
        }
        if let Some(flag) = lookup("USE_LOCAL_EMBEDDINGS") {
            self.embedding.force_local = parse_flag(&flag);
        }
        if let Some(flag) = lookup("USE_OPENAI_EMBEDDINGS") {
            self.embedding.remote_for_index = parse_flag(&flag);
        }
        if let Some(dim) = lookup("PSEUDO_EMBEDDING_DIM") {
            self.embedding.pseudo_dimension = parse_value("PSEUDO_EMBEDDING_DIM", dim)?;
        }
        if let Some(size) = lookup("BATCH_SIZE") {
            self.embedding.batch_size = parse_value("BATCH_SIZE", size)?;
        }

        // RAG
        if let Some(path) = lookup("RAG_INDEX_PATH") {
            self.rag.index_path = PathBuf::from(path);
        }
        if let Some(dir) = lookup("RAG_DOCS_DIR") {
            self.rag.docs_dir = PathBuf::from(dir);
        }
        if let Some(k) = lookup("RAG_TOP_K") {
            self.rag.top_k = parse_value("RAG_TOP_K", k)?;
        }
        if let Some(n) = lookup("MAX_HISTORY") {
            self.rag.max_history = parse_value("MAX_HISTORY", n)?;
        }

        // Persona
        if let Some(name) = lookup("PERSONA_NAME") {
            self.persona.name = name;
        }
        if let Some(pronouns) = lookup("PERSONA_PRONOUNS") {
            self.persona.pronouns = pronouns;
        }

        // Logging
        if let Some(level) = lookup("LOG_LEVEL") {
            self.logging.level = level;
        }
        if let Some(format) = lookup("LOG_FORMAT") {
            self.logging.json_format = format.eq_ignore_ascii_case("json");
        }

        Ok(())
    }

    /// Reject settings that would make the pipeline misbehave
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.rag.chunk_size == 0 {
            return Err(ConfigError::InvalidValue {
                key: "rag.chunk_size".to_string(),
                value: "0".to_string(),
            });
        }
        if self.rag.chunk_overlap >= self.rag.chunk_size {
            return Err(ConfigError::InvalidValue {
                key: "rag.chunk_overlap".to_string(),
                value: format!(
                    "{} (must be smaller than chunk_size {})",
                    self.rag.chunk_overlap, self.rag.chunk_size
                ),
            });
        }
        if self.rag.top_k == 0 {
            return Err(ConfigError::InvalidValue {
                key: "rag.top_k".to_string(),
                value: "0".to_string(),
            });
        }
        if self.embedding.batch_size == 0 {
            return Err(ConfigError::InvalidValue {
                key: "embedding.batch_size".to_string(),
                value: "0".to_string(),
            });
        }
        if self.embedding.pseudo_dimension == 0 {
            return Err(ConfigError::InvalidValue {
                key: "embedding.pseudo_dimension".to_string(),
                value: "0".to_string(),
            });
        }
        if self.rag.max_history == 0 {
            return Err(ConfigError::InvalidValue {
                key: "rag.max_history".to_string(),
                value: "0 (the latest question would be dropped)".to_string(),
            });
        }
        if self.llm.timeout_secs == 0 {
            return Err(ConfigError::InvalidValue {
                key: "llm.timeout_secs".to_string(),
                value: "0".to_string(),
            });
        }
        if self.llm.models.is_empty() {
            return Err(ConfigError::MissingRequired("llm.models".to_string()));
        }
        Ok(())
    }
}

fn parse_value<T: FromStr>(key: &str, value: String) -> Result<T, ConfigError> {
    value.trim().parse().map_err(|_| ConfigError::InvalidValue {
        key: key.to_string(),
        value,
    })
}

fn parse_flag(value: &str) -> bool {
    matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}

/// Server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Host to bind to
    pub host: String,

    /// Port to listen on
    pub port: u16,

    /// Maximum request body size in bytes
    pub max_body_size: usize,

    /// Enable CORS
    pub cors_enabled: bool,

    /// Directory scanned by the photography listing
    pub photography_dir: PathBuf,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
            max_body_size: 1024 * 1024, // 1MB
            cors_enabled: true,
            photography_dir: PathBuf::from("public/photography"),
        }
    }
}

/// Chat-completion configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    /// OpenAI API key
    pub openai_api_key: Option<String>,

    /// OpenAI-compatible API base URL
    pub openai_base_url: String,

    /// Models to try, in order
    pub models: Vec<String>,

    /// Temperature for generation
    pub temperature: f32,

    /// Maximum tokens for completion
    pub max_tokens: Option<u32>,

    /// Deadline for a single completion call, in seconds
    pub timeout_secs: u64,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            openai_api_key: None,
            openai_base_url: "https://api.openai.com/v1".to_string(),
            models: vec![
                "gpt-4o-mini".to_string(),
                "gpt-4o".to_string(),
                "gpt-3.5-turbo".to_string(),
            ],
            temperature: 0.4,
            max_tokens: None,
            timeout_secs: 60,
        }
    }
}

/// Embedding backend configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EmbeddingConfig {
    /// Remote (OpenAI) embedding model
    pub remote_model: String,

    /// Local (Ollama) embedding model
    pub local_model: String,

    /// Ollama server URL
    pub ollama_url: String,

    /// Always embed queries locally
    pub force_local: bool,

    /// Use the remote API when building the index
    pub remote_for_index: bool,

    /// Dimensionality of pseudo-embeddings when nothing else decides it
    pub pseudo_dimension: usize,

    /// Texts per embedding request when indexing
    pub batch_size: usize,

    /// Indexes at or below this dimensionality are treated as local-model indexes
    pub small_model_threshold: usize,

    /// Request timeout for embedding calls, in seconds
    pub timeout_secs: u64,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            remote_model: "text-embedding-3-small".to_string(),
            local_model: "all-minilm".to_string(),
            ollama_url: "http://localhost:11434".to_string(),
            force_local: false,
            remote_for_index: false,
            pseudo_dimension: 384,
            batch_size: 16,
            small_model_threshold: 512,
            timeout_secs: 30,
        }
    }
}

/// RAG pipeline configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RagConfig {
    /// Persisted vector index
    pub index_path: PathBuf,

    /// Markdown corpus scanned by the indexer
    pub docs_dir: PathBuf,

    /// Chunk size in characters
    pub chunk_size: usize,

    /// Chunk overlap in characters
    pub chunk_overlap: usize,

    /// Chunks retrieved per question
    pub top_k: usize,

    /// Conversation messages kept in the prompt
    pub max_history: usize,
}

impl Default for RagConfig {
    fn default() -> Self {
        Self {
            index_path: PathBuf::from("data/rag/embeddings.json"),
            docs_dir: PathBuf::from("data/rag"),
            chunk_size: 800,
            chunk_overlap: 200,
            top_k: 3,
            max_history: 6,
        }
    }
}

/// The person the assistant answers about
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PersonaConfig {
    /// Display name used in prompts
    pub name: String,

    /// Pronouns used for third-person narration, e.g. "she/her"
    pub pronouns: String,
}

impl Default for PersonaConfig {
    fn default() -> Self {
        Self {
            name: "the site owner".to_string(),
            pronouns: "they/them".to_string(),
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    pub level: String,

    /// JSON format for logs
    pub json_format: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json_format: false,
        }
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    FileReadError {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config file {path}: {message}")]
    ParseError { path: PathBuf, message: String },

    #[error("Invalid value for {key}: {value}")]
    InvalidValue { key: String, value: String },

    #[error("Missing required configuration: {0}")]
    MissingRequired(String),
}

impl From<ConfigError> for crate::FolioError {
    fn from(err: ConfigError) -> Self {
        crate::FolioError::ConfigError(err.to_string())
    }
}
