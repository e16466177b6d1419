//! Query-time embedding policy
//!
//! Questions must be embedded by the same backend that built the index, so
//! the backend is chosen from the index's `model` label. Indexes written
//! before labels existed are classified by their dimensionality instead.
//! Any backend failure degrades to a character-bucket pseudo-embedding of the
//! index's dimensionality rather than failing the request.
//!
//! Author: hephaex@gmail.com

use crate::embedding::{
    EmbeddingBackend, EmbeddingClient, OllamaEmbedding, OpenAiEmbedding, PseudoEmbedding,
};
use folio_core::{EmbeddingConfig, FolioError, LlmConfig, Result};
use std::sync::Arc;
use tokio::sync::OnceCell;

/// Embeds user questions for retrieval
///
/// Model handles are created on first use and then shared by every request.
/// A process serves one index, so the first label seen fixes the model.
pub struct QueryEmbedder {
    config: EmbeddingConfig,
    api_key: Option<String>,
    base_url: String,
    local: OnceCell<Arc<dyn EmbeddingClient>>,
    remote: OnceCell<Arc<dyn EmbeddingClient>>,
}

impl QueryEmbedder {
    pub fn new(config: EmbeddingConfig, api_key: Option<String>, base_url: impl Into<String>) -> Self {
        Self {
            config,
            api_key: api_key.filter(|k| !k.trim().is_empty()),
            base_url: base_url.into(),
            local: OnceCell::new(),
            remote: OnceCell::new(),
        }
    }

    /// Build from the embedding and chat sections of the app config
    pub fn from_config(embedding: &EmbeddingConfig, llm: &LlmConfig) -> Self {
        Self::new(
            embedding.clone(),
            llm.openai_api_key.clone(),
            llm.openai_base_url.clone(),
        )
    }

    /// Decide which backend should embed queries against an index
    pub fn plan(&self, model_label: &str, dimension: usize) -> EmbeddingBackend {
        if let Some(backend) = EmbeddingBackend::parse(model_label) {
            return backend;
        }

        let small_model = dimension <= self.config.small_model_threshold;
        if self.config.force_local || self.api_key.is_none() || small_model {
            EmbeddingBackend::Local {
                model: self.config.local_model.clone(),
            }
        } else {
            EmbeddingBackend::Remote {
                model: self.config.remote_model.clone(),
            }
        }
    }

    /// Embed a question for an index of the given label and dimensionality
    ///
    /// The result always has `dimension` components or the call fails with
    /// `DimensionMismatch`.
    pub async fn embed_query(
        &self,
        text: &str,
        model_label: &str,
        dimension: usize,
    ) -> Result<Vec<f32>> {
        let backend = self.plan(model_label, dimension);
        tracing::debug!("Embedding query with {}", backend);

        let vector = match self.embed_with(&backend, text).await {
            Ok(vector) => vector,
            Err(e) => {
                tracing::warn!(
                    "Query embedding with {} failed, using pseudo-embedding: {}",
                    backend,
                    e
                );
                PseudoEmbedding::characters(dimension).embed_text(text)
            }
        };

        if vector.len() != dimension {
            return Err(FolioError::DimensionMismatch {
                expected: dimension,
                actual: vector.len(),
            });
        }

        Ok(vector)
    }

    async fn embed_with(&self, backend: &EmbeddingBackend, text: &str) -> Result<Vec<f32>> {
        match backend {
            EmbeddingBackend::Pseudo { dimension } => {
                Ok(PseudoEmbedding::tokens(*dimension).embed_text(text))
            }
            EmbeddingBackend::Local { model } => {
                let client = self
                    .local
                    .get_or_try_init(|| async {
                        let client = OllamaEmbedding::from_config(&self.config, Some(model))?;
                        Ok::<_, FolioError>(Arc::new(client) as Arc<dyn EmbeddingClient>)
                    })
                    .await?;
                client.embed(text).await
            }
            EmbeddingBackend::Remote { model } => {
                let client = self
                    .remote
                    .get_or_try_init(|| async {
                        let client = OpenAiEmbedding::from_config(
                            &self.config,
                            self.api_key.as_deref(),
                            &self.base_url,
                            Some(model),
                        )?;
                        Ok::<_, FolioError>(Arc::new(client) as Arc<dyn EmbeddingClient>)
                    })
                    .await?;
                client.embed(text).await
            }
        }
    }
}
