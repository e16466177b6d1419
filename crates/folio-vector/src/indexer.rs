//! Offline index builder
//!
//! Chunks the markdown corpus, embeds every chunk and writes the JSON index.
//! Backends are tried in order. When one fails the whole corpus is embedded
//! again with the next, so every vector in an index comes from the backend
//! its `model` label names.
//!
//! Author: hephaex@gmail.com

use crate::embedding::{EmbeddingClient, OllamaEmbedding, OpenAiEmbedding, PseudoEmbedding};
use crate::store::write_index;
use folio_core::{AppConfig, Chunk, Document, FolioError, Result, VectorIndex};
use folio_parser::{chunk_text, load_markdown_documents, ChunkConfig};
use std::path::{Path, PathBuf};

/// A chunk awaiting its embedding
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingChunk {
    pub id: String,
    pub source: String,
    pub text: String,
}

/// Outcome of an indexing run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexReport {
    pub documents: usize,
    pub chunks: usize,
    pub model: String,
    pub path: PathBuf,
}

/// Builds a vector index with an ordered chain of embedding backends
pub struct IndexBuilder {
    backends: Vec<Box<dyn EmbeddingClient>>,
    chunking: ChunkConfig,
    batch_size: usize,
}

impl IndexBuilder {
    pub fn new(chunking: ChunkConfig, batch_size: usize) -> Self {
        Self {
            backends: Vec::new(),
            chunking,
            batch_size: batch_size.max(1),
        }
    }

    /// Append a backend to the fallback chain
    pub fn with_backend(mut self, backend: Box<dyn EmbeddingClient>) -> Self {
        self.backends.push(backend);
        self
    }

    /// Chain `[remote (opt-in), local, pseudo]` from configuration
    pub fn from_config(config: &AppConfig) -> Result<Self> {
        let chunking = ChunkConfig::new(config.rag.chunk_size, config.rag.chunk_overlap)?;
        let mut builder = Self::new(chunking, config.embedding.batch_size);

        match config.llm.openai_api_key.as_deref() {
            Some(key) if config.embedding.remote_for_index => {
                builder = builder.with_backend(Box::new(OpenAiEmbedding::from_config(
                    &config.embedding,
                    Some(key),
                    &config.llm.openai_base_url,
                    None,
                )?));
            }
            None if config.embedding.remote_for_index => {
                tracing::warn!("Remote embeddings requested but OPENAI_API_KEY is not set");
            }
            _ => {}
        }

        Ok(builder
            .with_backend(Box::new(OllamaEmbedding::from_config(
                &config.embedding,
                None,
            )?))
            .with_backend(Box::new(PseudoEmbedding::tokens(
                config.embedding.pseudo_dimension,
            ))))
    }

    /// Split documents into identified chunks, in document order
    pub fn chunk_documents(&self, documents: &[Document]) -> Result<Vec<PendingChunk>> {
        let mut pending = Vec::new();
        for doc in documents {
            let pieces = chunk_text(&doc.text, &self.chunking)?;
            tracing::debug!("{}: {} chunks", doc.source, pieces.len());
            pending.extend(pieces.into_iter().enumerate().map(|(i, text)| PendingChunk {
                id: Chunk::make_id(&doc.source, i),
                source: doc.source.clone(),
                text,
            }));
        }
        Ok(pending)
    }

    /// Embed documents into an index; `None` when there is nothing to index
    pub async fn build(&self, documents: &[Document]) -> Result<Option<VectorIndex>> {
        let pending = self.chunk_documents(documents)?;
        if pending.is_empty() {
            return Ok(None);
        }

        let texts: Vec<String> = pending.iter().map(|p| p.text.clone()).collect();
        let mut last_error = None;

        for backend in &self.backends {
            let label = backend.backend().label();
            tracing::info!("Embedding {} chunks with {}", texts.len(), label);

            match self.embed_all(backend.as_ref(), &texts).await {
                Ok(embeddings) => {
                    let items = pending
                        .into_iter()
                        .zip(embeddings)
                        .map(|(p, embedding)| Chunk {
                            id: p.id,
                            source: p.source,
                            text: p.text,
                            embedding,
                        })
                        .collect();
                    return Ok(Some(VectorIndex { model: label, items }));
                }
                Err(e) => {
                    tracing::warn!("Embedding with {} failed, trying next backend: {}", label, e);
                    last_error = Some(e);
                }
            }
        }

        Err(last_error.unwrap_or_else(|| {
            FolioError::ConfigError("no embedding backends configured".to_string())
        }))
    }

    async fn embed_all(
        &self,
        backend: &dyn EmbeddingClient,
        texts: &[String],
    ) -> Result<Vec<Vec<f32>>> {
        let mut embeddings = Vec::with_capacity(texts.len());
        for batch in texts.chunks(self.batch_size) {
            let vectors = backend.embed_batch(batch).await?;
            if vectors.len() != batch.len() {
                return Err(FolioError::EmbeddingError(format!(
                    "backend returned {} vectors for {} texts",
                    vectors.len(),
                    batch.len()
                )));
            }
            embeddings.extend(vectors);
        }

        if let Some(first) = embeddings.first().map(Vec::len) {
            if first == 0 || embeddings.iter().any(|v| v.len() != first) {
                return Err(FolioError::EmbeddingError(
                    "backend returned vectors of inconsistent dimension".to_string(),
                ));
            }
        }

        Ok(embeddings)
    }
}

/// Index every markdown file under `docs_dir` and write the result to `out`
///
/// Returns `None`, writing nothing, when the corpus is empty.
pub async fn run_indexing(
    config: &AppConfig,
    docs_dir: &Path,
    out: &Path,
) -> Result<Option<IndexReport>> {
    let base = std::env::current_dir().unwrap_or_default();
    let documents = load_markdown_documents(docs_dir, &base)?;

    if documents.is_empty() {
        tracing::warn!("No markdown files found in {}", docs_dir.display());
        return Ok(None);
    }
    tracing::info!("Found {} markdown files", documents.len());

    let builder = IndexBuilder::from_config(config)?;
    let Some(index) = builder.build(&documents).await? else {
        tracing::warn!("Documents in {} produced no chunks", docs_dir.display());
        return Ok(None);
    };

    write_index(out, &index).await?;
    tracing::info!("Saved {} chunks to {}", index.items.len(), out.display());

    Ok(Some(IndexReport {
        documents: documents.len(),
        chunks: index.items.len(),
        model: index.model,
        path: out.to_path_buf(),
    }))
}
