//! Exhaustive cosine-similarity retriever
//!
//! Scores every stored chunk per query. Corpora here are a few documents, so
//! no approximate index is needed.
//!
//! Author: hephaex@gmail.com

use crate::query::QueryEmbedder;
use crate::similarity::top_k;
use crate::store::JsonVectorStore;
use async_trait::async_trait;
use folio_core::{Result, ScoredChunk, SearchBackend};
use std::sync::Arc;

/// Retriever over the JSON vector store
pub struct VectorRetriever {
    store: Arc<JsonVectorStore>,
    embedder: Arc<QueryEmbedder>,
}

impl VectorRetriever {
    pub fn new(store: Arc<JsonVectorStore>, embedder: Arc<QueryEmbedder>) -> Self {
        Self { store, embedder }
    }

    pub fn store(&self) -> &JsonVectorStore {
        &self.store
    }
}

#[async_trait]
impl SearchBackend for VectorRetriever {
    async fn search(&self, query: &str, limit: usize) -> Result<Vec<ScoredChunk>> {
        let index = self.store.load().await?;
        let vector = self
            .embedder
            .embed_query(query, index.model(), index.dimension())
            .await?;

        let results = top_k(&vector, index.chunks(), limit)?;
        tracing::debug!(
            "Retrieved {} of {} chunks for query",
            results.len(),
            index.len()
        );
        Ok(results)
    }

    fn name(&self) -> &str {
        "json-vector"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embedding::PseudoEmbedding;
    use folio_core::{Chunk, EmbeddingConfig, FolioError, VectorIndex};

    fn pseudo_index(texts: &[&str], dimension: usize) -> VectorIndex {
        let embedder = PseudoEmbedding::tokens(dimension);
        VectorIndex {
            model: format!("pseudo/{dimension}"),
            items: texts
                .iter()
                .enumerate()
                .map(|(i, text)| Chunk {
                    id: Chunk::make_id("data/rag/about.md", i),
                    source: "data/rag/about.md".to_string(),
                    text: text.to_string(),
                    embedding: embedder.embed_text(text),
                })
                .collect(),
        }
    }

    fn retriever(index: VectorIndex) -> VectorRetriever {
        VectorRetriever::new(
            Arc::new(JsonVectorStore::from_index(index).unwrap()),
            Arc::new(QueryEmbedder::new(
                EmbeddingConfig::default(),
                None,
                "http://127.0.0.1:9",
            )),
        )
    }

    #[tokio::test]
    async fn test_exact_match_ranks_first() {
        let texts = [
            "I enjoy landscape photography in the mountains",
            "Built a compiler in Rust during university",
            "Interned at a robotics startup",
        ];
        let r = retriever(pseudo_index(&texts, 256));

        let results = r.search(texts[1], 3).await.unwrap();
        assert_eq!(results.len(), 3);
        assert_eq!(results[0].chunk.text, texts[1]);
        assert!((results[0].score - 1.0).abs() < 1e-5);
        for pair in results.windows(2) {
            assert!(pair[0].score >= pair[1].score);
        }
    }

    #[tokio::test]
    async fn test_limit_is_respected() {
        let r = retriever(pseudo_index(&["a b c", "d e f"], 16));
        assert_eq!(r.search("a", 1).await.unwrap().len(), 1);
        assert_eq!(r.search("a", 10).await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_missing_index_propagates() {
        let dir = tempfile::tempdir().unwrap();
        let r = VectorRetriever::new(
            Arc::new(JsonVectorStore::new(dir.path().join("none.json"))),
            Arc::new(QueryEmbedder::new(
                EmbeddingConfig::default(),
                None,
                "http://127.0.0.1:9",
            )),
        );
        assert!(matches!(
            r.search("anything", 3).await,
            Err(FolioError::Io { .. })
        ));
    }
}
