//! Folio Vector - Embeddings, vector store and retrieval
//!
//! Embeds the chunked corpus offline into a JSON index and answers
//! nearest-neighbour queries against it at request time.
//!
//! Author: hephaex@gmail.com

pub mod embedding;
pub mod indexer;
pub mod query;
pub mod retriever;
pub mod similarity;
pub mod store;

pub use embedding::{
    EmbeddingBackend, EmbeddingClient, HashStrategy, OllamaEmbedding, OpenAiEmbedding,
    PseudoEmbedding,
};
pub use indexer::{run_indexing, IndexBuilder, IndexReport};
pub use query::QueryEmbedder;
pub use retriever::VectorRetriever;
pub use similarity::{cosine_similarity, normalize, top_k};
pub use store::{read_index, write_index, JsonVectorStore, LoadedIndex};
