//! JSON-file vector store
//!
//! The index is read once per process and never mutated afterwards. A failed
//! load is not cached, so the next caller retries.
//!
//! Author: hephaex@gmail.com

use folio_core::{Chunk, FolioError, Result, VectorIndex};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::OnceCell;

/// A validated, read-only index
#[derive(Debug)]
pub struct LoadedIndex {
    index: VectorIndex,
    dimension: usize,
    by_id: HashMap<String, usize>,
}

impl LoadedIndex {
    /// Validate an index: non-empty and one dimensionality throughout
    pub fn new(index: VectorIndex) -> Result<Self> {
        let dimension = index
            .dimension()
            .ok_or_else(|| FolioError::IndexError("index contains no chunks".to_string()))?;

        if dimension == 0 {
            return Err(FolioError::IndexError(
                "index vectors are empty".to_string(),
            ));
        }

        if let Some(bad) = index.items.iter().find(|c| c.embedding.len() != dimension) {
            return Err(FolioError::IndexError(format!(
                "chunk {} has dimension {}, expected {}",
                bad.id,
                bad.embedding.len(),
                dimension
            )));
        }

        let by_id = index
            .items
            .iter()
            .enumerate()
            .map(|(i, c)| (c.id.clone(), i))
            .collect();

        Ok(Self {
            index,
            dimension,
            by_id,
        })
    }

    /// Label of the backend that produced the vectors
    pub fn model(&self) -> &str {
        &self.index.model
    }

    pub fn dimension(&self) -> usize {
        self.dimension
    }

    pub fn chunks(&self) -> &[Chunk] {
        &self.index.items
    }

    pub fn len(&self) -> usize {
        self.index.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.index.items.is_empty()
    }

    /// Look up a chunk by its `<source>:<index>` id
    pub fn get(&self, id: &str) -> Option<&Chunk> {
        self.by_id.get(id).map(|&i| &self.index.items[i])
    }
}

/// Vector store backed by the JSON file written by the indexer
pub struct JsonVectorStore {
    path: PathBuf,
    loaded: OnceCell<Arc<LoadedIndex>>,
}

impl JsonVectorStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            loaded: OnceCell::new(),
        }
    }

    /// Build a store around an in-memory index, bypassing the file
    pub fn from_index(index: VectorIndex) -> Result<Self> {
        let loaded = Arc::new(LoadedIndex::new(index)?);
        Ok(Self {
            path: PathBuf::new(),
            loaded: OnceCell::new_with(Some(loaded)),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load the index, reading the file only on first success
    pub async fn load(&self) -> Result<Arc<LoadedIndex>> {
        self.loaded
            .get_or_try_init(|| async {
                let index = read_index(&self.path).await?;
                let loaded = LoadedIndex::new(index)?;
                tracing::info!(
                    "Loaded {} chunks ({}-dim, {}) from {}",
                    loaded.len(),
                    loaded.dimension(),
                    loaded.model(),
                    self.path.display()
                );
                Ok::<_, FolioError>(Arc::new(loaded))
            })
            .await
            .cloned()
    }

    /// Fetch one chunk by id; `None` when the index has no such chunk
    pub async fn get(&self, id: &str) -> Result<Option<Chunk>> {
        let loaded = self.load().await?;
        Ok(loaded.get(id).cloned())
    }
}

/// Read and parse an index file without validating it
pub async fn read_index(path: &Path) -> Result<VectorIndex> {
    let raw = tokio::fs::read_to_string(path)
        .await
        .map_err(|e| FolioError::Io {
            path: path.display().to_string(),
            source: e,
        })?;

    serde_json::from_str(&raw).map_err(|e| {
        FolioError::IndexError(format!("malformed index {}: {e}", path.display()))
    })
}

/// Write an index as pretty-printed JSON, creating parent directories
pub async fn write_index(path: &Path, index: &VectorIndex) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent)
            .await
            .map_err(|e| FolioError::Io {
                path: parent.display().to_string(),
                source: e,
            })?;
    }

    let json = serde_json::to_string_pretty(index)
        .map_err(|e| FolioError::IndexError(format!("failed to serialise index: {e}")))?;

    tokio::fs::write(path, json)
        .await
        .map_err(|e| FolioError::Io {
            path: path.display().to_string(),
            source: e,
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chunk(id: &str, embedding: Vec<f32>) -> Chunk {
        Chunk {
            id: id.to_string(),
            source: "about.md".to_string(),
            text: format!("text of {id}"),
            embedding,
        }
    }

    fn sample_index() -> VectorIndex {
        VectorIndex {
            model: "pseudo/2".to_string(),
            items: vec![chunk("about.md:0", vec![1.0, 0.0]), chunk("about.md:1", vec![0.0, 1.0])],
        }
    }

    #[tokio::test]
    async fn test_write_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested/rag/embeddings.json");
        write_index(&path, &sample_index()).await.unwrap();

        let store = JsonVectorStore::new(&path);
        let loaded = store.load().await.unwrap();
        assert_eq!(loaded.len(), 2);
        assert_eq!(loaded.dimension(), 2);
        assert_eq!(loaded.model(), "pseudo/2");
        assert_eq!(
            store.get("about.md:1").await.unwrap().unwrap().text,
            "text of about.md:1"
        );
    }

    #[tokio::test]
    async fn test_load_is_memoised() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("embeddings.json");
        write_index(&path, &sample_index()).await.unwrap();

        let store = JsonVectorStore::new(&path);
        let first = store.load().await.unwrap();
        std::fs::remove_file(&path).unwrap();
        let second = store.load().await.unwrap();
        assert!(Arc::ptr_eq(&first, &second));
    }

    #[tokio::test]
    async fn test_missing_file_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonVectorStore::new(dir.path().join("absent.json"));
        assert!(matches!(store.load().await, Err(FolioError::Io { .. })));
    }

    #[tokio::test]
    async fn test_failed_load_is_retried() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("embeddings.json");
        let store = JsonVectorStore::new(&path);
        assert!(store.load().await.is_err());

        write_index(&path, &sample_index()).await.unwrap();
        assert!(store.load().await.is_ok());
    }

    #[tokio::test]
    async fn test_malformed_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("embeddings.json");
        std::fs::write(&path, "{not json").unwrap();
        let store = JsonVectorStore::new(&path);
        assert!(matches!(store.load().await, Err(FolioError::IndexError(_))));
    }

    #[test]
    fn test_rejects_empty_and_mixed_indexes() {
        let empty = VectorIndex {
            model: "pseudo/2".to_string(),
            items: vec![],
        };
        assert!(matches!(LoadedIndex::new(empty), Err(FolioError::IndexError(_))));

        let mut mixed = sample_index();
        mixed.items.push(chunk("about.md:2", vec![1.0, 0.0, 0.0]));
        assert!(matches!(LoadedIndex::new(mixed), Err(FolioError::IndexError(_))));
    }

    #[tokio::test]
    async fn test_unknown_chunk_id() {
        let store = JsonVectorStore::from_index(sample_index()).unwrap();
        assert!(store.get("nope:0").await.unwrap().is_none());
    }
}
