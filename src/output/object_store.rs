//! Object store backends for flushed batches
//!
//! Keys are slash-separated paths. Writes are whole-object puts; there is no
//! append or overwrite protection beyond key uniqueness.

use async_trait::async_trait;
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Mutex;

use super::SinkError;

/// Write-once object storage
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Writes `payload` under `key`
    async fn put(&self, key: &str, payload: Vec<u8>) -> Result<(), SinkError>;
}

/// Stores objects as files below a root directory
#[derive(Debug, Clone)]
pub struct LocalDirStore {
    root: PathBuf,
}

impl LocalDirStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn path_for(&self, key: &str) -> Result<PathBuf, SinkError> {
        let mut path = self.root.clone();
        for segment in key.split('/') {
            if segment.is_empty() || segment == "." || segment == ".." {
                return Err(SinkError::Write {
                    key: key.to_string(),
                    message: "key contains an empty or relative segment".to_string(),
                });
            }
            path.push(segment);
        }
        Ok(path)
    }
}

#[async_trait]
impl ObjectStore for LocalDirStore {
    async fn put(&self, key: &str, payload: Vec<u8>) -> Result<(), SinkError> {
        let path = self.path_for(key)?;
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(&path, payload).await?;
        tracing::debug!(path = %path.display(), "Wrote object");
        Ok(())
    }
}

/// Keeps objects in memory
#[derive(Debug, Default)]
pub struct MemoryObjectStore {
    objects: Mutex<HashMap<String, Vec<u8>>>,
}

impl MemoryObjectStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of every stored object
    pub fn objects(&self) -> HashMap<String, Vec<u8>> {
        self.objects
            .lock()
            .map(|objects| objects.clone())
            .unwrap_or_default()
    }

    pub fn get(&self, key: &str) -> Option<Vec<u8>> {
        self.objects.lock().ok()?.get(key).cloned()
    }

    pub fn len(&self) -> usize {
        self.objects.lock().map(|o| o.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl ObjectStore for MemoryObjectStore {
    async fn put(&self, key: &str, payload: Vec<u8>) -> Result<(), SinkError> {
        let mut objects = self.objects.lock().map_err(|_| SinkError::Write {
            key: key.to_string(),
            message: "object map lock poisoned".to_string(),
        })?;
        objects.insert(key.to_string(), payload);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_local_dir_store_creates_parents() {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalDirStore::new(dir.path());

        store
            .put("acme/2024/03/07/abc-1.jsonl", b"{}".to_vec())
            .await
            .unwrap();

        let written = std::fs::read(dir.path().join("acme/2024/03/07/abc-1.jsonl")).unwrap();
        assert_eq!(written, b"{}");
    }

    #[tokio::test]
    async fn test_local_dir_store_rejects_traversal() {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalDirStore::new(dir.path());

        let err = store.put("../escape.jsonl", vec![]).await.unwrap_err();
        assert!(matches!(err, SinkError::Write { .. }));
    }

    #[tokio::test]
    async fn test_memory_store() {
        let store = MemoryObjectStore::new();
        assert!(store.is_empty());

        store.put("a/b", b"x".to_vec()).await.unwrap();
        assert_eq!(store.len(), 1);
        assert_eq!(store.get("a/b"), Some(b"x".to_vec()));
        assert_eq!(store.get("missing"), None);
    }
}
