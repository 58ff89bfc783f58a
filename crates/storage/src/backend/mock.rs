//! In-memory storage backend for testing.

use crate::error::{ErrorKind, Result};
use crate::path::validate as validate_path;
use crate::StorageBackend;
use async_trait::async_trait;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use tokio::sync::RwLock;

/// In-memory storage backend for testing.
///
/// Files are stored in a `HashMap` behind a [`RwLock`], so all trait methods
/// operate on `&self`. [`fail_writes_after`](Self::fail_writes_after) makes
/// the backend start rejecting writes, which is how other crates exercise
/// their storage failure paths.
pub struct MockBackend {
    name: String,
    storage: RwLock<HashMap<PathBuf, Vec<u8>>>,
    writes_allowed: AtomicUsize,
}

impl MockBackend {
    /// Create an empty mock backend.
    pub fn new() -> Self {
        Self::with_files(Vec::<(PathBuf, Vec<u8>)>::new())
    }

    /// Create a mock backend pre-populated with files.
    ///
    /// Panics if any path fails validation. If test setup is wrong, the test
    /// should not pass.
    pub fn with_files(files: impl IntoIterator<Item = (impl Into<PathBuf>, impl Into<Vec<u8>>)>) -> Self {
        let mut map = HashMap::new();
        for (path, data) in files {
            let path = path.into();
            let Ok(validated) = validate_path(&path) else {
                // Deliberate: MockBackend only exists for tests.
                panic!("MockBackend::with_files: invalid path {}", path.display());
            };
            map.insert(validated, data.into());
        }
        Self {
            name: "mock".to_string(),
            storage: RwLock::new(map),
            writes_allowed: AtomicUsize::new(usize::MAX),
        }
    }

    /// Allow `n` more successful writes, then fail every write after that
    /// with a [`BackendError`](ErrorKind::BackendError).
    pub fn fail_writes_after(self, n: usize) -> Self {
        self.writes_allowed.store(n, Ordering::SeqCst);
        self
    }

    /// Number of files currently stored.
    pub async fn len(&self) -> usize {
        self.storage.read().await.len()
    }

    /// Whether the backend holds no files.
    pub async fn is_empty(&self) -> bool {
        self.storage.read().await.is_empty()
    }

    fn take_write_permit(&self) -> bool {
        self.writes_allowed.fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1)).is_ok()
    }
}

impl Default for MockBackend {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl StorageBackend for MockBackend {
    fn name(&self) -> &str {
        &self.name
    }

    async fn exists(&self, path: &Path) -> Result<bool> {
        let path = validate_path(path)?;
        Ok(self.storage.read().await.contains_key(&path))
    }

    async fn read(&self, path: &Path) -> Result<Vec<u8>> {
        let key = validate_path(path)?;
        match self.storage.read().await.get(&key) {
            Some(data) => Ok(data.clone()),
            None => exn::bail!(ErrorKind::NotFound(path.to_path_buf())),
        }
    }

    async fn write_new(&self, path: &Path, data: &[u8]) -> Result<bool> {
        let key = validate_path(path)?;
        let mut storage = self.storage.write().await;
        if storage.contains_key(&key) {
            return Ok(false);
        }
        if !self.take_write_permit() {
            exn::bail!(ErrorKind::BackendError(format!("injected write failure: {}", path.display())));
        }
        storage.insert(key, data.to_vec());
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_injected_write_failure() {
        let backend = MockBackend::new().fail_writes_after(1);
        assert!(backend.write_new(Path::new("a/1"), b"one").await.unwrap());
        let err = backend.write_new(Path::new("a/2"), b"two").await.unwrap_err();
        assert!(matches!(&*err, ErrorKind::BackendError(_)));
        // Dedup hits don't need a write and keep succeeding.
        assert!(!backend.write_new(Path::new("a/1"), b"one").await.unwrap());
        assert_eq!(backend.len().await, 1);
    }
}
