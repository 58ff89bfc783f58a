//! Storage backend trait and implementations.
//!
//! The content store only ever needs a handful of operations on its root
//! directory: existence checks, whole-object reads and create-only writes.
//! Keeping them behind [`StorageBackend`] lets tests swap in an
//! in-memory backend (feature `mock`) that can also inject write failures.

mod local;
#[cfg(feature = "mock")]
mod mock;

pub use self::local::LocalBackend;
#[cfg(feature = "mock")]
pub use self::mock::MockBackend;
use crate::error::Result;
use async_trait::async_trait;
use std::path::Path;

/// Unified interface for storage backends.
///
/// # Path Handling
/// All paths are relative to the backend root and must be validated using
/// [`validate_path`](crate::validate_path) before use. Implementations
/// enforce this validation.
///
/// # Examples
///
/// ```
/// use std::path::Path;
/// use litevault_storage::{backend::StorageBackend, error::Result};
///
/// async fn store_once(backend: &dyn StorageBackend, data: &[u8]) -> Result<bool> {
///     backend.write_new(Path::new("a/bcdef"), data).await
/// }
/// ```
#[async_trait]
pub trait StorageBackend: Send + Sync {
    /// Name of the backend, used for logging only.
    fn name(&self) -> &str;

    /// Check if a file exists.
    async fn exists(&self, path: &Path) -> Result<bool>;

    /// Read file contents.
    ///
    /// Returns [`NotFound`](crate::error::ErrorKind::NotFound) if the file
    /// does not exist.
    async fn read(&self, path: &Path) -> Result<Vec<u8>>;

    /// Write a file that must not be modified afterwards.
    ///
    /// Returns `Ok(false)` without touching anything if a file is already
    /// present at `path`, and `Ok(true)` once `data` has been fully written.
    /// A reader never observes a partially written file at `path`.
    ///
    /// # Notes
    /// - Implementations create parent directories as needed, treating a
    ///   directory that appeared concurrently as success.
    async fn write_new(&self, path: &Path, data: &[u8]) -> Result<bool>;
}
