//! Engine Error Types
//!
//! Each kind names the stage of a run that failed; the raised lower-level
//! error (snapshot, storage, compression) is attached as its source.

use derive_more::{Display, Error};
use std::path::PathBuf;

/// An engine error with automatic location tracking.
pub type Error = exn::Exn<ErrorKind>;
/// Result type alias for engine operations.
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Display, Error)]
pub enum ErrorKind {
    /// Raised before any destination directory is created.
    #[display("could not find source database: {}", _0.display())]
    SourceNotFound(#[error(not(source))] PathBuf),
    /// Taking the snapshot, or reading its pages back, failed.
    #[display("could not acquire a consistent snapshot")]
    Acquisition,
    /// Writing to (or reading from) the page store or a manifest failed.
    #[display("backup storage I/O failed")]
    StorageIo,
    /// The full backup is left uncompressed on disk.
    #[display("could not compress the full backup")]
    Compression,
    #[display("invalid configuration")]
    Config,
}

impl ErrorKind {
    /// Returns `true` if retrying might succeed.
    ///
    /// Nothing is retried internally; a rerun is always safe because page
    /// writes are idempotent.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Acquisition | Self::StorageIo)
    }
}
