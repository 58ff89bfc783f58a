//! Snapshot Error Types

use derive_more::{Display, Error};
use std::path::PathBuf;

/// A snapshot error with automatic location tracking.
pub type Error = exn::Exn<ErrorKind>;
/// Result type alias for snapshot operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Actionable error categories.
#[derive(Debug, Display, Error)]
pub enum ErrorKind {
    /// The source database file does not exist.
    #[display("source database not found: {}", _0.display())]
    SourceNotFound(#[error(not(source))] PathBuf),
    /// Refusing to overwrite an existing file with a snapshot.
    #[display("snapshot target already exists: {}", _0.display())]
    TargetExists(#[error(not(source))] PathBuf),
    #[display("database error")]
    Database,
    /// The SQLite online-backup API reported a failure.
    #[display("online backup failed: {_0}")]
    OnlineBackup(#[error(not(source))] String),
    /// Paths handed to SQLite must be valid UTF-8.
    #[display("path is not valid UTF-8: {}", _0.display())]
    InvalidPath(#[error(not(source))] PathBuf),
    /// The snapshot file does not match the page geometry SQLite reported.
    #[display("corrupt snapshot: {_0}")]
    Corrupt(#[error(not(source))] String),
    #[display("I/O error")]
    Io,
}

impl ErrorKind {
    /// Returns `true` if retrying might succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Database | Self::OnlineBackup(_) | Self::Io)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retryable() {
        assert!(ErrorKind::Database.is_retryable());
        assert!(!ErrorKind::SourceNotFound(PathBuf::from("app.db")).is_retryable());
        assert!(!ErrorKind::Corrupt("short page".into()).is_retryable());
    }
}
