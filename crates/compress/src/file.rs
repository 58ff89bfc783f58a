//! Whole-file compression.
//!
//! The uncompressed input is only removed after the compressed copy has been
//! written and synced; on any failure the input is left exactly where it was.

use crate::Compression;
use crate::error::{ErrorKind, Result};
use exn::ResultExt;
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::instrument;

impl Compression {
    /// Path of the compressed sibling of `source`: the format's extension is
    /// appended to the full file name (`backup.sqlite` → `backup.sqlite.lz4`).
    #[must_use]
    pub fn target_path(&self, source: impl AsRef<Path>) -> PathBuf {
        let mut name = source.as_ref().as_os_str().to_owned();
        name.push(self.extension());
        PathBuf::from(name)
    }

    /// Compress `source` into [`target_path`](Self::target_path) and delete
    /// `source` afterwards, returning the path of the compressed file.
    ///
    /// The whole file is read into memory and compressed in one shot. This is
    /// blocking I/O; async callers should run it inside
    /// [`spawn_blocking`](https://docs.rs/tokio/latest/tokio/task/fn.spawn_blocking.html).
    ///
    /// [`Compression::None`] is a no-op that returns `source` unchanged.
    ///
    /// # Errors
    /// - [`ErrorKind::TargetExists`] if the compressed file is already there
    ///   (nothing is touched).
    /// - [`ErrorKind::Io`] on read/write failures. A partially written target
    ///   is removed; the source is never removed on failure.
    #[instrument(skip_all, fields(source = %source.as_ref().display(), format = %self))]
    pub fn compress_file(&self, source: impl AsRef<Path>) -> Result<PathBuf> {
        let source = source.as_ref();
        if matches!(self, Compression::None) {
            return Ok(source.to_path_buf());
        }
        let target = self.target_path(source);
        let input = fs::read(source).or_raise(|| ErrorKind::Io)?;
        let output = self.compress(&input)?;

        let mut file = match OpenOptions::new().write(true).create_new(true).open(&target) {
            Ok(file) => file,
            Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => {
                exn::bail!(ErrorKind::TargetExists(target))
            },
            Err(e) => return Err(e).or_raise(|| ErrorKind::Io),
        };
        if let Err(e) = file.write_all(&output).and_then(|()| file.sync_all()) {
            drop(file);
            // We created this file, so it's ours to clean up. Best-effort only:
            // the error that matters is the write failure.
            if let Err(cleanup) = fs::remove_file(&target) {
                tracing::warn!(path = %target.display(), error = %cleanup, "Could not remove partial compressed file");
            }
            return Err(e).or_raise(|| ErrorKind::Io);
        }
        drop(file);

        fs::remove_file(source).or_raise(|| ErrorKind::Io)?;
        tracing::debug!(
            input_size = input.len(),
            output_size = output.len(),
            target = %target.display(),
            "Compressed file written; original removed"
        );
        Ok(target)
    }
}

#[cfg(test)]
mod tests {
    use crate::Compression;
    use crate::error::ErrorKind;
    use rstest::rstest;
    use std::fs;
    use std::path::Path;

    #[test]
    fn test_target_path_appends_extension() {
        let path = Compression::Lz4.target_path("/backups/backup_2024-01-01T00.00.00.000+00.00.sqlite");
        assert_eq!(path, Path::new("/backups/backup_2024-01-01T00.00.00.000+00.00.sqlite.lz4"));
        assert_eq!(Compression::None.target_path("a.sqlite"), Path::new("a.sqlite"));
    }

    #[rstest]
    #[case(Compression::Lz4)]
    #[case(Compression::Gzip)]
    #[case(Compression::Bzip2)]
    fn test_compress_file_round_trip(#[case] format: Compression) {
        let dir = tempfile::tempdir().unwrap();
        let source = dir.path().join("backup.sqlite");
        let original: Vec<u8> = (0..64 * 1024).map(|i| (i % 251) as u8).collect();
        fs::write(&source, &original).unwrap();

        let target = format.compress_file(&source).unwrap();
        assert_eq!(target, format.target_path(&source));
        assert!(!source.exists(), "source should be removed after success");
        let compressed = fs::read(&target).unwrap();
        assert!(target.to_string_lossy().ends_with(format.extension()));
        assert_eq!(format.decompress(&compressed).unwrap(), original);
    }

    #[test]
    fn test_compress_file_none_is_noop() {
        let dir = tempfile::tempdir().unwrap();
        let source = dir.path().join("backup.sqlite");
        fs::write(&source, b"data").unwrap();
        assert_eq!(Compression::None.compress_file(&source).unwrap(), source);
        assert!(source.exists());
    }

    #[test]
    fn test_missing_source_fails() {
        let dir = tempfile::tempdir().unwrap();
        let source = dir.path().join("missing.sqlite");
        let err = Compression::Lz4.compress_file(&source).unwrap_err();
        assert_eq!(*err, ErrorKind::Io);
        assert!(!Compression::Lz4.target_path(&source).exists());
    }

    #[test]
    fn test_existing_target_keeps_both_files() {
        let dir = tempfile::tempdir().unwrap();
        let source = dir.path().join("backup.sqlite");
        fs::write(&source, b"fresh backup").unwrap();
        let target = Compression::Lz4.target_path(&source);
        fs::write(&target, b"older archive").unwrap();

        let err = Compression::Lz4.compress_file(&source).unwrap_err();
        assert!(matches!(&*err, ErrorKind::TargetExists(p) if p == &target));
        assert_eq!(fs::read(&source).unwrap(), b"fresh backup");
        assert_eq!(fs::read(&target).unwrap(), b"older archive");
    }
}
