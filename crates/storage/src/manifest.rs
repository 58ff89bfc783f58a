//! Snapshot manifests.
//!
//! A manifest is a plain-text file with one line per database page, in page
//! order. Each line is the page's store location, relative to the incremental
//! backup folder: `storage/<shard>/<object_name>`. Lines end with `\n`,
//! including the last one. Two pages with identical content produce two
//! identical lines.

use crate::cas::ObjectId;
use crate::error::{ErrorKind, Result};
use std::path::Path;
use tokio::fs::{self, File, OpenOptions};
use tokio::io::{AsyncWrite, AsyncWriteExt, BufWriter};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ManifestSummary {
    /// Number of lines written (one per page).
    pub lines: u64,
    pub bytes: u64,
}

/// Streams manifest lines to a writer.
pub struct ManifestWriter<W> {
    writer: W,
    prefix: String,
    summary: ManifestSummary,
}

impl ManifestWriter<BufWriter<File>> {
    /// Create a new manifest file, failing if one already exists at `path`.
    pub async fn create(path: impl AsRef<Path>, prefix: impl Into<String>) -> Result<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await.map_err(ErrorKind::from)?;
        }
        let file = OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(path)
            .await
            .map_err(|e| match e.kind() {
                std::io::ErrorKind::PermissionDenied => ErrorKind::PermissionDenied(path.to_path_buf()),
                _ => ErrorKind::Io(e),
            })?;
        Ok(Self::new(BufWriter::new(file), prefix))
    }

    /// Flush buffered lines and sync the file to disk.
    pub async fn close(mut self) -> Result<ManifestSummary> {
        self.writer.flush().await.map_err(ErrorKind::from)?;
        self.writer.get_ref().sync_all().await.map_err(ErrorKind::from)?;
        Ok(self.summary)
    }
}

impl<W: AsyncWrite + Unpin> ManifestWriter<W> {
    pub fn new(writer: W, prefix: impl Into<String>) -> Self {
        Self {
            writer,
            prefix: prefix.into(),
            summary: ManifestSummary::default(),
        }
    }

    /// Append the line for the next page.
    pub async fn append(&mut self, id: &ObjectId) -> Result<()> {
        let line = format!("{}/{}/{}\n", self.prefix, id.shard(), id.object_name());
        self.writer.write_all(line.as_bytes()).await.map_err(ErrorKind::from)?;
        self.summary.lines += 1;
        self.summary.bytes += line.len() as u64;
        Ok(())
    }

    /// Flush and close the underlying writer.
    pub async fn finish(mut self) -> Result<ManifestSummary> {
        self.writer.flush().await.map_err(ErrorKind::from)?;
        self.writer.shutdown().await.map_err(ErrorKind::from)?;
        Ok(self.summary)
    }
}

/// Parse manifest text into the ordered list of page objects.
///
/// Absolute locations (as written by older tooling) are accepted: only the
/// shard and object name are significant. Every line, blank ones included,
/// must name an object.
pub fn parse_manifest(text: &str) -> Result<Vec<ObjectId>> {
    text.lines()
        .enumerate()
        .map(|(n, line)| ObjectId::from_location(line.trim()).map_err(|_| ErrorKind::InvalidManifest(n + 1).into()))
        .collect()
}

pub async fn read_manifest(path: impl AsRef<Path>) -> Result<Vec<ObjectId>> {
    let path = path.as_ref();
    let text = fs::read_to_string(path).await.map_err(|e| match e.kind() {
        std::io::ErrorKind::NotFound => ErrorKind::NotFound(path.to_path_buf()),
        _ => ErrorKind::Io(e),
    })?;
    parse_manifest(&text)
}
