//! Acquiring a snapshot and owning its temporary file.

use crate::db::{self, Geometry};
use crate::error::{ErrorKind, Result};
use crate::online;
use crate::pages::{Page, read_pages};
use crate::strategy::Strategy;
use exn::ResultExt;
use futures::Stream;
use std::path::{Path, PathBuf};
use tracing::instrument;

/// Removes a file when dropped, unless disarmed.
#[derive(Debug)]
struct RemoveOnDrop {
    path: PathBuf,
    armed: bool,
}

impl Drop for RemoveOnDrop {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }
        match std::fs::remove_file(&self.path) {
            Ok(()) => tracing::debug!(path = %self.path.display(), "removed snapshot file"),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {},
            Err(e) => tracing::warn!(path = %self.path.display(), error = %e, "could not remove snapshot file"),
        }
    }
}

/// A flat, self-consistent copy of a database, taken at a single point in
/// time.
///
/// The file is deleted when the `Snapshot` is dropped (including when the
/// owning future is cancelled), unless [`persist`](Self::persist) is called.
#[derive(Debug)]
pub struct Snapshot {
    file: RemoveOnDrop,
    geometry: Geometry,
}

impl Snapshot {
    pub fn path(&self) -> &Path {
        &self.file.path
    }

    pub fn geometry(&self) -> Geometry {
        self.geometry
    }

    pub fn page_size(&self) -> u32 {
        self.geometry.page_size
    }

    pub fn page_count(&self) -> u64 {
        self.geometry.page_count
    }

    /// Stream the snapshot's pages in file order.
    pub fn pages(&self) -> impl Stream<Item = Result<Page>> + '_ {
        read_pages(self.path(), self.geometry)
    }

    /// Keep the file and hand back its path.
    pub fn persist(mut self) -> PathBuf {
        self.file.armed = false;
        std::mem::take(&mut self.file.path)
    }

    /// Delete the file now, reporting failure instead of only logging it.
    pub async fn remove(mut self) -> Result<()> {
        self.file.armed = false;
        match tokio::fs::remove_file(&self.file.path).await {
            Err(e) if e.kind() != std::io::ErrorKind::NotFound => Err(e).or_raise(|| ErrorKind::Io),
            _ => Ok(()),
        }
    }
}

/// Copy the live database at `source` into the new file `target`.
///
/// The parent directory of `target` is created if missing. On failure any
/// partially written target is removed; an already existing target is an error
/// and is left untouched.
#[instrument(skip_all, fields(source = %source.as_ref().display(), target = %target.as_ref().display(), %strategy))]
pub async fn acquire(source: impl AsRef<Path>, target: impl AsRef<Path>, strategy: Strategy) -> Result<Snapshot> {
    let (source, target) = (source.as_ref(), target.as_ref());
    if !tokio::fs::try_exists(source).await.or_raise(|| ErrorKind::Io)? {
        exn::bail!(ErrorKind::SourceNotFound(source.to_path_buf()));
    }
    if tokio::fs::try_exists(target).await.or_raise(|| ErrorKind::Io)? {
        exn::bail!(ErrorKind::TargetExists(target.to_path_buf()));
    }
    if let Some(parent) = target.parent() {
        tokio::fs::create_dir_all(parent).await.or_raise(|| ErrorKind::Io)?;
    }

    let file = RemoveOnDrop {
        path: target.to_path_buf(),
        armed: true,
    };
    match strategy {
        Strategy::VacuumInto => db::vacuum_into(source, target).await?,
        Strategy::OnlineBackup => online::backup_async(source, target).await?,
    }
    let geometry = db::geometry(target).await?;
    tracing::debug!(page_size = geometry.page_size, page_count = geometry.page_count, "snapshot acquired");
    Ok(Snapshot { file, geometry })
}
