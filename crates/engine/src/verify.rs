//! Checking a manifest against its page store, and rebuilding the database
//! file it describes.

use crate::error::{ErrorKind, Result};
use exn::ResultExt;
use litevault_storage::{ContentStore, ObjectId, ObjectState, STORE_DIR, read_manifest};
use std::collections::HashSet;
use std::path::Path;
use tokio::io::{AsyncWrite, AsyncWriteExt};
use tracing::instrument;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VerifyReport {
    /// Manifest lines, one per page.
    pub pages: u64,
    /// Distinct objects the manifest references.
    pub objects: u64,
    pub missing: Vec<ObjectId>,
    /// Objects whose content no longer hashes to their name.
    pub corrupt: Vec<ObjectId>,
}

impl VerifyReport {
    pub fn is_intact(&self) -> bool {
        self.missing.is_empty() && self.corrupt.is_empty()
    }
}

/// Verify a manifest against the `storage/` folder beside it.
pub async fn verify_manifest(manifest: &Path) -> Result<VerifyReport> {
    let root = manifest.parent().unwrap_or(Path::new(".")).join(STORE_DIR);
    if !tokio::fs::try_exists(&root).await.or_raise(|| ErrorKind::StorageIo)? {
        // Nothing to check against; do not create an empty store.
        let ids = read_manifest(manifest).await.or_raise(|| ErrorKind::StorageIo)?;
        let distinct: HashSet<ObjectId> = ids.iter().cloned().collect();
        let mut missing: Vec<ObjectId> = distinct.into_iter().collect();
        missing.sort();
        return Ok(VerifyReport {
            pages: ids.len() as u64,
            objects: missing.len() as u64,
            missing,
            corrupt: Vec::new(),
        });
    }
    let store = ContentStore::local(&root).await.or_raise(|| ErrorKind::StorageIo)?;
    verify_manifest_in(manifest, &store).await
}

/// Verify that every object a manifest references exists in `store` and
/// still matches its hash. Each distinct object is read once.
#[instrument(skip_all, fields(manifest = %manifest.display()))]
pub async fn verify_manifest_in(manifest: &Path, store: &ContentStore) -> Result<VerifyReport> {
    let ids = read_manifest(manifest).await.or_raise(|| ErrorKind::StorageIo)?;
    let mut report = VerifyReport {
        pages: ids.len() as u64,
        ..VerifyReport::default()
    };
    let mut seen = HashSet::new();
    for id in ids {
        if !seen.insert(id.clone()) {
            continue;
        }
        match store.check(&id).await.or_raise(|| ErrorKind::StorageIo)? {
            ObjectState::Present => {},
            ObjectState::Missing => report.missing.push(id),
            ObjectState::Corrupt => report.corrupt.push(id),
        }
    }
    report.objects = seen.len() as u64;
    tracing::debug!(
        pages = report.pages,
        objects = report.objects,
        missing = report.missing.len(),
        corrupt = report.corrupt.len(),
        "manifest verified"
    );
    Ok(report)
}

/// Write the pages a manifest lists, in order, to `writer`; returns the number
/// of bytes written.
///
/// Meant for checking a backup or producing a standalone copy, never for
/// writing into a live database.
pub async fn reassemble<W: AsyncWrite + Unpin>(manifest: &Path, store: &ContentStore, writer: &mut W) -> Result<u64> {
    let ids = read_manifest(manifest).await.or_raise(|| ErrorKind::StorageIo)?;
    let mut written = 0u64;
    for id in &ids {
        let page = store.get(id).await.or_raise(|| ErrorKind::StorageIo)?;
        writer.write_all(&page).await.or_raise(|| ErrorKind::StorageIo)?;
        written += page.len() as u64;
    }
    writer.flush().await.or_raise(|| ErrorKind::StorageIo)?;
    Ok(written)
}
