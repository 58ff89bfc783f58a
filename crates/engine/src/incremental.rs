//! Incremental backups: page-level, content-addressed and deduplicated.
//!
//! A run snapshots the source into a temporary file, splits it into pages,
//! stores every page not already present under `storage/` and records the
//! ordered page list in a manifest (`snap_<timestamp>.snapshot` for scheduled
//! runs, `manual_<timestamp>.snapshot` otherwise). The manifest is written
//! under a hidden `.partial` name and only renamed into place once complete,
//! so an interrupted run never leaves a manifest that looks valid.

use crate::error::{ErrorKind, Result};
use crate::layout::RunKind;
use crate::logger::RunLogger;
use crate::progress::Progress;
use crate::run::{BackupRun, Context, RunState};
use crate::stats::Statistics;
use exn::ResultExt;
use futures::{Stream, StreamExt};
use litevault_snapshot::Page;
use litevault_storage::{ContentStore, ManifestWriter, STORE_DIR};
use std::path::{Path, PathBuf};
use tokio::io::AsyncWrite;
use tracing::instrument;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IncrementalParams {
    /// Only selects the manifest name prefix (`snap_` rather than `manual_`).
    pub is_scheduled_run: bool,
}

#[derive(Debug, Clone)]
pub struct IncrementalOutcome {
    pub manifest: PathBuf,
    pub statistics: Statistics,
    pub run: BackupRun,
}

/// Back up the source into the `storage/` folder next to the run's manifest.
pub async fn incremental_backup(
    ctx: &Context,
    params: IncrementalParams,
    logger: &dyn RunLogger,
) -> Result<IncrementalOutcome> {
    crate::check_source(ctx, logger).await?;
    let mut run = ctx.begin(RunKind::Incremental);
    let store = match ContentStore::local(run.destination.join(STORE_DIR)).await.or_raise(|| ErrorKind::StorageIo) {
        Ok(store) => store,
        Err(e) => return Err(crate::fail(&mut run, logger, e)),
    };
    execute(ctx, params, &store, logger, run).await
}

/// Back up the source into an arbitrary page store.
///
/// The manifest is still written to the run's `incremental backups` folder.
pub async fn incremental_backup_to(
    ctx: &Context,
    params: IncrementalParams,
    store: &ContentStore,
    logger: &dyn RunLogger,
) -> Result<IncrementalOutcome> {
    crate::check_source(ctx, logger).await?;
    execute(ctx, params, store, logger, ctx.begin(RunKind::Incremental)).await
}

#[instrument(skip_all, fields(source = %ctx.source().display(), destination = %run.destination.display()))]
async fn execute(
    ctx: &Context,
    params: IncrementalParams,
    store: &ContentStore,
    logger: &dyn RunLogger,
    mut run: BackupRun,
) -> Result<IncrementalOutcome> {
    match execute_inner(ctx, params, store, logger, &mut run).await {
        Ok((manifest, statistics)) => Ok(IncrementalOutcome { manifest, statistics, run }),
        Err(e) => Err(crate::fail(&mut run, logger, e)),
    }
}

async fn execute_inner(
    ctx: &Context,
    params: IncrementalParams,
    store: &ContentStore,
    logger: &dyn RunLogger,
    run: &mut BackupRun,
) -> Result<(PathBuf, Statistics)> {
    let stamp = run.time.stamp();
    logger.info(&format!("Source Database: {}", ctx.source().display()));
    logger.info(&format!("Starting the incremental backup into {}", run.destination.display()));

    logger.info("Creating temporary full backup ..");
    run.transition(RunState::AcquiringSnapshot);
    let temp = ctx.config.temp_dir.join(format!("temp_{stamp}.sqlite"));
    let snapshot = litevault_snapshot::acquire(ctx.source(), &temp, ctx.config.incremental.strategy)
        .await
        .or_raise(|| ErrorKind::Acquisition)?;
    logger.info(&format!("Temporary full backup file successfully created: {}", temp.display()));

    logger.info("Creating incremental backup ..");
    run.transition(RunState::ChunkingAndHashing);
    let prefix = if params.is_scheduled_run { "snap" } else { "manual" };
    let name = format!("{prefix}_{stamp}.snapshot");
    let manifest_path = run.destination.join(&name);
    let partial_path = run.destination.join(format!(".{name}.partial"));

    let written = async {
        let mut manifest = ManifestWriter::create(&partial_path, STORE_DIR).await.or_raise(|| ErrorKind::StorageIo)?;
        let mut progress = Progress::start(logger, snapshot.page_count(), &ctx.config.progress);
        let written_new = store_pages(snapshot.pages(), store, &mut manifest, &mut progress).await?;
        progress.finish().await;

        run.transition(RunState::WritingManifest);
        logger.info("Creating the snapshot file ..");
        let summary = manifest.close().await.or_raise(|| ErrorKind::StorageIo)?;
        tokio::fs::rename(&partial_path, &manifest_path).await.or_raise(|| ErrorKind::StorageIo)?;
        Ok::<_, crate::error::Error>((written_new, summary))
    }
    .await;
    let (written_new, summary) = match written {
        Ok(written) => written,
        Err(e) => {
            remove_partial(&partial_path).await;
            return Err(e);
        },
    };
    logger.info(&format!("Snapshot file successfully created: {}", manifest_path.display()));

    run.transition(RunState::CleaningUpTemp);
    logger.info("Deleting temporary file ..");
    let geometry = snapshot.geometry();
    snapshot.remove().await.or_raise(|| ErrorKind::StorageIo)?;
    logger.info("Temporary file successfully deleted");

    let statistics = Statistics {
        pages_total: geometry.page_count,
        pages_written_new: written_new,
        page_size: geometry.page_size,
        manifest_bytes: summary.bytes,
    };
    statistics.log(logger);
    run.transition(RunState::Done);
    logger.info("All done.");
    Ok((manifest_path, statistics))
}

/// Store each page and append its manifest line, strictly in page order.
///
/// Returns how many pages were new to the store.
pub(crate) async fn store_pages<S, W>(
    pages: S,
    store: &ContentStore,
    manifest: &mut ManifestWriter<W>,
    progress: &mut Progress<'_>,
) -> Result<u64>
where
    S: Stream<Item = litevault_snapshot::error::Result<Page>>,
    W: AsyncWrite + Unpin,
{
    let mut pages = std::pin::pin!(pages);
    let mut written_new = 0;
    while let Some(page) = pages.next().await {
        let page = page.or_raise(|| ErrorKind::Acquisition)?;
        let put = store.put(&page.bytes).await.or_raise(|| ErrorKind::StorageIo)?;
        if put.written_new {
            written_new += 1;
        }
        tracing::trace!(index = page.index, id = %put.id, written_new = put.written_new, "page stored");
        manifest.append(&put.id).await.or_raise(|| ErrorKind::StorageIo)?;
        progress.advance().await;
    }
    Ok(written_new)
}

async fn remove_partial(path: &Path) {
    if let Err(e) = tokio::fs::remove_file(path).await
        && e.kind() != std::io::ErrorKind::NotFound
    {
        tracing::warn!(path = %path.display(), error = %e, "could not remove partial manifest");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logger::{Level, MemoryLogger};
    use crate::tests::{context, count_rows};
    use crate::verify::{reassemble, verify_manifest};
    use litevault_config::ProgressConfig;
    use litevault_snapshot::{Geometry, read_pages};
    use litevault_storage::backend::MockBackend;
    use litevault_storage::{ObjectId, read_manifest};
    use std::sync::Arc;

    const PAGE: usize = 4096;
    const NO_PAUSE: ProgressConfig = ProgressConfig { steps: 10, pause_ms: 0 };

    /// `count` pages, each filled with a byte pattern unique to its index.
    fn distinct_pages(count: usize) -> Vec<Vec<u8>> {
        (0..count)
            .map(|i| {
                let mut page = vec![(i % 251) as u8; PAGE];
                page[..8].copy_from_slice(&(i as u64).to_le_bytes());
                page
            })
            .collect()
    }

    /// Run the page loop over a synthetic file made of `pages`.
    async fn chunk(dir: &Path, pages: &[Vec<u8>], store: &ContentStore) -> (u64, Vec<ObjectId>) {
        let file = dir.join("snapshot.sqlite");
        std::fs::write(&file, pages.concat()).unwrap();
        let geometry = Geometry {
            page_size: PAGE as u32,
            page_count: pages.len() as u64,
        };
        let manifest_path = dir.join("out.snapshot");
        let _ = std::fs::remove_file(&manifest_path);

        let logger = MemoryLogger::new();
        let mut manifest = ManifestWriter::create(&manifest_path, STORE_DIR).await.unwrap();
        let mut progress = Progress::start(&logger, geometry.page_count, &NO_PAUSE);
        let written = store_pages(read_pages(&file, geometry), store, &mut manifest, &mut progress).await.unwrap();
        let summary = manifest.finish().await.unwrap();

        let ids = read_manifest(&manifest_path).await.unwrap();
        assert_eq!(summary.lines, pages.len() as u64);
        (written, ids)
    }

    #[tokio::test]
    async fn test_fresh_store_writes_every_page() {
        let dir = tempfile::tempdir().unwrap();
        let store = ContentStore::local(dir.path().join(STORE_DIR)).await.unwrap();
        let pages = distinct_pages(100);

        let (written, ids) = chunk(dir.path(), &pages, &store).await;
        assert_eq!(written, 100);
        assert_eq!(ids.len(), 100);
        let stats = Statistics {
            pages_total: 100,
            pages_written_new: written,
            page_size: PAGE as u32,
            manifest_bytes: 0,
        };
        assert_eq!(stats.bytes_added_to_store(), 409_600);
    }

    #[tokio::test]
    async fn test_prestored_pages_are_not_rewritten() {
        let dir = tempfile::tempdir().unwrap();
        let store = ContentStore::local(dir.path().join(STORE_DIR)).await.unwrap();
        let pages = distinct_pages(100);
        for page in &pages[..30] {
            assert!(store.put(page).await.unwrap().written_new);
        }

        let (written, ids) = chunk(dir.path(), &pages, &store).await;
        assert_eq!(written, 70);
        assert_eq!(ids.len(), 100);
    }

    #[tokio::test]
    async fn test_duplicate_pages_share_one_object() {
        let dir = tempfile::tempdir().unwrap();
        let store = ContentStore::local(dir.path().join(STORE_DIR)).await.unwrap();
        let mut pages = distinct_pages(20);
        pages[17] = pages[3].clone();

        let (written, ids) = chunk(dir.path(), &pages, &store).await;
        assert_eq!(written, 19);
        assert_eq!(ids[3], ids[17]);
        let text = std::fs::read_to_string(dir.path().join("out.snapshot")).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[3], lines[17]);
    }

    #[tokio::test]
    async fn test_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let store = ContentStore::local(dir.path().join(STORE_DIR)).await.unwrap();
        let mut pages = distinct_pages(25);
        pages[10] = pages[2].clone();

        chunk(dir.path(), &pages, &store).await;
        let mut rebuilt = Vec::new();
        let bytes = reassemble(&dir.path().join("out.snapshot"), &store, &mut rebuilt).await.unwrap();
        assert_eq!(bytes, (25 * PAGE) as u64);
        assert_eq!(rebuilt, pages.concat());
    }

    #[tokio::test]
    async fn test_empty_snapshot() {
        let dir = tempfile::tempdir().unwrap();
        let store = ContentStore::local(dir.path().join(STORE_DIR)).await.unwrap();
        let (written, ids) = chunk(dir.path(), &[], &store).await;
        assert_eq!(written, 0);
        assert!(ids.is_empty());
    }

    #[rstest::rstest]
    #[case(false, "manual_")]
    #[case(true, "snap_")]
    #[tokio::test]
    async fn test_end_to_end(#[case] is_scheduled_run: bool, #[case] prefix: &str) {
        let dir = tempfile::tempdir().unwrap();
        let ctx = context(dir.path()).await;
        let logger = MemoryLogger::new();

        let outcome = incremental_backup(&ctx, IncrementalParams { is_scheduled_run }, &logger).await.unwrap();
        assert_eq!(outcome.run.state(), RunState::Done);
        let name = outcome.manifest.file_name().unwrap().to_str().unwrap();
        assert!(name.starts_with(prefix) && name.ends_with(".snapshot"));
        assert!(outcome.manifest.parent().unwrap().ends_with("nas/app.db/incremental backups"));

        let stats = outcome.statistics;
        assert_eq!(stats.page_size, 4096);
        assert!(stats.pages_total > 1);
        assert_eq!(read_manifest(&outcome.manifest).await.unwrap().len() as u64, stats.pages_total);
        assert_eq!(stats.manifest_bytes, std::fs::metadata(&outcome.manifest).unwrap().len());

        // Temporary snapshot is gone; no partial manifest is left behind.
        assert_eq!(std::fs::read_dir(&ctx.config.temp_dir).unwrap().count(), 0);
        let folder = outcome.manifest.parent().unwrap();
        let entries: Vec<_> = std::fs::read_dir(folder).unwrap().map(|e| e.unwrap().file_name()).collect();
        assert_eq!(entries.len(), 2, "{entries:?}");

        // The pages re-assemble into a working copy of the database.
        let report = verify_manifest(&outcome.manifest).await.unwrap();
        assert!(report.is_intact());
        let store = ContentStore::local(folder.join(STORE_DIR)).await.unwrap();
        let restored = dir.path().join("restored.db");
        let mut file = tokio::fs::File::create(&restored).await.unwrap();
        reassemble(&outcome.manifest, &store, &mut file).await.unwrap();
        drop(file);
        assert_eq!(count_rows(&restored).await, count_rows(ctx.source()).await);

        let lines = logger.messages(Level::Info);
        assert_eq!(lines.first().unwrap(), &format!("Source Database: {}", ctx.source().display()));
        assert_eq!(lines.last().unwrap(), "All done.");
        assert!(lines.contains(&"Writing to 'storage' folder finished (100% done)".to_string()));
        assert!(logger.messages(Level::Error).is_empty());
    }

    #[tokio::test]
    async fn test_second_run_reuses_pages() {
        let dir = tempfile::tempdir().unwrap();
        let ctx = context(dir.path()).await;
        let logger = MemoryLogger::new();

        let first = incremental_backup(&ctx, IncrementalParams::default(), &logger).await.unwrap();
        // Distinct timestamps for the two manifests.
        tokio::time::sleep(std::time::Duration::from_millis(5)).await;
        let second = incremental_backup(&ctx, IncrementalParams::default(), &logger).await.unwrap();
        assert_ne!(first.manifest, second.manifest);
        assert_eq!(second.statistics.pages_total, first.statistics.pages_total);
        // At most the header page differs between two copies of an unchanged database.
        assert!(second.statistics.pages_written_new <= 1);
    }

    #[tokio::test]
    async fn test_missing_source_creates_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let mut ctx = context(dir.path()).await;
        ctx.config.source = dir.path().join("missing.db");
        let logger = MemoryLogger::new();

        let err = incremental_backup(&ctx, IncrementalParams::default(), &logger).await.unwrap_err();
        assert!(matches!(&*err, ErrorKind::SourceNotFound(_)));
        assert!(!dir.path().join("backups").exists());
        assert!(!ctx.config.temp_dir.exists());
        assert_eq!(logger.messages(Level::Error).len(), 1);
    }

    #[tokio::test]
    async fn test_not_a_database() {
        let dir = tempfile::tempdir().unwrap();
        let mut ctx = context(dir.path()).await;
        ctx.config.source = dir.path().join("notes.txt");
        std::fs::write(&ctx.config.source, "plain text, not a database\n".repeat(256)).unwrap();
        let logger = MemoryLogger::new();

        let err = incremental_backup(&ctx, IncrementalParams::default(), &logger).await.unwrap_err();
        assert!(matches!(&*err, ErrorKind::Acquisition));
        assert_eq!(std::fs::read_dir(&ctx.config.temp_dir).map(|d| d.count()).unwrap_or(0), 0);
        let folder = ctx.begin(RunKind::Incremental).destination;
        let manifests = std::fs::read_dir(folder)
            .unwrap()
            .filter(|e| e.as_ref().unwrap().path().is_file())
            .count();
        assert_eq!(manifests, 0);

        let errors = logger.messages(Level::Error);
        assert_eq!(errors.len(), 1);
        assert!(errors[0].starts_with("incremental backup failed: could not acquire a consistent snapshot: "));
    }

    #[tokio::test]
    async fn test_storage_failure() {
        let dir = tempfile::tempdir().unwrap();
        let ctx = context(dir.path()).await;
        let logger = MemoryLogger::new();
        let store = ContentStore::new(Arc::new(MockBackend::new().fail_writes_after(3)));

        let err = incremental_backup_to(&ctx, IncrementalParams::default(), &store, &logger).await.unwrap_err();
        assert!(matches!(&*err, ErrorKind::StorageIo));
        assert_eq!(logger.messages(Level::Error).len(), 1);
        // Neither the temporary snapshot nor a manifest survive the failure.
        assert_eq!(std::fs::read_dir(&ctx.config.temp_dir).unwrap().count(), 0);
        let folder = ctx.begin(RunKind::Incremental).destination;
        assert_eq!(std::fs::read_dir(folder).unwrap().count(), 0);
    }
}
