//! Full backups: a complete, optionally compressed copy of the database.

use crate::error::{ErrorKind, Result};
use crate::layout::RunKind;
use crate::logger::RunLogger;
use crate::run::{BackupRun, Context, RunState};
use exn::ResultExt;
use litevault_compress::Compression;
use std::path::PathBuf;
use tracing::instrument;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FullParams {
    /// `None` (or `Some(Compression::None)`) keeps the backup uncompressed.
    pub compress: Option<Compression>,
}

#[derive(Debug, Clone)]
pub struct FullOutcome {
    /// The final backup file, compressed or not.
    pub path: PathBuf,
    pub compression: Compression,
    pub run: BackupRun,
}

/// Copy the source database into `backup_<timestamp>.sqlite` in the run's
/// `full backups` folder, then optionally compress it in place.
///
/// If compression fails the uncompressed backup is kept.
#[instrument(skip_all, fields(source = %ctx.source().display()))]
pub async fn full_backup(ctx: &Context, params: FullParams, logger: &dyn RunLogger) -> Result<FullOutcome> {
    crate::check_source(ctx, logger).await?;
    execute(ctx, params, logger, ctx.begin(RunKind::Full)).await
}

async fn execute(ctx: &Context, params: FullParams, logger: &dyn RunLogger, mut run: BackupRun) -> Result<FullOutcome> {
    match full_backup_inner(ctx, params, logger, &mut run).await {
        Ok(path) => Ok(FullOutcome {
            path,
            compression: params.compress.unwrap_or_default(),
            run,
        }),
        Err(e) => Err(crate::fail(&mut run, logger, e)),
    }
}

async fn full_backup_inner(
    ctx: &Context,
    params: FullParams,
    logger: &dyn RunLogger,
    run: &mut BackupRun,
) -> Result<PathBuf> {
    let compression = params.compress.unwrap_or_default();
    let target = run.destination.join(format!("backup_{}.sqlite", run.time.stamp()));

    logger.info(&format!("Source Database: {}", ctx.source().display()));
    logger.info(&format!("Mode: {}", compression.describe()));
    logger.info(&format!("Starting the full backup into {}", run.destination.display()));

    run.transition(RunState::AcquiringSnapshot);
    let snapshot = litevault_snapshot::acquire(ctx.source(), &target, ctx.config.full.strategy)
        .await
        .or_raise(|| ErrorKind::Acquisition)?;
    let backup = snapshot.persist();

    if compression == Compression::None {
        run.transition(RunState::Done);
        logger.info(&format!("Full backup successfully created: {}", backup.display()));
        return Ok(backup);
    }

    logger.info("Backup created");
    logger.info(&format!("Starting compression ({}) ...", compression.as_str().to_uppercase()));
    run.transition(RunState::Compressing);
    let compressed = tokio::task::spawn_blocking(move || compression.compress_file(&backup))
        .await
        .or_raise(|| ErrorKind::Compression)?
        .or_raise(|| ErrorKind::Compression)?;
    run.transition(RunState::Done);
    logger.info(&format!(
        "Full compressed ({}) backup successfully created: {}",
        compression.as_str().to_uppercase(),
        compressed.display()
    ));
    Ok(compressed)
}
