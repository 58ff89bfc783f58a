//! Backup runs for live SQLite databases.
//!
//! Two entry points, both driven by a [`Context`] built once per process:
//!
//! - [`full_backup`] copies the database into `full backups/` and optionally
//!   compresses the copy.
//! - [`incremental_backup`] splits a snapshot of the database into pages,
//!   stores each distinct page once under `incremental backups/storage/` and
//!   writes a manifest listing every page in order.
//!
//! Both report human-readable progress through a [`RunLogger`] and return a
//! typed outcome or error; neither exits the process or schedules anything.
//!
//! # Destination layout
//!
//! ```text
//! <backup_dir>/[year]/[host name]/[database name]/
//!     full backups/
//!         backup_2024-05-01T18.30.12.345+02.00.sqlite.lz4
//!     incremental backups/
//!         manual_2024-05-01T18.30.12.345+02.00.snapshot
//!         storage/
//!             0/3b5d…
//!             f/a41c…
//! ```

pub mod error;
mod full;
mod incremental;
mod layout;
mod logger;
mod progress;
mod run;
mod stats;
mod timestamp;
mod verify;

pub use crate::full::{FullOutcome, FullParams, full_backup};
pub use crate::incremental::{IncrementalOutcome, IncrementalParams, incremental_backup, incremental_backup_to};
pub use crate::layout::{RunKind, compose as compose_destination};
pub use crate::logger::{Level, MemoryLogger, RunLogger, TracingLogger};
pub use crate::run::{BackupRun, Context, RunState};
pub use crate::stats::Statistics;
pub use crate::timestamp::RunTime;
pub use crate::verify::{VerifyReport, reassemble, verify_manifest, verify_manifest_in};

use crate::error::{Error, ErrorKind, Result};
use exn::Exn;

/// Fail before anything at the destination is touched if the source is gone.
///
/// A source that cannot even be checked (permissions, I/O) is reported as
/// [`ErrorKind::Acquisition`] rather than as missing.
pub(crate) async fn check_source(ctx: &Context, logger: &dyn RunLogger) -> Result<()> {
    let source = ctx.source();
    let err = match tokio::fs::try_exists(source).await {
        Ok(true) => return Ok(()),
        Ok(false) => Error::from(ErrorKind::SourceNotFound(source.to_path_buf())),
        Err(e) => Exn::new(e).raise(ErrorKind::Acquisition),
    };
    logger.error(&describe(&err));
    Err(err)
}

/// Mark `run` as failed and send the one terminal error entry to the logger.
pub(crate) fn fail(run: &mut BackupRun, logger: &dyn RunLogger, err: Error) -> Error {
    run.transition(RunState::Failed);
    tracing::error!(kind = %run.kind, error = ?err, "backup run failed");
    logger.error(&format!("{} backup failed: {}", run.kind, describe(&err)));
    err
}

/// The error's kind, followed by its deepest cause when it has one
/// (`could not acquire a consistent snapshot: file is not a database`).
pub(crate) fn describe(err: &Error) -> String {
    let mut frame = err.frame();
    while let Some(child) = frame.children().first() {
        frame = child;
    }
    if std::ptr::eq(frame, err.frame()) {
        return (**err).to_string();
    }
    format!("{}: {}", &**err, frame.error())
}
