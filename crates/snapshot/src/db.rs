//! Connections to source and snapshot databases.

use crate::error::{ErrorKind, Result};
use exn::ResultExt;
use sqlx::sqlite::SqliteConnectOptions;
use sqlx::{Connection, SqliteConnection};
use std::path::Path;
use std::time::Duration;
use tracing::instrument;

/// How long a statement waits on another process's lock before giving up
/// with SQLITE_BUSY.
pub(crate) const BUSY_TIMEOUT: Duration = Duration::from_millis(1500);

/// Page size and page count of a database, as SQLite reports them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Geometry {
    pub page_size: u32,
    pub page_count: u64,
}

impl Geometry {
    /// Expected length of the database file in bytes.
    pub fn file_len(&self) -> u64 {
        self.page_count * u64::from(self.page_size)
    }
}

/// Options for opening an existing database read-only, without ever
/// creating one.
fn options(path: &Path) -> SqliteConnectOptions {
    SqliteConnectOptions::new()
        .filename(path)
        .create_if_missing(false)
        .read_only(true)
        // A live source may be mid-write by its owner; wait rather than fail.
        .busy_timeout(BUSY_TIMEOUT)
}

pub(crate) async fn connect(path: &Path) -> Result<SqliteConnection> {
    SqliteConnection::connect_with(&options(path)).await.or_raise(|| ErrorKind::Database)
}

/// Query `PRAGMA page_size` and `PRAGMA page_count`.
pub async fn geometry(path: impl AsRef<Path>) -> Result<Geometry> {
    let mut conn = connect(path.as_ref()).await?;
    let (page_size,): (i64,) = sqlx::query_as("PRAGMA page_size")
        .fetch_one(&mut conn)
        .await
        .or_raise(|| ErrorKind::Database)?;
    let (page_count,): (i64,) = sqlx::query_as("PRAGMA page_count")
        .fetch_one(&mut conn)
        .await
        .or_raise(|| ErrorKind::Database)?;
    conn.close().await.or_raise(|| ErrorKind::Database)?;
    let page_size = u32::try_from(page_size).or_raise(|| ErrorKind::Corrupt(format!("page size {page_size}")))?;
    let page_count = u64::try_from(page_count).or_raise(|| ErrorKind::Corrupt(format!("page count {page_count}")))?;
    if page_size == 0 {
        exn::bail!(ErrorKind::Corrupt("page size 0".to_string()));
    }
    Ok(Geometry { page_size, page_count })
}

/// Export `source` into the (not yet existing) file `target` with
/// `VACUUM INTO`, inside a single read transaction.
#[instrument(level = "debug", skip_all, fields(source = %source.display(), target = %target.display()))]
pub(crate) async fn vacuum_into(source: &Path, target: &Path) -> Result<()> {
    let target_str = target.to_str().ok_or_else(|| ErrorKind::InvalidPath(target.to_path_buf()))?;
    let mut conn = connect(source).await?;
    sqlx::query("VACUUM INTO ?")
        .bind(target_str)
        .execute(&mut conn)
        .await
        .or_raise(|| ErrorKind::Database)?;
    conn.close().await.or_raise(|| ErrorKind::Database)?;
    Ok(())
}
