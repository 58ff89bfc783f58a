//! SQLite online-backup API.
//!
//! sqlx does not wrap `sqlite3_backup_*`, so this module drives it through the
//! same `libsqlite3-sys` build that sqlx links. Everything here is blocking and
//! runs on tokio's blocking pool.

use crate::db::BUSY_TIMEOUT;
use crate::error::{ErrorKind, Result};
use exn::ResultExt;
use libsqlite3_sys as ffi;
use std::ffi::{CStr, CString};
use std::os::raw::c_int;
use std::path::{Path, PathBuf};
use std::ptr::{self, NonNull};
use tracing::instrument;

/// Milliseconds to back off when the source is busy or locked mid-copy.
const RETRY_SLEEP_MS: c_int = 100;
/// Copy everything in a single step; the snapshot must reflect one point in
/// time, and a step that hits a lock is simply retried.
const ALL_PAGES: c_int = -1;

/// An open `sqlite3*`, closed on drop.
struct RawConnection(NonNull<ffi::sqlite3>);

impl RawConnection {
    fn open(path: &Path, flags: c_int) -> Result<Self> {
        let name = path.to_str().ok_or_else(|| ErrorKind::InvalidPath(path.to_path_buf()))?;
        let name = CString::new(name).map_err(|_| ErrorKind::InvalidPath(path.to_path_buf()))?;
        let mut handle: *mut ffi::sqlite3 = ptr::null_mut();
        // SAFETY: `name` is a valid NUL-terminated string and `handle` a valid
        // out-pointer. SQLite may hand back a handle even on failure, which
        // must still be closed.
        let rc = unsafe { ffi::sqlite3_open_v2(name.as_ptr(), &mut handle, flags, ptr::null()) };
        let Some(handle) = NonNull::new(handle) else {
            exn::bail!(ErrorKind::OnlineBackup(format!("cannot allocate connection (code {rc})")));
        };
        let conn = Self(handle);
        if rc != ffi::SQLITE_OK {
            exn::bail!(ErrorKind::OnlineBackup(conn.message()));
        }
        // SAFETY: the handle is open.
        unsafe { ffi::sqlite3_busy_timeout(conn.0.as_ptr(), BUSY_TIMEOUT.as_millis() as c_int) };
        Ok(conn)
    }

    fn message(&self) -> String {
        // SAFETY: `sqlite3_errmsg` always returns a valid string owned by the
        // connection, which outlives this call.
        unsafe { CStr::from_ptr(ffi::sqlite3_errmsg(self.0.as_ptr())) }
            .to_string_lossy()
            .into_owned()
    }
}

impl Drop for RawConnection {
    fn drop(&mut self) {
        // SAFETY: the handle is open and every backup object using it has
        // already been finished.
        unsafe { ffi::sqlite3_close(self.0.as_ptr()) };
    }
}

/// Copy `source` into a new database at `target` with the online-backup API.
#[instrument(level = "debug", skip_all, fields(source = %source.display(), target = %target.display(), retries))]
pub(crate) fn backup(source: &Path, target: &Path) -> Result<()> {
    let src = RawConnection::open(source, ffi::SQLITE_OPEN_READONLY)?;
    let dst = RawConnection::open(target, ffi::SQLITE_OPEN_READWRITE | ffi::SQLITE_OPEN_CREATE)?;

    // SAFETY: both handles are open and distinct; "main" is NUL-terminated.
    let job = unsafe { ffi::sqlite3_backup_init(dst.0.as_ptr(), c"main".as_ptr(), src.0.as_ptr(), c"main".as_ptr()) };
    if job.is_null() {
        exn::bail!(ErrorKind::OnlineBackup(dst.message()));
    }

    let mut retries = 0u32;
    let step = loop {
        // SAFETY: `job` is a live backup object until finished below.
        match unsafe { ffi::sqlite3_backup_step(job, ALL_PAGES) } {
            ffi::SQLITE_OK => continue,
            ffi::SQLITE_BUSY | ffi::SQLITE_LOCKED => {
                retries += 1;
                // SAFETY: plain sleep, no pointers involved.
                unsafe { ffi::sqlite3_sleep(RETRY_SLEEP_MS) };
            },
            rc => break rc,
        }
    };
    tracing::Span::current().record("retries", retries);

    // SAFETY: finishing releases `job`; it is not used afterwards.
    let finish = unsafe { ffi::sqlite3_backup_finish(job) };
    if step != ffi::SQLITE_DONE || finish != ffi::SQLITE_OK {
        exn::bail!(ErrorKind::OnlineBackup(format!("{} (code {step})", dst.message())));
    }
    Ok(())
}

/// Run [`backup`] on the blocking pool.
pub(crate) async fn backup_async(source: &Path, target: &Path) -> Result<()> {
    let (source, target): (PathBuf, PathBuf) = (source.to_path_buf(), target.to_path_buf());
    tokio::task::spawn_blocking(move || backup(&source, &target))
        .await
        .or_raise(|| ErrorKind::OnlineBackup("backup task aborted".to_string()))?
}
