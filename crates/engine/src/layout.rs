use litevault_config::Layout;
use std::path::{Path, PathBuf};

/// The two kinds of backup run; each has its own folder at the bottom of the
/// layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, derive_more::Display)]
pub enum RunKind {
    #[display("full")]
    Full,
    #[display("incremental")]
    Incremental,
}

impl RunKind {
    pub fn folder_name(&self) -> &'static str {
        match self {
            Self::Full => "full backups",
            Self::Incremental => "incremental backups",
        }
    }
}

/// Build `root/[year]/[host name]/[database name]/<kind folder>`.
///
/// Segments are inserted in that order whenever their toggle is set. No I/O.
pub fn compose(root: &Path, layout: &Layout, year: &str, host_name: &str, database_name: &str, kind: RunKind) -> PathBuf {
    let mut path = root.to_path_buf();
    if layout.include_year {
        path.push(year);
    }
    if layout.include_host_name {
        path.push(host_name);
    }
    if layout.include_database_name {
        path.push(database_name);
    }
    path.push(kind.folder_name());
    path
}
