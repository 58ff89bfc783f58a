//! Path validation for store-relative paths.

use std::path::{Component, Path, PathBuf};

use crate::error::{ErrorKind, Result};

/// Validates a path relative to a backend root, returning it normalized.
///
/// Rejects anything that would escape the root (`..` past the top), Windows
/// prefixes, null bytes, and paths that normalize to nothing. `.` segments,
/// duplicate separators and a leading `/` are dropped.
///
/// # Examples
///
/// ```
/// use std::path::Path;
/// use litevault_storage::validate_path;
///
/// assert_eq!(validate_path("a//bc/./def").unwrap(), Path::new("a/bc/def"));
/// assert!(validate_path("../outside").is_err());
/// assert!(validate_path("a\0b").is_err());
/// ```
pub fn validate(path: impl AsRef<Path>) -> Result<PathBuf> {
    let original = path.as_ref();
    let invalid = || ErrorKind::InvalidPath(original.to_path_buf());
    let mut components = Vec::new();
    for component in original.components() {
        match component {
            Component::Normal(s) if s.as_encoded_bytes().contains(&0) => exn::bail!(invalid()),
            Component::Normal(s) => components.push(s),
            Component::CurDir | Component::RootDir => {},
            Component::Prefix(_) => exn::bail!(invalid()),
            Component::ParentDir => {
                if components.pop().is_none() {
                    exn::bail!(invalid());
                }
            },
        }
    }
    if components.is_empty() {
        exn::bail!(invalid());
    }
    Ok(components.into_iter().collect())
}
