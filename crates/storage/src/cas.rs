//! Content-addressed page store.

use crate::backend::LocalBackend;
use crate::error::{ErrorKind, Result};
use crate::BackendHandle;
use sha2::{Digest, Sha256};
use std::fmt::{Display, Formatter, Result as FmtResult};
use std::path::{Component, Path, PathBuf};
use std::str::FromStr;
use std::sync::Arc;
use tracing::instrument;

const HEX_LEN: usize = 64;

/// SHA-256 digest of an object's content, rendered as lowercase hex.
///
/// The first character names the shard directory, the remaining 63 the file
/// inside it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObjectId(String);

impl ObjectId {
    /// Hash `bytes`.
    pub fn of(bytes: &[u8]) -> Self {
        Self(format!("{:x}", Sha256::digest(bytes)))
    }

    /// Full hex digest.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Shard directory: the first hex character.
    pub fn shard(&self) -> &str {
        &self.0[..1]
    }

    /// File name inside the shard: the remaining hex characters.
    pub fn object_name(&self) -> &str {
        &self.0[1..]
    }

    /// Location relative to the store root (`<shard>/<object_name>`).
    pub fn location(&self) -> PathBuf {
        Path::new(self.shard()).join(self.object_name())
    }

    /// Recover an id from a store location.
    ///
    /// Only the last two components are significant, so relative locations
    /// (`a/bcd…`), manifest lines (`storage/a/bcd…`) and absolute paths all
    /// resolve to the same object.
    pub fn from_location(location: impl AsRef<Path>) -> Result<Self> {
        let location = location.as_ref();
        let invalid = || ErrorKind::InvalidObjectId(location.display().to_string());
        let mut normal = location.components().rev().filter_map(|c| match c {
            Component::Normal(s) => s.to_str(),
            _ => None,
        });
        let (Some(object_name), Some(shard)) = (normal.next(), normal.next()) else {
            exn::bail!(invalid());
        };
        if shard.len() != 1 {
            exn::bail!(invalid());
        }
        format!("{shard}{object_name}").parse().map_err(|_| invalid().into())
    }
}

impl FromStr for ObjectId {
    type Err = crate::error::Error;
    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        if s.len() != HEX_LEN || !s.bytes().all(|b| matches!(b, b'0'..=b'9' | b'a'..=b'f')) {
            exn::bail!(ErrorKind::InvalidObjectId(s.to_string()));
        }
        Ok(Self(s.to_string()))
    }
}

impl Display for ObjectId {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.write_str(&self.0)
    }
}

/// Outcome of [`ContentStore::put`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Put {
    pub id: ObjectId,
    /// `false` when the object was already present (a dedup hit).
    pub written_new: bool,
}

/// Result of checking one object against its name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ObjectState {
    Present,
    Missing,
    /// The file exists but its content no longer hashes to its name.
    Corrupt,
}

/// Append-only, content-addressed object store.
///
/// Objects are immutable once written and are never deleted by this crate.
/// Many runs (and processes) may share one store without coordination:
/// identical content always maps to the identical object, so whichever writer
/// gets there first, the result is the same.
#[derive(Clone)]
pub struct ContentStore {
    backend: BackendHandle,
}

impl ContentStore {
    pub fn new(backend: BackendHandle) -> Self {
        Self { backend }
    }

    /// Store rooted at a local directory (created if missing). Relative roots
    /// are resolved against the current directory.
    pub async fn local(root: impl AsRef<Path>) -> Result<Self> {
        let root = std::path::absolute(root.as_ref()).map_err(ErrorKind::Io)?;
        Ok(Self::new(Arc::new(LocalBackend::new("store", root).await?)))
    }

    /// Store `bytes`, unless an object with the same content already exists.
    #[instrument(level = "trace", skip_all, fields(backend = self.backend.name(), size = bytes.len(), id, written_new))]
    pub async fn put(&self, bytes: &[u8]) -> Result<Put> {
        let id = ObjectId::of(bytes);
        let location = id.location();
        tracing::Span::current().record("id", id.as_str());
        // `write_new` re-checks existence itself; checking here first keeps
        // the common dedup hit to a single metadata call.
        let written_new = if self.backend.exists(&location).await? {
            false
        } else {
            self.backend.write_new(&location, bytes).await?
        };
        tracing::Span::current().record("written_new", written_new);
        Ok(Put { id, written_new })
    }

    /// Read an object's bytes.
    pub async fn get(&self, id: &ObjectId) -> Result<Vec<u8>> {
        self.backend.read(&id.location()).await
    }

    pub async fn contains(&self, id: &ObjectId) -> Result<bool> {
        self.backend.exists(&id.location()).await
    }

    /// Check that an object exists and still hashes to its own name.
    pub async fn check(&self, id: &ObjectId) -> Result<ObjectState> {
        match self.backend.read(&id.location()).await {
            Ok(bytes) if ObjectId::of(&bytes) == *id => Ok(ObjectState::Present),
            Ok(_) => Ok(ObjectState::Corrupt),
            Err(e) if matches!(&*e, ErrorKind::NotFound(_)) => Ok(ObjectState::Missing),
            Err(e) => Err(e),
        }
    }
}
