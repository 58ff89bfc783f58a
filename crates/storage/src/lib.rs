//! On-disk storage for incremental backups.
//!
//! An incremental backup folder holds two things:
//!
//! - a **content-addressed store** ([`ContentStore`]) under `storage/`, where
//!   every distinct database page is written exactly once, named by its
//!   SHA-256 digest and sharded by the first hex character, and
//! - one **manifest** per run ([`ManifestWriter`]), listing the store
//!   location of every page of the snapshot in page order.
//!
//! The store is append-only and shared between runs (and processes) without
//! locking: writing the same content twice always produces the same object.

pub mod backend;
mod cas;
pub mod error;
mod manifest;
mod path;

pub use crate::backend::StorageBackend;
pub use crate::cas::{ContentStore, ObjectId, ObjectState, Put};
pub use crate::manifest::{ManifestSummary, ManifestWriter, parse_manifest, read_manifest};
pub use crate::path::validate as validate_path;
use std::sync::Arc;

pub type BackendHandle = Arc<dyn StorageBackend + Send + Sync>;

/// Name of the store directory inside an incremental backup folder, and the
/// prefix of every manifest line.
pub const STORE_DIR: &str = "storage";
