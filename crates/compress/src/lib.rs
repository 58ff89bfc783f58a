//! Compression for full database backups.
//!
//! A full backup is a flat copy of the source database which may optionally be
//! compressed as a whole. This crate wraps the supported compression libraries
//! behind a single [`Compression`] enum, providing:
//!
//! - **Parsing** from configuration and command-line names (`"lz4"`, `"gz"`)
//! - **In-memory** compression/decompression ([`Compression::compress`],
//!   [`Compression::decompress`])
//! - **Whole-file** compression that only removes the original once the
//!   compressed copy is safely on disk ([`Compression::compress_file`])
//!
//! LZ4 (frame format), Gzip and Bzip2 are always available; Zstd is behind the
//! `zstd` feature flag.

#[cfg(feature = "cli")]
pub mod cli;
mod construct;
pub mod error;
mod file;
mod ops;
mod util;

/// A supported compression format.
///
/// Defaults to [`None`](Self::None) (uncompressed).
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum Compression {
    /// Uncompressed
    #[default]
    None,
    /// LZ4 frame format (.lz4)
    Lz4,
    /// Gzip compression (.gz)
    Gzip,
    /// Bzip2 compression (.bz2)
    Bzip2,
    /// Zstd compression (.zst)
    #[cfg(feature = "zstd")]
    Zstd,
}
