use crate::Compression;
use std::fmt::{Display, Formatter, Result as FmtResult};

impl Display for Compression {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        write!(f, "{}", self.as_str())
    }
}

impl Compression {
    /// Returns the file extension (including the leading dot) appended to
    /// files compressed with this format.
    #[inline]
    #[must_use]
    pub fn extension(&self) -> &'static str {
        match self {
            Compression::None => "",
            Compression::Lz4 => ".lz4",
            Compression::Gzip => ".gz",
            Compression::Bzip2 => ".bz2",
            #[cfg(feature = "zstd")]
            Compression::Zstd => ".zst",
        }
    }

    /// Returns the short name used in configuration files and log output.
    #[inline]
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Compression::None => "none",
            Compression::Lz4 => "lz4",
            Compression::Gzip => "gzip",
            Compression::Bzip2 => "bzip2",
            #[cfg(feature = "zstd")]
            Compression::Zstd => "zstd",
        }
    }

    /// Human-readable label for run logs (`"LZ4 Compression"`, `"Uncompressed"`).
    #[must_use]
    pub fn describe(&self) -> &'static str {
        match self {
            Compression::None => "Uncompressed",
            Compression::Lz4 => "LZ4 Compression",
            Compression::Gzip => "Gzip Compression",
            Compression::Bzip2 => "Bzip2 Compression",
            #[cfg(feature = "zstd")]
            Compression::Zstd => "Zstd Compression",
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::Compression;
    use rstest::rstest;

    #[rstest]
    #[case(Compression::None, "")]
    #[case(Compression::Lz4, ".lz4")]
    #[case(Compression::Gzip, ".gz")]
    #[case(Compression::Bzip2, ".bz2")]
    #[cfg_attr(feature = "zstd", case(Compression::Zstd, ".zst"))]
    fn test_extension(#[case] format: Compression, #[case] expected: &str) {
        assert_eq!(format.extension(), expected);
    }
}
