//! Compression CLI Helpers
//!
//! Resolves a `--compress[=FORMAT]` command-line flag against the configured
//! default format.

use crate::Compression;
use crate::error::Error;
use std::str::FromStr;

/// Shape of an optional flag with an optional value, as produced by
/// `clap` for `#[arg(long, num_args = 0..=1)] compress: Option<Option<String>>`.
pub type Flag = Option<Option<String>>;

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Preference {
    /// Compression format was specified on the command-line
    Explicit(Compression),
    /// Compression flag was enabled on the command-line, but no format was specified
    Implicit,
    /// Compression was omitted from the command-line
    NotSpecified,
}
impl TryFrom<Flag> for Preference {
    type Error = Error;
    fn try_from(value: Flag) -> Result<Self, Self::Error> {
        match value {
            Some(Some(s)) if s.is_empty() => Ok(Self::Implicit),
            Some(Some(s)) => Ok(Self::Explicit(Compression::from_str(&s)?)),
            Some(None) => Ok(Self::Implicit),
            None => Ok(Self::NotSpecified),
        }
    }
}
impl Preference {
    /// The format a full backup should use.
    ///
    /// An implicit flag falls back to the configured format; if that is
    /// itself [`Compression::None`] the flag would be meaningless, so LZ4 is
    /// used instead. Omitting the flag means an uncompressed backup.
    pub fn resolve(&self, configured: Compression) -> Compression {
        match self {
            Self::Explicit(c) => *c,
            Self::Implicit if configured == Compression::None => Compression::Lz4,
            Self::Implicit => configured,
            Self::NotSpecified => Compression::None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(None, Preference::NotSpecified)]
    #[case(Some(None), Preference::Implicit)]
    #[case(Some(Some(String::new())), Preference::Implicit)]
    #[case(Some(Some("lz4".to_string())), Preference::Explicit(Compression::Lz4))]
    #[case(Some(Some("gzip".to_string())), Preference::Explicit(Compression::Gzip))]
    #[case(Some(Some("none".to_string())), Preference::Explicit(Compression::None))]
    fn test_construct(#[case] flag: Flag, #[case] expected: Preference) {
        let preference: Preference = flag.try_into().unwrap();
        assert_eq!(preference, expected);
    }

    #[test]
    fn test_construct_invalid() {
        let flag = Some(Some("definitely not valid".to_string()));
        let preference: Result<Preference, Error> = flag.try_into();
        assert!(preference.is_err());
    }

    #[rstest]
    #[case(Preference::Explicit(Compression::Gzip), Compression::Lz4, Compression::Gzip)]
    #[case(Preference::Explicit(Compression::None), Compression::Lz4, Compression::None)]
    #[case(Preference::Implicit, Compression::Bzip2, Compression::Bzip2)]
    #[case(Preference::Implicit, Compression::None, Compression::Lz4)]
    #[case(Preference::NotSpecified, Compression::Lz4, Compression::None)]
    fn test_resolve(#[case] preference: Preference, #[case] configured: Compression, #[case] expected: Compression) {
        assert_eq!(preference.resolve(configured), expected);
    }
}
