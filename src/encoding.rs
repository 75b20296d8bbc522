//! Text encodings for templates and output files.
//!
//! Encoding names arrive as free-form strings from configuration and from
//! template calls. Resolution follows these rules:
//!
//! - absent, empty, `8859-1` and `8859_1` mean "no special encoding" and map
//!   to [`Encoding::PlatformDefault`] (UTF-8)
//! - `UTF-8` / `UTF8` map to [`Encoding::Utf8`]
//! - `ISO-8859-1`, `ISO8859-1`, `ISO8859_1`, `ISO_8859_1`, `LATIN1`,
//!   `LATIN-1` map to [`Encoding::Latin1`]
//!
//! Named encodings match case-insensitively. Anything else, `windows-1252`
//! and `UTF-16` included, is rejected with [`UnsupportedEncoding`].

use std::borrow::Cow;
use thiserror::Error;

/// Encoding names treated as "no special encoding".
pub const DEFAULT_ENCODING_ALIASES: [&str; 2] = ["8859-1", "8859_1"];

/// An encoding name that could not be resolved.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("Unsupported encoding: '{name}'")]
pub struct UnsupportedEncoding {
    pub name: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Encoding {
    /// Platform default text encoding (UTF-8).
    #[default]
    PlatformDefault,
    Utf8,
    Latin1,
}

impl Encoding {
    /// Resolve an optional encoding name.
    pub fn resolve(name: Option<&str>) -> Result<Self, UnsupportedEncoding> {
        let Some(name) = name.map(str::trim).filter(|name| !name.is_empty()) else {
            return Ok(Self::PlatformDefault);
        };

        if DEFAULT_ENCODING_ALIASES.contains(&name) {
            return Ok(Self::PlatformDefault);
        }

        match name.to_ascii_uppercase().as_str() {
            "UTF-8" | "UTF8" => Ok(Self::Utf8),
            "ISO-8859-1" | "ISO8859_1" | "ISO_8859_1" | "ISO8859-1" | "LATIN1" | "LATIN-1" => {
                Ok(Self::Latin1)
            }
            _ => Err(UnsupportedEncoding {
                name: name.to_string(),
            }),
        }
    }

    /// Resolve `explicit` if it names an encoding, else fall back to `fallback`.
    pub fn resolve_with_fallback(
        explicit: Option<&str>,
        fallback: Option<&str>,
    ) -> Result<Self, UnsupportedEncoding> {
        match explicit.filter(|name| !name.trim().is_empty()) {
            Some(name) => Self::resolve(Some(name)),
            None => Self::resolve(fallback),
        }
    }

    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::PlatformDefault => "platform default (UTF-8)",
            Self::Utf8 => "UTF-8",
            Self::Latin1 => "ISO-8859-1",
        }
    }

    /// Decode bytes read from a template or resource.
    ///
    /// UTF-8 decoding is lossy; invalid sequences become U+FFFD.
    #[must_use]
    pub fn decode(self, bytes: &[u8]) -> String {
        match self {
            Self::PlatformDefault | Self::Utf8 => String::from_utf8_lossy(bytes).into_owned(),
            Self::Latin1 => decode_latin1(bytes),
        }
    }

    /// Encode text for an output file.
    ///
    /// Characters outside ISO-8859-1 are written as `?`.
    #[must_use]
    pub fn encode(self, text: &str) -> Cow<'_, [u8]> {
        match self {
            Self::PlatformDefault | Self::Utf8 => Cow::Borrowed(text.as_bytes()),
            Self::Latin1 => Cow::Owned(
                text.chars().map(|c| u8::try_from(u32::from(c)).unwrap_or(b'?')).collect(),
            ),
        }
    }
}

/// Map each byte to the code point of the same value.
#[must_use]
pub fn decode_latin1(bytes: &[u8]) -> String {
    bytes.iter().map(|&b| char::from(b)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_aliases_mean_platform_default() {
        assert_eq!(Encoding::resolve(None).unwrap(), Encoding::PlatformDefault);
        assert_eq!(Encoding::resolve(Some("")).unwrap(), Encoding::PlatformDefault);
        assert_eq!(Encoding::resolve(Some("8859-1")).unwrap(), Encoding::PlatformDefault);
        assert_eq!(Encoding::resolve(Some("8859_1")).unwrap(), Encoding::PlatformDefault);
    }

    #[test]
    fn test_named_encodings() {
        assert_eq!(Encoding::resolve(Some("utf-8")).unwrap(), Encoding::Utf8);
        assert_eq!(Encoding::resolve(Some("ISO-8859-1")).unwrap(), Encoding::Latin1);
        assert_eq!(Encoding::resolve(Some("latin1")).unwrap(), Encoding::Latin1);

        let err = Encoding::resolve(Some("EBCDIC")).unwrap_err();
        assert_eq!(err.name, "EBCDIC");
        assert!(Encoding::resolve(Some("windows-1252")).is_err());
        assert!(Encoding::resolve(Some("UTF-16")).is_err());
    }

    #[test]
    fn test_fallback_used_only_when_explicit_missing() {
        assert_eq!(
            Encoding::resolve_with_fallback(None, Some("latin1")).unwrap(),
            Encoding::Latin1
        );
        assert_eq!(
            Encoding::resolve_with_fallback(Some(" "), Some("latin1")).unwrap(),
            Encoding::Latin1
        );
        assert_eq!(
            Encoding::resolve_with_fallback(Some("UTF-8"), Some("latin1")).unwrap(),
            Encoding::Utf8
        );
    }

    #[test]
    fn test_latin1_round_trip_and_replacement() {
        let encoded = Encoding::Latin1.encode("café €");
        assert_eq!(encoded.as_ref(), b"caf\xe9 ?");
        assert_eq!(Encoding::Latin1.decode(b"caf\xe9"), "café");
    }
}
