//! Charset-aware string handling.
//!
//! Field lengths are byte counts, so encoding and decoding must be exact:
//! malformed input and unmappable characters are reported instead of being
//! replaced.

use std::borrow::Cow;
use std::fmt;

use encoding_rs::Encoding;

use crate::error::ConfigError;

/// A character encoding that can both decode and encode records.
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct Charset(&'static Encoding);

impl Charset {
    pub fn utf_8() -> Self {
        Charset(encoding_rs::UTF_8)
    }

    /// Shift_JIS as specified by WHATWG (the Windows-31J / MS932 variant).
    pub fn shift_jis() -> Self {
        Charset(encoding_rs::SHIFT_JIS)
    }

    pub fn euc_jp() -> Self {
        Charset(encoding_rs::EUC_JP)
    }

    pub fn windows_1252() -> Self {
        Charset(encoding_rs::WINDOWS_1252)
    }

    /// Resolve a charset by label, e.g. `"MS932"`, `"Shift_JIS"`, `"utf-8"`.
    ///
    /// Encodings that cannot be written back (UTF-16, replacement) are
    /// rejected.
    pub fn for_label(label: &str) -> Result<Self, ConfigError> {
        let encoding = Encoding::for_label(label.trim().as_bytes())
            .ok_or_else(|| ConfigError::UnsupportedCharset(label.to_string()))?;
        if encoding.output_encoding() != encoding {
            return Err(ConfigError::UnsupportedCharset(label.to_string()));
        }
        Ok(Charset(encoding))
    }

    pub fn name(&self) -> &'static str {
        self.0.name()
    }

    /// Decode bytes, returning `None` if they are malformed in this charset.
    pub fn decode<'a>(&self, bytes: &'a [u8]) -> Option<Cow<'a, str>> {
        self.0
            .decode_without_bom_handling_and_without_replacement(bytes)
    }

    /// Encode text, returning `None` if a character has no mapping.
    pub fn encode<'a>(&self, text: &'a str) -> Option<Cow<'a, [u8]>> {
        let (bytes, _, unmappable) = self.0.encode(text);
        if unmappable { None } else { Some(bytes) }
    }

    /// Encoded form of a single character.
    pub fn encode_char(&self, c: char) -> Option<Vec<u8>> {
        let mut buf = [0u8; 4];
        self.encode(c.encode_utf8(&mut buf)).map(Cow::into_owned)
    }
}

impl Default for Charset {
    fn default() -> Self {
        Charset::utf_8()
    }
}

impl fmt::Debug for Charset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Charset").field(&self.name()).finish()
    }
}

impl fmt::Display for Charset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
