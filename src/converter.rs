//! Field converters.
//!
//! A converter turns the raw bytes of one field slot into a [`Value`] and
//! back. The built-in converters cover verbatim text ([`DefaultConverter`]),
//! padded text ([`Rpad`], [`Lpad`]), raw bytes ([`Binary`]) and filler
//! slots ([`Filler`]). Custom converters implement [`FieldConverter`] and are
//! treated exactly like the built-ins.

use std::borrow::Cow;
use std::fmt;

use crate::config::FixedLengthConfig;
use crate::error::ConvertError;
use crate::layout::Field;
use crate::value::Value;

/// Two-directional transform between field bytes and a logical value.
///
/// `decode` receives exactly `field.length()` bytes. `encode` returns the
/// bytes to place at the field's offset; returning more than
/// `field.length()` bytes makes the writer reject the record.
pub trait FieldConverter: Send + Sync + fmt::Debug {
    fn decode(
        &self,
        config: &FixedLengthConfig,
        field: &Field,
        input: &[u8],
    ) -> Result<Value, ConvertError>;

    fn encode(
        &self,
        config: &FixedLengthConfig,
        field: &Field,
        value: &Value,
    ) -> Result<Vec<u8>, ConvertError>;
}

impl<C: FieldConverter + ?Sized> FieldConverter for Box<C> {
    fn decode(
        &self,
        config: &FixedLengthConfig,
        field: &Field,
        input: &[u8],
    ) -> Result<Value, ConvertError> {
        (**self).decode(config, field, input)
    }

    fn encode(
        &self,
        config: &FixedLengthConfig,
        field: &Field,
        value: &Value,
    ) -> Result<Vec<u8>, ConvertError> {
        (**self).encode(config, field, value)
    }
}

/// Render a value as text for the string converters.
fn text_of<'a>(field: &Field, value: &'a Value) -> Result<Cow<'a, str>, ConvertError> {
    match value {
        Value::Null => Ok(Cow::Borrowed("")),
        Value::String(s) => Ok(Cow::Borrowed(s)),
        Value::Int(i) => Ok(Cow::Owned(i.to_string())),
        other => Err(ConvertError::UnsupportedValue {
            field: field.name().to_string(),
            actual: other.type_name(),
        }),
    }
}

fn decode_text<'a>(
    config: &FixedLengthConfig,
    field: &Field,
    input: &'a [u8],
) -> Result<Cow<'a, str>, ConvertError> {
    config
        .charset()
        .decode(input)
        .ok_or_else(|| ConvertError::Undecodable {
            field: field.name().to_string(),
            charset: config.charset().name().to_string(),
        })
}

fn encode_text<'a>(
    config: &FixedLengthConfig,
    field: &Field,
    text: &'a str,
) -> Result<Cow<'a, [u8]>, ConvertError> {
    config
        .charset()
        .encode(text)
        .ok_or_else(|| ConvertError::Unmappable {
            field: field.name().to_string(),
            value: text.to_string(),
            charset: config.charset().name().to_string(),
        })
}

fn encode_pad(
    config: &FixedLengthConfig,
    field: &Field,
    pad: char,
) -> Result<Vec<u8>, ConvertError> {
    config
        .charset()
        .encode_char(pad)
        .ok_or_else(|| ConvertError::Unmappable {
            field: field.name().to_string(),
            value: pad.to_string(),
            charset: config.charset().name().to_string(),
        })
}

/// Verbatim text. Encoded bytes must fill the slot exactly.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultConverter;

impl FieldConverter for DefaultConverter {
    fn decode(
        &self,
        config: &FixedLengthConfig,
        field: &Field,
        input: &[u8],
    ) -> Result<Value, ConvertError> {
        Ok(Value::String(decode_text(config, field, input)?.into_owned()))
    }

    fn encode(
        &self,
        config: &FixedLengthConfig,
        field: &Field,
        value: &Value,
    ) -> Result<Vec<u8>, ConvertError> {
        let text = text_of(field, value)?;
        let bytes = encode_text(config, field, &text)?;
        if bytes.len() != field.length() {
            return Err(ConvertError::Length {
                expected: field.length(),
                actual: bytes.len(),
                field: field.name().to_string(),
                value: text.to_string(),
            });
        }
        Ok(bytes.into_owned())
    }
}

/// Left-aligned text, padded on the right.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rpad {
    pad: char,
}

impl Rpad {
    pub fn new(pad: char) -> Self {
        Self { pad }
    }

    pub fn pad_char(&self) -> char {
        self.pad
    }
}

impl Default for Rpad {
    /// Pads with a half-width space.
    fn default() -> Self {
        Self::new(' ')
    }
}

impl FieldConverter for Rpad {
    fn decode(
        &self,
        config: &FixedLengthConfig,
        field: &Field,
        input: &[u8],
    ) -> Result<Value, ConvertError> {
        let text = decode_text(config, field, input)?;
        Ok(Value::String(text.trim_end_matches(self.pad).to_string()))
    }

    fn encode(
        &self,
        config: &FixedLengthConfig,
        field: &Field,
        value: &Value,
    ) -> Result<Vec<u8>, ConvertError> {
        let text = text_of(field, value)?;
        let pad = encode_pad(config, field, self.pad)?;
        let length = field.length();
        let overflow = |actual: usize| ConvertError::PaddedLength {
            expected: length,
            actual,
            field: field.name().to_string(),
            value: text.to_string(),
            pad: self.pad,
        };

        let mut out = encode_text(config, field, &text)?.into_owned();
        if out.len() > length {
            return Err(overflow(out.len()));
        }
        while out.len() < length {
            if out.len() + pad.len() > length {
                return Err(overflow(out.len() + pad.len()));
            }
            out.extend_from_slice(&pad);
        }
        Ok(out)
    }
}

/// Right-aligned text, padded on the left.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Lpad {
    pad: char,
}

impl Lpad {
    pub fn new(pad: char) -> Self {
        Self { pad }
    }

    pub fn pad_char(&self) -> char {
        self.pad
    }
}

impl Default for Lpad {
    /// Pads with `'0'`.
    fn default() -> Self {
        Self::new('0')
    }
}

impl FieldConverter for Lpad {
    fn decode(
        &self,
        config: &FixedLengthConfig,
        field: &Field,
        input: &[u8],
    ) -> Result<Value, ConvertError> {
        let text = decode_text(config, field, input)?;
        Ok(Value::String(text.trim_start_matches(self.pad).to_string()))
    }

    fn encode(
        &self,
        config: &FixedLengthConfig,
        field: &Field,
        value: &Value,
    ) -> Result<Vec<u8>, ConvertError> {
        let text = text_of(field, value)?;
        let pad = encode_pad(config, field, self.pad)?;
        let length = field.length();
        let overflow = |actual: usize| ConvertError::PaddedLength {
            expected: length,
            actual,
            field: field.name().to_string(),
            value: text.to_string(),
            pad: self.pad,
        };

        let bytes = encode_text(config, field, &text)?;
        let mut out = Vec::with_capacity(bytes.len());
        while out.len() + bytes.len() < length {
            if out.len() + pad.len() > length {
                return Err(overflow(out.len() + pad.len()));
            }
            out.extend_from_slice(&pad);
        }
        if out.len() + bytes.len() > length {
            return Err(overflow(out.len() + bytes.len()));
        }
        out.extend_from_slice(&bytes);
        Ok(out)
    }
}

/// Raw bytes, no charset interpretation.
///
/// Shorter input is placed as-is; the writer then reports the record as
/// short unless other fields cover the remainder.
#[derive(Debug, Clone, Copy, Default)]
pub struct Binary;

impl FieldConverter for Binary {
    fn decode(
        &self,
        _config: &FixedLengthConfig,
        _field: &Field,
        input: &[u8],
    ) -> Result<Value, ConvertError> {
        Ok(Value::Bytes(input.to_vec()))
    }

    fn encode(
        &self,
        _config: &FixedLengthConfig,
        field: &Field,
        value: &Value,
    ) -> Result<Vec<u8>, ConvertError> {
        let bytes = value.as_bytes().ok_or_else(|| ConvertError::NotBytes {
            field: field.name().to_string(),
        })?;
        if bytes.len() > field.length() {
            return Err(ConvertError::BinaryLength {
                expected: field.length(),
                actual: bytes.len(),
                field: field.name().to_string(),
            });
        }
        Ok(bytes.to_vec())
    }
}

/// Filler slot: the configured fill char repeated over the slot.
///
/// The logical value is ignored on encode.
#[derive(Debug, Clone, Copy, Default)]
pub struct Filler;

impl FieldConverter for Filler {
    fn decode(
        &self,
        config: &FixedLengthConfig,
        field: &Field,
        input: &[u8],
    ) -> Result<Value, ConvertError> {
        DefaultConverter.decode(config, field, input)
    }

    fn encode(
        &self,
        config: &FixedLengthConfig,
        field: &Field,
        _value: &Value,
    ) -> Result<Vec<u8>, ConvertError> {
        let fill = encode_pad(config, field, config.fill_char())?;
        let length = field.length();
        let mut out = Vec::new();
        while out.len() < length {
            if out.len() + fill.len() > length {
                return Err(ConvertError::PaddedLength {
                    expected: length,
                    actual: out.len() + fill.len(),
                    field: field.name().to_string(),
                    value: String::new(),
                    pad: config.fill_char(),
                });
            }
            out.extend_from_slice(&fill);
        }
        Ok(out)
    }
}
