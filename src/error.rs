//! Error types for the fixed-length codec.
//!
//! Errors fall into four groups:
//! - caller misuse of the configuration ([`ConfigError`])
//! - malformed input streams ([`CodecError::InvalidDataFormat`])
//! - length violations on the encode side ([`ConvertError`] per field,
//!   [`CodecError::RecordLength`] per record)
//! - I/O failures of the underlying byte stream ([`CodecError::Io`])
//!
//! Every error aborts the current operation. Nothing is coerced or recovered.

use std::fmt;
use std::io;

use thiserror::Error;

/// Result type for codec operations.
pub type Result<T> = std::result::Result<T, CodecError>;

/// Direction of a record stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Read,
    Write,
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Direction::Read => f.write_str("read"),
            Direction::Write => f.write_str("write"),
        }
    }
}

/// The kind of structural defect found in an input stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormatViolation {
    /// The stream ended partway through a record body.
    ShortRecord,
    /// The bytes following a record were not the configured separator.
    InvalidLineSeparator,
}

impl fmt::Display for FormatViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FormatViolation::ShortRecord => f.write_str("last record is short."),
            FormatViolation::InvalidLineSeparator => f.write_str("line separator is invalid."),
        }
    }
}

/// Low-level bounds failure raised when encoded field bytes do not fit
/// their slot or run past the end of the record buffer.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error(
    "buffer overflow. field_name:{field}, offset:{offset}, slot_length:{slot_length}, \
     encoded_length:{encoded_length}, record_length:{record_length}"
)]
pub struct SlotOverflow {
    pub field: String,
    pub offset: usize,
    pub slot_length: usize,
    pub encoded_length: usize,
    pub record_length: usize,
}

/// Caller misuse of a configuration. Never retried.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("length is invalid. must set greater than 0.")]
    InvalidLength,

    #[error("record identifier is undefined.")]
    UndefinedRecordIdentifier,

    #[error("must be calling record method before calling field method.")]
    FieldBeforeRecord,

    #[error("record config is undefined.")]
    UndefinedRecord,

    #[error("field was not found. record_name:{record}")]
    NoField { record: String },

    #[error(
        "field offset is invalid. must set greater than 0. record_name:{record}, field_name:{field}"
    )]
    InvalidOffset { record: String, field: String },

    #[error("field name is duplicated. record_name:{record}, field_name:{field}")]
    DuplicateField { record: String, field: String },

    #[error("record name is duplicated. record_name:{record}")]
    DuplicateRecord { record: String },

    #[error("charset is not supported. charset:{0}")]
    UnsupportedCharset(String),

    #[error("line separator can not be encoded. charset:{charset}")]
    UnmappableLineSeparator { charset: String },

    #[error("record can not be identified. line number = [{line_number}]")]
    UnidentifiedRecord { line_number: u64 },

    #[error("record name is not defined. record_name:{record}")]
    UnknownRecord { record: String },

    #[error("record name is not set for multi layout record.")]
    MissingRecordName,

    #[error("record data is not found. record_name:{record}")]
    RecordDataNotFound { record: String },

    #[error("record data must be Object type. record_name:{record}, actual_type:{actual}")]
    RecordDataType { record: String, actual: &'static str },

    #[error(
        "field is out of record range. field_name:{field}, offset:{offset}, length:{length}, \
         record_length:{record_length}"
    )]
    FieldOutOfRange {
        field: String,
        offset: usize,
        length: usize,
        record_length: usize,
    },
}

/// Field-level conversion failure raised by a [`FieldConverter`](crate::FieldConverter).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConvertError {
    #[error(
        "length is invalid. expected length {expected} but was actual length {actual}. \
         field_name: {field} output value: {value}"
    )]
    Length {
        expected: usize,
        actual: usize,
        field: String,
        value: String,
    },

    #[error(
        "length after padding is invalid. expected length {expected} but was actual length \
         {actual}. field_name: {field} output value: {value} padding_char: {pad}"
    )]
    PaddedLength {
        expected: usize,
        actual: usize,
        field: String,
        value: String,
        pad: char,
    },

    #[error(
        "length is invalid. expected length {expected} but was actual length {actual}. \
         field_name: {field}"
    )]
    BinaryLength {
        expected: usize,
        actual: usize,
        field: String,
    },

    #[error("output is byte array only. field_name: {field}")]
    NotBytes { field: String },

    #[error("value type is not supported. field_name: {field} value_type: {actual}")]
    UnsupportedValue { field: String, actual: &'static str },

    #[error("field value can not be decoded. field_name: {field} charset: {charset}")]
    Undecodable { field: String, charset: String },

    #[error(
        "field value can not be encoded. field_name: {field} output value: {value} \
         charset: {charset}"
    )]
    Unmappable {
        field: String,
        value: String,
        charset: String,
    },
}

/// Top-level codec error.
#[derive(Debug, Error)]
pub enum CodecError {
    /// Malformed input. Fatal for the stream.
    #[error("data format is invalid. {reason} line number = [{line_number}]")]
    InvalidDataFormat {
        reason: FormatViolation,
        line_number: u64,
    },

    /// The encoded record does not match the configured record length.
    ///
    /// Overflow carries the [`SlotOverflow`] that triggered it; underflow
    /// has no cause.
    #[error("record length is invalid. expected_length:{expected}, actual_length:{actual}")]
    RecordLength {
        expected: usize,
        actual: usize,
        #[source]
        cause: Option<SlotOverflow>,
    },

    #[error(transparent)]
    Convert(#[from] ConvertError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    /// The stream does not support this direction.
    #[error("unsupported {0} method.")]
    Unsupported(Direction),

    /// The reader already failed and will not resynchronize.
    #[error("record stream has already failed. line number = [{line_number}]")]
    Poisoned { line_number: u64 },

    #[error("I/O failure: {0}")]
    Io(#[from] io::Error),
}

impl CodecError {
    /// Line number carried by input-format errors.
    pub fn line_number(&self) -> Option<u64> {
        match self {
            CodecError::InvalidDataFormat { line_number, .. }
            | CodecError::Poisoned { line_number }
            | CodecError::Config(ConfigError::UnidentifiedRecord { line_number }) => {
                Some(*line_number)
            }
            _ => None,
        }
    }

    pub fn is_data_format(&self) -> bool {
        matches!(self, CodecError::InvalidDataFormat { .. })
    }

    pub fn is_config(&self) -> bool {
        matches!(self, CodecError::Config(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error as _;

    #[test]
    fn test_data_format_message() {
        let err = CodecError::InvalidDataFormat {
            reason: FormatViolation::ShortRecord,
            line_number: 2,
        };
        assert_eq!(
            err.to_string(),
            "data format is invalid. last record is short. line number = [2]"
        );
        assert_eq!(err.line_number(), Some(2));
        assert!(err.is_data_format());
    }

    #[test]
    fn test_separator_message() {
        let err = CodecError::InvalidDataFormat {
            reason: FormatViolation::InvalidLineSeparator,
            line_number: 1,
        };
        assert_eq!(
            err.to_string(),
            "data format is invalid. line separator is invalid. line number = [1]"
        );
    }

    #[test]
    fn test_record_length_overflow_has_source() {
        let err = CodecError::RecordLength {
            expected: 19,
            actual: 20,
            cause: Some(SlotOverflow {
                field: "age".to_string(),
                offset: 17,
                slot_length: 3,
                encoded_length: 4,
                record_length: 19,
            }),
        };
        assert_eq!(
            err.to_string(),
            "record length is invalid. expected_length:19, actual_length:20"
        );
        let source = err.source().unwrap();
        assert!(source.to_string().contains("field_name:age"));
    }

    #[test]
    fn test_record_length_underflow_has_no_source() {
        let err = CodecError::RecordLength {
            expected: 19,
            actual: 15,
            cause: None,
        };
        assert!(err.source().is_none());
    }

    #[test]
    fn test_padded_length_message() {
        let err = ConvertError::PaddedLength {
            expected: 5,
            actual: 6,
            field: "name".to_string(),
            value: "あい".to_string(),
            pad: '　',
        };
        assert_eq!(
            err.to_string(),
            "length after padding is invalid. expected length 5 but was actual length 6. \
             field_name: name output value: あい padding_char: 　"
        );
    }

    #[test]
    fn test_unsupported_direction() {
        assert_eq!(
            CodecError::Unsupported(Direction::Read).to_string(),
            "unsupported read method."
        );
        assert_eq!(
            CodecError::Unsupported(Direction::Write).to_string(),
            "unsupported write method."
        );
    }

    #[test]
    fn test_config_error_is_transparent() {
        let err: CodecError = ConfigError::RecordDataNotFound {
            record: "header".to_string(),
        }
        .into();
        assert_eq!(err.to_string(), "record data is not found. record_name:header");
        assert!(err.is_config());
    }
}
