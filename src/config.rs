//! Codec configuration and its builders.
//!
//! A [`FixedLengthConfig`] is built once and never changes afterwards:
//!
//! ```
//! use fixedlength_rs::{Charset, FixedLengthConfig, Lpad, Rpad};
//!
//! let config = FixedLengthConfig::builder()
//!     .length(19)
//!     .charset(Charset::shift_jis())
//!     .line_separator("\r\n")
//!     .single_layout()
//!     .field("name", 1, 8, Rpad::new(' '))
//!     .field("text", 9, 8, Rpad::new('a'))
//!     .field("age", 17, 3, Lpad::new('0'))
//!     .build()
//!     .unwrap();
//!
//! assert_eq!(config.length(), 19);
//! assert!(!config.is_multi_layout());
//! ```

use std::collections::{HashMap, HashSet};
use std::fmt;
use std::sync::Arc;

use crate::charset::Charset;
use crate::converter::{FieldConverter, Filler};
use crate::error::ConfigError;
use crate::layout::{Field, RecordIdentifier, RecordLayout};

/// Record shapes of a stream.
enum Layouts {
    Single(RecordLayout),
    Multi {
        records: Vec<RecordLayout>,
        index: HashMap<String, usize>,
        identifier: Arc<dyn RecordIdentifier>,
    },
}

/// Immutable configuration shared by readers and writers.
pub struct FixedLengthConfig {
    length: usize,
    charset: Charset,
    line_separator: Vec<u8>,
    fill_char: char,
    layouts: Layouts,
}

impl FixedLengthConfig {
    pub fn builder() -> FixedLengthConfigBuilder {
        FixedLengthConfigBuilder::default()
    }

    /// Record body length in bytes, excluding the separator.
    pub fn length(&self) -> usize {
        self.length
    }

    pub fn charset(&self) -> Charset {
        self.charset
    }

    /// Encoded separator bytes; empty when records are concatenated.
    pub fn line_separator(&self) -> &[u8] {
        &self.line_separator
    }

    /// Character used for filler slots.
    pub fn fill_char(&self) -> char {
        self.fill_char
    }

    pub fn is_multi_layout(&self) -> bool {
        matches!(self.layouts, Layouts::Multi { .. })
    }

    /// The layout of a single-layout stream.
    pub fn single_record(&self) -> Option<&RecordLayout> {
        match &self.layouts {
            Layouts::Single(layout) => Some(layout),
            Layouts::Multi { .. } => None,
        }
    }

    /// Look up a multi-layout record by name.
    pub fn record(&self, name: &str) -> Option<&RecordLayout> {
        match &self.layouts {
            Layouts::Single(_) => None,
            Layouts::Multi { records, index, .. } => index.get(name).map(|&i| &records[i]),
        }
    }

    /// All record layouts in declaration order.
    pub fn records(&self) -> &[RecordLayout] {
        match &self.layouts {
            Layouts::Single(layout) => std::slice::from_ref(layout),
            Layouts::Multi { records, .. } => records,
        }
    }

    pub fn record_identifier(&self) -> Option<&dyn RecordIdentifier> {
        match &self.layouts {
            Layouts::Single(_) => None,
            Layouts::Multi { identifier, .. } => Some(identifier.as_ref()),
        }
    }
}

impl fmt::Debug for FixedLengthConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FixedLengthConfig")
            .field("length", &self.length)
            .field("charset", &self.charset)
            .field("line_separator", &self.line_separator)
            .field("fill_char", &self.fill_char)
            .field("multi_layout", &self.is_multi_layout())
            .field("records", &self.records())
            .finish()
    }
}

#[derive(Debug, Clone)]
enum Separator {
    Text(String),
    Bytes(Vec<u8>),
}

/// File-level settings shared by both layout builders.
#[derive(Debug, Clone)]
pub struct FixedLengthConfigBuilder {
    length: usize,
    charset: Charset,
    line_separator: Separator,
    fill_char: char,
}

impl Default for FixedLengthConfigBuilder {
    fn default() -> Self {
        Self {
            length: 0,
            charset: Charset::default(),
            line_separator: Separator::Bytes(Vec::new()),
            fill_char: ' ',
        }
    }
}

impl FixedLengthConfigBuilder {
    pub fn length(mut self, length: usize) -> Self {
        self.length = length;
        self
    }

    pub fn charset(mut self, charset: Charset) -> Self {
        self.charset = charset;
        self
    }

    /// Separator text, encoded with the configured charset at build time.
    pub fn line_separator(mut self, separator: impl Into<String>) -> Self {
        self.line_separator = Separator::Text(separator.into());
        self
    }

    pub fn line_separator_bytes(mut self, separator: impl Into<Vec<u8>>) -> Self {
        self.line_separator = Separator::Bytes(separator.into());
        self
    }

    /// Fill character for filler slots. Defaults to a half-width space.
    pub fn fill_char(mut self, fill_char: char) -> Self {
        self.fill_char = fill_char;
        self
    }

    pub fn single_layout(self) -> SingleLayoutBuilder {
        SingleLayoutBuilder {
            file: self,
            fields: Vec::new(),
        }
    }

    pub fn multi_layout(self) -> MultiLayoutBuilder {
        MultiLayoutBuilder {
            file: self,
            records: Vec::new(),
            identifier: None,
            error: None,
        }
    }

    fn freeze(self, layouts: Layouts) -> Result<FixedLengthConfig, ConfigError> {
        if self.length == 0 {
            return Err(ConfigError::InvalidLength);
        }
        let line_separator = match self.line_separator {
            Separator::Bytes(bytes) => bytes,
            Separator::Text(text) => self
                .charset
                .encode(&text)
                .map(|b| b.into_owned())
                .ok_or_else(|| ConfigError::UnmappableLineSeparator {
                    charset: self.charset.name().to_string(),
                })?,
        };
        Ok(FixedLengthConfig {
            length: self.length,
            charset: self.charset,
            line_separator,
            fill_char: self.fill_char,
            layouts,
        })
    }
}

/// Check one record's fields: present, valid offsets, unique names.
fn verify_fields(record: &str, fields: &[Field]) -> Result<(), ConfigError> {
    if fields.iter().all(Field::is_filler) {
        return Err(ConfigError::NoField {
            record: record.to_string(),
        });
    }
    let mut names = HashSet::new();
    for field in fields {
        if field.offset() == 0 {
            return Err(ConfigError::InvalidOffset {
                record: record.to_string(),
                field: field.name().to_string(),
            });
        }
        if !field.is_filler() && !names.insert(field.name()) {
            return Err(ConfigError::DuplicateField {
                record: record.to_string(),
                field: field.name().to_string(),
            });
        }
    }
    Ok(())
}

/// Name used for the single layout in error messages.
const SINGLE_LAYOUT_RECORD_NAME: &str = "single";

/// Builder for streams with one record shape.
#[derive(Debug, Clone)]
pub struct SingleLayoutBuilder {
    file: FixedLengthConfigBuilder,
    fields: Vec<Field>,
}

impl SingleLayoutBuilder {
    pub fn field(
        mut self,
        name: impl Into<String>,
        offset: usize,
        length: usize,
        converter: impl FieldConverter + 'static,
    ) -> Self {
        self.fields
            .push(Field::new(name, offset, length, Arc::new(converter)));
        self
    }

    /// Filler slot written with the fill char and skipped on read.
    pub fn filler(mut self, offset: usize, length: usize) -> Self {
        self.fields.push(Field::filler(offset, length, Arc::new(Filler)));
        self
    }

    pub fn build(self) -> Result<FixedLengthConfig, ConfigError> {
        verify_fields(SINGLE_LAYOUT_RECORD_NAME, &self.fields)?;
        self.file
            .freeze(Layouts::Single(RecordLayout::new(None, self.fields)))
    }
}

/// Builder for streams that interleave several record shapes.
#[derive(Clone)]
pub struct MultiLayoutBuilder {
    file: FixedLengthConfigBuilder,
    records: Vec<(String, Vec<Field>)>,
    identifier: Option<Arc<dyn RecordIdentifier>>,
    error: Option<ConfigError>,
}

impl MultiLayoutBuilder {
    /// Start a new record; following fields belong to it.
    pub fn record(mut self, name: impl Into<String>) -> Self {
        let name = name.into();
        if self.error.is_none() && self.records.iter().any(|(n, _)| *n == name) {
            self.error = Some(ConfigError::DuplicateRecord { record: name.clone() });
        }
        self.records.push((name, Vec::new()));
        self
    }

    pub fn field(
        self,
        name: impl Into<String>,
        offset: usize,
        length: usize,
        converter: impl FieldConverter + 'static,
    ) -> Self {
        self.push_field(Field::new(name, offset, length, Arc::new(converter)))
    }

    pub fn filler(self, offset: usize, length: usize) -> Self {
        self.push_field(Field::filler(offset, length, Arc::new(Filler)))
    }

    fn push_field(mut self, field: Field) -> Self {
        match self.records.last_mut() {
            Some((_, fields)) => fields.push(field),
            None => {
                self.error.get_or_insert(ConfigError::FieldBeforeRecord);
            }
        }
        self
    }

    pub fn record_identifier(mut self, identifier: impl RecordIdentifier + 'static) -> Self {
        self.identifier = Some(Arc::new(identifier));
        self
    }

    pub fn build(self) -> Result<FixedLengthConfig, ConfigError> {
        if let Some(error) = self.error {
            return Err(error);
        }
        let identifier = self.identifier.ok_or(ConfigError::UndefinedRecordIdentifier)?;
        if self.records.is_empty() {
            return Err(ConfigError::UndefinedRecord);
        }

        let mut records = Vec::with_capacity(self.records.len());
        let mut index = HashMap::with_capacity(self.records.len());
        for (name, fields) in self.records {
            verify_fields(&name, &fields)?;
            index.insert(name.clone(), records.len());
            records.push(RecordLayout::new(Some(name), fields));
        }

        self.file.freeze(Layouts::Multi {
            records,
            index,
            identifier,
        })
    }
}

impl fmt::Debug for MultiLayoutBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MultiLayoutBuilder")
            .field("file", &self.file)
            .field("records", &self.records)
            .field("identifier", &self.identifier.is_some())
            .field("error", &self.error)
            .finish()
    }
}
