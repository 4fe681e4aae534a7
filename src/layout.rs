//! Field and record layouts.
//!
//! Offsets are 1-based byte positions. A field occupies the byte range
//! `[offset - 1, offset - 1 + length)` of the record body. Ranges are not
//! checked against each other.

use std::fmt;
use std::sync::Arc;

use crate::converter::FieldConverter;

/// Name shared by all filler fields.
pub const FILLER_FIELD_NAME: &str = "filler";

/// One named byte slot within a record.
#[derive(Clone)]
pub struct Field {
    name: String,
    offset: usize,
    length: usize,
    converter: Arc<dyn FieldConverter>,
    filler: bool,
}

impl Field {
    pub fn new(
        name: impl Into<String>,
        offset: usize,
        length: usize,
        converter: Arc<dyn FieldConverter>,
    ) -> Self {
        Self {
            name: name.into(),
            offset,
            length,
            converter,
            filler: false,
        }
    }

    pub(crate) fn filler(offset: usize, length: usize, converter: Arc<dyn FieldConverter>) -> Self {
        Self {
            name: FILLER_FIELD_NAME.to_string(),
            offset,
            length,
            converter,
            filler: true,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// 1-based byte offset.
    pub fn offset(&self) -> usize {
        self.offset
    }

    /// Length in bytes.
    pub fn length(&self) -> usize {
        self.length
    }

    pub fn converter(&self) -> &dyn FieldConverter {
        self.converter.as_ref()
    }

    /// Filler slots are written from the fill char and left out of decoded
    /// records.
    pub fn is_filler(&self) -> bool {
        self.filler
    }

    /// Zero-based byte range of this field, or `None` if `offset` is 0 or
    /// the end does not fit in `usize`.
    pub fn range(&self) -> Option<std::ops::Range<usize>> {
        let start = self.offset.checked_sub(1)?;
        Some(start..start.checked_add(self.length)?)
    }
}

impl fmt::Debug for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Field")
            .field("name", &self.name)
            .field("offset", &self.offset)
            .field("length", &self.length)
            .field("converter", &self.converter)
            .field("filler", &self.filler)
            .finish()
    }
}

/// Ordered fields of one record shape.
#[derive(Debug, Clone)]
pub struct RecordLayout {
    name: Option<String>,
    fields: Vec<Field>,
}

impl RecordLayout {
    pub(crate) fn new(name: Option<String>, fields: Vec<Field>) -> Self {
        Self { name, fields }
    }

    /// Record name; `None` for the single layout.
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub fn fields(&self) -> &[Field] {
        &self.fields
    }

    pub fn field(&self, name: &str) -> Option<&Field> {
        self.fields.iter().find(|f| !f.is_filler() && f.name() == name)
    }
}

/// Maps the raw bytes of a record body to the name of its layout.
///
/// Invoked once per record on the read path, before any conversion. An
/// identifier must be a pure function of its input.
pub trait RecordIdentifier: Send + Sync {
    /// Returns the record name, or `None` if the record matches no layout.
    fn identify<'a>(&'a self, record: &[u8]) -> Option<&'a str>;
}

impl<F> RecordIdentifier for F
where
    F: Fn(&[u8]) -> Option<&'static str> + Send + Sync,
{
    fn identify<'a>(&'a self, record: &[u8]) -> Option<&'a str> {
        self(record)
    }
}

/// One rule of a [`RuleIdentifier`]: a byte slot compared for equality.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IdentifyRule {
    pub record: String,
    /// 1-based byte offset.
    pub offset: usize,
    pub expected: Vec<u8>,
}

/// Identifier driven by byte-equality rules, tried in declaration order.
#[derive(Debug, Clone, Default)]
pub struct RuleIdentifier {
    rules: Vec<IdentifyRule>,
    otherwise: Option<String>,
}

impl RuleIdentifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Select `record` when the bytes at `offset` equal `expected`.
    pub fn when(
        mut self,
        offset: usize,
        expected: impl Into<Vec<u8>>,
        record: impl Into<String>,
    ) -> Self {
        self.rules.push(IdentifyRule {
            record: record.into(),
            offset,
            expected: expected.into(),
        });
        self
    }

    /// Select `record` when no rule matches.
    pub fn otherwise(mut self, record: impl Into<String>) -> Self {
        self.otherwise = Some(record.into());
        self
    }

    pub fn rules(&self) -> &[IdentifyRule] {
        &self.rules
    }
}

impl RecordIdentifier for RuleIdentifier {
    fn identify<'a>(&'a self, record: &[u8]) -> Option<&'a str> {
        self.rules
            .iter()
            .find(|rule| {
                rule.offset
                    .checked_sub(1)
                    .and_then(|start| record.get(start..start + rule.expected.len()))
                    .is_some_and(|slot| slot == rule.expected.as_slice())
            })
            .map(|rule| rule.record.as_str())
            .or(self.otherwise.as_deref())
    }
}
