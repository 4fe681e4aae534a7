//! Streaming record writer.
//!
//! A record is assembled in a buffer of exactly `config.length()` bytes,
//! checked, and only then written to the sink followed by the line
//! separator. A rejected record leaves the sink untouched.

use std::io::Write;
use std::sync::Arc;

use tracing::{debug, trace};

use crate::config::FixedLengthConfig;
use crate::error::{CodecError, ConfigError, Result, SlotOverflow};
use crate::layout::RecordLayout;
use crate::value::{FieldMap, LogicalRecord, Value};

/// Encodes fixed-length records into a byte sink.
pub struct RecordWriter<W: Write> {
    sink: W,
    config: Arc<FixedLengthConfig>,
    buffer: Vec<u8>,
    records: u64,
}

impl<W: Write> RecordWriter<W> {
    pub fn new(sink: W, config: Arc<FixedLengthConfig>) -> Self {
        let buffer = Vec::with_capacity(config.length());
        Self {
            sink,
            config,
            buffer,
            records: 0,
        }
    }

    pub fn config(&self) -> &FixedLengthConfig {
        &self.config
    }

    /// Number of records written so far.
    pub fn records_written(&self) -> u64 {
        self.records
    }

    /// Encode and write one record.
    pub fn write_record(&mut self, record: &LogicalRecord) -> Result<()> {
        let config = Arc::clone(&self.config);
        let (layout, values) = resolve_layout(&config, record)?;
        encode_into(&config, layout, values, &mut self.buffer)?;

        self.sink.write_all(&self.buffer)?;
        if !config.line_separator().is_empty() {
            self.sink.write_all(config.line_separator())?;
        }
        self.records += 1;
        trace!(
            records = self.records,
            record_name = ?layout.name(),
            "encoded record"
        );
        Ok(())
    }

    pub fn flush(&mut self) -> Result<()> {
        self.sink.flush()?;
        Ok(())
    }

    /// Flush and return the underlying sink.
    pub fn into_inner(mut self) -> Result<W> {
        self.sink.flush()?;
        Ok(self.sink)
    }

    /// Flush and close the writer, dropping the underlying sink.
    pub fn close(self) -> Result<()> {
        debug!(records = self.records, "closing record writer");
        self.into_inner().map(drop)
    }
}

/// Select the layout and the field values a record is written with.
fn resolve_layout<'c, 'r>(
    config: &'c FixedLengthConfig,
    record: &'r LogicalRecord,
) -> Result<(&'c RecordLayout, &'r FieldMap)> {
    if !config.is_multi_layout() {
        let layout = config.single_record().ok_or(ConfigError::UndefinedRecord)?;
        return Ok((layout, record.fields()));
    }

    let name = record.record_name().ok_or(ConfigError::MissingRecordName)?;
    let layout = config.record(name).ok_or_else(|| ConfigError::UnknownRecord {
        record: name.to_string(),
    })?;
    let data = record
        .get(name)
        .ok_or_else(|| ConfigError::RecordDataNotFound {
            record: name.to_string(),
        })?;
    match data {
        Value::Object(values) => Ok((layout, values)),
        other => Err(ConfigError::RecordDataType {
            record: name.to_string(),
            actual: other.type_name(),
        }
        .into()),
    }
}

/// Encode every field of `layout` into `buffer` at its offset.
fn encode_into(
    config: &FixedLengthConfig,
    layout: &RecordLayout,
    values: &FieldMap,
    buffer: &mut Vec<u8>,
) -> Result<()> {
    let length = config.length();
    buffer.clear();
    buffer.resize(length, 0);

    let mut covered = vec![false; length];
    let mut written = 0usize;
    for field in layout.fields() {
        let overflow = |actual: usize, encoded_length: usize| CodecError::RecordLength {
            expected: length,
            actual,
            cause: Some(SlotOverflow {
                field: field.name().to_string(),
                offset: field.offset(),
                slot_length: field.length(),
                encoded_length,
                record_length: length,
            }),
        };

        // slot must lie inside the record before anything is encoded
        let slot = match field.range() {
            Some(range) if range.end <= length => range,
            other => {
                let end = other.map_or(usize::MAX, |range| range.end);
                return Err(overflow(end, 0));
            }
        };

        let value = if field.is_filler() {
            &Value::Null
        } else {
            values.get(field.name()).unwrap_or(&Value::Null)
        };
        let bytes = field.converter().encode(config, field, value)?;
        if bytes.len() > slot.len() {
            let end = slot.start + bytes.len();
            return Err(overflow(end.max(written + bytes.len()), bytes.len()));
        }

        let end = slot.start + bytes.len();
        buffer[slot.start..end].copy_from_slice(&bytes);
        for flag in &mut covered[slot.start..end] {
            if !*flag {
                *flag = true;
                written += 1;
            }
        }
    }

    if written < length {
        return Err(CodecError::RecordLength {
            expected: length,
            actual: written,
            cause: None,
        });
    }
    Ok(())
}
