//! Streaming record reader.
//!
//! Each call to [`RecordReader::read_record`] consumes one record body of
//! exactly `config.length()` bytes plus the configured line separator.
//! The last record may omit its separator. Clean end of stream is sticky:
//! later calls keep returning `Ok(None)`. Any error is final and later calls
//! return [`CodecError::Poisoned`].

use std::io::{self, Read};
use std::sync::Arc;

use tracing::{debug, trace, warn};

use crate::config::FixedLengthConfig;
use crate::error::{CodecError, ConfigError, FormatViolation, Result};
use crate::layout::RecordLayout;
use crate::value::{FieldMap, LogicalRecord, Value};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ReadState {
    Open,
    Eof,
    Failed { line_number: u64 },
}

/// Decodes fixed-length records from a byte source.
pub struct RecordReader<R> {
    source: R,
    config: Arc<FixedLengthConfig>,
    body: Vec<u8>,
    separator: Vec<u8>,
    line_number: u64,
    state: ReadState,
}

/// Fill `buf` from `source`, stopping early only at end of stream.
///
/// Returns the number of bytes read.
fn read_full<R: Read>(source: &mut R, buf: &mut [u8]) -> io::Result<usize> {
    let mut filled = 0;
    while filled < buf.len() {
        match source.read(&mut buf[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        }
    }
    Ok(filled)
}

impl<R: Read> RecordReader<R> {
    pub fn new(source: R, config: Arc<FixedLengthConfig>) -> Self {
        let body = vec![0; config.length()];
        let separator = vec![0; config.line_separator().len()];
        Self {
            source,
            config,
            body,
            separator,
            line_number: 0,
            state: ReadState::Open,
        }
    }

    pub fn config(&self) -> &FixedLengthConfig {
        &self.config
    }

    /// Number of records returned so far.
    pub fn line_number(&self) -> u64 {
        self.line_number
    }

    pub fn is_eof(&self) -> bool {
        self.state == ReadState::Eof
    }

    /// Read the next record, or `None` at end of stream.
    pub fn read_record(&mut self) -> Result<Option<LogicalRecord>> {
        match self.state {
            ReadState::Eof => return Ok(None),
            ReadState::Failed { line_number } => return Err(CodecError::Poisoned { line_number }),
            ReadState::Open => {}
        }

        let line_number = self.line_number + 1;
        match self.next_record(line_number) {
            Ok(Some(record)) => {
                self.line_number = line_number;
                trace!(
                    line_number,
                    record_name = ?record.record_name(),
                    "decoded record"
                );
                Ok(Some(record))
            }
            Ok(None) => {
                self.state = ReadState::Eof;
                debug!(records = self.line_number, "reached end of record stream");
                Ok(None)
            }
            Err(e) => {
                self.state = ReadState::Failed { line_number };
                warn!(line_number, error = %e, "record stream failed");
                Err(e)
            }
        }
    }

    fn next_record(&mut self, line_number: u64) -> Result<Option<LogicalRecord>> {
        let read = read_full(&mut self.source, &mut self.body)?;
        if read == 0 {
            return Ok(None);
        }
        if read < self.body.len() {
            return Err(CodecError::InvalidDataFormat {
                reason: FormatViolation::ShortRecord,
                line_number,
            });
        }

        let config = Arc::clone(&self.config);
        let mut record = match config.record_identifier() {
            None => {
                let layout = config.single_record().ok_or(ConfigError::UndefinedRecord)?;
                LogicalRecord::from_fields(self.decode_fields(&config, layout)?)
            }
            Some(identifier) => {
                let name = identifier
                    .identify(&self.body)
                    .ok_or(ConfigError::UnidentifiedRecord { line_number })?;
                let layout = config.record(name).ok_or_else(|| ConfigError::UnknownRecord {
                    record: name.to_string(),
                })?;
                let data = self.decode_fields(&config, layout)?;
                LogicalRecord::with_record(name, data)
            }
        };

        self.skip_line_separator(line_number)?;
        record.set_line_number(line_number);
        Ok(Some(record))
    }

    fn decode_fields(&self, config: &FixedLengthConfig, layout: &RecordLayout) -> Result<FieldMap> {
        let mut fields = FieldMap::new();
        for field in layout.fields() {
            let slot = field
                .range()
                .and_then(|range| self.body.get(range))
                .ok_or_else(|| ConfigError::FieldOutOfRange {
                    field: field.name().to_string(),
                    offset: field.offset(),
                    length: field.length(),
                    record_length: config.length(),
                })?;
            let value: Value = field.converter().decode(config, field, slot)?;
            if !field.is_filler() {
                fields.insert(field.name().to_string(), value);
            }
        }
        Ok(fields)
    }

    fn skip_line_separator(&mut self, line_number: u64) -> Result<()> {
        if self.separator.is_empty() {
            return Ok(());
        }
        let read = read_full(&mut self.source, &mut self.separator)?;
        if read == 0 {
            // final record without a trailing separator
            return Ok(());
        }
        if read < self.separator.len() || self.separator != self.config.line_separator() {
            return Err(CodecError::InvalidDataFormat {
                reason: FormatViolation::InvalidLineSeparator,
                line_number,
            });
        }
        Ok(())
    }

    /// Release the reader and return the underlying source.
    pub fn into_inner(self) -> R {
        self.source
    }

    /// Close the reader, dropping the underlying source.
    pub fn close(self) -> Result<()> {
        debug!(records = self.line_number, "closing record reader");
        drop(self.source);
        Ok(())
    }
}

impl<R: Read> Iterator for RecordReader<R> {
    type Item = Result<LogicalRecord>;

    /// Yields records until end of stream or the first error.
    fn next(&mut self) -> Option<Self::Item> {
        if matches!(self.state, ReadState::Failed { .. }) {
            return None;
        }
        self.read_record().transpose()
    }
}
