//! Direction-erased record stream surface.
//!
//! [`RecordReader`] and [`RecordWriter`] are direction-locked at compile
//! time. Binding adapters that hold a stream behind a trait object use
//! [`RecordMapper`] instead, where calling the unsupported direction fails
//! with [`CodecError::Unsupported`].

use std::io::{Read, Write};

use crate::error::{CodecError, Direction, Result};
use crate::reader::RecordReader;
use crate::value::LogicalRecord;
use crate::writer::RecordWriter;

/// One record stream, read-only or write-only.
pub trait RecordMapper {
    /// Read the next record, or `None` at end of stream.
    fn read(&mut self) -> Result<Option<LogicalRecord>> {
        Err(CodecError::Unsupported(Direction::Read))
    }

    fn write(&mut self, _record: &LogicalRecord) -> Result<()> {
        Err(CodecError::Unsupported(Direction::Write))
    }

    /// Close the stream and release the underlying source or sink.
    fn close(self: Box<Self>) -> Result<()>;

    fn direction(&self) -> Direction;
}

impl<R: Read> RecordMapper for RecordReader<R> {
    fn read(&mut self) -> Result<Option<LogicalRecord>> {
        self.read_record()
    }

    fn close(self: Box<Self>) -> Result<()> {
        RecordReader::close(*self)
    }

    fn direction(&self) -> Direction {
        Direction::Read
    }
}

impl<W: Write> RecordMapper for RecordWriter<W> {
    fn write(&mut self, record: &LogicalRecord) -> Result<()> {
        self.write_record(record)
    }

    fn close(self: Box<Self>) -> Result<()> {
        RecordWriter::close(*self)
    }

    fn direction(&self) -> Direction {
        Direction::Write
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::FixedLengthConfig;
    use crate::converter::DefaultConverter;
    use std::io::{self, Cursor};
    use std::sync::{Arc, Mutex};

    fn config() -> Arc<FixedLengthConfig> {
        Arc::new(
            FixedLengthConfig::builder()
                .length(8)
                .line_separator("\r\n")
                .single_layout()
                .field("name", 1, 8, DefaultConverter)
                .build()
                .unwrap(),
        )
    }

    #[test]
    fn test_reader_rejects_write() {
        let mut mapper: Box<dyn RecordMapper> =
            Box::new(RecordReader::new(Cursor::new(b"testname".to_vec()), config()));
        assert_eq!(mapper.direction(), Direction::Read);

        let err = mapper
            .write(&LogicalRecord::new().field("name", "testname"))
            .unwrap_err();
        assert_eq!(err.to_string(), "unsupported write method.");

        let record = mapper.read().unwrap().unwrap();
        assert_eq!(record.get("name").and_then(|v| v.as_str()), Some("testname"));
        assert!(mapper.read().unwrap().is_none());
        mapper.close().unwrap();
    }

    #[test]
    fn test_writer_rejects_read() {
        let mut mapper: Box<dyn RecordMapper> = Box::new(RecordWriter::new(Vec::new(), config()));
        assert_eq!(mapper.direction(), Direction::Write);
        let err = mapper.read().unwrap_err();
        assert!(matches!(err, CodecError::Unsupported(Direction::Read)));
        assert_eq!(err.to_string(), "unsupported read method.");
        mapper.close().unwrap();
    }

    /// Sink that records whether it was flushed and dropped.
    struct Tracked {
        log: Arc<Mutex<Vec<&'static str>>>,
        data: Vec<u8>,
    }

    impl Write for Tracked {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.data.extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            self.log.lock().unwrap().push("flush");
            Ok(())
        }
    }

    impl Drop for Tracked {
        fn drop(&mut self) {
            self.log.lock().unwrap().push("drop");
        }
    }

    #[test]
    fn test_close_flushes_and_releases_sink() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let sink = Tracked {
            log: Arc::clone(&log),
            data: Vec::new(),
        };
        let mut mapper: Box<dyn RecordMapper> = Box::new(RecordWriter::new(sink, config()));
        mapper
            .write(&LogicalRecord::new().field("name", "testname"))
            .unwrap();
        mapper.close().unwrap();
        assert_eq!(*log.lock().unwrap(), vec!["flush", "drop"]);
    }
}
