//! # fixedlength-rs
//!
//! A fixed-length record codec for byte streams.
//!
//! Each record occupies exactly `length` bytes, optionally followed by a line
//! separator. Fields are addressed by 1-based byte offset and length, so
//! multi-byte charsets such as Shift_JIS are sliced by bytes, never by
//! characters.
//!
//! ## Overview
//!
//! - **Configuration**: record length, charset, line separator, fill
//!   character and one or more record layouts, frozen by a builder
//! - **Reading**: [`RecordReader`] yields one [`LogicalRecord`] per record
//! - **Writing**: [`RecordWriter`] assembles fixed buffers from records
//! - **Multi-layout files**: a [`RecordIdentifier`] picks the layout of
//!   each raw record
//! - **Layout files**: [`dsl::parse_layout`] reads a text definition
//!
//! ## Example
//!
//! ```
//! use std::io::Cursor;
//! use std::sync::Arc;
//! use fixedlength_rs::{FixedLengthConfig, Lpad, LogicalRecord, RecordReader, RecordWriter, Rpad};
//!
//! let config = Arc::new(
//!     FixedLengthConfig::builder()
//!         .length(10)
//!         .line_separator("\n")
//!         .single_layout()
//!         .field("name", 1, 7, Rpad::default())
//!         .field("age", 8, 3, Lpad::default())
//!         .build()
//!         .unwrap(),
//! );
//!
//! let mut writer = RecordWriter::new(Vec::new(), Arc::clone(&config));
//! writer
//!     .write_record(&LogicalRecord::new().field("name", "SMITH").field("age", 42))
//!     .unwrap();
//! let bytes = writer.into_inner().unwrap();
//! assert_eq!(bytes, b"SMITH  042\n");
//!
//! let mut reader = RecordReader::new(Cursor::new(bytes), config);
//! let record = reader.read_record().unwrap().unwrap();
//! assert_eq!(record.get("name").and_then(|v| v.as_str()), Some("SMITH"));
//! assert_eq!(record.get("age").and_then(|v| v.to_int()), Some(42));
//! assert_eq!(record.line_number(), Some(1));
//! ```

pub mod charset;
pub mod config;
pub mod converter;
pub mod dsl;
pub mod error;
pub mod layout;
pub mod mapper;
pub mod reader;
pub mod value;
pub mod writer;

pub use charset::Charset;
pub use config::{
    FixedLengthConfig, FixedLengthConfigBuilder, MultiLayoutBuilder, SingleLayoutBuilder,
};
pub use converter::{Binary, DefaultConverter, FieldConverter, Filler, Lpad, Rpad};
pub use dsl::{DslError, parse_layout};
pub use error::{
    CodecError, ConfigError, ConvertError, Direction, FormatViolation, Result, SlotOverflow,
};
pub use layout::{FILLER_FIELD_NAME, Field, RecordIdentifier, RecordLayout, RuleIdentifier};
pub use mapper::RecordMapper;
pub use reader::RecordReader;
pub use value::{FieldMap, LogicalRecord, Value};
pub use writer::RecordWriter;
