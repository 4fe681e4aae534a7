//! Read and write records through real files.

use std::fs::{self, File};
use std::io::{BufReader, Write};
use std::sync::Arc;

use fixedlength_rs::{
    Charset, CodecError, FieldMap, FixedLengthConfig, FormatViolation, LogicalRecord, Lpad,
    RecordMapper, RecordReader, RecordWriter, Rpad, RuleIdentifier, Value,
};
use tempfile::NamedTempFile;

fn customer_config() -> Arc<FixedLengthConfig> {
    Arc::new(
        FixedLengthConfig::builder()
            .length(19)
            .charset(Charset::shift_jis())
            .line_separator("\r\n")
            .single_layout()
            .field("name", 1, 8, Rpad::default())
            .field("text", 9, 8, Rpad::new('a'))
            .field("age", 17, 3, Lpad::default())
            .build()
            .unwrap(),
    )
}

fn sjis(text: &str) -> Vec<u8> {
    Charset::shift_jis().encode(text).unwrap().into_owned()
}

#[test]
fn test_write_then_read_file() {
    let file = NamedTempFile::new().unwrap();
    let config = customer_config();

    let mut writer = RecordWriter::new(file.reopen().unwrap(), Arc::clone(&config));
    writer
        .write_record(
            &LogicalRecord::new()
                .field("name", "testname")
                .field("text", "testtext")
                .field("age", 100),
        )
        .unwrap();
    writer
        .write_record(
            &LogicalRecord::new()
                .field("name", "name")
                .field("text", "text")
                .field("age", 12),
        )
        .unwrap();
    assert_eq!(writer.records_written(), 2);
    writer.close().unwrap();

    assert_eq!(
        fs::read(file.path()).unwrap(),
        b"testnametesttext100\r\nname    textaaaa012\r\n"
    );

    let reader = RecordReader::new(BufReader::new(File::open(file.path()).unwrap()), config);
    let records: Vec<LogicalRecord> = reader.collect::<Result<_, _>>().unwrap();
    assert_eq!(records.len(), 2);
    assert_eq!(records[1].get("name"), Some(&Value::from("name")));
    assert_eq!(records[1].get("text"), Some(&Value::from("text")));
    assert_eq!(records[1].get("age").and_then(Value::to_int), Some(12));
    assert_eq!(records[1].line_number(), Some(2));
}

#[test]
fn test_read_shift_jis_file() {
    let mut file = NamedTempFile::new().unwrap();
    file.write_all(&sjis("ab  あい003\r\nefg か　000")).unwrap();
    file.flush().unwrap();

    let config = Arc::new(
        FixedLengthConfig::builder()
            .length(11)
            .charset(Charset::for_label("MS932").unwrap())
            .line_separator("\r\n")
            .single_layout()
            .field("name", 1, 4, Rpad::default())
            .field("text", 5, 4, Rpad::new('　'))
            .field("age", 9, 3, Lpad::default())
            .build()
            .unwrap(),
    );
    let mut reader = RecordReader::new(File::open(file.path()).unwrap(), config);

    let first = reader.read_record().unwrap().unwrap();
    assert_eq!(first.get("name").and_then(Value::as_str), Some("ab"));
    assert_eq!(first.get("text").and_then(Value::as_str), Some("あい"));
    assert_eq!(first.get("age").and_then(Value::to_int), Some(3));
    assert_eq!(first.line_number(), Some(1));

    let second = reader.read_record().unwrap().unwrap();
    assert_eq!(second.get("name").and_then(Value::as_str), Some("efg"));
    assert_eq!(second.get("text").and_then(Value::as_str), Some("か"));
    assert_eq!(second.get("age").and_then(Value::to_int), None);
    assert_eq!(second.line_number(), Some(2));

    assert!(reader.read_record().unwrap().is_none());
    assert!(reader.is_eof());
}

#[test]
fn test_short_final_record_in_file() {
    let mut file = NamedTempFile::new().unwrap();
    file.write_all(b"testname123\r\ninvalid").unwrap();
    file.flush().unwrap();

    let config = Arc::new(
        FixedLengthConfig::builder()
            .length(11)
            .line_separator("\r\n")
            .single_layout()
            .field("name", 1, 8, Rpad::default())
            .field("age", 9, 3, Lpad::default())
            .build()
            .unwrap(),
    );
    let mut reader = RecordReader::new(File::open(file.path()).unwrap(), config);
    assert!(reader.read_record().unwrap().is_some());

    let err = reader.read_record().unwrap_err();
    assert!(matches!(
        err,
        CodecError::InvalidDataFormat {
            reason: FormatViolation::ShortRecord,
            line_number: 2,
        }
    ));
    assert_eq!(
        err.to_string(),
        "data format is invalid. last record is short. line number = [2]"
    );
    assert!(matches!(
        reader.read_record(),
        Err(CodecError::Poisoned { line_number: 2 })
    ));
}

#[test]
fn test_multi_layout_file_through_mapper() {
    let config = Arc::new(
        FixedLengthConfig::builder()
            .length(8)
            .line_separator("\r\n")
            .multi_layout()
            .record("header")
            .field("id", 1, 1, Rpad::default())
            .field("field", 2, 7, Rpad::default())
            .record("data")
            .field("id", 1, 1, Rpad::default())
            .field("name", 2, 4, Rpad::default())
            .field("age", 6, 3, Lpad::default())
            .record_identifier(RuleIdentifier::new().when(1, *b"1", "header").otherwise("data"))
            .build()
            .unwrap(),
    );

    let header = {
        let mut data = FieldMap::new();
        data.insert("id".to_string(), Value::from("1"));
        data.insert("field".to_string(), Value::from("test"));
        LogicalRecord::with_record("header", data)
    };
    let data = |name: &str, age: i64| {
        let mut data = FieldMap::new();
        data.insert("id".to_string(), Value::from("2"));
        data.insert("name".to_string(), Value::from(name));
        data.insert("age".to_string(), Value::from(age));
        LogicalRecord::with_record("data", data)
    };

    let file = NamedTempFile::new().unwrap();
    let mut mapper: Box<dyn RecordMapper> =
        Box::new(RecordWriter::new(file.reopen().unwrap(), Arc::clone(&config)));
    mapper.write(&header).unwrap();
    mapper.write(&data("aaa", 12)).unwrap();
    mapper.write(&data("bb", 345)).unwrap();
    mapper.close().unwrap();

    assert_eq!(
        fs::read(file.path()).unwrap(),
        b"1test   \r\n2aaa 012\r\n2bb  345\r\n"
    );

    let mut mapper: Box<dyn RecordMapper> =
        Box::new(RecordReader::new(File::open(file.path()).unwrap(), config));
    let mut names = Vec::new();
    while let Some(record) = mapper.read().unwrap() {
        names.push(record.record_name().map(str::to_string));
    }
    mapper.close().unwrap();
    assert_eq!(
        names,
        vec![
            Some("header".to_string()),
            Some("data".to_string()),
            Some("data".to_string())
        ]
    );
}
