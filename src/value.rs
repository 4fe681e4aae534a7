//! Logical values exchanged with the binding adapter.
//!
//! A [`LogicalRecord`] is what the reader yields and the writer consumes:
//! a field-name keyed map plus, for multi-layout streams, the record name,
//! and on the read path the 1-based line number.

use std::collections::BTreeMap;
use std::fmt;

/// Field-name keyed values of one record.
pub type FieldMap = BTreeMap<String, Value>;

/// A decoded or pre-encode field value.
///
/// Different variants never compare equal: `String("1")` != `Int(1)`.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Value {
    /// Absent value. Text converters encode it as the empty string.
    #[default]
    Null,
    Int(i64),
    String(String),
    /// Raw bytes, produced and consumed by the binary converter.
    Bytes(Vec<u8>),
    /// Nested record data, used for multi-layout records.
    Object(FieldMap),
}

impl Value {
    /// Returns the type name as a string (for error messages)
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Null => "Null",
            Value::Int(_) => "Int",
            Value::String(_) => "String",
            Value::Bytes(_) => "Bytes",
            Value::Object(_) => "Object",
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            Value::Bytes(b) => Some(b),
            _ => None,
        }
    }

    pub fn as_object(&self) -> Option<&FieldMap> {
        match self {
            Value::Object(m) => Some(m),
            _ => None,
        }
    }

    /// Interpret the value as an optional integer.
    ///
    /// `Null` and empty text are absent; decimal text is parsed. Other
    /// shapes, and text that is not a number, yield `None` as well.
    pub fn to_int(&self) -> Option<i64> {
        match self {
            Value::Int(i) => Some(*i),
            Value::String(s) if !s.is_empty() => s.parse().ok(),
            _ => None,
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Value::Int(i)
    }
}

impl From<i32> for Value {
    fn from(i: i32) -> Self {
        Value::Int(i64::from(i))
    }
}

impl From<Vec<u8>> for Value {
    fn from(b: Vec<u8>) -> Self {
        Value::Bytes(b)
    }
}

impl From<&[u8]> for Value {
    fn from(b: &[u8]) -> Self {
        Value::Bytes(b.to_vec())
    }
}

impl From<FieldMap> for Value {
    fn from(m: FieldMap) -> Self {
        Value::Object(m)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map_or(Value::Null, Into::into)
    }
}

/// One record on its way into or out of the codec.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct LogicalRecord {
    record_name: Option<String>,
    fields: FieldMap,
    line_number: Option<u64>,
}

impl LogicalRecord {
    /// Create an empty single-layout record.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a single-layout record from field values.
    pub fn from_fields(fields: FieldMap) -> Self {
        Self {
            record_name: None,
            fields,
            line_number: None,
        }
    }

    /// Create a multi-layout record whose data sits under `name`.
    pub fn with_record(name: impl Into<String>, data: FieldMap) -> Self {
        let name = name.into();
        let mut fields = FieldMap::new();
        fields.insert(name.clone(), Value::Object(data));
        Self {
            record_name: Some(name),
            fields,
            line_number: None,
        }
    }

    /// Builder-style field insertion.
    pub fn field(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.fields.insert(name.into(), value.into());
        self
    }

    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<Value>) {
        self.fields.insert(name.into(), value.into());
    }

    pub fn set_record_name(&mut self, name: impl Into<String>) {
        self.record_name = Some(name.into());
    }

    pub(crate) fn set_line_number(&mut self, line_number: u64) {
        self.line_number = Some(line_number);
    }

    pub fn record_name(&self) -> Option<&str> {
        self.record_name.as_deref()
    }

    /// 1-based line number, set on records produced by a reader.
    pub fn line_number(&self) -> Option<u64> {
        self.line_number
    }

    pub fn fields(&self) -> &FieldMap {
        &self.fields
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.fields.get(name)
    }

    /// The field values of the record's own layout.
    ///
    /// For a multi-layout record this is the object stored under the
    /// record name; otherwise the top-level fields.
    pub fn data(&self) -> Option<&FieldMap> {
        match &self.record_name {
            Some(name) => self.fields.get(name).and_then(Value::as_object),
            None => Some(&self.fields),
        }
    }

    /// Strip read-path metadata so a decoded record compares equal to the
    /// record it was encoded from.
    pub fn without_line_number(mut self) -> Self {
        self.line_number = None;
        self
    }

    pub fn into_fields(self) -> FieldMap {
        self.fields
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => write!(f, "null"),
            Value::Int(i) => write!(f, "{i}"),
            Value::String(s) => write!(f, "{s:?}"),
            Value::Bytes(bytes) => {
                write!(f, "0x")?;
                bytes.iter().try_for_each(|b| write!(f, "{b:02x}"))
            }
            Value::Object(map) => {
                write!(f, "{{")?;
                write_fields(f, map, ", ")?;
                write!(f, "}}")
            }
        }
    }
}

fn write_fields(f: &mut fmt::Formatter<'_>, map: &FieldMap, sep: &str) -> fmt::Result {
    for (i, (name, value)) in map.iter().enumerate() {
        if i > 0 {
            write!(f, "{sep}")?;
        }
        write!(f, "{name}={value}")?;
    }
    Ok(())
}

/// One-line dump: `line 2 [data] age=12 name="aaa"`.
impl fmt::Display for LogicalRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(line) = self.line_number {
            write!(f, "line {line} ")?;
        }
        if let Some(name) = &self.record_name {
            write!(f, "[{name}] ")?;
        }
        match self.data() {
            Some(data) => write_fields(f, data, " "),
            None => write_fields(f, &self.fields, " "),
        }
    }
}
