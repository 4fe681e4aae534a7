//! Layout definition parser.
//!
//! Layout format:
//! ```text
//! # customer file
//! LENGTH 19
//! CHARSET MS932
//! SEPARATOR CRLF
//! FIELD name 1,8 RPAD " "
//! FIELD text 9,8 RPAD "a"
//! FIELD age 17,3 LPAD
//! ```
//!
//! Multi-layout files declare records; each record is selected by a byte
//! comparison on the raw record, tried in declaration order:
//! ```text
//! LENGTH 8
//! SEPARATOR CRLF
//! RECORD header WHEN 1,1 = "1"
//! FIELD id 1,1
//! FIELD field 2,7 RPAD
//! RECORD data OTHERWISE
//! FIELD id 1,1
//! FIELD name 2,4 RPAD
//! FIELD age 6,3 LPAD
//! ```
//!
//! Supported directives:
//! - `LENGTH n` - Record length in bytes (required)
//! - `CHARSET label` - Charset label, e.g. `MS932`, `UTF-8` (default UTF-8)
//! - `SEPARATOR CRLF|LF|CR|NONE|"text"` - Line separator (default NONE)
//! - `FILL "c"` - Fill character for filler slots (default space)
//! - `RECORD name WHEN pos,len = "value"` - Record selected by field value
//! - `RECORD name OTHERWISE` - Record selected when no rule matches
//! - `FIELD name pos,len [DEFAULT | RPAD ["c"] | LPAD ["c"] | BINARY]`
//! - `FILLER pos,len` - Unnamed slot written with the fill character
//! - Lines starting with `#` are comments
//!
//! Strings use the CMS Pipelines convention: the first non-blank character
//! is the delimiter, so `"a"`, `'a'` and `/a/` are all the same string.

use thiserror::Error;
use tracing::debug;

use crate::charset::Charset;
use crate::config::FixedLengthConfig;
use crate::converter::{Binary, DefaultConverter, FieldConverter, Lpad, Rpad};
use crate::error::ConfigError;
use crate::layout::RuleIdentifier;

/// Failure to turn layout text into a configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DslError {
    #[error("Line {line}: {message}")]
    Syntax { line: usize, message: String },

    #[error(transparent)]
    Config(#[from] ConfigError),
}

/// Converter named in a `FIELD` directive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConverterSpec {
    Default,
    Rpad(Option<char>),
    Lpad(Option<char>),
    Binary,
}

impl ConverterSpec {
    fn build(self) -> Box<dyn FieldConverter> {
        match self {
            ConverterSpec::Default => Box::new(DefaultConverter),
            ConverterSpec::Rpad(pad) => Box::new(pad.map_or_else(Rpad::default, Rpad::new)),
            ConverterSpec::Lpad(pad) => Box::new(pad.map_or_else(Lpad::default, Lpad::new)),
            ConverterSpec::Binary => Box::new(Binary),
        }
    }
}

/// How a `RECORD` is recognized.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecordRule {
    When {
        pos: usize,
        len: usize,
        value: String,
    },
    Otherwise,
}

/// One parsed layout line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Directive {
    /// LENGTH n
    Length(usize),
    /// CHARSET label
    Charset(String),
    /// SEPARATOR CRLF|LF|CR|NONE|"text"
    Separator(String),
    /// FILL "c"
    Fill(char),
    /// RECORD name WHEN pos,len = "value" | RECORD name OTHERWISE
    Record { name: String, rule: RecordRule },
    /// FIELD name pos,len [converter]
    Field {
        name: String,
        pos: usize,
        len: usize,
        converter: ConverterSpec,
    },
    /// FILLER pos,len
    Filler { pos: usize, len: usize },
}

impl Directive {
    /// Get the directive keyword for error messages.
    pub fn name(&self) -> &'static str {
        match self {
            Directive::Length(_) => "LENGTH",
            Directive::Charset(_) => "CHARSET",
            Directive::Separator(_) => "SEPARATOR",
            Directive::Fill(_) => "FILL",
            Directive::Record { .. } => "RECORD",
            Directive::Field { .. } => "FIELD",
            Directive::Filler { .. } => "FILLER",
        }
    }
}

/// Parse layout text into directives tagged with their 1-based line numbers.
pub fn parse_directives(text: &str) -> Result<Vec<(usize, Directive)>, DslError> {
    let mut directives = Vec::new();

    for (line_num, line) in text.lines().enumerate() {
        let line = line.trim();

        // Skip empty lines and comments
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        let directive = parse_directive(line).map_err(|message| DslError::Syntax {
            line: line_num + 1,
            message,
        })?;
        directives.push((line_num + 1, directive));
    }

    Ok(directives)
}

/// Parse layout text into a frozen configuration.
pub fn parse_layout(text: &str) -> Result<FixedLengthConfig, DslError> {
    let directives = parse_directives(text)?;

    let mut builder = FixedLengthConfig::builder();
    let mut charset = Charset::default();
    for (line, directive) in &directives {
        builder = match directive {
            Directive::Length(n) => builder.length(*n),
            Directive::Charset(label) => {
                charset = Charset::for_label(label).map_err(|e| DslError::Syntax {
                    line: *line,
                    message: e.to_string(),
                })?;
                builder.charset(charset)
            }
            Directive::Separator(text) => builder.line_separator(text.as_str()),
            Directive::Fill(c) => builder.fill_char(*c),
            _ => builder,
        };
    }

    let multi = directives
        .iter()
        .any(|(_, d)| matches!(d, Directive::Record { .. }));

    if !multi {
        let mut single = builder.single_layout();
        for (_, directive) in &directives {
            single = match directive {
                Directive::Field {
                    name,
                    pos,
                    len,
                    converter,
                } => single.field(name.as_str(), *pos, *len, converter.build()),
                Directive::Filler { pos, len } => single.filler(*pos, *len),
                _ => single,
            };
        }
        debug!("parsed single layout definition");
        return Ok(single.build()?);
    }

    let mut identifier = RuleIdentifier::new();
    let mut layout = builder.multi_layout();
    for (line, directive) in &directives {
        layout = match directive {
            Directive::Record { name, rule } => {
                identifier = match rule {
                    RecordRule::When { pos, len, value } => {
                        let expected = charset
                            .encode(value)
                            .map(|b| b.into_owned())
                            .ok_or_else(|| DslError::Syntax {
                                line: *line,
                                message: format!("RECORD value '{value}' can not be encoded"),
                            })?;
                        if expected.len() != *len {
                            return Err(DslError::Syntax {
                                line: *line,
                                message: format!(
                                    "RECORD value '{value}' is {} bytes but field length is {len}",
                                    expected.len()
                                ),
                            });
                        }
                        identifier.when(*pos, expected, name.as_str())
                    }
                    RecordRule::Otherwise => identifier.otherwise(name.as_str()),
                };
                layout.record(name.as_str())
            }
            Directive::Field {
                name,
                pos,
                len,
                converter,
            } => layout.field(name.as_str(), *pos, *len, converter.build()),
            Directive::Filler { pos, len } => layout.filler(*pos, *len),
            _ => layout,
        };
    }
    debug!(rules = identifier.rules().len(), "parsed multi layout definition");
    Ok(layout.record_identifier(identifier).build()?)
}

/// Parse a single directive line.
fn parse_directive(line: &str) -> Result<Directive, String> {
    let (keyword, rest) = split_token(line);

    match keyword.to_uppercase().as_str() {
        "LENGTH" => {
            let n: usize = rest.parse().map_err(|_| "LENGTH requires a number")?;
            Ok(Directive::Length(n))
        }
        "CHARSET" => {
            if rest.is_empty() {
                return Err("CHARSET requires a charset label".to_string());
            }
            Ok(Directive::Charset(rest.to_string()))
        }
        "SEPARATOR" => parse_separator(rest),
        "FILL" => Ok(Directive::Fill(parse_char(rest, "FILL")?)),
        "RECORD" => parse_record(rest),
        "FIELD" => parse_field(rest),
        "FILLER" => {
            let (pos, len) = parse_pos_len(rest, "FILLER")?;
            Ok(Directive::Filler { pos, len })
        }
        _ => Err(format!("Unknown directive: {keyword}")),
    }
}

/// Parse SEPARATOR directive.
fn parse_separator(rest: &str) -> Result<Directive, String> {
    let text = match rest.to_uppercase().as_str() {
        "CRLF" => "\r\n".to_string(),
        "LF" => "\n".to_string(),
        "CR" => "\r".to_string(),
        "NONE" => String::new(),
        "" => return Err("SEPARATOR requires CRLF, LF, CR, NONE or a string".to_string()),
        _ => parse_delimited_string(rest)?.0,
    };
    Ok(Directive::Separator(text))
}

/// Parse RECORD directive.
/// Formats:
///   RECORD name WHEN pos,len = "value"
///   RECORD name OTHERWISE
fn parse_record(rest: &str) -> Result<Directive, String> {
    let mut parts = rest.splitn(2, char::is_whitespace);
    let name = parts.next().unwrap_or("").to_string();
    if name.is_empty() {
        return Err("RECORD requires a record name".to_string());
    }
    let rule_part = parts.next().unwrap_or("").trim();
    let upper = rule_part.to_uppercase();

    if upper == "OTHERWISE" {
        return Ok(Directive::Record {
            name,
            rule: RecordRule::Otherwise,
        });
    }
    let Some(condition) = upper.starts_with("WHEN").then(|| rule_part[4..].trim()) else {
        return Err(format!("RECORD {name} requires WHEN pos,len = \"value\" or OTHERWISE"));
    };

    let Some(idx) = condition.find('=') else {
        return Err("RECORD WHEN requires = operator".to_string());
    };
    let (pos, len) = parse_pos_len(condition[..idx].trim(), "RECORD WHEN")?;
    let (value, _) = parse_delimited_string(&condition[idx + 1..])?;

    Ok(Directive::Record {
        name,
        rule: RecordRule::When { pos, len, value },
    })
}

/// Parse FIELD directive.
fn parse_field(rest: &str) -> Result<Directive, String> {
    let (name, rest) = split_token(rest);
    if name.is_empty() {
        return Err("FIELD requires a field name".to_string());
    }
    let (pos_len, rest) = split_token(rest);
    let (pos, len) = parse_pos_len(pos_len, "FIELD")?;
    let converter = parse_converter(rest)?;
    Ok(Directive::Field {
        name: name.to_string(),
        pos,
        len,
        converter,
    })
}

/// Parse the optional converter clause of a FIELD directive.
fn parse_converter(s: &str) -> Result<ConverterSpec, String> {
    if s.is_empty() {
        return Ok(ConverterSpec::Default);
    }
    let (keyword, arg) = split_token(s);
    let pad = |label: &str| -> Result<Option<char>, String> {
        if arg.is_empty() {
            Ok(None)
        } else {
            parse_char(arg, label).map(Some)
        }
    };

    match keyword.to_uppercase().as_str() {
        "DEFAULT" => Ok(ConverterSpec::Default),
        "RPAD" => Ok(ConverterSpec::Rpad(pad("RPAD")?)),
        "LPAD" => Ok(ConverterSpec::Lpad(pad("LPAD")?)),
        "BINARY" => Ok(ConverterSpec::Binary),
        _ => Err(format!("Unknown converter: {keyword}")),
    }
}

/// Split off the first whitespace-delimited token.
/// Returns (token, trimmed_rest).
fn split_token(s: &str) -> (&str, &str) {
    let s = s.trim_start();
    match s.find(char::is_whitespace) {
        Some(idx) => (&s[..idx], s[idx..].trim()),
        None => (s, ""),
    }
}

/// Parse `pos,len` with a 1-based position.
fn parse_pos_len(s: &str, what: &str) -> Result<(usize, usize), String> {
    let parts: Vec<&str> = s.split(',').collect();
    if parts.len() != 2 {
        return Err(format!("{what} requires pos,len"));
    }

    let pos: usize = parts[0]
        .trim()
        .parse()
        .map_err(|_| format!("Invalid position number in {what}"))?;
    let len: usize = parts[1]
        .trim()
        .parse()
        .map_err(|_| format!("Invalid length number in {what}"))?;
    if pos == 0 {
        return Err(format!("{what} position must be greater than 0"));
    }
    Ok((pos, len))
}

/// Parse a delimited string holding exactly one character.
fn parse_char(s: &str, what: &str) -> Result<char, String> {
    let (text, _) = parse_delimited_string(s)?;
    let mut chars = text.chars();
    match (chars.next(), chars.next()) {
        (Some(c), None) => Ok(c),
        _ => Err(format!("{what} requires a single character")),
    }
}

/// Parse a delimited string using CMS Pipelines convention.
/// The first non-blank character is the delimiter, and the string
/// continues until the next occurrence of that delimiter.
/// Returns (extracted_string, rest_of_input).
fn parse_delimited_string(s: &str) -> Result<(String, &str), String> {
    let s = s.trim_start();
    let Some(delim) = s.chars().next() else {
        return Err("Expected delimited string".to_string());
    };
    let after_delim = &s[delim.len_utf8()..];

    // Find the closing delimiter
    if let Some(end) = after_delim.find(delim) {
        let extracted = after_delim[..end].to_string();
        let rest = &after_delim[end + delim.len_utf8()..];
        Ok((extracted, rest))
    } else {
        Err(format!("Unclosed delimiter '{delim}'"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layout::RecordIdentifier;
    use std::fs;
    use std::path::Path;

    fn spec_file(name: &str) -> String {
        let spec_dir = Path::new(env!("CARGO_MANIFEST_DIR")).join("specs");
        fs::read_to_string(spec_dir.join(name)).unwrap()
    }

    #[test]
    fn test_parse_length() {
        let directives = parse_directives("LENGTH 19").unwrap();
        assert_eq!(directives, vec![(1, Directive::Length(19))]);
    }

    #[test]
    fn test_parse_field_default() {
        let (_, directive) = parse_directives("FIELD id 1,1").unwrap().remove(0);
        assert_eq!(
            directive,
            Directive::Field {
                name: "id".to_string(),
                pos: 1,
                len: 1,
                converter: ConverterSpec::Default,
            }
        );
    }

    #[test]
    fn test_parse_field_converters() {
        let text = r#"FIELD name 1,8 RPAD " "
FIELD text 9,8 rpad 'a'
FIELD age 17,3 LPAD
FIELD kana 20,4 LPAD "　"
FIELD raw 24,2 BINARY"#;
        let converters: Vec<_> = parse_directives(text)
            .unwrap()
            .into_iter()
            .map(|(_, d)| match d {
                Directive::Field { converter, .. } => converter,
                other => panic!("Expected Field, got {}", other.name()),
            })
            .collect();
        assert_eq!(
            converters,
            vec![
                ConverterSpec::Rpad(Some(' ')),
                ConverterSpec::Rpad(Some('a')),
                ConverterSpec::Lpad(None),
                ConverterSpec::Lpad(Some('　')),
                ConverterSpec::Binary,
            ]
        );
    }

    #[test]
    fn test_parse_record_rules() {
        let text = r#"RECORD header WHEN 1,1 = "1"
RECORD data OTHERWISE"#;
        let directives = parse_directives(text).unwrap();
        assert_eq!(
            directives[0].1,
            Directive::Record {
                name: "header".to_string(),
                rule: RecordRule::When {
                    pos: 1,
                    len: 1,
                    value: "1".to_string()
                },
            }
        );
        assert_eq!(
            directives[1].1,
            Directive::Record {
                name: "data".to_string(),
                rule: RecordRule::Otherwise,
            }
        );
    }

    #[test]
    fn test_parse_separator_forms() {
        let text = "SEPARATOR CRLF\nSEPARATOR lf\nSEPARATOR NONE\nSEPARATOR /--/";
        let seps: Vec<_> = parse_directives(text)
            .unwrap()
            .into_iter()
            .map(|(_, d)| d)
            .collect();
        assert_eq!(
            seps,
            vec![
                Directive::Separator("\r\n".to_string()),
                Directive::Separator("\n".to_string()),
                Directive::Separator(String::new()),
                Directive::Separator("--".to_string()),
            ]
        );
    }

    #[test]
    fn test_comments_and_blank_lines_skipped() {
        let directives = parse_directives("# header\n\nLENGTH 3\n  # indented\n").unwrap();
        assert_eq!(directives, vec![(3, Directive::Length(3))]);
    }

    #[test]
    fn test_unknown_directive_reports_line() {
        let err = parse_directives("LENGTH 3\nCOLUMN a 1,1").unwrap_err();
        assert_eq!(err.to_string(), "Line 2: Unknown directive: COLUMN");
    }

    #[test]
    fn test_syntax_errors() {
        assert!(parse_directives("LENGTH abc").is_err());
        assert!(parse_directives("FIELD name 1").is_err());
        assert!(parse_directives("FIELD name 0,3").is_err());
        assert!(parse_directives("FIELD name 1,3 ZPAD").is_err());
        assert!(parse_directives("FIELD name 1,3 RPAD \"ab\"").is_err());
        assert!(parse_directives("FILL \"x").is_err());
        assert!(parse_directives("RECORD header").is_err());
        assert!(parse_directives("RECORD header WHEN 1,1 \"1\"").is_err());
    }

    #[test]
    fn test_single_layout_fixture() {
        let config = parse_layout(&spec_file("name-text-age.fixed")).unwrap();
        assert_eq!(config.length(), 19);
        assert_eq!(config.charset(), Charset::shift_jis());
        assert_eq!(config.line_separator(), b"\r\n");
        let record = config.single_record().unwrap();
        let names: Vec<_> = record.fields().iter().map(|f| f.name()).collect();
        assert_eq!(names, vec!["name", "text", "age"]);
    }

    #[test]
    fn test_multi_layout_fixture() {
        let config = parse_layout(&spec_file("header-data.fixed")).unwrap();
        assert!(config.is_multi_layout());
        assert_eq!(config.records().len(), 2);
        let identifier = config.record_identifier().unwrap();
        assert_eq!(identifier.identify(b"1test   "), Some("header"));
        assert_eq!(identifier.identify(b"2aaa 012"), Some("data"));
    }

    #[test]
    fn test_rule_value_length_mismatch() {
        let text = "LENGTH 4\nRECORD a WHEN 1,2 = \"1\"\nFIELD x 1,4";
        let err = parse_layout(text).unwrap_err();
        assert!(matches!(err, DslError::Syntax { line: 2, .. }));
    }

    #[test]
    fn test_field_before_record() {
        let text = "LENGTH 4\nFIELD x 1,4\nRECORD a OTHERWISE\nFIELD x 1,4";
        let err = parse_layout(text).unwrap_err();
        assert_eq!(err, DslError::Config(ConfigError::FieldBeforeRecord));
    }

    #[test]
    fn test_missing_length() {
        let err = parse_layout("FIELD x 1,4").unwrap_err();
        assert_eq!(err, DslError::Config(ConfigError::InvalidLength));
    }

    #[test]
    fn test_unknown_charset() {
        let err = parse_layout("LENGTH 4\nCHARSET EBCDIC-XYZ\nFIELD x 1,4").unwrap_err();
        assert!(matches!(err, DslError::Syntax { line: 2, .. }));
        assert_eq!(
            err.to_string(),
            "Line 2: charset is not supported. charset:EBCDIC-XYZ"
        );
    }

    #[test]
    fn test_field_tokens_separated_by_runs_of_blanks() {
        let (_, directive) = parse_directives("FIELD  x  1,4 \t RPAD  \"　\"").unwrap().remove(0);
        assert_eq!(
            directive,
            Directive::Field {
                name: "x".to_string(),
                pos: 1,
                len: 4,
                converter: ConverterSpec::Rpad(Some('　')),
            }
        );
    }
}
