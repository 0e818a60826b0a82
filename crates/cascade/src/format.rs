//! Structured data file formats

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use std::collections::HashSet;
use std::path::Path;
use types::{CascadeError, Result, Value};

/// Format of a structured data file, chosen by extension
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DataFormat {
    Json,
    Yaml,
}

impl DataFormat {
    /// `.yaml`/`.yml` are YAML, anything else is read as JSON
    pub fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|e| e.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("yaml") || ext.eq_ignore_ascii_case("yml") => {
                DataFormat::Yaml
            }
            _ => DataFormat::Json,
        }
    }

    /// Whether a directory walk should pick up this file
    pub fn is_data_file(path: &Path) -> bool {
        matches!(
            path.extension().and_then(|e| e.to_str()),
            Some("json") | Some("yaml") | Some("yml")
        )
    }

    pub fn parse(self, text: &str, source_name: &str) -> Result<Value> {
        match self {
            DataFormat::Json => parse_json(text, source_name),
            DataFormat::Yaml => parse_yaml(text, source_name),
        }
    }
}

pub fn parse_json(text: &str, source_name: &str) -> Result<Value> {
    serde_json::from_str::<serde_json::Value>(text)
        .map(Value::from)
        .map_err(|e| CascadeError::parse(source_name, e))
}

/// Parse YAML, turning plain date and timestamp scalars into `Value::Date`.
/// Quoted scalars stay strings. An empty document yields an empty mapping.
pub fn parse_yaml(text: &str, source_name: &str) -> Result<Value> {
    let doc: serde_yaml::Value =
        serde_yaml::from_str(text).map_err(|e| CascadeError::parse(source_name, e))?;
    Ok(match DateStyles::scan(text).convert(doc) {
        Value::Null => Value::object(),
        value => value,
    })
}

/// Read a file and parse it according to its extension
pub fn load_data_file(path: &Path) -> Result<Value> {
    let name = path.display().to_string();
    let text = std::fs::read_to_string(path).map_err(|e| CascadeError::from_io(&name, e))?;
    DataFormat::from_path(path).parse(&text, &name)
}

/// Date-shaped scalars of a YAML text in document order, each flagged when
/// it was written quoted.
///
/// The parsed document is walked in the same order. Once the two disagree
/// (aliases expand in the document but appear once in the text) a string
/// converts only if it never appears quoted.
struct DateStyles {
    scalars: std::vec::IntoIter<(String, bool)>,
    quoted: HashSet<String>,
    aligned: bool,
}

impl DateStyles {
    fn scan(text: &str) -> Self {
        let scalars = scan_date_scalars(text);
        let quoted = scalars
            .iter()
            .filter(|(_, quoted)| *quoted)
            .map(|(text, _)| text.clone())
            .collect();
        Self {
            scalars: scalars.into_iter(),
            quoted,
            aligned: true,
        }
    }

    fn is_quoted(&mut self, s: &str) -> bool {
        if self.aligned {
            match self.scalars.next() {
                Some((text, quoted)) if text == s => return quoted,
                _ => self.aligned = false,
            }
        }
        self.quoted.contains(s)
    }

    fn convert(&mut self, value: serde_yaml::Value) -> Value {
        match value {
            serde_yaml::Value::String(s) => match parse_date(&s) {
                Some(date) if !self.is_quoted(&s) => Value::Date(date),
                _ => Value::String(s),
            },
            serde_yaml::Value::Sequence(items) => {
                Value::Array(items.into_iter().map(|item| self.convert(item)).collect())
            }
            serde_yaml::Value::Mapping(mapping) => Value::Object(
                mapping
                    .into_iter()
                    .map(|(key, value)| {
                        let key = self.key(key);
                        (key, self.convert(value))
                    })
                    .collect(),
            ),
            serde_yaml::Value::Tagged(tagged) => self.convert(tagged.value),
            scalar => Value::from(scalar),
        }
    }

    fn key(&mut self, key: serde_yaml::Value) -> String {
        match key {
            serde_yaml::Value::String(s) => {
                if parse_date(&s).is_some() {
                    self.is_quoted(&s);
                }
                s
            }
            other => Value::from(other).to_interpolated_string(),
        }
    }
}

/// Collect date-shaped scalars, skipping comments and block scalars
fn scan_date_scalars(text: &str) -> Vec<(String, bool)> {
    let bytes = text.as_bytes();
    let mut found = Vec::new();
    let mut flow_depth = 0usize;
    let mut i = 0;

    let mut push = |scalar: &str, quoted: bool| {
        if parse_date(scalar).is_some() {
            found.push((scalar.to_string(), quoted));
        }
    };

    while i < bytes.len() {
        match bytes[i] {
            b'#' if i == 0 || bytes[i - 1].is_ascii_whitespace() => {
                i = line_end(bytes, i);
            }
            b'"' => {
                let mut end = i + 1;
                while end < bytes.len() && bytes[end] != b'"' {
                    end += if bytes[end] == b'\\' { 2 } else { 1 };
                }
                let end = end.min(bytes.len());
                push(&text[i + 1..end], true);
                i = end + 1;
            }
            b'\'' => {
                let mut end = i + 1;
                while end < bytes.len() {
                    if bytes[end] == b'\'' {
                        if bytes.get(end + 1) == Some(&b'\'') {
                            end += 2;
                            continue;
                        }
                        break;
                    }
                    end += 1;
                }
                let end = end.min(bytes.len());
                push(&text[i + 1..end], true);
                i = end + 1;
            }
            b'|' | b'>' if flow_depth == 0 => {
                let indent = line_indent(bytes, i);
                i = line_end(bytes, i);
                while i < bytes.len() {
                    let next = line_end(bytes, i + 1);
                    let line = &text[i + 1..next];
                    let blank = line.trim().is_empty();
                    if !blank && line.len() - line.trim_start_matches(' ').len() <= indent {
                        break;
                    }
                    i = next;
                }
            }
            b'[' | b'{' => {
                flow_depth += 1;
                i += 1;
            }
            b']' | b'}' => {
                flow_depth = flow_depth.saturating_sub(1);
                i += 1;
            }
            b',' if flow_depth > 0 => i += 1,
            b'-' | b'?' | b':' if is_separator(bytes.get(i + 1)) => i += 1,
            b'&' | b'*' | b'!' => {
                while i < bytes.len() && !bytes[i].is_ascii_whitespace() {
                    i += 1;
                }
            }
            byte if byte.is_ascii_whitespace() => i += 1,
            _ => {
                let start = i;
                while i < bytes.len() {
                    match bytes[i] {
                        b'\n' | b'\r' => break,
                        b':' if is_separator(bytes.get(i + 1)) => break,
                        b'#' if bytes[i - 1].is_ascii_whitespace() => break,
                        b',' | b']' | b'}' if flow_depth > 0 => break,
                        _ => i += 1,
                    }
                }
                push(text[start..i].trim_end(), false);
            }
        }
    }
    found
}

fn is_separator(byte: Option<&u8>) -> bool {
    byte.map_or(true, |b| b.is_ascii_whitespace())
}

/// Index of the newline ending the line that contains `from`, or the text end
fn line_end(bytes: &[u8], from: usize) -> usize {
    bytes[from.min(bytes.len())..]
        .iter()
        .position(|&b| b == b'\n')
        .map_or(bytes.len(), |offset| from + offset)
}

fn line_indent(bytes: &[u8], at: usize) -> usize {
    let start = bytes[..at]
        .iter()
        .rposition(|&b| b == b'\n')
        .map_or(0, |pos| pos + 1);
    bytes[start..].iter().take_while(|&&b| b == b' ').count()
}

fn parse_date(s: &str) -> Option<DateTime<Utc>> {
    let bytes = s.as_bytes();
    if bytes.len() < 10 || bytes[4] != b'-' || bytes[7] != b'-' {
        return None;
    }
    if let Ok(date) = NaiveDate::parse_from_str(s, "%Y-%m-%d") {
        return date.and_hms_opt(0, 0, 0).map(|dt| dt.and_utc());
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S%.f")
        .ok()
        .map(|dt| dt.and_utc())
}
