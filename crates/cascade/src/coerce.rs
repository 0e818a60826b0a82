//! Typed-literal coercion via `#tag:payload` prefixes
//!
//! Coercion never fails: numeric tags degrade to `NaN`, `bool` to `false`,
//! and the decoding/file tags hand back the original tagged string.

use crate::format::{load_data_file, parse_yaml};
use base64::{
    engine::general_purpose::{STANDARD, STANDARD_NO_PAD},
    Engine as _,
};
use once_cell::sync::Lazy;
use regex::Regex;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};
use types::Value;

static LEADING_FLOAT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[+-]?(\d+\.?\d*|\.\d+)([eE][+-]?\d+)?").unwrap());

/// Recognized coercion tags
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tag {
    Int,
    Float,
    Bool,
    Base64,
    Str,
    Csv,
    Json,
    File,
    JsFile,
    YamlFile,
}

impl Tag {
    /// Map a `#name` prefix to its tag
    pub fn from_prefix(prefix: &str) -> Option<Self> {
        Some(match prefix {
            "#int" => Tag::Int,
            "#float" => Tag::Float,
            "#bool" => Tag::Bool,
            "#base64" => Tag::Base64,
            "#str" => Tag::Str,
            "#csv" => Tag::Csv,
            "#json" => Tag::Json,
            "#file" => Tag::File,
            "#jsfile" => Tag::JsFile,
            "#yamlfile" => Tag::YamlFile,
            _ => return None,
        })
    }

    /// `str` and `json` payloads are taken literally
    pub fn interpolates_payload(self) -> bool {
        !matches!(self, Tag::Str | Tag::Json)
    }

    /// Tag of a raw string, if it carries a recognized one
    pub fn of(raw: &str) -> Option<Self> {
        raw.split_once(':').and_then(|(prefix, _)| Tag::from_prefix(prefix))
    }
}

/// Which paths the file-reading tags may touch
#[derive(Debug, Clone, Default)]
pub enum FileAccessPolicy {
    /// Any readable path
    #[default]
    Unrestricted,
    /// Only paths below one of these roots
    AllowList(Vec<PathBuf>),
}

impl FileAccessPolicy {
    pub fn permits(&self, path: &Path) -> bool {
        match self {
            FileAccessPolicy::Unrestricted => true,
            FileAccessPolicy::AllowList(roots) => {
                let Ok(path) = path.canonicalize() else {
                    return false;
                };
                roots.iter().any(|root| {
                    root.canonicalize()
                        .map(|root| path.starts_with(root))
                        .unwrap_or(false)
                })
            }
        }
    }
}

/// Dispatches tagged strings to their conversion
#[derive(Debug, Clone, Default)]
pub struct CoercionRegistry {
    file_access: FileAccessPolicy,
}

impl CoercionRegistry {
    pub fn new(file_access: FileAccessPolicy) -> Self {
        Self { file_access }
    }

    pub fn file_access(&self) -> &FileAccessPolicy {
        &self.file_access
    }

    /// Convert `raw` according to its tag; untagged strings come back as-is
    pub fn coerce(&self, raw: &str) -> Value {
        let Some((prefix, payload)) = raw.split_once(':') else {
            return Value::from(raw);
        };
        let Some(tag) = Tag::from_prefix(prefix) else {
            return Value::from(raw);
        };

        match tag {
            Tag::Int => parse_int(payload),
            Tag::Float => parse_float(payload),
            Tag::Bool => Value::Bool(payload == "true"),
            Tag::Str => Value::from(payload),
            Tag::Csv => Value::Array(
                payload
                    .split(',')
                    .map(|item| Value::from(item.trim()))
                    .collect(),
            ),
            Tag::Base64 => match decode_base64(payload) {
                Some(bytes) => Value::Bytes(bytes),
                None => soft_failure(raw, "invalid base64"),
            },
            Tag::Json => match serde_json::from_str::<serde_json::Value>(payload) {
                Ok(json) => Value::from(json),
                Err(e) => soft_failure(raw, e),
            },
            Tag::File => self
                .read_file(payload, |path| {
                    std::fs::read_to_string(path).map_err(|e| e.to_string())
                })
                .map(Value::String)
                .unwrap_or_else(|e| soft_failure(raw, e)),
            Tag::JsFile => self
                .read_file(payload, |path| load_data_file(path).map_err(|e| e.to_string()))
                .unwrap_or_else(|e| soft_failure(raw, e)),
            Tag::YamlFile => self
                .read_file(payload, |path| {
                    let text = std::fs::read_to_string(path).map_err(|e| e.to_string())?;
                    parse_yaml(&text, payload).map_err(|e| e.to_string())
                })
                .unwrap_or_else(|e| soft_failure(raw, e)),
        }
    }

    fn read_file<T>(
        &self,
        payload: &str,
        read: impl FnOnce(&Path) -> std::result::Result<T, String>,
    ) -> std::result::Result<T, String> {
        let path = Path::new(payload);
        if !self.file_access.permits(path) {
            warn!(path = %payload, "File access denied by policy");
            return Err("outside allowed roots".to_string());
        }
        read(path)
    }
}

fn soft_failure(raw: &str, reason: impl std::fmt::Display) -> Value {
    debug!(value = %raw, reason = %reason, "Coercion failed, keeping original string");
    Value::from(raw)
}

/// Leading-integer parse: optional sign, decimal digits or `0x` hex
fn parse_int(payload: &str) -> Value {
    let s = payload.trim_start();
    let (negative, s) = match s.as_bytes().first() {
        Some(b'-') => (true, &s[1..]),
        Some(b'+') => (false, &s[1..]),
        _ => (false, s),
    };
    let (radix, digits) = match s.get(..2) {
        Some("0x") | Some("0X") => (16, &s[2..]),
        _ => (10, s),
    };
    let end = digits
        .find(|c: char| !c.is_digit(radix))
        .unwrap_or(digits.len());
    if end == 0 {
        return Value::Float(f64::NAN);
    }
    let digits = &digits[..end];

    match i64::from_str_radix(digits, radix) {
        Ok(n) => Value::Int(if negative { -n } else { n }),
        Err(_) => {
            let f = digits.parse::<f64>().unwrap_or(f64::NAN);
            Value::Float(if negative { -f } else { f })
        }
    }
}

/// Longest leading decimal literal, or `Infinity`
fn parse_float(payload: &str) -> Value {
    let s = payload.trim_start();
    for (literal, f) in [
        ("Infinity", f64::INFINITY),
        ("+Infinity", f64::INFINITY),
        ("-Infinity", f64::NEG_INFINITY),
    ] {
        if s.starts_with(literal) {
            return Value::Float(f);
        }
    }
    let f = LEADING_FLOAT
        .find(s)
        .and_then(|m| m.as_str().parse::<f64>().ok())
        .unwrap_or(f64::NAN);
    Value::Float(f)
}

fn decode_base64(payload: &str) -> Option<Vec<u8>> {
    let cleaned: String = payload.chars().filter(|c| !c.is_whitespace()).collect();
    STANDARD
        .decode(&cleaned)
        .or_else(|_| STANDARD_NO_PAD.decode(cleaned.trim_end_matches('=')))
        .ok()
}
