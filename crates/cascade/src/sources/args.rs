//! Command-line argument source

use super::{flatten_key, Source, SourceContext, SourceOptions};
use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex::Regex;
use std::ffi::OsString;
use tracing::debug;
use types::{set_path, Map, Result, Value};

static NUMBER: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(0x[0-9a-fA-F]+|[-+]?(\d+(\.\d*)?|\.\d+)([eE][-+]?\d+)?)$").unwrap()
});

/// Reads `--a__b=v` style flags into a nested tree
#[derive(Debug, Clone, Default)]
pub struct ArgsSource {
    input: Option<Vec<String>>,
    options: SourceOptions,
}

impl ArgsSource {
    /// Read the process arguments (minus the program name)
    pub fn new(options: SourceOptions) -> Self {
        Self {
            input: None,
            options,
        }
    }

    /// Read an explicit argument list instead of the process arguments
    pub fn from_input(input: Vec<String>, options: SourceOptions) -> Self {
        Self {
            input: Some(input),
            options,
        }
    }

    fn build_tree(&self) -> Value {
        let args = match &self.input {
            Some(input) => input.clone(),
            None => unicode_args(std::env::args_os().skip(1)),
        };

        let mut tree = Value::object();
        for (key, value) in parse_args(&args) {
            let key = flatten_key(&key);
            if let Some(key) = self.options.select_key(&key) {
                set_path(&mut tree, key, value);
            }
        }
        tree
    }
}

#[async_trait]
impl Source for ArgsSource {
    async fn load(&self, ctx: &SourceContext<'_>) -> Result<Value> {
        Ok(ctx.expander.expand(self.build_tree(), ctx.config))
    }

    fn name(&self) -> String {
        "args".to_string()
    }
}

/// Keep the arguments that are valid Unicode
fn unicode_args(args: impl IntoIterator<Item = OsString>) -> Vec<String> {
    args.into_iter()
        .filter_map(|arg| match arg.into_string() {
            Ok(arg) => Some(arg),
            Err(arg) => {
                debug!(arg = ?arg, "Skipping argument that is not valid Unicode");
                None
            }
        })
        .collect()
}

/// Parse flags the way minimist does
///
/// `--k=v`, `--k v`, `--k` (true), `--no-k` (false), `-x v` and grouped
/// short flags `-abc`. Numeric-looking values become numbers, repeated keys
/// collect into an array, and everything after `--` or not attached to a
/// flag is ignored.
pub fn parse_args(args: &[String]) -> Map {
    let mut out = Map::new();
    let mut i = 0;

    while i < args.len() {
        let arg = &args[i];
        let next = args.get(i + 1).filter(|n| !n.starts_with('-'));

        if arg == "--" {
            break;
        }

        if let Some(body) = arg.strip_prefix("--") {
            if let Some((key, value)) = body.split_once('=') {
                push(&mut out, key, scalar(value));
            } else if let Some(key) = body.strip_prefix("no-") {
                push(&mut out, key, Value::Bool(false));
            } else if let Some(value) = next {
                push(&mut out, body, flag_value(value));
                i += 1;
            } else {
                push(&mut out, body, Value::Bool(true));
            }
        } else if arg.len() > 1 && arg.starts_with('-') && !NUMBER.is_match(arg) {
            if short_flags(&mut out, &arg[1..], next.map(String::as_str)) {
                i += 1;
            }
        }
        i += 1;
    }
    out
}

/// Returns whether the following argument was consumed as a value
fn short_flags(out: &mut Map, body: &str, next: Option<&str>) -> bool {
    let letters: Vec<(usize, char)> = body.char_indices().collect();

    for (pos, &(idx, letter)) in letters.iter().enumerate() {
        let key = letter.to_string();
        let rest = &body[idx + letter.len_utf8()..];

        if let Some(value) = rest.strip_prefix('=') {
            push(out, &key, scalar(value));
            return false;
        }
        if !rest.is_empty() && NUMBER.is_match(rest) {
            push(out, &key, scalar(rest));
            return false;
        }
        if pos + 1 == letters.len() {
            return match next {
                Some(value) => {
                    push(out, &key, flag_value(value));
                    true
                }
                None => {
                    push(out, &key, Value::Bool(true));
                    false
                }
            };
        }
        push(out, &key, Value::Bool(true));
    }
    false
}

fn push(out: &mut Map, key: &str, value: Value) {
    match out.remove(key) {
        None => {
            out.insert(key.to_string(), value);
        }
        Some(Value::Array(mut items)) => {
            items.push(value);
            out.insert(key.to_string(), Value::Array(items));
        }
        Some(existing) => {
            out.insert(key.to_string(), Value::Array(vec![existing, value]));
        }
    }
}

/// A detached flag value: `true`/`false` become booleans
fn flag_value(raw: &str) -> Value {
    match raw {
        "true" => Value::Bool(true),
        "false" => Value::Bool(false),
        _ => scalar(raw),
    }
}

fn scalar(raw: &str) -> Value {
    if !NUMBER.is_match(raw) {
        return Value::from(raw);
    }
    if let Some(hex) = raw.strip_prefix("0x") {
        if let Ok(n) = i64::from_str_radix(hex, 16) {
            return Value::Int(n);
        }
    }
    if let Ok(n) = raw.parse::<i64>() {
        return Value::Int(n);
    }
    raw.parse::<f64>()
        .map(Value::Float)
        .unwrap_or_else(|_| Value::from(raw))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expand::Expander;
    use serde_json::json;

    fn argv(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_parse_long_and_short_flags() {
        let parsed = parse_args(&argv(&[
            "-x", "3", "--b__bb__g=getty", "--zzz[2]__v=967", "--verbose", "--no-color", "--name",
            "svc", "positional",
        ]));
        assert_eq!(parsed["x"], Value::Int(3));
        assert_eq!(parsed["b__bb__g"], Value::from("getty"));
        assert_eq!(parsed["zzz[2]__v"], Value::Int(967));
        assert_eq!(parsed["verbose"], Value::Bool(true));
        assert_eq!(parsed["color"], Value::Bool(false));
        assert_eq!(parsed["name"], Value::from("svc"));
        assert!(!parsed.contains_key("positional"));
    }

    #[test]
    fn test_grouped_short_flags_and_repeats() {
        let parsed = parse_args(&argv(&["-abc", "out", "-n5", "--tag=a", "--tag=b", "--", "--ignored"]));
        assert_eq!(parsed["a"], Value::Bool(true));
        assert_eq!(parsed["b"], Value::Bool(true));
        assert_eq!(parsed["c"], Value::from("out"));
        assert_eq!(parsed["n"], Value::Int(5));
        assert_eq!(parsed["tag"], Value::from(json!(["a", "b"])));
        assert!(!parsed.contains_key("ignored"));
    }

    #[cfg(unix)]
    #[test]
    fn test_non_unicode_args_are_skipped() {
        use std::os::unix::ffi::OsStringExt;

        let args = unicode_args(vec![
            OsString::from("--port=80"),
            OsString::from_vec(b"--name=\xff".to_vec()),
            OsString::from("--debug"),
        ]);
        assert_eq!(args, argv(&["--port=80", "--debug"]));
    }

    #[test]
    fn test_numeric_values() {
        let parsed = parse_args(&argv(&["--f=1.5", "--h=0x10", "--s=#int:123", "--e=1e3"]));
        assert_eq!(parsed["f"], Value::Float(1.5));
        assert_eq!(parsed["h"], Value::Int(16));
        assert_eq!(parsed["s"], Value::from("#int:123"));
        assert_eq!(parsed["e"], Value::Float(1000.0));
    }

    #[tokio::test]
    async fn test_tree_with_prefix_and_arrays() {
        let input = argv(&["-x", "3", "--b__bb__g=getty", "--cli__b__b[1]=#int:123"]);
        let expander = Expander::default();
        let config = Value::object();
        let ctx = SourceContext {
            config: &config,
            env_name: "development",
            expander: &expander,
        };

        let all = ArgsSource::from_input(input.clone(), SourceOptions::new());
        assert_eq!(
            all.load(&ctx).await.unwrap(),
            Value::from(json!({
                "x": 3,
                "b": {"bb": {"g": "getty"}},
                "cli": {"b": {"b": [null, 123]}}
            }))
        );

        let prefixed = ArgsSource::from_input(input, SourceOptions::new().prefix("b.bb."));
        assert_eq!(prefixed.load(&ctx).await.unwrap(), Value::from(json!({"g": "getty"})));
    }
}
