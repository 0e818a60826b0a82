//! `{path}` / `{path:default}` placeholder substitution

use once_cell::sync::Lazy;
use regex::{Captures, Regex};
use types::{get_path, Value};

/// Either a `{{ ... }}` run, passed through verbatim, or a placeholder with
/// an optional default after the first `:`.
static PLACEHOLDER: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\{\{.*?\}\}|\{([A-Za-z0-9_$.\[\]\-]+)(?::([^{}]*))?\}").unwrap()
});

/// Substitute every placeholder in `template` from `context`
///
/// Single pass: substituted text is never scanned again. A path that does
/// not resolve (or resolves to `Null`) takes the default, or the empty string
/// when there is none.
pub fn interpolate(template: &str, context: &Value) -> String {
    if !template.contains('{') {
        return template.to_string();
    }

    PLACEHOLDER
        .replace_all(template, |caps: &Captures| match caps.get(1) {
            None => caps[0].to_string(),
            Some(path) => match get_path(context, path.as_str()) {
                Some(value) if !value.is_null() => value.to_interpolated_string(),
                _ => caps
                    .get(2)
                    .map(|d| d.as_str().to_string())
                    .unwrap_or_default(),
            },
        })
        .into_owned()
}
