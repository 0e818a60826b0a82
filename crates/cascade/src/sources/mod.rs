//! Source adapters
//!
//! Each adapter produces the expanded contribution of one cascade task. It
//! sees the configuration merged by earlier tasks through [`SourceContext`]
//! and never anything merged later.

mod args;
mod directory;
mod env;
mod envfile;
mod file;
mod object;
mod remote;
mod yaml;

pub use args::{parse_args, ArgsSource};
pub use directory::{DirectorySource, DEFAULT_DIRECTORY_ROOT};
pub use env::EnvSource;
pub use envfile::EnvFileSource;
pub use file::FileSource;
pub use object::ObjectSource;
pub use remote::{DocumentLocation, DocumentStore, RemoteOptions, RemoteSource};
pub use yaml::YamlSource;

use crate::expand::Expander;
use crate::interpolate::interpolate;
use crate::merge::deep_merge;
use async_trait::async_trait;
use regex::Regex;
use std::path::PathBuf;
use tracing::debug;
use types::{set_path, CascadeError, Result, Value};

/// What a source can see while it loads
#[derive(Debug, Clone, Copy)]
pub struct SourceContext<'a> {
    /// Configuration merged by earlier tasks
    pub config: &'a Value,
    /// Current environment name, exposed to location templates as `{env}`
    pub env_name: &'a str,
    pub expander: &'a Expander,
}

impl SourceContext<'_> {
    /// Lookup values for location templates: `env` plus everything merged so far
    pub fn template_values(&self) -> Value {
        let mut values = Value::object();
        set_path(&mut values, "env", Value::from(self.env_name));
        deep_merge(values, self.config.clone())
    }
}

/// A configuration source
#[async_trait]
pub trait Source: Send + Sync {
    /// Load, expand and return this source's tree
    async fn load(&self, ctx: &SourceContext<'_>) -> Result<Value>;

    /// Human-readable name for logging
    fn name(&self) -> String;
}

/// Options shared by the source adapters
#[derive(Debug, Clone, Default)]
pub struct SourceOptions {
    /// Only keep keys matching this pattern
    pub regexp: Option<Regex>,
    /// Only keep keys starting with this prefix, and strip it
    pub prefix: Option<String>,
    /// Treat a missing location as an empty tree
    pub ignore_missing: bool,
    /// Merge the result below this path instead of at the root
    pub mount: Option<String>,
}

impl SourceOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn regexp(mut self, regexp: Regex) -> Self {
        self.regexp = Some(regexp);
        self
    }

    pub fn prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = Some(prefix.into());
        self
    }

    pub fn ignore_missing(mut self) -> Self {
        self.ignore_missing = true;
        self
    }

    pub fn mount(mut self, mount: impl Into<String>) -> Self {
        self.mount = Some(mount.into());
        self
    }

    /// Apply the `regexp`/`prefix` filters, returning the key with the
    /// prefix stripped when it passes
    pub(crate) fn select_key<'k>(&self, key: &'k str) -> Option<&'k str> {
        if let Some(regexp) = &self.regexp {
            if !regexp.is_match(key) {
                return None;
            }
        }
        match &self.prefix {
            Some(prefix) => key.strip_prefix(prefix.as_str()),
            None => Some(key),
        }
    }
}

/// `__` separates path segments in flat key namespaces
pub(crate) fn flatten_key(key: &str) -> String {
    key.replace("__", ".")
}

/// Resolve a location template and check that it exists
///
/// Returns `None` when the location is missing and `ignore_missing` is set.
pub(crate) async fn locate(
    template: &str,
    values: &Value,
    options: &SourceOptions,
) -> Result<Option<PathBuf>> {
    let path = PathBuf::from(interpolate(template, values));
    match tokio::fs::metadata(&path).await {
        Ok(_) => Ok(Some(path)),
        Err(e) => {
            let err = CascadeError::from_io(path.display().to_string(), e);
            if err.is_not_found() && options.ignore_missing {
                debug!(path = %path.display(), "Source missing, ignoring");
                Ok(None)
            } else {
                Err(err)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_select_key_filters_and_strips() {
        let options = SourceOptions::new().prefix("APP_");
        assert_eq!(options.select_key("APP_sub__x"), Some("sub__x"));
        assert_eq!(options.select_key("OTHER"), None);

        let options = SourceOptions::new().regexp(Regex::new("^db").unwrap());
        assert_eq!(options.select_key("db.host"), Some("db.host"));
        assert_eq!(options.select_key("cache.host"), None);
    }

    #[test]
    fn test_template_values_prefer_config() {
        let expander = Expander::default();
        let config = Value::from(json!({"H": "66"}));
        let ctx = SourceContext {
            config: &config,
            env_name: "development",
            expander: &expander,
        };
        assert_eq!(
            ctx.template_values(),
            Value::from(json!({"env": "development", "H": "66"}))
        );

        let config = Value::from(json!({"env": "staging"}));
        let ctx = SourceContext { config: &config, ..ctx };
        assert_eq!(ctx.template_values(), Value::from(json!({"env": "staging"})));
    }

    #[tokio::test]
    async fn test_locate_missing() {
        let values = Value::object();
        let found = locate("does/not/exist.json", &values, &SourceOptions::new().ignore_missing())
            .await
            .unwrap();
        assert!(found.is_none());

        let err = locate("does/not/exist.json", &values, &SourceOptions::new())
            .await
            .unwrap_err();
        assert!(err.is_not_found());
    }
}
