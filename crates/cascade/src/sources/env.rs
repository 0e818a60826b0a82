//! Environment variable source

use super::{flatten_key, Source, SourceContext, SourceOptions};
use async_trait::async_trait;
use std::ffi::OsString;
use tracing::debug;
use types::{set_path, Result, Value};

/// Reads environment variables into a nested tree
///
/// Names are filtered and prefix-stripped first, then `__` becomes a path
/// separator. Values stay strings until a coercion tag says otherwise.
#[derive(Debug, Clone, Default)]
pub struct EnvSource {
    vars: Option<Vec<(String, String)>>,
    options: SourceOptions,
}

impl EnvSource {
    /// Read the process environment
    pub fn new(options: SourceOptions) -> Self {
        Self {
            vars: None,
            options,
        }
    }

    /// Read an explicit set of variables instead of the process environment
    pub fn from_vars(
        vars: impl IntoIterator<Item = (String, String)>,
        options: SourceOptions,
    ) -> Self {
        Self {
            vars: Some(vars.into_iter().collect()),
            options,
        }
    }

    fn build_tree(&self) -> Value {
        let vars = match &self.vars {
            Some(vars) => vars.clone(),
            None => unicode_vars(std::env::vars_os()),
        };
        build_flat_tree(vars, &self.options)
    }
}

/// Keep the variables whose name and value are valid Unicode
fn unicode_vars(vars: impl IntoIterator<Item = (OsString, OsString)>) -> Vec<(String, String)> {
    vars.into_iter()
        .filter_map(|(name, value)| match (name.into_string(), value.into_string()) {
            (Ok(name), Ok(value)) => Some((name, value)),
            (name, _) => {
                debug!(name = ?name, "Skipping environment variable that is not valid Unicode");
                None
            }
        })
        .collect()
}

/// Shared by the environment and dotenv sources
pub(crate) fn build_flat_tree(
    vars: impl IntoIterator<Item = (String, String)>,
    options: &SourceOptions,
) -> Value {
    let mut tree = Value::object();
    for (name, value) in vars {
        if let Some(key) = options.select_key(&name) {
            set_path(&mut tree, &flatten_key(key), Value::String(value));
        }
    }
    tree
}

#[async_trait]
impl Source for EnvSource {
    async fn load(&self, ctx: &SourceContext<'_>) -> Result<Value> {
        Ok(ctx.expander.expand(self.build_tree(), ctx.config))
    }

    fn name(&self) -> String {
        match &self.options.prefix {
            Some(prefix) => format!("env({}*)", prefix),
            None => "env".to_string(),
        }
    }
}
