//! Dotenv file source

use super::env::build_flat_tree;
use super::{locate, Source, SourceContext, SourceOptions};
use async_trait::async_trait;
use std::path::Path;
use tracing::debug;
use types::{CascadeError, Result, Value};

/// Reads `KEY=value` lines from a templated dotenv file
#[derive(Debug, Clone)]
pub struct EnvFileSource {
    template: String,
    options: SourceOptions,
}

impl EnvFileSource {
    pub fn new(template: impl Into<String>, options: SourceOptions) -> Self {
        Self {
            template: template.into(),
            options,
        }
    }
}

fn read_envfile(path: &Path) -> Result<Vec<(String, String)>> {
    let name = path.display().to_string();
    let iter = dotenvy::from_path_iter(path).map_err(|e| dotenv_error(&name, e))?;
    iter.map(|item| item.map_err(|e| dotenv_error(&name, e)))
        .collect()
}

fn dotenv_error(name: &str, err: dotenvy::Error) -> CascadeError {
    match err {
        dotenvy::Error::Io(e) => CascadeError::from_io(name, e),
        other => CascadeError::parse(name, other),
    }
}

#[async_trait]
impl Source for EnvFileSource {
    async fn load(&self, ctx: &SourceContext<'_>) -> Result<Value> {
        let values = ctx.template_values();
        let Some(path) = locate(&self.template, &values, &self.options).await? else {
            return Ok(Value::object());
        };

        let vars = read_envfile(&path)?;
        debug!(path = %path.display(), vars = vars.len(), "Loaded envfile");
        let tree = build_flat_tree(vars, &self.options);
        Ok(ctx.expander.expand(tree, &values))
    }

    fn name(&self) -> String {
        format!("envfile({})", self.template)
    }
}
