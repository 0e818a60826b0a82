//! Structured data file source

use super::{locate, Source, SourceContext, SourceOptions};
use crate::format::DataFormat;
use async_trait::async_trait;
use tracing::debug;
use types::{CascadeError, Result, Value};

/// Loads a templated JSON (or YAML, by extension) file
///
/// `ignore_missing` only covers a missing file; malformed content always
/// fails the cascade.
#[derive(Debug, Clone)]
pub struct FileSource {
    template: String,
    options: SourceOptions,
    format: Option<DataFormat>,
}

impl FileSource {
    pub fn new(template: impl Into<String>, options: SourceOptions) -> Self {
        Self {
            template: template.into(),
            options,
            format: None,
        }
    }

    /// Parse with `format` regardless of the file extension
    pub(crate) fn with_format(mut self, format: DataFormat) -> Self {
        self.format = Some(format);
        self
    }
}

#[async_trait]
impl Source for FileSource {
    async fn load(&self, ctx: &SourceContext<'_>) -> Result<Value> {
        let values = ctx.template_values();
        let Some(path) = locate(&self.template, &values, &self.options).await? else {
            return Ok(Value::object());
        };

        let name = path.display().to_string();
        let text = tokio::fs::read_to_string(&path)
            .await
            .map_err(|e| CascadeError::from_io(&name, e))?;
        let format = self.format.unwrap_or_else(|| DataFormat::from_path(&path));
        let tree = format.parse(&text, &name)?;
        debug!(path = %name, format = ?format, "Loaded file");

        Ok(ctx.expander.expand(tree, &values))
    }

    fn name(&self) -> String {
        format!("file({})", self.template)
    }
}
