//! YAML file source

use super::file::FileSource;
use super::{Source, SourceContext, SourceOptions};
use crate::format::DataFormat;
use async_trait::async_trait;
use types::{Result, Value};

/// Loads a templated YAML file whatever its extension
#[derive(Debug, Clone)]
pub struct YamlSource {
    inner: FileSource,
    template: String,
}

impl YamlSource {
    pub fn new(template: impl Into<String>, options: SourceOptions) -> Self {
        let template = template.into();
        Self {
            inner: FileSource::new(template.clone(), options).with_format(DataFormat::Yaml),
            template,
        }
    }
}

#[async_trait]
impl Source for YamlSource {
    async fn load(&self, ctx: &SourceContext<'_>) -> Result<Value> {
        self.inner.load(ctx).await
    }

    fn name(&self) -> String {
        format!("yaml({})", self.template)
    }
}
