//! Literal object source

use super::{Source, SourceContext};
use async_trait::async_trait;
use types::{Result, Value};

/// Contributes a literal tree; never fails
#[derive(Debug, Clone)]
pub struct ObjectSource {
    value: Value,
}

impl ObjectSource {
    pub fn new(value: impl Into<Value>) -> Self {
        Self {
            value: value.into(),
        }
    }
}

#[async_trait]
impl Source for ObjectSource {
    async fn load(&self, ctx: &SourceContext<'_>) -> Result<Value> {
        Ok(ctx.expander.expand(self.value.clone(), ctx.config))
    }

    fn name(&self) -> String {
        "object".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expand::Expander;
    use serde_json::json;

    #[tokio::test]
    async fn test_object_is_expanded_against_config() {
        let expander = Expander::default();
        let config = Value::from(json!({"name": "svc"}));
        let ctx = SourceContext {
            config: &config,
            env_name: "development",
            expander: &expander,
        };
        let source = ObjectSource::new(Value::from(json!({"label": "{name}-{env:none}", "n": "#int:3"})));
        assert_eq!(
            source.load(&ctx).await.unwrap(),
            Value::from(json!({"label": "svc-none", "n": 3}))
        );
    }
}
