//! Tree expansion: interpolation then coercion on every string leaf

use crate::coerce::{CoercionRegistry, Tag};
use crate::interpolate::interpolate;
use types::Value;

/// Walks a raw source tree and produces its expanded copy
///
/// Every value a source yields passes through here before it is merged.
#[derive(Debug, Clone, Default)]
pub struct Expander {
    registry: CoercionRegistry,
}

impl Expander {
    pub fn new(registry: CoercionRegistry) -> Self {
        Self { registry }
    }

    pub fn registry(&self) -> &CoercionRegistry {
        &self.registry
    }

    /// Expand `tree` against `context`, the configuration merged so far
    pub fn expand(&self, tree: Value, context: &Value) -> Value {
        match tree {
            Value::String(s) => self.expand_str(&s, context),
            Value::Array(items) => {
                Value::Array(items.into_iter().map(|v| self.expand(v, context)).collect())
            }
            Value::Object(map) => Value::Object(
                map.into_iter()
                    .map(|(k, v)| (k, self.expand(v, context)))
                    .collect(),
            ),
            other => other,
        }
    }

    /// Expand a single string leaf
    pub fn expand_str(&self, raw: &str, context: &Value) -> Value {
        match Tag::of(raw) {
            Some(tag) if !tag.interpolates_payload() => self.registry.coerce(raw),
            _ => self.registry.coerce(&interpolate(raw, context)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_expands_nested_leaves() {
        let ctx = Value::from(json!({"sub": {"x": "ttt"}, "n": 66}));
        let tree = Value::from(json!({
            "a": "ideal {sub.x} or not",
            "list": ["{n}", 3, {"deep": "#int:{n}"}],
            "flag": true
        }));
        assert_eq!(
            Expander::default().expand(tree, &ctx),
            Value::from(json!({
                "a": "ideal ttt or not",
                "list": ["66", 3, {"deep": 66}],
                "flag": true
            }))
        );
    }

    #[test]
    fn test_str_and_json_payloads_are_not_interpolated() {
        let ctx = Value::from(json!({"a": "A", "b": "B"}));
        let expander = Expander::default();
        assert_eq!(expander.expand_str("#str:{a}{b}", &ctx), Value::from("{a}{b}"));
        assert_eq!(
            expander.expand_str(r#"#json:{"k":"{a}"}"#, &ctx),
            Value::from(json!({"k": "{a}"}))
        );
        assert_eq!(expander.expand_str("#csv:{a},{b}", &ctx), Value::from(json!(["A", "B"])));
    }

    #[test]
    fn test_interpolation_can_produce_a_tag() {
        let ctx = Value::from(json!({"kind": "int"}));
        assert_eq!(
            Expander::default().expand_str("#{kind}:12", &ctx),
            Value::Int(12)
        );
    }

    #[test]
    fn test_non_strings_pass_through() {
        let tree = Value::from(json!({"n": 1.5, "b": false, "z": null}));
        assert_eq!(Expander::default().expand(tree.clone(), &Value::object()), tree);
    }
}
