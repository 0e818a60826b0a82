//! Deep merge of configuration trees.
//!
//! Mappings merge key by key and arrays merge element by element; any other
//! pairing is decided by the overlay.

use types::{nest_at, Value};

/// Deep merge `overlay` into `base`, with `overlay` taking precedence.
///
/// - Objects are merged recursively: keys in overlay override keys in base,
///   an explicit null included
/// - Arrays are merged index by index; the longer one sets the length, and a
///   null element is a hole that keeps the base element
/// - Strings, numbers, booleans, bytes and dates replace the base entirely
pub fn deep_merge(base: Value, overlay: Value) -> Value {
    match (base, overlay) {
        (Value::Object(mut base_map), Value::Object(overlay_map)) => {
            for (key, overlay_value) in overlay_map {
                let merged_value = match base_map.remove(&key) {
                    Some(base_value) => deep_merge(base_value, overlay_value),
                    None => overlay_value,
                };
                base_map.insert(key, merged_value);
            }
            Value::Object(base_map)
        }
        (Value::Array(base_items), Value::Array(overlay_items)) => {
            let len = base_items.len().max(overlay_items.len());
            let mut base_iter = base_items.into_iter();
            let mut overlay_iter = overlay_items.into_iter();
            let merged = (0..len)
                .map(|_| {
                    let base = base_iter.next().unwrap_or(Value::Null);
                    match overlay_iter.next() {
                        None | Some(Value::Null) => base,
                        Some(overlay) => deep_merge(base, overlay),
                    }
                })
                .collect();
            Value::Array(merged)
        }
        (_, overlay) => overlay,
    }
}

/// Merge `overlay` into `target` in place, optionally below `mount`
///
/// Without a mount the overlay goes through [`root_entries`]. Returns `false`
/// and leaves `target` untouched when it has no entries to merge.
pub fn merge_into(target: &mut Value, overlay: Value, mount: Option<&str>) -> bool {
    let overlay = match mount {
        Some(path) if !path.is_empty() => nest_at(path, overlay),
        _ => match root_entries(overlay) {
            Some(entries) => entries,
            None => return false,
        },
    };
    let base = std::mem::take(target);
    *target = deep_merge(base, overlay);
    true
}

/// Shape a value for merging at the root of a tree
///
/// Mappings pass through and null contributes nothing. Arrays spread into
/// index-keyed entries, skipping holes. Other scalars have no entries.
pub fn root_entries(value: Value) -> Option<Value> {
    match value {
        Value::Object(_) => Some(value),
        Value::Null => Some(Value::object()),
        Value::Array(items) => Some(Value::Object(
            items
                .into_iter()
                .enumerate()
                .filter(|(_, item)| !item.is_null())
                .map(|(index, item)| (index.to_string(), item))
                .collect(),
        )),
        _ => None,
    }
}

/// Merge multiple values in order, with later values taking precedence.
pub fn deep_merge_all(values: impl IntoIterator<Item = Value>) -> Value {
    values.into_iter().fold(Value::object(), deep_merge)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn v(json: serde_json::Value) -> Value {
        Value::from(json)
    }

    #[test]
    fn test_merge_nested_objects() {
        let result = deep_merge(
            v(json!({"a": "b", "b": {"c": 1, "d": 4}})),
            v(json!({"nnn": "666", "b": {"jj": 66}})),
        );
        let result = deep_merge(result, v(json!({"b": {"d": "qwerty"}})));
        assert_eq!(
            result,
            v(json!({"a": "b", "b": {"c": 1, "d": "qwerty", "jj": 66}, "nnn": "666"}))
        );
    }

    #[test]
    fn test_arrays_merge_by_index() {
        let base = v(json!({"zzz": [{"cc": "ttt"}, {"cc": "ggg"}]}));
        let overlay = v(json!({"zzz": [null, null, {"v": 967}]}));
        assert_eq!(
            deep_merge(base, overlay),
            v(json!({"zzz": [{"cc": "ttt"}, {"cc": "ggg"}, {"v": 967}]}))
        );

        let base = v(json!({"items": [1, 2, 3]}));
        let overlay = v(json!({"items": [4, 5]}));
        assert_eq!(deep_merge(base, overlay), v(json!({"items": [4, 5, 3]})));
    }

    #[test]
    fn test_explicit_null_overrides_key() {
        let base = v(json!({"a": 1, "b": {"c": 2}}));
        let overlay = v(json!({"a": null, "b": {"c": null}}));
        assert_eq!(deep_merge(base, overlay), v(json!({"a": null, "b": {"c": null}})));
    }

    #[test]
    fn test_array_hole_keeps_base_element() {
        let base = v(json!({"ports": [80, 443]}));
        let overlay = v(json!({"ports": [null, 8443]}));
        assert_eq!(deep_merge(base, overlay), v(json!({"ports": [80, 8443]})));
    }

    #[test]
    fn test_scalar_and_object_replace_each_other() {
        assert_eq!(
            deep_merge(v(json!({"value": 42})), v(json!({"value": {"nested": true}}))),
            v(json!({"value": {"nested": true}}))
        );
        assert_eq!(
            deep_merge(v(json!({"value": {"nested": true}})), v(json!({"value": 42}))),
            v(json!({"value": 42}))
        );
    }

    #[test]
    fn test_merge_into_mount() {
        let mut target = v(json!({"a": 1}));
        assert!(merge_into(&mut target, v(json!({"port": 80})), Some("services.web")));
        assert!(merge_into(&mut target, v(json!({"b": 2})), None));
        assert_eq!(
            target,
            v(json!({"a": 1, "b": 2, "services": {"web": {"port": 80}}}))
        );
    }

    #[test]
    fn test_non_mapping_root_never_replaces_target() {
        let mut target = v(json!({"keep": 1}));
        assert!(merge_into(&mut target, v(json!(["x", null, "z"])), None));
        assert_eq!(target, v(json!({"keep": 1, "0": "x", "2": "z"})));

        assert!(merge_into(&mut target, Value::Null, None));
        assert!(!merge_into(&mut target, Value::from("scalar"), None));
        assert_eq!(target, v(json!({"keep": 1, "0": "x", "2": "z"})));

        assert!(merge_into(&mut target, Value::from("mounted"), Some("s")));
        assert_eq!(target, v(json!({"keep": 1, "0": "x", "2": "z", "s": "mounted"})));
    }

    #[test]
    fn test_merge_all_is_left_fold() {
        let values = vec![v(json!({"a": 1})), v(json!({"b": 2})), v(json!({"a": 3, "c": 4}))];
        assert_eq!(deep_merge_all(values), v(json!({"a": 3, "b": 2, "c": 4})));
    }
}
