//! Dotted/bracketed path addressing into a configuration tree
//!
//! `a.b[0].c` and `a.b.0.c` address the same node. All-digit segments are
//! array indices; when such a segment lands on a mapping it is used as a key.

use crate::value::{Map, Value};

/// One step of a parsed path
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Segment {
    Key(String),
    Index(usize),
}

impl Segment {
    fn parse(raw: &str) -> Self {
        if !raw.is_empty() && raw.bytes().all(|b| b.is_ascii_digit()) {
            if let Ok(idx) = raw.parse() {
                return Segment::Index(idx);
            }
        }
        Segment::Key(raw.to_string())
    }

    fn as_key(&self) -> String {
        match self {
            Segment::Key(k) => k.clone(),
            Segment::Index(i) => i.to_string(),
        }
    }
}

/// Split a path into segments. The empty path addresses the root.
pub fn parse_path(path: &str) -> Vec<Segment> {
    let mut segments = Vec::new();
    let mut current = String::new();
    let mut chars = path.chars();

    while let Some(c) = chars.next() {
        match c {
            '.' => {
                if !current.is_empty() {
                    segments.push(Segment::parse(&current));
                    current.clear();
                }
            }
            '[' => {
                if !current.is_empty() {
                    segments.push(Segment::parse(&current));
                    current.clear();
                }
                let inner: String = chars.by_ref().take_while(|&c| c != ']').collect();
                let inner = inner.trim_matches(|c| c == '"' || c == '\'');
                segments.push(Segment::parse(inner));
            }
            _ => current.push(c),
        }
    }
    if !current.is_empty() {
        segments.push(Segment::parse(&current));
    }
    segments
}

/// Look up the node at `path`
pub fn get_path<'a>(root: &'a Value, path: &str) -> Option<&'a Value> {
    parse_path(path)
        .iter()
        .try_fold(root, |node, segment| child(node, segment))
}

fn child<'a>(node: &'a Value, segment: &Segment) -> Option<&'a Value> {
    match (node, segment) {
        (Value::Object(map), seg) => map.get(&seg.as_key()),
        (Value::Array(items), Segment::Index(idx)) => items.get(*idx),
        _ => None,
    }
}

fn child_mut<'a>(node: &'a mut Value, segment: &Segment) -> Option<&'a mut Value> {
    match (node, segment) {
        (Value::Object(map), seg) => map.get_mut(&seg.as_key()),
        (Value::Array(items), Segment::Index(idx)) => items.get_mut(*idx),
        _ => None,
    }
}

/// Assign `value` at `path`, creating intermediate containers
///
/// Index segments create arrays (padding holes with `Null`), key segments
/// create mappings. Scalars standing in the way are replaced.
pub fn set_path(root: &mut Value, path: &str, value: Value) {
    set_segments(root, &parse_path(path), value);
}

fn set_segments(node: &mut Value, segments: &[Segment], value: Value) {
    let Some((first, rest)) = segments.split_first() else {
        *node = value;
        return;
    };

    let next = match (node, first) {
        (Value::Object(map), seg) => map.entry(seg.as_key()).or_insert(Value::Null),
        (Value::Array(items), Segment::Index(idx)) => {
            if items.len() <= *idx {
                items.resize(idx + 1, Value::Null);
            }
            &mut items[*idx]
        }
        (slot, Segment::Index(idx)) => {
            let mut items = vec![Value::Null; idx + 1];
            set_segments(&mut items[*idx], rest, value);
            *slot = Value::Array(items);
            return;
        }
        (slot, Segment::Key(key)) => {
            let mut inner = Value::Null;
            set_segments(&mut inner, rest, value);
            let mut map = Map::new();
            map.insert(key.clone(), inner);
            *slot = Value::Object(map);
            return;
        }
    };
    set_segments(next, rest, value);
}

/// Remove the node at `path`. Returns `true` only if something was removed.
///
/// Removing an array element leaves a `Null` hole so later indices keep
/// their position.
pub fn unset_path(root: &mut Value, path: &str) -> bool {
    let segments = parse_path(path);
    let Some((last, parents)) = segments.split_last() else {
        return false;
    };

    let mut node = root;
    for segment in parents {
        match child_mut(node, segment) {
            Some(next) => node = next,
            None => return false,
        }
    }

    match (node, last) {
        (Value::Object(map), seg) => map.remove(&seg.as_key()).is_some(),
        (Value::Array(items), Segment::Index(idx)) if *idx < items.len() => {
            items[*idx] = Value::Null;
            true
        }
        _ => false,
    }
}

/// Build a fresh tree holding `value` at `path`
pub fn nest_at(path: &str, value: Value) -> Value {
    let mut root = Value::object();
    set_path(&mut root, path, value);
    root
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_mixed_path() {
        assert_eq!(
            parse_path("a.b[0].c"),
            vec![
                Segment::Key("a".into()),
                Segment::Key("b".into()),
                Segment::Index(0),
                Segment::Key("c".into()),
            ]
        );
        assert_eq!(parse_path("zzz[2]"), parse_path("zzz.2"));
        assert!(parse_path("").is_empty());
    }

    #[test]
    fn test_set_builds_arrays_with_holes() {
        let mut root = Value::object();
        set_path(&mut root, "cli.b.b[1]", Value::Int(123));
        assert_eq!(
            root,
            Value::from(json!({"cli": {"b": {"b": [null, 123]}}}))
        );
    }

    #[test]
    fn test_set_replaces_scalar_in_the_way() {
        let mut root = Value::from(json!({"a": 1}));
        set_path(&mut root, "a.b", Value::from("x"));
        assert_eq!(root, Value::from(json!({"a": {"b": "x"}})));
    }

    #[test]
    fn test_get_through_arrays() {
        let root = Value::from(json!({"zzz": [{"cc": "ttt"}, {"cc": "ggg"}]}));
        assert_eq!(get_path(&root, "zzz[1].cc"), Some(&Value::from("ggg")));
        assert_eq!(get_path(&root, "zzz.0.cc"), Some(&Value::from("ttt")));
        assert_eq!(get_path(&root, "zzz[5].cc"), None);
        assert_eq!(get_path(&root, ""), Some(&root));
    }

    #[test]
    fn test_numeric_key_on_object() {
        let root = Value::from(json!({"ports": {"8080": "http"}}));
        assert_eq!(get_path(&root, "ports.8080"), Some(&Value::from("http")));
    }

    #[test]
    fn test_unset_reports_removal() {
        let mut root = Value::from(json!({"a": 1, "b": {"c": 2}, "l": [1, 2]}));
        assert!(unset_path(&mut root, "b.c"));
        assert!(!unset_path(&mut root, "b.c"));
        assert!(!unset_path(&mut root, "missing.deep"));
        assert!(unset_path(&mut root, "l[0]"));
        assert_eq!(root, Value::from(json!({"a": 1, "b": {}, "l": [null, 2]})));
    }
}
