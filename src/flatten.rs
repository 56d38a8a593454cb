//! Conversion between nested JSON objects and single-level maps with dotted keys.

use serde_json::{Map, Value};
use std::collections::HashMap;

/// Separator placed between path segments when none is configured.
pub const DEFAULT_SEPARATOR: &str = ".";

/// Flattens nested objects into a single-depth map.
///
/// `{"foo": "bar", "baz": {"foo": "bar"}}` becomes `{"foo": "bar", "baz.foo": "bar"}`.
/// Only objects are walked; arrays, `null` and scalars are stored as leaves.
/// Empty nested objects contribute no keys, and a non-object input yields an
/// empty map.
pub fn flatten_object(value: &Value, separator: &str) -> Map<String, Value> {
    let mut out = Map::new();
    if let Value::Object(obj) = value {
        flatten_into(&mut out, None, obj, separator);
    }
    out
}

fn flatten_into(
    out: &mut Map<String, Value>,
    prefix: Option<&str>,
    obj: &Map<String, Value>,
    separator: &str,
) {
    for (key, value) in obj {
        let path = match prefix {
            Some(prefix) => format!("{prefix}{separator}{key}"),
            None => key.clone(),
        };
        match value {
            Value::Object(inner) => flatten_into(out, Some(path.as_str()), inner, separator),
            leaf => {
                out.insert(path, leaf.clone());
            }
        }
    }
}

/// Flattens `map` if any of its values is a nested object, otherwise returns it as is.
pub(crate) fn flatten_map(map: Map<String, Value>, separator: &str) -> Map<String, Value> {
    if map.values().any(Value::is_object) {
        flatten_object(&Value::Object(map), separator)
    } else {
        map
    }
}

/// Rebuilds a nested object from dotted keys.
///
/// When a key names both a leaf and a branch (`"a": 1` alongside `"a.b": 2`),
/// the leaf keeps the segment and the branch entries stay as literal dotted keys
/// at that level (`{"a": 1, "a.b": 2}`), so flattening the result gives back `map`.
pub fn unflatten_object(map: &Map<String, Value>, separator: &str) -> Value {
    let entries = map
        .iter()
        .map(|(key, value)| (split_key(key, separator), value))
        .collect();
    Value::Object(build_level(entries, separator))
}

fn split_key<'a>(key: &'a str, separator: &str) -> Vec<&'a str> {
    if separator.is_empty() {
        vec![key]
    } else {
        key.split(separator).collect()
    }
}

struct Group<'a> {
    head: &'a str,
    leaf: Option<&'a Value>,
    children: Vec<(Vec<&'a str>, &'a Value)>,
}

fn build_level<'a>(entries: Vec<(Vec<&'a str>, &'a Value)>, separator: &str) -> Map<String, Value> {
    let mut groups: Vec<Group<'a>> = Vec::new();
    let mut index: HashMap<&'a str, usize> = HashMap::new();
    for (mut segments, value) in entries {
        let head = segments.remove(0);
        let slot = *index.entry(head).or_insert_with(|| {
            groups.push(Group {
                head,
                leaf: None,
                children: Vec::new(),
            });
            groups.len() - 1
        });
        let group = &mut groups[slot];
        if segments.is_empty() {
            group.leaf = Some(value);
        } else {
            group.children.push((segments, value));
        }
    }

    let mut out = Map::new();
    for Group {
        head,
        leaf,
        children,
    } in groups
    {
        match leaf {
            None => {
                out.insert(
                    head.to_string(),
                    Value::Object(build_level(children, separator)),
                );
            }
            Some(leaf) => {
                out.insert(head.to_string(), leaf.clone());
                // Segments never contain the separator, so these cannot clash with a head.
                for (rest, value) in children {
                    out.insert(
                        format!("{head}{separator}{}", rest.join(separator)),
                        value.clone(),
                    );
                }
            }
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn flattens_nested_objects() {
        let flat = flatten_object(
            &json!({"foo": "bar", "baz": {"foo": "bar", "deep": {"x": 1}}}),
            DEFAULT_SEPARATOR,
        );
        assert_eq!(
            Value::Object(flat),
            json!({"foo": "bar", "baz.foo": "bar", "baz.deep.x": 1})
        );
    }

    #[test]
    fn arrays_and_null_are_leaves() {
        let flat = flatten_object(&json!({"list": [1, {"a": 2}], "none": null}), ".");
        assert_eq!(flat.get("list"), Some(&json!([1, {"a": 2}])));
        assert_eq!(flat.get("none"), Some(&Value::Null));
        assert_eq!(flat.len(), 2);
    }

    #[test]
    fn empty_objects_vanish() {
        let flat = flatten_object(&json!({"empty": {}, "nested": {"empty": {}}, "k": 1}), ".");
        assert_eq!(Value::Object(flat), json!({"k": 1}));
    }

    #[test]
    fn non_object_input_is_empty() {
        assert!(flatten_object(&json!(42), ".").is_empty());
        assert!(flatten_object(&json!([1, 2]), ".").is_empty());
        assert!(flatten_object(&Value::Null, ".").is_empty());
    }

    #[test]
    fn custom_separator_applies_at_every_depth() {
        let flat = flatten_object(&json!({"a": {"b": {"c": true}}}), "/");
        assert_eq!(flat.get("a/b/c"), Some(&json!(true)));
    }

    #[test]
    fn flattening_is_idempotent_through_unflatten() {
        let nested = json!({
            "theme": "dark",
            "window": {"width": 800, "height": 600, "pos": {"x": 0, "y": 10}},
            "recent": ["a", "b"]
        });
        let flat = flatten_object(&nested, ".");
        let again = flatten_object(&unflatten_object(&flat, "."), ".");
        assert_eq!(again, flat);
        assert_eq!(unflatten_object(&flat, "."), nested);
    }

    #[test]
    fn unflatten_keeps_leaf_and_branch() {
        let mut map = Map::new();
        map.insert("a".into(), json!(1));
        map.insert("a.b".into(), json!(2));
        let nested = unflatten_object(&map, ".");
        assert_eq!(nested, json!({"a": 1, "a.b": 2}));
        assert_eq!(flatten_object(&nested, "."), map);

        // Branch first, leaf second
        let mut map = Map::new();
        map.insert("a.b".into(), json!(2));
        map.insert("a".into(), json!(1));
        let nested = unflatten_object(&map, ".");
        assert_eq!(nested, json!({"a.b": 2, "a": 1}));
        assert_eq!(flatten_object(&nested, "."), map);
    }

    #[test]
    fn dotted_top_level_key_colliding_with_nested_path_survives() {
        let nested = json!({"a": {"b": 1}, "a.b.c": 2});
        let flat = flatten_object(&nested, ".");
        assert_eq!(Value::Object(flat.clone()), json!({"a.b": 1, "a.b.c": 2}));

        let rebuilt = unflatten_object(&flat, ".");
        assert_eq!(rebuilt, json!({"a": {"b": 1, "b.c": 2}}));
        assert_eq!(flatten_object(&rebuilt, "."), flat);
    }

    #[test]
    fn unflatten_round_trips_mixed_collisions() {
        let nested = json!({
            "x": {"y": true, "y.z": [1, 2]},
            "x.y.z.w": "deep",
            "p": {"q": {"r": null}},
            "p.q": 0
        });
        let flat = flatten_object(&nested, ".");
        assert_eq!(flat.len(), 5);
        assert_eq!(flatten_object(&unflatten_object(&flat, "."), "."), flat);

        let slashed = flatten_object(&nested, "/");
        assert_eq!(flatten_object(&unflatten_object(&slashed, "/"), "/"), slashed);
    }

    #[test]
    fn flatten_map_leaves_flat_input_alone() {
        let mut map = Map::new();
        map.insert("x.y".into(), json!(1));
        let out = flatten_map(map.clone(), ".");
        assert_eq!(out, map);
    }
}
