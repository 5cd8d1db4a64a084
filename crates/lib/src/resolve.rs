//! Nested value traversal for scoped views.
//!
//! Views keep a whole tree under one container key and address parts of it by a
//! key sequence. The functions here do the traversal over [`serde_json::Value`]:
//! objects are mappings, arrays are addressable by in-range decimal indices, and
//! every other value is a leaf.
//!
//! Reads stop at the first missing segment. Writes create whatever structure is
//! missing on the way to the target.

use serde_json::{Map, Value};

/// True for values that can hold nested keys (objects and arrays).
pub fn is_structured(value: &Value) -> bool {
    value.is_object() || value.is_array()
}

fn array_index(key: &str, len: usize) -> Option<usize> {
    key.parse::<usize>().ok().filter(|index| *index < len)
}

fn child<'a>(node: &'a Value, key: &str) -> Option<&'a Value> {
    match node {
        Value::Object(map) => map.get(key),
        Value::Array(items) => array_index(key, items.len()).map(|index| &items[index]),
        _ => None,
    }
}

/// True when `node` can hold `key` without creating anything.
fn holds_key(node: &Value, key: &str) -> bool {
    match node {
        Value::Object(map) => map.contains_key(key),
        Value::Array(items) => array_index(key, items.len()).is_some(),
        _ => false,
    }
}

fn ensure_object(value: &mut Value) -> &mut Map<String, Value> {
    if !value.is_object() {
        *value = Value::Object(Map::new());
    }
    match value {
        Value::Object(map) => map,
        _ => unreachable!("value was just replaced by a mapping"),
    }
}

/// True when a write along `path` would not have to drop existing data.
///
/// Only a non-index key on an existing array blocks a write. Everything below a
/// missing or scalar segment is created from scratch.
fn writable<S: AsRef<str>>(root: &Value, path: &[S]) -> bool {
    let mut node = root;
    for key in path {
        let key = key.as_ref();
        if node.is_array() && key.parse::<usize>().is_err() {
            return false;
        }
        match child(node, key) {
            Some(next) => node = next,
            None => return true,
        }
    }
    true
}

/// Returns the slot for `key` inside `node`, creating it as `null` when missing.
///
/// A scalar `node` becomes an empty mapping first. An array grows with `null`s up
/// to an index past its end. Returns `None` for a non-index key on an array.
fn child_slot<'a>(node: &'a mut Value, key: &str) -> Option<&'a mut Value> {
    match node {
        Value::Array(items) => {
            let index = key.parse::<usize>().ok()?;
            if index >= items.len() {
                items.resize(index + 1, Value::Null);
            }
            items.get_mut(index)
        }
        node => Some(
            ensure_object(node)
                .entry(key.to_string())
                .or_insert(Value::Null),
        ),
    }
}

/// Reads the value at `path` below `root`.
///
/// An empty path returns `root` itself. Returns `None` as soon as a segment is missing.
pub fn get_in<'a, S: AsRef<str>>(root: &'a Value, path: &[S]) -> Option<&'a Value> {
    path.iter()
        .try_fold(root, |node, key| child(node, key.as_ref()))
}

/// Mutable counterpart of [`get_in`]; never creates structure.
pub fn get_in_mut<'a, S: AsRef<str>>(root: &'a mut Value, path: &[S]) -> Option<&'a mut Value> {
    let mut node = root;
    for key in path {
        node = match node {
            Value::Object(map) => map.get_mut(key.as_ref())?,
            Value::Array(items) => {
                let index = array_index(key.as_ref(), items.len())?;
                &mut items[index]
            }
            _ => return None,
        };
    }
    Some(node)
}

/// True when a value (including an explicit `null`) exists at `path` below `root`.
pub fn has_in<S: AsRef<str>>(root: &Value, path: &[S]) -> bool {
    get_in(root, path).is_some()
}

/// Writes `value` at `path` below `root`, creating missing structure.
///
/// Scalars found on the way (including `root`) are replaced by empty mappings. An
/// array accepts any decimal index and is padded with `null` when the index is
/// past its end. An empty path replaces `root`.
///
/// Returns `false` without touching `root` when the path uses a non-index key on
/// an array, since the write would have to discard the array's elements.
pub fn set_in<S: AsRef<str>>(root: &mut Value, path: &[S], value: Value) -> bool {
    if !writable(root, path) {
        return false;
    }
    let mut node = root;
    for key in path {
        let Some(slot) = child_slot(node, key.as_ref()) else {
            return false;
        };
        node = slot;
    }
    *node = value;
    true
}

/// Removes the value at `path` below `root`.
///
/// A mapping entry is deleted; an array slot is set to `null` so later indices
/// keep their position. Returns `true` if something was removed. Missing
/// intermediate segments make this a no-op.
pub fn unset_in<S: AsRef<str>>(root: &mut Value, path: &[S]) -> bool {
    let Some((last, parents)) = path.split_last() else {
        return false;
    };
    let Some(parent) = get_in_mut(root, parents) else {
        return false;
    };

    let last = last.as_ref();
    match parent {
        Value::Object(map) => map.remove(last).is_some(),
        Value::Array(items) => match array_index(last, items.len()) {
            Some(index) => {
                items[index] = Value::Null;
                true
            }
            None => false,
        },
        _ => false,
    }
}

/// Makes sure every segment of `path` below `root` holds structured data.
///
/// Each segment whose current value is not an object or array becomes an empty
/// mapping, except the last one, which is filled with `leaf()`. Structured values
/// that already exist are left alone, so `leaf` is only called when the target is
/// missing. Returns `true` if anything was created.
///
/// A path that uses a non-index key on an existing array is left as it is, like
/// [`set_in`] does.
pub fn materialize<S, F>(root: &mut Value, path: &[S], leaf: F) -> bool
where
    S: AsRef<str>,
    F: FnOnce() -> Value,
{
    let Some((last, parents)) = path.split_last() else {
        return false;
    };
    if !writable(root, path) {
        return false;
    }

    let mut created = false;
    let mut node = root;
    for key in parents {
        created |= !holds_key(node, key.as_ref());
        let Some(slot) = child_slot(node, key.as_ref()) else {
            return created;
        };
        if !is_structured(slot) {
            *slot = Value::Object(Map::new());
            created = true;
        }
        node = slot;
    }

    created |= !holds_key(node, last.as_ref());
    let Some(slot) = child_slot(node, last.as_ref()) else {
        return created;
    };
    if !is_structured(slot) {
        *slot = leaf();
        created = true;
    }
    created
}
