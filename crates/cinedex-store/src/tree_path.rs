//! Path-addressed edits on a JSON tree.
//!
//! The hosted store and [`MemoryStore`](crate::memory::MemoryStore) share
//! the same tree rules: writing `null` deletes, and an object left without
//! children disappears along with it. The subscription mirror in
//! [`realtime`](crate::realtime) replays server events with these helpers.

use cinedex_common::{Error, Result};
use serde_json::{Map, Value};

/// Characters the store refuses inside a key.
const FORBIDDEN: &[char] = &['.', '$', '#', '[', ']'];

/// Split a slash-separated path into validated segments. The empty path
/// (or `/`) addresses the root.
pub fn segments(path: &str) -> Result<Vec<String>> {
    path.split('/')
        .filter(|s| !s.is_empty())
        .map(|s| {
            if s.contains(FORBIDDEN) || s.chars().any(char::is_control) {
                Err(Error::validation(format!("invalid key in path: {s:?}")))
            } else {
                Ok(s.to_string())
            }
        })
        .collect()
}

/// Join segments back into a path without leading or trailing slashes.
pub fn join(segments: &[String]) -> String {
    segments.join("/")
}

/// Whether one path is an ancestor of (or equal to) the other.
pub fn overlaps(a: &[String], b: &[String]) -> bool {
    a.iter().zip(b.iter()).all(|(x, y)| x == y)
}

/// Borrow the subtree at `segs`, if present.
pub fn get<'a>(root: &'a Value, segs: &[String]) -> Option<&'a Value> {
    let mut node = root;
    for seg in segs {
        node = node.as_object()?.get(seg)?;
    }
    if node.is_null() {
        None
    } else {
        Some(node)
    }
}

/// Replace the subtree at `segs` with `value`.
pub fn set(root: &mut Value, segs: &[String], value: Value) {
    set_in(root, segs, normalize(value));
}

fn set_in(node: &mut Value, segs: &[String], value: Value) {
    let Some((first, rest)) = segs.split_first() else {
        *node = value;
        return;
    };

    if !node.is_object() {
        if value.is_null() {
            return;
        }
        *node = Value::Object(Map::new());
    }

    let mut now_empty = false;
    if let Value::Object(map) = node {
        let child = map.entry(first.clone()).or_insert(Value::Null);
        set_in(child, rest, value);
        if child.is_null() {
            map.remove(first.as_str());
        }
        now_empty = map.is_empty();
    }
    if now_empty {
        *node = Value::Null;
    }
}

/// Merge `children` into the subtree at `segs`. Each key replaces the child
/// of that name; a key may itself be a relative path.
pub fn merge(root: &mut Value, segs: &[String], children: Map<String, Value>) -> Result<()> {
    for (key, value) in children {
        let mut path = segs.to_vec();
        path.extend(segments(&key)?);
        set(root, &path, value);
    }
    Ok(())
}

/// Drop nulls and empty objects, recursively. An empty result is `Null`.
pub fn normalize(value: Value) -> Value {
    match value {
        Value::Object(map) => {
            let cleaned: Map<String, Value> = map
                .into_iter()
                .map(|(k, v)| (k, normalize(v)))
                .filter(|(_, v)| !v.is_null())
                .collect();
            if cleaned.is_empty() {
                Value::Null
            } else {
                Value::Object(cleaned)
            }
        }
        other => other,
    }
}
