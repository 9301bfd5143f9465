//! Dotted-and-indexed path resolution over JSON values.
//!
//! Paths look like `data.orders[2].total`: dot-separated keys, each
//! optionally followed by one or more `[n]` array indices. Paths are
//! resolved against a root object holding `data` and `context`.
//!
//! A path containing `__proto__`, `constructor` or `prototype` as a key
//! never resolves. Reads return `None` and writes do nothing. The same
//! applies to malformed paths. Resolution never panics.

use serde_json::{Map, Value};

const FORBIDDEN_KEYS: [&str; 3] = ["__proto__", "constructor", "prototype"];

/// Largest run of `null` padding a single write may add to an array.
pub const MAX_PAD_GAP: usize = 1024;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Segment {
    Key(String),
    Index(usize),
}

/// Parse a path into segments. `None` for malformed or unsafe paths.
pub fn parse(path: &str) -> Option<Vec<Segment>> {
    if path.is_empty() {
        return None;
    }
    let mut segments = Vec::new();
    for part in path.split('.') {
        let (key, mut rest) = match part.find('[') {
            Some(pos) => (&part[..pos], &part[pos..]),
            None => (part, ""),
        };
        if key.is_empty() || key.contains(']') || FORBIDDEN_KEYS.contains(&key) {
            return None;
        }
        segments.push(Segment::Key(key.to_string()));
        while !rest.is_empty() {
            let inner = rest.strip_prefix('[')?;
            let close = inner.find(']')?;
            let digits = &inner[..close];
            if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
                return None;
            }
            segments.push(Segment::Index(digits.parse().ok()?));
            rest = &inner[close + 1..];
        }
    }
    Some(segments)
}

/// Build the `{data, context}` object paths are resolved against.
pub fn make_root(data: Map<String, Value>, context: Value) -> Value {
    let mut root = Map::new();
    root.insert("data".to_string(), Value::Object(data));
    root.insert("context".to_string(), context);
    Value::Object(root)
}

/// Read the value at `path`, or `None` if any segment fails to resolve.
pub fn get<'a>(root: &'a Value, path: &str) -> Option<&'a Value> {
    let segments = parse(path)?;
    segments
        .iter()
        .try_fold(root, |node, segment| match (segment, node) {
            (Segment::Key(k), Value::Object(map)) => map.get(k),
            (Segment::Index(i), Value::Array(items)) => items.get(*i),
            _ => None,
        })
}

/// Return a copy of `root` with `value` written at `path`.
///
/// The caller's `root` is never modified. If the path is malformed,
/// unsafe, or crosses a non-container value, the copy equals `root`.
pub fn set(root: &Value, path: &str, value: Value) -> Value {
    let mut next = root.clone();
    write(&mut next, path, value);
    next
}

/// Write `value` at `path` in place. Returns `false` if nothing was written.
///
/// Missing intermediate keys are created as objects, or as arrays when
/// the next segment is an index. An index equal to the array length
/// appends; a larger index pads the gap with `null`, up to
/// [`MAX_PAD_GAP`] elements. Writes needing a wider gap are refused.
pub fn write(root: &mut Value, path: &str, value: Value) -> bool {
    match parse(path) {
        Some(segments) => write_segments(root, &segments, value),
        None => false,
    }
}

fn write_segments(node: &mut Value, segments: &[Segment], value: Value) -> bool {
    let Some((first, rest)) = segments.split_first() else {
        return false;
    };

    if rest.is_empty() {
        return match (first, node) {
            (Segment::Key(k), Value::Object(map)) => {
                map.insert(k.clone(), value);
                true
            }
            (Segment::Index(i), Value::Array(items)) => {
                if !pad_to(items, *i) {
                    return false;
                }
                items[*i] = value;
                true
            }
            _ => false,
        };
    }

    let child = match (first, node) {
        (Segment::Key(k), Value::Object(map)) => map
            .entry(k.clone())
            .or_insert_with(|| empty_container_for(&rest[0])),
        (Segment::Index(i), Value::Array(items)) => {
            if *i >= items.len() {
                if !pad_to(items, *i) {
                    return false;
                }
                items[*i] = empty_container_for(&rest[0]);
            }
            &mut items[*i]
        }
        _ => return false,
    };
    write_segments(child, rest, value)
}

/// Remove and return the value at `path`. Array elements are removed,
/// shifting later elements down.
pub fn remove(root: &mut Value, path: &str) -> Option<Value> {
    let segments = parse(path)?;
    let (last, parents) = segments.split_last()?;
    let parent = parents
        .iter()
        .try_fold(root, |node, segment| match (segment, node) {
            (Segment::Key(k), Value::Object(map)) => map.get_mut(k),
            (Segment::Index(i), Value::Array(items)) => items.get_mut(*i),
            _ => None,
        })?;
    match (last, parent) {
        (Segment::Key(k), Value::Object(map)) => map.remove(k),
        (Segment::Index(i), Value::Array(items)) if *i < items.len() => Some(items.remove(*i)),
        _ => None,
    }
}

fn empty_container_for(next: &Segment) -> Value {
    match next {
        Segment::Key(_) => Value::Object(Map::new()),
        Segment::Index(_) => Value::Array(Vec::new()),
    }
}

fn pad_to(items: &mut Vec<Value>, index: usize) -> bool {
    if index < items.len() {
        return true;
    }
    if index - items.len() > MAX_PAD_GAP {
        return false;
    }
    items.resize(index + 1, Value::Null);
    true
}

// ──────────────────────────────────────────────
// Tests
// ──────────────────────────────────────────────
