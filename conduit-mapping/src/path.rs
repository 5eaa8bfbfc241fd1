//! Dotted paths into JSON values.
//!
//! `data.items[].title` reads `title` from every element of `data.items`;
//! `items[0]` picks the first element. Reading a key through an array
//! reads it from every element.

use crate::error::{MappingError, MappingResult};
use serde_json::{Map, Value};
use std::fmt;

/// Largest array index a path may name. Writing to `[n]` pads the array to
/// `n + 1` elements.
const MAX_INDEX: usize = 9_999;

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Key(String),
    Index(usize),
    /// `[]`: the value is treated as an array.
    Each,
}

/// A parsed path. The empty path points at the value itself.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Path {
    raw: String,
    segments: Vec<Segment>,
}

impl Path {
    pub fn parse(raw: &str) -> MappingResult<Self> {
        let trimmed = raw.trim();
        let mut segments = Vec::new();
        if !trimmed.is_empty() && trimmed != "." {
            for part in trimmed.split('.') {
                parse_part(raw, part, &mut segments)?;
            }
        }
        Ok(Self {
            raw: trimmed.to_string(),
            segments,
        })
    }

    /// The path to the value itself.
    pub fn root() -> Self {
        Self::default()
    }

    pub fn is_root(&self) -> bool {
        self.segments.is_empty()
    }

    pub fn as_str(&self) -> &str {
        &self.raw
    }

    /// Reads the value at this path. `None` when nothing is there.
    pub fn get(&self, value: &Value) -> Option<Value> {
        get(value, &self.segments)
    }

    /// Writes `value` at this path, creating objects and arrays as needed.
    pub fn set(&self, target: &mut Value, value: Value) {
        set(target, &self.segments, value);
    }
}

impl fmt::Display for Path {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

fn parse_part(raw: &str, part: &str, segments: &mut Vec<Segment>) -> MappingResult<()> {
    let invalid = |reason: &str| MappingError::InvalidPath {
        path: raw.to_string(),
        reason: reason.to_string(),
    };

    let (key, mut rest) = match part.find('[') {
        Some(pos) => part.split_at(pos),
        None => (part, ""),
    };
    if key.is_empty() && rest.is_empty() {
        return Err(invalid("empty segment"));
    }
    if !key.is_empty() {
        segments.push(Segment::Key(key.to_string()));
    }
    while !rest.is_empty() {
        let Some(close) = rest.find(']') else {
            return Err(invalid("unclosed bracket"));
        };
        let inner = &rest[1..close];
        if inner.is_empty() {
            segments.push(Segment::Each);
        } else {
            let index = inner
                .parse::<usize>()
                .map_err(|_| invalid("index must be a non-negative integer"))?;
            if index > MAX_INDEX {
                return Err(invalid("index is too large"));
            }
            segments.push(Segment::Index(index));
        }
        rest = &rest[close + 1..];
        if !rest.is_empty() && !rest.starts_with('[') {
            return Err(invalid("unexpected text after bracket"));
        }
    }
    Ok(())
}

fn get(value: &Value, segments: &[Segment]) -> Option<Value> {
    let Some((segment, rest)) = segments.split_first() else {
        return Some(value.clone());
    };
    match segment {
        Segment::Key(key) => match value {
            Value::Object(map) => get(map.get(key)?, rest),
            Value::Array(items) => Some(Value::Array(
                items.iter().filter_map(|item| get(item, segments)).collect(),
            )),
            _ => None,
        },
        Segment::Index(index) => match value {
            Value::Array(items) => get(items.get(*index)?, rest),
            _ => None,
        },
        Segment::Each => {
            let items: &[Value] = match value {
                Value::Array(items) => items,
                Value::Null => &[],
                other => std::slice::from_ref(other),
            };
            Some(Value::Array(items.iter().filter_map(|item| get(item, rest)).collect()))
        }
    }
}

fn set(target: &mut Value, segments: &[Segment], value: Value) {
    let Some((segment, rest)) = segments.split_first() else {
        *target = value;
        return;
    };
    match segment {
        Segment::Key(key) => {
            if !target.is_object() {
                *target = Value::Object(Map::new());
            }
            if let Value::Object(map) = target {
                set(map.entry(key.clone()).or_insert(Value::Null), rest, value);
            }
        }
        Segment::Index(index) => {
            with_array(target, index + 1, |items| set(&mut items[*index], rest, value));
        }
        Segment::Each => {
            let values = match value {
                Value::Array(values) => values,
                Value::Null => Vec::new(),
                other => vec![other],
            };
            if rest.is_empty() {
                *target = Value::Array(values);
                return;
            }
            with_array(target, values.len(), |items| {
                for (slot, value) in items.iter_mut().zip(values) {
                    set(slot, rest, value);
                }
            });
        }
    }
}

/// Runs `f` on `target` as an array of at least `len` elements.
fn with_array(target: &mut Value, len: usize, f: impl FnOnce(&mut Vec<Value>)) {
    let mut items = match std::mem::take(target) {
        Value::Array(items) => items,
        _ => Vec::new(),
    };
    if items.len() < len {
        items.resize(len, Value::Null);
    }
    f(&mut items);
    *target = Value::Array(items);
}

/// Deep-merges `source` into `target`. Objects merge key by key, arrays
/// element by element; anything else replaces the target.
pub fn merge(target: &mut Value, source: Value) {
    match (target, source) {
        (Value::Object(target), Value::Object(source)) => {
            for (key, value) in source {
                match target.get_mut(&key) {
                    Some(existing) => merge(existing, value),
                    None => {
                        target.insert(key, value);
                    }
                }
            }
        }
        (Value::Array(target), Value::Array(source)) => {
            for (index, value) in source.into_iter().enumerate() {
                match target.get_mut(index) {
                    Some(existing) => merge(existing, value),
                    None => target.push(value),
                }
            }
        }
        (target, source) => *target = source,
    }
}
