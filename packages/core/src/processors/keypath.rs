//! Dotted key path editing on structured documents
//!
//! Key paths look like `name.first` or `dear.friends.-1`. Segments are split
//! on `.`; a numeric segment indexes an array and `-1` addresses the slot past
//! the last element (append on write, last element on delete). Writes create
//! any missing intermediate containers, replacing scalars in the way.
//!
//! Writing past the end of an array pads the gap with nulls, up to
//! [`MAX_ARRAY_PADDING`] slots. Larger jumps are rejected as invalid targets.

use super::ProcessError;
use serde_json::{Map, Value};

/// Most null slots a single write may insert before its index
pub const MAX_ARRAY_PADDING: usize = 1024;

/// Edit operations understood by the structured-edit processors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EditOp {
    /// `create`, `append`, `replace`: write the value as a string
    SetString,
    /// `set`: parse the value in the document's own format and write it
    SetRaw,
    /// `delete`: remove the key path
    Delete,
}

impl EditOp {
    /// Parse an operation name
    pub fn parse(op: &str) -> Result<Self, ProcessError> {
        match op {
            "create" | "append" | "replace" => Ok(Self::SetString),
            "set" => Ok(Self::SetRaw),
            "delete" => Ok(Self::Delete),
            other => Err(ProcessError::unknown_operation(other)),
        }
    }
}

#[derive(Debug, Clone, Copy)]
enum Segment<'a> {
    Key(&'a str),
    Index(usize),
    Append,
}

impl<'a> Segment<'a> {
    fn parse(raw: &'a str) -> Self {
        if raw == "-1" {
            return Segment::Append;
        }
        match raw.parse::<usize>() {
            Ok(index) if raw.bytes().all(|b| b.is_ascii_digit()) => Segment::Index(index),
            _ => Segment::Key(raw),
        }
    }
}

fn segments(target: &str) -> Result<Vec<&str>, ProcessError> {
    let target = target.trim();
    if target.is_empty() {
        return Err(ProcessError::invalid_target(target, "empty key path"));
    }
    let parts: Vec<&str> = target.split('.').collect();
    if parts.iter().any(|p| p.is_empty()) {
        return Err(ProcessError::invalid_target(target, "empty key path segment"));
    }
    Ok(parts)
}

/// Resolve (creating if needed) the slot addressed by `raw` under `node`
fn slot<'v>(node: &'v mut Value, raw: &str, target: &str) -> Result<&'v mut Value, ProcessError> {
    let segment = Segment::parse(raw);
    match node {
        Value::Object(map) => Ok(map.entry(raw.to_string()).or_insert(Value::Null)),
        Value::Array(items) => {
            let index = match segment {
                Segment::Append => items.len(),
                Segment::Index(index) => index,
                Segment::Key(key) => {
                    return Err(ProcessError::invalid_target(
                        target,
                        format!("'{}' is not an array index", key),
                    ))
                }
            };
            if index >= items.len() {
                let len = index
                    .checked_add(1)
                    .filter(|_| index - items.len() <= MAX_ARRAY_PADDING)
                    .ok_or_else(|| {
                        ProcessError::invalid_target(
                            target,
                            format!(
                                "index {} is too far past the end of a {} element array",
                                index,
                                items.len()
                            ),
                        )
                    })?;
                items.resize(len, Value::Null);
            }
            Ok(&mut items[index])
        }
        other => {
            *other = match segment {
                Segment::Key(_) => Value::Object(Map::new()),
                Segment::Index(_) | Segment::Append => Value::Array(Vec::new()),
            };
            slot(other, raw, target)
        }
    }
}

fn lookup_mut<'v>(node: &'v mut Value, raw: &str) -> Option<&'v mut Value> {
    match node {
        Value::Object(map) => map.get_mut(raw),
        Value::Array(items) => match Segment::parse(raw) {
            Segment::Index(index) => items.get_mut(index),
            Segment::Append => items.last_mut(),
            Segment::Key(_) => None,
        },
        _ => None,
    }
}

/// Write `value` at `target`
pub fn set(doc: &mut Value, target: &str, value: Value) -> Result<(), ProcessError> {
    let mut node = doc;
    for raw in segments(target)? {
        node = slot(node, raw, target)?;
    }
    *node = value;
    Ok(())
}

/// Remove `target`; a missing key path leaves the document untouched
pub fn delete(doc: &mut Value, target: &str) -> Result<(), ProcessError> {
    let parts = segments(target)?;
    let Some((last, parents)) = parts.split_last() else {
        return Ok(());
    };

    let mut node = doc;
    for raw in parents {
        match lookup_mut(node, raw) {
            Some(next) => node = next,
            None => return Ok(()),
        }
    }

    match node {
        Value::Object(map) => {
            map.shift_remove(*last);
        }
        Value::Array(items) => match Segment::parse(last) {
            Segment::Index(index) if index < items.len() => {
                items.remove(index);
            }
            Segment::Append => {
                items.pop();
            }
            _ => {}
        },
        _ => {}
    }
    Ok(())
}

/// Read the value at `target`, if present
pub fn get<'v>(doc: &'v Value, target: &str) -> Option<&'v Value> {
    let mut node = doc;
    for raw in segments(target).ok()? {
        node = match node {
            Value::Object(map) => map.get(raw)?,
            Value::Array(items) => match Segment::parse(raw) {
                Segment::Index(index) => items.get(index)?,
                Segment::Append => items.last()?,
                Segment::Key(_) => return None,
            },
            _ => return None,
        };
    }
    Some(node)
}
