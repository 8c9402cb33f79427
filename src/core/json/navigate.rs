// src/core/json/navigate.rs

//! Pure navigation over `serde_json::Value` trees.
//!
//! Reads borrow the input; writes work on a copy and hand back a new tree, so
//! a failed write can never leave a half-modified document behind.

use super::JsonKind;
use super::path::PathSegment;
use crate::core::errors::HttpMuxError;
use serde_json::{Map, Value};
use tracing::debug;

/// Name of a value's JSON kind, for error messages.
pub fn kind_name(value: &Value) -> &'static str {
    JsonKind::of(value).name()
}

fn root_object(root: &Value) -> Result<&Map<String, Value>, HttpMuxError> {
    root.as_object().ok_or(HttpMuxError::WrongKind {
        expected: "object",
        found: kind_name(root),
    })
}

fn root_object_mut(root: &mut Value) -> Result<&mut Map<String, Value>, HttpMuxError> {
    let found = kind_name(root);
    root.as_object_mut().ok_or(HttpMuxError::WrongKind {
        expected: "object",
        found,
    })
}

fn not_found(segment: &PathSegment) -> HttpMuxError {
    debug!("JSON path segment '{}' not found", segment);
    HttpMuxError::PathNotFound(segment.to_string())
}

/// Finds the position of the element an `Index` or `Predicate` segment
/// selects in `array`. Only the first match counts.
fn select_element(array: &[Value], segment: &PathSegment) -> Option<usize> {
    match segment {
        PathSegment::Field(_) => None,
        PathSegment::Index { index, .. } => (*index < array.len()).then_some(*index),
        PathSegment::Predicate { field, value, .. } => array.iter().position(|element| {
            element
                .as_object()
                .and_then(|object| object.get(field))
                .is_some_and(|candidate| value.matches(candidate))
        }),
    }
}

/// Resolves one segment against `parent`, returning whatever it selects.
fn step<'a>(
    parent: &'a Map<String, Value>,
    segment: &PathSegment,
) -> Result<&'a Value, HttpMuxError> {
    let member = parent
        .get(segment.name())
        .ok_or_else(|| not_found(segment))?;
    match segment {
        PathSegment::Field(_) => Ok(member),
        _ => {
            let array = member.as_array().ok_or_else(|| not_found(segment))?;
            let position = select_element(array, segment).ok_or_else(|| not_found(segment))?;
            Ok(&array[position])
        }
    }
}

/// Walks every segment but the last; each one must land on an object.
fn descend<'a>(
    root: &'a Value,
    parents: &[PathSegment],
) -> Result<&'a Map<String, Value>, HttpMuxError> {
    let mut current = root_object(root)?;
    for segment in parents {
        current = step(current, segment)?
            .as_object()
            .ok_or_else(|| not_found(segment))?;
    }
    Ok(current)
}

/// Returns the value a path points at.
pub fn resolve<'a>(root: &'a Value, path: &[PathSegment]) -> Result<&'a Value, HttpMuxError> {
    let (last, parents) = path
        .split_last()
        .ok_or_else(|| HttpMuxError::PathSyntax("empty path".to_string()))?;
    step(descend(root, parents)?, last)
}

/// Like [`descend`], but mutable. Missing plain `Field` members are created
/// as empty objects; index and predicate segments must already match.
fn descend_mut<'a>(
    root: &'a mut Value,
    parents: &[PathSegment],
) -> Result<&'a mut Map<String, Value>, HttpMuxError> {
    let mut current = root_object_mut(root)?;
    for segment in parents {
        let child = match segment {
            PathSegment::Field(name) => current
                .entry(name.clone())
                .or_insert_with(|| Value::Object(Map::new())),
            _ => {
                let array = current
                    .get_mut(segment.name())
                    .and_then(Value::as_array_mut)
                    .ok_or_else(|| not_found(segment))?;
                let position =
                    select_element(array, segment).ok_or_else(|| not_found(segment))?;
                &mut array[position]
            }
        };
        current = child.as_object_mut().ok_or_else(|| not_found(segment))?;
    }
    Ok(current)
}

/// Writes `new_value` at `path` into `target`. A plain field is created or
/// overwritten; an index or predicate terminal replaces the whole matched
/// element.
fn assign(target: &mut Value, path: &[PathSegment], new_value: Value) -> Result<(), HttpMuxError> {
    let (last, parents) = path
        .split_last()
        .ok_or_else(|| HttpMuxError::PathSyntax("empty path".to_string()))?;
    let parent = descend_mut(target, parents)?;
    match last {
        PathSegment::Field(name) => {
            parent.insert(name.clone(), new_value);
        }
        _ => {
            let array = parent
                .get_mut(last.name())
                .and_then(Value::as_array_mut)
                .ok_or_else(|| not_found(last))?;
            let position = select_element(array, last).ok_or_else(|| not_found(last))?;
            array[position] = new_value;
        }
    }
    Ok(())
}

/// Returns a copy of `root` with `new_value` written at `path`.
pub fn with_value_set(
    root: &Value,
    path: &[PathSegment],
    new_value: Value,
) -> Result<Value, HttpMuxError> {
    let mut updated = root.clone();
    assign(&mut updated, path, new_value)?;
    Ok(updated)
}

/// Returns a copy of `root` with `item` appended to the array at `path`. An
/// absent terminal field becomes a one-element array.
pub fn with_item_appended(
    root: &Value,
    path: &[PathSegment],
    item: Value,
) -> Result<Value, HttpMuxError> {
    let mut updated = root.clone();
    let (last, parents) = path
        .split_last()
        .ok_or_else(|| HttpMuxError::PathSyntax("empty path".to_string()))?;
    let parent = descend_mut(&mut updated, parents)?;

    let slot = match last {
        PathSegment::Field(name) => parent
            .entry(name.clone())
            .or_insert_with(|| Value::Array(Vec::new())),
        _ => {
            let array = parent
                .get_mut(last.name())
                .and_then(Value::as_array_mut)
                .ok_or_else(|| not_found(last))?;
            let position = select_element(array, last).ok_or_else(|| not_found(last))?;
            &mut array[position]
        }
    };

    let found = kind_name(slot);
    slot.as_array_mut()
        .ok_or(HttpMuxError::WrongKind {
            expected: "array",
            found,
        })?
        .push(item);
    Ok(updated)
}
