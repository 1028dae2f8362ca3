// SPDX-FileCopyrightText: 2026 Voxa Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Pure application of field-path operations to a JSON document.
//!
//! Paths are dot-separated; intermediate objects are created on demand.
//! These functions run inside the store's single writer so a whole batch
//! applies atomically.

use serde_json::{Map, Value};
use voxa_core::{FieldOp, VoxaError};

/// Applies every operation in order; fails on the first type mismatch.
pub fn apply_ops(doc: &mut Value, ops: &[(String, FieldOp)]) -> Result<(), VoxaError> {
    if !doc.is_object() {
        *doc = Value::Object(Map::new());
    }
    for (path, op) in ops {
        apply_one(doc, path, op)?;
    }
    Ok(())
}

fn apply_one(doc: &mut Value, path: &str, op: &FieldOp) -> Result<(), VoxaError> {
    let (parent_path, key) = match path.rsplit_once('.') {
        Some((p, k)) => (Some(p), k),
        None => (None, path),
    };
    if key.is_empty() {
        return Err(VoxaError::bad_request("field_path", "empty field segment"));
    }

    let parent = match parent_path {
        Some(p) => resolve_object_mut(doc, p)?,
        None => doc
            .as_object_mut()
            .ok_or_else(|| VoxaError::Consistency("document root is not an object".into()))?,
    };

    match op {
        FieldOp::Set(value) => {
            parent.insert(key.to_string(), value.clone());
        }
        FieldOp::Delete => {
            parent.remove(key);
        }
        FieldOp::Increment(n) => {
            let current = match parent.get(key) {
                None | Some(Value::Null) => 0,
                Some(Value::Number(num)) => num.as_i64().ok_or_else(|| {
                    VoxaError::Consistency(format!("increment target {path} is not an integer"))
                })?,
                Some(other) => {
                    return Err(VoxaError::Consistency(format!(
                        "increment target {path} has type {}",
                        type_name(other)
                    )));
                }
            };
            parent.insert(key.to_string(), Value::from(current + n));
        }
        FieldOp::ArrayUnion(values) => {
            let arr = match parent.get_mut(key) {
                None | Some(Value::Null) => {
                    parent.insert(key.to_string(), Value::Array(Vec::new()));
                    parent
                        .get_mut(key)
                        .and_then(Value::as_array_mut)
                        .ok_or_else(|| VoxaError::Internal("array just inserted".into()))?
                }
                Some(Value::Array(_)) => parent
                    .get_mut(key)
                    .and_then(Value::as_array_mut)
                    .ok_or_else(|| VoxaError::Internal("array checked above".into()))?,
                Some(other) => {
                    return Err(VoxaError::Consistency(format!(
                        "array-union target {path} has type {}",
                        type_name(other)
                    )));
                }
            };
            for v in values {
                if !arr.contains(v) {
                    arr.push(v.clone());
                }
            }
        }
    }
    Ok(())
}

/// Walks `path` creating intermediate objects, returning the final map.
fn resolve_object_mut<'a>(
    doc: &'a mut Value,
    path: &str,
) -> Result<&'a mut Map<String, Value>, VoxaError> {
    let mut current = doc;
    for segment in path.split('.') {
        if segment.is_empty() {
            return Err(VoxaError::bad_request("field_path", "empty field segment"));
        }
        let map = current
            .as_object_mut()
            .ok_or_else(|| VoxaError::Consistency(format!("segment {segment} is not an object")))?;
        current = map
            .entry(segment.to_string())
            .or_insert_with(|| Value::Object(Map::new()));
        if current.is_null() {
            *current = Value::Object(Map::new());
        }
    }
    current
        .as_object_mut()
        .ok_or_else(|| VoxaError::Consistency(format!("path {path} is not an object")))
}

fn type_name(v: &Value) -> &'static str {
    match v {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
