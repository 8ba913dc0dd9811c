//! Nested field access over form data trees.
//!
//! Form data is an arbitrarily nested JSON object addressed by dotted
//! [`FieldPath`]s. Reads walk the tree and report absence as `None`; writes
//! create intermediate objects as needed and fail explicitly when a path
//! segment runs into a scalar where an object was expected, rather than
//! silently doing nothing.

use crate::{IntakeError, IntakeResult};
use intake_types::FieldPath;
use serde_json::Value;

/// Resolves `path` inside `data`, returning the referenced value if present.
pub fn get_field<'a>(data: &'a Value, path: &FieldPath) -> Option<&'a Value> {
    let mut current = data;
    for segment in path.segments() {
        current = current.as_object()?.get(segment)?;
    }
    Some(current)
}

/// Sets the value at `path` inside `data`, creating intermediate objects for
/// any missing parent segments.
///
/// # Errors
///
/// Returns [`IntakeError::PathConflict`] when a segment on the way to the
/// leaf holds a scalar, since descending through it would silently discard
/// user data.
pub fn set_field(data: &mut Value, path: &FieldPath, value: Value) -> IntakeResult<()> {
    let mut segments: Vec<&str> = path.segments().collect();
    let leaf = match segments.pop() {
        Some(segment) => segment,
        None => {
            return Err(IntakeError::InvalidInput(format!(
                "field path '{path}' has no segments"
            )))
        }
    };

    let mut current = data;
    let mut descended: Option<&str> = None;
    for segment in segments {
        let map = match current {
            Value::Object(map) => map,
            _ => return Err(conflict(path, descended)),
        };
        current = map
            .entry(segment.to_string())
            .or_insert_with(|| Value::Object(serde_json::Map::new()));
        descended = Some(segment);
    }

    match current {
        Value::Object(map) => {
            map.insert(leaf.to_string(), value);
            Ok(())
        }
        _ => Err(conflict(path, descended)),
    }
}

fn conflict(path: &FieldPath, segment: Option<&str>) -> IntakeError {
    IntakeError::PathConflict {
        path: path.to_string(),
        segment: segment.unwrap_or("<root>").to_string(),
    }
}
