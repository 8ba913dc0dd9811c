//! List-field normalisation and submission payload assembly.
//!
//! Users type list-like fields (allergies, medications) as comma-separated
//! text. The canonical committed shape is an ordered sequence of trimmed,
//! non-blank strings; raw comma-text never survives past a commit. Cleaning
//! an already-normalised sequence yields the same sequence, so normalisation
//! can safely run both at field commit and again during submission.

use crate::fields::{get_field, set_field};
use crate::schema::FormSchema;
use crate::{IntakeError, IntakeResult};
use serde_json::Value;

/// Normalises a raw list-like value into its canonical string sequence.
///
/// Accepts comma-separated text, an existing string array (entries trimmed,
/// blanks dropped), or null (empty list).
///
/// # Errors
///
/// Returns `IntakeError::InvalidInput` for values that cannot represent a
/// string list, such as numbers or arrays with non-string entries.
pub fn normalise_list(value: &Value) -> IntakeResult<Value> {
    let entries: Vec<String> = match value {
        Value::Null => Vec::new(),
        Value::String(raw) => raw
            .split(',')
            .map(str::trim)
            .filter(|entry| !entry.is_empty())
            .map(String::from)
            .collect(),
        Value::Array(items) => {
            let mut entries = Vec::new();
            for item in items {
                match item {
                    Value::String(text) => {
                        let trimmed = text.trim();
                        if !trimmed.is_empty() {
                            entries.push(trimmed.to_owned());
                        }
                    }
                    other => {
                        return Err(IntakeError::InvalidInput(format!(
                            "list entries must be strings, found: {other}"
                        )))
                    }
                }
            }
            entries
        }
        other => {
            return Err(IntakeError::InvalidInput(format!(
                "list fields accept comma-separated text or string sequences, found: {other}"
            )))
        }
    };

    Ok(Value::Array(entries.into_iter().map(Value::String).collect()))
}

/// Assembles the submission payload from draft data.
///
/// Every declared list field is materialised as its canonical sequence;
/// everything else is passed through unchanged, so untouched fields keep
/// their schema defaults. The draft data itself is not mutated.
pub fn normalise_payload(data: &Value, schema: &FormSchema) -> IntakeResult<Value> {
    let mut payload = data.clone();

    for path in schema.list_fields() {
        if let Some(current) = get_field(&payload, path) {
            let normalised = normalise_list(current)?;
            set_field(&mut payload, path, normalised)?;
        }
    }

    Ok(payload)
}
