//! JSON bridge for records given or shown on the command line.

use rowlog_codec::Value;
use serde_json::{Map, Number, Value as Json};
use std::fs;
use std::path::Path;
use thiserror::Error;

/// Errors converting JSON input to a record.
#[derive(Debug, Error)]
pub enum JsonError {
    /// Input is not valid JSON.
    #[error("invalid JSON: {0}")]
    Parse(#[from] serde_json::Error),

    /// Input file could not be read.
    #[error("cannot read {path}: {source}")]
    Read {
        /// File that failed.
        path: String,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// Records hold no floating-point numbers.
    #[error("unsupported number {0}: only integers in the i64 range are allowed")]
    Number(Number),
}

/// Converts a JSON document to a record value.
///
/// # Errors
///
/// Returns [`JsonError::Number`] for floats and integers outside `i64`.
pub fn from_json(json: &Json) -> Result<Value, JsonError> {
    Ok(match json {
        Json::Null => Value::Null,
        Json::Bool(b) => Value::Bool(*b),
        Json::Number(n) => Value::Integer(n.as_i64().ok_or_else(|| JsonError::Number(n.clone()))?),
        Json::String(s) => Value::Text(s.clone()),
        Json::Array(items) => Value::Array(items.iter().map(from_json).collect::<Result<_, _>>()?),
        Json::Object(fields) => {
            let mut pairs = Vec::with_capacity(fields.len());
            for (key, value) in fields {
                pairs.push((key.clone(), from_json(value)?));
            }
            Value::object(pairs)
        }
    })
}

/// Renders a value as JSON for display.
///
/// Byte strings become `h'..'` hex text and non-text map keys use their
/// JSON rendering, so the output is not meant to be read back.
pub fn to_json(value: &Value) -> Json {
    match value {
        Value::Null => Json::Null,
        Value::Bool(b) => Json::Bool(*b),
        Value::Integer(i) => Json::Number((*i).into()),
        Value::Text(s) => Json::String(s.clone()),
        Value::Bytes(bytes) => Json::String(format!("h'{}'", hex(bytes))),
        Value::Array(items) => Json::Array(items.iter().map(to_json).collect()),
        Value::Map(pairs) => {
            let mut fields = Map::new();
            for (key, value) in pairs {
                let key = match key {
                    Value::Text(s) => s.clone(),
                    other => to_json(other).to_string(),
                };
                fields.insert(key, to_json(value));
            }
            Json::Object(fields)
        }
    }
}

/// Reads a record from a JSON file.
///
/// # Errors
///
/// Read, parse or conversion failures.
pub fn read_record(path: &Path) -> Result<Value, JsonError> {
    let text = fs::read_to_string(path).map_err(|source| JsonError::Read {
        path: path.display().to_string(),
        source,
    })?;
    from_json(&serde_json::from_str(&text)?)
}

fn hex(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{b:02x}")).collect()
}
